use clap::{ArgAction, Parser};
use lscerts::config::{Config, ConfigError};
use lscerts::input;
use lscerts::metrics::prom;
use lscerts::output;
use lscerts::{Auditor, Report, TlsFetcher, ValidationResult};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::exit;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const PROGRAM: &str = env!("CARGO_PKG_NAME");

const EXIT_FAILURE: i32 = 1;
const EXIT_USAGE: i32 = 2;
const EXIT_OPEN_INPUT: i32 = 3;
const EXIT_READ_INPUT: i32 = 4;

/// Lists certificates in the order they will expire.
///
/// Reads a list of HTTPS URLs from FILE or standard input, one URL per line.
/// Blank lines and lines starting with '#' are ignored. For each URL, writes
/// details of the validated leaf certificate, or an error to standard error.
#[derive(Parser, Debug)]
#[command(name = "lscerts", version, about, long_about)]
struct Cli {
    /// File of HTTPS URLs, one per line [default: standard input]
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Do not write header for certificate details
    #[arg(short = 'n', long)]
    no_header: bool,

    /// Output format: csv, json or table [default: csv]
    #[arg(short, long, value_name = "FORMAT")]
    output: Option<String>,

    /// Path to a TOML configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Connect timeout in seconds [default: 5]
    #[arg(short, long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Number of URLs to check concurrently [default: 1]
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Exit code to use when any URL fails [default: 0]
    #[arg(long)]
    exit_code: Option<i32>,

    /// Push expiry metrics to a Prometheus Push Gateway
    #[arg(long)]
    prometheus: bool,

    /// Prometheus Push Gateway address
    #[arg(long, value_name = "URL")]
    prometheus_address: Option<String>,

    /// Print an example configuration file and exit
    #[arg(long)]
    generate_config: bool,

    /// Log progress to standard error (-vv for debug output)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.generate_config {
        print!("{}", Config::example_toml());
        exit(0);
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", PROGRAM, e);
            exit(EXIT_USAGE);
        }
    };
    debug!(?config, "effective configuration");

    let fetcher = match TlsFetcher::new(config.connect_timeout()) {
        Ok(fetcher) => fetcher,
        Err(e) => {
            eprintln!("{}: {}", PROGRAM, e);
            exit(EXIT_FAILURE);
        }
    };
    let auditor = Auditor::new(fetcher);
    let jobs = config.jobs();

    let mut read_error = None;
    let report = match (&cli.file, &config.urls) {
        (Some(path), _) => {
            let file = match File::open(path) {
                Ok(file) => file,
                Err(e) => {
                    eprintln!("{}: {}: {}", PROGRAM, path.display(), e);
                    exit(EXIT_OPEN_INPUT);
                }
            };
            audit_lines(&auditor, BufReader::new(file), jobs, &mut read_error)
        }
        (None, Some(urls)) => {
            info!(count = urls.len(), "auditing urls from configuration");
            let lines = urls.iter().filter(|url| input::is_url_line(url)).cloned();
            auditor.run_parallel(lines, jobs, report_failure)
        }
        (None, None) => audit_lines(&auditor, io::stdin().lock(), jobs, &mut read_error),
    };

    if let Some(e) = read_error {
        eprintln!("{}: {}", PROGRAM, e);
        exit(EXIT_READ_INPUT);
    }

    let mut stdout = io::stdout().lock();
    let written = output::write_report(
        &mut stdout,
        &report,
        config.output_format(),
        config.header(),
    )
    .and_then(|_| stdout.flush());
    if let Err(e) = written {
        eprintln!("{}: {}", PROGRAM, e);
        exit(EXIT_FAILURE);
    }

    if config.prometheus_enabled() {
        if let Some(address) = config.prometheus_address() {
            let pushed = prom::push_report(&report, chrono::Utc::now(), address);
            info!(pushed, address, "pushed metrics");
        }
    }

    if report.failure_count() > 0 {
        exit(config.failure_exit_code());
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Defaults, then the config file, then flags.
fn load_config(cli: &Cli) -> Result<Config, ConfigError> {
    let mut config = Config::default();
    if let Some(path) = &cli.config {
        config = config.merge_with(Config::from_file(path)?);
    }
    let config = config.merge_with(Config::from_cli_args(
        cli.output.clone(),
        cli.no_header,
        cli.timeout,
        cli.jobs,
        cli.exit_code,
        cli.prometheus,
        cli.prometheus_address.clone(),
    ));
    config.validate()?;
    Ok(config)
}

/// Audits the URL lines of `reader`, stopping at the first read error.
fn audit_lines<R: BufRead>(
    auditor: &Auditor<TlsFetcher>,
    reader: R,
    jobs: usize,
    read_error: &mut Option<io::Error>,
) -> Report {
    let lines = input::url_lines(reader).map_while(|line| match line {
        Ok(line) => Some(line),
        Err(e) => {
            *read_error = Some(e);
            None
        }
    });
    auditor.run_parallel(lines, jobs, report_failure)
}

/// Failures go to standard error as soon as they happen.
fn report_failure(result: &ValidationResult) {
    if let ValidationResult::Failure(failure) = result {
        eprintln!("{}: {}", PROGRAM, failure);
    }
}
