//! The per-URL pipeline: resolve, fetch, classify, record.

use crate::endpoint;
use crate::expiry;
use crate::fetch::Fetch;
use crate::report::{Aggregator, Failure, Report, Success, ValidationResult};
use chrono::{DateTime, Utc};
use std::sync::{mpsc, Mutex};
use std::thread;
use tracing::{debug, info};

/// Runs input lines through the audit pipeline.
pub struct Auditor<F> {
    fetcher: F,
    clock: fn() -> DateTime<Utc>,
}

impl<F: Fetch> Auditor<F> {
    pub fn new(fetcher: F) -> Self {
        Auditor {
            fetcher,
            clock: Utc::now,
        }
    }

    /// Uses `clock` instead of the system time when classifying expiry.
    pub fn with_clock(fetcher: F, clock: fn() -> DateTime<Utc>) -> Self {
        Auditor { fetcher, clock }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Audits a single URL line. Never fails: errors become `ValidationResult::Failure`.
    pub fn check(&self, line: &str) -> ValidationResult {
        let outcome = endpoint::resolve(line).and_then(|endpoint| {
            debug!(url = line, %endpoint, "fetching certificate");
            self.fetcher.fetch(&endpoint)
        });

        match outcome {
            Ok(certificate) => {
                let time_remaining =
                    expiry::classify(certificate.not_after, (self.clock)()).to_string();
                ValidationResult::Success(Success {
                    source_url: line.to_string(),
                    certificate,
                    time_remaining,
                })
            }
            Err(error) => {
                debug!(url = line, kind = error.kind(), "audit failed");
                ValidationResult::Failure(Failure {
                    source_url: line.to_string(),
                    error,
                })
            }
        }
    }

    /// Audits `lines` one after another.
    ///
    /// `on_result` sees every result as soon as it is produced, before the
    /// report is finalized.
    pub fn run<I, C>(&self, lines: I, mut on_result: C) -> Report
    where
        I: IntoIterator<Item = String>,
        C: FnMut(&ValidationResult),
    {
        let mut aggregator = Aggregator::new();
        for line in lines {
            let result = self.check(&line);
            on_result(&result);
            aggregator.record(result);
        }
        finish(aggregator)
    }
}

impl<F: Fetch + Sync> Auditor<F> {
    /// Audits `lines` with up to `jobs` fetches in flight.
    ///
    /// Lines are read on the calling thread, which is also the only thread
    /// that records results. The report is finalized after every worker has
    /// exited.
    pub fn run_parallel<I, C>(&self, lines: I, jobs: usize, mut on_result: C) -> Report
    where
        I: IntoIterator<Item = String>,
        C: FnMut(&ValidationResult),
    {
        if jobs <= 1 {
            return self.run(lines, on_result);
        }

        let mut aggregator = Aggregator::new();
        let (work_tx, work_rx) = mpsc::channel::<String>();
        let work_rx = Mutex::new(work_rx);
        let (result_tx, result_rx) = mpsc::channel::<ValidationResult>();

        thread::scope(|scope| {
            for _ in 0..jobs {
                let work_rx = &work_rx;
                let result_tx = result_tx.clone();
                scope.spawn(move || loop {
                    let line = match work_rx.lock() {
                        Ok(rx) => rx.recv(),
                        Err(_) => break,
                    };
                    let Ok(line) = line else { break };
                    if result_tx.send(self.check(&line)).is_err() {
                        break;
                    }
                });
            }
            drop(result_tx);

            for line in lines {
                if work_tx.send(line).is_err() {
                    break;
                }
                while let Ok(result) = result_rx.try_recv() {
                    on_result(&result);
                    aggregator.record(result);
                }
            }
            drop(work_tx);

            for result in result_rx {
                on_result(&result);
                aggregator.record(result);
            }
        });

        finish(aggregator)
    }
}

fn finish(aggregator: Aggregator) -> Report {
    let report = aggregator.finalize();
    info!(
        audited = aggregator.len(),
        valid = report.successes.len(),
        failed = report.failure_count(),
        "audit complete"
    );
    report
}
