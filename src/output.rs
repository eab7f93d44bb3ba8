//! Rendering a finalized report.

use crate::input::COMMENT;
use crate::report::Report;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, ContentArrangement, Table};
use std::io::{self, Write};
use strum_macros::{Display, EnumString};

/// Column names of the report, in field order.
pub const COLUMNS: [&str; 5] = ["expires", "toExpiry", "URL", "serialNumber", "issuerCN"];

/// Supported report formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OutputFormat {
    /// Comma separated, one certificate per line
    #[default]
    Csv,
    /// Pretty printed JSON with successes and failures
    Json,
    /// Human readable table
    Table,
}

/// Writes `report` to `out`.
///
/// `header` only affects CSV and table output. The CSV header is written
/// as a comment line and only when there is at least one certificate.
pub fn write_report<W: Write>(
    out: &mut W,
    report: &Report,
    format: OutputFormat,
    header: bool,
) -> io::Result<()> {
    match format {
        OutputFormat::Csv => write_csv(out, report, header),
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, report)?;
            writeln!(out)
        }
        OutputFormat::Table => {
            if !report.successes.is_empty() {
                writeln!(out, "{}", table(report, header))?;
            }
            Ok(())
        }
    }
}

fn write_csv<W: Write>(out: &mut W, report: &Report, header: bool) -> io::Result<()> {
    if report.successes.is_empty() {
        return Ok(());
    }
    if header {
        writeln!(out, "{} {}", COMMENT, COLUMNS.join(","))?;
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(&mut *out);
    for success in &report.successes {
        writer.write_record(success.fields()).map_err(io::Error::other)?;
    }
    writer.flush()
}

fn table(report: &Report, header: bool) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    if header {
        table.set_header(
            COLUMNS
                .iter()
                .map(|column| Cell::new(column).add_attribute(Attribute::Bold)),
        );
    }
    for success in &report.successes {
        table.add_row(success.fields());
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::LeafCertificate;
    use crate::error::AuditError;
    use crate::report::{Failure, Success};
    use chrono::{TimeZone, Utc};
    use std::str::FromStr;

    fn report() -> Report {
        Report {
            successes: vec![
                Success {
                    source_url: "https://b.example".to_string(),
                    certificate: LeafCertificate {
                        not_after: Utc.with_ymd_and_hms(2025, 1, 20, 23, 59, 59).unwrap(),
                        serial_number: "1234567890123456789012345".to_string(),
                        issuer_common_name: "R11".to_string(),
                    },
                    time_remaining: "3w".to_string(),
                },
                Success {
                    source_url: "https://a.example:8443/".to_string(),
                    certificate: LeafCertificate {
                        not_after: Utc.with_ymd_and_hms(2025, 3, 2, 0, 0, 0).unwrap(),
                        serial_number: "42".to_string(),
                        issuer_common_name: "Example CA, Inc.".to_string(),
                    },
                    time_remaining: "9w".to_string(),
                },
            ],
            failures: vec![Failure {
                source_url: "http://c.example".to_string(),
                error: AuditError::Scheme {
                    url: "http://c.example".to_string(),
                    scheme: "http".to_string(),
                },
            }],
        }
    }

    fn render(report: &Report, format: OutputFormat, header: bool) -> String {
        let mut out = Vec::new();
        write_report(&mut out, report, format, header).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_csv_with_header() {
        assert_eq!(
            render(&report(), OutputFormat::Csv, true),
            "# expires,toExpiry,URL,serialNumber,issuerCN\n\
             2025-01-20,3w,https://b.example,1234567890123456789012345,R11\n\
             2025-03-02,9w,https://a.example:8443/,42,\"Example CA, Inc.\"\n"
        );
    }

    #[test]
    fn test_csv_without_header() {
        let csv = render(&report(), OutputFormat::Csv, false);
        assert!(csv.starts_with("2025-01-20,3w,"));
    }

    #[test]
    fn test_no_header_when_nothing_valid() {
        let mut report = report();
        report.successes.clear();
        assert_eq!(render(&report, OutputFormat::Csv, true), "");
        assert_eq!(render(&report, OutputFormat::Table, true), "");
    }

    #[test]
    fn test_json() {
        let json: serde_json::Value =
            serde_json::from_str(&render(&report(), OutputFormat::Json, true)).unwrap();
        assert_eq!(json["successes"][0]["source_url"], "https://b.example");
        assert_eq!(json["successes"][0]["certificate"]["issuer_common_name"], "R11");
        assert_eq!(json["successes"][1]["time_remaining"], "9w");
        assert_eq!(json["failures"][0]["kind"], "scheme");
    }

    #[test]
    fn test_table() {
        let table = render(&report(), OutputFormat::Table, true);
        assert!(table.contains("toExpiry"));
        assert!(table.contains("https://b.example"));
        assert!(table.contains("1234567890123456789012345"));
    }

    #[test]
    fn test_format_names() {
        for (name, format) in [
            ("csv", OutputFormat::Csv),
            ("json", OutputFormat::Json),
            ("table", OutputFormat::Table),
        ] {
            assert_eq!(format.to_string(), name);
            assert_eq!(OutputFormat::from_str(name).unwrap(), format);
        }
        assert_eq!(OutputFormat::from_str("JSON").unwrap(), OutputFormat::Json);
        assert!(OutputFormat::from_str("xml").is_err());
    }
}
