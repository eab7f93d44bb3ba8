//! Per-URL results and their aggregation into an ordered report.

use crate::certificate::LeafCertificate;
use crate::error::AuditError;
use serde::{Serialize, Serializer};
use std::fmt;

/// Separator between the fields of the composite sort key.
const KEY_SEPARATOR: &str = ",";

/// A URL whose leaf certificate was fetched and validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Success {
    pub source_url: String,
    pub certificate: LeafCertificate,
    pub time_remaining: String,
}

impl Success {
    /// The report columns, in order: expires, toExpiry, URL, serialNumber, issuerCN.
    pub fn fields(&self) -> [String; 5] {
        [
            self.certificate.expiry_date(),
            self.time_remaining.clone(),
            self.source_url.clone(),
            self.certificate.serial_number.clone(),
            self.certificate.issuer_common_name.clone(),
        ]
    }

    /// Composite key ordering successes by expiry date, then bucket, URL,
    /// serial number and issuer.
    pub fn sort_key(&self) -> String {
        self.fields().join(KEY_SEPARATOR)
    }
}

/// A URL that produced no usable leaf certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub source_url: String,
    pub error: AuditError,
}

impl Failure {
    pub fn reason(&self) -> String {
        self.error.to_string()
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl Serialize for Failure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("Failure", 3)?;
        state.serialize_field("source_url", &self.source_url)?;
        state.serialize_field("kind", self.error.kind())?;
        state.serialize_field("reason", &self.reason())?;
        state.end()
    }
}

/// Outcome of auditing one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Success(Success),
    Failure(Failure),
}

impl ValidationResult {
    pub fn source_url(&self) -> &str {
        match self {
            ValidationResult::Success(success) => &success.source_url,
            ValidationResult::Failure(failure) => &failure.source_url,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ValidationResult::Success(_))
    }
}

/// Finalized audit results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    /// Sorted by `Success::sort_key`
    pub successes: Vec<Success>,
    /// In the order they occurred
    pub failures: Vec<Failure>,
}

impl Report {
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.successes.is_empty() && self.failures.is_empty()
    }
}

/// Collects results as they arrive.
#[derive(Debug, Default)]
pub struct Aggregator {
    successes: Vec<Success>,
    failures: Vec<Failure>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: ValidationResult) {
        match result {
            ValidationResult::Success(success) => self.successes.push(success),
            ValidationResult::Failure(failure) => self.failures.push(failure),
        }
    }

    pub fn len(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Builds the report. Sorting is stable, so calling this repeatedly on the
    /// same records gives the same report.
    pub fn finalize(&self) -> Report {
        let mut successes: Vec<(String, Success)> = self
            .successes
            .iter()
            .map(|success| (success.sort_key(), success.clone()))
            .collect();
        successes.sort_by(|(a, _), (b, _)| a.cmp(b));

        Report {
            successes: successes.into_iter().map(|(_, success)| success).collect(),
            failures: self.failures.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn success(
        url: &str,
        ymd: (i32, u32, u32),
        bucket: &str,
        serial: &str,
        issuer: &str,
    ) -> ValidationResult {
        ValidationResult::Success(Success {
            source_url: url.to_string(),
            certificate: LeafCertificate {
                not_after: Utc.with_ymd_and_hms(ymd.0, ymd.1, ymd.2, 12, 0, 0).unwrap(),
                serial_number: serial.to_string(),
                issuer_common_name: issuer.to_string(),
            },
            time_remaining: bucket.to_string(),
        })
    }

    fn failure(url: &str) -> ValidationResult {
        ValidationResult::Failure(Failure {
            source_url: url.to_string(),
            error: AuditError::Scheme {
                url: url.to_string(),
                scheme: "http".to_string(),
            },
        })
    }

    #[test]
    fn test_sort_key() {
        let result = success("https://a.example", (2025, 1, 9), "3w", "17", "R3");
        let ValidationResult::Success(s) = result else {
            unreachable!()
        };
        assert_eq!(s.sort_key(), "2025-01-09,3w,https://a.example,17,R3");
    }

    #[test]
    fn test_finalize_orders_by_expiry_then_ties() {
        let mut aggregator = Aggregator::new();
        aggregator.record(success("https://late.example", (2026, 5, 1), "1y", "1", "R3"));
        aggregator.record(success("https://b.example", (2025, 2, 1), "3w", "9", "R3"));
        aggregator.record(success("https://a.example", (2025, 2, 1), "3w", "9", "R3"));
        aggregator.record(success("https://a.example", (2025, 2, 1), "3w", "10", "E1"));
        aggregator.record(success("https://soon.example", (2025, 1, 12), "2d", "5", "R3"));

        let report = aggregator.finalize();
        let order: Vec<(&str, &str)> = report
            .successes
            .iter()
            .map(|s| (s.source_url.as_str(), s.certificate.serial_number.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("https://soon.example", "5"),
                ("https://a.example", "10"),
                ("https://a.example", "9"),
                ("https://b.example", "9"),
                ("https://late.example", "1"),
            ]
        );

        for pair in report.successes.windows(2) {
            assert!(pair[0].sort_key() <= pair[1].sort_key());
        }
    }

    #[test]
    fn test_finalize_is_idempotent() {
        let mut aggregator = Aggregator::new();
        aggregator.record(success("https://b.example", (2025, 3, 1), "8w", "2", "R3"));
        aggregator.record(success("https://a.example", (2025, 3, 1), "8w", "2", "R3"));
        aggregator.record(failure("http://c.example"));

        let first = aggregator.finalize();
        let second = aggregator.finalize();
        assert_eq!(first, second);
    }

    #[test]
    fn test_failures_keep_occurrence_order() {
        let mut aggregator = Aggregator::new();
        aggregator.record(failure("http://z.example"));
        aggregator.record(success("https://a.example", (2025, 3, 1), "8w", "2", "R3"));
        aggregator.record(failure("http://a.example"));

        let report = aggregator.finalize();
        assert_eq!(aggregator.len(), 3);
        assert_eq!(report.successes.len(), 1);
        assert_eq!(report.failure_count(), 2);
        assert_eq!(report.failures[0].source_url, "http://z.example");
        assert_eq!(report.failures[1].source_url, "http://a.example");
    }

    #[test]
    fn test_failure_serializes_reason() {
        let ValidationResult::Failure(f) = failure("http://a.example") else {
            unreachable!()
        };
        let json = serde_json::to_value(&f).unwrap();
        assert_eq!(json["kind"], "scheme");
        assert_eq!(json["reason"], "\"http://a.example\": url scheme not https");
    }
}
