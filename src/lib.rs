//! Lists the TLS certificates of HTTPS endpoints in the order they will expire.
//!
//! Each URL is resolved to an endpoint, its certificate chain is fetched and
//! validated against the platform's trusted certificate authorities, and the
//! leaf certificate's expiry, serial number and issuer are reported. Results
//! are sorted so the certificate that expires first is listed first.
//!
//! ```no_run
//! use lscerts::{Auditor, TlsFetcher, DEFAULT_CONNECT_TIMEOUT};
//!
//! let auditor = Auditor::new(TlsFetcher::new(DEFAULT_CONNECT_TIMEOUT)?);
//! let urls = vec!["https://www.rust-lang.org".to_string()];
//! let report = auditor.run(urls, |_| {});
//! for success in &report.successes {
//!     println!("{} expires in {}", success.source_url, success.time_remaining);
//! }
//! # Ok::<(), lscerts::TlsError>(())
//! ```

pub mod audit;
pub mod certificate;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod expiry;
pub mod fetch;
pub mod input;
pub mod metrics;
pub mod output;
pub mod report;

pub use audit::Auditor;
pub use certificate::LeafCertificate;
pub use endpoint::{resolve, Endpoint};
pub use error::{AuditError, TlsError};
pub use expiry::{classify, TimeToExpiry};
pub use fetch::{Fetch, TlsFetcher, DEFAULT_CONNECT_TIMEOUT};
pub use report::{Aggregator, Failure, Report, Success, ValidationResult};
