//! HTTPS URL to connectable endpoint resolution.

use crate::error::AuditError;
use std::fmt;
use url::{Host, Url};

/// Port used when a URL does not name one.
pub const HTTPS_PORT: u16 = 443;

/// A host and port ready for a TCP connect.
///
/// `host` never carries IPv6 brackets; `Display` adds them back so the
/// rendered form is always a valid `host:port`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Endpoint {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Parses `line` as an HTTPS URL and returns the endpoint it points at.
///
/// # Errors
///
/// * `AuditError::Scheme` - the scheme is not `https`, or there is no scheme
/// * `AuditError::Parse` - anything else the URL parser rejects, including a
///   missing host or a malformed port
pub fn resolve(line: &str) -> Result<Endpoint, AuditError> {
    let url = match Url::parse(line) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            return Err(AuditError::Scheme {
                url: line.to_string(),
                scheme: String::new(),
            })
        }
        Err(e) => {
            return Err(AuditError::Parse {
                url: line.to_string(),
                details: e.to_string(),
            })
        }
    };

    if url.scheme() != "https" {
        return Err(AuditError::Scheme {
            url: line.to_string(),
            scheme: url.scheme().to_string(),
        });
    }

    let host = match url.host() {
        Some(Host::Domain(domain)) if !domain.is_empty() => domain.to_string(),
        Some(Host::Ipv4(addr)) => addr.to_string(),
        Some(Host::Ipv6(addr)) => addr.to_string(),
        _ => {
            return Err(AuditError::Parse {
                url: line.to_string(),
                details: "missing host".to_string(),
            })
        }
    };
    let port = url.port_or_known_default().unwrap_or(HTTPS_PORT);

    Ok(Endpoint { host, port })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_port() {
        let endpoint = resolve("https://example.com").unwrap();
        assert_eq!(endpoint, Endpoint::new("example.com", 443));
        assert_eq!(endpoint.to_string(), "example.com:443");
    }

    #[test]
    fn test_explicit_port_and_path() {
        let endpoint = resolve("https://example.com:8443/status?full=1").unwrap();
        assert_eq!(endpoint.to_string(), "example.com:8443");

        let endpoint = resolve("https://example.com:443/").unwrap();
        assert_eq!(endpoint.port, 443);
    }

    #[test]
    fn test_ip_hosts() {
        assert_eq!(
            resolve("https://127.0.0.1:9443").unwrap().to_string(),
            "127.0.0.1:9443"
        );

        let endpoint = resolve("https://[::1]/").unwrap();
        assert_eq!(endpoint.host, "::1");
        assert_eq!(endpoint.to_string(), "[::1]:443");
    }

    #[test]
    fn test_non_https_schemes() {
        for line in ["http://example.com", "ftp://example.com/file", "example.com"] {
            match resolve(line) {
                Err(AuditError::Scheme { url, .. }) => assert_eq!(url, line),
                other => panic!("expected scheme error for {}, got {:?}", line, other),
            }
        }
    }

    #[test]
    fn test_scheme_error_names_scheme() {
        match resolve("http://example.com") {
            Err(AuditError::Scheme { scheme, .. }) => assert_eq!(scheme, "http"),
            other => panic!("expected scheme error, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_port() {
        for line in ["https://example.com:https", "https://example.com:70000"] {
            assert!(
                matches!(resolve(line), Err(AuditError::Parse { .. })),
                "{} should not parse",
                line
            );
        }
    }

    #[test]
    fn test_missing_host() {
        assert!(matches!(
            resolve("https://"),
            Err(AuditError::Parse { .. })
        ));
    }
}
