//! Fetching and validating the certificate chain of an endpoint.
//!
//! Trust decisions are left to OpenSSL: peer verification is on, the trust
//! anchors are the platform's default CA set and the hostname is checked
//! against the endpoint. A connection that survives the handshake therefore
//! carries a chain that is valid right now.

use crate::certificate::LeafCertificate;
use crate::endpoint::Endpoint;
use crate::error::{AuditError, TlsError};
use openssl::ssl::{SslConnector, SslMethod, SslStream};
use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::debug;

/// Connect bound applied to every fetch unless configured otherwise.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

const LEAF_INDEX: usize = 0;

/// Source of validated leaf certificates.
pub trait Fetch {
    fn fetch(&self, endpoint: &Endpoint) -> Result<LeafCertificate, AuditError>;
}

/// Fetches certificates over a live TLS connection.
pub struct TlsFetcher {
    connector: SslConnector,
    timeout: Duration,
}

impl TlsFetcher {
    /// Creates a fetcher trusting the platform's default certificate authorities.
    ///
    /// Fails before any endpoint is contacted if the trust store cannot be
    /// loaded.
    pub fn new(timeout: Duration) -> Result<TlsFetcher, TlsError> {
        let platform = openssl_probe::probe();
        let connector =
            Self::connector(platform.cert_file.as_deref(), platform.cert_dir.as_deref())?;
        Ok(TlsFetcher { connector, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn connector(
        cert_file: Option<&Path>,
        cert_dir: Option<&Path>,
    ) -> Result<SslConnector, TlsError> {
        // The builder already loads OpenSSL's compiled-in default paths. A
        // vendored OpenSSL compiles in paths that rarely hold the platform
        // store, so the located bundle and directory are added on top.
        let mut builder = SslConnector::builder(SslMethod::tls_client())?;
        if cert_file.is_some() || cert_dir.is_some() {
            builder
                .load_verify_locations(cert_file, cert_dir)
                .map_err(TlsError::TrustStore)?;
        }
        Ok(builder.build())
    }

    /// Opens a TCP connection, sharing one deadline across every resolved address.
    fn connect(&self, endpoint: &Endpoint) -> Result<TcpStream, AuditError> {
        let addresses: Vec<SocketAddr> = (endpoint.host.as_str(), endpoint.port)
            .to_socket_addrs()
            .map_err(|e| AuditError::handshake(endpoint, e))?
            .collect();
        if addresses.is_empty() {
            return Err(AuditError::handshake(endpoint, "no addresses found"));
        }

        let deadline = Instant::now() + self.timeout;
        let mut last_error: Option<io::Error> = None;
        for address in addresses {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match TcpStream::connect_timeout(&address, remaining) {
                Ok(stream) => {
                    let remaining = deadline
                        .saturating_duration_since(Instant::now())
                        .max(Duration::from_millis(1));
                    stream
                        .set_read_timeout(Some(remaining))
                        .and_then(|_| stream.set_write_timeout(Some(remaining)))
                        .map_err(|e| AuditError::handshake(endpoint, e))?;
                    return Ok(stream);
                }
                Err(e) => {
                    debug!(%endpoint, %address, error = %e, "connect failed");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if e.kind() != io::ErrorKind::TimedOut && Instant::now() < deadline => {
                Err(AuditError::handshake(endpoint, e))
            }
            _ => Err(AuditError::ConnectTimeout {
                endpoint: endpoint.to_string(),
                timeout: self.timeout,
            }),
        }
    }

    fn handshake(
        &self,
        endpoint: &Endpoint,
        tcp: TcpStream,
    ) -> Result<SslStream<TcpStream>, TlsError> {
        let stream = self.connector.connect(&endpoint.host, tcp)?;
        Ok(stream)
    }
}

impl Fetch for TlsFetcher {
    fn fetch(&self, endpoint: &Endpoint) -> Result<LeafCertificate, AuditError> {
        let tcp = self.connect(endpoint)?;
        let stream = self
            .handshake(endpoint, tcp)
            .map_err(|e| AuditError::handshake(endpoint, e))?;

        let leaf = stream
            .ssl()
            .peer_cert_chain()
            .and_then(|chain| chain.get(LEAF_INDEX))
            .ok_or_else(|| TlsError::Certificate("no peer certificate".to_string()))
            .and_then(LeafCertificate::from_x509)
            .map_err(|e| AuditError::handshake(endpoint, e));

        // Dropping the stream closes the socket, whatever the extraction outcome.
        drop(stream);

        if let Ok(cert) = &leaf {
            debug!(
                %endpoint,
                serial = %cert.serial_number,
                not_after = %cert.not_after,
                "fetched leaf certificate"
            );
        }
        leaf
    }
}
