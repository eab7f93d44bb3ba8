use crate::error::TlsError;
use chrono::{DateTime, Utc};
use openssl::asn1::{Asn1Time, Asn1TimeRef};
use openssl::nid::Nid;
use openssl::x509::X509Ref;
use serde::{Deserialize, Serialize};

/// The details kept from a validated leaf certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafCertificate {
    /// End of the validity period
    pub not_after: DateTime<Utc>,
    /// Serial number in decimal; serials are arbitrary-precision integers
    pub serial_number: String,
    /// Common name of the issuing CA, empty if the issuer has none
    pub issuer_common_name: String,
}

impl LeafCertificate {
    pub fn from_x509(cert: &X509Ref) -> Result<LeafCertificate, TlsError> {
        let issuer_common_name = match cert
            .issuer_name()
            .entries_by_nid(Nid::COMMONNAME)
            .next()
        {
            Some(entry) => entry.data().to_string()?,
            None => String::new(),
        };

        Ok(LeafCertificate {
            not_after: to_utc(cert.not_after())?,
            serial_number: cert.serial_number().to_bn()?.to_dec_str()?.to_string(),
            issuer_common_name,
        })
    }

    /// Expiry date as `YYYY-MM-DD`, which sorts chronologically.
    pub fn expiry_date(&self) -> String {
        self.not_after.format("%Y-%m-%d").to_string()
    }
}

fn to_utc(time: &Asn1TimeRef) -> Result<DateTime<Utc>, TlsError> {
    let diff = Asn1Time::from_unix(0)?.diff(time)?;
    let secs = i64::from(diff.days) * 86_400 + i64::from(diff.secs);
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| TlsError::Certificate(format!("notAfter out of range: {}", time)))
}
