// Certificate Classifier - Heuristic detection and expiry classification
//
// Pure function from raw bytes to certificate facts. No I/O. Anything that is
// not recognizable certificate material comes back as None, never as an error.

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use x509_parser::pem::parse_x509_pem;

/// PEM certificate envelope delimiter used by the detection heuristic
const PEM_DELIMITER: &[u8] = b"-----BEGIN CERTIFICATE-----";

/// Certificates expiring within this many days are classified WARNING.
/// Fixed classifier constant, not per-cluster configuration.
pub const WARNING_THRESHOLD_DAYS: i64 = 30;

/// Expiry classification of a certificate at a given evaluation instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CertStatus {
    Ok,
    Warning,
    Expired,
}

impl CertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CertStatus::Ok => "OK",
            CertStatus::Warning => "WARNING",
            CertStatus::Expired => "EXPIRED",
        }
    }
}

impl std::str::FromStr for CertStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OK" => Ok(CertStatus::Ok),
            "WARNING" => Ok(CertStatus::Warning),
            "EXPIRED" => Ok(CertStatus::Expired),
            other => Err(format!("unknown certificate status: {other}")),
        }
    }
}

impl std::fmt::Display for CertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Facts extracted from one successfully parsed certificate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateFacts {
    pub not_valid_before: DateTime<Utc>,
    pub not_valid_after: DateTime<Utc>,
    /// Whole days until expiry, partial days rounded up; negative once expired
    pub days_remaining: i64,
    pub status: CertStatus,
    /// Issuer common name, or "Unknown" if absent
    pub issuer: String,
    /// Subject common name, or "Unknown" if absent
    pub subject: String,
}

/// One step of the ordered detection chain: turn raw bytes into a PEM
/// candidate, or decline. Strategies are tried in order and the first match
/// wins; adding a new encoding means adding a strategy, not restructuring
/// control flow.
trait DetectionStrategy: Sync {
    fn pem_candidate(&self, raw: &[u8]) -> Option<Vec<u8>>;
}

/// Bytes already contain a PEM certificate envelope
struct RawPem;

impl DetectionStrategy for RawPem {
    fn pem_candidate(&self, raw: &[u8]) -> Option<Vec<u8>> {
        contains_pem_delimiter(raw).then(|| raw.to_vec())
    }
}

/// Bytes are a base64 encoding of text containing a PEM envelope
struct Base64Pem;

impl DetectionStrategy for Base64Pem {
    fn pem_candidate(&self, raw: &[u8]) -> Option<Vec<u8>> {
        let compact: Vec<u8> = raw
            .iter()
            .copied()
            .filter(|b| !b.is_ascii_whitespace())
            .collect();
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(&compact)
            .ok()?;
        contains_pem_delimiter(&decoded).then_some(decoded)
    }
}

const DETECTION_CHAIN: &[&dyn DetectionStrategy] = &[&RawPem, &Base64Pem];

fn contains_pem_delimiter(bytes: &[u8]) -> bool {
    bytes
        .windows(PEM_DELIMITER.len())
        .any(|window| window == PEM_DELIMITER)
}

/// Classify one configuration-object value.
///
/// Returns `None` when the bytes are not recognizable certificate material.
/// Malformed PEM, invalid base64 and non-certificate DER all land on `None`;
/// extraction of sibling keys must never be aborted by a parse failure.
pub fn classify(raw: &[u8], now: DateTime<Utc>) -> Option<CertificateFacts> {
    let candidate = DETECTION_CHAIN
        .iter()
        .find_map(|strategy| strategy.pem_candidate(raw))?;
    parse_pem_certificate(&candidate, now)
}

/// Parse PEM text and derive the expiry classification against `now`
fn parse_pem_certificate(pem_text: &[u8], now: DateTime<Utc>) -> Option<CertificateFacts> {
    // Values routinely carry leading key material or comments before the
    // certificate block; start parsing at the envelope.
    let start = pem_text
        .windows(PEM_DELIMITER.len())
        .position(|window| window == PEM_DELIMITER)?;

    let (_, pem) = parse_x509_pem(&pem_text[start..]).ok()?;
    if pem.label != "CERTIFICATE" {
        return None;
    }
    let cert = pem.parse_x509().ok()?;

    let not_valid_before = DateTime::from_timestamp(cert.validity().not_before.timestamp(), 0)?;
    let not_valid_after = DateTime::from_timestamp(cert.validity().not_after.timestamp(), 0)?;

    let (days_remaining, status) = classify_window(not_valid_after, now);

    let subject = common_name(cert.subject());
    let issuer = common_name(cert.issuer());

    Some(CertificateFacts {
        not_valid_before,
        not_valid_after,
        days_remaining,
        status,
        issuer,
        subject,
    })
}

/// Days-remaining and status from the validity end against the evaluation
/// instant. Split out so the threshold arithmetic is testable with synthetic
/// dates.
pub fn classify_window(not_valid_after: DateTime<Utc>, now: DateTime<Utc>) -> (i64, CertStatus) {
    let remaining_secs = (not_valid_after - now).num_seconds();
    let days_remaining = (remaining_secs as f64 / 86_400.0).ceil() as i64;

    let status = if days_remaining < 0 {
        CertStatus::Expired
    } else if days_remaining <= WARNING_THRESHOLD_DAYS {
        CertStatus::Warning
    } else {
        CertStatus::Ok
    };

    (days_remaining, status)
}

fn common_name(name: &x509_parser::x509::X509Name<'_>) -> String {
    name.iter_common_name()
        .next()
        .and_then(|attr| attr.as_str().ok())
        .map(|cn| cn.to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}
