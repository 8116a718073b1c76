//! Revocation evidence: CRLs, OCSP responses and the fetcher that
//! retrieves them from supply points and distribution points.
//!
//! CRLs are decoded with `x509-parser`. OCSP responses arrive already
//! decoded from the transport collaborator as [`OcspResponse`] values; the
//! engine only matches them against the certificate and the TSL.

use crate::cert::{self, Certificate, DistinguishedName};
use crate::QtrustError;
use digest::Digest;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use std::collections::HashMap;
use ::time::{Duration, OffsetDateTime};
use x509_parser::prelude::*;
use x509_parser::revocation_list::CertificateRevocationList;

/// CRL reason code `removeFromCRL` (RFC 5280 Section 5.3.1).
pub const REASON_REMOVE_FROM_CRL: u8 = 8;

/// Parse a PEM-encoded CRL file into DER-encoded CRL data.
pub fn parse_pem_crl(input: &[u8]) -> Result<Vec<Vec<u8>>, QtrustError> {
    let mut crls = Vec::new();
    for pem_result in Pem::iter_from_buffer(input) {
        match pem_result {
            Ok(pem) => {
                if pem.label == "X509 CRL" {
                    crls.push(pem.contents);
                }
            }
            Err(e) => {
                if !crls.is_empty() {
                    break;
                }
                return Err(QtrustError::Pem(format!("failed to parse CRL PEM: {}", e)));
            }
        }
    }
    if crls.is_empty() {
        return Err(QtrustError::Pem("no CRLs found in PEM input".into()));
    }
    Ok(crls)
}

/// Format a CRL revocation reason code as an RFC 5280-style string.
pub fn format_crl_reason(code: u8) -> &'static str {
    match code {
        0 => "unspecified",
        1 => "keyCompromise",
        2 => "cACompromise",
        3 => "affiliationChanged",
        4 => "superseded",
        5 => "cessationOfOperation",
        6 => "certificateHold",
        // 7 is unused per RFC 5280
        8 => "removeFromCRL",
        9 => "privilegeWithdrawn",
        10 => "aACompromise",
        _ => "unspecified",
    }
}

// ── CRL ──────────────────────────────────────────────────────────────────

/// A revoked certificate entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrlEntry {
    pub raw_serial: Vec<u8>,
    pub revocation_date: OffsetDateTime,
    pub reason: Option<u8>,
}

/// A decoded CRL; the DER is kept for signature checks.
#[derive(Debug, Clone)]
pub struct Crl {
    pub issuer: DistinguishedName,
    pub this_update: OffsetDateTime,
    pub next_update: Option<OffsetDateTime>,
    pub entries: Vec<CrlEntry>,
    raw_issuer: Vec<u8>,
    der: Vec<u8>,
}

impl Crl {
    pub fn from_der(der: &[u8]) -> Result<Self, QtrustError> {
        let (_, crl) = CertificateRevocationList::from_der(der)
            .map_err(|e| QtrustError::Der(format!("{}", e)))?;

        let mut entries = Vec::new();
        for revoked in crl.iter_revoked_certificates() {
            entries.push(CrlEntry {
                raw_serial: revoked.raw_serial().to_vec(),
                revocation_date: cert::to_datetime(&revoked.revocation_date)?,
                reason: revoked.reason_code().map(|(_, rc)| rc.0),
            });
        }

        Ok(Crl {
            issuer: cert::build_dn(crl.issuer()),
            this_update: cert::to_datetime(&crl.last_update())?,
            next_update: crl.next_update().as_ref().map(cert::to_datetime).transpose()?,
            entries,
            raw_issuer: crl.issuer().as_raw().to_vec(),
            der: der.to_vec(),
        })
    }

    /// Load a CRL from PEM or DER (auto-detected); PEM uses the first CRL.
    pub fn load(input: &[u8]) -> Result<Self, QtrustError> {
        if crate::util::is_pem(input) {
            let ders = parse_pem_crl(input)?;
            let first = ders
                .first()
                .ok_or_else(|| QtrustError::Pem("no CRLs found in PEM input".into()))?;
            Self::from_der(first)
        } else {
            Self::from_der(input)
        }
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Whether `cert` names this CRL's issuer as its own issuer.
    pub fn is_issuer_of(&self, cert: &Certificate) -> bool {
        self.raw_issuer == cert.raw_issuer
    }

    /// `thisUpdate <= date` and, when present, `nextUpdate >= date`.
    pub fn is_current_at(&self, date: OffsetDateTime) -> bool {
        self.this_update <= date && self.next_update.map_or(true, |next| next >= date)
    }

    /// Verify the CRL signature with a DER SubjectPublicKeyInfo.
    pub fn verify_with_spki(&self, spki_der: &[u8]) -> bool {
        let Ok((_, spki)) = SubjectPublicKeyInfo::from_der(spki_der) else {
            return false;
        };
        match CertificateRevocationList::from_der(&self.der) {
            Ok((_, crl)) => crl.verify_signature(&spki).is_ok(),
            Err(_) => false,
        }
    }

    pub fn entry_for(&self, cert: &Certificate) -> Option<&CrlEntry> {
        self.entries.iter().find(|e| e.raw_serial == cert.raw_serial)
    }
}

/// First CRL issued by the certificate's issuer that is current at `date`.
pub fn crl_for_certificate<'a>(
    cert: &Certificate,
    crls: &'a [Crl],
    date: OffsetDateTime,
) -> Option<&'a Crl> {
    crls.iter()
        .find(|crl| crl.is_issuer_of(cert) && crl.is_current_at(date))
}

// ── OCSP ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OcspResponseStatus {
    Successful,
    MalformedRequest,
    InternalError,
    TryLater,
    SigRequired,
    Unauthorized,
}

/// CertID of an OCSP single response, hashed with SHA-1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcspCertId {
    #[serde(with = "crate::util::hex_bytes")]
    pub issuer_name_hash: Vec<u8>,
    #[serde(with = "crate::util::hex_bytes")]
    pub issuer_key_hash: Vec<u8>,
    #[serde(with = "crate::util::hex_bytes")]
    pub serial: Vec<u8>,
}

impl OcspCertId {
    /// Build the CertID of `cert` given its issuer's public key bits.
    pub fn new(cert: &Certificate, issuer_key_bits: &[u8]) -> Self {
        OcspCertId {
            issuer_name_hash: Sha1::digest(&cert.raw_issuer).to_vec(),
            issuer_key_hash: Sha1::digest(issuer_key_bits).to_vec(),
            serial: cert.raw_serial.clone(),
        }
    }

    /// Match on serial and issuer name; the key hash is checked when known.
    pub fn identifies(&self, cert: &Certificate, issuer_key_bits: Option<&[u8]>) -> bool {
        if self.serial != cert.raw_serial
            || self.issuer_name_hash.as_slice() != Sha1::digest(&cert.raw_issuer).as_slice()
        {
            return false;
        }
        issuer_key_bits.map_or(true, |bits| {
            self.issuer_key_hash.as_slice() == Sha1::digest(bits).as_slice()
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum OcspCertStatus {
    Good,
    #[serde(rename_all = "camelCase")]
    Revoked {
        #[serde(with = "::time::serde::rfc3339")]
        revocation_time: OffsetDateTime,
        #[serde(default)]
        reason: Option<u8>,
    },
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcspSingleResponse {
    pub cert_id: OcspCertId,
    pub cert_status: OcspCertStatus,
    #[serde(with = "::time::serde::rfc3339")]
    pub this_update: OffsetDateTime,
    #[serde(default, with = "::time::serde::rfc3339::option")]
    pub next_update: Option<OffsetDateTime>,
}

impl OcspSingleResponse {
    /// `thisUpdate - tolerance <= date <= nextUpdate + tolerance`.
    pub fn is_current_at(&self, date: OffsetDateTime, tolerance: Duration) -> bool {
        if self.this_update - tolerance > date {
            return false;
        }
        self.next_update.map_or(true, |next| next + tolerance >= date)
    }
}

/// A basic OCSP response as delivered by the transport collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcspResponse {
    pub response_status: OcspResponseStatus,
    /// DER certificate whose key signed the response, if it was included.
    #[serde(default, with = "opt_base64_der")]
    pub signer_certificate: Option<Vec<u8>>,
    #[serde(default)]
    pub responses: Vec<OcspSingleResponse>,
}

impl OcspResponse {
    /// Reject responses that cannot be evaluated at all.
    pub fn check_well_formed(&self) -> Result<(), QtrustError> {
        if self.response_status != OcspResponseStatus::Successful {
            return Err(QtrustError::validation_failed(format!(
                "OCSP response status is {:?}",
                self.response_status
            )));
        }
        if self.responses.is_empty() {
            return Err(QtrustError::validation_failed(
                "OCSP response has no single responses",
            ));
        }
        for single in &self.responses {
            if single.next_update.is_some_and(|next| next < single.this_update) {
                return Err(QtrustError::validation_failed(
                    "OCSP single response nextUpdate precedes thisUpdate",
                ));
            }
        }
        Ok(())
    }

    pub fn single_response_for(
        &self,
        cert: &Certificate,
        issuer_key_bits: Option<&[u8]>,
    ) -> Option<&OcspSingleResponse> {
        self.responses
            .iter()
            .find(|r| r.cert_id.identifies(cert, issuer_key_bits))
    }

    pub fn signer(&self) -> Option<Certificate> {
        self.signer_certificate
            .as_deref()
            .and_then(|der| cert::parse_der(der).ok())
    }
}

mod opt_base64_der {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(b) => crate::util::base64_der::serialize(b, s),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        #[derive(Deserialize)]
        struct Wrapper(#[serde(with = "crate::util::base64_der")] Vec<u8>);
        Ok(Option::<Wrapper>::deserialize(d)?.map(|Wrapper(v)| v))
    }
}

/// Select the OCSP response answering for `cert`.
///
/// Every response is checked for well-formedness first.
pub fn ocsp_response_for_certificate<'a>(
    cert: &Certificate,
    responses: &'a [OcspResponse],
) -> Result<Option<&'a OcspResponse>, QtrustError> {
    for response in responses {
        response.check_well_formed()?;
    }
    Ok(responses
        .iter()
        .find(|r| r.single_response_for(cert, None).is_some()))
}

// ── Evidence and fetching ────────────────────────────────────────────────

/// The revocation evidence a result was decided on.
#[derive(Debug, Clone)]
pub enum RevocationEvidence {
    Crl(Crl),
    Ocsp(OcspResponse),
}

/// Retrieves revocation evidence from a URL.
///
/// Timeouts and transport policy belong to the implementation. `Ok(None)`
/// means nothing usable was found at the URL.
pub trait RevocationFetcher: Send + Sync {
    fn fetch_crl(&self, url: &str) -> Result<Option<Crl>, QtrustError>;

    fn fetch_ocsp(&self, url: &str, cert_id: &OcspCertId)
        -> Result<Option<OcspResponse>, QtrustError>;
}

/// Fetcher answering from preloaded evidence keyed by URL.
#[derive(Debug, Clone, Default)]
pub struct MemoryFetcher {
    crls: HashMap<String, Crl>,
    ocsp: HashMap<String, OcspResponse>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_crl(mut self, url: impl Into<String>, crl: Crl) -> Self {
        self.crls.insert(url.into(), crl);
        self
    }

    pub fn with_ocsp(mut self, url: impl Into<String>, response: OcspResponse) -> Self {
        self.ocsp.insert(url.into(), response);
        self
    }
}

impl RevocationFetcher for MemoryFetcher {
    fn fetch_crl(&self, url: &str) -> Result<Option<Crl>, QtrustError> {
        Ok(self.crls.get(url).cloned())
    }

    fn fetch_ocsp(
        &self,
        url: &str,
        _cert_id: &OcspCertId,
    ) -> Result<Option<OcspResponse>, QtrustError> {
        Ok(self.ocsp.get(url).cloned())
    }
}
