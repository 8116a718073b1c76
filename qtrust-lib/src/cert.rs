//! Certificate parsing from PEM and DER formats, and extraction of the
//! fields the validator and the mapping calculator work on.

use crate::oid;
use crate::util;
use crate::QtrustError;
use serde::Serialize;
use ::time::format_description::well_known::Rfc3339;
use ::time::OffsetDateTime;
use x509_parser::prelude::*;

/// Distinguished name with ordered components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistinguishedName {
    /// Ordered list of (attribute_type, value) pairs.
    /// Attribute types use short names where known (e.g., "CN", "O", "C").
    pub components: Vec<(String, String)>,
}

impl DistinguishedName {
    /// Format as a comma-separated one-line string, e.g. "C=ES, O=Org, CN=Name".
    ///
    /// Values containing commas, equals signs, or backslashes are escaped.
    pub fn to_oneline(&self) -> String {
        let mut result = String::new();
        for (i, (k, v)) in self.components.iter().enumerate() {
            if i > 0 {
                result.push_str(", ");
            }
            result.push_str(k);
            result.push('=');
            for ch in v.chars() {
                match ch {
                    '\\' => result.push_str("\\\\"),
                    ',' => result.push_str("\\,"),
                    '=' => result.push_str("\\="),
                    _ => result.push(ch),
                }
            }
        }
        result
    }

    /// Parse a textual DN such as `CN=Name, O=Org, C=ES`.
    ///
    /// Accepts `\`-escaped separators and optional spaces around `=`.
    /// Returns `None` when a component lacks an `=`.
    pub fn parse(text: &str) -> Option<Self> {
        let mut components = Vec::new();
        let mut current = String::new();
        let mut parts = Vec::new();
        let mut chars = text.chars();
        while let Some(ch) = chars.next() {
            match ch {
                '\\' => {
                    current.push('\\');
                    if let Some(next) = chars.next() {
                        current.push(next);
                    }
                }
                ',' | ';' => parts.push(std::mem::take(&mut current)),
                _ => current.push(ch),
            }
        }
        parts.push(current);

        for part in parts.iter().filter(|p| !p.trim().is_empty()) {
            let (key, value) = split_unescaped_eq(part)?;
            components.push((normalize_attr_name(key.trim()), unescape(value.trim())));
        }
        Some(DistinguishedName { components })
    }

    /// Canonical form used to compare names: case-folded, order-independent.
    pub fn canonical(&self) -> String {
        let mut parts: Vec<String> = self
            .components
            .iter()
            .map(|(k, v)| {
                format!(
                    "{}={}",
                    k.to_ascii_lowercase(),
                    v.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
                )
            })
            .collect();
        parts.sort();
        parts.join(",")
    }

    /// First value for an attribute short name (e.g. "CN").
    pub fn get(&self, attr: &str) -> Option<&str> {
        self.components
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(attr))
            .map(|(_, v)| v.as_str())
    }
}

impl std::fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_oneline())
    }
}

fn split_unescaped_eq(part: &str) -> Option<(&str, &str)> {
    let mut escaped = false;
    for (i, ch) in part.char_indices() {
        match ch {
            '\\' if !escaped => escaped = true,
            '=' if !escaped => return Some((part.get(..i)?, part.get(i + 1..)?)),
            _ => escaped = false,
        }
    }
    None
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(ch);
        }
    }
    out
}

fn normalize_attr_name(key: &str) -> String {
    match key.to_ascii_uppercase().as_str() {
        "CN" | "COMMONNAME" => "CN".into(),
        "C" | "COUNTRYNAME" => "C".into(),
        "O" | "ORGANIZATIONNAME" => "O".into(),
        "OU" | "ORGANIZATIONALUNITNAME" => "OU".into(),
        "L" | "LOCALITYNAME" => "L".into(),
        "ST" | "S" | "STATEORPROVINCENAME" => "ST".into(),
        "SN" | "SURNAME" => "SN".into(),
        "GN" | "GIVENNAME" => "GN".into(),
        "SERIALNUMBER" => "serialNumber".into(),
        "E" | "EMAILADDRESS" => "emailAddress".into(),
        "ORGANIZATIONIDENTIFIER" => "organizationIdentifier".into(),
        _ => util::oid_short_name(key),
    }
}

/// An AuthorityInfoAccess entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AiaEntry {
    pub method: String,
    pub location: String,
}

/// Certificate fields that a *simple* mapping association can extract,
/// keyed by their stable numeric identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CertField {
    Version = 0,
    Subject = 1,
    Issuer = 2,
    SerialNumber = 3,
    SignatureAlgorithmName = 4,
    SignatureAlgorithmOid = 5,
    ValidFrom = 6,
    ValidTo = 7,
    PolicyOids = 8,
    QcStatementOids = 9,
    QcEuTypeOids = 10,
    SubjectAltName = 11,
    IsCa = 12,
    KeyUsage = 13,
    CrlDistributionPoints = 14,
    AuthorityInformationAccess = 15,
}

impl CertField {
    pub fn from_id(id: u32) -> Option<Self> {
        Some(match id {
            0 => CertField::Version,
            1 => CertField::Subject,
            2 => CertField::Issuer,
            3 => CertField::SerialNumber,
            4 => CertField::SignatureAlgorithmName,
            5 => CertField::SignatureAlgorithmOid,
            6 => CertField::ValidFrom,
            7 => CertField::ValidTo,
            8 => CertField::PolicyOids,
            9 => CertField::QcStatementOids,
            10 => CertField::QcEuTypeOids,
            11 => CertField::SubjectAltName,
            12 => CertField::IsCa,
            13 => CertField::KeyUsage,
            14 => CertField::CrlDistributionPoints,
            15 => CertField::AuthorityInformationAccess,
            _ => return None,
        })
    }
}

/// A parsed X.509 certificate with the fields needed for trust validation.
#[derive(Debug, Clone, Serialize)]
pub struct Certificate {
    /// Certificate version (1, 2, or 3).
    pub version: u32,
    /// Serial number as a colon-separated hex string.
    pub serial: String,
    pub signature_algorithm: String,
    pub signature_algorithm_oid: String,
    pub issuer: DistinguishedName,
    pub subject: DistinguishedName,
    #[serde(with = "::time::serde::rfc3339")]
    pub not_before: OffsetDateTime,
    #[serde(with = "::time::serde::rfc3339")]
    pub not_after: OffsetDateTime,
    /// Basic Constraints cA flag, if the extension is present.
    pub is_ca: Option<bool>,
    /// Key usage bit names as in RFC 5280 (e.g. "nonRepudiation").
    pub key_usage: Vec<String>,
    pub subject_alt_names: Vec<String>,
    pub crl_distribution_points: Vec<String>,
    pub authority_info_access: Vec<AiaEntry>,
    pub policy_oids: Vec<String>,
    #[serde(skip)]
    pub(crate) subject_key_id: Option<Vec<u8>>,
    #[serde(skip)]
    pub(crate) authority_key_id: Option<Vec<u8>>,
    /// Raw value of the QcStatements extension, decoded lazily by the analyzer.
    #[serde(skip)]
    pub(crate) qc_statements_der: Option<Vec<u8>>,
    #[serde(skip)]
    pub(crate) raw_serial: Vec<u8>,
    #[serde(skip)]
    pub(crate) raw_issuer: Vec<u8>,
    #[serde(skip)]
    pub(crate) raw_subject: Vec<u8>,
    /// subjectPublicKey BIT STRING contents (for OCSP key hashes).
    #[serde(skip)]
    pub(crate) public_key_bits: Vec<u8>,
    #[serde(skip)]
    pub(crate) raw_der: Vec<u8>,
}

impl Certificate {
    /// The DER encoding of the certificate.
    pub fn der(&self) -> &[u8] {
        &self.raw_der
    }

    pub fn subject_key_id(&self) -> Option<&[u8]> {
        self.subject_key_id.as_deref()
    }

    pub fn authority_key_id(&self) -> Option<&[u8]> {
        self.authority_key_id.as_deref()
    }

    pub fn is_self_issued(&self) -> bool {
        self.raw_subject == self.raw_issuer
    }

    /// OCSP responder URLs from the AIA extension.
    pub fn ocsp_urls(&self) -> Vec<&str> {
        self.authority_info_access
            .iter()
            .filter(|a| a.method == "OCSP")
            .map(|a| a.location.as_str())
            .collect()
    }

    /// Re-borrow the parsed form, e.g. for signature checks.
    pub(crate) fn x509(&self) -> Result<X509Certificate<'_>, QtrustError> {
        X509Certificate::from_der(&self.raw_der)
            .map(|(_, c)| c)
            .map_err(|e| QtrustError::Der(format!("{}", e)))
    }

    /// Render a certificate field as a string. Empty values yield `None`.
    ///
    /// QcStatement-derived fields decode the QcStatements extension; a
    /// malformed extension yields `None` rather than an error.
    pub fn field(&self, field: CertField) -> Option<String> {
        let value = match field {
            CertField::Version => Some(self.version.to_string()),
            CertField::Subject => Some(self.subject.to_oneline()),
            CertField::Issuer => Some(self.issuer.to_oneline()),
            CertField::SerialNumber => Some(self.serial.clone()),
            CertField::SignatureAlgorithmName => Some(self.signature_algorithm.clone()),
            CertField::SignatureAlgorithmOid => Some(self.signature_algorithm_oid.clone()),
            CertField::ValidFrom => self.not_before.format(&Rfc3339).ok(),
            CertField::ValidTo => self.not_after.format(&Rfc3339).ok(),
            CertField::PolicyOids => util::canonical_list(&self.policy_oids),
            CertField::QcStatementOids => crate::analyzer::decode_qc_statements(self)
                .ok()
                .and_then(|qc| util::canonical_list(&qc.statement_oids)),
            CertField::QcEuTypeOids => crate::analyzer::decode_qc_statements(self)
                .ok()
                .and_then(|qc| util::canonical_list(&qc.eu_type_oids)),
            CertField::SubjectAltName => util::canonical_list(&self.subject_alt_names),
            CertField::IsCa => self.is_ca.map(|ca| ca.to_string()),
            CertField::KeyUsage => util::canonical_list(&self.key_usage),
            CertField::CrlDistributionPoints => {
                util::canonical_list(&self.crl_distribution_points)
            }
            CertField::AuthorityInformationAccess => {
                let entries: Vec<String> = self
                    .authority_info_access
                    .iter()
                    .map(|a| format!("{}:{}", a.method, a.location))
                    .collect();
                util::canonical_list(&entries)
            }
        };
        value.filter(|v| !v.trim().is_empty())
    }
}

/// Parse a certificate from PEM or DER (auto-detected).
///
/// If the input begins with `-----BEGIN` (after stripping whitespace), it is
/// treated as PEM. Otherwise it is treated as DER.
pub fn parse_cert(input: &[u8]) -> Result<Certificate, QtrustError> {
    if input.is_empty() {
        return Err(QtrustError::CertificateParsing("empty input".into()));
    }

    if util::is_pem(input) {
        parse_pem(input)
    } else {
        parse_der(input)
    }
}

/// Parse a certificate from PEM format.
pub fn parse_pem(input: &[u8]) -> Result<Certificate, QtrustError> {
    let (_, pem) = x509_parser::pem::parse_x509_pem(input)
        .map_err(|e| QtrustError::Pem(format!("{}", e)))?;

    if pem.label != "CERTIFICATE"
        && pem.label != "TRUSTED CERTIFICATE"
        && pem.label != "X509 CERTIFICATE"
    {
        return Err(QtrustError::Pem(format!(
            "expected CERTIFICATE, got {}",
            pem.label
        )));
    }

    parse_der(&pem.contents)
}

/// Parse a certificate from DER format.
pub fn parse_der(input: &[u8]) -> Result<Certificate, QtrustError> {
    let (remaining, x509) =
        X509Certificate::from_der(input).map_err(|e| QtrustError::Der(format!("{}", e)))?;

    // Keep only the certificate bytes, not any trailing data.
    let cert_len = input.len() - remaining.len();
    let cert_der = input.get(..cert_len).unwrap_or(input);
    build_certificate(&x509, cert_der)
}

fn build_certificate(x509: &X509Certificate, raw_der: &[u8]) -> Result<Certificate, QtrustError> {
    let tbs = &x509.tbs_certificate;

    let raw_version = tbs.version.0;
    if raw_version > 2 {
        return Err(QtrustError::CertificateParsing(format!(
            "unsupported X.509 version {} (expected v1, v2, or v3)",
            raw_version + 1
        )));
    }

    let signature_algorithm_oid = x509.signature_algorithm.algorithm.to_id_string();
    let mut cert = Certificate {
        version: raw_version + 1,
        serial: format_serial(tbs.raw_serial()),
        signature_algorithm: format_sig_algorithm(&signature_algorithm_oid),
        signature_algorithm_oid,
        issuer: build_dn(&tbs.issuer),
        subject: build_dn(&tbs.subject),
        not_before: to_datetime(&tbs.validity.not_before)?,
        not_after: to_datetime(&tbs.validity.not_after)?,
        is_ca: None,
        key_usage: Vec::new(),
        subject_alt_names: Vec::new(),
        crl_distribution_points: Vec::new(),
        authority_info_access: Vec::new(),
        policy_oids: Vec::new(),
        subject_key_id: None,
        authority_key_id: None,
        qc_statements_der: None,
        raw_serial: tbs.raw_serial().to_vec(),
        raw_issuer: tbs.issuer.as_raw().to_vec(),
        raw_subject: tbs.subject.as_raw().to_vec(),
        public_key_bits: tbs.subject_pki.subject_public_key.data.to_vec(),
        raw_der: raw_der.to_vec(),
    };

    for ext in tbs.extensions() {
        if ext.oid.to_id_string() == oid::EXT_QC_STATEMENTS {
            cert.qc_statements_der = Some(ext.value.to_vec());
            continue;
        }
        match ext.parsed_extension() {
            ParsedExtension::BasicConstraints(bc) => cert.is_ca = Some(bc.ca),
            ParsedExtension::KeyUsage(ku) => cert.key_usage = key_usage_names(ku),
            ParsedExtension::SubjectAlternativeName(san) => {
                cert.subject_alt_names = san.general_names.iter().map(format_general_name).collect();
            }
            ParsedExtension::SubjectKeyIdentifier(ski) => {
                cert.subject_key_id = Some(ski.0.to_vec());
            }
            ParsedExtension::AuthorityKeyIdentifier(aki) => {
                cert.authority_key_id = aki.key_identifier.as_ref().map(|ki| ki.0.to_vec());
            }
            ParsedExtension::AuthorityInfoAccess(aia) => {
                cert.authority_info_access = aia
                    .accessdescs
                    .iter()
                    .map(|desc| {
                        let method = match desc.access_method.to_id_string().as_str() {
                            oid::ACCESS_OCSP => "OCSP".into(),
                            oid::ACCESS_CA_ISSUERS => "CA Issuers".into(),
                            other => other.to_string(),
                        };
                        AiaEntry {
                            method,
                            location: format_general_name(&desc.access_location),
                        }
                    })
                    .collect();
            }
            ParsedExtension::CRLDistributionPoints(cdp) => {
                for point in &cdp.points {
                    if let Some(x509_parser::extensions::DistributionPointName::FullName(names)) =
                        &point.distribution_point
                    {
                        for gn in names {
                            if let GeneralName::URI(uri) = gn {
                                cert.crl_distribution_points.push(uri.to_string());
                            }
                        }
                    }
                }
            }
            ParsedExtension::CertificatePolicies(policies) => {
                cert.policy_oids = policies
                    .iter()
                    .map(|p| p.policy_id.to_id_string())
                    .collect();
            }
            _ => {}
        }
    }

    Ok(cert)
}

/// Format a serial number as a colon-separated uppercase hex string,
/// stripping leading zero bytes but keeping at least one byte.
fn format_serial(raw: &[u8]) -> String {
    let stripped = match raw.iter().position(|&b| b != 0) {
        Some(pos) => raw.get(pos..).unwrap_or(raw),
        None => raw.get(raw.len().saturating_sub(1)..).unwrap_or(raw),
    };
    util::hex_colon_upper(stripped)
}

fn format_sig_algorithm(oid_str: &str) -> String {
    match oid_str {
        oid::SHA1_WITH_RSA => "sha1WithRSAEncryption".into(),
        oid::SHA256_WITH_RSA => "sha256WithRSAEncryption".into(),
        oid::SHA384_WITH_RSA => "sha384WithRSAEncryption".into(),
        oid::SHA512_WITH_RSA => "sha512WithRSAEncryption".into(),
        oid::RSASSA_PSS => "rsassaPss".into(),
        oid::ECDSA_WITH_SHA256 => "ecdsa-with-SHA256".into(),
        oid::ECDSA_WITH_SHA384 => "ecdsa-with-SHA384".into(),
        oid::ECDSA_WITH_SHA512 => "ecdsa-with-SHA512".into(),
        oid::ED25519 => "Ed25519".into(),
        other => other.to_string(),
    }
}

pub(crate) fn build_dn(name: &X509Name) -> DistinguishedName {
    let mut components = Vec::new();
    for rdn in name.iter() {
        for attr in rdn.iter() {
            let key = util::oid_short_name(&attr.attr_type().to_id_string());
            let value = attr.as_str().unwrap_or("<binary>").to_string();
            components.push((key, value));
        }
    }
    DistinguishedName { components }
}

pub(crate) fn to_datetime(asn1_time: &ASN1Time) -> Result<OffsetDateTime, QtrustError> {
    OffsetDateTime::from_unix_timestamp(asn1_time.timestamp())
        .map_err(|e| QtrustError::CertificateParsing(format!("invalid time: {}", e)))
}

fn key_usage_names(ku: &KeyUsage) -> Vec<String> {
    let bits: [(bool, &str); 9] = [
        (ku.digital_signature(), "digitalSignature"),
        (ku.non_repudiation(), "nonRepudiation"),
        (ku.key_encipherment(), "keyEncipherment"),
        (ku.data_encipherment(), "dataEncipherment"),
        (ku.key_agreement(), "keyAgreement"),
        (ku.key_cert_sign(), "keyCertSign"),
        (ku.crl_sign(), "cRLSign"),
        (ku.encipher_only(), "encipherOnly"),
        (ku.decipher_only(), "decipherOnly"),
    ];
    bits.iter()
        .filter(|(set, _)| *set)
        .map(|(_, name)| name.to_string())
        .collect()
}

fn format_general_name(gn: &GeneralName) -> String {
    match gn {
        GeneralName::DNSName(name) => name.to_string(),
        GeneralName::RFC822Name(email) => email.to_string(),
        GeneralName::URI(uri) => uri.to_string(),
        GeneralName::DirectoryName(dn) => build_dn(dn).to_oneline(),
        GeneralName::IPAddress(bytes) => format_ip_bytes(bytes),
        other => format!("{:?}", other),
    }
}

fn format_ip_bytes(bytes: &[u8]) -> String {
    if let Ok(octets) = <[u8; 4]>::try_from(bytes) {
        std::net::Ipv4Addr::from(octets).to_string()
    } else if let Ok(octets) = <[u8; 16]>::try_from(bytes) {
        std::net::Ipv6Addr::from(octets).to_string()
    } else {
        hex::encode(bytes)
    }
}
