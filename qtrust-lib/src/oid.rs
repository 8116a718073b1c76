//! Centralized OID string constants used throughout qtrust-lib.
//!
//! Besides the RFC 5280 extension identifiers needed to read a certificate,
//! this holds the ETSI identifiers that drive eIDAS classification:
//! QcStatements (EN 319 412-5) and the certificate policies of
//! EN 319 411-2 / TS 101 456, together with the OID sets the mapping
//! calculator tests membership against.

// ── X.509 Distinguished Name attributes (RFC 4519 / X.520) ──────────────

pub const COMMON_NAME: &str = "2.5.4.3";
pub const SURNAME: &str = "2.5.4.4";
pub const SERIAL_NUMBER: &str = "2.5.4.5";
pub const COUNTRY: &str = "2.5.4.6";
pub const LOCALITY: &str = "2.5.4.7";
pub const STATE_OR_PROVINCE: &str = "2.5.4.8";
pub const ORGANIZATION: &str = "2.5.4.10";
pub const ORGANIZATIONAL_UNIT: &str = "2.5.4.11";
pub const GIVEN_NAME: &str = "2.5.4.42";
pub const ORGANIZATION_IDENTIFIER: &str = "2.5.4.97";
pub const EMAIL_ADDRESS: &str = "1.2.840.113549.1.9.1"; // PKCS#9

// ── Signature algorithms ─────────────────────────────────────────────────

pub const SHA1_WITH_RSA: &str = "1.2.840.113549.1.1.5";
pub const SHA256_WITH_RSA: &str = "1.2.840.113549.1.1.11";
pub const SHA384_WITH_RSA: &str = "1.2.840.113549.1.1.12";
pub const SHA512_WITH_RSA: &str = "1.2.840.113549.1.1.13";
pub const RSASSA_PSS: &str = "1.2.840.113549.1.1.10";
pub const ECDSA_WITH_SHA256: &str = "1.2.840.10045.4.3.2";
pub const ECDSA_WITH_SHA384: &str = "1.2.840.10045.4.3.3";
pub const ECDSA_WITH_SHA512: &str = "1.2.840.10045.4.3.4";
pub const ED25519: &str = "1.3.101.112";

// ── AuthorityInfoAccess methods (RFC 5280 Section 4.2.2.1) ──────────────

pub const ACCESS_OCSP: &str = "1.3.6.1.5.5.7.48.1";
pub const ACCESS_CA_ISSUERS: &str = "1.3.6.1.5.5.7.48.2";

// ── QcStatements (RFC 3739 / ETSI EN 319 412-5) ─────────────────────────

pub const EXT_QC_STATEMENTS: &str = "1.3.6.1.5.5.7.1.3";
pub const QCS_COMPLIANCE: &str = "0.4.0.1862.1.1";
pub const QCS_LIMIT_VALUE: &str = "0.4.0.1862.1.2";
pub const QCS_RETENTION_PERIOD: &str = "0.4.0.1862.1.3";
pub const QCS_SSCD: &str = "0.4.0.1862.1.4";
pub const QCS_PDS: &str = "0.4.0.1862.1.5";
pub const QCS_TYPE: &str = "0.4.0.1862.1.6";
pub const QCS_TYPE_ESIGN: &str = "0.4.0.1862.1.6.1";
pub const QCS_TYPE_ESEAL: &str = "0.4.0.1862.1.6.2";
pub const QCS_TYPE_WEB: &str = "0.4.0.1862.1.6.3";

// ── Certificate policies (ETSI TS 101 456 / EN 319 411-2) ────────────────

pub const QCP_PUBLIC_WITH_SSCD: &str = "0.4.0.1456.1.1";
pub const QCP_PUBLIC: &str = "0.4.0.1456.1.2";
pub const QCP_NATURAL: &str = "0.4.0.194112.1.0";
pub const QCP_LEGAL: &str = "0.4.0.194112.1.1";
pub const QCP_NATURAL_QSCD: &str = "0.4.0.194112.1.2";
pub const QCP_LEGAL_QSCD: &str = "0.4.0.194112.1.3";
pub const QCP_WEB: &str = "0.4.0.194112.1.4";

// ── OID sets used by the mapping calculator ──────────────────────────────

/// QcStatements that mark a certificate as qualified.
pub const QUALIFIED_QC_STATEMENTS: &[&str] = &[QCS_COMPLIANCE];

/// Policies that mark a certificate as qualified.
pub const QUALIFIED_POLICIES: &[&str] = &[
    QCP_PUBLIC_WITH_SSCD,
    QCP_PUBLIC,
    QCP_NATURAL,
    QCP_LEGAL,
    QCP_NATURAL_QSCD,
    QCP_LEGAL_QSCD,
    QCP_WEB,
];

pub const ESIG_POLICIES: &[&str] = &[QCP_PUBLIC_WITH_SSCD, QCP_PUBLIC, QCP_NATURAL, QCP_NATURAL_QSCD];
pub const ESEAL_POLICIES: &[&str] = &[QCP_LEGAL, QCP_LEGAL_QSCD];
pub const WSA_POLICIES: &[&str] = &[QCP_WEB];

/// Policies implying the private key lives in a QSCD.
pub const IN_QSCD_POLICIES: &[&str] = &[QCP_PUBLIC_WITH_SSCD, QCP_LEGAL_QSCD, QCP_NATURAL_QSCD];

pub const NOT_IN_QSCD_POLICIES: &[&str] = &[QCP_PUBLIC, QCP_LEGAL, QCP_NATURAL, QCP_WEB];
