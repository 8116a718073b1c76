//! qtrust-lib: trust validation of X.509 certificates against EU trusted lists.
//!
//! Matches a certificate against the providers and services of a parsed
//! Trust Service Status List (ETSI TS 119612), derives its eIDAS mappings
//! (qualified, classification, QSCD), optionally resolves its revocation
//! status, and serves the trusted lists from a path-addressed cache that can
//! be fully reloaded without blocking readers.

pub mod analyzer;
pub mod cache;
mod cert;
pub mod config;
mod identity;
pub mod mapping;
pub mod oid;
pub mod result;
pub mod revocation;
pub mod tsl;
pub mod uri;
mod util;
pub mod validator;

pub use analyzer::ExtensionAnalyzer;
pub use cache::{
    AssociationType, CacheError, DurableStore, MemoryStore, TslCache, TslCacheFacade,
    TslCountryRegion, TslCountryRegionMapping, TslData,
};
pub use cert::{parse_cert, parse_der, parse_pem, CertField, Certificate, DistinguishedName};
pub use config::EngineConfig;
pub use mapping::{Classification, MappingType, Qscd};
pub use result::{ResultCode, ValidationResult};
pub use revocation::{
    parse_pem_crl, Crl, OcspCertStatus, OcspResponse, RevocationEvidence, RevocationFetcher,
};
pub use tsl::{DigitalIdentity, TrustServiceProvider, TslObject, TspService};
pub use validator::{RulesRegistry, TslValidationRules, TslValidator};

/// Operator-facing error codes.
pub mod codes {
    pub const COD_154: &str = "COD_154";
    pub const COD_155: &str = "COD_155";
    pub const COD_187: &str = "COD_187";
    pub const COD_190: &str = "COD_190";
    pub const COD_191: &str = "COD_191";
    pub const COD_200: &str = "COD_200";
}

/// Errors returned by qtrust-lib.
#[derive(Debug, thiserror::Error)]
pub enum QtrustError {
    #[error("[{code}] invalid argument: {message}")]
    InvalidArgument { code: &'static str, message: String },

    #[error("[{code}] validation failed: {message}")]
    ValidationFailed { code: &'static str, message: String },

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("Failed to parse certificate: {0}")]
    CertificateParsing(String),

    #[error("Invalid PEM format: {0}")]
    Pem(String),

    #[error("Invalid DER format: {0}")]
    Der(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl QtrustError {
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        QtrustError::InvalidArgument {
            code: codes::COD_187,
            message: message.into(),
        }
    }

    pub(crate) fn validation_failed(message: impl Into<String>) -> Self {
        QtrustError::ValidationFailed {
            code: codes::COD_187,
            message: message.into(),
        }
    }

    /// Stable code for logs and operator tooling.
    pub fn code(&self) -> &'static str {
        match self {
            QtrustError::InvalidArgument { code, .. }
            | QtrustError::ValidationFailed { code, .. } => code,
            QtrustError::Cache(e) => e.code(),
            QtrustError::CertificateParsing(_) | QtrustError::Pem(_) | QtrustError::Der(_) => {
                codes::COD_190
            }
            QtrustError::Config(_) | QtrustError::Io(_) | QtrustError::Json(_) => codes::COD_200,
        }
    }
}
