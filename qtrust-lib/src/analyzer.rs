//! Queries over a certificate's QcStatements and CertificatePolicies
//! extensions.
//!
//! The QcStatements extension (RFC 3739, ETSI EN 319 412-5) is not decoded
//! by `x509-parser`, so its DER is walked here:
//!
//! ```text
//! QCStatements ::= SEQUENCE OF QCStatement
//! QCStatement  ::= SEQUENCE { statementId OID, statementInfo ANY OPTIONAL }
//! QcType       ::= SEQUENCE OF OID        -- statementInfo of 0.4.0.1862.1.6
//! ```
//!
//! Decoding happens at most once per analyzer; every query after the first
//! reuses the memoized outcome, including a decoding failure.

use crate::cert::Certificate;
use crate::oid;
use crate::QtrustError;
use std::sync::{Arc, OnceLock};
use x509_parser::der_parser::ber::BerObject;

/// Decoded QcStatements content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QcStatements {
    /// statementId of every QCStatement, in encounter order.
    pub statement_oids: Vec<String>,
    /// OIDs listed in the QcType statement, if any.
    pub eu_type_oids: Vec<String>,
    /// Whether a QcType statement is present at all.
    pub has_eu_type: bool,
}

/// Memoized extension queries for one certificate.
///
/// Cloning is cheap and shares the memoized decoding.
#[derive(Debug, Clone)]
pub struct ExtensionAnalyzer {
    qc_der: Option<Arc<[u8]>>,
    policies: Arc<[String]>,
    decoded: Arc<OnceLock<Result<QcStatements, String>>>,
}

impl ExtensionAnalyzer {
    pub fn new(cert: &Certificate) -> Self {
        ExtensionAnalyzer {
            qc_der: cert.qc_statements_der.as_deref().map(Arc::from),
            policies: cert.policy_oids.clone().into(),
            decoded: Arc::new(OnceLock::new()),
        }
    }

    /// Build an analyzer from already-decoded extension contents.
    pub fn from_parts(qc: Option<QcStatements>, policies: Vec<String>) -> Self {
        let decoded = OnceLock::new();
        let _ = decoded.set(Ok(qc.clone().unwrap_or_default()));
        ExtensionAnalyzer {
            qc_der: qc.map(|_| Arc::from(Vec::<u8>::new())),
            policies: policies.into(),
            decoded: Arc::new(decoded),
        }
    }

    fn qc(&self) -> Result<Option<&QcStatements>, QtrustError> {
        let Some(der) = &self.qc_der else {
            return Ok(None);
        };
        match self.decoded.get_or_init(|| parse_qc_statements(der)) {
            Ok(qc) => Ok(Some(qc)),
            Err(msg) => Err(QtrustError::CertificateParsing(msg.clone())),
        }
    }

    /// Whether any QcStatement has one of the given statement ids.
    pub fn has_any_qc_statement(&self, oids: &[&str]) -> Result<bool, QtrustError> {
        Ok(self
            .qc()?
            .is_some_and(|qc| qc.statement_oids.iter().any(|s| oids.contains(&s.as_str()))))
    }

    /// Whether the certificate carries a non-empty QcStatements extension.
    pub fn has_qc_statements(&self) -> Result<bool, QtrustError> {
        Ok(self.qc()?.is_some_and(|qc| !qc.statement_oids.is_empty()))
    }

    pub fn has_qc_statement(&self, statement_oid: &str) -> Result<bool, QtrustError> {
        self.has_any_qc_statement(&[statement_oid])
    }

    /// Whether a QcType (QcStatement-EuType) statement is present.
    pub fn has_qc_eu_type(&self) -> Result<bool, QtrustError> {
        Ok(self.qc()?.is_some_and(|qc| qc.has_eu_type))
    }

    pub fn has_qc_eu_type_oid(&self, type_oid: &str) -> Result<bool, QtrustError> {
        Ok(self
            .qc()?
            .is_some_and(|qc| qc.eu_type_oids.iter().any(|t| t == type_oid)))
    }

    /// Whether the CertificatePolicies extension lists any policy.
    pub fn has_policies(&self) -> bool {
        !self.policies.is_empty()
    }

    pub fn has_any_policy(&self, oids: &[&str]) -> bool {
        self.policies.iter().any(|p| oids.contains(&p.as_str()))
    }

    /// Policy identifiers in encounter order.
    pub fn policies(&self) -> &[String] {
        &self.policies
    }
}

/// Decode the QcStatements extension of a certificate, without memoization.
pub(crate) fn decode_qc_statements(cert: &Certificate) -> Result<QcStatements, QtrustError> {
    match &cert.qc_statements_der {
        Some(der) => parse_qc_statements(der).map_err(QtrustError::CertificateParsing),
        None => Ok(QcStatements::default()),
    }
}

/// Parse the raw extension value of a QcStatements extension.
pub fn parse_qc_statements(der: &[u8]) -> Result<QcStatements, String> {
    let (rest, obj) = x509_parser::der_parser::parse_der(der)
        .map_err(|e| format!("malformed QcStatements: {}", e))?;
    if !rest.is_empty() {
        return Err("trailing data after QcStatements".into());
    }
    let statements = obj
        .as_sequence()
        .map_err(|e| format!("QcStatements is not a SEQUENCE: {}", e))?;

    let mut out = QcStatements::default();
    for statement in statements {
        let (id, info) = parse_statement(statement)?;
        if id == oid::QCS_TYPE {
            out.has_eu_type = true;
            if let Some(info) = info {
                let types = info
                    .as_sequence()
                    .map_err(|e| format!("QcType is not a SEQUENCE: {}", e))?;
                for t in types {
                    let type_oid = t
                        .as_oid()
                        .map_err(|e| format!("QcType member is not an OID: {}", e))?;
                    out.eu_type_oids.push(type_oid.to_id_string());
                }
            }
        }
        out.statement_oids.push(id);
    }
    Ok(out)
}

fn parse_statement<'a, 'b>(
    statement: &'b BerObject<'a>,
) -> Result<(String, Option<&'b BerObject<'a>>), String> {
    let parts = statement
        .as_sequence()
        .map_err(|e| format!("QCStatement is not a SEQUENCE: {}", e))?;
    let mut iter = parts.iter();
    let id = iter
        .next()
        .ok_or_else(|| "QCStatement without statementId".to_string())?
        .as_oid()
        .map_err(|e| format!("statementId is not an OID: {}", e))?
        .to_id_string();
    Ok((id, iter.next()))
}
