//! Validation Result: the record a validation call fills in and returns.

use crate::analyzer::ExtensionAnalyzer;
use crate::cert::{Certificate, DistinguishedName};
use crate::mapping::{Classification, MappingType, Qscd};
use crate::revocation::RevocationEvidence;
use crate::tsl::{ServiceHistoryInstance, TslObject, TspService};
use serde::Serialize;
use std::collections::BTreeMap;
use time::OffsetDateTime;

/// Revocation reason value when no reason is known.
pub const NO_REVOCATION_REASON: i32 = -1;

/// Outcome of a validation call.
///
/// `NotDetected` is initial. Every other code requires detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultCode {
    #[default]
    NotDetected,
    /// Detected with an OK service status; revocation not yet resolved.
    DetectedUnknown,
    Valid,
    Revoked,
    RevokedByServiceStatus,
    CertchainNotValid,
    CertchainNotValidByServiceStatus,
}

impl ResultCode {
    pub fn is_detected(self) -> bool {
        self != ResultCode::NotDetected
    }

    /// Final by service status; revocation checking does not apply.
    pub fn is_by_service_status(self) -> bool {
        matches!(
            self,
            ResultCode::RevokedByServiceStatus | ResultCode::CertchainNotValidByServiceStatus
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResultCode::NotDetected => "NOT_DETECTED",
            ResultCode::DetectedUnknown => "DETECTED_UNKNOWN",
            ResultCode::Valid => "VALID",
            ResultCode::Revoked => "REVOKED",
            ResultCode::RevokedByServiceStatus => "REVOKED_BY_SERVICE_STATUS",
            ResultCode::CertchainNotValid => "CERTCHAIN_NOT_VALID",
            ResultCode::CertchainNotValidByServiceStatus => "CERTCHAIN_NOT_VALID_BY_SERVICE_STATUS",
        }
    }
}

impl std::fmt::Display for ResultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Issuer data found while matching the service digital identities.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IssuerData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<Certificate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_name: Option<DistinguishedName>,
    #[serde(skip)]
    pub public_key_spki: Option<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "opt_hex::serialize")]
    pub ski: Option<Vec<u8>>,
}

impl IssuerData {
    pub fn is_empty(&self) -> bool {
        self.certificate.is_none()
            && self.subject_name.is_none()
            && self.public_key_spki.is_none()
            && self.ski.is_none()
    }
}

mod opt_hex {
    use serde::Serializer;

    pub fn serialize<S: Serializer>(bytes: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(b) => s.serialize_str(&hex::encode(b)),
            None => s.serialize_none(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub result: ResultCode,

    // TSL metadata
    pub tsl_country_region_code: Option<String>,
    pub tsl_sequence_number: i32,
    pub tsl_specification: Option<String>,
    pub tsl_version: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub tsl_issue_date: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub tsl_next_update: Option<OffsetDateTime>,
    pub european: bool,

    // detection
    pub tsp_name: Option<String>,
    pub tsp_service_name_for_detect: Option<String>,
    #[serde(skip)]
    pub tsp_service_for_detect: Option<TspService>,
    pub tsp_service_name_for_validate: Option<String>,
    #[serde(skip)]
    pub tsp_service_for_validate: Option<TspService>,
    #[serde(skip)]
    pub history_instance: Option<ServiceHistoryInstance>,
    pub issuer: IssuerData,

    // mappings
    pub mapping_type: MappingType,
    pub mapping_classification: Classification,
    pub mapping_qscd: Qscd,
    pub mappings: BTreeMap<String, String>,

    // revocation
    pub from_service_status: bool,
    pub from_dp_or_aia: bool,
    #[serde(skip)]
    pub revocation_evidence: Option<RevocationEvidence>,
    pub revocation_url: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub revocation_date: Option<OffsetDateTime>,
    pub revocation_reason: i32,

    #[serde(skip)]
    analyzer: ExtensionAnalyzer,
}

impl ValidationResult {
    /// A fresh, not-detected result for `cert`.
    pub fn new(cert: &Certificate) -> Self {
        ValidationResult {
            result: ResultCode::NotDetected,
            tsl_country_region_code: None,
            tsl_sequence_number: -1,
            tsl_specification: None,
            tsl_version: None,
            tsl_issue_date: None,
            tsl_next_update: None,
            european: false,
            tsp_name: None,
            tsp_service_name_for_detect: None,
            tsp_service_for_detect: None,
            tsp_service_name_for_validate: None,
            tsp_service_for_validate: None,
            history_instance: None,
            issuer: IssuerData::default(),
            mapping_type: MappingType::Unknown,
            mapping_classification: Classification::Unknown,
            mapping_qscd: Qscd::Unknown,
            mappings: BTreeMap::new(),
            from_service_status: false,
            from_dp_or_aia: false,
            revocation_evidence: None,
            revocation_url: None,
            revocation_date: None,
            revocation_reason: NO_REVOCATION_REASON,
            analyzer: ExtensionAnalyzer::new(cert),
        }
    }

    /// Record the TSL metadata.
    pub fn set_tsl(&mut self, tsl: &TslObject) {
        let info = &tsl.scheme_information;
        self.tsl_country_region_code = Some(info.scheme_territory.clone());
        self.tsl_sequence_number = info.sequence_number;
        self.tsl_specification = Some(info.specification.clone());
        self.tsl_version = Some(info.version.clone());
        self.tsl_issue_date = Some(info.issue_date);
        self.tsl_next_update = info.next_update;
    }

    pub fn analyzer(&self) -> &ExtensionAnalyzer {
        &self.analyzer
    }

    pub fn has_been_detected(&self) -> bool {
        self.result.is_detected()
    }

    pub fn has_been_detected_with_unknown_state(&self) -> bool {
        self.result == ResultCode::DetectedUnknown
    }

    pub fn has_revocation_evidence(&self) -> bool {
        self.revocation_evidence.is_some()
    }

    /// Record the revocation outcome.
    pub(crate) fn set_revoked(&mut self, date: OffsetDateTime, reason: Option<u8>) {
        self.result = ResultCode::Revoked;
        self.revocation_date = Some(date);
        self.revocation_reason = reason.map_or(NO_REVOCATION_REASON, i32::from);
    }

    /// Clear every detection-dependent field.
    ///
    /// TSL metadata and the analyzer are kept.
    pub fn reset_all_data(&mut self) {
        self.result = ResultCode::NotDetected;
        self.tsp_name = None;
        self.tsp_service_name_for_detect = None;
        self.tsp_service_for_detect = None;
        self.tsp_service_name_for_validate = None;
        self.tsp_service_for_validate = None;
        self.history_instance = None;
        self.issuer = IssuerData::default();
        self.mapping_type = MappingType::Unknown;
        self.mapping_classification = Classification::Unknown;
        self.mapping_qscd = Qscd::Unknown;
        self.mappings.clear();
        self.from_service_status = false;
        self.from_dp_or_aia = false;
        self.revocation_evidence = None;
        self.revocation_url = None;
        self.revocation_date = None;
        self.revocation_reason = NO_REVOCATION_REASON;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cert::parse_cert;

    fn result() -> ValidationResult {
        ValidationResult::new(&parse_cert(include_bytes!("../tests/data/plain.pem")).unwrap())
    }

    #[test]
    fn starts_not_detected() {
        let r = result();
        assert_eq!(r.result, ResultCode::NotDetected);
        assert!(!r.has_been_detected());
        assert_eq!(r.revocation_reason, -1);
        assert!(!r.analyzer().has_qc_statements().unwrap());
    }

    #[test]
    fn reset_clears_detection() {
        let mut r = result();
        r.result = ResultCode::DetectedUnknown;
        r.tsp_name = Some("Provider".into());
        r.mapping_qscd = Qscd::Yes;
        r.mappings.insert("k".into(), "v".into());
        r.set_revoked(OffsetDateTime::UNIX_EPOCH, Some(1));
        r.tsl_sequence_number = 9;

        r.reset_all_data();
        assert!(!r.has_been_detected());
        assert_eq!(r.tsp_name, None);
        assert_eq!(r.mapping_qscd, Qscd::Unknown);
        assert!(r.mappings.is_empty());
        assert_eq!(r.revocation_date, None);
        assert_eq!(r.revocation_reason, NO_REVOCATION_REASON);
        assert_eq!(r.tsl_sequence_number, 9);
    }

    #[test]
    fn code_classes() {
        assert!(ResultCode::RevokedByServiceStatus.is_by_service_status());
        assert!(!ResultCode::Revoked.is_by_service_status());
        assert!(ResultCode::Valid.is_detected());
        assert_eq!(ResultCode::DetectedUnknown.to_string(), "DETECTED_UNKNOWN");
    }

    #[test]
    fn serializes_codes_and_mappings() {
        let mut r = result();
        r.result = ResultCode::CertchainNotValidByServiceStatus;
        r.mapping_type = MappingType::NonQualified;
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["result"], "CERTCHAIN_NOT_VALID_BY_SERVICE_STATUS");
        assert_eq!(json["mapping_type"], "NON_QUALIFIED");
    }
}
