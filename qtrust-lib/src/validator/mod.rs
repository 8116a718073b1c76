//! TSL validator: detects a certificate in a trusted list, derives its
//! mappings from the matching service and resolves its status.
//!
//! A validator is bound to one [`TslObject`] snapshot and to the rule set
//! registered for that list's specification and version. It never mutates
//! the snapshot, so any number of validations may share it.

mod evidence;
mod rules;
mod v020101;

pub use rules::{
    AsiKind, QualifierEffect, RevocationServiceKind, RulesRegistry, StatusClass,
    TslValidationRules,
};
pub use v020101::Ts119612V020101;

use crate::analyzer::ExtensionAnalyzer;
use crate::cache::TslCacheFacade;
use crate::cert::{self, Certificate};
use crate::config::{ClassificationRanges, EngineConfig};
use crate::identity::IdentitySet;
use crate::mapping::{self, Classification, MappingType, Qscd};
use crate::oid;
use crate::result::{ResultCode, ValidationResult};
use crate::revocation::{Crl, OcspResponse, RevocationFetcher};
use crate::tsl::{QualificationElement, ServiceHistoryInstance, TrustServiceProvider, TslObject, TspService};
use crate::QtrustError;
use std::collections::BTreeMap;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{debug, error, info, warn};

/// Validate-service name recorded when revocation was resolved from the
/// certificate's own distribution points or AIA.
pub const DP_OR_AIA_SERVICE_NAME: &str = "TSPService-Certificate-DistributionPoint";

/// The status of a service in force at some date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectiveStatus<'a> {
    pub status: &'a str,
    pub starting_time: OffsetDateTime,
    /// `None` when the current service information applies.
    pub history_instance: Option<&'a ServiceHistoryInstance>,
}

/// The latest status, current or historical, that started strictly before
/// `date`. The current status wins a tie.
pub fn effective_service_status(service: &TspService, date: OffsetDateTime) -> Option<EffectiveStatus<'_>> {
    let history = service.history.iter().map(|h| EffectiveStatus {
        status: &h.status,
        starting_time: h.status_starting_time,
        history_instance: Some(h),
    });
    let current = std::iter::once(EffectiveStatus {
        status: &service.status,
        starting_time: service.status_starting_time,
        history_instance: None,
    });
    history
        .chain(current)
        .filter(|s| s.starting_time < date)
        .max_by_key(|s| s.starting_time)
}

/// What the AdditionalServiceInformation extensions say about a certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AsiOutcome {
    /// The service carries no such extension.
    Absent,
    /// Extensions present, none matching the certificate.
    Unmatched,
    Matched(Classification),
}

pub struct TslValidator {
    tsl: Arc<TslObject>,
    rules: Arc<dyn TslValidationRules>,
    config: EngineConfig,
    fetcher: Option<Arc<dyn RevocationFetcher>>,
}

impl std::fmt::Debug for TslValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TslValidator")
            .field("country", &self.tsl.country_region_code())
            .field("sequence_number", &self.tsl.sequence_number())
            .field("rules", &self.rules.key())
            .field("fetcher", &self.fetcher.is_some())
            .finish()
    }
}

impl TslValidator {
    /// Bind a validator to a TSL using the rules registered for its
    /// specification and version.
    pub fn new(tsl: Arc<TslObject>, registry: &RulesRegistry) -> Result<Self, QtrustError> {
        let info = &tsl.scheme_information;
        let rules = registry
            .get(&info.specification, &info.version)
            .ok_or_else(|| {
                QtrustError::invalid_argument(format!(
                    "no validation rules for TSL specification {} version {}",
                    info.specification, info.version
                ))
            })?;
        Ok(TslValidator {
            tsl,
            rules,
            config: EngineConfig::default(),
            fetcher: None,
        })
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Collaborator used to retrieve CRLs and OCSP responses.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn RevocationFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn tsl(&self) -> &TslObject {
        &self.tsl
    }

    pub fn rules(&self) -> &dyn TslValidationRules {
        self.rules.as_ref()
    }

    // ── Entry points ─────────────────────────────────────────────────────

    /// Validate an encoded (PEM or DER) certificate against the TSL.
    ///
    /// A missing or undecodable certificate is an invalid argument.
    pub fn validate_certificate_with_tsl(
        &self,
        certificate: &[u8],
        is_tsa: bool,
        validation_date: OffsetDateTime,
        check_status_revocation: bool,
    ) -> Result<ValidationResult, QtrustError> {
        let cert = decode_argument(certificate)?;
        self.validate(&cert, is_tsa, validation_date, check_status_revocation)
    }

    /// Resolve a certificate's status from pre-fetched revocation evidence.
    pub fn verifies_revocation_values_for_x509_with_tsl(
        &self,
        certificate: &[u8],
        is_tsa: bool,
        crls: &[Crl],
        ocsp_responses: &[OcspResponse],
        validation_date: OffsetDateTime,
    ) -> Result<ValidationResult, QtrustError> {
        let cert = decode_argument(certificate)?;
        self.verify_revocation_values(&cert, is_tsa, crls, ocsp_responses, validation_date)
    }

    /// Detect `cert` and, if requested, resolve its revocation status.
    pub fn validate(
        &self,
        cert: &Certificate,
        is_tsa: bool,
        validation_date: OffsetDateTime,
        check_status_revocation: bool,
    ) -> Result<ValidationResult, QtrustError> {
        info!(
            country = self.tsl.country_region_code(),
            sequence_number = self.tsl.sequence_number(),
            subject = %cert.subject,
            is_tsa,
            check_status_revocation,
            "validating certificate against TSL"
        );

        let mut result = self.new_result(cert);
        if !self.check_tsl_usable()? {
            return Ok(result);
        }

        if let Some(tsp) = self.detect(cert, is_tsa, validation_date, &mut result)? {
            if check_status_revocation && result.has_been_detected_with_unknown_state() {
                self.resolve_revocation(cert, is_tsa, validation_date, tsp, &mut result)?;
            }
        }

        info!(
            country = self.tsl.country_region_code(),
            result = %result.result,
            tsp = result.tsp_name.as_deref().unwrap_or("-"),
            "validation finished"
        );
        Ok(result)
    }

    /// Detect `cert` without revocation, then decide its status from the
    /// supplied CRLs and OCSP responses.
    pub fn verify_revocation_values(
        &self,
        cert: &Certificate,
        is_tsa: bool,
        crls: &[Crl],
        ocsp_responses: &[OcspResponse],
        validation_date: OffsetDateTime,
    ) -> Result<ValidationResult, QtrustError> {
        if crls.is_empty() && ocsp_responses.is_empty() {
            return Err(QtrustError::invalid_argument(
                "no CRL or OCSP response supplied",
            ));
        }
        info!(
            country = self.tsl.country_region_code(),
            subject = %cert.subject,
            crls = crls.len(),
            ocsp_responses = ocsp_responses.len(),
            "verifying revocation values against TSL"
        );

        let ocsp = crate::revocation::ocsp_response_for_certificate(cert, ocsp_responses)?;
        let crl = crate::revocation::crl_for_certificate(cert, crls, validation_date);

        let mut result = self.new_result(cert);
        if !self.check_tsl_usable()? {
            return Ok(result);
        }

        if let Some(tsp) = self.detect(cert, is_tsa, validation_date, &mut result)? {
            if result.has_been_detected_with_unknown_state() {
                self.resolve_with_supplied_evidence(cert, validation_date, tsp, crl, ocsp, &mut result);
            }
        }

        info!(result = %result.result, "revocation values verified");
        Ok(result)
    }

    fn new_result(&self, cert: &Certificate) -> ValidationResult {
        let mut result = ValidationResult::new(cert);
        result.set_tsl(&self.tsl);
        result.european = self.rules.is_european(self.tsl.tsl_type());
        result
    }

    /// `Ok(false)` for lists that cannot detect certificates.
    fn check_tsl_usable(&self) -> Result<bool, QtrustError> {
        let info = &self.tsl.scheme_information;
        if self.rules.is_list_of_lists(&info.tsl_type) {
            warn!(
                tsl_type = %info.tsl_type,
                "TSL is a list of lists; certificates cannot be detected in it"
            );
            return Ok(false);
        }
        if self
            .rules
            .is_status_determination_approach_delinquent(&info.status_determination_approach)
        {
            return Err(QtrustError::validation_failed(format!(
                "TSL status determination approach is delinquent: {}",
                info.status_determination_approach
            )));
        }
        Ok(true)
    }

    // ── Detection ────────────────────────────────────────────────────────

    /// Scan providers and services in order; stop at the first detection.
    fn detect(
        &self,
        cert: &Certificate,
        is_tsa: bool,
        date: OffsetDateTime,
        result: &mut ValidationResult,
    ) -> Result<Option<&TrustServiceProvider>, QtrustError> {
        for tsp in &self.tsl.trust_service_providers {
            for service in &tsp.services {
                if !self.detect_with_service(cert, is_tsa, date, service, result)? {
                    continue;
                }
                result.tsp_name = tsp.name().map(str::to_string);
                result.tsp_service_name_for_detect = service.name().map(str::to_string);
                result.tsp_service_for_detect = Some(service.clone());
                if !result.has_been_detected_with_unknown_state() {
                    result.tsp_service_name_for_validate = result.tsp_service_name_for_detect.clone();
                    result.tsp_service_for_validate = Some(service.clone());
                }
                debug!(
                    tsp = result.tsp_name.as_deref().unwrap_or("-"),
                    service = result.tsp_service_name_for_detect.as_deref().unwrap_or("-"),
                    result = %result.result,
                    "certificate detected"
                );
                return Ok(Some(tsp));
            }
        }
        Ok(None)
    }

    fn detect_with_service(
        &self,
        cert: &Certificate,
        is_tsa: bool,
        date: OffsetDateTime,
        service: &TspService,
        result: &mut ValidationResult,
    ) -> Result<bool, QtrustError> {
        let service_type = service.service_type.as_str();
        let identities = IdentitySet::new(&service.digital_identities);

        let qualified_tsa = self.rules.is_tsa_qualified(service_type);
        if is_tsa {
            if !(qualified_tsa || self.rules.is_tsa_non_qualified(service_type)) {
                return Ok(false);
            }
            if !identities.contains_certificate(cert) {
                return Ok(false);
            }
            result.mapping_classification = Classification::Tsa;
            result.mapping_type = if qualified_tsa {
                MappingType::Qualified
            } else {
                MappingType::NonQualified
            };
            result.result = ResultCode::DetectedUnknown;
            self.apply_service_status(service, date, result);
            return Ok(true);
        }

        if !self.rules.is_ca(service_type) {
            return Ok(false);
        }
        let Some(issuer) = identities.issued_by(cert) else {
            return Ok(false);
        };

        let detected = if self.rules.is_ca_pkc(service_type) {
            result.mapping_type = MappingType::NonQualified;
            true
        } else if result.european {
            self.detect_qualified(cert, service, result)?
        } else {
            debug!(
                service = service.name().unwrap_or("-"),
                "qualified CA service of a non-European list does not detect"
            );
            false
        };

        if !detected {
            debug!(
                service = service.name().unwrap_or("-"),
                "issuer matched but qualification conditions did not"
            );
            result.reset_all_data();
            return Ok(false);
        }

        result.issuer = issuer;
        result.result = ResultCode::DetectedUnknown;
        self.apply_service_status(service, date, result);
        Ok(true)
    }

    /// European CA/QC and NationalRootCA-QC detection.
    fn detect_qualified(
        &self,
        cert: &Certificate,
        service: &TspService,
        result: &mut ValidationResult,
    ) -> Result<bool, QtrustError> {
        let analyzer = result.analyzer().clone();

        let asi = self.asi_outcome(service, &analyzer);
        match asi {
            AsiOutcome::Absent => {
                warn!(
                    service = service.name().unwrap_or("-"),
                    "qualified CA service has no AdditionalServiceInformation; certificate taken as non-qualified"
                );
                result.mapping_type = MappingType::NonQualified;
            }
            AsiOutcome::Matched(classification) => {
                result.mapping_type = MappingType::Qualified;
                result.mapping_classification = classification;
            }
            AsiOutcome::Unmatched => {}
        }
        fill_from_certificate(&analyzer, result);

        let by_qualifications = match service.qualifications() {
            Some((elements, critical)) => {
                self.apply_qualifications(cert, elements, critical, result)?
            }
            None => {
                let obeys = self.rules.obeys_detection_conditions(&analyzer);
                if obeys {
                    result.mapping_type = MappingType::Qualified;
                } else {
                    warn!(
                        service = service.name().unwrap_or("-"),
                        "certificate does not meet the conditions to be detected without a Qualifications extension"
                    );
                }
                obeys
            }
        };

        Ok(matches!(asi, AsiOutcome::Matched(_)) || by_qualifications)
    }

    fn asi_outcome(&self, service: &TspService, analyzer: &ExtensionAnalyzer) -> AsiOutcome {
        let uris = service.additional_service_information();
        if uris.is_empty() {
            return AsiOutcome::Absent;
        }
        let kinds: Vec<AsiKind> = uris.iter().filter_map(|u| self.rules.asi_kind(u)).collect();
        let has = |kind| kinds.contains(&kind);

        // Extension decoding failures count as "no signal".
        let eu_type = |type_oid| analyzer.has_qc_eu_type_oid(type_oid).unwrap_or(false);
        let policy = |oids| analyzer.has_any_policy(oids);

        if has(AsiKind::ForWebSiteAuthentication)
            && (eu_type(oid::QCS_TYPE_WEB) || policy(oid::WSA_POLICIES))
        {
            AsiOutcome::Matched(Classification::Wsa)
        } else if has(AsiKind::ForESeals)
            && (eu_type(oid::QCS_TYPE_ESEAL) || policy(oid::ESEAL_POLICIES))
        {
            AsiOutcome::Matched(Classification::ESeal)
        } else if has(AsiKind::ForESignatures)
            && (analyzer.has_qc_statements().unwrap_or(false) || policy(oid::ESIG_POLICIES))
        {
            AsiOutcome::Matched(Classification::ESig)
        } else {
            AsiOutcome::Unmatched
        }
    }

    /// Apply the qualifiers of every element whose criteria match `cert`.
    ///
    /// Returns whether any element matched. A criteria evaluation error
    /// fails the validation when the extension is critical and discards
    /// the whole extension otherwise.
    fn apply_qualifications(
        &self,
        cert: &Certificate,
        elements: &[QualificationElement],
        critical: bool,
        result: &mut ValidationResult,
    ) -> Result<bool, QtrustError> {
        let before = (
            result.mapping_type,
            result.mapping_classification,
            result.mapping_qscd,
        );
        let mut matched = false;
        for (index, element) in elements.iter().enumerate() {
            match element.criteria.matches(cert) {
                Ok(true) => {
                    matched = true;
                    for qualifier in &element.qualifiers {
                        self.apply_qualifier(qualifier, result);
                    }
                }
                Ok(false) => {}
                Err(e) if critical => {
                    error!(element = index, error = %e, "critical Qualifications extension cannot be evaluated");
                    result.reset_all_data();
                    return Err(QtrustError::validation_failed(format!(
                        "critical Qualifications extension: {}",
                        e
                    )));
                }
                Err(e) => {
                    warn!(element = index, error = %e, "ignoring unevaluable Qualifications extension");
                    (
                        result.mapping_type,
                        result.mapping_classification,
                        result.mapping_qscd,
                    ) = before;
                    return Ok(false);
                }
            }
        }
        Ok(matched)
    }

    /// Set the one mapping a qualifier URI stands for. Later qualifiers
    /// overwrite earlier ones. Returns whether the URI was recognised.
    pub fn apply_qualifier(&self, qualifier: &str, result: &mut ValidationResult) -> bool {
        match self.rules.qualifier_effect(qualifier) {
            Some(QualifierEffect::Type(t)) => result.mapping_type = t,
            Some(QualifierEffect::Classification(c)) => result.mapping_classification = c,
            Some(QualifierEffect::Qscd(q)) => result.mapping_qscd = q,
            None => {
                debug!(qualifier, "ignoring unknown qualifier");
                return false;
            }
        }
        true
    }

    /// Set the result code from the service status in force at `date`.
    ///
    /// With no status in force the result stays `DETECTED_UNKNOWN`.
    fn apply_service_status(&self, service: &TspService, date: OffsetDateTime, result: &mut ValidationResult) {
        let Some(effective) = effective_service_status(service, date) else {
            warn!(
                service = service.name().unwrap_or("-"),
                %date,
                "no service status in force at validation date"
            );
            return;
        };
        result.history_instance = effective.history_instance.cloned();
        match self.rules.status_class(effective.status) {
            Some(StatusClass::Ok) => result.result = ResultCode::DetectedUnknown,
            Some(StatusClass::ChainNotValid) => {
                result.result = ResultCode::CertchainNotValidByServiceStatus;
                result.from_service_status = true;
            }
            Some(StatusClass::Revoked) => {
                result.result = ResultCode::RevokedByServiceStatus;
                result.from_service_status = true;
            }
            None => warn!(status = effective.status, "unrecognised service status"),
        }
    }

    /// Whether a service may supply revocation evidence at `date`.
    fn service_in_force(&self, service: &TspService, date: OffsetDateTime) -> bool {
        self.rules.is_status_ok(&service.status) && service.status_starting_time < date
    }
}

/// Settle the mappings still unknown after detection from the certificate
/// itself. An undecodable extension leaves its mapping unknown.
fn fill_from_certificate(analyzer: &ExtensionAnalyzer, result: &mut ValidationResult) {
    if result.mapping_type == MappingType::Unknown {
        result.mapping_type =
            mapping::mapping_type_qualified(analyzer).unwrap_or(MappingType::Unknown);
    }
    if result.mapping_classification == Classification::Unknown {
        result.mapping_classification =
            mapping::mapping_classification(analyzer, true).unwrap_or(Classification::Unknown);
    }
    if result.mapping_qscd == Qscd::Unknown {
        result.mapping_qscd = mapping::mapping_qscd(analyzer).unwrap_or(Qscd::Unknown);
    }
}

fn decode_argument(certificate: &[u8]) -> Result<Certificate, QtrustError> {
    if certificate.is_empty() {
        return Err(QtrustError::invalid_argument("certificate is missing"));
    }
    cert::parse_cert(certificate)
        .map_err(|e| QtrustError::invalid_argument(format!("certificate cannot be decoded: {}", e)))
}

/// Mapping table for a validated certificate in a country/region.
///
/// Combines the country's configured mappings, the static mappings from
/// `result`, and the policy mappings (which lose on key collision).
/// Configured mappings named like a static mapping are ignored.
pub fn certificate_mappings(
    cert: &Certificate,
    result: &ValidationResult,
    country_code: &str,
    facade: &TslCacheFacade,
    policy_mappings: &BTreeMap<String, String>,
    ranges: &ClassificationRanges,
) -> Result<BTreeMap<String, String>, QtrustError> {
    let definitions = facade
        .get_mappings_for_country_region(country_code)?
        .unwrap_or_default();
    let usable = definitions.iter().filter(|def| {
        let shadowing = mapping::is_static_mapping_name(&def.identificator);
        if shadowing {
            warn!(mapping = %def.identificator, "configured mapping shadows a static mapping; ignored");
        }
        !shadowing
    });

    let mut tsl_mappings = mapping::extract_mappings_from_certificate(cert, usable);
    mapping::static_mappings_from_result(result, &mut tsl_mappings);
    Ok(mapping::merge_tsl_mappings_over_policy_mappings(
        policy_mappings,
        &tsl_mappings,
        ranges,
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests;
