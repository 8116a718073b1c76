//! Per-specification validation rules and the registry that selects them.

use crate::analyzer::ExtensionAnalyzer;
use crate::mapping::{Classification, MappingType, Qscd};
use crate::uri;
use std::collections::HashMap;
use std::sync::Arc;

/// Outcome class of a service status URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Ok,
    ChainNotValid,
    Revoked,
}

/// The single mapping a qualifier URI sets on a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualifierEffect {
    Type(MappingType),
    Classification(Classification),
    Qscd(Qscd),
}

/// AdditionalServiceInformation URIs relevant to detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsiKind {
    RootCaQc,
    ForESignatures,
    ForESeals,
    ForWebSiteAuthentication,
}

/// Revocation service families a certificate can be checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevocationServiceKind {
    Crl,
    Ocsp,
}

/// Decisions that depend on the TSL specification and version.
///
/// URI comparisons are case-insensitive.
pub trait TslValidationRules: Send + Sync {
    /// Specification and version this rule set answers for.
    fn key(&self) -> (&'static str, &'static str);

    fn is_ca_pkc(&self, service_type: &str) -> bool;
    fn is_ca_qc(&self, service_type: &str) -> bool;
    fn is_national_root_ca_qc(&self, service_type: &str) -> bool;
    fn is_tsa_qualified(&self, service_type: &str) -> bool;
    fn is_tsa_non_qualified(&self, service_type: &str) -> bool;

    fn status_class(&self, status: &str) -> Option<StatusClass>;
    fn qualifier_effect(&self, qualifier: &str) -> Option<QualifierEffect>;
    fn asi_kind(&self, asi_uri: &str) -> Option<AsiKind>;

    /// Which revocation family a service type provides for a certificate
    /// of the given qualified-ness.
    fn revocation_service_kind(&self, service_type: &str, qualified: bool)
        -> Option<RevocationServiceKind>;

    fn is_european(&self, tsl_type: &str) -> bool;
    fn is_list_of_lists(&self, tsl_type: &str) -> bool;
    fn is_status_determination_approach_delinquent(&self, approach: &str) -> bool;

    /// Whether the certificate may be detected by a qualified CA service
    /// that carries no Qualifications extension.
    fn obeys_detection_conditions(&self, analyzer: &ExtensionAnalyzer) -> bool;

    fn is_status_ok(&self, status: &str) -> bool {
        self.status_class(status) == Some(StatusClass::Ok)
    }

    fn is_ca(&self, service_type: &str) -> bool {
        self.is_ca_qc(service_type)
            || self.is_ca_pkc(service_type)
            || self.is_national_root_ca_qc(service_type)
    }
}

/// Rule sets keyed by (specification, version).
#[derive(Clone)]
pub struct RulesRegistry {
    rules: HashMap<(String, String), Arc<dyn TslValidationRules>>,
}

impl RulesRegistry {
    /// A registry with no rule sets.
    pub fn empty() -> Self {
        RulesRegistry {
            rules: HashMap::new(),
        }
    }

    pub fn register(&mut self, rules: Arc<dyn TslValidationRules>) {
        let (spec, version) = rules.key();
        self.rules.insert((spec.to_string(), version.to_string()), rules);
    }

    pub fn get(&self, specification: &str, version: &str) -> Option<Arc<dyn TslValidationRules>> {
        self.rules
            .get(&(specification.trim().to_string(), version.trim().to_string()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RulesRegistry {
    /// Every rule set shipped with the crate.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(super::v020101::Ts119612V020101));
        registry
    }
}

impl std::fmt::Debug for RulesRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<_> = self.rules.keys().collect();
        keys.sort();
        f.debug_struct("RulesRegistry").field("rules", &keys).finish()
    }
}

/// Whether a TSL type names a list of lists, EU or otherwise.
pub(crate) fn tsl_type_is_list_of_lists(tsl_type: &str) -> bool {
    let t = tsl_type.trim();
    if uri::uri_eq(t, uri::TSL_TYPE_EU_LIST_OF_LISTS) {
        return true;
    }
    let lower = t.to_ascii_lowercase();
    lower.starts_with(&uri::TSL_TYPE_PREFIX.to_ascii_lowercase())
        && lower.ends_with(uri::TSL_TYPE_LIST_OF_LISTS_SUFFIX)
}
