//! Mapping Calculator: derives the eIDAS mappings of a certificate.
//!
//! Three independent axes are computed from an [`ExtensionAnalyzer`]:
//! qualified-or-not, certificate classification and QSCD. Every function
//! here is pure and safe to call from any thread.

use crate::analyzer::ExtensionAnalyzer;
use crate::cache::{AssociationType, TslCountryRegionMapping};
use crate::cert::{CertField, Certificate};
use crate::config::ClassificationRanges;
use crate::oid;
use crate::result::ValidationResult;
use crate::QtrustError;
use serde::Serialize;
use std::collections::BTreeMap;

// ── Mapping keys and values ──────────────────────────────────────────────

/// Legacy numeric classification configured per country/region.
pub const KEY_CLASSIFICATION_LEGACY: &str = "clasificacion";
pub const KEY_CERT_QUALIFIED: &str = "certQualified";
pub const KEY_CERT_CLASSIFICATION: &str = "certClassification";
pub const KEY_QSCD: &str = "qscd";

pub const VALUE_YES: &str = "YES";
pub const VALUE_NO: &str = "NO";
pub const VALUE_UNKNOWN: &str = "UNKNOWN";
pub const VALUE_NATURAL_PERSON: &str = "NATURAL_PERSON";
pub const VALUE_LEGAL_PERSON: &str = "LEGAL_PERSON";
pub const VALUE_ESIG: &str = "ESIG";
pub const VALUE_ESEAL: &str = "ESEAL";
pub const VALUE_WSA: &str = "WSA";
pub const VALUE_TSA: &str = "TSA";
pub const VALUE_ASINCERT: &str = "ASINCERT";
pub const VALUE_YES_MANAGED_ON_BEHALF: &str = "YES_MANAGED_ON_BEHALF";

/// Keys computed from the validation result rather than configured.
pub const STATIC_MAPPING_KEYS: &[&str] = &[KEY_CERT_QUALIFIED, KEY_CERT_CLASSIFICATION, KEY_QSCD];

// ── Mapping axes ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MappingType {
    #[default]
    Unknown,
    Qualified,
    NonQualified,
}

impl MappingType {
    pub fn as_mapping_value(self) -> &'static str {
        match self {
            MappingType::Unknown => VALUE_UNKNOWN,
            MappingType::Qualified => VALUE_YES,
            MappingType::NonQualified => VALUE_NO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    #[default]
    Unknown,
    NaturalPerson,
    LegalPerson,
    ESig,
    ESeal,
    Wsa,
    Tsa,
}

impl Classification {
    pub fn as_mapping_value(self) -> &'static str {
        match self {
            Classification::Unknown => VALUE_UNKNOWN,
            Classification::NaturalPerson => VALUE_NATURAL_PERSON,
            Classification::LegalPerson => VALUE_LEGAL_PERSON,
            Classification::ESig => VALUE_ESIG,
            Classification::ESeal => VALUE_ESEAL,
            Classification::Wsa => VALUE_WSA,
            Classification::Tsa => VALUE_TSA,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Qscd {
    #[default]
    Unknown,
    Yes,
    No,
    /// The TSL defers to the certificate's own QcStatements.
    AsInCert,
    YesManagedOnBehalf,
}

impl Qscd {
    pub fn as_mapping_value(self) -> &'static str {
        match self {
            Qscd::Unknown => VALUE_UNKNOWN,
            Qscd::Yes => VALUE_YES,
            Qscd::No => VALUE_NO,
            Qscd::AsInCert => VALUE_ASINCERT,
            Qscd::YesManagedOnBehalf => VALUE_YES_MANAGED_ON_BEHALF,
        }
    }
}

// ── Calculations over the certificate ────────────────────────────────────

/// Qualified if a qualified QcStatement or a qualified policy is present.
pub fn mapping_type_qualified(analyzer: &ExtensionAnalyzer) -> Result<MappingType, QtrustError> {
    if analyzer.has_any_qc_statement(oid::QUALIFIED_QC_STATEMENTS)?
        || analyzer.has_any_policy(oid::QUALIFIED_POLICIES)
    {
        Ok(MappingType::Qualified)
    } else {
        Ok(MappingType::NonQualified)
    }
}

/// Classification by priority: QcType, then any QcStatement, then policies.
///
/// With `translate`, policy-based eSig/eSeal answers are reported as the
/// service type; otherwise as the person type (natural/legal).
pub fn mapping_classification(
    analyzer: &ExtensionAnalyzer,
    translate: bool,
) -> Result<Classification, QtrustError> {
    if analyzer.has_qc_eu_type()? {
        if analyzer.has_qc_eu_type_oid(oid::QCS_TYPE_ESIGN)? {
            return Ok(Classification::ESig);
        }
        if analyzer.has_qc_eu_type_oid(oid::QCS_TYPE_ESEAL)? {
            return Ok(Classification::ESeal);
        }
        if analyzer.has_qc_eu_type_oid(oid::QCS_TYPE_WEB)? {
            return Ok(Classification::Wsa);
        }
    }
    if analyzer.has_qc_statements()? {
        return Ok(Classification::ESig);
    }
    if analyzer.has_policies() {
        if analyzer.has_any_policy(oid::ESIG_POLICIES) {
            return Ok(if translate {
                Classification::ESig
            } else {
                Classification::NaturalPerson
            });
        }
        if analyzer.has_any_policy(oid::ESEAL_POLICIES) {
            return Ok(if translate {
                Classification::ESeal
            } else {
                Classification::LegalPerson
            });
        }
        if analyzer.has_any_policy(oid::WSA_POLICIES) {
            return Ok(Classification::Wsa);
        }
    }
    Ok(Classification::Unknown)
}

/// QSCD from the QcSSCD statement, else from the in/not-in QSCD policy sets.
pub fn mapping_qscd(analyzer: &ExtensionAnalyzer) -> Result<Qscd, QtrustError> {
    if analyzer.has_qc_statement(oid::QCS_SSCD)? {
        return Ok(Qscd::Yes);
    }
    if analyzer.has_any_policy(oid::IN_QSCD_POLICIES) {
        return Ok(Qscd::Yes);
    }
    if analyzer.has_any_policy(oid::NOT_IN_QSCD_POLICIES) {
        return Ok(Qscd::No);
    }
    Ok(Qscd::Unknown)
}

// ── Mapping tables ───────────────────────────────────────────────────────

/// Resolve configured mapping definitions against a certificate.
///
/// Free associations emit their literal value; simple associations emit
/// the certificate field whose numeric id is the configured value. Empty
/// results are not emitted.
pub fn extract_mappings_from_certificate<'a>(
    cert: &Certificate,
    definitions: impl IntoIterator<Item = &'a TslCountryRegionMapping>,
) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for def in definitions {
        let value = match def.association_type {
            AssociationType::Free => Some(def.value.clone()),
            AssociationType::Simple => def
                .value
                .trim()
                .parse::<u32>()
                .ok()
                .and_then(CertField::from_id)
                .and_then(|field| cert.field(field)),
        };
        if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
            out.insert(def.identificator.clone(), value);
        }
    }
    out
}

/// Merge TSL-derived mappings over policy mappings; TSL values win.
///
/// An absent or `UNKNOWN` classification in the merged table is recomputed
/// from the legacy `clasificacion` policy mapping.
pub fn merge_tsl_mappings_over_policy_mappings(
    policy: &BTreeMap<String, String>,
    tsl: &BTreeMap<String, String>,
    ranges: &ClassificationRanges,
) -> BTreeMap<String, String> {
    let mut merged = policy.clone();
    merged.extend(tsl.iter().map(|(k, v)| (k.clone(), v.clone())));

    let undetermined = merged
        .get(KEY_CERT_CLASSIFICATION)
        .map_or(true, |v| v.trim().is_empty() || v == VALUE_UNKNOWN);
    if undetermined {
        let legacy = policy
            .get(KEY_CLASSIFICATION_LEGACY)
            .map_or(Classification::Unknown, |v| classification_from_legacy(v, ranges));
        merged.insert(
            KEY_CERT_CLASSIFICATION.to_string(),
            legacy.as_mapping_value().to_string(),
        );
    }
    merged
}

/// Translate a legacy numeric classification through the configured ranges.
pub fn classification_from_legacy(value: &str, ranges: &ClassificationRanges) -> Classification {
    let Ok(n) = value.trim().parse::<i64>() else {
        return Classification::Unknown;
    };
    let table = [
        (&ranges.natural_person, Classification::NaturalPerson),
        (&ranges.legal_person, Classification::LegalPerson),
        (&ranges.esig, Classification::ESig),
        (&ranges.eseal, Classification::ESeal),
        (&ranges.wsa, Classification::Wsa),
        (&ranges.tsa, Classification::Tsa),
    ];
    table
        .iter()
        .find(|(set, _)| set.contains(&n))
        .map_or(Classification::Unknown, |(_, c)| *c)
}

/// Fill `certQualified`, `certClassification` and `qscd` from a result.
///
/// Undetermined values are recomputed from the certificate through the
/// result's analyzer; a parsing failure leaves `UNKNOWN`.
pub fn static_mappings_from_result(
    result: &ValidationResult,
    mappings: &mut BTreeMap<String, String>,
) {
    let analyzer = result.analyzer();

    let qualified = match result.mapping_type {
        MappingType::Unknown => mapping_type_qualified(analyzer).unwrap_or_default(),
        other => other,
    };
    mappings.insert(KEY_CERT_QUALIFIED.into(), qualified.as_mapping_value().into());

    let classification = match result.mapping_classification {
        Classification::Unknown => mapping_classification(analyzer, true).unwrap_or_default(),
        other => other,
    };
    mappings.insert(
        KEY_CERT_CLASSIFICATION.into(),
        classification.as_mapping_value().into(),
    );

    let qscd = match result.mapping_qscd {
        Qscd::Unknown | Qscd::AsInCert => mapping_qscd(analyzer).unwrap_or_default(),
        other => other,
    };
    mappings.insert(KEY_QSCD.into(), qscd.as_mapping_value().into());
}

/// Whether a configured mapping name collides with a computed one.
pub fn is_static_mapping_name(name: &str) -> bool {
    STATIC_MAPPING_KEYS
        .iter()
        .any(|k| k.eq_ignore_ascii_case(name.trim()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::analyzer::QcStatements;
    use crate::cert::parse_cert;
    use proptest::prelude::*;

    fn analyzer(pem: &[u8]) -> ExtensionAnalyzer {
        ExtensionAnalyzer::new(&parse_cert(pem).unwrap())
    }

    fn policies_only(policies: &[&str]) -> ExtensionAnalyzer {
        ExtensionAnalyzer::from_parts(None, policies.iter().map(|p| p.to_string()).collect())
    }

    fn mapping(id: &str, value: &str, association_type: AssociationType) -> TslCountryRegionMapping {
        TslCountryRegionMapping {
            mapping_id: 0,
            identificator: id.into(),
            description: None,
            value: value.into(),
            association_type,
        }
    }

    fn table(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    // ---- qualified ----

    #[test]
    fn qc_compliance_is_qualified() {
        let a = analyzer(include_bytes!("../tests/data/qc-esig-qscd.pem"));
        assert_eq!(mapping_type_qualified(&a).unwrap(), MappingType::Qualified);
    }

    #[test]
    fn qualified_policy_is_qualified() {
        let a = policies_only(&[oid::QCP_WEB]);
        assert_eq!(mapping_type_qualified(&a).unwrap(), MappingType::Qualified);
    }

    #[test]
    fn plain_is_not_qualified() {
        let a = analyzer(include_bytes!("../tests/data/plain.pem"));
        assert_eq!(mapping_type_qualified(&a).unwrap(), MappingType::NonQualified);
    }

    #[test]
    fn malformed_statements_propagate() {
        let a = analyzer(include_bytes!("../tests/data/bad-qcstatements.pem"));
        assert!(mapping_type_qualified(&a).is_err());
        assert!(mapping_classification(&a, true).is_err());
    }

    // ---- classification ----

    #[test]
    fn eu_type_wins() {
        let esig = analyzer(include_bytes!("../tests/data/qc-esig-qscd.pem"));
        let eseal = analyzer(include_bytes!("../tests/data/qc-eseal.pem"));
        assert_eq!(mapping_classification(&esig, false).unwrap(), Classification::ESig);
        assert_eq!(mapping_classification(&eseal, false).unwrap(), Classification::ESeal);
    }

    #[test]
    fn any_statement_means_esig() {
        let qc = QcStatements {
            statement_oids: vec![oid::QCS_COMPLIANCE.into()],
            ..Default::default()
        };
        let a = ExtensionAnalyzer::from_parts(Some(qc), vec![oid::QCP_LEGAL.into()]);
        assert_eq!(mapping_classification(&a, false).unwrap(), Classification::ESig);
    }

    #[test]
    fn policy_classification_translates() {
        let natural = policies_only(&[oid::QCP_NATURAL]);
        assert_eq!(mapping_classification(&natural, true).unwrap(), Classification::ESig);
        assert_eq!(
            mapping_classification(&natural, false).unwrap(),
            Classification::NaturalPerson
        );
        let legal = policies_only(&[oid::QCP_LEGAL]);
        assert_eq!(mapping_classification(&legal, true).unwrap(), Classification::ESeal);
        assert_eq!(
            mapping_classification(&legal, false).unwrap(),
            Classification::LegalPerson
        );
        let web = policies_only(&[oid::QCP_WEB]);
        assert_eq!(mapping_classification(&web, false).unwrap(), Classification::Wsa);
    }

    #[test]
    fn no_signal_is_unknown() {
        let a = analyzer(include_bytes!("../tests/data/plain.pem"));
        assert_eq!(mapping_classification(&a, true).unwrap(), Classification::Unknown);
    }

    // ---- qscd ----

    #[test]
    fn qscd_axes() {
        let sscd = analyzer(include_bytes!("../tests/data/qc-esig-qscd.pem"));
        assert_eq!(mapping_qscd(&sscd).unwrap(), Qscd::Yes);
        assert_eq!(mapping_qscd(&policies_only(&[oid::QCP_LEGAL_QSCD])).unwrap(), Qscd::Yes);
        assert_eq!(mapping_qscd(&policies_only(&[oid::QCP_NATURAL])).unwrap(), Qscd::No);
        assert_eq!(mapping_qscd(&policies_only(&[])).unwrap(), Qscd::Unknown);
    }

    // ---- extraction ----

    #[test]
    fn extracts_free_and_simple() {
        let cert = parse_cert(include_bytes!("../tests/data/qc-esig-qscd.pem")).unwrap();
        let defs = vec![
            mapping("issuerCountry", "ES", AssociationType::Free),
            mapping("serial", "3", AssociationType::Simple),
            mapping("empty", "  ", AssociationType::Free),
            mapping("bogus", "99", AssociationType::Simple),
            mapping("nan", "serial", AssociationType::Simple),
        ];
        let out = extract_mappings_from_certificate(&cert, &defs);
        assert_eq!(out, table(&[("issuerCountry", "ES"), ("serial", "10:01")]));
    }

    // ---- merge ----

    #[test]
    fn merge_prefers_tsl_and_recomputes_unknown() {
        let ranges = ClassificationRanges::default();
        let policy = table(&[("clasificacion", "1"), ("certQualified", "NO")]);
        let tsl = table(&[("certQualified", "YES"), ("certClassification", "UNKNOWN")]);
        let merged = merge_tsl_mappings_over_policy_mappings(&policy, &tsl, &ranges);
        assert_eq!(merged.get("certQualified").unwrap(), "YES");
        assert_eq!(merged.get("certClassification").unwrap(), "LEGAL_PERSON");
    }

    #[test]
    fn merge_keeps_determined_classification() {
        let ranges = ClassificationRanges::default();
        let policy = table(&[("clasificacion", "3")]);
        let tsl = table(&[("certClassification", "ESEAL")]);
        let merged = merge_tsl_mappings_over_policy_mappings(&policy, &tsl, &ranges);
        assert_eq!(merged.get("certClassification").unwrap(), "ESEAL");
    }

    #[test]
    fn legacy_classification() {
        let ranges = ClassificationRanges::default();
        assert_eq!(classification_from_legacy("5", &ranges), Classification::NaturalPerson);
        assert_eq!(classification_from_legacy(" 3 ", &ranges), Classification::Tsa);
        assert_eq!(classification_from_legacy("42", &ranges), Classification::Unknown);
        assert_eq!(classification_from_legacy("x", &ranges), Classification::Unknown);
    }

    // ---- static mappings ----

    #[test]
    fn static_mappings_recompute_unknowns() {
        let cert = parse_cert(include_bytes!("../tests/data/qc-eseal.pem")).unwrap();
        let result = ValidationResult::new(&cert);
        let mut out = BTreeMap::new();
        static_mappings_from_result(&result, &mut out);
        assert_eq!(out.get("certQualified").unwrap(), "YES");
        assert_eq!(out.get("certClassification").unwrap(), "ESEAL");
        assert_eq!(out.get("qscd").unwrap(), "NO");
    }

    #[test]
    fn static_mappings_keep_result_values() {
        let cert = parse_cert(include_bytes!("../tests/data/plain.pem")).unwrap();
        let mut result = ValidationResult::new(&cert);
        result.mapping_qscd = Qscd::YesManagedOnBehalf;
        result.mapping_classification = Classification::Tsa;
        let mut out = BTreeMap::new();
        static_mappings_from_result(&result, &mut out);
        assert_eq!(out.get("qscd").unwrap(), "YES_MANAGED_ON_BEHALF");
        assert_eq!(out.get("certClassification").unwrap(), "TSA");
        assert_eq!(out.get("certQualified").unwrap(), "NO");
    }

    #[test]
    fn static_names() {
        assert!(is_static_mapping_name("qscd"));
        assert!(is_static_mapping_name("CertQualified"));
        assert!(!is_static_mapping_name("clasificacion"));
    }

    proptest! {
        #[test]
        fn merge_precedence(
            policy in prop::collection::btree_map("[a-z]{1,4}", "[A-Z]{1,4}", 0..8),
            tsl in prop::collection::btree_map("[a-z]{1,4}", "[A-Z]{1,4}", 0..8),
        ) {
            let merged = merge_tsl_mappings_over_policy_mappings(
                &policy, &tsl, &ClassificationRanges::default());
            for (k, v) in &tsl {
                prop_assert_eq!(merged.get(k), Some(v));
            }
            for (k, v) in &policy {
                if !tsl.contains_key(k) {
                    prop_assert_eq!(merged.get(k), Some(v));
                }
            }
        }
    }
}
