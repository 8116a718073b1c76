#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing
)]
//! Property-based tests for status selection, qualifiers, mapping merge,
//! cache isolation and validation determinism.

use proptest::prelude::*;
use qtrust_lib::mapping::merge_tsl_mappings_over_policy_mappings;
use qtrust_lib::tsl::{LocalizedName, ServiceHistoryInstance};
use qtrust_lib::validator::effective_service_status;
use qtrust_lib::*;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use time::macros::datetime;
use time::OffsetDateTime;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const EPOCH: OffsetDateTime = datetime!(2000-01-01 0:00 UTC);

const FIXTURES: &[&str] = &[
    "qc-esig-qscd.pem",
    "qc-eseal.pem",
    "policy-wsa.pem",
    "policy-natural.pem",
    "plain.pem",
    "qc-revoked.pem",
    "tsa.pem",
    "unlisted-leaf.pem",
];

const QUALIFIERS: &[&str] = &[
    uri::Q_WITH_SSCD,
    uri::Q_NO_SSCD,
    uri::Q_SSCD_AS_IN_CERT,
    uri::Q_WITH_QSCD,
    uri::Q_NO_QSCD,
    uri::Q_QSCD_AS_IN_CERT,
    uri::Q_QSCD_MANAGED_ON_BEHALF,
    uri::Q_FOR_LEGAL_PERSON,
    uri::Q_FOR_ESIG,
    uri::Q_FOR_ESEAL,
    uri::Q_FOR_WSA,
    uri::Q_NOT_QUALIFIED,
    uri::Q_QC_STATEMENT,
    "http://uri.etsi.org/TrstSvc/TrustedList/SvcInfoExt/Unknown",
];

fn day(n: i64) -> OffsetDateTime {
    EPOCH + time::Duration::days(n)
}

fn data_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

fn fixture_cert(name: &str) -> Certificate {
    parse_cert(&std::fs::read(data_path(name)).unwrap()).unwrap()
}

fn fixture_validator() -> TslValidator {
    let text = std::fs::read_to_string(data_path("tsl-es.json")).unwrap();
    let tsl = TslObject::from_json(&text).unwrap();
    TslValidator::new(Arc::new(tsl), &RulesRegistry::default()).unwrap()
}

fn service_with_history(current: i64, history: &[i64]) -> TspService {
    TspService {
        service_type: uri::SVC_CA_QC.into(),
        names: vec![LocalizedName {
            lang: "en".into(),
            value: "Qtrust Qualified CA".into(),
        }],
        status: uri::STATUS_GRANTED.into(),
        status_starting_time: day(current),
        digital_identities: vec![],
        supply_points: vec![],
        extensions: vec![],
        history: history
            .iter()
            .map(|d| ServiceHistoryInstance {
                service_type: uri::SVC_CA_QC.into(),
                names: vec![],
                status: uri::STATUS_UNDER_SUPERVISION.into(),
                status_starting_time: day(*d),
                digital_identities: vec![],
                extensions: vec![],
            })
            .collect(),
    }
}

fn small_map() -> impl Strategy<Value = BTreeMap<String, String>> {
    prop::collection::btree_map("[a-e]|clasificacion|certQualified", "[a-z0-9]{1,4}", 0..6)
}

// ---------------------------------------------------------------------------
// Status-time ordering
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn effective_status_is_latest_strictly_before_date(
        current in 0i64..4000,
        history in prop::collection::vec(0i64..4000, 0..6),
        at in 0i64..4000,
    ) {
        let service = service_with_history(current, &history);
        let date = day(at);
        let starts: Vec<OffsetDateTime> = std::iter::once(current)
            .chain(history.iter().copied())
            .map(day)
            .collect();

        match effective_service_status(&service, date) {
            Some(effective) => {
                prop_assert!(effective.starting_time < date);
                prop_assert!(starts
                    .iter()
                    .all(|s| *s >= date || *s <= effective.starting_time));
                prop_assert_eq!(
                    effective.history_instance.is_none(),
                    effective.starting_time == day(current)
                        && effective.status == uri::STATUS_GRANTED
                );
            }
            None => prop_assert!(starts.iter().all(|s| *s >= date)),
        }
    }
}

// ---------------------------------------------------------------------------
// Qualifier idempotence
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn applying_a_qualifier_twice_equals_once(
        index in 0usize..QUALIFIERS.len(),
        fixture in 0usize..FIXTURES.len(),
    ) {
        let validator = fixture_validator();
        let cert = fixture_cert(FIXTURES[fixture]);
        let qualifier = QUALIFIERS[index];

        let mut once = ValidationResult::new(&cert);
        validator.apply_qualifier(qualifier, &mut once);
        let mut twice = once.clone();
        validator.apply_qualifier(qualifier, &mut twice);

        prop_assert_eq!(
            serde_json::to_value(&once).unwrap(),
            serde_json::to_value(&twice).unwrap()
        );
    }
}

// ---------------------------------------------------------------------------
// Mapping merge precedence
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn tsl_mappings_win_over_policy(policy in small_map(), tsl in small_map()) {
        let ranges = config::ClassificationRanges::default();
        let merged = merge_tsl_mappings_over_policy_mappings(&policy, &tsl, &ranges);

        for (key, value) in &tsl {
            prop_assert_eq!(merged.get(key), Some(value));
        }
        for (key, value) in &policy {
            if !tsl.contains_key(key) {
                prop_assert_eq!(merged.get(key), Some(value));
            }
        }
        prop_assert!(merged.contains_key(mapping::KEY_CERT_CLASSIFICATION));
    }
}

// ---------------------------------------------------------------------------
// Cache isolation
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn auxiliary_writes_hidden_until_assigned(
        codes in prop::collection::btree_set("[A-Z]{2}", 1..6),
    ) {
        let cache = TslCache::new();
        cache
            .add_country_region(TslCountryRegion::new(0, "ZZ", "Old"), false)
            .unwrap();
        cache.start_auxiliary_cache();

        for (i, code) in codes.iter().enumerate() {
            let id = i64::try_from(i).unwrap() + 1;
            cache
                .add_country_region(TslCountryRegion::new(id, code, code), true)
                .unwrap();
        }
        for code in &codes {
            if code != "ZZ" {
                prop_assert!(cache.get_country_region(code, false).unwrap().is_none());
            }
            prop_assert!(cache.get_country_region(code, true).unwrap().is_some());
        }
        prop_assert!(cache.is_reloading());

        cache.assign_as_principal(Duration::ZERO).unwrap();

        for code in &codes {
            prop_assert!(cache.get_country_region(code, false).unwrap().is_some());
        }
        if !codes.contains("ZZ") {
            prop_assert!(cache.get_country_region("ZZ", false).unwrap().is_none());
        }
        prop_assert!(!cache.is_reloading());
    }
}

// ---------------------------------------------------------------------------
// Validation determinism and detection monotonicity
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn validation_is_deterministic(
        fixture in 0usize..FIXTURES.len(),
        at in 0i64..12000,
        is_tsa in any::<bool>(),
    ) {
        let validator = fixture_validator();
        let cert = fixture_cert(FIXTURES[fixture]);
        let date = day(at);

        let first = validator.validate(&cert, is_tsa, date, false).unwrap();
        let second = validator.validate(&cert, is_tsa, date, false).unwrap();
        prop_assert_eq!(
            serde_json::to_value(&first).unwrap(),
            serde_json::to_value(&second).unwrap()
        );
    }

    #[test]
    fn undetected_results_carry_no_detection_data(
        fixture in 0usize..FIXTURES.len(),
        at in 0i64..12000,
        is_tsa in any::<bool>(),
    ) {
        let validator = fixture_validator();
        let cert = fixture_cert(FIXTURES[fixture]);
        let result = validator.validate(&cert, is_tsa, day(at), false).unwrap();

        if !result.has_been_detected() {
            prop_assert_eq!(result.result, ResultCode::NotDetected);
            prop_assert!(result.tsp_name.is_none());
            prop_assert!(result.tsp_service_for_detect.is_none());
            prop_assert!(result.tsp_service_for_validate.is_none());
            prop_assert!(result.history_instance.is_none());
            prop_assert_eq!(result.mapping_classification, Classification::Unknown);
            prop_assert_eq!(result.mapping_type, MappingType::Unknown);
            prop_assert_eq!(result.mapping_qscd, Qscd::Unknown);
            prop_assert!(result.issuer.is_empty());
        }
    }
}
