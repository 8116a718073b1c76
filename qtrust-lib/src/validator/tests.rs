use super::*;
use crate::cert::parse_cert;
use crate::mapping::Qscd;
use crate::revocation::{
    MemoryFetcher, OcspCertId, OcspCertStatus, OcspResponseStatus, OcspSingleResponse,
    RevocationEvidence,
};
use crate::tsl::{
    Assert, CriteriaList, DigitalIdentity, LocalizedName, SchemeInformation, ServiceExtension,
};
use crate::uri;
use time::macros::datetime;

const CA: &[u8] = include_bytes!("../../tests/data/ca.pem");
const ESIG: &[u8] = include_bytes!("../../tests/data/qc-esig-qscd.pem");
const ESEAL: &[u8] = include_bytes!("../../tests/data/qc-eseal.pem");
const PLAIN: &[u8] = include_bytes!("../../tests/data/plain.pem");
const REVOKED: &[u8] = include_bytes!("../../tests/data/qc-revoked.pem");
const TSA: &[u8] = include_bytes!("../../tests/data/tsa.pem");
const UNLISTED: &[u8] = include_bytes!("../../tests/data/unlisted-leaf.pem");
const CA_CRL: &[u8] = include_bytes!("../../tests/data/ca.crl.pem");

const DATE: OffsetDateTime = datetime!(2025-01-01 0:00 UTC);
const BEFORE: OffsetDateTime = datetime!(2020-01-01 0:00 UTC);

// ---- helpers ----

fn names(value: &str) -> Vec<LocalizedName> {
    vec![LocalizedName {
        lang: "en".into(),
        value: value.into(),
    }]
}

fn identity(pem: &[u8]) -> DigitalIdentity {
    DigitalIdentity::X509Certificate {
        der: parse_cert(pem).unwrap().der().to_vec(),
    }
}

fn asi(uri: &str) -> ServiceExtension {
    ServiceExtension::AdditionalServiceInformation {
        uri: uri.into(),
        critical: false,
        information_value: None,
    }
}

fn service(service_type: &str, status: &str, extensions: Vec<ServiceExtension>) -> TspService {
    TspService {
        service_type: service_type.into(),
        names: names("Qualified CA service"),
        status: status.into(),
        status_starting_time: BEFORE,
        digital_identities: vec![identity(CA)],
        supply_points: vec![],
        extensions,
        history: vec![],
    }
}

fn qualified_ca(status: &str) -> TspService {
    service(uri::SVC_CA_QC, status, vec![asi(uri::ASI_FOR_ESIGNATURES)])
}

fn tsl_of(tsl_type: &str, services: Vec<TspService>) -> Arc<TslObject> {
    Arc::new(TslObject {
        scheme_information: SchemeInformation {
            tsl_type: tsl_type.into(),
            sequence_number: 42,
            scheme_territory: "ES".into(),
            specification: uri::SPECIFICATION_119612.into(),
            version: uri::VERSION_020101.into(),
            status_determination_approach: String::new(),
            issue_date: datetime!(2024-12-01 0:00 UTC),
            next_update: Some(datetime!(2025-06-01 0:00 UTC)),
        },
        trust_service_providers: vec![TrustServiceProvider {
            names: names("Qtrust Provider"),
            services,
        }],
    })
}

fn validator(services: Vec<TspService>) -> TslValidator {
    TslValidator::new(tsl_of(uri::TSL_TYPE_EU_GENERIC, services), &RulesRegistry::default()).unwrap()
}

fn cert(pem: &[u8]) -> Certificate {
    parse_cert(pem).unwrap()
}

fn policy_criteria(policy: &str) -> CriteriaList {
    CriteriaList {
        assert: Assert::All,
        key_usage: vec![],
        policy_sets: vec![vec![policy.into()]],
        criteria_lists: vec![],
        other_criteria: None,
    }
}

fn qualifications(critical: bool, elements: Vec<QualificationElement>) -> ServiceExtension {
    ServiceExtension::Qualifications { critical, elements }
}

fn good_ocsp(leaf: &Certificate, signer_pem: &[u8]) -> OcspResponse {
    OcspResponse {
        response_status: OcspResponseStatus::Successful,
        signer_certificate: Some(cert(signer_pem).der().to_vec()),
        responses: vec![OcspSingleResponse {
            cert_id: OcspCertId::new(leaf, &cert(CA).public_key_bits),
            cert_status: OcspCertStatus::Good,
            this_update: datetime!(2024-12-31 0:00 UTC),
            next_update: Some(datetime!(2025-01-07 0:00 UTC)),
        }],
    }
}

// ---- effective status ----

#[test]
fn effective_status_picks_latest_before_date() {
    let mut svc = qualified_ca(uri::STATUS_WITHDRAWN);
    svc.status_starting_time = datetime!(2026-01-01 0:00 UTC);
    svc.history = vec![
        ServiceHistoryInstance {
            service_type: uri::SVC_CA_QC.into(),
            names: vec![],
            status: uri::STATUS_UNDER_SUPERVISION.into(),
            status_starting_time: datetime!(2010-01-01 0:00 UTC),
            digital_identities: vec![],
            extensions: vec![],
        },
        ServiceHistoryInstance {
            service_type: uri::SVC_CA_QC.into(),
            names: vec![],
            status: uri::STATUS_GRANTED.into(),
            status_starting_time: datetime!(2016-07-01 0:00 UTC),
            digital_identities: vec![],
            extensions: vec![],
        },
    ];

    let effective = effective_service_status(&svc, DATE).unwrap();
    assert_eq!(effective.status, uri::STATUS_GRANTED);
    assert!(effective.history_instance.is_some());

    let later = effective_service_status(&svc, datetime!(2027-01-01 0:00 UTC)).unwrap();
    assert_eq!(later.status, uri::STATUS_WITHDRAWN);
    assert!(later.history_instance.is_none());

    assert!(effective_service_status(&svc, datetime!(2000-01-01 0:00 UTC)).is_none());
}

#[test]
fn effective_status_excludes_starting_at_date() {
    let mut svc = qualified_ca(uri::STATUS_GRANTED);
    svc.status_starting_time = DATE;
    assert!(effective_service_status(&svc, DATE).is_none());
}

// ---- detection ----

#[test]
fn detects_qualified_esig_under_ca_qc() {
    let v = validator(vec![qualified_ca(uri::STATUS_GRANTED)]);
    let r = v.validate(&cert(ESIG), false, DATE, false).unwrap();

    assert_eq!(r.result, ResultCode::DetectedUnknown);
    assert_eq!(r.mapping_type, MappingType::Qualified);
    assert_eq!(r.mapping_classification, Classification::ESig);
    assert_eq!(r.tsp_name.as_deref(), Some("Qtrust Provider"));
    assert_eq!(r.tsp_service_name_for_detect.as_deref(), Some("Qualified CA service"));
    assert!(r.tsp_service_name_for_validate.is_none());
    assert!(r.issuer.certificate.is_some());
    assert!(r.european);
    assert_eq!(r.tsl_sequence_number, 42);
    assert_eq!(r.tsl_country_region_code.as_deref(), Some("ES"));
}

#[test]
fn withdrawn_service_is_final() {
    let v = validator(vec![qualified_ca(uri::STATUS_WITHDRAWN)]);
    let r = v.validate(&cert(ESIG), false, DATE, true).unwrap();

    assert_eq!(r.result, ResultCode::RevokedByServiceStatus);
    assert!(r.from_service_status);
    assert_eq!(r.tsp_service_name_for_validate, r.tsp_service_name_for_detect);
    assert!(!r.has_revocation_evidence());
}

#[test]
fn ceased_supervision_breaks_chain() {
    let v = validator(vec![qualified_ca(uri::STATUS_SUPERVISION_CEASED)]);
    let r = v.validate(&cert(ESIG), false, DATE, false).unwrap();
    assert_eq!(r.result, ResultCode::CertchainNotValidByServiceStatus);
}

#[test]
fn historical_status_applies() {
    let mut svc = qualified_ca(uri::STATUS_WITHDRAWN);
    svc.status_starting_time = datetime!(2026-01-01 0:00 UTC);
    svc.history = vec![ServiceHistoryInstance {
        service_type: uri::SVC_CA_QC.into(),
        names: vec![],
        status: uri::STATUS_GRANTED.into(),
        status_starting_time: BEFORE,
        digital_identities: vec![],
        extensions: vec![],
    }];
    let r = validator(vec![svc]).validate(&cert(ESIG), false, DATE, false).unwrap();
    assert_eq!(r.result, ResultCode::DetectedUnknown);
    assert!(r.history_instance.is_some());
}

#[test]
fn unlisted_certificate_not_detected() {
    let v = validator(vec![qualified_ca(uri::STATUS_GRANTED)]);
    let r = v.validate(&cert(UNLISTED), false, DATE, true).unwrap();

    assert_eq!(r.result, ResultCode::NotDetected);
    assert!(r.tsp_name.is_none());
    assert!(r.tsp_service_for_detect.is_none());
    assert_eq!(r.mapping_type, MappingType::Unknown);
    assert_eq!(r.mapping_classification, Classification::Unknown);
    assert!(r.issuer.is_empty());
}

#[test]
fn ca_pkc_is_non_qualified() {
    let v = validator(vec![service(uri::SVC_CA_PKC, uri::STATUS_GRANTED, vec![])]);
    let r = v.validate(&cert(PLAIN), false, DATE, false).unwrap();
    assert_eq!(r.result, ResultCode::DetectedUnknown);
    assert_eq!(r.mapping_type, MappingType::NonQualified);
}

#[test]
fn non_european_ca_qc_not_detected() {
    let tsl = tsl_of(
        "http://uri.etsi.org/TrstSvc/TrustedList/TSLType/CCgeneric",
        vec![service(uri::SVC_CA_QC, uri::STATUS_GRANTED, vec![])],
    );
    let v = TslValidator::new(tsl, &RulesRegistry::default()).unwrap();
    let r = v.validate(&cert(ESIG), false, DATE, false).unwrap();
    assert!(!r.european);
    assert_eq!(r.result, ResultCode::NotDetected);
    assert_eq!(r.mapping_type, MappingType::Unknown);
    assert!(r.issuer.is_empty());
}

#[test]
fn non_european_ca_pkc_detects() {
    let tsl = tsl_of(
        "http://uri.etsi.org/TrstSvc/TrustedList/TSLType/CCgeneric",
        vec![service(uri::SVC_CA_PKC, uri::STATUS_GRANTED, vec![])],
    );
    let v = TslValidator::new(tsl, &RulesRegistry::default()).unwrap();
    let r = v.validate(&cert(PLAIN), false, DATE, false).unwrap();
    assert_eq!(r.result, ResultCode::DetectedUnknown);
    assert_eq!(r.mapping_type, MappingType::NonQualified);
}

#[test]
fn plain_certificate_without_signals_not_detected() {
    let v = validator(vec![service(uri::SVC_CA_QC, uri::STATUS_GRANTED, vec![])]);
    let r = v.validate(&cert(PLAIN), false, DATE, false).unwrap();
    assert_eq!(r.result, ResultCode::NotDetected);
    assert_eq!(r.mapping_type, MappingType::Unknown);
}

#[test]
fn conditions_detect_without_asi() {
    let v = validator(vec![service(uri::SVC_CA_QC, uri::STATUS_GRANTED, vec![])]);
    let r = v.validate(&cert(ESIG), false, DATE, false).unwrap();
    assert_eq!(r.result, ResultCode::DetectedUnknown);
    assert_eq!(r.mapping_type, MappingType::Qualified);
}

#[test]
fn undecided_mappings_come_from_certificate() {
    let v = validator(vec![qualified_ca(uri::STATUS_GRANTED)]);
    let r = v.validate(&cert(ESIG), false, DATE, false).unwrap();
    assert_eq!(r.mapping_type, MappingType::Qualified);
    assert_eq!(r.mapping_qscd, Qscd::Yes);
}

// ---- qualifications ----

#[test]
fn qualifiers_set_mappings() {
    let element = QualificationElement {
        qualifiers: vec![
            uri::Q_QC_STATEMENT.into(),
            uri::Q_FOR_ESEAL.into(),
            uri::Q_NO_QSCD.into(),
        ],
        criteria: policy_criteria(oid::QCP_LEGAL),
    };
    let v = validator(vec![service(
        uri::SVC_CA_QC,
        uri::STATUS_GRANTED,
        vec![qualifications(true, vec![element])],
    )]);
    let r = v.validate(&cert(ESEAL), false, DATE, false).unwrap();
    assert_eq!(r.result, ResultCode::DetectedUnknown);
    assert_eq!(r.mapping_type, MappingType::Qualified);
    assert_eq!(r.mapping_classification, Classification::ESeal);
    assert_eq!(r.mapping_qscd, Qscd::No);
}

#[test]
fn later_qualifier_wins() {
    let element = QualificationElement {
        qualifiers: vec![uri::Q_FOR_ESIG.into(), uri::Q_FOR_ESEAL.into()],
        criteria: policy_criteria(oid::QCP_NATURAL_QSCD),
    };
    let v = validator(vec![service(
        uri::SVC_CA_QC,
        uri::STATUS_GRANTED,
        vec![asi(uri::ASI_FOR_ESIGNATURES), qualifications(false, vec![element])],
    )]);
    let r = v.validate(&cert(ESIG), false, DATE, false).unwrap();
    assert_eq!(r.mapping_classification, Classification::ESeal);
}

#[test]
fn critical_unsupported_criteria_fails() {
    let mut criteria = policy_criteria(oid::QCP_NATURAL_QSCD);
    criteria.other_criteria = Some("CertSubjectDNAttribute".into());
    let element = QualificationElement {
        qualifiers: vec![uri::Q_NO_QSCD.into()],
        criteria,
    };

    let critical = validator(vec![service(
        uri::SVC_CA_QC,
        uri::STATUS_GRANTED,
        vec![qualifications(true, vec![element.clone()])],
    )]);
    let err = critical.validate(&cert(ESIG), false, DATE, false).unwrap_err();
    assert!(matches!(err, QtrustError::ValidationFailed { .. }));

    let lenient = validator(vec![service(
        uri::SVC_CA_QC,
        uri::STATUS_GRANTED,
        vec![asi(uri::ASI_FOR_ESIGNATURES), qualifications(false, vec![element])],
    )]);
    let r = lenient.validate(&cert(ESIG), false, DATE, false).unwrap();
    assert_eq!(r.result, ResultCode::DetectedUnknown);
    assert_eq!(r.mapping_qscd, Qscd::Yes);
}

#[test]
fn non_critical_error_discards_whole_extension() {
    let mut broken = policy_criteria(oid::QCP_NATURAL_QSCD);
    broken.other_criteria = Some("CertSubjectDNAttribute".into());
    let elements = vec![
        QualificationElement {
            qualifiers: vec![uri::Q_WITH_QSCD.into()],
            criteria: broken,
        },
        QualificationElement {
            qualifiers: vec![uri::Q_NO_QSCD.into(), uri::Q_FOR_ESEAL.into()],
            criteria: policy_criteria(oid::QCP_NATURAL_QSCD),
        },
    ];

    let with_asi = validator(vec![service(
        uri::SVC_CA_QC,
        uri::STATUS_GRANTED,
        vec![asi(uri::ASI_FOR_ESIGNATURES), qualifications(false, elements.clone())],
    )]);
    let r = with_asi.validate(&cert(ESIG), false, DATE, false).unwrap();
    assert_eq!(r.result, ResultCode::DetectedUnknown);
    assert_eq!(r.mapping_classification, Classification::ESig);
    assert_eq!(r.mapping_qscd, Qscd::Yes);

    let without_asi = validator(vec![service(
        uri::SVC_CA_QC,
        uri::STATUS_GRANTED,
        vec![asi(uri::ASI_ROOT_CA_QC), qualifications(false, elements)],
    )]);
    let r = without_asi.validate(&cert(ESIG), false, DATE, false).unwrap();
    assert_eq!(r.result, ResultCode::NotDetected);
}

#[test]
fn apply_qualifier_is_idempotent() {
    let v = validator(vec![]);
    let leaf = cert(ESIG);
    let mut once = ValidationResult::new(&leaf);
    assert!(v.apply_qualifier(uri::Q_QSCD_MANAGED_ON_BEHALF, &mut once));
    let mut twice = once.clone();
    assert!(v.apply_qualifier(uri::Q_QSCD_MANAGED_ON_BEHALF, &mut twice));
    assert_eq!(once.mapping_qscd, twice.mapping_qscd);
    assert!(!v.apply_qualifier("urn:not-a-qualifier", &mut twice));
}

// ---- TSA ----

#[test]
fn tsa_matched_by_certificate_identity() {
    let mut tsa_service = service(uri::SVC_TSA_QTST, uri::STATUS_GRANTED, vec![]);
    tsa_service.digital_identities = vec![identity(TSA)];
    let v = validator(vec![tsa_service]);

    let r = v.validate(&cert(TSA), true, DATE, false).unwrap();
    assert_eq!(r.result, ResultCode::DetectedUnknown);
    assert_eq!(r.mapping_classification, Classification::Tsa);
    assert_eq!(r.mapping_type, MappingType::Qualified);

    let not_tsa = v.validate(&cert(TSA), false, DATE, false).unwrap();
    assert_eq!(not_tsa.result, ResultCode::NotDetected);
}

#[test]
fn tsa_certificate_ignores_ca_services() {
    for service_type in [uri::SVC_CA_PKC, uri::SVC_CA_QC] {
        let v = validator(vec![service(service_type, uri::STATUS_GRANTED, vec![])]);
        let r = v.validate(&cert(TSA), true, DATE, false).unwrap();
        assert_eq!(r.result, ResultCode::NotDetected, "{service_type}");
        assert_eq!(r.mapping_type, MappingType::Unknown);
        assert_eq!(r.mapping_classification, Classification::Unknown);
    }
}

// ---- list-level checks ----

#[test]
fn list_of_lists_never_detects() {
    let tsl = tsl_of(uri::TSL_TYPE_EU_LIST_OF_LISTS, vec![qualified_ca(uri::STATUS_GRANTED)]);
    let v = TslValidator::new(tsl, &RulesRegistry::default()).unwrap();
    let r = v.validate(&cert(ESIG), false, DATE, false).unwrap();
    assert_eq!(r.result, ResultCode::NotDetected);
}

#[test]
fn unknown_version_has_no_rules() {
    let mut tsl = (*tsl_of(uri::TSL_TYPE_EU_GENERIC, vec![])).clone();
    tsl.scheme_information.version = "010101".into();
    let err = TslValidator::new(Arc::new(tsl), &RulesRegistry::default()).unwrap_err();
    assert!(matches!(err, QtrustError::InvalidArgument { .. }));
}

#[test]
fn missing_or_garbage_certificate_is_invalid_argument() {
    let v = validator(vec![]);
    let err = v.validate_certificate_with_tsl(&[], false, DATE, false).unwrap_err();
    assert_eq!(err.code(), "COD_187");
    assert!(matches!(err, QtrustError::InvalidArgument { .. }));
    assert!(matches!(
        v.validate_certificate_with_tsl(b"garbage", false, DATE, false),
        Err(QtrustError::InvalidArgument { .. })
    ));
}

// ---- revocation through the fetcher ----

fn crl_fetcher() -> Arc<MemoryFetcher> {
    Arc::new(MemoryFetcher::new().with_crl("http://crl.qtrust.test/ca.crl", Crl::load(CA_CRL).unwrap()))
}

#[test]
fn distribution_point_crl_validates() {
    let v = validator(vec![qualified_ca(uri::STATUS_GRANTED)]).with_fetcher(crl_fetcher());
    let r = v.validate(&cert(ESIG), false, DATE, true).unwrap();

    assert_eq!(r.result, ResultCode::Valid);
    assert!(r.from_dp_or_aia);
    assert_eq!(r.tsp_service_name_for_validate.as_deref(), Some(DP_OR_AIA_SERVICE_NAME));
    assert_eq!(r.revocation_url.as_deref(), Some("http://crl.qtrust.test/ca.crl"));
    assert!(r.has_revocation_evidence());
}

#[test]
fn distribution_point_crl_revokes() {
    let v = validator(vec![qualified_ca(uri::STATUS_GRANTED)]).with_fetcher(crl_fetcher());
    let r = v.validate(&cert(REVOKED), false, DATE, true).unwrap();

    assert_eq!(r.result, ResultCode::Revoked);
    assert_eq!(r.revocation_date, Some(datetime!(2024-06-01 0:00 UTC)));
    assert_eq!(r.revocation_reason, 1);
}

#[test]
fn revocation_before_listing_date_is_valid() {
    let v = validator(vec![qualified_ca(uri::STATUS_GRANTED)]).with_fetcher(crl_fetcher());
    let r = v.validate(&cert(REVOKED), false, datetime!(2024-03-01 0:00 UTC), true).unwrap();
    assert_eq!(r.result, ResultCode::Valid);
}

#[test]
fn crl_service_supply_point_validates() {
    let mut crl_service = service(uri::SVC_CERTSTATUS_CRL, uri::STATUS_GRANTED, vec![]);
    crl_service.names = names("Qtrust CRL");
    crl_service.supply_points = vec!["http://crl.qtrust.test/ca.crl".into()];
    let v = validator(vec![service(uri::SVC_CA_PKC, uri::STATUS_GRANTED, vec![]), crl_service])
        .with_fetcher(crl_fetcher());

    let r = v.validate(&cert(PLAIN), false, DATE, true).unwrap();
    assert_eq!(r.result, ResultCode::Valid);
    assert!(!r.from_dp_or_aia);
    assert_eq!(r.tsp_service_name_for_validate.as_deref(), Some("Qtrust CRL"));
}

#[test]
fn provider_services_searched_in_list_order() {
    let leaf = cert(PLAIN);
    let fetcher = Arc::new(
        MemoryFetcher::new()
            .with_crl("http://crl.qtrust.test/ca.crl", Crl::load(CA_CRL).unwrap())
            .with_ocsp("http://ocsp.qtrust.test/pkc", good_ocsp(&leaf, CA)),
    );
    let mut crl_service = service(uri::SVC_CERTSTATUS_CRL, uri::STATUS_GRANTED, vec![]);
    crl_service.names = names("Qtrust CRL");
    crl_service.supply_points = vec!["http://crl.qtrust.test/ca.crl".into()];
    let mut ocsp_service = service(uri::SVC_CERTSTATUS_OCSP, uri::STATUS_GRANTED, vec![]);
    ocsp_service.names = names("Qtrust OCSP");
    ocsp_service.supply_points = vec!["http://ocsp.qtrust.test/pkc".into()];
    let ca = service(uri::SVC_CA_PKC, uri::STATUS_GRANTED, vec![]);

    let ocsp_first = validator(vec![ca.clone(), ocsp_service.clone(), crl_service.clone()])
        .with_fetcher(fetcher.clone());
    let r = ocsp_first.validate(&leaf, false, DATE, true).unwrap();
    assert_eq!(r.result, ResultCode::Valid);
    assert_eq!(r.tsp_service_name_for_validate.as_deref(), Some("Qtrust OCSP"));
    assert!(matches!(r.revocation_evidence, Some(RevocationEvidence::Ocsp(_))));

    let crl_first = validator(vec![ca, crl_service, ocsp_service]).with_fetcher(fetcher);
    let r = crl_first.validate(&leaf, false, DATE, true).unwrap();
    assert_eq!(r.result, ResultCode::Valid);
    assert_eq!(r.tsp_service_name_for_validate.as_deref(), Some("Qtrust CRL"));
    assert!(matches!(r.revocation_evidence, Some(RevocationEvidence::Crl(_))));
}

#[test]
fn without_fetcher_status_stays_unknown() {
    let v = validator(vec![qualified_ca(uri::STATUS_GRANTED)]);
    let r = v.validate(&cert(ESIG), false, DATE, true).unwrap();
    assert_eq!(r.result, ResultCode::DetectedUnknown);
}

#[test]
fn ocsp_from_aia_validates() {
    let leaf = cert(ESIG);
    let fetcher = MemoryFetcher::new().with_ocsp("http://ocsp.qtrust.test", good_ocsp(&leaf, CA));
    let v = validator(vec![qualified_ca(uri::STATUS_GRANTED)]).with_fetcher(Arc::new(fetcher));
    let r = v.validate(&leaf, false, DATE, true).unwrap();
    assert_eq!(r.result, ResultCode::Valid);
    assert!(matches!(r.revocation_evidence, Some(RevocationEvidence::Ocsp(_))));
}

#[test]
fn ocsp_from_untrusted_signer_ignored() {
    let leaf = cert(ESIG);
    let fetcher = MemoryFetcher::new().with_ocsp(
        "http://ocsp.qtrust.test",
        good_ocsp(&leaf, include_bytes!("../../tests/data/other-ca.pem")),
    );
    let v = validator(vec![qualified_ca(uri::STATUS_GRANTED)]).with_fetcher(Arc::new(fetcher));
    let r = v.validate(&leaf, false, DATE, true).unwrap();
    assert_eq!(r.result, ResultCode::DetectedUnknown);
}

// ---- supplied evidence ----

#[test]
fn supplied_evidence_required() {
    let v = validator(vec![qualified_ca(uri::STATUS_GRANTED)]);
    let err = v.verify_revocation_values(&cert(ESIG), false, &[], &[], DATE).unwrap_err();
    assert!(matches!(err, QtrustError::InvalidArgument { .. }));
}

#[test]
fn supplied_crl_decides() {
    let v = validator(vec![qualified_ca(uri::STATUS_GRANTED)]);
    let crls = vec![Crl::load(CA_CRL).unwrap()];

    let r = v.verify_revocation_values(&cert(REVOKED), false, &crls, &[], DATE).unwrap();
    assert_eq!(r.result, ResultCode::Revoked);
    assert_eq!(r.tsp_service_name_for_validate, r.tsp_service_name_for_detect);
    assert!(!r.from_dp_or_aia);

    let r = v.verify_revocation_values(&cert(ESIG), false, &crls, &[], DATE).unwrap();
    assert_eq!(r.result, ResultCode::Valid);
}

#[test]
fn supplied_ocsp_decides_and_malformed_fails() {
    let leaf = cert(ESIG);
    let v = validator(vec![qualified_ca(uri::STATUS_GRANTED)]);
    let r = v
        .verify_revocation_values(&leaf, false, &[], &[good_ocsp(&leaf, CA)], DATE)
        .unwrap();
    assert_eq!(r.result, ResultCode::Valid);

    let mut bad = good_ocsp(&leaf, CA);
    bad.response_status = OcspResponseStatus::InternalError;
    let err = v.verify_revocation_values(&leaf, false, &[], &[bad], DATE).unwrap_err();
    assert!(matches!(err, QtrustError::ValidationFailed { .. }));
}
