//! ETSI TS 119612 v2.1.1 rules.

use super::rules::{AsiKind, QualifierEffect, RevocationServiceKind, StatusClass, TslValidationRules};
use crate::analyzer::ExtensionAnalyzer;
use crate::mapping::{self, Classification, MappingType, Qscd};
use crate::uri;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::error;

/// Rule set for TS 119612 version 2.1.1 lists.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ts119612V020101;

fn key(uri: &str) -> String {
    uri.trim().to_ascii_lowercase()
}

fn status_table() -> &'static HashMap<String, StatusClass> {
    static TABLE: OnceLock<HashMap<String, StatusClass>> = OnceLock::new();
    TABLE.get_or_init(|| {
        [
            (uri::STATUS_GRANTED, StatusClass::Ok),
            (uri::STATUS_RECOGNISED_AT_NATIONAL_LEVEL, StatusClass::Ok),
            (uri::STATUS_UNDER_SUPERVISION, StatusClass::Ok),
            (uri::STATUS_SUPERVISION_IN_CESSATION, StatusClass::Ok),
            (uri::STATUS_ACCREDITED, StatusClass::Ok),
            (uri::STATUS_SET_BY_NATIONAL_LAW, StatusClass::Ok),
            (uri::STATUS_SUPERVISION_CEASED, StatusClass::ChainNotValid),
            (uri::STATUS_ACCREDITATION_CEASED, StatusClass::ChainNotValid),
            (uri::STATUS_SUPERVISION_REVOKED, StatusClass::Revoked),
            (uri::STATUS_ACCREDITATION_REVOKED, StatusClass::Revoked),
            (uri::STATUS_WITHDRAWN, StatusClass::Revoked),
            (uri::STATUS_DEPRECATED_AT_NATIONAL_LEVEL, StatusClass::Revoked),
            (uri::STATUS_DEPRECATED_BY_NATIONAL_LAW, StatusClass::Revoked),
        ]
        .into_iter()
        .map(|(u, c)| (key(u), c))
        .collect()
    })
}

fn qualifier_table() -> &'static HashMap<String, QualifierEffect> {
    static TABLE: OnceLock<HashMap<String, QualifierEffect>> = OnceLock::new();
    TABLE.get_or_init(|| {
        use QualifierEffect as E;
        [
            (uri::Q_WITH_SSCD, E::Qscd(Qscd::Yes)),
            (uri::Q_WITH_QSCD, E::Qscd(Qscd::Yes)),
            (uri::Q_NO_SSCD, E::Qscd(Qscd::No)),
            (uri::Q_NO_QSCD, E::Qscd(Qscd::No)),
            (uri::Q_SSCD_AS_IN_CERT, E::Qscd(Qscd::AsInCert)),
            (uri::Q_QSCD_AS_IN_CERT, E::Qscd(Qscd::AsInCert)),
            (uri::Q_QSCD_MANAGED_ON_BEHALF, E::Qscd(Qscd::YesManagedOnBehalf)),
            (uri::Q_FOR_LEGAL_PERSON, E::Classification(Classification::LegalPerson)),
            (uri::Q_FOR_ESIG, E::Classification(Classification::ESig)),
            (uri::Q_FOR_ESEAL, E::Classification(Classification::ESeal)),
            (uri::Q_FOR_WSA, E::Classification(Classification::Wsa)),
            (uri::Q_NOT_QUALIFIED, E::Type(MappingType::NonQualified)),
            (uri::Q_QC_STATEMENT, E::Type(MappingType::Qualified)),
        ]
        .into_iter()
        .map(|(u, e)| (key(u), e))
        .collect()
    })
}

fn asi_table() -> &'static HashMap<String, AsiKind> {
    static TABLE: OnceLock<HashMap<String, AsiKind>> = OnceLock::new();
    TABLE.get_or_init(|| {
        [
            (uri::ASI_ROOT_CA_QC, AsiKind::RootCaQc),
            (uri::ASI_FOR_ESIGNATURES, AsiKind::ForESignatures),
            (uri::ASI_FOR_ESEALS, AsiKind::ForESeals),
            (uri::ASI_FOR_WEB_SITE_AUTHENTICATION, AsiKind::ForWebSiteAuthentication),
        ]
        .into_iter()
        .map(|(u, k)| (key(u), k))
        .collect()
    })
}

impl TslValidationRules for Ts119612V020101 {
    fn key(&self) -> (&'static str, &'static str) {
        (uri::SPECIFICATION_119612, uri::VERSION_020101)
    }

    fn is_ca_pkc(&self, service_type: &str) -> bool {
        uri::uri_eq(service_type, uri::SVC_CA_PKC)
    }

    fn is_ca_qc(&self, service_type: &str) -> bool {
        uri::uri_eq(service_type, uri::SVC_CA_QC)
    }

    fn is_national_root_ca_qc(&self, service_type: &str) -> bool {
        uri::uri_eq(service_type, uri::SVC_NATIONAL_ROOT_CA_QC)
    }

    fn is_tsa_qualified(&self, service_type: &str) -> bool {
        uri::uri_eq(service_type, uri::SVC_TSA_QTST)
    }

    fn is_tsa_non_qualified(&self, service_type: &str) -> bool {
        [uri::SVC_TSA, uri::SVC_TSA_TSS_QC, uri::SVC_TSA_TSS_ADES_QC_QES]
            .iter()
            .any(|t| uri::uri_eq(service_type, t))
    }

    fn status_class(&self, status: &str) -> Option<StatusClass> {
        status_table().get(&key(status)).copied()
    }

    fn qualifier_effect(&self, qualifier: &str) -> Option<QualifierEffect> {
        qualifier_table().get(&key(qualifier)).copied()
    }

    fn asi_kind(&self, asi_uri: &str) -> Option<AsiKind> {
        asi_table().get(&key(asi_uri)).copied()
    }

    fn revocation_service_kind(
        &self,
        service_type: &str,
        qualified: bool,
    ) -> Option<RevocationServiceKind> {
        let (crl, ocsp) = if qualified {
            (uri::SVC_CERTSTATUS_CRL_QC, uri::SVC_CERTSTATUS_OCSP_QC)
        } else {
            (uri::SVC_CERTSTATUS_CRL, uri::SVC_CERTSTATUS_OCSP)
        };
        if uri::uri_eq(service_type, crl) {
            Some(RevocationServiceKind::Crl)
        } else if uri::uri_eq(service_type, ocsp) {
            Some(RevocationServiceKind::Ocsp)
        } else {
            None
        }
    }

    fn is_european(&self, tsl_type: &str) -> bool {
        uri::uri_eq(tsl_type, uri::TSL_TYPE_EU_GENERIC)
            || uri::uri_eq(tsl_type, uri::TSL_TYPE_EU_LIST_OF_LISTS)
    }

    fn is_list_of_lists(&self, tsl_type: &str) -> bool {
        super::rules::tsl_type_is_list_of_lists(tsl_type)
    }

    fn is_status_determination_approach_delinquent(&self, _approach: &str) -> bool {
        false
    }

    fn obeys_detection_conditions(&self, analyzer: &ExtensionAnalyzer) -> bool {
        let computed = mapping::mapping_type_qualified(analyzer).and_then(|qualified| {
            let qscd = mapping::mapping_qscd(analyzer)?;
            let classification = mapping::mapping_classification(analyzer, false)?;
            Ok((qualified, qscd, classification))
        });
        match computed {
            Ok((qualified, qscd, classification)) => {
                qualified == MappingType::Qualified
                    && qscd != Qscd::Unknown
                    && matches!(
                        classification,
                        Classification::LegalPerson
                            | Classification::ESig
                            | Classification::ESeal
                            | Classification::Wsa
                    )
            }
            Err(e) => {
                error!(error = %e, "cannot compute detection conditions from certificate extensions");
                false
            }
        }
    }
}
