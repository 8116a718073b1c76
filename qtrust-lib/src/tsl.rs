//! Parsed Trust Service Status List model (ETSI TS 119612).
//!
//! XML parsing happens elsewhere; this model is what that collaborator
//! produces. It is serde-(de)serializable so that lists can be stored in
//! the durable store and handed to the CLI as JSON. Once built, a
//! [`TslObject`] is never mutated; it is shared behind an `Arc`.

use crate::cert::Certificate;
use crate::uri;
use crate::QtrustError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::OffsetDateTime;

/// Language preferred when picking provider and service names.
pub const PREFERRED_LANGUAGE: &str = "en";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TslObject {
    pub scheme_information: SchemeInformation,
    #[serde(default)]
    pub trust_service_providers: Vec<TrustServiceProvider>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemeInformation {
    pub tsl_type: String,
    pub sequence_number: i32,
    /// Country or region code of the scheme operator.
    pub scheme_territory: String,
    #[serde(default = "default_specification")]
    pub specification: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub status_determination_approach: String,
    #[serde(with = "time::serde::rfc3339")]
    pub issue_date: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub next_update: Option<OffsetDateTime>,
}

fn default_specification() -> String {
    uri::SPECIFICATION_119612.to_string()
}

fn default_version() -> String {
    uri::VERSION_020101.to_string()
}

impl TslObject {
    pub fn from_json(text: &str) -> Result<Self, QtrustError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn country_region_code(&self) -> &str {
        &self.scheme_information.scheme_territory
    }

    pub fn sequence_number(&self) -> i32 {
        self.scheme_information.sequence_number
    }

    pub fn tsl_type(&self) -> &str {
        &self.scheme_information.tsl_type
    }
}

/// A localized name, e.g. `{"lang": "en", "value": "Example CA"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedName {
    pub lang: String,
    pub value: String,
}

/// The English name if present, else the first non-empty one.
pub fn preferred_name(names: &[LocalizedName]) -> Option<&str> {
    names
        .iter()
        .filter(|n| !n.value.trim().is_empty())
        .find(|n| n.lang.eq_ignore_ascii_case(PREFERRED_LANGUAGE))
        .or_else(|| names.iter().find(|n| !n.value.trim().is_empty()))
        .map(|n| n.value.as_str())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustServiceProvider {
    #[serde(default)]
    pub names: Vec<LocalizedName>,
    #[serde(default)]
    pub services: Vec<TspService>,
}

impl TrustServiceProvider {
    pub fn name(&self) -> Option<&str> {
        preferred_name(&self.names)
    }
}

/// A listed service with its current information and prior states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TspService {
    pub service_type: String,
    #[serde(default)]
    pub names: Vec<LocalizedName>,
    pub status: String,
    #[serde(with = "time::serde::rfc3339")]
    pub status_starting_time: OffsetDateTime,
    #[serde(default)]
    pub digital_identities: Vec<DigitalIdentity>,
    #[serde(default)]
    pub supply_points: Vec<String>,
    #[serde(default)]
    pub extensions: Vec<ServiceExtension>,
    #[serde(default)]
    pub history: Vec<ServiceHistoryInstance>,
}

impl TspService {
    pub fn name(&self) -> Option<&str> {
        preferred_name(&self.names)
    }

    pub fn qualifications(&self) -> Option<(&[QualificationElement], bool)> {
        self.extensions.iter().find_map(|ext| match ext {
            ServiceExtension::Qualifications { critical, elements } => {
                Some((elements.as_slice(), *critical))
            }
            _ => None,
        })
    }

    /// URIs of the AdditionalServiceInformation extensions, in order.
    pub fn additional_service_information(&self) -> Vec<&str> {
        self.extensions
            .iter()
            .filter_map(|ext| match ext {
                ServiceExtension::AdditionalServiceInformation { uri, .. } => Some(uri.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// A prior state of a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceHistoryInstance {
    pub service_type: String,
    #[serde(default)]
    pub names: Vec<LocalizedName>,
    pub status: String,
    #[serde(with = "time::serde::rfc3339")]
    pub status_starting_time: OffsetDateTime,
    #[serde(default)]
    pub digital_identities: Vec<DigitalIdentity>,
    #[serde(default)]
    pub extensions: Vec<ServiceExtension>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DigitalIdentity {
    /// A DER certificate, base64 in JSON.
    X509Certificate {
        #[serde(with = "crate::util::base64_der")]
        der: Vec<u8>,
    },
    /// A DER SubjectPublicKeyInfo, base64 in JSON.
    PublicKey {
        #[serde(with = "crate::util::base64_der")]
        spki: Vec<u8>,
    },
    SubjectName {
        name: String,
    },
    SubjectKeyId {
        #[serde(with = "crate::util::hex_bytes")]
        ski: Vec<u8>,
    },
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ServiceExtension {
    Qualifications {
        #[serde(default)]
        critical: bool,
        #[serde(default)]
        elements: Vec<QualificationElement>,
    },
    #[serde(rename_all = "camelCase")]
    AdditionalServiceInformation {
        uri: String,
        #[serde(default)]
        critical: bool,
        #[serde(default)]
        information_value: Option<String>,
    },
    Other {
        #[serde(default)]
        critical: bool,
    },
}

/// Qualifiers applied to the certificates selected by a criteria list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualificationElement {
    #[serde(default)]
    pub qualifiers: Vec<String>,
    pub criteria: CriteriaList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Assert {
    All,
    AtLeastOne,
    None,
}

/// Required key usage bits, by name (e.g. `nonRepudiation: true`).
pub type KeyUsageBits = BTreeMap<String, bool>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriteriaList {
    pub assert: Assert,
    #[serde(default)]
    pub key_usage: Vec<KeyUsageBits>,
    /// Each set matches when every policy in it is present.
    #[serde(default)]
    pub policy_sets: Vec<Vec<String>>,
    #[serde(default)]
    pub criteria_lists: Vec<CriteriaList>,
    #[serde(default)]
    pub other_criteria: Option<String>,
}

impl CriteriaList {
    /// Evaluate the criteria against a certificate.
    ///
    /// `otherCriteria` has no defined evaluation and fails the check.
    pub fn matches(&self, cert: &Certificate) -> Result<bool, QtrustError> {
        if let Some(other) = &self.other_criteria {
            return Err(QtrustError::validation_failed(format!(
                "unsupported otherCriteria in criteria list: {}",
                other
            )));
        }

        let mut outcomes = Vec::new();
        for bits in &self.key_usage {
            outcomes.push(bits.iter().all(|(name, expected)| {
                cert.key_usage.iter().any(|ku| ku.eq_ignore_ascii_case(name)) == *expected
            }));
        }
        for set in &self.policy_sets {
            outcomes.push(set.iter().all(|p| cert.policy_oids.contains(p)));
        }
        for nested in &self.criteria_lists {
            outcomes.push(nested.matches(cert)?);
        }

        Ok(match self.assert {
            Assert::All => outcomes.iter().all(|o| *o),
            Assert::AtLeastOne => outcomes.iter().any(|o| *o),
            Assert::None => !outcomes.iter().any(|o| *o),
        })
    }
}
