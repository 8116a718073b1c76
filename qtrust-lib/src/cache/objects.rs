//! Objects of the TSL cache family.

use super::path_cache::CacheEntry;
use crate::tsl::TslObject;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use time::OffsetDateTime;

/// How a configured mapping obtains its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssociationType {
    /// The value is used as is.
    Free,
    /// The value is a certificate field id.
    Simple,
}

/// A mapping configured for a country or region.
///
/// Sets of mappings are ordered and deduplicated by `identificator`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TslCountryRegionMapping {
    #[serde(default)]
    pub mapping_id: i64,
    pub identificator: String,
    #[serde(default)]
    pub description: Option<String>,
    pub value: String,
    pub association_type: AssociationType,
}

impl PartialEq for TslCountryRegionMapping {
    fn eq(&self, other: &Self) -> bool {
        self.identificator == other.identificator
    }
}

impl Eq for TslCountryRegionMapping {}

impl PartialOrd for TslCountryRegionMapping {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TslCountryRegionMapping {
    fn cmp(&self, other: &Self) -> Ordering {
        self.identificator.cmp(&other.identificator)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TslCountryRegion {
    pub country_region_id: i64,
    /// Upper-case country or region code.
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub tsl_data_id: Option<i64>,
    #[serde(default)]
    pub mappings: BTreeSet<TslCountryRegionMapping>,
}

impl TslCountryRegion {
    pub fn new(country_region_id: i64, code: &str, name: &str) -> Self {
        TslCountryRegion {
            country_region_id,
            code: code.trim().to_ascii_uppercase(),
            name: name.to_string(),
            tsl_data_id: None,
            mappings: BTreeSet::new(),
        }
    }

    /// Insert `mapping`, replacing any mapping with the same id or
    /// identificator.
    pub fn add_update_mapping(&mut self, mapping: TslCountryRegionMapping) {
        self.mappings.retain(|m| m.mapping_id != mapping.mapping_id);
        self.mappings.replace(mapping);
    }

    /// Returns whether a mapping with that id was present.
    pub fn remove_mapping(&mut self, mapping_id: i64) -> bool {
        let before = self.mappings.len();
        self.mappings.retain(|m| m.mapping_id != mapping_id);
        self.mappings.len() != before
    }
}

/// Persisted metadata of a downloaded TSL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TslDataRecord {
    pub tsl_data_id: i64,
    pub spec_version_id: i64,
    pub country_region_code: String,
    pub location_uri: String,
    #[serde(with = "time::serde::rfc3339")]
    pub issue_date: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub next_update_date: Option<OffsetDateTime>,
    pub sequence_number: i32,
    #[serde(default)]
    pub new_tsl_available: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_new_tsl_available_check: Option<OffsetDateTime>,
    #[serde(default)]
    pub legible_document_added: bool,
}

/// A cached TSL: its persisted metadata plus the parsed list.
#[derive(Debug, Clone)]
pub struct TslData {
    pub tsl_data_id: i64,
    pub spec_version_id: i64,
    pub location_uri: String,
    pub issue_date: OffsetDateTime,
    pub next_update_date: Option<OffsetDateTime>,
    pub sequence_number: i32,
    pub new_tsl_available: Option<String>,
    pub last_new_tsl_available_check: Option<OffsetDateTime>,
    pub legible_document_added: bool,
    pub tsl: Arc<TslObject>,
}

impl TslData {
    pub fn new(record: &TslDataRecord, tsl: Arc<TslObject>) -> Self {
        TslData {
            tsl_data_id: record.tsl_data_id,
            spec_version_id: record.spec_version_id,
            location_uri: record.location_uri.clone(),
            issue_date: record.issue_date,
            next_update_date: record.next_update_date,
            sequence_number: record.sequence_number,
            new_tsl_available: record.new_tsl_available.clone(),
            last_new_tsl_available_check: record.last_new_tsl_available_check,
            legible_document_added: record.legible_document_added,
            tsl,
        }
    }
}

/// TSL location URI to data id, looked up case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TslLocationIndex {
    relations: BTreeMap<String, i64>,
}

impl TslLocationIndex {
    pub fn add_update(&mut self, location: &str, tsl_data_id: i64) {
        self.relations.retain(|k, _| !k.eq_ignore_ascii_case(location));
        self.relations.insert(location.to_string(), tsl_data_id);
    }

    pub fn tsl_data_id(&self, location: &str) -> Option<i64> {
        self.relations.get(location).copied().or_else(|| {
            self.relations
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(location))
                .map(|(_, id)| *id)
        })
    }

    pub fn remove(&mut self, location: &str) {
        self.relations.remove(location);
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }
}

/// Every object stored by the TSL cache.
#[derive(Debug, Clone)]
pub enum TslCacheObject {
    CountryRegion(TslCountryRegion),
    Data(TslData),
    LocationIndex(TslLocationIndex),
}

impl CacheEntry for TslCacheObject {
    fn describe(&self) -> String {
        match self {
            TslCacheObject::CountryRegion(c) => {
                format!("COUNTRY/REGION id={} code={}", c.country_region_id, c.code)
            }
            TslCacheObject::Data(d) => {
                format!("TSL DATA id={} sequence={}", d.tsl_data_id, d.sequence_number)
            }
            TslCacheObject::LocationIndex(i) => format!("LOCATION IDS entries={}", i.len()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn mapping(id: i64, identificator: &str, value: &str) -> TslCountryRegionMapping {
        TslCountryRegionMapping {
            mapping_id: id,
            identificator: identificator.into(),
            description: None,
            value: value.into(),
            association_type: AssociationType::Free,
        }
    }

    #[test]
    fn country_code_upper_cased() {
        assert_eq!(TslCountryRegion::new(1, " es ", "Spain").code, "ES");
    }

    #[test]
    fn mappings_replace_by_id_and_identificator() {
        let mut es = TslCountryRegion::new(1, "ES", "Spain");
        es.add_update_mapping(mapping(1, "issuer", "A"));
        es.add_update_mapping(mapping(2, "serial", "3"));
        es.add_update_mapping(mapping(1, "issuerCountry", "B"));
        es.add_update_mapping(mapping(3, "serial", "4"));

        let ids: Vec<_> = es.mappings.iter().map(|m| (m.identificator.as_str(), m.mapping_id)).collect();
        assert_eq!(ids, vec![("issuerCountry", 1), ("serial", 3)]);

        assert!(es.remove_mapping(3));
        assert!(!es.remove_mapping(3));
        assert_eq!(es.mappings.len(), 1);
    }

    #[test]
    fn location_lookup_ignores_case() {
        let mut index = TslLocationIndex::default();
        index.add_update("https://example.eu/TSL-ES.xml", 7);
        assert_eq!(index.tsl_data_id("HTTPS://EXAMPLE.EU/tsl-es.xml"), Some(7));

        index.add_update("https://EXAMPLE.eu/TSL-ES.xml", 8);
        assert_eq!(index.len(), 1);
        assert_eq!(index.tsl_data_id("https://example.eu/TSL-ES.xml"), Some(8));

        index.remove("https://EXAMPLE.eu/TSL-ES.xml");
        assert!(index.is_empty());
    }

    #[test]
    fn mapping_json_shape() {
        let m: TslCountryRegionMapping = serde_json::from_str(
            r#"{"identificator":"serialNumber","value":"3","associationType":"simple"}"#,
        )
        .unwrap();
        assert_eq!(m.association_type, AssociationType::Simple);
        assert_eq!(m.mapping_id, 0);
    }
}
