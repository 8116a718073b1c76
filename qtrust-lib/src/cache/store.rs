//! Durable storage behind the TSL cache.

use super::objects::{TslCountryRegion, TslDataRecord};
use super::CacheError;
use crate::tsl::TslObject;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Persistence collaborator consulted on cache misses and full reloads.
pub trait DurableStore: Send + Sync {
    fn load_country_region(&self, code: &str) -> Result<Option<TslCountryRegion>, CacheError>;

    fn load_all_country_regions(&self) -> Result<Vec<TslCountryRegion>, CacheError>;

    fn load_tsl_data(&self, tsl_data_id: i64) -> Result<Option<TslDataRecord>, CacheError>;

    fn load_tsl_object(&self, tsl_data_id: i64) -> Result<Option<Arc<TslObject>>, CacheError>;
}

#[derive(Debug, Default)]
struct Tables {
    countries: HashMap<String, TslCountryRegion>,
    records: HashMap<i64, TslDataRecord>,
    tsls: HashMap<i64, Arc<TslObject>>,
}

/// In-memory [`DurableStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_country_region(&self, country: TslCountryRegion) {
        self.tables
            .write()
            .countries
            .insert(country.code.to_ascii_uppercase(), country);
    }

    /// Store a TSL and link it to its country, if that country exists.
    pub fn put_tsl(&self, record: TslDataRecord, tsl: impl Into<Arc<TslObject>>) {
        let mut tables = self.tables.write();
        let code = record.country_region_code.to_ascii_uppercase();
        if let Some(country) = tables.countries.get_mut(&code) {
            country.tsl_data_id = Some(record.tsl_data_id);
        }
        tables.tsls.insert(record.tsl_data_id, tsl.into());
        tables.records.insert(record.tsl_data_id, record);
    }

    pub fn remove_country_region(&self, code: &str) {
        self.tables.write().countries.remove(&code.to_ascii_uppercase());
    }
}

impl DurableStore for MemoryStore {
    fn load_country_region(&self, code: &str) -> Result<Option<TslCountryRegion>, CacheError> {
        Ok(self.tables.read().countries.get(&code.to_ascii_uppercase()).cloned())
    }

    fn load_all_country_regions(&self) -> Result<Vec<TslCountryRegion>, CacheError> {
        let mut all: Vec<_> = self.tables.read().countries.values().cloned().collect();
        all.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(all)
    }

    fn load_tsl_data(&self, tsl_data_id: i64) -> Result<Option<TslDataRecord>, CacheError> {
        Ok(self.tables.read().records.get(&tsl_data_id).cloned())
    }

    fn load_tsl_object(&self, tsl_data_id: i64) -> Result<Option<Arc<TslObject>>, CacheError> {
        Ok(self.tables.read().tsls.get(&tsl_data_id).cloned())
    }
}
