//! Typed access to the TSL object family of the path cache.

use super::objects::{TslCacheObject, TslCountryRegion, TslData, TslLocationIndex};
use super::path_cache::{CacheEntry, PathCache};
use super::CacheError;
use parking_lot::Mutex;
use std::time::Duration;

const PATH_BASE: &str = "TSL";
const PATH_COUNTRY_REGIONS: &str = "CountriesRegions";
const PATH_TSL_DATA: &str = "TSLData";
const PATH_LOCATION_TO_ID: &str = "TSLLocationToID";

/// TSL countries/regions, TSL data and the location index, stored under
/// `Configuration/TSL`.
#[derive(Debug, Default)]
pub struct TslCache {
    paths: PathCache<TslCacheObject>,
    /// Serializes read-modify-write of the location index.
    index_lock: Mutex<()>,
}

impl TslCache {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Countries and regions ────────────────────────────────────────────

    pub fn add_country_region(
        &self,
        country: TslCountryRegion,
        in_aux: bool,
    ) -> Result<TslCountryRegion, CacheError> {
        let path = country_path(&country.code)?;
        let stored = self
            .paths
            .add(&path, TslCacheObject::CountryRegion(country), in_aux)?;
        match &*stored {
            TslCacheObject::CountryRegion(c) => Ok(c.clone()),
            other => Err(unexpected(&path, other)),
        }
    }

    pub fn get_country_region(
        &self,
        code: &str,
        in_aux: bool,
    ) -> Result<Option<TslCountryRegion>, CacheError> {
        let path = country_path(code)?;
        match self.paths.get(&path, in_aux)?.as_deref() {
            None => Ok(None),
            Some(TslCacheObject::CountryRegion(c)) => Ok(Some(c.clone())),
            Some(other) => Err(unexpected(&path, other)),
        }
    }

    pub fn remove_country_region(&self, code: &str, in_aux: bool) -> Result<(), CacheError> {
        self.paths.remove_object(&country_path(code)?, in_aux)?;
        Ok(())
    }

    // ── TSL data ─────────────────────────────────────────────────────────

    /// Store `data` and index its location.
    pub fn add_tsl_data(&self, data: TslData, in_aux: bool) -> Result<TslData, CacheError> {
        let path = data_path(data.tsl_data_id)?;
        let stored = self.paths.add(&path, TslCacheObject::Data(data), in_aux)?;
        let stored = match &*stored {
            TslCacheObject::Data(d) => d.clone(),
            other => return Err(unexpected(&path, other)),
        };
        let _guard = self.index_lock.lock();
        let mut index = self.location_index(in_aux)?.unwrap_or_default();
        index.add_update(&stored.location_uri, stored.tsl_data_id);
        self.set_location_index(index, in_aux)?;
        Ok(stored)
    }

    pub fn get_tsl_data(&self, tsl_data_id: i64, in_aux: bool) -> Result<Option<TslData>, CacheError> {
        let path = data_path(tsl_data_id)?;
        match self.paths.get(&path, in_aux)?.as_deref() {
            None => Ok(None),
            Some(TslCacheObject::Data(d)) => Ok(Some(d.clone())),
            Some(other) => Err(unexpected(&path, other)),
        }
    }

    /// Remove the data and its location relation.
    pub fn remove_tsl_data(&self, tsl_data_id: i64, in_aux: bool) -> Result<(), CacheError> {
        let Some(data) = self.get_tsl_data(tsl_data_id, in_aux)? else {
            return Ok(());
        };
        self.paths.remove_object(&data_path(tsl_data_id)?, in_aux)?;
        let _guard = self.index_lock.lock();
        if let Some(mut index) = self.location_index(in_aux)? {
            index.remove(&data.location_uri);
            self.set_location_index(index, in_aux)?;
        }
        Ok(())
    }

    pub fn location_index(&self, in_aux: bool) -> Result<Option<TslLocationIndex>, CacheError> {
        let path = location_path()?;
        match self.paths.get(&path, in_aux)?.as_deref() {
            None => Ok(None),
            Some(TslCacheObject::LocationIndex(i)) => Ok(Some(i.clone())),
            Some(other) => Err(unexpected(&path, other)),
        }
    }

    fn set_location_index(&self, index: TslLocationIndex, in_aux: bool) -> Result<(), CacheError> {
        self.paths
            .add(&location_path()?, TslCacheObject::LocationIndex(index), in_aux)?;
        Ok(())
    }

    /// Remove every TSL object.
    pub fn clear(&self, in_aux: bool) -> Result<(), CacheError> {
        self.paths
            .remove_subtree(&PathCache::<TslCacheObject>::path(&[PATH_BASE])?, in_aux)?;
        Ok(())
    }

    // ── Reload protocol ──────────────────────────────────────────────────

    pub fn start_auxiliary_cache(&self) {
        self.paths.start_auxiliary_cache();
    }

    pub fn discard_auxiliary_cache(&self) {
        self.paths.discard_auxiliary_cache();
    }

    pub fn assign_as_principal(&self, drain_delay: Duration) -> Result<(), CacheError> {
        self.paths.assign_as_principal(drain_delay)
    }

    pub fn is_reloading(&self) -> bool {
        self.paths.is_reloading()
    }

    pub fn is_initialized(&self, in_aux: bool) -> bool {
        self.paths.is_initialized(in_aux)
    }

    pub fn set_initialized(&self, initialized: bool, in_aux: bool) -> Result<(), CacheError> {
        self.paths.set_initialized(initialized, in_aux)
    }
}

fn country_path(code: &str) -> Result<String, CacheError> {
    PathCache::<TslCacheObject>::path(&[PATH_BASE, PATH_COUNTRY_REGIONS, code])
}

fn data_path(tsl_data_id: i64) -> Result<String, CacheError> {
    PathCache::<TslCacheObject>::path(&[PATH_BASE, PATH_TSL_DATA, &tsl_data_id.to_string()])
}

fn location_path() -> Result<String, CacheError> {
    PathCache::<TslCacheObject>::path(&[PATH_BASE, PATH_LOCATION_TO_ID])
}

fn unexpected(path: &str, found: &TslCacheObject) -> CacheError {
    CacheError::backend(format!("unexpected object at {}: {}", path, found.describe()))
}
