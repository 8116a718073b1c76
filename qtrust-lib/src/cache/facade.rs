//! Entry point to the TSL cache for the validator and the reload trigger.

use super::objects::{TslCountryRegion, TslCountryRegionMapping, TslData, TslDataRecord};
use super::store::DurableStore;
use super::tsl_cache::TslCache;
use super::CacheError;
use crate::config::CacheConfig;
use crate::tsl::TslObject;
use crate::QtrustError;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// TSL cache operations against the principal snapshot, with durable
/// storage behind cache misses and full reloads.
pub struct TslCacheFacade {
    cache: TslCache,
    store: Arc<dyn DurableStore>,
    drain_delay: Duration,
    reload_lock: Mutex<()>,
}

impl TslCacheFacade {
    pub fn new(store: Arc<dyn DurableStore>, config: &CacheConfig) -> Self {
        TslCacheFacade {
            cache: TslCache::new(),
            store,
            drain_delay: config.drain_delay(),
            reload_lock: Mutex::new(()),
        }
    }

    pub fn cache(&self) -> &TslCache {
        &self.cache
    }

    // ── Countries and regions ────────────────────────────────────────────

    /// The country or region with `code`, loading it from durable storage
    /// on a miss.
    pub fn get_country_region(&self, code: &str) -> Result<Option<TslCountryRegion>, QtrustError> {
        let code = code.trim().to_ascii_uppercase();
        if let Some(found) = self.cache.get_country_region(&code, false)? {
            return Ok(Some(found));
        }
        debug!(code = %code, "country/region not cached; loading from durable store");
        match self.store.load_country_region(&code)? {
            Some(loaded) => Ok(Some(self.cache.add_country_region(loaded, false)?)),
            None => Ok(None),
        }
    }

    /// Add or update the basic data of a country, keeping the TSL link and
    /// mappings already cached for it.
    pub fn add_update_basic_country_region(
        &self,
        mut country: TslCountryRegion,
    ) -> Result<TslCountryRegion, QtrustError> {
        country.code = country.code.trim().to_ascii_uppercase();
        if let Some(existing) = self.cache.get_country_region(&country.code, false)? {
            country.tsl_data_id = existing.tsl_data_id;
            country.mappings = existing.mappings;
        }
        Ok(self.cache.add_country_region(country, false)?)
    }

    /// Remove a country together with its TSL data.
    pub fn remove_country_region(&self, code: &str) -> Result<(), QtrustError> {
        let code = code.trim().to_ascii_uppercase();
        if let Some(country) = self.cache.get_country_region(&code, false)? {
            if let Some(id) = country.tsl_data_id {
                self.cache.remove_tsl_data(id, false)?;
            }
            self.cache.remove_country_region(&code, false)?;
        }
        Ok(())
    }

    // ── TSL data ─────────────────────────────────────────────────────────

    pub fn get_tsl_data(&self, tsl_data_id: i64) -> Result<Option<TslData>, QtrustError> {
        if let Some(found) = self.cache.get_tsl_data(tsl_data_id, false)? {
            return Ok(Some(found));
        }
        debug!(tsl_data_id, "TSL data not cached; loading from durable store");
        match load_tsl_data(self.store.as_ref(), tsl_data_id)? {
            Some(data) => Ok(Some(self.cache.add_tsl_data(data, false)?)),
            None => Ok(None),
        }
    }

    pub fn get_tsl_data_for_country_region(&self, code: &str) -> Result<Option<TslData>, QtrustError> {
        match self.get_country_region(code)?.and_then(|c| c.tsl_data_id) {
            Some(id) => self.get_tsl_data(id),
            None => Ok(None),
        }
    }

    pub fn get_tsl_data_for_location(&self, location: &str) -> Result<Option<TslData>, QtrustError> {
        if location.trim().is_empty() {
            return Err(QtrustError::invalid_argument("TSL location is empty"));
        }
        let id = self
            .cache
            .location_index(false)?
            .and_then(|index| index.tsl_data_id(location));
        match id {
            Some(id) => self.get_tsl_data(id),
            None => Ok(None),
        }
    }

    /// Cache a TSL and link it to its country. `None` when the country is
    /// unknown.
    pub fn add_or_update_tsl_data(
        &self,
        record: &TslDataRecord,
        tsl: Arc<TslObject>,
    ) -> Result<Option<TslData>, QtrustError> {
        let Some(mut country) = self.get_country_region(&record.country_region_code)? else {
            warn!(code = %record.country_region_code, "TSL data for unknown country/region not cached");
            return Ok(None);
        };
        let data = self.cache.add_tsl_data(TslData::new(record, tsl), false)?;
        country.tsl_data_id = Some(data.tsl_data_id);
        self.cache.add_country_region(country, false)?;
        Ok(Some(data))
    }

    pub fn remove_tsl_data_from_country_region(&self, code: &str) -> Result<(), QtrustError> {
        if let Some(mut country) = self.get_country_region(code)? {
            if let Some(id) = country.tsl_data_id.take() {
                self.cache.remove_tsl_data(id, false)?;
            }
            self.cache.add_country_region(country, false)?;
        }
        Ok(())
    }

    // ── Mappings ─────────────────────────────────────────────────────────

    pub fn get_mappings_for_country_region(
        &self,
        code: &str,
    ) -> Result<Option<BTreeSet<TslCountryRegionMapping>>, QtrustError> {
        Ok(self.get_country_region(code)?.map(|c| c.mappings))
    }

    pub fn add_update_mapping_to_country_region(
        &self,
        code: &str,
        mapping: TslCountryRegionMapping,
    ) -> Result<Option<TslCountryRegionMapping>, QtrustError> {
        let Some(mut country) = self.get_country_region(code)? else {
            return Ok(None);
        };
        country.add_update_mapping(mapping.clone());
        self.cache.add_country_region(country, false)?;
        Ok(Some(mapping))
    }

    /// Returns whether the mapping existed.
    pub fn remove_mapping_from_country_region(
        &self,
        code: &str,
        mapping_id: i64,
    ) -> Result<bool, QtrustError> {
        let Some(mut country) = self.get_country_region(code)? else {
            return Ok(false);
        };
        if !country.remove_mapping(mapping_id) {
            return Ok(false);
        }
        self.cache.add_country_region(country, false)?;
        Ok(true)
    }

    pub fn clear_tsl_cache(&self) -> Result<(), QtrustError> {
        Ok(self.cache.clear(false)?)
    }

    // ── Initialization and reload ────────────────────────────────────────

    pub fn is_reloading(&self) -> bool {
        self.cache.is_reloading()
    }

    pub fn is_initialized(&self, in_aux: bool) -> bool {
        self.cache.is_initialized(in_aux)
    }

    pub fn set_initialized(&self, initialized: bool, in_aux: bool) -> Result<(), QtrustError> {
        Ok(self.cache.set_initialized(initialized, in_aux)?)
    }

    /// Load every country and its TSL from durable storage into the chosen
    /// snapshot.
    pub fn initialize(&self, in_aux: bool) -> Result<(), QtrustError> {
        if self.cache.is_initialized(in_aux) {
            warn!(in_aux, "TSL cache already initialized; skipped");
            return Ok(());
        }
        let countries = self.store.load_all_country_regions()?;
        let mut tsls = 0usize;
        for country in countries {
            let tsl_data_id = country.tsl_data_id;
            self.cache.add_country_region(country, in_aux)?;
            let Some(id) = tsl_data_id else { continue };
            match load_tsl_data(self.store.as_ref(), id)? {
                Some(data) => {
                    self.cache.add_tsl_data(data, in_aux)?;
                    tsls += 1;
                }
                None => warn!(tsl_data_id = id, "country/region links TSL data missing from durable store"),
            }
        }
        self.cache.set_initialized(true, in_aux)?;
        info!(in_aux, tsls, "TSL cache initialized");
        Ok(())
    }

    /// Rebuild the cache from durable storage and swap it in.
    ///
    /// Readers keep seeing the previous contents until the swap. Concurrent
    /// calls run one after the other.
    pub fn reload_all(&self) -> Result<(), QtrustError> {
        let _guard = self.reload_lock.lock();
        info!("TSL cache reload started");
        self.cache.start_auxiliary_cache();
        if let Err(e) = self.initialize(true) {
            self.cache.discard_auxiliary_cache();
            return Err(e);
        }
        self.cache.assign_as_principal(self.drain_delay)?;
        info!("TSL cache reload finished");
        Ok(())
    }
}

impl std::fmt::Debug for TslCacheFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TslCacheFacade")
            .field("cache", &self.cache)
            .field("drain_delay", &self.drain_delay)
            .finish()
    }
}

fn load_tsl_data(store: &dyn DurableStore, tsl_data_id: i64) -> Result<Option<TslData>, CacheError> {
    let Some(record) = store.load_tsl_data(tsl_data_id)? else {
        return Ok(None);
    };
    match store.load_tsl_object(tsl_data_id)? {
        Some(tsl) => Ok(Some(TslData::new(&record, tsl))),
        None => Err(CacheError::Store(format!(
            "TSL data {} has no stored TSL object",
            tsl_data_id
        ))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cache::{AssociationType, MemoryStore};
    use crate::tsl::SchemeInformation;
    use std::sync::atomic::{AtomicBool, Ordering};
    use time::macros::datetime;

    const LOCATION: &str = "https://tsl.example/TSL-ES.xml";

    fn tsl(sequence_number: i32) -> TslObject {
        TslObject {
            scheme_information: SchemeInformation {
                tsl_type: crate::uri::TSL_TYPE_EU_GENERIC.into(),
                sequence_number,
                scheme_territory: "ES".into(),
                specification: crate::uri::SPECIFICATION_119612.into(),
                version: crate::uri::VERSION_020101.into(),
                status_determination_approach: String::new(),
                issue_date: datetime!(2024-12-01 0:00 UTC),
                next_update: None,
            },
            trust_service_providers: vec![],
        }
    }

    fn record(id: i64, sequence_number: i32) -> TslDataRecord {
        TslDataRecord {
            tsl_data_id: id,
            spec_version_id: 1,
            country_region_code: "ES".into(),
            location_uri: LOCATION.into(),
            issue_date: datetime!(2024-12-01 0:00 UTC),
            next_update_date: Some(datetime!(2025-06-01 0:00 UTC)),
            sequence_number,
            new_tsl_available: None,
            last_new_tsl_available_check: None,
            legible_document_added: false,
        }
    }

    fn seeded() -> (Arc<MemoryStore>, TslCacheFacade) {
        let store = Arc::new(MemoryStore::new());
        store.put_country_region(TslCountryRegion::new(1, "ES", "Spain"));
        store.put_tsl(record(10, 42), tsl(42));
        let facade = TslCacheFacade::new(store.clone(), &CacheConfig::default());
        (store, facade)
    }

    fn mapping(id: i64, identificator: &str) -> TslCountryRegionMapping {
        TslCountryRegionMapping {
            mapping_id: id,
            identificator: identificator.into(),
            description: None,
            value: "ES".into(),
            association_type: AssociationType::Free,
        }
    }

    // ---- lookups ----

    #[test]
    fn miss_falls_back_to_store() {
        let (_, facade) = seeded();
        let es = facade.get_country_region("es").unwrap().unwrap();
        assert_eq!(es.code, "ES");
        assert_eq!(es.tsl_data_id, Some(10));

        let data = facade.get_tsl_data_for_country_region("ES").unwrap().unwrap();
        assert_eq!(data.sequence_number, 42);
        assert!(facade.get_country_region("FR").unwrap().is_none());
    }

    #[test]
    fn location_lookup() {
        let (_, facade) = seeded();
        assert!(facade.get_tsl_data_for_location(LOCATION).unwrap().is_none());
        facade.get_tsl_data(10).unwrap();
        let data = facade
            .get_tsl_data_for_location(&LOCATION.to_uppercase())
            .unwrap()
            .unwrap();
        assert_eq!(data.tsl_data_id, 10);
        assert!(matches!(
            facade.get_tsl_data_for_location(" "),
            Err(QtrustError::InvalidArgument { .. })
        ));
    }

    // ---- updates ----

    #[test]
    fn add_or_update_links_country() {
        let (_, facade) = seeded();
        let data = facade
            .add_or_update_tsl_data(&record(11, 43), Arc::new(tsl(43)))
            .unwrap()
            .unwrap();
        assert_eq!(data.tsl_data_id, 11);
        assert_eq!(facade.get_country_region("ES").unwrap().unwrap().tsl_data_id, Some(11));

        let mut fr = record(12, 1);
        fr.country_region_code = "FR".into();
        assert!(facade.add_or_update_tsl_data(&fr, Arc::new(tsl(1))).unwrap().is_none());
    }

    #[test]
    fn basic_update_keeps_links_and_mappings() {
        let (_, facade) = seeded();
        facade.add_update_mapping_to_country_region("ES", mapping(1, "issuerCountry")).unwrap();
        let renamed = facade
            .add_update_basic_country_region(TslCountryRegion::new(1, "es", "España"))
            .unwrap();
        assert_eq!(renamed.name, "España");
        assert_eq!(renamed.tsl_data_id, Some(10));
        assert_eq!(renamed.mappings.len(), 1);
    }

    #[test]
    fn mapping_add_and_remove() {
        let (_, facade) = seeded();
        assert!(facade
            .add_update_mapping_to_country_region("ES", mapping(1, "issuerCountry"))
            .unwrap()
            .is_some());
        assert!(facade
            .add_update_mapping_to_country_region("FR", mapping(2, "x"))
            .unwrap()
            .is_none());
        assert_eq!(facade.get_mappings_for_country_region("ES").unwrap().unwrap().len(), 1);

        assert!(facade.remove_mapping_from_country_region("ES", 1).unwrap());
        assert!(!facade.remove_mapping_from_country_region("ES", 1).unwrap());
        assert!(facade.get_mappings_for_country_region("ES").unwrap().unwrap().is_empty());
    }

    #[test]
    fn removals() {
        let (store, facade) = seeded();
        facade.get_tsl_data_for_country_region("ES").unwrap();
        facade.remove_tsl_data_from_country_region("ES").unwrap();
        assert!(facade.cache().get_tsl_data(10, false).unwrap().is_none());
        assert_eq!(facade.cache().get_country_region("ES", false).unwrap().unwrap().tsl_data_id, None);

        store.remove_country_region("ES");
        facade.remove_country_region("ES").unwrap();
        assert!(facade.get_country_region("ES").unwrap().is_none());
    }

    // ---- reload ----

    #[test]
    fn initialize_once() {
        let (_, facade) = seeded();
        facade.initialize(false).unwrap();
        assert!(facade.is_initialized(false));
        assert!(facade.cache().get_tsl_data(10, false).unwrap().is_some());
        facade.initialize(false).unwrap();
    }

    #[test]
    fn reload_swaps_in_new_data() {
        let (store, facade) = seeded();
        facade.initialize(false).unwrap();
        assert_eq!(
            facade.get_tsl_data_for_country_region("ES").unwrap().unwrap().sequence_number,
            42
        );

        store.put_tsl(record(11, 43), tsl(43));
        facade.reload_all().unwrap();

        assert!(!facade.is_reloading());
        assert!(facade.is_initialized(false));
        let data = facade.get_tsl_data_for_country_region("ES").unwrap().unwrap();
        assert_eq!(data.sequence_number, 43);
        assert_eq!(data.tsl.sequence_number(), 43);
    }

    struct FailingStore {
        inner: MemoryStore,
        failing: AtomicBool,
    }

    impl DurableStore for FailingStore {
        fn load_country_region(&self, code: &str) -> Result<Option<TslCountryRegion>, CacheError> {
            self.inner.load_country_region(code)
        }

        fn load_all_country_regions(&self) -> Result<Vec<TslCountryRegion>, CacheError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(CacheError::Store("connection refused".into()));
            }
            self.inner.load_all_country_regions()
        }

        fn load_tsl_data(&self, id: i64) -> Result<Option<TslDataRecord>, CacheError> {
            self.inner.load_tsl_data(id)
        }

        fn load_tsl_object(&self, id: i64) -> Result<Option<Arc<TslObject>>, CacheError> {
            self.inner.load_tsl_object(id)
        }
    }

    #[test]
    fn failed_reload_keeps_principal() {
        let inner = MemoryStore::new();
        inner.put_country_region(TslCountryRegion::new(1, "ES", "Spain"));
        inner.put_tsl(record(10, 42), tsl(42));
        let store = Arc::new(FailingStore {
            inner,
            failing: AtomicBool::new(false),
        });
        let facade = TslCacheFacade::new(store.clone(), &CacheConfig::default());
        facade.initialize(false).unwrap();

        store.failing.store(true, Ordering::SeqCst);
        let err = facade.reload_all().unwrap_err();
        assert_eq!(err.code(), "COD_191");
        assert!(!facade.is_reloading());
        assert_eq!(
            facade.get_tsl_data_for_country_region("ES").unwrap().unwrap().sequence_number,
            42
        );
    }
}
