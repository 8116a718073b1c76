//! Generic double-buffered path store.

use super::CacheError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// First segment of every cache path.
pub const ROOT: &str = "Configuration";
pub const SEPARATOR: char = '/';

/// An object family stored in a [`PathCache`].
pub trait CacheEntry: Send + Sync + 'static {
    /// Short label for logs.
    fn describe(&self) -> String;

    /// Update condition: whether `self` may overwrite `cached`.
    fn may_replace(&self, _cached: &Self) -> bool {
        true
    }
}

struct Snapshot<T> {
    entries: DashMap<String, Arc<T>>,
    initialized: AtomicBool,
}

impl<T> Snapshot<T> {
    fn empty() -> Arc<Self> {
        Arc::new(Snapshot {
            entries: DashMap::new(),
            initialized: AtomicBool::new(false),
        })
    }
}

/// Path store with a principal snapshot and an optional auxiliary one.
///
/// Readers clone the snapshot pointer under a short read lock and then read
/// the concurrent map without holding it. A reload writes into the
/// auxiliary snapshot and [`PathCache::assign_as_principal`] swaps it in.
pub struct PathCache<T> {
    principal: RwLock<Arc<Snapshot<T>>>,
    auxiliary: RwLock<Option<Arc<Snapshot<T>>>>,
}

impl<T: CacheEntry> Default for PathCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: CacheEntry> PathCache<T> {
    pub fn new() -> Self {
        PathCache {
            principal: RwLock::new(Snapshot::empty()),
            auxiliary: RwLock::new(None),
        }
    }

    /// Build a rooted path from its segments.
    ///
    /// Segments are trimmed; an empty segment or one containing the
    /// separator is rejected.
    pub fn path(segments: &[&str]) -> Result<String, CacheError> {
        if segments.is_empty() {
            return Err(CacheError::BadPath("no path segments given".into()));
        }
        let mut path = String::from(ROOT);
        for segment in segments {
            let segment = segment.trim();
            if segment.is_empty() {
                return Err(CacheError::BadPath("empty path segment".into()));
            }
            if segment.contains(SEPARATOR) {
                return Err(CacheError::BadPath(format!(
                    "path segment contains '{}': {}",
                    SEPARATOR, segment
                )));
            }
            path.push(SEPARATOR);
            path.push_str(segment);
        }
        Ok(path)
    }

    pub fn get(&self, path: &str, in_aux: bool) -> Result<Option<Arc<T>>, CacheError> {
        check_path(path)?;
        let snapshot = self.snapshot(in_aux)?;
        let found = snapshot.entries.get(path).map(|e| Arc::clone(e.value()));
        debug!(path, in_aux, hit = found.is_some(), "cache get");
        Ok(found)
    }

    /// Insert or update. Returns the entry stored at `path` afterwards,
    /// which is the old one when the update condition rejects `value`.
    pub fn add(&self, path: &str, value: T, in_aux: bool) -> Result<Arc<T>, CacheError> {
        check_path(path)?;
        let snapshot = self.snapshot(in_aux)?;
        let stored = match snapshot.entries.entry(path.to_string()) {
            Entry::Vacant(slot) => Arc::clone(slot.insert(Arc::new(value)).value()),
            Entry::Occupied(mut slot) => {
                if value.may_replace(slot.get()) {
                    let value = Arc::new(value);
                    slot.insert(Arc::clone(&value));
                    value
                } else {
                    warn!(
                        path,
                        cached = %slot.get().describe(),
                        rejected = %value.describe(),
                        "update condition not met; cached object kept"
                    );
                    Arc::clone(slot.get())
                }
            }
        };
        debug!(path, in_aux, object = %stored.describe(), "cache add");
        Ok(stored)
    }

    pub fn remove_object(&self, path: &str, in_aux: bool) -> Result<Option<Arc<T>>, CacheError> {
        check_path(path)?;
        let snapshot = self.snapshot(in_aux)?;
        let removed = snapshot.entries.remove(path).map(|(_, v)| v);
        debug!(path, in_aux, removed = removed.is_some(), "cache remove");
        Ok(removed)
    }

    /// Remove `prefix` and every path below it. Returns how many entries
    /// went away.
    pub fn remove_subtree(&self, prefix: &str, in_aux: bool) -> Result<usize, CacheError> {
        check_path(prefix)?;
        let snapshot = self.snapshot(in_aux)?;
        let before = snapshot.entries.len();
        snapshot.entries.retain(|key, _| !is_under(key, prefix));
        let removed = before.saturating_sub(snapshot.entries.len());
        debug!(prefix, in_aux, removed, "cache subtree removed");
        Ok(removed)
    }

    pub fn len(&self, in_aux: bool) -> Result<usize, CacheError> {
        Ok(self.snapshot(in_aux)?.entries.len())
    }

    pub fn is_empty(&self, in_aux: bool) -> Result<bool, CacheError> {
        Ok(self.len(in_aux)? == 0)
    }

    // ── Reload protocol ──────────────────────────────────────────────────

    /// Create a fresh, empty auxiliary snapshot. Any previous auxiliary
    /// snapshot that was never assigned is discarded.
    pub fn start_auxiliary_cache(&self) {
        let previous = self.auxiliary.write().replace(Snapshot::empty());
        if previous.is_some() {
            warn!("auxiliary cache restarted; unassigned contents discarded");
        }
        info!("auxiliary cache started");
    }

    /// Drop the auxiliary snapshot without assigning it.
    pub fn discard_auxiliary_cache(&self) {
        if self.auxiliary.write().take().is_some() {
            info!("auxiliary cache discarded");
        }
    }

    /// Swap the auxiliary snapshot in as principal. The old principal is
    /// disposed of after `drain_delay`.
    pub fn assign_as_principal(&self, drain_delay: Duration) -> Result<(), CacheError> {
        let incoming = self.auxiliary.write().take().ok_or_else(|| {
            CacheError::NotInitialized("auxiliary cache has not been started".into())
        })?;
        let retired = std::mem::replace(&mut *self.principal.write(), incoming);
        info!(
            drain_delay_secs = drain_delay.as_secs(),
            retired_entries = retired.entries.len(),
            "auxiliary cache assigned as principal"
        );
        dispose_after(retired, drain_delay);
        Ok(())
    }

    pub fn is_reloading(&self) -> bool {
        self.auxiliary.read().is_some()
    }

    pub fn is_initialized(&self, in_aux: bool) -> bool {
        self.snapshot(in_aux)
            .map(|s| s.initialized.load(Ordering::Acquire))
            .unwrap_or(false)
    }

    pub fn set_initialized(&self, initialized: bool, in_aux: bool) -> Result<(), CacheError> {
        self.snapshot(in_aux)?
            .initialized
            .store(initialized, Ordering::Release);
        Ok(())
    }

    fn snapshot(&self, in_aux: bool) -> Result<Arc<Snapshot<T>>, CacheError> {
        if in_aux {
            self.auxiliary.read().clone().ok_or_else(|| {
                CacheError::NotInitialized("auxiliary cache has not been started".into())
            })
        } else {
            Ok(Arc::clone(&self.principal.read()))
        }
    }
}

impl<T> std::fmt::Debug for PathCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathCache")
            .field("principal_entries", &self.principal.read().entries.len())
            .field("reloading", &self.auxiliary.read().is_some())
            .finish()
    }
}

fn check_path(path: &str) -> Result<(), CacheError> {
    if path.trim().is_empty() {
        return Err(CacheError::BadPath("empty path".into()));
    }
    let rooted = path
        .strip_prefix(ROOT)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(SEPARATOR));
    if !rooted {
        return Err(CacheError::BadPath(format!("path not under {}: {}", ROOT, path)));
    }
    Ok(())
}

fn is_under(key: &str, prefix: &str) -> bool {
    key.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(SEPARATOR))
}

fn dispose_after<T: Send + Sync + 'static>(retired: Arc<Snapshot<T>>, drain_delay: Duration) {
    if drain_delay.is_zero() {
        drop(retired);
        debug!("retired cache snapshot disposed");
        return;
    }
    let spawned = std::thread::Builder::new()
        .name("qtrust-cache-drain".into())
        .spawn(move || {
            std::thread::sleep(drain_delay);
            drop(retired);
            info!("retired cache snapshot disposed");
        });
    if let Err(e) = spawned {
        warn!(error = %e, "could not start drain thread; retired snapshot disposed now");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Versioned(u32);

    impl CacheEntry for Versioned {
        fn describe(&self) -> String {
            format!("v{}", self.0)
        }

        fn may_replace(&self, cached: &Self) -> bool {
            self.0 >= cached.0
        }
    }

    fn cache() -> PathCache<Versioned> {
        PathCache::new()
    }

    // ---- paths ----

    #[test]
    fn builds_rooted_paths() {
        let path = PathCache::<Versioned>::path(&["TSL", " CountriesRegions ", "ES"]).unwrap();
        assert_eq!(path, "Configuration/TSL/CountriesRegions/ES");
    }

    #[test]
    fn rejects_bad_paths() {
        assert!(matches!(PathCache::<Versioned>::path(&[]), Err(CacheError::BadPath(_))));
        assert!(matches!(PathCache::<Versioned>::path(&["TSL", " "]), Err(CacheError::BadPath(_))));
        assert!(matches!(PathCache::<Versioned>::path(&["a/b"]), Err(CacheError::BadPath(_))));

        let c = cache();
        assert!(matches!(c.get("", false), Err(CacheError::BadPath(_))));
        assert!(matches!(c.get("Other/x", false), Err(CacheError::BadPath(_))));
        assert!(matches!(c.get("ConfigurationX/x", false), Err(CacheError::BadPath(_))));
    }

    // ---- objects ----

    #[test]
    fn add_get_remove() {
        let c = cache();
        let path = "Configuration/TSL/x";
        assert!(c.get(path, false).unwrap().is_none());
        c.add(path, Versioned(1), false).unwrap();
        assert_eq!(*c.get(path, false).unwrap().unwrap(), Versioned(1));
        assert_eq!(*c.remove_object(path, false).unwrap().unwrap(), Versioned(1));
        assert!(c.get(path, false).unwrap().is_none());
    }

    #[test]
    fn update_condition_keeps_cached() {
        let c = cache();
        let path = "Configuration/v";
        c.add(path, Versioned(5), false).unwrap();
        let stored = c.add(path, Versioned(3), false).unwrap();
        assert_eq!(*stored, Versioned(5));
        let stored = c.add(path, Versioned(7), false).unwrap();
        assert_eq!(*stored, Versioned(7));
    }

    #[test]
    fn subtree_removal_respects_segments() {
        let c = cache();
        c.add("Configuration/TSL/a", Versioned(1), false).unwrap();
        c.add("Configuration/TSL/b/c", Versioned(1), false).unwrap();
        c.add("Configuration/TSLX/a", Versioned(1), false).unwrap();
        assert_eq!(c.remove_subtree("Configuration/TSL", false).unwrap(), 2);
        assert!(c.get("Configuration/TSLX/a", false).unwrap().is_some());
    }

    // ---- reload ----

    #[test]
    fn auxiliary_requires_start() {
        let c = cache();
        assert!(matches!(c.get("Configuration/x", true), Err(CacheError::NotInitialized(_))));
        assert!(matches!(
            c.assign_as_principal(Duration::ZERO),
            Err(CacheError::NotInitialized(_))
        ));
        assert!(!c.is_initialized(true));
    }

    #[test]
    fn swap_replaces_principal() {
        let c = cache();
        c.add("Configuration/x", Versioned(1), false).unwrap();
        c.set_initialized(true, false).unwrap();

        c.start_auxiliary_cache();
        assert!(c.is_reloading());
        c.add("Configuration/x", Versioned(2), true).unwrap();
        c.add("Configuration/y", Versioned(1), true).unwrap();
        assert_eq!(*c.get("Configuration/x", false).unwrap().unwrap(), Versioned(1));
        assert!(c.get("Configuration/y", false).unwrap().is_none());
        assert!(!c.is_initialized(true));

        c.assign_as_principal(Duration::ZERO).unwrap();
        assert!(!c.is_reloading());
        assert_eq!(*c.get("Configuration/x", false).unwrap().unwrap(), Versioned(2));
        assert!(c.get("Configuration/y", false).unwrap().is_some());
        assert!(!c.is_initialized(false));
    }

    #[test]
    fn in_flight_reader_keeps_old_snapshot() {
        let c = cache();
        c.add("Configuration/x", Versioned(1), false).unwrap();
        let held = c.get("Configuration/x", false).unwrap().unwrap();

        c.start_auxiliary_cache();
        c.assign_as_principal(Duration::from_millis(10)).unwrap();
        assert_eq!(*held, Versioned(1));
        assert!(c.get("Configuration/x", false).unwrap().is_none());
    }

    #[test]
    fn discard_leaves_principal() {
        let c = cache();
        c.add("Configuration/x", Versioned(1), false).unwrap();
        c.start_auxiliary_cache();
        c.discard_auxiliary_cache();
        assert!(!c.is_reloading());
        assert!(c.get("Configuration/x", false).unwrap().is_some());
    }
}
