/// In-process object cache for directory-derived records
///
/// Keeps registrations and registrants in two independent maps keyed by
/// lower-cased DN, each entry carrying its own expiry:
/// - Expiry is checked lazily on lookup; `tidy`/`flush` are the only bulk purges
/// - Per-kind admission thresholds (0 = unlimited) bound new keys, refreshes always pass
/// - A frozen cache is read-only: no adds, touches, removals or purges
/// - `free` discards everything regardless of the frozen flag
///
/// One mutex guards both maps and the frozen flag. Snapshot file I/O runs
/// outside the lock, so callers must not race `write_*`/`load_*` against
/// other mutation of the same cache.

pub mod clock;
pub mod snapshot;

pub use clock::{Clock, ManualClock, SystemClock};

use crate::config::CacheConfig;
use crate::error::{DirError, DirResult};
use crate::metrics;
use crate::record::{Registrant, Registration};
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Object kinds the cache holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CacheKind {
    Registration,
    Registrant,
}

impl CacheKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheKind::Registration => "registration",
            CacheKind::Registrant => "registrant",
        }
    }
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cached object and the instant it stops being served
#[derive(Debug)]
pub struct CacheEntry<T> {
    pub value: Arc<T>,
    pub expiry: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiry
    }
}

impl<T> Clone for CacheEntry<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            expiry: self.expiry,
        }
    }
}

/// Entries of one kind plus its admission threshold
#[derive(Debug)]
pub struct KindStore<T> {
    entries: HashMap<String, CacheEntry<T>>,
    threshold: usize,
}

impl<T> KindStore<T> {
    fn new(threshold: usize) -> Self {
        Self {
            entries: HashMap::new(),
            threshold,
        }
    }

    fn admits(&self, key: &str) -> bool {
        self.threshold == 0 || self.entries.len() < self.threshold || self.entries.contains_key(key)
    }

    fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before - self.entries.len()
    }
}

/// Both kind maps and the frozen flag; only reachable through the cache lock
#[derive(Debug)]
pub struct CacheMaps {
    pub(crate) registrations: KindStore<Registration>,
    pub(crate) registrants: KindStore<Registrant>,
    frozen: bool,
}

impl CacheMaps {
    fn new(config: &CacheConfig) -> Self {
        Self {
            registrations: KindStore::new(config.max_registrations),
            registrants: KindStore::new(config.max_registrants),
            frozen: false,
        }
    }
}

/// Records the cache can hold
pub trait Cacheable: Serialize + DeserializeOwned + Send + Sync + 'static {
    const KIND: CacheKind;

    /// DN the object is cached under
    fn cache_key(&self) -> &str;

    /// True for objects carrying no directory data
    fn is_unset(&self) -> bool;

    fn store_mut(maps: &mut CacheMaps) -> &mut KindStore<Self>;
}

/// Thread-safe TTL cache of registrations and registrants
pub struct ObjectCache {
    state: Mutex<Option<CacheMaps>>,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for ObjectCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectCache")
            .field("initialized", &self.is_initialized())
            .field("frozen", &self.is_frozen())
            .field("clock", &self.clock)
            .finish()
    }
}

impl ObjectCache {
    /// Create an initialized, thawed cache using the wall clock
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let maps = CacheMaps::new(&config);
        Self {
            state: Mutex::new(Some(maps)),
            config,
            clock,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Cache `object` for `ttl_minutes`.
    ///
    /// Returns false when the add was dropped: disabled, frozen or uninitialized
    /// cache, unset object, empty DN, non-positive TTL, or a new key arriving
    /// after the kind's threshold was reached.
    pub fn add<T: Cacheable>(&self, object: Arc<T>, ttl_minutes: i64) -> bool {
        if !self.config.enabled {
            return false;
        }
        if ttl_minutes <= 0 {
            debug!("Cache ADD skipped for {}: TTL {} means do not cache", T::KIND, ttl_minutes);
            return false;
        }
        if object.is_unset() || object.cache_key().trim().is_empty() {
            debug!("Cache ADD skipped: unset {} or empty DN", T::KIND);
            return false;
        }

        let key = normalize_key(object.cache_key());
        let expiry = match expiry_after(self.clock.now(), ttl_minutes) {
            Some(expiry) => expiry,
            None => {
                warn!("Cache ADD skipped for {}: TTL {} overflows", key, ttl_minutes);
                return false;
            }
        };

        let mut guard = self.state.lock();
        let maps = match guard.as_mut() {
            Some(maps) if !maps.frozen => maps,
            _ => return false,
        };

        let store = T::store_mut(maps);
        if !store.admits(&key) {
            warn!(
                "Cache ADD dropped for {}: {} threshold of {} reached",
                key,
                T::KIND,
                store.threshold
            );
            metrics::record_admission_dropped(T::KIND.as_str());
            return false;
        }

        debug!("Cache ADD: {} {} (TTL: {}m)", T::KIND, key, ttl_minutes);
        store.entries.insert(key, CacheEntry { value: object, expiry });
        metrics::set_cache_entries(T::KIND.as_str(), store.entries.len());
        true
    }

    /// Cache `object` with the configured default TTL
    pub fn add_default<T: Cacheable>(&self, object: Arc<T>) -> bool {
        self.add(object, self.config.default_ttl_minutes)
    }

    /// Case-insensitive lookup. Expired entries are deleted (unless frozen) and reported as absent.
    pub fn get<T: Cacheable>(&self, dn: &str) -> Option<Arc<T>> {
        let key = normalize_key(dn);
        let now = self.clock.now();

        let mut guard = self.state.lock();
        let maps = guard.as_mut()?;
        let frozen = maps.frozen;
        let store = T::store_mut(maps);

        match store.entries.get(&key) {
            None => {
                debug!("Cache MISS: {} {}", T::KIND, key);
                metrics::record_cache_access(T::KIND.as_str(), false);
                return None;
            }
            Some(entry) if !entry.is_expired(now) => {
                debug!("Cache HIT: {} {}", T::KIND, key);
                metrics::record_cache_access(T::KIND.as_str(), true);
                return Some(Arc::clone(&entry.value));
            }
            Some(_) => {}
        }

        // expired; a frozen cache keeps the stale entry in place
        if !frozen {
            store.entries.remove(&key);
            metrics::record_cache_eviction(T::KIND.as_str(), "expired", 1);
            metrics::set_cache_entries(T::KIND.as_str(), store.entries.len());
        }
        debug!("Cache EXPIRED: {} {}", T::KIND, key);
        metrics::record_cache_access(T::KIND.as_str(), false);
        None
    }

    /// Reset an entry's expiry to now + `minutes`, reviving it if already expired
    pub fn touch<T: Cacheable>(&self, dn: &str, minutes: i64) -> bool {
        if minutes <= 0 {
            return false;
        }
        let key = normalize_key(dn);
        let expiry = match expiry_after(self.clock.now(), minutes) {
            Some(expiry) => expiry,
            None => return false,
        };

        let mut guard = self.state.lock();
        let maps = match guard.as_mut() {
            Some(maps) if !maps.frozen => maps,
            _ => return false,
        };

        match T::store_mut(maps).entries.get_mut(&key) {
            Some(entry) => {
                debug!("Cache TOUCH: {} {} (+{}m)", T::KIND, key, minutes);
                entry.expiry = expiry;
                true
            }
            None => false,
        }
    }

    pub fn remove<T: Cacheable>(&self, dn: &str) -> bool {
        let key = normalize_key(dn);
        let mut guard = self.state.lock();
        let maps = match guard.as_mut() {
            Some(maps) if !maps.frozen => maps,
            _ => return false,
        };

        let store = T::store_mut(maps);
        let removed = store.entries.remove(&key).is_some();
        if removed {
            debug!("Cache REMOVE: {} {}", T::KIND, key);
            metrics::record_cache_eviction(T::KIND.as_str(), "removed", 1);
            metrics::set_cache_entries(T::KIND.as_str(), store.entries.len());
        }
        removed
    }

    /// Drop every entry of both kinds
    pub fn flush(&self) {
        let mut guard = self.state.lock();
        let maps = match guard.as_mut() {
            Some(maps) if !maps.frozen => maps,
            _ => return,
        };

        let registrations = flush_store(&mut maps.registrations, CacheKind::Registration);
        let registrants = flush_store(&mut maps.registrants, CacheKind::Registrant);
        info!(
            "Cache FLUSH: dropped {} registrations and {} registrants",
            registrations, registrants
        );
    }

    /// Drop every entry of one kind
    pub fn flush_kind<T: Cacheable>(&self) {
        let mut guard = self.state.lock();
        if let Some(maps) = guard.as_mut().filter(|m| !m.frozen) {
            let dropped = flush_store(T::store_mut(maps), T::KIND);
            info!("Cache FLUSH: dropped {} {} entries", dropped, T::KIND);
        }
    }

    /// Purge expired entries of both kinds, returning how many were dropped
    pub fn tidy(&self) -> usize {
        let now = self.clock.now();
        let mut guard = self.state.lock();
        let maps = match guard.as_mut() {
            Some(maps) if !maps.frozen => maps,
            _ => return 0,
        };

        let registrations = maps.registrations.purge_expired(now);
        let registrants = maps.registrants.purge_expired(now);
        for (kind, count, len) in [
            (CacheKind::Registration, registrations, maps.registrations.entries.len()),
            (CacheKind::Registrant, registrants, maps.registrants.entries.len()),
        ] {
            metrics::record_cache_eviction(kind.as_str(), "expired", count);
            metrics::set_cache_entries(kind.as_str(), len);
        }

        let total = registrations + registrants;
        if total > 0 {
            debug!("Cache TIDY: purged {} expired entries", total);
        }
        total
    }

    pub fn freeze(&self) {
        if let Some(maps) = self.state.lock().as_mut() {
            if !maps.frozen {
                info!("Cache frozen");
            }
            maps.frozen = true;
        }
    }

    pub fn thaw(&self) {
        if let Some(maps) = self.state.lock().as_mut() {
            if maps.frozen {
                info!("Cache thawed");
            }
            maps.frozen = false;
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.state.lock().as_ref().map(|m| m.frozen).unwrap_or(false)
    }

    /// Destroy both maps regardless of the frozen flag
    pub fn free(&self) {
        if self.state.lock().take().is_some() {
            for kind in [CacheKind::Registration, CacheKind::Registrant] {
                metrics::set_cache_entries(kind.as_str(), 0);
            }
            info!("Cache freed");
        }
    }

    /// Re-create empty maps after `free`; a no-op on a live cache
    pub fn init(&self) {
        let mut guard = self.state.lock();
        if guard.is_none() {
            *guard = Some(CacheMaps::new(&self.config));
            info!("Cache initialized");
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().is_some()
    }

    /// Entries of a kind, expired or not
    pub fn len<T: Cacheable>(&self) -> usize {
        self.state
            .lock()
            .as_mut()
            .map(|maps| T::store_mut(maps).entries.len())
            .unwrap_or(0)
    }

    pub fn is_empty<T: Cacheable>(&self) -> bool {
        self.len::<T>() == 0
    }

    /// Whether a key is stored, without expiry checks or purging
    pub fn contains<T: Cacheable>(&self, dn: &str) -> bool {
        let key = normalize_key(dn);
        self.state
            .lock()
            .as_mut()
            .map(|maps| T::store_mut(maps).entries.contains_key(&key))
            .unwrap_or(false)
    }

    pub fn expiry_of<T: Cacheable>(&self, dn: &str) -> Option<DateTime<Utc>> {
        let key = normalize_key(dn);
        self.state
            .lock()
            .as_mut()
            .and_then(|maps| T::store_mut(maps).entries.get(&key).map(|e| e.expiry))
    }

    /// Stored keys of a kind, sorted
    pub fn keys<T: Cacheable>(&self) -> Vec<String> {
        let mut keys = self
            .state
            .lock()
            .as_mut()
            .map(|maps| T::store_mut(maps).entries.keys().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    /// Change a kind's admission threshold; existing entries are kept
    pub fn set_threshold<T: Cacheable>(&self, threshold: usize) {
        if let Some(maps) = self.state.lock().as_mut() {
            T::store_mut(maps).threshold = threshold;
        }
    }

    /// Write one kind's entries to `path`. An empty or uninitialized cache writes nothing.
    pub fn write<T: Cacheable>(&self, path: &Path) -> DirResult<()> {
        let entries = {
            let mut guard = self.state.lock();
            let maps = match guard.as_mut() {
                Some(maps) => maps,
                None => return Ok(()),
            };
            T::store_mut(maps)
                .entries
                .iter()
                .map(|(k, e)| (k.clone(), e.clone()))
                .collect::<Vec<_>>()
        };

        if entries.is_empty() {
            debug!("Cache WRITE skipped: no {} entries", T::KIND);
            return Ok(());
        }

        let bytes = snapshot::encode(T::KIND, self.clock.now(), &entries)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, bytes)?;

        info!("Cache WRITE: {} {} entries to {:?}", entries.len(), T::KIND, path);
        Ok(())
    }

    /// Replace one kind's entries with the snapshot at `path`, returning how many were loaded
    pub fn load<T: Cacheable>(&self, path: &Path) -> DirResult<usize> {
        self.require_writable()?;

        let bytes = std::fs::read(path)?;
        let mut entries = snapshot::decode::<T>(T::KIND, &bytes)?;

        let mut guard = self.state.lock();
        let maps = match guard.as_mut() {
            Some(maps) if !maps.frozen => maps,
            Some(_) => return Err(frozen_error()),
            None => return Err(uninitialized_error()),
        };

        let store = T::store_mut(maps);
        if store.threshold > 0 && entries.len() > store.threshold {
            warn!(
                "Cache LOAD: snapshot holds {} {} entries, keeping {}",
                entries.len(),
                T::KIND,
                store.threshold
            );
            let now = self.clock.now();
            entries.retain(|(_, entry)| !entry.is_expired(now));
            // longest-lived first; key order breaks ties
            entries.sort_by(|(ka, a), (kb, b)| b.expiry.cmp(&a.expiry).then_with(|| ka.cmp(kb)));
            entries.truncate(store.threshold);
        }

        store.entries = entries
            .into_iter()
            .map(|(key, entry)| (normalize_key(&key), entry))
            .collect();
        let loaded = store.entries.len();
        metrics::set_cache_entries(T::KIND.as_str(), loaded);

        info!("Cache LOAD: {} {} entries from {:?}", loaded, T::KIND, path);
        Ok(loaded)
    }

    pub fn write_registrations(&self, path: &Path) -> DirResult<()> {
        self.write::<Registration>(path)
    }

    pub fn load_registrations(&self, path: &Path) -> DirResult<usize> {
        self.load::<Registration>(path)
    }

    pub fn write_registrants(&self, path: &Path) -> DirResult<()> {
        self.write::<Registrant>(path)
    }

    pub fn load_registrants(&self, path: &Path) -> DirResult<usize> {
        self.load::<Registrant>(path)
    }

    /// Default snapshot location for a kind under the configured directory
    pub fn snapshot_path(&self, kind: CacheKind) -> std::path::PathBuf {
        self.config
            .snapshot_dir
            .join(format!("{}s.cbor", kind.as_str()))
    }

    fn require_writable(&self) -> DirResult<()> {
        match self.state.lock().as_ref() {
            None => Err(uninitialized_error()),
            Some(maps) if maps.frozen => Err(frozen_error()),
            Some(_) => Ok(()),
        }
    }
}

impl Default for ObjectCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

fn normalize_key(dn: &str) -> String {
    dn.trim().to_lowercase()
}

fn expiry_after(now: DateTime<Utc>, minutes: i64) -> Option<DateTime<Utc>> {
    Duration::try_minutes(minutes).and_then(|ttl| now.checked_add_signed(ttl))
}

fn flush_store<T>(store: &mut KindStore<T>, kind: CacheKind) -> usize {
    let dropped = store.entries.len();
    store.entries.clear();
    metrics::record_cache_eviction(kind.as_str(), "flushed", dropped);
    metrics::set_cache_entries(kind.as_str(), 0);
    dropped
}

fn uninitialized_error() -> DirError {
    DirError::CacheState("cache is not initialized".to_string())
}

fn frozen_error() -> DirError {
    DirError::CacheState("cache is frozen".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn cache_with_clock() -> (ObjectCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start()));
        let cache = ObjectCache::with_clock(CacheConfig::default(), clock.clone());
        (cache, clock)
    }

    fn registration(dn: &str) -> Arc<Registration> {
        Arc::new(Registration::new(dn))
    }

    #[test]
    fn test_add_and_get_case_insensitive() {
        let (cache, _) = cache_with_clock();
        let reg = registration("n=1,ou=Registrations,o=rA");
        assert!(cache.add(reg.clone(), 10));

        let hit = cache.get::<Registration>("N=1,OU=registrations,O=RA").unwrap();
        assert!(Arc::ptr_eq(&hit, &reg));
        assert!(cache.get::<Registrant>("n=1,ou=Registrations,o=rA").is_none());
    }

    #[test]
    fn test_add_rejections() {
        let (cache, _) = cache_with_clock();
        assert!(!cache.add(registration("n=1,o=rA"), 0));
        assert!(!cache.add(registration("n=1,o=rA"), -5));
        assert!(!cache.add(Arc::new(Registration::default()), 10));
        assert!(cache.is_empty::<Registration>());
    }

    #[test]
    fn test_expiry_purges_on_lookup() {
        let (cache, clock) = cache_with_clock();
        cache.add(registration("n=2,o=rA"), 5);

        clock.advance(Duration::minutes(4));
        assert!(cache.get::<Registration>("n=2,o=rA").is_some());

        clock.advance(Duration::minutes(2));
        assert!(cache.get::<Registration>("n=2,o=rA").is_none());
        assert!(!cache.contains::<Registration>("n=2,o=rA"));
    }

    #[test]
    fn test_frozen_lookup_keeps_stale_entry() {
        let (cache, clock) = cache_with_clock();
        cache.add(registration("n=2,o=rA"), 5);
        cache.freeze();
        clock.advance(Duration::minutes(6));

        assert!(cache.get::<Registration>("n=2,o=rA").is_none());
        assert!(cache.contains::<Registration>("n=2,o=rA"));

        cache.thaw();
        assert!(cache.get::<Registration>("n=2,o=rA").is_none());
        assert!(!cache.contains::<Registration>("n=2,o=rA"));
    }

    #[test]
    fn test_touch_resurrects() {
        let (cache, clock) = cache_with_clock();
        cache.add(registration("n=3,o=rA"), 1);
        clock.advance(Duration::minutes(5));

        assert!(!cache.touch::<Registration>("n=3,o=rA", 0));
        assert!(!cache.touch::<Registration>("n=404,o=rA", 10));
        assert!(cache.touch::<Registration>("n=3,o=rA", 10));
        assert!(cache.get::<Registration>("n=3,o=rA").is_some());
        assert_eq!(
            cache.expiry_of::<Registration>("n=3,o=rA"),
            Some(start() + Duration::minutes(15))
        );
    }

    #[test]
    fn test_threshold_allows_refresh() {
        let config = CacheConfig {
            max_registrations: 1,
            ..CacheConfig::default()
        };
        let cache = ObjectCache::new(config);

        assert!(cache.add(registration("n=1,o=rA"), 10));
        assert!(!cache.add(registration("n=2,o=rA"), 10));
        assert!(cache.get::<Registration>("n=2,o=rA").is_none());
        assert!(cache.add(registration("N=1,o=rA"), 20));
        assert!(cache.get::<Registration>("n=1,o=rA").is_some());
        assert_eq!(cache.len::<Registration>(), 1);
    }

    #[test]
    fn test_tidy_only_drops_expired() {
        let (cache, clock) = cache_with_clock();
        cache.add(registration("n=1,o=rA"), 1);
        cache.add(registration("n=2,o=rA"), 60);
        clock.advance(Duration::minutes(2));

        assert_eq!(cache.tidy(), 1);
        assert_eq!(cache.keys::<Registration>(), vec!["n=2,o=ra".to_string()]);
    }

    #[test]
    fn test_disabled_cache_admits_nothing() {
        let config = CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        };
        let cache = ObjectCache::new(config);
        assert!(!cache.add(registration("n=1,o=rA"), 10));
        assert!(cache.get::<Registration>("n=1,o=rA").is_none());
    }

    #[test]
    fn test_free_and_init() {
        let (cache, _) = cache_with_clock();
        cache.add(registration("n=1,o=rA"), 10);
        cache.freeze();
        cache.free();

        assert!(!cache.is_initialized());
        assert!(cache.get::<Registration>("n=1,o=rA").is_none());
        assert!(!cache.add(registration("n=1,o=rA"), 10));

        cache.init();
        assert!(cache.is_initialized());
        assert!(!cache.is_frozen());
        assert!(cache.add(registration("n=1,o=rA"), 10));
    }
}
