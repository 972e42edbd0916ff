/// Cache lifecycle tests: TTL expiry, freeze discipline, thresholds and snapshots
use chrono::{DateTime, Duration, TimeZone, Utc};
use oid_directory::{CacheConfig, CacheKind, ManualClock, ObjectCache, Registrant, Registration};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

fn setup(config: CacheConfig) -> (ObjectCache, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(start()));
    (ObjectCache::with_clock(config, clock.clone()), clock)
}

fn registration(dot: &str) -> Arc<Registration> {
    let mut reg = Registration::new(format!("dotNotation={},ou=Registrations,o=rA", dot));
    reg.set_dot_notation(Some(dot)).unwrap();
    Arc::new(reg)
}

fn registrant(id: &str) -> Arc<Registrant> {
    Arc::new(Registrant::new(format!("registrantID={},ou=Registrants,o=rA", id)))
}

#[test]
fn test_ttl_expiry_removes_entry() {
    let (cache, clock) = setup(CacheConfig::default());
    let reg = registration("1.3.6");
    let dn = reg.dn().to_string();

    assert!(cache.add(reg, 10));
    assert!(cache.get::<Registration>(&dn).is_some());

    clock.advance(Duration::minutes(11));
    assert!(cache.get::<Registration>(&dn).is_none());
    assert!(!cache.contains::<Registration>(&dn));
}

#[test]
fn test_frozen_cache_is_unchanged_by_mutations() {
    let (cache, clock) = setup(CacheConfig::default());
    let kept = registration("1.3.6");
    let kept_dn = kept.dn().to_string();
    cache.add(kept, 5);
    cache.add(registrant("ACME"), 5);

    cache.freeze();
    assert!(cache.is_frozen());
    let expiry = cache.expiry_of::<Registration>(&kept_dn);

    assert!(!cache.add(registration("2.25"), 10));
    assert!(!cache.remove::<Registration>(&kept_dn));
    assert!(!cache.touch::<Registration>(&kept_dn, 60));
    clock.advance(Duration::minutes(30));
    assert_eq!(cache.tidy(), 0);
    cache.flush();
    cache.flush_kind::<Registrant>();

    assert_eq!(cache.keys::<Registration>(), vec![kept_dn.to_lowercase()]);
    assert_eq!(cache.len::<Registrant>(), 1);
    assert_eq!(cache.expiry_of::<Registration>(&kept_dn), expiry);
    assert!(cache.get::<Registration>(&kept_dn).is_none());
    assert!(cache.contains::<Registration>(&kept_dn));

    cache.thaw();
    assert!(!cache.is_frozen());
    assert!(cache.touch::<Registration>(&kept_dn, 60));
    assert!(cache.get::<Registration>(&kept_dn).is_some());
    assert!(cache.remove::<Registration>(&kept_dn));
    assert!(!cache.contains::<Registration>(&kept_dn));
    assert!(cache.get::<Registration>(&kept_dn).is_none());
    assert_eq!(cache.tidy(), 1);
    assert!(cache.add(registration("2.25"), 10));
    cache.flush();
    assert!(cache.is_empty::<Registration>());
}

#[test]
fn test_remove_drops_entry() {
    let (cache, _) = setup(CacheConfig::default());
    let reg = registration("1.3.6.1");
    let dn = reg.dn().to_string();
    cache.add(reg, 10);
    cache.add(registration("1.3.6.2"), 10);

    assert!(cache.remove::<Registration>(&dn.to_uppercase()));
    assert!(!cache.contains::<Registration>(&dn));
    assert!(cache.get::<Registration>(&dn).is_none());
    assert!(!cache.remove::<Registration>(&dn));
    assert_eq!(cache.len::<Registration>(), 1);
}

#[test]
fn test_threshold_one_per_kind() {
    let config = CacheConfig {
        max_registrations: 1,
        max_registrants: 1,
        ..CacheConfig::default()
    };
    let (cache, _) = setup(config);

    let first = registration("1.3.6");
    let first_dn = first.dn().to_string();
    assert!(cache.add(first.clone(), 10));
    assert!(!cache.add(registration("1.3.7"), 10));
    assert!(cache.get::<Registration>(&first_dn).is_some());
    assert!(cache.add(first, 20));

    assert!(cache.add(registrant("A"), 10));
    assert!(!cache.add(registrant("B"), 10));
}

#[test]
fn test_add_default_uses_configured_ttl() {
    let config = CacheConfig {
        default_ttl_minutes: 15,
        ..CacheConfig::default()
    };
    let (cache, _) = setup(config);
    let reg = registration("1.3");
    let dn = reg.dn().to_string();

    assert!(cache.add_default(reg));
    assert_eq!(
        cache.expiry_of::<Registration>(&dn),
        Some(start() + Duration::minutes(15))
    );
}

#[test]
fn test_snapshot_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("registrations.cbor");
    let (cache, _) = setup(CacheConfig::default());

    let reg = registration("2.25.1");
    let dn = reg.dn().to_string();
    cache.add(reg.clone(), 30);
    cache.write_registrations(&path).unwrap();

    let (restored, _) = setup(CacheConfig::default());
    assert_eq!(restored.load_registrations(&path).unwrap(), 1);

    let hit = restored.get::<Registration>(&dn).unwrap();
    assert_eq!(*hit, *reg);
    assert_eq!(
        restored.expiry_of::<Registration>(&dn),
        cache.expiry_of::<Registration>(&dn)
    );
    assert_eq!(hit.registered_root().unwrap().n, 2);
}

#[test]
fn test_snapshot_load_over_threshold_keeps_live_entries() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("registrations.cbor");
    let (cache, _) = setup(CacheConfig::default());

    let short = registration("1.3.1");
    let long = registration("1.3.2");
    let medium = registration("1.3.3");
    cache.add(short.clone(), 1);
    cache.add(long.clone(), 60);
    cache.add(medium.clone(), 30);
    cache.write_registrations(&path).unwrap();

    let two = CacheConfig {
        max_registrations: 2,
        ..CacheConfig::default()
    };
    let (restored, clock) = setup(two);
    clock.advance(Duration::minutes(5));
    assert_eq!(restored.load_registrations(&path).unwrap(), 2);
    assert!(!restored.contains::<Registration>(short.dn()));
    assert!(restored.get::<Registration>(long.dn()).is_some());
    assert!(restored.get::<Registration>(medium.dn()).is_some());

    let one = CacheConfig {
        max_registrations: 1,
        ..CacheConfig::default()
    };
    let (restored, _) = setup(one);
    assert_eq!(restored.load_registrations(&path).unwrap(), 1);
    assert_eq!(
        restored.keys::<Registration>(),
        vec![long.dn().to_lowercase()]
    );
}

#[test]
fn test_snapshot_of_empty_kind_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("registrants.cbor");
    let (cache, _) = setup(CacheConfig::default());

    cache.write_registrants(&path).unwrap();
    assert!(!path.exists());
}

#[test]
fn test_snapshot_load_errors() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("registrants.cbor");
    let (cache, _) = setup(CacheConfig::default());
    cache.add(registrant("ACME"), 30);
    cache.write_registrants(&path).unwrap();

    cache.freeze();
    assert_eq!(cache.load_registrants(&path).unwrap_err().kind(), "cache_state");

    cache.free();
    let err = cache.load_registrants(&path).unwrap_err();
    assert_eq!(err.kind(), "cache_state");
    assert!(err.to_string().contains("not initialized"));

    cache.init();
    let err = cache.load_registrations(&path).unwrap_err();
    assert_eq!(err.kind(), "snapshot");
    assert_eq!(cache.load_registrants(&path).unwrap(), 1);

    let missing = dir.path().join("missing.cbor");
    assert_eq!(cache.load_registrants(&missing).unwrap_err().kind(), "io");
}

#[test]
fn test_snapshot_path_per_kind() {
    let config = CacheConfig {
        snapshot_dir: "/var/cache/oid".into(),
        ..CacheConfig::default()
    };
    let cache = ObjectCache::new(config);
    assert_eq!(
        cache.snapshot_path(CacheKind::Registrant),
        std::path::PathBuf::from("/var/cache/oid/registrants.cbor")
    );
}

#[test]
fn test_concurrent_access() {
    let cache = Arc::new(ObjectCache::new(CacheConfig::default()));
    let handles = (0..8)
        .map(|worker| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for i in 0..50 {
                    let reg = registration(&format!("1.3.{}.{}", worker, i));
                    let dn = reg.dn().to_string();
                    assert!(cache.add(reg, 10));
                    assert!(cache.get::<Registration>(&dn).is_some());
                }
            })
        })
        .collect::<Vec<_>>();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(cache.len::<Registration>(), 400);
}
