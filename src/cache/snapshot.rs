/// CBOR snapshot envelope for one cache kind
use super::{CacheEntry, CacheKind};
use crate::error::{DirError, DirResult};
use crate::metrics;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;

pub const SNAPSHOT_MAGIC: &str = "oid-directory/cache";
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize)]
struct SnapshotOut<'a, T> {
    magic: &'a str,
    version: u32,
    kind: CacheKind,
    written_at: DateTime<Utc>,
    entries: Vec<EntryOut<'a, T>>,
}

#[derive(Serialize)]
struct EntryOut<'a, T> {
    key: &'a str,
    expiry: DateTime<Utc>,
    value: &'a T,
}

#[derive(Deserialize)]
struct SnapshotIn<T> {
    magic: String,
    version: u32,
    kind: CacheKind,
    #[allow(dead_code)]
    written_at: DateTime<Utc>,
    entries: Vec<EntryIn<T>>,
}

#[derive(Deserialize)]
struct EntryIn<T> {
    key: String,
    expiry: DateTime<Utc>,
    value: T,
}

pub(crate) fn encode<T: Serialize>(
    kind: CacheKind,
    written_at: DateTime<Utc>,
    entries: &[(String, CacheEntry<T>)],
) -> DirResult<Vec<u8>> {
    let snapshot = SnapshotOut {
        magic: SNAPSHOT_MAGIC,
        version: SNAPSHOT_VERSION,
        kind,
        written_at,
        entries: entries
            .iter()
            .map(|(key, entry)| EntryOut {
                key,
                expiry: entry.expiry,
                value: entry.value.as_ref(),
            })
            .collect(),
    };

    serde_cbor::to_vec(&snapshot).map_err(|e| {
        metrics::record_codec_error("snapshot", "encode");
        DirError::Snapshot(format!("Failed to encode {} snapshot: {}", kind, e))
    })
}

/// Decode and validate a snapshot. Expired entries are kept; lookups purge them as usual.
pub(crate) fn decode<T: DeserializeOwned>(
    kind: CacheKind,
    bytes: &[u8],
) -> DirResult<Vec<(String, CacheEntry<T>)>> {
    let snapshot: SnapshotIn<T> = serde_cbor::from_slice(bytes).map_err(|e| {
        metrics::record_codec_error("snapshot", "decode");
        DirError::Snapshot(format!("Failed to decode {} snapshot: {}", kind, e))
    })?;

    if snapshot.magic != SNAPSHOT_MAGIC {
        metrics::record_codec_error("snapshot", "magic");
        return Err(DirError::Snapshot(format!(
            "Not a cache snapshot (magic {:?})",
            snapshot.magic
        )));
    }
    if snapshot.version != SNAPSHOT_VERSION {
        metrics::record_codec_error("snapshot", "version");
        return Err(DirError::Snapshot(format!(
            "Unsupported snapshot version {} (expected {})",
            snapshot.version, SNAPSHOT_VERSION
        )));
    }
    if snapshot.kind != kind {
        metrics::record_codec_error("snapshot", "kind");
        return Err(DirError::Snapshot(format!(
            "Snapshot holds {} entries, expected {}",
            snapshot.kind, kind
        )));
    }

    Ok(snapshot
        .entries
        .into_iter()
        .map(|entry| {
            (
                entry.key,
                CacheEntry {
                    value: Arc::new(entry.value),
                    expiry: entry.expiry,
                },
            )
        })
        .collect())
}
