//! Durable place store backed by sled.
//!
//! One tree per place category plus a `meta` tree carrying the schema
//! version. Row keys are `(id, kind-code)` so re-indexing the same entity
//! is a plain overwrite. Coordinates are persisted as fixed-point integers
//! (the usual OSM 1e7 convention) so rows survive round-trips without
//! floating-point drift.
//!
//! Writes are batched: each upsert marks the store dirty and arms a single
//! debounced background flush instead of committing per row. Durability is
//! only guaranteed after `checkpoint()`/`shutdown()` return; a crash
//! in-between can lose recent rows, which is acceptable because the index
//! is fully rebuildable from the source map.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sled::{Db, Tree};
use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::error::PlaceError;
use crate::models::{GeoBounds, GeoPoint, PlaceRegion, RegionKind};
use crate::normalize::{like_to_regex, normalize};

/// Bump when the row encoding or key layout changes. A mismatch drops the
/// place trees and starts empty; the index is never migrated in place.
const SCHEMA_VERSION: u32 = 1;

const TREE_CITY: &str = "city";
const TREE_SUBURB: &str = "suburb";
const TREE_META: &str = "meta";

const KEY_SCHEMA_VERSION: &[u8] = b"schema_version";
const KEY_BUILT_AT: &[u8] = b"built_at";

/// Fixed-point conversion factor for persisted coordinates.
pub const COORD_SCALE: f64 = 1e7;

pub fn to_fixed(value: f64) -> i64 {
    (value * COORD_SCALE).round() as i64
}

pub fn from_fixed(value: i64) -> f64 {
    value as f64 / COORD_SCALE
}

/// Logical table a place row lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceCategory {
    City,
    Suburb,
}

/// Persisted place row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedPlace {
    pub id: i64,
    pub kind: RegionKind,
    pub name: String,
    pub center_lat: i64,
    pub center_lon: i64,
    pub radius: i64,
}

impl IndexedPlace {
    pub fn from_region(id: i64, kind: RegionKind, region: &PlaceRegion) -> Self {
        let center = region.bounds.center();
        Self {
            id,
            kind,
            name: region.name.clone(),
            center_lat: to_fixed(center.lat),
            center_lon: to_fixed(center.lon),
            radius: to_fixed(region.bounds.size() / 2.0),
        }
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint {
            lat: from_fixed(self.center_lat),
            lon: from_fixed(self.center_lon),
        }
    }

    pub fn radius_degrees(&self) -> f64 {
        from_fixed(self.radius)
    }

    /// Reconstruct the square region `center ± radius`. The original
    /// aspect ratio of polygon-derived rows is not preserved; callers
    /// needing exact geometry go back to the live dataset.
    pub fn region(&self) -> PlaceRegion {
        PlaceRegion::new(
            self.name.clone(),
            GeoBounds::around(self.center(), self.radius_degrees()),
        )
    }

    fn row_key(&self) -> [u8; 9] {
        row_key(self.id, self.kind)
    }
}

fn row_key(id: i64, kind: RegionKind) -> [u8; 9] {
    let mut key = [0u8; 9];
    key[..8].copy_from_slice(&id.to_be_bytes());
    key[8] = kind.code();
    key
}

/// Tuning knobs for the store.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Delay between the write that dirties the store and the background
    /// flush it arms.
    pub flush_delay: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            flush_delay: Duration::from_secs(60),
        }
    }
}

/// Arms at most one pending background flush at a time. Writes arriving
/// while a flush is pending are covered by it; outside a tokio runtime the
/// store stays dirty until `checkpoint()`/`shutdown()`.
struct DebouncedFlush {
    db: Db,
    delay: Duration,
    pending: Arc<AtomicBool>,
}

impl DebouncedFlush {
    fn new(db: Db, delay: Duration) -> Self {
        Self {
            db,
            delay,
            pending: Arc::new(AtomicBool::new(false)),
        }
    }

    fn mark_dirty(&self) {
        if self.pending.swap(true, Ordering::SeqCst) {
            // flush already pending, it will cover this write
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!("no async runtime, index flush deferred to checkpoint");
            return;
        };
        let db = self.db.clone();
        let pending = Arc::clone(&self.pending);
        let delay = self.delay;
        handle.spawn(async move {
            tokio::time::sleep(delay).await;
            pending.store(false, Ordering::SeqCst);
            if let Err(e) = db.flush_async().await {
                warn!(error = %e, "background place-index flush failed");
            }
        });
    }

    fn settle(&self) {
        self.pending.store(false, Ordering::SeqCst);
    }
}

/// Durable, queryable store of [`IndexedPlace`] rows.
///
/// The handle is explicitly owned and constructor-injected; opening,
/// checkpointing and shutdown are all explicit, and `shutdown` consumes
/// the store so stale handles cannot linger.
pub struct PlaceStore {
    db: Db,
    city: Tree,
    suburb: Tree,
    meta: Tree,
    flush: DebouncedFlush,
    // Keeps a temp-dir store alive for the lifetime of the handle.
    _scratch: Option<TempDir>,
}

impl PlaceStore {
    pub fn open<P: AsRef<Path>>(path: P, options: StoreOptions) -> Result<Self, PlaceError> {
        let db = sled::open(path.as_ref())?;
        Self::from_db(db, options, None)
    }

    /// Store in a throwaway temp directory; used by tests and dry runs.
    pub fn open_temp(options: StoreOptions) -> Result<Self, PlaceError> {
        let scratch = TempDir::new().map_err(sled::Error::Io)?;
        let db = sled::open(scratch.path())?;
        Self::from_db(db, options, Some(scratch))
    }

    fn from_db(db: Db, options: StoreOptions, scratch: Option<TempDir>) -> Result<Self, PlaceError> {
        let meta = db.open_tree(TREE_META)?;

        let stored_version = meta
            .get(KEY_SCHEMA_VERSION)?
            .and_then(|raw| raw.as_ref().try_into().ok().map(u32::from_be_bytes));

        if stored_version != Some(SCHEMA_VERSION) {
            info!(
                found = ?stored_version,
                expected = SCHEMA_VERSION,
                "place index schema changed, dropping and rebuilding"
            );
            db.drop_tree(TREE_CITY)?;
            db.drop_tree(TREE_SUBURB)?;
            meta.insert(KEY_SCHEMA_VERSION, &SCHEMA_VERSION.to_be_bytes())?;
            meta.insert(KEY_BUILT_AT, Utc::now().to_rfc3339().as_bytes())?;
        }

        let city = db.open_tree(TREE_CITY)?;
        let suburb = db.open_tree(TREE_SUBURB)?;
        let flush = DebouncedFlush::new(db.clone(), options.flush_delay);

        Ok(Self {
            db,
            city,
            suburb,
            meta,
            flush,
            _scratch: scratch,
        })
    }

    fn tree(&self, category: PlaceCategory) -> &Tree {
        match category {
            PlaceCategory::City => &self.city,
            PlaceCategory::Suburb => &self.suburb,
        }
    }

    /// Insert or overwrite a row. Idempotent; re-indexing the same entity
    /// is last-writer-wins.
    pub fn upsert(&self, category: PlaceCategory, row: &IndexedPlace) -> Result<(), PlaceError> {
        let value = serde_json::to_vec(row)?;
        self.tree(category).insert(row.row_key(), value)?;
        self.flush.mark_dirty();
        Ok(())
    }

    pub fn get(
        &self,
        category: PlaceCategory,
        id: i64,
        kind: RegionKind,
    ) -> Result<Option<IndexedPlace>, PlaceError> {
        match self.tree(category).get(row_key(id, kind))? {
            Some(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            None => Ok(None),
        }
    }

    /// Rows whose normalized name matches a `%`-wildcard pattern, the
    /// same normalization the pattern was built with. Scan order follows
    /// sled key order, so results are deterministic for a fixed index
    /// state; no other ordering is guaranteed.
    pub fn find_by_name_like(
        &self,
        pattern: &str,
        category: PlaceCategory,
    ) -> Result<Vec<IndexedPlace>, PlaceError> {
        let re = like_to_regex(pattern)
            .map_err(|_| PlaceError::InvalidArgument("unusable name pattern"))?;

        let mut rows = Vec::new();
        for item in self.tree(category).iter() {
            let (_, value) = item?;
            let row: IndexedPlace = serde_json::from_slice(&value)?;
            if re.is_match(&normalize(&row.name)) {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    /// Rows whose stored `center ± radius` square intersects the query
    /// box. This is a necessary-but-not-sufficient pre-filter: callers
    /// must re-check true containment against the reconstructed region.
    pub fn find_overlapping(
        &self,
        bounds: &GeoBounds,
        category: PlaceCategory,
    ) -> Result<Vec<IndexedPlace>, PlaceError> {
        let mut rows = Vec::new();
        for item in self.tree(category).iter() {
            let (_, value) = item?;
            let row: IndexedPlace = serde_json::from_slice(&value)?;
            if row.region().bounds.intersects(bounds) {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    pub fn count(&self, category: PlaceCategory) -> usize {
        self.tree(category).len()
    }

    /// Force a durable flush. Idempotent, safe from any calling context.
    pub fn checkpoint(&self) -> Result<(), PlaceError> {
        self.flush.settle();
        self.db.flush()?;
        Ok(())
    }

    /// Final flush and close. Consumes the store; the backing directory
    /// can be reopened cleanly afterwards.
    pub fn shutdown(self) -> Result<(), PlaceError> {
        self.flush.settle();
        self.db.flush()?;
        Ok(())
    }
}
