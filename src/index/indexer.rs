//! Feeds administrative places from a live dataset into the place store.

use rayon::prelude::*;
use tracing::{debug, warn};

use super::estimate::PlaceSizeEstimator;
use super::store::{IndexedPlace, PlaceCategory, PlaceStore};
use crate::dataset::{MapDataset, MapNode, MapWay, Tags};
use crate::error::PlaceError;
use crate::models::{PlaceRegion, RegionKind};

/// Place categories that are never indexed. Kept as a single-item list on
/// purpose; extend cautiously.
const EXCLUDED_PLACES: &[&str] = &["island"];

/// What happened to one entity during indexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    Indexed,
    /// No name tag; an unnamed place cannot be searched.
    SkippedUnnamed,
    /// Category on the exclusion list.
    SkippedExcluded,
    /// Way geometry could not be resolved.
    SkippedGeometry,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub indexed: usize,
    pub skipped_unnamed: usize,
    pub skipped_excluded: usize,
    pub skipped_geometry: usize,
}

impl IndexStats {
    pub fn record(&mut self, outcome: IndexOutcome) {
        match outcome {
            IndexOutcome::Indexed => self.indexed += 1,
            IndexOutcome::SkippedUnnamed => self.skipped_unnamed += 1,
            IndexOutcome::SkippedExcluded => self.skipped_excluded += 1,
            IndexOutcome::SkippedGeometry => self.skipped_geometry += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.indexed + self.skipped_unnamed + self.skipped_excluded + self.skipped_geometry
    }
}

/// The store table for a place tag value, or `None` for excluded
/// categories.
pub fn category_for(tags: &Tags) -> Option<PlaceCategory> {
    let place = tags.place()?;
    if EXCLUDED_PLACES.iter().any(|x| place.eq_ignore_ascii_case(x)) {
        return None;
    }
    if place.eq_ignore_ascii_case("suburb") {
        Some(PlaceCategory::Suburb)
    } else {
        Some(PlaceCategory::City)
    }
}

enum Prepared {
    Row(PlaceCategory, IndexedPlace),
    Skipped(IndexOutcome),
}

/// Indexes place-tagged nodes and ways into a [`PlaceStore`].
pub struct PlaceIndexer<'a, D: MapDataset> {
    dataset: &'a D,
    store: &'a PlaceStore,
    estimator: PlaceSizeEstimator,
}

impl<'a, D: MapDataset> PlaceIndexer<'a, D> {
    pub fn new(dataset: &'a D, store: &'a PlaceStore, estimator: PlaceSizeEstimator) -> Self {
        Self {
            dataset,
            store,
            estimator,
        }
    }

    /// Index one center-node place into the given table.
    pub fn index_node(
        &self,
        node: &MapNode,
        category: PlaceCategory,
    ) -> Result<IndexOutcome, PlaceError> {
        match self.prepare_node(node, category) {
            Prepared::Row(category, row) => {
                self.store.upsert(category, &row)?;
                Ok(IndexOutcome::Indexed)
            }
            Prepared::Skipped(outcome) => Ok(outcome),
        }
    }

    /// Index one polygon place into the given table.
    pub fn index_way(
        &self,
        way: &MapWay,
        category: PlaceCategory,
    ) -> Result<IndexOutcome, PlaceError> {
        match self.prepare_way(way, category) {
            Prepared::Row(category, row) => {
                self.store.upsert(category, &row)?;
                Ok(IndexOutcome::Indexed)
            }
            Prepared::Skipped(outcome) => Ok(outcome),
        }
    }

    /// Index every place-tagged entity in the dataset. Way regions are
    /// computed in parallel; writes go to the store sequentially.
    pub fn index_dataset(&self) -> Result<IndexStats, PlaceError>
    where
        D: Sync,
    {
        let mut stats = IndexStats::default();

        for node in self.dataset.nodes_with_tag("place", None) {
            match category_for(&node.tags) {
                Some(category) => stats.record(self.index_node(node, category)?),
                None => stats.record(IndexOutcome::SkippedExcluded),
            }
        }

        let place_ways = self.dataset.ways_with_tag("place", None);
        let prepared: Vec<Prepared> = place_ways
            .par_iter()
            .map(|way| match category_for(&way.tags) {
                Some(category) => self.prepare_way(way, category),
                None => Prepared::Skipped(IndexOutcome::SkippedExcluded),
            })
            .collect();

        for item in prepared {
            match item {
                Prepared::Row(category, row) => {
                    self.store.upsert(category, &row)?;
                    stats.record(IndexOutcome::Indexed);
                }
                Prepared::Skipped(outcome) => stats.record(outcome),
            }
        }

        Ok(stats)
    }

    fn prepare_node(&self, node: &MapNode, category: PlaceCategory) -> Prepared {
        let Some(name) = node.tags.name() else {
            if node.tags.place().is_some() {
                warn!(node = node.id, "place-tagged node has no name, not indexing");
            }
            return Prepared::Skipped(IndexOutcome::SkippedUnnamed);
        };

        let half_size = self.estimator.estimate_half_size(node.tags.place());
        let region = PlaceRegion::from_node(node, half_size, name.to_string());
        Prepared::Row(
            category,
            IndexedPlace::from_region(node.id, RegionKind::Centernode, &region),
        )
    }

    fn prepare_way(&self, way: &MapWay, category: PlaceCategory) -> Prepared {
        let Some(name) = way.tags.name() else {
            if way.tags.place().is_some() {
                warn!(way = way.id, "place-tagged way has no name, not indexing");
            }
            return Prepared::Skipped(IndexOutcome::SkippedUnnamed);
        };

        match PlaceRegion::from_way(self.dataset, way, name.to_string()) {
            Ok(region) => Prepared::Row(
                category,
                IndexedPlace::from_region(way.id, RegionKind::Polygon, &region),
            ),
            Err(e) => {
                debug!(way = way.id, error = %e, "skipping place way");
                Prepared::Skipped(IndexOutcome::SkippedGeometry)
            }
        }
    }
}
