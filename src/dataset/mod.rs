//! Live map dataset abstraction.
//!
//! Search and indexing never own the map data; they go through the
//! [`MapDataset`] trait for id lookups, tag iteration and spatial queries.
//! [`MemoryDataset`] is the in-process implementation backed by hash maps
//! and R-trees; the `pbf` module fills one from an `.osm.pbf` file.

pub mod memory;
pub mod pbf;

use geo::{Centroid, Coord, LineString};
use serde::{Deserialize, Serialize};

use crate::models::{GeoBounds, GeoPoint};

pub use memory::MemoryDataset;
pub use pbf::load_pbf;

/// Type of a live OSM object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Node,
    Way,
    Relation,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Node => write!(f, "node"),
            EntityKind::Way => write!(f, "way"),
            EntityKind::Relation => write!(f, "relation"),
        }
    }
}

/// Flat tag map with accessors for the keys this crate cares about.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tags(hashbrown::HashMap<String, String>);

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn name(&self) -> Option<&str> {
        self.get("name")
    }

    pub fn place(&self) -> Option<&str> {
        self.get("place")
    }

    pub fn house_number(&self) -> Option<&str> {
        self.get("addr:housenumber")
    }

    pub fn street(&self) -> Option<&str> {
        self.get("addr:street")
    }

    pub fn interpolation(&self) -> Option<&str> {
        self.get("addr:interpolation")
    }

    pub fn postcode(&self) -> Option<&str> {
        self.get("addr:postcode").or_else(|| self.get("postal_code"))
    }
}

impl FromIterator<(String, String)> for Tags {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapNode {
    pub id: i64,
    pub lat: f64,
    pub lon: f64,
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapWay {
    pub id: i64,
    /// Referenced node ids in way order. Not all of them necessarily
    /// resolve in the dataset.
    pub nodes: Vec<i64>,
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelationMember {
    pub kind: EntityKind,
    pub id: i64,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapRelation {
    pub id: i64,
    pub members: Vec<RelationMember>,
    pub tags: Tags,
}

/// Borrowed reference to a concrete dataset entity.
#[derive(Debug, Clone, Copy)]
pub enum EntityRef<'a> {
    Node(&'a MapNode),
    Way(&'a MapWay),
}

impl<'a> EntityRef<'a> {
    pub fn tags(&self) -> &'a Tags {
        match self {
            EntityRef::Node(n) => &n.tags,
            EntityRef::Way(w) => &w.tags,
        }
    }

    pub fn key(&self) -> (EntityKind, i64) {
        match self {
            EntityRef::Node(n) => (EntityKind::Node, n.id),
            EntityRef::Way(w) => (EntityKind::Way, w.id),
        }
    }
}

/// Read access to a live map dataset.
///
/// Spatial queries are envelope pre-filters: `ways_in` returns every way
/// whose bounding envelope intersects the box, and callers re-check true
/// geometry where it matters. All multi-result methods return entities in
/// ascending id order so query results are deterministic for a fixed
/// dataset.
pub trait MapDataset {
    fn node(&self, id: i64) -> Option<&MapNode>;
    fn way(&self, id: i64) -> Option<&MapWay>;
    fn relation(&self, id: i64) -> Option<&MapRelation>;

    /// Nodes carrying `key` (optionally with an exact value).
    fn nodes_with_tag(&self, key: &str, value: Option<&str>) -> Vec<&MapNode>;
    /// Ways carrying `key` (optionally with an exact value).
    fn ways_with_tag(&self, key: &str, value: Option<&str>) -> Vec<&MapWay>;
    /// Relations carrying `key` (optionally with an exact value).
    fn relations_with_tag(&self, key: &str, value: Option<&str>) -> Vec<&MapRelation>;

    /// Nodes inside the box (inclusive).
    fn nodes_in(&self, bounds: &GeoBounds) -> Vec<&MapNode>;
    /// Ways whose envelope intersects the box.
    fn ways_in(&self, bounds: &GeoBounds) -> Vec<&MapWay>;

    /// Ways referencing the given node id.
    fn ways_containing_node(&self, node_id: i64) -> Vec<&MapWay>;

    /// Named ways whose normalized name matches a `%`-wildcard pattern,
    /// optionally restricted to a bounding box.
    fn ways_matching_name(&self, pattern: &str, bounds: Option<&GeoBounds>) -> Vec<&MapWay>;
    /// Named nodes whose normalized name matches a `%`-wildcard pattern.
    fn nodes_matching_name(&self, pattern: &str) -> Vec<&MapNode>;
}

/// Centroid of a way's resolvable geometry, or `None` when nothing
/// resolves.
pub fn way_centroid<D: MapDataset + ?Sized>(dataset: &D, way: &MapWay) -> Option<GeoPoint> {
    let coords: Vec<Coord<f64>> = way
        .nodes
        .iter()
        .filter_map(|id| dataset.node(*id))
        .map(|n| Coord { x: n.lon, y: n.lat })
        .collect();
    if coords.is_empty() {
        return None;
    }
    LineString::new(coords).centroid().map(|p| GeoPoint {
        lat: p.y(),
        lon: p.x(),
    })
}

/// Bounding box of a way's resolvable geometry.
pub fn way_bounds<D: MapDataset + ?Sized>(dataset: &D, way: &MapWay) -> Option<GeoBounds> {
    let mut resolved = way.nodes.iter().filter_map(|id| dataset.node(*id));
    let first = resolved.next()?;
    let mut bounds = GeoBounds::from_point(first.lat, first.lon);
    for node in resolved {
        bounds.add_point(node.lat, node.lon);
    }
    Some(bounds)
}
