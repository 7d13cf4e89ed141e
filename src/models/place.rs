//! Search result types.
//!
//! A `Place` is whatever a search can hand back: a city or suburb region,
//! a resolved street address, or a plain named way/node. Every variant can
//! lazily resolve back to its live dataset entity; resolution returns
//! `None` when the underlying id has disappeared (stale index).

use serde::{Deserialize, Serialize};

use crate::dataset::{EntityRef, MapDataset};
use crate::models::region::{PlaceRegion, RegionKind};

/// Geographic point (lat/lon).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// A search result.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Place {
    City(CityPlace),
    Address(AddressPlace),
    Way(WayPlace),
    Node(NodePlace),
    WayReference(WayReferencePlace),
}

/// A city or suburb region. When representing a suburb, `parent_city`
/// carries the enclosing city's name.
#[derive(Debug, Clone, Serialize)]
pub struct CityPlace {
    pub name: String,
    pub parent_city: Option<String>,
    pub region: PlaceRegion,
    pub source_id: i64,
    pub kind: RegionKind,
}

/// A street-level result decorated with city/suburb/zip metadata.
#[derive(Debug, Clone, Serialize)]
pub struct AddressPlace {
    pub street: String,
    pub city: Option<String>,
    pub suburb: Option<String>,
    pub zip: Option<String>,
    /// Set only when the queried house number was actually located.
    pub house_number: Option<String>,
    pub way_id: i64,
    pub position: GeoPoint,
}

/// A named way matched by free-text search.
#[derive(Debug, Clone, Serialize)]
pub struct WayPlace {
    pub name: String,
    pub way_id: i64,
    pub position: GeoPoint,
}

/// A named free-standing node.
#[derive(Debug, Clone, Serialize)]
pub struct NodePlace {
    pub name: String,
    pub node_id: i64,
    pub position: GeoPoint,
}

/// A named node that is part of a way; resolution prefers the node but
/// falls back to the way when the node has gone stale.
#[derive(Debug, Clone, Serialize)]
pub struct WayReferencePlace {
    pub name: String,
    pub way_id: i64,
    pub node_id: i64,
    pub position: GeoPoint,
}

impl Place {
    pub fn display_name(&self) -> &str {
        match self {
            Place::City(c) => &c.name,
            Place::Address(a) => &a.street,
            Place::Way(w) => &w.name,
            Place::Node(n) => &n.name,
            Place::WayReference(r) => &r.name,
        }
    }

    pub fn position(&self) -> GeoPoint {
        match self {
            Place::City(c) => c.region.bounds.center(),
            Place::Address(a) => a.position,
            Place::Way(w) => w.position,
            Place::Node(n) => n.position,
            Place::WayReference(r) => r.position,
        }
    }

    /// Resolve back to the concrete dataset entity, if it still exists.
    pub fn resolve<'d, D: MapDataset>(&self, dataset: &'d D) -> Option<EntityRef<'d>> {
        match self {
            Place::City(c) => match c.kind {
                RegionKind::Polygon => dataset.way(c.source_id).map(EntityRef::Way),
                RegionKind::Centernode => dataset.node(c.source_id).map(EntityRef::Node),
            },
            Place::Address(a) => dataset.way(a.way_id).map(EntityRef::Way),
            Place::Way(w) => dataset.way(w.way_id).map(EntityRef::Way),
            Place::Node(n) => dataset.node(n.node_id).map(EntityRef::Node),
            Place::WayReference(r) => dataset
                .node(r.node_id)
                .map(EntityRef::Node)
                .or_else(|| dataset.way(r.way_id).map(EntityRef::Way)),
        }
    }
}
