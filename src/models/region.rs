//! Bounding regions for administrative places.
//!
//! A region is an axis-aligned lat/lon box. For places indexed from a
//! polygon way it is the bounding box of the way's geometry; for places
//! known only as a center node it is a heuristically-sized square around
//! the point. Either way it only has to be good enough for overlap
//! pre-filtering and containment checks, not cartography.

use geo::{BoundingRect, Coord, LineString};
use serde::{Deserialize, Serialize};

use crate::dataset::{EntityKind, MapDataset, MapNode, MapWay};
use crate::error::PlaceError;
use crate::models::GeoPoint;

/// Minimum number of resolvable nodes before a way can approximate an area.
/// One or two points cannot usefully bound a polygon.
const MIN_WAY_NODES: usize = 3;

/// How an indexed region was derived. Persisted as the row's idType code.
///
/// Deliberately distinct from [`EntityKind`]: these codes number *region
/// sources*, not live dataset entity types, and the two enumerations must
/// never be compared directly. Conversion to an entity kind is an explicit
/// match in [`RegionKind::entity_kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum RegionKind {
    /// Derived from a way's polygon geometry.
    Polygon,
    /// Synthesized around a tagged center node.
    Centernode,
}

impl RegionKind {
    pub fn code(self) -> u8 {
        match self {
            RegionKind::Polygon => 0,
            RegionKind::Centernode => 1,
        }
    }

    /// The live dataset entity type this region resolves back to.
    pub fn entity_kind(self) -> EntityKind {
        match self {
            RegionKind::Polygon => EntityKind::Way,
            RegionKind::Centernode => EntityKind::Node,
        }
    }
}

impl From<RegionKind> for u8 {
    fn from(kind: RegionKind) -> u8 {
        kind.code()
    }
}

impl TryFrom<u8> for RegionKind {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(RegionKind::Polygon),
            1 => Ok(RegionKind::Centernode),
            other => Err(format!("unknown region kind code {other}")),
        }
    }
}

/// Axis-aligned bounding box in latitude/longitude degrees.
///
/// Degenerate zero-area boxes are valid (a single-point estimate) and
/// still support containment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl GeoBounds {
    /// A degenerate box covering a single point.
    pub fn from_point(lat: f64, lon: f64) -> Self {
        Self {
            min_lat: lat,
            min_lon: lon,
            max_lat: lat,
            max_lon: lon,
        }
    }

    /// A square of the given half-size around a center point.
    pub fn around(center: GeoPoint, half_size: f64) -> Self {
        Self {
            min_lat: center.lat - half_size,
            min_lon: center.lon - half_size,
            max_lat: center.lat + half_size,
            max_lon: center.lon + half_size,
        }
    }

    /// Expand to include the point.
    pub fn add_point(&mut self, lat: f64, lon: f64) {
        self.min_lat = self.min_lat.min(lat);
        self.min_lon = self.min_lon.min(lon);
        self.max_lat = self.max_lat.max(lat);
        self.max_lon = self.max_lon.max(lon);
    }

    /// Inclusive containment test on both axes.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }

    pub fn intersects(&self, other: &GeoBounds) -> bool {
        self.min_lat <= other.max_lat
            && self.max_lat >= other.min_lat
            && self.min_lon <= other.max_lon
            && self.max_lon >= other.min_lon
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint {
            lat: (self.min_lat + self.max_lat) / 2.0,
            lon: (self.min_lon + self.max_lon) / 2.0,
        }
    }

    /// The scalar extent used for index range queries: the larger of the
    /// two axis spans.
    pub fn size(&self) -> f64 {
        (self.max_lat - self.min_lat).max(self.max_lon - self.min_lon)
    }

    /// A copy grown by `margin` degrees on every side.
    pub fn expanded(&self, margin: f64) -> GeoBounds {
        GeoBounds {
            min_lat: self.min_lat - margin,
            min_lon: self.min_lon - margin,
            max_lat: self.max_lat + margin,
            max_lon: self.max_lon + margin,
        }
    }

    pub fn corners(&self) -> [GeoPoint; 4] {
        [
            GeoPoint {
                lat: self.min_lat,
                lon: self.min_lon,
            },
            GeoPoint {
                lat: self.min_lat,
                lon: self.max_lon,
            },
            GeoPoint {
                lat: self.max_lat,
                lon: self.min_lon,
            },
            GeoPoint {
                lat: self.max_lat,
                lon: self.max_lon,
            },
        ]
    }
}

/// A named bounding region for an administrative place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceRegion {
    pub name: String,
    pub bounds: GeoBounds,
}

impl PlaceRegion {
    pub fn new(name: String, bounds: GeoBounds) -> Self {
        Self { name, bounds }
    }

    /// Bounding box of a way's resolvable geometry.
    ///
    /// Fails with [`PlaceError::GeometryUnavailable`] when fewer than three
    /// of the way's nodes resolve in the dataset.
    pub fn from_way<D: MapDataset>(
        dataset: &D,
        way: &MapWay,
        name: String,
    ) -> Result<Self, PlaceError> {
        let coords: Vec<Coord<f64>> = way
            .nodes
            .iter()
            .filter_map(|id| dataset.node(*id))
            .map(|n| Coord { x: n.lon, y: n.lat })
            .collect();

        if coords.len() < MIN_WAY_NODES {
            return Err(PlaceError::GeometryUnavailable {
                kind: EntityKind::Way,
                id: way.id,
            });
        }

        let rect = LineString::new(coords)
            .bounding_rect()
            .ok_or(PlaceError::GeometryUnavailable {
                kind: EntityKind::Way,
                id: way.id,
            })?;

        Ok(Self {
            name,
            bounds: GeoBounds {
                min_lat: rect.min().y,
                min_lon: rect.min().x,
                max_lat: rect.max().y,
                max_lon: rect.max().x,
            },
        })
    }

    /// Square region of the estimated half-size around a center node.
    pub fn from_node(node: &MapNode, half_size: f64, name: String) -> Self {
        Self {
            name,
            bounds: GeoBounds::around(
                GeoPoint {
                    lat: node.lat,
                    lon: node.lon,
                },
                half_size,
            ),
        }
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        self.bounds.contains(lat, lon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{MemoryDataset, Tags};

    fn node(id: i64, lat: f64, lon: f64) -> MapNode {
        MapNode {
            id,
            lat,
            lon,
            tags: Tags::new(),
        }
    }

    #[test]
    fn test_bounds_contain_own_center() {
        let cases = [
            (0.0, 0.0, 1.0, 1.0),
            (-10.5, 3.0, -2.0, 7.25),
            (5.0, 5.0, 5.0, 5.0), // degenerate
        ];
        for (min_lat, min_lon, max_lat, max_lon) in cases {
            let b = GeoBounds {
                min_lat,
                min_lon,
                max_lat,
                max_lon,
            };
            let c = b.center();
            assert!(b.contains(c.lat, c.lon), "{b:?} does not contain {c:?}");
        }
    }

    #[test]
    fn test_add_point_expands() {
        let mut b = GeoBounds::from_point(1.0, 1.0);
        b.add_point(-1.0, 2.0);
        assert!(b.contains(0.0, 1.5));
        assert!(!b.contains(0.0, 2.5));
        assert_eq!(b.size(), 2.0);
    }

    #[test]
    fn test_from_way_needs_three_nodes() {
        let mut dataset = MemoryDataset::new();
        dataset.insert_node(node(1, 0.0, 0.0));
        dataset.insert_node(node(2, 1.0, 1.0));

        let way = MapWay {
            id: 10,
            nodes: vec![1, 2, 99], // 99 unresolvable
            tags: Tags::new(),
        };

        let err = PlaceRegion::from_way(&dataset, &way, "x".into()).unwrap_err();
        assert!(matches!(
            err,
            PlaceError::GeometryUnavailable {
                kind: EntityKind::Way,
                id: 10
            }
        ));
    }

    #[test]
    fn test_from_way_bounding_box() {
        let mut dataset = MemoryDataset::new();
        dataset.insert_node(node(1, 0.0, 0.0));
        dataset.insert_node(node(2, 2.0, 1.0));
        dataset.insert_node(node(3, 1.0, 3.0));

        let way = MapWay {
            id: 10,
            nodes: vec![1, 2, 3],
            tags: Tags::new(),
        };

        let region = PlaceRegion::from_way(&dataset, &way, "tri".into()).unwrap();
        assert_eq!(region.bounds.min_lat, 0.0);
        assert_eq!(region.bounds.max_lat, 2.0);
        assert_eq!(region.bounds.max_lon, 3.0);
        assert!(region.contains(1.0, 1.0));
    }

    #[test]
    fn test_region_kind_codes() {
        assert_eq!(RegionKind::Polygon.code(), 0);
        assert_eq!(RegionKind::Centernode.code(), 1);
        assert_eq!(RegionKind::try_from(1u8).unwrap(), RegionKind::Centernode);
        assert!(RegionKind::try_from(7u8).is_err());
    }
}
