//! House-number lookup and interpolation along connector ways.
//!
//! Given a street and a target number, candidates are gathered from an
//! expanded box around the street's geometry and filtered by which street
//! they actually front. An exactly tagged number wins outright; otherwise
//! the scan walks a connector way (a way tagged with an interpolation
//! strategy that links addressed nodes without itself being a street) and
//! linearly blends a position between the two bounding addressed nodes.

use tracing::debug;

use crate::dataset::{way_bounds, way_centroid, EntityKind, EntityRef, MapDataset, MapWay};
use crate::error::PlaceError;
use crate::models::{GeoBounds, GeoPoint};
use crate::normalize::{fuzzy_pattern, normalize};

/// Bounding-box expansion for node candidates, in degrees.
const NODE_MARGIN: f64 = 0.002;
/// Bounding-box expansion for area (way) candidates, in degrees.
const AREA_MARGIN: f64 = 0.004;
/// Search radius around a candidate when hunting the nearest named highway.
const HIGHWAY_MARGIN: f64 = 0.002;

/// Numbering scheme of a connector way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberingStrategy {
    All,
    Even,
    Odd,
}

impl NumberingStrategy {
    pub fn from_tag(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Some(NumberingStrategy::All),
            "even" => Some(NumberingStrategy::Even),
            "odd" => Some(NumberingStrategy::Odd),
            _ => None,
        }
    }

    /// Whether a number can exist under this scheme.
    pub fn admits(self, number: i64) -> bool {
        match self {
            NumberingStrategy::All => true,
            NumberingStrategy::Even => number % 2 == 0,
            NumberingStrategy::Odd => number % 2 != 0,
        }
    }

    /// Round a start anchor up to the scheme's parity.
    fn align_start(self, number: i64) -> i64 {
        if self.admits(number) {
            number
        } else {
            number + 1
        }
    }

    /// Round an end anchor down to the scheme's parity.
    fn align_end(self, number: i64) -> i64 {
        if self.admits(number) {
            number
        } else {
            number - 1
        }
    }
}

/// A located house number.
#[derive(Debug, Clone, PartialEq)]
pub struct HouseMatch {
    pub position: GeoPoint,
    /// True when the number was directly tagged rather than interpolated.
    pub exact: bool,
    pub node_id: Option<i64>,
    /// The street way the match belongs to.
    pub way_id: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ScanOutcome {
    Interpolated(GeoPoint),
    Exhausted,
}

#[derive(Clone, Copy)]
enum ScanState {
    Searching,
    Found { start: i64, at: GeoPoint },
}

/// Walk a connector way's nodes: find the start anchor by id, then the
/// first successor whose (parity-adjusted) number reaches the target, and
/// blend a position between the two. A successor below the target means
/// the target lies before the scanned segment; the scan stops there.
pub(crate) fn scan_connector<D: MapDataset>(
    dataset: &D,
    connector: &MapWay,
    anchor_id: i64,
    anchor_number: i64,
    target: i64,
    strategy: NumberingStrategy,
) -> ScanOutcome {
    if !strategy.admits(target) {
        return ScanOutcome::Exhausted;
    }

    let mut state = ScanState::Searching;
    for node_id in &connector.nodes {
        let Some(node) = dataset.node(*node_id) else {
            continue;
        };
        match state {
            ScanState::Searching => {
                if node.id == anchor_id {
                    state = ScanState::Found {
                        start: strategy.align_start(anchor_number),
                        at: GeoPoint {
                            lat: node.lat,
                            lon: node.lon,
                        },
                    };
                }
            }
            ScanState::Found { start, at } => {
                let Some(raw) = node.tags.house_number() else {
                    continue;
                };
                let parsed = match parse_house_number(raw) {
                    Ok(parsed) => parsed,
                    Err(e) => {
                        debug!(node = node.id, error = %e, "skipping connector node");
                        continue;
                    }
                };
                let end = strategy.align_end(parsed);
                if end == start {
                    // zero-length range, nothing to blend
                    return ScanOutcome::Exhausted;
                }
                if end >= target {
                    let fraction = (target - start) as f64 / (end - start) as f64;
                    return ScanOutcome::Interpolated(GeoPoint {
                        lat: at.lat + fraction * (node.lat - at.lat),
                        lon: at.lon + fraction * (node.lon - at.lon),
                    });
                }
                return ScanOutcome::Exhausted;
            }
        }
    }
    ScanOutcome::Exhausted
}

/// Leading-digits parse of a house-number tag ("12", "12a" -> 12).
pub(crate) fn parse_house_number(value: &str) -> Result<i64, PlaceError> {
    let digits: String = value
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits
        .parse()
        .map_err(|_| PlaceError::MalformedTagValue {
            key: "addr:housenumber",
            value: value.to_string(),
        })
}

struct Candidate {
    number: i64,
    position: GeoPoint,
    node_id: Option<i64>,
}

/// Locates house numbers along a street.
pub struct HouseNumberInterpolator<'a, D: MapDataset> {
    dataset: &'a D,
}

impl<'a, D: MapDataset> HouseNumberInterpolator<'a, D> {
    pub fn new(dataset: &'a D) -> Self {
        Self { dataset }
    }

    /// Locate a house number on any way matching the street name.
    pub fn locate(&self, street: &str, number: i64) -> Result<Option<HouseMatch>, PlaceError> {
        let street = street.trim();
        if street.is_empty() {
            return Err(PlaceError::InvalidArgument("street name is empty"));
        }
        for way in self.dataset.ways_matching_name(&fuzzy_pattern(street), None) {
            if let Some(hit) = self.locate_on_way(way, street, number) {
                return Ok(Some(hit));
            }
        }
        Ok(None)
    }

    /// Locate a house number near one specific street way.
    pub fn locate_on_way(&self, way: &MapWay, street: &str, number: i64) -> Option<HouseMatch> {
        let bounds = way_bounds(self.dataset, way)?;
        let street_norm = normalize(street);

        let (node_candidates, way_candidates) = self.gather_candidates(way, &bounds, &street_norm);

        // a directly tagged number beats any interpolation
        if let Some(exact) = node_candidates.iter().find(|c| c.number == number) {
            return Some(HouseMatch {
                position: exact.position,
                exact: true,
                node_id: exact.node_id,
                way_id: way.id,
            });
        }
        if let Some(exact) = way_candidates.iter().find(|c| c.number == number) {
            return Some(HouseMatch {
                position: exact.position,
                exact: true,
                node_id: None,
                way_id: way.id,
            });
        }

        // otherwise interpolate from the nearest addressed node below the
        // target along a connector way
        let mut anchors: Vec<(i64, &Candidate)> = node_candidates
            .iter()
            .filter(|c| c.number < number)
            .filter_map(|c| c.node_id.map(|id| (id, c)))
            .collect();
        anchors.sort_by_key(|(id, c)| (number - c.number, *id));

        for (anchor_id, anchor) in anchors {
            for connector in self.dataset.ways_containing_node(anchor_id) {
                let Some(raw) = connector.tags.interpolation() else {
                    continue;
                };
                let Some(strategy) = NumberingStrategy::from_tag(raw) else {
                    debug!(
                        way = connector.id,
                        value = raw,
                        "unknown interpolation strategy"
                    );
                    continue;
                };
                match scan_connector(
                    self.dataset,
                    connector,
                    anchor_id,
                    anchor.number,
                    number,
                    strategy,
                ) {
                    ScanOutcome::Interpolated(position) => {
                        return Some(HouseMatch {
                            position,
                            exact: false,
                            node_id: None,
                            way_id: way.id,
                        });
                    }
                    ScanOutcome::Exhausted => {}
                }
            }
        }
        None
    }

    fn gather_candidates(
        &self,
        street_way: &MapWay,
        bounds: &GeoBounds,
        street_norm: &str,
    ) -> (Vec<Candidate>, Vec<Candidate>) {
        let mut nodes = Vec::new();
        for node in self.dataset.nodes_in(&bounds.expanded(NODE_MARGIN)) {
            let Some(raw) = node.tags.house_number() else {
                continue;
            };
            let number = match parse_house_number(raw) {
                Ok(number) => number,
                Err(e) => {
                    debug!(node = node.id, error = %e, "skipping addressed node");
                    continue;
                }
            };
            if !self.fronts_street(EntityRef::Node(node), street_norm, street_way) {
                continue;
            }
            nodes.push(Candidate {
                number,
                position: GeoPoint {
                    lat: node.lat,
                    lon: node.lon,
                },
                node_id: Some(node.id),
            });
        }

        let mut ways = Vec::new();
        for candidate in self.dataset.ways_in(&bounds.expanded(AREA_MARGIN)) {
            if candidate.id == street_way.id {
                continue;
            }
            let Some(raw) = candidate.tags.house_number() else {
                continue;
            };
            let number = match parse_house_number(raw) {
                Ok(number) => number,
                Err(e) => {
                    debug!(way = candidate.id, error = %e, "skipping addressed way");
                    continue;
                }
            };
            if !self.fronts_street(EntityRef::Way(candidate), street_norm, street_way) {
                continue;
            }
            let Some(position) = way_centroid(self.dataset, candidate) else {
                continue;
            };
            ways.push(Candidate {
                number,
                position,
                node_id: None,
            });
        }

        (nodes, ways)
    }

    /// Whether an addressed entity fronts the target street. Priority:
    /// explicit street tag, then associated-street relation membership,
    /// then the nearest named highway. Entities with no resolvable street
    /// hint are excluded rather than guessed.
    fn fronts_street(&self, entity: EntityRef<'_>, street_norm: &str, street_way: &MapWay) -> bool {
        if let Some(explicit) = entity.tags().street() {
            return normalize(explicit) == street_norm;
        }
        if let Some(matched) = self.associated_street_match(entity, street_norm, street_way) {
            return matched;
        }
        match self.nearest_highway_name(entity) {
            Some(name) => normalize(&name) == street_norm,
            None => false,
        }
    }

    /// `Some(matched)` when the entity belongs to at least one
    /// associated-street relation, `None` when it belongs to none. A
    /// relation matches the street either by listing the street way as a
    /// member or by carrying a matching name.
    fn associated_street_match(
        &self,
        entity: EntityRef<'_>,
        street_norm: &str,
        street_way: &MapWay,
    ) -> Option<bool> {
        let (kind, id) = entity.key();
        let mut member_of_any = false;

        for relation in self
            .dataset
            .relations_with_tag("type", Some("associatedStreet"))
        {
            let is_member = relation
                .members
                .iter()
                .any(|m| m.kind == kind && m.id == id);
            if !is_member {
                continue;
            }
            member_of_any = true;

            let lists_street_way = relation
                .members
                .iter()
                .any(|m| m.kind == EntityKind::Way && m.id == street_way.id);
            let names_street = relation
                .tags
                .name()
                .or_else(|| relation.tags.get("street"))
                .is_some_and(|n| normalize(n) == street_norm);

            if lists_street_way || names_street {
                return Some(true);
            }
        }

        if member_of_any {
            Some(false)
        } else {
            None
        }
    }

    fn nearest_highway_name(&self, entity: EntityRef<'_>) -> Option<String> {
        let position = match entity {
            EntityRef::Node(n) => GeoPoint {
                lat: n.lat,
                lon: n.lon,
            },
            EntityRef::Way(w) => way_centroid(self.dataset, w)?,
        };
        let search = GeoBounds::around(position, HIGHWAY_MARGIN);

        let mut best: Option<(f64, i64, &str)> = None;
        for highway in self.dataset.ways_in(&search) {
            if !highway.tags.contains("highway") {
                continue;
            }
            let Some(name) = highway.tags.name() else {
                continue;
            };
            let distance = highway
                .nodes
                .iter()
                .filter_map(|id| self.dataset.node(*id))
                .map(|n| {
                    let dlat = n.lat - position.lat;
                    let dlon = n.lon - position.lon;
                    dlat * dlat + dlon * dlon
                })
                .fold(f64::INFINITY, f64::min);
            if !distance.is_finite() {
                continue;
            }
            let closer = match best {
                Some((d, id, _)) => distance < d || (distance == d && highway.id < id),
                None => true,
            };
            if closer {
                best = Some((distance, highway.id, name));
            }
        }
        best.map(|(_, _, name)| name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{MapNode, MapRelation, MemoryDataset, RelationMember, Tags};

    fn addressed_node(id: i64, lat: f64, lon: f64, number: &str, street: Option<&str>) -> MapNode {
        let mut tags = Tags::new();
        tags.insert("addr:housenumber", number);
        if let Some(street) = street {
            tags.insert("addr:street", street);
        }
        MapNode { id, lat, lon, tags }
    }

    fn plain_node(id: i64, lat: f64, lon: f64) -> MapNode {
        MapNode {
            id,
            lat,
            lon,
            tags: Tags::new(),
        }
    }

    fn street_way(id: i64, nodes: Vec<i64>, name: &str) -> MapWay {
        let mut tags = Tags::new();
        tags.insert("name", name);
        tags.insert("highway", "residential");
        MapWay { id, nodes, tags }
    }

    fn connector_way(id: i64, nodes: Vec<i64>, strategy: &str) -> MapWay {
        let mut tags = Tags::new();
        tags.insert("addr:interpolation", strategy);
        MapWay { id, nodes, tags }
    }

    /// Street along the diagonal with interpolation anchors 11 and 19.
    fn interpolation_fixture() -> MemoryDataset {
        let mut d = MemoryDataset::new();
        d.insert_node(plain_node(1, 0.0, 0.0));
        d.insert_node(plain_node(2, 1.0, 1.0));
        d.insert_node(addressed_node(10, 0.0, 0.0, "11", Some("Elm Street")));
        d.insert_node(addressed_node(11, 1.0, 1.0, "19", Some("Elm Street")));
        d.insert_way(street_way(100, vec![1, 2], "Elm Street"));
        d.insert_way(connector_way(200, vec![10, 11], "odd"));
        d
    }

    #[test]
    fn test_interpolation_midpoint() {
        let d = interpolation_fixture();
        let interp = HouseNumberInterpolator::new(&d);
        let hit = interp.locate("Elm Street", 15).unwrap().unwrap();

        assert!(!hit.exact);
        assert!((hit.position.lat - 0.5).abs() < 1e-9);
        assert!((hit.position.lon - 0.5).abs() < 1e-9);
        assert_eq!(hit.way_id, 100);
    }

    #[test]
    fn test_even_strategy_rejects_odd_target() {
        let mut d = MemoryDataset::new();
        d.insert_node(plain_node(1, 0.0, 0.0));
        d.insert_node(plain_node(2, 1.0, 1.0));
        d.insert_node(addressed_node(10, 0.0, 0.0, "10", Some("Elm Street")));
        d.insert_node(addressed_node(11, 1.0, 1.0, "20", Some("Elm Street")));
        d.insert_way(street_way(100, vec![1, 2], "Elm Street"));
        d.insert_way(connector_way(200, vec![10, 11], "even"));

        let interp = HouseNumberInterpolator::new(&d);
        assert_eq!(interp.locate("Elm Street", 15).unwrap(), None);
    }

    #[test]
    fn test_exact_tag_short_circuits() {
        let mut d = interpolation_fixture();
        d.insert_node(addressed_node(12, 0.25, 0.75, "15", Some("Elm Street")));

        let interp = HouseNumberInterpolator::new(&d);
        let hit = interp.locate("Elm Street", 15).unwrap().unwrap();
        assert!(hit.exact);
        assert_eq!(hit.node_id, Some(12));
        assert!((hit.position.lat - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_target_before_segment_is_exhausted() {
        let d = interpolation_fixture();
        let interp = HouseNumberInterpolator::new(&d);
        // 5 < both anchors, no anchor below it to start from
        assert_eq!(interp.locate("Elm Street", 5).unwrap(), None);
    }

    #[test]
    fn test_parity_adjustment() {
        // start 10 (even) on an odd connector aligns to 11
        let mut d = MemoryDataset::new();
        d.insert_node(plain_node(1, 0.0, 0.0));
        d.insert_node(plain_node(2, 1.0, 1.0));
        d.insert_node(addressed_node(10, 0.0, 0.0, "10", Some("Oak Road")));
        d.insert_node(addressed_node(11, 1.0, 1.0, "20", Some("Oak Road")));
        d.insert_way(street_way(100, vec![1, 2], "Oak Road"));
        d.insert_way(connector_way(200, vec![10, 11], "odd"));

        let interp = HouseNumberInterpolator::new(&d);
        let hit = interp.locate("Oak Road", 15).unwrap().unwrap();
        // start aligned 10->11, end aligned 20->19: (15-11)/(19-11) = 0.5
        assert!((hit.position.lat - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_zero_length_range_guard() {
        let mut d = MemoryDataset::new();
        d.insert_node(plain_node(1, 0.0, 0.0));
        d.insert_node(plain_node(2, 1.0, 1.0));
        d.insert_node(addressed_node(10, 0.0, 0.0, "11", Some("Elm Street")));
        d.insert_node(addressed_node(11, 1.0, 1.0, "11", Some("Elm Street")));
        d.insert_way(street_way(100, vec![1, 2], "Elm Street"));
        d.insert_way(connector_way(200, vec![10, 11], "odd"));

        let interp = HouseNumberInterpolator::new(&d);
        assert_eq!(interp.locate("Elm Street", 13).unwrap(), None);
    }

    #[test]
    fn test_mismatching_street_tag_excluded() {
        let mut d = interpolation_fixture();
        // tagged for a different street, must not be picked up as exact
        d.insert_node(addressed_node(12, 0.5, 0.5, "15", Some("Oak Road")));

        let interp = HouseNumberInterpolator::new(&d);
        let hit = interp.locate("Elm Street", 15).unwrap().unwrap();
        assert!(!hit.exact, "mismatching street tag must be excluded");
    }

    #[test]
    fn test_associated_street_relation_matches() {
        let mut d = MemoryDataset::new();
        d.insert_node(plain_node(1, 0.0, 0.0));
        d.insert_node(plain_node(2, 1.0, 1.0));
        // no addr:street tag; association comes from the relation
        d.insert_node(addressed_node(10, 0.5, 0.5, "15", None));
        d.insert_way(street_way(100, vec![1, 2], "Elm Street"));
        d.insert_relation(MapRelation {
            id: 300,
            members: vec![
                RelationMember {
                    kind: EntityKind::Way,
                    id: 100,
                    role: "street".into(),
                },
                RelationMember {
                    kind: EntityKind::Node,
                    id: 10,
                    role: "house".into(),
                },
            ],
            tags: {
                let mut tags = Tags::new();
                tags.insert("type", "associatedStreet");
                tags
            },
        });

        let interp = HouseNumberInterpolator::new(&d);
        let hit = interp.locate("Elm Street", 15).unwrap().unwrap();
        assert!(hit.exact);
        assert_eq!(hit.node_id, Some(10));
    }

    #[test]
    fn test_nearest_highway_fallback() {
        let mut d = MemoryDataset::new();
        d.insert_node(plain_node(1, 0.0, 0.0));
        d.insert_node(plain_node(2, 0.0, 1.0));
        // untagged house node right next to the street
        d.insert_node(addressed_node(10, 0.0005, 0.5, "15", None));
        d.insert_way(street_way(100, vec![1, 2], "Elm Street"));

        let interp = HouseNumberInterpolator::new(&d);
        let hit = interp.locate("Elm Street", 15).unwrap().unwrap();
        assert!(hit.exact);
        assert_eq!(hit.node_id, Some(10));
    }

    #[test]
    fn test_no_street_hint_excluded() {
        let mut d = MemoryDataset::new();
        d.insert_node(plain_node(1, 0.0, 0.0));
        d.insert_node(plain_node(2, 0.0, 1.0));
        // house node far from any highway, no tags linking it to a street
        d.insert_node(addressed_node(10, 0.001, 0.5, "15", None));
        let mut way = street_way(100, vec![1, 2], "Elm Street");
        way.tags = {
            let mut tags = Tags::new();
            tags.insert("name", "Elm Street");
            tags // not a highway: no fallback hint available
        };
        d.insert_way(way);

        let interp = HouseNumberInterpolator::new(&d);
        assert_eq!(interp.locate("Elm Street", 15).unwrap(), None);
    }

    #[test]
    fn test_parse_house_number() {
        assert_eq!(parse_house_number("12").unwrap(), 12);
        assert_eq!(parse_house_number(" 12a ").unwrap(), 12);
        assert!(matches!(
            parse_house_number("a12"),
            Err(PlaceError::MalformedTagValue { .. })
        ));
        assert!(parse_house_number("").is_err());
    }

    #[test]
    fn test_strategy_parsing_and_parity() {
        assert_eq!(NumberingStrategy::from_tag("Even"), Some(NumberingStrategy::Even));
        assert_eq!(NumberingStrategy::from_tag("5"), None);
        assert!(NumberingStrategy::Odd.admits(3));
        assert!(!NumberingStrategy::Odd.admits(4));
        assert!(NumberingStrategy::All.admits(4));
        assert_eq!(NumberingStrategy::Even.align_start(11), 12);
        assert_eq!(NumberingStrategy::Even.align_end(11), 10);
    }
}
