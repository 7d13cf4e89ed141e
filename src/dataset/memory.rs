//! In-memory map dataset backed by hash maps and R-trees.

use hashbrown::HashMap;
use rstar::{RTree, RTreeObject, AABB};
use tracing::{debug, warn};

use super::{MapDataset, MapNode, MapRelation, MapWay};
use crate::models::GeoBounds;
use crate::normalize::{like_to_regex, normalize};

/// R-tree entry for a node position.
struct NodeEntry {
    id: i64,
    pos: [f64; 2], // lon, lat
}

impl RTreeObject for NodeEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.pos)
    }
}

/// R-tree entry for a way envelope.
struct WayEntry {
    id: i64,
    env: AABB<[f64; 2]>,
}

impl RTreeObject for WayEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.env
    }
}

fn to_aabb(bounds: &GeoBounds) -> AABB<[f64; 2]> {
    AABB::from_corners(
        [bounds.min_lon, bounds.min_lat],
        [bounds.max_lon, bounds.max_lat],
    )
}

/// In-process dataset. Insert nodes before the ways that reference them;
/// a way whose nodes are all unknown at insert time is kept for id lookup
/// but not spatially indexed.
#[derive(Default)]
pub struct MemoryDataset {
    nodes: HashMap<i64, MapNode>,
    ways: HashMap<i64, MapWay>,
    relations: HashMap<i64, MapRelation>,
    node_tree: RTree<NodeEntry>,
    way_tree: RTree<WayEntry>,
    ways_by_node: HashMap<i64, Vec<i64>>,
}

impl MemoryDataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_node(&mut self, node: MapNode) {
        self.node_tree.insert(NodeEntry {
            id: node.id,
            pos: [node.lon, node.lat],
        });
        self.nodes.insert(node.id, node);
    }

    pub fn insert_way(&mut self, way: MapWay) {
        for node_id in &way.nodes {
            self.ways_by_node.entry(*node_id).or_default().push(way.id);
        }

        let mut coords = way
            .nodes
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .map(|n| [n.lon, n.lat]);
        match coords.next() {
            Some(first) => {
                let mut min = first;
                let mut max = first;
                for c in coords {
                    min = [min[0].min(c[0]), min[1].min(c[1])];
                    max = [max[0].max(c[0]), max[1].max(c[1])];
                }
                self.way_tree.insert(WayEntry {
                    id: way.id,
                    env: AABB::from_corners(min, max),
                });
            }
            None => debug!(way = way.id, "no resolvable nodes, way not spatially indexed"),
        }

        self.ways.insert(way.id, way);
    }

    pub fn insert_relation(&mut self, relation: MapRelation) {
        self.relations.insert(relation.id, relation);
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn way_count(&self) -> usize {
        self.ways.len()
    }

    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    fn sorted<'a, T, F: Fn(&T) -> i64>(mut items: Vec<&'a T>, id: F) -> Vec<&'a T> {
        items.sort_by_key(|item| id(item));
        items
    }
}

impl MapDataset for MemoryDataset {
    fn node(&self, id: i64) -> Option<&MapNode> {
        self.nodes.get(&id)
    }

    fn way(&self, id: i64) -> Option<&MapWay> {
        self.ways.get(&id)
    }

    fn relation(&self, id: i64) -> Option<&MapRelation> {
        self.relations.get(&id)
    }

    fn nodes_with_tag(&self, key: &str, value: Option<&str>) -> Vec<&MapNode> {
        let matched = self
            .nodes
            .values()
            .filter(|n| match (n.tags.get(key), value) {
                (Some(have), Some(want)) => have == want,
                (Some(_), None) => true,
                (None, _) => false,
            })
            .collect();
        Self::sorted(matched, |n| n.id)
    }

    fn ways_with_tag(&self, key: &str, value: Option<&str>) -> Vec<&MapWay> {
        let matched = self
            .ways
            .values()
            .filter(|w| match (w.tags.get(key), value) {
                (Some(have), Some(want)) => have == want,
                (Some(_), None) => true,
                (None, _) => false,
            })
            .collect();
        Self::sorted(matched, |w| w.id)
    }

    fn relations_with_tag(&self, key: &str, value: Option<&str>) -> Vec<&MapRelation> {
        let matched = self
            .relations
            .values()
            .filter(|r| match (r.tags.get(key), value) {
                (Some(have), Some(want)) => have == want,
                (Some(_), None) => true,
                (None, _) => false,
            })
            .collect();
        Self::sorted(matched, |r| r.id)
    }

    fn nodes_in(&self, bounds: &GeoBounds) -> Vec<&MapNode> {
        let matched = self
            .node_tree
            .locate_in_envelope_intersecting(&to_aabb(bounds))
            .filter_map(|entry| self.nodes.get(&entry.id))
            .collect();
        Self::sorted(matched, |n| n.id)
    }

    fn ways_in(&self, bounds: &GeoBounds) -> Vec<&MapWay> {
        let matched = self
            .way_tree
            .locate_in_envelope_intersecting(&to_aabb(bounds))
            .filter_map(|entry| self.ways.get(&entry.id))
            .collect();
        Self::sorted(matched, |w| w.id)
    }

    fn ways_containing_node(&self, node_id: i64) -> Vec<&MapWay> {
        let matched = self
            .ways_by_node
            .get(&node_id)
            .map(|ids| ids.iter().filter_map(|id| self.ways.get(id)).collect())
            .unwrap_or_default();
        Self::sorted(matched, |w| w.id)
    }

    fn ways_matching_name(&self, pattern: &str, bounds: Option<&GeoBounds>) -> Vec<&MapWay> {
        let re = match like_to_regex(pattern) {
            Ok(re) => re,
            Err(e) => {
                warn!(pattern, error = %e, "unusable name pattern");
                return Vec::new();
            }
        };

        let candidates = match bounds {
            Some(b) => self.ways_in(b),
            None => Self::sorted(self.ways.values().collect(), |w| w.id),
        };

        candidates
            .into_iter()
            .filter(|w| w.tags.name().is_some_and(|n| re.is_match(&normalize(n))))
            .collect()
    }

    fn nodes_matching_name(&self, pattern: &str) -> Vec<&MapNode> {
        let re = match like_to_regex(pattern) {
            Ok(re) => re,
            Err(e) => {
                warn!(pattern, error = %e, "unusable name pattern");
                return Vec::new();
            }
        };

        let matched = self
            .nodes
            .values()
            .filter(|n| n.tags.name().is_some_and(|name| re.is_match(&normalize(name))))
            .collect();
        Self::sorted(matched, |n| n.id)
    }
}
