//! Load an `.osm.pbf` file into a [`MemoryDataset`].

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use osmpbfreader::{OsmId, OsmObj, OsmPbfReader};
use tracing::info;

use super::{EntityKind, MapNode, MapRelation, MapWay, MemoryDataset, RelationMember, Tags};

/// Read every node, way and relation from a PBF file. PBF block order
/// (nodes, then ways, then relations) means way envelopes can be computed
/// on insert.
pub fn load_pbf<P: AsRef<Path>>(path: P) -> Result<MemoryDataset> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut reader = OsmPbfReader::new(BufReader::new(file));

    let mut dataset = MemoryDataset::new();

    for obj in reader.iter() {
        let obj = obj?;
        match obj {
            OsmObj::Node(node) => dataset.insert_node(MapNode {
                id: node.id.0,
                lat: node.lat(),
                lon: node.lon(),
                tags: convert_tags(&node.tags),
            }),
            OsmObj::Way(way) => dataset.insert_way(MapWay {
                id: way.id.0,
                nodes: way.nodes.iter().map(|n| n.0).collect(),
                tags: convert_tags(&way.tags),
            }),
            OsmObj::Relation(rel) => dataset.insert_relation(MapRelation {
                id: rel.id.0,
                members: rel.refs.iter().map(convert_member).collect(),
                tags: convert_tags(&rel.tags),
            }),
        }
    }

    info!(
        nodes = dataset.node_count(),
        ways = dataset.way_count(),
        relations = dataset.relation_count(),
        "loaded OSM data from {}",
        path.display()
    );

    Ok(dataset)
}

pub(crate) fn convert_tags(tags: &osmpbfreader::Tags) -> Tags {
    tags.iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub(crate) fn convert_member(member: &osmpbfreader::Ref) -> RelationMember {
    let (kind, id) = match member.member {
        OsmId::Node(node_id) => (EntityKind::Node, node_id.0),
        OsmId::Way(way_id) => (EntityKind::Way, way_id.0),
        OsmId::Relation(rel_id) => (EntityKind::Relation, rel_id.0),
    };
    RelationMember {
        kind,
        id,
        role: member.role.to_string(),
    }
}
