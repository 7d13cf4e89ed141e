//! Structured address search.
//!
//! Combines the persistent place index (city/suburb regions) with live
//! dataset queries (street geometry, house numbers). Per-candidate
//! failures are logged and skipped; the overall call only fails on an
//! unusable query.

use tracing::{debug, warn};

use crate::dataset::{way_centroid, MapDataset, MapWay};
use crate::error::PlaceError;
use crate::index::store::{IndexedPlace, PlaceCategory, PlaceStore};
use crate::models::{
    AddressPlace, CityPlace, GeoPoint, NodePlace, Place, PlaceRegion, WayPlace, WayReferencePlace,
};
use crate::normalize::fuzzy_pattern;
use crate::search::interpolate::{parse_house_number, HouseNumberInterpolator};

/// Cap on result-set size; bounds worst-case latency on broad queries.
pub const DEFAULT_MAX_RESULTS: usize = 20;

/// A structured address query. Empty and whitespace-only fields are
/// treated as absent.
#[derive(Debug, Clone, Default)]
pub struct AddressQuery {
    pub house_number: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub zip: Option<String>,
    /// Accepted for interface completeness; the index carries no country
    /// axis, so it does not narrow results.
    pub country: Option<String>,
}

fn cleaned(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl AddressQuery {
    fn is_empty(&self) -> bool {
        cleaned(&self.house_number).is_none()
            && cleaned(&self.street).is_none()
            && cleaned(&self.city).is_none()
            && cleaned(&self.zip).is_none()
    }
}

/// Resolves structured address queries against an index and a live
/// dataset.
pub struct AddressResolver<'a, D: MapDataset> {
    dataset: &'a D,
    store: &'a PlaceStore,
    max_results: usize,
}

impl<'a, D: MapDataset> AddressResolver<'a, D> {
    pub fn new(dataset: &'a D, store: &'a PlaceStore) -> Self {
        Self {
            dataset,
            store,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Find places matching a structured address. Result order follows
    /// the index scan and dataset iteration order: deterministic for a
    /// fixed index state, but no particular sort key; callers wanting a
    /// stable presentation order sort client-side.
    pub fn find_address(&self, query: &AddressQuery) -> Result<Vec<Place>, PlaceError> {
        if query.is_empty() {
            return Err(PlaceError::InvalidArgument("address query has no usable field"));
        }

        let city = cleaned(&query.city);
        let street = cleaned(&query.street);
        let zip = cleaned(&query.zip);
        let house_number = cleaned(&query.house_number);

        let mut results = Vec::new();

        if let Some(city) = city {
            let candidates = self
                .store
                .find_by_name_like(&fuzzy_pattern(city), PlaceCategory::City)?;
            for candidate in candidates {
                if results.len() >= self.max_results {
                    break;
                }
                if let Err(e) =
                    self.resolve_city_candidate(&candidate, street, zip, house_number, &mut results)
                {
                    warn!(city = %candidate.name, error = %e, "skipping city candidate");
                }
            }
        } else if let Some(street) = street {
            // no city anchor: name search over the whole dataset
            let ways = self.dataset.ways_matching_name(&fuzzy_pattern(street), None);
            for way in ways {
                if results.len() >= self.max_results {
                    break;
                }
                if let Some(place) = self.address_for_way(way, None, &[], zip, house_number) {
                    results.push(place);
                }
            }
        } else {
            debug!("query has neither city nor street, nothing to anchor on");
        }

        results.truncate(self.max_results);
        Ok(results)
    }

    /// Free-text search over named entities in the live dataset.
    pub fn find_named(&self, name: &str) -> Result<Vec<Place>, PlaceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PlaceError::InvalidArgument("name is empty"));
        }
        let pattern = fuzzy_pattern(name);

        let mut results = Vec::new();
        for way in self.dataset.ways_matching_name(&pattern, None) {
            if results.len() >= self.max_results {
                break;
            }
            let Some(way_name) = way.tags.name() else {
                continue;
            };
            let Some(position) = way_centroid(self.dataset, way) else {
                continue;
            };
            results.push(Place::Way(WayPlace {
                name: way_name.to_string(),
                way_id: way.id,
                position,
            }));
        }
        for node in self.dataset.nodes_matching_name(&pattern) {
            if results.len() >= self.max_results {
                break;
            }
            let Some(node_name) = node.tags.name() else {
                continue;
            };
            let position = GeoPoint {
                lat: node.lat,
                lon: node.lon,
            };
            let referencing = self.dataset.ways_containing_node(node.id);
            results.push(match referencing.first() {
                Some(way) => Place::WayReference(WayReferencePlace {
                    name: node_name.to_string(),
                    way_id: way.id,
                    node_id: node.id,
                    position,
                }),
                None => Place::Node(NodePlace {
                    name: node_name.to_string(),
                    node_id: node.id,
                    position,
                }),
            });
        }

        Ok(results)
    }

    fn resolve_city_candidate(
        &self,
        candidate: &IndexedPlace,
        street: Option<&str>,
        zip: Option<&str>,
        house_number: Option<&str>,
        results: &mut Vec<Place>,
    ) -> Result<(), PlaceError> {
        let region = candidate.region();
        let suburbs = self.suburbs_within(&region)?;

        match street {
            Some(street) => {
                let ways = self
                    .dataset
                    .ways_matching_name(&fuzzy_pattern(street), Some(&region.bounds));
                for way in ways {
                    if results.len() >= self.max_results {
                        break;
                    }
                    if let Some(place) =
                        self.address_for_way(way, Some(&candidate.name), &suburbs, zip, house_number)
                    {
                        results.push(place);
                    }
                }
            }
            None => {
                // the user just wants the city: one result per suburb, or
                // a single city-level result when there are none
                if suburbs.is_empty() {
                    results.push(Place::City(CityPlace {
                        name: candidate.name.clone(),
                        parent_city: None,
                        region,
                        source_id: candidate.id,
                        kind: candidate.kind,
                    }));
                } else {
                    for suburb in suburbs {
                        if results.len() >= self.max_results {
                            break;
                        }
                        results.push(Place::City(CityPlace {
                            name: suburb.name.clone(),
                            parent_city: Some(candidate.name.clone()),
                            region: suburb.region(),
                            source_id: suburb.id,
                            kind: suburb.kind,
                        }));
                    }
                }
            }
        }
        Ok(())
    }

    /// Suburbs overlapping the city box, confirmed by at least one corner
    /// truly inside the city region. The overlap query alone is a coarse
    /// pre-filter and admits false positives.
    fn suburbs_within(&self, city: &PlaceRegion) -> Result<Vec<IndexedPlace>, PlaceError> {
        let overlapping = self
            .store
            .find_overlapping(&city.bounds, PlaceCategory::Suburb)?;
        Ok(overlapping
            .into_iter()
            .filter(|row| {
                row.region()
                    .bounds
                    .corners()
                    .iter()
                    .any(|corner| city.contains(corner.lat, corner.lon))
            })
            .collect())
    }

    /// Assemble an address result for a matched street way, decorated
    /// with suburb and zip metadata. Returns `None` when the way is
    /// unusable (no name, no resolvable geometry, zip mismatch).
    fn address_for_way(
        &self,
        way: &MapWay,
        city: Option<&str>,
        suburbs: &[IndexedPlace],
        zip: Option<&str>,
        house_number: Option<&str>,
    ) -> Option<Place> {
        let street_name = way.tags.name()?.to_string();

        let way_zip = way.tags.postcode();
        if let (Some(want), Some(have)) = (zip, way_zip) {
            if want != have {
                return None;
            }
        }

        let suburb = suburbs
            .iter()
            .find(|row| {
                let region = row.region();
                way.nodes
                    .iter()
                    .filter_map(|id| self.dataset.node(*id))
                    .any(|n| region.contains(n.lat, n.lon))
            })
            .map(|row| row.name.clone());

        let mut position = way_centroid(self.dataset, way)?;
        let mut matched_number = None;
        if let Some(raw) = house_number {
            match parse_house_number(raw) {
                Ok(target) => {
                    let interpolator = HouseNumberInterpolator::new(self.dataset);
                    if let Some(hit) = interpolator.locate_on_way(way, &street_name, target) {
                        position = hit.position;
                        matched_number = Some(raw.to_string());
                    }
                }
                Err(e) => debug!(error = %e, "unusable house number in query"),
            }
        }

        Some(Place::Address(AddressPlace {
            street: street_name,
            city: city.map(str::to_string),
            suburb,
            zip: way_zip.map(str::to_string),
            house_number: matched_number,
            way_id: way.id,
            position,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{MapNode, MapWay, MemoryDataset, Tags};
    use crate::index::store::StoreOptions;
    use crate::index::{PlaceIndexer, PlaceSizeEstimator};

    fn place_node(id: i64, lat: f64, lon: f64, place: &str, name: &str) -> MapNode {
        let mut tags = Tags::new();
        tags.insert("place", place);
        tags.insert("name", name);
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

    fn street(id: i64, nodes: Vec<i64>, name: &str) -> MapWay {
        let mut tags = Tags::new();
        tags.insert("name", name);
        tags.insert("highway", "residential");
        MapWay { id, nodes, tags }
    }

    fn open_temp() -> PlaceStore {
        PlaceStore::open_temp(StoreOptions::default()).unwrap()
    }

    fn index_all(dataset: &MemoryDataset, store: &PlaceStore) {
        PlaceIndexer::new(dataset, store, PlaceSizeEstimator::default())
            .index_dataset()
            .unwrap();
    }

    #[test]
    fn test_city_only_query_returns_city_place() {
        let mut dataset = MemoryDataset::new();
        dataset.insert_node(place_node(1, 10.0, 10.0, "city", "Springfield"));
        let store = open_temp();
        index_all(&dataset, &store);

        let resolver = AddressResolver::new(&dataset, &store);
        let results = resolver
            .find_address(&AddressQuery {
                city: Some("Springfield".into()),
                ..AddressQuery::default()
            })
            .unwrap();

        assert_eq!(results.len(), 1);
        match &results[0] {
            Place::City(city) => {
                assert!(city.name.contains("Springfield"));
                assert!(city.parent_city.is_none());
                let center = city.region.bounds.center();
                assert!((center.lat - 10.0).abs() < 1e-6);
                assert!((center.lon - 10.0).abs() < 1e-6);
            }
            other => panic!("expected CityPlace, got {other:?}"),
        }
    }

    #[test]
    fn test_city_query_lists_suburbs() {
        let mut dataset = MemoryDataset::new();
        dataset.insert_node(place_node(1, 10.0, 10.0, "city", "Springfield"));
        dataset.insert_node(place_node(2, 10.1, 10.1, "suburb", "Docks"));
        dataset.insert_node(place_node(3, 30.0, 30.0, "suburb", "Elsewhere"));
        let store = open_temp();
        index_all(&dataset, &store);

        let resolver = AddressResolver::new(&dataset, &store);
        let results = resolver
            .find_address(&AddressQuery {
                city: Some("Springfield".into()),
                ..AddressQuery::default()
            })
            .unwrap();

        assert_eq!(results.len(), 1);
        match &results[0] {
            Place::City(city) => {
                assert_eq!(city.name, "Docks");
                assert_eq!(city.parent_city.as_deref(), Some("Springfield"));
            }
            other => panic!("expected suburb CityPlace, got {other:?}"),
        }
    }

    #[test]
    fn test_street_in_city_becomes_address() {
        let mut dataset = MemoryDataset::new();
        dataset.insert_node(place_node(1, 10.0, 10.0, "city", "Springfield"));
        dataset.insert_node(plain_node(100, 10.01, 10.0));
        dataset.insert_node(plain_node(101, 10.01, 10.02));
        let mut way = street(500, vec![100, 101], "Evergreen Terrace");
        way.tags.insert("addr:postcode", "49007");
        dataset.insert_way(way);
        let store = open_temp();
        index_all(&dataset, &store);

        let resolver = AddressResolver::new(&dataset, &store);
        let results = resolver
            .find_address(&AddressQuery {
                city: Some("Springfield".into()),
                street: Some("Evergreen Terrace".into()),
                ..AddressQuery::default()
            })
            .unwrap();

        assert_eq!(results.len(), 1);
        match &results[0] {
            Place::Address(addr) => {
                assert_eq!(addr.street, "Evergreen Terrace");
                assert_eq!(addr.city.as_deref(), Some("Springfield"));
                assert_eq!(addr.zip.as_deref(), Some("49007"));
                assert_eq!(addr.way_id, 500);
                assert!(addr.house_number.is_none());
            }
            other => panic!("expected AddressPlace, got {other:?}"),
        }
    }

    #[test]
    fn test_street_decorated_with_suburb() {
        let mut dataset = MemoryDataset::new();
        dataset.insert_node(place_node(1, 10.0, 10.0, "city", "Springfield"));
        dataset.insert_node(place_node(2, 10.01, 10.01, "suburb", "Docks"));
        dataset.insert_node(plain_node(100, 10.01, 10.0));
        dataset.insert_node(plain_node(101, 10.01, 10.02));
        dataset.insert_way(street(500, vec![100, 101], "Evergreen Terrace"));
        let store = open_temp();
        index_all(&dataset, &store);

        let resolver = AddressResolver::new(&dataset, &store);
        let results = resolver
            .find_address(&AddressQuery {
                city: Some("Springfield".into()),
                street: Some("Evergreen Terrace".into()),
                ..AddressQuery::default()
            })
            .unwrap();

        match &results[0] {
            Place::Address(addr) => assert_eq!(addr.suburb.as_deref(), Some("Docks")),
            other => panic!("expected AddressPlace, got {other:?}"),
        }
    }

    #[test]
    fn test_street_without_city_falls_back_to_dataset_search() {
        let mut dataset = MemoryDataset::new();
        dataset.insert_node(plain_node(100, 0.0, 0.0));
        dataset.insert_node(plain_node(101, 0.0, 0.01));
        dataset.insert_way(street(500, vec![100, 101], "Lonely Lane"));
        let store = open_temp();

        let resolver = AddressResolver::new(&dataset, &store);
        let results = resolver
            .find_address(&AddressQuery {
                street: Some("Lonely Lane".into()),
                ..AddressQuery::default()
            })
            .unwrap();

        assert_eq!(results.len(), 1);
        match &results[0] {
            Place::Address(addr) => {
                assert_eq!(addr.street, "Lonely Lane");
                assert!(addr.city.is_none());
            }
            other => panic!("expected AddressPlace, got {other:?}"),
        }
    }

    #[test]
    fn test_zip_filter() {
        let mut dataset = MemoryDataset::new();
        dataset.insert_node(plain_node(100, 0.0, 0.0));
        dataset.insert_node(plain_node(101, 0.0, 0.01));
        let mut way = street(500, vec![100, 101], "Lonely Lane");
        way.tags.insert("addr:postcode", "11111");
        dataset.insert_way(way);
        let store = open_temp();

        let resolver = AddressResolver::new(&dataset, &store);
        let hit = resolver
            .find_address(&AddressQuery {
                street: Some("Lonely Lane".into()),
                zip: Some("11111".into()),
                ..AddressQuery::default()
            })
            .unwrap();
        assert_eq!(hit.len(), 1);

        let miss = resolver
            .find_address(&AddressQuery {
                street: Some("Lonely Lane".into()),
                zip: Some("99999".into()),
                ..AddressQuery::default()
            })
            .unwrap();
        assert!(miss.is_empty());
    }

    #[test]
    fn test_house_number_sets_position() {
        let mut dataset = MemoryDataset::new();
        dataset.insert_node(place_node(1, 0.0, 0.0, "city", "Springfield"));
        dataset.insert_node(plain_node(100, 0.0, 0.0));
        dataset.insert_node(plain_node(101, 0.01, 0.01));
        dataset.insert_way(street(500, vec![100, 101], "Elm Street"));
        let mut house = plain_node(200, 0.005, 0.005);
        house.tags.insert("addr:housenumber", "15");
        house.tags.insert("addr:street", "Elm Street");
        dataset.insert_node(house);
        let store = open_temp();
        index_all(&dataset, &store);

        let resolver = AddressResolver::new(&dataset, &store);
        let results = resolver
            .find_address(&AddressQuery {
                city: Some("Springfield".into()),
                street: Some("Elm Street".into()),
                house_number: Some("15".into()),
                ..AddressQuery::default()
            })
            .unwrap();

        match &results[0] {
            Place::Address(addr) => {
                assert_eq!(addr.house_number.as_deref(), Some("15"));
                assert!((addr.position.lat - 0.005).abs() < 1e-9);
            }
            other => panic!("expected AddressPlace, got {other:?}"),
        }
    }

    #[test]
    fn test_result_cap() {
        let mut dataset = MemoryDataset::new();
        let mut node_id = 1000;
        for i in 0..25 {
            dataset.insert_node(plain_node(node_id, 0.0, i as f64 * 0.01));
            dataset.insert_node(plain_node(node_id + 1, 0.001, i as f64 * 0.01));
            dataset.insert_way(street(
                2000 + i,
                vec![node_id, node_id + 1],
                &format!("Cap Road {i}"),
            ));
            node_id += 2;
        }
        let store = open_temp();

        let resolver = AddressResolver::new(&dataset, &store);
        let results = resolver
            .find_address(&AddressQuery {
                street: Some("Cap Road".into()),
                ..AddressQuery::default()
            })
            .unwrap();

        assert_eq!(results.len(), DEFAULT_MAX_RESULTS);
    }

    #[test]
    fn test_empty_query_is_invalid() {
        let dataset = MemoryDataset::new();
        let store = open_temp();
        let resolver = AddressResolver::new(&dataset, &store);

        let err = resolver.find_address(&AddressQuery::default()).unwrap_err();
        assert!(matches!(err, PlaceError::InvalidArgument(_)));

        // whitespace-only fields are just as empty
        let err = resolver
            .find_address(&AddressQuery {
                city: Some("   ".into()),
                ..AddressQuery::default()
            })
            .unwrap_err();
        assert!(matches!(err, PlaceError::InvalidArgument(_)));
    }

    #[test]
    fn test_find_named_variants() {
        let mut dataset = MemoryDataset::new();
        let mut lone = plain_node(1, 5.0, 5.0);
        lone.tags.insert("name", "Lone Fountain");
        dataset.insert_node(lone);

        dataset.insert_node(plain_node(10, 0.0, 0.0));
        dataset.insert_node(plain_node(11, 0.0, 0.01));
        let mut gate = plain_node(12, 0.0, 0.0);
        gate.tags.insert("name", "Lone Gate");
        dataset.insert_node(gate);
        dataset.insert_way(street(100, vec![10, 11, 12], "Lone Alley"));
        let store = open_temp();

        let resolver = AddressResolver::new(&dataset, &store);
        let results = resolver.find_named("Lone").unwrap();

        assert!(results
            .iter()
            .any(|p| matches!(p, Place::Way(w) if w.name == "Lone Alley")));
        assert!(results
            .iter()
            .any(|p| matches!(p, Place::Node(n) if n.name == "Lone Fountain")));
        assert!(results
            .iter()
            .any(|p| matches!(p, Place::WayReference(r) if r.name == "Lone Gate" && r.way_id == 100)));
    }
}
