use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{Context, Result};
use geo::Point;
use serde::Deserialize;

use crate::geometric::feature::{GeometryKind, SourceFeature};

/// One element of an Overpass API `out body` response
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OverpassElement {
    Node {
        id: i64,
        lat: f64,
        lon: f64,
        #[serde(default)]
        tags: BTreeMap<String, String>,
    },
    Way {
        id: i64,
        #[serde(default)]
        nodes: Vec<i64>,
        #[serde(default)]
        tags: BTreeMap<String, String>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Clone)]
pub struct OverpassWay {
    pub id: i64,
    pub nodes: Vec<i64>,
    pub tags: BTreeMap<String, String>,
}

/// Node lookup plus the ways of an Overpass response
#[derive(Debug, Default)]
pub struct OverpassData {
    nodes: HashMap<i64, Point<f64>>,
    ways: Vec<OverpassWay>,
}

impl OverpassData {
    pub fn parse(text: &str) -> Result<Self> {
        let response: OverpassResponse =
            serde_json::from_str(text).context("Failed to parse Overpass JSON response")?;

        let mut data = OverpassData::default();
        for element in response.elements {
            match element {
                OverpassElement::Node { id, lat, lon, .. } => {
                    data.nodes.insert(id, Point::new(lon, lat));
                }
                OverpassElement::Way { id, nodes, tags } => {
                    data.ways.push(OverpassWay { id, nodes, tags })
                }
                OverpassElement::Other => {}
            }
        }

        log::info!("Overpass: {} nodes, {} ways", data.nodes.len(), data.ways.len());
        Ok(data)
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read Overpass file {}", path.display()))?;
        Self::parse(&text)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn ways(&self) -> &[OverpassWay] {
        &self.ways
    }

    /// Resolve a way into a source record. Node references missing from the
    /// response are skipped; a way with none resolved has empty coordinates.
    pub fn way_to_source(&self, way: &OverpassWay, kind: GeometryKind) -> SourceFeature {
        let coords: Vec<Point<f64>> =
            way.nodes.iter().filter_map(|n| self.nodes.get(n).copied()).collect();
        if coords.len() < way.nodes.len() {
            log::debug!(
                "way {}: {} of {} nodes missing",
                way.id,
                way.nodes.len() - coords.len(),
                way.nodes.len()
            );
        }

        let mut source = SourceFeature::new(way.id.to_string(), kind, coords)
            .with_name(way.tags.get("name").cloned().unwrap_or_default());
        source.tags = way.tags.clone();
        source.height = way.tags.get("height").and_then(|h| parse_metres(h));
        source.floors = way.tags.get("building:levels").and_then(|l| l.trim().parse().ok());
        source
    }

    /// Every way carrying `key`, as records of the given kind
    pub fn ways_with_tag(&self, key: &str, kind: GeometryKind) -> Vec<SourceFeature> {
        self.ways
            .iter()
            .filter(|w| w.tags.contains_key(key))
            .map(|w| self.way_to_source(w, kind))
            .collect()
    }

    /// `highway=*` ways as polylines
    pub fn streets(&self) -> Vec<SourceFeature> {
        self.ways_with_tag("highway", GeometryKind::Polyline)
    }

    /// `building=*` ways as footprints
    pub fn buildings(&self) -> Vec<SourceFeature> {
        self.ways_with_tag("building", GeometryKind::Polygon)
    }

    /// Every tagged way; the land use pass decides what to keep
    pub fn tagged_ways(&self) -> Vec<SourceFeature> {
        self.ways
            .iter()
            .filter(|w| !w.tags.is_empty())
            .map(|w| self.way_to_source(w, GeometryKind::Polygon))
            .collect()
    }
}

/// "12", "12.5", "12 m"
fn parse_metres(value: &str) -> Option<f64> {
    value.trim().trim_end_matches('m').trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &str = r#"{
        "version": 0.6,
        "elements": [
            {"type": "node", "id": 1, "lat": 38.52, "lon": -89.9839},
            {"type": "node", "id": 2, "lat": 38.52, "lon": -89.9829},
            {"type": "node", "id": 3, "lat": 38.521, "lon": -89.9829},
            {"type": "way", "id": 10, "nodes": [1, 2, 99], "tags": {"highway": "primary", "name": "Main Street"}},
            {"type": "way", "id": 11, "nodes": [1, 2, 3, 1], "tags": {"building": "yes", "height": "12 m", "building:levels": "3"}},
            {"type": "way", "id": 12, "nodes": [98, 99], "tags": {"highway": "service"}},
            {"type": "relation", "id": 20, "members": []}
        ]
    }"#;

    #[test]
    fn test_parse_and_resolve() {
        let data = OverpassData::parse(RESPONSE).unwrap();
        assert_eq!(data.node_count(), 3);
        assert_eq!(data.ways().len(), 3);

        let streets = data.streets();
        assert_eq!(streets.len(), 2);
        assert_eq!(streets[0].id, "10");
        assert_eq!(streets[0].name.as_deref(), Some("Main Street"));
        // node 99 is not in the response
        assert_eq!(streets[0].coords.len(), 2);
        assert!(streets[1].coords.is_empty());
        assert!(streets[1].name.is_none());

        let buildings = data.buildings();
        assert_eq!(buildings.len(), 1);
        assert_eq!(buildings[0].kind, GeometryKind::Polygon);
        assert_eq!(buildings[0].height, Some(12.0));
        assert_eq!(buildings[0].floors, Some(3.0));
    }

    #[test]
    fn test_invalid_json() {
        assert!(OverpassData::parse("{\"elements\": [").is_err());
    }

    #[test]
    fn test_parse_metres() {
        assert_eq!(parse_metres("7.5"), Some(7.5));
        assert_eq!(parse_metres("10m"), Some(10.0));
        assert_eq!(parse_metres("tall"), None);
    }
}
