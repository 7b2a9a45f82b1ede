use std::path::Path;

use anyhow::{Context, Result};
use geo::{Geometry, LineString, Point};
use geojson::{feature::Id, GeoJson, JsonObject, JsonValue};

use crate::geometric::feature::{GeometryKind, SourceFeature};

/// Reads GeoJSON feature collections (Overture exports, converted shapefiles)
/// into source records.
///
/// Properties: `id`, `name` (or Overture `names.primary`), `height`,
/// `num_floors`/`floors`; every scalar property is also kept as a tag.
#[derive(Debug, Default, Clone)]
pub struct GeoJsonReader {
    source_type: Option<String>,
}

impl GeoJsonReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag every record with `source_type` (Overture theme: land, water, infrastructure)
    pub fn source_type(mut self, source_type: impl Into<String>) -> Self {
        self.source_type = Some(source_type.into());
        self
    }

    pub fn read<P: AsRef<Path>>(&self, path: P) -> Result<Vec<SourceFeature>> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read GeoJSON file {}", path.display()))?;
        self.parse(&text)
            .with_context(|| format!("Failed to load {}", path.display()))
    }

    pub fn parse(&self, text: &str) -> Result<Vec<SourceFeature>> {
        let geojson: GeoJson = text.parse().context("Failed to parse GeoJSON")?;
        let features = match geojson {
            GeoJson::FeatureCollection(collection) => collection.features,
            GeoJson::Feature(feature) => vec![feature],
            GeoJson::Geometry(_) => {
                anyhow::bail!("Expected a Feature or FeatureCollection, got a bare geometry")
            }
        };

        let mut sources = Vec::with_capacity(features.len());
        for (index, feature) in features.into_iter().enumerate() {
            let properties = feature.properties.unwrap_or_default();
            let id = feature_id(feature.id.as_ref(), &properties, index);
            let geometry = feature
                .geometry
                .map(|g| Geometry::<f64>::try_from(g.value))
                .transpose()
                .unwrap_or_else(|e| {
                    log::debug!("feature {}: {}", id, e);
                    None
                });

            for (suffix, kind, coords) in parts(geometry, &id) {
                let mut source = SourceFeature::new(
                    match suffix {
                        Some(ring) => format!("{}-{}", id, ring),
                        None => id.clone(),
                    },
                    kind,
                    coords,
                );
                self.fill_attributes(&mut source, &properties);
                sources.push(source);
            }
        }

        log::info!("GeoJSON: {} records", sources.len());
        Ok(sources)
    }

    fn fill_attributes(&self, source: &mut SourceFeature, properties: &JsonObject) {
        let name = properties
            .get("name")
            .and_then(JsonValue::as_str)
            .or_else(|| {
                properties
                    .get("names")
                    .and_then(|n| n.get("primary"))
                    .and_then(JsonValue::as_str)
            })
            .unwrap_or_default();
        source.name = if name.is_empty() { None } else { Some(name.to_string()) };

        source.height = properties.get("height").and_then(as_number);
        source.floors = properties
            .get("num_floors")
            .or_else(|| properties.get("floors"))
            .and_then(as_number);

        for (key, value) in properties {
            let tag = match value {
                JsonValue::String(s) => s.clone(),
                JsonValue::Number(n) => n.to_string(),
                JsonValue::Bool(b) => b.to_string(),
                _ => continue,
            };
            source.tags.insert(key.clone(), tag);
        }
        if let Some(source_type) = &self.source_type {
            source.tags.insert("source_type".to_string(), source_type.clone());
        }
    }
}

fn feature_id(id: Option<&Id>, properties: &JsonObject, index: usize) -> String {
    match id {
        Some(Id::String(s)) => s.clone(),
        Some(Id::Number(n)) => n.to_string(),
        None => match properties.get("id") {
            Some(JsonValue::String(s)) => s.clone(),
            Some(JsonValue::Number(n)) => n.to_string(),
            _ => index.to_string(),
        },
    }
}

fn as_number(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn line_points(line: &LineString<f64>) -> Vec<Point<f64>> {
    line.points().collect()
}

/// Outer ring without the repeated closing vertex
fn ring_points(ring: &LineString<f64>) -> Vec<Point<f64>> {
    let mut points = line_points(ring);
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    points
}

type Part = (Option<usize>, GeometryKind, Vec<Point<f64>>);

/// Split a geometry into records. Parts after the first get a ring suffix.
/// Missing or unsupported geometry yields one empty record so the pass can
/// count it as malformed.
fn parts(geometry: Option<Geometry<f64>>, id: &str) -> Vec<Part> {
    let numbered = |i: usize| if i == 0 { None } else { Some(i) };
    match geometry {
        Some(Geometry::LineString(line)) => {
            vec![(None, GeometryKind::Polyline, line_points(&line))]
        }
        Some(Geometry::MultiLineString(lines)) => lines
            .0
            .iter()
            .enumerate()
            .map(|(i, l)| (numbered(i), GeometryKind::Polyline, line_points(l)))
            .collect(),
        Some(Geometry::Polygon(polygon)) => {
            vec![(None, GeometryKind::Polygon, ring_points(polygon.exterior()))]
        }
        Some(Geometry::MultiPolygon(polygons)) => polygons
            .0
            .iter()
            .enumerate()
            .map(|(i, p)| (numbered(i), GeometryKind::Polygon, ring_points(p.exterior())))
            .collect(),
        _ => {
            log::debug!("feature {}: no line or polygon geometry", id);
            vec![(None, GeometryKind::Polygon, Vec::new())]
        }
    }
}
