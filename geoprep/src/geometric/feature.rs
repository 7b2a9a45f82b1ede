use std::collections::BTreeMap;
use std::fmt;

use geo::Point;
use serde::{Deserialize, Serialize};

use crate::error::{GeoprepError, Result};
use crate::geo_core::{CoordinateTransform, LocalPoint, ReferenceFrame};
use crate::geometric::region::{compute_bounds, Bounds};

/// Whether a feature is an open line or an implicitly closed area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryKind {
    /// Street, waterway, railway
    Polyline,
    /// Building footprint, land-use parcel
    Polygon,
}

impl GeometryKind {
    /// Fewest points for the geometry to be usable
    pub fn min_points(&self) -> usize {
        match self {
            GeometryKind::Polyline => 2,
            GeometryKind::Polygon => 3,
        }
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GeometryKind::Polyline => "polyline",
            GeometryKind::Polygon => "polygon",
        })
    }
}

/// Presentational attributes, filled in after the geometry pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub color: Option<String>,
    pub width: Option<f64>,
}

/// A raw record as delivered by a collector: geometry in source coordinates plus tags
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFeature {
    pub id: String,
    pub name: Option<String>,
    pub kind: GeometryKind,
    /// Source coordinates (x = easting/lon, y = northing/lat)
    pub coords: Vec<Point<f64>>,
    pub tags: BTreeMap<String, String>,
    /// Authoritative height in metres
    pub height: Option<f64>,
    pub floors: Option<f64>,
}

impl SourceFeature {
    pub fn new(id: impl Into<String>, kind: GeometryKind, coords: Vec<Point<f64>>) -> Self {
        SourceFeature {
            id: id.into(),
            name: None,
            kind,
            coords,
            tags: BTreeMap::new(),
            height: None,
            floors: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.name = if name.is_empty() { None } else { Some(name) };
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(|s| s.as_str())
    }

    /// Bring every coordinate into WGS84
    pub fn to_geographic(&self, transform: &dyn CoordinateTransform) -> Result<Vec<Point<f64>>> {
        if self.coords.is_empty() {
            return Err(GeoprepError::malformed(&self.id, "record has no coordinates"));
        }
        self.coords
            .iter()
            .map(|c| {
                transform
                    .to_geographic(c.x(), c.y())
                    .map_err(|e| GeoprepError::malformed(&self.id, e.to_string()))
            })
            .collect()
    }

    /// Reproject and project into a local [`Feature`] carrying `category`.
    ///
    /// Fails with `MalformedSource` when coordinates are missing or cannot be
    /// reprojected and with `InvalidGeometry` when too few points remain.
    pub fn project(
        &self,
        frame: &ReferenceFrame,
        transform: &dyn CoordinateTransform,
        category: impl Into<String>,
    ) -> Result<Feature> {
        self.project_as(frame, transform, category, self.kind)
    }

    /// Like [`SourceFeature::project`] but with the geometry kind decided by the caller
    pub fn project_as(
        &self,
        frame: &ReferenceFrame,
        transform: &dyn CoordinateTransform,
        category: impl Into<String>,
        kind: GeometryKind,
    ) -> Result<Feature> {
        let geographic = self.to_geographic(transform)?;
        let points = geographic.into_iter().map(|p| frame.project(p)).collect();

        let feature = Feature {
            id: self.id.clone(),
            name: self.name.clone(),
            category: category.into(),
            kind,
            points,
            height: self.height,
            floors: self.floors,
            style: Style::default(),
        };
        feature.validate()?;
        Ok(feature)
    }
}

/// A named geometric entity in local metres
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: String,
    pub name: Option<String>,
    pub category: String,
    pub kind: GeometryKind,
    pub points: Vec<LocalPoint>,
    pub height: Option<f64>,
    pub floors: Option<f64>,
    #[serde(default)]
    pub style: Style,
}

impl Feature {
    pub fn new(
        id: impl Into<String>,
        category: impl Into<String>,
        kind: GeometryKind,
        points: Vec<LocalPoint>,
    ) -> Self {
        Feature {
            id: id.into(),
            name: None,
            category: category.into(),
            kind,
            points,
            height: None,
            floors: None,
            style: Style::default(),
        }
    }

    pub fn polyline(
        id: impl Into<String>,
        category: impl Into<String>,
        points: Vec<LocalPoint>,
    ) -> Self {
        Self::new(id, category, GeometryKind::Polyline, points)
    }

    pub fn polygon(
        id: impl Into<String>,
        category: impl Into<String>,
        points: Vec<LocalPoint>,
    ) -> Self {
        Self::new(id, category, GeometryKind::Polygon, points)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The display name, empty when unnamed
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    /// Check the point count against the geometry kind
    pub fn validate(&self) -> Result<()> {
        let required = self.kind.min_points();
        if self.points.len() < required {
            return Err(GeoprepError::InvalidGeometry {
                id: self.id.clone(),
                kind: self.kind,
                required,
                actual: self.points.len(),
            });
        }
        Ok(())
    }

    pub fn bounds(&self) -> Option<Bounds> {
        compute_bounds(&self.points)
    }

    /// Smallest distance from any vertex to the frame origin
    pub fn min_distance_to_origin(&self) -> Option<f64> {
        self.points
            .iter()
            .map(|p| p.distance_to_origin())
            .min_by(|a, b| a.total_cmp(b))
    }
}
