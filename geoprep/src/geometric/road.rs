use serde::{Deserialize, Serialize};

use crate::error::{ErrorSummary, GeoprepError, Result};
use crate::geo_core::{CoordinateTransform, LocalPoint, ReferenceFrame};
use crate::geometric::building::{footprint_bounds, Building};
use crate::geometric::feature::{Feature, GeometryKind, SourceFeature};
use crate::geometric::region::{filter_features, BoundingRegion, FilterMode};

/// Street classes the scene knows how to draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreetClass {
    Primary,
    Secondary,
    Tertiary,
    Residential,
    Service,
    Footway,
    Path,
}

impl StreetClass {
    /// OSM `highway=*` value. Unknown values fall back to residential.
    pub fn from_highway(value: &str) -> Self {
        match value {
            "primary" => StreetClass::Primary,
            "secondary" => StreetClass::Secondary,
            "tertiary" => StreetClass::Tertiary,
            "residential" => StreetClass::Residential,
            "service" => StreetClass::Service,
            "footway" => StreetClass::Footway,
            "path" => StreetClass::Path,
            _ => StreetClass::Residential,
        }
    }

    /// Overture transportation segment `class`
    pub fn from_overture(class: &str) -> Self {
        match class {
            "motorway" | "trunk" | "primary" => StreetClass::Primary,
            "secondary" => StreetClass::Secondary,
            "tertiary" => StreetClass::Tertiary,
            "service" => StreetClass::Service,
            "footway" => StreetClass::Footway,
            "path" => StreetClass::Path,
            // residential, unclassified, living_street and anything else
            _ => StreetClass::Residential,
        }
    }

    /// Classify from tags: `highway` first, then Overture `class`
    pub fn from_source(source: &SourceFeature) -> Self {
        if let Some(highway) = source.tag("highway") {
            StreetClass::from_highway(highway)
        } else if let Some(class) = source.tag("class") {
            StreetClass::from_overture(class)
        } else {
            StreetClass::Residential
        }
    }

    /// Rendered width in metres
    pub fn width(&self) -> f64 {
        match self {
            StreetClass::Primary => 12.0,
            StreetClass::Secondary => 10.0,
            StreetClass::Tertiary => 8.0,
            StreetClass::Residential => 6.0,
            StreetClass::Service => 4.0,
            StreetClass::Footway | StreetClass::Path => 2.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StreetClass::Primary => "primary",
            StreetClass::Secondary => "secondary",
            StreetClass::Tertiary => "tertiary",
            StreetClass::Residential => "residential",
            StreetClass::Service => "service",
            StreetClass::Footway => "footway",
            StreetClass::Path => "path",
        }
    }
}

/// Street record as consumed by the 3D scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Street {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub street_type: StreetClass,
    pub points: Vec<LocalPoint>,
    pub width: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Street {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        street_type: StreetClass,
        points: Vec<LocalPoint>,
    ) -> Self {
        Street {
            id: id.into(),
            name: name.into(),
            street_type,
            points,
            width: street_type.width(),
            color: None,
        }
    }

    pub fn to_feature(&self) -> Feature {
        let mut feature =
            Feature::polyline(self.id.clone(), self.street_type.as_str(), self.points.clone());
        if !self.name.is_empty() {
            feature.name = Some(self.name.clone());
        }
        feature.style.width = Some(self.width);
        feature.style.color = self.color.clone();
        feature
    }

    /// Inverse of [`Street::to_feature`]; the class comes back from the category
    pub fn from_feature(feature: Feature) -> Self {
        let street_type = StreetClass::from_highway(&feature.category);
        Street {
            width: feature.style.width.unwrap_or_else(|| street_type.width()),
            color: feature.style.color,
            name: feature.name.unwrap_or_default(),
            id: feature.id,
            street_type,
            points: feature.points,
        }
    }
}

/// Street network processed in one frame
pub struct Road {
    pub streets: Vec<Street>,
    frame: ReferenceFrame,
    summary: ErrorSummary,
}

impl Road {
    pub fn new(frame: ReferenceFrame) -> Self {
        Road {
            streets: Vec::new(),
            frame,
            summary: ErrorSummary::new(),
        }
    }

    /// Wrap already projected streets, e.g. read back from a previous pass
    pub fn from_streets(frame: ReferenceFrame, streets: Vec<Street>) -> Self {
        Road {
            streets,
            frame,
            summary: ErrorSummary::new(),
        }
    }

    pub fn frame(&self) -> &ReferenceFrame {
        &self.frame
    }

    /// Classify and project every line record
    pub fn run(
        mut self,
        sources: &[SourceFeature],
        transform: &dyn CoordinateTransform,
    ) -> Result<Self> {
        for source in sources {
            if source.kind != GeometryKind::Polyline {
                log::debug!("skipping non-line record {}", source.id);
                continue;
            }
            if let Err(e) = self.add_source(source, transform) {
                self.summary.record(e)?;
            }
        }

        log::info!("Found {} streets", self.streets.len());
        self.summary.report("streets");
        Ok(self)
    }

    pub fn add_source(
        &mut self,
        source: &SourceFeature,
        transform: &dyn CoordinateTransform,
    ) -> Result<()> {
        let class = StreetClass::from_source(source);
        let feature = source.project(&self.frame, transform, class.as_str())?;
        let name = feature.display_name().to_string();
        let street = Street::new(format!("street-{}", source.id), name, class, feature.points);
        self.streets.push(street);
        Ok(())
    }

    /// Restrict the network to `region`; clipped-away streets are counted as invalid geometry
    pub fn restrict_to(&mut self, region: &BoundingRegion, mode: FilterMode) -> Result<()> {
        let features = self.streets.drain(..).map(|s| s.to_feature()).collect();
        let outcome = filter_features(features, region, mode);

        for e in outcome.rejected {
            self.summary.record(e)?;
        }
        self.streets = outcome.features.into_iter().map(Street::from_feature).collect();

        log::info!(
            "Kept {} streets ({} outside region)",
            self.streets.len(),
            outcome.outside
        );
        Ok(())
    }

    /// Trim the network to the building extent grown by `margin` metres.
    /// Returns the region used so it can be reported.
    pub fn restrict_to_buildings(
        &mut self,
        buildings: &[Building],
        margin: f64,
        mode: FilterMode,
    ) -> Result<BoundingRegion> {
        let bounds = footprint_bounds(buildings).ok_or_else(|| {
            GeoprepError::configuration("buildings", 0, "no footprints to derive a region from")
        })?;
        let region = BoundingRegion::from_bounds(&bounds, margin)?;
        log::info!(
            "Street region: X {:.1} to {:.1}, Z {:.1} to {:.1}",
            region.min_x(),
            region.max_x(),
            region.min_z(),
            region.max_z()
        );
        self.restrict_to(&region, mode)?;
        Ok(region)
    }

    /// Street counts per class, most common first
    pub fn count_by_type(&self) -> Vec<(StreetClass, usize)> {
        let mut counts = std::collections::BTreeMap::new();
        for s in &self.streets {
            *counts.entry(s.street_type).or_insert(0usize) += 1;
        }
        let mut counts: Vec<(StreetClass, usize)> = counts.into_iter().collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts
    }

    pub fn named(&self) -> impl Iterator<Item = &Street> {
        self.streets.iter().filter(|s| !s.name.is_empty())
    }

    pub fn summary(&self) -> ErrorSummary {
        self.summary
    }

    pub fn into_streets(self) -> Vec<Street> {
        self.streets
    }
}
