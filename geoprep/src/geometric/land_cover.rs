use serde::{Deserialize, Serialize};

use crate::error::{ErrorSummary, Result};
use crate::geo_core::{CoordinateTransform, LocalPoint, ReferenceFrame};
use crate::geometric::feature::{Feature, GeometryKind, SourceFeature};
use crate::geometric::region::{filter_features, BoundingRegion, FilterMode};

/// Land use types drawn under the buildings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandUseType {
    Park,
    Grass,
    Residential,
    Commercial,
    Industrial,
    Parking,
    Water,
    Waterway,
    Railway,
}

impl LandUseType {
    /// OSM tags, first match wins:
    /// leisure=park, landuse=grass|residential|commercial|industrial,
    /// amenity=parking, natural=water, waterway=*, railway=*
    pub fn from_osm_tags(source: &SourceFeature) -> Option<Self> {
        if source.tag("leisure") == Some("park") {
            return Some(LandUseType::Park);
        }
        match source.tag("landuse") {
            Some("grass") => return Some(LandUseType::Grass),
            Some("residential") => return Some(LandUseType::Residential),
            Some("commercial") => return Some(LandUseType::Commercial),
            Some("industrial") => return Some(LandUseType::Industrial),
            _ => {}
        }
        if source.tag("amenity") == Some("parking") {
            return Some(LandUseType::Parking);
        }
        if source.tag("natural") == Some("water") {
            return Some(LandUseType::Water);
        }
        if source.tag("waterway").is_some() {
            return Some(LandUseType::Waterway);
        }
        if source.tag("railway").is_some() {
            return Some(LandUseType::Railway);
        }
        None
    }

    /// Overture base theme: `source_type` is land, water or infrastructure
    pub fn from_overture(source_type: &str, class: Option<&str>) -> Option<Self> {
        match source_type {
            "water" => Some(LandUseType::Water),
            "infrastructure" => match class {
                Some("railway") => Some(LandUseType::Railway),
                _ => Some(LandUseType::Parking),
            },
            _ => match class {
                None | Some("park") | Some("forest") | Some("garden") => Some(LandUseType::Park),
                Some("grass") | Some("meadow") => Some(LandUseType::Grass),
                Some("wetland") => Some(LandUseType::Water),
                Some("residential") => Some(LandUseType::Residential),
                Some("commercial") => Some(LandUseType::Commercial),
                Some("industrial") => Some(LandUseType::Industrial),
                Some(_) => None,
            },
        }
    }

    /// OSM tags first, then Overture `source_type`/`class`
    pub fn from_source(source: &SourceFeature) -> Option<Self> {
        Self::from_osm_tags(source).or_else(|| {
            source
                .tag("source_type")
                .and_then(|t| Self::from_overture(t, source.tag("class")))
        })
    }

    /// Waterways and railways are lines, everything else is an area
    pub fn geometry_kind(&self) -> GeometryKind {
        match self {
            LandUseType::Waterway | LandUseType::Railway => GeometryKind::Polyline,
            _ => GeometryKind::Polygon,
        }
    }

    /// Inverse of [`LandUseType::as_str`]
    pub fn from_name(name: &str) -> Option<Self> {
        [
            LandUseType::Park,
            LandUseType::Grass,
            LandUseType::Residential,
            LandUseType::Commercial,
            LandUseType::Industrial,
            LandUseType::Parking,
            LandUseType::Water,
            LandUseType::Waterway,
            LandUseType::Railway,
        ]
        .into_iter()
        .find(|t| t.as_str() == name)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LandUseType::Park => "park",
            LandUseType::Grass => "grass",
            LandUseType::Residential => "residential",
            LandUseType::Commercial => "commercial",
            LandUseType::Industrial => "industrial",
            LandUseType::Parking => "parking",
            LandUseType::Water => "water",
            LandUseType::Waterway => "waterway",
            LandUseType::Railway => "railway",
        }
    }
}

/// Land use record as consumed by the 3D scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandUseFeature {
    pub id: String,
    #[serde(rename = "type")]
    pub land_use: LandUseType,
    #[serde(default)]
    pub name: String,
    pub points: Vec<LocalPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl LandUseFeature {
    pub fn to_feature(&self) -> Feature {
        let mut feature = Feature::new(
            self.id.clone(),
            self.land_use.as_str(),
            self.land_use.geometry_kind(),
            self.points.clone(),
        );
        if !self.name.is_empty() {
            feature.name = Some(self.name.clone());
        }
        feature.style.color = self.color.clone();
        feature
    }

    /// Inverse of [`LandUseFeature::to_feature`]; `None` for an unknown category
    pub fn from_feature(feature: Feature) -> Option<Self> {
        let land_use = LandUseType::from_name(&feature.category)?;
        Some(LandUseFeature {
            id: feature.id,
            land_use,
            name: feature.name.unwrap_or_default(),
            points: feature.points,
            color: feature.style.color,
        })
    }
}

/// Land use, parks, parking lots, water and rail context processed in one frame
pub struct LandCover {
    pub features: Vec<LandUseFeature>,
    frame: ReferenceFrame,
    summary: ErrorSummary,
    unclassified: usize,
}

impl LandCover {
    pub fn new(frame: ReferenceFrame) -> Self {
        LandCover {
            features: Vec::new(),
            frame,
            summary: ErrorSummary::new(),
            unclassified: 0,
        }
    }

    /// Classify and project every record; records with no land use tag are skipped
    pub fn run(
        mut self,
        sources: &[SourceFeature],
        transform: &dyn CoordinateTransform,
    ) -> Result<Self> {
        for source in sources {
            let Some(land_use) = LandUseType::from_source(source) else {
                self.unclassified += 1;
                continue;
            };
            if let Err(e) = self.add_source(source, land_use, transform) {
                self.summary.record(e)?;
            }
        }

        log::info!(
            "Found {} land use features ({} unclassified records skipped)",
            self.features.len(),
            self.unclassified
        );
        self.summary.report("landuse");
        Ok(self)
    }

    pub fn add_source(
        &mut self,
        source: &SourceFeature,
        land_use: LandUseType,
        transform: &dyn CoordinateTransform,
    ) -> Result<()> {
        let feature =
            source.project_as(&self.frame, transform, land_use.as_str(), land_use.geometry_kind())?;
        self.features.push(LandUseFeature {
            id: format!("{}-{}", land_use.as_str(), source.id),
            land_use,
            name: feature.display_name().to_string(),
            points: feature.points,
            color: None,
        });
        Ok(())
    }

    /// Restrict the features to `region` through [`filter_features`]. Features
    /// clipped below their minimum point count are recorded as invalid geometry.
    pub fn restrict_to(&mut self, region: &BoundingRegion, mode: FilterMode) -> Result<()> {
        let features = self.features.drain(..).map(|f| f.to_feature()).collect();
        let outcome = filter_features(features, region, mode);

        for e in outcome.rejected {
            self.summary.record(e)?;
        }
        self.features = outcome
            .features
            .into_iter()
            .filter_map(LandUseFeature::from_feature)
            .collect();

        log::info!(
            "Kept {} land use features ({} outside region)",
            self.features.len(),
            outcome.outside
        );
        Ok(())
    }

    /// Feature counts per type, alphabetical
    pub fn count_by_type(&self) -> Vec<(LandUseType, usize)> {
        let mut counts = std::collections::BTreeMap::new();
        for f in &self.features {
            *counts.entry(f.land_use).or_insert(0usize) += 1;
        }
        let mut counts: Vec<(LandUseType, usize)> = counts.into_iter().collect();
        counts.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
        counts
    }

    pub fn summary(&self) -> ErrorSummary {
        self.summary
    }

    pub fn into_features(self) -> Vec<LandUseFeature> {
        self.features
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_core::Wgs84;
    use geo::point;

    fn way(id: &str, key: &str, value: &str, n: usize) -> SourceFeature {
        let coords = (0..n)
            .map(|i| point!(x: -89.9839 + i as f64 * 0.0001, y: 38.52 + (i % 2) as f64 * 0.0001))
            .collect();
        SourceFeature::new(id, GeometryKind::Polygon, coords).with_tag(key, value)
    }

    #[test]
    fn test_osm_priority() {
        let both = way("1", "landuse", "grass", 3).with_tag("leisure", "park");
        assert_eq!(LandUseType::from_osm_tags(&both), Some(LandUseType::Park));
        assert_eq!(
            LandUseType::from_osm_tags(&way("2", "waterway", "stream", 2)),
            Some(LandUseType::Waterway)
        );
        assert_eq!(LandUseType::from_osm_tags(&way("3", "landuse", "farmland", 3)), None);
    }

    #[test]
    fn test_overture_classes() {
        assert_eq!(LandUseType::from_overture("land", Some("forest")), Some(LandUseType::Park));
        assert_eq!(LandUseType::from_overture("land", Some("meadow")), Some(LandUseType::Grass));
        assert_eq!(LandUseType::from_overture("land", Some("wetland")), Some(LandUseType::Water));
        assert_eq!(LandUseType::from_overture("water", Some("river")), Some(LandUseType::Water));
        assert_eq!(
            LandUseType::from_overture("infrastructure", Some("bridge")),
            Some(LandUseType::Parking)
        );
        assert_eq!(LandUseType::from_overture("land", Some("sand")), None);
    }

    #[test]
    fn test_restrict_to_region() {
        let mk = |id: &str, land_use: LandUseType, pts: &[(f64, f64)]| LandUseFeature {
            id: id.to_string(),
            land_use,
            name: String::new(),
            points: pts.iter().map(|&(x, z)| LocalPoint::new(x, z)).collect(),
            color: None,
        };
        let features = vec![
            mk(
                "park-1",
                LandUseType::Park,
                &[(-150.0, 0.0), (0.0, 0.0), (10.0, 10.0), (150.0, 0.0)],
            ),
            mk("railway-2", LandUseType::Railway, &[(-150.0, 50.0), (50.0, 50.0), (150.0, 50.0)]),
            mk("water-3", LandUseType::Water, &[(500.0, 500.0), (600.0, 500.0), (600.0, 600.0)]),
        ];

        let region = BoundingRegion::new(-100.0, 100.0, -100.0, 100.0).unwrap();

        let mut kept = LandCover::new(ReferenceFrame::belleville());
        kept.features = features.clone();
        kept.restrict_to(&region, FilterMode::KeepIfAnyPointInRegion).unwrap();
        let ids: Vec<&str> = kept.features.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["park-1", "railway-2"]);
        assert_eq!(kept.features[0].points.len(), 4);
        assert_eq!(kept.features[1].land_use, LandUseType::Railway);

        let mut clipped = LandCover::new(ReferenceFrame::belleville());
        clipped.features = features;
        clipped.restrict_to(&region, FilterMode::ClipToRegion).unwrap();
        // park keeps 2 of its 4 corners, railway keeps 1 point
        assert!(clipped.features.is_empty());
        assert_eq!(clipped.summary().invalid_geometry, 2);
    }

    #[test]
    fn test_from_name_inverts_as_str() {
        assert_eq!(LandUseType::from_name("waterway"), Some(LandUseType::Waterway));
        assert_eq!(LandUseType::from_name("forest"), None);
    }

    #[test]
    fn test_land_cover_run() {
        let frame = ReferenceFrame::belleville();
        let sources = vec![
            way("10", "leisure", "park", 4).with_name("Public Square"),
            // two-node stream is a valid line
            way("11", "waterway", "stream", 2),
            // two-node parking lot is not a valid area
            way("12", "amenity", "parking", 2),
            way("13", "building", "yes", 4),
        ];

        let cover = LandCover::new(frame).run(&sources, &Wgs84).unwrap();
        assert_eq!(cover.features.len(), 2);
        assert_eq!(cover.features[0].id, "park-10");
        assert_eq!(cover.features[0].name, "Public Square");
        assert_eq!(cover.features[1].land_use, LandUseType::Waterway);
        assert_eq!(cover.summary().invalid_geometry, 1);

        let value = serde_json::to_value(&cover.features[0]).unwrap();
        assert_eq!(value["type"], "park");
    }
}
