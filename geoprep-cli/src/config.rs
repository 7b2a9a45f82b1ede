use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use geoprep::collect::geojson_source::GeoJsonReader;
use geoprep::collect::global_variables::{
    get_output_path, DEFAULT_CENTER_LAT, DEFAULT_CENTER_LON, STREET_MARGIN, WGS84_EPSG,
};
use geoprep::collect::overpass::OverpassData;
use geoprep::geo_core::{BoundingBox, CoordinateTransform, FrameScale, ReferenceFrame, Wgs84};
use geoprep::geometric::anchor::{derive_reference_frame, AnchorCenter};
use geoprep::geometric::building::BuildingOptions;
use geoprep::geometric::feature::SourceFeature;
use geoprep::geometric::region::{BoundingRegion, FilterMode};

/// Origin and scale of the local frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    pub center_latitude: f64,
    pub center_longitude: f64,
    pub scale: FrameScale,
}

impl Default for FrameConfig {
    fn default() -> Self {
        FrameConfig {
            center_latitude: DEFAULT_CENTER_LAT,
            center_longitude: DEFAULT_CENTER_LON,
            scale: FrameScale::default(),
        }
    }
}

/// Centre the frame on a named feature instead of fixed coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorConfig {
    pub name: String,
    /// Overpass JSON or GeoJSON holding the anchor feature
    pub source: PathBuf,
    #[serde(default)]
    pub center: AnchorCenter,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionConfig {
    pub min_x: f64,
    pub max_x: f64,
    pub min_z: f64,
    pub max_z: f64,
}

/// Everything a pass needs besides its input file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub frame: FrameConfig,
    pub anchor: Option<AnchorConfig>,
    /// Geographic pre-filter for the building pass
    pub bbox: Option<BoundingBox>,
    /// Local region for the street and land use passes
    pub region: Option<RegionConfig>,
    pub filter_mode: FilterMode,
    /// EPSG code of the input coordinates; WGS84 when unset
    pub source_epsg: Option<i32>,
    pub buildings: BuildingOptions,
    pub street_margin: f64,
    pub output_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            frame: FrameConfig::default(),
            anchor: None,
            bbox: None,
            region: None,
            filter_mode: FilterMode::ClipToRegion,
            source_epsg: None,
            buildings: BuildingOptions::default(),
            street_margin: STREET_MARGIN,
            output_dir: get_output_path(),
        }
    }
}

impl PipelineConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("Invalid config {}", path.display()))
    }

    /// The frame of this run: anchored when an anchor is configured, fixed otherwise
    pub fn reference_frame(&self) -> Result<ReferenceFrame> {
        match &self.anchor {
            Some(anchor) => {
                let format = InputFormat::detect(&anchor.source);
                let sources = read_sources(&anchor.source, format, None)?;
                let transform = self.transform()?;
                derive_reference_frame(
                    &anchor.name,
                    &sources,
                    transform.as_ref(),
                    self.frame.scale,
                    anchor.center,
                )
                .with_context(|| format!("Cannot derive frame from {}", anchor.source.display()))
            }
            None => ReferenceFrame::with_scale(
                self.frame.center_latitude,
                self.frame.center_longitude,
                self.frame.scale,
            )
            .context("Invalid frame configuration"),
        }
    }

    pub fn region(&self) -> Result<Option<BoundingRegion>> {
        self.region
            .map(|r| BoundingRegion::new(r.min_x, r.max_x, r.min_z, r.max_z))
            .transpose()
            .context("Invalid region configuration")
    }

    pub fn transform(&self) -> Result<Box<dyn CoordinateTransform>> {
        match self.source_epsg {
            None => Ok(Box::new(Wgs84)),
            Some(epsg) if epsg == WGS84_EPSG => Ok(Box::new(Wgs84)),
            #[cfg(feature = "proj")]
            Some(epsg) => {
                let reprojector = geoprep::geo_core::Reprojector::to_wgs84(epsg)
                    .with_context(|| format!("Cannot reproject from EPSG:{}", epsg))?;
                Ok(Box::new(reprojector))
            }
            #[cfg(not(feature = "proj"))]
            Some(epsg) => anyhow::bail!("EPSG:{} input needs the `proj` feature", epsg),
        }
    }

    pub fn output_file(&self, name: &str) -> PathBuf {
        self.output_dir.join(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum InputFormat {
    Overpass,
    Geojson,
}

impl InputFormat {
    /// `.geojson` is GeoJSON, any other extension is taken as an Overpass response
    pub fn detect(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("geojson") => InputFormat::Geojson,
            _ => InputFormat::Overpass,
        }
    }
}

/// Which records of an Overpass response a pass wants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Buildings,
    Streets,
    LandUse,
}

pub fn read_sources(
    path: &Path,
    format: InputFormat,
    selection: Option<Selection>,
) -> Result<Vec<SourceFeature>> {
    read_sources_with(path, format, selection, None)
}

pub fn read_sources_with(
    path: &Path,
    format: InputFormat,
    selection: Option<Selection>,
    source_type: Option<&str>,
) -> Result<Vec<SourceFeature>> {
    match format {
        InputFormat::Geojson => {
            let mut reader = GeoJsonReader::new();
            if let Some(t) = source_type {
                reader = reader.source_type(t);
            }
            reader.read(path)
        }
        InputFormat::Overpass => {
            let data = OverpassData::read(path)?;
            Ok(match selection {
                Some(Selection::Buildings) => data.buildings(),
                Some(Selection::Streets) => data.streets(),
                Some(Selection::LandUse) | None => data.tagged_ways(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: PipelineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.street_margin, 30.0);
        assert_eq!(config.buildings.target_vertex_count, 20);

        let frame = config.reference_frame().unwrap();
        assert_eq!(frame, ReferenceFrame::belleville());
        assert!(config.region().unwrap().is_none());
    }

    #[test]
    fn test_partial_config() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{
                "frame": {"center_latitude": 38.5, "scale": {"mode": "cosine"}},
                "region": {"min_x": -200, "max_x": 200, "min_z": -150, "max_z": 150},
                "filter_mode": "keep-if-any-point-in-region",
                "buildings": {"storey_height": 3.0}
            }"#,
        )
        .unwrap();
        assert_eq!(config.frame.center_longitude, DEFAULT_CENTER_LON);
        assert_eq!(config.filter_mode, FilterMode::KeepIfAnyPointInRegion);
        assert_eq!(config.buildings.storey_height, 3.0);
        assert_eq!(config.buildings.min_footprint_size, 3.0);

        let frame = config.reference_frame().unwrap();
        assert_eq!(frame.lat_to_meters(), 111_320.0);
        assert_eq!(config.region().unwrap().unwrap().max_z(), 150.0);
    }

    #[test]
    fn test_invalid_frame_and_region_are_fatal() {
        let mut config = PipelineConfig::default();
        config.frame.center_latitude = 120.0;
        assert!(config.reference_frame().is_err());

        let mut config = PipelineConfig::default();
        config.region = Some(RegionConfig {
            min_x: 10.0,
            max_x: -10.0,
            min_z: 0.0,
            max_z: 1.0,
        });
        assert!(config.region().is_err());
    }

    #[test]
    fn test_anchor_frame_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("streets.json");
        std::fs::write(
            &source,
            r#"{"elements": [
                {"type": "node", "id": 1, "lat": 38.52, "lon": -89.984},
                {"type": "node", "id": 2, "lat": 38.53, "lon": -89.984},
                {"type": "way", "id": 5, "nodes": [1, 2], "tags": {"highway": "primary", "name": "North Illinois Street"}}
            ]}"#,
        )
        .unwrap();

        let mut config = PipelineConfig::default();
        config.anchor = Some(AnchorConfig {
            name: "illinois".to_string(),
            source: source.clone(),
            center: AnchorCenter::Centroid,
        });
        let frame = config.reference_frame().unwrap();
        assert!((frame.center_latitude() - 38.525).abs() < 1e-9);

        config.anchor.as_mut().unwrap().name = "Broadway".to_string();
        assert!(config.reference_frame().is_err());
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(InputFormat::detect(Path::new("buildings.geojson")), InputFormat::Geojson);
        assert_eq!(InputFormat::detect(Path::new("overpass.json")), InputFormat::Overpass);
    }
}
