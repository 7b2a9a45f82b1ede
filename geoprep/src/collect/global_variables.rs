use std::path::PathBuf;

/// Where the 3D scene loads its data from
pub const OUTPUT_PATH: &str = "src/data";

/// Public Square fountain, downtown Belleville
pub const DEFAULT_CENTER_LAT: f64 = 38.5200;
pub const DEFAULT_CENTER_LON: f64 = -89.9839;

/// Downtown Belleville extent (WGS84)
pub const DEFAULT_MIN_LAT: f64 = 38.516;
pub const DEFAULT_MAX_LAT: f64 = 38.526;
pub const DEFAULT_MIN_LON: f64 = -89.993;
pub const DEFAULT_MAX_LON: f64 = -89.975;

/// At 38.5N: 1 degree lat ~ 111,000 m, 1 degree lon ~ 87,000 m
pub const LAT_TO_METERS: f64 = 111_000.0;
pub const LON_TO_METERS: f64 = 87_000.0;

/// Metres per degree of latitude used by the cosine scale
pub const METERS_PER_DEGREE: f64 = 111_320.0;

pub const WGS84_EPSG: i32 = 4326;

pub const DEFAULT_STOREY_HEIGHT: f64 = 3.5;
pub const DEFAULT_TARGET_VERTEX_COUNT: usize = 20;
/// Footprints narrower or shallower than this are dropped
pub const MIN_FOOTPRINT_SIZE: f64 = 3.0;
/// Margin around the building extent when trimming streets
pub const STREET_MARGIN: f64 = 30.0;

pub fn get_output_path() -> PathBuf {
    PathBuf::from(OUTPUT_PATH)
}
