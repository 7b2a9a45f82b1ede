use geo::Point;
use serde::{Deserialize, Serialize};

use crate::collect::global_variables::{
    DEFAULT_CENTER_LAT, DEFAULT_CENTER_LON, DEFAULT_MAX_LAT, DEFAULT_MAX_LON, DEFAULT_MIN_LAT,
    DEFAULT_MIN_LON, LAT_TO_METERS, LON_TO_METERS, METERS_PER_DEGREE,
};
use crate::commons::basic_functions::round_tenth;
use crate::error::{GeoprepError, Result};

/// A projected coordinate in metres relative to a [`ReferenceFrame`].
///
/// `x` grows eastward and `z` grows **southward**, matching the renderer's
/// ground plane. Serialized as `[x, z]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct LocalPoint {
    pub x: f64,
    pub z: f64,
}

impl LocalPoint {
    pub fn new(x: f64, z: f64) -> Self {
        LocalPoint { x, z }
    }

    pub fn rounded(self) -> Self {
        LocalPoint::new(round_tenth(self.x), round_tenth(self.z))
    }

    pub fn distance_to_origin(&self) -> f64 {
        self.x.hypot(self.z)
    }
}

impl From<[f64; 2]> for LocalPoint {
    fn from(p: [f64; 2]) -> Self {
        LocalPoint::new(p[0], p[1])
    }
}

impl From<LocalPoint> for [f64; 2] {
    fn from(p: LocalPoint) -> Self {
        [p.x, p.z]
    }
}

/// How the metres-per-degree factors of a frame are obtained
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FrameScale {
    /// Hand-picked constants, valid for a small area around one latitude
    Fixed {
        lat_to_meters: f64,
        lon_to_meters: f64,
    },
    /// 111320 m per degree of latitude, scaled by cos(latitude) for longitude
    Cosine,
}

impl Default for FrameScale {
    fn default() -> Self {
        FrameScale::Fixed {
            lat_to_meters: LAT_TO_METERS,
            lon_to_meters: LON_TO_METERS,
        }
    }
}

impl FrameScale {
    /// Returns `(lat_to_meters, lon_to_meters)` at the given latitude
    pub fn factors(&self, latitude: f64) -> (f64, f64) {
        match *self {
            FrameScale::Fixed {
                lat_to_meters,
                lon_to_meters,
            } => (lat_to_meters, lon_to_meters),
            FrameScale::Cosine => (
                METERS_PER_DEGREE,
                METERS_PER_DEGREE * latitude.to_radians().cos(),
            ),
        }
    }
}

/// Origin and scale of the local coordinate system for one processing pass.
///
/// Every point converted together must go through the same frame, otherwise the
/// datasets drift apart. Changing the centre means building a new frame and
/// re-running the pass, never shifting already projected output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReferenceFrame {
    center_latitude: f64,
    center_longitude: f64,
    lat_to_meters: f64,
    lon_to_meters: f64,
}

impl ReferenceFrame {
    /// Create a frame from explicit factors, rejecting non-finite or degenerate values
    pub fn new(
        center_latitude: f64,
        center_longitude: f64,
        lat_to_meters: f64,
        lon_to_meters: f64,
    ) -> Result<Self> {
        if !center_latitude.is_finite() || !(-90.0..=90.0).contains(&center_latitude) {
            return Err(GeoprepError::configuration(
                "center_latitude",
                center_latitude,
                "must be a finite latitude in [-90, 90]",
            ));
        }
        if !center_longitude.is_finite() || !(-180.0..=180.0).contains(&center_longitude) {
            return Err(GeoprepError::configuration(
                "center_longitude",
                center_longitude,
                "must be a finite longitude in [-180, 180]",
            ));
        }
        if !lat_to_meters.is_finite() || lat_to_meters <= 0.0 {
            return Err(GeoprepError::configuration(
                "lat_to_meters",
                lat_to_meters,
                "scale factor must be finite and positive",
            ));
        }
        if !lon_to_meters.is_finite() || lon_to_meters <= 0.0 {
            return Err(GeoprepError::configuration(
                "lon_to_meters",
                lon_to_meters,
                "scale factor must be finite and positive",
            ));
        }

        Ok(ReferenceFrame {
            center_latitude,
            center_longitude,
            lat_to_meters,
            lon_to_meters,
        })
    }

    /// Create a frame whose factors come from a [`FrameScale`]
    pub fn with_scale(
        center_latitude: f64,
        center_longitude: f64,
        scale: FrameScale,
    ) -> Result<Self> {
        let (lat_to_meters, lon_to_meters) = scale.factors(center_latitude);
        Self::new(center_latitude, center_longitude, lat_to_meters, lon_to_meters)
    }

    /// Public Square fountain with the fixed 111000 / 87000 factors
    pub fn belleville() -> Self {
        ReferenceFrame {
            center_latitude: DEFAULT_CENTER_LAT,
            center_longitude: DEFAULT_CENTER_LON,
            lat_to_meters: LAT_TO_METERS,
            lon_to_meters: LON_TO_METERS,
        }
    }

    pub fn center_latitude(&self) -> f64 {
        self.center_latitude
    }

    pub fn center_longitude(&self) -> f64 {
        self.center_longitude
    }

    pub fn lat_to_meters(&self) -> f64 {
        self.lat_to_meters
    }

    pub fn lon_to_meters(&self) -> f64 {
        self.lon_to_meters
    }

    /// The frame centre as a geographic point (x = lon, y = lat)
    pub fn center(&self) -> Point<f64> {
        Point::new(self.center_longitude, self.center_latitude)
    }

    /// Same factors, different origin
    pub fn recentered(&self, center: Point<f64>) -> Result<Self> {
        Self::new(center.y(), center.x(), self.lat_to_meters, self.lon_to_meters)
    }

    /// Project a geographic point (x = lon, y = lat) into local metres, rounded to 0.1 m
    pub fn project(&self, point: Point<f64>) -> LocalPoint {
        self.project_unrounded(point).rounded()
    }

    /// Project without the output quantization
    pub fn project_unrounded(&self, point: Point<f64>) -> LocalPoint {
        let x = (point.x() - self.center_longitude) * self.lon_to_meters;
        let z = -(point.y() - self.center_latitude) * self.lat_to_meters;
        LocalPoint::new(x, z)
    }

    /// Inverse of [`ReferenceFrame::project_unrounded`]
    pub fn unproject(&self, point: LocalPoint) -> Point<f64> {
        let lon = point.x / self.lon_to_meters + self.center_longitude;
        let lat = -point.z / self.lat_to_meters + self.center_latitude;
        Point::new(lon, lat)
    }
}

/// Geographic bounding box (WGS84 degrees)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64, // min longitude
    pub min_y: f64, // min latitude
    pub max_x: f64, // max longitude
    pub max_y: f64, // max latitude
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        BoundingBox {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Downtown Belleville
    pub fn belleville() -> Self {
        BoundingBox::new(DEFAULT_MIN_LON, DEFAULT_MIN_LAT, DEFAULT_MAX_LON, DEFAULT_MAX_LAT)
    }

    /// Square-ish box of `radius_km` around a centre, using 111 km per degree of
    /// latitude and `111 * cos(lat)` km per degree of longitude
    pub fn around(center: Point<f64>, radius_km: f64) -> Result<Self> {
        if !radius_km.is_finite() || radius_km <= 0.0 {
            return Err(GeoprepError::configuration(
                "radius_km",
                radius_km,
                "must be finite and positive",
            ));
        }
        let lat_delta = radius_km / 111.0;
        let lon_delta = radius_km / (111.0 * center.y().to_radians().cos());

        let bbox = BoundingBox::new(
            center.x() - lon_delta,
            center.y() - lat_delta,
            center.x() + lon_delta,
            center.y() + lat_delta,
        );
        bbox.validate()?;
        Ok(bbox)
    }

    /// Reject boxes with non-finite or inverted edges
    pub fn validate(&self) -> Result<()> {
        let values = [self.min_x, self.min_y, self.max_x, self.max_y];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(GeoprepError::configuration(
                "bounding_box",
                format!("{:?}", values),
                "all edges must be finite",
            ));
        }
        if self.min_x >= self.max_x {
            return Err(GeoprepError::configuration(
                "bounding_box.min_x",
                self.min_x,
                format!("must be below max_x = {}", self.max_x),
            ));
        }
        if self.min_y >= self.max_y {
            return Err(GeoprepError::configuration(
                "bounding_box.min_y",
                self.min_y,
                format!("must be below max_y = {}", self.max_y),
            ));
        }
        Ok(())
    }

    /// Inclusive containment test
    pub fn contains(&self, point: Point<f64>) -> bool {
        self.min_x <= point.x()
            && point.x() <= self.max_x
            && self.min_y <= point.y()
            && point.y() <= self.max_y
    }
}

/// Caller-supplied step that brings source coordinates into WGS84 before projection
pub trait CoordinateTransform {
    fn to_geographic(&self, x: f64, y: f64) -> Result<Point<f64>>;
}

/// Source data already in WGS84 (Overpass, Overture exports)
#[derive(Debug, Clone, Copy, Default)]
pub struct Wgs84;

impl CoordinateTransform for Wgs84 {
    fn to_geographic(&self, x: f64, y: f64) -> Result<Point<f64>> {
        Ok(Point::new(x, y))
    }
}

/// Fixed EPSG → WGS84 reprojection backed by PROJ.
///
/// The transformation object is built once and reused for every coordinate of
/// the pass.
#[cfg(feature = "proj")]
pub struct Reprojector {
    from_epsg: i32,
    proj: proj::Proj,
}

#[cfg(feature = "proj")]
impl Reprojector {
    /// Build the transformation from `from_epsg` to EPSG:4326 (always lon/lat order)
    pub fn to_wgs84(from_epsg: i32) -> Result<Self> {
        use crate::collect::global_variables::WGS84_EPSG;

        let from_crs = format!("EPSG:{}", from_epsg);
        let to_crs = format!("EPSG:{}", WGS84_EPSG);
        let proj = proj::Proj::new_known_crs(&from_crs, &to_crs, None)?;

        Ok(Reprojector { from_epsg, proj })
    }
}

#[cfg(feature = "proj")]
impl CoordinateTransform for Reprojector {
    fn to_geographic(&self, x: f64, y: f64) -> Result<Point<f64>> {
        let (lon, lat) = self
            .proj
            .convert((x, y))
            .map_err(|e| GeoprepError::Projection(e.to_string()))?;
        if !lon.is_finite() || !lat.is_finite() {
            return Err(GeoprepError::Projection(format!(
                "EPSG:{} ({}, {}) has no finite WGS84 position",
                self.from_epsg, x, y
            )));
        }
        Ok(Point::new(lon, lat))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::point;

    fn scenario_frame() -> ReferenceFrame {
        ReferenceFrame::new(38.5200, -89.9839, 111_000.0, 87_000.0).unwrap()
    }

    #[test]
    fn test_project_center_is_origin() {
        let frame = scenario_frame();
        let p = frame.project(point!(x: -89.9839, y: 38.5200));
        assert_eq!(p, LocalPoint::new(0.0, 0.0));
        assert!(p.z.is_sign_positive());
    }

    #[test]
    fn test_project_east_and_north() {
        let frame = scenario_frame();
        assert_eq!(
            frame.project(point!(x: -89.9829, y: 38.5200)),
            LocalPoint::new(87.0, 0.0)
        );
        // north is negative z
        assert_eq!(
            frame.project(point!(x: -89.9839, y: 38.5210)),
            LocalPoint::new(0.0, -111.0)
        );
    }

    #[test]
    fn test_project_is_deterministic() {
        let frame = scenario_frame();
        let p = point!(x: -89.98123456, y: 38.52345678);
        let a = frame.project_unrounded(p);
        let b = frame.project_unrounded(p);
        assert_eq!(a.x.to_bits(), b.x.to_bits());
        assert_eq!(a.z.to_bits(), b.z.to_bits());
        assert_eq!(frame.project(p), frame.project(p));
    }

    #[test]
    fn test_unproject_inverts_project() {
        let frame = scenario_frame();
        let p = point!(x: -89.9801, y: 38.5177);
        let back = frame.unproject(frame.project_unrounded(p));
        assert!((back.x() - p.x()).abs() < 1e-9);
        assert!((back.y() - p.y()).abs() < 1e-9);
    }

    #[test]
    fn test_frame_rejects_degenerate_values() {
        assert!(matches!(
            ReferenceFrame::new(38.52, -89.98, 111_000.0, 0.0),
            Err(GeoprepError::Configuration { name: "lon_to_meters", .. })
        ));
        assert!(ReferenceFrame::new(f64::NAN, -89.98, 111_000.0, 87_000.0).is_err());
        assert!(ReferenceFrame::new(91.0, -89.98, 111_000.0, 87_000.0).is_err());
        assert!(ReferenceFrame::new(38.52, -89.98, f64::INFINITY, 87_000.0).is_err());
    }

    #[test]
    fn test_cosine_scale() {
        let frame = ReferenceFrame::with_scale(38.52, -89.98, FrameScale::Cosine).unwrap();
        assert_eq!(frame.lat_to_meters(), 111_320.0);
        let expected = 111_320.0 * 38.52_f64.to_radians().cos();
        assert!((frame.lon_to_meters() - expected).abs() < 1e-9);
        // close to the hand-picked constant at this latitude
        assert!((frame.lon_to_meters() - 87_000.0).abs() < 200.0);
    }

    #[test]
    fn test_recentered_keeps_factors() {
        let frame = ReferenceFrame::belleville();
        let moved = frame.recentered(point!(x: -89.984205, y: 38.521326)).unwrap();
        assert_eq!(moved.lat_to_meters(), frame.lat_to_meters());
        assert_eq!(moved.lon_to_meters(), frame.lon_to_meters());
        assert_eq!(moved.center_latitude(), 38.521326);
    }

    #[test]
    fn test_bounding_box() {
        let bbox = BoundingBox::belleville();
        assert!(bbox.validate().is_ok());
        assert!(bbox.contains(point!(x: -89.9839, y: 38.52)));
        assert!(bbox.contains(point!(x: -89.993, y: 38.516)));
        assert!(!bbox.contains(point!(x: -89.90, y: 38.52)));
    }

    #[test]
    fn test_bounding_box_around() {
        let bbox = BoundingBox::around(point!(x: -89.9842, y: 38.5170), 1.2).unwrap();
        assert!((bbox.max_y - bbox.min_y - 2.4 / 111.0).abs() < 1e-12);
        assert!(bbox.max_x - bbox.min_x > bbox.max_y - bbox.min_y);
        assert!(BoundingBox::around(point!(x: 0.0, y: 0.0), 0.0).is_err());
    }

    #[test]
    fn test_local_point_serializes_as_pair() {
        let json = serde_json::to_string(&LocalPoint::new(1.5, -2.0)).unwrap();
        assert_eq!(json, "[1.5,-2.0]");
        let back: LocalPoint = serde_json::from_str("[3.0, 4.0]").unwrap();
        assert_eq!(back.distance_to_origin(), 5.0);
    }

    #[cfg(feature = "proj")]
    #[test]
    fn test_reprojector() {
        // This test may fail if proj data is not installed
        if let Ok(reprojector) = Reprojector::to_wgs84(3857) {
            let p = reprojector.to_geographic(0.0, 0.0).unwrap();
            assert!(p.x().abs() < 1e-9);
            assert!(p.y().abs() < 1e-9);
        }
    }
}
