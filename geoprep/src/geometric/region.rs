use serde::{Deserialize, Serialize};

use crate::error::{GeoprepError, Result};
use crate::geo_core::LocalPoint;
use crate::geometric::feature::Feature;

/// Extent and midpoint of a point sequence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_z: f64,
    pub max_z: f64,
    pub center_x: f64,
    pub center_z: f64,
}

impl Bounds {
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn depth(&self) -> f64 {
        self.max_z - self.min_z
    }

    pub fn center(&self) -> LocalPoint {
        LocalPoint::new(self.center_x, self.center_z)
    }
}

/// Min/max/midpoint reduction. `None` for an empty sequence.
pub fn compute_bounds(points: &[LocalPoint]) -> Option<Bounds> {
    let first = points.first()?;
    let (mut min_x, mut max_x, mut min_z, mut max_z) = (first.x, first.x, first.z, first.z);
    for p in &points[1..] {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_z = min_z.min(p.z);
        max_z = max_z.max(p.z);
    }

    Some(Bounds {
        min_x,
        max_x,
        min_z,
        max_z,
        center_x: (min_x + max_x) / 2.0,
        center_z: (min_z + max_z) / 2.0,
    })
}

/// Bounds of every vertex of every feature
pub fn features_bounds(features: &[Feature]) -> Option<Bounds> {
    let points: Vec<LocalPoint> = features.iter().flat_map(|f| f.points.iter().copied()).collect();
    compute_bounds(&points)
}

/// Axis-aligned rectangle in local metres. Deserialization goes through
/// [`BoundingRegion::new`], so a degenerate region never gets built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RegionExtent")]
pub struct BoundingRegion {
    min_x: f64,
    max_x: f64,
    min_z: f64,
    max_z: f64,
}

/// Unchecked wire form of [`BoundingRegion`]
#[derive(Deserialize)]
struct RegionExtent {
    min_x: f64,
    max_x: f64,
    min_z: f64,
    max_z: f64,
}

impl TryFrom<RegionExtent> for BoundingRegion {
    type Error = GeoprepError;

    fn try_from(e: RegionExtent) -> Result<Self> {
        BoundingRegion::new(e.min_x, e.max_x, e.min_z, e.max_z)
    }
}

impl BoundingRegion {
    /// Create a region, rejecting non-finite or empty extents
    pub fn new(min_x: f64, max_x: f64, min_z: f64, max_z: f64) -> Result<Self> {
        for (name, value) in [
            ("min_x", min_x),
            ("max_x", max_x),
            ("min_z", min_z),
            ("max_z", max_z),
        ] {
            if !value.is_finite() {
                return Err(GeoprepError::configuration(name, value, "must be finite"));
            }
        }
        if min_x >= max_x {
            return Err(GeoprepError::configuration(
                "min_x",
                min_x,
                format!("must be below max_x = {}", max_x),
            ));
        }
        if min_z >= max_z {
            return Err(GeoprepError::configuration(
                "min_z",
                min_z,
                format!("must be below max_z = {}", max_z),
            ));
        }

        Ok(BoundingRegion {
            min_x,
            max_x,
            min_z,
            max_z,
        })
    }

    /// Grow `bounds` by `margin` metres on every side
    pub fn from_bounds(bounds: &Bounds, margin: f64) -> Result<Self> {
        if !margin.is_finite() || margin < 0.0 {
            return Err(GeoprepError::configuration(
                "margin",
                margin,
                "must be finite and non-negative",
            ));
        }
        Self::new(
            bounds.min_x - margin,
            bounds.max_x + margin,
            bounds.min_z - margin,
            bounds.max_z + margin,
        )
    }

    pub fn min_x(&self) -> f64 {
        self.min_x
    }

    pub fn max_x(&self) -> f64 {
        self.max_x
    }

    pub fn min_z(&self) -> f64 {
        self.min_z
    }

    pub fn max_z(&self) -> f64 {
        self.max_z
    }

    /// Inclusive on all four edges
    pub fn contains(&self, point: &LocalPoint) -> bool {
        within_region(point, self)
    }
}

/// Inclusive bounding check
pub fn within_region(point: &LocalPoint, region: &BoundingRegion) -> bool {
    region.min_x <= point.x
        && point.x <= region.max_x
        && region.min_z <= point.z
        && point.z <= region.max_z
}

/// How [`filter_features`] treats features that straddle the region edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterMode {
    /// Keep the whole, unclipped feature if any of its points is inside
    KeepIfAnyPointInRegion,
    /// Keep only the inside points. There is no boundary re-insertion, so a
    /// clipped polygon is just the subset of its original vertices.
    ClipToRegion,
}

/// Result of a filter pass
#[derive(Debug, Default)]
pub struct FilterOutcome {
    pub features: Vec<Feature>,
    /// Features with no point inside the region. In clip mode this includes
    /// features left with zero points; they are not reported in `rejected`.
    pub outside: usize,
    /// `InvalidGeometry` for features clipped to at least one but fewer than
    /// their minimum point count
    pub rejected: Vec<GeoprepError>,
}

/// Stable filter of `features` against `region`; input order is preserved for
/// features and for the points inside them.
pub fn filter_features(
    features: Vec<Feature>,
    region: &BoundingRegion,
    mode: FilterMode,
) -> FilterOutcome {
    let mut outcome = FilterOutcome::default();

    for mut feature in features {
        match mode {
            FilterMode::KeepIfAnyPointInRegion => {
                if feature.points.iter().any(|p| region.contains(p)) {
                    outcome.features.push(feature);
                } else {
                    outcome.outside += 1;
                }
            }
            FilterMode::ClipToRegion => {
                feature.points.retain(|p| region.contains(p));
                if feature.points.is_empty() {
                    outcome.outside += 1;
                    continue;
                }
                match feature.validate() {
                    Ok(()) => outcome.features.push(feature),
                    Err(e) => outcome.rejected.push(e),
                }
            }
        }
    }

    log::debug!(
        "filter {:?}: kept {}, outside {}, rejected {}",
        mode,
        outcome.features.len(),
        outcome.outside,
        outcome.rejected.len()
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region() -> BoundingRegion {
        BoundingRegion::new(-100.0, 100.0, -100.0, 100.0).unwrap()
    }

    fn line(id: &str, pts: &[(f64, f64)]) -> Feature {
        Feature::polyline(
            id,
            "residential",
            pts.iter().map(|&(x, z)| LocalPoint::new(x, z)).collect(),
        )
    }

    #[test]
    fn test_within_region_is_inclusive() {
        let r = region();
        assert!(within_region(&LocalPoint::new(-100.0, 0.0), &r));
        assert!(within_region(&LocalPoint::new(100.0, 0.0), &r));
        assert!(within_region(&LocalPoint::new(0.0, -100.0), &r));
        assert!(within_region(&LocalPoint::new(0.0, 100.0), &r));
        assert!(r.contains(&LocalPoint::new(100.0, 100.0)));
        assert!(!r.contains(&LocalPoint::new(100.1, 0.0)));
    }

    #[test]
    fn test_region_rejects_degenerate_extent() {
        assert!(matches!(
            BoundingRegion::new(10.0, 10.0, 0.0, 1.0),
            Err(GeoprepError::Configuration { name: "min_x", .. })
        ));
        assert!(BoundingRegion::new(0.0, 1.0, 5.0, -5.0).is_err());
        assert!(BoundingRegion::new(f64::NAN, 1.0, 0.0, 1.0).is_err());
    }

    #[test]
    fn test_clip_drops_single_surviving_point() {
        let features = vec![line("street-1", &[(-150.0, 0.0), (0.0, 0.0), (150.0, 0.0)])];
        let outcome = filter_features(features, &region(), FilterMode::ClipToRegion);
        assert!(outcome.features.is_empty());
        assert_eq!(outcome.rejected.len(), 1);
        assert!(matches!(
            outcome.rejected[0],
            GeoprepError::InvalidGeometry { actual: 1, required: 2, .. }
        ));
    }

    #[test]
    fn test_clip_fully_outside_counts_as_outside() {
        let features = vec![line("street-9", &[(200.0, 200.0), (300.0, 300.0)])];
        let outcome = filter_features(features, &region(), FilterMode::ClipToRegion);
        assert!(outcome.features.is_empty());
        assert_eq!(outcome.outside, 1);
        assert!(outcome.rejected.is_empty());
    }

    #[test]
    fn test_region_deserialize_is_validated() {
        let r: BoundingRegion =
            serde_json::from_str(r#"{"min_x":-10,"max_x":10,"min_z":-5,"max_z":5}"#).unwrap();
        assert_eq!(r.max_z(), 5.0);

        assert!(serde_json::from_str::<BoundingRegion>(
            r#"{"min_x":10,"max_x":-10,"min_z":0,"max_z":1}"#
        )
        .is_err());
        assert!(serde_json::from_str::<BoundingRegion>(
            r#"{"min_x":0,"max_x":1,"min_z":3,"max_z":3}"#
        )
        .is_err());
    }

    #[test]
    fn test_keep_mode_keeps_unclipped_feature() {
        let features = vec![line("street-1", &[(-150.0, 0.0), (0.0, 0.0), (150.0, 0.0)])];
        let outcome = filter_features(features, &region(), FilterMode::KeepIfAnyPointInRegion);
        assert_eq!(outcome.features.len(), 1);
        assert_eq!(outcome.features[0].points.len(), 3);
    }

    #[test]
    fn test_clip_preserves_order() {
        let features = vec![
            line("a", &[(-150.0, 0.0), (10.0, 0.0), (20.0, 5.0), (30.0, 10.0)]),
            line("b", &[(500.0, 500.0), (600.0, 600.0)]),
            line("c", &[(-50.0, -50.0), (-40.0, -40.0)]),
        ];
        let outcome = filter_features(features, &region(), FilterMode::ClipToRegion);
        let ids: Vec<&str> = outcome.features.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(
            outcome.features[0].points,
            vec![
                LocalPoint::new(10.0, 0.0),
                LocalPoint::new(20.0, 5.0),
                LocalPoint::new(30.0, 10.0)
            ]
        );
        assert_eq!(outcome.outside, 1);
    }

    #[test]
    fn test_clip_polygon_needs_three_points() {
        let parcel = Feature::polygon(
            "parking-1",
            "parking",
            vec![
                LocalPoint::new(0.0, 0.0),
                LocalPoint::new(50.0, 0.0),
                LocalPoint::new(150.0, 50.0),
                LocalPoint::new(150.0, 150.0),
            ],
        );
        let outcome = filter_features(vec![parcel], &region(), FilterMode::ClipToRegion);
        assert!(outcome.features.is_empty());
        assert_eq!(outcome.rejected.len(), 1);
    }

    #[test]
    fn test_compute_bounds() {
        let pts = vec![
            LocalPoint::new(-10.0, 4.0),
            LocalPoint::new(20.0, -6.0),
            LocalPoint::new(5.0, 8.0),
        ];
        let b = compute_bounds(&pts).unwrap();
        assert_eq!((b.min_x, b.max_x, b.min_z, b.max_z), (-10.0, 20.0, -6.0, 8.0));
        assert_eq!((b.center_x, b.center_z), (5.0, 1.0));
        assert_eq!(b.width(), 30.0);
        assert_eq!(b.depth(), 14.0);
        assert!(compute_bounds(&[]).is_none());
    }

    #[test]
    fn test_region_from_bounds_with_margin() {
        let b =
            compute_bounds(&[LocalPoint::new(-10.0, -20.0), LocalPoint::new(10.0, 20.0)]).unwrap();
        let r = BoundingRegion::from_bounds(&b, 30.0).unwrap();
        assert_eq!((r.min_x(), r.max_x(), r.min_z(), r.max_z()), (-40.0, 40.0, -50.0, 50.0));
        assert!(BoundingRegion::from_bounds(&b, -1.0).is_err());
    }
}
