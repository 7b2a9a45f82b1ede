use geo::{Area, Coord, LineString, Polygon};
use serde::{Deserialize, Serialize};

use crate::collect::global_variables::{
    DEFAULT_STOREY_HEIGHT, DEFAULT_TARGET_VERTEX_COUNT, MIN_FOOTPRINT_SIZE,
};
use crate::commons::basic_functions::{distance_sq_from_origin, round_tenth};
use crate::error::{ErrorSummary, Result};
use crate::geo_core::{BoundingBox, CoordinateTransform, LocalPoint, ReferenceFrame};
use crate::geometric::feature::{Feature, GeometryKind, SourceFeature};
use crate::geometric::region::{compute_bounds, Bounds};

/// Decimate a footprint to roughly `target_vertex_count` vertices.
///
/// Keeps every `step`-th vertex by index, it is not shape preserving. Rings of
/// four points or fewer come back unchanged; anything longer comes back closed.
pub fn simplify_polygon(points: &[LocalPoint], target_vertex_count: usize) -> Vec<LocalPoint> {
    if points.len() <= 4 {
        return points.to_vec();
    }

    let step = (points.len() / target_vertex_count.max(1)).max(1);
    let mut simplified: Vec<LocalPoint> = points.iter().step_by(step).copied().collect();

    let first = simplified[0];
    if simplified.last() != Some(&first) {
        simplified.push(first);
    }
    simplified
}

/// Coarse visual height from footprint area, used when the source carries
/// neither a height nor a floor count. Not continuous at the breakpoints.
pub fn estimate_height(width: f64, depth: f64) -> f64 {
    let area = width * depth;
    if area < 50.0 {
        5.0 + area / 10.0
    } else if area < 200.0 {
        8.0 + area / 30.0
    } else if area < 500.0 {
        12.0 + area / 50.0
    } else {
        18.0 + (area / 80.0).min(25.0)
    }
}

/// Authoritative height first, then floors times the storey height, then the estimate
pub fn resolve_height(
    height: Option<f64>,
    floors: Option<f64>,
    storey_height: f64,
    width: f64,
    depth: f64,
) -> f64 {
    if let Some(h) = height.filter(|h| h.is_finite() && *h > 0.0) {
        return h;
    }
    if let Some(n) = floors.filter(|n| n.is_finite() && *n > 0.0) {
        return n * storey_height;
    }
    estimate_height(width, depth)
}

/// Building record as consumed by the 3D scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub footprint: Vec<LocalPoint>,
    /// `[center_x, 0, center_z]`
    pub position: [f64; 3],
    /// `[width, height, depth]`
    pub size: [f64; 3],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Building {
    /// Build the record from a simplified footprint and its bounds
    pub fn new(
        id: impl Into<String>,
        footprint: Vec<LocalPoint>,
        bounds: &Bounds,
        height: f64,
    ) -> Self {
        Building {
            id: id.into(),
            name: String::new(),
            footprint,
            position: [round_tenth(bounds.center_x), 0.0, round_tenth(bounds.center_z)],
            size: [
                round_tenth(bounds.width()),
                round_tenth(height),
                round_tenth(bounds.depth()),
            ],
            color: None,
        }
    }

    pub fn height(&self) -> f64 {
        self.size[1]
    }

    pub fn distance_sq_from_origin(&self) -> f64 {
        distance_sq_from_origin(self.position[0], self.position[2])
    }

    /// Footprint area in square metres
    pub fn area(&self) -> f64 {
        let ring: LineString<f64> = self
            .footprint
            .iter()
            .map(|p| Coord { x: p.x, y: p.z })
            .collect();
        Polygon::new(ring, vec![]).unsigned_area()
    }

    /// The footprint as a generic polygon feature
    pub fn to_feature(&self) -> Feature {
        let mut feature = Feature::polygon(self.id.clone(), "building", self.footprint.clone());
        if !self.name.is_empty() {
            feature.name = Some(self.name.clone());
        }
        feature.height = Some(self.height());
        feature
    }
}

/// Knobs of the building pass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildingOptions {
    pub storey_height: f64,
    pub target_vertex_count: usize,
    /// Footprints narrower or shallower than this are skipped
    pub min_footprint_size: f64,
    /// Replace source ids with `bldg-1..n` after sorting by distance from the origin
    pub renumber: bool,
}

impl Default for BuildingOptions {
    fn default() -> Self {
        BuildingOptions {
            storey_height: DEFAULT_STOREY_HEIGHT,
            target_vertex_count: DEFAULT_TARGET_VERTEX_COUNT,
            min_footprint_size: MIN_FOOTPRINT_SIZE,
            renumber: true,
        }
    }
}

/// Building footprints processed in one frame
pub struct BuildingCollection {
    pub buildings: Vec<Building>,
    pub options: BuildingOptions,
    frame: ReferenceFrame,
    /// Pre-projection filter, tested against the first vertex of each record
    bbox: Option<BoundingBox>,
    summary: ErrorSummary,
    outside: usize,
    too_small: usize,
}

impl BuildingCollection {
    pub fn new(frame: ReferenceFrame, options: BuildingOptions) -> Self {
        BuildingCollection {
            buildings: Vec::new(),
            options,
            frame,
            bbox: None,
            summary: ErrorSummary::new(),
            outside: 0,
            too_small: 0,
        }
    }

    /// Restrict the pass to records whose first vertex falls inside `bbox`
    pub fn set_bbox(&mut self, bbox: BoundingBox) -> Result<()> {
        bbox.validate()?;
        self.bbox = Some(bbox);
        Ok(())
    }

    pub fn frame(&self) -> &ReferenceFrame {
        &self.frame
    }

    /// Project, filter, simplify and size every record, then sort by distance
    /// from the origin. Per-record problems are counted, never fatal.
    pub fn run(
        mut self,
        sources: &[SourceFeature],
        transform: &dyn CoordinateTransform,
    ) -> Result<Self> {
        log::info!("Processing {} footprint records", sources.len());

        for (i, source) in sources.iter().enumerate() {
            if i > 0 && i % 20_000 == 0 {
                log::debug!("  processed {}/{} records", i, sources.len());
            }
            if let Err(e) = self.add_source(source, transform) {
                self.summary.record(e)?;
            }
        }

        self.finish();

        log::info!(
            "Kept {} buildings ({} outside bbox, {} too small)",
            self.buildings.len(),
            self.outside,
            self.too_small
        );
        self.summary.report("buildings");
        Ok(self)
    }

    /// Process one record. `Ok(())` also covers records that were filtered out.
    pub fn add_source(
        &mut self,
        source: &SourceFeature,
        transform: &dyn CoordinateTransform,
    ) -> Result<()> {
        let geographic = source.to_geographic(transform)?;

        if let Some(bbox) = &self.bbox {
            if !bbox.contains(geographic[0]) {
                self.outside += 1;
                return Ok(());
            }
        }

        let points: Vec<LocalPoint> = geographic.iter().map(|p| self.frame.project(*p)).collect();
        let id = format!("bldg-{}", source.id);
        let mut feature = Feature::new(id, "building", GeometryKind::Polygon, points);
        feature.name = source.name.clone();
        feature.height = source.height;
        feature.floors = source.floors;
        feature.validate()?;

        if let Some(building) = self.building_from_feature(&feature) {
            self.buildings.push(building);
        } else {
            self.too_small += 1;
        }
        Ok(())
    }

    /// `None` when the simplified footprint is below the minimum size
    pub fn building_from_feature(&self, feature: &Feature) -> Option<Building> {
        let footprint = simplify_polygon(&feature.points, self.options.target_vertex_count);
        let bounds = compute_bounds(&footprint)?;

        if bounds.width() < self.options.min_footprint_size
            || bounds.depth() < self.options.min_footprint_size
        {
            return None;
        }

        let height = resolve_height(
            feature.height,
            feature.floors,
            self.options.storey_height,
            bounds.width(),
            bounds.depth(),
        );

        let mut building = Building::new(feature.id.clone(), footprint, &bounds, height);
        building.name = feature.display_name().to_string();
        Some(building)
    }

    /// Sort nearest-first and renumber if configured
    pub fn finish(&mut self) {
        self.buildings
            .sort_by(|a, b| a.distance_sq_from_origin().total_cmp(&b.distance_sq_from_origin()));
        if self.options.renumber {
            for (i, b) in self.buildings.iter_mut().enumerate() {
                b.id = format!("bldg-{}", i + 1);
            }
        }
    }

    /// Bounds of every footprint vertex
    pub fn bounds(&self) -> Option<Bounds> {
        footprint_bounds(&self.buildings)
    }

    /// Mean height weighted by footprint area
    pub fn calculate_mean_height(&self) -> f64 {
        let (weighted, total_area) = self.buildings.iter().fold((0.0, 0.0), |(w, a), b| {
            let area = b.area();
            (w + area * b.height(), a + area)
        });
        if total_area > 0.0 {
            weighted / total_area
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> ErrorSummary {
        self.summary
    }

    pub fn len(&self) -> usize {
        self.buildings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty()
    }

    pub fn into_buildings(self) -> Vec<Building> {
        self.buildings
    }
}

/// Bounds of every footprint vertex of `buildings`
pub fn footprint_bounds(buildings: &[Building]) -> Option<Bounds> {
    let points: Vec<LocalPoint> =
        buildings.iter().flat_map(|b| b.footprint.iter().copied()).collect();
    compute_bounds(&points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_core::Wgs84;
    use crate::GeoprepError;
    use geo::point;

    fn ring(n: usize, radius: f64) -> Vec<LocalPoint> {
        (0..n)
            .map(|i| {
                let a = i as f64 / n as f64 * std::f64::consts::TAU;
                LocalPoint::new(radius * a.cos(), radius * a.sin())
            })
            .collect()
    }

    #[test]
    fn test_simplify_short_ring_unchanged() {
        let pts = ring(4, 10.0);
        assert_eq!(simplify_polygon(&pts, 20), pts);
    }

    #[test]
    fn test_simplify_decimates_and_closes() {
        let pts = ring(100, 10.0);
        let simplified = simplify_polygon(&pts, 20);
        // step 5 keeps indices 0, 5, ..., 95 and re-closes
        assert_eq!(simplified.len(), 21);
        assert_eq!(simplified[1], pts[5]);
        assert_eq!(simplified.first(), simplified.last());
    }

    #[test]
    fn test_simplify_always_closed() {
        for n in 5..60 {
            let simplified = simplify_polygon(&ring(n, 5.0), 20);
            assert_eq!(simplified.first(), simplified.last(), "n = {}", n);
        }
        // already closed input is not closed twice
        let mut closed = ring(7, 5.0);
        closed.push(closed[0]);
        let simplified = simplify_polygon(&closed, 20);
        assert_eq!(simplified.len(), 8);
    }

    #[test]
    fn test_simplify_zero_target() {
        let pts = ring(10, 5.0);
        let simplified = simplify_polygon(&pts, 0);
        assert_eq!(simplified.first(), simplified.last());
    }

    #[test]
    fn test_estimate_height_spot_checks() {
        assert!((estimate_height(4.0, 10.0) - 9.0).abs() < 1e-9);
        assert!((estimate_height(10.0, 10.0) - (8.0 + 100.0 / 30.0)).abs() < 1e-9);
        assert!((estimate_height(10.0, 30.0) - 18.0).abs() < 1e-9);
        assert!((estimate_height(20.0, 30.0) - 25.5).abs() < 1e-9);
        // capped at 18 + 25
        assert_eq!(estimate_height(100.0, 100.0), 43.0);
    }

    #[test]
    fn test_estimate_height_non_decreasing_at_spot_checks() {
        let heights: Vec<f64> = [40.0, 100.0, 300.0, 600.0]
            .iter()
            .map(|a| estimate_height(*a, 1.0))
            .collect();
        assert!(heights.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_resolve_height() {
        assert_eq!(resolve_height(Some(21.0), Some(3.0), 3.5, 10.0, 10.0), 21.0);
        assert_eq!(resolve_height(None, Some(4.0), 3.5, 10.0, 10.0), 14.0);
        assert_eq!(resolve_height(Some(0.0), None, 3.5, 4.0, 10.0), 9.0);
        assert_eq!(resolve_height(Some(f64::NAN), None, 3.5, 4.0, 10.0), 9.0);
    }

    fn square_source(id: &str, lon: f64, lat: f64, side_deg: f64) -> SourceFeature {
        SourceFeature::new(
            id,
            GeometryKind::Polygon,
            vec![
                point!(x: lon, y: lat),
                point!(x: lon + side_deg, y: lat),
                point!(x: lon + side_deg, y: lat + side_deg),
                point!(x: lon, y: lat + side_deg),
            ],
        )
    }

    #[test]
    fn test_collection_run() {
        let frame = ReferenceFrame::belleville();
        let mut collection = BuildingCollection::new(frame, BuildingOptions::default());
        collection.set_bbox(BoundingBox::belleville()).unwrap();

        let sources = vec![
            // ~17 m x 22 m, a few hundred metres east
            square_source("far", -89.980, 38.520, 0.0002),
            // same size near the centre
            square_source("near", -89.9839, 38.5200, 0.0002),
            // outside the bbox
            square_source("elsewhere", -89.900, 38.520, 0.0002),
            // ~0.9 m wide shed
            square_source("shed", -89.982, 38.521, 0.00001),
            // malformed
            SourceFeature::new("empty", GeometryKind::Polygon, Vec::new()),
        ];

        let collection = collection.run(&sources, &Wgs84).unwrap();
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.buildings[0].id, "bldg-1");
        assert_eq!(collection.buildings[0].position, [8.7, 0.0, -11.1]);
        assert_eq!(collection.buildings[0].size[0], 17.4);
        assert_eq!(collection.buildings[0].size[2], 22.2);
        assert!(
            collection.buildings[0].distance_sq_from_origin()
                < collection.buildings[1].distance_sq_from_origin()
        );
        assert_eq!(collection.summary().malformed_source, 1);
    }

    #[test]
    fn test_collection_uses_floor_count() {
        let mut collection =
            BuildingCollection::new(ReferenceFrame::belleville(), BuildingOptions::default());
        let mut source = square_source("courthouse", -89.9839, 38.5200, 0.0002);
        source.floors = Some(4.0);
        collection.add_source(&source, &Wgs84).unwrap();
        assert_eq!(collection.buildings[0].height(), 14.0);
    }

    #[test]
    fn test_collection_rejects_degenerate_footprint() {
        let mut collection =
            BuildingCollection::new(ReferenceFrame::belleville(), BuildingOptions::default());
        let source = SourceFeature::new(
            "sliver",
            GeometryKind::Polygon,
            vec![point!(x: -89.9839, y: 38.52), point!(x: -89.9830, y: 38.52)],
        );
        assert!(matches!(
            collection.add_source(&source, &Wgs84),
            Err(GeoprepError::InvalidGeometry { .. })
        ));
    }

    #[test]
    fn test_mean_height_weighted_by_area() {
        let small = Building::new(
            "a",
            vec![
                LocalPoint::new(0.0, 0.0),
                LocalPoint::new(10.0, 0.0),
                LocalPoint::new(10.0, 10.0),
                LocalPoint::new(0.0, 10.0),
            ],
            &compute_bounds(&[LocalPoint::new(0.0, 0.0), LocalPoint::new(10.0, 10.0)]).unwrap(),
            10.0,
        );
        let mut large = small.clone();
        large.footprint = vec![
            LocalPoint::new(0.0, 0.0),
            LocalPoint::new(30.0, 0.0),
            LocalPoint::new(30.0, 10.0),
            LocalPoint::new(0.0, 10.0),
        ];
        large.size[1] = 20.0;

        let mut collection =
            BuildingCollection::new(ReferenceFrame::belleville(), BuildingOptions::default());
        collection.buildings = vec![small, large];
        assert_eq!(collection.buildings[0].area(), 100.0);
        assert!((collection.calculate_mean_height() - 17.5).abs() < 1e-9);
    }
}
