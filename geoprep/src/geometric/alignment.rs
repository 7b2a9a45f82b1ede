use std::fmt;

use serde::Serialize;

use crate::commons::basic_functions::round_tenth;
use crate::geo_core::LocalPoint;
use crate::geometric::anchor::{anchor_extent, matching_features};
use crate::geometric::feature::Feature;
use crate::geometric::region::{features_bounds, Bounds};

/// Extent of one dataset in local metres
#[derive(Debug, Clone, Serialize)]
pub struct DatasetExtent {
    pub label: String,
    pub count: usize,
    pub bounds: Option<Bounds>,
}

impl DatasetExtent {
    pub fn of(label: impl Into<String>, features: &[Feature]) -> Self {
        DatasetExtent {
            label: label.into(),
            count: features.len(),
            bounds: features_bounds(features),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NearestFeature {
    pub id: String,
    pub name: String,
    pub distance: f64,
}

/// The `n` features with a vertex closest to the origin, closest first
pub fn nearest_to_origin(features: &[Feature], n: usize) -> Vec<NearestFeature> {
    let mut nearest: Vec<NearestFeature> = features
        .iter()
        .filter_map(|f| {
            f.min_distance_to_origin().map(|d| NearestFeature {
                id: f.id.clone(),
                name: f.display_name().to_string(),
                distance: round_tenth(d),
            })
        })
        .collect();
    nearest.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    nearest.truncate(n);
    nearest
}

#[derive(Debug, Clone, Serialize)]
pub struct AnchorReport {
    pub name: String,
    pub matched: usize,
    pub extent: Option<Bounds>,
}

/// Side-by-side diagnostics for two datasets that should share a frame
#[derive(Debug, Clone, Serialize)]
pub struct AlignmentReport {
    pub first: DatasetExtent,
    pub second: DatasetExtent,
    /// Second bounds centre minus first bounds centre
    pub center_offset: Option<LocalPoint>,
    pub nearest_first: Vec<NearestFeature>,
    pub nearest_second: Vec<NearestFeature>,
    pub anchor: Option<AnchorReport>,
}

impl AlignmentReport {
    pub fn compare(
        first_label: &str,
        first: &[Feature],
        second_label: &str,
        second: &[Feature],
        nearest: usize,
    ) -> Self {
        let first_extent = DatasetExtent::of(first_label, first);
        let second_extent = DatasetExtent::of(second_label, second);
        let center_offset = match (&first_extent.bounds, &second_extent.bounds) {
            (Some(a), Some(b)) => {
                Some(LocalPoint::new(b.center_x - a.center_x, b.center_z - a.center_z).rounded())
            }
            _ => None,
        };

        AlignmentReport {
            first: first_extent,
            second: second_extent,
            center_offset,
            nearest_first: nearest_to_origin(first, nearest),
            nearest_second: nearest_to_origin(second, nearest),
            anchor: None,
        }
    }

    /// Add the local extent of the features named like `anchor`
    pub fn with_anchor(mut self, anchor: &str, features: &[Feature]) -> Self {
        self.anchor = Some(AnchorReport {
            name: anchor.to_string(),
            matched: matching_features(anchor, features).count(),
            extent: anchor_extent(anchor, features),
        });
        self
    }

    /// Whether both bounds centres are within `tolerance` metres on each axis
    pub fn is_aligned(&self, tolerance: f64) -> bool {
        self.center_offset
            .map(|o| o.x.abs() <= tolerance && o.z.abs() <= tolerance)
            .unwrap_or(false)
    }
}

fn write_extent(f: &mut fmt::Formatter<'_>, extent: &DatasetExtent) -> fmt::Result {
    match &extent.bounds {
        Some(b) => writeln!(
            f,
            "{} ({}): X {:.1} to {:.1}, Z {:.1} to {:.1}, centre ({:.1}, {:.1})",
            extent.label, extent.count, b.min_x, b.max_x, b.min_z, b.max_z, b.center_x, b.center_z
        ),
        None => writeln!(f, "{} ({}): empty", extent.label, extent.count),
    }
}

impl fmt::Display for AlignmentReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_extent(f, &self.first)?;
        write_extent(f, &self.second)?;
        if let Some(o) = self.center_offset {
            writeln!(f, "Centre offset: ({:.1}, {:.1})", o.x, o.z)?;
        }
        for (label, nearest) in [
            (&self.first.label, &self.nearest_first),
            (&self.second.label, &self.nearest_second),
        ] {
            writeln!(f, "{} nearest origin:", label)?;
            for n in nearest {
                writeln!(f, "  {} {:?} at {:.1} m", n.id, n.name, n.distance)?;
            }
        }
        if let Some(anchor) = &self.anchor {
            match &anchor.extent {
                Some(b) => writeln!(
                    f,
                    "Anchor {:?} ({} features): X {:.1} to {:.1}, Z {:.1} to {:.1}",
                    anchor.name, anchor.matched, b.min_x, b.max_x, b.min_z, b.max_z
                )?,
                None => writeln!(f, "Anchor {:?}: no match", anchor.name)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(id: &str, cx: f64, cz: f64) -> Feature {
        Feature::polygon(
            id,
            "building",
            vec![
                LocalPoint::new(cx - 5.0, cz - 5.0),
                LocalPoint::new(cx + 5.0, cz - 5.0),
                LocalPoint::new(cx + 5.0, cz + 5.0),
                LocalPoint::new(cx - 5.0, cz + 5.0),
            ],
        )
    }

    #[test]
    fn test_compare() {
        let buildings = vec![square("bldg-1", 0.0, 0.0), square("bldg-2", 100.0, 0.0)];
        let streets = vec![
            Feature::polyline(
                "street-1",
                "primary",
                vec![LocalPoint::new(-20.0, 50.0), LocalPoint::new(140.0, 50.0)],
            )
            .with_name("Main Street"),
            Feature::polyline(
                "street-2",
                "residential",
                vec![LocalPoint::new(60.0, -50.0), LocalPoint::new(60.0, 50.0)],
            )
            .with_name("Illinois Street"),
        ];

        let report = AlignmentReport::compare("buildings", &buildings, "streets", &streets, 1)
            .with_anchor("illinois", &streets);

        assert_eq!(report.first.count, 2);
        assert_eq!(report.center_offset, Some(LocalPoint::new(10.0, 0.0)));
        assert!(report.is_aligned(10.0));
        assert!(!report.is_aligned(5.0));
        assert_eq!(report.nearest_first.len(), 1);
        assert_eq!(report.nearest_first[0].id, "bldg-1");
        assert_eq!(report.nearest_second[0].name, "Main Street");

        let anchor = report.anchor.as_ref().unwrap();
        assert_eq!(anchor.matched, 1);
        assert_eq!(anchor.extent.unwrap().center_x, 60.0);
        assert!(report.to_string().contains("Centre offset: (10.0, 0.0)"));
    }

    #[test]
    fn test_empty_dataset() {
        let report =
            AlignmentReport::compare("buildings", &[], "streets", &[square("a", 0.0, 0.0)], 5);
        assert!(report.center_offset.is_none());
        assert!(!report.is_aligned(1000.0));
    }
}
