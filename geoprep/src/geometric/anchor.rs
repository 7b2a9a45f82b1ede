use geo::{BoundingRect, Centroid, MultiPoint, Point};
use serde::{Deserialize, Serialize};

use crate::commons::basic_functions::name_matches;
use crate::error::{GeoprepError, Result};
use crate::geo_core::{CoordinateTransform, FrameScale, LocalPoint, ReferenceFrame};
use crate::geometric::feature::{Feature, SourceFeature};
use crate::geometric::region::{compute_bounds, Bounds};

/// How the centre of the matched anchor points is taken
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorCenter {
    /// Mean of every matched point
    #[default]
    Centroid,
    /// Midpoint of the coordinate range of the matched points
    RangeMidpoint,
}

impl AnchorCenter {
    /// `None` for an empty point set
    pub fn of(&self, points: Vec<Point<f64>>) -> Option<Point<f64>> {
        let multi = MultiPoint::from(points);
        match self {
            AnchorCenter::Centroid => multi.centroid(),
            AnchorCenter::RangeMidpoint => multi.bounding_rect().map(|r| Point::from(r.center())),
        }
    }
}

fn check_anchor_name(anchor: &str) -> Result<()> {
    if anchor.trim().is_empty() {
        return Err(GeoprepError::configuration(
            "anchor",
            format!("{:?}", anchor),
            "anchor name must not be empty",
        ));
    }
    Ok(())
}

/// Projected features whose name contains `anchor`, case-insensitive
pub fn matching_features<'a>(
    anchor: &'a str,
    features: &'a [Feature],
) -> impl Iterator<Item = &'a Feature> + 'a {
    features
        .iter()
        .filter(move |f| f.name.as_deref().is_some_and(|n| name_matches(n, anchor)))
}

/// Local extent of every anchor match, `None` when nothing matches
pub fn anchor_extent(anchor: &str, features: &[Feature]) -> Option<Bounds> {
    let points: Vec<LocalPoint> = matching_features(anchor, features)
        .flat_map(|f| f.points.iter().copied())
        .collect();
    compute_bounds(&points)
}

/// Build a frame centred on the named anchor.
///
/// Every source record whose name contains `anchor` (case-insensitive)
/// contributes all of its vertices. Records that cannot be reprojected are
/// skipped. Fails with `AnchorNotFound` when no vertex remains.
pub fn derive_reference_frame(
    anchor: &str,
    sources: &[SourceFeature],
    transform: &dyn CoordinateTransform,
    scale: FrameScale,
    center: AnchorCenter,
) -> Result<ReferenceFrame> {
    check_anchor_name(anchor)?;

    let mut points = Vec::new();
    let mut matched = 0usize;
    for source in sources {
        if !source.name.as_deref().is_some_and(|n| name_matches(n, anchor)) {
            continue;
        }
        match source.to_geographic(transform) {
            Ok(coords) => {
                matched += 1;
                points.extend(coords);
            }
            Err(e) => log::warn!("Skipping anchor candidate: {}", e),
        }
    }

    let centre = center
        .of(points)
        .ok_or_else(|| GeoprepError::AnchorNotFound(anchor.to_string()))?;
    log::info!(
        "Anchor {:?}: {} features, centre lat {:.6} lon {:.6}",
        anchor,
        matched,
        centre.y(),
        centre.x()
    );

    ReferenceFrame::with_scale(centre.y(), centre.x(), scale)
}

/// Same as [`derive_reference_frame`] for features already projected with
/// `frame`. The local centre is unprojected through `frame` and the new frame
/// keeps its scale factors.
pub fn derive_reference_frame_from_local(
    anchor: &str,
    features: &[Feature],
    frame: &ReferenceFrame,
    center: AnchorCenter,
) -> Result<ReferenceFrame> {
    check_anchor_name(anchor)?;

    let points: Vec<Point<f64>> = matching_features(anchor, features)
        .flat_map(|f| f.points.iter().map(|p| Point::new(p.x, p.z)))
        .collect();
    let local = center
        .of(points)
        .ok_or_else(|| GeoprepError::AnchorNotFound(anchor.to_string()))?;
    log::info!(
        "Anchor {:?} sits at ({:.1}, {:.1}) in the current frame",
        anchor,
        local.x(),
        local.y()
    );

    frame.recentered(frame.unproject(LocalPoint::new(local.x(), local.y())))
}
