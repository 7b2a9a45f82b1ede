//! Presentation layer: colours are assigned after the geometry pipeline and
//! never influence it.

use crate::geometric::building::Building;
use crate::geometric::land_cover::{LandUseFeature, LandUseType};
use crate::geometric::road::{Street, StreetClass};

/// Pastel palette cycled over the buildings, nearest first
pub const BUILDING_PALETTE: [&str; 14] = [
    "#74b9ff", "#a29bfe", "#fd79a8", "#ffeaa7", "#81ecec", "#fab1a0", "#00b894", "#e17055",
    "#6c5ce7", "#fdcb6e", "#55efc4", "#b2bec3", "#dfe6e9", "#636e72",
];

pub fn street_color(class: StreetClass) -> &'static str {
    match class {
        StreetClass::Primary | StreetClass::Secondary => "#636e72",
        StreetClass::Tertiary | StreetClass::Residential => "#4a5568",
        StreetClass::Service => "#3d4448",
        StreetClass::Footway | StreetClass::Path => "#2d3436",
    }
}

pub fn land_use_color(land_use: LandUseType) -> &'static str {
    match land_use {
        LandUseType::Park | LandUseType::Grass => "#1a2a1a",
        LandUseType::Residential => "#1c1c26",
        LandUseType::Commercial => "#1e1e28",
        LandUseType::Industrial => "#1a1a22",
        LandUseType::Parking => "#202028",
        LandUseType::Water | LandUseType::Waterway => "#1a2a3a",
        LandUseType::Railway => "#2a2a2a",
    }
}

/// Assigns colours to finished records
pub trait StyleDecorator {
    /// `index` is the position in the sorted output
    fn building_color(&self, index: usize, building: &Building) -> Option<String>;
    fn street_color(&self, street: &Street) -> Option<String>;
    fn land_use_color(&self, feature: &LandUseFeature) -> Option<String>;

    fn decorate_buildings(&self, buildings: &mut [Building]) {
        for (i, b) in buildings.iter_mut().enumerate() {
            b.color = self.building_color(i, b);
        }
    }

    fn decorate_streets(&self, streets: &mut [Street]) {
        for s in streets.iter_mut() {
            s.color = self.street_color(s);
        }
    }

    fn decorate_land_use(&self, features: &mut [LandUseFeature]) {
        for f in features.iter_mut() {
            f.color = self.land_use_color(f);
        }
    }
}

/// Dark night-time scene colours
#[derive(Debug, Clone, Copy, Default)]
pub struct SceneStyle;

impl StyleDecorator for SceneStyle {
    fn building_color(&self, index: usize, _building: &Building) -> Option<String> {
        Some(BUILDING_PALETTE[index % BUILDING_PALETTE.len()].to_string())
    }

    fn street_color(&self, street: &Street) -> Option<String> {
        Some(street_color(street.street_type).to_string())
    }

    fn land_use_color(&self, feature: &LandUseFeature) -> Option<String> {
        Some(land_use_color(feature.land_use).to_string())
    }
}

/// Leaves every colour unset
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStyle;

impl StyleDecorator for NoStyle {
    fn building_color(&self, _index: usize, _building: &Building) -> Option<String> {
        None
    }

    fn street_color(&self, _street: &Street) -> Option<String> {
        None
    }

    fn land_use_color(&self, _feature: &LandUseFeature) -> Option<String> {
        None
    }
}
