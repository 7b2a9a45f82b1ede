pub mod collect;
pub mod commons;
pub mod error;
pub mod geo_core;
pub mod geometric;

pub use error::{ErrorSummary, GeoprepError};
pub use geo_core::{BoundingBox, FrameScale, LocalPoint, ReferenceFrame};
