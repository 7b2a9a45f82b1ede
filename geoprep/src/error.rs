//! Error types for geoprep

use std::fmt;

use thiserror::Error;

use crate::geometric::feature::GeometryKind;

/// Main error type for geoprep operations
///
/// `InvalidGeometry` and `MalformedSource` are per-feature: the feature is dropped
/// and the error is counted in an [`ErrorSummary`]. `AnchorNotFound` and
/// `Configuration` abort the pass before anything is written.
#[derive(Error, Debug)]
pub enum GeoprepError {
    #[error("Invalid geometry for {id}: {kind} needs at least {required} points, got {actual}")]
    InvalidGeometry {
        id: String,
        kind: GeometryKind,
        required: usize,
        actual: usize,
    },

    #[error("Anchor feature matching {0:?} not found")]
    AnchorNotFound(String),

    #[error("Malformed source record {id}: {reason}")]
    MalformedSource { id: String, reason: String },

    #[error("Invalid configuration: {name} = {value} ({reason})")]
    Configuration {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "proj")]
    #[error("Projection error: {0}")]
    Projection(String),
}

impl GeoprepError {
    pub(crate) fn configuration(
        name: &'static str,
        value: impl fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        GeoprepError::Configuration {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        GeoprepError::MalformedSource {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error only affects a single feature and the batch can go on
    pub fn is_per_feature(&self) -> bool {
        matches!(
            self,
            GeoprepError::InvalidGeometry { .. } | GeoprepError::MalformedSource { .. }
        )
    }
}

#[cfg(feature = "proj")]
impl From<proj::ProjCreateError> for GeoprepError {
    fn from(e: proj::ProjCreateError) -> Self {
        GeoprepError::Projection(e.to_string())
    }
}

/// Result type alias for geoprep operations
pub type Result<T> = std::result::Result<T, GeoprepError>;

/// Counts of per-feature errors accumulated over one pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorSummary {
    pub invalid_geometry: usize,
    pub malformed_source: usize,
}

impl ErrorSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a per-feature error. Returns the error back when it is fatal so the
    /// caller can propagate it with `?`.
    pub fn record(&mut self, error: GeoprepError) -> Result<()> {
        match error {
            GeoprepError::InvalidGeometry { .. } => {
                log::debug!("dropped feature: {}", error);
                self.invalid_geometry += 1;
                Ok(())
            }
            GeoprepError::MalformedSource { .. } => {
                log::debug!("skipped record: {}", error);
                self.malformed_source += 1;
                Ok(())
            }
            fatal => Err(fatal),
        }
    }

    pub fn total(&self) -> usize {
        self.invalid_geometry + self.malformed_source
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Log the summary at the end of a pass
    pub fn report(&self, pass: &str) {
        if self.is_empty() {
            log::info!("{}: no records dropped", pass);
        } else {
            log::warn!(
                "{}: dropped {} invalid geometries, skipped {} malformed records",
                pass,
                self.invalid_geometry,
                self.malformed_source
            );
        }
    }
}

impl fmt::Display for ErrorSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} invalid geometry, {} malformed source",
            self.invalid_geometry, self.malformed_source
        )
    }
}
