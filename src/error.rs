//! Error types for the dashboard_report crate.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for report composition.
pub type Result<T> = std::result::Result<T, ComposeError>;

/// Fatal errors that terminate a report export.
///
/// Per-section capture problems never show up here; they are absorbed by the
/// composer and reported through [`crate::composer::ReportArtifact::skipped`].
#[derive(Error, Debug)]
pub enum ComposeError {
    /// The dataset contained no records, so nothing was attempted.
    #[error("Dataset is empty: nothing to export")]
    EmptyDataset,

    /// The drawing surface failed while the finished document was written out.
    #[error("Failed to serialize report: {0}")]
    SerializationFailure(#[source] genpdf::error::Error),

    /// The caller-level timeout elapsed before composition finished.
    #[error("Report composition timed out after {0:?}")]
    TimedOut(Duration),

    /// The composer configuration describes an unusable layout.
    #[error("Invalid composer configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

impl ComposeError {
    /// Short, user-facing notification text.
    ///
    /// Only two messages exist: one for a missing dataset and one for every
    /// other failure.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::EmptyDataset => "No data available to export.",
            Self::SerializationFailure(_) | Self::TimedOut(_) | Self::InvalidConfig(_) => {
                "Report export failed."
            }
        }
    }
}

/// A visual region could not be turned into a raster snapshot.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureUnavailable {
    /// No region is registered under the locator.
    #[error("Region `{0}` could not be located")]
    NotFound(String),

    /// The provider failed to produce pixels for the region.
    #[error("Region `{locator}` could not be rendered: {message}")]
    Snapshot {
        /// Locator of the region.
        locator: String,
        /// Provider supplied reason.
        message: String,
    },

    /// The region rendered to zero pixels in at least one dimension.
    #[error("Region `{0}` has an empty content extent")]
    EmptyExtent(String),
}

/// Errors raised while decoding a dataset.
#[derive(Error, Debug)]
pub enum DatasetError {
    /// The input was not valid JSON.
    #[error("Invalid dataset JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The JSON was valid but not an array of objects.
    #[error("Dataset record {index} is not a JSON object")]
    NotAnObject {
        /// Zero-based index of the offending record.
        index: usize,
    },

    /// I/O error when reading the dataset.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while loading or validating a [`crate::config::ComposerConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// I/O error when reading a configuration file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration could not be parsed.
    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// The configuration parsed but describes an unusable layout.
    #[error("Invalid configuration value for `{field}`: {message}")]
    Invalid {
        /// Name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        message: String,
    },
}
