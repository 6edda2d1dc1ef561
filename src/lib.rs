//! Core entry point for the dashboard_report crate.
//!
//! Composes captured dashboard panels and a statistical summary of the
//! underlying dataset into a paginated PDF. See [`composer::ReportComposer`].

pub mod capture;
pub mod composer;
pub mod config;
pub mod error;
pub mod fonts;
pub mod layout;
pub mod model;
pub mod stats;
pub mod writer;

#[cfg(feature = "bookmarks")]
pub mod bookmarks;

pub use composer::{output_name, ReportArtifact, ReportComposer, ReportRequest};
pub use config::ComposerConfig;
pub use error::{CaptureUnavailable, ComposeError};
