//! Configuration for [`crate::composer::ReportComposer`].

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::layout::PageGeometry;
use crate::stats::{StatisticsAggregator, MAX_STATISTICS};
use crate::writer::{DEFAULT_FONT_SIZE, DEFAULT_IMAGE_DPI};

/// Default for [`ComposerConfig::min_panel_height`], in millimetres.
pub const DEFAULT_MIN_PANEL_HEIGHT: f64 = 40.0;

/// Settings controlling layout, statistics and limits of a report export.
///
/// Every field has a default, so a configuration file only needs to list the
/// values it changes:
///
/// ```json
/// { "page": { "margin": 15.0 }, "identifier_column": "sku", "timeout_ms": 30000 }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerConfig {
    /// Page dimensions and spacing in millimetres.
    pub page: PageGeometry,
    /// Column excluded from statistics.
    pub identifier_column: String,
    /// Maximum number of summarised columns, at most [`MAX_STATISTICS`].
    pub max_statistics: usize,
    /// Optional heading printed at the top of the first page.
    pub report_title: Option<String>,
    /// Heading of the statistics summary.
    pub summary_title: String,
    /// Font size in points used by the PDF writer.
    pub font_size: u8,
    /// Resolution used to embed captured images.
    pub image_dpi: f64,
    /// Smallest panel height in millimetres worth starting on the current
    /// page. With less room left, the section title and panel move to a new page.
    pub min_panel_height: f64,
    /// Abort composition when it runs longer than this many milliseconds.
    pub timeout_ms: Option<u64>,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            page: PageGeometry::default(),
            identifier_column: "id".to_owned(),
            max_statistics: MAX_STATISTICS,
            report_title: None,
            summary_title: "Statistical Summary".to_owned(),
            font_size: DEFAULT_FONT_SIZE,
            image_dpi: DEFAULT_IMAGE_DPI,
            min_panel_height: DEFAULT_MIN_PANEL_HEIGHT,
            timeout_ms: None,
        }
    }
}

impl ComposerConfig {
    /// Creates a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a JSON configuration file and validates it.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the page geometry.
    pub fn with_page(mut self, page: PageGeometry) -> Self {
        self.page = page;
        self
    }

    /// Sets the identifier column excluded from statistics.
    pub fn with_identifier_column(mut self, column: impl Into<String>) -> Self {
        self.identifier_column = column.into();
        self
    }

    /// Caps the number of summarised columns. Values above
    /// [`MAX_STATISTICS`] are clamped.
    pub fn with_max_statistics(mut self, max_statistics: usize) -> Self {
        self.max_statistics = max_statistics.min(MAX_STATISTICS);
        self
    }

    /// Sets the smallest panel height started on a partly filled page.
    pub fn with_min_panel_height(mut self, min_panel_height: f64) -> Self {
        self.min_panel_height = min_panel_height;
        self
    }

    /// Sets the heading printed on the first page.
    pub fn with_report_title(mut self, title: impl Into<Option<String>>) -> Self {
        self.report_title = title.into();
        self
    }

    /// Sets the heading of the statistics summary.
    pub fn with_summary_title(mut self, title: impl Into<String>) -> Self {
        self.summary_title = title.into();
        self
    }

    /// Sets the caller-level timeout, rounded up to whole milliseconds.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout_ms = timeout.map(|timeout| {
            let millis = (timeout.as_nanos() + 999_999) / 1_000_000;
            u64::try_from(millis).unwrap_or(u64::MAX)
        });
        self
    }

    /// Caller-level timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Builds the statistics aggregator described by this configuration.
    pub fn aggregator(&self) -> StatisticsAggregator {
        StatisticsAggregator::new(self.identifier_column.clone())
            .with_max_columns(self.max_statistics)
    }

    /// Rejects geometry that leaves no room for content and limits outside
    /// their supported range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let page = &self.page;
        if page.margin < 0.0 {
            return Err(invalid("page.margin", "must not be negative"));
        }
        if page.usable_width() <= 0.0 {
            return Err(invalid(
                "page.width",
                format!("{} mm leaves no room between margins", page.width),
            ));
        }
        if page.usable_height() <= 0.0 {
            return Err(invalid(
                "page.height",
                format!("{} mm leaves no room between margins", page.height),
            ));
        }
        if page.line_height <= 0.0 || page.line_height > page.usable_height() {
            return Err(invalid(
                "page.line_height",
                "must be positive and fit on a page",
            ));
        }
        if page.block_spacing < 0.0 {
            return Err(invalid("page.block_spacing", "must not be negative"));
        }
        if self.image_dpi <= 0.0 {
            return Err(invalid("image_dpi", "must be positive"));
        }
        if self.font_size == 0 {
            return Err(invalid("font_size", "must be positive"));
        }
        if self.max_statistics > MAX_STATISTICS {
            return Err(invalid(
                "max_statistics",
                format!("must not exceed {}", MAX_STATISTICS),
            ));
        }
        if self.min_panel_height.is_nan() || self.min_panel_height < 0.0 {
            return Err(invalid("min_panel_height", "must not be negative"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: ComposerConfig =
            serde_json::from_str(r#"{"page": {"margin": 15.0}, "timeout_ms": 30000}"#)
                .expect("parse");
        assert_eq!(config.page.margin, 15.0);
        assert_eq!(config.page.width, 210.0);
        assert_eq!(config.identifier_column, "id");
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_margins_wider_than_page() {
        let config = ComposerConfig::new().with_page(PageGeometry::a4().with_margin(120.0));
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "page.width", .. }));
    }

    #[test]
    fn rejects_zero_line_height() {
        let config = ComposerConfig::new().with_page(PageGeometry::a4().with_line_height(0.0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("report.json");
        std::fs::write(&path, r#"{"identifier_column": "sku", "max_statistics": 3}"#)
            .expect("write");
        let config = ComposerConfig::from_json_file(&path).expect("load");
        let aggregator = config.aggregator();
        assert_eq!(aggregator.identifier_column(), "sku");
        assert_eq!(config.max_statistics, 3);
    }

    #[test]
    fn sub_second_timeout_keeps_millisecond_precision() {
        let config = ComposerConfig::new().with_timeout(Some(Duration::from_millis(500)));
        assert_eq!(config.timeout(), Some(Duration::from_millis(500)));

        let config = ComposerConfig::new().with_timeout(Some(Duration::from_millis(1500)));
        assert_eq!(config.timeout(), Some(Duration::from_millis(1500)));

        let config = ComposerConfig::new().with_timeout(Some(Duration::from_micros(10)));
        assert_eq!(config.timeout(), Some(Duration::from_millis(1)));
    }

    #[test]
    fn statistics_cap_cannot_exceed_ten() {
        let config = ComposerConfig::new().with_max_statistics(20);
        assert_eq!(config.max_statistics, MAX_STATISTICS);

        let config: ComposerConfig =
            serde_json::from_str(r#"{"max_statistics": 50}"#).expect("parse");
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "max_statistics", .. }));
    }

    #[test]
    fn rejects_negative_min_panel_height() {
        let config = ComposerConfig::new().with_min_panel_height(-1.0);
        assert!(config.validate().is_err());
    }
}
