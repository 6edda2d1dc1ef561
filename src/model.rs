//! Data structures describing the inputs of a dashboard report.
//!
//! A [`Dataset`] is the tabular data behind the dashboard, a [`Section`] names
//! one rendered panel that should appear in the report, and a
//! [`RasterSnapshot`] holds the pixels captured from such a panel.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DatasetError;

/// A single cell value.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Scalar {
    /// Textual value, possibly the empty string.
    Text(String),
    /// Numeric value.
    Number(f64),
    /// Explicitly empty cell (`null` in JSON input).
    #[default]
    Empty,
}

impl Scalar {
    /// Coerces the value into a finite number.
    ///
    /// Text is trimmed and parsed; the empty string and anything that does not
    /// parse to a finite number yields `None`. [`Scalar::Empty`] coerces to
    /// zero.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => value.is_finite().then_some(*value),
            Self::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return None;
                }
                trimmed.parse::<f64>().ok().filter(|value| value.is_finite())
            }
            Self::Empty => Some(0.0),
        }
    }

    /// Returns `true` for the empty string.
    pub fn is_empty_text(&self) -> bool {
        matches!(self, Self::Text(text) if text.is_empty())
    }

    fn from_json(value: Value) -> Self {
        match value {
            Value::Null => Self::Empty,
            Value::Number(number) => number
                .as_f64()
                .map(Self::Number)
                .unwrap_or_else(|| Self::Text(number.to_string())),
            Value::String(text) => Self::Text(text),
            other => Self::Text(other.to_string()),
        }
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// One row of the dataset: column names mapped to values, in insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Scalar)>,
}

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a column value and returns the updated record.
    ///
    /// Setting an existing column replaces its value in place.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.insert(column, value);
        self
    }

    /// Sets a column value, keeping the original position of existing columns.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Scalar>) {
        let column = column.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| *name == column) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((column, value)),
        }
    }

    /// Returns the value stored under `column`.
    pub fn get(&self, column: &str) -> Option<&Scalar> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Returns the column names in insertion order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Returns the number of columns in the record.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` when the record has no columns.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Ordered collection of records.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    records: Vec<Record>,
}

impl Dataset {
    /// Creates a dataset from the given records.
    pub fn new(records: impl Into<Vec<Record>>) -> Self {
        Self {
            records: records.into(),
        }
    }

    /// Decodes a JSON array of objects, keeping each object's key order.
    pub fn from_json_str(input: &str) -> Result<Self, DatasetError> {
        let rows: Vec<Value> = serde_json::from_str(input)?;
        let mut records = Vec::with_capacity(rows.len());
        for (index, row) in rows.into_iter().enumerate() {
            let Value::Object(object) = row else {
                return Err(DatasetError::NotAnObject { index });
            };
            let mut record = Record::new();
            for (column, value) in object {
                record.insert(column, Scalar::from_json(value));
            }
            records.push(record);
        }
        Ok(Self { records })
    }

    /// Reads and decodes a JSON dataset file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Returns the records.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` when the dataset has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Union of column names across all records.
    ///
    /// Columns of the first record come first in their original order, followed
    /// by columns that only appear later, in order of first appearance.
    pub fn columns(&self) -> Vec<&str> {
        let mut columns: Vec<&str> = Vec::new();
        for record in &self.records {
            for column in record.columns() {
                if !columns.contains(&column) {
                    columns.push(column);
                }
            }
        }
        columns
    }
}

/// Static descriptor of a dashboard panel to include in the report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    id: String,
    title: String,
    #[serde(alias = "regionLocator")]
    region_locator: String,
}

impl Section {
    /// Creates a new section descriptor.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        region_locator: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            region_locator: region_locator.into(),
        }
    }

    /// Returns the section identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the title printed above the captured panel.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the locator handed to the region provider.
    pub fn region_locator(&self) -> &str {
        &self.region_locator
    }

    /// Reads an ordered JSON array of sections.
    pub fn list_from_json_file(path: impl AsRef<Path>) -> Result<Vec<Self>, DatasetError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

/// Pixels captured from a visual region.
///
/// The snapshot always covers the region's full content extent, independent of
/// how much of it was visible on screen.
#[derive(Clone, Debug, PartialEq)]
pub struct RasterSnapshot {
    pixels: image::RgbaImage,
}

impl RasterSnapshot {
    /// Wraps an RGBA pixel buffer.
    pub fn new(pixels: image::RgbaImage) -> Self {
        Self { pixels }
    }

    /// Creates a snapshot of the given size filled with a single colour.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self::new(image::RgbaImage::from_pixel(width, height, image::Rgba(rgba)))
    }

    /// Width in pixels.
    pub fn pixel_width(&self) -> u32 {
        self.pixels.width()
    }

    /// Height in pixels.
    pub fn pixel_height(&self) -> u32 {
        self.pixels.height()
    }

    /// Returns the underlying pixel buffer.
    pub fn pixels(&self) -> &image::RgbaImage {
        &self.pixels
    }

    /// Consumes the snapshot, returning the pixel buffer.
    pub fn into_pixels(self) -> image::RgbaImage {
        self.pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_coercion_follows_numeric_rules() {
        assert_eq!(Scalar::from(" 12.5 ").as_number(), Some(12.5));
        assert_eq!(Scalar::from("").as_number(), None);
        assert_eq!(Scalar::from("abc").as_number(), None);
        assert_eq!(Scalar::from("NaN").as_number(), None);
        assert_eq!(Scalar::Empty.as_number(), Some(0.0));
    }

    #[test]
    fn json_preserves_key_order_and_maps_null() {
        let dataset =
            Dataset::from_json_str(r#"[{"zeta": 1, "alpha": null, "mid": "x"}]"#).expect("parse");
        let record = &dataset.records()[0];
        assert_eq!(record.columns().collect::<Vec<_>>(), ["zeta", "alpha", "mid"]);
        assert_eq!(record.get("alpha"), Some(&Scalar::Empty));
        assert_eq!(record.get("zeta"), Some(&Scalar::Number(1.0)));
    }

    #[test]
    fn json_rejects_non_object_rows() {
        let err = Dataset::from_json_str("[1]").unwrap_err();
        assert!(matches!(err, DatasetError::NotAnObject { index: 0 }));
    }

    #[test]
    fn columns_follow_first_appearance() {
        let dataset = Dataset::new(vec![
            Record::new().with("b", 1.0).with("a", 2.0),
            Record::new().with("c", 3.0).with("a", 4.0),
        ]);
        assert_eq!(dataset.columns(), ["b", "a", "c"]);
    }

    #[test]
    fn section_accepts_camel_case_locator() {
        let sections: Vec<Section> =
            serde_json::from_str(r#"[{"id": "kpi", "title": "KPIs", "regionLocator": "kpi-cards"}]"#)
                .expect("parse");
        assert_eq!(sections[0].region_locator(), "kpi-cards");
    }
}
