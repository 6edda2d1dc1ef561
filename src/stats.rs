//! Descriptive statistics over the numeric columns of a [`Dataset`].

use log::debug;

use crate::model::Dataset;

/// Upper bound on the number of summarised columns.
pub const MAX_STATISTICS: usize = 10;

/// Aggregates for a single numeric column.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnStatistic {
    /// Column name.
    pub column: String,
    /// Arithmetic mean over every record.
    pub average: f64,
    /// Smallest value.
    pub min: f64,
    /// Largest value.
    pub max: f64,
    /// Number of records the aggregates were computed over.
    pub sample_count: usize,
}

/// Computes [`ColumnStatistic`]s for a dataset.
#[derive(Clone, Debug)]
pub struct StatisticsAggregator {
    identifier_column: String,
    max_columns: usize,
}

impl Default for StatisticsAggregator {
    fn default() -> Self {
        Self {
            identifier_column: "id".to_owned(),
            max_columns: MAX_STATISTICS,
        }
    }
}

impl StatisticsAggregator {
    /// Creates an aggregator that skips `identifier_column`.
    pub fn new(identifier_column: impl Into<String>) -> Self {
        Self {
            identifier_column: identifier_column.into(),
            ..Self::default()
        }
    }

    /// Caps the number of columns returned. The cap never exceeds
    /// [`MAX_STATISTICS`].
    pub fn with_max_columns(mut self, max_columns: usize) -> Self {
        self.max_columns = max_columns.min(MAX_STATISTICS);
        self
    }

    /// Returns the name of the excluded identifier column.
    pub fn identifier_column(&self) -> &str {
        &self.identifier_column
    }

    /// Summarises every numeric column, in order of first appearance.
    ///
    /// A column qualifies when it is not the identifier column and every
    /// present value coerces to a number without being the empty string.
    /// Missing values count as zero. An empty dataset yields no statistics.
    pub fn aggregate(&self, dataset: &Dataset) -> Vec<ColumnStatistic> {
        if dataset.is_empty() {
            return Vec::new();
        }

        let statistics: Vec<ColumnStatistic> = dataset
            .columns()
            .into_iter()
            .filter(|column| *column != self.identifier_column)
            .filter_map(|column| summarise_column(dataset, column))
            .take(self.max_columns)
            .collect();

        debug!(
            "Summarised {} numeric column(s) over {} record(s)",
            statistics.len(),
            dataset.len()
        );
        statistics
    }
}

fn summarise_column(dataset: &Dataset, column: &str) -> Option<ColumnStatistic> {
    let mut values = Vec::with_capacity(dataset.len());
    for record in dataset.records() {
        let value = match record.get(column) {
            Some(scalar) if scalar.is_empty_text() => return None,
            Some(scalar) => scalar.as_number()?,
            None => 0.0,
        };
        values.push(value);
    }

    let sample_count = values.len();
    let sum: f64 = values.iter().sum();
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Some(ColumnStatistic {
        column: column.to_owned(),
        average: sum / sample_count as f64,
        min,
        max,
        sample_count,
    })
}
