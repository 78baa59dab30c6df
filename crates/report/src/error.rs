use thiserror::Error;

use crate::model::Flavor;

/// Engine errors. All of them describe a problem with the input table.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The table satisfies no flavor; lists what the requested flavor lacks.
    #[error("missing required columns for {flavor}: {}", .missing.join(", "))]
    MissingColumns { flavor: Flavor, missing: Vec<String> },

    /// Timestamp cell could not be parsed.
    #[error("row {row}: cannot parse date/time in '{column}': '{value}'")]
    Timestamp { row: usize, column: String, value: String },

    /// Amount cell could not be parsed.
    #[error("row {row}: cannot parse amount in '{column}': '{value}'")]
    Amount { row: usize, column: String, value: String },
}
