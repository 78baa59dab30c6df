use thiserror::Error;

/// Spreadsheet and archive IO failures.
#[derive(Debug, Error)]
pub enum IoError {
    /// Input bytes are not a readable workbook.
    #[error("cannot read workbook: {0}")]
    Workbook(String),

    /// Workbook has no sheets, or the first sheet has no header row.
    #[error("workbook has no data: {0}")]
    EmptyWorkbook(String),

    /// Writing a report workbook failed.
    #[error("cannot write report '{name}': {message}")]
    ReportWrite { name: String, message: String },

    /// Nothing to package.
    #[error("no output files to archive")]
    NothingToArchive,

    /// An entry could not be located (empty blob or duplicate name).
    #[error("archive entry '{0}' is missing or empty")]
    MissingEntry(String),

    #[error("duplicate archive entry '{0}'")]
    DuplicateEntry(String),

    /// Zip writer or post-write verification failure.
    #[error("archive error: {0}")]
    Archive(String),

    /// Scratch area could not be created or written.
    #[error("scratch area error: {0}")]
    Scratch(#[from] std::io::Error),
}
