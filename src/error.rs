//! Error types for roster loading, selection and export.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while turning a roster into selection results.
#[derive(Debug, Error)]
pub enum SelectionError {
    /// The input has no header row at all.
    #[error("the roster is empty: no header row found")]
    EmptyInput,

    /// One or more required columns are absent from the header row.
    #[error("missing required columns in the CSV: {columns:?}")]
    MissingColumns { columns: Vec<String> },

    /// A score cell could not be read as a number.
    #[error("invalid score '{value}' on line {line}")]
    InvalidScore { line: u64, value: String },

    /// Failed to open, create or flush a file.
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed CSV or a failed CSV write.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type for selection operations.
pub type Result<T> = std::result::Result<T, SelectionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_lists_every_label() {
        let err = SelectionError::MissingColumns {
            columns: vec!["Nome do aluno".to_string(), "Qual o município?".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "missing required columns in the CSV: [\"Nome do aluno\", \"Qual o município?\"]"
        );
    }

    #[test]
    fn test_invalid_score_display() {
        let err = SelectionError::InvalidScore {
            line: 4,
            value: "dez".to_string(),
        };
        assert_eq!(err.to_string(), "invalid score 'dez' on line 4");
    }
}
