//! The [`InsertionError`] and [`AttributeError`] definitions and error messages.
//!
use polars::prelude::PolarsError;
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Errors raised while decoding a single annotation-attribute string.
///
/// These only arise for a sub-record that *is* tagged as a gene feature; an
/// annotation string without any gene-marked sub-record is a legitimate empty
/// result, not an error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AttributeError {
    #[error("gene-marked sub-record is missing the '{delimiter}' delimiter: {sub_record:?}")]
    MissingDelimiter {
        delimiter: &'static str,
        sub_record: String,
    },
    #[error("gene-marked sub-record has an empty {field}: {sub_record:?}")]
    EmptyValue {
        field: &'static str,
        sub_record: String,
    },
}

/// The [`InsertionError`] defines the standard set of errors that should
/// be passed to the user.
#[derive(Debug, Error)]
pub enum InsertionError {
    // Input presence
    #[error("required input file(s) not found: {}", display_paths(.0))]
    MissingInputs(Vec<PathBuf>),

    // Annotation / table parsing
    #[error("malformed annotation attributes on overlap row {row}: {source}")]
    MalformedAttribute {
        row: usize,
        #[source]
        source: AttributeError,
    },
    #[error("the template table {path:?} has no '{column}' column to join on")]
    MissingKeyColumn { column: String, path: PathBuf },
    #[error("could not parse GFF3 record in {path:?}: {reason}")]
    Gff { path: PathBuf, reason: String },

    // Overlap engine
    #[error("could not start overlap engine '{program}': {source}")]
    EngineSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("overlap engine exited with {status}: {stderr}")]
    EngineFailed { status: ExitStatus, stderr: String },
    #[error("overlap engine '{0}' produced no output")]
    EngineNoOutput(String),

    // IO related errors
    #[error("File reading error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Table error: {0}")]
    Polars(#[from] PolarsError),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl InsertionError {
    /// Returns `true` for errors that mean the input data violates its format contract,
    /// as opposed to environment problems (missing files, a failing engine, IO).
    pub fn is_format_violation(&self) -> bool {
        matches!(
            self,
            InsertionError::MalformedAttribute { .. }
                | InsertionError::MissingKeyColumn { .. }
                | InsertionError::Gff { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_inputs_lists_every_path() {
        let err = InsertionError::MissingInputs(vec![
            PathBuf::from("template.csv"),
            PathBuf::from("gff_genomics.pl"),
        ]);
        assert_eq!(
            err.to_string(),
            "required input file(s) not found: template.csv, gff_genomics.pl"
        );
        assert!(!err.is_format_violation());
    }

    #[test]
    fn test_malformed_attribute_carries_row() {
        let err = InsertionError::MalformedAttribute {
            row: 3,
            source: AttributeError::MissingDelimiter {
                delimiter: "Strand:",
                sub_record: "ID=g1;logic_name=cshl_gene".to_string(),
            },
        };
        assert!(err.to_string().starts_with("malformed annotation attributes on overlap row 3"));
        assert!(err.is_format_violation());
    }
}
