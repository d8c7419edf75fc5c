//! Error taxonomy for analysis runs.
//!
//! Only three conditions are errors. A path query that never matches is not
//! one of them: extraction simply yields `None` and the caller carries on with
//! less information.

use std::path::Path;

/// Errors surfaced by schema loading, tree loading and report building.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// A per-file syntax tree could not be decoded. The file is skipped; the
    /// run continues.
    #[error("malformed syntax tree {path}: {reason}")]
    MalformedInput { path: String, reason: String },

    /// The selector schema is absent or structurally invalid. Fatal before any
    /// file is processed.
    #[error("invalid selector schema: {0}")]
    Configuration(String),

    /// A schema or tree source could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl AnalysisError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        AnalysisError::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn malformed(path: &Path, reason: impl std::fmt::Display) -> Self {
        AnalysisError::MalformedInput {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = AnalysisError::malformed(Path::new("a/b.py.json"), "expected value");
        assert_eq!(
            err.to_string(),
            "malformed syntax tree a/b.py.json: expected value"
        );

        let err = AnalysisError::Configuration("both polarities defined".to_string());
        assert!(err.to_string().contains("both polarities"));
    }
}
