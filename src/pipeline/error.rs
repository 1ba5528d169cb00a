//! Pipeline error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::AssetCategory;
use crate::remote::RemoteError;

/// Errors produced while running a pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Source could not be compiled/bundled/compressed. No output was written.
    #[error("{}: {message}", .path.display())]
    Compile { path: PathBuf, message: String },

    #[error("IO error on `{}`", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("cannot expand source patterns")]
    Sources(#[source] anyhow::Error),

    #[error("upload to `{dir}` failed")]
    Remote {
        dir: String,
        #[source]
        source: RemoteError,
    },

    /// One or more groups of a task failed; the rest completed.
    #[error("{category}: {} of {total} failed", .failures.len())]
    Failed {
        category: AssetCategory,
        total: usize,
        failures: Vec<PipelineError>,
    },
}

impl PipelineError {
    pub fn compile(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Compile {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Individual failures, flattening `Failed`.
    pub fn failures(&self) -> Vec<&PipelineError> {
        match self {
            Self::Failed { failures, .. } => failures.iter().flat_map(Self::failures).collect(),
            other => vec![other],
        }
    }

    /// Full message including the source chain, for terminal and overlay.
    pub fn detail(&self) -> String {
        let mut message = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            message.push_str(&format!("\n  caused by: {err}"));
            source = err.source();
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_display_counts_failures() {
        let err = PipelineError::Failed {
            category: AssetCategory::Images,
            total: 5,
            failures: vec![
                PipelineError::compile("a.png", "bad header"),
                PipelineError::compile("b.png", "truncated"),
            ],
        };
        assert_eq!(err.to_string(), "images: 2 of 5 failed");
        assert_eq!(err.failures().len(), 2);
    }

    #[test]
    fn test_detail_includes_source_chain() {
        let err = PipelineError::Io(
            PathBuf::from("build/css/app.min.css"),
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let detail = err.detail();
        assert!(detail.contains("app.min.css"));
        assert!(detail.contains("denied"));
    }
}
