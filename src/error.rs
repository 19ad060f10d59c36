//! Crate-wide error type.

use crate::function::RenderError;
use std::path::PathBuf;
use thiserror::Error;

/// Hint attached to every missing build artifact.
pub const BUILD_MODE_HINT: &str =
    "make sure you ran `next build` and that `next.config.js` target is set to 'serverless'";

/// Errors produced while building manifests or serving an edge invocation.
#[derive(Debug, Error)]
pub enum EdgeError {
    /// An upstream build artifact is absent.
    #[error("{} not found. {hint}", .path.display())]
    MissingArtifact {
        /// The file or directory that was expected.
        path: PathBuf,
        /// Remediation hint for the operator.
        hint: &'static str,
    },

    /// A route could not be turned into a pattern.
    #[error("invalid route pattern `{route}`: {reason}")]
    InvalidPattern { route: String, reason: String },

    /// The inbound edge event is malformed.
    #[error("invalid edge event: {0}")]
    InvalidEvent(String),

    /// The synthetic response was used incorrectly by a render function.
    #[error("response misuse: {0}")]
    AdapterMisuse(String),

    /// The router resolved a source that has no registered render function.
    #[error("no render function registered for `{0}`")]
    UnknownSource(String),

    /// Two render functions claim the same source.
    #[error("render function for `{0}` is already registered")]
    DuplicateSource(String),

    /// A render function returned an error.
    #[error("render function `{page}` failed: {error}")]
    Render { page: String, error: RenderError },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Regex(#[from] regex::Error),
}

impl EdgeError {
    /// Build a `MissingArtifact` error with the standard build-mode hint.
    pub fn missing(path: impl Into<PathBuf>) -> Self {
        EdgeError::MissingArtifact {
            path: path.into(),
            hint: BUILD_MODE_HINT,
        }
    }
}

/// Convenience alias used across the crate.
pub type Result<T, E = EdgeError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_artifact_mentions_hint() {
        let err = EdgeError::missing(".next/serverless/pages-manifest.json");
        let message = err.to_string();
        assert!(message.starts_with(".next/serverless/pages-manifest.json not found"));
        assert!(message.contains("serverless"));
    }

    #[test]
    fn test_render_error_display() {
        let err = EdgeError::Render {
            page: "pages/index.js".to_string(),
            error: RenderError::new("boom"),
        };
        assert_eq!(err.to_string(), "render function `pages/index.js` failed: [500] boom");
    }
}
