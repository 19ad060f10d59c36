//! Render function trait and context.

use crate::edge::{EdgeRequest, EdgeResponse};
use async_trait::async_trait;
use std::collections::HashMap;

/// Execution context for render functions.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    /// Variables injected from the origin's custom headers.
    pub env: HashMap<String, String>,
    /// Source file being rendered.
    pub source: String,
    /// Request ID for tracing.
    pub request_id: String,
}

impl RenderContext {
    /// Create a new render context.
    pub fn new(source: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            env: HashMap::new(),
            source: source.into(),
            request_id: request_id.into(),
        }
    }

    /// Add an environment variable.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Get an environment variable.
    pub fn get_env(&self, key: &str) -> Option<&String> {
        self.env.get(key)
    }
}

/// A compiled page or API route.
///
/// `render` receives the response by value and must finish it with
/// [`EdgeResponse::end`]; it may do so from a spawned task after returning.
#[async_trait]
pub trait RenderFunction: Send + Sync {
    /// Called once, the first time the source is resolved.
    async fn on_load(&mut self, ctx: &RenderContext) -> Result<(), RenderError> {
        let _ = ctx;
        Ok(())
    }

    /// Handle one request.
    async fn render(
        &self,
        request: EdgeRequest,
        response: EdgeResponse,
        ctx: &RenderContext,
    ) -> Result<(), RenderError>;

    /// Source file this function was built from, e.g. `pages/index.js`.
    fn source(&self) -> &str;
}

/// Error returned by a render function.
#[derive(Debug, Clone)]
pub struct RenderError {
    /// Error message.
    pub message: String,
    /// Status code suggested to the platform.
    pub code: u16,
}

impl RenderError {
    /// Create a new RenderError.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: 500,
        }
    }

    /// Create a RenderError with a specific code.
    pub fn with_code(code: u16, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_code(400, message)
    }
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for RenderError {}

impl From<std::io::Error> for RenderError {
    fn from(err: std::io::Error) -> Self {
        RenderError::new(err.to_string())
    }
}

impl From<serde_json::Error> for RenderError {
    fn from(err: serde_json::Error) -> Self {
        RenderError::bad_request(err.to_string())
    }
}

impl From<crate::error::EdgeError> for RenderError {
    fn from(err: crate::error::EdgeError) -> Self {
        RenderError::new(err.to_string())
    }
}
