//! Registry of render functions keyed by source file.
//!
//! Resolving a source to its function is the analogue of loading the page
//! bundle: the first invocation runs `on_load`, later ones reuse the loaded
//! function.

use crate::edge::{EdgeRequest, EdgeResponse};
use crate::error::EdgeError;
use crate::function::handler::{RenderContext, RenderFunction};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

/// State of a function in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionState {
    /// Registered but not loaded.
    Unloaded,
    /// `on_load` is running.
    Loading,
    /// Ready to render.
    Ready,
}

struct FunctionEntry {
    function: Arc<RwLock<Box<dyn RenderFunction>>>,
    state: FunctionState,
}

/// Registry mapping source files to render functions.
#[derive(Default)]
pub struct FunctionRegistry {
    functions: RwLock<HashMap<String, FunctionEntry>>,
}

impl FunctionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function under its [`source`](RenderFunction::source).
    pub async fn register(&self, function: Box<dyn RenderFunction>) -> Result<(), EdgeError> {
        let source = function.source().to_string();
        let mut functions = self.functions.write().await;

        if functions.contains_key(&source) {
            return Err(EdgeError::DuplicateSource(source));
        }

        functions.insert(
            source.clone(),
            FunctionEntry {
                function: Arc::new(RwLock::new(function)),
                state: FunctionState::Unloaded,
            },
        );
        info!("Registered render function: {}", source);
        Ok(())
    }

    /// Load a function if it is not loaded yet.
    pub async fn load(&self, source: &str, ctx: &RenderContext) -> Result<(), EdgeError> {
        let function = {
            let mut functions = self.functions.write().await;
            let entry = functions
                .get_mut(source)
                .ok_or_else(|| EdgeError::UnknownSource(source.to_string()))?;

            match entry.state {
                FunctionState::Ready => return Ok(()),
                FunctionState::Loading => {
                    debug!("'{}' is already loading", source);
                }
                FunctionState::Unloaded => entry.state = FunctionState::Loading,
            }
            entry.function.clone()
        };

        // The write guard serializes concurrent loaders of the same source.
        let mut func = function.write().await;
        if self.get_state(source).await == Some(FunctionState::Ready) {
            return Ok(());
        }

        if let Err(e) = func.on_load(ctx).await {
            error!("Failed to load '{}': {}", source, e);
            self.set_state(source, FunctionState::Unloaded).await;
            return Err(EdgeError::Render {
                page: source.to_string(),
                error: e,
            });
        }

        self.set_state(source, FunctionState::Ready).await;
        info!("Loaded render function: {}", source);
        Ok(())
    }

    /// Load if needed, then render.
    pub async fn execute(
        &self,
        source: &str,
        request: EdgeRequest,
        response: EdgeResponse,
        ctx: &RenderContext,
    ) -> Result<(), EdgeError> {
        self.load(source, ctx).await?;

        let function = {
            let functions = self.functions.read().await;
            functions
                .get(source)
                .map(|e| e.function.clone())
                .ok_or_else(|| EdgeError::UnknownSource(source.to_string()))?
        };

        let func = function.read().await;
        func.render(request, response, ctx)
            .await
            .map_err(|error| EdgeError::Render {
                page: source.to_string(),
                error,
            })
    }

    /// Whether a source has a registered function.
    pub async fn contains(&self, source: &str) -> bool {
        self.functions.read().await.contains_key(source)
    }

    /// Get the state of a function.
    pub async fn get_state(&self, source: &str) -> Option<FunctionState> {
        let functions = self.functions.read().await;
        functions.get(source).map(|e| e.state)
    }

    /// List all registered sources.
    pub async fn list(&self) -> Vec<(String, FunctionState)> {
        let functions = self.functions.read().await;
        let mut list: Vec<_> = functions
            .iter()
            .map(|(source, entry)| (source.clone(), entry.state))
            .collect();
        list.sort_by(|a, b| a.0.cmp(&b.0));
        list
    }

    async fn set_state(&self, source: &str, state: FunctionState) {
        let mut functions = self.functions.write().await;
        if let Some(entry) = functions.get_mut(source) {
            entry.state = state;
        }
    }
}
