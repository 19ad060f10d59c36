//! # nextfront - Serverless Next.js at the CDN edge
//!
//! nextfront prepares a serverless Next.js build for CloudFront Lambda@Edge
//! and serves it there.
//!
//! ## Architecture
//!
//! ```text
//! build time                                request time
//! ┌───────────────────────┐                 ┌──────────────────────────────┐
//! │ .next/serverless/     │                 │ CloudFront origin-request    │
//! │   pages-manifest.json │                 └──────────────┬───────────────┘
//! │ prerender-manifest    │                                │
//! │ public/               │                                ▼
//! └──────────┬────────────┘                 ┌──────────────────────────────┐
//!            │ ManifestBuilder              │ PageHandler / ApiHandler     │
//!            ▼                              │   Router::resolve            │
//! ┌───────────────────────┐   manifest.json │   ├─ static: rewrite to S3   │
//! │ default-lambda/       │ ──────────────▶ │   └─ dynamic: adapt + render │
//! │ api-lambda/           │                 │      via FunctionRegistry    │
//! └───────────────────────┘                 └──────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use nextfront::prelude::*;
//! use std::sync::Arc;
//!
//! #[render_function(source = "pages/index.js")]
//! async fn index_page(
//!     _req: EdgeRequest,
//!     mut res: EdgeResponse,
//!     _ctx: &RenderContext,
//! ) -> Result<(), RenderError> {
//!     res.set_header("cache-control", "max-age=60");
//!     res.set_platform_header("content-type", "text/html");
//!     res.end_with("<h1>Hello from the edge</h1>");
//!     Ok(())
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let registry = Arc::new(FunctionRegistry::new());
//!     registry.register(Box::new(IndexPage::new())).await?;
//!
//!     let pages = PageHandler::from_dir(
//!         ".aws-next/default-lambda",
//!         registry,
//!         HandlerConfig::default(),
//!     )?;
//!     EdgeEmulator::new(EmulatorConfig::default(), pages).run().await
//! }
//! ```

// Lets the generated code of `render_function` resolve inside this crate.
extern crate self as nextfront;

pub mod edge;
pub mod error;
pub mod function;
pub mod manifest;
pub mod routing;
pub mod runtime;

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::edge::{adapt, CloudFrontEvent, EdgeOutcome, EdgeRequest, EdgeResponse};
    pub use crate::error::{EdgeError, Result};
    pub use crate::function::{FunctionRegistry, RenderContext, RenderError, RenderFunction};
    pub use crate::manifest::{ManifestBuilder, RouteManifest, SourceFile};
    pub use crate::routing::Router;
    pub use crate::runtime::{
        ApiHandler, BuildConfig, EdgeEmulator, EmulatorConfig, HandlerConfig, PageHandler,
    };
    pub use async_trait::async_trait;
    pub use nextfront_macro::render_function;
}

pub use error::{EdgeError, Result};
pub use nextfront_macro::render_function;
pub use runtime::{ApiHandler, PageHandler};
