//! Render functions and the registry that loads them on demand.

pub mod handler;
pub mod registry;

pub use handler::{RenderContext, RenderError, RenderFunction};
pub use registry::{FunctionRegistry, FunctionState};
