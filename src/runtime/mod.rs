//! Edge entry points and the local emulator that drives them.

mod config;
mod handler;
mod server;

pub use config::{BuildConfig, EmulatorConfig, HandlerConfig};
pub use handler::{env_from_origin, ApiHandler, PageHandler};
pub use server::EdgeEmulator;
