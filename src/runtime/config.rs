//! Build, handler and emulator configuration.

use crate::routing::DEFAULT_ERROR_PAGE;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Where the builder reads upstream output and writes artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Upstream build directory (`.next`).
    pub next_dir: PathBuf,
    /// Public static files root.
    pub public_dir: PathBuf,
    /// Deployable output directory.
    pub out_dir: PathBuf,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            next_dir: PathBuf::from(".next"),
            public_dir: PathBuf::from("public"),
            out_dir: PathBuf::from(".aws-next"),
        }
    }
}

impl BuildConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.next_dir = dir.into();
        self
    }

    pub fn public_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.public_dir = dir.into();
        self
    }

    pub fn out_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.out_dir = dir.into();
        self
    }

    /// Upstream serverless target output.
    pub fn serverless_dir(&self) -> PathBuf {
        self.next_dir.join("serverless")
    }

    /// Output directory of the page function.
    pub fn default_lambda_dir(&self) -> PathBuf {
        self.out_dir.join("default-lambda")
    }

    /// Output directory of the API function.
    pub fn api_lambda_dir(&self) -> PathBuf {
        self.out_dir.join("api-lambda")
    }
}

/// Per-deployment settings of the edge entry points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerConfig {
    /// Origin custom headers with this prefix become environment variables.
    pub env_prefix: String,
    /// Fallback source of the page function.
    pub error_page: String,
    /// Fallback source of the API function.
    pub api_error_page: String,
    /// Origin path of pre-rendered pages in storage.
    pub static_pages_path: String,
    /// Origin path of public files in storage.
    pub public_path: String,
    /// Also export injected variables to the process environment.
    pub export_process_env: bool,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            env_prefix: "x-env-".to_string(),
            error_page: DEFAULT_ERROR_PAGE.to_string(),
            api_error_page: DEFAULT_ERROR_PAGE.to_string(),
            static_pages_path: "/static-pages".to_string(),
            public_path: "/public".to_string(),
            export_process_env: true,
        }
    }
}

impl HandlerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error_page(mut self, source: impl Into<String>) -> Self {
        self.error_page = source.into();
        self
    }

    pub fn api_error_page(mut self, source: impl Into<String>) -> Self {
        self.api_error_page = source.into();
        self
    }

    pub fn export_process_env(mut self, export: bool) -> Self {
        self.export_process_env = export;
        self
    }
}

/// Configuration for the local edge emulator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmulatorConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Local directory standing in for the storage bucket.
    pub storage_dir: PathBuf,
    /// Domain name reported for the storage origin.
    pub s3_domain: String,
    /// Origin custom headers added to every event.
    pub custom_headers: BTreeMap<String, String>,
    /// Maximum request body size in bytes.
    pub max_body_size: usize,
    /// Invocation timeout in seconds.
    pub request_timeout: u64,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            storage_dir: PathBuf::from(".aws-next/s3"),
            s3_domain: "local-bucket.s3.amazonaws.com".to_string(),
            custom_headers: BTreeMap::new(),
            max_body_size: 1024 * 1024, // 1MB, the Lambda@Edge body limit
            request_timeout: 30,
        }
    }
}

impl EmulatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = dir.into();
        self
    }

    /// Add an origin custom header.
    pub fn custom_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_headers.insert(name.into(), value.into());
        self
    }

    pub fn request_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout = seconds;
        self
    }

    /// Get the bind address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
