//! Local edge emulator.
//!
//! Plays the role of CloudFront in front of the two entry points: every
//! HTTP request becomes an origin-request event, `/api/` paths go to the API
//! function and everything else to the page function. Forwarded requests are
//! served from a local directory standing in for the storage bucket.

use crate::edge::event::{CfBody, CfOrigin, OriginTarget};
use crate::edge::{CfHeader, CfHeaders, CfRequest, CfResponse, CloudFrontEvent, EdgeOutcome};
use crate::runtime::{ApiHandler, EmulatorConfig, PageHandler};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

/// Paths with this prefix are routed to the API function.
const API_PATH_PREFIX: &str = "/api/";

struct Handlers {
    pages: PageHandler,
    apis: Option<ApiHandler>,
}

/// HTTP server emulating the CDN in front of the entry points.
pub struct EdgeEmulator {
    config: EmulatorConfig,
    handlers: Arc<Handlers>,
}

impl EdgeEmulator {
    /// Emulator with only the page function.
    pub fn new(config: EmulatorConfig, pages: PageHandler) -> Self {
        Self {
            config,
            handlers: Arc::new(Handlers { pages, apis: None }),
        }
    }

    /// Emulator with both functions.
    pub fn with_apis(config: EmulatorConfig, pages: PageHandler, apis: ApiHandler) -> Self {
        Self {
            config,
            handlers: Arc::new(Handlers {
                pages,
                apis: Some(apis),
            }),
        }
    }

    pub fn config(&self) -> &EmulatorConfig {
        &self.config
    }

    /// Start the HTTP server.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr: SocketAddr = self.config.bind_addr().parse()?;
        let listener = TcpListener::bind(addr).await?;

        info!("Edge emulator listening on {}", addr);
        info!("Serving storage from {}", self.config.storage_dir.display());

        let config = Arc::new(self.config);
        let handlers = self.handlers;

        loop {
            let (stream, remote_addr) = listener.accept().await?;
            let io = TokioIo::new(stream);

            let handlers = handlers.clone();
            let config = config.clone();

            tokio::task::spawn(async move {
                let service = service_fn(move |req| {
                    let handlers = handlers.clone();
                    let config = config.clone();
                    async move { handle_request(req, handlers, config, remote_addr).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    error!("Error serving connection: {:?}", err);
                }
            });
        }
    }
}

async fn handle_request(
    req: Request<Incoming>,
    handlers: Arc<Handlers>,
    config: Arc<EmulatorConfig>,
    remote_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let (parts, body) = req.into_parts();
    debug!("Handling {} {} from {}", parts.method, parts.uri, remote_addr);

    let body = match read_body(body, config.max_body_size).await {
        Ok(body) => body,
        Err(response) => return Ok(response),
    };

    let request = to_cloudfront(&parts, &body, &config, remote_addr);
    let is_api = request.uri.starts_with(API_PATH_PREFIX);
    let event = CloudFrontEvent::from_request(request);

    let invocation = async {
        match (&handlers.apis, is_api) {
            (Some(apis), true) => apis.handle(event).await,
            _ => handlers.pages.handle(event).await,
        }
    };

    let timeout = Duration::from_secs(config.request_timeout);
    let outcome = match tokio::time::timeout(timeout, invocation).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => {
            error!("Invocation failed: {}", e);
            return Ok(plain(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()));
        }
        Err(_) => {
            warn!("Invocation timed out after {:?}", timeout);
            return Ok(plain(StatusCode::GATEWAY_TIMEOUT, "Invocation timed out"));
        }
    };

    match outcome {
        EdgeOutcome::Response(response) => Ok(from_cloudfront(response)),
        EdgeOutcome::Request(forwarded) => Ok(serve_from_storage(&forwarded, &config).await),
    }
}

/// Build the origin-request the CDN would deliver for an HTTP request.
fn to_cloudfront(
    parts: &hyper::http::request::Parts,
    body: &Bytes,
    config: &EmulatorConfig,
    remote_addr: SocketAddr,
) -> CfRequest {
    let mut headers = CfHeaders::new();
    for (name, value) in &parts.headers {
        if let Ok(v) = value.to_str() {
            headers
                .entry(name.as_str().to_string())
                .or_default()
                .push(CfHeader::new(name.as_str(), v));
        }
    }

    let custom_headers = config
        .custom_headers
        .iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), vec![CfHeader::new(name, value)]))
        .collect();

    let body = (!body.is_empty()).then(|| CfBody {
        data: STANDARD.encode(body),
        ..Default::default()
    });

    CfRequest {
        client_ip: Some(remote_addr.ip().to_string()),
        uri: parts.uri.path().to_string(),
        method: parts.method.as_str().to_string(),
        querystring: parts.uri.query().unwrap_or_default().to_string(),
        headers,
        body,
        origin: Some(CfOrigin {
            s3: Some(OriginTarget {
                domain_name: config.s3_domain.clone(),
                custom_headers,
                ..Default::default()
            }),
            custom: None,
        }),
    }
}

/// Turn a generated response back into HTTP.
fn from_cloudfront(response: CfResponse) -> Response<Full<Bytes>> {
    let status = StatusCode::from_u16(response.status).unwrap_or_else(|_| {
        warn!(
            "Invalid status code {}, falling back to 500 Internal Server Error",
            response.status
        );
        StatusCode::INTERNAL_SERVER_ERROR
    });

    let body = if response.body_encoding == "base64" {
        match STANDARD.decode(response.body.as_bytes()) {
            Ok(decoded) => Bytes::from(decoded),
            Err(e) => {
                error!("Response body is not valid base64: {}", e);
                return plain(StatusCode::INTERNAL_SERVER_ERROR, "Malformed response body");
            }
        }
    } else {
        Bytes::from(response.body)
    };

    let mut builder = Response::builder().status(status);
    for (name, values) in &response.headers {
        for header in values {
            builder = builder.header(name.as_str(), header.value.as_str());
        }
    }

    builder.body(Full::new(body)).unwrap_or_else(|e| {
        error!("Failed to build response: {}", e);
        plain(StatusCode::INTERNAL_SERVER_ERROR, "Invalid response headers")
    })
}

/// Local path of the object a forwarded request points at.
fn storage_path(root: &Path, request: &CfRequest) -> Option<PathBuf> {
    let origin_path = request
        .origin
        .as_ref()
        .and_then(|o| o.s3.as_ref())
        .map(|s3| s3.path.as_str())
        .unwrap_or_default();

    let relative = format!("{}{}", origin_path, request.uri);
    let relative = Path::new(relative.trim_start_matches('/'));
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }
    Some(root.join(relative))
}

async fn serve_from_storage(request: &CfRequest, config: &EmulatorConfig) -> Response<Full<Bytes>> {
    let Some(path) = storage_path(&config.storage_dir, request) else {
        return plain(StatusCode::BAD_REQUEST, "Invalid object key");
    };

    match tokio::fs::read(&path).await {
        Ok(contents) => {
            debug!("Serving {}", path.display());
            let mut response = Response::new(Full::new(Bytes::from(contents)));
            if let Some(content_type) = content_type(&path) {
                if let Ok(value) = content_type.parse() {
                    response.headers_mut().insert(hyper::header::CONTENT_TYPE, value);
                }
            }
            response
        }
        Err(_) => {
            debug!("No object at {}", path.display());
            plain(StatusCode::NOT_FOUND, "Not Found")
        }
    }
}

fn content_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?;
    Some(match ext {
        "html" => "text/html; charset=utf-8",
        "js" => "application/javascript",
        "css" => "text/css",
        "json" => "application/json",
        "txt" => "text/plain; charset=utf-8",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "ico" => "image/x-icon",
        _ => return None,
    })
}

/// Collect a request body, stopping as soon as it grows past `limit` bytes.
async fn read_body<B>(body: B, limit: usize) -> Result<Bytes, Response<Full<Bytes>>>
where
    B: hyper::body::Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            warn!("Request body exceeds the limit of {} bytes", limit);
            Err(plain(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large"))
        }
        Err(e) => {
            warn!("Failed to read request body: {}", e);
            Err(plain(StatusCode::BAD_REQUEST, "Failed to read request body"))
        }
    }
}

fn plain(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(message.to_string())));
    *response.status_mut() = status;
    response
}
