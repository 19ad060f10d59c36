//! Edge entry points for the page and API functions.

use crate::edge::event::{CfOrigin, OriginTarget};
use crate::edge::{adapt, Adapted, CfRequest, CfResponse, CloudFrontEvent, EdgeOutcome};
use crate::error::{EdgeError, Result};
use crate::function::{FunctionRegistry, RenderContext};
use crate::manifest::builder::{MANIFEST_FILE, PRERENDER_MANIFEST_FILE};
use crate::manifest::{ApiManifest, PrerenderManifest, RouteManifest, SourceFile};
use crate::routing::{normalize_path, Router};
use crate::runtime::HandlerConfig;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Collect origin custom headers carrying `prefix` as environment variables.
///
/// The prefix is matched case-insensitively and stripped; the rest of the
/// name is upper-cased. The first value of each header is used.
pub fn env_from_origin(origin: Option<&CfOrigin>, prefix: &str) -> HashMap<String, String> {
    let Some(headers) = origin.and_then(CfOrigin::custom_headers) else {
        return HashMap::new();
    };

    headers
        .iter()
        .filter_map(|(name, values)| {
            let head = name.get(..prefix.len())?;
            if !head.eq_ignore_ascii_case(prefix) {
                return None;
            }
            let key = name[prefix.len()..].to_uppercase();
            if key.is_empty() {
                warn!("Ignoring origin header {} with an empty variable name", name);
                return None;
            }
            let value = values.first()?.value.clone();
            Some((key, value))
        })
        .collect()
}

/// Whether `std::env::set_var` accepts the pair without panicking.
fn is_exportable(key: &str, value: &str) -> bool {
    !key.is_empty() && !key.contains(|c| c == '=' || c == '\0') && !value.contains('\0')
}

fn export_env(env: &HashMap<String, String>) {
    for (key, value) in env {
        if !is_exportable(key, value) {
            warn!("Not exporting environment variable {:?}: invalid name or value", key);
            continue;
        }
        std::env::set_var(key, value);
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.is_file() {
        return Err(EdgeError::missing(path));
    }
    let raw = std::fs::read(path)?;
    Ok(serde_json::from_slice(&raw)?)
}

/// Request of the first record plus the distribution's request id.
fn first_request(event: CloudFrontEvent) -> Result<(CfRequest, String)> {
    let payload = event
        .records
        .into_iter()
        .next()
        .map(|r| r.cf)
        .ok_or_else(|| EdgeError::InvalidEvent("event has no records".to_string()))?;

    let request_id = payload
        .config
        .map(|c| c.request_id)
        .filter(|id| !id.is_empty())
        .unwrap_or_else(generate_request_id);
    Ok((payload.request, request_id))
}

fn generate_request_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{:x}", timestamp)
}

/// State shared by both entry points.
struct Invoker {
    registry: Arc<FunctionRegistry>,
    config: HandlerConfig,
}

impl Invoker {
    fn context(&self, request: &CfRequest, source: &SourceFile, request_id: String) -> RenderContext {
        let env = env_from_origin(request.origin.as_ref(), &self.config.env_prefix);
        if self.config.export_process_env {
            export_env(&env);
        }
        RenderContext {
            env,
            source: source.to_string(),
            request_id,
        }
    }

    async fn invoke(
        &self,
        request: &CfRequest,
        source: &SourceFile,
        request_id: String,
    ) -> Result<CfResponse> {
        let ctx = self.context(request, source, request_id);
        let Adapted {
            request: edge_request,
            response,
            completion,
        } = adapt(request)?;

        debug!("Invoking {} for {} [{}]", source, request.uri, ctx.request_id);
        if let Err(e) = self
            .registry
            .execute(source.as_str(), edge_request, response, &ctx)
            .await
        {
            error!("Invocation of {} failed: {} [{}]", source, e, ctx.request_id);
            return Err(e);
        }

        completion.wait().await
    }
}

fn s3_origin(request: &mut CfRequest) -> Result<&mut OriginTarget> {
    request
        .origin
        .as_mut()
        .and_then(|o| o.s3.as_mut())
        .ok_or_else(|| EdgeError::InvalidEvent("request has no S3 origin".to_string()))
}

/// Point the request at an object in storage.
fn rewrite_to_storage(
    mut request: CfRequest,
    origin_path: &str,
    uri: Option<String>,
    set_host: bool,
) -> Result<CfRequest> {
    let origin = s3_origin(&mut request)?;
    origin.path = origin_path.to_string();
    let domain = origin.domain_name.clone();

    if set_host {
        request.set_header("host", domain);
    }
    if let Some(uri) = uri {
        request.uri = uri;
    }
    debug!("Rewrote request to {}{}", origin_path, request.uri);
    Ok(request)
}

/// Entry point of the page function.
pub struct PageHandler {
    manifest: RouteManifest,
    prerender: PrerenderManifest,
    router: Router,
    invoker: Invoker,
}

impl PageHandler {
    pub fn new(
        manifest: RouteManifest,
        prerender: PrerenderManifest,
        registry: Arc<FunctionRegistry>,
        config: HandlerConfig,
    ) -> Result<Self> {
        let router = Router::for_pages(&manifest, config.error_page.as_str())?;
        Ok(Self {
            manifest,
            prerender,
            router,
            invoker: Invoker { registry, config },
        })
    }

    /// Load the manifests the builder wrote into `dir`.
    pub fn from_dir(
        dir: impl AsRef<Path>,
        registry: Arc<FunctionRegistry>,
        config: HandlerConfig,
    ) -> Result<Self> {
        let dir = dir.as_ref();
        let manifest = read_json(&dir.join(MANIFEST_FILE))?;
        let prerender_path = dir.join(PRERENDER_MANIFEST_FILE);
        let prerender = if prerender_path.is_file() {
            read_json(&prerender_path)?
        } else {
            PrerenderManifest::default()
        };
        info!("Loaded page manifest from {}", dir.display());
        Self::new(manifest, prerender, registry, config)
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Handle one CloudFront origin-request event.
    pub async fn handle(&self, event: CloudFrontEvent) -> Result<EdgeOutcome> {
        let (request, request_id) = first_request(event)?;
        let config = &self.invoker.config;
        let uri = normalize_path(&request.uri).to_string();

        let is_html_page = self.manifest.pages.html.non_dynamic.contains_key(&uri)
            || self.prerender.routes.contains_key(&request.uri);
        if is_html_page {
            let uri = format!("{uri}.html");
            let rewritten =
                rewrite_to_storage(request, &config.static_pages_path, Some(uri), true)?;
            return Ok(EdgeOutcome::Request(rewritten));
        }

        if self.manifest.public_files.contains_key(&uri) {
            let rewritten = rewrite_to_storage(request, &config.public_path, None, false)?;
            return Ok(EdgeOutcome::Request(rewritten));
        }

        let source = self.router.resolve(&uri);
        if source.is_html() {
            let key = source.storage_key().to_string();
            let rewritten =
                rewrite_to_storage(request, &config.static_pages_path, Some(key), true)?;
            return Ok(EdgeOutcome::Request(rewritten));
        }

        let response = self.invoker.invoke(&request, source, request_id).await?;
        Ok(EdgeOutcome::Response(response))
    }
}

/// Entry point of the API function.
pub struct ApiHandler {
    router: Router,
    invoker: Invoker,
}

impl ApiHandler {
    pub fn new(
        manifest: ApiManifest,
        registry: Arc<FunctionRegistry>,
        config: HandlerConfig,
    ) -> Result<Self> {
        let router = Router::for_apis(&manifest, config.api_error_page.as_str())?;
        Ok(Self {
            router,
            invoker: Invoker { registry, config },
        })
    }

    /// Load the manifest the builder wrote into `dir`.
    pub fn from_dir(
        dir: impl AsRef<Path>,
        registry: Arc<FunctionRegistry>,
        config: HandlerConfig,
    ) -> Result<Self> {
        let dir = dir.as_ref();
        let manifest = read_json(&dir.join(MANIFEST_FILE))?;
        info!("Loaded API manifest from {}", dir.display());
        Self::new(manifest, registry, config)
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Handle one CloudFront origin-request event.
    pub async fn handle(&self, event: CloudFrontEvent) -> Result<EdgeOutcome> {
        let (request, request_id) = first_request(event)?;
        let uri = normalize_path(&request.uri).to_string();
        let source = self.router.resolve(&uri);
        let response = self.invoker.invoke(&request, source, request_id).await?;
        Ok(EdgeOutcome::Response(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::event::CfHeader;

    #[test]
    fn test_env_from_origin() {
        let mut target = OriginTarget::default();
        target.custom_headers.insert(
            "x-env-api-url".to_string(),
            vec![
                CfHeader::new("X-Env-Api-Url", "https://api"),
                CfHeader::new("x-env-api-url", "ignored"),
            ],
        );
        target
            .custom_headers
            .insert("X-ENV-region".to_string(), vec![CfHeader::new("X-ENV-region", "eu")]);
        target
            .custom_headers
            .insert("x-other".to_string(), vec![CfHeader::new("x-other", "no")]);
        let origin = CfOrigin {
            s3: Some(target),
            custom: None,
        };

        let env = env_from_origin(Some(&origin), "x-env-");
        assert_eq!(env.len(), 2);
        assert_eq!(env["API-URL"], "https://api");
        assert_eq!(env["REGION"], "eu");
    }

    #[test]
    fn test_env_skips_empty_names() {
        let mut target = OriginTarget::default();
        target
            .custom_headers
            .insert("x-env-".to_string(), vec![CfHeader::new("x-env-", "v")]);
        let origin = CfOrigin {
            s3: None,
            custom: Some(target),
        };
        assert!(env_from_origin(Some(&origin), "x-env-").is_empty());
    }

    #[test]
    fn test_export_skips_invalid_pairs() {
        assert!(is_exportable("REGION", "eu"));
        assert!(!is_exportable("", "v"));
        assert!(!is_exportable("A=B", "v"));
        assert!(!is_exportable("A\0B", "v"));
        assert!(!is_exportable("A", "v\0"));

        let env: HashMap<String, String> = [
            ("".to_string(), "v".to_string()),
            ("NEXTFRONT_BAD=NAME".to_string(), "v".to_string()),
            ("NEXTFRONT_NUL".to_string(), "a\0b".to_string()),
            ("NEXTFRONT_EXPORT_OK".to_string(), "yes".to_string()),
        ]
        .into_iter()
        .collect();
        export_env(&env);
        assert_eq!(std::env::var("NEXTFRONT_EXPORT_OK").as_deref(), Ok("yes"));
        assert!(std::env::var("NEXTFRONT_NUL").is_err());
    }

    #[test]
    fn test_env_without_origin() {
        assert!(env_from_origin(None, "x-env-").is_empty());
    }

    #[test]
    fn test_request_id_from_config() {
        let raw = r#"{"Records":[{"cf":{"config":{"requestId":"abc"},"request":{"uri":"/","method":"GET"}}}]}"#;
        let event: CloudFrontEvent = serde_json::from_str(raw).unwrap();
        let (request, id) = first_request(event).unwrap();
        assert_eq!(request.uri, "/");
        assert_eq!(id, "abc");

        let event = CloudFrontEvent::from_request(request);
        let (_, id) = first_request(event).unwrap();
        assert!(!id.is_empty());
    }

    #[test]
    fn test_empty_event_is_invalid() {
        let event = CloudFrontEvent { records: vec![] };
        assert!(matches!(first_request(event), Err(EdgeError::InvalidEvent(_))));
    }

    #[test]
    fn test_rewrite_requires_s3_origin() {
        let request = CfRequest {
            uri: "/about".to_string(),
            method: "GET".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            rewrite_to_storage(request, "/static-pages", None, true),
            Err(EdgeError::InvalidEvent(_))
        ));
    }
}
