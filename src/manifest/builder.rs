//! Build-time route classification.

use crate::error::{EdgeError, Result};
use crate::manifest::types::{
    ApiManifest, ClassifiedRoute, DynamicRoute, PrerenderManifest, RouteBucket, RouteClass,
    RouteManifest, RouteTarget, SourceFile,
};
use crate::routing::{
    check_param_names, expressify, is_dynamic_route, normalize_path, path_to_regex, sort_routes,
};
use crate::runtime::BuildConfig;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// File name of every manifest written for a function.
pub const MANIFEST_FILE: &str = "manifest.json";

/// File name of the pre-render manifest.
pub const PRERENDER_MANIFEST_FILE: &str = "prerender-manifest.json";

/// Manifests produced by one build.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildManifests {
    /// Consumed by the page function.
    pub pages: RouteManifest,
    /// Consumed by the API function.
    pub apis: ApiManifest,
    /// Passed through to the page function.
    pub prerender: PrerenderManifest,
}

/// Assign every route to exactly one category, dynamic routes in specificity
/// order.
///
/// Exact paths are stored normalized, so the root route is keyed `/index`.
pub fn classify_routes(pages: &BTreeMap<String, SourceFile>) -> Result<Vec<ClassifiedRoute>> {
    let (dynamic, exact): (Vec<&String>, Vec<&String>) =
        pages.keys().partition(|route| is_dynamic_route(route));

    let mut classified = Vec::with_capacity(pages.len());

    for route in exact {
        let file = pages[route].clone();
        classified.push(ClassifiedRoute {
            class: RouteClass::of(&file),
            target: RouteTarget::Exact {
                path: normalize_path(route).to_string(),
                file,
            },
        });
    }

    check_param_names(dynamic.iter().map(|route| route.as_str()))?;
    for route in sort_routes(dynamic) {
        let file = pages[route].clone();
        let canonical = expressify(route);
        let regex = path_to_regex(&canonical)?;
        debug!("Compiled {} -> {}", route, regex);
        classified.push(ClassifiedRoute {
            class: RouteClass::of(&file),
            target: RouteTarget::Pattern(DynamicRoute {
                route: canonical,
                page: route.clone(),
                file,
                regex,
            }),
        });
    }

    Ok(classified)
}

/// Assemble manifests from an upstream pages manifest and a public root.
pub fn build_manifests(
    pages: &BTreeMap<String, SourceFile>,
    public_dir: &Path,
) -> Result<BuildManifests> {
    let mut manifests = BuildManifests::default();

    for route in classify_routes(pages)? {
        let bucket = match route.class {
            RouteClass::Html => &mut manifests.pages.pages.html,
            RouteClass::Ssr => &mut manifests.pages.pages.ssr,
            RouteClass::Api => &mut manifests.apis.apis,
        };
        insert(bucket, route.target);
    }

    manifests.pages.public_files = collect_public_files(public_dir)?;
    Ok(manifests)
}

fn insert(bucket: &mut RouteBucket, target: RouteTarget) {
    match target {
        RouteTarget::Exact { path, file } => {
            bucket.non_dynamic.insert(path, file);
        }
        RouteTarget::Pattern(route) => bucket.dynamic.push(route),
    }
}

/// Walk `root` recursively; every regular file maps `/<rel>` to `<rel>`.
///
/// A missing root yields an empty map.
pub fn collect_public_files(root: &Path) -> Result<BTreeMap<String, String>> {
    let mut files = BTreeMap::new();
    if root.is_dir() {
        walk(root, root, &mut files)?;
    }
    Ok(files)
}

fn walk(root: &Path, dir: &Path, files: &mut BTreeMap<String, String>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            walk(root, &path, files)?;
        } else if file_type.is_file() {
            let Ok(relative) = path.strip_prefix(root) else {
                continue;
            };
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            files.insert(format!("/{key}"), key);
        }
    }
    Ok(())
}

/// Reads upstream build output and writes the deployable manifests.
pub struct ManifestBuilder {
    config: BuildConfig,
}

impl ManifestBuilder {
    /// Create a builder for the given configuration.
    pub fn new(config: BuildConfig) -> Self {
        Self { config }
    }

    /// Builder configuration.
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Read the upstream per-route pages manifest.
    pub fn read_pages_manifest(&self) -> Result<BTreeMap<String, SourceFile>> {
        let serverless = self.config.serverless_dir();
        if !serverless.is_dir() {
            return Err(EdgeError::missing(serverless));
        }

        let path = serverless.join("pages-manifest.json");
        if !path.is_file() {
            return Err(EdgeError::missing(path));
        }

        let raw = fs::read(&path)?;
        Ok(serde_json::from_slice(&raw)?)
    }

    /// Read the upstream pre-render manifest; empty when the build has none.
    pub fn read_prerender_manifest(&self) -> Result<PrerenderManifest> {
        let path = self.config.next_dir.join(PRERENDER_MANIFEST_FILE);
        if !path.is_file() {
            debug!("No pre-render manifest at {}", path.display());
            return Ok(PrerenderManifest::default());
        }
        let raw = fs::read(&path)?;
        Ok(serde_json::from_slice(&raw)?)
    }

    /// Classify the upstream routes without touching the output directory.
    pub fn build(&self) -> Result<BuildManifests> {
        let pages = self.read_pages_manifest()?;
        let mut manifests = build_manifests(&pages, &self.config.public_dir)?;
        manifests.prerender = self.read_prerender_manifest()?;

        info!(
            "Classified {} routes: {} ssr, {} html, {} api, {} public files",
            pages.len(),
            manifests.pages.pages.ssr.len(),
            manifests.pages.pages.html.len(),
            manifests.apis.apis.len(),
            manifests.pages.public_files.len()
        );
        Ok(manifests)
    }

    /// Write each manifest into its own function's output directory.
    pub async fn write(&self, manifests: &BuildManifests) -> Result<()> {
        let default_dir = self.config.default_lambda_dir();
        let api_dir = self.config.api_lambda_dir();

        tokio::fs::create_dir_all(&default_dir).await?;
        tokio::fs::create_dir_all(&api_dir).await?;

        let pages = serde_json::to_vec_pretty(&manifests.pages)?;
        let prerender = serde_json::to_vec_pretty(&manifests.prerender)?;
        let apis = serde_json::to_vec_pretty(&manifests.apis)?;

        tokio::try_join!(
            tokio::fs::write(default_dir.join(MANIFEST_FILE), pages),
            tokio::fs::write(default_dir.join(PRERENDER_MANIFEST_FILE), prerender),
            tokio::fs::write(api_dir.join(MANIFEST_FILE), apis),
        )?;

        info!("Wrote manifests to {}", self.config.out_dir.display());
        Ok(())
    }

    /// Build and write in one step.
    pub async fn run(&self) -> Result<BuildManifests> {
        let manifests = self.build()?;
        self.write(&manifests).await?;
        Ok(manifests)
    }
}
