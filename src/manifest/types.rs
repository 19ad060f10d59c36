//! Deployment manifests consumed by the edge handlers.
//!
//! These are generated once per deployment by the
//! [`ManifestBuilder`](crate::manifest::ManifestBuilder) and are read-only at
//! request time.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Extension of pages pre-rendered to static HTML.
pub const HTML_EXTENSION: &str = ".html";

/// Prefix of sources that are API handlers.
pub const API_PREFIX: &str = "pages/api";

/// Source file a route resolves to, e.g. `pages/post/[id].js`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceFile(String);

impl SourceFile {
    /// Create a new source file identifier.
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the source was pre-rendered to static HTML.
    pub fn is_html(&self) -> bool {
        self.0.ends_with(HTML_EXTENSION)
    }

    /// Whether the source is an API handler.
    pub fn is_api(&self) -> bool {
        self.0.starts_with(API_PREFIX)
    }

    /// Storage key of an HTML source: the path with its leading `pages`
    /// directory removed (`pages/about.html` -> `/about.html`).
    pub fn storage_key(&self) -> &str {
        self.0.strip_prefix("pages").unwrap_or(&self.0)
    }
}

impl fmt::Display for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceFile {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for SourceFile {
    fn from(path: String) -> Self {
        Self(path)
    }
}

impl AsRef<str> for SourceFile {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A parameterized route entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicRoute {
    /// Canonical form, e.g. `/post/:id`.
    pub route: String,
    /// Bracketed form as emitted by the upstream build, e.g. `/post/[id]`.
    pub page: String,
    /// Source to render on match.
    pub file: SourceFile,
    /// Compiled pattern source.
    pub regex: String,
}

/// Exact-match and pattern-match routes for one category.
///
/// `dynamic` is ordered most specific first and is tried in that order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteBucket {
    pub non_dynamic: BTreeMap<String, SourceFile>,
    pub dynamic: Vec<DynamicRoute>,
}

impl RouteBucket {
    /// Number of routes in the bucket.
    pub fn len(&self) -> usize {
        self.non_dynamic.len() + self.dynamic.len()
    }

    /// Whether the bucket holds no routes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Page routes split into server-rendered and pre-rendered HTML.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRoutes {
    pub ssr: RouteBucket,
    pub html: RouteBucket,
}

/// Manifest for the page-rendering function.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteManifest {
    pub pages: PageRoutes,
    /// Public URL path -> storage key relative to the public root.
    pub public_files: BTreeMap<String, String>,
}

/// Manifest for the API function.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiManifest {
    pub apis: RouteBucket,
}

/// One entry of the upstream pre-render manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrerenderRoute {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_revalidate_seconds: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_route: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_route: Option<String>,
}

/// Literal paths the upstream build pre-rendered to HTML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrerenderManifest {
    #[serde(default)]
    pub routes: BTreeMap<String, PrerenderRoute>,
}

/// Category a route is classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Html,
    Api,
    Ssr,
}

impl RouteClass {
    /// Classify a source: HTML extension first, then the API prefix.
    pub fn of(source: &SourceFile) -> Self {
        if source.is_html() {
            RouteClass::Html
        } else if source.is_api() {
            RouteClass::Api
        } else {
            RouteClass::Ssr
        }
    }
}

/// How a classified route is matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteTarget {
    /// Literal path.
    Exact { path: String, file: SourceFile },
    /// Compiled pattern.
    Pattern(DynamicRoute),
}

/// A route assigned to exactly one category and one match kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedRoute {
    pub class: RouteClass,
    pub target: RouteTarget,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_class_order() {
        assert_eq!(RouteClass::of(&"pages/about.html".into()), RouteClass::Html);
        assert_eq!(RouteClass::of(&"pages/api/users.js".into()), RouteClass::Api);
        assert_eq!(RouteClass::of(&"pages/api/doc.html".into()), RouteClass::Html);
        assert_eq!(RouteClass::of(&"pages/index.js".into()), RouteClass::Ssr);
    }

    #[test]
    fn test_storage_key() {
        assert_eq!(SourceFile::new("pages/blog/[slug].html").storage_key(), "/blog/[slug].html");
    }

    #[test]
    fn test_manifest_json_shape() {
        let mut manifest = RouteManifest::default();
        manifest
            .pages
            .ssr
            .non_dynamic
            .insert("/index".to_string(), "pages/index.js".into());
        manifest
            .public_files
            .insert("/favicon.ico".to_string(), "favicon.ico".to_string());

        let json = serde_json::to_value(&manifest).unwrap();
        assert_eq!(json["pages"]["ssr"]["nonDynamic"]["/index"], "pages/index.js");
        assert_eq!(json["pages"]["html"]["dynamic"], serde_json::json!([]));
        assert_eq!(json["publicFiles"]["/favicon.ico"], "favicon.ico");
    }

    #[test]
    fn test_prerender_manifest_ignores_unknown_fields() {
        let json = r#"{
            "version": 2,
            "routes": { "/blog/first": { "initialRevalidateSeconds": false, "srcRoute": "/blog/[slug]" } },
            "dynamicRoutes": {}
        }"#;
        let manifest: PrerenderManifest = serde_json::from_str(json).unwrap();
        assert_eq!(
            manifest.routes["/blog/first"].src_route.as_deref(),
            Some("/blog/[slug]")
        );
    }
}
