//! Manifest-driven request router.

use super::sorter::compare_specificity;
use crate::error::Result;
use crate::manifest::{ApiManifest, DynamicRoute, RouteBucket, RouteManifest, SourceFile};
use regex::{Regex, RegexBuilder};
use std::collections::BTreeMap;
use tracing::debug;

/// Canonical identifier of the root page.
pub const INDEX_PATH: &str = "/index";

/// Source served when no route matches.
pub const DEFAULT_ERROR_PAGE: &str = "pages/_error.js";

/// Rewrite an empty or root path to [`INDEX_PATH`].
pub fn normalize_path(path: &str) -> &str {
    match path {
        "" | "/" => INDEX_PATH,
        other => other,
    }
}

/// A dynamic route with its pattern compiled.
#[derive(Debug, Clone)]
struct CompiledRoute {
    pattern: Regex,
    file: SourceFile,
}

impl CompiledRoute {
    fn compile(route: &DynamicRoute) -> Result<Self> {
        let pattern = RegexBuilder::new(&route.regex)
            .case_insensitive(true)
            .build()?;
        Ok(Self {
            pattern,
            file: route.file.clone(),
        })
    }
}

/// Resolves request paths to render sources.
///
/// Exact matches are checked first, then dynamic routes in stored order.
/// Unmatched paths resolve to the fallback source.
#[derive(Debug, Clone)]
pub struct Router {
    exact: BTreeMap<String, SourceFile>,
    dynamic: Vec<CompiledRoute>,
    fallback: SourceFile,
}

impl Router {
    /// Router over a single bucket.
    pub fn new(bucket: &RouteBucket, fallback: impl Into<SourceFile>) -> Result<Self> {
        Self::from_parts(bucket.non_dynamic.clone(), bucket.dynamic.iter(), fallback.into())
    }

    /// Router for the page function: server-rendered exact routes, then the
    /// dynamic routes of both page buckets in specificity order.
    pub fn for_pages(manifest: &RouteManifest, fallback: impl Into<SourceFile>) -> Result<Self> {
        let pages = &manifest.pages;
        let mut dynamic: Vec<&DynamicRoute> =
            pages.ssr.dynamic.iter().chain(pages.html.dynamic.iter()).collect();
        dynamic.sort_by(|a, b| compare_specificity(&a.page, &b.page));
        Self::from_parts(pages.ssr.non_dynamic.clone(), dynamic, fallback.into())
    }

    /// Router for the API function.
    pub fn for_apis(manifest: &ApiManifest, fallback: impl Into<SourceFile>) -> Result<Self> {
        Self::new(&manifest.apis, fallback)
    }

    fn from_parts<'a>(
        exact: BTreeMap<String, SourceFile>,
        dynamic: impl IntoIterator<Item = &'a DynamicRoute>,
        fallback: SourceFile,
    ) -> Result<Self> {
        let dynamic = dynamic
            .into_iter()
            .map(CompiledRoute::compile)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            exact,
            dynamic,
            fallback,
        })
    }

    /// Resolve a request path.
    pub fn resolve(&self, path: &str) -> &SourceFile {
        let path = normalize_path(path);

        if let Some(file) = self.exact.get(path) {
            debug!("Exact route {} -> {}", path, file);
            return file;
        }

        if let Some(route) = self.dynamic.iter().find(|r| r.pattern.is_match(path)) {
            debug!("Dynamic route {} -> {}", path, route.file);
            return &route.file;
        }

        debug!("No route for {}, using {}", path, self.fallback);
        &self.fallback
    }

    /// Source served for unmatched paths.
    pub fn fallback(&self) -> &SourceFile {
        &self.fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::build_manifests;
    use std::path::Path;

    fn manifest(entries: &[(&str, &str)]) -> crate::manifest::BuildManifests {
        let pages = entries
            .iter()
            .map(|(route, file)| (route.to_string(), SourceFile::new(*file)))
            .collect();
        build_manifests(&pages, Path::new("/nonexistent-public")).unwrap()
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(""), "/index");
        assert_eq!(normalize_path("/"), "/index");
        assert_eq!(normalize_path("/about"), "/about");
    }

    #[test]
    fn test_exact_beats_pattern() {
        let m = manifest(&[("/post/[id]", "pages/post/[id].js"), ("/post/featured", "pages/post/featured.js")]);
        let router = Router::for_pages(&m.pages, DEFAULT_ERROR_PAGE).unwrap();
        assert_eq!(router.resolve("/post/featured").as_str(), "pages/post/featured.js");
        assert_eq!(router.resolve("/post/1").as_str(), "pages/post/[id].js");
    }

    #[test]
    fn test_param_beats_catch_all() {
        let m = manifest(&[("/post/[...slug]", "pages/post/[...slug].js"), ("/post/[id]", "pages/post/[id].js")]);
        let router = Router::for_pages(&m.pages, DEFAULT_ERROR_PAGE).unwrap();
        assert_eq!(router.resolve("/post/42").as_str(), "pages/post/[id].js");
        assert_eq!(router.resolve("/post/42/comments").as_str(), "pages/post/[...slug].js");
    }

    #[test]
    fn test_root_resolves_like_index() {
        let m = manifest(&[("/", "pages/index.js")]);
        let router = Router::for_pages(&m.pages, DEFAULT_ERROR_PAGE).unwrap();
        assert_eq!(router.resolve("/"), router.resolve("/index"));
        assert_eq!(router.resolve("").as_str(), "pages/index.js");
    }

    #[test]
    fn test_unmatched_resolves_to_error_page() {
        let m = manifest(&[("/", "pages/index.js")]);
        let router = Router::for_pages(&m.pages, DEFAULT_ERROR_PAGE).unwrap();
        assert_eq!(router.resolve("/does-not-exist").as_str(), DEFAULT_ERROR_PAGE);
        assert_eq!(router.fallback().as_str(), DEFAULT_ERROR_PAGE);
    }

    #[test]
    fn test_html_dynamic_routes_are_merged_by_specificity() {
        let m = manifest(&[("/[...all]", "pages/[...all].js"), ("/blog/[slug]", "pages/blog/[slug].html")]);
        let router = Router::for_pages(&m.pages, DEFAULT_ERROR_PAGE).unwrap();
        assert_eq!(router.resolve("/blog/hello").as_str(), "pages/blog/[slug].html");
        assert_eq!(router.resolve("/anything/else").as_str(), "pages/[...all].js");
    }

    #[test]
    fn test_api_router_uses_its_own_fallback() {
        let m = manifest(&[("/api/users/[id]", "pages/api/users/[id].js")]);
        let router = Router::for_apis(&m.apis, "pages/api/_error.js").unwrap();
        assert_eq!(router.resolve("/API/Users/7").as_str(), "pages/api/users/[id].js");
        assert_eq!(router.resolve("/api/nope").as_str(), "pages/api/_error.js");
    }

    #[test]
    fn test_literal_round_trip() {
        let entries = [
            ("/about", "pages/about.js"),
            ("/contact", "pages/contact.js"),
            ("/post/[id]", "pages/post/[id].js"),
        ];
        let m = manifest(&entries);
        let router = Router::for_pages(&m.pages, DEFAULT_ERROR_PAGE).unwrap();
        for (route, file) in entries.iter().filter(|(r, _)| !r.contains('[')) {
            assert_eq!(router.resolve(route).as_str(), *file);
        }
    }

    #[test]
    fn test_invalid_stored_pattern() {
        let bucket = RouteBucket {
            non_dynamic: BTreeMap::new(),
            dynamic: vec![DynamicRoute {
                route: "/x".to_string(),
                page: "/x".to_string(),
                file: "pages/x.js".into(),
                regex: "(".to_string(),
            }],
        };
        assert!(Router::new(&bucket, DEFAULT_ERROR_PAGE).is_err());
    }
}
