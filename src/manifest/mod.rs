//! Deployment manifests and the build-time route classifier.
//!
//! The builder reads the upstream `pages-manifest.json`, splits every route
//! into exactly one of the server-rendered, pre-rendered HTML or API
//! categories, and writes one manifest per edge function.

pub mod builder;
pub mod types;

pub use builder::{build_manifests, classify_routes, collect_public_files, BuildManifests, ManifestBuilder};
pub use types::{
    ApiManifest, ClassifiedRoute, DynamicRoute, PageRoutes, PrerenderManifest, PrerenderRoute,
    RouteBucket, RouteClass, RouteManifest, RouteTarget, SourceFile,
};
