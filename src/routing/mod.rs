//! Route pattern handling and manifest-driven request routing.

pub mod pattern;
pub mod router;
pub mod sorter;

pub use pattern::{expressify, is_dynamic_route, path_to_regex};
pub use router::{normalize_path, Router, DEFAULT_ERROR_PAGE, INDEX_PATH};
pub use sorter::{check_param_names, compare_specificity, sort_routes};
