//! Route path helpers: dynamic segment detection and pattern compilation.
//!
//! Page routes use the bracket syntax emitted by the upstream build
//! (`/post/[id]`, `/docs/[...slug]`, `/shop/[[...path]]`). Matching works on
//! an intermediate "canonical" form (`/post/:id`, `/docs/:slug+`,
//! `/shop/:path*`) which is then compiled to an anchored regular expression.

use crate::error::{EdgeError, Result};

/// Kind of a single `/`-separated route segment.
///
/// Variant order is specificity order: earlier variants are more specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SegmentKind {
    /// Literal text.
    Static,
    /// `[name]`.
    Param,
    /// `[...name]`, one or more segments.
    CatchAll,
    /// `[[...name]]`, zero or more segments.
    OptionalCatchAll,
}

/// Classify one route segment and return its kind plus parameter name.
pub fn segment_kind(segment: &str) -> (SegmentKind, &str) {
    if let Some(name) = segment
        .strip_prefix("[[...")
        .and_then(|s| s.strip_suffix("]]"))
        .filter(|s| !s.is_empty())
    {
        return (SegmentKind::OptionalCatchAll, name);
    }
    if let Some(inner) = segment
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .filter(|s| !s.is_empty())
    {
        return match inner.strip_prefix("...") {
            Some(name) if !name.is_empty() => (SegmentKind::CatchAll, name),
            _ => (SegmentKind::Param, inner),
        };
    }
    (SegmentKind::Static, segment)
}

/// Returns `true` when the route contains at least one `[param]` segment.
pub fn is_dynamic_route(route: &str) -> bool {
    route
        .split('/')
        .skip(1)
        .any(|segment| segment_kind(segment).0 != SegmentKind::Static)
}

/// Convert a bracketed route to its canonical form.
///
/// ```
/// use nextfront::routing::expressify;
///
/// assert_eq!(expressify("/post/[id]"), "/post/:id");
/// assert_eq!(expressify("/docs/[...slug]"), "/docs/:slug+");
/// assert_eq!(expressify("/shop/[[...path]]"), "/shop/:path*");
/// ```
pub fn expressify(route: &str) -> String {
    route
        .split('/')
        .map(|segment| match segment_kind(segment) {
            (SegmentKind::Static, s) => s.to_string(),
            (SegmentKind::Param, name) => format!(":{name}"),
            (SegmentKind::CatchAll, name) => format!(":{name}+"),
            (SegmentKind::OptionalCatchAll, name) => format!(":{name}*"),
        })
        .collect::<Vec<_>>()
        .join("/")
}

const SEGMENT: &str = "[^/#?]+?";

/// Compile a canonical route into an anchored regular-expression source.
///
/// The returned source is matched case-insensitively by the router. A single
/// trailing `/`, `#` or `?` is tolerated.
pub fn path_to_regex(canonical: &str) -> Result<String> {
    let mut source = String::from("^");

    for segment in canonical.split('/').skip(1) {
        let Some(param) = segment.strip_prefix(':') else {
            source.push('/');
            source.push_str(&regex::escape(segment));
            continue;
        };

        let (name, repeat) = match param.as_bytes().last() {
            Some(b'+') => (&param[..param.len() - 1], Some('+')),
            Some(b'*') => (&param[..param.len() - 1], Some('*')),
            _ => (param, None),
        };
        if name.is_empty() || name.contains('/') {
            return Err(EdgeError::InvalidPattern {
                route: canonical.to_string(),
                reason: format!("bad parameter name in segment `{segment}`"),
            });
        }

        match repeat {
            None => source.push_str(&format!("(?:/({SEGMENT}))")),
            Some('+') => source.push_str(&format!("(?:/((?:{SEGMENT})(?:/(?:{SEGMENT}))*))")),
            Some(_) => source.push_str(&format!("(?:/((?:{SEGMENT})(?:/(?:{SEGMENT}))*))?")),
        }
    }

    source.push_str("[/#?]?$");
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::RegexBuilder;

    fn compile(route: &str) -> regex::Regex {
        let source = path_to_regex(&expressify(route)).unwrap();
        RegexBuilder::new(&source)
            .case_insensitive(true)
            .build()
            .unwrap()
    }

    #[test]
    fn test_is_dynamic_route() {
        assert!(is_dynamic_route("/post/[id]"));
        assert!(is_dynamic_route("/[lang]/about"));
        assert!(is_dynamic_route("/docs/[...slug]"));
        assert!(is_dynamic_route("/shop/[[...path]]"));
        assert!(!is_dynamic_route("/about"));
        assert!(!is_dynamic_route("/"));
        assert!(!is_dynamic_route("/post/[]"));
        assert!(!is_dynamic_route("/post/x[id]"));
    }

    #[test]
    fn test_segment_kind() {
        assert_eq!(segment_kind("post"), (SegmentKind::Static, "post"));
        assert_eq!(segment_kind("[id]"), (SegmentKind::Param, "id"));
        assert_eq!(segment_kind("[...slug]"), (SegmentKind::CatchAll, "slug"));
        assert_eq!(segment_kind("[[...slug]]"), (SegmentKind::OptionalCatchAll, "slug"));
    }

    #[test]
    fn test_single_param_pattern() {
        let re = compile("/a/[id]");
        assert!(re.is_match("/a/123"));
        assert!(re.is_match("/a/123/"));
        assert!(!re.is_match("/a/123/b"));
        assert!(!re.is_match("/a"));
        assert!(!re.is_match("/b/123"));
    }

    #[test]
    fn test_pattern_is_case_insensitive() {
        let re = compile("/Post/[id]");
        assert!(re.is_match("/post/1"));
        assert!(re.is_match("/POST/1"));
    }

    #[test]
    fn test_catch_all_pattern() {
        let re = compile("/docs/[...slug]");
        assert!(re.is_match("/docs/a"));
        assert!(re.is_match("/docs/a/b/c"));
        assert!(!re.is_match("/docs"));
    }

    #[test]
    fn test_optional_catch_all_pattern() {
        let re = compile("/shop/[[...path]]");
        assert!(re.is_match("/shop"));
        assert!(re.is_match("/shop/x/y"));
        assert!(!re.is_match("/shopping"));
    }

    #[test]
    fn test_static_segments_are_escaped() {
        let re = compile("/v1.0/[id]");
        assert!(re.is_match("/v1.0/7"));
        assert!(!re.is_match("/v1x0/7"));
    }

    #[test]
    fn test_invalid_param_name() {
        assert!(path_to_regex("/post/:").is_err());
        assert!(path_to_regex("/post/:+").is_err());
        assert!(path_to_regex("/post/:*").is_err());
    }

    #[test]
    fn test_hyphenated_param_name() {
        assert_eq!(expressify("/post/[post-id]"), "/post/:post-id");
        let re = compile("/post/[post-id]");
        assert!(re.is_match("/post/1"));
        assert!(!re.is_match("/post"));

        let re = compile("/docs/[...doc-path]");
        assert!(re.is_match("/docs/a/b"));
    }
}
