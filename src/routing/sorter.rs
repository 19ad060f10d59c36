//! Specificity ordering for dynamic routes.

use super::pattern::{segment_kind, SegmentKind};
use crate::error::{EdgeError, Result};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Compare two bracketed routes by specificity, most specific first.
///
/// Segments are compared pairwise: static beats `[param]`, which beats
/// `[...catchall]`, which beats `[[...optional]]`. Static segments fall back
/// to lexical order so the result is total. A route that is a prefix of
/// another sorts first.
pub fn compare_specificity(a: &str, b: &str) -> Ordering {
    let mut left = a.split('/').filter(|s| !s.is_empty());
    let mut right = b.split('/').filter(|s| !s.is_empty());

    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => {
                let (lk, ln) = segment_kind(l);
                let (rk, rn) = segment_kind(r);
                let ord = lk.cmp(&rk).then_with(|| match lk {
                    SegmentKind::Static => ln.cmp(rn),
                    _ => Ordering::Equal,
                });
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

/// Sort routes so that the most specific is tried first.
pub fn sort_routes<I, S>(routes: I) -> Vec<S>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut routes: Vec<S> = routes.into_iter().collect();
    routes.sort_by(|a, b| {
        let (a, b) = (a.as_ref(), b.as_ref());
        compare_specificity(a, b).then_with(|| a.cmp(b))
    });
    routes
}

/// Reject sibling dynamic segments of the same kind that use different
/// parameter names, such as `/[id]` next to `/[slug]`.
///
/// Such routes would match the same URLs, so no order between them is
/// meaningful. Dynamic segments in the parent path are compared by kind only.
pub fn check_param_names<'a, I>(routes: I) -> Result<()>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen: HashMap<(String, SegmentKind), (&'a str, &'a str)> = HashMap::new();

    for route in routes {
        let mut parent = String::new();
        for segment in route.split('/').filter(|s| !s.is_empty()) {
            let (kind, name) = segment_kind(segment);
            if kind != SegmentKind::Static {
                let key = (parent.clone(), kind);
                match seen.get(&key) {
                    Some(&(other, first)) if other != name => {
                        return Err(EdgeError::InvalidPattern {
                            route: route.to_string(),
                            reason: format!(
                                "different parameter names at the same position as `{first}` ('{other}' != '{name}')"
                            ),
                        });
                    }
                    Some(_) => {}
                    None => {
                        seen.insert(key, (name, route));
                    }
                }
            }
            parent.push('/');
            parent.push_str(match kind {
                SegmentKind::Static => segment,
                SegmentKind::Param => "[]",
                SegmentKind::CatchAll => "[...]",
                SegmentKind::OptionalCatchAll => "[[...]]",
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_before_catch_all() {
        let sorted = sort_routes(["/post/[...slug]", "/post/[id]"]);
        assert_eq!(sorted, vec!["/post/[id]", "/post/[...slug]"]);
    }

    #[test]
    fn test_static_prefix_before_dynamic_prefix() {
        let sorted = sort_routes(["/[lang]/about", "/blog/[slug]", "/[...all]"]);
        assert_eq!(sorted, vec!["/blog/[slug]", "/[lang]/about", "/[...all]"]);
    }

    #[test]
    fn test_shorter_route_first() {
        let sorted = sort_routes(["/a/[id]/edit", "/a/[id]"]);
        assert_eq!(sorted, vec!["/a/[id]", "/a/[id]/edit"]);
    }

    #[test]
    fn test_optional_catch_all_last() {
        let sorted = sort_routes(["/[[...all]]", "/[...all]", "/[id]"]);
        assert_eq!(sorted, vec!["/[id]", "/[...all]", "/[[...all]]"]);
    }

    #[test]
    fn test_sort_is_deterministic() {
        let a = sort_routes(["/b/[x]", "/a/[x]", "/c/[y]"]);
        let b = sort_routes(["/c/[y]", "/a/[x]", "/b/[x]"]);
        assert_eq!(a, b);
        assert_eq!(a, vec!["/a/[x]", "/b/[x]", "/c/[y]"]);
    }

    #[test]
    fn test_conflicting_param_names_rejected() {
        let err = check_param_names(["/[id]", "/[slug]"]).unwrap_err();
        assert!(matches!(err, EdgeError::InvalidPattern { ref route, .. } if route == "/[slug]"));

        assert!(check_param_names(["/blog/[id]/edit", "/blog/[slug]"]).is_err());
        assert!(check_param_names(["/[lang]/a/[id]", "/[locale]/b"]).is_err());
    }

    #[test]
    fn test_matching_param_names_accepted() {
        assert!(check_param_names(["/post/[id]", "/post/[id]/edit", "/user/[slug]"]).is_ok());
        assert!(check_param_names(["/[lang]/a/[id]", "/[lang]/b/[slug]"]).is_ok());
        assert!(check_param_names(["/post/[id]", "/post/[...rest]"]).is_ok());
    }
}
