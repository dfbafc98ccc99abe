//! Pure prefix router deciding which backing serves a request path.

use std::path::{Path, PathBuf};

/// Which of the two backings a request path resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Base,
    Alt,
}

/// Matches mount-relative paths against the configured redirect prefixes.
///
/// A prefix matches as whole path components: `special` matches `special`
/// and `special/x` but never `specialty`. The list is scanned in
/// configuration order and the first match wins.
#[derive(Debug, Clone)]
pub struct Router {
    prefixes: Vec<PathBuf>,
}

impl Router {
    pub fn new<I, P>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    /// Routes a mount-relative path. The root (empty path) never matches a
    /// prefix and always lands on base.
    pub fn route(&self, rel: &Path) -> Side {
        for prefix in &self.prefixes {
            // strip_prefix compares whole components, which is exactly the
            // match-as-path-component rule.
            if rel.strip_prefix(prefix).is_ok() {
                return Side::Alt;
            }
        }

        Side::Base
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use quickcheck::{TestResult, quickcheck};

    use super::{Router, Side};

    fn router(prefixes: &[&str]) -> Router {
        Router::new(prefixes.iter().copied())
    }

    #[test]
    fn unmatched_paths_go_to_base() {
        let r = router(&["special"]);
        assert_eq!(r.route(Path::new("regular.txt")), Side::Base);
        assert_eq!(r.route(Path::new("other/dir/file")), Side::Base);
    }

    #[test]
    fn exact_prefix_and_children_go_to_alt() {
        let r = router(&["special", "cache/hot"]);
        assert_eq!(r.route(Path::new("special")), Side::Alt);
        assert_eq!(r.route(Path::new("special/x")), Side::Alt);
        assert_eq!(r.route(Path::new("cache/hot")), Side::Alt);
        assert_eq!(r.route(Path::new("cache/hot/k")), Side::Alt);
    }

    #[test]
    fn prefix_does_not_match_as_substring() {
        let r = router(&["special", "cache/hot"]);
        assert_eq!(r.route(Path::new("specialty")), Side::Base);
        assert_eq!(r.route(Path::new("cache/hotter")), Side::Base);
        assert_eq!(r.route(Path::new("cache")), Side::Base);
    }

    #[test]
    fn root_always_routes_to_base() {
        assert_eq!(router(&["special"]).route(Path::new("")), Side::Base);
        assert_eq!(router(&[]).route(Path::new("")), Side::Base);
    }

    #[test]
    fn empty_redirect_list_routes_everything_to_base() {
        let r = router(&[]);
        assert_eq!(r.route(Path::new("special")), Side::Base);
        assert_eq!(r.route(Path::new("a/b/c")), Side::Base);
    }

    fn valid_prefix(p: &str) -> bool {
        !p.is_empty() && !p.starts_with('/') && !p.ends_with('/') && !p.contains('\0')
    }

    quickcheck! {
        fn route_is_total(prefixes: Vec<String>, path: String) -> bool {
            let prefixes: Vec<String> =
                prefixes.into_iter().filter(|p| valid_prefix(p)).collect();
            let r = Router::new(prefixes);
            matches!(r.route(Path::new(&path)), Side::Base | Side::Alt)
        }

        fn component_matching(prefix: String, child: String) -> TestResult {
            if !valid_prefix(&prefix) || prefix.contains('/') {
                return TestResult::discard();
            }
            if child.is_empty() || child.contains('/') || child.contains('\0') {
                return TestResult::discard();
            }
            let r = Router::new([prefix.clone()]);

            let exact = r.route(Path::new(&prefix)) == Side::Alt;
            let nested = r.route(Path::new(&format!("{prefix}/{child}"))) == Side::Alt;
            let extended = r.route(Path::new(&format!("{prefix}{child}"))) == Side::Base;
            TestResult::from_bool(exact && nested && extended)
        }
    }
}
