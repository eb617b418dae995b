//! [`PathResolver`] — kernel path to store path translation (spec.md §4.1).

use crate::config::LeafMode;

/// Reserved names that cannot be real user node names at the mount root.
pub const DATA_NODE_NAME: &str = "_zoo_data_";
pub const SYMLINK_SIDECAR_NAME: &str = "__symlinks__";

/// Translates kernel-visible paths into store paths under a fixed root
/// prefix. Stateless apart from the root and leaf mode, both fixed at
/// mount time.
pub struct PathResolver {
    root: String,
    leaf_mode: LeafMode,
}

impl PathResolver {
    pub fn new(root: String, leaf_mode: LeafMode) -> Self {
        PathResolver { root, leaf_mode }
    }

    /// Resolves a kernel path to its store path, per spec.md §4.1:
    /// - root `"/"` is treated as an empty prefix so concatenation never
    ///   yields `"//"`;
    /// - in LEAF_AS_DIR only, a trailing `_zoo_data_` segment is stripped,
    ///   resolving to the parent's store path;
    /// - a single trailing `/` is stripped unless the result is exactly `/`.
    pub fn resolve(&self, kernel_path: &str) -> String {
        let mut resolved = format!("{}{}", self.root, kernel_path);

        if self.leaf_mode == LeafMode::Dir {
            if let Some(stripped) = strip_trailing_segment(&resolved, DATA_NODE_NAME) {
                resolved = stripped;
            }
        }

        if resolved.len() > 1 && resolved.ends_with('/') {
            resolved.pop();
        }
        if resolved.is_empty() {
            resolved.push('/');
        }
        resolved
    }
}

fn strip_trailing_segment(path: &str, segment: &str) -> Option<String> {
    let suffix = format!("/{segment}");
    path.strip_suffix(&suffix).map(|parent| {
        if parent.is_empty() {
            "/".to_string()
        } else {
            parent.to_string()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_slash_is_empty_prefix() {
        let resolver = PathResolver::new(crate::session::normalized_root("/"), LeafMode::Hybrid);
        assert_eq!(resolver.resolve("/a/b"), "/a/b");
    }

    #[test]
    fn custom_root_prefixes_paths() {
        let resolver =
            PathResolver::new(crate::session::normalized_root("/prefix"), LeafMode::Hybrid);
        assert_eq!(resolver.resolve("/a"), "/prefix/a");
    }

    #[test]
    fn dir_mode_strips_data_node_alias() {
        let resolver = PathResolver::new(crate::session::normalized_root("/"), LeafMode::Dir);
        assert_eq!(resolver.resolve("/a/_zoo_data_"), "/a");
        assert_eq!(resolver.resolve("/_zoo_data_"), "/");
    }

    #[test]
    fn non_dir_mode_keeps_data_node_literal() {
        let resolver = PathResolver::new(crate::session::normalized_root("/"), LeafMode::Hybrid);
        assert_eq!(resolver.resolve("/a/_zoo_data_"), "/a/_zoo_data_");
    }

    #[test]
    fn trailing_slash_is_stripped_except_root() {
        let resolver = PathResolver::new(crate::session::normalized_root("/"), LeafMode::Hybrid);
        assert_eq!(resolver.resolve("/a/"), "/a");
        assert_eq!(resolver.resolve("/"), "/");
    }
}
