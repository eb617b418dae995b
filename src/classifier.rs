//! [`Classifier`] — leaf-mode policy and HYBRID classification memory
//! (spec.md §4.4, §3 "Classification memory").

use std::collections::HashSet;
use std::sync::Mutex;

use crate::config::LeafMode;
use crate::store::StoreClient;

const DATA_NODE_NAME: &str = "_zoo_data_";

/// In-session record of whether a HYBRID-mode path has been observed acting
/// as a file or a directory. A path is in at most one of the two sets —
/// spec.md §8 invariant 1.
#[derive(Default)]
struct Memory {
    known_files: HashSet<String>,
    known_directories: HashSet<String>,
}

/// Owns the leaf-mode tag and, for HYBRID, the classification memory. One
/// instance per [`crate::session::Session`].
pub struct Classifier {
    leaf_mode: LeafMode,
    memory: Mutex<Memory>,
}

impl Classifier {
    pub fn new(leaf_mode: LeafMode) -> Self {
        Classifier { leaf_mode, memory: Mutex::new(Memory::default()) }
    }

    pub fn leaf_mode(&self) -> LeafMode {
        self.leaf_mode
    }

    /// True if `name` is the synthetic data-node child name exposed under
    /// every directory in LEAF_AS_DIR (spec.md §4.1 glossary "Data node").
    pub fn is_data_node_name(name: &str) -> bool {
        name == DATA_NODE_NAME
    }

    /// Decides whether `path` (already resolved to a store path, node known
    /// to exist) is a directory, per the leaf-mode rules in spec.md §4.4.
    /// `content_len`/`children` are only consulted for the HYBRID fallback
    /// heuristic (rule 4); callers in LEAF_AS_DIR/LEAF_AS_FILE need not
    /// fetch them first.
    pub fn is_directory(&self, path: &str, store: &dyn StoreClient) -> crate::errors::FsResult<bool> {
        match self.leaf_mode {
            LeafMode::Dir => {
                let leaf = path.rsplit('/').next().unwrap_or(path);
                Ok(!Self::is_data_node_name(leaf))
            }
            // The spec's "every existing node is a file" rule has no stated
            // exception, but a FUSE mount's root inode must report as a
            // directory or the mount point itself can never be opened —
            // carved out the same way LEAF_AS_HYBRID already carves out "/"
            // (see DESIGN.md).
            LeafMode::File => Ok(path == "/"),
            LeafMode::Hybrid => self.is_directory_hybrid(path, store),
        }
    }

    fn is_directory_hybrid(&self, path: &str, store: &dyn StoreClient) -> crate::errors::FsResult<bool> {
        if path == "/" {
            return Ok(true);
        }
        {
            let memory = self.memory.lock().unwrap();
            if memory.known_files.contains(path) {
                return Ok(false);
            }
            if memory.known_directories.contains(path) {
                return Ok(true);
            }
        }

        let children = store.children(path)?;
        if !children.is_empty() {
            return Ok(true);
        }
        let (content, _stat) = store.get(path)?;
        Ok(content.is_empty())
    }

    /// `mkdir`/`opendir` classification transition: `unknown -> known_directories`.
    pub fn mark_directory(&self, path: &str) {
        if self.leaf_mode != LeafMode::Hybrid {
            return;
        }
        let mut memory = self.memory.lock().unwrap();
        memory.known_files.remove(path);
        memory.known_directories.insert(path.to_string());
    }

    /// `open`/`create`/`flock`/`lock`/rename-target classification
    /// transition: `unknown -> known_files`.
    pub fn mark_file(&self, path: &str) {
        if self.leaf_mode != LeafMode::Hybrid {
            return;
        }
        let mut memory = self.memory.lock().unwrap();
        memory.known_directories.remove(path);
        memory.known_files.insert(path.to_string());
    }

    /// `remove` classification transition: `known_{files,directories} -> unknown`.
    pub fn forget(&self, path: &str) {
        if self.leaf_mode != LeafMode::Hybrid {
            return;
        }
        let mut memory = self.memory.lock().unwrap();
        memory.known_files.remove(path);
        memory.known_directories.remove(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dir_mode_treats_data_node_as_leaf() {
        let classifier = Classifier::new(LeafMode::Dir);
        assert!(!Classifier::is_data_node_name("plain"));
        assert!(Classifier::is_data_node_name("_zoo_data_"));
        // Classification in DIR mode never touches the store.
        struct Unreachable;
        impl crate::store::StoreClient for Unreachable {
            fn connect(&self) -> crate::errors::StoreResult<()> {
                unreachable!()
            }
            fn exists(&self, _: &str) -> crate::errors::StoreResult<bool> {
                unreachable!()
            }
            fn get(&self, _: &str) -> crate::errors::StoreResult<(Vec<u8>, crate::store::NodeStat)> {
                unreachable!()
            }
            fn get_and_watch(
                &self,
                _: &str,
            ) -> crate::errors::StoreResult<(Vec<u8>, crate::store::NodeStat)> {
                unreachable!()
            }
            fn set(&self, _: &str, _: &[u8]) -> crate::errors::StoreResult<()> {
                unreachable!()
            }
            fn create(&self, _: &str) -> crate::errors::StoreResult<()> {
                unreachable!()
            }
            fn remove(&self, _: &str) -> crate::errors::StoreResult<()> {
                unreachable!()
            }
            fn children(&self, _: &str) -> crate::errors::StoreResult<Vec<String>> {
                unreachable!()
            }
            fn set_global_watcher(&self, _: Box<dyn crate::store::GlobalWatcher>) {
                unreachable!()
            }
            fn add_auth(&self, _: &str, _: &[u8]) -> crate::errors::StoreResult<()> {
                unreachable!()
            }
            fn close(&self) -> crate::errors::StoreResult<()> {
                unreachable!()
            }
        }
        assert!(classifier.is_directory("/a", &Unreachable).unwrap());
        assert!(!classifier.is_directory("/a/_zoo_data_", &Unreachable).unwrap());
    }

    #[test]
    fn hybrid_memory_is_mutually_exclusive() {
        let classifier = Classifier::new(LeafMode::Hybrid);
        classifier.mark_directory("/d");
        classifier.mark_file("/d");
        let memory = classifier.memory.lock().unwrap();
        assert!(!memory.known_directories.contains("/d"));
        assert!(memory.known_files.contains("/d"));
    }

    #[test]
    fn hybrid_forget_clears_both_sets() {
        let classifier = Classifier::new(LeafMode::Hybrid);
        classifier.mark_file("/d/x");
        classifier.forget("/d/x");
        let memory = classifier.memory.lock().unwrap();
        assert!(!memory.known_files.contains("/d/x"));
        assert!(!memory.known_directories.contains("/d/x"));
    }
}
