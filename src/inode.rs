//! Inode table bridging `fuser`'s handle-based low-level API onto the
//! path-keyed model spec.md describes (SPEC_FULL.md §4.6 "forget/lookup").
//!
//! The original C++ implementation used libfuse's high-level path-based API
//! directly; `fuser` only exposes the low-level, inode-based interface, so
//! every handler here still reasons in store paths and this table is purely
//! the translation at the boundary.

use std::collections::HashMap;
use std::sync::Mutex;

pub const ROOT_INO: u64 = 1;

struct Entry {
    path: String,
    lookups: u64,
}

/// Bidirectional map between FUSE inode numbers and store paths, with
/// reference counts driven by `lookup`/`forget` per the FUSE protocol.
pub struct InodeTable {
    inner: Mutex<Inner>,
}

struct Inner {
    by_ino: HashMap<u64, Entry>,
    by_path: HashMap<String, u64>,
    next_ino: u64,
}

impl InodeTable {
    pub fn new() -> Self {
        let mut by_ino = HashMap::new();
        by_ino.insert(ROOT_INO, Entry { path: "/".to_string(), lookups: 1 });
        let mut by_path = HashMap::new();
        by_path.insert("/".to_string(), ROOT_INO);
        InodeTable { inner: Mutex::new(Inner { by_ino, by_path, next_ino: ROOT_INO + 1 }) }
    }

    pub fn path_of(&self, ino: u64) -> Option<String> {
        self.inner.lock().unwrap().by_ino.get(&ino).map(|e| e.path.clone())
    }

    /// Returns the existing inode for `path`, allocating and registering a
    /// new one (with lookup count 1) if this is the first time it has been
    /// named — the FUSE `lookup` contract.
    pub fn lookup(&self, path: &str) -> u64 {
        let mut inner = self.inner.lock().unwrap();
        if let Some(&ino) = inner.by_path.get(path) {
            if let Some(entry) = inner.by_ino.get_mut(&ino) {
                entry.lookups += 1;
            }
            return ino;
        }
        let ino = inner.next_ino;
        inner.next_ino += 1;
        inner.by_ino.insert(ino, Entry { path: path.to_string(), lookups: 1 });
        inner.by_path.insert(path.to_string(), ino);
        ino
    }

    /// Decrements the lookup count by `nlookup`, evicting the entry once it
    /// reaches zero, per FUSE's `forget` semantics.
    pub fn forget(&self, ino: u64, nlookup: u64) {
        if ino == ROOT_INO {
            return;
        }
        let mut inner = self.inner.lock().unwrap();
        let remove = match inner.by_ino.get_mut(&ino) {
            Some(entry) => {
                entry.lookups = entry.lookups.saturating_sub(nlookup);
                entry.lookups == 0
            }
            None => false,
        };
        if remove {
            if let Some(entry) = inner.by_ino.remove(&ino) {
                inner.by_path.remove(&entry.path);
            }
        }
    }

    /// Drops any stale mapping for `path` after it is removed from the
    /// store, so a later recreation is assigned a fresh inode.
    pub fn forget_path(&self, path: &str) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(ino) = inner.by_path.remove(path) {
            inner.by_ino.remove(&ino);
        }
    }

    /// Re-keys a path after rename, keeping the same inode number alive.
    pub fn rename_path(&self, old: &str, new: &str) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(ino) = inner.by_path.remove(old) {
            if let Some(entry) = inner.by_ino.get_mut(&ino) {
                entry.path = new.to_string();
            }
            inner.by_path.insert(new.to_string(), ino);
        }
    }
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_stable_and_counts_references() {
        let table = InodeTable::new();
        let ino1 = table.lookup("/a");
        let ino2 = table.lookup("/a");
        assert_eq!(ino1, ino2);
        assert_eq!(table.path_of(ino1).as_deref(), Some("/a"));
    }

    #[test]
    fn forget_evicts_after_refcount_reaches_zero() {
        let table = InodeTable::new();
        let ino = table.lookup("/a");
        let _ = table.lookup("/a");
        table.forget(ino, 1);
        assert!(table.path_of(ino).is_some());
        table.forget(ino, 1);
        assert!(table.path_of(ino).is_none());
    }

    #[test]
    fn root_is_preseeded_and_never_forgotten() {
        let table = InodeTable::new();
        assert_eq!(table.path_of(ROOT_INO).as_deref(), Some("/"));
        table.forget(ROOT_INO, u64::MAX);
        assert_eq!(table.path_of(ROOT_INO).as_deref(), Some("/"));
    }
}
