//! [`SymlinkRegistry`] — the in-memory symlink table and its sidecar
//! persistence (spec.md §4.5, §3 "SymlinkRegistry"). Only consulted in
//! LEAF_AS_HYBRID; other modes never refresh it.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use tracing::{debug, warn};

use crate::errors::{FsError, FsResult};
use crate::store::StoreClient;

const REFRESH_ATTEMPTS: u32 = 3;

/// In-memory link table plus the sidecar path it is persisted to.
pub struct SymlinkRegistry {
    sidecar_path: String,
    table: RwLock<BTreeMap<String, String>>,
    fresh: std::sync::Arc<AtomicBool>,
}

impl SymlinkRegistry {
    pub fn new(sidecar_path: String, fresh: std::sync::Arc<AtomicBool>) -> Self {
        SymlinkRegistry { sidecar_path, table: RwLock::new(BTreeMap::new()), fresh }
    }

    /// Refreshes the in-memory table from the sidecar if the `fresh` flag is
    /// false (set by the session watcher on a data-change event for the
    /// sidecar, or never yet set true). Creates the sidecar if absent.
    /// Retries up to three times on store error; after exhausting retries,
    /// logs and continues with the existing (possibly stale) view —
    /// spec.md §4.5, §7 "Local recovery".
    pub fn refresh_if_stale(&self, store: &dyn StoreClient) {
        if self.fresh.load(Ordering::Relaxed) {
            return;
        }

        for attempt in 1..=REFRESH_ATTEMPTS {
            match self.try_refresh(store) {
                Ok(()) => {
                    self.fresh.store(true, Ordering::Relaxed);
                    return;
                }
                Err(err) => {
                    warn!(?err, attempt, "symlink sidecar refresh failed");
                }
            }
        }
        debug!("giving up on symlink sidecar refresh this round, using stale view");
    }

    fn try_refresh(&self, store: &dyn StoreClient) -> FsResult<()> {
        if !store.exists(&self.sidecar_path)? {
            store.create(&self.sidecar_path)?;
        }
        let (data, _stat) = store.get_and_watch(&self.sidecar_path)?;
        let text = String::from_utf8_lossy(&data);
        let mut parsed = BTreeMap::new();
        for line in text.split('\n') {
            if line.is_empty() {
                continue;
            }
            match line.split_once('=') {
                Some((link, target)) if !link.is_empty() => {
                    parsed.insert(link.to_string(), target.to_string());
                }
                _ => {
                    debug!(%line, "skipping corrupt symlink sidecar entry");
                }
            }
        }
        *self.table.write().unwrap() = parsed;
        Ok(())
    }

    pub fn lookup(&self, link: &str) -> Option<String> {
        self.table.read().unwrap().get(link).cloned()
    }

    pub fn contains(&self, link: &str) -> bool {
        self.table.read().unwrap().contains_key(link)
    }

    /// Names of every registered symlink whose store-path parent is exactly
    /// `parent` (spec.md §4.6 `readdir`, §9 open question 3: exact-equality
    /// match only, no nested resolution).
    pub fn children_of(&self, parent: &str) -> Vec<String> {
        let table = self.table.read().unwrap();
        table
            .keys()
            .filter_map(|link| {
                let (link_parent, name) = split_parent(link);
                (link_parent == parent).then(|| name.to_string())
            })
            .collect()
    }

    pub fn create(&self, link: &str, target: &str, store: &dyn StoreClient) -> FsResult<()> {
        self.table.write().unwrap().insert(link.to_string(), target.to_string());
        self.store(store)
    }

    pub fn remove(&self, link: &str, store: &dyn StoreClient) -> FsResult<()> {
        self.table.write().unwrap().remove(link);
        self.store(store)
    }

    /// Renames symlink entry `old` to `new`, preserving its target — the
    /// spec's identified fix for the original's `symlinks[target] = target`
    /// bug (spec.md §9 open question 4).
    pub fn rename(&self, old: &str, new: &str, store: &dyn StoreClient) -> FsResult<()> {
        let target = {
            let mut table = self.table.write().unwrap();
            let target = table.remove(old).ok_or(FsError::Absence)?;
            table.insert(new.to_string(), target.clone());
            target
        };
        let _ = target;
        self.store(store)
    }

    /// Serializes the table as `link=target` lines joined by `\n`, no
    /// trailing newline after the last entry, and writes it to the sidecar.
    fn store(&self, store: &dyn StoreClient) -> FsResult<()> {
        let serialized = {
            let table = self.table.read().unwrap();
            table
                .iter()
                .map(|(link, target)| format!("{link}={target}"))
                .collect::<Vec<_>>()
                .join("\n")
        };
        store.set(&self.sidecar_path, serialized.as_bytes())?;
        Ok(())
    }

    pub fn sidecar_path(&self) -> &str {
        &self.sidecar_path
    }
}

/// Splits `/a/b/c` into (`/a/b`, `c`); splits `/c` into (`/`, `c`), matching
/// [`crate::path_resolver::PathResolver::resolve`]'s convention that the
/// root store path is always `"/"`, never `""`.
fn split_parent(path: &str) -> (&str, &str) {
    match path.rsplit_once('/') {
        Some(("", name)) => ("/", name),
        Some((parent, name)) => (parent, name),
        None => ("/", path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_flag(value: bool) -> std::sync::Arc<AtomicBool> {
        std::sync::Arc::new(AtomicBool::new(value))
    }

    #[test]
    fn split_parent_handles_root_children() {
        assert_eq!(split_parent("/d/y"), ("/d", "y"));
        assert_eq!(split_parent("/y"), ("/", "y"));
    }

    #[test]
    fn rename_preserves_target_not_self_reference() {
        let registry = SymlinkRegistry::new("/__symlinks__".to_string(), fresh_flag(true));
        registry.table.write().unwrap().insert("/d/y".to_string(), "/d/x".to_string());
        {
            let mut table = registry.table.write().unwrap();
            let target = table.remove("/d/y").unwrap();
            table.insert("/d/z".to_string(), target);
        }
        assert_eq!(registry.lookup("/d/z").as_deref(), Some("/d/x"));
        assert!(registry.lookup("/d/y").is_none());
    }

    #[test]
    fn corrupt_lines_are_skipped_not_fatal() {
        let registry = SymlinkRegistry::new("/__symlinks__".to_string(), fresh_flag(true));
        let text = "/d/y=/d/x\nmalformed\n=empty-link\n";
        let mut parsed = BTreeMap::new();
        for line in text.split('\n') {
            if line.is_empty() {
                continue;
            }
            if let Some((link, target)) = line.split_once('=') {
                if !link.is_empty() {
                    parsed.insert(link.to_string(), target.to_string());
                }
            }
        }
        *registry.table.write().unwrap() = parsed;
        assert_eq!(registry.lookup("/d/y").as_deref(), Some("/d/x"));
        assert_eq!(registry.table.read().unwrap().len(), 1);
    }
}
