//! In-memory [`StoreClient`] test double, modeled on the teacher crate's
//! `tests/shadow_fs/` fake filesystem: a flat keyspace good enough to drive
//! the operation handlers without a live ZooKeeper connection.
//!
//! Not `#[cfg(test)]`-gated: integration tests under `tests/` compile this
//! crate as an ordinary dependency, which strips `cfg(test)` from the lib,
//! so a fake meant to be shared between unit tests and `tests/*.rs` has to
//! live in an always-compiled module instead.

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::errors::{StoreError, StoreResult};
use crate::store::{EventKind, GlobalWatcher, NodeStat, StoreClient, StoreEvent};

#[derive(Default)]
struct Node {
    data: Vec<u8>,
}

/// An in-memory tree store: every node is a path key into a flat map, with
/// "directory-ness" implied the same way ZooKeeper implies it — a node can
/// have both data and children at once.
pub struct FakeStoreClient {
    nodes: Mutex<BTreeMap<String, Node>>,
    watcher: Mutex<Option<Box<dyn GlobalWatcher>>>,
}

impl FakeStoreClient {
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), Node::default());
        FakeStoreClient { nodes: Mutex::new(nodes), watcher: Mutex::new(None) }
    }

    /// Seeds a node directly, creating parent segments implicitly — lets
    /// tests set up a tree without going through `create`.
    pub fn seed(&self, path: &str, data: &[u8]) {
        let mut nodes = self.nodes.lock().unwrap();
        nodes.insert(path.to_string(), Node { data: data.to_vec() });
    }
}

impl Default for FakeStoreClient {
    fn default() -> Self {
        Self::new()
    }
}

fn child_names(nodes: &BTreeMap<String, Node>, parent: &str) -> Vec<String> {
    let prefix = if parent == "/" { "/".to_string() } else { format!("{parent}/") };
    nodes
        .keys()
        .filter_map(|path| {
            let rest = path.strip_prefix(&prefix)?;
            if rest.is_empty() || rest.contains('/') {
                return None;
            }
            Some(rest.to_string())
        })
        .collect()
}

impl StoreClient for FakeStoreClient {
    /// Synchronously notifies the installed watcher of a "connected" event —
    /// there is no background thread here to deliver it asynchronously the
    /// way the real `zookeeper`-backed client does, so the barrier
    /// [`crate::session::Session::handle`] waits on has to be satisfied
    /// before `connect` returns.
    fn connect(&self) -> StoreResult<()> {
        if let Some(watcher) = self.watcher.lock().unwrap().as_ref() {
            watcher.on_event(StoreEvent { kind: EventKind::SessionState, connected: true, path: None });
        }
        Ok(())
    }

    fn exists(&self, path: &str) -> StoreResult<bool> {
        Ok(self.nodes.lock().unwrap().contains_key(path))
    }

    fn get(&self, path: &str) -> StoreResult<(Vec<u8>, NodeStat)> {
        let nodes = self.nodes.lock().unwrap();
        let node = nodes.get(path).ok_or(StoreError::NoNode)?;
        Ok((node.data.clone(), NodeStat::default()))
    }

    fn get_and_watch(&self, path: &str) -> StoreResult<(Vec<u8>, NodeStat)> {
        self.get(path)
    }

    fn set(&self, path: &str, data: &[u8]) -> StoreResult<()> {
        let mut nodes = self.nodes.lock().unwrap();
        let node = nodes.get_mut(path).ok_or(StoreError::NoNode)?;
        node.data = data.to_vec();
        Ok(())
    }

    fn create(&self, path: &str) -> StoreResult<()> {
        let mut nodes = self.nodes.lock().unwrap();
        nodes.entry(path.to_string()).or_default();
        Ok(())
    }

    fn remove(&self, path: &str) -> StoreResult<()> {
        let mut nodes = self.nodes.lock().unwrap();
        if !nodes.contains_key(path) {
            return Err(StoreError::NoNode);
        }
        if !child_names(&nodes, path).is_empty() {
            return Err(StoreError::NotEmpty);
        }
        nodes.remove(path);
        Ok(())
    }

    fn children(&self, path: &str) -> StoreResult<Vec<String>> {
        let nodes = self.nodes.lock().unwrap();
        if !nodes.contains_key(path) {
            return Err(StoreError::NoNode);
        }
        Ok(child_names(&nodes, path))
    }

    fn set_global_watcher(&self, watcher: Box<dyn GlobalWatcher>) {
        *self.watcher.lock().unwrap() = Some(watcher);
    }

    fn add_auth(&self, _scheme: &str, _token: &[u8]) -> StoreResult<()> {
        Ok(())
    }

    fn close(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_node_is_visible() {
        let store = FakeStoreClient::new();
        store.seed("/a", b"hi");
        assert!(store.exists("/a").unwrap());
        assert_eq!(store.get("/a").unwrap().0, b"hi");
    }

    #[test]
    fn remove_rejects_nonempty() {
        let store = FakeStoreClient::new();
        store.create("/a").unwrap();
        store.create("/a/b").unwrap();
        assert_eq!(store.remove("/a").unwrap_err(), StoreError::NotEmpty);
        store.remove("/a/b").unwrap();
        store.remove("/a").unwrap();
    }

    #[test]
    fn children_lists_direct_descendants_only() {
        let store = FakeStoreClient::new();
        store.create("/a").unwrap();
        store.create("/a/b").unwrap();
        store.create("/a/b/c").unwrap();
        assert_eq!(store.children("/a").unwrap(), vec!["b".to_string()]);
    }
}
