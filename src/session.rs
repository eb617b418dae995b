//! [`Session`] — the process-wide mount state (spec.md §3 "Session", §4.3).
//!
//! Owns the store client handle, the connection barrier, the mount
//! configuration, the classification memory, and the symlink registry.
//! Created once at mount, torn down at unmount.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::classifier::Classifier;
use crate::config::{Config, LeafMode};
use crate::errors::{FsError, FsResult};
use crate::path_resolver::PathResolver;
use crate::store::{EventKind, GlobalWatcher, StoreClient, StoreEvent, ZkStoreClient};
use crate::symlinks::SymlinkRegistry;

/// Single-producer/single-consumer signal used for the first-connect
/// barrier (spec.md §4.3, DESIGN NOTES §9 "Connection barrier"). Replaces
/// the original's lock-free queue polled with `sleep(1)` with a condition
/// variable, matching the suggested REDESIGN FLAG.
#[derive(Default)]
struct ConnectBarrier {
    connected: Mutex<bool>,
    signal: Condvar,
}

impl ConnectBarrier {
    fn notify_connected(&self) {
        let mut guard = self.connected.lock().unwrap();
        *guard = true;
        self.signal.notify_all();
    }

    fn wait(&self) {
        let mut guard = self.connected.lock().unwrap();
        while !*guard {
            let (next, timed_out) =
                self.signal.wait_timeout(guard, Duration::from_secs(1)).unwrap();
            guard = next;
            if timed_out.timed_out() {
                debug!("still waiting for the zookeeper connection to be established");
            }
        }
    }
}

/// Watcher installed on the store client: forwards connection events to the
/// barrier, and invalidates the symlink sidecar cache on a data-change event
/// for `{root}/__symlinks__` (spec.md §4.3, §4.5).
struct SessionWatcher {
    barrier: std::sync::Arc<ConnectBarrier>,
    symlink_sidecar_path: String,
    symlinks_fresh: std::sync::Arc<AtomicBool>,
}

impl GlobalWatcher for SessionWatcher {
    fn on_event(&self, event: StoreEvent) {
        if event.connected {
            self.barrier.notify_connected();
        }
        if event.kind == EventKind::NodeDataChanged {
            if event.path.as_deref() == Some(self.symlink_sidecar_path.as_str()) {
                self.symlinks_fresh.store(false, Ordering::Relaxed);
            }
        }
    }
}

/// Process-wide singleton for the mount (spec.md §3 "Session").
pub struct Session {
    pub config: Config,
    client: Box<dyn StoreClient>,
    barrier: std::sync::Arc<ConnectBarrier>,
    connected_once: AtomicBool,
    pub classifier: Classifier,
    pub symlinks: SymlinkRegistry,
    pub path_resolver: PathResolver,
}

impl Session {
    /// Constructs the session. The store handle is not connected yet —
    /// connection happens lazily on first [`Session::handle`] call, per
    /// spec.md §4.3.
    pub fn new(config: Config) -> Self {
        let client: Box<dyn StoreClient> =
            Box::new(ZkStoreClient::new(config.hosts.clone(), Duration::from_secs(15)));
        Self::with_client(config, client)
    }

    /// Same as [`Session::new`], injecting the store client directly —
    /// lets tests substitute an in-memory [`crate::testing::FakeStoreClient`]
    /// for the real ZooKeeper-backed one.
    pub fn with_client(config: Config, client: Box<dyn StoreClient>) -> Self {
        let symlinks_fresh = std::sync::Arc::new(AtomicBool::new(false));
        let sidecar_path = format!("{}/__symlinks__", normalized_root(&config.root_path));

        let barrier = std::sync::Arc::new(ConnectBarrier::default());
        client.set_global_watcher(Box::new(SessionWatcher {
            barrier: std::sync::Arc::clone(&barrier),
            symlink_sidecar_path: sidecar_path.clone(),
            symlinks_fresh: std::sync::Arc::clone(&symlinks_fresh),
        }));

        Session {
            classifier: Classifier::new(config.leaf_mode),
            symlinks: SymlinkRegistry::new(sidecar_path, symlinks_fresh),
            path_resolver: PathResolver::new(normalized_root(&config.root_path), config.leaf_mode),
            config,
            client,
            barrier,
            connected_once: AtomicBool::new(false),
        }
    }

    /// Returns the (now-connected) store client, blocking the calling
    /// thread on cold start until the global watcher has observed a
    /// "connected" notification (spec.md §4.3).
    pub fn handle(&self) -> FsResult<&dyn StoreClient> {
        if !self.connected_once.load(Ordering::Acquire) {
            info!(hosts = %self.config.hosts, "connecting to zookeeper");
            // Must run unconditionally: auth submission below only drives a
            // connect when both `-A`/`-a` are configured, which would
            // otherwise leave the barrier below waiting on a "connected"
            // event that never fires for an unauthenticated mount.
            self.client.connect()?;
            if let (Some(scheme), Some(token)) =
                (self.config.auth_scheme.as_deref(), self.config.auth_token.as_deref())
            {
                // Submitting auth before the handle is known-connected
                // matches the original: zookeeper_init + zoo_add_auth are
                // both issued immediately, with add_auth failures only
                // logged (spec.md §4.2).
                let _ = self.client.add_auth(scheme, token.as_bytes());
            }
            self.barrier.wait();
            self.connected_once.store(true, Ordering::Release);
            info!("zookeeper session established");
        }
        Ok(self.client.as_ref())
    }

    pub fn leaf_mode(&self) -> LeafMode {
        self.config.leaf_mode
    }

    pub fn max_file_size(&self) -> usize {
        self.config.max_file_size
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(err) = self.client.close() {
            warn!(?err, "error closing store handle during session teardown");
        }
    }
}

/// Treats `"/"` as an empty prefix, per spec.md §4.1, so concatenation with
/// a kernel path never produces `"//"`.
pub fn normalized_root(root: &str) -> String {
    if root == "/" {
        String::new()
    } else {
        root.trim_end_matches('/').to_string()
    }
}
