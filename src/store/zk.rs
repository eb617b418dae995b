//! Concrete [`StoreClient`] backed by the `zookeeper` crate.
//!
//! The `zookeeper` crate's client is synchronous and keeps its own
//! background I/O thread, delivering watch callbacks from that thread —
//! exactly the concurrency model spec.md §5 assumes, so no adaptation layer
//! (no executor, no channel hand-off) is needed here beyond translating
//! between `zookeeper`'s error/watch types and ours.

use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use tracing::{debug, warn};
use zookeeper::{Acl, CreateMode, WatchedEvent, Watcher, ZkError, ZkResult, ZkState, ZooKeeper};

use crate::errors::{StoreError, StoreResult};

use super::{EventKind, GlobalWatcher, NodeStat, StoreClient, StoreEvent};

/// Bridges `zookeeper::Watcher` callbacks to a [`GlobalWatcher`] trait
/// object, storing it behind a `Mutex` so it can be installed after the
/// `ZooKeeper` handle itself is constructed (the crate requires a watcher
/// at connect time, before our own watcher is ready to be wired up).
struct WatcherBridge {
    sink: Mutex<Option<Box<dyn GlobalWatcher>>>,
}

impl Watcher for WatcherBridge {
    fn handle(&self, event: WatchedEvent) {
        let kind = match event.event_type {
            zookeeper::WatchedEventType::NodeDataChanged => EventKind::NodeDataChanged,
            zookeeper::WatchedEventType::NodeChildrenChanged => EventKind::NodeChildrenChanged,
            zookeeper::WatchedEventType::NodeDeleted => EventKind::NodeDeleted,
            zookeeper::WatchedEventType::NodeCreated => EventKind::NodeCreated,
            _ => EventKind::SessionState,
        };
        let connected = matches!(event.keeper_state, ZkState::Connected | ZkState::ConnectedReadOnly);
        let evt = StoreEvent { kind, connected, path: event.path.clone() };
        debug!(?evt, "zk watcher event");
        if let Ok(guard) = self.sink.lock() {
            if let Some(sink) = guard.as_ref() {
                sink.on_event(evt);
            }
        }
    }
}

/// Store client adapter wrapping a single `zookeeper::ZooKeeper` handle.
pub struct ZkStoreClient {
    hosts: String,
    session_timeout: Duration,
    bridge: std::sync::Arc<WatcherBridge>,
    client: OnceLock<ZooKeeper>,
}

impl ZkStoreClient {
    pub fn new(hosts: impl Into<String>, session_timeout: Duration) -> Self {
        Self {
            hosts: hosts.into(),
            session_timeout,
            bridge: std::sync::Arc::new(WatcherBridge { sink: Mutex::new(None) }),
            client: OnceLock::new(),
        }
    }

    /// Establishes the connection on first use. `zookeeper::ZooKeeper::connect`
    /// blocks until the TCP handshake completes but does not wait for the
    /// session to reach `Connected`; [`crate::session::Session`] layers the
    /// connect barrier described in spec.md §4.3 on top of this.
    fn handle(&self) -> StoreResult<&ZooKeeper> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let bridge = std::sync::Arc::clone(&self.bridge);
        let connected = ZooKeeper::connect(&self.hosts, self.session_timeout, ArcWatcher(bridge))
            .map_err(|_| StoreError::InvalidState)?;
        let _ = self.client.set(connected);
        self.client.get().ok_or(StoreError::InvalidState)
    }
}

/// `zookeeper::Watcher` requires `Sized + 'static` ownership at connect
/// time; this thin wrapper lets us hand over a clone of the `Arc` while
/// keeping the actual sink mutable and installable afterwards.
struct ArcWatcher(std::sync::Arc<WatcherBridge>);

impl Watcher for ArcWatcher {
    fn handle(&self, event: WatchedEvent) {
        self.0.handle(event)
    }
}

fn map_zk_error(err: ZkError) -> StoreError {
    match err {
        ZkError::NoNode => StoreError::NoNode,
        ZkError::NodeExists => StoreError::NodeExists,
        ZkError::NotEmpty => StoreError::NotEmpty,
        ZkError::NoAuth => StoreError::NotAuthenticated,
        ZkError::InvalidState => StoreError::InvalidState,
        other => StoreError::Other(other as i32),
    }
}

fn map_zk_result<T>(result: ZkResult<T>) -> StoreResult<T> {
    result.map_err(map_zk_error)
}

impl StoreClient for ZkStoreClient {
    fn connect(&self) -> StoreResult<()> {
        self.handle()?;
        Ok(())
    }

    fn exists(&self, path: &str) -> StoreResult<bool> {
        let client = self.handle()?;
        match client.exists(path, false) {
            Ok(stat) => Ok(stat.is_some()),
            Err(ZkError::NoNode) => Ok(false),
            Err(other) => Err(map_zk_error(other)),
        }
    }

    fn get(&self, path: &str) -> StoreResult<(Vec<u8>, NodeStat)> {
        let client = self.handle()?;
        let (data, stat) = map_zk_result(client.get_data(path, false))?;
        Ok((data, NodeStat { mtime_millis: stat.mtime, ctime_millis: stat.ctime, version: stat.version }))
    }

    fn get_and_watch(&self, path: &str) -> StoreResult<(Vec<u8>, NodeStat)> {
        let client = self.handle()?;
        let watcher = ArcWatcher(std::sync::Arc::clone(&self.bridge));
        let (data, stat) = map_zk_result(client.get_data_w(path, watcher))?;
        Ok((data, NodeStat { mtime_millis: stat.mtime, ctime_millis: stat.ctime, version: stat.version }))
    }

    fn set(&self, path: &str, data: &[u8]) -> StoreResult<()> {
        let client = self.handle()?;
        map_zk_result(client.set_data(path, data.to_vec(), None)).map(|_| ())
    }

    fn create(&self, path: &str) -> StoreResult<()> {
        let client = self.handle()?;
        match client.create(path, Vec::new(), Acl::open_unsafe().clone(), CreateMode::Persistent) {
            Ok(_) => Ok(()),
            Err(ZkError::NodeExists) => Ok(()),
            Err(other) => Err(map_zk_error(other)),
        }
    }

    fn remove(&self, path: &str) -> StoreResult<()> {
        let client = self.handle()?;
        map_zk_result(client.delete(path, None))
    }

    fn children(&self, path: &str) -> StoreResult<Vec<String>> {
        let client = self.handle()?;
        map_zk_result(client.get_children(path, false))
    }

    fn set_global_watcher(&self, watcher: Box<dyn GlobalWatcher>) {
        if let Ok(mut guard) = self.bridge.sink.lock() {
            *guard = Some(watcher);
        }
    }

    fn add_auth(&self, scheme: &str, token: &[u8]) -> StoreResult<()> {
        let client = self.handle()?;
        if let Err(err) = client.add_auth(scheme, token.to_vec()) {
            warn!(?err, "zookeeper add_auth failed, continuing unauthenticated");
        }
        Ok(())
    }

    fn close(&self) -> StoreResult<()> {
        if let Some(client) = self.client.get() {
            if let Err(err) = client.close() {
                warn!(?err, "error closing zookeeper handle");
            }
        }
        Ok(())
    }
}
