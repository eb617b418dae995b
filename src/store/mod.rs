//! Defines the [`StoreClient`] adapter interface — the thin boundary between
//! this crate's filesystem semantics and the remote tree store's RPCs.
//!
//! Mirrors the shape of the teacher crate's `vfs::Vfs` trait: a small set of
//! typed operations, a shared error type, and no assumptions about the wire
//! protocol underneath. A concrete implementation lives in [`zk`].

mod zk;

pub use zk::ZkStoreClient;

use crate::errors::StoreResult;

/// Node metadata accompanying `get`/`get_and_watch` responses. Only the
/// fields this crate actually consumes are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NodeStat {
    /// Last-modified time, milliseconds since the epoch.
    pub mtime_millis: i64,
    /// Node creation time, milliseconds since the epoch.
    pub ctime_millis: i64,
    /// Data version, used for logging / diagnostics only — writes in this
    /// crate are always unconditional (version -1), per spec.md §4.2.
    pub version: i32,
}

/// A connection-state or data-change notification delivered by the store's
/// watcher mechanism. `path` is `None` for session-wide state transitions
/// (e.g. "connected") and `Some` for a data/child watch firing on a specific
/// node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEvent {
    pub kind: EventKind,
    pub connected: bool,
    pub path: Option<String>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EventKind {
    SessionState,
    NodeDataChanged,
    NodeChildrenChanged,
    NodeDeleted,
    NodeCreated,
}

/// Callback invoked on the store client's own I/O thread whenever a
/// session-state or watch event arrives. Implementations must not block.
pub trait GlobalWatcher: Send + Sync + 'static {
    fn on_event(&self, event: StoreEvent);
}

/// Thin adapter over the remote tree store's RPCs (spec.md §4.2). All
/// operations are synchronous and blocking: the concrete store client keeps
/// its own I/O thread and these calls simply wait for the matching reply.
pub trait StoreClient: Send + Sync {
    /// Establishes the underlying connection if it hasn't been already.
    /// [`crate::session::Session::handle`] calls this unconditionally before
    /// gating on auth or waiting on the connect barrier (spec.md §4.3) —
    /// auth submission alone only drives a connect when both `-A`/`-a` are
    /// given, which would otherwise leave an unauthenticated mount waiting
    /// on a "connected" event nothing ever triggers.
    fn connect(&self) -> StoreResult<()>;

    /// `exists(path) -> bool`. A `NO_NODE` reply is not an error here —
    /// it folds into `Ok(false)`.
    fn exists(&self, path: &str) -> StoreResult<bool>;

    /// `get(path) -> bytes`, bounded by the configured `max_file_size`.
    fn get(&self, path: &str) -> StoreResult<(Vec<u8>, NodeStat)>;

    /// Same as [`StoreClient::get`], additionally installing a single-shot
    /// data-change watch on `path` whose firing is delivered to the global
    /// watcher passed to [`StoreClient::set_global_watcher`].
    fn get_and_watch(&self, path: &str) -> StoreResult<(Vec<u8>, NodeStat)>;

    /// Unconditional write (version = -1).
    fn set(&self, path: &str, data: &[u8]) -> StoreResult<()>;

    /// Creates an empty node with an open ACL.
    fn create(&self, path: &str) -> StoreResult<()>;

    /// Unconditional delete (version = -1). Implementations must surface
    /// "not empty" as [`crate::errors::StoreError::NotEmpty`] distinctly
    /// from other failures.
    fn remove(&self, path: &str) -> StoreResult<()>;

    /// Ordered set of child names (order is not meaningful; callers sort
    /// when a stable listing matters).
    fn children(&self, path: &str) -> StoreResult<Vec<String>>;

    /// Installs the session-wide watcher receiving connection state changes
    /// and fired watches. Called exactly once, at session construction.
    fn set_global_watcher(&self, watcher: Box<dyn GlobalWatcher>);

    /// Submits authentication credentials. Fire-and-forget: failures are
    /// logged by the caller, not surfaced (matches original behavior).
    fn add_auth(&self, scheme: &str, token: &[u8]) -> StoreResult<()>;

    /// Releases the underlying connection. Errors are logged, not raised.
    fn close(&self) -> StoreResult<()>;
}
