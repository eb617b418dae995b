//! Error taxonomy for the store adapter and the FUSE-facing operation layer.
//!
//! Mirrors the plain-enum style of an NFSv3 status code table: no
//! `thiserror`/`anyhow`, just `Copy` enums with an explicit mapping function
//! at the boundary that needs an OS-facing representation.

use std::fmt;

/// Status codes returned by the remote tree store, modeled after the
/// ZooKeeper return-code space. Only the subset this crate distinguishes is
/// named; anything else collapses into [`StoreError::Other`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// `ZNONODE` — the requested node does not exist.
    NoNode,
    /// `ZNODEEXISTS` — a node already exists at the target path.
    NodeExists,
    /// `ZNOTEMPTY` — a directory-like node has children and cannot be removed.
    NotEmpty,
    /// `ZNOAUTH` — the session lacks the credentials for this operation.
    NotAuthenticated,
    /// `ZINVALIDSTATE` — the session handle is not usable (never connected,
    /// or the connection was lost and not yet reestablished).
    InvalidState,
    /// Any other non-OK status the underlying client reported.
    Other(i32),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NoNode => write!(f, "no such node"),
            StoreError::NodeExists => write!(f, "node already exists"),
            StoreError::NotEmpty => write!(f, "node is not empty"),
            StoreError::NotAuthenticated => write!(f, "not authenticated"),
            StoreError::InvalidState => write!(f, "invalid session state"),
            StoreError::Other(code) => write!(f, "store error (code {code})"),
        }
    }
}

/// Errors surfaced from the FUSE-facing operation handlers, prior to being
/// converted into a raw errno for `fuser`'s reply types.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FsError {
    /// `AbsenceError` — path does not exist in the store.
    Absence,
    /// `AuthError` — store session lacks credentials.
    Auth,
    /// `NonEmptyError` — attempted to remove a non-empty node.
    NonEmpty,
    /// `StoreError` — any other store-reported failure.
    Store(StoreError),
    /// `ContextError` — the session or its handle is unavailable.
    Context,
    /// `InvalidRequest` — e.g. a write past `max_file_size`.
    InvalidRequest,
    /// `Unsupported` — e.g. directory rename.
    Unsupported,
    /// `PolicyDenied` — e.g. `create()` while in `LEAF_AS_DIR` mode.
    PolicyDenied,
    /// The store holds data structurally inconsistent with what this crate
    /// expects — e.g. a real child node literally named a reserved alias
    /// like `_zoo_data_`.
    Inconsistent,
}

impl FsError {
    /// Map this error to the POSIX errno `fuser` expects in a reply, per the
    /// table in spec.md §7.
    pub fn errno(self) -> i32 {
        match self {
            FsError::Absence => libc::ENOENT,
            FsError::Auth => libc::EACCES,
            FsError::NonEmpty => libc::ENOTEMPTY,
            FsError::Store(_) => libc::EIO,
            FsError::Context => libc::EIO,
            FsError::Inconsistent => libc::EIO,
            FsError::InvalidRequest => libc::EINVAL,
            FsError::Unsupported => libc::ENOSYS,
            FsError::PolicyDenied => libc::ENOENT,
        }
    }

    /// `getattr`'s store-error mapping, per spec.md §7: an auth failure
    /// surfaces as `EACCES` there and nowhere else — every other handler
    /// leaves it folded into the generic [`FsError::Store`] (`EIO`), per
    /// `examples/original_source/src/ZookeeperFuse.cpp`'s `getattr_callback`
    /// being the only callback that inspects `ZNOAUTH` specially.
    pub fn for_getattr(self) -> FsError {
        match self {
            FsError::Store(StoreError::NotAuthenticated) => FsError::Auth,
            other => other,
        }
    }
}

impl From<StoreError> for FsError {
    /// Default mapping used by every handler except `getattr` (see
    /// [`FsError::for_getattr`]): `NOT_EMPTY` -> non-empty error, anything
    /// else (including `NOT_AUTHENTICATED`) -> opaque store error (-> `EIO`).
    /// Handlers that need `NO_NODE` to mean something other than `ENOENT`
    /// (e.g. `exists` folding it into `false`) do not go through this
    /// conversion.
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NoNode => FsError::Absence,
            StoreError::NotEmpty => FsError::NonEmpty,
            other => FsError::Store(other),
        }
    }
}

pub type FsResult<T> = Result<T, FsError>;
pub type StoreResult<T> = Result<T, StoreError>;
