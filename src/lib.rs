//! Mounts a ZooKeeper-like coordination tree as a POSIX filesystem via FUSE.

pub mod classifier;
pub mod config;
pub mod errors;
pub mod fsops;
pub mod inode;
pub mod path_resolver;
pub mod session;
pub mod store;
pub mod symlinks;
#[doc(hidden)]
pub mod testing;

pub use config::{Cli, Config, LeafMode};
pub use fsops::FsOps;
pub use session::Session;
