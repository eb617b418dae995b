use zoofs::config::{Config, LogLevel};
use zoofs::inode::ROOT_INO;
use zoofs::store::StoreClient;
use zoofs::testing::FakeStoreClient;
use zoofs::{FsOps, LeafMode, Session};

/// Test fixture bundling an [`FsOps`] wired to an in-memory store, parallel
/// to the teacher crate's `Fixture` + `ShadowFS` pair.
pub struct Fixture {
    pub fs: FsOps,
}

pub const ROOT: u64 = ROOT_INO;

impl Fixture {
    pub fn new(leaf_mode: LeafMode) -> Self {
        Self::with_max_file_size(leaf_mode, 256 * 1024)
    }

    pub fn with_max_file_size(leaf_mode: LeafMode, max_file_size: usize) -> Self {
        let config = Config {
            hosts: String::new(),
            auth_scheme: None,
            auth_token: None,
            root_path: "/".to_string(),
            leaf_mode,
            max_file_size,
            log_level: LogLevel::Error,
            log_file: None,
        };
        let client: Box<dyn StoreClient> = Box::new(FakeStoreClient::new());
        let session = Session::with_client(config, client);
        Fixture { fs: FsOps::new(session) }
    }
}
