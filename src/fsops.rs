//! [`FsOps`] — the POSIX operation handlers (spec.md §4.6), implemented as a
//! `fuser::Filesystem`.
//!
//! `fuser` exposes the low-level, inode-based FUSE ABI rather than the
//! original's path-based high-level libfuse API, so an [`InodeTable`] bridges
//! the two (SPEC_FULL.md §4.6 "forget/lookup"); every handler below still
//! reasons in store paths once past that boundary.
//!
//! Each FUSE trait method is a thin reply-translating wrapper around a plain
//! `do_*` method returning [`FsResult`]. `fuser::Request`/`Reply*` have no
//! public constructors outside the `fuser` crate, so the `do_*` methods are
//! what [`crate::testing`]-backed integration tests call directly.

use std::ffi::OsStr;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use fuser::{
    FileAttr, FileType, Filesystem, KernelConfig, ReplyAttr, ReplyCreate, ReplyData,
    ReplyDirectory, ReplyEmpty, ReplyEntry, ReplyOpen, ReplyStatfs, ReplyWrite, Request,
    TimeOrNow,
};
use tracing::{debug, warn};

use crate::config::LeafMode;
use crate::errors::{FsError, FsResult};
use crate::inode::{InodeTable, ROOT_INO};
use crate::path_resolver::{DATA_NODE_NAME, SYMLINK_SIDECAR_NAME};
use crate::session::Session;
use crate::store::{NodeStat, StoreClient};

/// Kernel metadata cache lifetime. Kept short: the store can be mutated by
/// other clients and the only invalidation signal this crate has (the
/// symlink sidecar watch) doesn't cover ordinary file/directory content.
const TTL: Duration = Duration::from_secs(1);
const BLOCK_SIZE: u32 = 512;

struct UidGid {
    uid: u32,
    gid: u32,
}

impl UidGid {
    fn current() -> Self {
        // SAFETY: getuid/getgid never fail.
        UidGid { uid: unsafe { libc::getuid() }, gid: unsafe { libc::getgid() } }
    }
}

/// What a store path resolves to from POSIX's point of view, per spec.md
/// §4.4/§4.6.
enum Kind {
    Symlink { target_len: u64 },
    Directory { stat: NodeStat },
    File { size: u64, stat: NodeStat },
}

/// The `fuser::Filesystem` implementation. Owns the [`Session`] (store handle
/// + classification memory + symlink registry) and the inode table bridging
/// layer.
pub struct FsOps {
    session: Session,
    inodes: InodeTable,
    ids: UidGid,
}

impl FsOps {
    pub fn new(session: Session) -> Self {
        FsOps { session, inodes: InodeTable::new(), ids: UidGid::current() }
    }

    /// Exposes the underlying [`Session`] so integration tests can inspect
    /// store/classifier/symlink state directly (e.g. sidecar content) after
    /// driving operations through the `do_*` methods.
    pub fn session(&self) -> &Session {
        &self.session
    }

    fn path_of(&self, ino: u64) -> FsResult<String> {
        self.inodes.path_of(ino).ok_or(FsError::Context)
    }

    /// Translates a kernel-visible path (as tracked by the inode table) to
    /// its store path (spec.md §4.1): applies the configured root prefix and,
    /// in LEAF_AS_DIR, strips a trailing synthetic data-node segment.
    fn store_path(&self, kernel_path: &str) -> String {
        self.session.path_resolver.resolve(kernel_path)
    }

    /// Logs the call and, in HYBRID mode, refreshes the symlink registry if
    /// stale, before returning the connected store handle — the common
    /// prologue every handler runs (spec.md §4.6 "All handlers begin with").
    fn enter(&self, op: &'static str, path: &str) -> FsResult<&dyn StoreClient> {
        debug!(op, path, "fs op");
        let store = self.session.handle()?;
        if self.session.leaf_mode() == LeafMode::Hybrid {
            self.session.symlinks.refresh_if_stale(store);
        }
        Ok(store)
    }

    /// True if `kernel_path` names the synthetic data-node alias under a
    /// LEAF_AS_DIR directory (spec.md §4.1 glossary "Data node"). Once
    /// resolved to a store path this alias is indistinguishable from its
    /// parent directory's own path, so callers must check the kernel path
    /// before resolution to tell the two apart.
    fn is_data_node_alias(&self, kernel_path: &str) -> bool {
        self.session.leaf_mode() == LeafMode::Dir
            && kernel_path.rsplit('/').next() == Some(DATA_NODE_NAME)
    }

    /// Classifies `store_path` as symlink/directory/file per spec.md §4.4,
    /// §4.6 `getattr`. Fails with [`FsError::Absence`] if the node (and no
    /// registered symlink) exists. Does not special-case the LEAF_AS_DIR
    /// data-node alias — callers addressing a kernel path ending in
    /// `_zoo_data_` must use [`FsOps::classify_kernel_path`] instead.
    fn classify(&self, path: &str, store: &dyn StoreClient) -> FsResult<Kind> {
        if self.session.leaf_mode() == LeafMode::Hybrid {
            if let Some(target) = self.session.symlinks.lookup(path) {
                return Ok(Kind::Symlink { target_len: target.len() as u64 });
            }
        }
        if !store.exists(path)? {
            return Err(FsError::Absence);
        }
        let is_dir = self.session.classifier.is_directory(path, store)?;
        let (content, stat) = store.get(path)?;
        if is_dir {
            Ok(Kind::Directory { stat })
        } else {
            Ok(Kind::File { size: content.len() as u64, stat })
        }
    }

    /// Classifies a path as seen by the kernel (pre-resolution), handling the
    /// LEAF_AS_DIR data-node alias: it always reports as a file holding the
    /// parent directory node's own content, never as a directory.
    fn classify_kernel_path(
        &self,
        kernel_path: &str,
        store_path: &str,
        store: &dyn StoreClient,
    ) -> FsResult<Kind> {
        if self.is_data_node_alias(kernel_path) {
            if !store.exists(store_path)? {
                return Err(FsError::Absence);
            }
            let (content, stat) = store.get(store_path)?;
            return Ok(Kind::File { size: content.len() as u64, stat });
        }
        self.classify(store_path, store)
    }

    fn attr_for(&self, ino: u64, kind: &Kind) -> FileAttr {
        let (file_type, perm, nlink, size, mtime) = match kind {
            Kind::Symlink { target_len } => (FileType::Symlink, 0o755, 2, *target_len, UNIX_EPOCH),
            Kind::Directory { stat } => {
                (FileType::Directory, 0o755, 2, 0, millis_to_systemtime(stat.mtime_millis))
            }
            Kind::File { size, stat } => {
                (FileType::RegularFile, 0o777, 1, *size, millis_to_systemtime(stat.mtime_millis))
            }
        };
        FileAttr {
            ino,
            size,
            blocks: size.div_ceil(BLOCK_SIZE as u64),
            atime: mtime,
            mtime,
            ctime: mtime,
            crtime: mtime,
            kind: file_type,
            perm,
            nlink,
            uid: self.ids.uid,
            gid: self.ids.gid,
            rdev: 0,
            blksize: BLOCK_SIZE,
            flags: 0,
        }
    }

    fn attr_by_path(
        &self,
        ino: u64,
        kernel_path: &str,
        store_path: &str,
        store: &dyn StoreClient,
    ) -> FsResult<FileAttr> {
        let kind = self.classify_kernel_path(kernel_path, store_path, store)?;
        Ok(self.attr_for(ino, &kind))
    }

    fn join_child(parent: &str, name: &OsStr) -> String {
        let name = name.to_string_lossy();
        if parent == "/" {
            format!("/{name}")
        } else {
            format!("{parent}/{name}")
        }
    }

    fn parent_path(path: &str) -> &str {
        match path.rsplit_once('/') {
            Some(("", _)) | None => "/",
            Some((parent, _)) => parent,
        }
    }

    /// Deletes `path` if it's present as either a registered symlink or a
    /// store node, per `rename`'s "delete dst if present" contract.
    fn delete_if_present(&self, path: &str, store: &dyn StoreClient) -> FsResult<()> {
        if self.session.symlinks.contains(path) {
            self.session.symlinks.remove(path, store)?;
            self.inodes.forget_path(path);
            return Ok(());
        }
        if store.exists(path)? {
            store.remove(path)?;
            self.session.classifier.forget(path);
            self.inodes.forget_path(path);
        }
        Ok(())
    }

    /// Builds the non-HYBRID `readdir` listing (spec.md §4.6): the synthetic
    /// `_zoo_data_` entry followed by every real child, reported as
    /// `child_kind` (directories in LEAF_AS_DIR, regular files in
    /// LEAF_AS_FILE). A real store child literally named `_zoo_data_` is a
    /// hard error in both modes — there is no way to represent it alongside
    /// the synthetic alias.
    fn non_hybrid_entries(
        &self,
        path: &str,
        children: Vec<String>,
        child_kind: FileType,
    ) -> FsResult<Vec<(u64, FileType, String)>> {
        let mut entries = Vec::with_capacity(children.len() + 1);
        let data_node_path = Self::join_child(path, OsStr::new(DATA_NODE_NAME));
        let data_node_ino = self.inodes.lookup(&data_node_path);
        entries.push((data_node_ino, FileType::RegularFile, DATA_NODE_NAME.to_string()));
        for name in children {
            if name == DATA_NODE_NAME {
                warn!(path, "store child literally named the reserved data-node alias");
                return Err(FsError::Inconsistent);
            }
            let child_path = Self::join_child(path, OsStr::new(&name));
            let child_ino = self.inodes.lookup(&child_path);
            entries.push((child_ino, child_kind, name));
        }
        Ok(entries)
    }
}

fn millis_to_systemtime(millis: i64) -> SystemTime {
    if millis <= 0 {
        UNIX_EPOCH
    } else {
        UNIX_EPOCH + Duration::from_millis(millis as u64)
    }
}

/// Logs a handler failure at the point it is discovered and returns the same
/// error, so the original error site — not just the final reply — carries
/// `op`/`path` context.
fn log_err(op: &'static str, path: &str, err: FsError) -> FsError {
    warn!(op, path, ?err, "fs op failed");
    err
}

/// Plain, `fuser`-free operation handlers (spec.md §4.6). Exercised directly
/// by the in-memory integration tests; the `Filesystem` impl below is a thin
/// reply-translating wrapper over these.
impl FsOps {
    pub fn do_lookup(&self, parent: u64, name: &OsStr) -> FsResult<(u64, FileAttr)> {
        let parent_path = self.path_of(parent).map_err(|err| log_err("lookup", "?", err))?;
        let path = Self::join_child(&parent_path, name);
        let store_path = self.store_path(&path);
        let store = self.enter("lookup", &store_path).map_err(|err| log_err("lookup", &store_path, err))?;
        let ino = self.inodes.lookup(&path);
        match self.attr_by_path(ino, &path, &store_path, store) {
            Ok(attr) => Ok((ino, attr)),
            Err(err) => {
                self.inodes.forget_path(&path);
                Err(log_err("lookup", &store_path, err))
            }
        }
    }

    pub fn do_getattr(&self, ino: u64) -> FsResult<FileAttr> {
        let path = self.path_of(ino).map_err(|err| log_err("getattr", "?", err))?;
        let store_path = self.store_path(&path);
        let store =
            self.enter("getattr", &store_path).map_err(|err| log_err("getattr", &store_path, err.for_getattr()))?;
        self.attr_by_path(ino, &path, &store_path, store)
            .map_err(|err| log_err("getattr", &store_path, err.for_getattr()))
    }

    pub fn do_setattr(&self, ino: u64, size: Option<u64>) -> FsResult<FileAttr> {
        let path = self.path_of(ino).map_err(|err| log_err("setattr", "?", err))?;
        let store_path = self.store_path(&path);
        let store =
            self.enter("setattr", &store_path).map_err(|err| log_err("setattr", &store_path, err))?;

        if let Some(new_size) = size {
            truncate(store, &store_path, new_size as usize)
                .map_err(|err| log_err("setattr", &store_path, err))?;
        }

        self.attr_by_path(ino, &path, &store_path, store)
            .map_err(|err| log_err("setattr", &store_path, err))
    }

    /// Returns `Ok(target_bytes)` for a registered symlink. A real,
    /// non-symlink node maps to [`FsError::InvalidRequest`] (`EINVAL`); a
    /// missing one maps to [`FsError::Absence`] (`ENOENT`).
    pub fn do_readlink(&self, ino: u64) -> FsResult<Vec<u8>> {
        let path = self.path_of(ino).map_err(|err| log_err("readlink", "?", err))?;
        let store_path = self.store_path(&path);
        let store =
            self.enter("readlink", &store_path).map_err(|err| log_err("readlink", &store_path, err))?;
        if let Some(target) = self.session.symlinks.lookup(&store_path) {
            return Ok(target.into_bytes());
        }
        match store.exists(&store_path) {
            Ok(true) => Err(log_err("readlink", &store_path, FsError::InvalidRequest)),
            Ok(false) => Err(log_err("readlink", &store_path, FsError::Absence)),
            Err(err) => Err(log_err("readlink", &store_path, err.into())),
        }
    }

    pub fn do_mkdir(&self, parent: u64, name: &OsStr) -> FsResult<(u64, FileAttr)> {
        let parent_path = self.path_of(parent).map_err(|err| log_err("mkdir", "?", err))?;
        let path = Self::join_child(&parent_path, name);
        let store_path = self.store_path(&path);
        let store = self.enter("mkdir", &store_path).map_err(|err| log_err("mkdir", &store_path, err))?;

        let result = (|| -> FsResult<()> {
            if !store.exists(&store_path)? {
                store.create(&store_path)?;
            }
            self.session.classifier.mark_directory(&store_path);
            Ok(())
        })();
        result.map_err(|err| log_err("mkdir", &store_path, err))?;

        let ino = self.inodes.lookup(&path);
        self.attr_by_path(ino, &path, &store_path, store)
            .map(|attr| (ino, attr))
            .map_err(|err| log_err("mkdir", &store_path, err))
    }

    pub fn do_create(&self, parent: u64, name: &OsStr) -> FsResult<(u64, FileAttr)> {
        let parent_path = self.path_of(parent).map_err(|err| log_err("create", "?", err))?;
        let path = Self::join_child(&parent_path, name);
        let store_path = self.store_path(&path);
        let store = self.enter("create", &store_path).map_err(|err| log_err("create", &store_path, err))?;

        if self.session.leaf_mode() == LeafMode::Dir {
            return Err(log_err("create", &store_path, FsError::PolicyDenied));
        }

        let result = (|| -> FsResult<()> {
            if !store.exists(&store_path)? {
                store.create(&store_path)?;
            }
            self.session.classifier.mark_file(&store_path);
            Ok(())
        })();
        result.map_err(|err| log_err("create", &store_path, err))?;

        let ino = self.inodes.lookup(&path);
        self.attr_by_path(ino, &path, &store_path, store)
            .map(|attr| (ino, attr))
            .map_err(|err| log_err("create", &store_path, err))
    }

    pub fn do_open(&self, ino: u64) -> FsResult<()> {
        let path = self.path_of(ino).map_err(|err| log_err("open", "?", err))?;
        let store_path = self.store_path(&path);
        let store = self.enter("open", &store_path).map_err(|err| log_err("open", &store_path, err))?;
        if self.session.leaf_mode() == LeafMode::Hybrid {
            let result = (|| -> FsResult<()> {
                if !store.exists(&store_path)? {
                    store.create(&store_path)?;
                }
                self.session.classifier.mark_file(&store_path);
                Ok(())
            })();
            result.map_err(|err| log_err("open", &store_path, err))?;
        }
        Ok(())
    }

    pub fn do_opendir(&self, ino: u64) -> FsResult<()> {
        let path = self.path_of(ino).map_err(|err| log_err("opendir", "?", err))?;
        if self.session.leaf_mode() == LeafMode::Hybrid {
            let store_path = self.store_path(&path);
            self.session.classifier.mark_directory(&store_path);
        }
        Ok(())
    }

    pub fn do_read(&self, ino: u64, offset: i64, size: u32) -> FsResult<Vec<u8>> {
        let path = self.path_of(ino).map_err(|err| log_err("read", "?", err))?;
        let store_path = self.store_path(&path);
        let store = self.enter("read", &store_path).map_err(|err| log_err("read", &store_path, err))?;
        let content = store.get(&store_path).map(|(data, _stat)| data).map_err(|err| {
            let err: FsError = err.into();
            log_err("read", &store_path, err)
        })?;
        let offset = offset.max(0) as usize;
        if offset >= content.len() {
            return Ok(Vec::new());
        }
        let end = (offset + size as usize).min(content.len());
        Ok(content[offset..end].to_vec())
    }

    pub fn do_write(&self, ino: u64, offset: i64, data: &[u8]) -> FsResult<u32> {
        let path = self.path_of(ino).map_err(|err| log_err("write", "?", err))?;
        let store_path = self.store_path(&path);
        let store = self.enter("write", &store_path).map_err(|err| log_err("write", &store_path, err))?;

        let offset = offset.max(0) as usize;
        if offset + data.len() > self.session.max_file_size() {
            return Err(log_err("write", &store_path, FsError::InvalidRequest));
        }

        let mut content = store.get(&store_path).map(|(data, _stat)| data).map_err(|err| {
            let err: FsError = err.into();
            log_err("write", &store_path, err)
        })?;
        let needed = offset + data.len();
        if content.len() < needed {
            content.resize(needed, 0);
        }
        content[offset..needed].copy_from_slice(data);

        store
            .set(&store_path, &content)
            .map_err(|err| log_err("write", &store_path, err.into()))?;
        Ok(data.len() as u32)
    }

    pub fn do_remove(&self, parent: u64, name: &OsStr, op: &'static str) -> FsResult<()> {
        let parent_path = self.path_of(parent).map_err(|err| log_err(op, "?", err))?;
        let path = Self::join_child(&parent_path, name);
        let store_path = self.store_path(&path);
        let store = self.enter(op, &store_path).map_err(|err| log_err(op, &store_path, err))?;

        let result = (|| -> FsResult<()> {
            if self.session.symlinks.contains(&store_path) {
                self.session.symlinks.remove(&store_path, store)?;
            } else {
                store.remove(&store_path)?;
                self.session.classifier.forget(&store_path);
            }
            self.inodes.forget_path(&path);
            Ok(())
        })();
        result.map_err(|err| log_err(op, &store_path, err))
    }

    /// Creates a symlink. HYBRID-only (spec.md §9): in DIR/FILE mode, the
    /// symlink registry and its `__symlinks__` sidecar are never consulted
    /// by `classify`, so a symlink created there would be immediately
    /// unreachable via `getattr`/`lookup`.
    pub fn do_symlink(&self, parent: u64, link_name: &OsStr, target: &Path) -> FsResult<(u64, FileAttr)> {
        let parent_path = self.path_of(parent).map_err(|err| log_err("symlink", "?", err))?;
        let link = Self::join_child(&parent_path, link_name);
        let store_link = self.store_path(&link);
        let target = target.to_string_lossy().into_owned();
        let store =
            self.enter("symlink", &store_link).map_err(|err| log_err("symlink", &store_link, err))?;

        if self.session.leaf_mode() != LeafMode::Hybrid {
            return Err(log_err("symlink", &store_link, FsError::Unsupported));
        }

        self.session
            .symlinks
            .create(&store_link, &target, store)
            .map_err(|err| log_err("symlink", &store_link, err))?;

        let ino = self.inodes.lookup(&link);
        let attr = self.attr_for(ino, &Kind::Symlink { target_len: target.len() as u64 });
        Ok((ino, attr))
    }

    pub fn do_rename(&self, parent: u64, name: &OsStr, newparent: u64, newname: &OsStr) -> FsResult<()> {
        let parent_path = self.path_of(parent).map_err(|err| log_err("rename", "?", err))?;
        let new_parent_path = self.path_of(newparent).map_err(|err| log_err("rename", "?", err))?;
        let src = Self::join_child(&parent_path, name);
        let dst = Self::join_child(&new_parent_path, newname);
        let store_src = self.store_path(&src);
        let store_dst = self.store_path(&dst);

        let store = self.enter("rename", &store_src).map_err(|err| log_err("rename", &store_src, err))?;

        let is_hybrid = self.session.leaf_mode() == LeafMode::Hybrid;
        let src_is_symlink = is_hybrid && self.session.symlinks.contains(&store_src);

        let result = (|| -> FsResult<()> {
            if !src_is_symlink {
                if let Ok(Kind::Directory { .. }) = self.classify(&store_src, store) {
                    return Err(FsError::Unsupported);
                }
            }

            self.delete_if_present(&store_dst, store)?;

            if src_is_symlink {
                self.session.symlinks.rename(&store_src, &store_dst, store)?;
            } else {
                store.create(&store_dst)?;
                let (content, _stat) = store.get(&store_src)?;
                store.set(&store_dst, &content)?;
                self.session.classifier.mark_file(&store_dst);
                store.remove(&store_src)?;
                self.session.classifier.forget(&store_src);
            }
            self.inodes.rename_path(&src, &dst);
            Ok(())
        })();

        result.map_err(|err| log_err("rename", &store_src, err))
    }

    pub fn do_access(&self, ino: u64) -> FsResult<()> {
        let path = self.path_of(ino).map_err(|err| log_err("access", "?", err))?;
        let store_path = self.store_path(&path);
        let store = self.enter("access", &store_path).map_err(|err| log_err("access", &store_path, err))?;
        if self.session.symlinks.contains(&store_path) {
            return Ok(());
        }
        match store.exists(&store_path) {
            Ok(true) => Ok(()),
            Ok(false) => Err(log_err("access", &store_path, FsError::Absence)),
            Err(err) => Err(log_err("access", &store_path, err.into())),
        }
    }

    pub fn do_readdir(&self, ino: u64) -> FsResult<Vec<(u64, FileType, String)>> {
        let path = self.path_of(ino).map_err(|err| log_err("readdir", "?", err))?;
        let store_path = self.store_path(&path);
        let store =
            self.enter("readdir", &store_path).map_err(|err| log_err("readdir", &store_path, err))?;

        let parent_ino = if ino == ROOT_INO {
            ROOT_INO
        } else {
            self.inodes.lookup(Self::parent_path(&path))
        };

        let mut entries: Vec<(u64, FileType, String)> = vec![
            (ino, FileType::Directory, ".".to_string()),
            (parent_ino, FileType::Directory, "..".to_string()),
        ];

        let children = store
            .children(&store_path)
            .map_err(|err| log_err("readdir", &store_path, err.into()))?;

        match self.session.leaf_mode() {
            LeafMode::Dir => {
                let mut dir_entries = self
                    .non_hybrid_entries(&path, children, FileType::Directory)
                    .map_err(|err| log_err("readdir", &store_path, err))?;
                entries.append(&mut dir_entries);
            }
            LeafMode::File => {
                let mut file_entries = self
                    .non_hybrid_entries(&path, children, FileType::RegularFile)
                    .map_err(|err| log_err("readdir", &store_path, err))?;
                entries.append(&mut file_entries);
            }
            LeafMode::Hybrid => {
                for name in self.session.symlinks.children_of(&store_path) {
                    let link_path = Self::join_child(&path, OsStr::new(&name));
                    let link_ino = self.inodes.lookup(&link_path);
                    entries.push((link_ino, FileType::Symlink, name));
                }
                for name in children {
                    if name == SYMLINK_SIDECAR_NAME {
                        continue;
                    }
                    let child_path = Self::join_child(&path, OsStr::new(&name));
                    let child_store_path = Self::join_child(&store_path, OsStr::new(&name));
                    let is_dir = self
                        .session
                        .classifier
                        .is_directory(&child_store_path, store)
                        .map_err(|err| log_err("readdir", &child_store_path, err))?;
                    let child_ino = self.inodes.lookup(&child_path);
                    let kind = if is_dir { FileType::Directory } else { FileType::RegularFile };
                    entries.push((child_ino, kind, name));
                }
            }
        }

        Ok(entries)
    }
}

impl Filesystem for FsOps {
    fn init(&mut self, _req: &Request<'_>, _config: &mut KernelConfig) -> Result<(), libc::c_int> {
        Ok(())
    }

    fn destroy(&mut self) {
        debug!("filesystem unmounting");
    }

    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        match self.do_lookup(parent, name) {
            Ok((_ino, attr)) => reply.entry(&TTL, &attr, 0),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn forget(&mut self, _req: &Request<'_>, ino: u64, nlookup: u64) {
        self.inodes.forget(ino, nlookup);
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        match self.do_getattr(ino) {
            Ok(attr) => reply.attr(&TTL, &attr),
            Err(err) => reply.error(err.errno()),
        }
    }

    /// `chmod`/`chown`/`utime` are accepted and ignored (spec.md Non-goals);
    /// a `size` is the only field that does real work — it drives
    /// `truncate` (spec.md §4.6).
    #[allow(clippy::too_many_arguments)]
    fn setattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        size: Option<u64>,
        _atime: Option<TimeOrNow>,
        _mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        match self.do_setattr(ino, size) {
            Ok(attr) => reply.attr(&TTL, &attr),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn readlink(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyData) {
        match self.do_readlink(ino) {
            Ok(target) => reply.data(&target),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn mkdir(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        match self.do_mkdir(parent, name) {
            Ok((_ino, attr)) => reply.entry(&TTL, &attr, 0),
            Err(err) => reply.error(err.errno()),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn create(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        _flags: i32,
        reply: ReplyCreate,
    ) {
        match self.do_create(parent, name) {
            Ok((_ino, attr)) => reply.created(&TTL, &attr, 0, 0, 0),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        match self.do_open(ino) {
            Ok(()) => reply.opened(0, 0),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn opendir(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        match self.do_opendir(ino) {
            Ok(()) => reply.opened(0, 0),
            Err(err) => reply.error(err.errno()),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        match self.do_read(ino, offset, size) {
            Ok(data) => reply.data(&data),
            Err(err) => reply.error(err.errno()),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn write(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        match self.do_write(ino, offset, data) {
            Ok(written) => reply.written(written),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        match self.do_remove(parent, name, "unlink") {
            Ok(()) => reply.ok(),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn rmdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        match self.do_remove(parent, name, "rmdir") {
            Ok(()) => reply.ok(),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn symlink(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        link_name: &OsStr,
        target: &Path,
        reply: ReplyEntry,
    ) {
        match self.do_symlink(parent, link_name, target) {
            Ok((_ino, attr)) => reply.entry(&TTL, &attr, 0),
            Err(err) => reply.error(err.errno()),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn rename(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        _flags: u32,
        reply: ReplyEmpty,
    ) {
        match self.do_rename(parent, name, newparent, newname) {
            Ok(()) => reply.ok(),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn access(&mut self, _req: &Request<'_>, ino: u64, _mask: i32, reply: ReplyEmpty) {
        match self.do_access(ino) {
            Ok(()) => reply.ok(),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let entries = match self.do_readdir(ino) {
            Ok(entries) => entries,
            Err(err) => return reply.error(err.errno()),
        };
        for (i, (ino, kind, name)) in entries.into_iter().enumerate().skip(offset as usize) {
            if reply.add(ino, (i + 1) as i64, kind, name) {
                break;
            }
        }
        reply.ok();
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        _fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        reply.ok();
    }

    fn releasedir(&mut self, _req: &Request<'_>, _ino: u64, _fh: u64, _flags: i32, reply: ReplyEmpty) {
        reply.ok();
    }

    fn flush(&mut self, _req: &Request<'_>, _ino: u64, _fh: u64, _lock_owner: u64, reply: ReplyEmpty) {
        reply.ok();
    }

    #[allow(clippy::too_many_arguments)]
    fn setlk(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        _lock_owner: u64,
        _start: u64,
        _end: u64,
        _typ: i32,
        _pid: u32,
        _sleep: bool,
        reply: ReplyEmpty,
    ) {
        if self.session.leaf_mode() == LeafMode::Hybrid {
            if let Ok(path) = self.path_of(ino) {
                let store_path = self.store_path(&path);
                if let Ok(store) = self.enter("flock", &store_path) {
                    if !store.exists(&store_path).unwrap_or(true) {
                        let _ = store.create(&store_path);
                    }
                    self.session.classifier.mark_file(&store_path);
                }
            }
        }
        reply.ok();
    }

    fn statfs(&mut self, _req: &Request<'_>, _ino: u64, reply: ReplyStatfs) {
        reply.statfs(0, 0, 0, 0, 0, BLOCK_SIZE, 255, 0);
    }
}

/// `truncate(p, n)` per spec.md §4.6: fetch, resize to `n` (zero-padding on
/// growth, truncating on shrink), store.
fn truncate(store: &dyn StoreClient, path: &str, new_size: usize) -> FsResult<()> {
    let (mut content, _stat) = store.get(path)?;
    content.resize(new_size, 0);
    store.set(path, &content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_child_avoids_double_slash_at_root() {
        assert_eq!(FsOps::join_child("/", OsStr::new("a")), "/a");
        assert_eq!(FsOps::join_child("/a", OsStr::new("b")), "/a/b");
    }

    #[test]
    fn parent_path_of_root_child_is_root() {
        assert_eq!(FsOps::parent_path("/a"), "/");
        assert_eq!(FsOps::parent_path("/a/b"), "/a");
    }

    #[test]
    fn millis_to_systemtime_nonpositive_is_epoch() {
        assert_eq!(millis_to_systemtime(0), UNIX_EPOCH);
        assert_eq!(millis_to_systemtime(-5), UNIX_EPOCH);
    }
}
