//! End-to-end scenarios (a)-(f) from spec.md §8, literal values preserved.

use std::ffi::OsStr;
use std::path::Path;

use fuser::FileType;
use zoofs::errors::FsError;
use zoofs::store::StoreClient;
use zoofs::LeafMode;

use crate::common::{Fixture, ROOT};

#[test]
fn leaf_as_dir_data_node_aliasing() {
    // (a)
    let fixture = Fixture::new(LeafMode::Dir);
    fixture.fs.do_mkdir(ROOT, OsStr::new("a")).unwrap();
    let (a_ino, _attr) = fixture.fs.do_lookup(ROOT, OsStr::new("a")).unwrap();

    let (data_ino, _attr) = fixture.fs.do_lookup(a_ino, OsStr::new("_zoo_data_")).unwrap();
    fixture.fs.do_write(data_ino, 0, b"hello").unwrap();
    assert_eq!(fixture.fs.do_read(data_ino, 0, 5).unwrap(), b"hello");

    let entries = fixture.fs.do_readdir(a_ino).unwrap();
    let names: Vec<&str> = entries.iter().map(|(_, _, name)| name.as_str()).collect();
    assert_eq!(names, vec![".", "..", "_zoo_data_"]);
}

#[test]
fn leaf_as_dir_create_is_forbidden() {
    // (b)
    let fixture = Fixture::new(LeafMode::Dir);
    let err = fixture.fs.do_create(ROOT, OsStr::new("b")).unwrap_err();
    assert_eq!(err, FsError::PolicyDenied);
    assert_eq!(err.errno(), libc::ENOENT);
}

#[test]
fn hybrid_classification_by_content() {
    // (c)
    let fixture = Fixture::new(LeafMode::Hybrid);
    let (d_ino, attr) = fixture.fs.do_mkdir(ROOT, OsStr::new("d")).unwrap();
    assert_eq!(attr.kind, FileType::Directory);

    let (x_ino, _attr) = fixture.fs.do_create(d_ino, OsStr::new("x")).unwrap();
    fixture.fs.do_write(x_ino, 0, b"k").unwrap();
    let x_attr = fixture.fs.do_getattr(x_ino).unwrap();
    assert_eq!(x_attr.kind, FileType::RegularFile);
    assert_eq!(x_attr.size, 1);

    let entries = fixture.fs.do_readdir(d_ino).unwrap();
    let names: Vec<&str> = entries.iter().map(|(_, _, name)| name.as_str()).collect();
    assert!(names.contains(&"x"));
    assert!(!names.contains(&"__symlinks__"));
}

#[test]
fn hybrid_symlink() {
    // (d)
    let fixture = Fixture::new(LeafMode::Hybrid);
    let (d_ino, _attr) = fixture.fs.do_mkdir(ROOT, OsStr::new("d")).unwrap();
    fixture.fs.do_create(d_ino, OsStr::new("x")).unwrap();

    let (y_ino, attr) =
        fixture.fs.do_symlink(d_ino, OsStr::new("y"), Path::new("/d/x")).unwrap();
    assert_eq!(attr.kind, FileType::Symlink);
    assert_eq!(fixture.fs.do_readlink(y_ino).unwrap(), b"/d/x");

    let store = fixture.fs.session().handle().unwrap();
    let (sidecar, _stat) = store.get("/__symlinks__").unwrap();
    assert_eq!(String::from_utf8(sidecar).unwrap(), "/d/y=/d/x");
}

#[test]
fn hybrid_rename_of_file() {
    // (e), continuing from the setup in (c)
    let fixture = Fixture::new(LeafMode::Hybrid);
    let (d_ino, _attr) = fixture.fs.do_mkdir(ROOT, OsStr::new("d")).unwrap();
    let (x_ino, _attr) = fixture.fs.do_create(d_ino, OsStr::new("x")).unwrap();
    fixture.fs.do_write(x_ino, 0, b"k").unwrap();

    fixture.fs.do_rename(d_ino, OsStr::new("x"), d_ino, OsStr::new("z")).unwrap();

    let store = fixture.fs.session().handle().unwrap();
    assert!(!store.exists("/d/x").unwrap());
    assert_eq!(fixture.fs.do_read(x_ino, 0, 1).unwrap(), b"k");

    let z_attr = fixture.fs.do_getattr(x_ino).unwrap();
    assert_eq!(z_attr.kind, FileType::RegularFile);
}

#[test]
fn oversized_write_is_rejected() {
    // (f)
    let fixture = Fixture::with_max_file_size(LeafMode::Hybrid, 10);
    let (f_ino, _attr) = fixture.fs.do_create(ROOT, OsStr::new("f")).unwrap();
    let buf = b"abcdef";
    let err = fixture.fs.do_write(f_ino, 7, buf).unwrap_err();
    assert_eq!(err, FsError::InvalidRequest);
    assert_eq!(err.errno(), libc::EINVAL);
}
