//! Integration tests driving [`zoofs::FsOps`] against an in-memory
//! [`zoofs::testing::FakeStoreClient`], mirroring the teacher crate's
//! `tests/shadow_fs/` fixture pattern.

mod common;
mod invariants;
mod scenarios;
