//! # regfs-storage
//!
//! Provisions the FUSE-mounted filer that backs the image registry and
//! tears it down again.
//!
//! Handles:
//! - **Commands**: shell execution with optional deadline and process-group kill.
//! - **Mount table**: textual lookup of a mount path and filesystem type.
//! - **Cache directories**: uniquely named scratch space for the helper.
//! - **Driver**: composes and runs the mount helper invocation.
//! - **Orchestrator**: races the helper against mount-table polling.
//! - **Handle**: the confirmed mount, with unmount and cache teardown.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod backend;
pub mod cache_dir;
pub mod command;
pub mod driver;
pub mod handle;
pub mod mount_table;
pub mod orchestrator;

pub use backend::open_storage;
pub use handle::StorageHandle;
pub use orchestrator::{MountOrchestrator, MountVerdict};
