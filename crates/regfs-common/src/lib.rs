//! # regfs-common
//!
//! Shared error definitions, configuration models, and defaults used
//! across the regfs workspace.
//!
//! This crate is the leaf of the dependency graph: it depends on no other
//! internal crate and holds the primitives the storage core and the CLI
//! build upon.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod config;
pub mod constants;
pub mod error;
