//! sitesync installer library.
//!
//! This crate keeps a local content directory synchronized with the latest
//! published release asset, overlays user-supplied plugin bundles, and serves
//! the result on 127.0.0.1. It is used by the `sitesync` CLI binary and can be
//! driven programmatically with substitute collaborators for testing.
//!
//! # Modules
//!
//! - [`cli`] - Command-line argument definitions
//! - [`content`] - Streamed download and all-or-nothing zip installation
//! - [`error`] - Stage-aware error types
//! - [`http`] - Configured `ureq` agents shared by locator and fetcher
//! - [`layout`] - Paths of the content root and its markers
//! - [`output`] - Progress and summary lines for the operator
//! - [`overlay`] - Plugin bundle discovery, copy and manifest
//! - [`release`] - Latest-release lookup and asset selection
//! - [`serve`] - Local static file server
//! - [`sync`] - The synchronization state machine
//! - [`version_store`] - Cached release tag marker

mod atomic_write;
pub mod cli;
pub mod content;
pub mod error;
pub mod http;
pub mod layout;
pub mod output;
pub mod overlay;
pub mod release;
pub mod serve;
pub mod sync;
#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
pub mod version_store;
