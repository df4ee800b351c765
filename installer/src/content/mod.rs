//! Release content acquisition.
//!
//! - [`fetch`] streams an asset into a scoped temporary file.
//! - [`install`] validates a zip archive and swaps it into the content root.
//! - [`progress`] is the byte-count sink the fetcher reports to.

pub mod fetch;
pub mod install;
pub mod progress;
