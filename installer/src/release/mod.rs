//! Release discovery.
//!
//! - [`asset`] - asset naming predicate and the selected [`asset::ReleaseAsset`].
//! - [`locator`] - the [`locator::ReleaseLocator`] trait and its HTTP implementation.

pub mod asset;
pub mod locator;
