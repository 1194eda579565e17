//! seedbloom implements a seed-profiled bloom filter over strings with usage
//! tracking, optional self-clearing and a stable on-disk format.
//!
//! A [`MembershipFilter`] allocates `k` bits per expected element, where `k`
//! is the number of seeds in its [`Profile`]. Each seed scales a simple,
//! reproducible string hash into one bit index, so inserting a value sets `k`
//! bits and checking it tests the same `k` bits. Values that were inserted are
//! never reported missing (until the filter is cleared); values that were not
//! may be reported present with a probability governed by the profile.
//!
//! ```rust
//! use seedbloom::{MembershipFilter, Profile};
//!
//! let filter = MembershipFilter::with_profile(Profile::Small, 1_000, Some(0.8)).unwrap();
//!
//! assert!(!filter.add_if_not_exist("https://example.com"));
//! assert!(filter.add_if_not_exist("https://example.com"));
//! assert!(filter.use_rate() <= 8.0 / 8_000.0);
//! ```
//!
//! Filters can be persisted with [`MembershipFilter::save`] and restored with
//! [`MembershipFilter::load`]; see the [`codec`] module for the layout.
//!
//! ## Features
//!
//! * `serde` - enable serialisation with [serde], disabled by default
//!
//! [serde]: (https://github.com/serde-rs/serde)

mod bitmap;
pub mod codec;
mod error;
mod filter;
pub mod hash;
mod profile;
#[cfg(feature = "serde")]
mod snapshot;

pub use bitmap::*;
pub use error::*;
pub use filter::*;
pub use profile::*;
