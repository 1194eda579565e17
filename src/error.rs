use std::io;

/// Errors returned when a [`MembershipFilter`](crate::MembershipFilter)
/// cannot be constructed from the requested parameters.
///
/// None of these are recoverable by retrying with the same input - pick a
/// smaller expected count, a shorter [`Profile`](crate::Profile) or a valid
/// auto-clear rate.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    /// `profile length * expected count` does not fit in the addressable
    /// index range (`i32::MAX` bits).
    #[error("bit array size overflows: {hash_count} seeds x {expected_count} elements exceeds {max} bits")]
    SizeOverflow {
        /// Number of seeds in the profile.
        hash_count: usize,
        /// The requested expected element count.
        expected_count: usize,
        /// The largest supported bit array size.
        max: usize,
    },

    /// The computed bit array size is zero.
    #[error("bit array size must be non-zero (expected count is zero)")]
    EmptyFilter,

    /// The auto-clear rate is not a finite value in `(0, 1]`.
    #[error("auto-clear rate must be in (0, 1], got {0}")]
    InvalidAutoClearRate(f64),

    /// A custom profile contains no seeds.
    #[error("profile must contain at least one seed")]
    EmptyProfile,

    /// A custom profile contains a seed that is zero or negative.
    #[error("profile seeds must be positive, got {0}")]
    NonPositiveSeed(i32),

    /// A custom profile repeats a seed.
    #[error("profile seeds must be distinct, {0} appears more than once")]
    DuplicateSeed(i32),
}

/// Errors returned while persisting or restoring a
/// [`MembershipFilter`](crate::MembershipFilter).
///
/// Every variant other than [`StorageError::Io`] indicates the stored bytes
/// are not a valid filter; callers typically fall back to a fresh filter.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The underlying reader or writer failed.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// The input ended before `field` could be read.
    #[error("truncated filter data while reading {field}")]
    Truncated {
        /// The field being decoded when the input ran out.
        field: &'static str,
    },

    /// The format version is not one this crate can decode.
    #[error("unsupported format version {found} (expected {expected})")]
    UnsupportedVersion {
        /// The version this crate writes.
        expected: u16,
        /// The version found in the input.
        found: u16,
    },

    /// The profile tag does not name a known profile.
    #[error("unknown profile tag {0:#04x}")]
    UnknownProfile(u8),

    /// The stored custom profile is not a valid profile.
    #[error("invalid stored profile: {0}")]
    InvalidProfile(#[source] ConfigurationError),

    /// The stored size is inconsistent with the profile or out of range.
    #[error("invalid bit array size {size} for a profile of {hash_count} seeds")]
    SizeMismatch {
        /// The stored bit array size.
        size: u64,
        /// Number of seeds in the stored profile.
        hash_count: usize,
    },

    /// Bits beyond the declared size are set.
    #[error("bits set beyond the declared size of {0}")]
    TrailingBits(usize),

    /// The auto-clear presence flag is neither 0 nor 1.
    #[error("invalid auto-clear flag {0}")]
    InvalidFlag(u8),

    /// The stored auto-clear rate is outside `(0, 1]`.
    #[error("invalid stored auto-clear rate {0}")]
    InvalidAutoClearRate(f64),

    /// Unexpected bytes follow the encoded filter.
    #[error("{0} unexpected trailing bytes")]
    TrailingBytes(usize),
}
