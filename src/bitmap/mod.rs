//! Bitmap implementations for the backing storage of a
//! [`MembershipFilter`](crate::MembershipFilter).

mod atomic;
pub use atomic::*;

/// A trait to abstract bit storage for use in a
/// [`MembershipFilter`](crate::MembershipFilter).
///
/// Bits are only ever set individually; the sole way to unset a bit is
/// [`clear`](Bitmap::clear), which resets the whole bitmap. All methods take
/// `&self` so a filter can be shared between threads; implementations must make
/// `set` idempotent and safe to race with other `set` and `get` calls.
pub trait Bitmap {
    /// Construct a zeroed bitmap able to hold keys in `0..max_key`.
    fn new_with_capacity(max_key: usize) -> Self;

    /// Set the bit indexed by `key` to `true`.
    fn set(&self, key: usize);

    /// Return `true` if the given bit index was previously set.
    fn get(&self, key: usize) -> bool;

    /// Reset every bit to `false`.
    fn clear(&self);

    /// Return the size of the bitmap in bytes.
    fn byte_size(&self) -> usize;
}

const WORD_BITS: usize = u64::BITS as usize;

#[inline(always)]
fn bitmask_for_key(key: usize) -> u64 {
    1 << (key % WORD_BITS)
}

#[inline(always)]
fn index_for_key(key: usize) -> usize {
    key / WORD_BITS
}
