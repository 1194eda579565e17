//! The string hash used to derive bit indexes.
//!
//! The scheme is deliberately simple and must stay bit-for-bit stable, as the
//! indexes it produces are baked into every persisted filter: the UTF-16 code
//! units of a value are folded into a 32-bit accumulator with `h = i * h +
//! unit[i]`, and each profile seed then scales that accumulator before it is
//! reduced modulo the bit array size.
//!
//! All arithmetic is 32-bit two's complement and wraps on overflow.
//!
//! The accumulator weights later code units multiplicatively more than
//! earlier ones, so values sharing a long suffix collide more often than a
//! well-mixed hash would. Replacing it would change the index of every stored
//! value and break compatibility with existing filter files.

/// Fold the UTF-16 code units of `value` into the seed-independent
/// accumulator.
///
/// The empty string accumulates to 0.
pub fn accumulate(value: &str) -> i32 {
    value
        .encode_utf16()
        .enumerate()
        .fold(0i32, |h, (i, unit)| {
            (i as i32).wrapping_mul(h).wrapping_add(i32::from(unit))
        })
}

/// Scale the accumulator `base` by `seed` and reduce it to a bit index in
/// `0..size`.
///
/// The remainder takes the sign of the dividend before the absolute value is
/// taken, so the index of a negative product is `|product| mod size`.
///
/// `size` must be positive.
pub fn seeded_index(base: i32, seed: i32, size: i32) -> usize {
    debug_assert!(size > 0);
    (base.wrapping_mul(seed) % size).unsigned_abs() as usize
}
