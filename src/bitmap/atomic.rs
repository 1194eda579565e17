use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use super::{bitmask_for_key, index_for_key, WORD_BITS};
use crate::Bitmap;

/// A plain, heap-allocated, `O(1)` indexed bitmap of atomic words.
///
/// Setting a bit is a single relaxed `fetch_or`, so concurrent writers never
/// lose each other's bits. [`clear`](Bitmap::clear) stores zero into each word
/// in turn and is not atomic with respect to concurrent writers: a bit set
/// while a clear is in progress may be wiped.
pub struct AtomicBitmap {
    words: Box<[AtomicU64]>,
    max_key: usize,
}

impl AtomicBitmap {
    /// The number of addressable bits.
    pub fn max_key(&self) -> usize {
        self.max_key
    }

    /// Pack the bitmap into `ceil(max_key / 8)` bytes, bit `i` stored in
    /// byte `i / 8` under mask `1 << (i % 8)`.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.words.len() * 8);
        for word in self.words.iter() {
            out.extend_from_slice(&word.load(Ordering::Relaxed).to_le_bytes());
        }
        out.truncate(packed_len(self.max_key));
        out
    }

    /// Rebuild a bitmap of `max_key` bits from the packing produced by
    /// [`to_le_bytes`](AtomicBitmap::to_le_bytes).
    ///
    /// Bytes beyond `ceil(max_key / 8)` are ignored, missing bytes read as
    /// zero, and bits at or beyond `max_key` are discarded.
    pub fn from_le_bytes(max_key: usize, bytes: &[u8]) -> Self {
        let words = bytes
            .chunks(8)
            .take(word_count(max_key))
            .map(|chunk| {
                let mut buf = [0u8; 8];
                buf[..chunk.len()].copy_from_slice(chunk);
                AtomicU64::new(u64::from_le_bytes(buf))
            })
            .chain(std::iter::repeat_with(|| AtomicU64::new(0)))
            .take(word_count(max_key))
            .collect::<Box<[_]>>();

        let b = Self { words, max_key };
        b.mask_tail();
        b
    }

    /// Return the number of bits currently set.
    pub fn count_ones(&self) -> usize {
        self.words
            .iter()
            .map(|w| w.load(Ordering::Relaxed).count_ones() as usize)
            .sum()
    }

    fn mask_tail(&self) {
        let used = self.max_key % WORD_BITS;
        if used != 0 {
            if let Some(last) = self.words.last() {
                last.fetch_and((1 << used) - 1, Ordering::Relaxed);
            }
        }
    }
}

/// Number of bytes needed to pack `bits` bits.
pub(crate) fn packed_len(bits: usize) -> usize {
    bits.div_ceil(8)
}

/// Returns true if no padding bit at or beyond `bits` is set in `packed`, a
/// packing of exactly [`packed_len(bits)`](packed_len) bytes.
pub(crate) fn padding_is_clear(bits: usize, packed: &[u8]) -> bool {
    let tail = bits % 8;
    match packed.last() {
        Some(&last) if tail != 0 => last >> tail == 0,
        _ => true,
    }
}

fn word_count(bits: usize) -> usize {
    bits.div_ceil(WORD_BITS)
}

impl Bitmap for AtomicBitmap {
    fn new_with_capacity(max_key: usize) -> Self {
        let words = (0..word_count(max_key))
            .map(|_| AtomicU64::new(0))
            .collect();
        Self { words, max_key }
    }

    fn set(&self, key: usize) {
        self.words[index_for_key(key)].fetch_or(bitmask_for_key(key), Ordering::Relaxed);
    }

    fn get(&self, key: usize) -> bool {
        self.words[index_for_key(key)].load(Ordering::Relaxed) & bitmask_for_key(key) != 0
    }

    fn clear(&self) {
        for word in self.words.iter() {
            word.store(0, Ordering::Relaxed);
        }
    }

    fn byte_size(&self) -> usize {
        self.words.len() * std::mem::size_of::<AtomicU64>()
    }
}

impl Clone for AtomicBitmap {
    fn clone(&self) -> Self {
        let words = self
            .words
            .iter()
            .map(|w| AtomicU64::new(w.load(Ordering::Relaxed)))
            .collect();
        Self {
            words,
            max_key: self.max_key,
        }
    }
}

impl PartialEq for AtomicBitmap {
    fn eq(&self, other: &Self) -> bool {
        self.max_key == other.max_key
            && self
                .words
                .iter()
                .zip(other.words.iter())
                .all(|(a, b)| a.load(Ordering::Relaxed) == b.load(Ordering::Relaxed))
    }
}

impl Eq for AtomicBitmap {}

impl fmt::Debug for AtomicBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtomicBitmap")
            .field("max_key", &self.max_key)
            .field("set_bits", &self.count_ones())
            .finish()
    }
}
