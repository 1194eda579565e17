//! The persisted binary representation of a [`MembershipFilter`].
//!
//! All integers are little-endian:
//!
//! ```text
//!     u16         format version (1)
//!     u8          profile tag: 0 VerySmall, 1 Small, 2 Middle, 3 High, 0xFF custom
//!     [u32, i32*] custom profiles only: seed count, then each seed
//!     u32         bit array size
//!     u8*         ceil(size / 8) bytes of bits, bit i in byte i / 8 under mask 1 << (i % 8)
//!     u64         use counter
//!     u8          auto-clear flag (0 or 1)
//!     [f64]       auto-clear rate, only if the flag is 1
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use log::{debug, warn};

use crate::bitmap::{packed_len, padding_is_clear};
use crate::filter::{check_auto_clear_rate, MAX_SIZE};
use crate::profile::CUSTOM_TAG;
use crate::{AtomicBitmap, MembershipFilter, Profile, StorageError};

/// The format version written by this crate.
pub const FORMAT_VERSION: u16 = 1;

impl MembershipFilter<AtomicBitmap> {
    /// Serialise the full filter state.
    ///
    /// The encoding is a point-in-time snapshot; insertions racing with the
    /// call may or may not be captured, and the use counter may disagree with
    /// the captured bits. Quiesce writers first if a consistent image matters.
    pub fn to_bytes(&self) -> Bytes {
        let profile = self.profile();
        let bits = self.bitmap().to_le_bytes();

        let mut buf = BytesMut::with_capacity(32 + profile.len() * 4 + bits.len());
        buf.put_u16_le(FORMAT_VERSION);

        buf.put_u8(profile.tag());
        if let Profile::Custom(seeds) = profile {
            buf.put_u32_le(seeds.len() as u32);
            for &seed in seeds {
                buf.put_i32_le(seed);
            }
        }

        buf.put_u32_le(self.size() as u32);
        buf.put_slice(&bits);
        buf.put_u64_le(self.use_count());

        match self.auto_clear_rate() {
            Some(rate) => {
                buf.put_u8(1);
                buf.put_f64_le(rate);
            }
            None => buf.put_u8(0),
        }

        buf.freeze()
    }

    /// Decode a filter previously encoded by
    /// [`to_bytes`](MembershipFilter::to_bytes).
    ///
    /// The input must contain exactly one encoded filter.
    pub fn from_bytes(mut buf: &[u8]) -> Result<Self, StorageError> {
        need(&buf, 2, "version")?;
        let version = buf.get_u16_le();
        if version != FORMAT_VERSION {
            return Err(StorageError::UnsupportedVersion {
                expected: FORMAT_VERSION,
                found: version,
            });
        }

        let profile = read_profile(&mut buf)?;

        need(&buf, 4, "size")?;
        let size = buf.get_u32_le();
        let hash_count = profile.len();
        if size == 0 || size as usize > MAX_SIZE || size as usize % hash_count != 0 {
            return Err(StorageError::SizeMismatch {
                size: u64::from(size),
                hash_count,
            });
        }
        let size = size as usize;

        let n = packed_len(size);
        need(&buf, n, "bits")?;
        let (bits, rest) = buf.split_at(n);
        buf = rest;

        // Invariant: padding bits in the final byte are never set.
        if !padding_is_clear(size, bits) {
            return Err(StorageError::TrailingBits(size));
        }

        need(&buf, 8, "use counter")?;
        let use_count = buf.get_u64_le();

        need(&buf, 1, "auto-clear flag")?;
        let auto_clear_rate = match buf.get_u8() {
            0 => None,
            1 => {
                need(&buf, 8, "auto-clear rate")?;
                let rate = buf.get_f64_le();
                check_auto_clear_rate(rate).map_err(|_| StorageError::InvalidAutoClearRate(rate))?;
                Some(rate)
            }
            flag => return Err(StorageError::InvalidFlag(flag)),
        };

        if buf.has_remaining() {
            return Err(StorageError::TrailingBytes(buf.remaining()));
        }

        Ok(Self::from_parts(
            profile,
            size,
            AtomicBitmap::from_le_bytes(size, bits),
            use_count,
            auto_clear_rate,
        ))
    }

    /// Write the encoded filter to `writer`.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<(), StorageError> {
        writer.write_all(&self.to_bytes())?;
        Ok(())
    }

    /// Read an encoded filter from `reader`, consuming it to the end.
    pub fn read_from<R: Read>(mut reader: R) -> Result<Self, StorageError> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Self::from_bytes(&buf)
    }

    /// Persist the filter to the file at `path`, replacing any existing
    /// content.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), StorageError> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;

        debug!(
            "membership filter saved: path={}, size={}, use_count={}",
            path.display(),
            self.size(),
            self.use_count()
        );
        Ok(())
    }

    /// Restore a filter persisted by [`save`](MembershipFilter::save).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let filter = File::open(path)
            .map_err(StorageError::from)
            .and_then(|f| Self::read_from(BufReader::new(f)))
            .map_err(|e| {
                warn!("failed to load membership filter from {}: {}", path.display(), e);
                e
            })?;

        debug!(
            "membership filter loaded: path={}, size={}, use_count={}",
            path.display(),
            filter.size(),
            filter.use_count()
        );
        Ok(filter)
    }
}

fn need(buf: &&[u8], n: usize, field: &'static str) -> Result<(), StorageError> {
    if buf.remaining() < n {
        return Err(StorageError::Truncated { field });
    }
    Ok(())
}

fn read_profile(buf: &mut &[u8]) -> Result<Profile, StorageError> {
    need(buf, 1, "profile tag")?;
    let tag = buf.get_u8();
    if tag != CUSTOM_TAG {
        return Profile::from_canonical_tag(tag).ok_or(StorageError::UnknownProfile(tag));
    }

    need(buf, 4, "seed count")?;
    let count = buf.get_u32_le() as usize;
    if buf.remaining() / 4 < count {
        return Err(StorageError::Truncated { field: "seeds" });
    }

    let seeds = (0..count).map(|_| buf.get_i32_le()).collect::<Vec<_>>();
    let profile = Profile::Custom(seeds);
    profile.validate().map_err(StorageError::InvalidProfile)?;

    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConfigurationError, MembershipFilterBuilder};

    fn encoded_very_small() -> Vec<u8> {
        let f = MembershipFilter::with_profile(Profile::VerySmall, 10, Some(0.75)).unwrap();
        f.add("hello");
        f.add("hello 🐐");
        f.to_bytes().to_vec()
    }

    #[test]
    fn test_layout() {
        let got = encoded_very_small();
        assert_eq!(
            got,
            vec![
                0x01, 0x00, // version
                0x00, // VerySmall
                0x28, 0x00, 0x00, 0x00, // 40 bits
                0x20, 0x00, 0x84, 0x08, 0x6a, // bits
                0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // use counter
                0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xe8, 0x3f, // 0.75
            ]
        );
    }

    #[test]
    fn test_custom_profile_round_trip() {
        let f = MembershipFilterBuilder::default()
            .profile(Profile::custom([3, 7, 101]).unwrap())
            .expected_count(8)
            .build()
            .unwrap();
        f.add("abc");

        let bytes = f.to_bytes();
        assert_eq!(&bytes[2..7], &[0xff, 0x03, 0x00, 0x00, 0x00]);

        let got = MembershipFilter::from_bytes(&bytes).unwrap();
        assert_eq!(got, f);
        assert!(got.check("abc"));
        assert_eq!(got.auto_clear_rate(), None);
    }

    #[test]
    fn test_truncated() {
        let bytes = encoded_very_small();
        for n in 0..bytes.len() {
            let got = MembershipFilter::from_bytes(&bytes[..n]);
            assert!(
                matches!(got, Err(StorageError::Truncated { .. })),
                "prefix of {n} bytes: {got:?}"
            );
        }
    }

    #[test]
    fn test_trailing_bytes() {
        let mut bytes = encoded_very_small();
        bytes.push(0);
        assert!(matches!(
            MembershipFilter::from_bytes(&bytes),
            Err(StorageError::TrailingBytes(1))
        ));
    }

    #[test]
    fn test_bad_version() {
        let mut bytes = encoded_very_small();
        bytes[0] = 2;
        assert!(matches!(
            MembershipFilter::from_bytes(&bytes),
            Err(StorageError::UnsupportedVersion {
                expected: 1,
                found: 2
            })
        ));
    }

    #[test]
    fn test_unknown_profile() {
        let mut bytes = encoded_very_small();
        bytes[2] = 9;
        assert!(matches!(
            MembershipFilter::from_bytes(&bytes),
            Err(StorageError::UnknownProfile(9))
        ));
    }

    #[test]
    fn test_invalid_custom_profile() {
        let bytes = [0x01, 0x00, 0xff, 0x02, 0, 0, 0, 5, 0, 0, 0, 5, 0, 0, 0];
        assert!(matches!(
            MembershipFilter::from_bytes(&bytes),
            Err(StorageError::InvalidProfile(ConfigurationError::DuplicateSeed(5)))
        ));
    }

    #[test]
    fn test_huge_seed_count() {
        let bytes = [0x01, 0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 1, 0, 0, 0];
        assert!(matches!(
            MembershipFilter::from_bytes(&bytes),
            Err(StorageError::Truncated { field: "seeds" })
        ));
    }

    #[test]
    fn test_size_mismatch() {
        // 42 bits is not a multiple of the 4 seed VerySmall profile.
        let mut bytes = encoded_very_small();
        bytes[3] = 42;
        assert!(matches!(
            MembershipFilter::from_bytes(&bytes),
            Err(StorageError::SizeMismatch {
                size: 42,
                hash_count: 4
            })
        ));

        bytes[3] = 0;
        assert!(matches!(
            MembershipFilter::from_bytes(&bytes),
            Err(StorageError::SizeMismatch { size: 0, .. })
        ));

        bytes[3..7].copy_from_slice(&0x8000_0000_u32.to_le_bytes());
        assert!(matches!(
            MembershipFilter::from_bytes(&bytes),
            Err(StorageError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_trailing_bits() {
        // 36 bits (9 x 4) leaves the top nibble of the fifth byte as padding.
        let f = MembershipFilter::with_profile(Profile::VerySmall, 9, None).unwrap();
        let mut bytes = f.to_bytes().to_vec();
        bytes[7 + 4] = 0x10;
        assert!(matches!(
            MembershipFilter::from_bytes(&bytes),
            Err(StorageError::TrailingBits(36))
        ));

        bytes[7 + 4] = 0x0f;
        let got = MembershipFilter::from_bytes(&bytes).unwrap();
        assert_eq!(got.bitmap().count_ones(), 4);
    }

    #[test]
    fn test_invalid_flag() {
        let mut bytes = encoded_very_small();
        bytes[20] = 2;
        assert!(matches!(
            MembershipFilter::from_bytes(&bytes),
            Err(StorageError::InvalidFlag(2))
        ));
    }

    #[test]
    fn test_invalid_rate() {
        let mut bytes = encoded_very_small();
        bytes[21..29].copy_from_slice(&1.5_f64.to_le_bytes());
        assert!(matches!(
            MembershipFilter::from_bytes(&bytes),
            Err(StorageError::InvalidAutoClearRate(r)) if r == 1.5
        ));
    }

    #[test]
    fn test_write_read() {
        let f = MembershipFilter::new(20).unwrap();
        f.add("one");
        f.add("two");

        let mut buf = Vec::new();
        f.write_to(&mut buf).unwrap();
        assert_eq!(buf, f.to_bytes().to_vec());

        let got = MembershipFilter::read_from(buf.as_slice()).unwrap();
        assert_eq!(got, f);
    }
}
