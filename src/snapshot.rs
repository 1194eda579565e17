//! `serde` support for [`MembershipFilter`].
//!
//! The filter holds atomics and a lock, so it is (de)serialised through a
//! plain snapshot that is validated the same way as the binary codec.

use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::bitmap::{packed_len, padding_is_clear};
use crate::filter::{check_auto_clear_rate, MAX_SIZE};
use crate::{AtomicBitmap, MembershipFilter, Profile};

#[derive(Serialize, Deserialize)]
struct FilterSnapshot {
    profile: Profile,
    size: u32,
    bits: Bytes,
    use_count: u64,
    auto_clear_rate: Option<f64>,
}

impl Serialize for MembershipFilter<AtomicBitmap> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        FilterSnapshot {
            profile: self.profile().clone(),
            size: self.size() as u32,
            bits: Bytes::from(self.bitmap().to_le_bytes()),
            use_count: self.use_count(),
            auto_clear_rate: self.auto_clear_rate(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for MembershipFilter<AtomicBitmap> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        let s = FilterSnapshot::deserialize(deserializer)?;

        s.profile.validate().map_err(D::Error::custom)?;

        let size = s.size as usize;
        if size == 0 || size > MAX_SIZE || size % s.profile.len() != 0 {
            return Err(D::Error::custom(format!(
                "invalid bit array size {} for a profile of {} seeds",
                size,
                s.profile.len()
            )));
        }

        if s.bits.len() != packed_len(size) {
            return Err(D::Error::invalid_length(
                s.bits.len(),
                &"ceil(size / 8) bytes of bits",
            ));
        }

        if !padding_is_clear(size, &s.bits) {
            return Err(D::Error::custom(format!(
                "bits set beyond the declared size of {}",
                size
            )));
        }

        if let Some(rate) = s.auto_clear_rate {
            check_auto_clear_rate(rate).map_err(D::Error::custom)?;
        }

        Ok(MembershipFilter::from_parts(
            s.profile,
            size,
            AtomicBitmap::from_le_bytes(size, &s.bits),
            s.use_count,
            s.auto_clear_rate,
        ))
    }
}
