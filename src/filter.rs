use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use log::debug;
use parking_lot::Mutex;

use crate::{hash, AtomicBitmap, Bitmap, ConfigurationError, Profile};

/// The largest supported bit array size; indexes must fit in a positive
/// 32-bit integer to stay compatible with the persisted hash.
pub const MAX_SIZE: usize = i32::MAX as usize;

/// Construct [`MembershipFilter`] instances with varying parameters.
///
/// ```rust
/// use seedbloom::{MembershipFilterBuilder, Profile};
///
/// let filter = MembershipFilterBuilder::default()
///                 .profile(Profile::Small)
///                 .expected_count(10_000)
///                 .auto_clear_rate(0.8)
///                 .build()
///                 .expect("valid configuration");
///
/// filter.add("success!");
/// assert!(filter.check("success!"));
/// ```
///
/// Unless changed, the builder uses [`Profile::Middle`] and never auto-clears.
/// The expected count has no default and must be set to a non-zero value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MembershipFilterBuilder {
    profile: Profile,
    expected_count: usize,
    auto_clear_rate: Option<f64>,
}

impl MembershipFilterBuilder {
    /// Set the seed profile.
    pub fn profile(self, profile: Profile) -> Self {
        Self { profile, ..self }
    }

    /// Set the number of distinct values the filter is expected to hold.
    ///
    /// The bit array holds `profile.len() * expected_count` bits.
    pub fn expected_count(self, expected_count: usize) -> Self {
        Self {
            expected_count,
            ..self
        }
    }

    /// Wipe the filter automatically once its [use
    /// rate](MembershipFilter::use_rate) reaches `rate`.
    ///
    /// A filter whose use rate approaches 1.0 reports nearly every value as
    /// present; auto-clearing trades the recorded history for a continued low
    /// false-positive rate. `rate` must be in `(0, 1]`.
    pub fn auto_clear_rate(self, rate: f64) -> Self {
        Self {
            auto_clear_rate: Some(rate),
            ..self
        }
    }

    /// Initialise the [`MembershipFilter`] instance with the provided
    /// parameters.
    pub fn build(self) -> Result<MembershipFilter, ConfigurationError> {
        self.with_bitmap()
    }

    /// Initialise a [`MembershipFilter`] backed by the bitmap type `B`.
    pub fn with_bitmap<B: Bitmap>(self) -> Result<MembershipFilter<B>, ConfigurationError> {
        self.profile.validate()?;

        let size = checked_size(&self.profile, self.expected_count)?;
        if let Some(rate) = self.auto_clear_rate {
            check_auto_clear_rate(rate)?;
        }

        debug!(
            "membership filter created: hash_count={}, expected_count={}, size={}, auto_clear_rate={:?}",
            self.profile.len(),
            self.expected_count,
            size,
            self.auto_clear_rate
        );

        Ok(MembershipFilter::from_parts(
            self.profile,
            size,
            B::new_with_capacity(size),
            0,
            self.auto_clear_rate,
        ))
    }
}

fn checked_size(profile: &Profile, expected_count: usize) -> Result<usize, ConfigurationError> {
    let size = profile
        .len()
        .checked_mul(expected_count)
        .filter(|&size| size <= MAX_SIZE)
        .ok_or(ConfigurationError::SizeOverflow {
            hash_count: profile.len(),
            expected_count,
            max: MAX_SIZE,
        })?;

    if size == 0 {
        return Err(ConfigurationError::EmptyFilter);
    }

    Ok(size)
}

pub(crate) fn check_auto_clear_rate(rate: f64) -> Result<(), ConfigurationError> {
    // Written to also reject NaN.
    if rate > 0.0 && rate <= 1.0 {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidAutoClearRate(rate))
    }
}

/// A bloom filter over strings, indexed by the seeds of a [`Profile`].
///
/// Inserting a value sets one bit per seed; checking it tests those same bits.
/// A value that was inserted is always reported as present until the filter is
/// cleared, while a value that was never inserted may be reported as present
/// with a probability governed by the profile and the load of the filter.
///
/// ```rust
/// use seedbloom::MembershipFilter;
///
/// let filter = MembershipFilter::new(100).unwrap();
///
/// assert!(!filter.add_if_not_exist("hello 🐐"));
/// assert!(filter.add_if_not_exist("hello 🐐"));
/// assert!(filter.check("hello 🐐"));
/// ```
///
/// # Usage tracking
///
/// The filter counts every bit-set operation (not every distinct bit) since
/// it was last cleared. [`use_rate`](MembershipFilter::use_rate) reports that
/// count relative to the size of the bit array, and when an auto-clear rate is
/// configured the whole filter is wiped by the first mutating call that
/// observes the use rate at or above it.
///
/// # Concurrency
///
/// All operations take `&self` and the filter is `Sync`. The use counter is
/// atomic and bit sets never lose each other's updates, but insertions are
/// not mutually exclusive with a clear: only the auto-clear decision itself is
/// serialised, so at most one caller performs a given auto-clear. A value
/// inserted while a clear is in flight may have its bits wiped immediately
/// after they are set, and a later [`check`](MembershipFilter::check) for it
/// can then return `false`. Callers needing a strict guarantee must serialise
/// insertions and clears themselves.
pub struct MembershipFilter<B = AtomicBitmap>
where
    B: Bitmap,
{
    profile: Profile,
    size: i32,
    bitmap: B,
    use_count: AtomicU64,
    auto_clear_rate: Option<f64>,
    clear_lock: Mutex<()>,
}

impl MembershipFilter<AtomicBitmap> {
    /// Construct a filter for `expected_count` values using
    /// [`Profile::Middle`] and no auto-clear.
    pub fn new(expected_count: usize) -> Result<Self, ConfigurationError> {
        MembershipFilterBuilder::default()
            .expected_count(expected_count)
            .build()
    }

    /// Construct a filter for `expected_count` values using `profile`, with
    /// an optional auto-clear rate.
    pub fn with_profile(
        profile: Profile,
        expected_count: usize,
        auto_clear_rate: Option<f64>,
    ) -> Result<Self, ConfigurationError> {
        let b = MembershipFilterBuilder::default()
            .profile(profile)
            .expected_count(expected_count);

        let b = match auto_clear_rate {
            Some(rate) => b.auto_clear_rate(rate),
            None => b,
        };

        b.build()
    }
}

impl<B> MembershipFilter<B>
where
    B: Bitmap,
{
    /// Assemble a filter from validated parts.
    ///
    /// `size` must be in `1..=MAX_SIZE` and `bitmap` must address `size` bits.
    pub(crate) fn from_parts(
        profile: Profile,
        size: usize,
        bitmap: B,
        use_count: u64,
        auto_clear_rate: Option<f64>,
    ) -> Self {
        debug_assert!(size > 0 && size <= MAX_SIZE);
        Self {
            profile,
            size: size as i32,
            bitmap,
            use_count: AtomicU64::new(use_count),
            auto_clear_rate,
            clear_lock: Mutex::new(()),
        }
    }

    /// Insert `value` into the filter.
    ///
    /// Any subsequent calls to [`check`](MembershipFilter::check) for the same
    /// `value` return true until the filter is cleared.
    pub fn add(&self, value: &str) {
        self.check_need_clear();

        for key in self.keys(value) {
            self.set_bit(key);
        }
    }

    /// Checks if `value` exists in the filter.
    ///
    /// If `check` returns true, `value` has **probably** been inserted
    /// previously. If `check` returns false, `value` has **definitely not**
    /// been inserted since the filter was last cleared.
    pub fn check(&self, value: &str) -> bool {
        self.keys(value).all(|key| self.bitmap.get(key))
    }

    /// Insert `value` unless it is already present.
    ///
    /// Returns `true` if every bit for `value` was already set (it was
    /// probably inserted before, or is a false positive), and `false` if at
    /// least one bit had to be set to record it.
    ///
    /// Each index is computed once: the bits are tested in order while the
    /// value is assumed present, and on the first unset bit every index seen
    /// so far is set, followed by each remaining index.
    pub fn add_if_not_exist(&self, value: &str) -> bool {
        self.check_need_clear();

        let mut exists = true;
        let mut seen = Vec::with_capacity(self.profile.len());

        for key in self.keys(value) {
            if !exists {
                self.set_bit(key);
                continue;
            }

            seen.push(key);
            if !self.bitmap.get(key) {
                exists = false;
                for &k in &seen {
                    self.set_bit(k);
                }
            }
        }

        exists
    }

    /// The number of bit-set operations since the filter was last cleared,
    /// relative to the size of the bit array.
    ///
    /// Setting an already-set bit still counts, so the rate overestimates the
    /// fraction of set bits and can exceed 1.0 on a saturated filter.
    pub fn use_rate(&self) -> f64 {
        self.use_count.load(Ordering::Relaxed) as f64 / self.size as f64
    }

    /// Reset every bit and the use counter.
    ///
    /// The profile, size and auto-clear rate are unchanged.
    pub fn clear(&self) {
        self.use_count.store(0, Ordering::Relaxed);
        self.bitmap.clear();
        debug!("membership filter cleared: size={}", self.size);
    }

    /// The seed profile of this filter.
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// The number of bits in the filter.
    pub fn size(&self) -> usize {
        self.size as usize
    }

    /// The number of bit-set operations since the filter was last cleared.
    pub fn use_count(&self) -> u64 {
        self.use_count.load(Ordering::Relaxed)
    }

    /// The configured auto-clear rate, if any.
    pub fn auto_clear_rate(&self) -> Option<f64> {
        self.auto_clear_rate
    }

    /// Return the byte size of the underlying bitmap.
    pub fn byte_size(&self) -> usize {
        self.bitmap.byte_size()
    }

    pub(crate) fn bitmap(&self) -> &B {
        &self.bitmap
    }

    fn keys<'a>(&'a self, value: &str) -> impl Iterator<Item = usize> + 'a {
        let base = hash::accumulate(value);
        let size = self.size;
        self.profile
            .seeds()
            .iter()
            .map(move |&seed| hash::seeded_index(base, seed, size))
    }

    fn set_bit(&self, key: usize) {
        self.use_count.fetch_add(1, Ordering::Relaxed);
        self.bitmap.set(key);
    }

    fn check_need_clear(&self) {
        let Some(rate) = self.auto_clear_rate else {
            return;
        };

        if self.use_rate() < rate {
            return;
        }

        let _guard = self.clear_lock.lock();

        // Another caller may have cleared while this one waited.
        let observed = self.use_rate();
        if observed >= rate {
            self.bitmap.clear();
            self.use_count.store(0, Ordering::Relaxed);
            debug!(
                "membership filter auto-cleared: use_rate={}, auto_clear_rate={}",
                observed, rate
            );
        }
    }
}

impl<B> Clone for MembershipFilter<B>
where
    B: Bitmap + Clone,
{
    /// Snapshot the filter. Concurrent insertions may or may not be observed.
    fn clone(&self) -> Self {
        Self::from_parts(
            self.profile.clone(),
            self.size(),
            self.bitmap.clone(),
            self.use_count(),
            self.auto_clear_rate,
        )
    }
}

impl<B> PartialEq for MembershipFilter<B>
where
    B: Bitmap + PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.profile == other.profile
            && self.size == other.size
            && self.use_count() == other.use_count()
            && self.auto_clear_rate == other.auto_clear_rate
            && self.bitmap == other.bitmap
    }
}

impl<B> fmt::Debug for MembershipFilter<B>
where
    B: Bitmap + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MembershipFilter")
            .field("profile", &self.profile)
            .field("size", &self.size)
            .field("bitmap", &self.bitmap)
            .field("use_count", &self.use_count())
            .field("auto_clear_rate", &self.auto_clear_rate)
            .finish()
    }
}
