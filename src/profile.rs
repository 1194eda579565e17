use crate::ConfigurationError;

const VERY_SMALL_SEEDS: [i32; 4] = [2, 3, 5, 7];
const SMALL_SEEDS: [i32; 8] = [2, 3, 5, 7, 11, 13, 17, 19];
const MIDDLE_SEEDS: [i32; 16] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53,
];
const HIGH_SEEDS: [i32; 32] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89,
    97, 101, 103, 107, 109, 113, 127, 131,
];

/// Tag written to persisted filters in place of an explicit seed list.
pub(crate) const CUSTOM_TAG: u8 = 0xFF;

/// Profile selects the seeds used to index a
/// [`MembershipFilter`](crate::MembershipFilter), and with them the number of
/// bits touched per value (`k`) and the false-positive rate.
///
/// A filter allocates `k` bits per expected element, so moving to a longer
/// profile both lowers the false-positive probability and grows the bit array
/// proportionally. The canonical profiles use the first `k` primes as seeds:
///
/// ```text
///     profile      k    bits/element   approx. false positive rate
///     ----------   --   ------------   ---------------------------
///     VerySmall     4        4          0.14689159766308
///     Small         8        8          0.02157714146322
///     Middle       16       16          0.00046557303372
///     High         32       32          0.00000021167340
/// ```
///
/// The canonical seed sequences are fixed - filters persisted with one of the
/// named profiles store only its tag.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Profile {
    /// 4 seeds per value.
    VerySmall,

    /// 8 seeds per value.
    Small,

    /// 16 seeds per value.
    #[default]
    Middle,

    /// 32 seeds per value.
    High,

    /// A caller-provided seed sequence.
    ///
    /// Construct with [`Profile::custom`] to validate the seeds; an invalid
    /// custom profile is otherwise rejected when the filter is built.
    Custom(Vec<i32>),
}

impl Profile {
    /// Validate `seeds` and wrap them in a [`Profile::Custom`].
    ///
    /// The sequence must be non-empty, and every seed positive and distinct.
    pub fn custom(seeds: impl Into<Vec<i32>>) -> Result<Self, ConfigurationError> {
        let p = Profile::Custom(seeds.into());
        p.validate()?;
        Ok(p)
    }

    /// The ordered seed sequence of this profile.
    pub fn seeds(&self) -> &[i32] {
        match self {
            Profile::VerySmall => &VERY_SMALL_SEEDS,
            Profile::Small => &SMALL_SEEDS,
            Profile::Middle => &MIDDLE_SEEDS,
            Profile::High => &HIGH_SEEDS,
            Profile::Custom(seeds) => seeds,
        }
    }

    /// The number of bits touched per value (`k`).
    pub fn len(&self) -> usize {
        self.seeds().len()
    }

    /// Returns true if the profile has no seeds (only possible for an
    /// unvalidated [`Profile::Custom`]).
    pub fn is_empty(&self) -> bool {
        self.seeds().is_empty()
    }

    /// The reference false-positive rate of a canonical profile, or `None` for
    /// a custom one.
    pub fn approx_false_positive_rate(&self) -> Option<f64> {
        match self {
            Profile::VerySmall => Some(0.14689159766308),
            Profile::Small => Some(0.02157714146322),
            Profile::Middle => Some(0.00046557303372),
            Profile::High => Some(0.00000021167340),
            Profile::Custom(_) => None,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigurationError> {
        let seeds = self.seeds();
        if seeds.is_empty() {
            return Err(ConfigurationError::EmptyProfile);
        }

        for (i, &seed) in seeds.iter().enumerate() {
            if seed <= 0 {
                return Err(ConfigurationError::NonPositiveSeed(seed));
            }
            if seeds[..i].contains(&seed) {
                return Err(ConfigurationError::DuplicateSeed(seed));
            }
        }

        Ok(())
    }

    pub(crate) fn tag(&self) -> u8 {
        match self {
            Profile::VerySmall => 0,
            Profile::Small => 1,
            Profile::Middle => 2,
            Profile::High => 3,
            Profile::Custom(_) => CUSTOM_TAG,
        }
    }

    /// Map a persisted tag back to a canonical profile. The custom tag is
    /// handled by the decoder as it carries a payload.
    pub(crate) fn from_canonical_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Profile::VerySmall),
            1 => Some(Profile::Small),
            2 => Some(Profile::Middle),
            3 => Some(Profile::High),
            _ => None,
        }
    }
}
