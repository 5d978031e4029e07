//! Bootstrap resampling for point estimates, confidence intervals and p-values.
//!
//! The engine turns an empirical sample into the distribution of a statistic by
//! repeatedly drawing, with replacement, as many items as the sample holds and
//! evaluating the statistic on every draw.
//!
//! # Reported interval
//!
//! Estimates are reported as a central value plus an asymmetric interval taken
//! from the 15.87th and 84.13th percentiles of the replicate distribution
//! ([`LOWER_PERCENTILE`], [`UPPER_PERCENTILE`]). This is the empirical analogue
//! of a ±1σ band and does not assume normality.
//!
//! The central value is either the mean or the median of the replicates, chosen
//! per call with [`CentralEstimator`]. Both conventions are in use: array-valued
//! observables are centered on the mean, while the mean and median of team
//! scores are centered on the median of their replicates.
//!
//! # Undefined draws
//!
//! A statistic returns `None` when it is undefined for a particular draw, e.g.
//! the fraction of defectors at some rank when the draw contains no player of
//! that rank. Such replicates are dropped before the reduction; they never fail
//! the whole estimate.
//!
//! # Determinism and parallelism
//!
//! Every repetition owns a PCG32 generator derived from the
//! [`BootstrapSeed`] and the repetition index. Repetitions are spread over
//! scoped threads in contiguous chunks and the outputs are concatenated in
//! repetition order before any reduction, so the result for a given seed does
//! not depend on the number of threads.
//!
//! # Example
//!
//! ```
//! use stargrid_stats::bootstrap::{Bootstrap, BootstrapSeed, CentralEstimator};
//!
//! let scores = [0.41, 0.52, 0.47, 0.60, 0.39, 0.55];
//! let bootstrap = Bootstrap::new(1000, BootstrapSeed::from_u128(7)).unwrap();
//! let estimate = bootstrap
//!     .estimate(&scores, CentralEstimator::Median, |draw| draw.mean())
//!     .unwrap();
//! assert!(estimate.low() <= estimate.center && estimate.center <= estimate.high());
//! ```

use std::{fmt::Write as _, num::NonZeroUsize, str::FromStr, thread};

use rand::{
    Rng,
    distr::{Distribution, StandardUniform},
};
use rand_pcg::Pcg32;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{descriptive, percentiles};

/// Lower percentile of the reported interval (`50 - 34.13`).
pub const LOWER_PERCENTILE: f64 = 50.0 - 34.13;
/// Upper percentile of the reported interval (`50 + 34.13`).
pub const UPPER_PERCENTILE: f64 = 50.0 + 34.13;

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum BootstrapError {
    #[display("cannot resample an empty sample")]
    EmptySample,
    #[display("number of bootstrap repetitions must be at least 1")]
    NoRepetitions,
}

/// Seed for deterministic resampling.
///
/// A 128-bit value, serialized as a 32 character hexadecimal string. The same
/// seed always produces the same replicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapSeed([u8; 16]);

impl BootstrapSeed {
    #[must_use]
    pub const fn from_u128(value: u128) -> Self {
        Self(value.to_be_bytes())
    }

    #[must_use]
    pub const fn as_u128(self) -> u128 {
        u128::from_be_bytes(self.0)
    }

    #[expect(clippy::cast_possible_truncation)]
    fn state_and_stream(self) -> (u64, u64) {
        let value = self.as_u128();
        ((value >> 64) as u64, value as u64)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("invalid seed {input:?}: expected 32 hexadecimal characters")]
pub struct ParseSeedError {
    input: String,
}

impl FromStr for BootstrapSeed {
    type Err = ParseSeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseSeedError {
            input: s.to_owned(),
        };
        if s.len() != 32 {
            return Err(err());
        }
        let value = u128::from_str_radix(s, 16).map_err(|_| err())?;
        Ok(Self::from_u128(value))
    }
}

impl std::fmt::Display for BootstrapSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:032x}", self.as_u128())
    }
}

impl Serialize for BootstrapSeed {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut hex_str = String::with_capacity(2 * self.0.len());
        write!(&mut hex_str, "{self}").map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&hex_str)
    }
}

impl<'de> Deserialize<'de> for BootstrapSeed {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let hex_str = String::deserialize(deserializer)?;
        hex_str.parse().map_err(serde::de::Error::custom)
    }
}

/// Allows generating random `BootstrapSeed` values with `rng.random()`.
impl Distribution<BootstrapSeed> for StandardUniform {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> BootstrapSeed {
        let mut seed = [0; 16];
        rng.fill(&mut seed);
        BootstrapSeed(seed)
    }
}

/// How the central value of an estimate is taken from its replicates.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CentralEstimator {
    #[default]
    Mean,
    Median,
}

impl CentralEstimator {
    fn apply(self, values: &[f64]) -> f64 {
        let center = match self {
            Self::Mean => descriptive::nan_mean(values.iter().copied()),
            Self::Median => descriptive::nan_median(values.iter().copied()),
        };
        center.unwrap_or(f64::NAN)
    }
}

/// Point estimate with an asymmetric interval.
///
/// `err_low` and `err_high` are distances from `center`; the interval is
/// `[center - err_low, center + err_high]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub center: f64,
    pub err_low: f64,
    pub err_high: f64,
}

impl Estimate {
    /// Reduces a set of replicate values to an estimate, ignoring NaN entries.
    ///
    /// # Examples
    ///
    /// ```
    /// use stargrid_stats::bootstrap::{CentralEstimator, Estimate};
    ///
    /// let estimate = Estimate::from_replicates(&[2.0, f64::NAN, 2.0], CentralEstimator::Mean);
    /// assert_eq!(estimate.center, 2.0);
    /// assert_eq!(estimate.err_low, 0.0);
    /// assert_eq!(estimate.err_high, 0.0);
    /// ```
    #[must_use]
    pub fn from_replicates(replicates: &[f64], estimator: CentralEstimator) -> Self {
        let mut defined = replicates
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .collect::<Vec<_>>();
        if defined.is_empty() {
            log::warn!(
                "statistic undefined in all {} bootstrap replicates",
                replicates.len()
            );
            return Self::undefined();
        }
        defined.sort_by(f64::total_cmp);
        let center = estimator.apply(&defined);
        let low = percentiles::compute_percentile(&defined, LOWER_PERCENTILE);
        let high = percentiles::compute_percentile(&defined, UPPER_PERCENTILE);
        Self {
            center,
            err_low: (center - low).abs(),
            err_high: (high - center).abs(),
        }
    }

    #[must_use]
    pub const fn undefined() -> Self {
        Self {
            center: f64::NAN,
            err_low: f64::NAN,
            err_high: f64::NAN,
        }
    }

    #[must_use]
    pub fn is_defined(&self) -> bool {
        !self.center.is_nan()
    }

    #[must_use]
    pub fn low(&self) -> f64 {
        self.center - self.err_low
    }

    #[must_use]
    pub fn high(&self) -> f64 {
        self.center + self.err_high
    }
}

/// One bootstrap draw: a multiset of items taken from the original sample.
#[derive(Debug, Clone)]
pub struct Resample<'a, T> {
    sample: &'a [T],
    indices: Vec<usize>,
}

impl<'a, T> Resample<'a, T> {
    fn draw<R>(sample: &'a [T], rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let indices = (0..sample.len())
            .map(|_| rng.random_range(0..sample.len()))
            .collect();
        Self { sample, indices }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a T> + '_ {
        self.indices.iter().map(|&i| &self.sample[i])
    }
}

impl Resample<'_, f64> {
    /// Mean of the drawn values.
    #[must_use]
    pub fn mean(&self) -> Option<f64> {
        descriptive::mean(self.iter().copied()).ok()
    }

    /// Median of the drawn values.
    #[must_use]
    pub fn median(&self) -> Option<f64> {
        descriptive::median(self.iter().copied()).ok()
    }
}

/// Bootstrap engine configuration.
#[derive(Debug, Clone)]
pub struct Bootstrap {
    repetitions: usize,
    seed: BootstrapSeed,
    threads: Option<NonZeroUsize>,
}

impl Bootstrap {
    /// Creates an engine running `repetitions` draws from `seed`.
    ///
    /// The number of worker threads defaults to the available parallelism.
    pub fn new(repetitions: usize, seed: BootstrapSeed) -> Result<Self, BootstrapError> {
        if repetitions == 0 {
            return Err(BootstrapError::NoRepetitions);
        }
        Ok(Self {
            repetitions,
            seed,
            threads: None,
        })
    }

    /// Like [`Self::new`], but seeded from the thread-local random generator.
    pub fn with_random_seed(repetitions: usize) -> Result<Self, BootstrapError> {
        Self::new(repetitions, rand::rng().random())
    }

    /// Caps the number of worker threads.
    #[must_use]
    pub fn with_threads(mut self, threads: NonZeroUsize) -> Self {
        self.threads = Some(threads);
        self
    }

    #[must_use]
    pub fn repetitions(&self) -> usize {
        self.repetitions
    }

    #[must_use]
    pub fn seed(&self) -> BootstrapSeed {
        self.seed
    }

    /// Evaluates `statistic` on every draw and returns the replicates in
    /// repetition order.
    pub fn replicate<T, R, F>(&self, sample: &[T], statistic: F) -> Result<Vec<R>, BootstrapError>
    where
        T: Sync,
        R: Send,
        F: Fn(&Resample<'_, T>) -> R + Sync,
    {
        if sample.is_empty() {
            return Err(BootstrapError::EmptySample);
        }
        Ok(self.run(|rng| statistic(&Resample::draw(sample, rng))))
    }

    /// Single-sample estimate of a scalar statistic.
    ///
    /// `statistic` returns `None` for draws on which it is undefined.
    pub fn estimate<T, F>(
        &self,
        sample: &[T],
        estimator: CentralEstimator,
        statistic: F,
    ) -> Result<Estimate, BootstrapError>
    where
        T: Sync,
        F: Fn(&Resample<'_, T>) -> Option<f64> + Sync,
    {
        let replicates = self.replicate(sample, |draw| statistic(draw).unwrap_or(f64::NAN))?;
        Ok(Estimate::from_replicates(&replicates, estimator))
    }

    /// Single-sample estimate of a vector-valued statistic, component-wise.
    ///
    /// Replicates may differ in length; components missing from a replicate
    /// are treated as undefined for that draw.
    pub fn estimate_vec<T, F>(
        &self,
        sample: &[T],
        estimator: CentralEstimator,
        statistic: F,
    ) -> Result<Vec<Estimate>, BootstrapError>
    where
        T: Sync,
        F: Fn(&Resample<'_, T>) -> Vec<Option<f64>> + Sync,
    {
        let replicates = self.replicate(sample, statistic)?;
        Ok(reduce_components(&replicates, estimator))
    }

    /// One-sided p-value that the statistic of `a` is not larger than that of `b`.
    ///
    /// Both samples are resampled independently at their own sizes; the result
    /// is the fraction of defined differences `f(a) - f(b)` that are negative.
    /// Returns NaN if the difference is undefined for every draw.
    pub fn p_value<T, F>(&self, a: &[T], b: &[T], statistic: F) -> Result<f64, BootstrapError>
    where
        T: Sync,
        F: Fn(&Resample<'_, T>) -> Option<f64> + Sync,
    {
        if a.is_empty() || b.is_empty() {
            return Err(BootstrapError::EmptySample);
        }
        let differences = self.run(|rng| {
            let draw_a = Resample::draw(a, rng);
            let draw_b = Resample::draw(b, rng);
            Some(statistic(&draw_a)? - statistic(&draw_b)?)
        });
        Ok(negative_fraction(&differences))
    }

    /// One-sided p-value from a statistic that already returns a difference.
    ///
    /// Used when both compared quantities are derived from the same draw.
    pub fn p_value_of_difference<T, F>(&self, sample: &[T], difference: F) -> Result<f64, BootstrapError>
    where
        T: Sync,
        F: Fn(&Resample<'_, T>) -> Option<f64> + Sync,
    {
        let differences = self.replicate(sample, difference)?;
        Ok(negative_fraction(&differences))
    }

    fn rng_for(&self, repetition: usize) -> Pcg32 {
        let (state, stream) = self.seed.state_and_stream();
        let repetition = repetition as u64;
        Pcg32::new(state ^ splitmix64(repetition), stream.wrapping_add(repetition))
    }

    fn run<R, F>(&self, job: F) -> Vec<R>
    where
        R: Send,
        F: Fn(&mut Pcg32) -> R + Sync,
    {
        let threads = self
            .threads
            .or_else(|| thread::available_parallelism().ok())
            .map_or(1, NonZeroUsize::get)
            .min(self.repetitions);
        let chunk_size = self.repetitions.div_ceil(threads);
        log::debug!(
            "running {} bootstrap repetitions on {threads} threads",
            self.repetitions
        );

        let job = &job;
        thread::scope(|s| {
            let handles = (0..self.repetitions)
                .step_by(chunk_size)
                .map(|start| {
                    let end = (start + chunk_size).min(self.repetitions);
                    s.spawn(move || {
                        (start..end)
                            .map(|repetition| job(&mut self.rng_for(repetition)))
                            .collect::<Vec<_>>()
                    })
                })
                .collect::<Vec<_>>();
            handles
                .into_iter()
                .flat_map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
                })
                .collect()
        })
    }
}

/// Component-wise reduction of vector replicates.
///
/// # Examples
///
/// ```
/// use stargrid_stats::bootstrap::{CentralEstimator, reduce_components};
///
/// let replicates = vec![vec![Some(1.0), None], vec![Some(3.0), Some(5.0)]];
/// let estimates = reduce_components(&replicates, CentralEstimator::Mean);
/// assert_eq!(estimates[0].center, 2.0);
/// assert_eq!(estimates[1].center, 5.0);
/// ```
#[must_use]
pub fn reduce_components(replicates: &[Vec<Option<f64>>], estimator: CentralEstimator) -> Vec<Estimate> {
    let components = replicates.iter().map(Vec::len).max().unwrap_or(0);
    (0..components)
        .map(|i| {
            let values = replicates
                .iter()
                .map(|r| r.get(i).copied().flatten().unwrap_or(f64::NAN))
                .collect::<Vec<_>>();
            Estimate::from_replicates(&values, estimator)
        })
        .collect()
}

#[expect(clippy::cast_precision_loss)]
fn negative_fraction(differences: &[Option<f64>]) -> f64 {
    let defined = differences.iter().flatten().filter(|d| !d.is_nan());
    let (negative, total) = defined.fold((0_usize, 0_usize), |(negative, total), &d| {
        (negative + usize::from(d < 0.0), total + 1)
    });
    if total < differences.len() {
        log::debug!(
            "{} of {} bootstrap differences undefined",
            differences.len() - total,
            differences.len()
        );
    }
    if total == 0 {
        return f64::NAN;
    }
    negative as f64 / total as f64
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bootstrap(repetitions: usize) -> Bootstrap {
        Bootstrap::new(repetitions, BootstrapSeed::from_u128(0x5eed)).unwrap()
    }

    #[test]
    fn test_zero_repetitions_rejected() {
        assert_eq!(
            Bootstrap::new(0, BootstrapSeed::from_u128(1)).unwrap_err(),
            BootstrapError::NoRepetitions
        );
    }

    #[test]
    fn test_empty_sample_rejected() {
        let empty: [f64; 0] = [];
        let err = bootstrap(10)
            .estimate(&empty, CentralEstimator::Mean, |draw| draw.mean())
            .unwrap_err();
        assert_eq!(err, BootstrapError::EmptySample);
        let err = bootstrap(10)
            .p_value(&empty, &[1.0], |draw| draw.mean())
            .unwrap_err();
        assert_eq!(err, BootstrapError::EmptySample);
    }

    #[test]
    fn test_single_repetition_has_degenerate_interval() {
        let sample = [3.0, 8.0, 1.0, 4.0];
        for estimator in [CentralEstimator::Mean, CentralEstimator::Median] {
            let b = bootstrap(1);
            let replicate = b.replicate(&sample, |draw| draw.mean()).unwrap()[0].unwrap();
            let estimate = b.estimate(&sample, estimator, |draw| draw.mean()).unwrap();
            assert_eq!(estimate.center, replicate);
            assert_eq!(estimate.low(), replicate);
            assert_eq!(estimate.high(), replicate);
        }
    }

    #[test]
    fn test_constant_sample_has_zero_width() {
        let sample = [2.5; 7];
        for repetitions in [1, 10, 500] {
            let engine = bootstrap(repetitions);
            let of_means = engine
                .estimate(&sample, CentralEstimator::Mean, |draw| draw.mean())
                .unwrap();
            let of_medians = engine
                .estimate(&sample, CentralEstimator::Median, |draw| draw.median())
                .unwrap();
            for estimate in [of_means, of_medians] {
                assert_eq!(estimate.center, 2.5);
                assert_eq!(estimate.err_low, 0.0);
                assert_eq!(estimate.err_high, 0.0);
            }
        }
    }

    #[test]
    fn test_draws_have_sample_size_and_come_from_sample() {
        let sample = [10, 20, 30];
        let draws = bootstrap(50)
            .replicate(&sample, |draw| draw.iter().copied().collect::<Vec<_>>())
            .unwrap();
        assert_eq!(draws.len(), 50);
        for draw in draws {
            assert_eq!(draw.len(), 3);
            assert!(draw.iter().all(|v| sample.contains(v)));
        }
    }

    #[test]
    fn test_deterministic_and_thread_independent() {
        let sample = (0..40).map(f64::from).collect::<Vec<_>>();
        let one = bootstrap(300)
            .with_threads(NonZeroUsize::MIN)
            .replicate(&sample, |draw| draw.mean())
            .unwrap();
        let many = bootstrap(300)
            .with_threads(NonZeroUsize::new(7).unwrap())
            .replicate(&sample, |draw| draw.mean())
            .unwrap();
        assert_eq!(one, many);

        let other_seed = Bootstrap::new(300, BootstrapSeed::from_u128(1))
            .unwrap()
            .replicate(&sample, |draw| draw.mean())
            .unwrap();
        assert_ne!(one, other_seed);
    }

    #[test]
    fn test_undefined_draws_are_ignored() {
        // The statistic is undefined whenever the draw contains no positive value.
        let sample = [-1.0, 5.0];
        let estimate = bootstrap(400)
            .estimate(&sample, CentralEstimator::Mean, |draw| {
                let positives = draw.iter().copied().filter(|v| *v > 0.0);
                descriptive::mean(positives).ok()
            })
            .unwrap();
        assert_eq!(estimate.center, 5.0);
        assert_eq!(estimate.err_low, 0.0);
        assert_eq!(estimate.err_high, 0.0);
    }

    #[test]
    fn test_all_undefined_yields_nan() {
        let estimate = bootstrap(20)
            .estimate(&[1.0, 2.0], CentralEstimator::Mean, |_| None)
            .unwrap();
        assert!(!estimate.is_defined());
        assert!(estimate.err_low.is_nan());
    }

    #[test]
    fn test_vector_estimate_per_component() {
        let sample = [[1.0, 10.0], [1.0, 10.0], [1.0, 10.0]];
        let estimates = bootstrap(100)
            .estimate_vec(&sample, CentralEstimator::Mean, |draw| {
                (0..2)
                    .map(|i| descriptive::mean(draw.iter().map(|row| row[i])).ok())
                    .collect()
            })
            .unwrap();
        assert_eq!(estimates.len(), 2);
        assert_eq!(estimates[0].center, 1.0);
        assert_eq!(estimates[1].center, 10.0);
    }

    #[test]
    fn test_p_value_separated_samples() {
        let a = [10.0, 11.0, 12.0, 13.0];
        let b = [1.0, 2.0, 3.0, 4.0];
        let b_engine = bootstrap(500);
        assert_eq!(b_engine.p_value(&a, &b, |draw| draw.mean()).unwrap(), 0.0);
        assert_eq!(b_engine.p_value(&b, &a, |draw| draw.mean()).unwrap(), 1.0);
    }

    #[test]
    fn test_p_value_swapped_inputs_sum_to_one() {
        let a = [0.12, 0.53, 0.31, 0.77, 0.45, 0.29, 0.61];
        let b = [0.33, 0.18, 0.71, 0.49, 0.58, 0.24, 0.39, 0.66];
        let engine = bootstrap(4000);
        let p_ab = engine.p_value(&a, &b, |draw| draw.mean()).unwrap();
        let p_ba = engine.p_value(&b, &a, |draw| draw.mean()).unwrap();
        assert!((p_ab + p_ba - 1.0).abs() < 0.05, "{p_ab} + {p_ba}");
    }

    #[test]
    fn test_seed_roundtrip() {
        let seed = BootstrapSeed::from_u128(0x0123_4567_89ab_cdef_0011_2233_4455_6677);
        let serialized = serde_json::to_string(&seed).unwrap();
        assert_eq!(serialized, "\"0123456789abcdef0011223344556677\"");
        let deserialized: BootstrapSeed = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, seed);
        assert!("xyz".parse::<BootstrapSeed>().is_err());
    }

    #[test]
    fn test_random_seed_is_reproducible() {
        let sample = (0..20).map(f64::from).collect::<Vec<_>>();
        let random = Bootstrap::with_random_seed(50).unwrap();
        assert_eq!(random.repetitions(), 50);
        let replay = Bootstrap::new(random.repetitions(), random.seed()).unwrap();
        assert_eq!(
            random.replicate(&sample, |draw| draw.mean()).unwrap(),
            replay.replicate(&sample, |draw| draw.mean()).unwrap()
        );
        assert_eq!(
            Bootstrap::with_random_seed(0).unwrap_err(),
            BootstrapError::NoRepetitions
        );
    }
}
