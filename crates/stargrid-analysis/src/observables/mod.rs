//! Bootstrapped observables built on top of classified games.
//!
//! Each observable resamples either games or players with the
//! [`Bootstrap`](stargrid_stats::bootstrap::Bootstrap) engine and reports
//! [`Estimate`]s indexed by round, rank, number of defectors or value bin.
//!
//! - [`highest_values`]: running top-3 values found per round
//! - [`exploration`]: group-level exploration observables per round
//! - [`rank`]: behavioral type proportions per final rank
//! - [`defectors`]: team score against the number of defectors
//! - [`stars`]: star statistics per binned value and type
//! - [`occupancy`]: share of the stars per cell value and its power-law fit
//! - [`scores`]: individual and team score distributions
//! - [`discovery`]: probability of having found given values by each round
//! - [`revisits`]: returns to the best cells of the previous round

use stargrid_stats::bootstrap::Estimate;

pub mod defectors;
pub mod discovery;
pub mod exploration;
pub mod highest_values;
pub mod occupancy;
pub mod rank;
pub mod revisits;
pub mod scores;
pub mod stars;

/// Mean of each component over the rows that have it.
///
/// Rows may have different lengths; NaN entries are skipped.
pub(crate) fn component_means<'a, I>(rows: I, len: usize) -> Vec<Option<f64>>
where
    I: IntoIterator<Item = &'a [f64]>,
{
    let mut sums = vec![(0.0, 0_u32); len];
    for row in rows {
        for ((sum, count), &value) in sums.iter_mut().zip(row) {
            if !value.is_nan() {
                *sum += value;
                *count += 1;
            }
        }
    }
    sums.into_iter()
        .map(|(sum, count)| (count > 0).then(|| sum / f64::from(count)))
        .collect()
}

/// Splits a flat component list into consecutive chunks of `chunk` estimates.
pub(crate) fn split_estimates(estimates: Vec<Estimate>, chunk: usize) -> Vec<Vec<Estimate>> {
    if chunk == 0 {
        return vec![];
    }
    estimates.chunks(chunk).map(<[Estimate]>::to_vec).collect()
}
