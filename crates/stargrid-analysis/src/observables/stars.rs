//! Star statistics per binned cell value.
//!
//! Two observables resample players and pool their star ratings per value
//! bin:
//!
//! - [`mean_stars_by_value`]: the mean number of stars per bin, for each
//!   behavioral type and for all players together
//! - [`star_distributions`]: the probabilities of giving 0 to 5 stars per bin
//!   and type, under a model with constant mean
//! - [`star_models`]: `p0` and `p5` of that model as smooth functions of the
//!   value, per type
//!
//! # Star-count model
//!
//! For a bin whose pooled ratings have mean `m`, the probabilities of the
//! six star counts are
//!
//! ```text
//! p0
//! p1 = p2 = p3 = p4 = (1 - p0 - p5) / 4
//! p5 = 2/5 · m + p0 - 1
//! ```
//!
//! which keeps the mean at `m` for any `p0`. The single free parameter `p0`
//! is fitted by least squares on the empirical star frequencies, bounded to
//! `[max(0, 1 - 2/5 · m), min(1, 2 (1 - m/5))]`.
//!
//! # Value dependence
//!
//! Across bins, `p0(v)` and `p5(v)` of collaborators and defectors follow
//!
//! ```text
//! (1 + tanh((v - center) · steepness / 99)) / 2
//! ```
//!
//! while neutral players rate independently of the value, so their curves are
//! constants. These curves are what an agent-based model of the game needs to
//! draw star ratings for each type.

use std::collections::BTreeMap;

use serde::Serialize;
use stargrid_stats::{
    bootstrap::{Bootstrap, BootstrapError, CentralEstimator, Estimate, Resample},
    descriptive,
    regression::{self, CurveFit},
};

use super::split_estimates;
use crate::{
    binning::ValueBinning,
    classify::{ClassifiedPlayer, PlayerType},
};

/// Number of distinct star counts, 0 to 5.
pub const STAR_LEVELS: usize = 6;

/// Slack on the bounds of `p0`.
const BOUND_SLACK: f64 = 1e-10;

/// Value scale of the tanh curves.
const VALUE_SCALE: f64 = 99.0;

/// Fixed starting points `[center, steepness]` of the tanh fit, one rising
/// and one falling.
const TANH_STARTS: [[f64; 2]; 2] = [[10.0, 0.1], [10.0, -11.0]];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeanStarsByValue {
    /// Representative value of each bin.
    pub bins: Vec<f64>,
    pub all: Vec<Estimate>,
    pub by_type: BTreeMap<PlayerType, Vec<Estimate>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StarDistributions {
    /// Representative value of each bin.
    pub bins: Vec<f64>,
    /// `by_type[t][bin][k]`: probability that a player of type `t` gives `k`
    /// stars to a cell of the bin.
    pub by_type: BTreeMap<PlayerType, Vec<[Estimate; STAR_LEVELS]>>,
}

/// Fits the constant-mean star-count model to a set of ratings.
///
/// Ratings above 5 count towards the mean but not towards any frequency.
/// Returns `None` for an empty set or when the mean leaves no admissible
/// `p0`.
///
/// # Examples
///
/// ```
/// use stargrid_analysis::observables::stars::fit_star_distribution;
///
/// let p = fit_star_distribution(&[0, 0, 5, 5, 2, 3]).unwrap();
/// assert!((p[0] - 1.0 / 3.0).abs() < 1e-9);
/// assert!((p[1] - 1.0 / 12.0).abs() < 1e-9);
/// assert!((p[5] - 1.0 / 3.0).abs() < 1e-9);
/// ```
#[must_use]
#[expect(clippy::cast_precision_loss)]
pub fn fit_star_distribution(stars: &[u32]) -> Option<[f64; STAR_LEVELS]> {
    let mean = descriptive::mean(stars.iter().map(|&s| f64::from(s))).ok()?;
    let mut frequencies = [0.0; STAR_LEVELS];
    for &s in stars {
        if let Some(f) = usize::try_from(s).ok().and_then(|s| frequencies.get_mut(s)) {
            *f += 1.0;
        }
    }
    for f in &mut frequencies {
        *f /= stars.len() as f64;
    }

    // Each frequency is affine in p0: y_k ≈ a_k + b_k · p0.
    let middle = 0.5 - mean / 10.0;
    let offsets = [0.0, middle, middle, middle, middle, 2.0 / 5.0 * mean - 1.0];
    let coefficients = [1.0, -0.5, -0.5, -0.5, -0.5, 1.0];
    let lower = (1.0 - 2.0 / 5.0 * mean - BOUND_SLACK).max(0.0);
    let upper = (2.0 * (1.0 - mean / 5.0) + BOUND_SLACK).min(1.0);
    let p0 = match regression::fit_bounded_affine(&offsets, &coefficients, &frequencies, lower, upper) {
        Ok(p0) => p0.min(1.0),
        Err(err) => {
            log::warn!("cannot fit star distribution with mean {mean}: {err}");
            return None;
        }
    };
    let p5 = (2.0 / 5.0 * mean + p0 - 1.0).max(0.0);
    let p1 = ((1.0 - p0 - p5) / 4.0).max(0.0);
    Some([p0, p1, p1, p1, p1, p5])
}

pub fn mean_stars_by_value(
    players: &[ClassifiedPlayer<'_>],
    binning: &ValueBinning,
    bootstrap: &Bootstrap,
) -> Result<MeanStarsByValue, BootstrapError> {
    // Group order: every type of PlayerType::ALL, then all players.
    let groups = PlayerType::ALL.len() + 1;
    let estimates = bootstrap.estimate_vec(players, CentralEstimator::Mean, |draw| {
        let mut means = Vec::with_capacity(groups * binning.len());
        for filter in PlayerType::ALL.map(Some).into_iter().chain([None]) {
            let pooled = pool_draw(draw, binning, filter);
            means.extend(
                pooled
                    .iter()
                    .map(|stars| descriptive::mean(stars.iter().map(|&s| f64::from(s))).ok()),
            );
        }
        means
    })?;

    let mut split = split_estimates(estimates, binning.len());
    let all = split.pop().unwrap_or_default();
    Ok(MeanStarsByValue {
        bins: binning.representatives().to_vec(),
        all,
        by_type: PlayerType::ALL.into_iter().zip(split).collect(),
    })
}

pub fn star_distributions(
    players: &[ClassifiedPlayer<'_>],
    binning: &ValueBinning,
    bootstrap: &Bootstrap,
) -> Result<StarDistributions, BootstrapError> {
    let estimates = bootstrap.estimate_vec(players, CentralEstimator::Mean, |draw| {
        let mut probabilities = vec![];
        for player_type in PlayerType::ALL {
            for stars in pool_draw(draw, binning, Some(player_type)) {
                match fit_star_distribution(&stars) {
                    Some(p) => probabilities.extend(p.map(Some)),
                    None => probabilities.extend([None; STAR_LEVELS]),
                }
            }
        }
        probabilities
    })?;

    let by_type = PlayerType::ALL
        .into_iter()
        .zip(split_estimates(estimates, binning.len() * STAR_LEVELS))
        .map(|(player_type, flat)| {
            let per_bin = flat
                .chunks_exact(STAR_LEVELS)
                .map(|chunk| std::array::from_fn(|k| chunk[k]))
                .collect();
            (player_type, per_bin)
        })
        .collect();
    Ok(StarDistributions {
        bins: binning.representatives().to_vec(),
        by_type,
    })
}

/// Functional form of `p0(v)` or `p5(v)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveShape {
    /// Parameters `[center, steepness]`.
    Tanh,
    /// Parameter `[level]`.
    Constant,
}

impl CurveShape {
    #[must_use]
    pub fn of(player_type: PlayerType) -> Self {
        match player_type {
            PlayerType::Neutral => Self::Constant,
            PlayerType::Defector | PlayerType::Collaborator => Self::Tanh,
        }
    }

    #[must_use]
    pub fn parameters(self) -> usize {
        match self {
            Self::Tanh => 2,
            Self::Constant => 1,
        }
    }

    /// Curve value at `value`; NaN when `params` is too short.
    #[must_use]
    pub fn evaluate(self, value: f64, params: &[f64]) -> f64 {
        match (self, params) {
            (Self::Tanh, &[center, steepness, ..]) => tanh_curve(value, &[center, steepness]),
            (Self::Constant, &[level, ..]) => level,
            _ => f64::NAN,
        }
    }
}

/// `(1 + tanh((value - center) · steepness / 99)) / 2`.
///
/// # Examples
///
/// ```
/// use stargrid_analysis::observables::stars::tanh_curve;
///
/// assert_eq!(tanh_curve(40.0, &[40.0, 3.0]), 0.5);
/// assert!(tanh_curve(99.0, &[40.0, 3.0]) > 0.9);
/// assert!(tanh_curve(99.0, &[40.0, -3.0]) < 0.1);
/// ```
#[must_use]
pub fn tanh_curve(value: f64, &[center, steepness]: &[f64; 2]) -> f64 {
    (1.0 + ((value - center) * steepness / VALUE_SCALE).tanh()) / 2.0
}

/// Fits a curve of `shape` to `probabilities` observed at `values`.
///
/// The tanh fit is started from a rising and a falling default and from a
/// guess read off the data; the start with the lowest squared error wins. Returns `None` without
/// data or when every start fails.
#[must_use]
pub fn fit_star_curve(shape: CurveShape, values: &[f64], probabilities: &[f64]) -> Option<Vec<f64>> {
    match shape {
        CurveShape::Constant => {
            descriptive::mean(probabilities.iter().copied()).ok().map(|level| vec![level])
        }
        CurveShape::Tanh => {
            let guess = data_guess(values, probabilities)?;
            TANH_STARTS
                .into_iter()
                .chain([guess])
                .filter_map(|start| {
                    let fit = regression::fit_curve(
                        values,
                        probabilities,
                        tanh_curve,
                        start,
                        [(f64::NEG_INFINITY, f64::INFINITY); 2],
                    );
                    if let Err(err) = &fit {
                        log::debug!("tanh fit from {start:?} failed: {err}");
                    }
                    fit.ok()
                })
                .min_by(|a: &CurveFit<2>, b| a.residual_sq_error.total_cmp(&b.residual_sq_error))
                .map(|fit| fit.params.to_vec())
        }
    }
}

/// Tanh start centered on the point closest to 1/2, rising or falling with
/// the data.
fn data_guess(values: &[f64], probabilities: &[f64]) -> Option<[f64; 2]> {
    let (&center, _) = values
        .iter()
        .zip(probabilities)
        .min_by(|(_, a), (_, b)| (*a - 0.5).abs().total_cmp(&(*b - 0.5).abs()))?;
    let rising = probabilities.last()? >= probabilities.first()?;
    Some([center, if rising { 4.0 } else { -4.0 }])
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StarCurve {
    pub shape: CurveShape,
    pub params: Vec<Estimate>,
}

impl StarCurve {
    /// Curve value at `value` with the central parameters.
    #[must_use]
    pub fn evaluate(&self, value: f64) -> f64 {
        let params = self.params.iter().map(|e| e.center).collect::<Vec<_>>();
        self.shape.evaluate(value, &params)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StarModel {
    pub p0: StarCurve,
    pub p5: StarCurve,
}

impl StarModel {
    /// Probabilities of giving 0 to 5 stars to a cell of `value`.
    #[must_use]
    pub fn probabilities(&self, value: f64) -> [f64; STAR_LEVELS] {
        let p0 = self.p0.evaluate(value);
        let p5 = self.p5.evaluate(value);
        let middle = ((1.0 - p0 - p5) / 4.0).max(0.0);
        [p0, middle, middle, middle, middle, p5]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StarModels {
    pub by_type: BTreeMap<PlayerType, StarModel>,
}

pub fn star_models(
    players: &[ClassifiedPlayer<'_>],
    binning: &ValueBinning,
    bootstrap: &Bootstrap,
) -> Result<StarModels, BootstrapError> {
    let estimates = bootstrap.estimate_vec(players, CentralEstimator::Mean, |draw| {
        let mut params = vec![];
        for player_type in PlayerType::ALL {
            let shape = CurveShape::of(player_type);
            let mut values = vec![];
            let mut p0 = vec![];
            let mut p5 = vec![];
            let pooled = pool_draw(draw, binning, Some(player_type));
            for (&value, stars) in binning.representatives().iter().zip(&pooled) {
                if let Some(p) = fit_star_distribution(stars) {
                    values.push(value);
                    p0.push(p[0]);
                    p5.push(p[STAR_LEVELS - 1]);
                }
            }
            for probabilities in [&p0, &p5] {
                match fit_star_curve(shape, &values, probabilities) {
                    Some(fitted) => params.extend(fitted.into_iter().map(Some)),
                    None => params.extend(vec![None; shape.parameters()]),
                }
            }
        }
        params
    })?;

    let mut estimates = estimates.into_iter();
    let by_type = PlayerType::ALL
        .into_iter()
        .map(|player_type| {
            let shape = CurveShape::of(player_type);
            let mut curve = || StarCurve {
                shape,
                params: estimates.by_ref().take(shape.parameters()).collect(),
            };
            let p0 = curve();
            let p5 = curve();
            (player_type, StarModel { p0, p5 })
        })
        .collect();
    Ok(StarModels { by_type })
}

/// Pools the ratings of the drawn players of type `filter` (all players for
/// `None`) per bin.
fn pool_draw(
    draw: &Resample<'_, ClassifiedPlayer<'_>>,
    binning: &ValueBinning,
    filter: Option<PlayerType>,
) -> Vec<Vec<u32>> {
    binning.pool_stars(
        draw.iter()
            .filter(|p| filter.is_none_or(|t| p.player_type() == t))
            .flat_map(|p| p.player.stars_by_value()),
    )
}
