//! Least-squares fitting.
//!
//! - [`fit_line`] and [`fit_bounded_affine`] handle models that are linear in
//!   their parameters; both have a closed-form minimizer, so they either
//!   return the exact optimum or report why no unique optimum exists.
//! - [`fit_curve`] handles small nonlinear models with box constraints on the
//!   parameters, using a projected Levenberg-Marquardt iteration.

use std::{array, iter};

/// Iteration cap of [`fit_curve`].
const MAX_ITERATIONS: usize = 500;
/// [`fit_curve`] stops once an accepted step lowers the squared error by less
/// than this fraction.
const RELATIVE_TOLERANCE: f64 = 1e-12;
const MIN_DAMPING: f64 = 1e-12;
const MAX_DAMPING: f64 = 1e12;

/// Error returned when a least-squares problem has no unique finite solution.
#[derive(Debug, Clone, Copy, PartialEq, derive_more::Display, derive_more::Error)]
pub enum FitConvergenceError {
    #[display("x and y have different lengths ({x_len} vs {y_len})")]
    LengthMismatch { x_len: usize, y_len: usize },
    #[display("at least {required} points are required, got {actual}")]
    TooFewPoints { required: usize, actual: usize },
    #[display("design matrix is singular (all x values are equal)")]
    Singular,
    #[display("fit produced non-finite parameters")]
    NonFinite,
    #[display("empty parameter bounds [{lower}, {upper}]")]
    EmptyBounds { lower: f64, upper: f64 },
}

/// Result of a straight-line fit `y = intercept + slope * x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFit {
    pub intercept: f64,
    pub slope: f64,
    /// Sum of squared residuals at the optimum.
    pub residual_sq_error: f64,
}

impl LineFit {
    #[must_use]
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Fits `y = intercept + slope * x` by ordinary least squares.
///
/// Needs at least two points with distinct `x`.
///
/// # Examples
///
/// ```
/// use stargrid_stats::regression::fit_line;
///
/// let fit = fit_line(&[0.0, 1.0, 2.0], &[1.0, 3.0, 5.0]).unwrap();
/// assert!((fit.intercept - 1.0).abs() < 1e-12);
/// assert!((fit.slope - 2.0).abs() < 1e-12);
/// assert!(fit.residual_sq_error < 1e-20);
/// ```
#[expect(clippy::cast_precision_loss)]
pub fn fit_line(x: &[f64], y: &[f64]) -> Result<LineFit, FitConvergenceError> {
    if x.len() != y.len() {
        return Err(FitConvergenceError::LengthMismatch {
            x_len: x.len(),
            y_len: y.len(),
        });
    }
    if x.len() < 2 {
        return Err(FitConvergenceError::TooFewPoints {
            required: 2,
            actual: x.len(),
        });
    }

    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;
    let (sxx, sxy) = iter::zip(x, y).fold((0.0, 0.0), |(sxx, sxy), (&xi, &yi)| {
        let dx = xi - mean_x;
        (sxx + dx * dx, sxy + dx * (yi - mean_y))
    });
    if sxx <= f64::EPSILON * mean_x.abs().max(1.0) * n {
        return Err(FitConvergenceError::Singular);
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    if !slope.is_finite() || !intercept.is_finite() {
        return Err(FitConvergenceError::NonFinite);
    }
    let mut fit = LineFit {
        intercept,
        slope,
        residual_sq_error: 0.0,
    };
    fit.residual_sq_error = iter::zip(x, y)
        .map(|(&xi, &yi)| (yi - fit.predict(xi)).powi(2))
        .sum();
    Ok(fit)
}

/// Fits a single parameter `θ` of the affine model `y_i ≈ a_i + b_i θ`,
/// constrained to `lower <= θ <= upper`.
///
/// The objective is a convex parabola in `θ`, so the bounded optimum is the
/// unconstrained minimizer clamped into the bounds.
///
/// # Examples
///
/// ```
/// use stargrid_stats::regression::fit_bounded_affine;
///
/// // y = 2θ with observations around θ = 0.7, but θ must stay below 0.5
/// let theta = fit_bounded_affine(&[0.0, 0.0], &[2.0, 2.0], &[1.4, 1.4], 0.0, 0.5).unwrap();
/// assert_eq!(theta, 0.5);
/// ```
pub fn fit_bounded_affine(
    offsets: &[f64],
    coefficients: &[f64],
    y: &[f64],
    lower: f64,
    upper: f64,
) -> Result<f64, FitConvergenceError> {
    if offsets.len() != y.len() || coefficients.len() != y.len() {
        return Err(FitConvergenceError::LengthMismatch {
            x_len: coefficients.len(),
            y_len: y.len(),
        });
    }
    if lower.is_nan() || upper.is_nan() || lower > upper {
        return Err(FitConvergenceError::EmptyBounds {
            lower,
            upper,
        });
    }
    let (sbb, sby) = iter::zip(iter::zip(offsets, coefficients), y).fold(
        (0.0, 0.0),
        |(sbb, sby), ((&a, &b), &yi)| (sbb + b * b, sby + b * (yi - a)),
    );
    if sbb <= 0.0 {
        return Err(FitConvergenceError::Singular);
    }
    let theta = sby / sbb;
    if !theta.is_finite() {
        return Err(FitConvergenceError::NonFinite);
    }
    Ok(theta.clamp(lower, upper))
}

/// Result of a nonlinear fit with `P` parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveFit<const P: usize> {
    pub params: [f64; P],
    /// Sum of squared residuals at `params`.
    pub residual_sq_error: f64,
}

/// Fits `y ≈ model(x, params)` by least squares with `bounds[i].0 <= params[i]
/// <= bounds[i].1`.
///
/// Starts from `initial` (projected into the bounds) and takes damped
/// Gauss-Newton steps with a forward-difference Jacobian, projecting every
/// candidate back into the bounds. Steps that do not lower the squared error
/// are rejected and the damping is raised. The iteration ends when no step
/// improves the fit any more; the result is then a local minimum of the
/// bounded problem, so the choice of `initial` matters for multimodal
/// models.
///
/// Infinite bounds are allowed. Parameters where `model` returns NaN are
/// treated as infeasible.
///
/// # Examples
///
/// ```
/// use stargrid_stats::regression::fit_curve;
///
/// let x = [0.0, 1.0, 2.0, 3.0, 4.0];
/// let y = x.map(|x: f64| 3.0 * (-0.7 * x).exp());
/// let fit = fit_curve(
///     &x,
///     &y,
///     |x, [a, b]| a * (-b * x).exp(),
///     [1.0, 1.0],
///     [(0.0, f64::INFINITY), (0.0, f64::INFINITY)],
/// )
/// .unwrap();
/// assert!((fit.params[0] - 3.0).abs() < 1e-6);
/// assert!((fit.params[1] - 0.7).abs() < 1e-6);
/// ```
pub fn fit_curve<const P: usize, F>(
    x: &[f64],
    y: &[f64],
    model: F,
    initial: [f64; P],
    bounds: [(f64, f64); P],
) -> Result<CurveFit<P>, FitConvergenceError>
where
    F: Fn(f64, &[f64; P]) -> f64,
{
    if x.len() != y.len() {
        return Err(FitConvergenceError::LengthMismatch {
            x_len: x.len(),
            y_len: y.len(),
        });
    }
    if x.len() < P {
        return Err(FitConvergenceError::TooFewPoints {
            required: P,
            actual: x.len(),
        });
    }
    if let Some(&(lower, upper)) = bounds
        .iter()
        .find(|(lower, upper)| lower.is_nan() || upper.is_nan() || lower > upper)
    {
        return Err(FitConvergenceError::EmptyBounds { lower, upper });
    }

    let project =
        |params: [f64; P]| -> [f64; P] { array::from_fn(|i| params[i].clamp(bounds[i].0, bounds[i].1)) };
    let squared_error = |params: &[f64; P]| -> f64 {
        iter::zip(x, y)
            .map(|(&xi, &yi)| (yi - model(xi, params)).powi(2))
            .sum()
    };

    let mut params = project(initial);
    let mut cost = squared_error(&params);
    if !cost.is_finite() {
        return Err(FitConvergenceError::NonFinite);
    }

    let mut damping = 1e-3;
    for _ in 0..MAX_ITERATIONS {
        let (normal, gradient) = normal_equations(x, y, &model, &params, &bounds);
        let mut accepted = None;
        while damping <= MAX_DAMPING {
            let mut system = normal;
            for (i, row) in system.iter_mut().enumerate() {
                row[i] += damping * normal[i][i].max(MIN_DAMPING);
            }
            if let Some(step) = solve(system, gradient) {
                let candidate = project(array::from_fn(|i| params[i] + step[i]));
                let candidate_cost = squared_error(&candidate);
                if candidate_cost < cost {
                    accepted = Some((candidate, candidate_cost));
                    damping = (damping / 10.0).max(MIN_DAMPING);
                    break;
                }
            }
            damping *= 10.0;
        }
        let Some((candidate, candidate_cost)) = accepted else {
            break;
        };
        let gain = cost - candidate_cost;
        params = candidate;
        cost = candidate_cost;
        if gain <= RELATIVE_TOLERANCE * cost {
            break;
        }
    }

    if params.iter().any(|p| !p.is_finite()) {
        return Err(FitConvergenceError::NonFinite);
    }
    Ok(CurveFit {
        params,
        residual_sq_error: cost,
    })
}

/// `JᵀJ` and `Jᵀr` at `params`, with a forward-difference Jacobian that stays
/// inside the bounds.
fn normal_equations<const P: usize, F>(
    x: &[f64],
    y: &[f64],
    model: &F,
    params: &[f64; P],
    bounds: &[(f64, f64); P],
) -> ([[f64; P]; P], [f64; P])
where
    F: Fn(f64, &[f64; P]) -> f64,
{
    let shifted = array::from_fn::<_, P, _>(|i| {
        let h = 1e-7 * params[i].abs().max(1.0);
        let mut p = *params;
        p[i] = if params[i] + h <= bounds[i].1 {
            params[i] + h
        } else {
            params[i] - h
        };
        p
    });

    let mut normal = [[0.0; P]; P];
    let mut gradient = [0.0; P];
    for (&xi, &yi) in iter::zip(x, y) {
        let base = model(xi, params);
        let row: [f64; P] =
            array::from_fn(|i| (model(xi, &shifted[i]) - base) / (shifted[i][i] - params[i]));
        let residual = yi - base;
        for a in 0..P {
            gradient[a] += row[a] * residual;
            for b in 0..P {
                normal[a][b] += row[a] * row[b];
            }
        }
    }
    (normal, gradient)
}

/// Solves `a · s = b` by Gaussian elimination with partial pivoting.
fn solve<const P: usize>(mut a: [[f64; P]; P], mut b: [f64; P]) -> Option<[f64; P]> {
    for col in 0..P {
        let pivot = (col..P).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if !a[pivot][col].is_normal() {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in (col + 1)..P {
            let factor = a[row][col] / a[col][col];
            for k in col..P {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut s = [0.0; P];
    for row in (0..P).rev() {
        let tail = ((row + 1)..P).map(|k| a[row][k] * s[k]).sum::<f64>();
        s[row] = (b[row] - tail) / a[row][row];
    }
    s.iter().all(|v| v.is_finite()).then_some(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_line_exact_recovery() {
        let x = [0.0, 10.0, 35.0, 99.0];
        let y = x.map(|xi| -0.75 + 0.04 * xi);
        let fit = fit_line(&x, &y).unwrap();
        assert!((fit.intercept + 0.75).abs() < 1e-12);
        assert!((fit.slope - 0.04).abs() < 1e-12);
        assert!(fit.residual_sq_error < 1e-20);
    }

    #[test]
    fn test_fit_line_residuals() {
        // Best line through (0,0), (1,1), (2,0) is y = 1/3
        let fit = fit_line(&[0.0, 1.0, 2.0], &[0.0, 1.0, 0.0]).unwrap();
        assert!(fit.slope.abs() < 1e-12);
        assert!((fit.intercept - 1.0 / 3.0).abs() < 1e-12);
        assert!((fit.residual_sq_error - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_fit_line_degenerate_inputs() {
        assert_eq!(
            fit_line(&[3.0], &[1.0]),
            Err(FitConvergenceError::TooFewPoints {
                required: 2,
                actual: 1
            })
        );
        assert_eq!(
            fit_line(&[3.0, 3.0, 3.0], &[1.0, 2.0, 3.0]),
            Err(FitConvergenceError::Singular)
        );
        assert!(matches!(
            fit_line(&[1.0, 2.0], &[1.0]),
            Err(FitConvergenceError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_bounded_affine_interior_optimum() {
        let theta = fit_bounded_affine(&[1.0, -1.0], &[1.0, 1.0], &[1.3, -0.7], -5.0, 5.0).unwrap();
        assert!((theta - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_bounded_affine_empty_bounds() {
        assert!(matches!(
            fit_bounded_affine(&[0.0], &[1.0], &[0.0], 1.0, 0.0),
            Err(FitConvergenceError::EmptyBounds { .. })
        ));
    }

    #[test]
    fn test_fit_curve_recovers_parameters() {
        let x = (0..12).map(f64::from).collect::<Vec<_>>();
        let y = x.iter().map(|&x| 2.0 * (-0.5 * x).exp()).collect::<Vec<_>>();
        let fit = fit_curve(
            &x,
            &y,
            |x, [a, b]| a * (-b * x).exp(),
            [1.0, 1.0],
            [(0.0, 10.0), (0.0, 10.0)],
        )
        .unwrap();
        assert!((fit.params[0] - 2.0).abs() < 1e-6, "{fit:?}");
        assert!((fit.params[1] - 0.5).abs() < 1e-6, "{fit:?}");
        assert!(fit.residual_sq_error < 1e-12);
    }

    #[test]
    fn test_fit_curve_active_bound() {
        // The unconstrained optimum has b = 0.5; the bound pins it at 0.8.
        let x = (0..12).map(f64::from).collect::<Vec<_>>();
        let y = x.iter().map(|&x| 2.0 * (-0.5 * x).exp()).collect::<Vec<_>>();
        let fit = fit_curve(
            &x,
            &y,
            |x, [a, b]| a * (-b * x).exp(),
            [1.0, 1.0],
            [(0.0, 10.0), (0.8, 2.0)],
        )
        .unwrap();
        assert!((fit.params[1] - 0.8).abs() < 1e-9, "{fit:?}");
        assert!(fit.params[0] > 0.0);
    }

    #[test]
    fn test_fit_curve_preconditions() {
        let model = |x: f64, [a]: &[f64; 1]| a * x;
        assert!(matches!(
            fit_curve(&[], &[], model, [1.0], [(0.0, 1.0)]),
            Err(FitConvergenceError::TooFewPoints { required: 1, actual: 0 })
        ));
        assert!(matches!(
            fit_curve(&[1.0], &[1.0], model, [1.0], [(1.0, 0.0)]),
            Err(FitConvergenceError::EmptyBounds { .. })
        ));
    }
}
