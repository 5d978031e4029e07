/// Error returned when a statistic is not defined for its input.
///
/// The typical cause is an empty sample, e.g. the mean of the players of a
/// behavioral type that does not appear in a bootstrap draw. Inside bootstrap
/// statistics this error is turned into a missing value rather than
/// propagated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("statistic is undefined for an empty sample")]
pub struct UndefinedStatisticError;

/// Arithmetic mean of the values.
///
/// # Examples
///
/// ```
/// # use stargrid_stats::descriptive::{self, UndefinedStatisticError};
/// assert_eq!(descriptive::mean([1.0, 2.0, 6.0]), Ok(3.0));
/// assert_eq!(descriptive::mean([]), Err(UndefinedStatisticError));
/// ```
#[expect(clippy::cast_precision_loss)]
pub fn mean<I>(values: I) -> Result<f64, UndefinedStatisticError>
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0_usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        return Err(UndefinedStatisticError);
    }
    Ok(sum / count as f64)
}

/// Median of the values (mean of the two middle values for even counts).
///
/// # Examples
///
/// ```
/// # use stargrid_stats::descriptive;
/// assert_eq!(descriptive::median([3.0, 1.0, 2.0, 10.0]), Ok(2.5));
/// assert!(descriptive::median([]).is_err());
/// ```
pub fn median<I>(values: I) -> Result<f64, UndefinedStatisticError>
where
    I: IntoIterator<Item = f64>,
{
    let mut values = values.into_iter().collect::<Vec<_>>();
    if values.is_empty() {
        return Err(UndefinedStatisticError);
    }
    values.sort_by(f64::total_cmp);
    Ok(median_of_sorted(&values))
}

/// Mean of the non-NaN values.
pub fn nan_mean<I>(values: I) -> Result<f64, UndefinedStatisticError>
where
    I: IntoIterator<Item = f64>,
{
    mean(values.into_iter().filter(|v| !v.is_nan()))
}

/// Median of the non-NaN values.
pub fn nan_median<I>(values: I) -> Result<f64, UndefinedStatisticError>
where
    I: IntoIterator<Item = f64>,
{
    median(values.into_iter().filter(|v| !v.is_nan()))
}

fn median_of_sorted(sorted_values: &[f64]) -> f64 {
    let len = sorted_values.len();
    if len % 2 == 1 {
        sorted_values[len / 2]
    } else {
        f64::midpoint(sorted_values[len / 2 - 1], sorted_values[len / 2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(median([4.0, 1.0, 3.0]), Ok(3.0));
        assert_eq!(median([7.5]), Ok(7.5));
        assert_eq!(median([2.0, 1.0]), Ok(1.5));
    }

    #[test]
    fn test_nan_aware_helpers() {
        let values = [1.0, f64::NAN, 3.0];
        assert_eq!(nan_mean(values), Ok(2.0));
        assert_eq!(nan_median(values), Ok(2.0));
        assert!(mean(values).unwrap().is_nan());
        assert_eq!(nan_mean([f64::NAN]), Err(UndefinedStatisticError));
    }
}
