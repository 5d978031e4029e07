//! Probability density estimates on evenly spaced centers.
//!
//! A [`DensityHistogram`] evaluates the density of a sample at `n` evenly
//! spaced centers over `[min, max]`. The window around each center has a fixed
//! width, independent of the spacing between centers: windows may overlap,
//! but they must not leave gaps.

/// Error returned when the windows would leave part of the range uncovered.
#[derive(Debug, Clone, Copy, PartialEq, derive_more::Display, derive_more::Error)]
#[display("window width {width} leaves gaps between {centers} centers over [{min}, {max}]")]
pub struct HistogramGapError {
    pub min: f64,
    pub max: f64,
    pub centers: usize,
    pub width: f64,
}

/// Sliding-window density estimator.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityHistogram {
    centers: Vec<f64>,
    width: f64,
}

impl DensityHistogram {
    /// Creates `centers` evenly spaced centers from `min` to `max` with windows
    /// of `width`.
    ///
    /// # Examples
    ///
    /// ```
    /// use stargrid_stats::histogram::DensityHistogram;
    ///
    /// let histogram = DensityHistogram::new(0.0, 1.0, 25, 0.15).unwrap();
    /// assert_eq!(histogram.centers().len(), 25);
    /// assert!(DensityHistogram::new(0.0, 1.0, 3, 0.1).is_err());
    /// ```
    #[expect(clippy::cast_precision_loss)]
    pub fn new(min: f64, max: f64, centers: usize, width: f64) -> Result<Self, HistogramGapError> {
        let spacing = if centers > 1 {
            (max - min) / (centers - 1) as f64
        } else {
            0.0
        };
        if centers == 0 || width.is_nan() || width <= 0.0 || width < spacing || max < min {
            return Err(HistogramGapError {
                min,
                max,
                centers,
                width,
            });
        }
        let centers = (0..centers).map(|i| min + spacing * i as f64).collect();
        Ok(Self { centers, width })
    }

    #[must_use]
    pub fn centers(&self) -> &[f64] {
        &self.centers
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Density of `values` at each center.
    ///
    /// The window of center `x` is `(x - width/2, x + width/2]`; the density
    /// is the fraction of values inside it divided by `width`. An empty sample
    /// has no density.
    ///
    /// # Examples
    ///
    /// ```
    /// use stargrid_stats::histogram::DensityHistogram;
    ///
    /// let histogram = DensityHistogram::new(0.0, 1.0, 3, 0.5).unwrap();
    /// let density = histogram.density(&[0.1, 0.5, 0.5, 0.9]).unwrap();
    /// assert_eq!(density, vec![0.5, 1.0, 0.5]);
    /// ```
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn density(&self, values: &[f64]) -> Option<Vec<f64>> {
        if values.is_empty() {
            return None;
        }
        let half = self.width / 2.0;
        let norm = values.len() as f64 * self.width;
        let density = self
            .centers
            .iter()
            .map(|&x| {
                let count = values.iter().filter(|&&v| x - half < v && v <= x + half).count();
                count as f64 / norm
            })
            .collect();
        Some(density)
    }
}
