//! Statistical tools for the Stargrid analysis workspace.
//!
//! This crate provides the domain-independent building blocks used by
//! `stargrid-analysis`:
//!
//! - **Descriptive statistics**: mean and median, with NaN-aware helpers
//! - **Percentiles**: linearly interpolated percentiles of sorted data
//! - **Histograms**: sliding-window density estimates
//! - **Bootstrap**: resampling engine for point estimates, ±1σ-equivalent
//!   intervals and one-sided p-values
//! - **Regression**: closed-form least-squares fits (straight line, bounded
//!   single parameter) and bounded nonlinear fits
//! - **Clustering**: Ward-linkage agglomerative clustering of scalar values
//!
//! # Modules
//!
//! - [`descriptive`]: Descriptive statistics for summarizing datasets
//! - [`percentiles`]: Percentiles of sorted data
//! - [`histogram`]: Density estimates on evenly spaced centers
//! - [`bootstrap`]: Bootstrap resampling with deterministic seeding
//! - [`regression`]: Least-squares fitting
//! - [`clustering`]: Hierarchical clustering of one-dimensional data
//!
//! # Examples
//!
//! ## Computing descriptive statistics
//!
//! ```
//! use stargrid_stats::descriptive;
//!
//! let values = [1.0, 2.0, 3.0, 4.0, 10.0];
//! assert_eq!(descriptive::mean(values).unwrap(), 4.0);
//! assert_eq!(descriptive::median(values).unwrap(), 3.0);
//! ```
//!
//! ## Bootstrapping a confidence interval
//!
//! ```
//! use stargrid_stats::bootstrap::{Bootstrap, BootstrapSeed, CentralEstimator};
//!
//! let sample = [1.0, 2.0, 3.0, 4.0, 5.0];
//! let bootstrap = Bootstrap::new(2000, BootstrapSeed::from_u128(42)).unwrap();
//! let estimate = bootstrap
//!     .estimate(&sample, CentralEstimator::Mean, |draw| draw.mean())
//!     .unwrap();
//! assert!((estimate.center - 3.0).abs() < 0.1);
//! ```
//!
//! ## Clustering slopes
//!
//! ```
//! use stargrid_stats::clustering::WardClustering;
//!
//! let slopes = [-1.2, -1.0, 0.1, 0.0, 1.1, 0.9];
//! let clustering = WardClustering::new(3).fit(&slopes).unwrap();
//! assert_eq!(clustering.clusters[1].min, 0.0);
//! ```

pub mod bootstrap;
pub mod clustering;
pub mod descriptive;
pub mod histogram;
pub mod percentiles;
pub mod regression;
