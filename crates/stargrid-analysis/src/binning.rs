//! Grouping of cell values into bins.
//!
//! Maps contain only a few dozen distinct values, many of which occur in a
//! handful of cells. Star statistics are therefore pooled over groups of
//! neighboring values; each group is represented by the count-weighted mean
//! of its values over the maps played.

use std::collections::BTreeMap;

/// Value groups of the reference binning.
pub const REFERENCE_GROUPS: &[&[u32]] = &[
    &[0, 1, 2, 3],
    &[4, 5, 6, 7, 8, 9],
    &[11, 12, 13, 14],
    &[19, 20, 21, 22, 24],
    &[27, 28],
    &[43, 44, 45, 46],
    &[51, 53],
    &[71, 72],
    &[84, 85, 86],
    &[99],
];

/// Representatives of [`REFERENCE_GROUPS`] over the maps of the experiment.
const REFERENCE_REPRESENTATIVES: &[f64] = &[
    1.591_836_734_693_877_5,
    5.909_090_909_090_909,
    12.75,
    21.083_333_333_333_332,
    27.25,
    44.25,
    52.5,
    71.5,
    85.25,
    99.0,
];

/// Mapping from cell values to bins ordered by representative value.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueBinning {
    representatives: Vec<f64>,
    bin_of_value: BTreeMap<u32, usize>,
}

impl ValueBinning {
    /// The binning used for the published analysis.
    #[must_use]
    pub fn reference() -> Self {
        Self::from_parts(REFERENCE_GROUPS, REFERENCE_REPRESENTATIVES.to_vec())
    }

    /// Bins `groups` with representatives weighted by how often each value
    /// appears in `map_values`.
    ///
    /// Groups none of whose values appear are represented by their plain mean.
    ///
    /// # Examples
    ///
    /// ```
    /// use stargrid_analysis::binning::ValueBinning;
    ///
    /// let binning = ValueBinning::weighted(&[&[0, 2], &[99]], &[0, 0, 0, 2, 99]);
    /// assert_eq!(binning.representative(2), Some(0.5));
    /// assert_eq!(binning.representative(99), Some(99.0));
    /// assert_eq!(binning.representative(50), None);
    /// ```
    #[must_use]
    pub fn weighted(groups: &[&[u32]], map_values: &[u32]) -> Self {
        let mut counts = BTreeMap::<u32, u32>::new();
        for &value in map_values {
            *counts.entry(value).or_default() += 1;
        }
        let representatives = groups
            .iter()
            .map(|group| {
                let weight = |v: &u32| f64::from(counts.get(v).copied().unwrap_or(0));
                let total = group.iter().map(weight).sum::<f64>();
                if total > 0.0 {
                    group.iter().map(|v| f64::from(*v) * weight(v)).sum::<f64>() / total
                } else {
                    stargrid_stats::descriptive::mean(group.iter().map(|&v| f64::from(v)))
                        .unwrap_or(f64::NAN)
                }
            })
            .collect();
        Self::from_parts(groups, representatives)
    }

    fn from_parts(groups: &[&[u32]], representatives: Vec<f64>) -> Self {
        let mut order = (0..groups.len()).collect::<Vec<_>>();
        order.sort_by(|&a, &b| representatives[a].total_cmp(&representatives[b]));
        let mut bin_of_value = BTreeMap::new();
        for (bin, &group) in order.iter().enumerate() {
            for &value in groups[group] {
                bin_of_value.insert(value, bin);
            }
        }
        Self {
            representatives: order.iter().map(|&g| representatives[g]).collect(),
            bin_of_value,
        }
    }

    /// Representative value of each bin, ascending.
    #[must_use]
    pub fn representatives(&self) -> &[f64] {
        &self.representatives
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.representatives.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.representatives.is_empty()
    }

    /// Bin index of `value`, if it belongs to a bin.
    #[must_use]
    pub fn bin(&self, value: u32) -> Option<usize> {
        self.bin_of_value.get(&value).copied()
    }

    #[must_use]
    pub fn representative(&self, value: u32) -> Option<f64> {
        self.bin(value).map(|bin| self.representatives[bin])
    }

    /// Pools star ratings per bin; values outside every bin are dropped.
    pub fn pool_stars<'a, I>(&self, stars_by_value: I) -> Vec<Vec<u32>>
    where
        I: IntoIterator<Item = (&'a u32, &'a Vec<u32>)>,
    {
        let mut pooled = vec![vec![]; self.len()];
        for (&value, stars) in stars_by_value {
            if let Some(bin) = self.bin(value) {
                pooled[bin].extend_from_slice(stars);
            }
        }
        pooled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_binning() {
        let binning = ValueBinning::reference();
        assert_eq!(binning.len(), 10);
        assert_eq!(binning.representative(45), Some(44.25));
        assert_eq!(binning.representative(10), None);
        assert!(binning.representatives().is_sorted());
        assert_eq!(binning.bin(0), Some(0));
        assert_eq!(binning.bin(99), Some(9));
    }

    #[test]
    fn test_weighted_groups_sorted_by_representative() {
        let binning = ValueBinning::weighted(&[&[99], &[10, 20]], &[10, 20, 20, 20, 99]);
        assert_eq!(binning.representatives(), &[17.5, 99.0]);
        assert_eq!(binning.bin(99), Some(1));
        assert_eq!(binning.bin(10), Some(0));
    }

    #[test]
    fn test_pool_stars() {
        let binning = ValueBinning::reference();
        let stars_by_value = BTreeMap::from([(0, vec![5, 4]), (3, vec![3]), (10, vec![1]), (99, vec![0])]);
        let pooled = binning.pool_stars(&stars_by_value);
        assert_eq!(pooled[0], vec![5, 4, 3]);
        assert_eq!(pooled[9], vec![0]);
        assert_eq!(pooled.iter().map(Vec::len).sum::<usize>(), 4);
    }
}
