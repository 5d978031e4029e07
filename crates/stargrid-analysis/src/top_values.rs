//! Running record of the highest values a player has discovered.
//!
//! The tracker keeps up to three slots ordered by descending value. A cell can
//! occupy at most one slot, so revisiting a known cell never changes the
//! record. Empty slots read as [`EMPTY_SLOT`].
//!
//! # Example
//!
//! ```
//! use stargrid_analysis::top_values::TopValues;
//!
//! let mut top = TopValues::default();
//! top.visit(4, 40);
//! top.visit(7, 99);
//! top.visit(4, 40);
//! assert_eq!(top.values(), [99.0, 40.0, -1.0]);
//! ```

use arrayvec::ArrayVec;

use crate::record::CellIndex;

/// Number of tracked slots.
pub const TOP_SLOTS: usize = 3;

/// Value reported for a slot no cell has filled yet.
pub const EMPTY_SLOT: f64 = -1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slot {
    cell: CellIndex,
    value: u32,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TopValues {
    slots: ArrayVec<Slot, TOP_SLOTS>,
}

impl TopValues {
    /// Records a visit of `cell` holding `value`.
    pub fn visit(&mut self, cell: CellIndex, value: u32) {
        if self.slots.iter().any(|slot| slot.cell == cell) {
            return;
        }
        let position = self
            .slots
            .iter()
            .position(|slot| value > slot.value)
            .unwrap_or(self.slots.len());
        if position == TOP_SLOTS {
            return;
        }
        if self.slots.is_full() {
            self.slots.pop();
        }
        self.slots.insert(position, Slot { cell, value });
    }

    /// Slot values in descending order, [`EMPTY_SLOT`] for unfilled slots.
    #[must_use]
    pub fn values(&self) -> [f64; TOP_SLOTS] {
        let mut values = [EMPTY_SLOT; TOP_SLOTS];
        for (value, slot) in values.iter_mut().zip(&self.slots) {
            *value = f64::from(slot.value);
        }
        values
    }

    /// Value of the `k`-th best slot (0-based), if filled.
    #[must_use]
    pub fn get(&self, k: usize) -> Option<u32> {
        self.slots.get(k).map(|slot| slot.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_ordered_descending() {
        let mut top = TopValues::default();
        for (cell, value) in [(0, 12), (1, 85), (2, 44), (3, 5), (4, 99)] {
            top.visit(cell, value);
        }
        assert_eq!(top.values(), [99.0, 85.0, 44.0]);
    }

    #[test]
    fn test_revisit_is_ignored() {
        let mut top = TopValues::default();
        top.visit(3, 50);
        top.visit(3, 50);
        top.visit(3, 50);
        assert_eq!(top.values(), [50.0, EMPTY_SLOT, EMPTY_SLOT]);
    }

    #[test]
    fn test_equal_values_in_distinct_cells() {
        let mut top = TopValues::default();
        top.visit(1, 71);
        top.visit(2, 71);
        top.visit(1, 71);
        assert_eq!(top.values(), [71.0, 71.0, EMPTY_SLOT]);
        assert_eq!(top.get(1), Some(71));
        assert_eq!(top.get(2), None);
    }

    #[test]
    fn test_lower_value_does_not_evict() {
        let mut top = TopValues::default();
        for (cell, value) in [(0, 30), (1, 20), (2, 10), (3, 5)] {
            top.visit(cell, value);
        }
        assert_eq!(top.values(), [30.0, 20.0, 10.0]);
        top.visit(4, 25);
        assert_eq!(top.values(), [30.0, 25.0, 20.0]);
    }
}
