//! Contiguous blocks of control qubits.

use std::fmt;
use std::ops::RangeInclusive;

use crate::error::{NcuError, NcuResult};

/// An inclusive, contiguous range `[start, end]` of control qubit indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControlRange {
    start: usize,
    end: usize,
}

impl ControlRange {
    /// Create the range `[start, end]`.
    ///
    /// # Panics
    ///
    /// Panics if `start > end`.
    pub fn new(start: usize, end: usize) -> Self {
        assert!(
            start <= end,
            "control range start {start} is past its end {end}"
        );
        Self { start, end }
    }

    /// A range holding a single control qubit.
    pub fn single(qubit: usize) -> Self {
        Self::new(qubit, qubit)
    }

    /// Build a range from arbitrary indices, which must form one block.
    ///
    /// Order and duplicates do not matter; gaps do.
    pub fn from_indices(indices: &[usize]) -> NcuResult<Self> {
        let mut sorted = indices.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let (Some(&start), Some(&end)) = (sorted.first(), sorted.last()) else {
            return Err(NcuError::EmptyControls);
        };

        let gap = sorted
            .windows(2)
            .find(|pair| pair[1] != pair[0] + 1)
            .map(|pair| pair[0]);
        if let Some(gap_after) = gap {
            return Err(NcuError::NonContiguousControls {
                indices: sorted,
                gap_after,
            });
        }

        Ok(Self { start, end })
    }

    /// First control qubit.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Last control qubit.
    pub fn end(&self) -> usize {
        self.end
    }

    /// Number of control qubits.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// Whether `qubit` lies inside the range.
    pub fn contains(&self, qubit: usize) -> bool {
        (self.start..=self.end).contains(&qubit)
    }

    /// The range with its last qubit removed, or `None` for a single qubit.
    pub fn without_last(&self) -> Option<Self> {
        (self.end > self.start).then(|| Self::new(self.start, self.end - 1))
    }

    /// Iterate over the control qubits in ascending order.
    pub fn iter(&self) -> RangeInclusive<usize> {
        self.start..=self.end
    }
}

impl From<ControlRange> for RangeInclusive<usize> {
    fn from(range: ControlRange) -> Self {
        range.iter()
    }
}

impl fmt::Display for ControlRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q[{}..={}]", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_len_and_contains() {
        let range = ControlRange::new(2, 5);
        assert_eq!(range.len(), 4);
        assert!(range.contains(2));
        assert!(range.contains(5));
        assert!(!range.contains(6));
        assert_eq!(range.iter().collect::<Vec<_>>(), vec![2, 3, 4, 5]);
    }

    #[test]
    fn test_without_last() {
        assert_eq!(ControlRange::new(0, 3).without_last(), Some(ControlRange::new(0, 2)));
        assert_eq!(ControlRange::single(4).without_last(), None);
    }

    #[test]
    #[should_panic(expected = "is past its end")]
    fn test_inverted_range_panics() {
        let _ = ControlRange::new(3, 1);
    }

    #[test]
    fn test_from_indices_accepts_unordered_block() {
        let range = ControlRange::from_indices(&[4, 2, 3, 3]).unwrap();
        assert_eq!(range, ControlRange::new(2, 4));
    }

    #[test]
    fn test_from_indices_rejects_gaps() {
        let err = ControlRange::from_indices(&[0, 1, 3]).unwrap_err();
        match err {
            NcuError::NonContiguousControls { indices, gap_after } => {
                assert_eq!(indices, vec![0, 1, 3]);
                assert_eq!(gap_after, 1);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_from_indices_rejects_empty() {
        assert!(matches!(
            ControlRange::from_indices(&[]),
            Err(NcuError::EmptyControls)
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(ControlRange::new(0, 3).to_string(), "q[0..=3]");
    }
}
