//! Range partitioner
//!
//! Tiles a contiguous window of offsets into batches of exactly `degree`
//! identifiers. The tail that does not fill a whole batch is handled by an
//! explicit [`RemainderPolicy`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// What happens to the identifiers left over after the last full batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemainderPolicy {
    /// Query the tail as one final, shorter batch
    #[default]
    Keep,
    /// Skip the tail
    Drop,
}

/// Contiguous half-open share of the window handled by one worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchRange {
    pub start: u64,
    pub end: u64,
}

impl BatchRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn offsets(&self) -> Range<u64> {
        self.start..self.end
    }
}

impl fmt::Display for BatchRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Batches produced for one window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub batches: Vec<BatchRange>,
    /// Identifiers skipped under [`RemainderPolicy::Drop`]
    pub dropped: u64,
}

impl Partition {
    /// Number of identifiers that will actually be queried
    pub fn covered(&self) -> u64 {
        self.batches.iter().map(BatchRange::len).sum()
    }
}

/// Split `total` offsets starting at `start` into batches of `degree`
///
/// ```
/// use casepoll::parallel::partition::{partition, BatchRange, RemainderPolicy};
///
/// let plan = partition(100, 10, 4, RemainderPolicy::Drop);
/// assert_eq!(plan.batches, vec![BatchRange::new(100, 104), BatchRange::new(104, 108)]);
/// assert_eq!(plan.dropped, 2);
/// ```
pub fn partition(start: u64, total: u64, degree: usize, policy: RemainderPolicy) -> Partition {
    let degree = degree.max(1) as u64;
    let full_batches = total / degree;
    let remainder = total % degree;

    let mut batches: Vec<BatchRange> = (0..full_batches)
        .map(|i| {
            let s = start + i * degree;
            BatchRange::new(s, s + degree)
        })
        .collect();

    let mut dropped = 0;
    if remainder > 0 {
        match policy {
            RemainderPolicy::Keep => {
                let s = start + full_batches * degree;
                batches.push(BatchRange::new(s, s + remainder));
            }
            RemainderPolicy::Drop => {
                tracing::warn!(
                    "Dropping {} trailing identifiers that do not fill a batch of {}",
                    remainder,
                    degree
                );
                dropped = remainder;
            }
        }
    }

    Partition { batches, dropped }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_tiling() {
        let plan = partition(1000, 40, 8, RemainderPolicy::Drop);
        assert_eq!(plan.batches.len(), 5);
        assert_eq!(plan.dropped, 0);
        assert!(plan.batches.iter().all(|b| b.len() == 8));
        assert_eq!(plan.batches[0], BatchRange::new(1000, 1008));
        assert_eq!(plan.batches[4], BatchRange::new(1032, 1040));

        // Batches are contiguous
        for pair in plan.batches.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[test]
    fn test_remainder_dropped() {
        let plan = partition(0, 43, 8, RemainderPolicy::Drop);
        assert_eq!(plan.batches.len(), 5);
        assert_eq!(plan.dropped, 3);
        assert_eq!(plan.covered(), 40);
    }

    #[test]
    fn test_remainder_kept() {
        let plan = partition(0, 43, 8, RemainderPolicy::Keep);
        assert_eq!(plan.batches.len(), 6);
        assert_eq!(plan.batches[5], BatchRange::new(40, 43));
        assert_eq!(plan.dropped, 0);
        assert_eq!(plan.covered(), 43);
    }

    #[test]
    fn test_total_smaller_than_degree() {
        let dropped = partition(10, 5, 8, RemainderPolicy::Drop);
        assert!(dropped.batches.is_empty());
        assert_eq!(dropped.dropped, 5);

        let kept = partition(10, 5, 8, RemainderPolicy::Keep);
        assert_eq!(kept.batches, vec![BatchRange::new(10, 15)]);
    }

    #[test]
    fn test_zero_degree_is_clamped() {
        let plan = partition(0, 3, 0, RemainderPolicy::Drop);
        assert_eq!(plan.batches.len(), 3);
        assert!(plan.batches.iter().all(|b| b.len() == 1));
    }

    #[test]
    fn test_batch_range_offsets() {
        let batch = BatchRange::new(5, 8);
        assert_eq!(batch.offsets().collect::<Vec<_>>(), vec![5, 6, 7]);
        assert_eq!(batch.to_string(), "5..8");
        assert!(!batch.is_empty());
        assert!(BatchRange::new(4, 4).is_empty());
    }
}
