//! Candidate enumeration over the cartesian product of value sets.
//!
//! A candidate is one pick from each of N finite value sets. The enumerator
//! keeps a mixed-radix multi-index over the sets (position 0 most
//! significant, the last position varying fastest) and advances it by
//! arbitrary offsets with carry, so both exhaustive traversal and sparse
//! sampled traversal cost one `advance` per emitted candidate.

use crate::error::{Error, Result};
use crate::value::ParamValue;

/// Uniform interface over exhaustive and sampled traversal.
///
/// The driver treats both the same way: ask for the total, then pull
/// candidates until `None`.
pub trait CandidateIterator {
    /// Number of candidates this iterator will emit in total.
    fn total_count(&self) -> u64;

    /// The next candidate tuple, or `None` when the traversal is done.
    fn next_candidate(&mut self) -> Option<Vec<ParamValue>>;
}

/// Mixed-radix enumerator over N value sets.
///
/// Digit `i` indexes into set `i`; its base is the set's size. Construction
/// parks every digit at `size - 1` while the cached tuple holds each set's
/// first element, so the very first `advance(1)` wraps all digits to zero
/// and emits the lexicographically smallest tuple.
#[derive(Debug)]
pub struct ProductEnumerator {
    sets: Vec<Vec<ParamValue>>,
    digits: Vec<usize>,
    state: Vec<ParamValue>,
    total: u64,
}

impl ProductEnumerator {
    /// Builds an enumerator over the given value sets.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when a set is empty or when the product of
    /// set sizes does not fit an addressable 64-bit range.
    pub fn new(sets: Vec<Vec<ParamValue>>) -> Result<Self> {
        let mut total: u64 = if sets.is_empty() { 0 } else { 1 };
        let mut log_total = 0.0f64;
        for set in &sets {
            if set.is_empty() {
                return Err(Error::config("set of values should not be empty"));
            }
            log_total += (set.len() as f64).log2();
            if log_total >= 64.0 {
                return Err(Error::config(
                    "the parameter grid is too large, try to reduce it",
                ));
            }
            total *= set.len() as u64;
        }

        let digits = sets.iter().map(|set| set.len() - 1).collect();
        let state = sets.iter().map(|set| set[0].clone()).collect();
        Ok(Self {
            sets,
            digits,
            state,
            total,
        })
    }

    /// Total number of distinct tuples.
    #[must_use]
    pub fn total_count(&self) -> u64 {
        self.total
    }

    /// Adds `offset` to the multi-index with carry and returns the tuple at
    /// the new position. `advance(0)` re-emits the current tuple.
    ///
    /// Carry moves from the fastest position toward position 0; only
    /// positions whose digit actually changed get their cached value
    /// refreshed.
    pub fn advance(&mut self, offset: u64) -> &[ParamValue] {
        if self.digits.is_empty() {
            return &self.state;
        }
        let mut offset = u128::from(offset);
        for idx in (1..self.digits.len()).rev() {
            let size = self.sets[idx].len() as u128;
            let old = self.digits[idx] as u128;
            let new = ((old + offset) % size) as usize;
            if new != self.digits[idx] {
                self.digits[idx] = new;
                self.state[idx] = self.sets[idx][new].clone();
            }
            if old + offset < size {
                return &self.state;
            }
            offset = (offset - (size - old)) / size + 1;
        }
        // The most significant digit absorbs whatever carry is left.
        let size = self.sets[0].len() as u128;
        let new = ((self.digits[0] as u128 + offset) % size) as usize;
        if new != self.digits[0] {
            self.digits[0] = new;
            self.state[0] = self.sets[0][new].clone();
        }
        &self.state
    }
}

/// Exhaustive traversal: every tuple exactly once, in lexicographic order
/// of the multi-index.
#[derive(Debug)]
pub struct GridIterator {
    enumerator: ProductEnumerator,
    passed: u64,
}

impl GridIterator {
    /// Builds an exhaustive iterator over the given value sets.
    ///
    /// # Errors
    ///
    /// Propagates [`ProductEnumerator::new`] failures.
    pub fn new(sets: Vec<Vec<ParamValue>>) -> Result<Self> {
        Ok(Self {
            enumerator: ProductEnumerator::new(sets)?,
            passed: 0,
        })
    }
}

impl CandidateIterator for GridIterator {
    fn total_count(&self) -> u64 {
        self.enumerator.total_count()
    }

    fn next_candidate(&mut self) -> Option<Vec<ParamValue>> {
        if self.passed >= self.enumerator.total_count() {
            return None;
        }
        self.passed += 1;
        Some(self.enumerator.advance(1).to_vec())
    }
}

/// Sampled traversal: `count` tuples drawn uniformly, emitted in ascending
/// flat-index order.
///
/// Flat indices are 1-based: index `k` denotes the `k`-th tuple of the
/// lexicographic traversal. Sorting the drawn indices and advancing by
/// consecutive deltas visits all samples with at most `count` cheap
/// mixed-radix advances instead of `count` random seeks; a zero delta
/// (possible only when repetition is allowed) re-emits the current tuple.
#[derive(Debug)]
pub struct SampledGridIterator {
    enumerator: ProductEnumerator,
    offsets: Vec<u64>,
    next_offset: usize,
}

impl SampledGridIterator {
    /// Builds a sampled iterator emitting `count` tuples.
    ///
    /// With `allow_repeat` set, the same tuple may be drawn more than once
    /// and `count` may exceed the product size; otherwise `count` is
    /// clamped to the product size and all draws are distinct.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when `count` is zero, and propagates
    /// [`ProductEnumerator::new`] failures.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn new(
        sets: Vec<Vec<ParamValue>>,
        count: u32,
        allow_repeat: bool,
        seed: u64,
    ) -> Result<Self> {
        if count == 0 {
            return Err(Error::config(
                "number of tries should be a positive number",
            ));
        }
        let enumerator = ProductEnumerator::new(sets)?;
        let total = enumerator.total_count();
        if total == 0 {
            return Err(Error::config("cannot sample from an empty parameter grid"));
        }

        let mut count = u64::from(count);
        if count > total && !allow_repeat {
            count = total;
        }

        let mut rng = fastrand::Rng::with_seed(seed);
        let mut indices: Vec<u64>;
        if !allow_repeat && count as f64 / total as f64 > 0.7 {
            // Dense request: shuffling the full index range beats rejection
            // sampling once most of it gets picked anyway.
            indices = (1..=total).collect();
            rng.shuffle(&mut indices);
            indices.truncate(count as usize);
        } else {
            indices = Vec::with_capacity(count as usize);
            let mut visited = std::collections::BTreeSet::new();
            while (indices.len() as u64) < count {
                let mut next = rng.u64(0..total) + 1;
                while visited.contains(&next) {
                    next = rng.u64(0..total) + 1;
                }
                indices.push(next);
                if !allow_repeat {
                    visited.insert(next);
                }
            }
        }
        indices.sort_unstable();

        let mut offsets = Vec::with_capacity(indices.len());
        let mut last = 0u64;
        for index in indices {
            offsets.push(index - last);
            last = index;
        }

        Ok(Self {
            enumerator,
            offsets,
            next_offset: 0,
        })
    }
}

impl CandidateIterator for SampledGridIterator {
    fn total_count(&self) -> u64 {
        self.offsets.len() as u64
    }

    fn next_candidate(&mut self) -> Option<Vec<ParamValue>> {
        let offset = *self.offsets.get(self.next_offset)?;
        self.next_offset += 1;
        Some(self.enumerator.advance(offset).to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_sets(sizes: &[usize]) -> Vec<Vec<ParamValue>> {
        sizes
            .iter()
            .enumerate()
            .map(|(set_idx, &size)| {
                (0..size)
                    .map(|v| ParamValue::Int((set_idx * 100 + v) as i64))
                    .collect()
            })
            .collect()
    }

    fn flat_index(sets: &[Vec<ParamValue>], tuple: &[ParamValue]) -> u64 {
        let mut index = 0u64;
        for (set, value) in sets.iter().zip(tuple) {
            let digit = set.iter().position(|v| v == value).unwrap() as u64;
            index = index * set.len() as u64 + digit;
        }
        index
    }

    #[test]
    fn test_first_advance_emits_smallest_tuple() {
        let mut enumerator = ProductEnumerator::new(int_sets(&[2, 3])).unwrap();
        let first = enumerator.advance(1).to_vec();
        assert_eq!(first, vec![ParamValue::Int(0), ParamValue::Int(100)]);
    }

    #[test]
    fn test_exhaustive_emits_lexicographic_product_once() {
        let sets = int_sets(&[3, 2, 4]);
        let mut iterator = GridIterator::new(sets.clone()).unwrap();
        assert_eq!(iterator.total_count(), 24);

        let mut seen = Vec::new();
        while let Some(tuple) = iterator.next_candidate() {
            seen.push(tuple);
        }
        assert_eq!(seen.len(), 24);

        // Lexicographic order over the multi-index and no repeats.
        let indices: Vec<u64> = seen.iter().map(|t| flat_index(&sets, t)).collect();
        let expected: Vec<u64> = (0..24).collect();
        assert_eq!(indices, expected);
    }

    #[test]
    fn test_advance_offsets_compose() {
        // advance(a) then advance(b) must land where advance(a + b) does.
        let sets = int_sets(&[2, 3, 2]);
        for (a, b) in [(1u64, 1u64), (2, 3), (5, 4), (1, 10), (7, 2)] {
            let mut stepped = ProductEnumerator::new(sets.clone()).unwrap();
            stepped.advance(a);
            let via_steps = stepped.advance(b).to_vec();

            let mut direct = ProductEnumerator::new(sets.clone()).unwrap();
            let via_sum = direct.advance(a + b).to_vec();
            assert_eq!(via_steps, via_sum, "a={a} b={b}");
        }
    }

    #[test]
    fn test_single_set_traversal() {
        let mut iterator = GridIterator::new(int_sets(&[4])).unwrap();
        let mut values = Vec::new();
        while let Some(tuple) = iterator.next_candidate() {
            values.push(tuple[0].clone());
        }
        assert_eq!(
            values,
            (0..4).map(ParamValue::Int).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_empty_set_is_rejected() {
        let mut sets = int_sets(&[2]);
        sets.push(Vec::new());
        assert!(matches!(
            ProductEnumerator::new(sets),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_oversized_grid_is_rejected() {
        // 64 binary axes push the product to 2^64, one past addressable.
        let sets = int_sets(&vec![2; 64]);
        assert!(matches!(
            ProductEnumerator::new(sets),
            Err(Error::Config(_))
        ));
        // 63 axes still fit.
        assert!(ProductEnumerator::new(int_sets(&vec![2; 63])).is_ok());
    }

    #[test]
    fn test_sampled_zero_count_is_rejected() {
        assert!(matches!(
            SampledGridIterator::new(int_sets(&[2, 2]), 0, false, 42),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_sampled_distinct_and_ascending() {
        let sets = int_sets(&[3, 2, 2]);
        let mut iterator = SampledGridIterator::new(sets.clone(), 5, false, 42).unwrap();
        assert_eq!(iterator.total_count(), 5);

        let mut indices = Vec::new();
        while let Some(tuple) = iterator.next_candidate() {
            indices.push(flat_index(&sets, &tuple));
        }
        assert_eq!(indices.len(), 5);
        for pair in indices.windows(2) {
            assert!(pair[0] < pair[1], "indices must strictly ascend: {indices:?}");
        }
    }

    #[test]
    fn test_sampled_clamps_to_total_without_repeats() {
        let sets = int_sets(&[3]);
        let mut iterator = SampledGridIterator::new(sets.clone(), 10, false, 7).unwrap();
        assert_eq!(iterator.total_count(), 3);

        let mut indices = Vec::new();
        while let Some(tuple) = iterator.next_candidate() {
            indices.push(flat_index(&sets, &tuple));
        }
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_sampled_dense_path_covers_all_distinct() {
        // count / total = 9/10 > 0.7 exercises the shuffled-permutation path.
        let sets = int_sets(&[10]);
        let mut iterator = SampledGridIterator::new(sets.clone(), 9, false, 3).unwrap();

        let mut indices = Vec::new();
        while let Some(tuple) = iterator.next_candidate() {
            indices.push(flat_index(&sets, &tuple));
        }
        assert_eq!(indices.len(), 9);
        for pair in indices.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_sampled_with_repeats_is_ascending() {
        let sets = int_sets(&[2]);
        let mut iterator = SampledGridIterator::new(sets.clone(), 6, true, 11).unwrap();
        assert_eq!(iterator.total_count(), 6);

        let mut indices = Vec::new();
        while let Some(tuple) = iterator.next_candidate() {
            indices.push(flat_index(&sets, &tuple));
        }
        assert_eq!(indices.len(), 6);
        for pair in indices.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
    }

    #[test]
    fn test_sampled_is_deterministic_per_seed() {
        let sets = int_sets(&[4, 3, 2]);
        let collect = |seed| {
            let mut iterator = SampledGridIterator::new(sets.clone(), 6, false, seed).unwrap();
            let mut tuples = Vec::new();
            while let Some(tuple) = iterator.next_candidate() {
                tuples.push(tuple);
            }
            tuples
        };
        assert_eq!(collect(42), collect(42));
        assert_ne!(collect(42), collect(43));
    }
}
