//! Seeded shuffle splits.

use crate::error::{TrainingError, TrainingResult};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// One train/held-out partition, as row indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Independent random permutations drawn from a single seeded generator, so
/// the same `(n_rows, test_size, seed)` always yields the same splits.
pub struct ShuffleSplit {
    rng: StdRng,
    n_rows: usize,
    n_test: usize,
    remaining: usize,
}

impl ShuffleSplit {
    /// `test_size` must lie in `(0, 1)`. The held-out partition holds
    /// `ceil(test_size * n_rows)` rows and both partitions must be non-empty.
    pub fn new(n_rows: usize, test_size: f64, n_splits: usize, seed: u64) -> TrainingResult<Self> {
        if !(test_size > 0.0 && test_size < 1.0) {
            return Err(TrainingError::invalid(
                "test_size",
                format!("split fraction must be in (0, 1), got {test_size}"),
            ));
        }
        let n_test = held_out_rows(n_rows, test_size);
        if n_test == 0 || n_test >= n_rows {
            return Err(TrainingError::invalid(
                "test_size",
                format!(
                    "test_size {test_size} on {n_rows} rows leaves {n_test} held-out and {} training rows",
                    n_rows.saturating_sub(n_test)
                ),
            ));
        }
        Ok(Self { rng: StdRng::seed_from_u64(seed), n_rows, n_test, remaining: n_splits })
    }

    #[must_use]
    pub fn n_test(&self) -> usize {
        self.n_test
    }
}

impl Iterator for ShuffleSplit {
    type Item = Split;

    fn next(&mut self) -> Option<Split> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let mut order: Vec<usize> = (0..self.n_rows).collect();
        order.shuffle(&mut self.rng);
        let train = order.split_off(self.n_test);
        Some(Split { train, test: order })
    }
}

/// `ceil(test_size * n_rows)`, tolerant of float noise such as `0.2 * 100`.
fn held_out_rows(n_rows: usize, test_size: f64) -> usize {
    let exact = test_size * n_rows as f64;
    let rounded = exact.round();
    if (exact - rounded).abs() < 1e-9 {
        rounded as usize
    } else {
        exact.ceil() as usize
    }
}
