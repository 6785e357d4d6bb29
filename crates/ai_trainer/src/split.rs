//! Seeded train/validation partitioning

use crate::errors::{Result, TrainerError};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Row indices of both partitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
}

/// Shuffle `0..rows` with `seed` and slice off `ceil(test_size * rows)`
/// validation rows. The rest is the training partition.
pub fn train_validation_split(rows: usize, test_size: f64, seed: u64) -> Result<Split> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(TrainerError::InvalidSplit(format!(
            "test_size={test_size} should be a float in the (0, 1) range"
        )));
    }

    let validation_rows = (test_size * rows as f64).ceil() as usize;
    let train_rows = rows.saturating_sub(validation_rows);
    if validation_rows == 0 || train_rows == 0 {
        return Err(TrainerError::InvalidSplit(format!(
            "With n_samples={rows}, test_size={test_size} the resulting train set \
             or validation set would be empty"
        )));
    }

    let mut order: Vec<usize> = (0..rows).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let train = order.split_off(validation_rows);
    Ok(Split {
        train,
        validation: order,
    })
}
