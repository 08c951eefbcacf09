use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_xoshiro::Xoshiro256PlusPlus;
use std::error::Error;
use std::fmt::{Display, Formatter};
use zeva_helpers::{Dataset, Float};

/// Seed used for the split when the caller does not supply one, so repeated
/// runs on identical input land every row in the same subset.
pub const DEFAULT_SPLIT_SEED: u64 = 42;

/// Errors that can occur when partitioning a dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum SplitError {
    /// The dataset has zero rows; there is nothing to train on.
    EmptyDataset,
    /// The holdout fraction is outside the open interval (0, 1).
    InvalidFraction(f64),
}

impl Display for SplitError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SplitError::EmptyDataset => write!(f, "dataset has no rows to split"),
            SplitError::InvalidFraction(p) => {
                write!(f, "holdout fraction {} is outside (0, 1)", p)
            }
        }
    }
}

impl Error for SplitError {}

/// Partitions a dataset into disjoint training and holdout subsets.
///
/// The holdout gets `round(holdout_fraction * len)` rows, the training set
/// the rest; together they cover every row exactly once. Membership follows
/// a seeded index shuffle, so a fixed seed reproduces the exact partition.
///
/// # Errors
///
/// Fails with `SplitError::EmptyDataset` on a dataset with no rows, and with
/// `SplitError::InvalidFraction` when the fraction is not strictly between
/// 0 and 1.
pub fn train_test_split<F>(
    dataset: &Dataset<F>,
    holdout_fraction: f64,
    seed: u64,
) -> Result<(Dataset<F>, Dataset<F>), SplitError>
where
    F: Float,
{
    let total = dataset.len();
    if total == 0 {
        return Err(SplitError::EmptyDataset);
    }
    if !(holdout_fraction > 0.0 && holdout_fraction < 1.0) {
        return Err(SplitError::InvalidFraction(holdout_fraction));
    }

    let mut indices: Vec<usize> = (0..total).collect();
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let holdout_len = ((total as f64) * holdout_fraction).round() as usize;
    let holdout_len = holdout_len.min(total);
    let (holdout_indices, training_indices) = indices.split_at(holdout_len);

    Ok((
        dataset.select_rows(training_indices),
        dataset.select_rows(holdout_indices),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    /// Dataset whose feature value encodes the row index, so membership can
    /// be checked by identity.
    fn indexed_dataset(rows: usize) -> Dataset<f64> {
        let features = Array2::from_shape_fn((rows, 1), |(r, _)| r as f64);
        let labels = Array2::from_shape_fn((rows, 1), |(r, _)| 1000.0 + r as f64);
        Dataset::new(features, labels).unwrap()
    }

    fn row_ids(dataset: &Dataset<f64>) -> Vec<usize> {
        (0..dataset.len())
            .map(|r| dataset.features()[[r, 0]] as usize)
            .collect()
    }

    #[test]
    fn split_sizes_follow_the_fraction() {
        let dataset = indexed_dataset(10);
        let (training, holdout) = train_test_split(&dataset, 0.3, DEFAULT_SPLIT_SEED).unwrap();
        assert_eq!(holdout.len(), 3);
        assert_eq!(training.len(), 7);
    }

    #[test]
    fn split_is_disjoint_and_covers_every_row() {
        let dataset = indexed_dataset(23);
        let (training, holdout) = train_test_split(&dataset, 0.4, DEFAULT_SPLIT_SEED).unwrap();
        assert_eq!(training.len() + holdout.len(), 23);

        let mut seen = row_ids(&training);
        seen.extend(row_ids(&holdout));
        seen.sort_unstable();
        let expected: Vec<usize> = (0..23).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn same_seed_reproduces_the_partition() {
        let dataset = indexed_dataset(50);
        let (train_a, holdout_a) = train_test_split(&dataset, 0.3, 7).unwrap();
        let (train_b, holdout_b) = train_test_split(&dataset, 0.3, 7).unwrap();
        assert_eq!(row_ids(&train_a), row_ids(&train_b));
        assert_eq!(row_ids(&holdout_a), row_ids(&holdout_b));
    }

    #[test]
    fn different_seeds_move_rows() {
        let dataset = indexed_dataset(50);
        let (_, holdout_a) = train_test_split(&dataset, 0.3, 7).unwrap();
        let (_, holdout_b) = train_test_split(&dataset, 0.3, 8).unwrap();
        assert_ne!(row_ids(&holdout_a), row_ids(&holdout_b));
    }

    #[test]
    fn rejects_empty_dataset() {
        let dataset = Dataset::<f64>::empty(3, 1);
        let result = train_test_split(&dataset, 0.3, DEFAULT_SPLIT_SEED);
        assert_eq!(result.err(), Some(SplitError::EmptyDataset));
    }

    #[test]
    fn rejects_out_of_range_fractions() {
        let dataset = indexed_dataset(4);
        for fraction in [0.0, 1.0, -0.2, 1.5] {
            let result = train_test_split(&dataset, fraction, DEFAULT_SPLIT_SEED);
            assert_eq!(result.err(), Some(SplitError::InvalidFraction(fraction)));
        }
    }
}
