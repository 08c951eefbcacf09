use crate::Float;
use ndarray::{Array2, ArrayView2, Axis};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors that can occur when assembling a dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum DatasetError {
    /// Feature and label tables carry a different number of rows.
    RowCountMismatch { features: usize, labels: usize },
}

impl Display for DatasetError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetError::RowCountMismatch { features, labels } => write!(
                f,
                "feature table has {} rows but label table has {}",
                features, labels
            ),
        }
    }
}

impl Error for DatasetError {}

/// An owned pair of parallel tables: one feature row and one label row per event.
///
/// The two tables always carry the same number of rows; splitting produces new
/// `Dataset`s that exclusively own their selected rows.
#[derive(Debug, Clone)]
pub struct Dataset<F>
where
    F: Float,
{
    features: Array2<F>,
    labels: Array2<F>,
}

impl<F> Dataset<F>
where
    F: Float,
{
    /// Builds a dataset from a feature table and a label table.
    ///
    /// # Errors
    ///
    /// Returns `DatasetError::RowCountMismatch` if the tables disagree on the
    /// number of rows.
    pub fn new(features: Array2<F>, labels: Array2<F>) -> Result<Self, DatasetError> {
        if features.nrows() != labels.nrows() {
            return Err(DatasetError::RowCountMismatch {
                features: features.nrows(),
                labels: labels.nrows(),
            });
        }
        Ok(Self { features, labels })
    }

    /// A dataset with zero rows and the given column counts.
    pub fn empty(n_features: usize, n_outputs: usize) -> Self {
        Self {
            features: Array2::zeros((0, n_features)),
            labels: Array2::zeros((0, n_outputs)),
        }
    }

    /// Number of rows (events).
    pub fn len(&self) -> usize {
        self.features.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    pub fn n_outputs(&self) -> usize {
        self.labels.ncols()
    }

    pub fn features(&self) -> ArrayView2<'_, F> {
        self.features.view()
    }

    pub fn labels(&self) -> ArrayView2<'_, F> {
        self.labels.view()
    }

    /// A new dataset owning copies of the given rows, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            features: self.features.select(Axis(0), indices),
            labels: self.labels.select(Axis(0), indices),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn new_rejects_mismatched_row_counts() {
        let features = array![[1.0, 2.0], [3.0, 4.0]];
        let labels = array![[1.0]];
        let result = Dataset::new(features, labels);
        assert!(matches!(
            result,
            Err(DatasetError::RowCountMismatch {
                features: 2,
                labels: 1
            })
        ));
    }

    #[test]
    fn select_rows_picks_by_identity() {
        let features = array![[0.0], [1.0], [2.0], [3.0]];
        let labels = array![[10.0], [11.0], [12.0], [13.0]];
        let dataset = Dataset::new(features, labels).unwrap();

        let picked = dataset.select_rows(&[3, 1]);
        assert_eq!(picked.len(), 2);
        assert_eq!(picked.features()[[0, 0]], 3.0);
        assert_eq!(picked.features()[[1, 0]], 1.0);
        assert_eq!(picked.labels()[[0, 0]], 13.0);
        assert_eq!(picked.labels()[[1, 0]], 11.0);
    }

    #[test]
    fn empty_dataset_reports_shapes() {
        let dataset = Dataset::<f64>::empty(5, 1);
        assert!(dataset.is_empty());
        assert_eq!(dataset.n_features(), 5);
        assert_eq!(dataset.n_outputs(), 1);
    }
}
