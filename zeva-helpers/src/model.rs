use crate::Float;
use ndarray::{Array2, ArrayView2};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// Errors shared by every trainer backend.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// A fit/evaluate/predict call received a batch with zero rows.
    EmptyBatch,
    /// An input table or a persisted artifact disagrees with the model shape.
    DimensionMismatch { expected: usize, found: usize },
    /// Reading or writing a model artifact failed.
    Persistence(String),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::EmptyBatch => write!(f, "cannot operate on an empty batch"),
            ModelError::DimensionMismatch { expected, found } => {
                write!(f, "dimension mismatch: expected {}, found {}", expected, found)
            }
            ModelError::Persistence(reason) => write!(f, "model persistence failed: {}", reason),
        }
    }
}

impl Error for ModelError {}

impl From<std::io::Error> for ModelError {
    fn from(err: std::io::Error) -> Self {
        ModelError::Persistence(err.to_string())
    }
}

/// The single interface every trainer backend implements.
///
/// The training loop drives `fit_step`/`evaluate`, the evaluator consumes
/// `predict`, and trained weights round-trip through `save`/`load` so a later
/// invocation can score events without retraining. Object safe, so callers
/// can hold a `Box<dyn TrainableModel<F>>` selected at runtime; `load` is
/// `Sized`-gated and is called on the concrete backend type.
pub trait TrainableModel<F>
where
    F: Float,
{
    /// One full-batch optimization step; returns the training loss.
    fn fit_step(&mut self, features: ArrayView2<F>, labels: ArrayView2<F>) -> Result<F, ModelError>;

    /// Loss of the current weights against the given tables, without updating.
    fn evaluate(&self, features: ArrayView2<F>, labels: ArrayView2<F>) -> Result<F, ModelError>;

    /// Model outputs for a batch of feature rows, one output row per input row.
    fn predict(&self, features: ArrayView2<F>) -> Result<Array2<F>, ModelError>;

    /// Persists the trained weights to `path`.
    fn save(&self, path: &Path) -> Result<(), ModelError>;

    /// Restores a model persisted by `save`.
    fn load(path: &Path) -> Result<Self, ModelError>
    where
        Self: Sized;
}
