use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use zeva_helpers::{Float, ModelError, TrainableModel};

/// A linear regressor trained by full-batch gradient descent on the mean
/// squared error.
///
/// Weights are laid out `(n_inputs, n_outputs)` so a batch of feature rows
/// maps to a batch of output rows with one matrix product.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(serialize = "F: Serialize", deserialize = "F: Deserialize<'de>"))]
pub struct LinearRegressor<F>
where
    F: Float,
{
    weights: Array2<F>,
    bias: Array1<F>,
    learning_rate: F,
}

impl<F> LinearRegressor<F>
where
    F: Float,
{
    /// Creates a regressor with small seeded random weights and zero bias.
    ///
    /// # Arguments
    ///
    /// * `n_inputs`: Number of feature columns.
    /// * `n_outputs`: Number of output columns.
    /// * `learning_rate`: Step size applied to each gradient update.
    /// * `seed`: Seed for the weight-initialization RNG, for reproducible runs.
    pub fn new(n_inputs: usize, n_outputs: usize, learning_rate: F, seed: u64) -> Self {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let init = F::cast(0.01).unwrap_or_else(F::one);
        let weights =
            Array2::from_shape_fn((n_inputs, n_outputs), |_| rng.random_range(-init..init));
        Self {
            weights,
            bias: Array1::zeros(n_outputs),
            learning_rate,
        }
    }

    pub fn n_inputs(&self) -> usize {
        self.weights.nrows()
    }

    pub fn n_outputs(&self) -> usize {
        self.weights.ncols()
    }

    /// Checks that persisted or constructed weight shapes agree.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.bias.len() != self.weights.ncols() {
            return Err(ModelError::DimensionMismatch {
                expected: self.weights.ncols(),
                found: self.bias.len(),
            });
        }
        Ok(())
    }

    fn check_batch(&self, features: &ArrayView2<F>) -> Result<(), ModelError> {
        if features.nrows() == 0 {
            return Err(ModelError::EmptyBatch);
        }
        if features.ncols() != self.weights.nrows() {
            return Err(ModelError::DimensionMismatch {
                expected: self.weights.nrows(),
                found: features.ncols(),
            });
        }
        Ok(())
    }

    fn check_labels(
        &self,
        features: &ArrayView2<F>,
        labels: &ArrayView2<F>,
    ) -> Result<(), ModelError> {
        if labels.nrows() != features.nrows() {
            return Err(ModelError::DimensionMismatch {
                expected: features.nrows(),
                found: labels.nrows(),
            });
        }
        if labels.ncols() != self.bias.len() {
            return Err(ModelError::DimensionMismatch {
                expected: self.bias.len(),
                found: labels.ncols(),
            });
        }
        Ok(())
    }

    fn forward(&self, features: &ArrayView2<F>) -> Array2<F> {
        features.dot(&self.weights) + &self.bias
    }
}

fn mean_squared<F: Float>(residual: &Array2<F>) -> F {
    let count = residual.len();
    if count == 0 {
        return F::zero();
    }
    residual.iter().map(|r| *r * *r).sum::<F>() / F::cast(count).unwrap_or_else(F::one)
}

impl<F> TrainableModel<F> for LinearRegressor<F>
where
    F: Float + Serialize + for<'de> Deserialize<'de>,
{
    fn fit_step(&mut self, features: ArrayView2<F>, labels: ArrayView2<F>) -> Result<F, ModelError> {
        self.check_batch(&features)?;
        self.check_labels(&features, &labels)?;

        let residual = self.forward(&features) - &labels;
        let loss = mean_squared(&residual);

        // d(mse)/d(pred) = 2 * residual / count
        let scale = F::cast(2.0).unwrap_or_else(F::one)
            / F::cast(residual.len()).unwrap_or_else(F::one);
        let grad_weights = features.t().dot(&residual) * scale;
        let grad_bias = residual.sum_axis(Axis(0)) * scale;

        self.weights -= &(grad_weights * self.learning_rate);
        self.bias -= &(grad_bias * self.learning_rate);

        Ok(loss)
    }

    fn evaluate(&self, features: ArrayView2<F>, labels: ArrayView2<F>) -> Result<F, ModelError> {
        self.check_batch(&features)?;
        self.check_labels(&features, &labels)?;
        let residual = self.forward(&features) - &labels;
        Ok(mean_squared(&residual))
    }

    fn predict(&self, features: ArrayView2<F>) -> Result<Array2<F>, ModelError> {
        self.check_batch(&features)?;
        Ok(self.forward(&features))
    }

    fn save(&self, path: &Path) -> Result<(), ModelError> {
        let file = File::create(path)?;
        serde_json::to_writer(BufWriter::new(file), self)
            .map_err(|e| ModelError::Persistence(e.to_string()))
    }

    fn load(path: &Path) -> Result<Self, ModelError> {
        let file = File::open(path)?;
        let model: Self = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| ModelError::Persistence(e.to_string()))?;
        model.validate()?;
        Ok(model)
    }
}
