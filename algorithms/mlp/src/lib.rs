use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use zeva_helpers::{Float, ModelError, TrainableModel};

/// Hidden-layer width used when the caller has no reason to pick another one.
pub const DEFAULT_HIDDEN_UNITS: usize = 20;

/// A single-hidden-layer network regressor with a tanh hidden activation and
/// a linear output layer, trained by full-batch gradient descent on the mean
/// squared error.
///
/// Layer weights are laid out `(n_inputs, n_hidden)` and
/// `(n_hidden, n_outputs)` so a batch of feature rows flows through two
/// matrix products.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(serialize = "F: Serialize", deserialize = "F: Deserialize<'de>"))]
pub struct MlpRegressor<F>
where
    F: Float,
{
    hidden_weights: Array2<F>,
    hidden_bias: Array1<F>,
    output_weights: Array2<F>,
    output_bias: Array1<F>,
    learning_rate: F,
}

impl<F> MlpRegressor<F>
where
    F: Float,
{
    /// Creates a network with small seeded random weights and zero biases.
    ///
    /// # Arguments
    ///
    /// * `n_inputs`: Number of feature columns.
    /// * `n_hidden`: Hidden-layer width (see [`DEFAULT_HIDDEN_UNITS`]).
    /// * `n_outputs`: Number of output columns.
    /// * `learning_rate`: Step size applied to each gradient update.
    /// * `seed`: Seed for the weight-initialization RNG, for reproducible runs.
    pub fn new(
        n_inputs: usize,
        n_hidden: usize,
        n_outputs: usize,
        learning_rate: F,
        seed: u64,
    ) -> Self {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let init = F::cast(0.1).unwrap_or_else(F::one);
        let hidden_weights =
            Array2::from_shape_fn((n_inputs, n_hidden), |_| rng.random_range(-init..init));
        let output_weights =
            Array2::from_shape_fn((n_hidden, n_outputs), |_| rng.random_range(-init..init));
        Self {
            hidden_weights,
            hidden_bias: Array1::zeros(n_hidden),
            output_weights,
            output_bias: Array1::zeros(n_outputs),
            learning_rate,
        }
    }

    pub fn n_inputs(&self) -> usize {
        self.hidden_weights.nrows()
    }

    pub fn n_hidden(&self) -> usize {
        self.hidden_weights.ncols()
    }

    pub fn n_outputs(&self) -> usize {
        self.output_weights.ncols()
    }

    /// Checks that persisted or constructed layer shapes agree.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.hidden_bias.len() != self.hidden_weights.ncols() {
            return Err(ModelError::DimensionMismatch {
                expected: self.hidden_weights.ncols(),
                found: self.hidden_bias.len(),
            });
        }
        if self.output_weights.nrows() != self.hidden_weights.ncols() {
            return Err(ModelError::DimensionMismatch {
                expected: self.hidden_weights.ncols(),
                found: self.output_weights.nrows(),
            });
        }
        if self.output_bias.len() != self.output_weights.ncols() {
            return Err(ModelError::DimensionMismatch {
                expected: self.output_weights.ncols(),
                found: self.output_bias.len(),
            });
        }
        Ok(())
    }

    fn check_batch(&self, features: &ArrayView2<F>) -> Result<(), ModelError> {
        if features.nrows() == 0 {
            return Err(ModelError::EmptyBatch);
        }
        if features.ncols() != self.hidden_weights.nrows() {
            return Err(ModelError::DimensionMismatch {
                expected: self.hidden_weights.nrows(),
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
        if labels.ncols() != self.output_bias.len() {
            return Err(ModelError::DimensionMismatch {
                expected: self.output_bias.len(),
                found: labels.ncols(),
            });
        }
        Ok(())
    }

    fn hidden_activation(&self, features: &ArrayView2<F>) -> Array2<F> {
        (features.dot(&self.hidden_weights) + &self.hidden_bias).mapv(F::tanh)
    }

    fn forward(&self, features: &ArrayView2<F>) -> Array2<F> {
        self.hidden_activation(features).dot(&self.output_weights) + &self.output_bias
    }
}

fn mean_squared<F: Float>(residual: &Array2<F>) -> F {
    let count = residual.len();
    if count == 0 {
        return F::zero();
    }
    residual.iter().map(|r| *r * *r).sum::<F>() / F::cast(count).unwrap_or_else(F::one)
}

impl<F> TrainableModel<F> for MlpRegressor<F>
where
    F: Float + Serialize + for<'de> Deserialize<'de>,
{
    fn fit_step(&mut self, features: ArrayView2<F>, labels: ArrayView2<F>) -> Result<F, ModelError> {
        self.check_batch(&features)?;
        self.check_labels(&features, &labels)?;

        let hidden = self.hidden_activation(&features);
        let predicted = hidden.dot(&self.output_weights) + &self.output_bias;
        let residual = predicted - &labels;
        let loss = mean_squared(&residual);

        // d(mse)/d(pred) = 2 * residual / count
        let scale = F::cast(2.0).unwrap_or_else(F::one)
            / F::cast(residual.len()).unwrap_or_else(F::one);
        let delta_output = residual * scale;
        let grad_output_weights = hidden.t().dot(&delta_output);
        let grad_output_bias = delta_output.sum_axis(Axis(0));

        // tanh'(a) = 1 - tanh(a)^2
        let delta_hidden =
            delta_output.dot(&self.output_weights.t()) * &hidden.mapv(|h| F::one() - h * h);
        let grad_hidden_weights = features.t().dot(&delta_hidden);
        let grad_hidden_bias = delta_hidden.sum_axis(Axis(0));

        self.output_weights -= &(grad_output_weights * self.learning_rate);
        self.output_bias -= &(grad_output_bias * self.learning_rate);
        self.hidden_weights -= &(grad_hidden_weights * self.learning_rate);
        self.hidden_bias -= &(grad_hidden_bias * self.learning_rate);

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

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn curve_fixture() -> (Array2<f64>, Array2<f64>) {
        // y = x^2 on a small grid, scaled into tanh's comfortable range
        let features = array![[-1.0], [-0.5], [0.0], [0.5], [1.0]];
        let labels = array![[1.0], [0.25], [0.0], [0.25], [1.0]];
        (features, labels)
    }

    #[test]
    fn fit_reduces_loss_on_nonlinear_target() {
        let (features, labels) = curve_fixture();
        let mut model = MlpRegressor::new(1, 8, 1, 0.1, 7);

        let first = model.fit_step(features.view(), labels.view()).unwrap();
        let mut last = first;
        for _ in 0..5000 {
            last = model.fit_step(features.view(), labels.view()).unwrap();
        }
        assert!(last < first);
        assert!(last < 0.05, "loss {} did not come down", last);
    }

    #[test]
    fn same_seed_gives_identical_models() {
        let a = MlpRegressor::<f64>::new(3, 4, 1, 0.1, 99);
        let b = MlpRegressor::<f64>::new(3, 4, 1, 0.1, 99);
        let features = array![[0.1, 0.2, 0.3], [0.4, 0.5, 0.6]];
        let out_a = a.predict(features.view()).unwrap();
        let out_b = b.predict(features.view()).unwrap();
        for (x, y) in out_a.iter().zip(out_b.iter()) {
            assert_abs_diff_eq!(x, y, epsilon = 1e-15);
        }
    }

    #[test]
    fn evaluate_matches_fit_loss_without_updating() {
        let (features, labels) = curve_fixture();
        let model = MlpRegressor::new(1, 4, 1, 0.1, 3);
        let before = model.evaluate(features.view(), labels.view()).unwrap();
        let again = model.evaluate(features.view(), labels.view()).unwrap();
        assert_abs_diff_eq!(before, again, epsilon = 1e-15);
    }

    #[test]
    fn save_and_load_round_trip_preserves_predictions() {
        let (features, labels) = curve_fixture();
        let mut model = MlpRegressor::new(1, 8, 1, 0.1, 7);
        for _ in 0..200 {
            model.fit_step(features.view(), labels.view()).unwrap();
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mlp.model.json");
        model.save(&path).unwrap();

        let restored = MlpRegressor::<f64>::load(&path).unwrap();
        let expected = model.predict(features.view()).unwrap();
        let actual = restored.predict(features.view()).unwrap();
        for (a, b) in expected.iter().zip(actual.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn rejects_wrong_feature_width() {
        let model = MlpRegressor::<f64>::new(4, 2, 1, 0.1, 0);
        let features = array![[1.0, 2.0]];
        let result = model.predict(features.view());
        assert!(matches!(
            result,
            Err(ModelError::DimensionMismatch {
                expected: 4,
                found: 2
            })
        ));
    }
}
