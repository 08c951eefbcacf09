use ndarray::s;
use std::error::Error;
use std::fmt::{Display, Formatter};
use tracing::{debug, info};
use zeva_helpers::{Dataset, ModelError, TrainableModel};

/// Reference zenith angle, in degrees, that a correctly reconstructed event
/// points back to.
pub const REFERENCE_ZENITH_DEG: f64 = 90.0;

/// Knobs of the evaluation pass.
#[derive(Debug, Clone)]
pub struct EvalOptions {
    /// Upper bound on the number of events scored in one pass.
    pub max_events: usize,
    /// Tolerance around the reference zenith for the true goodness label.
    pub good_threshold: f64,
    /// Tolerance around the reference zenith for the model's output.
    pub learned_good_threshold: f64,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            max_events: 100,
            good_threshold: 0.2,
            learned_good_threshold: 0.06,
        }
    }
}

/// Aggregate result of scoring a batch of events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvalReport {
    pub n_events: usize,
    pub n_good: usize,
    pub n_correct: usize,
}

impl EvalReport {
    /// Fraction of events whose predicted goodness matched the truth.
    ///
    /// Defined for every batch: an empty batch ("no events evaluated")
    /// reports 0.0 rather than dividing by zero.
    pub fn accuracy(&self) -> f64 {
        if self.n_events == 0 {
            0.0
        } else {
            self.n_correct as f64 / self.n_events as f64
        }
    }
}

/// Whether a zenith angle lies within `threshold` degrees of the reference.
pub fn is_good_zenith(value: f64, threshold: f64) -> bool {
    (value - REFERENCE_ZENITH_DEG).abs() <= threshold
}

/// Errors specific to the evaluation pass.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// The dataset carries no label column to compare against.
    MissingTargets,
    /// The model failed on the batch.
    Model(ModelError),
}

impl Display for EvalError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            EvalError::MissingTargets => write!(f, "dataset carries no label column"),
            EvalError::Model(err) => write!(f, "{}", err),
        }
    }
}

impl Error for EvalError {}

impl From<ModelError> for EvalError {
    fn from(err: ModelError) -> Self {
        EvalError::Model(err)
    }
}

/// Scores up to `max_events` rows of a dataset against a trained model.
///
/// Each event's true goodness compares its target zenith angle against the
/// reference within `good_threshold`; the predicted goodness applies the
/// same rule to the model output under `learned_good_threshold`. The report
/// counts events, good events and truth-matching predictions. An empty batch
/// degrades to the zero report instead of failing.
pub fn evaluate_events(
    model: &dyn TrainableModel<f64>,
    dataset: &Dataset<f64>,
    options: &EvalOptions,
) -> Result<EvalReport, EvalError> {
    let limit = dataset.len().min(options.max_events);
    if limit == 0 {
        info!("no events evaluated");
        return Ok(EvalReport::default());
    }
    if dataset.n_outputs() == 0 {
        return Err(EvalError::MissingTargets);
    }

    let batch = dataset.features();
    let batch = batch.slice(s![..limit, ..]);
    let outputs = model.predict(batch)?;
    let labels = dataset.labels();

    let mut report = EvalReport::default();
    for row in 0..limit {
        let target = labels[[row, 0]];
        let output = outputs[[row, 0]];
        let is_good = is_good_zenith(target, options.good_threshold);
        let learned_good = is_good_zenith(output, options.learned_good_threshold);

        report.n_events += 1;
        if is_good {
            report.n_good += 1;
        }
        if learned_good == is_good {
            report.n_correct += 1;
        }
        debug!(row, target, output, is_good, learned_good, "event scored");
    }

    info!(
        events = report.n_events,
        good = report.n_good,
        correct = report.n_correct,
        accuracy = report.accuracy(),
        "evaluation finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array2, ArrayView2};
    use std::path::Path;

    /// Test double that returns a fixed output column.
    struct FixedModel {
        outputs: Vec<f64>,
    }

    impl TrainableModel<f64> for FixedModel {
        fn fit_step(
            &mut self,
            _features: ArrayView2<f64>,
            _labels: ArrayView2<f64>,
        ) -> Result<f64, ModelError> {
            Ok(0.0)
        }

        fn evaluate(
            &self,
            _features: ArrayView2<f64>,
            _labels: ArrayView2<f64>,
        ) -> Result<f64, ModelError> {
            Ok(0.0)
        }

        fn predict(&self, features: ArrayView2<f64>) -> Result<Array2<f64>, ModelError> {
            let rows = features.nrows();
            Array2::from_shape_vec((rows, 1), self.outputs[..rows].to_vec())
                .map_err(|e| ModelError::Persistence(e.to_string()))
        }

        fn save(&self, _path: &Path) -> Result<(), ModelError> {
            Ok(())
        }

        fn load(_path: &Path) -> Result<Self, ModelError> {
            Err(ModelError::Persistence("fixed model is not persisted".into()))
        }
    }

    fn dataset_with_targets(targets: &[f64]) -> Dataset<f64> {
        let rows = targets.len();
        let features = Array2::zeros((rows, 2));
        let labels = Array2::from_shape_vec((rows, 1), targets.to_vec()).unwrap();
        Dataset::new(features, labels).unwrap()
    }

    #[test]
    fn goodness_follows_distance_from_reference() {
        assert!(is_good_zenith(90.0, 0.2));
        assert!(is_good_zenith(90.2, 0.2));
        assert!(is_good_zenith(89.8, 0.2));
        assert!(!is_good_zenith(90.3, 0.2));
    }

    #[test]
    fn distant_angle_is_bad() {
        // A 45-degree event is nowhere near the reference; it must not be
        // counted as good no matter how the threshold is chosen below 45.
        assert!(!is_good_zenith(45.0, 0.2));
        assert!(!is_good_zenith(45.0, 10.0));
    }

    #[test]
    fn report_counts_good_events_and_matches() {
        let dataset = dataset_with_targets(&[90.0, 90.1, 45.0, 89.95]);
        let model = FixedModel {
            outputs: vec![90.0, 90.0, 90.0, 45.0],
        };
        let options = EvalOptions {
            learned_good_threshold: 0.5,
            ..EvalOptions::default()
        };
        let report = evaluate_events(&model, &dataset, &options).unwrap();

        assert_eq!(report.n_events, 4);
        assert_eq!(report.n_good, 3);
        // Rows 0, 1, 3(good) predicted good/good/bad; row 2 (bad) predicted good.
        assert_eq!(report.n_correct, 2);
        assert_abs_diff_eq!(report.accuracy(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn accuracy_stays_in_unit_interval() {
        let dataset = dataset_with_targets(&[90.0]);
        let model = FixedModel { outputs: vec![0.0] };
        let report = evaluate_events(&model, &dataset, &EvalOptions::default()).unwrap();
        assert_eq!(report.n_events, 1);
        let accuracy = report.accuracy();
        assert!((0.0..=1.0).contains(&accuracy));
    }

    #[test]
    fn batch_with_zero_good_events_is_well_defined() {
        let dataset = dataset_with_targets(&[10.0, 20.0, 30.0]);
        let model = FixedModel {
            outputs: vec![10.0, 20.0, 30.0],
        };
        let report = evaluate_events(&model, &dataset, &EvalOptions::default()).unwrap();
        assert_eq!(report.n_good, 0);
        // Bad events predicted bad still count as correct.
        assert_eq!(report.n_correct, 3);
        assert_abs_diff_eq!(report.accuracy(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn empty_batch_degrades_to_zero_report() {
        let dataset = Dataset::<f64>::empty(2, 1);
        let model = FixedModel { outputs: vec![] };
        let report = evaluate_events(&model, &dataset, &EvalOptions::default()).unwrap();
        assert_eq!(report, EvalReport::default());
        assert_eq!(report.accuracy(), 0.0);
    }

    #[test]
    fn cap_bounds_the_scored_batch() {
        let targets: Vec<f64> = (0..10).map(|_| 90.0).collect();
        let dataset = dataset_with_targets(&targets);
        let model = FixedModel {
            outputs: vec![90.0; 10],
        };
        let options = EvalOptions {
            max_events: 4,
            ..EvalOptions::default()
        };
        let report = evaluate_events(&model, &dataset, &options).unwrap();
        assert_eq!(report.n_events, 4);
    }
}
