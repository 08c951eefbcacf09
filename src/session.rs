use crate::eval::{evaluate_events, EvalError, EvalOptions, EvalReport};
use crate::event::{EventSource, SourceError};
use crate::features::{build_dataset, FeatureSchema, SchemaError};
use crate::split::{train_test_split, SplitError, DEFAULT_SPLIT_SEED};
use crate::train::{run_training, TrainOptions, TrainSummary};
use linreg::LinearRegressor;
use mlp::MlpRegressor;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::AtomicBool;
use tracing::info;
use zeva_helpers::{ModelError, TrainableModel};

/// The closed set of trainer backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Mlp,
    Linear,
}

impl Algorithm {
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Mlp => "MLP",
            Algorithm::Linear => "LINEAR",
        }
    }

    fn build(
        self,
        n_features: usize,
        learning_rate: f64,
        seed: u64,
    ) -> Box<dyn TrainableModel<f64>> {
        match self {
            Algorithm::Mlp => Box::new(MlpRegressor::new(
                n_features,
                mlp::DEFAULT_HIDDEN_UNITS,
                1,
                learning_rate,
                seed,
            )),
            Algorithm::Linear => Box::new(LinearRegressor::new(n_features, 1, learning_rate, seed)),
        }
    }

    fn load(self, path: &Path) -> Result<Box<dyn TrainableModel<f64>>, ModelError> {
        match self {
            Algorithm::Mlp => Ok(Box::new(
                <MlpRegressor<f64> as TrainableModel<f64>>::load(path)?,
            )),
            Algorithm::Linear => Ok(Box::new(
                <LinearRegressor<f64> as TrainableModel<f64>>::load(path)?,
            )),
        }
    }
}

impl Display for Algorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MLP" => Ok(Algorithm::Mlp),
            "LINEAR" => Ok(Algorithm::Linear),
            _ => Err(AnalysisError::UnknownAlgorithm(s.to_string())),
        }
    }
}

/// Errors surfaced by an analysis session.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// The algorithm identifier names no known backend.
    UnknownAlgorithm(String),
    Source(SourceError),
    Schema(SchemaError),
    Split(SplitError),
    Model(ModelError),
    Eval(EvalError),
}

impl Display for AnalysisError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisError::UnknownAlgorithm(name) => {
                write!(f, "unknown algorithm {:?} (expected MLP or LINEAR)", name)
            }
            AnalysisError::Source(err) => write!(f, "{}", err),
            AnalysisError::Schema(err) => write!(f, "{}", err),
            AnalysisError::Split(err) => write!(f, "{}", err),
            AnalysisError::Model(err) => write!(f, "{}", err),
            AnalysisError::Eval(err) => write!(f, "{}", err),
        }
    }
}

impl Error for AnalysisError {}

impl From<SourceError> for AnalysisError {
    fn from(err: SourceError) -> Self {
        AnalysisError::Source(err)
    }
}

impl From<SchemaError> for AnalysisError {
    fn from(err: SchemaError) -> Self {
        AnalysisError::Schema(err)
    }
}

impl From<SplitError> for AnalysisError {
    fn from(err: SplitError) -> Self {
        AnalysisError::Split(err)
    }
}

impl From<ModelError> for AnalysisError {
    fn from(err: ModelError) -> Self {
        AnalysisError::Model(err)
    }
}

impl From<EvalError> for AnalysisError {
    fn from(err: EvalError) -> Self {
        AnalysisError::Eval(err)
    }
}

/// One train-and-score pass over a persisted event source.
///
/// A typical usage looks like this:
///
/// ```no_run
/// use std::sync::atomic::AtomicBool;
/// use zeva::QualityAnalysis;
///
/// let analysis = QualityAnalysis::new("quality.events.json", "results", "MLP", 1_000_000);
/// let cancel = AtomicBool::new(false);
/// analysis.train(&cancel).unwrap();
/// analysis.test().unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct QualityAnalysis {
    pub source_path: PathBuf,
    pub output_prefix: String,
    pub algorithm: String,
    pub max_events: usize,
    pub holdout_fraction: f64,
    pub learning_rate: f64,
    pub split_seed: u64,
    pub init_seed: u64,
    pub train_options: TrainOptions,
    pub eval_options: EvalOptions,
}

impl QualityAnalysis {
    pub fn new(
        source_path: impl Into<PathBuf>,
        output_prefix: impl Into<String>,
        algorithm: impl Into<String>,
        max_events: usize,
    ) -> Self {
        Self {
            source_path: source_path.into(),
            output_prefix: output_prefix.into(),
            algorithm: algorithm.into(),
            max_events,
            holdout_fraction: 0.3,
            learning_rate: 1e-3,
            split_seed: DEFAULT_SPLIT_SEED,
            init_seed: DEFAULT_SPLIT_SEED,
            train_options: TrainOptions::default(),
            eval_options: EvalOptions::default(),
        }
    }

    /// Where the trained weights live, keyed by output prefix and backend.
    pub fn model_path(&self, algorithm: Algorithm) -> PathBuf {
        PathBuf::from(format!(
            "{}.{}.model.json",
            self.output_prefix,
            algorithm.name()
        ))
    }

    /// Trains the configured backend on the persisted source and saves the
    /// resulting weights.
    ///
    /// The algorithm identifier is validated before anything else, so an
    /// unknown backend fails without touching the filesystem.
    pub fn train(&self, cancel: &AtomicBool) -> Result<TrainSummary<f64>, AnalysisError> {
        let algorithm: Algorithm = self.algorithm.parse()?;
        let source = EventSource::open(&self.source_path)?;
        self.train_with_source(algorithm, &source, cancel)
    }

    /// Training entry point for an already-open source.
    pub fn train_with_source(
        &self,
        algorithm: Algorithm,
        source: &EventSource,
        cancel: &AtomicBool,
    ) -> Result<TrainSummary<f64>, AnalysisError> {
        let schema = FeatureSchema::resolve(source.field_names())?;
        let dataset = build_dataset(source, &schema, self.max_events);
        let (training, holdout) =
            train_test_split(&dataset, self.holdout_fraction, self.split_seed)?;
        info!(
            algorithm = %algorithm,
            training = training.len(),
            holdout = holdout.len(),
            features = schema.feature_count(),
            "datasets prepared"
        );

        let mut model = algorithm.build(schema.feature_count(), self.learning_rate, self.init_seed);
        let summary = run_training(
            model.as_mut(),
            &training,
            &holdout,
            &self.train_options,
            cancel,
        )?;

        let path = self.model_path(algorithm);
        model.save(&path)?;
        info!(path = %path.display(), "model saved");
        Ok(summary)
    }

    /// Reloads the persisted model and scores a bounded batch of events from
    /// the source against the zenith goodness thresholds.
    pub fn test(&self) -> Result<EvalReport, AnalysisError> {
        let algorithm: Algorithm = self.algorithm.parse()?;
        let source = EventSource::open(&self.source_path)?;
        self.test_with_source(algorithm, &source)
    }

    /// Scoring entry point for an already-open source.
    pub fn test_with_source(
        &self,
        algorithm: Algorithm,
        source: &EventSource,
    ) -> Result<EvalReport, AnalysisError> {
        let schema = FeatureSchema::resolve(source.field_names())?;
        let dataset = build_dataset(source, &schema, self.eval_options.max_events);
        let model = algorithm.load(&self.model_path(algorithm))?;
        let report = evaluate_events(model.as_ref(), &dataset, &self.eval_options)?;
        Ok(report)
    }
}
