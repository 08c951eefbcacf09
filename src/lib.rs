//! Event-quality classification for gamma-ray detector data.
//!
//! The pipeline parses raw simulated events through an acceptance filter,
//! folds them into fixed-layout feature/label tables, splits the tables into
//! training and holdout subsets, drives a trainer backend with an
//! early-stopping loop, and scores held-out events against the zenith-angle
//! goodness thresholds.

pub mod eval;
pub mod event;
pub mod features;
pub mod session;
pub mod split;
pub mod train;

pub use eval::{evaluate_events, EvalError, EvalOptions, EvalReport, REFERENCE_ZENITH_DEG};
pub use event::{
    AcceptanceError, EventRecord, EventSource, HitRecord, InteractionRecord, SimEvent, SourceError,
};
pub use features::{build_dataset, FeatureSchema, SchemaError, TARGET_FIELD};
pub use session::{Algorithm, AnalysisError, QualityAnalysis};
pub use split::{train_test_split, SplitError, DEFAULT_SPLIT_SEED};
pub use train::{
    run_training, TrainOptions, TrainOutcome, TrainSummary, TrainingState,
};

// Re-export the shared seam types and the backends behind it.
pub use linreg::LinearRegressor;
pub use mlp::MlpRegressor;
pub use zeva_helpers::{Dataset, DatasetError, Float, ModelError, TrainableModel};
