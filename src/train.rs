use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use zeva_helpers::{Dataset, Float, ModelError, TrainableModel};

/// Knobs of the training loop.
#[derive(Debug, Clone)]
pub struct TrainOptions {
    /// Hard cap on optimization steps.
    pub max_iterations: u32,
    /// Holdout loss is checked every this many iterations.
    pub checkpoint_interval: u32,
    /// Consecutive no-improvement checkpoints before stopping.
    pub patience: u32,
    /// Smallest holdout-loss drop that still counts as an improvement.
    pub min_improvement: f64,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            max_iterations: 5000,
            checkpoint_interval: 200,
            patience: 10,
            min_improvement: 1e-4,
        }
    }
}

/// How a training run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainOutcome {
    /// The holdout loss stopped improving for `patience` checkpoints.
    Converged,
    /// The iteration cap was reached without convergence.
    Exhausted,
    /// An external cancellation flag was observed at an iteration boundary.
    Interrupted,
}

/// Checkpoint bookkeeping, carried explicitly through the loop.
#[derive(Debug, Clone)]
pub struct TrainingState<F>
where
    F: Float,
{
    pub best_error: F,
    pub times_no_improvement: u32,
    pub iterations: u32,
}

impl<F> TrainingState<F>
where
    F: Float,
{
    pub fn new() -> Self {
        Self {
            best_error: F::infinity(),
            times_no_improvement: 0,
            iterations: 0,
        }
    }

    /// Folds one holdout evaluation into the state; returns whether the
    /// error improved by more than `min_improvement`.
    pub fn record_checkpoint(&mut self, error: F, min_improvement: F) -> bool {
        if self.best_error - error > min_improvement {
            self.best_error = error;
            self.times_no_improvement = 0;
            true
        } else {
            self.times_no_improvement += 1;
            false
        }
    }

    /// The best holdout error seen so far, if any checkpoint ran.
    pub fn best_observed(&self) -> Option<F> {
        if self.best_error.is_finite() {
            Some(self.best_error)
        } else {
            None
        }
    }
}

impl<F> Default for TrainingState<F>
where
    F: Float,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Report of a finished training run.
#[derive(Debug, Clone)]
pub struct TrainSummary<F>
where
    F: Float,
{
    pub outcome: TrainOutcome,
    pub iterations: u32,
    pub best_holdout_error: Option<F>,
    pub final_train_loss: F,
    pub elapsed: Duration,
    pub iterations_per_second: f64,
}

/// Drives full-batch optimization steps until convergence, exhaustion or
/// cancellation.
///
/// Every `checkpoint_interval` iterations the model is evaluated against the
/// holdout set; `patience` consecutive checkpoints without a drop of more
/// than `min_improvement` end the run as `Converged`. An empty holdout set
/// skips checkpoints entirely, so termination is then driven by the
/// iteration cap (or the cancellation flag, which is polled only at
/// iteration boundaries).
///
/// # Errors
///
/// Propagates the first `ModelError` a fit or evaluation step reports, e.g.
/// for an empty or mismatched training table.
pub fn run_training<F, M>(
    model: &mut M,
    training: &Dataset<F>,
    holdout: &Dataset<F>,
    options: &TrainOptions,
    cancel: &AtomicBool,
) -> Result<TrainSummary<F>, ModelError>
where
    F: Float,
    M: TrainableModel<F> + ?Sized,
{
    let min_improvement = F::cast(options.min_improvement).unwrap_or_else(F::zero);
    let interval = options.checkpoint_interval.max(1);
    let started = Instant::now();

    let mut state = TrainingState::new();
    let mut final_train_loss = F::zero();
    let mut outcome = TrainOutcome::Exhausted;

    for iteration in 0..options.max_iterations {
        if cancel.load(Ordering::Relaxed) {
            outcome = TrainOutcome::Interrupted;
            break;
        }

        final_train_loss = model.fit_step(training.features(), training.labels())?;
        state.iterations = iteration + 1;

        if iteration > 0 && iteration % interval == 0 && !holdout.is_empty() {
            let error = model.evaluate(holdout.features(), holdout.labels())?;
            let improved = state.record_checkpoint(error, min_improvement);
            debug!(
                iteration,
                holdout_error = ?error,
                train_loss = ?final_train_loss,
                improved,
                "checkpoint"
            );
        }

        if state.times_no_improvement >= options.patience {
            outcome = TrainOutcome::Converged;
            break;
        }
    }

    let elapsed = started.elapsed();
    let iterations_per_second = if elapsed.as_secs_f64() > 0.0 {
        f64::from(state.iterations) / elapsed.as_secs_f64()
    } else {
        0.0
    };

    let summary = TrainSummary {
        outcome,
        iterations: state.iterations,
        best_holdout_error: state.best_observed(),
        final_train_loss,
        elapsed,
        iterations_per_second,
    };
    info!(
        outcome = ?summary.outcome,
        iterations = summary.iterations,
        best_holdout_error = ?summary.best_holdout_error,
        final_train_loss = ?summary.final_train_loss,
        iterations_per_second = summary.iterations_per_second,
        "training finished"
    );
    Ok(summary)
}
