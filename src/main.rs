// This is a simple example showing how to use the zeva library
use std::sync::atomic::AtomicBool;
use zeva::{
    run_training, train_test_split, Dataset, LinearRegressor, TrainOptions, TrainableModel,
    DEFAULT_SPLIT_SEED,
};

fn main() {
    println!("zeva library example");

    // A tiny synthetic table: one feature, target = 2x + 1.
    let features = ndarray::Array2::from_shape_fn((20, 1), |(r, _)| r as f64 / 10.0);
    let labels = features.mapv(|x| 2.0 * x + 1.0);
    let dataset = Dataset::new(features, labels).expect("tables share their row count");

    let (training, holdout) =
        train_test_split(&dataset, 0.3, DEFAULT_SPLIT_SEED).expect("non-empty dataset");
    println!(
        "split {} rows into {} training / {} holdout",
        dataset.len(),
        training.len(),
        holdout.len()
    );

    let mut model = LinearRegressor::new(1, 1, 0.05, DEFAULT_SPLIT_SEED);
    let cancel = AtomicBool::new(false);
    let summary = run_training(
        &mut model,
        &training,
        &holdout,
        &TrainOptions::default(),
        &cancel,
    )
    .expect("training on a valid table");

    println!(
        "finished after {} iterations ({:?}), final loss {:.6}",
        summary.iterations, summary.outcome, summary.final_train_loss
    );
    let probe = ndarray::array![[1.5]];
    let output = model.predict(probe.view()).expect("matching feature width");
    println!("model output at x = 1.5: {:.3} (expected about 4.0)", output[[0, 0]]);
}
