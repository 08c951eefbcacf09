use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use tracing::error;
use tracing_subscriber::EnvFilter;
use zeva::QualityAnalysis;

const USAGE: &str =
    "usage: zeva-cli <source.json> <output-prefix> <MLP|LINEAR> [max-events] [holdout-fraction]";

fn parse_args() -> Result<QualityAnalysis, String> {
    let mut args = std::env::args().skip(1);
    let source_path = args.next().ok_or(USAGE)?;
    let output_prefix = args.next().ok_or(USAGE)?;
    let algorithm = args.next().ok_or(USAGE)?;

    let mut analysis = QualityAnalysis::new(source_path, output_prefix, algorithm, 1_000_000);
    if let Some(raw) = args.next() {
        analysis.max_events = raw
            .parse()
            .map_err(|_| format!("max-events must be an integer, got {:?}", raw))?;
    }
    if let Some(raw) = args.next() {
        analysis.holdout_fraction = raw
            .parse()
            .map_err(|_| format!("holdout-fraction must be a number, got {:?}", raw))?;
    }
    Ok(analysis)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let analysis = match parse_args() {
        Ok(analysis) => analysis,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::FAILURE;
        }
    };

    let cancel = AtomicBool::new(false);
    let summary = match analysis.train(&cancel) {
        Ok(summary) => summary,
        Err(err) => {
            error!(%err, "training failed");
            return ExitCode::FAILURE;
        }
    };
    println!(
        "training {:?}: {} iterations, best holdout error {:?}, {:.1} it/s",
        summary.outcome,
        summary.iterations,
        summary.best_holdout_error,
        summary.iterations_per_second
    );

    match analysis.test() {
        Ok(report) => {
            println!("all events:  {}", report.n_events);
            println!("good events: {}", report.n_good);
            println!("accuracy:    {:.3}", report.accuracy());
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(%err, "evaluation failed");
            ExitCode::FAILURE
        }
    }
}
