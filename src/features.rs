use crate::event::{EventRecord, EventSource};
use ndarray::Array2;
use std::error::Error;
use std::fmt::{Display, Formatter};
use tracing::debug;
use zeva_helpers::Dataset;

/// The supervised target field.
pub const TARGET_FIELD: &str = "EvaluationZenithAngle";

/// Bookkeeping fields that never become features.
const EXCLUDED_FIELDS: [&str; 2] = ["SequenceLength", "SimulationID"];
/// Fields under this prefix are reserved for evaluation/target purposes.
const RESERVED_PREFIX: &str = "Evaluation";

/// Row cadence for progress reporting while scanning a source.
const PROGRESS_EVERY: usize = 1000;

/// Errors that can occur while resolving the feature schema.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaError {
    /// The source carries no target field.
    MissingTarget,
    /// Nothing is left after removing bookkeeping and reserved fields.
    NoFeatures,
}

impl Display for SchemaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaError::MissingTarget => {
                write!(f, "source carries no {} field", TARGET_FIELD)
            }
            SchemaError::NoFeatures => write!(
                f,
                "no feature fields remain after removing bookkeeping and evaluation fields"
            ),
        }
    }
}

impl Error for SchemaError {}

/// The fixed, ordered feature layout of a source.
///
/// Resolved once per source from its full field list minus the exclusion set;
/// the order follows the source field order, so repeated resolution of the
/// same source yields the same schema and the trained weight layout stays
/// stable across runs.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSchema {
    feature_names: Vec<String>,
    feature_indices: Vec<usize>,
    target_index: usize,
}

impl FeatureSchema {
    /// Resolves the schema from a source field list, failing fast if the
    /// target is absent or no feature fields remain.
    pub fn resolve(field_names: &[String]) -> Result<Self, SchemaError> {
        let target_index = field_names
            .iter()
            .position(|name| name == TARGET_FIELD)
            .ok_or(SchemaError::MissingTarget)?;

        let mut feature_names = Vec::new();
        let mut feature_indices = Vec::new();
        for (index, name) in field_names.iter().enumerate() {
            if EXCLUDED_FIELDS.contains(&name.as_str()) || name.starts_with(RESERVED_PREFIX) {
                continue;
            }
            feature_names.push(name.clone());
            feature_indices.push(index);
        }

        if feature_indices.is_empty() {
            return Err(SchemaError::NoFeatures);
        }

        Ok(Self {
            feature_names,
            feature_indices,
            target_index,
        })
    }

    pub fn feature_count(&self) -> usize {
        self.feature_indices.len()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Picks the feature columns out of one event's aligned value vector.
    pub fn feature_row(&self, values: &[f64]) -> Vec<f64> {
        self.feature_indices.iter().map(|&i| values[i]).collect()
    }

    /// The target value of one event's aligned value vector.
    pub fn target(&self, values: &[f64]) -> f64 {
        values[self.target_index]
    }
}

/// Scans the first `min(max_events, available)` events of a source into
/// parallel feature/label tables.
///
/// Events that fail the acceptance filter are skipped and logged, not
/// propagated; the resulting tables carry one row per accepted event. An
/// exhausted or empty source simply yields empty tables.
pub fn build_dataset(
    source: &EventSource,
    schema: &FeatureSchema,
    max_events: usize,
) -> Dataset<f64> {
    let total = max_events.min(source.len());
    let mut feature_buf = Vec::with_capacity(total * schema.feature_count());
    let mut label_buf = Vec::with_capacity(total);

    for index in 0..total {
        if index % PROGRESS_EVERY == 0 || index + 1 == total {
            debug!(scanned = index + 1, total, "building feature tables");
        }
        let event = match source.get(index) {
            Some(event) => event,
            None => break,
        };
        match EventRecord::parse(event) {
            Ok(_record) => {
                feature_buf.extend(schema.feature_row(&event.values));
                label_buf.push(schema.target(&event.values));
            }
            Err(reason) => {
                debug!(event_id = event.id, %reason, "event rejected by acceptance filter");
            }
        }
    }

    let rows = label_buf.len();
    let features = Array2::from_shape_vec((rows, schema.feature_count()), feature_buf)
        .expect("feature buffer rows match the schema width");
    let labels =
        Array2::from_shape_vec((rows, 1), label_buf).expect("one label per accepted event");
    Dataset::new(features, labels).expect("tables are built in lockstep")
}
