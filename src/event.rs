use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::debug;

/// Process tag a Compton interaction carries in the simulation output.
pub const COMPTON_PROCESS: &str = "COMP";
/// Detector type of the tracker layer the first scatter must land in.
pub const TRACKER_DETECTOR_TYPE: i32 = 1;

/// One detector hit: position and deposited energy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitRecord {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub energy: f64,
}

/// One simulated interaction: physics-truth process tag, detector type and
/// position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub process: String,
    pub detector_type: i32,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// One raw source event: interaction and hit sub-records plus the named
/// scalar field values, aligned with the owning source's field list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimEvent {
    pub id: i64,
    pub interactions: Vec<InteractionRecord>,
    pub hits: Vec<HitRecord>,
    pub values: Vec<f64>,
}

/// Errors that can occur while opening or validating an event source.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceError {
    /// The source file is missing, unreadable or not a valid source document.
    Unavailable { path: String, reason: String },
    /// An event's scalar values do not line up with the source field list.
    Misaligned {
        event_id: i64,
        expected: usize,
        found: usize,
    },
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::Unavailable { path, reason } => {
                write!(f, "cannot open event source {}: {}", path, reason)
            }
            SourceError::Misaligned {
                event_id,
                expected,
                found,
            } => write!(
                f,
                "event {} carries {} field values, expected {}",
                event_id, found, expected
            ),
        }
    }
}

impl Error for SourceError {}

/// A bounded, ordered, indexable collection of raw events.
///
/// The field list is carried once for the whole source; every event's
/// `values` vector is validated against it on construction, so downstream
/// code can index scalar fields by position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSource {
    field_names: Vec<String>,
    events: Vec<SimEvent>,
}

impl EventSource {
    /// Builds a source from parts, checking field/value alignment.
    pub fn new(field_names: Vec<String>, events: Vec<SimEvent>) -> Result<Self, SourceError> {
        for event in &events {
            if event.values.len() != field_names.len() {
                return Err(SourceError::Misaligned {
                    event_id: event.id,
                    expected: field_names.len(),
                    found: event.values.len(),
                });
            }
        }
        Ok(Self {
            field_names,
            events,
        })
    }

    /// Reads and validates a JSON-persisted source.
    ///
    /// # Errors
    ///
    /// Returns `SourceError::Unavailable` if the file cannot be opened or
    /// parsed, `SourceError::Misaligned` if an event disagrees with the field
    /// list.
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let unavailable = |reason: String| SourceError::Unavailable {
            path: path.display().to_string(),
            reason,
        };
        let file = File::open(path).map_err(|e| unavailable(e.to_string()))?;
        let raw: EventSource = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| unavailable(e.to_string()))?;
        debug!(path = %path.display(), events = raw.events.len(), "event source opened");
        Self::new(raw.field_names, raw.events)
    }

    /// Writes the source as JSON, the format `open` reads back.
    pub fn save(&self, path: &Path) -> Result<(), SourceError> {
        let unavailable = |reason: String| SourceError::Unavailable {
            path: path.display().to_string(),
            reason,
        };
        let file = File::create(path).map_err(|e| unavailable(e.to_string()))?;
        serde_json::to_writer(BufWriter::new(file), self).map_err(|e| unavailable(e.to_string()))
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SimEvent> {
        self.events.get(index)
    }

    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }
}

/// Reasons an event fails the acceptance filter.
///
/// These are recovered locally: a rejected event is skipped, never an abort.
#[derive(Debug, Clone, PartialEq)]
pub enum AcceptanceError {
    TooFewInteractions(usize),
    TooFewHits(usize),
    WrongProcess(String),
    WrongDetector(i32),
}

impl Display for AcceptanceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AcceptanceError::TooFewInteractions(n) => {
                write!(f, "only {} interaction records (need more than 2)", n)
            }
            AcceptanceError::TooFewHits(n) => {
                write!(f, "only {} hit records (need more than 2)", n)
            }
            AcceptanceError::WrongProcess(p) => {
                write!(f, "first scatter is {:?}, not {:?}", p, COMPTON_PROCESS)
            }
            AcceptanceError::WrongDetector(d) => {
                write!(
                    f,
                    "first scatter in detector type {}, not {}",
                    d, TRACKER_DETECTOR_TYPE
                )
            }
        }
    }
}

impl Error for AcceptanceError {}

/// A parsed, accepted event: per-hit coordinate/energy arrays and the origin
/// depth of the first Compton scatter. Immutable after parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub id: i64,
    pub origin_position_z: f64,
    pub x: Array1<f64>,
    pub y: Array1<f64>,
    pub z: Array1<f64>,
    pub energy: Array1<f64>,
}

impl EventRecord {
    /// Applies the acceptance filter and extracts the hit arrays.
    ///
    /// An event is accepted when it has more than 2 interaction records and
    /// more than 2 hit records, and its second interaction record is a
    /// Compton scatter in the tracker layer. The origin depth is taken from
    /// that second interaction's z position.
    pub fn parse(event: &SimEvent) -> Result<Self, AcceptanceError> {
        if event.interactions.len() <= 2 {
            return Err(AcceptanceError::TooFewInteractions(event.interactions.len()));
        }
        if event.hits.len() <= 2 {
            return Err(AcceptanceError::TooFewHits(event.hits.len()));
        }

        let origin = &event.interactions[1];
        if origin.process != COMPTON_PROCESS {
            return Err(AcceptanceError::WrongProcess(origin.process.clone()));
        }
        if origin.detector_type != TRACKER_DETECTOR_TYPE {
            return Err(AcceptanceError::WrongDetector(origin.detector_type));
        }

        Ok(Self {
            id: event.id,
            origin_position_z: origin.z,
            x: event.hits.iter().map(|h| h.x).collect(),
            y: event.hits.iter().map(|h| h.y).collect(),
            z: event.hits.iter().map(|h| h.z).collect(),
            energy: event.hits.iter().map(|h| h.energy).collect(),
        })
    }

    pub fn hit_count(&self) -> usize {
        self.x.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interaction(process: &str, detector_type: i32, z: f64) -> InteractionRecord {
        InteractionRecord {
            process: process.to_string(),
            detector_type,
            x: 0.0,
            y: 0.0,
            z,
        }
    }

    fn hit(x: f64, energy: f64) -> HitRecord {
        HitRecord {
            x,
            y: x + 1.0,
            z: x + 2.0,
            energy,
        }
    }

    fn accepted_event() -> SimEvent {
        SimEvent {
            id: 7,
            interactions: vec![
                interaction("INIT", 0, 0.0),
                interaction(COMPTON_PROCESS, TRACKER_DETECTOR_TYPE, 4.5),
                interaction("PHOT", 2, 1.0),
            ],
            hits: vec![hit(1.0, 100.0), hit(2.0, 200.0), hit(3.0, 300.0)],
            values: vec![],
        }
    }

    #[test]
    fn parse_populates_hit_arrays_and_origin() {
        let record = EventRecord::parse(&accepted_event()).unwrap();
        assert_eq!(record.id, 7);
        assert_eq!(record.hit_count(), 3);
        assert_eq!(record.x.len(), record.energy.len());
        assert_eq!(record.x[1], 2.0);
        assert_eq!(record.y[1], 3.0);
        assert_eq!(record.z[1], 4.0);
        assert_eq!(record.energy[2], 300.0);
        assert_eq!(record.origin_position_z, 4.5);
    }

    #[test]
    fn parse_rejects_too_few_interactions() {
        let mut event = accepted_event();
        event.interactions.truncate(2);
        assert_eq!(
            EventRecord::parse(&event),
            Err(AcceptanceError::TooFewInteractions(2))
        );
    }

    #[test]
    fn parse_rejects_too_few_hits() {
        let mut event = accepted_event();
        event.hits.truncate(2);
        assert_eq!(EventRecord::parse(&event), Err(AcceptanceError::TooFewHits(2)));
    }

    #[test]
    fn parse_rejects_wrong_process() {
        let mut event = accepted_event();
        event.interactions[1].process = "PAIR".to_string();
        assert!(matches!(
            EventRecord::parse(&event),
            Err(AcceptanceError::WrongProcess(_))
        ));
    }

    #[test]
    fn parse_rejects_wrong_detector() {
        let mut event = accepted_event();
        event.interactions[1].detector_type = 3;
        assert_eq!(
            EventRecord::parse(&event),
            Err(AcceptanceError::WrongDetector(3))
        );
    }

    #[test]
    fn source_rejects_misaligned_values() {
        let mut event = accepted_event();
        event.values = vec![1.0];
        let result = EventSource::new(vec!["A".into(), "B".into()], vec![event]);
        assert!(matches!(
            result,
            Err(SourceError::Misaligned {
                expected: 2,
                found: 1,
                ..
            })
        ));
    }

    #[test]
    fn open_reports_missing_file() {
        let result = EventSource::open(Path::new("/nonexistent/source.json"));
        assert!(matches!(result, Err(SourceError::Unavailable { .. })));
    }
}
