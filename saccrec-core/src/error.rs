use std::path::PathBuf;

use thiserror::Error;

/// Physical screen or viewing-angle values that cannot be scheduled.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum GeometryError {
    #[error("invalid geometry: {axis} must be positive, got {value}")]
    InvalidGeometry { axis: &'static str, value: f64 },
    #[error("invalid angle: {0}° is outside the open interval (0°, 90°)")]
    InvalidAngle(f64),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StimulusError {
    #[error("angle {0}° is outside [10°, 60°]")]
    AngleOutOfRange(u32),
    #[error("saccades count {0} is outside [5, 100]")]
    SaccadesOutOfRange(u32),
    #[error("fixation duration must be positive, got {0} s")]
    FixationDuration(f64),
    #[error("fixation variability must be non-negative, got {0}%")]
    FixationVariability(f64),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unable to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{field} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("unsupported sample rate {0} Hz")]
    UnsupportedSampleRate(u32),
    #[error("unsupported gain {0}")]
    UnsupportedGain(u32),
    #[error("expected {expected} channel settings, got {actual}")]
    ChannelCount { expected: usize, actual: usize },
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    Stimulus(#[from] StimulusError),
}

#[derive(Error, Debug)]
pub enum SubjectError {
    #[error("subject record is not a JSON object")]
    NotAnObject,
    #[error("missing subject field `{0}`")]
    MissingField(&'static str),
    #[error("subject field `{field}` has the wrong type")]
    WrongType { field: &'static str },
    #[error("unknown genre `{0}`")]
    UnknownGenre(String),
    #[error("unknown subject status `{0}`")]
    UnknownStatus(String),
    #[error("birth date `{value}` does not match DD/MM/YYYY")]
    BirthDate {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("record path {0} must use the `.rec` extension")]
    Extension(PathBuf),
    #[error("unable to access record {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed record: {0}")]
    Json(#[from] serde_json::Error),
}
