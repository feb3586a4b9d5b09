use saccrec_core::{ConfigError, GeometryError, StimulusError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error(transparent)]
    Stimulus(#[from] StimulusError),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("protocol has no tests")]
    EmptyProtocol,
    #[error("failed to read protocol {path}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid protocol document")]
    Json(#[from] serde_json::Error),
}
