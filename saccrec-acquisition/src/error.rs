use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("acquisition board not connected: {0}")]
    DeviceNotConnected(String),
    #[error("I/O error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("serial I/O error")]
    Serial(#[from] std::io::Error),
    #[error("failed to write compressed array {path}")]
    Npz {
        path: PathBuf,
        #[source]
        source: ndarray_npy::WriteNpzError,
    },
    #[error("malformed spool value {value:?} in {path} at line {line}")]
    Parse {
        path: PathBuf,
        line: usize,
        value: String,
    },
    #[error("failed to spawn acquisition worker")]
    Spawn(#[source] std::io::Error),
    #[error("acquisition worker did not stop within {0:?}")]
    ShutdownTimeout(Duration),
    #[error("acquisition worker is gone")]
    WorkerGone,
    #[error("acquisition worker is not running")]
    NotRunning,
    #[error("no recording in progress")]
    NotRecording,
    #[error("board is not streaming")]
    NotStreaming,
    #[error("board lost after {failures} consecutive failed reads")]
    BoardLost {
        failures: u32,
        #[source]
        source: Box<AcquisitionError>,
    },
}

impl AcquisitionError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| AcquisitionError::Io { path, source }
    }
}
