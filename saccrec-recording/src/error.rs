use saccrec_acquisition::AcquisitionError;
use saccrec_core::RecordError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordingError {
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),
    #[error("nothing to record: no tests scheduled")]
    NoTests,
}
