pub mod assembler;
pub mod controller;
pub mod error;
pub mod input;

pub use assembler::RecordAssembler;
pub use controller::{RecordingController, RunOutcome};
pub use error::RecordingError;
pub use input::{AutoContinue, ChannelInput, OperatorInput, OperatorSignal};
