pub mod board;
pub mod cyton;
pub mod error;
pub mod ports;
pub mod spool;
pub mod worker;

pub use board::{Board, RawSample, SyntheticBoard};
pub use error::AcquisitionError;
pub use ports::list_ports;
pub use spool::{Spool, SpoolSet};
pub use worker::{AcquisitionWorker, WorkerOptions};
