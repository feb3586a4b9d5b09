/// One acquisition tuple as it leaves the acquisition worker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Packet counter reported by the board, wraps at 256.
    pub index: u8,
    /// Logical sample counter kept by the worker since streaming started.
    pub timestamp: u64,
    /// First channel, microvolts.
    pub horizontal: f64,
    /// Second channel, microvolts.
    pub vertical: f64,
    /// Stimulus marker attached to this sample, if any.
    pub marker: Option<i32>,
}

impl Sample {
    pub fn marker_value(&self) -> i32 {
        self.marker.unwrap_or(0)
    }
}
