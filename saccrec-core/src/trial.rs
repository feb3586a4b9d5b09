use serde::{Deserialize, Serialize};

use crate::stimulus::StimulusSpec;

/// Outcome of one completed test, as stored in the study record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    /// Directory holding the test's compressed channel arrays, relative to
    /// the record file.
    pub filename: String,
    pub angle: u32,
    pub fixation_duration: f64,
    pub fixation_variability: f64,
    pub saccades_count: u32,
    pub test_name: String,
}

impl TestResult {
    pub fn new(filename: impl Into<String>, spec: &StimulusSpec) -> Self {
        Self {
            filename: filename.into(),
            angle: spec.angle,
            fixation_duration: spec.fixation_duration,
            fixation_variability: spec.fixation_variability,
            saccades_count: spec.saccades_count,
            test_name: spec.test_name.clone(),
        }
    }
}
