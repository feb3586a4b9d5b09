use saccrec_core::{HardwareSnapshot, Record, Subject, TestResult};

/// Collects per-test results into the record written at session end.
#[derive(Debug, Clone)]
pub struct RecordAssembler {
    subject: Subject,
    hardware: HardwareSnapshot,
    tests: Vec<TestResult>,
}

impl RecordAssembler {
    pub fn new(subject: Subject, hardware: HardwareSnapshot) -> Self {
        Self {
            subject,
            hardware,
            tests: Vec::new(),
        }
    }

    pub fn add_test(&mut self, result: TestResult) {
        tracing::debug!(test = %result.test_name, filename = %result.filename, "test added to record");
        self.tests.push(result);
    }

    pub fn tests(&self) -> &[TestResult] {
        &self.tests
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    pub fn finish(self) -> Record {
        Record {
            subject: self.subject,
            hardware: self.hardware,
            tests: self.tests,
        }
    }
}
