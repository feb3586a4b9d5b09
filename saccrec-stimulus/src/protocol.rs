//! Ordered set of tests run in one session, bracketed by calibrations.

use std::fs;
use std::path::Path;

use rand::Rng;
use saccrec_core::geometry::distance_to_subject;
use saccrec_core::{Settings, StimulusSpec};
use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;
use crate::schedule::SaccadicSchedule;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Protocol {
    #[serde(default = "initial_calibration")]
    pub initial_calibration: StimulusSpec,
    pub tests: Vec<StimulusSpec>,
    #[serde(default = "final_calibration")]
    pub final_calibration: StimulusSpec,
}

fn initial_calibration() -> StimulusSpec {
    StimulusSpec::calibration("Initial calibration")
}

fn final_calibration() -> StimulusSpec {
    StimulusSpec::calibration("Final calibration")
}

impl Protocol {
    pub fn new(tests: Vec<StimulusSpec>) -> Self {
        Self {
            initial_calibration: initial_calibration(),
            tests,
            final_calibration: final_calibration(),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScheduleError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ScheduleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let protocol: Protocol = serde_json::from_str(&text)?;
        protocol.validate()?;
        tracing::debug!(path = %path.display(), tests = protocol.tests.len(), "protocol loaded");
        Ok(protocol)
    }

    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.tests.is_empty() {
            return Err(ScheduleError::EmptyProtocol);
        }
        for spec in self.specs() {
            spec.validate()?;
        }
        Ok(())
    }

    /// Calibrations and tests in the order they are run.
    pub fn specs(&self) -> impl Iterator<Item = &StimulusSpec> {
        std::iter::once(&self.initial_calibration)
            .chain(self.tests.iter())
            .chain(std::iter::once(&self.final_calibration))
    }

    pub fn max_angle(&self) -> u32 {
        self.specs().map(|spec| spec.angle).max().unwrap_or_default()
    }

    /// Seating distance at which the widest test spans `saccadic_distance_cm`.
    pub fn distance_to_subject(&self, saccadic_distance_cm: f64) -> Result<f64, ScheduleError> {
        Ok(distance_to_subject(
            saccadic_distance_cm,
            f64::from(self.max_angle()),
        )?)
    }

    pub fn build_schedules<R: Rng + ?Sized>(
        &self,
        settings: &Settings,
        rng: &mut R,
    ) -> Result<Vec<SaccadicSchedule>, ScheduleError> {
        self.validate()?;
        let distance = self.distance_to_subject(settings.stimulus.saccadic_distance_cm)?;
        let screen = settings.screen_geometry(distance)?;
        tracing::info!(
            distance_cm = distance,
            tests = self.tests.len() + 2,
            "building schedules"
        );
        self.specs()
            .map(|spec| {
                SaccadicSchedule::generate(spec, &screen, settings.hardware.sample_rate, &mut *rng)
            })
            .collect()
    }
}
