use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::StimulusError;

pub const MINIMUM_ANGLE: u32 = 10;
pub const MAXIMUM_ANGLE: u32 = 60;
pub const DEFAULT_ANGLE: u32 = 30;

pub const MINIMUM_SACCADES: u32 = 5;
pub const MAXIMUM_SACCADES: u32 = 100;
pub const DEFAULT_SACCADES: u32 = 10;

pub const DEFAULT_FIXATION_DURATION: f64 = 3.0;
pub const DEFAULT_FIXATION_VARIABILITY: f64 = 50.0;

/// Side of the screen the target ball occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    Left,
    Right,
}

impl Position {
    /// Marker value injected into the acquisition stream. Zero is reserved
    /// for samples without a marker.
    pub const fn value(self) -> i32 {
        match self {
            Position::Left => 1,
            Position::Right => 2,
        }
    }

    pub const fn opposite(self) -> Self {
        match self {
            Position::Left => Position::Right,
            Position::Right => Position::Left,
        }
    }
}

/// Operator-defined parameters of one saccadic test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StimulusSpec {
    pub test_name: String,
    pub angle: u32,
    pub fixation_duration: f64,
    pub fixation_variability: f64,
    pub saccades_count: u32,
}

impl StimulusSpec {
    pub fn new(
        test_name: impl Into<String>,
        angle: u32,
        fixation_duration: f64,
        fixation_variability: f64,
        saccades_count: u32,
    ) -> Result<Self, StimulusError> {
        let spec = Self {
            test_name: test_name.into(),
            angle,
            fixation_duration,
            fixation_variability,
            saccades_count,
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Default calibration test: 30°, 3 s fixations with 50% variability, 10 saccades.
    pub fn calibration(test_name: impl Into<String>) -> Self {
        Self {
            test_name: test_name.into(),
            angle: DEFAULT_ANGLE,
            fixation_duration: DEFAULT_FIXATION_DURATION,
            fixation_variability: DEFAULT_FIXATION_VARIABILITY,
            saccades_count: DEFAULT_SACCADES,
        }
    }

    pub fn validate(&self) -> Result<(), StimulusError> {
        if !(MINIMUM_ANGLE..=MAXIMUM_ANGLE).contains(&self.angle) {
            return Err(StimulusError::AngleOutOfRange(self.angle));
        }
        if !(MINIMUM_SACCADES..=MAXIMUM_SACCADES).contains(&self.saccades_count) {
            return Err(StimulusError::SaccadesOutOfRange(self.saccades_count));
        }
        if !(self.fixation_duration > 0.0 && self.fixation_duration.is_finite()) {
            return Err(StimulusError::FixationDuration(self.fixation_duration));
        }
        if !(self.fixation_variability >= 0.0 && self.fixation_variability.is_finite()) {
            return Err(StimulusError::FixationVariability(self.fixation_variability));
        }
        Ok(())
    }
}

impl fmt::Display for StimulusSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {}° with {} saccades. Mean fixation {} s, variability {}%",
            self.test_name,
            self.angle,
            self.saccades_count,
            self.fixation_duration,
            self.fixation_variability
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_values_are_distinct_and_nonzero() {
        assert_eq!(Position::Left.value(), 1);
        assert_eq!(Position::Right.value(), 2);
        assert_eq!(Position::Left.opposite(), Position::Right);
    }

    #[test]
    fn bounds_are_enforced() {
        assert!(StimulusSpec::new("ok", 10, 3.0, 0.0, 5).is_ok());
        assert!(StimulusSpec::new("ok", 60, 3.0, 50.0, 100).is_ok());
        assert_eq!(
            StimulusSpec::new("low", 9, 3.0, 50.0, 10),
            Err(StimulusError::AngleOutOfRange(9))
        );
        assert_eq!(
            StimulusSpec::new("high", 61, 3.0, 50.0, 10),
            Err(StimulusError::AngleOutOfRange(61))
        );
        assert_eq!(
            StimulusSpec::new("few", 30, 3.0, 50.0, 4),
            Err(StimulusError::SaccadesOutOfRange(4))
        );
        assert_eq!(
            StimulusSpec::new("still", 30, 0.0, 50.0, 10),
            Err(StimulusError::FixationDuration(0.0))
        );
        assert_eq!(
            StimulusSpec::new("negative", 30, 3.0, -1.0, 10),
            Err(StimulusError::FixationVariability(-1.0))
        );
    }

    #[test]
    fn calibration_defaults_are_valid() {
        let spec = StimulusSpec::calibration("Initial calibration");
        assert!(spec.validate().is_ok());
        assert_eq!(
            spec.to_string(),
            "Initial calibration at 30° with 10 saccades. Mean fixation 3 s, variability 50%"
        );
    }
}
