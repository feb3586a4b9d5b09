//! Operator-editable configuration consumed read-only by the recorder.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::geometry::ScreenGeometry;
use crate::hardware::{ChannelConfig, HardwareSnapshot, SampleRate};

pub const SCREEN_WIDTH_RANGE_CM: (f64, f64) = (10.0, 200.0);
pub const SCREEN_HEIGHT_RANGE_CM: (f64, f64) = (10.0, 200.0);
pub const SACCADIC_DISTANCE_RANGE_CM: (f64, f64) = (5.0, SCREEN_WIDTH_RANGE_CM.1 - 2.0);
pub const BALL_RADIUS_RANGE_CM: (f64, f64) = (0.1, 1.0);

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub hardware: HardwareSettings,
    pub screen: ScreenSettings,
    pub stimulus: StimulusSettings,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareSettings {
    /// Serial device; the first discovered port is used when unset.
    pub port: Option<String>,
    pub sample_rate: SampleRate,
    pub channels: ChannelConfig,
    /// Use the synthetic board instead of real hardware.
    pub simulated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenSettings {
    pub width_cm: f64,
    pub height_cm: f64,
    pub width_px: u32,
    pub height_px: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StimulusSettings {
    /// Physical distance between the left and right targets.
    pub saccadic_distance_cm: f64,
    pub ball_radius_cm: f64,
    pub ball_color: [u8; 3],
    pub background_color: [u8; 3],
}

impl Default for ScreenSettings {
    fn default() -> Self {
        Self {
            width_cm: 30.0,
            height_cm: 17.0,
            width_px: 1920,
            height_px: 1080,
        }
    }
}

impl Default for StimulusSettings {
    fn default() -> Self {
        Self {
            saccadic_distance_cm: 28.0,
            ball_radius_cm: 0.5,
            ball_color: [255, 255, 255],
            background_color: [0, 0, 0],
        }
    }
}

fn check_range(field: &'static str, value: f64, (min, max): (f64, f64)) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

impl Settings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Settings = serde_json::from_str(&text)?;
        settings.validate()?;
        tracing::debug!(path = %path.display(), "settings loaded");
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("screen.width_cm", self.screen.width_cm, SCREEN_WIDTH_RANGE_CM)?;
        check_range("screen.height_cm", self.screen.height_cm, SCREEN_HEIGHT_RANGE_CM)?;
        check_range(
            "stimulus.saccadic_distance_cm",
            self.stimulus.saccadic_distance_cm,
            SACCADIC_DISTANCE_RANGE_CM,
        )?;
        check_range(
            "stimulus.ball_radius_cm",
            self.stimulus.ball_radius_cm,
            BALL_RADIUS_RANGE_CM,
        )?;
        if self.stimulus.saccadic_distance_cm > self.screen.width_cm {
            return Err(ConfigError::OutOfRange {
                field: "stimulus.saccadic_distance_cm",
                value: self.stimulus.saccadic_distance_cm,
                min: SACCADIC_DISTANCE_RANGE_CM.0,
                max: self.screen.width_cm,
            });
        }
        Ok(())
    }

    /// Screen geometry for a subject seated `distance_cm` from the screen.
    pub fn screen_geometry(&self, distance_cm: f64) -> Result<ScreenGeometry, ConfigError> {
        Ok(ScreenGeometry::new(
            self.screen.width_cm,
            self.screen.height_cm,
            self.screen.width_px,
            self.screen.height_px,
            distance_cm,
        )?)
    }

    pub fn hardware_snapshot(&self) -> HardwareSnapshot {
        HardwareSnapshot {
            sample_rate: self.hardware.sample_rate,
            channels: self.hardware.channels.clone(),
        }
    }
}
