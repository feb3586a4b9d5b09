use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const CHANNEL_COUNT: usize = 8;

/// Sampling rates supported by the Cyton board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum SampleRate {
    #[default]
    Hz250,
    Hz500,
    Hz1000,
    Hz2000,
    Hz4000,
    Hz8000,
    Hz16000,
}

impl SampleRate {
    pub const ALL: [SampleRate; 7] = [
        SampleRate::Hz250,
        SampleRate::Hz500,
        SampleRate::Hz1000,
        SampleRate::Hz2000,
        SampleRate::Hz4000,
        SampleRate::Hz8000,
        SampleRate::Hz16000,
    ];

    pub const fn hz(self) -> u32 {
        match self {
            SampleRate::Hz250 => 250,
            SampleRate::Hz500 => 500,
            SampleRate::Hz1000 => 1000,
            SampleRate::Hz2000 => 2000,
            SampleRate::Hz4000 => 4000,
            SampleRate::Hz8000 => 8000,
            SampleRate::Hz16000 => 16000,
        }
    }

    /// Milliseconds between two consecutive samples.
    pub fn sampling_step_ms(self) -> f64 {
        1000.0 / f64::from(self.hz())
    }

    /// Digit of the Cyton `~N` sample-rate command.
    pub const fn cyton_code(self) -> char {
        match self {
            SampleRate::Hz16000 => '0',
            SampleRate::Hz8000 => '1',
            SampleRate::Hz4000 => '2',
            SampleRate::Hz2000 => '3',
            SampleRate::Hz1000 => '4',
            SampleRate::Hz500 => '5',
            SampleRate::Hz250 => '6',
        }
    }
}

impl TryFrom<u32> for SampleRate {
    type Error = ConfigError;

    fn try_from(hz: u32) -> Result<Self, Self::Error> {
        SampleRate::ALL
            .into_iter()
            .find(|rate| rate.hz() == hz)
            .ok_or(ConfigError::UnsupportedSampleRate(hz))
    }
}

impl From<SampleRate> for u32 {
    fn from(rate: SampleRate) -> Self {
        rate.hz()
    }
}

impl fmt::Display for SampleRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Hz", self.hz())
    }
}

/// Programmable gain of a Cyton input channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Gain {
    X1,
    X2,
    X4,
    X6,
    X8,
    X12,
    #[default]
    X24,
}

impl Gain {
    pub const ALL: [Gain; 7] = [
        Gain::X1,
        Gain::X2,
        Gain::X4,
        Gain::X6,
        Gain::X8,
        Gain::X12,
        Gain::X24,
    ];

    pub const fn factor(self) -> u32 {
        match self {
            Gain::X1 => 1,
            Gain::X2 => 2,
            Gain::X4 => 4,
            Gain::X6 => 6,
            Gain::X8 => 8,
            Gain::X12 => 12,
            Gain::X24 => 24,
        }
    }

    /// Digit used by the Cyton channel-settings command.
    pub const fn cyton_code(self) -> char {
        match self {
            Gain::X1 => '0',
            Gain::X2 => '1',
            Gain::X4 => '2',
            Gain::X6 => '3',
            Gain::X8 => '4',
            Gain::X12 => '5',
            Gain::X24 => '6',
        }
    }
}

impl TryFrom<u32> for Gain {
    type Error = ConfigError;

    fn try_from(factor: u32) -> Result<Self, Self::Error> {
        Gain::ALL
            .into_iter()
            .find(|gain| gain.factor() == factor)
            .ok_or(ConfigError::UnsupportedGain(factor))
    }
}

impl From<Gain> for u32 {
    fn from(gain: Gain) -> Self {
        gain.factor()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSetting {
    pub active: bool,
    pub gain: Gain,
}

impl Default for ChannelSetting {
    fn default() -> Self {
        Self {
            active: true,
            gain: Gain::default(),
        }
    }
}

/// Settings of the eight Cyton input channels, channel 1 first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ChannelSetting>", into = "Vec<ChannelSetting>")]
pub struct ChannelConfig([ChannelSetting; CHANNEL_COUNT]);

impl ChannelConfig {
    pub fn channels(&self) -> &[ChannelSetting; CHANNEL_COUNT] {
        &self.0
    }

    pub fn set(&mut self, channel: usize, setting: ChannelSetting) {
        if let Some(slot) = self.0.get_mut(channel) {
            *slot = setting;
        }
    }

    pub fn active_count(&self) -> usize {
        self.0.iter().filter(|c| c.active).count()
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self([ChannelSetting::default(); CHANNEL_COUNT])
    }
}

impl TryFrom<Vec<ChannelSetting>> for ChannelConfig {
    type Error = ConfigError;

    fn try_from(channels: Vec<ChannelSetting>) -> Result<Self, Self::Error> {
        let actual = channels.len();
        let channels: [ChannelSetting; CHANNEL_COUNT] =
            channels.try_into().map_err(|_| ConfigError::ChannelCount {
                expected: CHANNEL_COUNT,
                actual,
            })?;
        Ok(Self(channels))
    }
}

impl From<ChannelConfig> for Vec<ChannelSetting> {
    fn from(config: ChannelConfig) -> Self {
        config.0.to_vec()
    }
}

/// Hardware configuration captured into the study record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareSnapshot {
    pub sample_rate: SampleRate,
    pub channels: ChannelConfig,
}
