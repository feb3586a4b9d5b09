//! Sample sources the acquisition worker can own.

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use saccrec_core::SampleRate;
use saccrec_core::hardware::CHANNEL_COUNT;

use crate::error::AcquisitionError;

/// One board packet, channel values in microvolts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSample {
    pub index: u8,
    pub channels: [f64; CHANNEL_COUNT],
}

impl RawSample {
    pub fn horizontal(&self) -> f64 {
        self.channels[0]
    }

    pub fn vertical(&self) -> f64 {
        self.channels[1]
    }
}

pub trait Board {
    fn start_stream(&mut self) -> Result<(), AcquisitionError>;
    /// Returns whatever samples arrived since the last call, possibly none.
    fn read(&mut self) -> Result<Vec<RawSample>, AcquisitionError>;
    fn stop_stream(&mut self) -> Result<(), AcquisitionError>;
}

/// Uniform noise in [-300, 300) paced to the configured sample rate.
pub struct SyntheticBoard {
    rate: SampleRate,
    rng: StdRng,
    started: Option<Instant>,
    emitted: u64,
    counter: u8,
}

impl SyntheticBoard {
    pub fn new(rate: SampleRate) -> Self {
        Self::with_rng(rate, StdRng::from_os_rng())
    }

    pub fn with_rng(rate: SampleRate, rng: StdRng) -> Self {
        Self {
            rate,
            rng,
            started: None,
            emitted: 0,
            counter: 0,
        }
    }

    fn due(&self, elapsed: Duration) -> u64 {
        (elapsed.as_secs_f64() * f64::from(self.rate.hz())) as u64
    }

    fn next_sample(&mut self) -> RawSample {
        let mut channels = [0.0; CHANNEL_COUNT];
        for value in channels.iter_mut() {
            *value = f64::from(self.rng.random_range(-300i32..300));
        }
        let index = self.counter;
        self.counter = self.counter.wrapping_add(1);
        RawSample { index, channels }
    }
}

impl Board for SyntheticBoard {
    fn start_stream(&mut self) -> Result<(), AcquisitionError> {
        self.started = Some(Instant::now());
        self.emitted = 0;
        tracing::debug!(rate = %self.rate, "synthetic stream started");
        Ok(())
    }

    fn read(&mut self) -> Result<Vec<RawSample>, AcquisitionError> {
        let Some(started) = self.started else {
            return Ok(Vec::new());
        };
        let due = self.due(started.elapsed());
        let pending = due.saturating_sub(self.emitted);
        self.emitted = due;
        Ok((0..pending).map(|_| self.next_sample()).collect())
    }

    fn stop_stream(&mut self) -> Result<(), AcquisitionError> {
        self.started = None;
        Ok(())
    }
}
