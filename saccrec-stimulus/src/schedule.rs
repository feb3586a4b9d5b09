//! Randomized left/right target sequence for one saccadic test.

use rand::Rng;
use saccrec_core::geometry::saccadic_half_offset;
use saccrec_core::{PixelPoint, Position, SampleRate, ScreenGeometry, StimulusSpec};

use crate::error::ScheduleError;

/// Shortest fixation a randomized dwell may collapse to.
const MINIMUM_DWELL_SECONDS: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub position: Position,
    pub dwell_samples: u64,
    /// Sample index one past the last sample of this fixation.
    pub end: u64,
}

/// Target positions expressed in board samples, with the pixel geometry
/// needed to place the ball on screen.
#[derive(Debug, Clone)]
pub struct SaccadicSchedule {
    spec: StimulusSpec,
    sample_rate: SampleRate,
    center: PixelPoint,
    half_offset_px: i32,
    entries: Vec<ScheduleEntry>,
}

impl SaccadicSchedule {
    pub fn generate<R: Rng + ?Sized>(
        spec: &StimulusSpec,
        screen: &ScreenGeometry,
        sample_rate: SampleRate,
        rng: &mut R,
    ) -> Result<Self, ScheduleError> {
        spec.validate()?;

        let half_cm = saccadic_half_offset(screen.distance_cm(), f64::from(spec.angle))?;
        let half_offset_px = screen.cm_to_pixels_x(half_cm)?.floor() as i32;

        let variability = spec.fixation_variability / 100.0;
        let rate = f64::from(sample_rate.hz());

        let mut entries = Vec::with_capacity(spec.saccades_count as usize);
        let mut position = Position::Left;
        let mut end = 0u64;
        for _ in 0..spec.saccades_count {
            let jitter = if variability > 0.0 {
                rng.random_range(-variability..variability)
            } else {
                0.0
            };
            let seconds = (spec.fixation_duration * (1.0 + jitter)).max(MINIMUM_DWELL_SECONDS);
            let dwell_samples = ((seconds * rate).round() as u64).max(1);
            end += dwell_samples;
            entries.push(ScheduleEntry {
                position,
                dwell_samples,
                end,
            });
            position = position.opposite();
        }

        tracing::debug!(
            test = %spec.test_name,
            half_offset_px,
            total_samples = end,
            "schedule generated"
        );

        Ok(Self {
            spec: spec.clone(),
            sample_rate,
            center: screen.center(),
            half_offset_px,
            entries,
        })
    }

    pub fn spec(&self) -> &StimulusSpec {
        &self.spec
    }

    pub fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    pub fn half_offset_px(&self) -> i32 {
        self.half_offset_px
    }

    pub fn total_samples(&self) -> u64 {
        self.entries.last().map_or(0, |entry| entry.end)
    }

    /// Target side at `sample`, or `None` once the schedule is exhausted.
    pub fn position_at(&self, sample: u64) -> Option<Position> {
        let idx = self.entries.partition_point(|entry| entry.end <= sample);
        self.entries.get(idx).map(|entry| entry.position)
    }

    pub fn screen_position_at(&self, sample: u64) -> Option<PixelPoint> {
        self.position_at(sample).map(|position| self.screen_position(position))
    }

    pub fn screen_position(&self, position: Position) -> PixelPoint {
        let dx = match position {
            Position::Left => -self.half_offset_px,
            Position::Right => self.half_offset_px,
        };
        PixelPoint::new(self.center.x + dx, self.center.y)
    }

    /// Operator message describing the test.
    pub fn overview(&self) -> String {
        self.spec.to_string()
    }
}
