use std::time::Duration;

use saccrec_core::{PixelPoint, PlayerState, Position};
use saccrec_timing::{TickStats, Timer};

use crate::schedule::SaccadicSchedule;

/// Cadence at which the owner is expected to call [`StimulusPlayer::tick`].
pub const TICK_INTERVAL: Duration = Duration::from_millis(7);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    /// Stimulus onset, in timer nanoseconds.
    Started { at_ns: u64 },
    Moved(Position),
    /// Schedule exhausted.
    Finished,
    /// Aborted by the operator.
    Stopped,
}

/// Turns elapsed time into ball positions for one schedule at a time.
pub struct StimulusPlayer<T: Timer> {
    timer: T,
    state: PlayerState,
    schedule: Option<SaccadicSchedule>,
    message: Option<String>,
    started_ns: u64,
    last_tick_ns: Option<u64>,
    position: Option<Position>,
    ball: Option<PixelPoint>,
}

impl<T: Timer> StimulusPlayer<T> {
    pub fn new(timer: T) -> Self {
        Self {
            timer,
            state: PlayerState::Idle,
            schedule: None,
            message: None,
            started_ns: 0,
            last_tick_ns: None,
            position: None,
            ball: None,
        }
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    /// Text to show while waiting for the operator, if any.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Where the ball should currently be drawn.
    pub fn ball_position(&self) -> Option<PixelPoint> {
        self.ball
    }

    pub fn tick_stats(&self) -> TickStats {
        self.timer.tick_stats()
    }

    /// Loads `schedule`. With a message the player waits for
    /// [`continue_signal`](Self::continue_signal); without one it starts at once.
    pub fn run_stimulus(
        &mut self,
        schedule: SaccadicSchedule,
        message: Option<String>,
    ) -> Vec<PlayerEvent> {
        if self.state.is_abortable() {
            tracing::warn!(state = ?self.state, "replacing a stimulus that is still active");
        }
        self.schedule = Some(schedule);
        self.position = None;
        self.ball = None;
        self.last_tick_ns = None;
        self.timer.reset_ticks();

        match message {
            Some(message) => {
                self.message = Some(message);
                self.state = PlayerState::ShowingMessage;
                Vec::new()
            }
            None => self.start(),
        }
    }

    pub fn continue_signal(&mut self) -> Vec<PlayerEvent> {
        if self.state.awaits_continue() {
            self.start()
        } else {
            Vec::new()
        }
    }

    fn start(&mut self) -> Vec<PlayerEvent> {
        let Some(schedule) = &self.schedule else {
            return Vec::new();
        };
        let now = self.timer.now();
        self.message = None;
        self.state = PlayerState::Running;
        self.started_ns = now;
        self.last_tick_ns = Some(now);

        let mut events = vec![PlayerEvent::Started { at_ns: now }];
        if let Some(position) = schedule.position_at(0) {
            self.position = Some(position);
            self.ball = Some(schedule.screen_position(position));
            events.push(PlayerEvent::Moved(position));
        }
        tracing::debug!(test = %schedule.spec().test_name, at_ns = now, "stimulus started");
        events
    }

    pub fn tick(&mut self) -> Vec<PlayerEvent> {
        if !self.state.is_running() {
            return Vec::new();
        }
        let Some(schedule) = &self.schedule else {
            return Vec::new();
        };

        let now = self.timer.now();
        if let Some(last) = self.last_tick_ns.replace(now) {
            self.timer
                .record_tick(Duration::from_nanos(now.saturating_sub(last)));
        }

        let elapsed_ms = now.saturating_sub(self.started_ns) as f64 / 1_000_000.0;
        let step_ms = schedule.sample_rate().sampling_step_ms();
        let sample = (elapsed_ms / step_ms).ceil() as u64;

        match schedule.position_at(sample) {
            Some(position) if Some(position) != self.position => {
                self.position = Some(position);
                self.ball = Some(schedule.screen_position(position));
                vec![PlayerEvent::Moved(position)]
            }
            Some(_) => Vec::new(),
            None => {
                tracing::debug!(sample, "schedule exhausted");
                self.finish();
                vec![PlayerEvent::Finished]
            }
        }
    }

    /// Operator abort; a no-op unless a message or stimulus is showing.
    pub fn abort(&mut self) -> Vec<PlayerEvent> {
        if !self.state.is_abortable() {
            return Vec::new();
        }
        tracing::info!(state = ?self.state, "stimulus aborted");
        self.finish();
        vec![PlayerEvent::Stopped]
    }

    fn finish(&mut self) {
        self.state = PlayerState::Finished;
        self.schedule = None;
        self.message = None;
        self.position = None;
        self.ball = None;
        self.last_tick_ns = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use saccrec_core::{SampleRate, ScreenGeometry, StimulusSpec};
    use saccrec_timing::ManualTimer;

    fn schedule() -> SaccadicSchedule {
        let spec = StimulusSpec::new("Fixed", 30, 3.0, 0.0, 5).unwrap();
        let screen = ScreenGeometry::new(30.0, 17.0, 800, 600, 24.25).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        SaccadicSchedule::generate(&spec, &screen, SampleRate::Hz250, &mut rng).unwrap()
    }

    fn run_to_end(player: &mut StimulusPlayer<ManualTimer>) -> Vec<PlayerEvent> {
        let mut events = Vec::new();
        while !player.state().is_finished() {
            player.timer().sleep(TICK_INTERVAL);
            events.extend(player.tick());
        }
        events
    }

    #[test]
    fn waits_for_continue_when_a_message_is_shown() {
        let mut player = StimulusPlayer::new(ManualTimer::new());
        let events = player.run_stimulus(schedule(), Some("Press space".into()));
        assert!(events.is_empty());
        assert_eq!(player.state(), PlayerState::ShowingMessage);
        assert_eq!(player.message(), Some("Press space"));
        assert!(player.tick().is_empty());

        player.timer().sleep(Duration::from_millis(100));
        let events = player.continue_signal();
        assert_eq!(
            events,
            vec![
                PlayerEvent::Started { at_ns: 100_000_000 },
                PlayerEvent::Moved(Position::Left)
            ]
        );
        assert_eq!(player.message(), None);
        assert_eq!(player.ball_position(), Some(PixelPoint::new(27, 300)));
        assert!(player.continue_signal().is_empty());
    }

    #[test]
    fn alternates_then_finishes() {
        let mut player = StimulusPlayer::new(ManualTimer::new());
        let start = player.run_stimulus(schedule(), None);
        assert_eq!(start.len(), 2);

        let events = run_to_end(&mut player);
        assert_eq!(
            events,
            vec![
                PlayerEvent::Moved(Position::Right),
                PlayerEvent::Moved(Position::Left),
                PlayerEvent::Moved(Position::Right),
                PlayerEvent::Moved(Position::Left),
                PlayerEvent::Finished,
            ]
        );
        // 5 fixations of 3 s; the first tick past 15 s ends the test.
        assert!(player.timer().now() >= 15_000_000_000);
        assert!(player.timer().now() < 15_007_000_000);
        assert_eq!(player.ball_position(), None);
        assert!(player.tick().is_empty());

        let stats = player.tick_stats();
        assert!(stats.ticks > 0);
        assert_eq!(stats.average_interval_ns, 7e6);
        assert_eq!(stats.jitter_ns, 0.0);
    }

    #[test]
    fn abort_stops_an_active_stimulus_only() {
        let mut player = StimulusPlayer::new(ManualTimer::new());
        assert!(player.abort().is_empty());

        player.run_stimulus(schedule(), Some("Press space".into()));
        assert_eq!(player.abort(), vec![PlayerEvent::Stopped]);
        assert!(player.state().is_finished());
        assert!(player.continue_signal().is_empty());

        player.run_stimulus(schedule(), None);
        player.timer().sleep(TICK_INTERVAL);
        player.tick();
        assert_eq!(player.abort(), vec![PlayerEvent::Stopped]);
        assert!(player.abort().is_empty());
    }
}
