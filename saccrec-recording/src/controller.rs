//! Drives a session: one stimulus per schedule, one recording per stimulus.

use std::path::{Path, PathBuf};

use saccrec_acquisition::{AcquisitionError, AcquisitionWorker, WorkerOptions};
use saccrec_core::record::{data_directory, ensure_record_extension};
use saccrec_core::{Record, Sample, TestResult};
use saccrec_stimulus::{PlayerEvent, SaccadicSchedule, StimulusPlayer, TICK_INTERVAL};
use saccrec_timing::Timer;

use crate::assembler::RecordAssembler;
use crate::error::RecordingError;
use crate::input::{OperatorInput, OperatorSignal};

pub const CONTINUE_PROMPT: &str = "Press space to continue";

#[derive(Debug)]
pub enum RunOutcome {
    /// Every test finished and the record was written.
    Completed(Record),
    /// The operator aborted; nothing was written.
    Cancelled { completed_tests: usize },
}

type SampleSink = Box<dyn FnMut(&[Sample])>;

enum TestOutcome {
    Finished(TestResult),
    Aborted,
}

pub struct RecordingController<T: Timer, I: OperatorInput> {
    player: StimulusPlayer<T>,
    input: I,
    worker_options: WorkerOptions,
    worker: Option<AcquisitionWorker>,
    sink: Option<SampleSink>,
}

impl<T: Timer, I: OperatorInput> RecordingController<T, I> {
    pub fn new(timer: T, input: I, worker_options: WorkerOptions) -> Self {
        Self {
            player: StimulusPlayer::new(timer),
            input,
            worker_options,
            worker: None,
            sink: None,
        }
    }

    /// Receives every batch of samples drained during a tick.
    pub fn with_sink(mut self, sink: impl FnMut(&[Sample]) + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn is_worker_running(&self) -> bool {
        self.worker.as_ref().is_some_and(AcquisitionWorker::is_running)
    }

    /// Runs every schedule in order and writes the record to `output`.
    pub fn run(
        &mut self,
        schedules: Vec<SaccadicSchedule>,
        output: impl AsRef<Path>,
        mut assembler: RecordAssembler,
    ) -> Result<RunOutcome, RecordingError> {
        let output = output.as_ref();
        ensure_record_extension(output)?;
        if schedules.is_empty() {
            return Err(RecordingError::NoTests);
        }
        self.ensure_worker()?;

        let data_dir = data_directory(output);
        let record_dir = output.parent().unwrap_or(Path::new(""));
        let total = schedules.len();

        for (i, schedule) in schedules.into_iter().enumerate() {
            let test_dir = data_dir.join(format!("test-{:02}", i + 1));
            tracing::info!(test = i + 1, total, name = %schedule.spec().test_name, "test ready");

            match self.run_test(schedule, &test_dir, record_dir)? {
                TestOutcome::Finished(result) => assembler.add_test(result),
                TestOutcome::Aborted => {
                    self.shutdown()?;
                    tracing::info!(completed_tests = assembler.len(), "session cancelled");
                    return Ok(RunOutcome::Cancelled {
                        completed_tests: assembler.len(),
                    });
                }
            }
        }

        let record = assembler.finish();
        record.save(output)?;
        Ok(RunOutcome::Completed(record))
    }

    fn run_test(
        &mut self,
        schedule: SaccadicSchedule,
        test_dir: &Path,
        record_dir: &Path,
    ) -> Result<TestOutcome, RecordingError> {
        let spec = schedule.spec().clone();
        let message = format!("{}\n{CONTINUE_PROMPT}", schedule.overview());
        tracing::info!(message = %message.replace('\n', " / "), "waiting for operator");
        let mut events = self.player.run_stimulus(schedule, Some(message));
        let mut recording = false;

        loop {
            match self.input.poll() {
                Some(OperatorSignal::Continue) => events.extend(self.player.continue_signal()),
                Some(OperatorSignal::Abort) => events.extend(self.player.abort()),
                None => {}
            }
            events.extend(self.player.tick());

            let worker = self
                .worker
                .as_ref()
                .ok_or(AcquisitionError::NotRunning)?;
            let mut outcome = None;
            for event in events.drain(..) {
                match event {
                    PlayerEvent::Started { at_ns } => {
                        worker.start_recording(test_dir)?;
                        recording = true;
                        tracing::debug!(at_ns, dir = %test_dir.display(), "recording test");
                    }
                    PlayerEvent::Moved(position) => worker.put_marker(position.value()),
                    PlayerEvent::Finished => {
                        let saved = worker.stop_recording()?;
                        let filename = relative_to(&saved, record_dir);
                        outcome = Some(TestOutcome::Finished(TestResult::new(filename, &spec)));
                        break;
                    }
                    PlayerEvent::Stopped => {
                        if recording {
                            if let Err(err) = worker.stop_recording() {
                                tracing::warn!(error = %err, "cannot save aborted test");
                            }
                        }
                        outcome = Some(TestOutcome::Aborted);
                        break;
                    }
                }
            }

            // The finishing tick still forwards its samples.
            let samples = worker.read_available();
            if let Some(sink) = self.sink.as_mut().filter(|_| !samples.is_empty()) {
                sink(&samples);
            }

            if let Some(outcome) = outcome {
                if matches!(outcome, TestOutcome::Finished(_)) {
                    self.log_tick_stats(&spec.test_name);
                }
                return Ok(outcome);
            }

            self.player.timer().sleep(TICK_INTERVAL);
        }
    }

    fn ensure_worker(&mut self) -> Result<(), RecordingError> {
        if self.is_worker_running() {
            return Ok(());
        }
        let worker = AcquisitionWorker::initialize(self.worker_options.clone())?;
        worker.start()?;
        self.worker = Some(worker);
        Ok(())
    }

    fn log_tick_stats(&self, test_name: &str) {
        let stats = self.player.tick_stats();
        tracing::info!(
            test = %test_name,
            ticks = stats.ticks,
            mean_ms = stats.average_interval_ns / 1e6,
            jitter_ms = stats.jitter_ns / 1e6,
            min_ms = stats.min_interval_ns / 1e6,
            max_ms = stats.max_interval_ns / 1e6,
            rate_hz = stats.effective_rate_hz,
            "test finished"
        );
    }

    /// Stops and closes the acquisition worker if one is running.
    pub fn shutdown(&mut self) -> Result<(), RecordingError> {
        if let Some(worker) = self.worker.take() {
            worker.close()?;
        }
        Ok(())
    }
}

fn relative_to(path: &Path, base: &Path) -> String {
    let relative: PathBuf = path
        .strip_prefix(base)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf());
    relative.to_string_lossy().into_owned()
}
