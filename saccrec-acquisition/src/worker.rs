//! Acquisition thread owning the board, fed by a command channel.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::atomic::AtomicCell;
use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use saccrec_core::settings::HardwareSettings;
use saccrec_core::{ChannelConfig, Sample, SampleRate};

use crate::board::{Board, SyntheticBoard};
use crate::cyton::CytonBoard;
use crate::error::AcquisitionError;
use crate::ports::list_ports;
use crate::spool::SpoolSet;

pub const PID_FILE_NAME: &str = "saccrec.pid";
const POLL_INTERVAL: Duration = Duration::from_millis(1);
/// Consecutive read errors after which the board is considered unplugged.
const MAX_READ_FAILURES: u32 = 50;

#[derive(Debug, Clone)]
pub struct WorkerOptions {
    pub simulated: bool,
    /// Serial device; the first discovered port when unset.
    pub port: Option<String>,
    pub sample_rate: SampleRate,
    pub channels: ChannelConfig,
    /// Directory of the liveness file.
    pub pid_dir: PathBuf,
    pub ready_timeout: Duration,
    pub save_timeout: Duration,
    pub shutdown_timeout: Duration,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            simulated: false,
            port: None,
            sample_rate: SampleRate::default(),
            channels: ChannelConfig::default(),
            pid_dir: std::env::temp_dir(),
            ready_timeout: Duration::from_secs(10),
            save_timeout: Duration::from_secs(60),
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

impl WorkerOptions {
    pub fn from_settings(hardware: &HardwareSettings) -> Self {
        Self {
            simulated: hardware.simulated,
            port: hardware.port.clone(),
            sample_rate: hardware.sample_rate,
            channels: hardware.channels.clone(),
            ..Self::default()
        }
    }

    pub fn pid_path(&self) -> PathBuf {
        self.pid_dir.join(PID_FILE_NAME)
    }
}

enum Command {
    Start,
    StartRecording(PathBuf),
    StopRecording,
    Stop,
}

enum Status {
    Ready,
    Failed(AcquisitionError),
    Streaming(Result<(), AcquisitionError>),
    Recording(Result<(), AcquisitionError>),
    Saved(Result<PathBuf, AcquisitionError>),
    Stopped(Result<(), AcquisitionError>),
}

/// Handle to the acquisition thread. Samples arrive on a data channel,
/// markers go through a last-write-wins cell read by the thread.
pub struct AcquisitionWorker {
    commands: Sender<Command>,
    data: Receiver<Sample>,
    status: Receiver<Status>,
    marker: Arc<AtomicCell<Option<i32>>>,
    handle: Option<JoinHandle<()>>,
    running: bool,
    options: WorkerOptions,
}

impl AcquisitionWorker {
    /// Spawns the thread and blocks until the board is open.
    pub fn initialize(options: WorkerOptions) -> Result<Self, AcquisitionError> {
        Self::spawn(options, open_board)
    }

    /// Like [`AcquisitionWorker::initialize`] with an already opened board.
    pub fn with_board<B>(options: WorkerOptions, board: B) -> Result<Self, AcquisitionError>
    where
        B: Board + Send + 'static,
    {
        Self::spawn(options, move |_: &WorkerOptions| -> Result<Box<dyn Board>, AcquisitionError> {
            Ok(Box::new(board))
        })
    }

    fn spawn<F>(options: WorkerOptions, open: F) -> Result<Self, AcquisitionError>
    where
        F: FnOnce(&WorkerOptions) -> Result<Box<dyn Board>, AcquisitionError> + Send + 'static,
    {
        let (command_tx, command_rx) = unbounded();
        let (data_tx, data_rx) = unbounded();
        let (status_tx, status_rx) = unbounded();
        let marker = Arc::new(AtomicCell::new(None));

        let thread_options = options.clone();
        let thread_marker = Arc::clone(&marker);
        let handle = thread::Builder::new()
            .name("saccrec-acquisition".into())
            .spawn(move || {
                let board = match open(&thread_options) {
                    Ok(board) => board,
                    Err(err) => {
                        let _ = status_tx.send(Status::Failed(err));
                        return;
                    }
                };
                let worker = WorkerLoop {
                    board,
                    commands: command_rx,
                    data: data_tx,
                    status: status_tx,
                    marker: thread_marker,
                    pid_path: thread_options.pid_path(),
                    streaming: false,
                    timestamp: 0,
                    read_failures: 0,
                    spool: None,
                    fault: None,
                };
                worker.run();
            })
            .map_err(AcquisitionError::Spawn)?;

        match status_rx.recv_timeout(options.ready_timeout) {
            Ok(Status::Ready) => {
                tracing::info!(simulated = options.simulated, rate = %options.sample_rate, "acquisition worker ready");
                Ok(Self {
                    commands: command_tx,
                    data: data_rx,
                    status: status_rx,
                    marker,
                    handle: Some(handle),
                    running: true,
                    options,
                })
            }
            Ok(Status::Failed(err)) => {
                let _ = handle.join();
                tracing::error!(error = %err, "acquisition worker failed to start");
                Err(err)
            }
            Ok(_) | Err(RecvTimeoutError::Disconnected) => Err(AcquisitionError::WorkerGone),
            Err(RecvTimeoutError::Timeout) => {
                let _ = command_tx.send(Command::Stop);
                Err(AcquisitionError::DeviceNotConnected(
                    "board did not become ready".into(),
                ))
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Starts streaming and waits for the board to acknowledge it.
    pub fn start(&self) -> Result<(), AcquisitionError> {
        self.send(Command::Start)?;
        match self.await_status(self.options.ready_timeout)? {
            Status::Streaming(result) => result,
            _ => Err(AcquisitionError::WorkerGone),
        }
    }

    /// Non-blocking drain of every sample produced so far.
    pub fn read_available(&self) -> Vec<Sample> {
        if !self.running {
            return Vec::new();
        }
        self.data.try_iter().collect()
    }

    /// Attaches `value` to the next sample read from the board.
    pub fn put_marker(&self, value: i32) {
        self.marker.store(Some(value));
    }

    /// Opens a fresh spool set in `dir`. Samples read after this returns
    /// are persisted.
    pub fn start_recording(&self, dir: impl AsRef<Path>) -> Result<(), AcquisitionError> {
        self.send(Command::StartRecording(dir.as_ref().to_path_buf()))?;
        match self.await_status(self.options.save_timeout)? {
            Status::Recording(result) => result,
            _ => Err(AcquisitionError::WorkerGone),
        }
    }

    /// Closes the open spool set and converts it to `.npz` arrays. A spool
    /// or board failure during the test is returned here instead.
    pub fn stop_recording(&self) -> Result<PathBuf, AcquisitionError> {
        self.send(Command::StopRecording)?;
        match self.await_status(self.options.save_timeout)? {
            Status::Saved(result) => result,
            _ => Err(AcquisitionError::WorkerGone),
        }
    }

    /// Stops the thread and waits for it, bounded by the shutdown timeout.
    /// Returns any failure the thread had not reported yet. A no-op once
    /// stopped.
    pub fn stop(&mut self) -> Result<(), AcquisitionError> {
        if !self.running {
            return Ok(());
        }
        self.running = false;
        let _ = self.commands.send(Command::Stop);

        let timeout = self.options.shutdown_timeout;
        let stopped = loop {
            match self.status.recv_timeout(timeout) {
                Ok(Status::Stopped(result)) => break Some(result),
                Err(RecvTimeoutError::Disconnected) => break Some(Ok(())),
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout) => break None,
            }
        };

        let Some(result) = stopped else {
            // Detached: the thread exits on its own once the board lets go.
            self.handle = None;
            let err = AcquisitionError::ShutdownTimeout(timeout);
            tracing::error!(error = %err, "acquisition worker did not stop");
            return Err(err);
        };
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        let discarded = self.data.try_iter().count();
        tracing::info!(discarded, "acquisition worker stopped");
        result
    }

    pub fn close(mut self) -> Result<(), AcquisitionError> {
        self.stop()
    }

    fn send(&self, command: Command) -> Result<(), AcquisitionError> {
        if !self.running {
            return Err(AcquisitionError::NotRunning);
        }
        self.commands
            .send(command)
            .map_err(|_| AcquisitionError::WorkerGone)
    }

    fn await_status(&self, timeout: Duration) -> Result<Status, AcquisitionError> {
        self.status.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => AcquisitionError::ShutdownTimeout(timeout),
            RecvTimeoutError::Disconnected => AcquisitionError::WorkerGone,
        })
    }
}

impl Drop for AcquisitionWorker {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            tracing::warn!(error = %err, "acquisition worker dropped while running");
        }
    }
}

fn open_board(options: &WorkerOptions) -> Result<Box<dyn Board>, AcquisitionError> {
    if options.simulated {
        return Ok(Box::new(SyntheticBoard::new(options.sample_rate)));
    }
    let port = match &options.port {
        Some(port) => port.clone(),
        None => list_ports(false)
            .into_iter()
            .next()
            .ok_or_else(|| AcquisitionError::DeviceNotConnected("no serial port found".into()))?,
    };
    let board = CytonBoard::open(&port, options.sample_rate, &options.channels)?;
    Ok(Box::new(board))
}

struct WorkerLoop {
    board: Box<dyn Board>,
    commands: Receiver<Command>,
    data: Sender<Sample>,
    status: Sender<Status>,
    marker: Arc<AtomicCell<Option<i32>>>,
    pid_path: PathBuf,
    streaming: bool,
    timestamp: u64,
    read_failures: u32,
    spool: Option<SpoolSet>,
    /// First failure of the current test, reported by the next recording reply.
    fault: Option<AcquisitionError>,
}

impl WorkerLoop {
    fn run(mut self) {
        if let Err(err) = fs::write(&self.pid_path, std::process::id().to_string()) {
            tracing::warn!(path = %self.pid_path.display(), error = %err, "cannot write pid file");
        }
        let _ = self.status.send(Status::Ready);

        loop {
            match self.commands.try_recv() {
                Ok(Command::Stop) | Err(TryRecvError::Disconnected) => break,
                Ok(command) => self.handle(command),
                Err(TryRecvError::Empty) => {}
            }

            if !self.streaming {
                thread::sleep(POLL_INTERVAL);
                continue;
            }
            match self.board.read() {
                Ok(raw) if raw.is_empty() => {
                    self.read_failures = 0;
                    thread::sleep(POLL_INTERVAL);
                }
                Ok(raw) => {
                    self.read_failures = 0;
                    for raw in raw {
                        let sample = Sample {
                            index: raw.index,
                            timestamp: self.timestamp,
                            horizontal: raw.horizontal(),
                            vertical: raw.vertical(),
                            marker: self.marker.take(),
                        };
                        self.timestamp += 1;
                        self.persist(&sample);
                        let _ = self.data.send(sample);
                    }
                }
                Err(err) => self.read_failed(err),
            }
        }

        self.shutdown();
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Start => {
                let reply = self.start_stream();
                let _ = self.status.send(Status::Streaming(reply));
            }
            Command::StartRecording(dir) => {
                let reply = self.start_recording(&dir);
                if reply.is_ok() {
                    tracing::debug!(dir = %dir.display(), "recording started");
                }
                let _ = self.status.send(Status::Recording(reply));
            }
            Command::StopRecording => {
                let reply = match (self.fault.take(), self.spool.take()) {
                    (Some(err), spool) => {
                        if let Some(spool) = spool {
                            spool.discard();
                        }
                        Err(err)
                    }
                    (None, Some(spool)) => spool.finish(),
                    (None, None) => Err(AcquisitionError::NotRecording),
                };
                let _ = self.status.send(Status::Saved(reply));
            }
            Command::Stop => {}
        }
    }

    fn start_stream(&mut self) -> Result<(), AcquisitionError> {
        if self.streaming {
            return Ok(());
        }
        if let Err(err) = self.board.start_stream() {
            tracing::error!(error = %err, "cannot start streaming");
            return Err(err);
        }
        self.streaming = true;
        self.timestamp = 0;
        self.read_failures = 0;
        tracing::debug!("streaming started");
        Ok(())
    }

    fn start_recording(&mut self, dir: &Path) -> Result<(), AcquisitionError> {
        if let Some(err) = self.fault.take() {
            return Err(err);
        }
        if !self.streaming {
            return Err(AcquisitionError::NotStreaming);
        }
        self.finish_spool()?;
        self.spool = Some(SpoolSet::create(dir)?);
        Ok(())
    }

    fn read_failed(&mut self, err: AcquisitionError) {
        self.read_failures += 1;
        if self.read_failures < MAX_READ_FAILURES {
            tracing::warn!(error = %err, failures = self.read_failures, "board read failed");
            thread::sleep(POLL_INTERVAL);
            return;
        }

        tracing::error!(error = %err, failures = self.read_failures, "board lost, streaming stopped");
        self.streaming = false;
        if let Err(stop_err) = self.board.stop_stream() {
            tracing::debug!(error = %stop_err, "cannot stop lost board");
        }
        let failures = self.read_failures;
        self.fail(AcquisitionError::BoardLost {
            failures,
            source: Box::new(err),
        });
    }

    fn persist(&mut self, sample: &Sample) {
        let Some(spool) = self.spool.as_mut() else {
            return;
        };
        if let Err(err) = spool.append(sample) {
            tracing::error!(dir = %spool.dir().display(), error = %err, "spooling failed, recording dropped");
            self.fail(err);
        }
    }

    /// Abandons the open recording and keeps `err` for the next reply.
    fn fail(&mut self, err: AcquisitionError) {
        if let Some(spool) = self.spool.take() {
            spool.discard();
        }
        if self.fault.is_none() {
            self.fault = Some(err);
        }
    }

    /// Converts a spool left open by a previous test.
    fn finish_spool(&mut self) -> Result<(), AcquisitionError> {
        if let Some(spool) = self.spool.take() {
            tracing::warn!(dir = %spool.dir().display(), "closing unfinished recording");
            spool.finish()?;
        }
        Ok(())
    }

    fn shutdown(mut self) {
        if self.streaming {
            if let Err(err) = self.board.stop_stream() {
                tracing::warn!(error = %err, "cannot stop streaming");
            }
        }
        let result = match self.fault.take() {
            Some(err) => {
                if let Some(spool) = self.spool.take() {
                    spool.discard();
                }
                Err(err)
            }
            None => self.finish_spool(),
        };
        if let Err(err) = &result {
            tracing::error!(error = %err, "recording lost at shutdown");
        }
        if let Err(err) = fs::remove_file(&self.pid_path) {
            tracing::warn!(path = %self.pid_path.display(), error = %err, "cannot remove pid file");
        }
        let _ = self.status.send(Status::Stopped(result));
    }
}
