//! Operator signals polled once per scheduler tick.

use crossbeam::channel::{unbounded, Receiver, Sender};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorSignal {
    /// Dismiss the message and start the stimulus.
    Continue,
    Abort,
}

pub trait OperatorInput {
    fn poll(&mut self) -> Option<OperatorSignal>;
}

/// Starts every test as soon as its message is shown.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoContinue;

impl OperatorInput for AutoContinue {
    fn poll(&mut self) -> Option<OperatorSignal> {
        Some(OperatorSignal::Continue)
    }
}

/// Signals delivered from another thread, e.g. a key reader.
#[derive(Debug, Clone)]
pub struct ChannelInput {
    signals: Receiver<OperatorSignal>,
}

impl ChannelInput {
    pub fn new() -> (Sender<OperatorSignal>, Self) {
        let (tx, rx) = unbounded();
        (tx, Self { signals: rx })
    }
}

impl OperatorInput for ChannelInput {
    fn poll(&mut self) -> Option<OperatorSignal> {
        self.signals.try_recv().ok()
    }
}

impl<F> OperatorInput for F
where
    F: FnMut() -> Option<OperatorSignal>,
{
    fn poll(&mut self) -> Option<OperatorSignal> {
        self()
    }
}
