/// Lifecycle of the stimulus player during one test.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default)]
pub enum PlayerState {
    #[default]
    Idle,
    ShowingMessage,
    Running,
    Finished,
}

impl PlayerState {
    /// Whether an operator "continue" should start the stimulus.
    pub fn awaits_continue(&self) -> bool {
        matches!(self, Self::ShowingMessage)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Whether an operator abort has anything to interrupt.
    pub fn is_abortable(&self) -> bool {
        matches!(self, Self::ShowingMessage | Self::Running)
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished)
    }
}
