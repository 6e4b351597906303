//! Exec instance lifecycle as observed through inspect.

/// Observed lifecycle state of an exec instance.
///
/// The engine owns this state; the client only derives it from inspect
/// snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecState {
    /// Exec has been created but not started.
    #[default]
    Created,
    /// Process is running.
    Running,
    /// Process has exited with the given code.
    Exited(i64),
}

impl ExecState {
    /// Derive the state from the inspect fields.
    pub fn from_parts(running: bool, exit_code: Option<i64>) -> Self {
        match (running, exit_code) {
            (true, _) => ExecState::Running,
            (false, Some(code)) => ExecState::Exited(code),
            (false, None) => ExecState::Created,
        }
    }

    /// Check if a later observation may follow this one.
    ///
    /// Valid transitions:
    /// - Created -> Running
    /// - Created -> Exited (process finished between two observations)
    /// - Running -> Exited
    /// - any state -> itself
    pub fn can_transition_to(&self, target: ExecState) -> bool {
        use ExecState::*;
        *self == target
            || matches!(
                (*self, target),
                (Created, Running) | (Created, Exited(_)) | (Running, Exited(_))
            )
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecState::Exited(_))
    }

    /// Exit code, once exited.
    pub fn exit_code(&self) -> Option<i64> {
        match self {
            ExecState::Exited(code) => Some(*code),
            _ => None,
        }
    }
}
