//! Request lifecycle tracking.

use serde::{Deserialize, Serialize};

/// Which kind of request is being processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Not decided yet.
    #[default]
    Unknown,
    /// Initial page render.
    Preceding,
    /// Follow-up update request carrying a snapshot.
    Subsequent,
}

impl Mode {
    /// Check if the mode has not been decided yet.
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Check if this is an initial page render.
    pub fn is_preceding(&self) -> bool {
        matches!(self, Self::Preceding)
    }

    /// Check if this is a follow-up update request.
    pub fn is_subsequent(&self) -> bool {
        matches!(self, Self::Subsequent)
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Preceding => write!(f, "preceding"),
            Self::Subsequent => write!(f, "subsequent"),
        }
    }
}

/// Lifecycle misuse errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("state already started, this can only happen once")]
    AlreadyStarted,
}

/// Per-request lifecycle state.
///
/// The mode is written once and the active flag flips exactly once.
#[derive(Debug, Clone, Default)]
pub struct State {
    mode: Mode,
    active: Option<bool>,
}

impl State {
    /// Create a fresh, inactive state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the state as active.
    pub fn start(&mut self) -> Result<&mut Self, StateError> {
        if self.active.is_some() {
            return Err(StateError::AlreadyStarted);
        }

        self.active = Some(true);
        Ok(self)
    }

    /// Whether `start` has been called.
    pub fn is_active(&self) -> bool {
        self.active.unwrap_or(false)
    }

    /// Inverse of [`State::is_active`].
    pub fn is_inactive(&self) -> bool {
        !self.is_active()
    }

    /// The current mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Set the mode if it is still unknown. Returns the effective mode.
    pub fn set_mode(&mut self, mode: Mode) -> Mode {
        if self.mode.is_unknown() {
            self.mode = mode;
        }
        self.mode
    }
}
