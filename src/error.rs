use thiserror::Error;

/// How a [`FlowError`] affects the flow it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Blocks one transition; cleared by the next valid input.
    Validation,
    /// The action makes no sense in the current step.
    Transition,
    /// Token creation failed; the same step may be retried.
    Submission,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("Identity number must be 12 digits (got {found})")]
    InvalidIdLength { found: usize },

    #[error("Please enter all 6 digits of the OTP")]
    IncompleteOtp,

    #[error("Invalid OTP, please try again")]
    OtpMismatch,

    #[error("Resend is available in {wait_secs} seconds")]
    ResendLocked { wait_secs: i64 },

    #[error("Scanning is in progress and cannot be cancelled")]
    ScanInProgress,

    #[error("Please enter your symptoms")]
    EmptySymptoms,

    #[error("Selected slot has no identifier and cannot be booked")]
    SlotWithoutId,

    #[error("Selected slot is already booked")]
    SlotBooked,

    #[error("Please select a {0}")]
    MissingSelection(&'static str),

    #[error("Tokens can only be generated for today")]
    NotToday,

    #[error("No such {0}")]
    UnknownSelection(&'static str),

    #[error("Cannot {action} while {step}")]
    InvalidTransition {
        action: &'static str,
        step: &'static str,
    },

    #[error("A token request is in progress")]
    TokenPending,

    #[error("Failed to generate token: {0}")]
    Submission(String),
}

impl FlowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FlowError::InvalidTransition { .. }
            | FlowError::ScanInProgress
            | FlowError::TokenPending => ErrorKind::Transition,
            FlowError::Submission(_) => ErrorKind::Submission,
            _ => ErrorKind::Validation,
        }
    }

    pub(crate) fn transition(action: &'static str, step: &'static str) -> Self {
        FlowError::InvalidTransition { action, step }
    }
}
