use thiserror::Error;

/// Errors surfaced synchronously by timer operations. Configuration errors
/// leave no partial state behind; state errors leave the session untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TimerError {
    #[error("duration must be positive and finite")]
    InvalidDuration,
    #[error("cycle target must be greater than zero")]
    InvalidCycleCount,
    #[error("a session is already active")]
    AlreadyRunning,
    #[error("no running session")]
    NotRunning,
    #[error("no paused session")]
    NotPaused,
    #[error("laps require a running stopwatch")]
    LapUnavailable,
}
