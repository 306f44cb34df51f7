use thiserror::Error;

/// Failures surfaced by maze construction, reset and step.
///
/// Each kind is distinct so a harness can decide whether to recover (for
/// example regenerate and persist a fresh layout) or abort.
#[derive(Debug, Error)]
pub enum MazeError {
    /// Invalid or unrecognized configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No valid agent/goal placement after bounded regeneration.
    #[error("placement failure: fewer than two passage cells after {attempts} attempt(s)")]
    Placement { attempts: u32 },

    /// Persisted layout missing, malformed, or of the wrong size.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// API called in the wrong episode phase or with an invalid argument.
    #[error("usage error: {0}")]
    Usage(String),
}

impl MazeError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }
}

impl From<std::io::Error> for MazeError {
    fn from(err: std::io::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MazeError>;
