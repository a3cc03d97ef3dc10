//! Utility types for trait definitions.
use std::fmt;

/// Type to handle errors arising from plan construction and transform execution.
#[derive(Debug)]
pub enum FftError {
    /// The per-rank boxes do not tile the global box (overlap, gap, or
    /// mismatched global domains).
    InvalidPartition(String),

    /// The real-to-complex axis lies outside `{0, 1, 2}`.
    InvalidR2cAxis(usize),

    /// The requested 1D engine is not compiled into this build.
    UnsupportedBackend(String),

    /// A caller-provided buffer cannot be reinterpreted at the plan's
    /// precision.
    PrecisionMismatch(String),

    /// An input, output, or workspace buffer is smaller than the advertised
    /// size.
    SizeMismatch {
        /// Which buffer failed the check.
        what: &'static str,

        /// Required element count.
        expected: usize,

        /// Element count actually supplied.
        found: usize,
    },

    /// The underlying transport reported a failure.
    Comm(CommError),

    /// A 1D FFT engine reported a failure.
    Executor(String),
}

/// Type to handle errors raised by a group-communication backend.
#[derive(Debug)]
pub enum CommError {
    /// The transport layer failed to move data.
    Transport(String),

    /// A collective was invoked with an inconsistent group description.
    InvalidGroup(String),
}

impl fmt::Display for FftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FftError::InvalidPartition(e) => write!(f, "invalid partition: {}", e),
            FftError::InvalidR2cAxis(axis) => {
                write!(f, "invalid real-to-complex axis: {}, must be 0, 1 or 2", axis)
            }
            FftError::UnsupportedBackend(e) => write!(f, "unsupported backend: {}", e),
            FftError::PrecisionMismatch(e) => write!(f, "precision mismatch: {}", e),
            FftError::SizeMismatch {
                what,
                expected,
                found,
            } => write!(
                f,
                "size mismatch: {} holds {} elements, need at least {}",
                what, found, expected
            ),
            FftError::Comm(e) => write!(f, "communication failure: {}", e),
            FftError::Executor(e) => write!(f, "executor failure: {}", e),
        }
    }
}

impl fmt::Display for CommError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommError::Transport(e) => write!(f, "transport: {}", e),
            CommError::InvalidGroup(e) => write!(f, "invalid group: {}", e),
        }
    }
}

impl std::error::Error for FftError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FftError::Comm(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for CommError {}

impl From<CommError> for FftError {
    fn from(e: CommError) -> Self {
        FftError::Comm(e)
    }
}
