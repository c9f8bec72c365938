//! Domain error type for the simulation core.
//!
//! Every fallible core operation returns [`Error`]. Each variant carries a
//! formatted message plus the source location where it was raised and a
//! captured stack trace, mirroring the `tit::Exception` contract the engine
//! was built around: errors are diagnosable after the fact, not just at the
//! throw site.
//!
//! Contract violations (broken invariants that indicate a bug rather than a
//! recoverable condition) use [`tit_assert`] instead of this type: they panic
//! in debug builds and are not catchable.

use std::backtrace::Backtrace;
use std::fmt;
use std::panic::Location;

/// The kinds of domain errors the core can raise.
///
/// This is the "kind" half of [`Error`]; the location and backtrace are
/// attached uniformly by [`Error::new`] rather than duplicated per variant.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    #[error("singular matrix (|det| <= eps * norm)")]
    SingularMatrix,

    #[error("invalid search radius: {0}")]
    InvalidRadius(f64),

    #[error("bucket index {index} out of range (nominal bucket count {count})")]
    BucketIndexOutOfRange { index: usize, count: usize },

    #[error("unknown series id {0}")]
    UnknownSeries(u64),

    #[error("frame time {new} is not strictly greater than last frame time {last}")]
    FrameTimeNotMonotonic { last: f64, new: f64 },

    #[error("array {0:?} already exists in this frame")]
    ArrayExists(String),

    #[error("array byte count {bytes} does not divide evenly by element width {width}")]
    TruncatedArray { bytes: usize, width: usize },

    #[error("compressed stream ended without a terminal frame")]
    TruncatedStream,

    #[error("malformed environment variable {name}={value:?}")]
    BadEnvValue { name: String, value: String },

    #[error("equation of state precondition violated: {0}")]
    InvalidState(String),

    #[error("simulation diverged: {0}")]
    SimulationDiverged(String),

    #[error("clustering did not converge after {iterations} iterations")]
    ClusteringDidNotConverge { iterations: usize },

    #[error("external failure: {0}")]
    External(String),

    #[error("storage error: {0}")]
    Storage(String),
}

/// A domain error: a formatted message, the call site that raised it, and a
/// captured stack trace.
pub struct Error {
    kind: ErrorKind,
    location: &'static Location<'static>,
    backtrace: Backtrace,
}

impl Error {
    /// Construct an error at the caller's location, capturing a backtrace.
    #[track_caller]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            location: Location::caller(),
            backtrace: Backtrace::capture(),
        }
    }

    /// The error kind.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Source location where this error was raised.
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    /// The captured stack trace (only populated if `RUST_BACKTRACE` is set;
    /// see [`std::backtrace::Backtrace`]).
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}",
            self.location.file(),
            self.location.line(),
            self.location.column(),
            self.kind
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}",
            self.location.file(),
            self.location.line(),
            self.location.column(),
            self.kind
        )
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl From<rusqlite::Error> for Error {
    #[track_caller]
    fn from(e: rusqlite::Error) -> Self {
        Error::new(ErrorKind::Storage(e.to_string()))
    }
}

impl From<std::io::Error> for Error {
    #[track_caller]
    fn from(e: std::io::Error) -> Self {
        Error::new(ErrorKind::External(e.to_string()))
    }
}

/// Convenience alias used throughout the core.
pub type Result<T> = std::result::Result<T, Error>;

/// Raise an [`ErrorKind`] as an [`Error`] at the call site.
#[macro_export]
macro_rules! tit_throw {
    ($kind:expr) => {
        return Err($crate::error::Error::new($kind))
    };
}

/// Contract assertion: checked in debug builds, unreachable in release.
///
/// Unlike [`Error`], a failed `tit_assert!` is not a recoverable condition —
/// it indicates a bug in the caller and is never caught.
#[macro_export]
macro_rules! tit_assert {
    ($cond:expr) => {
        debug_assert!($cond, "contract violation: {}", stringify!($cond))
    };
    ($cond:expr, $($arg:tt)+) => {
        debug_assert!($cond, $($arg)+)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_carries_location() {
        #[track_caller]
        fn raise() -> Result<()> {
            tit_throw!(ErrorKind::SingularMatrix);
        }
        let err = raise().unwrap_err();
        assert!(err.location().file().ends_with("error.rs"));
        assert!(matches!(err.kind(), ErrorKind::SingularMatrix));
    }

    #[test]
    fn display_includes_location_and_message() {
        let err = Error::new(ErrorKind::InvalidRadius(-1.0));
        let text = format!("{err}");
        assert!(text.contains("invalid search radius"));
        assert!(text.contains("error.rs"));
    }
}
