/// Category of a bus error. Lets callers decide how to react
/// (fail the deployment, report upstream, treat as aborted).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed URL or unknown scheme — permanent.
    Config,
    /// Topic or subscription does not exist.
    NotFound,
    /// Transport failure (unreachable provider, quota, auth) — transient.
    Io,
    /// Handle already shut down or the topic was closed.
    Closed,
    /// The caller cancelled the operation.
    Cancelled,
    /// The caller's deadline passed before the operation completed.
    DeadlineExceeded,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Config => f.write_str("config"),
            ErrorKind::NotFound => f.write_str("not found"),
            ErrorKind::Io => f.write_str("io"),
            ErrorKind::Closed => f.write_str("closed"),
            ErrorKind::Cancelled => f.write_str("cancelled"),
            ErrorKind::DeadlineExceeded => f.write_str("deadline exceeded"),
        }
    }
}

/// Unified error type returned by every bus trait method.
///
/// Carries an `ErrorKind` for categorization and a human-readable message.
/// `From` impls assign the kind automatically so drivers can use `?`.
#[derive(Clone, PartialEq, Eq)]
pub struct BusError {
    kind: ErrorKind,
    message: String,
}

impl BusError {
    pub fn new(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self { kind, message: msg.into() }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, msg)
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, msg)
    }

    pub fn closed(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Closed, msg)
    }

    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, msg)
    }

    pub fn deadline_exceeded(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::DeadlineExceeded, msg)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Add context to the error, preserving the original ErrorKind.
    ///
    /// Produces: `"context: original message"`.
    pub fn with_context(self, ctx: impl std::fmt::Display) -> Self {
        Self {
            kind: self.kind,
            message: format!("{ctx}: {}", self.message),
        }
    }
}

impl std::fmt::Debug for BusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl std::fmt::Display for BusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for BusError {}

impl From<std::io::Error> for BusError {
    fn from(e: std::io::Error) -> Self { Self::io(e.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_context_keeps_kind() {
        let err = BusError::io("connection refused").with_context("open kafka://builds");
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(err.to_string(), "open kafka://builds: connection refused");
    }

    #[test]
    fn debug_shows_kind() {
        let err = BusError::closed("handle shut down");
        assert_eq!(format!("{err:?}"), "[closed] handle shut down");
    }
}
