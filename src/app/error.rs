use std::fmt;

use thiserror::Error;

/// Session phase in which a failure occurred. Carried by timeout and
/// session errors so callers can tell where the lifecycle broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Launch,
    Authenticate,
    ContentWait,
    Extract,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Launch => "launch",
            Phase::Authenticate => "authentication",
            Phase::ContentWait => "content wait",
            Phase::Extract => "extraction",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum TrendwatchError {
    /// Malformed or missing required settings. Fatal at startup.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The proxy auth bundle could not be built. The session degrades to a
    /// direct connection instead of aborting.
    #[error("Proxy injection failed: {0}")]
    ProxyInjection(String),

    /// A bounded wait expired. Fatal to the session, triggers teardown.
    #[error("Timed out after {waited_secs}s waiting for {target} ({phase} phase)")]
    Timeout {
        phase: Phase,
        target: String,
        waited_secs: u64,
    },

    /// Any other session-level failure, tagged with the phase it broke in.
    #[error("{phase} failed: {message}")]
    Session {
        phase: Phase,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TrendwatchError {
    pub fn session(phase: Phase, message: impl Into<String>) -> Self {
        Self::Session {
            phase,
            message: message.into(),
            source: None,
        }
    }

    pub fn session_with(
        phase: Phase,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Session {
            phase,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// The phase this error is tagged with, if it is a session-level failure.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::Timeout { phase, .. } | Self::Session { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TrendwatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_carries_phase_and_target() {
        let err = TrendwatchError::Timeout {
            phase: Phase::Authenticate,
            target: "username input".into(),
            waited_secs: 20,
        };
        let msg = err.to_string();
        assert!(msg.contains("20s"));
        assert!(msg.contains("username input"));
        assert!(msg.contains("authentication"));
    }

    #[test]
    fn test_session_error_exposes_source() {
        let inner = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let err = TrendwatchError::session_with(Phase::Launch, "failed to launch browser", inner);
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("boom"));
    }

    #[test]
    fn test_phase_accessor() {
        assert_eq!(
            TrendwatchError::session(Phase::Extract, "oops").phase(),
            Some(Phase::Extract)
        );
        assert_eq!(TrendwatchError::Config("x".into()).phase(), None);
    }
}
