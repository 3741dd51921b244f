//! Error taxonomy for the agent controller

/// Errors raised by perception, navigation and configuration.
///
/// Only `InvalidConfiguration` and the config loading variants ever reach a
/// caller. `SensorUnavailable` and `NavigatorRejected` are absorbed by the
/// state machine, which falls back to "no target" and "hold position".
#[derive(Debug, Clone, PartialEq)]
pub enum AiError {
    /// Overlap query or raycast collaborator failed
    SensorUnavailable(String),
    /// Navigator refused a destination
    NavigatorRejected(String),
    /// Configuration rejected at construction time
    InvalidConfiguration(String),
    /// Configuration file could not be read
    ConfigIo(String),
    /// Configuration file could not be parsed
    ConfigParse(String),
}

impl AiError {
    /// Whether the state machine recovers from this error locally.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::SensorUnavailable(_) | Self::NavigatorRejected(_))
    }
}

impl std::fmt::Display for AiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SensorUnavailable(e) => write!(f, "Sensor unavailable: {e}"),
            Self::NavigatorRejected(e) => write!(f, "Navigator rejected destination: {e}"),
            Self::InvalidConfiguration(e) => write!(f, "Invalid configuration: {e}"),
            Self::ConfigIo(e) => write!(f, "Config IO error: {e}"),
            Self::ConfigParse(e) => write!(f, "Config parse error: {e}"),
        }
    }
}

impl std::error::Error for AiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(AiError::SensorUnavailable("offline".into()).is_transient());
        assert!(AiError::NavigatorRejected("unreachable".into()).is_transient());
        assert!(!AiError::InvalidConfiguration("radius".into()).is_transient());
        assert!(!AiError::ConfigParse("eof".into()).is_transient());
    }

    #[test]
    fn test_display() {
        let err = AiError::InvalidConfiguration("radius must be > 0".into());
        assert_eq!(err.to_string(), "Invalid configuration: radius must be > 0");
    }
}
