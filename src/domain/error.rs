//! Failure taxonomy for gateway calls
//!
//! Both gateway operations fail by returning one of these variants, always
//! carrying a human-readable message. Business rejections (invalid code,
//! commit refused) are not errors; they are outcome variants.

use thiserror::Error;

/// Failure of a `CheckInGateway` call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The gateway could not be reached or the call did not complete
    #[error("gateway unreachable: {0}")]
    Transport(String),
    /// The backend answered with an unexpected failure
    #[error("backend failure: {0}")]
    Backend(String),
}

impl GatewayError {
    pub fn as_str(&self) -> &str {
        match self {
            GatewayError::Transport(_) => "transport",
            GatewayError::Backend(_) => "backend",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_message() {
        let err = GatewayError::Transport("connection refused".to_string());
        assert_eq!(err.to_string(), "gateway unreachable: connection refused");
        let err = GatewayError::Backend("internal error".to_string());
        assert_eq!(err.to_string(), "backend failure: internal error");
    }

    #[test]
    fn test_as_str() {
        assert_eq!(GatewayError::Transport(String::new()).as_str(), "transport");
        assert_eq!(GatewayError::Backend(String::new()).as_str(), "backend");
    }
}
