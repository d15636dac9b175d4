//! Capture stream lifecycle
//!
//! `Closed -> Opened -> Configured -> Prepared -> Streaming -> Closed`.
//! Renegotiation is allowed until the stream is prepared, and closing is
//! valid from any state.

use std::fmt;

use crate::error::CaptureError;

/// State of a capture stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamState {
    #[default]
    Closed,
    Opened,
    Configured,
    Prepared,
    Streaming,
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Closed => "closed",
            Self::Opened => "opened",
            Self::Configured => "configured",
            Self::Prepared => "prepared",
            Self::Streaming => "streaming",
        };
        f.write_str(name)
    }
}

/// Operations that drive the lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Open,
    Negotiate,
    Prepare,
    Read,
    Close,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Open => "open",
            Self::Negotiate => "negotiate",
            Self::Prepare => "prepare",
            Self::Read => "read",
            Self::Close => "close",
        };
        f.write_str(name)
    }
}

/// Tracks the state of a stream and validates transitions
#[derive(Debug, Default)]
pub struct Lifecycle {
    state: StreamState,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Check that `operation` is allowed and return the state it leads to
    pub fn check(&self, operation: Operation) -> Result<StreamState, CaptureError> {
        use StreamState::*;

        let next = match (operation, self.state) {
            (Operation::Open, Closed) => Opened,
            (Operation::Negotiate, Opened | Configured) => Configured,
            (Operation::Prepare, Configured) => Prepared,
            (Operation::Read, Prepared | Streaming) => Streaming,
            (Operation::Close, _) => Closed,
            _ => {
                return Err(CaptureError::InvalidTransition {
                    operation,
                    state: self.state,
                })
            }
        };
        Ok(next)
    }

    /// Move to `state` after the operation succeeded
    pub fn enter(&mut self, state: StreamState) {
        self.state = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_lifecycle() {
        let mut lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.state(), StreamState::Closed);

        for (operation, expected) in [
            (Operation::Open, StreamState::Opened),
            (Operation::Negotiate, StreamState::Configured),
            (Operation::Negotiate, StreamState::Configured),
            (Operation::Prepare, StreamState::Prepared),
            (Operation::Read, StreamState::Streaming),
            (Operation::Read, StreamState::Streaming),
            (Operation::Close, StreamState::Closed),
        ] {
            let next = lifecycle.check(operation).unwrap();
            assert_eq!(next, expected, "after {operation}");
            lifecycle.enter(next);
        }
    }

    #[test]
    fn test_out_of_order_operations() {
        let lifecycle = Lifecycle::new();
        for operation in [Operation::Negotiate, Operation::Prepare, Operation::Read] {
            assert!(matches!(
                lifecycle.check(operation),
                Err(CaptureError::InvalidTransition {
                    state: StreamState::Closed,
                    ..
                })
            ));
        }

        let mut lifecycle = Lifecycle::new();
        lifecycle.enter(StreamState::Opened);
        assert!(lifecycle.check(Operation::Prepare).is_err());
        assert!(lifecycle.check(Operation::Open).is_err());

        lifecycle.enter(StreamState::Streaming);
        assert!(lifecycle.check(Operation::Negotiate).is_err());
    }

    #[test]
    fn test_close_from_any_state() {
        for state in [
            StreamState::Closed,
            StreamState::Opened,
            StreamState::Configured,
            StreamState::Prepared,
            StreamState::Streaming,
        ] {
            let mut lifecycle = Lifecycle::new();
            lifecycle.enter(state);
            assert_eq!(lifecycle.check(Operation::Close).unwrap(), StreamState::Closed);
        }
    }

    #[test]
    fn test_error_message() {
        let err = Lifecycle::new().check(Operation::Read).unwrap_err();
        assert_eq!(err.to_string(), "Cannot read while stream is closed");
    }
}
