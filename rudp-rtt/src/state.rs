//! Per-frame finite-state machine types.
//!
//! Transitions are driven by [`crate::sender::Sender`]; this module only
//! names the states.

/// Lifecycle of a single frame.
///
/// ```text
///  IDLE ──send──▶ SENT ──matching ack──▶ ACK_MATCHED
///                  │ ▲
///        timeout   │ │ resend
///                  ▼ │
///               TIMED_OUT
/// ```
///
/// A mismatched ack leaves the frame in `Sent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameState {
    /// Built but not yet handed to the transport.
    #[default]
    Idle,
    /// On the wire; waiting for the matching ack.
    Sent,
    /// The RTO elapsed without a matching ack; the frame will be resent.
    TimedOut,
    /// Terminal: the matching ack arrived.
    AckMatched,
}

impl FrameState {
    /// `true` once the frame needs no further transmissions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::AckMatched)
    }
}

impl std::fmt::Display for FrameState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Sent => "sent",
            Self::TimedOut => "timed-out",
            Self::AckMatched => "ack-matched",
        };
        f.write_str(name)
    }
}
