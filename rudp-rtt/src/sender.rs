//! Outbound frame state for stop-and-wait reliability.
//!
//! [`Sender`] tracks sequence numbers and the single in-flight frame.
//! It does **not** touch the socket; [`crate::client::Client`] calls these
//! methods and owns the actual send/receive loop.
//!
//! # Stop-and-Wait contract
//! - At most **one** frame is in flight at any moment.
//! - A new frame may only be started once the previous one reached
//!   [`FrameState::AckMatched`].
//! - On matching ACK: advance `next_seq`; yield one RTT sample.
//! - On mismatched ACK: nothing changes.
//! - On timeout: bump the retransmit count; resend the same bytes unchanged.

use std::time::Duration;

use tokio::time::Instant;

use crate::packet::{Ack, Frame};
use crate::state::FrameState;

/// The frame currently owned by the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
struct InFlight {
    seq: u32,
    /// Encoded frame; every (re)transmission sends exactly these bytes.
    wire: Vec<u8>,
    state: FrameState,
    /// Retransmissions so far (0 = only the first send).
    retransmits: u32,
    /// Monotonic time of the most recent transmission.
    sent_at: Option<Instant>,
}

/// What an inbound ack did to the in-flight frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// The ack matched; the frame is done and took `rtt`.
    Matched { seq: u32, rtt: Duration },
    /// Stale, reordered or foreign ack; ignored.
    Discarded { expected: u32, got: u32 },
}

/// Stop-and-wait send-side state for one run.
#[derive(Debug)]
pub struct Sender {
    /// Sequence number the next [`start_frame`](Self::start_frame) will use.
    pub next_seq: u32,
    payload_len: usize,
    in_flight: Option<InFlight>,
}

impl Sender {
    /// Sequence numbers start at 1.
    pub fn new(payload_len: usize) -> Self {
        Self {
            next_seq: 1,
            payload_len,
            in_flight: None,
        }
    }

    /// Build the next frame and make it the in-flight one (state `Idle`).
    ///
    /// Returns the sequence number assigned.
    pub fn start_frame(&mut self) -> u32 {
        debug_assert!(
            !self.has_unacked(),
            "start_frame called while a frame is still awaiting its ack"
        );
        let seq = self.next_seq;
        self.in_flight = Some(InFlight {
            seq,
            wire: Frame::filled(seq, self.payload_len).encode(),
            state: FrameState::Idle,
            retransmits: 0,
            sent_at: None,
        });
        seq
    }

    /// Bytes to put on the wire for the in-flight frame.
    pub fn wire(&self) -> Option<&[u8]> {
        self.in_flight.as_ref().map(|f| f.wire.as_slice())
    }

    /// Record that the in-flight frame was just handed to the transport.
    ///
    /// Called for the first send and for every retransmission.
    pub fn record_sent(&mut self, now: Instant) {
        if let Some(f) = self.in_flight.as_mut() {
            f.state = FrameState::Sent;
            f.sent_at = Some(now);
        }
    }

    /// Process an inbound ack observed at `now`.
    pub fn on_ack(&mut self, ack: Ack, now: Instant) -> AckOutcome {
        let Some(f) = self.in_flight.as_mut() else {
            return AckOutcome::Discarded {
                expected: 0,
                got: ack.seq,
            };
        };
        if f.state != FrameState::Sent || ack.seq != f.seq {
            return AckOutcome::Discarded {
                expected: f.seq,
                got: ack.seq,
            };
        }

        // Never negative under a monotonic clock.
        let rtt = f
            .sent_at
            .map_or(Duration::ZERO, |sent| now.saturating_duration_since(sent));
        f.state = FrameState::AckMatched;
        self.next_seq = f.seq.wrapping_add(1);
        AckOutcome::Matched { seq: f.seq, rtt }
    }

    /// The RTO elapsed without a matching ack. Returns the new retransmit count.
    pub fn on_timeout(&mut self) -> u32 {
        match self.in_flight.as_mut() {
            Some(f) if !f.state.is_terminal() => {
                f.state = FrameState::TimedOut;
                f.retransmits += 1;
                f.retransmits
            }
            _ => 0,
        }
    }

    /// State of the in-flight frame, `Idle` when there is none.
    pub fn state(&self) -> FrameState {
        self.in_flight.as_ref().map_or(FrameState::Idle, |f| f.state)
    }

    /// `true` when a frame is waiting for its ack.
    pub fn has_unacked(&self) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|f| !f.state.is_terminal())
    }
}
