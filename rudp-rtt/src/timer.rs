//! Retransmit timer.
//!
//! Stop-and-wait needs exactly one timer: the deadline by which the in-flight
//! frame's ack must arrive. The retransmission timeout (RTO) is fixed for the
//! whole run; there is no RTT-driven adaptation and no back-off.
//!
//! Deadlines are [`tokio::time::Instant`]s so the clock is monotonic and can be
//! paused in tests.

use std::time::Duration;

use tokio::time::Instant;

/// Default RTO.
pub const DEFAULT_RTO: Duration = Duration::from_millis(200);

/// Fixed-RTO deadline tracker for the single in-flight frame.
#[derive(Debug, Clone)]
pub struct RetransmitTimer {
    rto: Duration,
    deadline: Option<Instant>,
}

impl Default for RetransmitTimer {
    fn default() -> Self {
        Self::new(DEFAULT_RTO)
    }
}

impl RetransmitTimer {
    pub fn new(rto: Duration) -> Self {
        Self {
            rto,
            deadline: None,
        }
    }

    pub fn rto(&self) -> Duration {
        self.rto
    }

    /// Arm the timer for a transmission made at `sent_at` and return the deadline.
    ///
    /// Re-arming replaces any previous deadline.
    pub fn arm(&mut self, sent_at: Instant) -> Instant {
        let deadline = sent_at + self.rto;
        self.deadline = Some(deadline);
        deadline
    }

    /// Disarm after the matching ack arrived.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Current deadline, if armed.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// `true` when armed and `now` is at or past the deadline.
    pub fn expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|d| now >= d)
    }
}
