//! Stop-and-wait client: the send / await-ack / retransmit loop.
//!
//! A [`Client`] owns the socket, the [`Sender`] state machine, the
//! [`RetransmitTimer`] and the [`RttStats`] aggregate for one run. For each
//! sequence number `1..=frames` it:
//!
//! 1. sends the frame and stamps the send time from the monotonic clock,
//! 2. waits for a datagram until `send time + RTO`,
//! 3. on a matching ack records the RTT and moves on; on a mismatched or
//!    malformed ack keeps waiting for the same deadline; on expiry (or a
//!    receive error) resends the identical frame.
//!
//! There is no retry cap: a frame is resent until it is acknowledged.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::time::{timeout_at, Instant};

use crate::config::ClientConfig;
use crate::error::{is_timeout, Result};
use crate::packet::Ack;
use crate::sender::{AckOutcome, Sender};
use crate::simulator::Simulator;
use crate::socket::{DatagramSocket, Socket};
use crate::stats::RttStats;
use crate::timer::RetransmitTimer;

/// Receive buffer size; anything past [`ACK_LEN`](crate::packet::ACK_LEN) is ignored.
const RECV_BUF: usize = 64;

/// Outcome of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Frames the run was asked to deliver.
    pub requested: u32,
    /// Frames acknowledged (always equals `requested` once `run` returns).
    pub successful: u64,
    /// Retransmissions across all frames.
    pub retransmissions: u64,
    /// Retransmit count per sequence number, only for frames that needed any.
    pub retransmitted: BTreeMap<u32, u32>,
    /// Wall time of the run, from the monotonic clock.
    pub elapsed: Duration,
}

impl RunSummary {
    fn note_retransmit(&mut self, seq: u32) {
        self.retransmissions += 1;
        *self.retransmitted.entry(seq).or_insert(0) += 1;
    }

    /// Retransmissions of frame `seq`.
    pub fn retransmits_of(&self, seq: u32) -> u32 {
        self.retransmitted.get(&seq).copied().unwrap_or(0)
    }
}

/// Bind an ephemeral UDP socket for talking to `config.server`, wrapped in a
/// [`Simulator`] when simulated loss is configured.
pub async fn open_socket(config: &ClientConfig) -> Result<Box<dyn DatagramSocket>> {
    let socket = Socket::bind_for(config.server).await?;
    log::debug!("[client] bound {} for {}", socket.local_addr, config.server);
    Ok(match &config.loss {
        Some(loss) => Box::new(Simulator::new(socket, loss.clone())),
        None => Box::new(socket),
    })
}

/// One stop-and-wait measurement run.
pub struct Client<S> {
    socket: S,
    peer: SocketAddr,
    frames: u32,
    payload_len: usize,
    retransmit_log_interval: u32,
    sender: Sender,
    timer: RetransmitTimer,
    stats: RttStats,
}

impl<S: DatagramSocket> Client<S> {
    /// Build a client that will talk to `config.server` over `socket`.
    pub fn new(socket: S, config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            socket,
            peer: config.server,
            frames: config.frames,
            payload_len: config.payload_len,
            retransmit_log_interval: config.retransmit_log_interval,
            sender: Sender::new(config.payload_len),
            timer: RetransmitTimer::new(config.rto),
            stats: RttStats::new(config.bucket_width),
        })
    }

    /// Deliver every frame, then finalize the statistics.
    pub async fn run(&mut self) -> RunSummary {
        let started = Instant::now();
        let mut summary = RunSummary {
            requested: self.frames,
            ..RunSummary::default()
        };
        log::info!(
            "[client] sending {} frames of {} bytes to {} (rto={:?})",
            self.frames,
            self.payload_len,
            self.peer,
            self.timer.rto()
        );

        for _ in 0..self.frames {
            let seq = self.sender.start_frame();
            let rtt = self.deliver(seq, &mut summary).await;
            self.stats.record(rtt);
            summary.successful += 1;
        }

        self.stats.finalize(summary.successful);
        summary.elapsed = started.elapsed();
        log::info!(
            "[client] done: {} frames, {} retransmissions in {:?}",
            summary.successful,
            summary.retransmissions,
            summary.elapsed
        );
        summary
    }

    /// Drive frame `seq` to `AckMatched` and return its RTT.
    async fn deliver(&mut self, seq: u32, summary: &mut RunSummary) -> Duration {
        let mut buf = [0u8; RECV_BUF];
        loop {
            self.transmit(seq).await;
            if let Some(rtt) = self.await_ack(&mut buf).await {
                self.timer.cancel();
                log::debug!("[client] seq={seq} {} rtt={rtt:?}", self.sender.state());
                return rtt;
            }

            if !self.timer.expired(Instant::now()) {
                log::debug!("[client] seq={seq} resending before the RTO elapsed");
            }
            let n = self.sender.on_timeout();
            summary.note_retransmit(seq);
            log::trace!("[client] seq={seq} {}, retransmit #{n}", self.sender.state());
            if self.retransmit_log_interval > 0 && n % self.retransmit_log_interval == 0 {
                log::warn!("[client] seq {seq} retransmit count: {n}");
            }
        }
    }

    /// Hand the in-flight frame to the socket and arm the timer.
    ///
    /// A failed send is logged and otherwise treated as a lost datagram.
    async fn transmit(&mut self, seq: u32) {
        let now = Instant::now();
        if let Some(wire) = self.sender.wire() {
            if let Err(e) = self.socket.send_to(wire, self.peer).await {
                log::warn!("[client] send seq={seq} failed: {e}");
            }
        }
        self.sender.record_sent(now);
        self.timer.arm(now);
    }

    /// Wait until the armed deadline for the matching ack.
    ///
    /// Returns `None` when the frame must be retransmitted.
    async fn await_ack(&mut self, buf: &mut [u8]) -> Option<Duration> {
        let deadline = self.timer.deadline()?;
        loop {
            let (n, from) = match timeout_at(deadline, self.socket.recv_from(buf)).await {
                Ok(Ok(received)) => received,
                Err(_elapsed) => return None,
                Ok(Err(e)) if is_timeout(&e) => return None,
                Ok(Err(e)) => {
                    log::warn!("[client] recv failed: {e}");
                    return None;
                }
            };
            let now = Instant::now();

            let ack = match Ack::decode(&buf[..n]) {
                Ok(ack) => ack,
                Err(e) => {
                    log::debug!("[client] ignoring datagram from {from}: {e}");
                    continue;
                }
            };
            match self.sender.on_ack(ack, now) {
                AckOutcome::Matched { seq, rtt } => {
                    if ack.bytes_received as usize != self.payload_len {
                        log::debug!(
                            "[client] seq={seq} responder saw {} bytes, sent {}",
                            ack.bytes_received,
                            self.payload_len
                        );
                    }
                    return Some(rtt);
                }
                AckOutcome::Discarded { expected, got } => {
                    log::debug!("[client] discarding ack seq={got} while waiting for seq={expected}");
                }
            }
        }
    }

    /// Aggregates collected so far.
    pub fn stats(&self) -> &RttStats {
        &self.stats
    }

    /// Write the run report to `path` (best effort).
    pub fn write_report(&self, path: &std::path::Path) {
        self.stats
            .write_report(self.payload_len, u64::from(self.frames), path);
    }

    pub fn socket(&self) -> &S {
        &self.socket
    }
}
