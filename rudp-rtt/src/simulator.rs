//! Fault-injecting socket wrapper.
//!
//! Real networks drop packets. To exercise the retransmit path without
//! depending on actual network conditions, [`Simulator`] wraps any
//! [`DatagramSocket`] and silently swallows outbound datagrams according to a
//! configurable fault model:
//!
//! | Fault          | Description                                            |
//! |----------------|--------------------------------------------------------|
//! | Random loss    | Drop each datagram with probability `loss_rate`.       |
//! | Scripted drop  | Drop the first `times` sends of frame `seq`.           |
//!
//! A dropped send still reports success to the caller, exactly like a datagram
//! lost somewhere past the local interface. Receives pass through untouched.
//! Supplying a `seed` makes random loss reproducible.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Result, RudpError};
use crate::packet::Frame;
use crate::socket::{DatagramSocket, RecvFuture, SendFuture};

/// Drop the first `times` transmissions of frame `seq`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptedDrop {
    pub seq: u32,
    pub times: u32,
}

/// Configuration for the fault-injection model.
#[derive(Debug, Clone, Default)]
pub struct SimulatorConfig {
    /// Probability in `[0.0, 1.0]` that any given datagram is dropped.
    pub loss_rate: f64,
    /// RNG seed; `None` seeds from OS entropy.
    pub seed: Option<u64>,
    pub drops: Vec<ScriptedDrop>,
}

impl SimulatorConfig {
    /// Random loss at `loss_rate`.
    pub fn lossy(loss_rate: f64) -> Self {
        Self {
            loss_rate,
            ..Self::default()
        }
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Add a scripted drop of the first `times` sends of `seq`.
    pub fn drop_seq(mut self, seq: u32, times: u32) -> Self {
        self.drops.push(ScriptedDrop { seq, times });
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.loss_rate) {
            return Err(RudpError::config("loss rate must be between 0.0 and 1.0"));
        }
        Ok(())
    }
}

/// A [`DatagramSocket`] that loses some of what it sends.
#[derive(Debug)]
pub struct Simulator<S> {
    inner: S,
    loss_rate: f64,
    rng: Mutex<StdRng>,
    /// Remaining scripted drops per sequence number.
    pending_drops: Mutex<HashMap<u32, u32>>,
    dropped: AtomicU64,
}

impl<S: DatagramSocket> Simulator<S> {
    pub fn new(inner: S, config: SimulatorConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut pending_drops = HashMap::new();
        for d in &config.drops {
            *pending_drops.entry(d.seq).or_insert(0) += d.times;
        }
        Self {
            inner,
            loss_rate: config.loss_rate,
            rng: Mutex::new(rng),
            pending_drops: Mutex::new(pending_drops),
            dropped: AtomicU64::new(0),
        }
    }

    /// Datagrams swallowed so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn should_drop(&self, datagram: &[u8]) -> bool {
        if let Ok((seq, _)) = Frame::peek(datagram) {
            let mut pending = self
                .pending_drops
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(left) = pending.get_mut(&seq).filter(|left| **left > 0) {
                *left -= 1;
                return true;
            }
        }
        if self.loss_rate <= 0.0 {
            return false;
        }
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.gen::<f64>() < self.loss_rate
    }
}

impl<S: DatagramSocket> DatagramSocket for Simulator<S> {
    fn send_to<'a>(&'a self, buf: &'a [u8], target: SocketAddr) -> SendFuture<'a> {
        if self.should_drop(buf) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            log::trace!("[sim] dropped {} byte datagram to {target}", buf.len());
            let len = buf.len();
            return Box::pin(async move { Ok(len) });
        }
        self.inner.send_to(buf, target)
    }

    fn recv_from<'a>(&'a self, buf: &'a mut [u8]) -> RecvFuture<'a> {
        self.inner.recv_from(buf)
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// Records everything sent through it; never receives.
    #[derive(Default)]
    struct Sink {
        sent: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    impl DatagramSocket for Sink {
        fn send_to<'a>(&'a self, buf: &'a [u8], _target: SocketAddr) -> SendFuture<'a> {
            self.sent.lock().unwrap().push(buf.to_vec());
            let len = buf.len();
            Box::pin(async move { Ok(len) })
        }

        fn recv_from<'a>(&'a self, _buf: &'a mut [u8]) -> RecvFuture<'a> {
            Box::pin(std::future::pending())
        }

        fn local_addr(&self) -> io::Result<SocketAddr> {
            Ok("127.0.0.1:1".parse().unwrap())
        }
    }

    fn target() -> SocketAddr {
        "127.0.0.1:2".parse().unwrap()
    }

    #[tokio::test]
    async fn pass_through_by_default() {
        let sim = Simulator::new(Sink::default(), SimulatorConfig::default());
        for seq in 1..=5u32 {
            let frame = Frame::filled(seq, 3).encode();
            assert_eq!(sim.send_to(&frame, target()).await.unwrap(), 7);
        }
        assert_eq!(sim.dropped(), 0);
        assert_eq!(sim.inner().sent.lock().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn scripted_drop_hits_only_named_seq() {
        let sim = Simulator::new(Sink::default(), SimulatorConfig::default().drop_seq(3, 2));
        for seq in [1, 2, 3, 3, 3, 4] {
            sim.send_to(&Frame::filled(seq, 1).encode(), target())
                .await
                .unwrap();
        }
        assert_eq!(sim.dropped(), 2);
        let seqs: Vec<u32> = sim
            .inner()
            .sent
            .lock()
            .unwrap()
            .iter()
            .map(|d| Frame::peek(d).unwrap().0)
            .collect();
        assert_eq!(seqs, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn full_loss_drops_everything() {
        let sim = Simulator::new(Sink::default(), SimulatorConfig::lossy(1.0).seed(7));
        for seq in 1..=10u32 {
            sim.send_to(&Frame::filled(seq, 1).encode(), target())
                .await
                .unwrap();
        }
        assert_eq!(sim.dropped(), 10);
        assert!(sim.inner().sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn same_seed_same_losses() {
        let run = |seed| async move {
            let sim = Simulator::new(Sink::default(), SimulatorConfig::lossy(0.5).seed(seed));
            for seq in 1..=200u32 {
                sim.send_to(&Frame::filled(seq, 1).encode(), target())
                    .await
                    .unwrap();
            }
            sim.dropped()
        };
        let a = run(42).await;
        assert_eq!(a, run(42).await);
        assert!(a > 0 && a < 200);
    }

    #[test]
    fn loss_rate_out_of_range_is_rejected() {
        assert!(SimulatorConfig::lossy(1.5).validate().is_err());
        assert!(SimulatorConfig::lossy(-0.1).validate().is_err());
        assert!(SimulatorConfig::lossy(0.25).validate().is_ok());
    }
}
