//! Stateless acknowledgment responder (the server side).
//!
//! Every datagram of at least [`SEQ_LEN`] bytes is answered with exactly one
//! [`Ack`] carrying its sequence number and trailing payload length, sent back
//! to whoever sent it. Nothing is remembered between datagrams: duplicates are
//! acked again, and there is no per-client session.

use std::io;
use std::net::SocketAddr;

use crate::config::ServerConfig;
use crate::error::Result;
use crate::packet::{Ack, Frame, SEQ_LEN};
use crate::socket::{DatagramSocket, Socket, MAX_DATAGRAM};

/// Log a counter line every this many datagrams.
const STATS_LOG_EVERY: u64 = 10_000;

/// Running counters, for logging only.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResponderStats {
    pub datagrams: u64,
    pub acks_sent: u64,
    /// Datagrams shorter than [`SEQ_LEN`].
    pub dropped_short: u64,
    pub send_errors: u64,
    pub recv_errors: u64,
}

/// Build the ack for a raw request, or `None` if it is too short to carry a
/// sequence number.
pub fn acknowledge(datagram: &[u8]) -> Option<Ack> {
    let (seq, payload_len) = Frame::peek(datagram).ok()?;
    Some(Ack {
        seq,
        bytes_received: u32::try_from(payload_len).unwrap_or(u32::MAX),
    })
}

/// Single-task responder loop.
pub struct Responder<S> {
    socket: S,
    buf: Vec<u8>,
    stats: ResponderStats,
}

impl Responder<Socket> {
    /// Bind a UDP socket per `config`.
    pub async fn bind(config: &ServerConfig) -> Result<Self> {
        let socket = Socket::bind(config.bind).await?;
        Ok(Self::new(socket))
    }
}

impl<S: DatagramSocket> Responder<S> {
    pub fn new(socket: S) -> Self {
        Self {
            socket,
            buf: vec![0u8; MAX_DATAGRAM],
            stats: ResponderStats::default(),
        }
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn stats(&self) -> ResponderStats {
        self.stats
    }

    /// Receive one datagram and fully handle it, ack send included.
    ///
    /// Returns the ack that was sent, if any.
    pub async fn serve_one(&mut self) -> Option<Ack> {
        let (n, from) = match self.socket.recv_from(&mut self.buf).await {
            Ok(received) => received,
            Err(e) => {
                self.stats.recv_errors += 1;
                log::warn!("[responder] recv failed: {e}");
                return None;
            }
        };
        self.stats.datagrams += 1;
        if self.stats.datagrams % STATS_LOG_EVERY == 0 {
            log::debug!("[responder] {:?}", self.stats);
        }

        let Some(ack) = acknowledge(&self.buf[..n]) else {
            self.stats.dropped_short += 1;
            log::trace!("[responder] dropping {n} byte datagram from {from} (< {SEQ_LEN})");
            return None;
        };

        match self.socket.send_to(&ack.encode(), from).await {
            Ok(_) => {
                self.stats.acks_sent += 1;
                log::trace!("[responder] ack seq={} bytes={} → {from}", ack.seq, ack.bytes_received);
                Some(ack)
            }
            Err(e) => {
                self.stats.send_errors += 1;
                log::warn!("[responder] ack seq={} to {from} failed: {e}", ack.seq);
                None
            }
        }
    }

    /// Serve forever, one datagram at a time.
    pub async fn serve(&mut self) {
        loop {
            self.serve_one().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use crate::socket::{RecvFuture, SendFuture};

    /// Hands out queued datagrams and refuses the first `failing_sends` sends.
    struct RefusingSocket {
        inbox: Mutex<Vec<Vec<u8>>>,
        failing_sends: u32,
        sends: AtomicU32,
        delivered: Mutex<Vec<Vec<u8>>>,
    }

    impl RefusingSocket {
        fn new(mut inbox: Vec<Vec<u8>>, failing_sends: u32) -> Self {
            inbox.reverse();
            Self {
                inbox: Mutex::new(inbox),
                failing_sends,
                sends: AtomicU32::new(0),
                delivered: Mutex::new(Vec::new()),
            }
        }
    }

    impl DatagramSocket for RefusingSocket {
        fn send_to<'a>(&'a self, buf: &'a [u8], _target: SocketAddr) -> SendFuture<'a> {
            let n = self.sends.fetch_add(1, Ordering::SeqCst) + 1;
            let result = if n <= self.failing_sends {
                Err(io::Error::other("no buffer space"))
            } else {
                self.delivered.lock().unwrap().push(buf.to_vec());
                Ok(buf.len())
            };
            Box::pin(async move { result })
        }

        fn recv_from<'a>(&'a self, buf: &'a mut [u8]) -> RecvFuture<'a> {
            let next = self.inbox.lock().unwrap().pop();
            Box::pin(async move {
                let d = next.ok_or_else(|| io::Error::from(io::ErrorKind::WouldBlock))?;
                buf[..d.len()].copy_from_slice(&d);
                Ok((d.len(), "127.0.0.1:5000".parse().unwrap()))
            })
        }

        fn local_addr(&self) -> io::Result<SocketAddr> {
            Ok("127.0.0.1:9000".parse().unwrap())
        }
    }

    #[tokio::test]
    async fn failed_ack_send_is_counted_and_serving_continues() {
        let socket = RefusingSocket::new(
            vec![Frame::filled(1, 8).encode(), Frame::filled(2, 8).encode()],
            1,
        );
        let mut responder = Responder::new(socket);

        assert_eq!(responder.serve_one().await, None);
        assert_eq!(
            responder.serve_one().await,
            Some(Ack {
                seq: 2,
                bytes_received: 8
            })
        );

        let stats = responder.stats();
        assert_eq!(stats.datagrams, 2);
        assert_eq!(stats.send_errors, 1);
        assert_eq!(stats.acks_sent, 1);
        let delivered = responder.socket.delivered.lock().unwrap();
        let expected = Ack {
            seq: 2,
            bytes_received: 8,
        };
        assert_eq!(*delivered, vec![expected.encode().to_vec()]);
    }

    #[tokio::test]
    async fn recv_error_is_counted() {
        let mut responder = Responder::new(RefusingSocket::new(Vec::new(), 0));
        assert_eq!(responder.serve_one().await, None);
        assert_eq!(responder.stats().recv_errors, 1);
        assert_eq!(responder.stats().datagrams, 0);
    }

    #[test]
    fn ack_carries_seq_and_payload_len() {
        let frame = Frame::filled(77, 1_000).encode();
        assert_eq!(
            acknowledge(&frame),
            Some(Ack {
                seq: 77,
                bytes_received: 1_000
            })
        );
    }

    #[test]
    fn header_only_request_acks_zero_bytes() {
        assert_eq!(
            acknowledge(&5u32.to_be_bytes()),
            Some(Ack {
                seq: 5,
                bytes_received: 0
            })
        );
    }

    #[test]
    fn short_request_is_dropped() {
        assert_eq!(acknowledge(&[]), None);
        assert_eq!(acknowledge(&[0, 0, 1]), None);
    }

    #[tokio::test]
    async fn serves_over_loopback() {
        let mut responder = Responder::bind(&ServerConfig::new(0).bind_ip("127.0.0.1".parse().unwrap()))
            .await
            .unwrap();
        let server_addr = responder.local_addr().unwrap();
        let client = Socket::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();

        client.send_to(&[1, 2], server_addr).await.unwrap();
        client
            .send_to(&Frame::filled(9, 10).encode(), server_addr)
            .await
            .unwrap();

        assert_eq!(responder.serve_one().await, None);
        assert_eq!(
            responder.serve_one().await,
            Some(Ack {
                seq: 9,
                bytes_received: 10
            })
        );

        let mut buf = [0u8; 16];
        let (n, from) = client.recv_from(&mut buf).await.unwrap();
        assert_eq!(from, server_addr);
        assert_eq!(
            Ack::decode(&buf[..n]).unwrap(),
            Ack {
                seq: 9,
                bytes_received: 10
            }
        );

        let stats = responder.stats();
        assert_eq!(stats.datagrams, 2);
        assert_eq!(stats.dropped_short, 1);
        assert_eq!(stats.acks_sent, 1);
    }
}
