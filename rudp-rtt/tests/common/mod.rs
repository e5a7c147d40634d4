//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::io;
use std::net::SocketAddr;

use rudp_rtt::socket::{DatagramSocket, RecvFuture, SendFuture};
use tokio::sync::{mpsc, Mutex};

type Datagram = (Vec<u8>, SocketAddr);

/// One end of an in-memory, point-to-point datagram link.
///
/// Delivery is instant and lossless; wrap an end in a
/// [`rudp_rtt::simulator::Simulator`] to lose datagrams. Because nothing
/// touches the OS, these sockets work under tokio's paused clock.
pub struct MemorySocket {
    addr: SocketAddr,
    tx: mpsc::UnboundedSender<Datagram>,
    rx: Mutex<mpsc::UnboundedReceiver<Datagram>>,
}

/// Linked `(client, server)` sockets.
pub fn pair() -> (MemorySocket, MemorySocket) {
    let client_addr: SocketAddr = "10.0.0.1:40000".parse().unwrap();
    let server_addr: SocketAddr = "10.0.0.2:9000".parse().unwrap();
    let (to_server, server_rx) = mpsc::unbounded_channel();
    let (to_client, client_rx) = mpsc::unbounded_channel();
    (
        MemorySocket {
            addr: client_addr,
            tx: to_server,
            rx: Mutex::new(client_rx),
        },
        MemorySocket {
            addr: server_addr,
            tx: to_client,
            rx: Mutex::new(server_rx),
        },
    )
}

impl DatagramSocket for MemorySocket {
    fn send_to<'a>(&'a self, buf: &'a [u8], _target: SocketAddr) -> SendFuture<'a> {
        // The far end may already be gone; that is just loss.
        let _ = self.tx.send((buf.to_vec(), self.addr));
        let len = buf.len();
        Box::pin(async move { Ok(len) })
    }

    fn recv_from<'a>(&'a self, buf: &'a mut [u8]) -> RecvFuture<'a> {
        Box::pin(async move {
            let mut rx = self.rx.lock().await;
            match rx.recv().await {
                Some((datagram, from)) => {
                    let n = datagram.len().min(buf.len());
                    buf[..n].copy_from_slice(&datagram[..n]);
                    Ok((n, from))
                }
                None => Err(io::Error::from(io::ErrorKind::ConnectionAborted)),
            }
        })
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Ok(self.addr)
    }
}
