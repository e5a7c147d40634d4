//! Datagram transport abstraction.
//!
//! [`DatagramSocket`] is the only thing the client state machine and the
//! responder need from the network: send a datagram to an address, receive the
//! next datagram. The bounded wait is applied by the caller with
//! `tokio::time::timeout_at`, so implementations never deal with timeouts.
//!
//! [`Socket`] is the production implementation over `tokio::net::UdpSocket`.
//! The trait is object-safe, which lets [`crate::simulator::Simulator`] and
//! test doubles wrap or replace it.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;

use tokio::net::UdpSocket;

/// Largest datagram the responder will accept.
pub const MAX_DATAGRAM: usize = 65_536;

/// Boxed future returned by [`DatagramSocket::send_to`].
pub type SendFuture<'a> = Pin<Box<dyn Future<Output = io::Result<usize>> + Send + 'a>>;

/// Boxed future returned by [`DatagramSocket::recv_from`].
pub type RecvFuture<'a> =
    Pin<Box<dyn Future<Output = io::Result<(usize, SocketAddr)>> + Send + 'a>>;

/// Unreliable, unordered datagram transport.
pub trait DatagramSocket: Send + Sync {
    /// Send `buf` as one datagram to `target`, returning the bytes written.
    fn send_to<'a>(&'a self, buf: &'a [u8], target: SocketAddr) -> SendFuture<'a>;

    /// Receive one datagram into `buf`, returning `(len, sender)`.
    fn recv_from<'a>(&'a self, buf: &'a mut [u8]) -> RecvFuture<'a>;

    /// Address this socket is bound to.
    fn local_addr(&self) -> io::Result<SocketAddr>;
}

impl<T: DatagramSocket + ?Sized> DatagramSocket for Box<T> {
    fn send_to<'a>(&'a self, buf: &'a [u8], target: SocketAddr) -> SendFuture<'a> {
        (**self).send_to(buf, target)
    }

    fn recv_from<'a>(&'a self, buf: &'a mut [u8]) -> RecvFuture<'a> {
        (**self).recv_from(buf)
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        (**self).local_addr()
    }
}

/// A UDP socket speaking raw datagrams.
#[derive(Debug)]
pub struct Socket {
    /// Address this socket is bound to (filled in after OS assigns ephemeral port).
    pub local_addr: SocketAddr,
    inner: UdpSocket,
}

impl Socket {
    /// Bind a new socket to `local_addr`.
    ///
    /// Passing `0.0.0.0:0` lets the OS choose an ephemeral port.
    pub async fn bind(local_addr: SocketAddr) -> io::Result<Self> {
        let inner = UdpSocket::bind(local_addr).await?;
        let local_addr = inner.local_addr()?;
        Ok(Self { local_addr, inner })
    }

    /// Bind an ephemeral socket of the same address family as `peer`.
    pub async fn bind_for(peer: SocketAddr) -> io::Result<Self> {
        let any: SocketAddr = if peer.is_ipv4() {
            (std::net::Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
        };
        Self::bind(any).await
    }
}

impl DatagramSocket for Socket {
    fn send_to<'a>(&'a self, buf: &'a [u8], target: SocketAddr) -> SendFuture<'a> {
        Box::pin(self.inner.send_to(buf, target))
    }

    fn recv_from<'a>(&'a self, buf: &'a mut [u8]) -> RecvFuture<'a> {
        Box::pin(self.inner.recv_from(buf))
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Ok(self.local_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn loopback_datagram_roundtrip() {
        let a = Socket::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let b = Socket::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();

        let sent = a.send_to(b"ping", b.local_addr).await.unwrap();
        assert_eq!(sent, 4);

        let mut buf = [0u8; 16];
        let (n, from) = b.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"ping");
        assert_eq!(from, a.local_addr);
    }

    #[tokio::test]
    async fn bind_for_matches_address_family() {
        let sock = Socket::bind_for("127.0.0.1:9".parse().unwrap())
            .await
            .unwrap();
        assert!(sock.local_addr.is_ipv4());
        assert_ne!(sock.local_addr.port(), 0);
    }
}
