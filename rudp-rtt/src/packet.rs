//! Wire-format definitions for frames and acknowledgments.
//!
//! Two datagram kinds travel between client and responder:
//! - a [`Frame`] (client → responder): sequence number followed by payload,
//! - an [`Ack`] (responder → client): fixed 8-byte acknowledgment.
//!
//! Pure data transformation, no I/O.
//!
//! # Wire format
//!
//! All multi-byte integers are **big-endian**.
//!
//! ```text
//!  Frame
//!  0               1               2               3
//!  0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        Sequence Number                        |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        Payload ...                            |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//!
//!  Ack
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                  Acknowledged Sequence Number                 |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        Bytes Received                         |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```

use thiserror::Error;

/// Byte length of the frame header (the sequence number).
pub const SEQ_LEN: usize = 4;

/// Byte length of an acknowledgment on the wire.
pub const ACK_LEN: usize = 8;

/// Byte every payload is filled with.
pub const PAYLOAD_FILL: u8 = b'A';

// Byte offsets within an acknowledgment.
const OFF_ACK_SEQ: usize = 0;
const OFF_BYTES: usize = 4;

/// One unit of application data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// 1-indexed sequence number.
    pub seq: u32,
    pub payload: Vec<u8>,
}

impl Frame {
    /// Build a frame carrying `payload_len` filler bytes.
    pub fn filled(seq: u32, payload_len: usize) -> Self {
        Self {
            seq,
            payload: vec![PAYLOAD_FILL; payload_len],
        }
    }

    /// Serialise this frame into a newly allocated byte vector.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(SEQ_LEN + self.payload.len());
        buf.extend_from_slice(&self.seq.to_be_bytes());
        buf.extend_from_slice(&self.payload);
        buf
    }

    /// Read only the header of a raw frame: `(seq, payload_len)`.
    ///
    /// Used by the responder, which never needs the payload bytes themselves.
    pub fn peek(buf: &[u8]) -> Result<(u32, usize), PacketError> {
        let seq = read_u32(buf, 0).ok_or(PacketError::FrameTooShort(buf.len()))?;
        Ok((seq, buf.len() - SEQ_LEN))
    }
}

/// Acknowledgment of a single frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    /// Sequence number being acknowledged.
    pub seq: u32,
    /// Payload bytes the responder observed after the sequence number.
    pub bytes_received: u32,
}

impl Ack {
    pub fn encode(&self) -> [u8; ACK_LEN] {
        let mut buf = [0u8; ACK_LEN];
        buf[OFF_ACK_SEQ..OFF_ACK_SEQ + 4].copy_from_slice(&self.seq.to_be_bytes());
        buf[OFF_BYTES..OFF_BYTES + 4].copy_from_slice(&self.bytes_received.to_be_bytes());
        buf
    }

    /// Parse an [`Ack`] from a raw byte slice.
    ///
    /// Bytes beyond [`ACK_LEN`] are ignored.
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        match (read_u32(buf, OFF_ACK_SEQ), read_u32(buf, OFF_BYTES)) {
            (Some(seq), Some(bytes_received)) => Ok(Self {
                seq,
                bytes_received,
            }),
            _ => Err(PacketError::AckTooShort(buf.len())),
        }
    }
}

/// Errors that can arise when parsing a raw datagram.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PacketError {
    #[error("frame of {0} bytes is shorter than the 4-byte header")]
    FrameTooShort(usize),
    #[error("ack of {0} bytes is shorter than 8 bytes")]
    AckTooShort(usize),
}

fn read_u32(buf: &[u8], off: usize) -> Option<u32> {
    let bytes = buf.get(off..off + 4)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}
