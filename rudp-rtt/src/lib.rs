//! `rudp-rtt`: stop-and-wait reliable delivery over UDP with RTT measurement.
//!
//! # Architecture
//!
//! ```text
//!  ┌──────────┐   frames (seq + payload)   ┌───────────┐
//!  │  Client  │───────────────────────────▶│ Responder │
//!  └────┬─────┘                            └─────┬─────┘
//!       │        8-byte ACKs (seq, bytes)        │
//!       │◀───────────────────────────────────────┘
//!       │
//!  ┌────▼───────────────────────────────┐
//!  │ Sender (per-frame FSM) + Timer     │──RTT sample──▶ RttStats ──▶ report
//!  └────┬───────────────────────────────┘
//!       │ raw UDP datagrams
//!  ┌────▼──────────────┐
//!  │  DatagramSocket   │  (tokio UdpSocket, optionally behind Simulator)
//!  └───────────────────┘
//! ```
//!
//! Each module has a single responsibility:
//! - [`packet`]: wire format (serialise / deserialise)
//! - [`client`]: stop-and-wait send / await-ack / retransmit loop
//! - [`sender`]: per-frame outbound state machine
//! - [`state`]: frame FSM states
//! - [`timer`]: fixed-RTO retransmit deadline
//! - [`stats`]: RTT aggregates, histogram and text report
//! - [`responder`]: stateless ack server
//! - [`socket`]: datagram transport trait and UDP implementation
//! - [`simulator`]: optional lossy socket wrapper
//! - [`config`]: client / server configuration
//! - [`error`]: error types

pub mod client;
pub mod config;
pub mod error;
pub mod packet;
pub mod responder;
pub mod sender;
pub mod simulator;
pub mod socket;
pub mod state;
pub mod stats;
pub mod timer;

pub use client::{Client, RunSummary};
pub use config::{ClientConfig, ServerConfig};
pub use error::{Result, RudpError};
pub use responder::Responder;
pub use stats::{RttSnapshot, RttStats};
