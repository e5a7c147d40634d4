//! Client and server configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, RudpError};
use crate::simulator::SimulatorConfig;
use crate::stats::DEFAULT_BUCKET_WIDTH;
use crate::timer::DEFAULT_RTO;

/// Largest payload a frame may carry.
pub const MAX_PAYLOAD: usize = 60_000;

/// Every Nth retransmit of the same frame is logged at warn level.
pub const DEFAULT_RETRANSMIT_LOG_INTERVAL: u32 = 10;

/// Client run configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Responder address.
    pub server: SocketAddr,
    /// Payload bytes per frame, `1..=MAX_PAYLOAD`.
    pub payload_len: usize,
    /// Number of frames to deliver.
    pub frames: u32,
    /// Fixed retransmission timeout.
    pub rto: Duration,
    /// Histogram bucket width.
    pub bucket_width: Duration,
    /// Report file; defaults to [`ClientConfig::default_log_path`].
    pub log_path: Option<PathBuf>,
    pub retransmit_log_interval: u32,
    /// Simulated outbound loss; `None` talks to the socket directly.
    pub loss: Option<SimulatorConfig>,
}

impl ClientConfig {
    pub fn new(server: SocketAddr, payload_len: usize, frames: u32) -> Self {
        Self {
            server,
            payload_len,
            frames,
            rto: DEFAULT_RTO,
            bucket_width: DEFAULT_BUCKET_WIDTH,
            log_path: None,
            retransmit_log_interval: DEFAULT_RETRANSMIT_LOG_INTERVAL,
            loss: None,
        }
    }

    /// Set the retransmission timeout
    pub fn rto(mut self, rto: Duration) -> Self {
        self.rto = rto;
        self
    }

    /// Set the histogram bucket width
    pub fn bucket_width(mut self, width: Duration) -> Self {
        self.bucket_width = width;
        self
    }

    /// Write the report to `path` instead of the default name
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    pub fn retransmit_log_interval(mut self, every: u32) -> Self {
        self.retransmit_log_interval = every;
        self
    }

    /// Route sends through a [`crate::simulator::Simulator`]
    pub fn simulate(mut self, loss: SimulatorConfig) -> Self {
        self.loss = Some(loss);
        self
    }

    /// `rudp_<payload_len>_<frames>.log`
    pub fn default_log_path(&self) -> PathBuf {
        PathBuf::from(format!("rudp_{}_{}.log", self.payload_len, self.frames))
    }

    /// Where the report will be written.
    pub fn report_path(&self) -> PathBuf {
        self.log_path
            .clone()
            .unwrap_or_else(|| self.default_log_path())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_PAYLOAD).contains(&self.payload_len) {
            return Err(RudpError::config(format!(
                "payload_length must be between 1 and {MAX_PAYLOAD}"
            )));
        }
        if self.rto.is_zero() {
            return Err(RudpError::config("retransmission timeout must be greater than 0"));
        }
        if self.bucket_width.is_zero() {
            return Err(RudpError::config("histogram bucket width must be greater than 0"));
        }
        if let Some(loss) = &self.loss {
            loss.validate()?;
        }
        Ok(())
    }
}

/// Responder configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: SocketAddr,
}

impl ServerConfig {
    /// Listen on all IPv4 interfaces at `port`.
    pub fn new(port: u16) -> Self {
        Self {
            bind: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port),
        }
    }

    pub fn bind_ip(mut self, ip: IpAddr) -> Self {
        self.bind.set_ip(ip);
        self
    }
}
