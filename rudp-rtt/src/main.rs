//! Entry point for `rudp-rtt`.
//!
//! Parses CLI arguments and dispatches into either **server** or **client** mode.
//! All actual protocol work is delegated to library modules; `main.rs` owns only
//! process setup (logging, runtime, argument parsing) and console output.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};

use rudp_rtt::client::{self, Client};
use rudp_rtt::simulator::SimulatorConfig;
use rudp_rtt::{ClientConfig, Responder, ServerConfig};

/// Stop-and-wait reliable UDP with RTT measurement.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Acknowledge every frame arriving on a UDP port. Runs until killed.
    Server {
        /// UDP port to listen on.
        port: u16,
        /// Local address to bind.
        #[arg(long, default_value = "0.0.0.0")]
        bind: IpAddr,
    },
    /// Send frames one at a time and record per-frame RTT.
    Client {
        server_ip: IpAddr,
        server_port: u16,
        /// Payload bytes per frame (1..=60000).
        payload_length: usize,
        num_frames: u32,
        /// Fixed retransmission timeout in milliseconds.
        #[arg(long, default_value_t = 200)]
        timeout_ms: u64,
        /// Histogram bucket width in microseconds.
        #[arg(long, default_value_t = 1000)]
        bucket_us: u64,
        /// Report file (default: rudp_<payload_length>_<num_frames>.log).
        #[arg(long)]
        log_file: Option<PathBuf>,
        /// Drop this fraction of outbound frames locally (0.0..=1.0).
        #[arg(long)]
        loss_rate: Option<f64>,
        /// Seed for --loss-rate.
        #[arg(long, requires = "loss_rate")]
        seed: Option<u64>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Initialise env_logger; set RUST_LOG to control verbosity.
    env_logger::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // --help / --version are not errors.
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let result = match cli.mode {
        Mode::Server { port, bind } => run_server(ServerConfig::new(port).bind_ip(bind)).await,
        Mode::Client {
            server_ip,
            server_port,
            payload_length,
            num_frames,
            timeout_ms,
            bucket_us,
            log_file,
            loss_rate,
            seed,
        } => {
            let mut config = ClientConfig::new(
                SocketAddr::new(server_ip, server_port),
                payload_length,
                num_frames,
            )
            .rto(Duration::from_millis(timeout_ms))
            .bucket_width(Duration::from_micros(bucket_us));
            if let Some(path) = log_file {
                config = config.log_path(path);
            }
            if let Some(rate) = loss_rate {
                let mut loss = SimulatorConfig::lossy(rate);
                loss.seed = seed;
                config = config.simulate(loss);
            }
            run_client(config).await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let mut responder = Responder::bind(&config)
        .await
        .with_context(|| format!("binding {}", config.bind))?;
    println!("RUDP server listening on {}...", responder.local_addr()?);
    log::info!("[server] ready");
    responder.serve().await;
    Ok(())
}

async fn run_client(config: ClientConfig) -> anyhow::Result<()> {
    config.validate()?;
    let socket = client::open_socket(&config)
        .await
        .context("creating client socket")?;
    let mut client = Client::new(socket, &config)?;
    let summary = client.run().await;

    let path = config.report_path();
    client.write_report(&path);

    let stats = client.stats();
    let ms = |d: Option<Duration>| d.map_or(0.0, |d| d.as_secs_f64() * 1e3);
    println!();
    println!("RUDP Test Completed");
    println!("Frames requested: {}", summary.requested);
    println!("Frames successful: {}", summary.successful);
    println!("Payload size (bytes): {}", config.payload_len);
    println!("Min RTT (ms): {:.3}", ms(stats.min()));
    println!("Max RTT (ms): {:.3}", ms(stats.max()));
    println!("Avg RTT (ms): {:.3}", stats.mean_ns() / 1e6);
    println!("Retransmissions: {}", summary.retransmissions);
    println!("Log saved to {}", path.display());
    Ok(())
}
