//! CLI binary for the chainlog dice demo: every process prints the same
//! sequence of dice rolls in the same order, and the elected leader is the
//! one producing new rolls.
//!
//! Backends are the in-memory implementations; the trait crates are the
//! integration seam for consensus-backed stores.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_pub_crate)]

use bytes::Bytes;
use chainlog_driver::{
    DriverConfig, EntryId, LogDriver, RecordConsumer, RecordProducer, Role,
};
use chainlog_leadership::{Candidacy, Election};
use chainlog_leadership_memory::MemoryElection;
use chainlog_metastore_memory::MemoryMetaStore;
use chainlog_segment_memory::MemorySegmentStore;
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Coordination path under which all processes compete for leadership.
const ELECTION_PATH: &str = "/chainlog-elect";

/// CLI-specific error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Election error
    #[error("election error: {0}")]
    Election(#[from] chainlog_leadership_memory::Error),

    /// Driver error
    #[error(transparent)]
    Driver(
        #[from]
        chainlog_driver::DriverError<
            chainlog_metastore_memory::Error,
            chainlog_segment_memory::Error,
        >,
    ),
}

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Coordination servers, comma-separated (only the first one is used)
    #[arg(
        short = 'z',
        long,
        default_value = "127.0.0.1:2181",
        env = "CHAINLOG_COORDINATION_SERVERS"
    )]
    coordination_servers: String,
}

/// Rolls one die per cadence tick, encoded as a 4-byte big-endian integer.
struct DiceProducer {
    rng: StdRng,
}

impl RecordProducer for DiceProducer {
    fn produce(&mut self) -> Bytes {
        let roll: i32 = self.rng.gen_range(1..=6);
        Bytes::copy_from_slice(&roll.to_be_bytes())
    }
}

/// Prints every delivered roll with its segment and the delivering role.
struct ConsolePrinter;

impl RecordConsumer for ConsolePrinter {
    fn consume(&mut self, id: EntryId, payload: &[u8], role: Role) {
        match <[u8; 4]>::try_from(payload).map(i32::from_be_bytes) {
            Ok(value) => info!("value = {value}, segment = {}, {role}", id.segment),
            Err(_) => info!(
                "unreadable entry of {} bytes, segment = {}, {role}",
                payload.len(),
                id.segment
            ),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let server = args
        .coordination_servers
        .split(',')
        .next()
        .unwrap_or("")
        .trim()
        .to_string();
    info!("coordination server: {server}");

    // Shared shutdown token, cancelled by the signal handlers.
    let shutdown_token = CancellationToken::new();

    let signal_shutdown_token = shutdown_token.clone();
    tokio::spawn(async move {
        if cfg!(unix) {
            use tokio::signal::unix::{SignalKind, signal};

            let mut sigterm = signal(SignalKind::terminate()).expect("SIGTERM handler failed");
            let mut sigint = signal(SignalKind::interrupt()).expect("SIGINT handler failed");

            tokio::select! {
                _ = sigterm.recv() => info!("Received SIGTERM"),
                _ = sigint.recv() => info!("Received SIGINT"),
            }
        } else {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received interrupt signal");
        }

        info!("Shutting down");
        signal_shutdown_token.cancel();
    });

    let election = MemoryElection::new();
    let candidacy = election.enroll(ELECTION_PATH).await?;

    let driver = LogDriver::new(
        MemoryMetaStore::new(),
        MemorySegmentStore::new(),
        candidacy.signal(),
        DiceProducer {
            rng: StdRng::from_entropy(),
        },
        ConsolePrinter,
        DriverConfig::default(),
        shutdown_token.clone(),
    );

    let cursor = driver.run().await?;
    match cursor {
        Some(entry) => info!(%entry, "stopped after delivering"),
        None => info!("stopped before delivering anything"),
    }

    candidacy.resign().await?;

    Ok(())
}
