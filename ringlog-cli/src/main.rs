//! ringlog CLI - produce, consume and inspect ring log files.

mod commands;
mod logging;

use anyhow::Result;
use clap::{Parser, Subcommand};
use logging::{LoggingConfig, init_tracing};
use ringlog_core::{RingLogError, Status};
use std::path::PathBuf;
use std::process::ExitCode;

/// ringlog - persistent circular byte log shared between processes.
#[derive(Parser)]
#[command(name = "ringlog")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by the producer and consumer.
#[derive(clap::Args, Debug, Clone)]
pub struct StreamArgs {
    /// Path to the ring file
    path: PathBuf,

    /// Number of blocks
    #[arg(short, long, default_value = "1000")]
    count: u64,

    /// Block size in bytes
    #[arg(short, long, default_value = "4096")]
    size: usize,

    /// Ring capacity in bytes, used if this process creates the file
    #[arg(short = 'f', long, default_value = "1048576")]
    capacity: u32,

    /// Sleep between retries while the ring is full or empty
    #[arg(long, default_value = "1")]
    poll_ms: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Write `count` blocks of `size` bytes into a ring
    Send(StreamArgs),

    /// Read `count * size` bytes from a ring and verify them
    Recv(StreamArgs),

    /// Show the occupancy of an existing ring
    Inspect {
        /// Path to the ring file
        path: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Discard all data in an existing ring
    Reset {
        /// Path to the ring file
        path: PathBuf,
    },

    /// Delete a ring file and its lock token
    Remove {
        /// Path to the ring file
        path: PathBuf,
    },
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Send(args) => commands::send::run(&args),
        Commands::Recv(args) => commands::recv::run(&args),
        Commands::Inspect { path, json } => commands::inspect::run(&path, json),
        Commands::Reset { path } => commands::reset::run(&path),
        Commands::Remove { path } => commands::remove::run(&path),
    }
}

/// Map a failure to a process exit code: the ring status negated, or 1 when
/// the failure did not come from the ring.
fn exit_code(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<RingLogError>())
        .map(|e| Status::from(e).as_i32().unsigned_abs().min(u8::MAX as u32) as u8)
        .filter(|code| *code != 0)
        .unwrap_or(1)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(&LoggingConfig::from_verbosity(cli.verbose)) {
        eprintln!("Warning: {:#}", e);
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_stream_args() {
        let cli = Cli::try_parse_from([
            "ringlog", "send", "/tmp/r.log", "-c", "10", "-s", "64", "-f", "4096",
        ])
        .unwrap();
        let Commands::Send(args) = cli.command else {
            panic!("expected send");
        };
        assert_eq!(args.count, 10);
        assert_eq!(args.size, 64);
        assert_eq!(args.capacity, 4096);
        assert_eq!(args.poll_ms, 1);
    }

    #[test]
    fn exit_code_follows_ring_status() {
        let err = anyhow::Error::new(RingLogError::TooBig {
            requested: 10,
            capacity: 4,
        })
        .context("Failed to reserve");
        assert_eq!(exit_code(&err), 3);

        assert_eq!(exit_code(&anyhow::anyhow!("plain failure")), 1);
    }
}
