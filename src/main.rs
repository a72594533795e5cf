//! An online two-player Go service.
//!
//! ## Usage
//!
//! - `michi-rust serve` - run the session server
//! - `michi-rust goclient` - run the line-oriented client CLI
//! - `michi-rust demo` - run a local rules-engine walkthrough

use std::net::SocketAddr;

use anyhow::Context;
use clap::{Parser, Subcommand};
use flexi_logger::{AdaptiveFormat, Logger, WriteMode};

use michi_rust::game::GameData;
use michi_rust::point::Stone;
use michi_rust::server::{DEFAULT_PORT, Server};

/// An online two-player Go service: rules engine plus multi-room server.
#[derive(Parser)]
#[command(name = "michi-rust")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (overrides RUST_LOG). One of: error, warn, info, debug, trace.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the session server, accepting game rooms over TCP.
    Serve {
        /// Address to bind, e.g. 0.0.0.0:1234.
        #[arg(long, default_value_t = format!("0.0.0.0:{DEFAULT_PORT}"))]
        bind: String,
    },
    /// Run the line-oriented client CLI, connecting to a running server.
    Goclient {
        /// Server address to connect to.
        #[arg(long, default_value_t = format!("localhost:{DEFAULT_PORT}"))]
        connect: String,
    },
    /// Run a local demo of the rules engine (no networking).
    Demo,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose)?;

    match cli.command {
        Some(Commands::Serve { bind }) => {
            let addr: SocketAddr = bind.parse().with_context(|| format!("parsing bind address {bind}"))?;
            Server::new().run(addr).with_context(|| "session server failed")?;
        }
        Some(Commands::Goclient { connect }) => {
            michi_rust::goclient::run(&connect)?;
        }
        Some(Commands::Demo) | None => {
            run_demo();
        }
    }
    Ok(())
}

fn init_logger(verbose: bool) -> anyhow::Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    Logger::try_with_env_or_str(default_level)?
        .write_mode(WriteMode::BufferAndFlush)
        .log_to_stderr()
        .adaptive_format_for_stderr(match cfg!(debug_assertions) {
            true => AdaptiveFormat::WithThread,
            false => AdaptiveFormat::Default,
        })
        .start()?;
    Ok(())
}

fn run_demo() {
    println!("Michi-Rust: online two-player Go service\n");

    println!("=== Local rules-engine walkthrough (9x9) ===");
    let mut game = GameData::new(9);
    assert!(game.try_move(2, 2));
    assert!(game.try_move(6, 6));
    println!("Black at (2,2), White at (6,6):");
    print!("{}", game.board);

    println!("Both players pass; scoring the empty-ish board...");
    assert!(game.pass());
    assert!(game.pass());
    let mut black = 0.0;
    let mut white = 0.0;
    let winner = game.winner(&mut black, &mut white);
    println!("winner: {winner} (black {black} - white {white})");
    assert_ne!(winner, Stone::Empty);

    println!("\nRun `michi-rust serve` to host games, and `michi-rust goclient` to play.");
}
