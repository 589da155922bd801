// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Switchboard - customer support relay between a chat widget and an
//! operator group.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;
mod token;
mod worker;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use switchboard_config::model::SwitchboardConfig;

/// Switchboard - customer support relay.
#[derive(Parser, Debug)]
#[command(name = "switchboard", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP gateway together with the outbox worker.
    Serve,
    /// Run only the outbox worker.
    Worker,
    /// Manage Switchboard configuration.
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
    /// Mint a real-time subscription token.
    Token {
        /// Tenant the subscriber belongs to.
        #[arg(long)]
        tenant: String,
        /// Conversation to subscribe to.
        #[arg(long)]
        conversation: String,
        /// Token lifetime in seconds.
        #[arg(long, default_value_t = 3600)]
        ttl_secs: i64,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate configuration and exit.
    Check,
}

fn load_config(path: Option<&PathBuf>) -> SwitchboardConfig {
    let loaded = match path {
        Some(path) => switchboard_config::load_and_validate_path(path),
        None => switchboard_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            switchboard_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref());

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Worker) => worker::run_worker(config).await,
        Some(Commands::Config {
            action: ConfigCommand::Check,
        }) => {
            println!(
                "switchboard: config ok ({} channel(s), listening on {}:{})",
                config.channels.len(),
                config.server.host,
                config.server.port
            );
            Ok(())
        }
        Some(Commands::Token {
            tenant,
            conversation,
            ttl_secs,
        }) => token::run_token(&config, tenant, conversation, ttl_secs),
        None => {
            println!("switchboard: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber with the given log level.
pub(crate) fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("switchboard={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
