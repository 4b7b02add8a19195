// Copyright 2026 BadCompany
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Main entry point for the llm-warden agent.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

use llm_warden::agent::Agent;
use llm_warden::config::Config;
use llm_warden::engine_core::constants::config as env_keys;
use llm_warden::host::messages::HostMessage;
use llm_warden::net::shipper::{FlushOutcome, FlushTrigger};
use llm_warden::store::policy_index::PolicyLookup;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a YAML config file
    #[arg(long, env = env_keys::ENV_CONFIG_PATH)]
    config: Option<PathBuf>,

    /// State directory (client id, event buffer, policy index)
    #[arg(long)]
    state_dir: Option<PathBuf>,

    /// Local override policy file (JSON or YAML)
    #[arg(long)]
    overrides: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the host channel on stdin/stdout
    Run,
    /// Fetch, reconcile and install the policy set once
    Reconcile,
    /// Ship buffered events now
    Flush,
    /// Show the policy for a domain or URL
    Lookup { target: String },
    /// Answer one host message given as JSON and print the reply
    Query { message: String },
    /// Print the client id, creating it on first use
    ClientId,
    /// Inspect or clear the event buffer
    Events {
        #[command(subcommand)]
        action: EventsCommand,
    },
}

#[derive(Subcommand, Debug)]
enum EventsCommand {
    /// Write buffered events as NDJSON
    Export {
        /// Output file (stdout when omitted)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Drop every buffered event
    Clear,
    /// Number of buffered events
    Count,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    install_panic_hook();

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(dir) = &cli.state_dir {
        config.state_dir = dir.clone();
    }
    if let Some(path) = &cli.overrides {
        config.overrides_path = path.clone();
    }

    if let Err(e) = init_tracing(&config) {
        eprintln!("Failed to init tracing: {}", e);
    }

    let agent = Agent::from_config(config)?;

    match cli.command {
        Command::Run => {
            agent.start().await?;
            info!("Starting llm-warden on stdio");
            agent
                .run(tokio::io::stdin(), tokio::io::stdout(), shutdown_signal())
                .await?;
        }
        Command::Reconcile => {
            let rules = agent.refresh_policies().await?;
            println!("Applied {} rules", rules.len());
        }
        Command::Flush => match agent.flush(FlushTrigger::Manual).await? {
            FlushOutcome::Empty => println!("Nothing to flush"),
            FlushOutcome::Shipped(n) => println!("Shipped {} events", n),
        },
        Command::Lookup { target } => {
            let (domain, found) = agent.lookup(&target).await?;
            match found {
                PolicyLookup::Found(entry) => {
                    println!("{}: {} (rule {})", domain, entry.policy, entry.id)
                }
                PolicyLookup::NotFound => println!("{}: not an LLM domain", domain),
            }
        }
        Command::Query { message } => {
            let msg: HostMessage =
                serde_json::from_str(&message).context("Invalid host message")?;
            if let Some(reply) = agent.handle_message(msg).await {
                println!("{}", serde_json::to_string(&reply)?);
            }
        }
        Command::ClientId => println!("{}", agent.client_id().await?),
        Command::Events { action } => match action {
            EventsCommand::Export { output } => {
                let ndjson = agent.event_buffer().export_ndjson().await?;
                match output {
                    Some(path) => std::fs::write(&path, ndjson)
                        .with_context(|| format!("Failed to write {}", path.display()))?,
                    None => std::io::stdout().write_all(ndjson.as_bytes())?,
                }
            }
            EventsCommand::Clear => {
                agent.event_buffer().clear().await?;
                println!("Event buffer cleared");
            }
            EventsCommand::Count => println!("{}", agent.event_buffer().len().await?),
        },
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());

        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("PANIC: {} at {}", message, location);
    }));
}

fn init_tracing(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("llm_warden=debug,info"));

    let subscriber = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    if config.log_format == "json" {
        subscriber.json().try_init().map_err(|e| e.to_string())?;
    } else {
        subscriber.try_init().map_err(|e| e.to_string())?;
    }

    Ok(())
}
