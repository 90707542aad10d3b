// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use coursegate_core::gateway::{run_gateway, shutdown_signal};
use coursegate_core::observability::init_logging;
use coursegate_core::scheduler::{parse_schedule, run_on_schedule, SystemClock};
use coursegate_core::store::SqliteStore;
use coursegate_core::{Config, Engine};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "coursegate")]
#[command(version)]
#[command(about = "License entitlement and secure media access engine", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP gateway and the scheduled privilege expiry loop
    Serve,

    /// Bring one account's access grants in line with its tier
    Reconcile {
        #[arg(short, long)]
        user: String,
    },

    /// Mint a signed playback token
    Token {
        #[arg(short, long)]
        user: Option<String>,

        #[arg(short, long)]
        media: String,

        /// Lifetime in seconds (defaults to media.default_ttl_secs)
        #[arg(long)]
        ttl: Option<u64>,
    },

    /// Run one privilege expiry pass
    Expire,

    /// Renew the standing authorization
    Renew,

    /// Validate configuration and exit
    ConfigCheck,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    let level = if cli.verbose {
        "debug"
    } else {
        config.observability.log_level.as_str()
    };
    init_logging(level);

    if let Commands::ConfigCheck = cli.command {
        config.validate()?;
        println!("configuration ok");
        println!("{config:#?}");
        return Ok(());
    }

    config.validate().context("invalid configuration")?;
    let db_path = config.store.resolved_path();
    let store = Arc::new(
        SqliteStore::open(&db_path)
            .with_context(|| format!("failed to open store at {}", db_path.display()))?,
    );
    let engine = Engine::build(&config, store, Arc::new(SystemClock))?;

    match cli.command {
        Commands::Serve => serve(&config, engine).await?,
        Commands::Reconcile { user } => {
            let report = engine.reconciler.reconcile_user(&user).await?;
            print_json(&report)?;
            if !report.is_complete() {
                anyhow::bail!("{} grant write(s) failed", report.errors.len());
            }
        }
        Commands::Token { user, media, ttl } => {
            let token = engine
                .tokens
                .issue_for_media(user.as_deref(), &media, ttl.map(Duration::from_secs))
                .await?;
            print_json(&token)?;
            println!("{}", token.playback_url(engine.tokens.base_url()));
        }
        Commands::Expire => print_json(&engine.scheduler.run_once().await?)?,
        Commands::Renew => print_json(&engine.scheduler.renew().await?)?,
        Commands::ConfigCheck => {}
    }
    Ok(())
}

async fn serve(config: &Config, engine: Engine) -> Result<()> {
    let schedule = parse_schedule(&config.scheduler.schedule)?;
    let (stop_tx, mut stop_rx) = tokio::sync::watch::channel(());

    let expiry_loop = tokio::spawn(run_on_schedule(
        engine.scheduler.clone(),
        schedule,
        async move {
            let _ = stop_rx.changed().await;
        },
    ));

    run_gateway(config, engine, async move {
        shutdown_signal().await;
        let _ = stop_tx.send(());
    })
    .await?;

    expiry_loop.await.context("privilege expiry loop panicked")?;
    Ok(())
}
