use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use routewatch::channels::TelegramChannel;
use routewatch::config::Config;
use routewatch::db::{LibSqlStore, ReasonStore, TIMESTAMP_FORMAT};
use routewatch::dialog::ConversationController;
use routewatch::roster::SupervisorRoster;
use routewatch::Dispatcher;

#[derive(Parser)]
#[command(name = "routewatch", version, about = "Route status tracking bot")]
struct Cli {
    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Run the bot (default).
    Run,
    /// Print the most recent route events and exit.
    Recent {
        /// How many events to show.
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().context("failed to load configuration")?;

    match Cli::parse().command.unwrap_or(CliCommand::Run) {
        CliCommand::Run => run(config).await,
        CliCommand::Recent { limit } => recent(config, limit).await,
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    let store = LibSqlStore::open(&config.database.path)
        .await
        .with_context(|| format!("failed to open database at {}", config.database.path.display()))?;
    tracing::info!(path = %config.database.path.display(), "database ready");

    let roster = SupervisorRoster::new(&config.roster);
    tracing::info!(supervisors = %roster.display_options(), "roster loaded");

    let channel = TelegramChannel::new(config.telegram.clone());
    let me = channel
        .get_me()
        .await
        .context("Telegram credential check failed")?;
    tracing::info!(
        id = me.id,
        name = %me.first_name,
        username = me.username.as_deref().unwrap_or(""),
        "connected to Telegram"
    );

    let controller = ConversationController::new(Arc::new(store), roster);
    let dispatcher = Dispatcher::new(Arc::new(channel), Arc::new(controller));

    tracing::info!("receiving updates");
    dispatcher.run().await?;
    Ok(())
}

async fn recent(config: Config, limit: u32) -> anyhow::Result<()> {
    let store = LibSqlStore::open(&config.database.path)
        .await
        .with_context(|| format!("failed to open database at {}", config.database.path.display()))?;

    let events = store.recent_events(limit).await?;
    if events.is_empty() {
        println!("no route events recorded");
        return Ok(());
    }

    for event in events {
        let kind = if event.is_route_start() {
            "route start"
        } else {
            "departure"
        };
        let reason = event.reason.as_deref().unwrap_or("-");
        println!(
            "{:>6}  {}  {:<12} {} / {}  {}",
            event.id,
            event.recorded_at.format(TIMESTAMP_FORMAT),
            kind,
            event.full_name,
            event.supervisor,
            reason
        );
    }
    Ok(())
}
