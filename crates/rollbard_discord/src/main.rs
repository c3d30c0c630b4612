use std::path::PathBuf;

use clap::Parser;
use miette::Result;
use rollbard_core::{Config, config};
use rollbard_discord::{DiscordError, create_discord_client};
use tracing::info;

#[derive(Parser)]
#[command(name = "rollbard", version, about = "Tabletop dice and fight music for Discord")]
struct Cli {
    /// Configuration file path
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Enable debug logging for serenity and songbird too
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load environment variables
    config::load_dotenv();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    config.validate()?;

    init_logging(&config.logging.directory, cli.debug);
    info!("Starting Rollbard");

    let mut client = create_discord_client(&config).await?;

    info!("Connecting to Discord...");
    client
        .start()
        .await
        .map_err(|cause| DiscordError::ConnectionFailed { cause })?;

    Ok(())
}

fn init_logging(directory: &str, debug: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    // Create logs directory if it doesn't exist
    std::fs::create_dir_all(directory).ok();

    let file_appender = tracing_appender::rolling::daily(directory, "rollbard.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Keep the writer alive for the whole run
    Box::leak(Box::new(guard));

    let default_filter = if debug {
        "rollbard=trace,rollbard_core=trace,rollbard_discord=trace,serenity=debug,songbird=debug"
    } else {
        "rollbard=debug,rollbard_core=debug,rollbard_discord=debug,serenity=info,songbird=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            // Console output
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_line_number(true),
        )
        .with(
            // File output
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_ansi(false),
        )
        .init();
}
