mod config_commands;
mod media_commands;
mod replay;

use std::{path::PathBuf, sync::Arc};

use {
    clap::{Parser, Subcommand},
    ditzy_config::DitzyConfig,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "ditzy", about = "Ditzy, a WhatsApp sticker and media bot")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides discovery in ./ and ~/.config/ditzy/).
    #[arg(long, global = true, env = "DITZY_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the normalized form of an envelope (or upsert batch) file.
    Normalize {
        envelope: PathBuf,
        /// The bot's own JID, used for `fromMe` envelopes.
        #[arg(long, default_value = "")]
        self_id: String,
    },
    /// Convert an image into a 512x512 WebP sticker.
    Sticker {
        input: PathBuf,
        output: PathBuf,
        /// Sticker pack name (defaults to the configured pack or bot name).
        #[arg(long)]
        pack: Option<String>,
        /// Sticker author.
        #[arg(long)]
        author: Option<String>,
    },
    /// Convert a sticker back into a PNG.
    Toimg { input: PathBuf, output: PathBuf },
    /// Remove expired temp artifacts once.
    Sweep {
        /// Override `temp.ttl_secs`.
        #[arg(long)]
        ttl_secs: Option<u64>,
    },
    /// Replay recorded upsert batches (JSON lines) through the command handler.
    Replay {
        session: PathBuf,
        /// The bot's own JID.
        #[arg(long, default_value = "")]
        self_id: String,
        /// Clock for the staleness filter, in unix seconds.
        #[arg(long)]
        at: Option<u64>,
    },
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<DitzyConfig> {
    match &cli.config {
        Some(path) => Ok(ditzy_config::load_config(path)?),
        None => Ok(ditzy_config::discover_and_load()),
    }
}

async fn run(command: Commands, config: DitzyConfig) -> anyhow::Result<()> {
    match command {
        Commands::Normalize { envelope, self_id } => {
            media_commands::normalize_file(&envelope, &self_id).await
        },
        Commands::Sticker {
            input,
            output,
            pack,
            author,
        } => {
            media_commands::sticker(
                &config,
                &input,
                &output,
                pack.as_deref(),
                author.as_deref(),
            )
            .await
        },
        Commands::Toimg { input, output } => media_commands::to_image(&config, &input, &output).await,
        Commands::Sweep { ttl_secs } => media_commands::sweep(&config, ttl_secs).await,
        Commands::Replay {
            session,
            self_id,
            at,
        } => {
            replay::replay(Arc::new(config), &session, replay::ReplayOptions {
                self_id: &self_id,
                at,
            })
            .await?;
            Ok(())
        },
        Commands::Config { .. } => Ok(()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "ditzy starting");

    let config = load_config(&cli);
    match cli.command {
        // Load failures are reported as diagnostics here.
        Commands::Config { action } => config_commands::handle_config(
            action,
            &config.unwrap_or_default(),
            cli.config.as_deref(),
        ),
        command => run(command, config?).await,
    }
}
