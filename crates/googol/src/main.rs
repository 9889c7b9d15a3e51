use std::io;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use googol_client::{ClientError, FeedSupervisor, GoogolClient, StatusFeedClient};
use shared::config::{Config, Transport};
use tokio::signal;
use tokio::sync::broadcast;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_log::LogTracer;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

mod console;
mod render;
mod search;

use render::TerminalRenderer;

const LOG_LEVEL: tracing::Level = tracing::Level::INFO;
#[cfg(not(debug_assertions))]
const GOOGOL_LEVEL: &str = "googol=INFO";
#[cfg(not(debug_assertions))]
const GOOGOL_CLIENT_LEVEL: &str = "googol_client=INFO";

#[cfg(debug_assertions)]
const GOOGOL_LEVEL: &str = "googol=DEBUG";
#[cfg(debug_assertions)]
const GOOGOL_CLIENT_LEVEL: &str = "googol_client=DEBUG";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Settings file to use instead of the one in the user's config dir.
    #[arg(short, long, env = "GOOGOL_CONFIG")]
    config: Option<PathBuf>,
    /// Override the backend base URL.
    #[arg(long, env = "GOOGOL_BASE_URL")]
    base_url: Option<String>,
    /// Also write logs to a daily rolling file.
    #[arg(long)]
    log_file: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stream live system status from the barrels.
    Status {
        /// Connect with ws:// instead of wss://.
        #[arg(long)]
        insecure: bool,
        /// Use the feed endpoint from the settings file if the backend
        /// can't provide one.
        #[arg(long)]
        fallback_defaults: bool,
        /// Reconnect when the feed drops.
        #[arg(long)]
        reconnect: bool,
        /// Print each snapshot as a JSON line.
        #[arg(long)]
        json: bool,
    },
    /// Run a single search and print one page of results.
    Search {
        #[arg(required = true)]
        query: Vec<String>,
        #[arg(long)]
        page_size: Option<u32>,
        /// Skip the analysis and Hacker News lookups.
        #[arg(long)]
        no_extras: bool,
    },
    /// Interactive search console.
    Console,
    /// Submit one or more URLs for indexing.
    Index {
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// List the pages linking to a URL.
    Fathers { url: String },
    /// Hacker News stories matching a query.
    Stories {
        #[arg(required = true)]
        query: Vec<String>,
        /// Submit the stories' links for indexing.
        #[arg(long)]
        index: bool,
    },
    /// AI generated analysis for a query.
    Analysis {
        #[arg(required = true)]
        query: Vec<String>,
    },
}

pub fn setup_logging(log_file: bool) -> Option<WorkerGuard> {
    let (file_layer, guard) = match log_file.then(Config::logs_dir) {
        Some(Ok(dir)) => {
            let file_appender = tracing_appender::rolling::daily(dir, "googol.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            (
                Some(fmt::Layer::new().with_ansi(false).with_writer(non_blocking)),
                Some(guard),
            )
        }
        Some(Err(err)) => {
            eprintln!("Unable to open log directory: {err}");
            (None, None)
        }
        None => (None, None),
    };

    let subscriber = tracing_subscriber::registry()
        .with(
            EnvFilter::from_default_env()
                .add_directive(LOG_LEVEL.into())
                .add_directive(GOOGOL_LEVEL.parse().expect("Invalid EnvFilter"))
                .add_directive(GOOGOL_CLIENT_LEVEL.parse().expect("Invalid EnvFilter"))
                // Don't need debug/info level logging for these
                .add_directive("hyper=WARN".parse().expect("Invalid EnvFilter"))
                .add_directive("tungstenite=WARN".parse().expect("Invalid EnvFilter")),
        )
        .with(fmt::Layer::new().with_writer(io::stderr))
        .with(file_layer);
    tracing::subscriber::set_global_default(subscriber).expect("Unable to set a global subscriber");

    guard
}

fn load_config(args: &CliArgs) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Unable to load settings from {}", path.display()))?,
        None => Config::new().context("Unable to load settings")?,
    };

    if let Some(base_url) = &args.base_url {
        config.user_settings.base_url = base_url.clone();
    }

    Ok(config)
}

/// Ctrl-C fans out to every long running task through `shutdown_tx`.
fn listen_for_ctrl_c(shutdown_tx: broadcast::Sender<()>) {
    tokio::spawn(async move {
        if let Err(err) = signal::ctrl_c().await {
            log::error!("Unable to listen for shutdown signal: {}", err);
            return;
        }

        log::info!("Shutdown requested");
        let _ = shutdown_tx.send(());
    });
}

async fn run_status(
    config: &Config,
    api: &GoogolClient,
    insecure: bool,
    fallback_defaults: bool,
    reconnect: bool,
    json: bool,
) -> anyhow::Result<()> {
    let mut endpoint = match api.feed_endpoint().await {
        Ok(endpoint) => endpoint,
        Err(err @ ClientError::ConfigurationUnavailable { .. }) if fallback_defaults => {
            log::warn!("{}, using {}", err, config.user_settings.feed);
            config.user_settings.feed.clone()
        }
        Err(err) => return Err(err.into()),
    };

    if insecure {
        endpoint = endpoint.with_transport(Transport::Insecure);
    }
    log::info!("Connecting to status feed at {}", endpoint);

    let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
    listen_for_ctrl_c(shutdown_tx);

    let mut settings = config.user_settings.reconnect.clone();
    settings.enabled |= reconnect;

    let supervisor = FeedSupervisor::new(StatusFeedClient::new(endpoint), settings);
    let mut renderer = TerminalRenderer::new(json);
    let last = supervisor.run(&mut renderer, &mut shutdown_rx).await;
    log::debug!("status feed finished: {}", last);

    Ok(())
}

/// What the user sees when a command fails. Details only go to the logs.
pub fn failure_message(err: &anyhow::Error) -> &'static str {
    match err.downcast_ref::<ClientError>() {
        Some(err) => err.user_message(),
        None => "An error has occurred",
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let args = CliArgs::parse();

    let guard = setup_logging(args.log_file);
    LogTracer::init().expect("Unable to initialize LogTracer");

    if let Err(err) = run(args).await {
        log::error!("{:#}", err);
        eprintln!("{}", failure_message(&err));
        drop(guard);
        std::process::exit(1);
    }
}

async fn run(args: CliArgs) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    log::debug!("Backend at {}", config.user_settings.base_url);
    let api = GoogolClient::from_settings(&config.user_settings)?;

    match args.command {
        Command::Status {
            insecure,
            fallback_defaults,
            reconnect,
            json,
        } => run_status(&config, &api, insecure, fallback_defaults, reconnect, json).await,
        Command::Search {
            query,
            page_size,
            no_extras,
        } => {
            let page_size = page_size.unwrap_or(config.user_settings.page_size);
            search::run_once(&api, &query.join(" "), page_size, !no_extras).await
        }
        Command::Console => {
            let (shutdown_tx, _) = broadcast::channel(1);
            listen_for_ctrl_c(shutdown_tx.clone());
            console::run(&config, api, shutdown_tx).await
        }
        Command::Index { urls } => {
            let report = api.index(&urls).await?;
            println!("{}", report.message);
            Ok(())
        }
        Command::Fathers { url } => {
            search::print_fathers(&api, &url).await;
            Ok(())
        }
        Command::Stories { query, index } => {
            search::run_stories(&api, &query.join(" "), index).await
        }
        Command::Analysis { query } => {
            match api.analysis(&query.join(" ")).await {
                Ok(text) => println!("{text}"),
                Err(err) => {
                    log::error!("Unable to fetch analysis: {}", err);
                    println!("Couldn't fetch analysis");
                }
            }
            Ok(())
        }
    }
}
