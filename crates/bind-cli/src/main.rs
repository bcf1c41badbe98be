use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use bind_client::{HtmlDocumentParser, build_waterfall};
use bind_core::config::{ConfigOverrides, HarvestConfig, ensure_output_dir};
use bind_core::daemon::{HarvestDaemon, TracingHarvestReporter};
use bind_core::harvest::HarvestService;
use bind_core::ledger::HistoryLedger;
use bind_core::metrics::LayerMetrics;
use bind_core::output::{DEFAULT_RECENT_LIMIT, LinkArchive};
use bind_core::trackers::TrackerManager;

/// One week, in minutes.
const MAX_INTERVAL_MINS: u64 = 7 * 24 * 60;

#[derive(Parser)]
#[command(name = "bind", version, about = "Book Indexing Network Daemon")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the site for new uploads and write magnet links
    Daemon {
        /// Check interval in minutes
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..=MAX_INTERVAL_MINS))]
        interval: Option<u64>,

        /// Directory to store magnet files and history
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Site base URL (defaults to BIND_URL)
        #[arg(long)]
        base_url: Option<String>,

        /// Proxy for the second fetch layer (defaults to BIND_PROXY)
        #[arg(long)]
        proxy: Option<String>,

        /// Failed fetches before the circuit opens
        #[arg(long)]
        breaker_threshold: Option<u32>,

        /// Seconds the circuit stays open after the last failure
        #[arg(long, value_parser = parse_seconds)]
        breaker_cooldown: Option<Duration>,

        /// Run a single harvest and exit
        #[arg(long, default_value_t = false)]
        once: bool,
    },

    /// Manage the tracker list used in generated links
    Trackers {
        /// Output directory the tracker file sits beside
        #[arg(short, long, global = true)]
        output_dir: Option<PathBuf>,

        #[command(subcommand)]
        action: TrackerAction,
    },

    /// Show recently harvested links, newest first
    Recent {
        /// Number of links to show
        #[arg(short, long, default_value_t = DEFAULT_RECENT_LIMIT)]
        limit: usize,

        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Rebuild each link with the current tracker list
        #[arg(long, default_value_t = false)]
        regenerate: bool,
    },

    /// Search the site
    Search {
        term: String,

        #[arg(long)]
        base_url: Option<String>,

        #[arg(long)]
        proxy: Option<String>,
    },
}

#[derive(Subcommand)]
enum TrackerAction {
    /// Print the current trackers
    List,
    /// Replace the trackers, one per line, from a file or stdin
    Set {
        /// File to read (stdin if omitted)
        file: Option<PathBuf>,
    },
    /// Restore the default trackers
    Reset,
}

fn parse_seconds(raw: &str) -> Result<Duration, String> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .ok_or_else(|| format!("'{raw}' is not a non-negative number of seconds"))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("bind=info".parse()?)
                .add_directive("bind_core=info".parse()?)
                .add_directive("bind_client=info".parse()?),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Daemon {
            interval,
            output_dir,
            base_url,
            proxy,
            breaker_threshold,
            breaker_cooldown,
            once,
        } => {
            let overrides = ConfigOverrides {
                base_url,
                proxy,
                output_dir,
                interval: interval.map(|mins| Duration::from_secs(mins * 60)),
                breaker_threshold,
                breaker_cooldown,
            };
            cmd_daemon(overrides, once).await?;
        }
        Commands::Trackers { output_dir, action } => {
            let config = resolve(ConfigOverrides {
                output_dir,
                ..Default::default()
            })?;
            cmd_trackers(&config, action)?;
        }
        Commands::Recent {
            limit,
            output_dir,
            regenerate,
        } => {
            let config = resolve(ConfigOverrides {
                output_dir,
                ..Default::default()
            })?;
            cmd_recent(&config, limit, regenerate)?;
        }
        Commands::Search {
            term,
            base_url,
            proxy,
        } => {
            let config = resolve(ConfigOverrides {
                base_url,
                proxy,
                ..Default::default()
            })?;
            cmd_search(&config, &term).await?;
        }
    }

    Ok(())
}

fn resolve(overrides: ConfigOverrides) -> Result<HarvestConfig> {
    HarvestConfig::from_env(overrides).context("Invalid configuration")
}

async fn cmd_daemon(overrides: ConfigOverrides, once: bool) -> Result<()> {
    let config = resolve(overrides)?;
    ensure_output_dir(&config.output_dir).context("Output directory is not usable")?;
    tracing::info!(?config, "Configuration resolved");

    let metrics = LayerMetrics::new();
    let waterfall =
        build_waterfall(&config, metrics.clone()).context("Failed to create HTTP clients")?;
    let service = HarvestService::new(
        waterfall,
        HtmlDocumentParser::new(),
        config.base_url.clone(),
    );
    let trackers =
        TrackerManager::new(&config.output_dir).context("Failed to initialize tracker store")?;

    let mut daemon = HarvestDaemon::new(
        service,
        HistoryLedger::open(&config.output_dir),
        trackers,
        LinkArchive::new(&config.output_dir),
        config.daemon.clone(),
    )
    .with_metrics(metrics);
    let reporter = TracingHarvestReporter;

    if once {
        let summary = daemon.run_once(&reporter).await;
        println!(
            "{} candidates, {} new links, {} already seen, {} without hash",
            summary.candidates, summary.emitted, summary.duplicates, summary.missing_identifier
        );
        return Ok(());
    }

    let cancel_token = CancellationToken::new();
    let signal_token = cancel_token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Shutdown signal received, finishing current pass");
                signal_token.cancel();
            }
            Err(e) => tracing::error!(error = %e, "Failed to install CTRL+C handler"),
        }
    });

    daemon.run(cancel_token, &reporter).await;
    Ok(())
}

fn cmd_trackers(config: &HarvestConfig, action: TrackerAction) -> Result<()> {
    let trackers =
        TrackerManager::new(&config.output_dir).context("Failed to initialize tracker store")?;

    match action {
        TrackerAction::List => {}
        TrackerAction::Set { file } => {
            let text = match file {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                None => {
                    let mut text = String::new();
                    std::io::stdin()
                        .read_to_string(&mut text)
                        .context("Failed to read trackers from stdin")?;
                    text
                }
            };
            trackers
                .set_from_text(&text)
                .context("Failed to save trackers")?;
        }
        TrackerAction::Reset => {
            trackers.reset().context("Failed to reset trackers")?;
        }
    }

    let current = trackers.get();
    for tracker in &current {
        println!("{tracker}");
    }
    eprintln!("{} trackers in {}", current.len(), trackers.path().display());

    Ok(())
}

fn cmd_recent(config: &HarvestConfig, limit: usize, regenerate: bool) -> Result<()> {
    let archive = LinkArchive::new(&config.output_dir);
    let links = archive
        .recent(limit)
        .context("Failed to read harvested links")?;

    if links.is_empty() {
        println!("No links in {}", archive.dir().display());
        return Ok(());
    }

    let trackers = if regenerate {
        Some(
            TrackerManager::new(&config.output_dir)
                .context("Failed to initialize tracker store")?
                .get(),
        )
    } else {
        None
    };

    for link in &links {
        let magnet = match &trackers {
            Some(trackers) => link.regenerate(trackers),
            None => link.to_link(),
        };
        println!("{}\t{}", link.title, magnet);
    }

    Ok(())
}

async fn cmd_search(config: &HarvestConfig, term: &str) -> Result<()> {
    let waterfall = build_waterfall(config, LayerMetrics::new())
        .context("Failed to create HTTP clients")?;
    let service = HarvestService::new(
        waterfall,
        HtmlDocumentParser::new(),
        config.base_url.clone(),
    );

    let results = service.search(term).await;
    if results.is_empty() {
        println!("No results for '{term}'");
        return Ok(());
    }

    for result in &results {
        println!("{}\t{}", result.title, result.detail_link);
    }

    Ok(())
}
