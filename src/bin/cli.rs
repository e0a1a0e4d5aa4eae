//! Harvester CLI
//!
//! Runs extractions and inspects the per-domain pattern store.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use harvester::{
    error::{AppError, Result},
    models::{Config, ExtractionReport},
    page::StaticPage,
    pipeline,
    services::{CancelToken, StrategyRegistry},
    storage::PatternStore,
    utils::{get_domain, http},
};

/// harvester - learns which strategy reveals full-size listing images
#[derive(Parser, Debug)]
#[command(name = "harvester", version, about = "Adaptive listing image extractor")]
struct Cli {
    /// Directory holding config.toml and the pattern store
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract images from a listing page and remember what worked
    Extract {
        /// Listing page URL
        url: String,

        /// Drive a headless Chromium instead of fetching static HTML
        #[cfg(feature = "browser")]
        #[arg(long)]
        browser: bool,

        /// Show the browser window
        #[cfg(feature = "browser")]
        #[arg(long, requires = "browser")]
        visible: bool,
    },

    /// Show the stored record for a domain
    History {
        /// Domain or URL
        domain: String,
    },

    /// Delete the stored record for a domain
    Forget {
        /// Domain or URL
        domain: String,
    },

    /// List strategies in the order they are tried
    Strategies,

    /// Validate configuration
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Accept either a bare domain or a full URL.
fn normalize_domain(input: &str) -> String {
    get_domain(input).unwrap_or_else(|| {
        let lower = input.trim().to_lowercase();
        lower.strip_prefix("www.").unwrap_or(&lower).to_string()
    })
}

fn print_report(report: &ExtractionReport) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

/// Cancel the run on Ctrl-C; the current step finishes first.
fn cancel_on_ctrl_c() -> CancelToken {
    let cancel = CancelToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, stopping after the current step...");
            token.cancel();
        }
    });
    cancel
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.storage_dir.join("config.toml");
    let mut config = Config::load_optional(&config_path);
    config.storage.root_dir = cli.storage_dir.clone();

    let store = Arc::new(PatternStore::open_local(&config.storage));

    match cli.command {
        #[cfg(feature = "browser")]
        Command::Extract {
            url,
            browser: true,
            visible,
        } => {
            config.validate()?;
            let cancel = cancel_on_ctrl_c();
            let mut page = harvester::page::ChromiumPage::launch(&url, visible).await?;
            let outcome = pipeline::run_extract(&config, store, &url, &mut page, &cancel).await;
            if let Err(e) = page.close().await {
                log::warn!("Failed to close browser: {}", e);
            }
            print_report(&outcome?)?;
        }

        Command::Extract { url, .. } => {
            config.validate()?;
            let cancel = cancel_on_ctrl_c();
            let client = http::create_async_client(&config.http)?;
            let mut page = StaticPage::fetch(&client, &url).await?;
            let report = pipeline::run_extract(&config, store, &url, &mut page, &cancel).await?;
            print_report(&report)?;
        }

        Command::History { domain } => {
            let domain = normalize_domain(&domain);
            match store.get_record(&domain).await? {
                Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
                None => log::info!("No history for {}", domain),
            }
        }

        Command::Forget { domain } => {
            let domain = normalize_domain(&domain);
            if store.forget(&domain).await? {
                log::info!("Forgot {}", domain);
            } else {
                log::info!("No history for {}", domain);
            }
        }

        Command::Strategies => {
            let registry = StrategyRegistry::from_config(&config)?;
            for (i, strategy) in registry.iter().enumerate() {
                println!("{}. {} ({} actions)", i + 1, strategy.name, strategy.steps().count());
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            StrategyRegistry::from_config(&config)
                .map_err(|e| AppError::validation(e.to_string()))?;

            log::info!("✓ Config OK");
        }
    }

    Ok(())
}
