use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};

use agent_core::{
    FanoutNotifier, HttpPlanner, ListingAgent, ListingPayload, LogNotifier, MarketplaceProfile,
    RunNotifier, RunOutcome, WebhookNotifier,
};
use cdp_adapter::ChromiumDom;

use super::output::print_json;
use crate::config::Config;

/// Exit code for a run that finished but did not publish the listing.
pub const EXIT_RUN_FAILED: u8 = 2;

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Marketplace profile (poshmark, mercari, ebay)
    #[arg(short, long)]
    pub marketplace: String,

    /// Listing payload as a JSON file
    #[arg(short, long, value_name = "FILE")]
    pub listing: PathBuf,

    /// Start page (defaults to the marketplace's create-listing page)
    #[arg(long)]
    pub url: Option<String>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,
}

pub async fn cmd_run(args: RunArgs, config: &Config) -> Result<ExitCode> {
    let profile = MarketplaceProfile::by_name(&args.marketplace)?;
    let listing = read_listing(&args.listing).await?;
    let planner = HttpPlanner::new(&config.planner).context("Failed to configure the planner")?;
    let notifier = Arc::new(build_notifier(config)?);
    let start_url = args.url.clone().unwrap_or_else(|| profile.create_url.clone());

    let mut browser = config.browser.clone();
    if args.headed {
        browser.headless = false;
    }
    let dom = Arc::new(
        ChromiumDom::launch(&browser)
            .await
            .context("Failed to launch the browser")?,
    );

    info!(
        marketplace = %profile.name,
        url = %start_url,
        title = %listing.title,
        "Starting listing run"
    );
    let result = drive(
        dom.clone(),
        Arc::new(planner),
        profile,
        notifier.clone(),
        config,
        &start_url,
        &listing,
    )
    .await;

    notifier.flush().await;
    close_browser(dom).await;

    let outcome = result?;
    print_json(&outcome)?;
    Ok(if outcome.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_RUN_FAILED)
    })
}

/// Read a listing payload from a JSON file.
pub async fn read_listing(path: &Path) -> Result<ListingPayload> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read listing {}", path.display()))?;
    let listing = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse listing {}", path.display()))?;
    Ok(listing)
}

fn build_notifier(config: &Config) -> Result<FanoutNotifier> {
    let mut notifier = FanoutNotifier::new().with(Arc::new(LogNotifier));
    if let Some(url) = config.notifications.webhook_url() {
        let webhook = WebhookNotifier::new(url).context("Invalid notification webhook")?;
        notifier = notifier.with(Arc::new(webhook));
    }
    Ok(notifier)
}

async fn drive(
    dom: Arc<ChromiumDom>,
    planner: Arc<HttpPlanner>,
    profile: MarketplaceProfile,
    notifier: Arc<FanoutNotifier>,
    config: &Config,
    start_url: &str,
    listing: &ListingPayload,
) -> Result<RunOutcome> {
    dom.open(start_url)
        .await
        .with_context(|| format!("Failed to open {start_url}"))?;

    let agent = ListingAgent::builder(dom, planner, profile)
        .config(config.agent.clone())
        .pacing(config.pacing.clone())
        .snapshot_limits(config.snapshot.clone())
        .notifier(notifier)
        .build()?;

    Ok(agent.run(listing).await)
}

async fn close_browser(dom: Arc<ChromiumDom>) {
    match Arc::try_unwrap(dom) {
        Ok(dom) => dom.close().await,
        Err(_) => warn!("Browser is still in use; leaving it to process exit"),
    }
}
