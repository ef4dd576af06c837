use std::process::ExitCode;
use std::sync::Arc;

use action_locator::ElementLocator;
use anyhow::{Context, Result};
use clap::Args;
use cdp_adapter::ChromiumDom;
use perceiver_structural::{PageSnapshot, StructuralPerceiver};
use tracing::warn;

use super::output::print_json;
use crate::config::Config;

#[derive(Args, Clone, Debug)]
pub struct SnapshotArgs {
    /// Page to capture
    #[arg(long)]
    pub url: String,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,
}

pub async fn cmd_snapshot(args: SnapshotArgs, config: &Config) -> Result<ExitCode> {
    let mut browser = config.browser.clone();
    if args.headed {
        browser.headless = false;
    }
    let dom = Arc::new(
        ChromiumDom::launch(&browser)
            .await
            .context("Failed to launch the browser")?,
    );

    let captured = capture(&dom, &args.url, config).await;

    match Arc::try_unwrap(dom) {
        Ok(dom) => dom.close().await,
        Err(_) => warn!("Browser is still in use; leaving it to process exit"),
    }

    print_json(&captured?)?;
    Ok(ExitCode::SUCCESS)
}

async fn capture(dom: &Arc<ChromiumDom>, url: &str, config: &Config) -> Result<PageSnapshot> {
    dom.open(url)
        .await
        .with_context(|| format!("Failed to open {url}"))?;
    let perceiver =
        StructuralPerceiver::new(ElementLocator::new(dom.clone()), config.snapshot.clone());
    perceiver.capture().await.context("Failed to capture the page")
}
