use std::process::ExitCode;

use agent_core::{MarketplaceProfile, ProfileSummary};
use anyhow::Result;
use clap::Args;

use super::output::print_json;

#[derive(Args, Clone, Debug, Default)]
pub struct ProfilesArgs {
    /// Print the profiles as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn cmd_profiles(args: ProfilesArgs) -> Result<ExitCode> {
    let summaries: Vec<ProfileSummary> = MarketplaceProfile::all()
        .iter()
        .map(MarketplaceProfile::summary)
        .collect();

    if args.json {
        print_json(&summaries)?;
    } else {
        for summary in &summaries {
            println!("{}", render_summary(summary));
        }
    }
    Ok(ExitCode::SUCCESS)
}

pub fn render_summary(summary: &ProfileSummary) -> String {
    let price = match (summary.min_price, summary.max_price) {
        (Some(min), Some(max)) => format!(" price {min}-{max}"),
        (Some(min), None) => format!(" price >={min}"),
        (None, Some(max)) => format!(" price <={max}"),
        (None, None) => String::new(),
    };
    format!(
        "{:<10} title<={} description<={} images<={}{}  {}",
        summary.name,
        summary.max_title_len,
        summary.max_description_len,
        summary.max_images,
        price,
        summary.create_url
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_summary_includes_price_clamp() {
        let line = render_summary(&MarketplaceProfile::mercari().summary());
        assert!(line.starts_with("mercari"));
        assert!(line.contains("title<=80"));
        assert!(line.contains("images<=12"));
        assert!(line.contains("price 1-2000"));
    }

    #[test]
    fn test_render_summary_without_price_bounds() {
        let line = render_summary(&MarketplaceProfile::poshmark().summary());
        assert!(!line.contains("price"));
        assert!(line.contains("description<=1500"));
    }
}
