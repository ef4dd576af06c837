use anyhow::{Context, Result};
use serde::Serialize;

/// Results go to stdout as pretty JSON; logs stay on stderr.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{text}");
    Ok(())
}
