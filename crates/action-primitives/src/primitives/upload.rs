//! Upload primitive - inject fetched images into a file input

use cdp_adapter::{DomEvent, ElementHandle, FilePayload};
use tracing::{info, warn};

use crate::{errors::ActionError, primitives::ActionExecutor};

/// Used when the action's selector is missing or stale.
const FILE_INPUT: &str = "input[type=\"file\"]";

/// Execute upload primitive
///
/// Steps:
/// 1. Parse the value as a JSON list of image URLs
/// 2. Fetch up to `max_images` of them, skipping failures
/// 3. Inject the files into the file input and fire change
///
/// Succeeds only when at least one image made it into the input.
pub async fn execute_upload(
    executor: &ActionExecutor,
    selector: Option<&str>,
    value: &str,
) -> Result<(), ActionError> {
    let urls = parse_urls(value)?;
    let max_images = executor.options().max_images;
    info!(
        selector = selector.unwrap_or(FILE_INPUT),
        requested = urls.len(),
        max_images,
        "Executing upload primitive"
    );

    let input = file_input(executor, selector).await?;

    let mut files: Vec<FilePayload> = Vec::new();
    for (index, url) in urls.iter().take(max_images).enumerate() {
        match executor.fetcher().fetch(url).await {
            Ok(mut file) => {
                file.name = format!("{:02}-{}", index + 1, file.name);
                files.push(file);
            }
            Err(err) => warn!(url = %url, %err, "skipping image"),
        }
    }
    if files.is_empty() {
        return Err(ActionError::Fetch("no image could be fetched".to_string()));
    }

    let dom = executor.dom();
    dom.set_files(input, &files).await?;
    dom.dispatch(input, DomEvent::Input).await?;
    dom.dispatch(input, DomEvent::Change).await?;
    info!(uploaded = files.len(), "Upload completed");
    Ok(())
}

fn parse_urls(value: &str) -> Result<Vec<String>, ActionError> {
    let urls: Vec<String> = serde_json::from_str(value)
        .map_err(|e| ActionError::invalid(format!("upload value is not a JSON list: {e}")))?;
    let urls: Vec<String> = urls
        .into_iter()
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .collect();
    if urls.is_empty() {
        return Err(ActionError::invalid("upload value lists no images"));
    }
    Ok(urls)
}

async fn file_input(
    executor: &ActionExecutor,
    selector: Option<&str>,
) -> Result<ElementHandle, ActionError> {
    let locator = executor.locator();
    if let Some(selector) = selector {
        if let Some(handle) = locator.resolve(selector).await {
            return Ok(handle);
        }
    }
    // File inputs are usually hidden behind a styled drop zone.
    locator
        .resolve(FILE_INPUT)
        .await
        .ok_or_else(|| ActionError::not_found(FILE_INPUT))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_urls() {
        assert_eq!(
            parse_urls(r#"["https://img.test/a.jpg", " ", "https://img.test/b.jpg"]"#).unwrap(),
            vec!["https://img.test/a.jpg", "https://img.test/b.jpg"]
        );
        assert!(parse_urls("[]").is_err());
        assert!(parse_urls("").is_err());
        assert!(parse_urls("https://img.test/a.jpg").is_err());
    }
}
