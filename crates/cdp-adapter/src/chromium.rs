//! [`DomPort`] over a live Chromium page.

use std::{fs, time::Duration};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as Base64, Engine as _};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::Page;
use futures::StreamExt;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    config::CdpConfig,
    dom::{DomEvent, DomPort, ElementInfo, FilePayload},
    scripts, AdapterError, AdapterErrorKind, ElementHandle,
};

/// A launched browser with the single page the agent works in.
pub struct ChromiumDom {
    browser: Mutex<Browser>,
    page: Page,
    handler_task: JoinHandle<()>,
}

#[derive(Deserialize)]
struct Envelope {
    ok: bool,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ChromiumDom {
    /// Launch Chromium and open a blank page.
    pub async fn launch(config: &CdpConfig) -> Result<Self, AdapterError> {
        let browser_config = browser_config(config)?;
        let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|err| {
            AdapterError::new(AdapterErrorKind::Launch)
                .with_hint(format!("failed to launch chromium: {err}"))
        })?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(target: "cdp-adapter", %err, "handler event error");
                }
            }
        });

        let page = browser.new_page("about:blank").await.map_err(cdp_io)?;
        info!(
            target: "cdp-adapter",
            executable = %config.executable.display(),
            headless = config.headless,
            "browser launched"
        );

        Ok(Self {
            browser: Mutex::new(browser),
            page,
            handler_task,
        })
    }

    /// Navigate the page and wait for the load to settle.
    pub async fn open(&self, url: &str) -> Result<(), AdapterError> {
        self.page.goto(url).await.map_err(|err| {
            AdapterError::new(AdapterErrorKind::NavTimeout)
                .with_hint(format!("{url}: {err}"))
                .retriable(true)
        })?;
        Ok(())
    }

    pub async fn close(self) {
        let mut browser = self.browser.lock().await;
        if let Err(err) = browser.close().await {
            warn!(target: "cdp-adapter", %err, "browser close failed");
        }
        let _ = browser.wait().await;
        drop(browser);
        self.handler_task.abort();
    }

    async fn call<T: DeserializeOwned>(&self, body: &str, args: Value) -> Result<T, AdapterError> {
        let mut params = EvaluateParams::new(scripts::wrap(body, &args));
        params.await_promise = Some(true);
        params.return_by_value = Some(true);

        let result = self
            .page
            .evaluate_expression(params)
            .await
            .map_err(cdp_io)?;
        let envelope: Envelope = result.into_value().map_err(|err| {
            AdapterError::new(AdapterErrorKind::Script)
                .with_hint(format!("unexpected script result: {err}"))
        })?;

        if !envelope.ok {
            let message = envelope.message.unwrap_or_default();
            let kind = match envelope.kind.as_deref() {
                Some("stale") => AdapterErrorKind::StaleHandle,
                Some("selector") => AdapterErrorKind::InvalidSelector,
                _ => AdapterErrorKind::Script,
            };
            return Err(AdapterError::new(kind).with_hint(message));
        }

        serde_json::from_value(envelope.value).map_err(|err| {
            AdapterError::new(AdapterErrorKind::Script)
                .with_hint(format!("script value did not decode: {err}"))
        })
    }
}

#[async_trait]
impl DomPort for ChromiumDom {
    async fn current_url(&self) -> Result<String, AdapterError> {
        self.call(scripts::CURRENT_URL, Value::Null).await
    }

    async fn title(&self) -> Result<String, AdapterError> {
        self.call(scripts::TITLE, Value::Null).await
    }

    async fn body_text(&self) -> Result<String, AdapterError> {
        self.call(scripts::BODY_TEXT, Value::Null).await
    }

    async fn query_all(
        &self,
        scope: Option<ElementHandle>,
        selector: &str,
    ) -> Result<Vec<ElementHandle>, AdapterError> {
        self.call(
            scripts::QUERY_ALL,
            json!({ "scope": scope, "selector": selector }),
        )
        .await
    }

    async fn describe(&self, handle: ElementHandle) -> Result<ElementInfo, AdapterError> {
        self.call(scripts::DESCRIBE, json!({ "handle": handle })).await
    }

    async fn closest(
        &self,
        handle: ElementHandle,
        selector: &str,
    ) -> Result<Option<ElementHandle>, AdapterError> {
        self.call(
            scripts::CLOSEST,
            json!({ "handle": handle, "selector": selector }),
        )
        .await
    }

    async fn set_value(&self, handle: ElementHandle, value: &str) -> Result<(), AdapterError> {
        self.call::<Value>(scripts::SET_VALUE, json!({ "handle": handle, "value": value }))
            .await
            .map(|_| ())
    }

    async fn dispatch(&self, handle: ElementHandle, event: DomEvent) -> Result<(), AdapterError> {
        self.call::<Value>(scripts::DISPATCH, json!({ "handle": handle, "event": event }))
            .await
            .map(|_| ())
    }

    async fn focus(&self, handle: ElementHandle) -> Result<(), AdapterError> {
        self.call::<Value>(scripts::FOCUS, json!({ "handle": handle }))
            .await
            .map(|_| ())
    }

    async fn native_click(&self, handle: ElementHandle) -> Result<(), AdapterError> {
        self.call::<Value>(scripts::NATIVE_CLICK, json!({ "handle": handle }))
            .await
            .map(|_| ())
    }

    async fn scroll_into_view(&self, handle: ElementHandle) -> Result<(), AdapterError> {
        self.call::<Value>(scripts::SCROLL_INTO_VIEW, json!({ "handle": handle }))
            .await
            .map(|_| ())
    }

    async fn scroll_viewport(&self, delta_y: i64) -> Result<(), AdapterError> {
        self.call::<Value>(scripts::SCROLL_VIEWPORT, json!({ "dy": delta_y }))
            .await
            .map(|_| ())
    }

    async fn set_files(
        &self,
        handle: ElementHandle,
        files: &[FilePayload],
    ) -> Result<(), AdapterError> {
        let files: Vec<Value> = files
            .iter()
            .map(|file| {
                json!({
                    "name": file.name,
                    "mime": file.mime,
                    "data": Base64.encode(&file.bytes),
                })
            })
            .collect();
        let attached: u64 = self
            .call(scripts::SET_FILES, json!({ "handle": handle, "files": files }))
            .await?;
        debug!(target: "cdp-adapter", %handle, attached, "files injected");
        Ok(())
    }
}

fn cdp_io(err: impl std::fmt::Display) -> AdapterError {
    AdapterError::new(AdapterErrorKind::CdpIo)
        .with_hint(err.to_string())
        .retriable(true)
}

fn browser_config(cfg: &CdpConfig) -> Result<BrowserConfig, AdapterError> {
    if !cfg.executable.as_os_str().is_empty() && !cfg.executable.exists() {
        return Err(AdapterError::new(AdapterErrorKind::Launch)
            .with_hint(format!(
                "chrome executable not found at {}",
                cfg.executable.display()
            ))
            .with_data(json!({
                "expected": cfg.executable,
                "hint": "Set RELIST_CHROME to the full path of chrome/chromium."
            })));
    }

    let profile_dir = if cfg.user_data_dir.is_absolute() {
        cfg.user_data_dir.clone()
    } else {
        let cwd = std::env::current_dir().map_err(|err| {
            AdapterError::new(AdapterErrorKind::Internal)
                .with_hint(format!("failed to resolve cwd for user-data-dir: {err}"))
        })?;
        cwd.join(&cfg.user_data_dir)
    };
    fs::create_dir_all(&profile_dir).map_err(|err| {
        AdapterError::new(AdapterErrorKind::Internal)
            .with_hint(format!("failed to ensure user-data-dir: {err}"))
    })?;

    let mut builder = BrowserConfig::builder()
        .request_timeout(Duration::from_millis(cfg.request_timeout_ms))
        .launch_timeout(Duration::from_millis(cfg.launch_timeout_ms))
        .window_size(cfg.window_width, cfg.window_height)
        .user_data_dir(profile_dir);

    if !cfg.headless {
        builder = builder.with_head();
    }
    if !cfg.executable.as_os_str().is_empty() {
        builder = builder.chrome_executable(cfg.executable.clone());
    }

    builder = builder.args(vec![
        "--disable-background-timer-throttling",
        "--disable-dev-shm-usage",
        "--disable-popup-blocking",
        "--no-first-run",
        "--no-default-browser-check",
        "--password-store=basic",
        "--use-mock-keychain",
    ]);

    builder.build().map_err(|err| {
        AdapterError::new(AdapterErrorKind::Internal)
            .with_hint(format!("browser config error: {err}"))
    })
}
