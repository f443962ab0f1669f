//! Chromium environment driven over CDP with chromiumoxide.
//!
//! One browser, one page. The CDP handler runs on its own task for the whole
//! life of the environment; [`Environment::teardown`] closes the browser and
//! joins that task.

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chromiumoxide::browser::BrowserConfig as ChromeConfig;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::{Browser, Element, Page};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use webpilot_agent::environment::{Environment, EnvironmentError, Snapshot};
use webpilot_core::config::BrowserConfig;
use webpilot_core::utils::expand_home;

use crate::actions::{selector, BrowserAction};
use crate::page::{clear_value_script, close_popup_script, scan_script, scroll_script, PageScan};

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const SETTLE_DELAY: Duration = Duration::from_millis(500);
const HANDLER_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

// ─────────────────────────────────────────────
// Launch configuration
// ─────────────────────────────────────────────

/// Extra Chromium command-line flags.
pub fn launch_args(config: &BrowserConfig) -> Vec<String> {
    let mut args = vec![
        "--disable-background-networking",
        "--disable-breakpad",
        "--disable-component-update",
        "--disable-default-apps",
        "--disable-dev-shm-usage",
        "--disable-extensions",
        "--disable-sync",
        "--disable-blink-features=AutomationControlled",
        "--no-first-run",
        "--no-default-browser-check",
        "--password-store=basic",
        "--use-mock-keychain",
    ];
    if config.headless {
        args.push("--hide-scrollbars");
        args.push("--mute-audio");
    }
    args.into_iter().map(String::from).collect()
}

/// The configured binary. `None` lets chromiumoxide detect one.
pub fn executable_path(config: &BrowserConfig) -> Option<PathBuf> {
    config
        .executable_path
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .map(expand_home)
}

fn chrome_config(config: &BrowserConfig) -> anyhow::Result<ChromeConfig> {
    let mut builder = ChromeConfig::builder()
        .request_timeout(Duration::from_millis(config.navigation_timeout_ms))
        .launch_timeout(Duration::from_secs(config.launch_timeout_secs))
        .window_size(config.window_width, config.window_height)
        .args(launch_args(config));

    if !config.headless {
        builder = builder.with_head();
    }
    if let Some(path) = executable_path(config) {
        builder = builder.chrome_executable(path);
    }
    if let Some(dir) = &config.user_data_dir {
        builder = builder.user_data_dir(expand_home(dir));
    }

    builder
        .build()
        .map_err(|e| anyhow!("browser config error: {e}"))
}

// ─────────────────────────────────────────────
// ChromeEnvironment
// ─────────────────────────────────────────────

pub struct ChromeEnvironment {
    browser: tokio::sync::Mutex<Option<Browser>>,
    page: Mutex<Option<Page>>,
    handler: Mutex<Option<JoinHandle<()>>>,
    action_timeout: Duration,
    navigation_timeout: Duration,
}

impl ChromeEnvironment {
    /// Start Chromium and open a blank page.
    pub async fn launch(config: &BrowserConfig) -> anyhow::Result<Self> {
        let chrome = chrome_config(config)?;
        let (browser, mut handler) = Browser::launch(chrome)
            .await
            .context("failed to launch Chromium (set browser.executablePath or CHROME_PATH)")?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "cdp handler error");
                }
            }
            debug!("cdp handler finished");
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler_task.abort();
                return Err(anyhow!(e).context("failed to open a page"));
            }
        };

        info!(headless = config.headless, "browser launched");

        Ok(Self {
            browser: tokio::sync::Mutex::new(Some(browser)),
            page: Mutex::new(Some(page)),
            handler: Mutex::new(Some(handler_task)),
            action_timeout: Duration::from_millis(config.action_timeout_ms),
            navigation_timeout: Duration::from_millis(config.navigation_timeout_ms),
        })
    }

    fn page(&self) -> Result<Page, EnvironmentError> {
        let page = match self.page.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        page.ok_or(EnvironmentError::NoActiveSurface)
    }

    async fn execute(&self, page: &Page, action: BrowserAction) -> anyhow::Result<String> {
        match action {
            BrowserAction::Click { ai_id } => {
                let element = find(page, &selector(&ai_id), self.action_timeout)
                    .await
                    .with_context(|| format!("element {ai_id} not found or not clickable"))?;
                bounded("click", self.action_timeout, element.click()).await?;
                Ok(format!("Clicked element {ai_id}."))
            }
            BrowserAction::TypeText { ai_id, text } => {
                let sel = selector(&ai_id);
                let element = find(page, &sel, self.action_timeout)
                    .await
                    .with_context(|| format!("element {ai_id} not found or not editable"))?;
                eval::<bool>(page, clear_value_script(&sel), self.action_timeout).await?;
                bounded("focus", self.action_timeout, element.click()).await?;
                bounded("typing", self.action_timeout, element.type_str(&text)).await?;
                Ok(format!("Typed '{text}' into element {ai_id}."))
            }
            BrowserAction::Navigate { url } => {
                bounded("navigation", self.navigation_timeout, page.goto(url.as_str()))
                    .await
                    .with_context(|| format!("failed to navigate to {url}"))?;
                Ok(format!("Navigated to {url}."))
            }
            BrowserAction::Scroll { direction, pixels } => {
                eval::<bool>(page, scroll_script(direction, pixels), self.action_timeout).await?;
                tokio::time::sleep(SETTLE_DELAY).await;
                Ok(format!("Scrolled the page {direction}."))
            }
            BrowserAction::GetText { ai_id } => {
                let element = find(page, &selector(&ai_id), self.action_timeout)
                    .await
                    .with_context(|| format!("element {ai_id} not found"))?;
                let text = bounded("reading text", self.action_timeout, element.inner_text()).await?;
                match text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
                    Some(text) => Ok(text.to_string()),
                    None => Ok(format!("Element {ai_id} has no text.")),
                }
            }
            BrowserAction::WaitForElement { ai_id, timeout } => {
                match find(page, &selector(&ai_id), timeout).await {
                    Ok(_) => Ok(format!("Element {ai_id} appeared on the page.")),
                    Err(_) => Ok(format!(
                        "Element {ai_id} did not appear within {}ms.",
                        timeout.as_millis()
                    )),
                }
            }
            BrowserAction::PressKey { key } => {
                let target = match page.find_element(":focus").await {
                    Ok(element) => element,
                    Err(_) => page.find_element("body").await?,
                };
                bounded("key press", self.action_timeout, target.press_key(&key)).await?;
                Ok(format!("Pressed {key}."))
            }
            BrowserAction::WaitForNavigation { timeout } => {
                bounded("navigation", timeout, page.wait_for_navigation()).await?;
                Ok("Navigation finished.".to_string())
            }
            BrowserAction::ClosePopup => {
                let hit: String = eval(page, close_popup_script(), self.action_timeout).await?;
                if hit.is_empty() {
                    return Ok("No popup to close was found.".to_string());
                }
                tokio::time::sleep(SETTLE_DELAY).await;
                Ok(format!("Closed a popup using '{hit}'."))
            }
        }
    }
}

#[async_trait]
impl Environment for ChromeEnvironment {
    async fn snapshot(&self) -> Result<Snapshot, EnvironmentError> {
        let page = self.page()?;
        let scan: PageScan = eval(&page, scan_script(), self.action_timeout).await?;
        let url = page.url().await.map_err(anyhow::Error::from)?;
        let title = page.get_title().await.map_err(anyhow::Error::from)?;

        debug!(elements = scan.elements.len(), "page scanned");
        Ok(Snapshot {
            url: url.unwrap_or_default(),
            title: title.unwrap_or_default(),
            text_preview: scan.text_preview,
            interactive_elements: scan.elements,
        })
    }

    async fn perform(
        &self,
        action: &str,
        args: &HashMap<String, Value>,
    ) -> Result<String, EnvironmentError> {
        let action = BrowserAction::parse(action, args)
            .map_err(|e| EnvironmentError::Other(e.to_string()))?;
        let page = self.page()?;
        debug!(action = action.name(), "performing browser action");
        self.execute(&page, action).await.map_err(|e| {
            EnvironmentError::Other(format!("{e:#}"))
        })
    }

    async fn teardown(&self) {
        let page = match self.page.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(page) = page {
            if let Err(e) = page.close().await {
                debug!(error = %e, "page close failed");
            }
        }

        let browser = self.browser.lock().await.take();
        if let Some(mut browser) = browser {
            if let Err(e) = browser.close().await {
                warn!(error = %e, "browser close failed");
            }
            if let Err(e) = browser.wait().await {
                debug!(error = %e, "waiting for browser exit failed");
            }
        }

        let handler = match self.handler.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handler {
            let abort = handle.abort_handle();
            if tokio::time::timeout(HANDLER_JOIN_TIMEOUT, handle).await.is_err() {
                abort.abort();
                warn!("cdp handler did not stop in time, aborted");
            }
        }

        info!("browser closed");
    }
}

// ─────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────

/// Await `fut` for at most `limit`.
async fn bounded<T, E, F>(what: &str, limit: Duration, fut: F) -> anyhow::Result<T>
where
    F: Future<Output = Result<T, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(anyhow!("{what} timed out after {}ms", limit.as_millis())),
    }
}

/// Poll for an element until it exists or `limit` passes.
async fn find(page: &Page, selector: &str, limit: Duration) -> anyhow::Result<Element> {
    let deadline = tokio::time::Instant::now() + limit;
    loop {
        match page.find_element(selector).await {
            Ok(element) => return Ok(element),
            Err(_) if tokio::time::Instant::now() >= deadline => {
                return Err(anyhow!(
                    "no element matches {selector} after {}ms",
                    limit.as_millis()
                ));
            }
            Err(_) => tokio::time::sleep(POLL_INTERVAL).await,
        }
    }
}

/// Evaluate a script that returns a JSON-serialisable value.
async fn eval<T: DeserializeOwned>(
    page: &Page,
    script: String,
    limit: Duration,
) -> anyhow::Result<T> {
    let params = EvaluateParams::builder()
        .expression(script)
        .await_promise(true)
        .return_by_value(true)
        .build()
        .map_err(|e| anyhow!("invalid evaluate params: {e}"))?;
    let result = bounded("script", limit, page.evaluate_expression(params)).await?;
    result
        .into_value::<T>()
        .context("unexpected script result")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_args_headless_extras() {
        let mut config = BrowserConfig::default();
        assert!(!launch_args(&config).contains(&"--mute-audio".to_string()));
        config.headless = true;
        let args = launch_args(&config);
        assert!(args.contains(&"--mute-audio".to_string()));
        assert!(args.contains(&"--no-first-run".to_string()));
    }

    #[test]
    fn test_blank_executable_means_autodetect() {
        let config = BrowserConfig {
            executable_path: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(executable_path(&config), None);
    }

    #[test]
    fn test_configured_executable_wins() {
        let config = BrowserConfig {
            executable_path: Some("/opt/chromium/chrome".into()),
            ..Default::default()
        };
        assert_eq!(
            executable_path(&config),
            Some(PathBuf::from("/opt/chromium/chrome"))
        );
    }

    #[tokio::test]
    async fn test_bounded_times_out() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, std::io::Error>(())
        };
        let err = bounded("click", Duration::from_millis(10), slow)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "click timed out after 10ms");
    }

    #[tokio::test]
    async fn test_bounded_passes_errors_through() {
        let failing = async { Err::<(), _>(std::io::Error::other("boom")) };
        let err = bounded("click", Duration::from_secs(1), failing)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }
}
