use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::browser::{
    DownloadProgressState, EventDownloadProgress, EventDownloadWillBegin,
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::{Browser, BrowserConfig, Element, Page};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tempfile::TempDir;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::LaunchConfig;
use crate::driver::{BrowserLauncher, DownloadedFile, PageDriver};
use crate::error::{AdapterError, AdapterErrorKind};
use crate::locator::{select_option_script, Locator};

const IDLE_PROBE: &str = r#"(() => ({
    readyState: document.readyState,
    resources: performance.getEntriesByType('resource').length
}))()"#;

const IDLE_POLL: Duration = Duration::from_millis(100);

/// Launches one headless Chromium per session.
#[derive(Clone, Debug, Default)]
pub struct ChromiumLauncher {
    config: LaunchConfig,
}

impl ChromiumLauncher {
    pub fn new(config: LaunchConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Arc<dyn PageDriver>, AdapterError> {
        let page = ChromiumPage::launch(self.config.clone()).await?;
        Ok(Arc::new(page))
    }
}

struct PendingDownload {
    receiver: oneshot::Receiver<Result<DownloadedFile, AdapterError>>,
    task: JoinHandle<()>,
}

/// A Chromium process with a single page, driven over CDP.
pub struct ChromiumPage {
    config: LaunchConfig,
    browser: Mutex<Option<Browser>>,
    page: Page,
    handler_task: parking_lot::Mutex<Option<JoinHandle<()>>>,
    pending_download: Mutex<Option<PendingDownload>>,
    download_dir: TempDir,
    _profile_dir: TempDir,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdleProbe {
    ready_state: String,
    resources: u64,
}

#[derive(Deserialize)]
struct MarkOutcome {
    found: bool,
}

#[derive(Deserialize)]
struct SelectOutcome {
    status: String,
}

impl ChromiumPage {
    pub async fn launch(config: LaunchConfig) -> Result<Self, AdapterError> {
        let profile_dir = tempfile::Builder::new()
            .prefix("tenderscout-profile-")
            .tempdir()
            .map_err(|err| launch_error(format!("failed to create profile dir: {err}")))?;
        let download_dir = tempfile::Builder::new()
            .prefix("tenderscout-downloads-")
            .tempdir()
            .map_err(|err| launch_error(format!("failed to create download dir: {err}")))?;

        let browser_config = browser_config(&config, profile_dir.path().to_path_buf())?;
        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|err| launch_error(format!("failed to launch chromium: {err}")))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(target: "cdp-adapter", %err, "handler event error");
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(err) => {
                handler_task.abort();
                return Err(launch_error(format!("failed to open page: {err}")));
            }
        };

        info!(
            target: "cdp-adapter",
            headless = config.headless,
            download_dir = %download_dir.path().display(),
            "chromium session launched"
        );

        Ok(Self {
            config,
            browser: Mutex::new(Some(browser)),
            page,
            handler_task: parking_lot::Mutex::new(Some(handler_task)),
            pending_download: Mutex::new(None),
            download_dir,
            _profile_dir: profile_dir,
        })
    }

    async fn resolve(&self, locator: &Locator) -> Result<Element, AdapterError> {
        let not_found = |err: String| {
            AdapterError::new(AdapterErrorKind::TargetNotFound)
                .with_hint(format!("{locator}: {err}"))
        };

        match locator {
            Locator::Css(selector) => self
                .page
                .find_element(selector.as_str())
                .await
                .map_err(|err| not_found(err.to_string())),
            Locator::XPath(xpath) => self
                .page
                .find_xpath(xpath.as_str())
                .await
                .map_err(|err| not_found(err.to_string())),
            _ => {
                let token = format!("ts-{}", Uuid::new_v4().simple());
                let script = locator
                    .marking_script(&token)
                    .ok_or_else(|| AdapterError::internal("locator has no marking script"))?;
                let outcome: MarkOutcome = self
                    .page
                    .evaluate(script)
                    .await
                    .map_err(AdapterError::cdp)?
                    .into_value()
                    .map_err(AdapterError::cdp)?;
                if !outcome.found {
                    return Err(not_found("no matching element".to_string()));
                }
                self.page
                    .find_element(Locator::marked_selector(&token))
                    .await
                    .map_err(|err| not_found(err.to_string()))
            }
        }
    }

    async fn probe_idle(&self) -> Result<IdleProbe, AdapterError> {
        self.page
            .evaluate(IDLE_PROBE)
            .await
            .map_err(AdapterError::cdp)?
            .into_value()
            .map_err(AdapterError::cdp)
    }
}

#[async_trait]
impl PageDriver for ChromiumPage {
    async fn goto(&self, url: &str) -> Result<(), AdapterError> {
        debug!(target: "cdp-adapter", url, "navigating");
        self.page.goto(url).await.map_err(|err| {
            AdapterError::new(AdapterErrorKind::CdpIo)
                .with_hint(format!("navigation to {url} failed: {err}"))
                .with_data(json!({ "url": url }))
        })?;
        Ok(())
    }

    async fn wait_for_network_idle(&self) -> Result<(), AdapterError> {
        let timeout = Duration::from_millis(self.config.network_idle_timeout_ms);
        let quiet = Duration::from_millis(self.config.network_idle_quiet_ms);
        let started = Instant::now();
        let mut last_count: Option<u64> = None;
        let mut stable_since = Instant::now();

        loop {
            let probe = self.probe_idle().await?;
            let now = Instant::now();
            if probe.ready_state == "complete" && last_count == Some(probe.resources) {
                if now.duration_since(stable_since) >= quiet {
                    return Ok(());
                }
            } else {
                last_count = Some(probe.resources);
                stable_since = now;
            }

            if now.duration_since(started) >= timeout {
                return Err(AdapterError::new(AdapterErrorKind::NavTimeout)
                    .with_hint(format!(
                        "network did not settle within {}ms",
                        timeout.as_millis()
                    ))
                    .retriable(true));
            }
            tokio::time::sleep(IDLE_POLL).await;
        }
    }

    async fn click(&self, locator: &Locator) -> Result<(), AdapterError> {
        let element = self.resolve(locator).await?;
        element.click().await.map_err(AdapterError::cdp)?;
        Ok(())
    }

    async fn fill(&self, locator: &Locator, value: &str) -> Result<(), AdapterError> {
        let element = self.resolve(locator).await?;
        element.focus().await.map_err(AdapterError::cdp)?;
        element
            .call_js_fn(
                "function() { this.value = ''; this.dispatchEvent(new Event('input', { bubbles: true })); }",
                false,
            )
            .await
            .map_err(AdapterError::cdp)?;
        element.type_str(value).await.map_err(AdapterError::cdp)?;
        Ok(())
    }

    async fn select_option(&self, selector: &str, value: &str) -> Result<(), AdapterError> {
        let outcome: SelectOutcome = self
            .page
            .evaluate(select_option_script(selector, value))
            .await
            .map_err(AdapterError::cdp)?
            .into_value()
            .map_err(AdapterError::cdp)?;

        match outcome.status.as_str() {
            "ok" => Ok(()),
            "no-option" => Err(AdapterError::new(AdapterErrorKind::OptionNotFound)
                .with_hint(format!("no option '{value}' in {selector}"))),
            _ => Err(AdapterError::new(AdapterErrorKind::TargetNotFound)
                .with_hint(format!("no select element matches {selector}"))),
        }
    }

    async fn arm_download(&self) -> Result<(), AdapterError> {
        let guard = self.browser.lock().await;
        let browser = guard.as_ref().ok_or_else(closed_error)?;

        let mut will_begin = browser
            .event_listener::<EventDownloadWillBegin>()
            .await
            .map_err(AdapterError::cdp)?;
        let mut progress = browser
            .event_listener::<EventDownloadProgress>()
            .await
            .map_err(AdapterError::cdp)?;

        let params = SetDownloadBehaviorParams::builder()
            .behavior(SetDownloadBehaviorBehavior::AllowAndName)
            .download_path(self.download_dir.path().to_string_lossy().to_string())
            .events_enabled(true)
            .build()
            .map_err(AdapterError::internal)?;
        browser.execute(params).await.map_err(AdapterError::cdp)?;
        drop(guard);

        let dir: PathBuf = self.download_dir.path().to_path_buf();
        let timeout = Duration::from_millis(self.config.download_timeout_ms);
        let (tx, receiver) = oneshot::channel();

        let task = tokio::spawn(async move {
            let capture = async {
                let begin = will_begin.next().await.ok_or_else(|| {
                    download_error("event stream closed before the download began")
                })?;
                debug!(
                    target: "cdp-adapter",
                    guid = %begin.guid,
                    filename = %begin.suggested_filename,
                    "download started"
                );
                while let Some(event) = progress.next().await {
                    if event.guid != begin.guid {
                        continue;
                    }
                    match event.state {
                        DownloadProgressState::Completed => {
                            let bytes = tokio::fs::read(dir.join(&begin.guid)).await.map_err(
                                |err| download_error(format!("failed to read download: {err}")),
                            )?;
                            let suggested = begin.suggested_filename.trim();
                            return Ok(DownloadedFile {
                                suggested_filename: (!suggested.is_empty())
                                    .then(|| suggested.to_string()),
                                bytes,
                            });
                        }
                        DownloadProgressState::Canceled => {
                            return Err(download_error("download was canceled"));
                        }
                        DownloadProgressState::InProgress => {}
                    }
                }
                Err::<DownloadedFile, AdapterError>(download_error(
                    "event stream closed before the download completed",
                ))
            };

            let outcome = match tokio::time::timeout(timeout, capture).await {
                Ok(outcome) => outcome,
                Err(_) => Err(download_error(format!(
                    "download did not complete within {}ms",
                    timeout.as_millis()
                ))),
            };
            let _ = tx.send(outcome);
        });

        let mut pending = self.pending_download.lock().await;
        if let Some(previous) = pending.replace(PendingDownload { receiver, task }) {
            previous.task.abort();
        }
        Ok(())
    }

    async fn await_download(&self) -> Result<DownloadedFile, AdapterError> {
        let pending = self
            .pending_download
            .lock()
            .await
            .take()
            .ok_or_else(|| AdapterError::internal("no download listener armed"))?;

        pending
            .receiver
            .await
            .map_err(|_| download_error("download listener dropped"))?
    }

    async fn text_content(&self, locator: Option<&Locator>) -> Result<String, AdapterError> {
        let element = match locator {
            Some(locator) => self.resolve(locator).await?,
            None => self
                .page
                .find_element("body")
                .await
                .map_err(AdapterError::cdp)?,
        };
        let text = element.inner_text().await.map_err(AdapterError::cdp)?;
        Ok(text.unwrap_or_default())
    }

    async fn close(&self) -> Result<(), AdapterError> {
        if let Some(pending) = self.pending_download.lock().await.take() {
            pending.task.abort();
        }

        let browser = self.browser.lock().await.take();
        if let Some(mut browser) = browser {
            if let Err(err) = browser.close().await {
                warn!(target: "cdp-adapter", %err, "browser close command failed");
            }
            if let Err(err) = browser.wait().await {
                warn!(target: "cdp-adapter", %err, "browser process did not exit cleanly");
            }
            info!(target: "cdp-adapter", "chromium session closed");
        }

        if let Some(task) = self.handler_task.lock().take() {
            task.abort();
        }
        Ok(())
    }
}

impl Drop for ChromiumPage {
    fn drop(&mut self) {
        if let Some(task) = self.handler_task.lock().take() {
            task.abort();
        }
    }
}

fn browser_config(cfg: &LaunchConfig, profile_dir: PathBuf) -> Result<BrowserConfig, AdapterError> {
    let mut builder = BrowserConfig::builder()
        .request_timeout(Duration::from_millis(cfg.request_timeout_ms))
        .launch_timeout(Duration::from_millis(cfg.launch_timeout_ms))
        .window_size(cfg.window_width, cfg.window_height)
        .user_data_dir(profile_dir);

    if !cfg.headless {
        builder = builder.with_head();
    }
    if cfg.no_sandbox {
        builder = builder.no_sandbox();
    }

    builder = builder.args(vec![
        "--disable-background-networking",
        "--disable-breakpad",
        "--disable-component-update",
        "--disable-default-apps",
        "--disable-dev-shm-usage",
        "--disable-extensions",
        "--disable-popup-blocking",
        "--disable-sync",
        "--no-first-run",
        "--no-default-browser-check",
        "--password-store=basic",
    ]);

    match cfg.resolved_executable() {
        Some(executable) => builder = builder.chrome_executable(executable),
        None => {
            return Err(launch_error("no chrome or chromium executable found")
                .with_data(json!({
                    "hint": "Set TENDERSCOUT_CHROME to the full path of chrome/chromium."
                })));
        }
    }

    builder
        .build()
        .map_err(|err| launch_error(format!("browser config error: {err}")))
}

fn launch_error(hint: impl Into<String>) -> AdapterError {
    AdapterError::new(AdapterErrorKind::LaunchFailed).with_hint(hint)
}

fn download_error(hint: impl Into<String>) -> AdapterError {
    AdapterError::new(AdapterErrorKind::DownloadFailed).with_hint(hint)
}

fn closed_error() -> AdapterError {
    AdapterError::new(AdapterErrorKind::Closed)
}
