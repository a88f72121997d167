//! Scripted page driver: records every call and replays canned responses.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::driver::{BrowserLauncher, DownloadedFile, PageDriver};
use crate::error::{AdapterError, AdapterErrorKind};
use crate::locator::Locator;

/// One recorded interaction with a [`ScriptedPage`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageCall {
    Goto(String),
    WaitForNetworkIdle,
    Click(Locator),
    Fill(Locator, String),
    SelectOption(String, String),
    ArmDownload,
    AwaitDownload,
    TextContent(Option<Locator>),
    Close,
}

#[derive(Default)]
struct Script {
    calls: Vec<PageCall>,
    failing_urls: HashSet<String>,
    failing_locators: Vec<Locator>,
    texts: HashMap<Option<Locator>, String>,
    downloads: VecDeque<DownloadedFile>,
    armed: bool,
}

#[derive(Default)]
pub struct ScriptedPage {
    script: Mutex<Script>,
    closes: AtomicUsize,
}

impl ScriptedPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Navigation to any URL containing `fragment` fails.
    pub fn fail_goto(self, fragment: impl Into<String>) -> Self {
        self.script.lock().failing_urls.insert(fragment.into());
        self
    }

    /// Clicks and fills against `locator` fail with `TargetNotFound`.
    pub fn fail_locator(self, locator: Locator) -> Self {
        self.script.lock().failing_locators.push(locator);
        self
    }

    pub fn with_text(self, locator: Option<Locator>, text: impl Into<String>) -> Self {
        self.script.lock().texts.insert(locator, text.into());
        self
    }

    /// Queue a file returned by the next completed download.
    pub fn with_download(self, suggested_filename: Option<&str>, bytes: impl Into<Vec<u8>>) -> Self {
        self.script.lock().downloads.push_back(DownloadedFile {
            suggested_filename: suggested_filename.map(str::to_string),
            bytes: bytes.into(),
        });
        self
    }

    pub fn calls(&self) -> Vec<PageCall> {
        self.script.lock().calls.clone()
    }

    pub fn visited_urls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                PageCall::Goto(url) => Some(url),
                _ => None,
            })
            .collect()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    fn record(&self, call: PageCall) {
        self.script.lock().calls.push(call);
    }

    fn check_locator(&self, locator: &Locator) -> Result<(), AdapterError> {
        if self.script.lock().failing_locators.contains(locator) {
            return Err(AdapterError::new(AdapterErrorKind::TargetNotFound)
                .with_hint(format!("{locator}: no matching element")));
        }
        Ok(())
    }
}

#[async_trait]
impl PageDriver for ScriptedPage {
    async fn goto(&self, url: &str) -> Result<(), AdapterError> {
        self.record(PageCall::Goto(url.to_string()));
        let failing = self
            .script
            .lock()
            .failing_urls
            .iter()
            .any(|fragment| url.contains(fragment.as_str()));
        if failing {
            return Err(AdapterError::new(AdapterErrorKind::CdpIo)
                .with_hint(format!("navigation to {url} failed")));
        }
        Ok(())
    }

    async fn wait_for_network_idle(&self) -> Result<(), AdapterError> {
        self.record(PageCall::WaitForNetworkIdle);
        Ok(())
    }

    async fn click(&self, locator: &Locator) -> Result<(), AdapterError> {
        self.record(PageCall::Click(locator.clone()));
        self.check_locator(locator)
    }

    async fn fill(&self, locator: &Locator, value: &str) -> Result<(), AdapterError> {
        self.record(PageCall::Fill(locator.clone(), value.to_string()));
        self.check_locator(locator)
    }

    async fn select_option(&self, selector: &str, value: &str) -> Result<(), AdapterError> {
        self.record(PageCall::SelectOption(
            selector.to_string(),
            value.to_string(),
        ));
        self.check_locator(&Locator::css(selector))
    }

    async fn arm_download(&self) -> Result<(), AdapterError> {
        let mut script = self.script.lock();
        script.calls.push(PageCall::ArmDownload);
        script.armed = true;
        Ok(())
    }

    async fn await_download(&self) -> Result<DownloadedFile, AdapterError> {
        let mut script = self.script.lock();
        script.calls.push(PageCall::AwaitDownload);
        if !std::mem::take(&mut script.armed) {
            return Err(AdapterError::internal("no download listener armed"));
        }
        script.downloads.pop_front().ok_or_else(|| {
            AdapterError::new(AdapterErrorKind::DownloadFailed)
                .with_hint("no scripted download queued")
        })
    }

    async fn text_content(&self, locator: Option<&Locator>) -> Result<String, AdapterError> {
        let key = locator.cloned();
        let mut script = self.script.lock();
        script.calls.push(PageCall::TextContent(key.clone()));
        Ok(script.texts.get(&key).cloned().unwrap_or_default())
    }

    async fn close(&self) -> Result<(), AdapterError> {
        self.record(PageCall::Close);
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Launcher that hands out pre-built scripted pages, or fails when told to.
#[derive(Default)]
pub struct ScriptedLauncher {
    pages: Mutex<VecDeque<Arc<ScriptedPage>>>,
    launched: Mutex<Vec<Arc<ScriptedPage>>>,
    fail: bool,
}

impl ScriptedLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every launch fails with `LaunchFailed`.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Serve `page` on the next launch; a blank page is created once the queue is empty.
    pub fn with_page(self, page: ScriptedPage) -> Self {
        self.pages.lock().push_back(Arc::new(page));
        self
    }

    /// Pages handed out so far, in launch order.
    pub fn launched(&self) -> Vec<Arc<ScriptedPage>> {
        self.launched.lock().clone()
    }
}

#[async_trait]
impl BrowserLauncher for ScriptedLauncher {
    async fn launch(&self) -> Result<Arc<dyn PageDriver>, AdapterError> {
        if self.fail {
            return Err(AdapterError::new(AdapterErrorKind::LaunchFailed)
                .with_hint("scripted launcher configured to fail"));
        }
        let page = self
            .pages
            .lock()
            .pop_front()
            .unwrap_or_else(|| Arc::new(ScriptedPage::new()));
        self.launched.lock().push(page.clone());
        Ok(page)
    }
}
