use async_trait::async_trait;
use std::sync::Arc;

use crate::{error::AdapterError, locator::Locator};

/// A completed file download captured from the page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadedFile {
    pub suggested_filename: Option<String>,
    pub bytes: Vec<u8>,
}

/// Handle to the single page of an automation session.
///
/// Calls must not be issued concurrently; callers serialise access per session.
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn goto(&self, url: &str) -> Result<(), AdapterError>;

    async fn wait_for_network_idle(&self) -> Result<(), AdapterError>;

    async fn click(&self, locator: &Locator) -> Result<(), AdapterError>;

    /// Replace the current value of a text input.
    async fn fill(&self, locator: &Locator, value: &str) -> Result<(), AdapterError>;

    /// Choose an option of the `<select>` matched by `selector`, by value or by label.
    async fn select_option(&self, selector: &str, value: &str) -> Result<(), AdapterError>;

    /// Arm a one-shot listener for the next download. Does not block.
    async fn arm_download(&self) -> Result<(), AdapterError>;

    /// Wait for the armed download to complete and return its content.
    async fn await_download(&self) -> Result<DownloadedFile, AdapterError>;

    /// Rendered text of the located element, or of `body` when `locator` is `None`.
    async fn text_content(&self, locator: Option<&Locator>) -> Result<String, AdapterError>;

    /// Release the browser. Calling it more than once is a no-op.
    async fn close(&self) -> Result<(), AdapterError>;
}

/// Starts a fresh browser and returns its page.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Arc<dyn PageDriver>, AdapterError>;
}
