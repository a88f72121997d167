//! Action primitives implementation
//!
//! One primitive per automation action kind:
//! 1. navigate - open a URL and wait for the network to settle
//! 2. click - click a located element
//! 3. type_text - replace the value of an input
//! 4. select - choose a dropdown option
//! 5. wait - network idle or fixed sleep
//! 6. download - arm a listener / persist the captured file
//! 7. extract - read rendered text

mod click;
mod download;
mod extract;
mod navigate;
mod select;
mod type_text;
mod wait;

use async_trait::async_trait;
use artifact_store::ArtifactStore;
use cdp_adapter::{Locator, PageDriver};
use std::sync::Arc;

use crate::{
    errors::ActionError,
    types::{ExecCtx, StepExecutionContext, WaitCondition},
};

/// Browser operations available to automation steps.
#[async_trait]
pub trait ActionPrimitives: Send + Sync {
    /// Navigate to a URL, then wait for network idle
    async fn navigate(&self, url: &str) -> Result<(), ActionError>;

    async fn click(&self, locator: &Locator) -> Result<(), ActionError>;

    async fn type_text(&self, locator: &Locator, text: &str) -> Result<(), ActionError>;

    async fn select(&self, selector: &str, value: &str) -> Result<(), ActionError>;

    async fn wait(&self, condition: &WaitCondition) -> Result<(), ActionError>;

    /// Arm the one-shot download listener without blocking
    async fn begin_download_wait(&self, state: &mut StepExecutionContext)
        -> Result<(), ActionError>;

    /// Click `trigger` (if any), wait for the download and store it as the step artifact
    async fn persist_download(
        &self,
        ctx: &ExecCtx,
        trigger: Option<&Locator>,
        state: &mut StepExecutionContext,
    ) -> Result<String, ActionError>;

    /// Append the text of `locator` (or the page body) to the step context
    async fn extract_text(
        &self,
        locator: Option<&Locator>,
        state: &mut StepExecutionContext,
    ) -> Result<(), ActionError>;
}

/// Primitives backed by a session page and an artifact store.
pub struct DefaultActionPrimitives {
    page: Arc<dyn PageDriver>,
    store: Arc<dyn ArtifactStore>,
}

impl DefaultActionPrimitives {
    pub fn new(page: Arc<dyn PageDriver>, store: Arc<dyn ArtifactStore>) -> Self {
        Self { page, store }
    }

    pub fn page(&self) -> &Arc<dyn PageDriver> {
        &self.page
    }

    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }
}

#[async_trait]
impl ActionPrimitives for DefaultActionPrimitives {
    async fn navigate(&self, url: &str) -> Result<(), ActionError> {
        navigate::execute_navigate(self, url).await
    }

    async fn click(&self, locator: &Locator) -> Result<(), ActionError> {
        click::execute_click(self, locator).await
    }

    async fn type_text(&self, locator: &Locator, text: &str) -> Result<(), ActionError> {
        type_text::execute_type_text(self, locator, text).await
    }

    async fn select(&self, selector: &str, value: &str) -> Result<(), ActionError> {
        select::execute_select(self, selector, value).await
    }

    async fn wait(&self, condition: &WaitCondition) -> Result<(), ActionError> {
        wait::execute_wait(self, condition).await
    }

    async fn begin_download_wait(
        &self,
        state: &mut StepExecutionContext,
    ) -> Result<(), ActionError> {
        download::execute_begin_download_wait(self, state).await
    }

    async fn persist_download(
        &self,
        ctx: &ExecCtx,
        trigger: Option<&Locator>,
        state: &mut StepExecutionContext,
    ) -> Result<String, ActionError> {
        download::execute_persist_download(self, ctx, trigger, state).await
    }

    async fn extract_text(
        &self,
        locator: Option<&Locator>,
        state: &mut StepExecutionContext,
    ) -> Result<(), ActionError> {
        extract::execute_extract_text(self, locator, state).await
    }
}
