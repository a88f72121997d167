//! Download primitives - arm a listener, then persist the captured file

use artifact_store::{artifact_file_name, artifact_path, content_type_for};
use cdp_adapter::Locator;
use chrono::Utc;
use tracing::{debug, info};

use crate::{
    errors::ActionError,
    primitives::DefaultActionPrimitives,
    types::{ExecCtx, StepExecutionContext},
};

pub async fn execute_begin_download_wait(
    primitives: &DefaultActionPrimitives,
    state: &mut StepExecutionContext,
) -> Result<(), ActionError> {
    primitives.page().arm_download().await?;
    state.download_armed = true;
    debug!("Download listener armed");
    Ok(())
}

pub async fn execute_persist_download(
    primitives: &DefaultActionPrimitives,
    ctx: &ExecCtx,
    trigger: Option<&Locator>,
    state: &mut StepExecutionContext,
) -> Result<String, ActionError> {
    if !state.download_armed {
        debug!("Download listener not armed, arming before trigger");
        execute_begin_download_wait(primitives, state).await?;
    }

    if let Some(locator) = trigger {
        primitives.page().click(locator).await?;
    }

    let file = primitives.page().await_download().await;
    state.download_armed = false;
    let file = file?;

    let file_name = artifact_file_name(Utc::now(), file.suggested_filename.as_deref());
    let path = artifact_path(&ctx.configuration_id, &ctx.step_id, &file_name);
    let content_type = content_type_for(&file_name);
    let size = file.bytes.len();

    let stored = primitives
        .store()
        .upload(&path, file.bytes, content_type)
        .await
        .map_err(|err| ActionError::StorageUpload(format!("{path}: {err}")))?;

    info!(path = %stored, content_type, size, "Download persisted");
    state.stored_artifact_path = Some(stored.clone());
    Ok(stored)
}
