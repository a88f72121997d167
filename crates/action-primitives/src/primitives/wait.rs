//! Wait primitive - network idle or a fixed sleep

use crate::{errors::ActionError, primitives::DefaultActionPrimitives, types::WaitCondition};
use tracing::debug;

pub async fn execute_wait(
    primitives: &DefaultActionPrimitives,
    condition: &WaitCondition,
) -> Result<(), ActionError> {
    match condition {
        WaitCondition::NetworkIdle => {
            debug!("Waiting for network idle");
            primitives.page().wait_for_network_idle().await?;
        }
        WaitCondition::Duration(duration) => {
            debug!(wait_ms = duration.as_millis() as u64, "Sleeping");
            tokio::time::sleep(*duration).await;
        }
    }
    Ok(())
}
