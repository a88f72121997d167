//! Navigate primitive - open a URL and wait for the network to settle

use crate::{errors::ActionError, primitives::DefaultActionPrimitives};
use std::time::Instant;
use tracing::{debug, info};

pub async fn execute_navigate(
    primitives: &DefaultActionPrimitives,
    url: &str,
) -> Result<(), ActionError> {
    let started = Instant::now();
    info!(url, "Executing navigate primitive");

    primitives
        .page()
        .goto(url)
        .await
        .map_err(|err| ActionError::Navigation(format!("{url}: {err}")))?;

    debug!("Waiting for network idle after navigation");
    primitives.page().wait_for_network_idle().await?;

    info!(
        url,
        latency_ms = started.elapsed().as_millis() as u64,
        "Navigation completed"
    );
    Ok(())
}
