//! Click primitive

use crate::{errors::ActionError, primitives::DefaultActionPrimitives};
use cdp_adapter::Locator;
use tracing::debug;

pub async fn execute_click(
    primitives: &DefaultActionPrimitives,
    locator: &Locator,
) -> Result<(), ActionError> {
    debug!(locator = %locator, "Executing click primitive");
    primitives.page().click(locator).await?;
    Ok(())
}
