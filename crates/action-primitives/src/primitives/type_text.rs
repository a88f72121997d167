//! Type primitive - replace the value of a text input

use crate::{errors::ActionError, primitives::DefaultActionPrimitives};
use cdp_adapter::Locator;
use tracing::debug;

pub async fn execute_type_text(
    primitives: &DefaultActionPrimitives,
    locator: &Locator,
    text: &str,
) -> Result<(), ActionError> {
    debug!(
        locator = %locator,
        text_len = text.chars().count(),
        "Executing type primitive"
    );
    primitives.page().fill(locator, text).await?;
    Ok(())
}
