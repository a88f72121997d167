//! Extract primitive - read rendered text into the step context

use crate::{errors::ActionError, primitives::DefaultActionPrimitives, types::StepExecutionContext};
use cdp_adapter::Locator;
use tracing::debug;

pub async fn execute_extract_text(
    primitives: &DefaultActionPrimitives,
    locator: Option<&Locator>,
    state: &mut StepExecutionContext,
) -> Result<(), ActionError> {
    let text = primitives.page().text_content(locator).await?;
    debug!(
        source = %locator.map(ToString::to_string).unwrap_or_else(|| "body".to_string()),
        chars = text.chars().count(),
        "Extracted text"
    );
    state.extracted_text.push(text);
    Ok(())
}
