//! Select primitive - choose an option of a dropdown

use crate::{errors::ActionError, primitives::DefaultActionPrimitives};
use tracing::debug;

pub async fn execute_select(
    primitives: &DefaultActionPrimitives,
    selector: &str,
    value: &str,
) -> Result<(), ActionError> {
    debug!(selector, value, "Executing select primitive");
    primitives.page().select_option(selector, value).await?;
    Ok(())
}
