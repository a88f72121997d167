//! Automation action executor.
//!
//! Runs the low-level instructions of an automation step against the session page:
//! - navigate, click, type, select, wait
//! - download capture (arm + persist) into the artifact store
//! - text extraction
//!
//! Actions share one [`StepExecutionContext`] per step, which collects the stored
//! artifact path and extracted text handed back to the dispatcher.

pub mod errors;
mod executor;
mod primitives;
pub mod target;
pub mod types;

pub use errors::*;
pub use executor::*;
pub use primitives::*;
pub use types::*;
