//! Shared data model for the tenderscout step-execution engine.
//!
//! Everything that crosses a crate boundary lives here: stored step
//! definitions and their automation actions, the per-step results that are
//! passed forward between steps, and the procurement records produced from
//! model output.

pub mod action;
pub mod configuration;
pub mod record;
pub mod result;
pub mod step;

pub use action::{ActionKind, AutomationAction, TargetKind};
pub use configuration::{Configuration, ConfigurationError};
pub use record::{CreatedRecord, MarketInsight, Opportunity, OpportunityStatus};
pub use result::{FanOutToken, StepResult, TypedValues, ValueKind};
pub use step::{PromptSpec, RecordTemplate, StepDecodeError, StepDefinition, StepKind};
