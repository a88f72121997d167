//! Step execution engine
//!
//! Runs the ordered steps of a stored configuration against one long-lived browser
//! session, passing typed values forward so a step can fan out over the results of
//! the step before it:
//! - automation steps drive the page through `action-primitives`
//! - AI prompt steps feed prior artifacts to a completion provider
//! - create-record steps turn model output into opportunity records

pub mod dispatcher;
pub mod engine;
pub mod errors;
pub mod extractor;
pub mod parser;
pub mod ports;
pub mod prompt;
pub mod session;
pub mod spreadsheet;

pub use dispatcher::{Dispatched, StepDispatcher};
pub use engine::{CleanupOutcome, EngineComponents, RunReport, StepEngine, StepProgress};
pub use errors::EngineError;
pub use extractor::EntityExtractor;
pub use parser::parse_typed_response;
pub use ports::{
    ConfigurationLoader, InMemoryConfigurationLoader, InMemoryRecordSink, RecordSink, SinkError,
};
pub use prompt::PromptProcessor;
pub use session::{
    ExecutionSession, InMemorySessionStore, SessionId, SessionManager, SessionStore,
    StartedSession,
};
