//! `tenderscout` command-line runner.
//!
//! Wires the step engine to its production collaborators: a directory of JSON
//! configurations, Chromium, a filesystem artifact store, an LLM provider chosen from
//! settings and a JSON-lines record sink.

pub mod cli;
pub mod loader;
pub mod settings;
pub mod sink;

pub use loader::JsonDirectoryLoader;
pub use settings::{LlmSettings, ProviderKind, Settings};
pub use sink::JsonLinesRecordSink;
