pub mod app;
pub mod commands;
pub mod content_type;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod inspect;
pub mod output;
pub mod parse;
pub mod run;
pub mod runtime;

pub use content_type::{cmd_content_type, ContentTypeArgs};
pub use inspect::{cmd_inspect, InspectArgs};
pub use parse::{cmd_parse_response, ParseResponseArgs};
pub use run::{cmd_run, RunArgs};
