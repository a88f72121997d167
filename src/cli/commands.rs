use clap::Subcommand;

use super::{ContentTypeArgs, InspectArgs, ParseResponseArgs, RunArgs};

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Run every step of a stored configuration in one browser session
    Run(RunArgs),

    /// Load a configuration and list its ordered steps
    Inspect(InspectArgs),

    /// Parse model output into typed values
    ParseResponse(ParseResponseArgs),

    /// Print the content type stored for each file name
    ContentType(ContentTypeArgs),
}
