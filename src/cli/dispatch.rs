use anyhow::Result;

use super::commands::Commands;
use super::context::CliContext;
use super::env::CliArgs;
use super::{cmd_content_type, cmd_inspect, cmd_parse_response, cmd_run};

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Run(args) => cmd_run(args, ctx).await,
        Commands::Inspect(args) => cmd_inspect(args, ctx).await,
        Commands::ParseResponse(args) => cmd_parse_response(args, ctx).await,
        Commands::ContentType(args) => cmd_content_type(args, ctx),
    }
}
