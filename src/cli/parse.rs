use action_flow::parse_typed_response;
use anyhow::{Context, Result};
use clap::Args;
use tokio::io::AsyncReadExt;

use super::context::CliContext;
use super::output::{print_json, OutputFormat};

#[derive(Args, Clone, Debug)]
pub struct ParseResponseArgs {
    /// Model output to parse; read from stdin when omitted
    #[arg(long)]
    pub text: Option<String>,
}

pub async fn cmd_parse_response(args: ParseResponseArgs, ctx: &CliContext) -> Result<()> {
    let raw = match args.text {
        Some(text) => text,
        None => {
            let mut buffer = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buffer)
                .await
                .context("Failed to read model output from stdin")?;
            buffer
        }
    };

    let parsed = parse_typed_response(&raw);
    match ctx.output() {
        OutputFormat::Json => print_json(&parsed)?,
        OutputFormat::Human => match parsed {
            Some(typed) => {
                println!("type: {}", typed.kind);
                for value in &typed.values {
                    println!("- {}", value);
                }
            }
            None => println!("no typed values"),
        },
    }
    Ok(())
}
