use anyhow::Result;
use artifact_store::content_type_for;
use clap::Args;
use serde::Serialize;

use super::context::CliContext;
use super::output::{print_json, OutputFormat};

#[derive(Args, Clone, Debug)]
pub struct ContentTypeArgs {
    /// File names to classify
    #[arg(required = true)]
    pub files: Vec<String>,
}

#[derive(Debug, Serialize)]
struct Classified<'a> {
    file: &'a str,
    content_type: &'static str,
}

pub fn cmd_content_type(args: ContentTypeArgs, ctx: &CliContext) -> Result<()> {
    let classified: Vec<Classified<'_>> = args
        .files
        .iter()
        .map(|file| Classified {
            file,
            content_type: content_type_for(file),
        })
        .collect();

    match ctx.output() {
        OutputFormat::Json => print_json(&classified)?,
        OutputFormat::Human => {
            for entry in &classified {
                println!("{}\t{}", entry.file, entry.content_type);
            }
        }
    }
    Ok(())
}
