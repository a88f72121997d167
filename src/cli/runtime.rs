use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOCAL_ENV_PATH: &str = "config/local.env";

/// Export `KEY=value` lines from `config/local.env` without overriding the environment.
pub fn load_local_env_overrides() {
    let path = Path::new(LOCAL_ENV_PATH);
    if !path.exists() {
        return;
    }

    match fs::read_to_string(path) {
        Ok(contents) => {
            for (key, value) in parse_env_lines(&contents) {
                if env::var(&key).is_ok() {
                    continue;
                }
                env::set_var(key, value);
            }
            info!(path = %path.display(), "Loaded environment overrides from local.env");
        }
        Err(err) => {
            warn!(path = %path.display(), ?err, "failed to read local.env overrides");
        }
    }
}

fn parse_env_lines(contents: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (idx, raw_line) in contents.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            warn!(line = idx + 1, "invalid local.env entry; skipping");
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        pairs.push((key.to_string(), unescape_value(value.trim())));
    }
    pairs
}

pub fn init_logging(level: &str, json: bool) -> Result<()> {
    let level: tracing::Level = level.parse().context("Invalid log level")?;
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| fmt::layer().with_writer(std::io::stderr)))
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(())
}

fn unescape_value(value: &str) -> String {
    if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
        let inner = &value[1..value.len() - 1];
        inner
            .replace("\\\"", "\"")
            .replace("\\n", "\n")
            .replace("\\r", "\r")
            .replace("\\t", "\t")
    } else {
        value.to_string()
    }
}
