use std::sync::Arc;

use super::output::OutputFormat;
use crate::loader::JsonDirectoryLoader;
use crate::settings::Settings;

pub struct CliContext {
    settings: Arc<Settings>,
    output: OutputFormat,
}

impl CliContext {
    pub fn new(settings: Settings, output: OutputFormat) -> Self {
        Self {
            settings: Arc::new(settings),
            output,
        }
    }

    pub fn settings(&self) -> &Settings {
        self.settings.as_ref()
    }

    pub fn output(&self) -> OutputFormat {
        self.output
    }

    pub fn loader(&self) -> JsonDirectoryLoader {
        JsonDirectoryLoader::new(self.settings.configurations_dir.clone())
    }
}
