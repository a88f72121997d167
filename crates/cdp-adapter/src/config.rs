use serde::{Deserialize, Serialize};
use std::{env, path::PathBuf};
use which::which;

/// Launch parameters for the Chromium page driver.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchConfig {
    /// Explicit browser binary; detected from `TENDERSCOUT_CHROME` / `PATH` when absent.
    pub executable: Option<PathBuf>,
    pub headless: bool,
    pub no_sandbox: bool,
    pub window_width: u32,
    pub window_height: u32,
    pub request_timeout_ms: u64,
    pub launch_timeout_ms: u64,
    /// Upper bound for a single network-idle wait.
    pub network_idle_timeout_ms: u64,
    /// How long resource activity must stay flat before the page counts as idle.
    pub network_idle_quiet_ms: u64,
    pub download_timeout_ms: u64,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            executable: None,
            headless: resolve_headless_default(),
            no_sandbox: env_flag("TENDERSCOUT_DISABLE_SANDBOX"),
            window_width: 1366,
            window_height: 900,
            request_timeout_ms: 30_000,
            launch_timeout_ms: 20_000,
            network_idle_timeout_ms: 30_000,
            network_idle_quiet_ms: 500,
            download_timeout_ms: 120_000,
        }
    }
}

impl LaunchConfig {
    pub fn resolved_executable(&self) -> Option<PathBuf> {
        self.executable
            .clone()
            .filter(|path| !path.as_os_str().is_empty())
            .or_else(detect_chrome_executable)
    }
}

fn resolve_headless_default() -> bool {
    match env::var("TENDERSCOUT_HEADLESS") {
        Ok(value) => {
            let lower = value.to_ascii_lowercase();
            !matches!(lower.as_str(), "0" | "false" | "no" | "off")
        }
        Err(_) => true,
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Locate a Chrome/Chromium binary: `TENDERSCOUT_CHROME`, then `PATH`, then OS defaults.
pub fn detect_chrome_executable() -> Option<PathBuf> {
    if let Ok(raw) = env::var("TENDERSCOUT_CHROME") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            let candidate = PathBuf::from(trimmed);
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    for name in chrome_executable_names() {
        if let Ok(path) = which(name) {
            return Some(path);
        }
    }

    os_specific_chrome_paths()
        .into_iter()
        .find(|candidate| candidate.exists())
}

fn chrome_executable_names() -> &'static [&'static str] {
    #[cfg(target_os = "windows")]
    {
        &["chrome.exe", "chromium.exe", "msedge.exe"]
    }

    #[cfg(not(target_os = "windows"))]
    {
        &[
            "google-chrome-stable",
            "google-chrome",
            "chromium",
            "chromium-browser",
        ]
    }
}

fn os_specific_chrome_paths() -> Vec<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        vec![
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"),
            PathBuf::from("/Applications/Chromium.app/Contents/MacOS/Chromium"),
        ]
    }

    #[cfg(target_os = "windows")]
    {
        vec![
            PathBuf::from(r"C:\Program Files\Google\Chrome\Application\chrome.exe"),
            PathBuf::from(r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe"),
        ]
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![
            PathBuf::from("/usr/bin/google-chrome"),
            PathBuf::from("/usr/bin/chromium"),
            PathBuf::from("/snap/bin/chromium"),
        ]
    }
}
