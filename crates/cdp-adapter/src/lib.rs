//! Browser-automation capability for the tenderscout step engine.
//!
//! The engine only talks to a live page through [`PageDriver`]: navigate, click, fill,
//! select, wait for network idle, capture a download and read rendered text. The
//! production implementation drives Chromium over CDP via `chromiumoxide`; the
//! `testing` feature adds a scripted driver that records every call.

pub mod config;
pub mod driver;
pub mod error;
pub mod locator;

mod chromium;

#[cfg(any(test, feature = "testing"))]
pub mod scripted;

pub use chromium::{ChromiumLauncher, ChromiumPage};
pub use config::{detect_chrome_executable, LaunchConfig};
pub use driver::{BrowserLauncher, DownloadedFile, PageDriver};
pub use error::{AdapterError, AdapterErrorKind};
pub use locator::Locator;
