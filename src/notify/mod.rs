//! Forwards the startup arguments of a secondary instance to the primary instance.
//!
//! The primary is found by the exact title of its receiving window. Delivery is a single
//! synchronous copy-data send; nothing is acknowledged or retried, and finding no primary
//! is not an error.

use crate::environment::AppEnvironment;
use crate::payload::TransportPayload;
use crate::startup::{StartupMessage, StartupSettings};
use std::path::PathBuf;
use thiserror::Error;

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        pub(crate) mod unix;
        use self::unix as platform;
    } else if #[cfg(windows)] {
        mod windows;
        use self::windows as platform;
    } else {
        compile_error!("unsupported platform");
    }
}

pub use platform::WindowHandle;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unable to serialize the startup message: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Unable to deliver the startup message: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

#[derive(Debug, Clone)]
pub struct Notifier {
    window_title: String,
    session_dir: PathBuf,
}

impl Notifier {
    pub fn new(environment: &AppEnvironment) -> Self {
        Self {
            window_title: environment.main_window_title.clone(),
            session_dir: environment.session_dir.clone(),
        }
    }

    pub fn notify_primary(&self, settings: &StartupSettings) -> Result<(), Error> {
        let message = StartupMessage::from(settings);
        let payload = TransportPayload::from_startup_message(&message)?;
        match self.find_window() {
            Some(window) => self.send(window, &payload),
            None => {
                log::debug!(
                    "No window titled {:?} found, not forwarding startup message",
                    self.window_title
                );
                Ok(())
            }
        }
    }

    /// Locates the primary instance's receiving window by its exact title
    pub fn find_window(&self) -> Option<WindowHandle> {
        platform::find_window(&self.window_title, &self.session_dir)
    }

    /// Blocks until the receiving window has handled the message
    pub fn send(&self, window: WindowHandle, payload: &TransportPayload) -> Result<(), Error> {
        log::info!(
            "Forwarding startup message ({} bytes) to {:?}",
            payload.byte_len(),
            self.window_title
        );
        platform::send(window, payload).map_err(|e| Error::Transport(Box::new(e)))
    }
}
