//! Receives startup messages forwarded by secondary instances.
//!
//! Only the primary instance may start an [EventWatcher], which is why starting one takes the
//! owned [OwnershipGate]. The watcher owns the window (or endpoint) that secondaries look up by
//! title, and hands every decoded [StartupMessage](crate::startup::StartupMessage) to a callback
//! on its own thread, one message at a time.

use crate::unique::OwnershipGate;

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        mod unix;
        use self::unix as platform;
    } else if #[cfg(windows)] {
        mod windows;
        use self::windows as platform;
    } else {
        compile_error!("unsupported platform");
    }
}

pub use platform::EventWatcher;

// Larger frames are refused rather than buffered
const MAX_PAYLOAD_LEN: usize = 16 * 1024 * 1024;

fn ensure_owned(gate: &OwnershipGate) -> anyhow::Result<()> {
    if !gate.is_owned() || gate.is_disposed() {
        anyhow::bail!("Only the primary instance can receive startup messages");
    }
    Ok(())
}
