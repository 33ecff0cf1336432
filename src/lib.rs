//! Keeps a single primary instance of the application per session.
//!
//! A late launched instance finds that it does not own the instance lock, forwards its
//! startup arguments to the primary instance and exits.

pub mod common;
pub mod environment;
pub mod event_watcher;
pub mod instance;
pub mod notify;
pub mod payload;
pub mod startup;
pub mod unique;

pub use environment::{AppEnvironment, InstanceIdentity};
pub use event_watcher::EventWatcher;
pub use instance::AppInstance;
pub use notify::Notifier;
pub use payload::{TransportPayload, STARTUP_MESSAGE_DISCRIMINATOR};
pub use startup::{StartupMessage, StartupSettings};
pub use unique::OwnershipGate;
