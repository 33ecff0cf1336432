use crate::environment::AppEnvironment;
use crate::event_watcher::EventWatcher;
use crate::notify::{self, Notifier};
use crate::startup::{StartupMessage, StartupSettings};
use crate::unique::{self, OwnershipGate};

/// The running application's claim on being the primary instance.
///
/// The lock is acquired on construction and released when this is disposed or dropped,
/// so every exit path of the owning process (including a panic unwinding through `main`)
/// gives it up exactly once. If the process dies outright the OS reclaims it.
#[derive(Debug)]
pub struct AppInstance {
    environment: AppEnvironment,
    gate: OwnershipGate,
    notifier: Notifier,
    watcher: Option<EventWatcher>,
}

impl AppInstance {
    pub fn new(environment: &AppEnvironment) -> Result<Self, unique::Error> {
        Self::acquire(environment, || {})
    }

    /// `register` is only called when this instance becomes the primary
    pub fn acquire<F>(environment: &AppEnvironment, register: F) -> Result<Self, unique::Error>
    where
        F: FnOnce(),
    {
        let gate = OwnershipGate::acquire(&environment.identity())?;
        if gate.is_owned() {
            register();
        }
        Ok(Self {
            environment: environment.clone(),
            gate,
            notifier: Notifier::new(environment),
            watcher: None,
        })
    }

    /// true if this is the only running instance of the application, false if another
    /// instance was already running
    pub fn is_owned(&self) -> bool {
        self.gate.is_owned()
    }

    /// Starts receiving the startup messages of later instances. Fails unless this is the
    /// primary instance. The receiver is stopped by [AppInstance::dispose].
    pub fn listen<F>(&mut self, on_message: F) -> anyhow::Result<()>
    where
        F: Fn(StartupMessage) + Send + 'static,
    {
        if self.watcher.is_some() {
            anyhow::bail!("Already listening for startup messages");
        }
        self.watcher = Some(EventWatcher::start(
            &self.gate,
            &self.environment,
            on_message,
        )?);
        Ok(())
    }

    pub fn is_listening(&self) -> bool {
        self.watcher.is_some()
    }

    /// Sends the startup arguments of this instance to the primary instance, if one can be found
    pub fn notify_owner(&self, settings: &StartupSettings) -> Result<(), notify::Error> {
        self.notifier.notify_primary(settings)
    }

    pub fn dispose(&mut self) {
        // Stop receiving before another instance can take over the lock
        drop(self.watcher.take());
        self.gate.release();
    }
}

impl Drop for AppInstance {
    fn drop(&mut self) {
        self.dispose();
    }
}
