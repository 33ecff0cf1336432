//! Utility to decide which instance of the application is the primary one.
//!
//! An [OwnershipGate] wraps a session wide named lock. Creating it makes a single non-blocking
//! attempt to take ownership; losing that race is reported through [OwnershipGate::is_owned],
//! not as an error.

use crate::environment::InstanceIdentity;
use std::fmt::Debug;
use thiserror::Error;

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

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unable to create the instance lock {0}: {1}")]
    PlatformError(String, #[source] Box<dyn std::error::Error + Send + Sync>),
}

pub struct OwnershipGate {
    name: String,
    lock: Option<platform::NamedLock>,
    owned: bool,
}

impl OwnershipGate {
    pub fn acquire(identity: &InstanceIdentity) -> Result<Self, Error> {
        let (lock, owned) = platform::NamedLock::create(identity)
            .map_err(|e| Error::PlatformError(identity.to_string(), Box::new(e)))?;
        if owned {
            log::info!("Acquired instance lock: {}", identity);
        } else {
            log::info!("Instance lock {} is owned by another instance", identity);
        }
        Ok(Self {
            name: identity.to_string(),
            lock: Some(lock),
            owned,
        })
    }

    /// Whether this instance holds the lock, i.e. is the primary instance
    pub fn is_owned(&self) -> bool {
        self.owned
    }

    pub fn is_disposed(&self) -> bool {
        self.lock.is_none()
    }

    /// Gives up ownership (if held) and closes the lock. Later calls do nothing.
    pub fn release(&mut self) {
        let Some(lock) = self.lock.take() else {
            return;
        };
        if self.owned {
            match lock.release_ownership() {
                Ok(()) => log::info!("Released instance lock: {}", self.name),
                Err(e) => log::warn!("Failed to release instance lock {}: {}", self.name, e),
            }
        }
        drop(lock);
    }
}

impl Drop for OwnershipGate {
    fn drop(&mut self) {
        self.release();
    }
}

impl Debug for OwnershipGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnershipGate")
            .field("name", &self.name)
            .field("owned", &self.owned)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::AppEnvironment;
    use std::sync::{Arc, Barrier};
    use tempfile::TempDir;

    // Unique per test, kernel objects on Windows are shared by the whole session
    fn identity(dir: &TempDir) -> InstanceIdentity {
        let name = format!(
            "MainApp{}",
            dir.path().file_name().unwrap().to_string_lossy()
        );
        AppEnvironment::current()
            .with_application_name(name.as_str())
            .with_session_dir(dir.path())
            .packaged(false)
            .identity()
    }

    #[test]
    fn only_first_gate_is_owned() {
        let dir = tempfile::tempdir().unwrap();
        let first = OwnershipGate::acquire(&identity(&dir)).unwrap();
        let second = OwnershipGate::acquire(&identity(&dir)).unwrap();
        assert!(first.is_owned());
        assert!(!second.is_owned());
        assert!(!second.is_disposed());
    }

    #[test]
    fn release_lets_the_next_gate_own() {
        let dir = tempfile::tempdir().unwrap();
        let mut first = OwnershipGate::acquire(&identity(&dir)).unwrap();
        first.release();
        assert!(first.is_disposed());
        let second = OwnershipGate::acquire(&identity(&dir)).unwrap();
        assert!(second.is_owned());
    }

    #[test]
    fn drop_lets_the_next_gate_own() {
        let dir = tempfile::tempdir().unwrap();
        drop(OwnershipGate::acquire(&identity(&dir)).unwrap());
        assert!(OwnershipGate::acquire(&identity(&dir)).unwrap().is_owned());
    }

    #[test]
    fn releasing_a_gate_that_is_not_owned_keeps_the_owner() {
        let dir = tempfile::tempdir().unwrap();
        let owner = OwnershipGate::acquire(&identity(&dir)).unwrap();
        let mut other = OwnershipGate::acquire(&identity(&dir)).unwrap();
        other.release();
        other.release();
        assert!(other.is_disposed());
        assert!(owner.is_owned());
        assert!(!OwnershipGate::acquire(&identity(&dir)).unwrap().is_owned());
    }

    #[test]
    fn release_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut gate = OwnershipGate::acquire(&identity(&dir)).unwrap();
        gate.release();
        gate.release();
        drop(gate);
        assert!(OwnershipGate::acquire(&identity(&dir)).unwrap().is_owned());
    }

    #[test]
    fn different_identities_do_not_contend() {
        let dir = tempfile::tempdir().unwrap();
        let env = AppEnvironment::current()
            .with_session_dir(dir.path())
            .packaged(false);
        let tag = dir.path().file_name().unwrap().to_string_lossy().to_string();
        let a = OwnershipGate::acquire(
            &env.clone().with_application_name(format!("A{}", tag)).identity(),
        )
        .unwrap();
        let b = OwnershipGate::acquire(&env.with_application_name(format!("B{}", tag)).identity())
            .unwrap();
        assert!(a.is_owned());
        assert!(b.is_owned());
    }

    #[test]
    fn concurrent_acquisitions_yield_one_owner() {
        const ATTEMPTS: usize = 16;
        let dir = tempfile::tempdir().unwrap();
        let identity = identity(&dir);
        let start = Arc::new(Barrier::new(ATTEMPTS));
        let held = Arc::new(Barrier::new(ATTEMPTS));
        let threads: Vec<_> = (0..ATTEMPTS)
            .map(|_| {
                let identity = identity.clone();
                let start = start.clone();
                let held = held.clone();
                std::thread::spawn(move || {
                    start.wait();
                    let gate = OwnershipGate::acquire(&identity).unwrap();
                    let owned = gate.is_owned();
                    // Keep every gate alive until all attempts have been made
                    held.wait();
                    owned
                })
            })
            .collect();
        let owners = threads
            .into_iter()
            .map(|t| t.join().unwrap())
            .filter(|owned| *owned)
            .count();
        assert_eq!(owners, 1);
    }

    #[test]
    #[cfg(unix)]
    fn missing_session_dir_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let identity = AppEnvironment::current()
            .with_session_dir(dir.path().join("nested").join("session"))
            .identity();
        assert!(OwnershipGate::acquire(&identity).unwrap().is_owned());
        assert!(identity.lock_path().exists());
    }

    #[test]
    #[cfg(unix)]
    fn unusable_session_dir_is_a_platform_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        std::fs::write(&file, b"").unwrap();
        let identity = AppEnvironment::current().with_session_dir(&file).identity();
        assert!(matches!(
            OwnershipGate::acquire(&identity),
            Err(Error::PlatformError(..))
        ));
    }
}
