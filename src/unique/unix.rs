use crate::environment::InstanceIdentity;
use nix::errno::Errno;
use nix::fcntl::{flock, FlockArg};
use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("Failed to create session directory: {0}")]
    CreateDir(#[source] std::io::Error),
    #[error("Failed to open lock file: {0}")]
    Open(#[source] std::io::Error),
    #[error("Failed to call flock: {0}")]
    Flock(#[source] Errno),
}

// An open lock file. Closing it (or the process exiting) drops any flock held through it.
pub(super) struct NamedLock {
    file: File,
}

impl NamedLock {
    pub fn create(identity: &InstanceIdentity) -> Result<(Self, bool), PlatformError> {
        std::fs::create_dir_all(identity.session_dir()).map_err(PlatformError::CreateDir)?;
        // The file is never unlinked, another instance may be about to lock it
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(identity.lock_path())
            .map_err(PlatformError::Open)?;
        match flock(file.as_raw_fd(), FlockArg::LockExclusiveNonblock) {
            Ok(()) => Ok((NamedLock { file }, true)),
            // EWOULDBLOCK means another open file description holds the lock
            Err(Errno::EWOULDBLOCK) => Ok((NamedLock { file }, false)),
            Err(e) => Err(PlatformError::Flock(e)),
        }
    }

    pub fn release_ownership(&self) -> Result<(), PlatformError> {
        flock(self.file.as_raw_fd(), FlockArg::Unlock).map_err(PlatformError::Flock)
    }
}
