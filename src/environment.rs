//! Resolves the identifiers shared by every instance of the application:
//! the lock name and the title of the window that receives startup messages.

use crate::common::{file_name_component, session_directory, APP_NAME, STORE_ALIAS_NAME};
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const LOCK_NAME_PREFIX: &str = "Mutex";

// Keeps the lock name from colliding with unrelated applications of the same name
const LOCK_NAME_SUFFIX: &str = "4f9wB";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppEnvironment {
    pub application_name: String,
    pub store_alias_name: String,
    pub is_packaged: bool,
    pub main_window_title: String,
    /// Where the session scoped lock and receiver endpoint are created (Unix only)
    pub session_dir: PathBuf,
}

impl AppEnvironment {
    pub fn current() -> Self {
        Self {
            application_name: APP_NAME.to_owned(),
            store_alias_name: STORE_ALIAS_NAME.to_owned(),
            is_packaged: is_packaged_instance(),
            main_window_title: APP_NAME.to_owned(),
            session_dir: session_directory(),
        }
    }

    pub fn with_application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = name.into();
        self
    }

    pub fn with_main_window_title(mut self, title: impl Into<String>) -> Self {
        self.main_window_title = title.into();
        self
    }

    pub fn with_session_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.session_dir = dir.into();
        self
    }

    pub fn packaged(mut self, packaged: bool) -> Self {
        self.is_packaged = packaged;
        self
    }

    /// The name the lock is keyed on, packaged and unpackaged variants are kept apart
    pub fn instance_name(&self) -> &str {
        if self.is_packaged {
            &self.store_alias_name
        } else {
            &self.application_name
        }
    }

    pub fn identity(&self) -> InstanceIdentity {
        InstanceIdentity {
            name: format!(
                "{}{}{}",
                LOCK_NAME_PREFIX,
                self.instance_name(),
                LOCK_NAME_SUFFIX
            ),
            session_dir: self.session_dir.clone(),
        }
    }
}

/// Name of the session wide lock deciding which instance is the primary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceIdentity {
    name: String,
    session_dir: PathBuf,
}

impl InstanceIdentity {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the kernel object in the session local namespace
    pub fn kernel_name(&self) -> String {
        format!("Local\\{}", self.name)
    }

    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    pub fn lock_path(&self) -> PathBuf {
        self.session_dir
            .join(format!("{}.lock", file_name_component(&self.name)))
    }
}

impl Display for InstanceIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(windows)]
fn is_packaged_instance() -> bool {
    use windows::core::PWSTR;
    use windows::Win32::Foundation::APPMODEL_ERROR_NO_PACKAGE;
    use windows::Win32::Storage::Packaging::Appx::GetCurrentPackageFullName;

    let mut len = 0;
    // Asking for the length only; anything other than "no package" means we have an identity
    let result = unsafe { GetCurrentPackageFullName(&mut len, PWSTR::null()) };
    result != APPMODEL_ERROR_NO_PACKAGE
}

#[cfg(unix)]
fn is_packaged_instance() -> bool {
    std::env::var_os("FLATPAK_ID").is_some() || std::env::var_os("SNAP_NAME").is_some()
}
