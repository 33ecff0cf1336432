use crate::environment::InstanceIdentity;
use windows::core::HSTRING;
use windows::Win32::Foundation::{
    CloseHandle, SetLastError, ERROR_ALREADY_EXISTS, HANDLE, WIN32_ERROR,
};
use windows::Win32::System::Threading::{CreateMutexW, ReleaseMutex};

// Handle to a named mutex in the session local namespace
pub(super) struct NamedLock(HANDLE);

impl NamedLock {
    pub fn create(identity: &InstanceIdentity) -> windows::core::Result<(Self, bool)> {
        let name = HSTRING::from(identity.kernel_name());
        unsafe {
            // https://www.codeproject.com/Articles/538/Avoiding-Multiple-Instances-of-an-Application
            SetLastError(WIN32_ERROR(0));
            let handle = CreateMutexW(None, true, &name)?;
            // Opening an existing mutex ignores the initial owner request
            let existed =
                windows::core::Error::from_win32().code() == ERROR_ALREADY_EXISTS.to_hresult();
            Ok((NamedLock(handle), !existed))
        }
    }

    /// Must be called from the thread that created the lock
    pub fn release_ownership(&self) -> windows::core::Result<()> {
        unsafe { ReleaseMutex(self.0) }
    }
}

impl Drop for NamedLock {
    fn drop(&mut self) {
        if let Err(e) = unsafe { CloseHandle(self.0) } {
            log::warn!("Failed to close instance lock handle: {}", e);
        }
    }
}
