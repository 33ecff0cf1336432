use crate::payload::TransportPayload;
use std::convert::Infallible;
use std::ffi::c_void;
use std::path::Path;
use windows::core::{HSTRING, PCWSTR};
use windows::Win32::Foundation::{HWND, LPARAM, WPARAM};
use windows::Win32::System::DataExchange::COPYDATASTRUCT;
use windows::Win32::UI::WindowsAndMessaging::{FindWindowW, SendMessageW, WM_COPYDATA};

#[derive(Debug)]
pub struct WindowHandle(HWND);

pub fn find_window(title: &str, _session_dir: &Path) -> Option<WindowHandle> {
    // Title only, any window class
    let hwnd = unsafe { FindWindowW(PCWSTR::null(), &HSTRING::from(title)) };
    if hwnd.0 == 0 {
        None
    } else {
        Some(WindowHandle(hwnd))
    }
}

/// `SendMessageW` reports neither delivery failures nor timeouts, so this never fails
pub fn send(window: WindowHandle, payload: &TransportPayload) -> Result<(), Infallible> {
    let copy_data = COPYDATASTRUCT {
        dwData: payload.discriminator(),
        cbData: payload.byte_len() as u32,
        lpData: payload.units().as_ptr() as *mut c_void,
    };
    // The result only says whether the receiver handled the message, which we don't track
    let _ = unsafe {
        SendMessageW(
            window.0,
            WM_COPYDATA,
            WPARAM(0),
            LPARAM(&copy_data as *const COPYDATASTRUCT as isize),
        )
    };
    Ok(())
}
