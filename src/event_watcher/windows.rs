use super::{ensure_owned, MAX_PAYLOAD_LEN};
use crate::environment::AppEnvironment;
use crate::payload::TransportPayload;
use crate::startup::StartupMessage;
use crate::unique::OwnershipGate;
use anyhow::Context;
use std::sync::mpsc::sync_channel;
use std::thread::JoinHandle;
use win32_utils::error::{check_error, CheckError};
use win32_utils::window::WindowDataExtension;
use windows::core::{w, HSTRING, PCWSTR};
use windows::Win32::Foundation::{ERROR_CLASS_ALREADY_EXISTS, HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::System::DataExchange::COPYDATASTRUCT;
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, GetMessageW, PostQuitMessage,
    RegisterClassW, SendMessageW, SetWindowLongPtrW, CW_USEDEFAULT, GWLP_USERDATA, MSG,
    WINDOW_EX_STYLE, WINDOW_STYLE, WM_APP, WM_COPYDATA, WNDCLASSW,
};

const EXIT_LOOP: u32 = WM_APP + 999;

const WINDOW_CLASS: PCWSTR = w!("app_instance_event_watcher");

#[derive(Debug)]
pub struct EventWatcher {
    thread: Option<JoinHandle<()>>,
    hwnd: HWND,
}

impl EventWatcher {
    pub fn start<F>(
        gate: &OwnershipGate,
        environment: &AppEnvironment,
        on_message: F,
    ) -> anyhow::Result<Self>
    where
        F: Fn(StartupMessage) + Send + 'static,
    {
        ensure_owned(gate)?;
        let title = HSTRING::from(environment.main_window_title.as_str());
        let (tx, rx) = sync_channel(0);

        let thread = std::thread::spawn(move || {
            let mut window_data = Box::new(WindowData {
                on_message: Box::new(on_message),
            });

            let hwnd = match unsafe { create_window(&title, window_data.as_mut()) } {
                Ok(hwnd) => hwnd,
                Err(e) => {
                    tx.send(Err(e)).ok();
                    return;
                }
            };
            tx.send(Ok(hwnd)).ok();

            unsafe {
                let mut message = MSG::default();
                // WM_QUIT is not addressed to the window, so no hwnd filter here
                while GetMessageW(&mut message, HWND(0), 0, 0).into() {
                    DispatchMessageW(&message);
                }
            }
            log::debug!("EventWatcher thread exiting");
        });

        let hwnd = rx
            .recv()
            .context("EventWatcher thread exited unexpectedly")?
            .context("Unable to create receiving window")?;
        log::info!(
            "Listening for startup messages on window {:?}",
            environment.main_window_title
        );
        Ok(EventWatcher {
            thread: Some(thread),
            hwnd,
        })
    }
}

// A hidden top level window, so that FindWindowW can see it
unsafe fn create_window(
    title: &HSTRING,
    window_data: &mut WindowData,
) -> windows::core::Result<HWND> {
    let instance = GetModuleHandleW(None)?;
    let window_class = WNDCLASSW {
        hInstance: instance.into(),
        lpszClassName: WINDOW_CLASS,
        lpfnWndProc: Some(wndproc),
        ..Default::default()
    };
    // Registered by the first watcher of this process, later watchers reuse it
    match check_error(|| RegisterClassW(&window_class)) {
        Ok(_) => {}
        Err(e) if e.code() == ERROR_CLASS_ALREADY_EXISTS.to_hresult() => {}
        Err(e) => return Err(e),
    }

    let hwnd = CreateWindowExW(
        WINDOW_EX_STYLE::default(),
        WINDOW_CLASS,
        title,
        WINDOW_STYLE::default(),
        CW_USEDEFAULT,
        CW_USEDEFAULT,
        CW_USEDEFAULT,
        CW_USEDEFAULT,
        None,
        None,
        instance,
        None,
    )
    .check_error()?;

    check_error(|| SetWindowLongPtrW(hwnd, GWLP_USERDATA, window_data as *mut _ as isize))?;
    Ok(hwnd)
}

impl Drop for EventWatcher {
    fn drop(&mut self) {
        log::info!("Stopping EventWatcher");
        unsafe { SendMessageW(self.hwnd, EXIT_LOOP, WPARAM(0), LPARAM(0)) };
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("EventWatcher thread panicked");
            }
        }
    }
}

struct WindowData {
    on_message: Box<dyn Fn(StartupMessage) + Send>,
}

unsafe fn receive_copy_data(window_data: &WindowData, lparam: LPARAM) -> bool {
    let copy_data = match (lparam.0 as *const COPYDATASTRUCT).as_ref() {
        Some(c) => c,
        None => return false,
    };
    let len = copy_data.cbData as usize;
    if copy_data.lpData.is_null() || len > MAX_PAYLOAD_LEN {
        return false;
    }
    let bytes = std::slice::from_raw_parts(copy_data.lpData as *const u8, len);
    match TransportPayload::decode_startup_message(copy_data.dwData, bytes) {
        Ok(Some(message)) => {
            log::info!("Received startup message from another instance");
            (window_data.on_message)(message);
            true
        }
        Ok(None) => {
            log::debug!("Ignoring WM_COPYDATA with dwData {}", copy_data.dwData);
            false
        }
        Err(e) => {
            log::warn!("Failed to decode startup message: {}", e);
            false
        }
    }
}

unsafe extern "system" fn wndproc(
    window: HWND,
    message: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    if let Some(window_data) = window.get_user_data::<WindowData>() {
        match message {
            WM_COPYDATA => {
                return LRESULT(receive_copy_data(window_data, lparam) as isize);
            }
            EXIT_LOOP => {
                // Secondaries must not find the window once we stop handling messages
                DestroyWindow(window).ok();
                PostQuitMessage(0);
                return LRESULT(0);
            }
            _ => {}
        }
    }
    DefWindowProcW(window, message, wparam, lparam)
}
