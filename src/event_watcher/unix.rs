use super::{ensure_owned, MAX_PAYLOAD_LEN};
use crate::environment::AppEnvironment;
use crate::notify::unix::{decode_header, endpoint_path, HEADER_LEN};
use crate::payload::TransportPayload;
use crate::startup::StartupMessage;
use crate::unique::OwnershipGate;
use anyhow::{bail, Context};
use std::fs;
use std::io::{ErrorKind, Read};
use std::os::unix::fs::MetadataExt;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

// A sender that stalls mid-frame must not wedge the watcher
const READ_TIMEOUT: Duration = Duration::from_secs(5);

// How often the idle accept loop checks the stop flag
const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug)]
pub struct EventWatcher {
    endpoint: PathBuf,
    // Identifies our socket file, the path may be reused by a later primary
    endpoint_id: (u64, u64),
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
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
        fs::create_dir_all(&environment.session_dir)
            .context("Unable to create session directory")?;
        let endpoint = endpoint_path(&environment.main_window_title, &environment.session_dir);

        // We hold the gate, so an existing socket was left by a previous primary
        match fs::remove_file(&endpoint) {
            Ok(()) => log::debug!("Removed stale endpoint {}", endpoint.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e).context("Unable to remove stale endpoint"),
        }
        let listener = UnixListener::bind(&endpoint)
            .with_context(|| format!("Unable to listen on {}", endpoint.display()))?;
        listener
            .set_nonblocking(true)
            .context("Unable to make listener non-blocking")?;
        let metadata = fs::symlink_metadata(&endpoint).context("Unable to stat endpoint")?;
        log::info!("Listening for startup messages on {}", endpoint.display());

        let stop = Arc::new(AtomicBool::new(false));
        let stop2 = stop.clone();
        let thread = std::thread::spawn(move || watch_endpoint(listener, stop2, on_message));

        Ok(Self {
            endpoint,
            endpoint_id: (metadata.dev(), metadata.ino()),
            stop,
            thread: Some(thread),
        })
    }
}

/// Serves connections one at a time until asked to stop
fn watch_endpoint<F>(listener: UnixListener, stop: Arc<AtomicBool>, on_message: F)
where
    F: Fn(StartupMessage),
{
    while !stop.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, _)) => {
                if let Err(e) = handle_connection(stream, &on_message) {
                    log::warn!("Failed to handle incoming message: {:#}", e);
                }
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => std::thread::sleep(POLL_INTERVAL),
            Err(e) => {
                log::warn!("Failed to accept connection: {}", e);
                std::thread::sleep(POLL_INTERVAL);
            }
        }
    }
    log::debug!("EventWatcher thread exiting");
}

// Dropping the stream on return is what unblocks the sender
fn handle_connection<F>(mut stream: UnixStream, on_message: &F) -> anyhow::Result<()>
where
    F: Fn(StartupMessage),
{
    // Some platforms hand out accepted sockets with the listener's O_NONBLOCK
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(READ_TIMEOUT))?;
    let mut header = [0; HEADER_LEN];
    stream
        .read_exact(&mut header)
        .context("Unable to read message header")?;
    let (discriminator, byte_len) = decode_header(&header);
    if byte_len > MAX_PAYLOAD_LEN {
        bail!("Message of {} bytes is too large", byte_len);
    }
    let mut bytes = vec![0; byte_len];
    stream
        .read_exact(&mut bytes)
        .context("Unable to read message payload")?;
    match TransportPayload::decode_startup_message(discriminator, &bytes)? {
        Some(message) => {
            log::info!("Received startup message from another instance");
            on_message(message);
        }
        None => log::debug!("Ignoring message with discriminator {}", discriminator),
    }
    Ok(())
}

impl Drop for EventWatcher {
    fn drop(&mut self) {
        log::info!("Stopping EventWatcher");
        self.stop.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("EventWatcher thread panicked");
            }
        }
        // Leave the endpoint alone if a newer primary has already replaced it
        match fs::symlink_metadata(&self.endpoint) {
            Ok(m) if (m.dev(), m.ino()) == self.endpoint_id => {
                fs::remove_file(&self.endpoint).ok();
            }
            _ => {}
        }
    }
}
