//! Copy-data transport over a Unix domain socket.
//!
//! The primary's "window" is a socket named after its title in the session directory. A frame is
//! the discriminator (u64 LE), the payload length in bytes (u32 LE) and the payload itself. The
//! sender half-closes its end and waits for the receiver to close the connection, which happens
//! once the receiver's handler has returned.

use crate::common::file_name_component;
use crate::payload::TransportPayload;
use std::io::{ErrorKind, Read, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};

pub const HEADER_LEN: usize = 12;

#[derive(Debug)]
pub struct WindowHandle(UnixStream);

pub fn endpoint_path(title: &str, session_dir: &Path) -> PathBuf {
    session_dir.join(format!("{}.window", file_name_component(title)))
}

pub fn find_window(title: &str, session_dir: &Path) -> Option<WindowHandle> {
    let path = endpoint_path(title, session_dir);
    match UnixStream::connect(&path) {
        Ok(stream) => Some(WindowHandle(stream)),
        // Nobody listening, or a socket left behind by a primary that has gone
        Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::ConnectionRefused) => None,
        Err(e) => {
            log::debug!("Unable to connect to {}: {}", path.display(), e);
            None
        }
    }
}

pub fn send(window: WindowHandle, payload: &TransportPayload) -> std::io::Result<()> {
    let mut stream = window.0;
    stream.write_all(&encode_header(payload.discriminator(), payload.byte_len()))?;
    stream.write_all(&payload.to_bytes())?;
    stream.shutdown(Shutdown::Write)?;
    // Wait for the receiver to finish handling the message
    let mut rest = Vec::new();
    stream.read_to_end(&mut rest)?;
    Ok(())
}

pub fn encode_header(discriminator: usize, byte_len: usize) -> [u8; HEADER_LEN] {
    let mut header = [0; HEADER_LEN];
    header[..8].copy_from_slice(&(discriminator as u64).to_le_bytes());
    header[8..].copy_from_slice(&(byte_len as u32).to_le_bytes());
    header
}

pub fn decode_header(header: &[u8; HEADER_LEN]) -> (usize, usize) {
    let mut discriminator = [0; 8];
    discriminator.copy_from_slice(&header[..8]);
    let mut byte_len = [0; 4];
    byte_len.copy_from_slice(&header[8..]);
    (
        u64::from_le_bytes(discriminator) as usize,
        u32::from_le_bytes(byte_len) as usize,
    )
}
