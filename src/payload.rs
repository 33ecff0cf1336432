//! Wire form of a startup message: UTF-16 text tagged with a discriminator.
//!
//! The encoded units always carry one trailing NUL, so the length handed to the transport is
//! `encoded + 1` units. Receivers take whole units only and strip exactly one trailing NUL,
//! which also accepts senders that report a byte length of `encoded bytes + 1`.

use crate::startup::StartupMessage;
use std::iter::once;
use thiserror::Error;

/// Identifies a startup message among other copy-data messages the receiver may get
pub const STARTUP_MESSAGE_DISCRIMINATOR: usize = 100;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Payload is not valid UTF-16: {0}")]
    Utf16(#[from] std::string::FromUtf16Error),
    #[error("Payload is not a valid startup message: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportPayload {
    discriminator: usize,
    units: Vec<u16>,
}

impl TransportPayload {
    pub fn encode(discriminator: usize, text: &str) -> Self {
        Self {
            discriminator,
            units: text.encode_utf16().chain(once(0)).collect(),
        }
    }

    pub fn from_startup_message(message: &StartupMessage) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_string(message)?;
        Ok(Self::encode(STARTUP_MESSAGE_DISCRIMINATOR, &json))
    }

    pub fn discriminator(&self) -> usize {
        self.discriminator
    }

    /// Encoded text followed by the terminating NUL
    pub fn units(&self) -> &[u16] {
        &self.units
    }

    pub fn byte_len(&self) -> usize {
        self.units.len() * std::mem::size_of::<u16>()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.units.iter().flat_map(|u| u.to_le_bytes()).collect()
    }

    pub fn decode_text(bytes: &[u8]) -> Result<String, Error> {
        let mut units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        if units.last() == Some(&0) {
            units.pop();
        }
        Ok(String::from_utf16(&units)?)
    }

    /// Returns `None` when the payload is some other kind of message
    pub fn decode_startup_message(
        discriminator: usize,
        bytes: &[u8],
    ) -> Result<Option<StartupMessage>, Error> {
        if discriminator != STARTUP_MESSAGE_DISCRIMINATOR {
            return Ok(None);
        }
        let text = Self::decode_text(bytes)?;
        Ok(Some(serde_json::from_str(&text)?))
    }
}
