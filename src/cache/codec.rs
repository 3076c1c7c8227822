//! Versioned JSON wire format for cached payloads.
//!
//! Every value is wrapped as `{"v":1,"data":...}`. Payloads written by a
//! different format version decode as an error, which callers treat as a miss.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

pub const WIRE_VERSION: u8 = 1;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("unsupported cache payload version {found}, expected {WIRE_VERSION}")]
    Version { found: u8 },
    #[error("malformed cache payload: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    v: u8,
    data: &'a T,
}

#[derive(Deserialize)]
struct Header {
    v: u8,
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    Ok(serde_json::to_vec(&EnvelopeRef {
        v: WIRE_VERSION,
        data: value,
    })?)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    let header: Header = serde_json::from_slice(bytes)?;
    if header.v != WIRE_VERSION {
        return Err(CodecError::Version { found: header.v });
    }
    let envelope: Envelope<T> = serde_json::from_slice(bytes)?;
    Ok(envelope.data)
}
