//! Helpful serialization tools.
//!
//! Tokens travel as unpadded url-safe base64 around compact json, so the
//! helpers here are thin wrappers that pin those exact encodings down in one
//! place instead of fifty.

use crate::error::Result;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{de::DeserializeOwned, Serialize};

/// Convert bytes to unpadded url-safe base64
pub fn base64_encode<T: AsRef<[u8]>>(bytes: T) -> String {
    URL_SAFE_NO_PAD.encode(bytes.as_ref())
}

/// Convert unpadded url-safe base64 back to bytes
pub fn base64_decode<T: AsRef<[u8]>>(bytes: T) -> Result<Vec<u8>> {
    Ok(URL_SAFE_NO_PAD.decode(bytes.as_ref())?)
}

/// Serialize an object to compact json bytes
pub(crate) fn serialize_json<T: Serialize>(obj: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(obj)?)
}

/// Deserialize an object from json bytes
pub(crate) fn deserialize_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(bytes)?)
}
