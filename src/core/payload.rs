//! Purpose: Encode and decode the folder payload stored in a folder tag's value.
//! Exports: `FolderPayload`, `encode_payload`, `decode_payload`.
//! Role: Single codec for folder metadata; the parent link never passes through here.
//! Invariants: Wire form is standard base64 of `{"folder": <name>, "color": <color>}`.
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use super::error::{Error, ErrorKind};

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct FolderPayload {
    pub folder: String,
    #[serde(default)]
    pub color: String,
}

impl FolderPayload {
    pub fn new(folder: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            color: color.into(),
        }
    }
}

pub fn encode_payload(payload: &FolderPayload) -> String {
    // Serializing two owned strings cannot fail.
    let json = serde_json::to_vec(payload).unwrap_or_default();
    STANDARD.encode(json)
}

pub fn decode_payload(encoded: &str) -> Result<FolderPayload, Error> {
    let bytes = STANDARD.decode(encoded.trim()).map_err(|err| {
        Error::new(ErrorKind::Corrupt)
            .with_message("folder payload is not base64")
            .with_source(err)
    })?;
    serde_json::from_slice(&bytes).map_err(|err| {
        Error::new(ErrorKind::Corrupt)
            .with_message("folder payload is not a folder json object")
            .with_source(err)
    })
}
