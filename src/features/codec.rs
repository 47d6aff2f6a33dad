use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Unable to encode record")]
    Encode(#[source] serde_json::Error),

    #[error("Unable to decode record")]
    Decode(#[source] serde_json::Error),
}

pub type CodecResult<T> = Result<T, CodecError>;

/// A value persisted in the state store as a self-describing JSON document.
///
/// Fields are tagged by name, so unknown fields written by a newer version are
/// ignored and records stay readable across versions.
pub trait Record: Serialize + DeserializeOwned {
    fn encode(&self) -> CodecResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(CodecError::Encode)
    }

    fn decode(bytes: &[u8]) -> CodecResult<Self> {
        serde_json::from_slice(bytes).map_err(CodecError::Decode)
    }
}
