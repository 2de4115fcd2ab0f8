use std::fmt;

use thiserror::Error;

use crate::ffi;

/// Errors returned by ONNX Runtime operations.
#[derive(Debug, Error)]
pub enum OrtError {
    /// The shared library could not be loaded, or it does not provide the
    /// requested function-table version.
    #[error("ort: binding failed: {0}")]
    Binding(String),

    /// A native call returned a non-null status. The message is the
    /// engine's own text, unmodified.
    #[error("{message}")]
    Engine { code: ErrorCode, message: String },

    #[error("ort: unsupported {kind} type: {name}")]
    UnsupportedType { kind: &'static str, name: String },

    #[error("ort: {0}")]
    Argument(String),

    #[error("ort: unknown input: {0}")]
    UnknownInput(String),

    #[error("{message}")]
    InvalidOutputName { name: String, message: String },

    #[error("ort: session is closed")]
    UseAfterClose,

    /// The bound function table has no entry for a call this crate needs.
    #[error("ort: function table has no entry {0}")]
    MissingEntry(&'static str),
}

pub type Result<T> = std::result::Result<T, OrtError>;

impl OrtError {
    pub(crate) fn unsupported(kind: &'static str, name: impl fmt::Display) -> Self {
        OrtError::UnsupportedType {
            kind,
            name: name.to_string(),
        }
    }
}

/// Engine error codes (`OrtErrorCode`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Fail,
    InvalidArgument,
    NoSuchFile,
    NoModel,
    EngineError,
    RuntimeException,
    InvalidProtobuf,
    ModelLoaded,
    NotImplemented,
    InvalidGraph,
    EpFail,
    Other(i32),
}

impl ErrorCode {
    pub fn from_raw(code: ffi::OrtErrorCode) -> Self {
        match code {
            ffi::ORT_FAIL => ErrorCode::Fail,
            ffi::ORT_INVALID_ARGUMENT => ErrorCode::InvalidArgument,
            ffi::ORT_NO_SUCHFILE => ErrorCode::NoSuchFile,
            ffi::ORT_NO_MODEL => ErrorCode::NoModel,
            ffi::ORT_ENGINE_ERROR => ErrorCode::EngineError,
            ffi::ORT_RUNTIME_EXCEPTION => ErrorCode::RuntimeException,
            ffi::ORT_INVALID_PROTOBUF => ErrorCode::InvalidProtobuf,
            ffi::ORT_MODEL_LOADED => ErrorCode::ModelLoaded,
            ffi::ORT_NOT_IMPLEMENTED => ErrorCode::NotImplemented,
            ffi::ORT_INVALID_GRAPH => ErrorCode::InvalidGraph,
            ffi::ORT_EP_FAIL => ErrorCode::EpFail,
            other => ErrorCode::Other(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_message_is_verbatim() {
        let err = OrtError::Engine {
            code: ErrorCode::InvalidArgument,
            message: "Missing Input: x".into(),
        };
        assert_eq!(err.to_string(), "Missing Input: x");
    }

    #[test]
    fn unknown_codes_are_kept() {
        assert_eq!(ErrorCode::from_raw(2), ErrorCode::InvalidArgument);
        assert_eq!(ErrorCode::from_raw(42), ErrorCode::Other(42));
    }
}
