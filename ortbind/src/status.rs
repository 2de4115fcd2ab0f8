//! Converts native status handles to `Result`.

use std::ffi::CStr;

use crate::error::{ErrorCode, OrtError, Result};
use crate::ffi::{self, OrtApi, OrtStatusPtr};
use crate::handle::Handle;

/// Checks the status returned by a native call.
///
/// A null status is success. Otherwise the message and code are copied out
/// and the status is released before returning the error.
pub fn check(api: &OrtApi, status: OrtStatusPtr) -> Result<()> {
    if status.is_null() {
        return Ok(());
    }
    let status = Handle::new(api, status);

    // The message pointer is owned by the status object.
    let message = match api.GetErrorMessage {
        Some(get_message) => {
            let ptr = unsafe { get_message(status.as_ptr()) };
            if ptr.is_null() {
                String::new()
            } else {
                unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
            }
        }
        None => String::from("ort: engine error (no GetErrorMessage entry)"),
    };
    let code = match api.GetErrorCode {
        Some(get_code) => unsafe { get_code(status.as_ptr()) },
        None => ffi::ORT_FAIL,
    };

    Err(OrtError::Engine {
        code: ErrorCode::from_raw(code),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock;

    #[test]
    fn null_status_is_ok() {
        let engine = mock::lock();
        assert!(check(engine.api(), std::ptr::null_mut()).is_ok());
    }

    #[test]
    fn failure_copies_message_and_releases() {
        let engine = mock::lock();
        let status = mock::status(ffi::ORT_INVALID_ARGUMENT, "Missing Input: x");
        assert_eq!(engine.live(), 1);

        let err = check(engine.api(), status).unwrap_err();
        match err {
            OrtError::Engine { code, message } => {
                assert_eq!(code, ErrorCode::InvalidArgument);
                assert_eq!(message, "Missing Input: x");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(engine.live(), 0);
        assert_eq!(engine.stats().invalid_releases, 0);
    }
}
