//! Rust bindings for the ONNX Runtime C API.
//!
//! ONNX Runtime is a cross-platform inference engine for ONNX models. This
//! crate binds its versioned function table at runtime and handles the
//! marshaling around it: status codes become errors, native handles are
//! released exactly once, type information is decoded into plain values
//! and tensors move between Rust data and engine values.
//!
//! # Usage
//!
//! ```no_run
//! use ortbind::{HostValue, RunOptions, Session, SessionOptions};
//!
//! let session = Session::open("model.onnx", &SessionOptions::default()).unwrap();
//! for input in session.inputs() {
//!     println!("{}: {}", input.name, input.descriptor);
//! }
//!
//! let x = HostValue::from(vec![vec![0.5f32, -1.0], vec![2.0, 0.0]]);
//! let outputs = session.run(None, [("x", x)], &RunOptions::default()).unwrap();
//! println!("{:?}", outputs[0]);
//! ```
//!
//! # Dynamic Linking
//!
//! The shared library is loaded on first use from `ORT_DYLIB_PATH`, or by
//! its platform name through the normal library search path. Nothing is
//! linked at build time.

pub mod ffi;

mod allocator;
mod api;
pub mod codec;
mod environment;
mod error;
mod handle;
mod options;
mod session;
pub mod status;
pub mod types;
mod value;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use api::{Api, DYLIB_PATH_ENV};
pub use environment::Environment;
pub use error::{ErrorCode, OrtError, Result};
pub use ffi::ORT_API_VERSION;
pub use handle::{Handle, Release};
pub use options::{
    DEFAULT_PROFILE_PREFIX, ExecutionMode, GraphOptimizationLevel, OutputKind, RunOptions,
    SessionOptions,
};
pub use session::{ModelMetadata, ModelSource, Session};
pub use types::{Dim, ElementType, IoSignature, TypeDescriptor};
pub use value::{HostValue, Input, NativeValue, TensorBuffer};
