//! Session manager: open a model, inspect its signature, run it.

use std::collections::BTreeMap;
use std::ffi::CString;
use std::os::raw::c_char;
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::allocator::{Allocated, take_string};
use crate::api::{Api, cstring, ort_path, ortsys};
use crate::codec;
use crate::environment::Environment;
use crate::error::{ErrorCode, OrtError, Result};
use crate::ffi::{OrtSession, OrtSessionOptions, OrtValue};
use crate::handle::Handle;
use crate::options::{RunOptions, SessionOptions};
use crate::status;
use crate::types::{self, IoSignature, TypeDescriptor};
use crate::value::{HostValue, Input, NativeValue};

const CPU_PROVIDER: &str = "CPUExecutionProvider";
const CUDA_PROVIDER: &str = "CUDAExecutionProvider";
const COREML_PROVIDER: &str = "CoreMLExecutionProvider";

/// Where a model comes from.
#[derive(Debug, Clone, Copy)]
pub enum ModelSource<'a> {
    /// The engine reads the file itself.
    Path(&'a Path),
    /// Serialized model bytes.
    Bytes(&'a [u8]),
}

impl<'a> From<&'a Path> for ModelSource<'a> {
    fn from(path: &'a Path) -> Self {
        ModelSource::Path(path)
    }
}

impl<'a> From<&'a PathBuf> for ModelSource<'a> {
    fn from(path: &'a PathBuf) -> Self {
        ModelSource::Path(path)
    }
}

impl<'a> From<&'a str> for ModelSource<'a> {
    fn from(path: &'a str) -> Self {
        ModelSource::Path(Path::new(path))
    }
}

impl<'a> From<&'a [u8]> for ModelSource<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        ModelSource::Bytes(bytes)
    }
}

impl<'a> From<&'a Vec<u8>> for ModelSource<'a> {
    fn from(bytes: &'a Vec<u8>) -> Self {
        ModelSource::Bytes(bytes)
    }
}

/// Model metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModelMetadata {
    pub producer_name: String,
    pub graph_name: String,
    pub graph_description: String,
    pub domain: String,
    pub description: String,
    pub version: i64,
    pub custom_metadata_map: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Holds a loaded ONNX model.
///
/// Not `Sync`: concurrent `run` calls on one session need external
/// serialization.
pub struct Session {
    handle: Option<Handle<OrtSession>>,
    // After `handle`, so the session is released before the environment.
    env: Arc<Environment>,
    api: &'static Api,
    inputs: Vec<IoSignature>,
    outputs: Vec<IoSignature>,
    profiling: bool,
}

unsafe impl Send for Session {}

impl Session {
    /// Opens a model with the process-wide engine.
    pub fn open<'a>(source: impl Into<ModelSource<'a>>, options: &SessionOptions) -> Result<Self> {
        Self::open_with_api(Api::global()?, source, options)
    }

    pub fn open_with_api<'a>(
        api: &'static Api,
        source: impl Into<ModelSource<'a>>,
        options: &SessionOptions,
    ) -> Result<Self> {
        let source = source.into();
        let env = api.environment()?;
        let opts = options.build(api)?;
        append_providers(api, opts.as_ptr(), &options.providers)?;

        let mut raw = ptr::null_mut();
        match source {
            ModelSource::Path(path) => {
                let path = ort_path(path.as_os_str())?;
                ortsys!(api, CreateSession(env.as_ptr(), path.as_ptr(), opts.as_ptr(), &mut raw))?;
            }
            ModelSource::Bytes(bytes) => {
                ortsys!(
                    api,
                    CreateSessionFromArray(env.as_ptr(), bytes.as_ptr().cast(), bytes.len(), opts.as_ptr(), &mut raw)
                )?;
            }
        }
        let handle = Handle::new(api, raw);

        let inputs = signatures(api, handle.as_ptr(), Side::Input)?;
        let outputs = signatures(api, handle.as_ptr(), Side::Output)?;
        let origin = match source {
            ModelSource::Path(_) => "path",
            ModelSource::Bytes(_) => "bytes",
        };
        debug!(
            source = origin,
            inputs = inputs.len(),
            outputs = outputs.len(),
            "ort: session opened"
        );

        Ok(Self {
            handle: Some(handle),
            env,
            api,
            inputs,
            outputs,
            profiling: options.profiling(),
        })
    }

    pub fn inputs(&self) -> &[IoSignature] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[IoSignature] {
        &self.outputs
    }

    /// Runs the model and decodes every requested output.
    ///
    /// `output_names` defaults to all declared outputs in declared order.
    /// Host inputs are encoded with the element type the model declares.
    pub fn run<'a, K, V>(
        &self,
        output_names: Option<&[&str]>,
        feed: impl IntoIterator<Item = (K, V)>,
        options: &RunOptions,
    ) -> Result<Vec<HostValue>>
    where
        K: AsRef<str>,
        V: Into<Input<'a>>,
    {
        self.run_values(output_names, feed, options)?
            .iter()
            .map(|value| codec::decode(value, options.output))
            .collect()
    }

    /// Runs the model and returns the native outputs, e.g. to feed another
    /// run without copying.
    pub fn run_values<'a, K, V>(
        &self,
        output_names: Option<&[&str]>,
        feed: impl IntoIterator<Item = (K, V)>,
        options: &RunOptions,
    ) -> Result<Vec<NativeValue>>
    where
        K: AsRef<str>,
        V: Into<Input<'a>>,
    {
        let session = self.handle()?;
        let feed: Vec<(K, Input<'a>)> = feed.into_iter().map(|(k, v)| (k, v.into())).collect();

        // Resolve every name before encoding anything.
        let mut declared = Vec::with_capacity(feed.len());
        for (name, _) in &feed {
            let name = name.as_ref();
            let signature = self
                .inputs
                .iter()
                .find(|s| s.name == name)
                .ok_or_else(|| OrtError::UnknownInput(name.to_string()))?;
            declared.push(signature);
        }

        let mut input_names: Vec<CString> = Vec::with_capacity(feed.len());
        let mut encoded: Vec<NativeValue> = Vec::new();
        let mut input_values: Vec<*const OrtValue> = Vec::with_capacity(feed.len());
        for ((name, input), signature) in feed.iter().zip(declared) {
            input_names.push(cstring(name.as_ref())?);
            match input {
                Input::Value(value) => input_values.push(value.as_ptr()),
                Input::Host(host) => {
                    let element_type = match &signature.descriptor {
                        TypeDescriptor::Tensor { element_type, .. } => *element_type,
                        other => return Err(OrtError::unsupported("input", other)),
                    };
                    let value = codec::encode(self.api, host, element_type)?;
                    input_values.push(value.as_ptr());
                    encoded.push(value);
                }
            }
        }

        let output_names: Vec<&str> = match output_names {
            Some(names) => names.to_vec(),
            None => self.outputs.iter().map(|o| o.name.as_str()).collect(),
        };
        let output_cnames = output_names
            .iter()
            .map(|name| cstring(name))
            .collect::<Result<Vec<_>>>()?;

        let input_name_ptrs: Vec<*const c_char> = input_names.iter().map(|s| s.as_ptr()).collect();
        let output_name_ptrs: Vec<*const c_char> = output_cnames.iter().map(|s| s.as_ptr()).collect();
        let mut outputs: Vec<*mut OrtValue> = vec![ptr::null_mut(); output_name_ptrs.len()];

        let run_options = options.build(self.api)?;
        trace!(inputs = input_values.len(), outputs = outputs.len(), "ort: run");
        let result = ortsys!(
            self.api,
            Run(
                session.as_ptr(),
                run_options.as_ptr(),
                input_name_ptrs.as_ptr(),
                input_values.as_ptr(),
                input_values.len(),
                output_name_ptrs.as_ptr(),
                output_name_ptrs.len(),
                outputs.as_mut_ptr(),
            )
        );
        collect_outputs(self.api, &output_names, outputs, result)
    }

    /// Reads the model's metadata.
    pub fn model_metadata(&self) -> Result<ModelMetadata> {
        let session = self.handle()?;
        let api = self.api;
        let allocator = api.allocator()?;

        let mut raw = ptr::null_mut();
        ortsys!(api, SessionGetModelMetadata(session.as_ptr(), &mut raw))?;
        let metadata = Handle::new(api, raw);
        let m = metadata.as_ptr();

        macro_rules! string_field {
            ($entry:ident) => {{
                let mut value = ptr::null_mut();
                ortsys!(api, $entry(m, allocator.as_ptr(), &mut value))?;
                take_string(api, allocator, value)
            }};
        }

        let mut keys: *mut *mut c_char = ptr::null_mut();
        let mut num_keys: i64 = 0;
        ortsys!(
            api,
            ModelMetadataGetCustomMetadataMapKeys(m, allocator.as_ptr(), &mut keys, &mut num_keys)
        )?;
        let key_names: Vec<String> = {
            let _array = Allocated::new(api, allocator, keys.cast());
            (0..num_keys.max(0) as usize)
                .map(|i| take_string(api, allocator, unsafe { *keys.add(i) }))
                .collect()
        };
        let mut custom_metadata_map = BTreeMap::new();
        for key in key_names {
            let ckey = cstring(&key)?;
            let mut value = ptr::null_mut();
            ortsys!(
                api,
                ModelMetadataLookupCustomMetadataMap(m, allocator.as_ptr(), ckey.as_ptr(), &mut value)
            )?;
            custom_metadata_map.insert(key, take_string(api, allocator, value));
        }

        let mut version = 0i64;
        ortsys!(api, ModelMetadataGetVersion(m, &mut version))?;

        Ok(ModelMetadata {
            producer_name: string_field!(ModelMetadataGetProducerName),
            graph_name: string_field!(ModelMetadataGetGraphName),
            graph_description: string_field!(ModelMetadataGetGraphDescription),
            domain: string_field!(ModelMetadataGetDomain),
            description: string_field!(ModelMetadataGetDescription),
            version,
            custom_metadata_map,
        })
    }

    /// Stops profiling and returns the profile file path. Only valid when
    /// the session was opened with profiling enabled.
    pub fn end_profiling(&self) -> Result<String> {
        let session = self.handle()?;
        if !self.profiling {
            return Err(OrtError::Argument("profiling is not enabled".to_string()));
        }
        let allocator = self.api.allocator()?;
        let mut out = ptr::null_mut();
        ortsys!(self.api, SessionEndProfiling(session.as_ptr(), allocator.as_ptr(), &mut out))?;
        Ok(take_string(self.api, allocator, out))
    }

    /// Execution providers compiled into the engine.
    pub fn providers(&self) -> Result<Vec<String>> {
        self.api.available_providers()
    }

    /// Releases the native session. Closing twice is fine; any other use
    /// afterwards fails with [`OrtError::UseAfterClose`].
    pub fn close(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.release();
            debug!("ort: session closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_none()
    }

    /// The environment this session was created in.
    pub fn environment(&self) -> &Arc<Environment> {
        &self.env
    }

    fn handle(&self) -> Result<&Handle<OrtSession>> {
        self.handle.as_ref().ok_or(OrtError::UseAfterClose)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
enum Side {
    Input,
    Output,
}

fn signatures(api: &'static Api, session: *mut OrtSession, side: Side) -> Result<Vec<IoSignature>> {
    let allocator = api.allocator()?;
    let mut count = 0usize;
    match side {
        Side::Input => ortsys!(api, SessionGetInputCount(session, &mut count))?,
        Side::Output => ortsys!(api, SessionGetOutputCount(session, &mut count))?,
    }

    (0..count)
        .map(|i| {
            let mut name = ptr::null_mut();
            match side {
                Side::Input => ortsys!(api, SessionGetInputName(session, i, allocator.as_ptr(), &mut name))?,
                Side::Output => ortsys!(api, SessionGetOutputName(session, i, allocator.as_ptr(), &mut name))?,
            }
            let name = take_string(api, allocator, name);

            let mut info = ptr::null_mut();
            match side {
                Side::Input => ortsys!(api, SessionGetInputTypeInfo(session, i, &mut info))?,
                Side::Output => ortsys!(api, SessionGetOutputTypeInfo(session, i, &mut info))?,
            }
            let info = Handle::new(api, info);
            let descriptor = types::decode(api, info.as_ptr())?;
            Ok(IoSignature { name, descriptor })
        })
        .collect()
}

/// Appends requested providers in order. Providers the engine lacks are
/// skipped with a warning; the CPU provider ends the list.
fn append_providers(api: &'static Api, options: *mut OrtSessionOptions, requested: &[String]) -> Result<()> {
    if requested.is_empty() {
        return Ok(());
    }
    let available = api.available_providers()?;

    for provider in requested {
        if !available.iter().any(|p| p == provider) {
            warn!("provider not available: {provider}");
            continue;
        }
        match provider.as_str() {
            CPU_PROVIDER => break,
            CUDA_PROVIDER => {
                let mut cuda = ptr::null_mut();
                ortsys!(api, CreateCUDAProviderOptions(&mut cuda))?;
                let cuda = Handle::new(api, cuda);
                ortsys!(api, SessionOptionsAppendExecutionProvider_CUDA_V2(options, cuda.as_ptr()))?;
            }
            COREML_PROVIDER => {
                let append = api.append_coreml().ok_or_else(|| {
                    OrtError::Argument(format!("provider not available: {COREML_PROVIDER}"))
                })?;
                status::check(api, unsafe { append(options, 0) })?;
            }
            other => return Err(OrtError::Argument(format!("provider not supported: {other}"))),
        }
        debug!(provider = %provider, "ort: execution provider appended");
    }
    Ok(())
}

/// Takes ownership of every slot `Run` filled, then resolves the status.
///
/// On failure, partially filled slots are released. On success, every slot
/// must hold a value so outputs stay aligned with `names`.
fn collect_outputs(
    api: &'static Api,
    names: &[&str],
    outputs: Vec<*mut OrtValue>,
    result: Result<()>,
) -> Result<Vec<NativeValue>> {
    let outputs: Vec<Option<NativeValue>> = outputs
        .into_iter()
        .map(|ptr| (!ptr.is_null()).then(|| NativeValue::from_raw(api, ptr)))
        .collect();

    match result {
        Ok(()) => outputs
            .into_iter()
            .zip(names)
            .map(|(value, name)| {
                value.ok_or_else(|| OrtError::Engine {
                    code: ErrorCode::Fail,
                    message: format!("ort: no value returned for output {name}"),
                })
            })
            .collect(),
        Err(OrtError::Engine { message, .. }) if message.starts_with("Invalid Output Name") => {
            let name = message
                .split_once(':')
                .map(|(_, name)| name.trim().to_string())
                .unwrap_or_default();
            Err(OrtError::InvalidOutputName { name, message })
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock;
    use crate::options::OutputKind;
    use crate::types::{Dim, ElementType};

    fn sigmoid_input() -> HostValue {
        HostValue::from(
            (0..3)
                .map(|i| {
                    (0..4)
                        .map(|j| (0..5).map(|k| (i * 20 + j * 5 + k) as f32 / 60.0 - 0.5).collect::<Vec<_>>())
                        .collect::<Vec<_>>()
                })
                .collect::<Vec<_>>(),
        )
    }

    #[test]
    fn open_reads_signature() {
        let engine = mock::lock();
        let session = Session::open_with_api(engine.api(), "models/sigmoid.onnx", &SessionOptions::default()).unwrap();

        assert_eq!(session.inputs().len(), 1);
        assert_eq!(session.inputs()[0].name, "x");
        assert_eq!(
            session.inputs()[0].descriptor,
            TypeDescriptor::Tensor {
                element_type: ElementType::Float,
                shape: vec![Dim::Fixed(3), Dim::Fixed(4), Dim::Fixed(5)],
            }
        );
        assert_eq!(session.outputs()[0].name, "y");
        drop(session);
        assert!(engine.leaks().is_empty(), "{:?}", engine.leaks());
    }

    #[test]
    fn open_from_bytes() {
        let engine = mock::lock();
        let session = Session::open_with_api(engine.api(), b"lightgbm".as_slice(), &SessionOptions::default()).unwrap();
        assert_eq!(session.outputs()[1].descriptor.to_string(), "seq(map(int64,tensor(float)))");
        assert!(engine.calls().contains(&"CreateSessionFromArray".to_string()));
    }

    #[test]
    fn missing_model_is_engine_error() {
        let engine = mock::lock();
        let err = Session::open_with_api(engine.api(), "missing.onnx", &SessionOptions::default())
            .err()
            .unwrap();
        assert!(matches!(err, OrtError::Engine { .. }), "{err:?}");
        assert!(engine.leaks().is_empty(), "{:?}", engine.leaks());
    }

    #[test]
    fn run_sigmoid_3x4x5() {
        let engine = mock::lock();
        let session = Session::open_with_api(engine.api(), "sigmoid.onnx", &SessionOptions::default()).unwrap();
        let out = session.run(None, [("x", sigmoid_input())], &RunOptions::default()).unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].nested_shape(), vec![3, 4, 5]);
        let first = &out[0].as_array().unwrap()[0].as_array().unwrap()[0].as_array().unwrap()[0];
        let expected = 1.0 / (1.0 + (0.5f32).exp());
        match first {
            HostValue::Float(v) => assert!((v - expected).abs() < 1e-6),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn run_buffer_output() {
        let engine = mock::lock();
        let session = Session::open_with_api(engine.api(), "sigmoid.onnx", &SessionOptions::default()).unwrap();
        let options = RunOptions {
            output: OutputKind::Buffer,
            ..Default::default()
        };
        let out = session.run(None, [("x", sigmoid_input())], &options).unwrap();
        let buffer = out[0].as_buffer().unwrap();
        assert_eq!(buffer.shape(), &[3, 4, 5]);
        assert_eq!(buffer.element_type(), ElementType::Float);
    }

    #[test]
    fn unknown_input_skips_run() {
        let engine = mock::lock();
        let session = Session::open_with_api(engine.api(), "sigmoid.onnx", &SessionOptions::default()).unwrap();
        let err = session
            .run(None, [("not_a_real_input", HostValue::from(vec![1i64]))], &RunOptions::default())
            .unwrap_err();
        assert!(matches!(&err, OrtError::UnknownInput(name) if name == "not_a_real_input"), "{err:?}");
        assert_eq!(engine.stats().runs, 0);
    }

    #[test]
    fn invalid_output_name() {
        let engine = mock::lock();
        let session = Session::open_with_api(engine.api(), "sigmoid.onnx", &SessionOptions::default()).unwrap();
        let err = session
            .run(Some(&["bad"]), [("x", sigmoid_input())], &RunOptions::default())
            .unwrap_err();
        match err {
            OrtError::InvalidOutputName { name, message } => {
                assert_eq!(name, "bad");
                assert_eq!(message, "Invalid Output Name:bad");
            }
            other => panic!("unexpected {other:?}"),
        }
        drop(session);
        assert!(engine.leaks().is_empty(), "{:?}", engine.leaks());
    }

    #[test]
    fn engine_rejects_wrong_shape() {
        let engine = mock::lock();
        let session = Session::open_with_api(engine.api(), "sigmoid.onnx", &SessionOptions::default()).unwrap();
        let err = session
            .run(None, [("x", HostValue::from(vec![vec![1.0f32]]))], &RunOptions::default())
            .unwrap_err();
        assert!(err.to_string().starts_with("Invalid rank for input: x"), "{err}");
    }

    #[test]
    fn null_output_slot_on_success_is_an_error() {
        let engine = mock::lock();
        let api = engine.api();
        let filled = mock::sequence_of_maps(&[(vec![0], vec![1.0])]);
        let err = collect_outputs(api, &["label", "probabilities"], vec![ptr::null_mut(), filled], Ok(()))
            .unwrap_err();
        assert!(err.to_string().contains("label"), "{err}");
        assert!(engine.leaks().is_empty(), "{:?}", engine.leaks());
        assert_eq!(engine.stats().invalid_releases, 0);
    }

    #[test]
    fn failed_run_releases_filled_slots() {
        let engine = mock::lock();
        let api = engine.api();
        let filled = mock::sequence_of_maps(&[(vec![0], vec![1.0])]);
        let failure = Err(OrtError::Engine {
            code: ErrorCode::InvalidArgument,
            message: "Invalid Output Name:bad".to_string(),
        });
        let err = collect_outputs(api, &["label", "bad"], vec![filled, ptr::null_mut()], failure).unwrap_err();
        assert!(matches!(&err, OrtError::InvalidOutputName { name, .. } if name == "bad"), "{err:?}");
        assert!(engine.leaks().is_empty(), "{:?}", engine.leaks());
    }

    #[test]
    fn run_values_chain_into_next_run() {
        let engine = mock::lock();
        let session = Session::open_with_api(engine.api(), "sigmoid.onnx", &SessionOptions::default()).unwrap();
        let first = session
            .run_values(None, [("x", sigmoid_input())], &RunOptions::default())
            .unwrap();
        let second = session
            .run(None, [("x", &first[0])], &RunOptions::default())
            .unwrap();
        assert_eq!(second[0].nested_shape(), vec![3, 4, 5]);
        assert_eq!(engine.stats().runs, 2);
    }

    #[test]
    fn terminate_flag_reaches_engine() {
        let engine = mock::lock();
        let session = Session::open_with_api(engine.api(), "sigmoid.onnx", &SessionOptions::default()).unwrap();
        let options = RunOptions {
            terminate: true,
            ..Default::default()
        };
        let err = session.run(None, [("x", sigmoid_input())], &options).unwrap_err();
        assert!(err.to_string().contains("terminate"), "{err}");
    }

    #[test]
    fn model_metadata() {
        let engine = mock::lock();
        let session = Session::open_with_api(engine.api(), "sigmoid.onnx", &SessionOptions::default()).unwrap();
        let metadata = session.model_metadata().unwrap();
        assert_eq!(metadata.producer_name, "backend-test");
        assert_eq!(metadata.graph_name, "test_sigmoid");
        assert_eq!(metadata.version, i64::MAX);
        assert_eq!(
            metadata.custom_metadata_map,
            BTreeMap::from([
                ("hello".to_string(), "world".to_string()),
                ("test".to_string(), "value".to_string()),
            ])
        );
        assert_eq!(engine.stats().invalid_releases, 0);
        drop(session);
        assert!(engine.leaks().is_empty(), "{:?}", engine.leaks());
    }

    #[test]
    fn end_profiling_requires_profiling() {
        let engine = mock::lock();
        let session = Session::open_with_api(engine.api(), "sigmoid.onnx", &SessionOptions::default()).unwrap();
        assert!(matches!(session.end_profiling(), Err(OrtError::Argument(_))));

        let options = SessionOptions {
            enable_profiling: Some(true),
            ..Default::default()
        };
        let session = Session::open_with_api(engine.api(), "sigmoid.onnx", &options).unwrap();
        let path = session.end_profiling().unwrap();
        assert!(path.starts_with("onnxruntime_profile_"), "{path}");
    }

    #[test]
    fn close_then_use() {
        let engine = mock::lock();
        let mut session = Session::open_with_api(engine.api(), "sigmoid.onnx", &SessionOptions::default()).unwrap();
        session.close();
        session.close();
        assert!(session.is_closed());
        assert!(matches!(
            session.run(None, [("x", sigmoid_input())], &RunOptions::default()),
            Err(OrtError::UseAfterClose)
        ));
        assert!(matches!(session.model_metadata(), Err(OrtError::UseAfterClose)));
        assert_eq!(engine.stats().invalid_releases, 0);
    }

    #[test]
    fn provider_cuda_is_appended_when_available() {
        let engine = mock::lock();
        engine.set_available_providers(&[CUDA_PROVIDER, CPU_PROVIDER]);
        let options = SessionOptions {
            providers: vec![CUDA_PROVIDER.into(), CPU_PROVIDER.into()],
            ..Default::default()
        };
        let session = Session::open_with_api(engine.api(), "sigmoid.onnx", &options).unwrap();
        assert!(engine.calls().contains(&"SessionOptionsAppendExecutionProvider_CUDA_V2".to_string()));
        drop(session);
        assert!(engine.leaks().is_empty(), "{:?}", engine.leaks());
    }

    #[test]
    fn provider_coreml_without_symbol() {
        let engine = mock::lock();
        engine.set_available_providers(&[COREML_PROVIDER, CPU_PROVIDER]);
        let options = SessionOptions {
            providers: vec![COREML_PROVIDER.into()],
            ..Default::default()
        };
        let err = Session::open_with_api(engine.api(), "sigmoid.onnx", &options).err().unwrap();
        assert!(matches!(err, OrtError::Argument(_)), "{err:?}");
    }

    #[test]
    fn provider_unknown_but_available() {
        let engine = mock::lock();
        engine.set_available_providers(&["TensorrtExecutionProvider", CPU_PROVIDER]);
        let options = SessionOptions {
            providers: vec!["TensorrtExecutionProvider".into()],
            ..Default::default()
        };
        let err = Session::open_with_api(engine.api(), "sigmoid.onnx", &options).err().unwrap();
        assert!(err.to_string().contains("provider not supported"), "{err}");
    }

    #[test]
    fn opaque_output_fails_open() {
        let engine = mock::lock();
        let err = Session::open_with_api(engine.api(), "opaque.onnx", &SessionOptions::default())
            .err()
            .unwrap();
        assert!(matches!(err, OrtError::UnsupportedType { kind: "onnx", .. }), "{err:?}");
        assert!(engine.leaks().is_empty(), "{:?}", engine.leaks());
    }
}
