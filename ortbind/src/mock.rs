//! An in-process engine behind a real function table.
//!
//! Tests and benches bind this table instead of a shared library. Every
//! object it hands out is registered, so leaks and releases of unknown or
//! borrowed handles show up in [`Engine::leaks`] and [`Stats`].
//!
//! Models are picked by name: the file stem of a path, or the bytes of an
//! in-memory model read as text.
//!
//! | name            | inputs                  | outputs                                     |
//! |-----------------|-------------------------|---------------------------------------------|
//! | `sigmoid`       | `x` float[3,4,5]        | `y` float[3,4,5]                            |
//! | `lightgbm`      | `input` float[N,2]      | `label` int64[N], `probabilities` seq(map)  |
//! | `strings`       | `x` string[batch,2]     | `y` string[batch,2]                         |
//! | `zipmap_string` | `x` float[N,2]          | `probabilities` seq(map(string,float))      |
//! | `opaque`        | `x` float[1]            | `y` opaque                                  |

#![allow(non_snake_case, unsafe_op_in_unsafe_fn, clippy::missing_safety_doc)]

use std::collections::HashMap;
use std::ffi::{CStr, CString};
use std::mem;
use std::os::raw::{c_char, c_int, c_void};
use std::path::Path;
use std::ptr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use once_cell::sync::Lazy;

use crate::api::Api;
use crate::ffi::*;

/// Version string reported by the mock base accessor.
pub const VERSION_STRING: &str = "1.16.3";
const VERSION_CSTR: &CStr = c"1.16.3";

static SERIAL: Mutex<()> = Mutex::new(());
static STATE: Lazy<Mutex<State>> = Lazy::new(|| Mutex::new(State::default()));
static TABLE: Lazy<OrtApi> = Lazy::new(build_table);
static BASE: OrtApiBase = OrtApiBase {
    GetApi: get_api,
    GetVersionString: get_version_string,
};
static DEFAULT_ALLOCATOR: u8 = 0;

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Env,
    Status,
    MemoryInfo,
    Session,
    SessionOptions,
    RunOptions,
    Value,
    TypeInfo,
    TensorInfo,
    Metadata,
    CudaOptions,
    Str,
    StrArray(usize),
    ProviderList(usize),
}

impl Kind {
    fn name(self) -> &'static str {
        match self {
            Kind::Env => "env",
            Kind::Status => "status",
            Kind::MemoryInfo => "memory_info",
            Kind::Session => "session",
            Kind::SessionOptions => "session_options",
            Kind::RunOptions => "run_options",
            Kind::Value => "value",
            Kind::TypeInfo => "type_info",
            Kind::TensorInfo => "tensor_info",
            Kind::Metadata => "metadata",
            Kind::CudaOptions => "cuda_options",
            Kind::Str => "string",
            Kind::StrArray(_) => "string_array",
            Kind::ProviderList(_) => "provider_list",
        }
    }
}

/// Counters kept by the mock engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub env_created: usize,
    pub env_released: usize,
    pub telemetry_disabled: usize,
    pub runs: usize,
    /// Releases of pointers the engine never handed out, or handed out as
    /// another kind (borrowed views included).
    pub invalid_releases: usize,
}

struct State {
    live: HashMap<usize, Kind>,
    calls: Vec<String>,
    providers: Vec<String>,
    stats: Stats,
}

impl Default for State {
    fn default() -> Self {
        Self {
            live: HashMap::new(),
            calls: Vec::new(),
            providers: vec!["CPUExecutionProvider".to_string()],
            stats: Stats::default(),
        }
    }
}

fn state() -> MutexGuard<'static, State> {
    STATE.lock().unwrap_or_else(PoisonError::into_inner)
}

fn record(call: impl Into<String>) {
    state().calls.push(call.into());
}

fn track<T>(kind: Kind, value: T) -> *mut T {
    let ptr = Box::into_raw(Box::new(value));
    state().live.insert(ptr as usize, kind);
    ptr
}

/// Frees a registered object. Returns false for unknown pointers.
unsafe fn untrack<T>(ptr: *mut T, kind: Kind) -> bool {
    if ptr.is_null() {
        return false;
    }
    let mut st = state();
    if st.live.get(&(ptr as usize)) != Some(&kind) {
        st.stats.invalid_releases += 1;
        return false;
    }
    st.live.remove(&(ptr as usize));
    drop(st);
    drop(Box::from_raw(ptr));
    true
}

fn fail(code: OrtErrorCode, message: impl Into<String>) -> OrtStatusPtr {
    let message = CString::new(message.into()).unwrap_or_default();
    track(Kind::Status, MockStatus { code, message }).cast()
}

// ---------------------------------------------------------------------------
// Engine guard
// ---------------------------------------------------------------------------

/// Exclusive access to a freshly reset mock engine.
pub struct Engine {
    api: &'static Api,
    _serial: MutexGuard<'static, ()>,
}

/// Resets the engine and binds a fresh [`Api`] to it. Tests holding the
/// guard run one at a time.
pub fn lock() -> Engine {
    let serial = SERIAL.lock().unwrap_or_else(PoisonError::into_inner);
    *state() = State::default();
    // SAFETY: the mock table implements every entry it sets.
    let api = unsafe { Api::from_table(&TABLE, ORT_API_VERSION) };
    Engine {
        api,
        _serial: serial,
    }
}

impl Engine {
    pub fn api(&self) -> &'static Api {
        self.api
    }

    pub fn stats(&self) -> Stats {
        state().stats
    }

    /// Number of live engine objects of any kind.
    pub fn live(&self) -> usize {
        state().live.len()
    }

    /// Live objects other than the environment and the memory descriptor,
    /// which are process-lifetime.
    pub fn leaks(&self) -> Vec<&'static str> {
        let mut leaks: Vec<&'static str> = state()
            .live
            .values()
            .filter(|kind| !matches!(kind, Kind::Env | Kind::MemoryInfo))
            .map(|kind| kind.name())
            .collect();
        leaks.sort_unstable();
        leaks
    }

    /// Option setters and session calls seen so far, in order.
    pub fn calls(&self) -> Vec<String> {
        state().calls.clone()
    }

    pub fn set_available_providers(&self, providers: &[&str]) {
        state().providers = providers.iter().map(|p| p.to_string()).collect();
    }
}

/// Base accessor as exported by the shared library.
pub fn api_base() -> &'static OrtApiBase {
    &BASE
}

/// A failed status owned by the caller.
pub fn status(code: OrtErrorCode, message: &str) -> OrtStatusPtr {
    fail(code, message)
}

/// A string allocated through the default allocator.
pub fn alloc_string(s: &str) -> *mut c_char {
    let ptr = CString::new(s).unwrap_or_default().into_raw();
    state().live.insert(ptr as usize, Kind::Str);
    ptr
}

// ---------------------------------------------------------------------------
// Type descriptions
// ---------------------------------------------------------------------------

/// Shape of a type-info tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Desc {
    Tensor {
        elem: ONNXTensorElementDataType,
        dims: Vec<i64>,
        names: Vec<String>,
    },
    Seq(Box<Desc>),
    Map {
        key: ONNXTensorElementDataType,
        value: Box<Desc>,
    },
    Opaque,
}

impl Desc {
    /// A tensor type. Missing symbolic names are empty.
    pub fn tensor(elem: ONNXTensorElementDataType, dims: &[i64], names: &[&str]) -> Self {
        let mut names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        names.resize(dims.len(), String::new());
        Desc::Tensor {
            elem,
            dims: dims.to_vec(),
            names,
        }
    }
}

/// An owned type-info handle, as returned by the session accessors.
pub fn type_info(desc: Desc) -> *mut OrtTypeInfo {
    track(Kind::TypeInfo, MockTypeInfo::new(desc)).cast()
}

pub fn release_type_info(info: *mut OrtTypeInfo) {
    unsafe { release_type_info_entry(info) }
}

struct MockStatus {
    code: OrtErrorCode,
    message: CString,
}

struct MockEnv {
    _logid: String,
}

struct MockMemoryInfo {
    _allocator_type: OrtAllocatorType,
}

struct MockCudaOptions {
    _device_id: i32,
}

struct MockTensorInfo {
    elem: ONNXTensorElementDataType,
    dims: Vec<i64>,
    names: Vec<CString>,
}

impl MockTensorInfo {
    fn new(elem: ONNXTensorElementDataType, dims: Vec<i64>, names: &[String]) -> Self {
        let mut names: Vec<CString> = names
            .iter()
            .map(|n| CString::new(n.as_str()).unwrap_or_default())
            .collect();
        names.resize(dims.len(), CString::default());
        Self { elem, dims, names }
    }
}

struct MockSequenceInfo {
    element: Desc,
}

struct MockMapInfo {
    key: ONNXTensorElementDataType,
    value: Desc,
}

/// Casts hand out borrowed pointers into the sub-infos.
struct MockTypeInfo {
    onnx_type: ONNXType,
    tensor: Option<MockTensorInfo>,
    sequence: Option<MockSequenceInfo>,
    map: Option<MockMapInfo>,
}

impl MockTypeInfo {
    fn new(desc: Desc) -> Self {
        let mut info = Self {
            onnx_type: ONNX_TYPE_OPAQUE,
            tensor: None,
            sequence: None,
            map: None,
        };
        match desc {
            Desc::Tensor { elem, dims, names } => {
                info.onnx_type = ONNX_TYPE_TENSOR;
                info.tensor = Some(MockTensorInfo::new(elem, dims, &names));
            }
            Desc::Seq(element) => {
                info.onnx_type = ONNX_TYPE_SEQUENCE;
                info.sequence = Some(MockSequenceInfo { element: *element });
            }
            Desc::Map { key, value } => {
                info.onnx_type = ONNX_TYPE_MAP;
                info.map = Some(MockMapInfo { key, value: *value });
            }
            Desc::Opaque => {}
        }
        info
    }
}

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

enum Data {
    /// Engine-allocated, word-aligned; `len` is in bytes.
    Owned { words: Vec<u64>, len: usize },
    /// Caller memory from `CreateTensorWithDataAsOrtValue`.
    External { ptr: *mut u8, len: usize },
    Strings(Vec<Vec<u8>>),
}

struct MockTensor {
    elem: ONNXTensorElementDataType,
    dims: Vec<i64>,
    data: Data,
}

impl MockTensor {
    fn from_slice<T: Copy>(elem: ONNXTensorElementDataType, dims: Vec<i64>, data: &[T]) -> Self {
        let len = mem::size_of_val(data);
        let mut words = vec![0u64; len.div_ceil(8)];
        unsafe { ptr::copy_nonoverlapping(data.as_ptr().cast::<u8>(), words.as_mut_ptr().cast::<u8>(), len) };
        Self {
            elem,
            dims,
            data: Data::Owned { words, len },
        }
    }

    fn strings(dims: Vec<i64>, strings: Vec<Vec<u8>>) -> Self {
        Self {
            elem: ONNX_TENSOR_ELEMENT_DATA_TYPE_STRING,
            dims,
            data: Data::Strings(strings),
        }
    }

    fn bytes(&self) -> &[u8] {
        match &self.data {
            Data::Owned { words, len } => unsafe { std::slice::from_raw_parts(words.as_ptr().cast(), *len) },
            Data::External { ptr, len } if *len > 0 => unsafe { std::slice::from_raw_parts(*ptr, *len) },
            _ => &[],
        }
    }

    fn values<T: Copy>(&self) -> Vec<T> {
        let bytes = self.bytes();
        let size = mem::size_of::<T>();
        (0..bytes.len() / size)
            .map(|i| unsafe { ptr::read_unaligned(bytes.as_ptr().add(i * size).cast::<T>()) })
            .collect()
    }

    fn duplicate(&self) -> Self {
        match &self.data {
            Data::Strings(strings) => Self::strings(self.dims.clone(), strings.clone()),
            _ => Self::from_slice(self.elem, self.dims.clone(), self.bytes()),
        }
    }

    fn desc(&self) -> Desc {
        Desc::Tensor {
            elem: self.elem,
            dims: self.dims.clone(),
            names: Vec::new(),
        }
    }
}

enum MockValue {
    Tensor(MockTensor),
    Sequence(Vec<MockValue>),
    Map { keys: MockTensor, values: MockTensor },
}

impl MockValue {
    fn duplicate(&self) -> Self {
        match self {
            MockValue::Tensor(t) => MockValue::Tensor(t.duplicate()),
            MockValue::Sequence(items) => MockValue::Sequence(items.iter().map(MockValue::duplicate).collect()),
            MockValue::Map { keys, values } => MockValue::Map {
                keys: keys.duplicate(),
                values: values.duplicate(),
            },
        }
    }

    fn desc(&self) -> Desc {
        match self {
            MockValue::Tensor(t) => t.desc(),
            MockValue::Sequence(items) => Desc::Seq(Box::new(
                items
                    .first()
                    .map(MockValue::desc)
                    .unwrap_or_else(|| Desc::tensor(ONNX_TENSOR_ELEMENT_DATA_TYPE_FLOAT, &[], &[])),
            )),
            MockValue::Map { keys, values } => Desc::Map {
                key: keys.elem,
                value: Box::new(Desc::tensor(values.elem, &[], &[])),
            },
        }
    }
}

fn new_value(value: MockValue) -> *mut OrtValue {
    track(Kind::Value, value).cast()
}

/// Raw bytes of a numeric tensor value.
pub fn tensor_bytes(value: *mut OrtValue) -> Vec<u8> {
    match unsafe { &*value.cast::<MockValue>() } {
        MockValue::Tensor(t) => t.bytes().to_vec(),
        _ => Vec::new(),
    }
}

fn probability_map(keys: &[i64], probabilities: &[f32]) -> MockValue {
    MockValue::Map {
        keys: MockTensor::from_slice(ONNX_TENSOR_ELEMENT_DATA_TYPE_INT64, vec![keys.len() as i64], keys),
        values: MockTensor::from_slice(
            ONNX_TENSOR_ELEMENT_DATA_TYPE_FLOAT,
            vec![probabilities.len() as i64],
            probabilities,
        ),
    }
}

/// An owned `seq(map(int64, float))` value, one map per row.
pub fn sequence_of_maps(rows: &[(Vec<i64>, Vec<f32>)]) -> *mut OrtValue {
    new_value(MockValue::Sequence(
        rows.iter().map(|(keys, probs)| probability_map(keys, probs)).collect(),
    ))
}

/// An owned `map(string, float)` value.
pub fn string_keyed_map(keys: &[&str], values: &[f32]) -> *mut OrtValue {
    new_value(string_map(keys, values))
}

fn string_map(keys: &[&str], values: &[f32]) -> MockValue {
    MockValue::Map {
        keys: MockTensor::strings(
            vec![keys.len() as i64],
            keys.iter().map(|k| k.as_bytes().to_vec()).collect(),
        ),
        values: MockTensor::from_slice(ONNX_TENSOR_ELEMENT_DATA_TYPE_FLOAT, vec![values.len() as i64], values),
    }
}

fn element_size(elem: ONNXTensorElementDataType) -> usize {
    match elem {
        ONNX_TENSOR_ELEMENT_DATA_TYPE_UINT8
        | ONNX_TENSOR_ELEMENT_DATA_TYPE_INT8
        | ONNX_TENSOR_ELEMENT_DATA_TYPE_BOOL => 1,
        ONNX_TENSOR_ELEMENT_DATA_TYPE_UINT16
        | ONNX_TENSOR_ELEMENT_DATA_TYPE_INT16
        | ONNX_TENSOR_ELEMENT_DATA_TYPE_FLOAT16
        | ONNX_TENSOR_ELEMENT_DATA_TYPE_BFLOAT16 => 2,
        ONNX_TENSOR_ELEMENT_DATA_TYPE_FLOAT
        | ONNX_TENSOR_ELEMENT_DATA_TYPE_INT32
        | ONNX_TENSOR_ELEMENT_DATA_TYPE_UINT32 => 4,
        ONNX_TENSOR_ELEMENT_DATA_TYPE_COMPLEX128 => 16,
        _ => 8,
    }
}

fn element_name(elem: ONNXTensorElementDataType) -> &'static str {
    match elem {
        ONNX_TENSOR_ELEMENT_DATA_TYPE_FLOAT => "float",
        ONNX_TENSOR_ELEMENT_DATA_TYPE_UINT8 => "uint8",
        ONNX_TENSOR_ELEMENT_DATA_TYPE_INT8 => "int8",
        ONNX_TENSOR_ELEMENT_DATA_TYPE_UINT16 => "uint16",
        ONNX_TENSOR_ELEMENT_DATA_TYPE_INT16 => "int16",
        ONNX_TENSOR_ELEMENT_DATA_TYPE_INT32 => "int32",
        ONNX_TENSOR_ELEMENT_DATA_TYPE_INT64 => "int64",
        ONNX_TENSOR_ELEMENT_DATA_TYPE_STRING => "string",
        ONNX_TENSOR_ELEMENT_DATA_TYPE_BOOL => "bool",
        ONNX_TENSOR_ELEMENT_DATA_TYPE_DOUBLE => "double",
        ONNX_TENSOR_ELEMENT_DATA_TYPE_UINT32 => "uint32",
        ONNX_TENSOR_ELEMENT_DATA_TYPE_UINT64 => "uint64",
        _ => "undefined",
    }
}

// ---------------------------------------------------------------------------
// Models
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Model {
    Sigmoid,
    LightGbm,
    Strings,
    ZipMapString,
    Opaque,
}

impl Model {
    fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "sigmoid" | "model" => Some(Model::Sigmoid),
            "lightgbm" => Some(Model::LightGbm),
            "strings" => Some(Model::Strings),
            "zipmap_string" => Some(Model::ZipMapString),
            "opaque" => Some(Model::Opaque),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Model::Sigmoid => "sigmoid",
            Model::LightGbm => "lightgbm",
            Model::Strings => "strings",
            Model::ZipMapString => "zipmap_string",
            Model::Opaque => "opaque",
        }
    }

    fn inputs(self) -> Vec<(&'static str, Desc)> {
        match self {
            Model::Sigmoid => vec![("x", Desc::tensor(ONNX_TENSOR_ELEMENT_DATA_TYPE_FLOAT, &[3, 4, 5], &[]))],
            Model::LightGbm => vec![("input", Desc::tensor(ONNX_TENSOR_ELEMENT_DATA_TYPE_FLOAT, &[-1, 2], &[]))],
            Model::Strings => vec![(
                "x",
                Desc::tensor(ONNX_TENSOR_ELEMENT_DATA_TYPE_STRING, &[-1, 2], &["batch"]),
            )],
            Model::ZipMapString => vec![("x", Desc::tensor(ONNX_TENSOR_ELEMENT_DATA_TYPE_FLOAT, &[-1, 2], &[]))],
            Model::Opaque => vec![("x", Desc::tensor(ONNX_TENSOR_ELEMENT_DATA_TYPE_FLOAT, &[1], &[]))],
        }
    }

    fn outputs(self) -> Vec<(&'static str, Desc)> {
        let probabilities = |key| {
            Desc::Seq(Box::new(Desc::Map {
                key,
                value: Box::new(Desc::tensor(ONNX_TENSOR_ELEMENT_DATA_TYPE_FLOAT, &[], &[])),
            }))
        };
        match self {
            Model::Sigmoid => vec![("y", Desc::tensor(ONNX_TENSOR_ELEMENT_DATA_TYPE_FLOAT, &[3, 4, 5], &[]))],
            Model::LightGbm => vec![
                ("label", Desc::tensor(ONNX_TENSOR_ELEMENT_DATA_TYPE_INT64, &[-1], &[])),
                ("probabilities", probabilities(ONNX_TENSOR_ELEMENT_DATA_TYPE_INT64)),
            ],
            Model::Strings => vec![(
                "y",
                Desc::tensor(ONNX_TENSOR_ELEMENT_DATA_TYPE_STRING, &[-1, 2], &["batch"]),
            )],
            Model::ZipMapString => vec![("probabilities", probabilities(ONNX_TENSOR_ELEMENT_DATA_TYPE_STRING))],
            Model::Opaque => vec![("y", Desc::Opaque)],
        }
    }

    fn metadata(self) -> MockMetadata {
        match self {
            Model::Sigmoid => MockMetadata {
                producer_name: "backend-test".to_string(),
                graph_name: "test_sigmoid".to_string(),
                graph_description: String::new(),
                domain: String::new(),
                description: String::new(),
                version: i64::MAX,
                custom: vec![
                    ("hello".to_string(), "world".to_string()),
                    ("test".to_string(), "value".to_string()),
                ],
            },
            other => MockMetadata {
                producer_name: "mock".to_string(),
                graph_name: other.name().to_string(),
                graph_description: String::new(),
                domain: "ai.onnx.ml".to_string(),
                description: String::new(),
                version: 1,
                custom: Vec::new(),
            },
        }
    }

    /// Computes one output from validated inputs.
    fn compute(self, output: &str, inputs: &HashMap<String, &MockValue>) -> MockValue {
        let tensor = |name: &str| match inputs.get(name) {
            Some(MockValue::Tensor(t)) => Some(t),
            _ => None,
        };
        match (self, output) {
            (Model::Sigmoid, _) => {
                let x = tensor("x").map(|t| t.values::<f32>()).unwrap_or_default();
                let y: Vec<f32> = x.iter().map(|v| 1.0 / (1.0 + (-v).exp())).collect();
                MockValue::Tensor(MockTensor::from_slice(ONNX_TENSOR_ELEMENT_DATA_TYPE_FLOAT, vec![3, 4, 5], &y))
            }
            (Model::LightGbm, name) => {
                let x = tensor("input").map(|t| t.values::<f32>()).unwrap_or_default();
                let rows: Vec<[f32; 3]> = x.chunks(2).map(|r| softmax([0.0, r[0], r.get(1).copied().unwrap_or(0.0)])).collect();
                if name == "label" {
                    let labels: Vec<i64> = rows.iter().map(|p| argmax(p) as i64).collect();
                    MockValue::Tensor(MockTensor::from_slice(
                        ONNX_TENSOR_ELEMENT_DATA_TYPE_INT64,
                        vec![labels.len() as i64],
                        &labels,
                    ))
                } else {
                    MockValue::Sequence(rows.iter().map(|p| probability_map(&[0, 1, 2], p)).collect())
                }
            }
            (Model::Strings, _) => match tensor("x") {
                Some(t) => MockValue::Tensor(t.duplicate()),
                None => MockValue::Tensor(MockTensor::strings(vec![0, 2], Vec::new())),
            },
            (Model::ZipMapString, _) => {
                let x = tensor("x").map(|t| t.values::<f32>()).unwrap_or_default();
                MockValue::Sequence(
                    x.chunks(2)
                        .map(|r| {
                            let p = softmax([r[0], r.get(1).copied().unwrap_or(0.0), 0.0]);
                            string_map(&["a", "b"], &p[..2])
                        })
                        .collect(),
                )
            }
            (Model::Opaque, _) => MockValue::Sequence(Vec::new()),
        }
    }
}

fn softmax(scores: [f32; 3]) -> [f32; 3] {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exp = scores.map(|s| (s - max).exp());
    let sum: f32 = exp.iter().sum();
    exp.map(|e| e / sum)
}

fn argmax(p: &[f32; 3]) -> usize {
    (0..3).fold(0, |best, i| if p[i] > p[best] { i } else { best })
}

struct MockSessionOptions {
    profile_prefix: Option<String>,
}

struct MockRunOptions {
    terminate: bool,
}

struct MockSession {
    model: Model,
    profile_prefix: Option<String>,
    profiles: usize,
}

struct MockMetadata {
    producer_name: String,
    graph_name: String,
    graph_description: String,
    domain: String,
    description: String,
    version: i64,
    custom: Vec<(String, String)>,
}

#[cfg(not(windows))]
unsafe fn ort_str(p: *const OrtChar) -> String {
    if p.is_null() {
        return String::new();
    }
    CStr::from_ptr(p).to_string_lossy().into_owned()
}

#[cfg(windows)]
unsafe fn ort_str(p: *const OrtChar) -> String {
    if p.is_null() {
        return String::new();
    }
    let mut len = 0;
    while *p.add(len) != 0 {
        len += 1;
    }
    String::from_utf16_lossy(std::slice::from_raw_parts(p, len))
}

unsafe fn c_str(p: *const c_char) -> String {
    if p.is_null() {
        return String::new();
    }
    CStr::from_ptr(p).to_string_lossy().into_owned()
}

// ---------------------------------------------------------------------------
// Table entries
// ---------------------------------------------------------------------------

unsafe extern "C" fn get_api(version: u32) -> *const OrtApi {
    if version == ORT_API_VERSION {
        &*TABLE as *const OrtApi
    } else {
        ptr::null()
    }
}

unsafe extern "C" fn get_version_string() -> *const c_char {
    VERSION_CSTR.as_ptr()
}

unsafe extern "C" fn create_status(code: OrtErrorCode, msg: *const c_char) -> OrtStatusPtr {
    fail(code, c_str(msg))
}

unsafe extern "C" fn get_error_code(status: *const OrtStatus) -> OrtErrorCode {
    (*status.cast::<MockStatus>()).code
}

unsafe extern "C" fn get_error_message(status: *const OrtStatus) -> *const c_char {
    (*status.cast::<MockStatus>()).message.as_ptr()
}

unsafe extern "C" fn create_env(_level: OrtLoggingLevel, logid: *const c_char, out: *mut *mut OrtEnv) -> OrtStatusPtr {
    // Widens the window for racing first users.
    std::thread::sleep(Duration::from_millis(20));
    state().stats.env_created += 1;
    *out = track(Kind::Env, MockEnv { _logid: c_str(logid) }).cast();
    ptr::null_mut()
}

unsafe extern "C" fn disable_telemetry(_env: *const OrtEnv) -> OrtStatusPtr {
    state().stats.telemetry_disabled += 1;
    ptr::null_mut()
}

unsafe extern "C" fn create_cpu_memory_info(
    allocator_type: OrtAllocatorType,
    _mem_type: OrtMemType,
    out: *mut *mut OrtMemoryInfo,
) -> OrtStatusPtr {
    *out = track(
        Kind::MemoryInfo,
        MockMemoryInfo {
            _allocator_type: allocator_type,
        },
    )
    .cast();
    ptr::null_mut()
}

unsafe extern "C" fn get_allocator(out: *mut *mut OrtAllocator) -> OrtStatusPtr {
    *out = ptr::addr_of!(DEFAULT_ALLOCATOR).cast_mut().cast();
    ptr::null_mut()
}

unsafe extern "C" fn allocator_free(_allocator: *mut OrtAllocator, p: *mut c_void) -> OrtStatusPtr {
    let kind = state().live.get(&(p as usize)).copied();
    match kind {
        Some(Kind::Str) => {
            state().live.remove(&(p as usize));
            drop(CString::from_raw(p.cast()));
        }
        Some(Kind::StrArray(len)) => {
            state().live.remove(&(p as usize));
            drop(Box::from_raw(ptr::slice_from_raw_parts_mut(p.cast::<*mut c_char>(), len)));
        }
        _ => state().stats.invalid_releases += 1,
    }
    ptr::null_mut()
}

unsafe extern "C" fn get_available_providers(out: *mut *mut *mut c_char, len: *mut c_int) -> OrtStatusPtr {
    let providers = state().providers.clone();
    let list: Box<[*mut c_char]> = providers
        .iter()
        .map(|p| CString::new(p.as_str()).unwrap_or_default().into_raw())
        .collect();
    *len = list.len() as c_int;
    let count = list.len();
    let raw = Box::into_raw(list).cast::<*mut c_char>();
    state().live.insert(raw as usize, Kind::ProviderList(count));
    *out = raw;
    ptr::null_mut()
}

unsafe extern "C" fn release_available_providers(list: *mut *mut c_char, len: c_int) -> OrtStatusPtr {
    let len = len.max(0) as usize;
    let known = state().live.remove(&(list as usize));
    if known != Some(Kind::ProviderList(len)) {
        state().stats.invalid_releases += 1;
        return fail(ORT_INVALID_ARGUMENT, "unknown provider list");
    }
    let list = Box::from_raw(ptr::slice_from_raw_parts_mut(list, len));
    for name in list.iter() {
        drop(CString::from_raw(*name));
    }
    ptr::null_mut()
}

// Session options

unsafe extern "C" fn create_session_options(out: *mut *mut OrtSessionOptions) -> OrtStatusPtr {
    *out = track(Kind::SessionOptions, MockSessionOptions { profile_prefix: None }).cast();
    ptr::null_mut()
}

macro_rules! flag_entries {
    ($($entry:ident),* $(,)?) => {
        $(
            unsafe extern "C" fn $entry(_options: *mut OrtSessionOptions) -> OrtStatusPtr {
                record(stringify!($entry));
                ptr::null_mut()
            }
        )*
    };
}

flag_entries!(
    EnableCpuMemArena,
    DisableCpuMemArena,
    EnableMemPattern,
    DisableMemPattern,
);

macro_rules! int_entries {
    ($($entry:ident),* $(,)?) => {
        $(
            unsafe extern "C" fn $entry(_options: *mut OrtSessionOptions, value: c_int) -> OrtStatusPtr {
                record(format!("{}({value})", stringify!($entry)));
                ptr::null_mut()
            }
        )*
    };
}

int_entries!(
    SetSessionExecutionMode,
    SetSessionGraphOptimizationLevel,
    SetIntraOpNumThreads,
    SetInterOpNumThreads,
    SetSessionLogVerbosityLevel,
    SetSessionLogSeverityLevel,
);

unsafe extern "C" fn enable_profiling(options: *mut OrtSessionOptions, prefix: *const OrtChar) -> OrtStatusPtr {
    let prefix = ort_str(prefix);
    record(format!("EnableProfiling({prefix})"));
    (*options.cast::<MockSessionOptions>()).profile_prefix = Some(prefix);
    ptr::null_mut()
}

unsafe extern "C" fn disable_profiling(options: *mut OrtSessionOptions) -> OrtStatusPtr {
    record("DisableProfiling");
    (*options.cast::<MockSessionOptions>()).profile_prefix = None;
    ptr::null_mut()
}

unsafe extern "C" fn set_log_id(_options: *mut OrtSessionOptions, logid: *const c_char) -> OrtStatusPtr {
    record(format!("SetSessionLogId({})", c_str(logid)));
    ptr::null_mut()
}

unsafe extern "C" fn set_optimized_model_path(_options: *mut OrtSessionOptions, path: *const OrtChar) -> OrtStatusPtr {
    record(format!("SetOptimizedModelFilePath({})", ort_str(path)));
    ptr::null_mut()
}

unsafe extern "C" fn add_free_dimension_override(
    _options: *mut OrtSessionOptions,
    denotation: *const c_char,
    value: i64,
) -> OrtStatusPtr {
    record(format!("AddFreeDimensionOverride({}={value})", c_str(denotation)));
    ptr::null_mut()
}

unsafe extern "C" fn add_free_dimension_override_by_name(
    _options: *mut OrtSessionOptions,
    name: *const c_char,
    value: i64,
) -> OrtStatusPtr {
    record(format!("AddFreeDimensionOverrideByName({}={value})", c_str(name)));
    ptr::null_mut()
}

unsafe extern "C" fn add_session_config_entry(
    _options: *mut OrtSessionOptions,
    key: *const c_char,
    value: *const c_char,
) -> OrtStatusPtr {
    record(format!("AddSessionConfigEntry({}={})", c_str(key), c_str(value)));
    ptr::null_mut()
}

unsafe extern "C" fn create_cuda_options(out: *mut *mut OrtCUDAProviderOptionsV2) -> OrtStatusPtr {
    record("CreateCUDAProviderOptions");
    *out = track(Kind::CudaOptions, MockCudaOptions { _device_id: 0 }).cast();
    ptr::null_mut()
}

unsafe extern "C" fn append_cuda(
    _options: *mut OrtSessionOptions,
    _cuda: *const OrtCUDAProviderOptionsV2,
) -> OrtStatusPtr {
    record("SessionOptionsAppendExecutionProvider_CUDA_V2");
    ptr::null_mut()
}

// Run options

unsafe extern "C" fn create_run_options(out: *mut *mut OrtRunOptions) -> OrtStatusPtr {
    *out = track(Kind::RunOptions, MockRunOptions { terminate: false }).cast();
    ptr::null_mut()
}

unsafe extern "C" fn run_log_verbosity(_options: *mut OrtRunOptions, level: c_int) -> OrtStatusPtr {
    record(format!("RunOptionsSetRunLogVerbosityLevel({level})"));
    ptr::null_mut()
}

unsafe extern "C" fn run_log_severity(_options: *mut OrtRunOptions, level: c_int) -> OrtStatusPtr {
    record(format!("RunOptionsSetRunLogSeverityLevel({level})"));
    ptr::null_mut()
}

unsafe extern "C" fn run_tag(_options: *mut OrtRunOptions, tag: *const c_char) -> OrtStatusPtr {
    record(format!("RunOptionsSetRunTag({})", c_str(tag)));
    ptr::null_mut()
}

unsafe extern "C" fn run_set_terminate(options: *mut OrtRunOptions) -> OrtStatusPtr {
    record("RunOptionsSetTerminate");
    (*options.cast::<MockRunOptions>()).terminate = true;
    ptr::null_mut()
}

unsafe extern "C" fn run_unset_terminate(options: *mut OrtRunOptions) -> OrtStatusPtr {
    record("RunOptionsUnsetTerminate");
    (*options.cast::<MockRunOptions>()).terminate = false;
    ptr::null_mut()
}

// Sessions

unsafe fn open_session(
    env: *const OrtEnv,
    model: Model,
    options: *const OrtSessionOptions,
    out: *mut *mut OrtSession,
) -> OrtStatusPtr {
    if env.is_null() {
        return fail(ORT_INVALID_ARGUMENT, "env is null");
    }
    let profile_prefix = options
        .cast::<MockSessionOptions>()
        .as_ref()
        .and_then(|o| o.profile_prefix.clone());
    *out = track(
        Kind::Session,
        MockSession {
            model,
            profile_prefix,
            profiles: 0,
        },
    )
    .cast();
    ptr::null_mut()
}

unsafe extern "C" fn create_session(
    env: *const OrtEnv,
    path: *const OrtChar,
    options: *const OrtSessionOptions,
    out: *mut *mut OrtSession,
) -> OrtStatusPtr {
    record("CreateSession");
    let path = ort_str(path);
    let stem = Path::new(&path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    match Model::from_name(&stem) {
        Some(model) => open_session(env, model, options, out),
        None => fail(
            ORT_NO_SUCHFILE,
            format!("Load model from {path} failed:Load model {path} failed. File doesn't exist"),
        ),
    }
}

unsafe extern "C" fn create_session_from_array(
    env: *const OrtEnv,
    data: *const c_void,
    len: usize,
    options: *const OrtSessionOptions,
    out: *mut *mut OrtSession,
) -> OrtStatusPtr {
    record("CreateSessionFromArray");
    let bytes = if len == 0 {
        &[][..]
    } else {
        std::slice::from_raw_parts(data.cast::<u8>(), len)
    };
    match std::str::from_utf8(bytes).ok().and_then(Model::from_name) {
        Some(model) => open_session(env, model, options, out),
        None => fail(
            ORT_INVALID_PROTOBUF,
            "Load model from memory failed:Protobuf parsing failed.",
        ),
    }
}

unsafe fn session_model(session: *const OrtSession) -> Model {
    (*session.cast::<MockSession>()).model
}

unsafe fn write_count(session: *const OrtSession, out: *mut usize, input: bool) -> OrtStatusPtr {
    let model = session_model(session);
    *out = if input { model.inputs().len() } else { model.outputs().len() };
    ptr::null_mut()
}

unsafe extern "C" fn input_count(session: *const OrtSession, out: *mut usize) -> OrtStatusPtr {
    write_count(session, out, true)
}

unsafe extern "C" fn output_count(session: *const OrtSession, out: *mut usize) -> OrtStatusPtr {
    write_count(session, out, false)
}

unsafe fn signature(session: *const OrtSession, index: usize, input: bool) -> Option<(&'static str, Desc)> {
    let model = session_model(session);
    let mut list = if input { model.inputs() } else { model.outputs() };
    (index < list.len()).then(|| list.swap_remove(index))
}

unsafe fn io_name(session: *const OrtSession, index: usize, out: *mut *mut c_char, input: bool) -> OrtStatusPtr {
    match signature(session, index, input) {
        Some((name, _)) => {
            *out = alloc_string(name);
            ptr::null_mut()
        }
        None => fail(ORT_INVALID_ARGUMENT, format!("index {index} out of range")),
    }
}

unsafe fn io_type_info(session: *const OrtSession, index: usize, out: *mut *mut OrtTypeInfo, input: bool) -> OrtStatusPtr {
    match signature(session, index, input) {
        Some((_, desc)) => {
            *out = type_info(desc);
            ptr::null_mut()
        }
        None => fail(ORT_INVALID_ARGUMENT, format!("index {index} out of range")),
    }
}

unsafe extern "C" fn input_name(
    session: *const OrtSession,
    index: usize,
    _allocator: *mut OrtAllocator,
    out: *mut *mut c_char,
) -> OrtStatusPtr {
    io_name(session, index, out, true)
}

unsafe extern "C" fn output_name(
    session: *const OrtSession,
    index: usize,
    _allocator: *mut OrtAllocator,
    out: *mut *mut c_char,
) -> OrtStatusPtr {
    io_name(session, index, out, false)
}

unsafe extern "C" fn input_type_info(session: *const OrtSession, index: usize, out: *mut *mut OrtTypeInfo) -> OrtStatusPtr {
    io_type_info(session, index, out, true)
}

unsafe extern "C" fn output_type_info(session: *const OrtSession, index: usize, out: *mut *mut OrtTypeInfo) -> OrtStatusPtr {
    io_type_info(session, index, out, false)
}

/// Checks one fed value against its declared tensor type, with the
/// engine's wording.
fn validate_input(name: &str, declared: &Desc, value: &MockValue) -> Result<(), String> {
    let (elem, dims) = match declared {
        Desc::Tensor { elem, dims, .. } => (*elem, dims),
        _ => return Ok(()),
    };
    let tensor = match value {
        MockValue::Tensor(t) => t,
        _ => return Err(format!("Input {name} is not a tensor")),
    };
    if tensor.elem != elem {
        return Err(format!(
            "Unexpected input data type. Actual: (tensor({})) , expected: (tensor({}))",
            element_name(tensor.elem),
            element_name(elem)
        ));
    }
    if tensor.dims.len() != dims.len() {
        return Err(format!(
            "Invalid rank for input: {name} Got: {} Expected: {} Please fix either the inputs/outputs or the model.",
            tensor.dims.len(),
            dims.len()
        ));
    }
    let bad: Vec<String> = dims
        .iter()
        .zip(&tensor.dims)
        .enumerate()
        .filter(|(_, (want, got))| **want >= 0 && want != got)
        .map(|(i, (want, got))| format!(" index: {i} Got: {got} Expected: {want}\n"))
        .collect();
    if !bad.is_empty() {
        return Err(format!(
            "Got invalid dimensions for input: {name} for the following indices\n{} Please fix either the inputs/outputs or the model.",
            bad.concat()
        ));
    }
    Ok(())
}

unsafe extern "C" fn run(
    session: *mut OrtSession,
    run_options: *const OrtRunOptions,
    input_names: *const *const c_char,
    inputs: *const *const OrtValue,
    input_len: usize,
    output_names: *const *const c_char,
    output_names_len: usize,
    outputs: *mut *mut OrtValue,
) -> OrtStatusPtr {
    state().stats.runs += 1;
    let model = session_model(session);

    if let Some(options) = run_options.cast::<MockRunOptions>().as_ref() {
        if options.terminate {
            return fail(ORT_FAIL, "Exiting due to terminate flag being set to true.");
        }
    }

    let declared_inputs = model.inputs();
    let mut fed: HashMap<String, &MockValue> = HashMap::new();
    for i in 0..input_len {
        let name = c_str(*input_names.add(i));
        let value = &*(*inputs.add(i)).cast::<MockValue>();
        let Some((_, declared)) = declared_inputs.iter().find(|(n, _)| *n == name) else {
            return fail(ORT_INVALID_ARGUMENT, format!("Invalid input name: {name}"));
        };
        if let Err(message) = validate_input(&name, declared, value) {
            return fail(ORT_INVALID_ARGUMENT, message);
        }
        fed.insert(name, value);
    }
    for (name, _) in &declared_inputs {
        if !fed.contains_key(*name) {
            return fail(ORT_INVALID_ARGUMENT, format!("Missing Input: {name}"));
        }
    }

    let declared_outputs = model.outputs();
    let mut requested = Vec::with_capacity(output_names_len);
    for i in 0..output_names_len {
        let name = c_str(*output_names.add(i));
        if !declared_outputs.iter().any(|(n, _)| *n == name) {
            return fail(ORT_INVALID_ARGUMENT, format!("Invalid Output Name:{name}"));
        }
        requested.push(name);
    }

    for (i, name) in requested.iter().enumerate() {
        *outputs.add(i) = new_value(model.compute(name, &fed));
    }
    ptr::null_mut()
}

unsafe extern "C" fn end_profiling(
    session: *mut OrtSession,
    _allocator: *mut OrtAllocator,
    out: *mut *mut c_char,
) -> OrtStatusPtr {
    let session = &mut *session.cast::<MockSession>();
    match session.profile_prefix.clone() {
        Some(prefix) => {
            session.profiles += 1;
            *out = alloc_string(&format!("{prefix}_{}.json", session.profiles));
            ptr::null_mut()
        }
        None => fail(ORT_INVALID_ARGUMENT, "Profiler is not enabled"),
    }
}

// Metadata

unsafe extern "C" fn get_model_metadata(session: *const OrtSession, out: *mut *mut OrtModelMetadata) -> OrtStatusPtr {
    *out = track(Kind::Metadata, session_model(session).metadata()).cast();
    ptr::null_mut()
}

macro_rules! metadata_strings {
    ($($entry:ident => $field:ident),* $(,)?) => {
        $(
            unsafe extern "C" fn $entry(
                metadata: *const OrtModelMetadata,
                _allocator: *mut OrtAllocator,
                value: *mut *mut c_char,
            ) -> OrtStatusPtr {
                *value = alloc_string(&(*metadata.cast::<MockMetadata>()).$field);
                ptr::null_mut()
            }
        )*
    };
}

metadata_strings!(
    metadata_producer => producer_name,
    metadata_graph_name => graph_name,
    metadata_graph_description => graph_description,
    metadata_domain => domain,
    metadata_description => description,
);

unsafe extern "C" fn metadata_lookup(
    metadata: *const OrtModelMetadata,
    _allocator: *mut OrtAllocator,
    key: *const c_char,
    value: *mut *mut c_char,
) -> OrtStatusPtr {
    let key = c_str(key);
    *value = match (*metadata.cast::<MockMetadata>()).custom.iter().find(|(k, _)| *k == key) {
        Some((_, v)) => alloc_string(v),
        None => ptr::null_mut(),
    };
    ptr::null_mut()
}

unsafe extern "C" fn metadata_keys(
    metadata: *const OrtModelMetadata,
    _allocator: *mut OrtAllocator,
    keys: *mut *mut *mut c_char,
    num_keys: *mut i64,
) -> OrtStatusPtr {
    let custom = &(*metadata.cast::<MockMetadata>()).custom;
    *num_keys = custom.len() as i64;
    if custom.is_empty() {
        *keys = ptr::null_mut();
        return ptr::null_mut();
    }
    let list: Box<[*mut c_char]> = custom.iter().map(|(k, _)| alloc_string(k)).collect();
    let raw = Box::into_raw(list).cast::<*mut c_char>();
    state().live.insert(raw as usize, Kind::StrArray(custom.len()));
    *keys = raw;
    ptr::null_mut()
}

unsafe extern "C" fn metadata_version(metadata: *const OrtModelMetadata, value: *mut i64) -> OrtStatusPtr {
    *value = (*metadata.cast::<MockMetadata>()).version;
    ptr::null_mut()
}

// Values

unsafe fn value_ref<'a>(value: *const OrtValue) -> &'a MockValue {
    &*value.cast::<MockValue>()
}

unsafe fn tensor_ref<'a>(value: *const OrtValue) -> Option<&'a MockTensor> {
    match value_ref(value) {
        MockValue::Tensor(t) => Some(t),
        _ => None,
    }
}

fn not_a_tensor() -> OrtStatusPtr {
    fail(ORT_INVALID_ARGUMENT, "the ort_value must contain a constructed tensor")
}

unsafe fn read_dims(shape: *const i64, len: usize) -> Vec<i64> {
    if len == 0 {
        Vec::new()
    } else {
        std::slice::from_raw_parts(shape, len).to_vec()
    }
}

unsafe extern "C" fn create_tensor(
    _allocator: *mut OrtAllocator,
    shape: *const i64,
    shape_len: usize,
    elem: ONNXTensorElementDataType,
    out: *mut *mut OrtValue,
) -> OrtStatusPtr {
    let dims = read_dims(shape, shape_len);
    let count: usize = dims.iter().map(|&d| d.max(0) as usize).product();
    let tensor = if elem == ONNX_TENSOR_ELEMENT_DATA_TYPE_STRING {
        MockTensor::strings(dims, vec![Vec::new(); count])
    } else {
        MockTensor::from_slice(elem, dims, &vec![0u8; count * element_size(elem)])
    };
    *out = new_value(MockValue::Tensor(tensor));
    ptr::null_mut()
}

unsafe extern "C" fn create_tensor_with_data(
    info: *const OrtMemoryInfo,
    data: *mut c_void,
    data_len: usize,
    shape: *const i64,
    shape_len: usize,
    elem: ONNXTensorElementDataType,
    out: *mut *mut OrtValue,
) -> OrtStatusPtr {
    if state().live.get(&(info as usize)) != Some(&Kind::MemoryInfo) {
        return fail(ORT_INVALID_ARGUMENT, "unknown memory info");
    }
    let dims = read_dims(shape, shape_len);
    let count: usize = dims.iter().map(|&d| d.max(0) as usize).product();
    if count * element_size(elem) != data_len {
        return fail(
            ORT_INVALID_ARGUMENT,
            format!("not enough space: expected {}, got {data_len}", count * element_size(elem)),
        );
    }
    *out = new_value(MockValue::Tensor(MockTensor {
        elem,
        dims,
        data: Data::External {
            ptr: data.cast(),
            len: data_len,
        },
    }));
    ptr::null_mut()
}

unsafe extern "C" fn is_tensor(value: *const OrtValue, out: *mut c_int) -> OrtStatusPtr {
    *out = c_int::from(tensor_ref(value).is_some());
    ptr::null_mut()
}

unsafe extern "C" fn get_tensor_data(value: *mut OrtValue, out: *mut *mut c_void) -> OrtStatusPtr {
    match &mut *value.cast::<MockValue>() {
        MockValue::Tensor(t) => match &mut t.data {
            Data::Owned { words, .. } => *out = words.as_mut_ptr().cast(),
            Data::External { ptr, .. } => *out = (*ptr).cast(),
            Data::Strings(_) => return fail(ORT_INVALID_ARGUMENT, "string tensors have no raw data"),
        },
        _ => return not_a_tensor(),
    }
    ptr::null_mut()
}

unsafe extern "C" fn fill_string_tensor(value: *mut OrtValue, s: *const *const c_char, s_len: usize) -> OrtStatusPtr {
    match &mut *value.cast::<MockValue>() {
        MockValue::Tensor(MockTensor {
            data: Data::Strings(strings),
            ..
        }) => {
            if s_len != strings.len() {
                return fail(ORT_INVALID_ARGUMENT, "string count does not match tensor shape");
            }
            for (i, slot) in strings.iter_mut().enumerate() {
                *slot = CStr::from_ptr(*s.add(i)).to_bytes().to_vec();
            }
            ptr::null_mut()
        }
        _ => fail(ORT_INVALID_ARGUMENT, "not a string tensor"),
    }
}

unsafe fn strings_of<'a>(value: *const OrtValue) -> Option<&'a [Vec<u8>]> {
    match tensor_ref(value) {
        Some(MockTensor {
            data: Data::Strings(strings),
            ..
        }) => Some(strings.as_slice()),
        _ => None,
    }
}

unsafe extern "C" fn string_data_length(value: *const OrtValue, len: *mut usize) -> OrtStatusPtr {
    match strings_of(value) {
        Some(strings) => {
            *len = strings.iter().map(Vec::len).sum();
            ptr::null_mut()
        }
        None => fail(ORT_INVALID_ARGUMENT, "not a string tensor"),
    }
}

unsafe extern "C" fn string_content(
    value: *const OrtValue,
    s: *mut c_void,
    s_len: usize,
    offsets: *mut usize,
    offsets_len: usize,
) -> OrtStatusPtr {
    let Some(strings) = strings_of(value) else {
        return fail(ORT_INVALID_ARGUMENT, "not a string tensor");
    };
    let total: usize = strings.iter().map(Vec::len).sum();
    if s_len < total || offsets_len != strings.len() {
        return fail(ORT_INVALID_ARGUMENT, "output buffer is too small");
    }
    let mut at = 0;
    for (i, bytes) in strings.iter().enumerate() {
        *offsets.add(i) = at;
        ptr::copy_nonoverlapping(bytes.as_ptr(), s.cast::<u8>().add(at), bytes.len());
        at += bytes.len();
    }
    ptr::null_mut()
}

unsafe extern "C" fn get_value_type(value: *const OrtValue, out: *mut ONNXType) -> OrtStatusPtr {
    *out = match value_ref(value) {
        MockValue::Tensor(_) => ONNX_TYPE_TENSOR,
        MockValue::Sequence(_) => ONNX_TYPE_SEQUENCE,
        MockValue::Map { .. } => ONNX_TYPE_MAP,
    };
    ptr::null_mut()
}

unsafe extern "C" fn get_value_count(value: *const OrtValue, out: *mut usize) -> OrtStatusPtr {
    *out = match value_ref(value) {
        MockValue::Sequence(items) => items.len(),
        MockValue::Map { .. } => 2,
        MockValue::Tensor(_) => return fail(ORT_INVALID_ARGUMENT, "tensors have no children"),
    };
    ptr::null_mut()
}

unsafe extern "C" fn get_value(
    value: *const OrtValue,
    index: c_int,
    _allocator: *mut OrtAllocator,
    out: *mut *mut OrtValue,
) -> OrtStatusPtr {
    let index = index.max(0) as usize;
    let child = match value_ref(value) {
        MockValue::Sequence(items) => items.get(index).map(MockValue::duplicate),
        MockValue::Map { keys, values } => match index {
            0 => Some(MockValue::Tensor(keys.duplicate())),
            1 => Some(MockValue::Tensor(values.duplicate())),
            _ => None,
        },
        MockValue::Tensor(_) => None,
    };
    match child {
        Some(child) => {
            *out = new_value(child);
            ptr::null_mut()
        }
        None => fail(ORT_INVALID_ARGUMENT, format!("invalid index {index}")),
    }
}

unsafe extern "C" fn get_tensor_type_and_shape(
    value: *const OrtValue,
    out: *mut *mut OrtTensorTypeAndShapeInfo,
) -> OrtStatusPtr {
    match tensor_ref(value) {
        Some(t) => {
            *out = track(Kind::TensorInfo, MockTensorInfo::new(t.elem, t.dims.clone(), &[])).cast();
            ptr::null_mut()
        }
        None => not_a_tensor(),
    }
}

unsafe extern "C" fn get_type_info(value: *const OrtValue, out: *mut *mut OrtTypeInfo) -> OrtStatusPtr {
    *out = type_info(value_ref(value).desc());
    ptr::null_mut()
}

// Type info

unsafe fn type_info_ref<'a>(info: *const OrtTypeInfo) -> &'a MockTypeInfo {
    &*info.cast::<MockTypeInfo>()
}

unsafe fn tensor_info_ref<'a>(info: *const OrtTensorTypeAndShapeInfo) -> &'a MockTensorInfo {
    &*info.cast::<MockTensorInfo>()
}

unsafe extern "C" fn get_onnx_type(info: *const OrtTypeInfo, out: *mut ONNXType) -> OrtStatusPtr {
    *out = type_info_ref(info).onnx_type;
    ptr::null_mut()
}

unsafe extern "C" fn cast_to_tensor_info(
    info: *const OrtTypeInfo,
    out: *mut *const OrtTensorTypeAndShapeInfo,
) -> OrtStatusPtr {
    *out = type_info_ref(info)
        .tensor
        .as_ref()
        .map_or(ptr::null(), |t| (t as *const MockTensorInfo).cast());
    ptr::null_mut()
}

unsafe extern "C" fn cast_to_sequence_info(info: *const OrtTypeInfo, out: *mut *const OrtSequenceTypeInfo) -> OrtStatusPtr {
    *out = type_info_ref(info)
        .sequence
        .as_ref()
        .map_or(ptr::null(), |s| (s as *const MockSequenceInfo).cast());
    ptr::null_mut()
}

unsafe extern "C" fn cast_to_map_info(info: *const OrtTypeInfo, out: *mut *const OrtMapTypeInfo) -> OrtStatusPtr {
    *out = type_info_ref(info)
        .map
        .as_ref()
        .map_or(ptr::null(), |m| (m as *const MockMapInfo).cast());
    ptr::null_mut()
}

unsafe extern "C" fn sequence_element_type(
    sequence: *const OrtSequenceTypeInfo,
    out: *mut *mut OrtTypeInfo,
) -> OrtStatusPtr {
    *out = type_info((*sequence.cast::<MockSequenceInfo>()).element.clone());
    ptr::null_mut()
}

unsafe extern "C" fn map_key_type(map: *const OrtMapTypeInfo, out: *mut ONNXTensorElementDataType) -> OrtStatusPtr {
    *out = (*map.cast::<MockMapInfo>()).key;
    ptr::null_mut()
}

unsafe extern "C" fn map_value_type(map: *const OrtMapTypeInfo, out: *mut *mut OrtTypeInfo) -> OrtStatusPtr {
    *out = type_info((*map.cast::<MockMapInfo>()).value.clone());
    ptr::null_mut()
}

unsafe extern "C" fn tensor_element_type(
    info: *const OrtTensorTypeAndShapeInfo,
    out: *mut ONNXTensorElementDataType,
) -> OrtStatusPtr {
    *out = tensor_info_ref(info).elem;
    ptr::null_mut()
}

unsafe extern "C" fn dimensions_count(info: *const OrtTensorTypeAndShapeInfo, out: *mut usize) -> OrtStatusPtr {
    *out = tensor_info_ref(info).dims.len();
    ptr::null_mut()
}

unsafe extern "C" fn dimensions(info: *const OrtTensorTypeAndShapeInfo, values: *mut i64, len: usize) -> OrtStatusPtr {
    let dims = &tensor_info_ref(info).dims;
    for (i, dim) in dims.iter().take(len).enumerate() {
        *values.add(i) = *dim;
    }
    ptr::null_mut()
}

unsafe extern "C" fn symbolic_dimensions(
    info: *const OrtTensorTypeAndShapeInfo,
    names: *mut *const c_char,
    len: usize,
) -> OrtStatusPtr {
    for (i, name) in tensor_info_ref(info).names.iter().take(len).enumerate() {
        *names.add(i) = name.as_ptr();
    }
    ptr::null_mut()
}

unsafe extern "C" fn shape_element_count(info: *const OrtTensorTypeAndShapeInfo, out: *mut usize) -> OrtStatusPtr {
    *out = tensor_info_ref(info)
        .dims
        .iter()
        .map(|&d| d.max(0) as usize)
        .product();
    ptr::null_mut()
}

// Releases

unsafe extern "C" fn release_env(env: *mut OrtEnv) {
    if untrack(env.cast::<MockEnv>(), Kind::Env) {
        state().stats.env_released += 1;
    }
}

macro_rules! release_entries {
    ($($entry:ident($ty:ty) => $mock:ty, $kind:ident;)*) => {
        $(
            unsafe extern "C" fn $entry(ptr: *mut $ty) {
                untrack(ptr.cast::<$mock>(), Kind::$kind);
            }
        )*
    };
}

release_entries! {
    release_status(OrtStatus) => MockStatus, Status;
    release_memory_info(OrtMemoryInfo) => MockMemoryInfo, MemoryInfo;
    release_session(OrtSession) => MockSession, Session;
    release_value(OrtValue) => MockValue, Value;
    release_run_options(OrtRunOptions) => MockRunOptions, RunOptions;
    release_type_info_entry(OrtTypeInfo) => MockTypeInfo, TypeInfo;
    release_tensor_info(OrtTensorTypeAndShapeInfo) => MockTensorInfo, TensorInfo;
    release_session_options(OrtSessionOptions) => MockSessionOptions, SessionOptions;
    release_metadata(OrtModelMetadata) => MockMetadata, Metadata;
    release_cuda_options(OrtCUDAProviderOptionsV2) => MockCudaOptions, CudaOptions;
}

fn build_table() -> OrtApi {
    let mut t = OrtApi::empty();
    t.CreateStatus = Some(create_status);
    t.GetErrorCode = Some(get_error_code);
    t.GetErrorMessage = Some(get_error_message);
    t.CreateEnv = Some(create_env);
    t.DisableTelemetryEvents = Some(disable_telemetry);
    t.CreateSession = Some(create_session);
    t.CreateSessionFromArray = Some(create_session_from_array);
    t.Run = Some(run);

    t.CreateSessionOptions = Some(create_session_options);
    t.SetOptimizedModelFilePath = Some(set_optimized_model_path);
    t.SetSessionExecutionMode = Some(SetSessionExecutionMode);
    t.EnableProfiling = Some(enable_profiling);
    t.DisableProfiling = Some(disable_profiling);
    t.EnableMemPattern = Some(EnableMemPattern);
    t.DisableMemPattern = Some(DisableMemPattern);
    t.EnableCpuMemArena = Some(EnableCpuMemArena);
    t.DisableCpuMemArena = Some(DisableCpuMemArena);
    t.SetSessionLogId = Some(set_log_id);
    t.SetSessionLogVerbosityLevel = Some(SetSessionLogVerbosityLevel);
    t.SetSessionLogSeverityLevel = Some(SetSessionLogSeverityLevel);
    t.SetSessionGraphOptimizationLevel = Some(SetSessionGraphOptimizationLevel);
    t.SetIntraOpNumThreads = Some(SetIntraOpNumThreads);
    t.SetInterOpNumThreads = Some(SetInterOpNumThreads);
    t.AddFreeDimensionOverride = Some(add_free_dimension_override);
    t.AddFreeDimensionOverrideByName = Some(add_free_dimension_override_by_name);
    t.AddSessionConfigEntry = Some(add_session_config_entry);
    t.CreateCUDAProviderOptions = Some(create_cuda_options);
    t.SessionOptionsAppendExecutionProvider_CUDA_V2 = Some(append_cuda);

    t.SessionGetInputCount = Some(input_count);
    t.SessionGetOutputCount = Some(output_count);
    t.SessionGetInputTypeInfo = Some(input_type_info);
    t.SessionGetOutputTypeInfo = Some(output_type_info);
    t.SessionGetInputName = Some(input_name);
    t.SessionGetOutputName = Some(output_name);
    t.SessionEndProfiling = Some(end_profiling);
    t.SessionGetModelMetadata = Some(get_model_metadata);

    t.CreateRunOptions = Some(create_run_options);
    t.RunOptionsSetRunLogVerbosityLevel = Some(run_log_verbosity);
    t.RunOptionsSetRunLogSeverityLevel = Some(run_log_severity);
    t.RunOptionsSetRunTag = Some(run_tag);
    t.RunOptionsSetTerminate = Some(run_set_terminate);
    t.RunOptionsUnsetTerminate = Some(run_unset_terminate);

    t.CreateTensorAsOrtValue = Some(create_tensor);
    t.CreateTensorWithDataAsOrtValue = Some(create_tensor_with_data);
    t.IsTensor = Some(is_tensor);
    t.GetTensorMutableData = Some(get_tensor_data);
    t.FillStringTensor = Some(fill_string_tensor);
    t.GetStringTensorDataLength = Some(string_data_length);
    t.GetStringTensorContent = Some(string_content);
    t.CastTypeInfoToTensorInfo = Some(cast_to_tensor_info);
    t.GetOnnxTypeFromTypeInfo = Some(get_onnx_type);
    t.GetTensorElementType = Some(tensor_element_type);
    t.GetDimensionsCount = Some(dimensions_count);
    t.GetDimensions = Some(dimensions);
    t.GetSymbolicDimensions = Some(symbolic_dimensions);
    t.GetTensorShapeElementCount = Some(shape_element_count);
    t.GetTensorTypeAndShape = Some(get_tensor_type_and_shape);
    t.GetTypeInfo = Some(get_type_info);
    t.GetValueType = Some(get_value_type);
    t.CreateCpuMemoryInfo = Some(create_cpu_memory_info);
    t.AllocatorFree = Some(allocator_free);
    t.GetAllocatorWithDefaultOptions = Some(get_allocator);
    t.GetValue = Some(get_value);
    t.GetValueCount = Some(get_value_count);

    t.ReleaseEnv = Some(release_env);
    t.ReleaseStatus = Some(release_status);
    t.ReleaseMemoryInfo = Some(release_memory_info);
    t.ReleaseSession = Some(release_session);
    t.ReleaseValue = Some(release_value);
    t.ReleaseRunOptions = Some(release_run_options);
    t.ReleaseTypeInfo = Some(release_type_info_entry);
    t.ReleaseTensorTypeAndShapeInfo = Some(release_tensor_info);
    t.ReleaseSessionOptions = Some(release_session_options);
    t.ReleaseModelMetadata = Some(release_metadata);
    t.ReleaseCUDAProviderOptions = Some(release_cuda_options);

    t.CastTypeInfoToMapTypeInfo = Some(cast_to_map_info);
    t.CastTypeInfoToSequenceTypeInfo = Some(cast_to_sequence_info);
    t.GetMapKeyType = Some(map_key_type);
    t.GetMapValueType = Some(map_value_type);
    t.GetSequenceElementType = Some(sequence_element_type);

    t.ModelMetadataGetProducerName = Some(metadata_producer);
    t.ModelMetadataGetGraphName = Some(metadata_graph_name);
    t.ModelMetadataGetGraphDescription = Some(metadata_graph_description);
    t.ModelMetadataGetDomain = Some(metadata_domain);
    t.ModelMetadataGetDescription = Some(metadata_description);
    t.ModelMetadataLookupCustomMetadataMap = Some(metadata_lookup);
    t.ModelMetadataGetCustomMetadataMapKeys = Some(metadata_keys);
    t.ModelMetadataGetVersion = Some(metadata_version);
    t.GetAvailableProviders = Some(get_available_providers);
    t.ReleaseAvailableProviders = Some(release_available_providers);
    t
}
