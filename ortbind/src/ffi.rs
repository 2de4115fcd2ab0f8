//! Raw FFI declarations for the ONNX Runtime C API.
//!
//! These declarations match `onnxruntime_c_api.h` at [`ORT_API_VERSION`].
//! We hand-write them instead of using bindgen. Entries this crate never
//! calls are typed as [`Reserved`] so the table keeps its exact layout
//! without spelling out signatures nobody uses.
//!
//! The table is declared as a prefix of the real `OrtApi` struct: later
//! API versions only append fields, so reading through a pointer to a
//! larger table is sound.

#![allow(non_snake_case, non_camel_case_types)]

use std::os::raw::{c_char, c_int, c_void};

/// ABI version this crate's [`OrtApi`] layout is pinned to.
pub const ORT_API_VERSION: u32 = 16;

// Opaque types. The C API only hands out pointers to these.
macro_rules! opaque {
    ($($name:ident),* $(,)?) => {
        $(
            #[repr(C)]
            pub struct $name {
                _private: [u8; 0],
            }
        )*
    };
}

opaque!(
    OrtEnv,
    OrtStatus,
    OrtMemoryInfo,
    OrtSession,
    OrtValue,
    OrtRunOptions,
    OrtTypeInfo,
    OrtTensorTypeAndShapeInfo,
    OrtSessionOptions,
    OrtMapTypeInfo,
    OrtSequenceTypeInfo,
    OrtModelMetadata,
    OrtAllocator,
    OrtCUDAProviderOptionsV2,
);

/// Path character type (`ORTCHAR_T`): UTF-16 on Windows, bytes elsewhere.
#[cfg(windows)]
pub type OrtChar = u16;
#[cfg(not(windows))]
pub type OrtChar = c_char;

pub type OrtStatusPtr = *mut OrtStatus;

/// Placeholder for table entries this crate never calls.
pub type Reserved = Option<unsafe extern "C" fn()>;

// Enums are carried as plain integers; an engine newer than this crate may
// hand back values we have no Rust variant for.
pub type OrtErrorCode = c_int;
pub type OrtLoggingLevel = c_int;
pub type ONNXTensorElementDataType = c_int;
pub type ONNXType = c_int;
pub type ExecutionMode = c_int;
pub type GraphOptimizationLevel = c_int;
pub type OrtAllocatorType = c_int;
pub type OrtMemType = c_int;

pub const ORT_OK: OrtErrorCode = 0;
pub const ORT_FAIL: OrtErrorCode = 1;
pub const ORT_INVALID_ARGUMENT: OrtErrorCode = 2;
pub const ORT_NO_SUCHFILE: OrtErrorCode = 3;
pub const ORT_NO_MODEL: OrtErrorCode = 4;
pub const ORT_ENGINE_ERROR: OrtErrorCode = 5;
pub const ORT_RUNTIME_EXCEPTION: OrtErrorCode = 6;
pub const ORT_INVALID_PROTOBUF: OrtErrorCode = 7;
pub const ORT_MODEL_LOADED: OrtErrorCode = 8;
pub const ORT_NOT_IMPLEMENTED: OrtErrorCode = 9;
pub const ORT_INVALID_GRAPH: OrtErrorCode = 10;
pub const ORT_EP_FAIL: OrtErrorCode = 11;

pub const ORT_LOGGING_LEVEL_VERBOSE: OrtLoggingLevel = 0;
pub const ORT_LOGGING_LEVEL_INFO: OrtLoggingLevel = 1;
pub const ORT_LOGGING_LEVEL_WARNING: OrtLoggingLevel = 2;
pub const ORT_LOGGING_LEVEL_ERROR: OrtLoggingLevel = 3;
pub const ORT_LOGGING_LEVEL_FATAL: OrtLoggingLevel = 4;

pub const ONNX_TENSOR_ELEMENT_DATA_TYPE_UNDEFINED: ONNXTensorElementDataType = 0;
pub const ONNX_TENSOR_ELEMENT_DATA_TYPE_FLOAT: ONNXTensorElementDataType = 1;
pub const ONNX_TENSOR_ELEMENT_DATA_TYPE_UINT8: ONNXTensorElementDataType = 2;
pub const ONNX_TENSOR_ELEMENT_DATA_TYPE_INT8: ONNXTensorElementDataType = 3;
pub const ONNX_TENSOR_ELEMENT_DATA_TYPE_UINT16: ONNXTensorElementDataType = 4;
pub const ONNX_TENSOR_ELEMENT_DATA_TYPE_INT16: ONNXTensorElementDataType = 5;
pub const ONNX_TENSOR_ELEMENT_DATA_TYPE_INT32: ONNXTensorElementDataType = 6;
pub const ONNX_TENSOR_ELEMENT_DATA_TYPE_INT64: ONNXTensorElementDataType = 7;
pub const ONNX_TENSOR_ELEMENT_DATA_TYPE_STRING: ONNXTensorElementDataType = 8;
pub const ONNX_TENSOR_ELEMENT_DATA_TYPE_BOOL: ONNXTensorElementDataType = 9;
pub const ONNX_TENSOR_ELEMENT_DATA_TYPE_FLOAT16: ONNXTensorElementDataType = 10;
pub const ONNX_TENSOR_ELEMENT_DATA_TYPE_DOUBLE: ONNXTensorElementDataType = 11;
pub const ONNX_TENSOR_ELEMENT_DATA_TYPE_UINT32: ONNXTensorElementDataType = 12;
pub const ONNX_TENSOR_ELEMENT_DATA_TYPE_UINT64: ONNXTensorElementDataType = 13;
pub const ONNX_TENSOR_ELEMENT_DATA_TYPE_COMPLEX64: ONNXTensorElementDataType = 14;
pub const ONNX_TENSOR_ELEMENT_DATA_TYPE_COMPLEX128: ONNXTensorElementDataType = 15;
pub const ONNX_TENSOR_ELEMENT_DATA_TYPE_BFLOAT16: ONNXTensorElementDataType = 16;

pub const ONNX_TYPE_UNKNOWN: ONNXType = 0;
pub const ONNX_TYPE_TENSOR: ONNXType = 1;
pub const ONNX_TYPE_SEQUENCE: ONNXType = 2;
pub const ONNX_TYPE_MAP: ONNXType = 3;
pub const ONNX_TYPE_OPAQUE: ONNXType = 4;
pub const ONNX_TYPE_SPARSETENSOR: ONNXType = 5;
pub const ONNX_TYPE_OPTIONAL: ONNXType = 6;

pub const ORT_SEQUENTIAL: ExecutionMode = 0;
pub const ORT_PARALLEL: ExecutionMode = 1;

pub const ORT_DISABLE_ALL: GraphOptimizationLevel = 0;
pub const ORT_ENABLE_BASIC: GraphOptimizationLevel = 1;
pub const ORT_ENABLE_EXTENDED: GraphOptimizationLevel = 2;
pub const ORT_ENABLE_ALL: GraphOptimizationLevel = 99;

pub const ORT_DEVICE_ALLOCATOR: OrtAllocatorType = 0;
pub const ORT_ARENA_ALLOCATOR: OrtAllocatorType = 1;

pub const ORT_MEM_TYPE_DEFAULT: OrtMemType = 0;

/// Entry point exported by the shared library.
pub type OrtGetApiBaseFn = unsafe extern "C" fn() -> *const OrtApiBase;

/// `OrtSessionOptionsAppendExecutionProvider_CoreML`, exported outside the
/// table on Apple builds only.
pub type AppendCoreMlFn =
    unsafe extern "C" fn(options: *mut OrtSessionOptions, coreml_flags: u32) -> OrtStatusPtr;

#[repr(C)]
pub struct OrtApiBase {
    pub GetApi: unsafe extern "C" fn(version: u32) -> *const OrtApi,
    pub GetVersionString: unsafe extern "C" fn() -> *const c_char,
}

#[repr(C)]
pub struct OrtApi {
    pub CreateStatus:
        Option<unsafe extern "C" fn(code: OrtErrorCode, msg: *const c_char) -> OrtStatusPtr>,
    pub GetErrorCode: Option<unsafe extern "C" fn(status: *const OrtStatus) -> OrtErrorCode>,
    pub GetErrorMessage: Option<unsafe extern "C" fn(status: *const OrtStatus) -> *const c_char>,
    pub CreateEnv: Option<
        unsafe extern "C" fn(
            log_severity_level: OrtLoggingLevel,
            logid: *const c_char,
            out: *mut *mut OrtEnv,
        ) -> OrtStatusPtr,
    >,
    pub CreateEnvWithCustomLogger: Reserved,
    pub EnableTelemetryEvents: Option<unsafe extern "C" fn(env: *const OrtEnv) -> OrtStatusPtr>,
    pub DisableTelemetryEvents: Option<unsafe extern "C" fn(env: *const OrtEnv) -> OrtStatusPtr>,
    pub CreateSession: Option<
        unsafe extern "C" fn(
            env: *const OrtEnv,
            model_path: *const OrtChar,
            options: *const OrtSessionOptions,
            out: *mut *mut OrtSession,
        ) -> OrtStatusPtr,
    >,
    pub CreateSessionFromArray: Option<
        unsafe extern "C" fn(
            env: *const OrtEnv,
            model_data: *const c_void,
            model_data_length: usize,
            options: *const OrtSessionOptions,
            out: *mut *mut OrtSession,
        ) -> OrtStatusPtr,
    >,
    pub Run: Option<
        unsafe extern "C" fn(
            session: *mut OrtSession,
            run_options: *const OrtRunOptions,
            input_names: *const *const c_char,
            inputs: *const *const OrtValue,
            input_len: usize,
            output_names: *const *const c_char,
            output_names_len: usize,
            outputs: *mut *mut OrtValue,
        ) -> OrtStatusPtr,
    >,
    pub CreateSessionOptions:
        Option<unsafe extern "C" fn(options: *mut *mut OrtSessionOptions) -> OrtStatusPtr>,
    pub SetOptimizedModelFilePath: Option<
        unsafe extern "C" fn(
            options: *mut OrtSessionOptions,
            optimized_model_filepath: *const OrtChar,
        ) -> OrtStatusPtr,
    >,
    pub CloneSessionOptions: Reserved,
    pub SetSessionExecutionMode: Option<
        unsafe extern "C" fn(
            options: *mut OrtSessionOptions,
            execution_mode: ExecutionMode,
        ) -> OrtStatusPtr,
    >,
    pub EnableProfiling: Option<
        unsafe extern "C" fn(
            options: *mut OrtSessionOptions,
            profile_file_prefix: *const OrtChar,
        ) -> OrtStatusPtr,
    >,
    pub DisableProfiling:
        Option<unsafe extern "C" fn(options: *mut OrtSessionOptions) -> OrtStatusPtr>,
    pub EnableMemPattern:
        Option<unsafe extern "C" fn(options: *mut OrtSessionOptions) -> OrtStatusPtr>,
    pub DisableMemPattern:
        Option<unsafe extern "C" fn(options: *mut OrtSessionOptions) -> OrtStatusPtr>,
    pub EnableCpuMemArena:
        Option<unsafe extern "C" fn(options: *mut OrtSessionOptions) -> OrtStatusPtr>,
    pub DisableCpuMemArena:
        Option<unsafe extern "C" fn(options: *mut OrtSessionOptions) -> OrtStatusPtr>,
    pub SetSessionLogId: Option<
        unsafe extern "C" fn(options: *mut OrtSessionOptions, logid: *const c_char) -> OrtStatusPtr,
    >,
    pub SetSessionLogVerbosityLevel: Option<
        unsafe extern "C" fn(options: *mut OrtSessionOptions, level: c_int) -> OrtStatusPtr,
    >,
    pub SetSessionLogSeverityLevel: Option<
        unsafe extern "C" fn(options: *mut OrtSessionOptions, level: c_int) -> OrtStatusPtr,
    >,
    pub SetSessionGraphOptimizationLevel: Option<
        unsafe extern "C" fn(
            options: *mut OrtSessionOptions,
            graph_optimization_level: GraphOptimizationLevel,
        ) -> OrtStatusPtr,
    >,
    pub SetIntraOpNumThreads: Option<
        unsafe extern "C" fn(options: *mut OrtSessionOptions, num_threads: c_int) -> OrtStatusPtr,
    >,
    pub SetInterOpNumThreads: Option<
        unsafe extern "C" fn(options: *mut OrtSessionOptions, num_threads: c_int) -> OrtStatusPtr,
    >,
    pub CreateCustomOpDomain: Reserved,
    pub CustomOpDomain_Add: Reserved,
    pub AddCustomOpDomain: Reserved,
    pub RegisterCustomOpsLibrary: Reserved,
    pub SessionGetInputCount:
        Option<unsafe extern "C" fn(session: *const OrtSession, out: *mut usize) -> OrtStatusPtr>,
    pub SessionGetOutputCount:
        Option<unsafe extern "C" fn(session: *const OrtSession, out: *mut usize) -> OrtStatusPtr>,
    pub SessionGetOverridableInitializerCount: Reserved,
    pub SessionGetInputTypeInfo: Option<
        unsafe extern "C" fn(
            session: *const OrtSession,
            index: usize,
            type_info: *mut *mut OrtTypeInfo,
        ) -> OrtStatusPtr,
    >,
    pub SessionGetOutputTypeInfo: Option<
        unsafe extern "C" fn(
            session: *const OrtSession,
            index: usize,
            type_info: *mut *mut OrtTypeInfo,
        ) -> OrtStatusPtr,
    >,
    pub SessionGetOverridableInitializerTypeInfo: Reserved,
    pub SessionGetInputName: Option<
        unsafe extern "C" fn(
            session: *const OrtSession,
            index: usize,
            allocator: *mut OrtAllocator,
            value: *mut *mut c_char,
        ) -> OrtStatusPtr,
    >,
    pub SessionGetOutputName: Option<
        unsafe extern "C" fn(
            session: *const OrtSession,
            index: usize,
            allocator: *mut OrtAllocator,
            value: *mut *mut c_char,
        ) -> OrtStatusPtr,
    >,
    pub SessionGetOverridableInitializerName: Reserved,
    pub CreateRunOptions:
        Option<unsafe extern "C" fn(out: *mut *mut OrtRunOptions) -> OrtStatusPtr>,
    pub RunOptionsSetRunLogVerbosityLevel:
        Option<unsafe extern "C" fn(options: *mut OrtRunOptions, level: c_int) -> OrtStatusPtr>,
    pub RunOptionsSetRunLogSeverityLevel:
        Option<unsafe extern "C" fn(options: *mut OrtRunOptions, level: c_int) -> OrtStatusPtr>,
    pub RunOptionsSetRunTag: Option<
        unsafe extern "C" fn(options: *mut OrtRunOptions, run_tag: *const c_char) -> OrtStatusPtr,
    >,
    pub RunOptionsGetRunLogVerbosityLevel: Reserved,
    pub RunOptionsGetRunLogSeverityLevel: Reserved,
    pub RunOptionsGetRunTag: Reserved,
    pub RunOptionsSetTerminate:
        Option<unsafe extern "C" fn(options: *mut OrtRunOptions) -> OrtStatusPtr>,
    pub RunOptionsUnsetTerminate:
        Option<unsafe extern "C" fn(options: *mut OrtRunOptions) -> OrtStatusPtr>,
    pub CreateTensorAsOrtValue: Option<
        unsafe extern "C" fn(
            allocator: *mut OrtAllocator,
            shape: *const i64,
            shape_len: usize,
            element_type: ONNXTensorElementDataType,
            out: *mut *mut OrtValue,
        ) -> OrtStatusPtr,
    >,
    pub CreateTensorWithDataAsOrtValue: Option<
        unsafe extern "C" fn(
            info: *const OrtMemoryInfo,
            p_data: *mut c_void,
            p_data_len: usize,
            shape: *const i64,
            shape_len: usize,
            element_type: ONNXTensorElementDataType,
            out: *mut *mut OrtValue,
        ) -> OrtStatusPtr,
    >,
    pub IsTensor:
        Option<unsafe extern "C" fn(value: *const OrtValue, out: *mut c_int) -> OrtStatusPtr>,
    pub GetTensorMutableData:
        Option<unsafe extern "C" fn(value: *mut OrtValue, out: *mut *mut c_void) -> OrtStatusPtr>,
    pub FillStringTensor: Option<
        unsafe extern "C" fn(
            value: *mut OrtValue,
            s: *const *const c_char,
            s_len: usize,
        ) -> OrtStatusPtr,
    >,
    pub GetStringTensorDataLength:
        Option<unsafe extern "C" fn(value: *const OrtValue, len: *mut usize) -> OrtStatusPtr>,
    pub GetStringTensorContent: Option<
        unsafe extern "C" fn(
            value: *const OrtValue,
            s: *mut c_void,
            s_len: usize,
            offsets: *mut usize,
            offsets_len: usize,
        ) -> OrtStatusPtr,
    >,
    pub CastTypeInfoToTensorInfo: Option<
        unsafe extern "C" fn(
            type_info: *const OrtTypeInfo,
            out: *mut *const OrtTensorTypeAndShapeInfo,
        ) -> OrtStatusPtr,
    >,
    pub GetOnnxTypeFromTypeInfo: Option<
        unsafe extern "C" fn(type_info: *const OrtTypeInfo, out: *mut ONNXType) -> OrtStatusPtr,
    >,
    pub CreateTensorTypeAndShapeInfo: Reserved,
    pub SetTensorElementType: Reserved,
    pub SetDimensions: Reserved,
    pub GetTensorElementType: Option<
        unsafe extern "C" fn(
            info: *const OrtTensorTypeAndShapeInfo,
            out: *mut ONNXTensorElementDataType,
        ) -> OrtStatusPtr,
    >,
    pub GetDimensionsCount: Option<
        unsafe extern "C" fn(info: *const OrtTensorTypeAndShapeInfo, out: *mut usize) -> OrtStatusPtr,
    >,
    pub GetDimensions: Option<
        unsafe extern "C" fn(
            info: *const OrtTensorTypeAndShapeInfo,
            dim_values: *mut i64,
            dim_values_length: usize,
        ) -> OrtStatusPtr,
    >,
    pub GetSymbolicDimensions: Option<
        unsafe extern "C" fn(
            info: *const OrtTensorTypeAndShapeInfo,
            dim_params: *mut *const c_char,
            dim_params_length: usize,
        ) -> OrtStatusPtr,
    >,
    pub GetTensorShapeElementCount: Option<
        unsafe extern "C" fn(info: *const OrtTensorTypeAndShapeInfo, out: *mut usize) -> OrtStatusPtr,
    >,
    pub GetTensorTypeAndShape: Option<
        unsafe extern "C" fn(
            value: *const OrtValue,
            out: *mut *mut OrtTensorTypeAndShapeInfo,
        ) -> OrtStatusPtr,
    >,
    pub GetTypeInfo: Option<
        unsafe extern "C" fn(value: *const OrtValue, out: *mut *mut OrtTypeInfo) -> OrtStatusPtr,
    >,
    pub GetValueType:
        Option<unsafe extern "C" fn(value: *const OrtValue, out: *mut ONNXType) -> OrtStatusPtr>,
    pub CreateMemoryInfo: Reserved,
    pub CreateCpuMemoryInfo: Option<
        unsafe extern "C" fn(
            allocator_type: OrtAllocatorType,
            mem_type: OrtMemType,
            out: *mut *mut OrtMemoryInfo,
        ) -> OrtStatusPtr,
    >,
    pub CompareMemoryInfo: Reserved,
    pub MemoryInfoGetName: Reserved,
    pub MemoryInfoGetId: Reserved,
    pub MemoryInfoGetMemType: Reserved,
    pub MemoryInfoGetType: Reserved,
    pub AllocatorAlloc: Reserved,
    pub AllocatorFree:
        Option<unsafe extern "C" fn(allocator: *mut OrtAllocator, p: *mut c_void) -> OrtStatusPtr>,
    pub AllocatorGetInfo: Reserved,
    pub GetAllocatorWithDefaultOptions:
        Option<unsafe extern "C" fn(out: *mut *mut OrtAllocator) -> OrtStatusPtr>,
    pub AddFreeDimensionOverride: Option<
        unsafe extern "C" fn(
            options: *mut OrtSessionOptions,
            dim_denotation: *const c_char,
            dim_value: i64,
        ) -> OrtStatusPtr,
    >,
    pub GetValue: Option<
        unsafe extern "C" fn(
            value: *const OrtValue,
            index: c_int,
            allocator: *mut OrtAllocator,
            out: *mut *mut OrtValue,
        ) -> OrtStatusPtr,
    >,
    pub GetValueCount:
        Option<unsafe extern "C" fn(value: *const OrtValue, out: *mut usize) -> OrtStatusPtr>,
    pub CreateValue: Reserved,
    pub CreateOpaqueValue: Reserved,
    pub GetOpaqueValue: Reserved,
    pub KernelInfoGetAttribute_float: Reserved,
    pub KernelInfoGetAttribute_int64: Reserved,
    pub KernelInfoGetAttribute_string: Reserved,
    pub KernelContext_GetInputCount: Reserved,
    pub KernelContext_GetOutputCount: Reserved,
    pub KernelContext_GetInput: Reserved,
    pub KernelContext_GetOutput: Reserved,
    pub ReleaseEnv: Option<unsafe extern "C" fn(env: *mut OrtEnv)>,
    pub ReleaseStatus: Option<unsafe extern "C" fn(status: *mut OrtStatus)>,
    pub ReleaseMemoryInfo: Option<unsafe extern "C" fn(info: *mut OrtMemoryInfo)>,
    pub ReleaseSession: Option<unsafe extern "C" fn(session: *mut OrtSession)>,
    pub ReleaseValue: Option<unsafe extern "C" fn(value: *mut OrtValue)>,
    pub ReleaseRunOptions: Option<unsafe extern "C" fn(options: *mut OrtRunOptions)>,
    pub ReleaseTypeInfo: Option<unsafe extern "C" fn(type_info: *mut OrtTypeInfo)>,
    pub ReleaseTensorTypeAndShapeInfo:
        Option<unsafe extern "C" fn(info: *mut OrtTensorTypeAndShapeInfo)>,
    pub ReleaseSessionOptions: Option<unsafe extern "C" fn(options: *mut OrtSessionOptions)>,
    pub ReleaseCustomOpDomain: Reserved,
    pub GetDenotationFromTypeInfo: Reserved,
    pub CastTypeInfoToMapTypeInfo: Option<
        unsafe extern "C" fn(
            type_info: *const OrtTypeInfo,
            out: *mut *const OrtMapTypeInfo,
        ) -> OrtStatusPtr,
    >,
    pub CastTypeInfoToSequenceTypeInfo: Option<
        unsafe extern "C" fn(
            type_info: *const OrtTypeInfo,
            out: *mut *const OrtSequenceTypeInfo,
        ) -> OrtStatusPtr,
    >,
    pub GetMapKeyType: Option<
        unsafe extern "C" fn(
            map_type_info: *const OrtMapTypeInfo,
            out: *mut ONNXTensorElementDataType,
        ) -> OrtStatusPtr,
    >,
    pub GetMapValueType: Option<
        unsafe extern "C" fn(
            map_type_info: *const OrtMapTypeInfo,
            type_info: *mut *mut OrtTypeInfo,
        ) -> OrtStatusPtr,
    >,
    pub GetSequenceElementType: Option<
        unsafe extern "C" fn(
            sequence_type_info: *const OrtSequenceTypeInfo,
            type_info: *mut *mut OrtTypeInfo,
        ) -> OrtStatusPtr,
    >,
    pub ReleaseMapTypeInfo: Reserved,
    pub ReleaseSequenceTypeInfo: Reserved,
    pub SessionEndProfiling: Option<
        unsafe extern "C" fn(
            session: *mut OrtSession,
            allocator: *mut OrtAllocator,
            out: *mut *mut c_char,
        ) -> OrtStatusPtr,
    >,
    pub SessionGetModelMetadata: Option<
        unsafe extern "C" fn(
            session: *const OrtSession,
            out: *mut *mut OrtModelMetadata,
        ) -> OrtStatusPtr,
    >,
    pub ModelMetadataGetProducerName: Option<
        unsafe extern "C" fn(
            model_metadata: *const OrtModelMetadata,
            allocator: *mut OrtAllocator,
            value: *mut *mut c_char,
        ) -> OrtStatusPtr,
    >,
    pub ModelMetadataGetGraphName: Option<
        unsafe extern "C" fn(
            model_metadata: *const OrtModelMetadata,
            allocator: *mut OrtAllocator,
            value: *mut *mut c_char,
        ) -> OrtStatusPtr,
    >,
    pub ModelMetadataGetDomain: Option<
        unsafe extern "C" fn(
            model_metadata: *const OrtModelMetadata,
            allocator: *mut OrtAllocator,
            value: *mut *mut c_char,
        ) -> OrtStatusPtr,
    >,
    pub ModelMetadataGetDescription: Option<
        unsafe extern "C" fn(
            model_metadata: *const OrtModelMetadata,
            allocator: *mut OrtAllocator,
            value: *mut *mut c_char,
        ) -> OrtStatusPtr,
    >,
    pub ModelMetadataLookupCustomMetadataMap: Option<
        unsafe extern "C" fn(
            model_metadata: *const OrtModelMetadata,
            allocator: *mut OrtAllocator,
            key: *const c_char,
            value: *mut *mut c_char,
        ) -> OrtStatusPtr,
    >,
    pub ModelMetadataGetVersion: Option<
        unsafe extern "C" fn(model_metadata: *const OrtModelMetadata, value: *mut i64) -> OrtStatusPtr,
    >,
    pub ReleaseModelMetadata: Option<unsafe extern "C" fn(model_metadata: *mut OrtModelMetadata)>,
    pub CreateEnvWithGlobalThreadPools: Reserved,
    pub DisablePerSessionThreads: Reserved,
    pub CreateThreadingOptions: Reserved,
    pub ReleaseThreadingOptions: Reserved,
    pub ModelMetadataGetCustomMetadataMapKeys: Option<
        unsafe extern "C" fn(
            model_metadata: *const OrtModelMetadata,
            allocator: *mut OrtAllocator,
            keys: *mut *mut *mut c_char,
            num_keys: *mut i64,
        ) -> OrtStatusPtr,
    >,
    pub AddFreeDimensionOverrideByName: Option<
        unsafe extern "C" fn(
            options: *mut OrtSessionOptions,
            dim_name: *const c_char,
            dim_value: i64,
        ) -> OrtStatusPtr,
    >,
    pub GetAvailableProviders: Option<
        unsafe extern "C" fn(out_ptr: *mut *mut *mut c_char, provider_length: *mut c_int) -> OrtStatusPtr,
    >,
    pub ReleaseAvailableProviders: Option<
        unsafe extern "C" fn(ptr: *mut *mut c_char, providers_length: c_int) -> OrtStatusPtr,
    >,
    pub GetStringTensorElementLength: Reserved,
    pub GetStringTensorElement: Reserved,
    pub FillStringTensorElement: Reserved,
    pub AddSessionConfigEntry: Option<
        unsafe extern "C" fn(
            options: *mut OrtSessionOptions,
            config_key: *const c_char,
            config_value: *const c_char,
        ) -> OrtStatusPtr,
    >,
    pub CreateAllocator: Reserved,
    pub ReleaseAllocator: Reserved,
    pub RunWithBinding: Reserved,
    pub CreateIoBinding: Reserved,
    pub ReleaseIoBinding: Reserved,
    pub BindInput: Reserved,
    pub BindOutput: Reserved,
    pub BindOutputToDevice: Reserved,
    pub GetBoundOutputNames: Reserved,
    pub GetBoundOutputValues: Reserved,
    pub ClearBoundInputs: Reserved,
    pub ClearBoundOutputs: Reserved,
    pub TensorAt: Reserved,
    pub CreateAndRegisterAllocator: Reserved,
    pub SetLanguageProjection: Reserved,
    pub SessionGetProfilingStartTimeNs: Reserved,
    pub SetGlobalIntraOpNumThreads: Reserved,
    pub SetGlobalInterOpNumThreads: Reserved,
    pub SetGlobalSpinControl: Reserved,
    pub AddInitializer: Reserved,
    pub CreateEnvWithCustomLoggerAndGlobalThreadPools: Reserved,
    pub SessionOptionsAppendExecutionProvider_CUDA: Reserved,
    pub SessionOptionsAppendExecutionProvider_ROCM: Reserved,
    pub SessionOptionsAppendExecutionProvider_OpenVINO: Reserved,
    pub SetGlobalDenormalAsZero: Reserved,
    pub CreateArenaCfg: Reserved,
    pub ReleaseArenaCfg: Reserved,
    pub ModelMetadataGetGraphDescription: Option<
        unsafe extern "C" fn(
            model_metadata: *const OrtModelMetadata,
            allocator: *mut OrtAllocator,
            value: *mut *mut c_char,
        ) -> OrtStatusPtr,
    >,
    pub SessionOptionsAppendExecutionProvider_TensorRT: Reserved,
    pub SetCurrentGpuDeviceId: Reserved,
    pub GetCurrentGpuDeviceId: Reserved,
    pub KernelInfoGetAttributeArray_float: Reserved,
    pub KernelInfoGetAttributeArray_int64: Reserved,
    pub CreateArenaCfgV2: Reserved,
    pub AddRunConfigEntry: Reserved,
    pub CreatePrepackedWeightsContainer: Reserved,
    pub ReleasePrepackedWeightsContainer: Reserved,
    pub CreateSessionWithPrepackedWeightsContainer: Reserved,
    pub CreateSessionFromArrayWithPrepackedWeightsContainer: Reserved,
    pub SessionOptionsAppendExecutionProvider_TensorRT_V2: Reserved,
    pub CreateTensorRTProviderOptions: Reserved,
    pub UpdateTensorRTProviderOptions: Reserved,
    pub GetTensorRTProviderOptionsAsString: Reserved,
    pub ReleaseTensorRTProviderOptions: Reserved,
    pub EnableOrtCustomOps: Reserved,
    pub RegisterAllocator: Reserved,
    pub UnregisterAllocator: Reserved,
    pub IsSparseTensor: Reserved,
    pub CreateSparseTensorAsOrtValue: Reserved,
    pub FillSparseTensorCoo: Reserved,
    pub FillSparseTensorCsr: Reserved,
    pub FillSparseTensorBlockSparse: Reserved,
    pub CreateSparseTensorWithValuesAsOrtValue: Reserved,
    pub UseCooIndices: Reserved,
    pub UseCsrIndices: Reserved,
    pub UseBlockSparseIndices: Reserved,
    pub GetSparseTensorFormat: Reserved,
    pub GetSparseTensorValuesTypeAndShape: Reserved,
    pub GetSparseTensorValues: Reserved,
    pub GetSparseTensorIndicesTypeShape: Reserved,
    pub GetSparseTensorIndices: Reserved,
    pub HasValue: Reserved,
    pub KernelContext_GetGPUComputeStream: Reserved,
    pub GetTensorMemoryInfo: Reserved,
    pub GetExecutionProviderApi: Reserved,
    pub SessionOptionsSetCustomCreateThreadFn: Reserved,
    pub SessionOptionsSetCustomThreadCreationOptions: Reserved,
    pub SessionOptionsSetCustomJoinThreadFn: Reserved,
    pub SetGlobalCustomCreateThreadFn: Reserved,
    pub SetGlobalCustomThreadCreationOptions: Reserved,
    pub SetGlobalCustomJoinThreadFn: Reserved,
    pub SynchronizeBoundInputs: Reserved,
    pub SynchronizeBoundOutputs: Reserved,
    pub SessionOptionsAppendExecutionProvider_CUDA_V2: Option<
        unsafe extern "C" fn(
            options: *mut OrtSessionOptions,
            cuda_options: *const OrtCUDAProviderOptionsV2,
        ) -> OrtStatusPtr,
    >,
    pub CreateCUDAProviderOptions:
        Option<unsafe extern "C" fn(out: *mut *mut OrtCUDAProviderOptionsV2) -> OrtStatusPtr>,
    pub UpdateCUDAProviderOptions: Reserved,
    pub GetCUDAProviderOptionsAsString: Reserved,
    pub ReleaseCUDAProviderOptions:
        Option<unsafe extern "C" fn(options: *mut OrtCUDAProviderOptionsV2)>,
}

impl OrtApi {
    /// A table with every entry unset. Callers fill in the entries they
    /// implement; used to stand up in-process engines.
    pub fn empty() -> Self {
        // SAFETY: every field is an `Option` of a function pointer, for
        // which the all-zero bit pattern is `None`.
        unsafe { std::mem::zeroed() }
    }
}
