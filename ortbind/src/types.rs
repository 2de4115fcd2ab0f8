//! Element types, shapes and the recursive type-info decoder.

use std::ffi::CStr;
use std::fmt;
use std::os::raw::c_char;
use std::ptr;

use serde::{Deserialize, Serialize};

use crate::api::ortsys;
use crate::error::{OrtError, Result};
use crate::ffi::{self, OrtApi, OrtTensorTypeAndShapeInfo, OrtTypeInfo, OrtValue};
use crate::handle::Handle;

// ---------------------------------------------------------------------------
// ElementType
// ---------------------------------------------------------------------------

/// Tensor element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Float,
    Uint8,
    Int8,
    Uint16,
    Int16,
    Int32,
    Int64,
    String,
    Bool,
    Float16,
    Double,
    Uint32,
    Uint64,
    Complex64,
    Complex128,
    Bfloat16,
}

impl ElementType {
    pub fn from_raw(raw: ffi::ONNXTensorElementDataType) -> Result<Self> {
        Ok(match raw {
            ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_FLOAT => ElementType::Float,
            ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_UINT8 => ElementType::Uint8,
            ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_INT8 => ElementType::Int8,
            ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_UINT16 => ElementType::Uint16,
            ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_INT16 => ElementType::Int16,
            ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_INT32 => ElementType::Int32,
            ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_INT64 => ElementType::Int64,
            ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_STRING => ElementType::String,
            ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_BOOL => ElementType::Bool,
            ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_FLOAT16 => ElementType::Float16,
            ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_DOUBLE => ElementType::Double,
            ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_UINT32 => ElementType::Uint32,
            ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_UINT64 => ElementType::Uint64,
            ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_COMPLEX64 => ElementType::Complex64,
            ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_COMPLEX128 => ElementType::Complex128,
            ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_BFLOAT16 => ElementType::Bfloat16,
            other => return Err(OrtError::unsupported("element", other)),
        })
    }

    pub fn as_raw(self) -> ffi::ONNXTensorElementDataType {
        match self {
            ElementType::Float => ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_FLOAT,
            ElementType::Uint8 => ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_UINT8,
            ElementType::Int8 => ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_INT8,
            ElementType::Uint16 => ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_UINT16,
            ElementType::Int16 => ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_INT16,
            ElementType::Int32 => ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_INT32,
            ElementType::Int64 => ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_INT64,
            ElementType::String => ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_STRING,
            ElementType::Bool => ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_BOOL,
            ElementType::Float16 => ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_FLOAT16,
            ElementType::Double => ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_DOUBLE,
            ElementType::Uint32 => ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_UINT32,
            ElementType::Uint64 => ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_UINT64,
            ElementType::Complex64 => ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_COMPLEX64,
            ElementType::Complex128 => ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_COMPLEX128,
            ElementType::Bfloat16 => ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_BFLOAT16,
        }
    }

    /// ONNX name, as used in `tensor(float)`.
    pub fn name(self) -> &'static str {
        match self {
            ElementType::Float => "float",
            ElementType::Uint8 => "uint8",
            ElementType::Int8 => "int8",
            ElementType::Uint16 => "uint16",
            ElementType::Int16 => "int16",
            ElementType::Int32 => "int32",
            ElementType::Int64 => "int64",
            ElementType::String => "string",
            ElementType::Bool => "bool",
            ElementType::Float16 => "float16",
            ElementType::Double => "double",
            ElementType::Uint32 => "uint32",
            ElementType::Uint64 => "uint64",
            ElementType::Complex64 => "complex64",
            ElementType::Complex128 => "complex128",
            ElementType::Bfloat16 => "bfloat16",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// TypeDescriptor
// ---------------------------------------------------------------------------

/// One declared dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dim {
    Fixed(u64),
    /// Free dimension with a name, e.g. `batch`.
    Symbolic(String),
    /// Free dimension without a name.
    Free,
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dim::Fixed(n) => write!(f, "{n}"),
            Dim::Symbolic(name) => f.write_str(name),
            Dim::Free => f.write_str("?"),
        }
    }
}

/// Type of a model input or output, or of a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeDescriptor {
    Tensor {
        element_type: ElementType,
        shape: Vec<Dim>,
    },
    Sequence(Box<TypeDescriptor>),
    Map {
        key_type: ElementType,
        value: Box<TypeDescriptor>,
    },
}

impl TypeDescriptor {
    pub fn element_type(&self) -> Option<ElementType> {
        match self {
            TypeDescriptor::Tensor { element_type, .. } => Some(*element_type),
            _ => None,
        }
    }

    /// Declared shape for tensors, empty for sequences and maps.
    pub fn shape(&self) -> &[Dim] {
        match self {
            TypeDescriptor::Tensor { shape, .. } => shape,
            _ => &[],
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Tensor { element_type, .. } => write!(f, "tensor({element_type})"),
            TypeDescriptor::Sequence(element) => write!(f, "seq({element})"),
            TypeDescriptor::Map { key_type, value } => write!(f, "map({key_type},{value})"),
        }
    }
}

/// A declared model input or output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoSignature {
    pub name: String,
    #[serde(flatten)]
    pub descriptor: TypeDescriptor,
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// Decodes a type-info handle. The caller keeps ownership of `type_info`.
pub fn decode(api: &OrtApi, type_info: *const OrtTypeInfo) -> Result<TypeDescriptor> {
    let mut onnx_type = ffi::ONNX_TYPE_UNKNOWN;
    ortsys!(api, GetOnnxTypeFromTypeInfo(type_info, &mut onnx_type))?;

    match onnx_type {
        ffi::ONNX_TYPE_TENSOR => {
            // Borrowed view into `type_info`.
            let mut info = ptr::null();
            ortsys!(api, CastTypeInfoToTensorInfo(type_info, &mut info))?;
            if info.is_null() {
                return Err(OrtError::unsupported("onnx", "tensor without shape info"));
            }
            let element_type = tensor_element_type(api, info)?;
            let shape = declared_shape(api, info)?;
            Ok(TypeDescriptor::Tensor {
                element_type,
                shape,
            })
        }
        ffi::ONNX_TYPE_SEQUENCE => {
            // Borrowed view; the element type-info is a new object.
            let mut sequence = ptr::null();
            ortsys!(api, CastTypeInfoToSequenceTypeInfo(type_info, &mut sequence))?;
            let mut element = ptr::null_mut();
            ortsys!(api, GetSequenceElementType(sequence, &mut element))?;
            let element = Handle::new(api, element);
            Ok(TypeDescriptor::Sequence(Box::new(decode(api, element.as_ptr())?)))
        }
        ffi::ONNX_TYPE_MAP => {
            // Borrowed view; the value type-info is a new object.
            let mut map = ptr::null();
            ortsys!(api, CastTypeInfoToMapTypeInfo(type_info, &mut map))?;
            let mut key = ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_UNDEFINED;
            ortsys!(api, GetMapKeyType(map, &mut key))?;
            let key_type = ElementType::from_raw(key)?;
            let mut value = ptr::null_mut();
            ortsys!(api, GetMapValueType(map, &mut value))?;
            let value = Handle::new(api, value);
            Ok(TypeDescriptor::Map {
                key_type,
                value: Box::new(decode(api, value.as_ptr())?),
            })
        }
        other => Err(OrtError::unsupported("onnx", onnx_type_name(other))),
    }
}

/// Decodes the type of a value.
pub(crate) fn decode_value(api: &OrtApi, value: *const OrtValue) -> Result<TypeDescriptor> {
    let mut type_info = ptr::null_mut();
    ortsys!(api, GetTypeInfo(value, &mut type_info))?;
    let type_info = Handle::new(api, type_info);
    decode(api, type_info.as_ptr())
}

pub(crate) fn tensor_element_type(
    api: &OrtApi,
    info: *const OrtTensorTypeAndShapeInfo,
) -> Result<ElementType> {
    let mut raw = ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_UNDEFINED;
    ortsys!(api, GetTensorElementType(info, &mut raw))?;
    ElementType::from_raw(raw)
}

/// Concrete dimensions; negative entries are free dimensions.
pub(crate) fn tensor_dims(api: &OrtApi, info: *const OrtTensorTypeAndShapeInfo) -> Result<Vec<i64>> {
    let mut count = 0usize;
    ortsys!(api, GetDimensionsCount(info, &mut count))?;
    let mut dims = vec![0i64; count];
    if count > 0 {
        ortsys!(api, GetDimensions(info, dims.as_mut_ptr(), count))?;
    }
    Ok(dims)
}

fn declared_shape(api: &OrtApi, info: *const OrtTensorTypeAndShapeInfo) -> Result<Vec<Dim>> {
    let dims = tensor_dims(api, info)?;
    let mut symbolic: Vec<*const c_char> = vec![ptr::null(); dims.len()];
    if !dims.is_empty() {
        ortsys!(api, GetSymbolicDimensions(info, symbolic.as_mut_ptr(), symbolic.len()))?;
    }

    Ok(dims
        .iter()
        .zip(&symbolic)
        .map(|(&dim, &name)| {
            let name = if name.is_null() {
                ""
            } else {
                unsafe { CStr::from_ptr(name) }.to_str().unwrap_or("")
            };
            if !name.is_empty() {
                Dim::Symbolic(name.to_string())
            } else if dim >= 0 {
                Dim::Fixed(dim as u64)
            } else {
                Dim::Free
            }
        })
        .collect())
}

fn onnx_type_name(tag: ffi::ONNXType) -> String {
    match tag {
        ffi::ONNX_TYPE_UNKNOWN => "unknown".to_string(),
        ffi::ONNX_TYPE_OPAQUE => "opaque".to_string(),
        ffi::ONNX_TYPE_SPARSETENSOR => "sparse_tensor".to_string(),
        ffi::ONNX_TYPE_OPTIONAL => "optional".to_string(),
        other => format!("onnx type {other}"),
    }
}
