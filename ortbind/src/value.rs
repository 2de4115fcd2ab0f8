//! Host-side values and owned native values.

use std::any::Any;
use std::fmt;
use std::ptr;

use ndarray::ArrayD;

use crate::api::{Api, ortsys};
use crate::codec;
use crate::error::Result;
use crate::ffi::{self, OrtValue};
use crate::handle::Handle;
use crate::options::OutputKind;
use crate::types::{self, ElementType, TypeDescriptor};

// ---------------------------------------------------------------------------
// HostValue
// ---------------------------------------------------------------------------

/// A value on the Rust side of the boundary.
///
/// Tensors are nested `Array`s with scalars at the leaves, or a pre-shaped
/// [`TensorBuffer`]. Maps keep the key tensor's order.
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Float(f32),
    Double(f64),
    String(String),
    /// String element that is not valid UTF-8.
    Bytes(Vec<u8>),
    Array(Vec<HostValue>),
    Map(Vec<(i64, HostValue)>),
    Buffer(TensorBuffer),
}

impl HostValue {
    pub fn as_array(&self) -> Option<&[HostValue]> {
        match self {
            HostValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(i64, HostValue)]> {
        match self {
            HostValue::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            HostValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_buffer(&self) -> Option<&TensorBuffer> {
        match self {
            HostValue::Buffer(buffer) => Some(buffer),
            _ => None,
        }
    }

    /// Lengths of the first element at each nesting level.
    pub fn nested_shape(&self) -> Vec<usize> {
        let mut shape = Vec::new();
        let mut current = self;
        while let HostValue::Array(items) = current {
            shape.push(items.len());
            match items.first() {
                Some(first) => current = first,
                None => break,
            }
        }
        shape
    }
}

macro_rules! host_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for HostValue {
                fn from(v: $ty) -> Self {
                    HostValue::$variant(v)
                }
            }
        )*
    };
}

host_from! {
    bool => Bool,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => Uint8,
    u16 => Uint16,
    u32 => Uint32,
    u64 => Uint64,
    f32 => Float,
    f64 => Double,
    String => String,
    TensorBuffer => Buffer,
}

impl From<&str> for HostValue {
    fn from(v: &str) -> Self {
        HostValue::String(v.to_string())
    }
}

impl<T: Into<HostValue>> From<Vec<T>> for HostValue {
    fn from(items: Vec<T>) -> Self {
        HostValue::Array(items.into_iter().map(Into::into).collect())
    }
}

// ---------------------------------------------------------------------------
// TensorBuffer
// ---------------------------------------------------------------------------

/// A pre-shaped, row-major tensor buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum TensorBuffer {
    Bool(ArrayD<bool>),
    Int8(ArrayD<i8>),
    Int16(ArrayD<i16>),
    Int32(ArrayD<i32>),
    Int64(ArrayD<i64>),
    Uint8(ArrayD<u8>),
    Uint16(ArrayD<u16>),
    Uint32(ArrayD<u32>),
    Uint64(ArrayD<u64>),
    Float(ArrayD<f32>),
    Double(ArrayD<f64>),
    String(ArrayD<String>),
}

macro_rules! each_buffer {
    ($buffer:expr, $array:ident => $body:expr) => {
        match $buffer {
            TensorBuffer::Bool($array) => $body,
            TensorBuffer::Int8($array) => $body,
            TensorBuffer::Int16($array) => $body,
            TensorBuffer::Int32($array) => $body,
            TensorBuffer::Int64($array) => $body,
            TensorBuffer::Uint8($array) => $body,
            TensorBuffer::Uint16($array) => $body,
            TensorBuffer::Uint32($array) => $body,
            TensorBuffer::Uint64($array) => $body,
            TensorBuffer::Float($array) => $body,
            TensorBuffer::Double($array) => $body,
            TensorBuffer::String($array) => $body,
        }
    };
}

impl TensorBuffer {
    pub fn element_type(&self) -> ElementType {
        match self {
            TensorBuffer::Bool(_) => ElementType::Bool,
            TensorBuffer::Int8(_) => ElementType::Int8,
            TensorBuffer::Int16(_) => ElementType::Int16,
            TensorBuffer::Int32(_) => ElementType::Int32,
            TensorBuffer::Int64(_) => ElementType::Int64,
            TensorBuffer::Uint8(_) => ElementType::Uint8,
            TensorBuffer::Uint16(_) => ElementType::Uint16,
            TensorBuffer::Uint32(_) => ElementType::Uint32,
            TensorBuffer::Uint64(_) => ElementType::Uint64,
            TensorBuffer::Float(_) => ElementType::Float,
            TensorBuffer::Double(_) => ElementType::Double,
            TensorBuffer::String(_) => ElementType::String,
        }
    }

    pub fn shape(&self) -> &[usize] {
        each_buffer!(self, array => array.shape())
    }

    pub fn len(&self) -> usize {
        each_buffer!(self, array => array.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Elements in row-major order.
    pub fn elements(&self) -> Vec<HostValue> {
        each_buffer!(self, array => array.iter().map(|v| HostValue::from(v.clone())).collect())
    }

    /// Nested arrays with the same shape.
    pub fn to_nested(&self) -> HostValue {
        codec::nest(self.shape(), self.elements())
    }
}

// ---------------------------------------------------------------------------
// NativeValue
// ---------------------------------------------------------------------------

/// An owned native value.
///
/// Tensors created over a Rust buffer keep that buffer in `backing`; the
/// handle is declared first so it is released before the buffer is freed.
pub struct NativeValue {
    handle: Handle<OrtValue>,
    backing: Option<Box<dyn Any + Send>>,
    api: &'static Api,
}

// OrtValue carries no thread affinity. Not Sync: concurrent reads race with
// release.
unsafe impl Send for NativeValue {}

impl NativeValue {
    pub(crate) fn from_raw(api: &'static Api, ptr: *mut OrtValue) -> Self {
        Self {
            handle: Handle::new(api, ptr),
            backing: None,
            api,
        }
    }

    pub(crate) fn with_backing(
        api: &'static Api,
        ptr: *mut OrtValue,
        backing: Box<dyn Any + Send>,
    ) -> Self {
        Self {
            handle: Handle::new(api, ptr),
            backing: Some(backing),
            api,
        }
    }

    /// Encodes nested host data as a tensor of `element_type`.
    pub fn from_host(api: &'static Api, value: &HostValue, element_type: ElementType) -> Result<Self> {
        codec::encode(api, value, element_type)
    }

    /// Encodes a buffer with its own element type and shape.
    pub fn from_buffer(api: &'static Api, buffer: TensorBuffer) -> Result<Self> {
        let element_type = buffer.element_type();
        codec::encode(api, &HostValue::Buffer(buffer), element_type)
    }

    pub fn as_ptr(&self) -> *mut OrtValue {
        self.handle.as_ptr()
    }

    pub(crate) fn api(&self) -> &'static Api {
        self.api
    }

    /// Whether the tensor views a Rust-owned buffer.
    pub fn has_backing(&self) -> bool {
        self.backing.is_some()
    }

    pub fn is_tensor(&self) -> Result<bool> {
        let mut out = 0;
        ortsys!(self.api, IsTensor(self.as_ptr(), &mut out))?;
        Ok(out == 1)
    }

    pub fn data_type(&self) -> Result<TypeDescriptor> {
        types::decode_value(self.api, self.as_ptr())
    }

    pub fn element_type(&self) -> Result<ElementType> {
        let info = self.tensor_info()?;
        types::tensor_element_type(self.api, info.as_ptr())
    }

    pub fn shape(&self) -> Result<Vec<i64>> {
        let info = self.tensor_info()?;
        types::tensor_dims(self.api, info.as_ptr())
    }

    pub fn device_name(&self) -> &'static str {
        "cpu"
    }

    pub fn to_host(&self) -> Result<HostValue> {
        codec::decode(self, OutputKind::Nested)
    }

    pub fn to_buffer(&self) -> Result<TensorBuffer> {
        codec::decode_buffer(self)
    }

    fn tensor_info(&self) -> Result<Handle<ffi::OrtTensorTypeAndShapeInfo>> {
        let mut info = ptr::null_mut();
        ortsys!(self.api, GetTensorTypeAndShape(self.as_ptr(), &mut info))?;
        Ok(Handle::new(self.api, info))
    }
}

impl fmt::Debug for NativeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeValue")
            .field("ptr", &self.handle.as_ptr())
            .field("backed", &self.has_backing())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One entry of a run's input feed.
#[derive(Debug)]
pub enum Input<'a> {
    /// Encoded with the element type the model declares for the input.
    Host(HostValue),
    /// Passed through as is.
    Value(&'a NativeValue),
}

impl From<HostValue> for Input<'_> {
    fn from(value: HostValue) -> Self {
        Input::Host(value)
    }
}

impl From<TensorBuffer> for Input<'_> {
    fn from(buffer: TensorBuffer) -> Self {
        Input::Host(HostValue::Buffer(buffer))
    }
}

impl<'a> From<&'a NativeValue> for Input<'a> {
    fn from(value: &'a NativeValue) -> Self {
        Input::Value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock;
    use ndarray::IxDyn;

    #[test]
    fn nested_shape_follows_first_elements() {
        let v = HostValue::from(vec![vec![1.0f32, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
        assert_eq!(v.nested_shape(), vec![2, 3]);
        assert_eq!(HostValue::from(1i64).nested_shape(), Vec::<usize>::new());
        assert_eq!(HostValue::Array(vec![]).nested_shape(), vec![0]);
    }

    #[test]
    fn buffer_to_nested() {
        let array = ArrayD::from_shape_vec(IxDyn(&[2, 2]), vec![1i32, 2, 3, 4]).unwrap();
        let nested = TensorBuffer::Int32(array).to_nested();
        assert_eq!(nested, HostValue::from(vec![vec![1i32, 2], vec![3, 4]]));
    }

    #[test]
    fn introspection() {
        let engine = mock::lock();
        let value = NativeValue::from_host(
            engine.api(),
            &HostValue::from(vec![vec![1.0f32, 2.0, 3.0]]),
            ElementType::Float,
        )
        .unwrap();

        assert!(value.is_tensor().unwrap());
        assert!(value.has_backing());
        assert_eq!(value.element_type().unwrap(), ElementType::Float);
        assert_eq!(value.shape().unwrap(), vec![1, 3]);
        assert_eq!(value.data_type().unwrap().to_string(), "tensor(float)");
        assert_eq!(value.device_name(), "cpu");

        drop(value);
        assert_eq!(engine.leaks(), Vec::<&str>::new());
    }

    #[test]
    fn from_buffer_uses_buffer_type() {
        let engine = mock::lock();
        let array = ArrayD::from_shape_vec(IxDyn(&[3]), vec![1.5f64, 2.5, 3.5]).unwrap();
        let buffer = TensorBuffer::Double(array);
        let value = NativeValue::from_buffer(engine.api(), buffer.clone()).unwrap();
        assert_eq!(value.element_type().unwrap(), ElementType::Double);
        assert_eq!(value.to_buffer().unwrap(), buffer);
    }
}
