//! Tensor codec: host values to native tensors and back.
//!
//! Encoding is keyed by the element type the model declares, never by what
//! the host value happens to hold. Numeric tensors view a Rust-owned buffer
//! that the returned [`NativeValue`] keeps alive; string tensors are
//! allocated by the engine and filled through `FillStringTensor`.
//!
//! Decoding recurses over tensors, sequences and maps. Tensors come back
//! row-major: the last dimension varies fastest.

use std::ffi::CString;
use std::mem;
use std::os::raw::{c_char, c_int};
use std::ptr;

use ndarray::{ArrayD, IxDyn};

use crate::api::{Api, ortsys};
use crate::error::{OrtError, Result};
use crate::ffi::{self, OrtValue};
use crate::handle::Handle;
use crate::options::OutputKind;
use crate::types::{self, ElementType};
use crate::value::{HostValue, NativeValue, TensorBuffer};

// ---------------------------------------------------------------------------
// Element dispatch
// ---------------------------------------------------------------------------

/// A numeric element with a fixed native width.
trait Element: Copy + Default + Send + 'static {
    const TYPE: ElementType;

    fn from_host(value: &HostValue) -> Option<Self>;

    /// Elements of a buffer of the same type, row-major.
    fn from_buffer(buffer: &TensorBuffer) -> Option<Vec<Self>>;

    fn into_buffer(array: ArrayD<Self>) -> TensorBuffer;
}

macro_rules! element {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Element for $ty {
                const TYPE: ElementType = ElementType::$variant;

                fn from_host(value: &HostValue) -> Option<Self> {
                    Some(match *value {
                        HostValue::Int8(v) => v as $ty,
                        HostValue::Int16(v) => v as $ty,
                        HostValue::Int32(v) => v as $ty,
                        HostValue::Int64(v) => v as $ty,
                        HostValue::Uint8(v) => v as $ty,
                        HostValue::Uint16(v) => v as $ty,
                        HostValue::Uint32(v) => v as $ty,
                        HostValue::Uint64(v) => v as $ty,
                        HostValue::Float(v) => v as $ty,
                        HostValue::Double(v) => v as $ty,
                        _ => return None,
                    })
                }

                fn from_buffer(buffer: &TensorBuffer) -> Option<Vec<Self>> {
                    match buffer {
                        TensorBuffer::$variant(array) => Some(array.iter().copied().collect()),
                        _ => None,
                    }
                }

                fn into_buffer(array: ArrayD<Self>) -> TensorBuffer {
                    TensorBuffer::$variant(array)
                }
            }
        )*
    };
}

element! {
    f32 => Float,
    f64 => Double,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => Uint8,
    u16 => Uint16,
    u32 => Uint32,
    u64 => Uint64,
}

/// Booleans travel as one byte per element.
fn bool_byte(value: &HostValue) -> Option<u8> {
    match *value {
        HostValue::Bool(b) => Some(b as u8),
        ref other => f64::from_host(other).map(|v| (v != 0.0) as u8),
    }
}

fn mismatch(value: &HostValue, element_type: ElementType) -> OrtError {
    OrtError::Argument(format!(
        "cannot encode {} as tensor({element_type})",
        host_kind(value)
    ))
}

fn host_kind(value: &HostValue) -> &'static str {
    match value {
        HostValue::Bool(_) => "bool",
        HostValue::Int8(_) => "int8",
        HostValue::Int16(_) => "int16",
        HostValue::Int32(_) => "int32",
        HostValue::Int64(_) => "int64",
        HostValue::Uint8(_) => "uint8",
        HostValue::Uint16(_) => "uint16",
        HostValue::Uint32(_) => "uint32",
        HostValue::Uint64(_) => "uint64",
        HostValue::Float(_) => "float",
        HostValue::Double(_) => "double",
        HostValue::String(_) => "string",
        HostValue::Bytes(_) => "bytes",
        HostValue::Array(_) => "array",
        HostValue::Map(_) => "map",
        HostValue::Buffer(_) => "buffer",
    }
}

// ---------------------------------------------------------------------------
// Encode
// ---------------------------------------------------------------------------

/// Encodes `value` as a tensor of `element_type`.
///
/// The shape comes from the first element at each nesting level, or from
/// the buffer itself. Every level must match it.
pub fn encode(api: &'static Api, value: &HostValue, element_type: ElementType) -> Result<NativeValue> {
    if let HostValue::Buffer(buffer) = value {
        return encode_buffer(api, buffer, element_type);
    }

    let shape = value.nested_shape();
    let mut leaves = Vec::new();
    flatten(value, &shape, 0, &mut leaves)?;

    match element_type {
        ElementType::Float => encode_numeric::<f32>(api, &shape, &leaves),
        ElementType::Double => encode_numeric::<f64>(api, &shape, &leaves),
        ElementType::Int8 => encode_numeric::<i8>(api, &shape, &leaves),
        ElementType::Int16 => encode_numeric::<i16>(api, &shape, &leaves),
        ElementType::Int32 => encode_numeric::<i32>(api, &shape, &leaves),
        ElementType::Int64 => encode_numeric::<i64>(api, &shape, &leaves),
        ElementType::Uint8 => encode_numeric::<u8>(api, &shape, &leaves),
        ElementType::Uint16 => encode_numeric::<u16>(api, &shape, &leaves),
        ElementType::Uint32 => encode_numeric::<u32>(api, &shape, &leaves),
        ElementType::Uint64 => encode_numeric::<u64>(api, &shape, &leaves),
        ElementType::Bool => encode_bools(api, &shape, &leaves),
        ElementType::String => encode_strings(api, &shape, &leaves),
        other => Err(OrtError::unsupported("element", other)),
    }
}

fn encode_buffer(api: &'static Api, buffer: &TensorBuffer, element_type: ElementType) -> Result<NativeValue> {
    let shape = buffer.shape().to_vec();
    match element_type {
        ElementType::Float => buffer_numeric::<f32>(api, buffer),
        ElementType::Double => buffer_numeric::<f64>(api, buffer),
        ElementType::Int8 => buffer_numeric::<i8>(api, buffer),
        ElementType::Int16 => buffer_numeric::<i16>(api, buffer),
        ElementType::Int32 => buffer_numeric::<i32>(api, buffer),
        ElementType::Int64 => buffer_numeric::<i64>(api, buffer),
        ElementType::Uint8 => buffer_numeric::<u8>(api, buffer),
        ElementType::Uint16 => buffer_numeric::<u16>(api, buffer),
        ElementType::Uint32 => buffer_numeric::<u32>(api, buffer),
        ElementType::Uint64 => buffer_numeric::<u64>(api, buffer),
        ElementType::Bool | ElementType::String => {
            let elements = buffer.elements();
            let leaves: Vec<&HostValue> = elements.iter().collect();
            if element_type == ElementType::Bool {
                encode_bools(api, &shape, &leaves)
            } else {
                encode_strings(api, &shape, &leaves)
            }
        }
        other => Err(OrtError::unsupported("element", other)),
    }
}

/// Collects leaves row-major, checking every level against `shape`.
fn flatten<'v>(
    value: &'v HostValue,
    shape: &[usize],
    depth: usize,
    out: &mut Vec<&'v HostValue>,
) -> Result<()> {
    match value {
        HostValue::Array(items) => {
            if shape.get(depth) != Some(&items.len()) {
                return Err(OrtError::Argument(format!(
                    "jagged input: expected shape {shape:?}, found {} elements at depth {depth}",
                    items.len()
                )));
            }
            for item in items {
                flatten(item, shape, depth + 1, out)?;
            }
            Ok(())
        }
        HostValue::Map(_) | HostValue::Buffer(_) => Err(OrtError::unsupported("input", host_kind(value))),
        leaf => {
            if depth != shape.len() {
                return Err(OrtError::Argument(format!(
                    "jagged input: expected shape {shape:?}, found a scalar at depth {depth}"
                )));
            }
            out.push(leaf);
            Ok(())
        }
    }
}

fn encode_numeric<T: Element>(api: &'static Api, shape: &[usize], leaves: &[&HostValue]) -> Result<NativeValue> {
    let data = leaves
        .iter()
        .map(|v| T::from_host(v).ok_or_else(|| mismatch(v, T::TYPE)))
        .collect::<Result<Vec<T>>>()?;
    with_data(api, T::TYPE, shape, data)
}

fn encode_bools(api: &'static Api, shape: &[usize], leaves: &[&HostValue]) -> Result<NativeValue> {
    let data = leaves
        .iter()
        .map(|v| bool_byte(v).ok_or_else(|| mismatch(v, ElementType::Bool)))
        .collect::<Result<Vec<u8>>>()?;
    with_data(api, ElementType::Bool, shape, data)
}

fn buffer_numeric<T: Element>(api: &'static Api, buffer: &TensorBuffer) -> Result<NativeValue> {
    let shape = buffer.shape().to_vec();
    match T::from_buffer(buffer) {
        Some(data) => with_data(api, T::TYPE, &shape, data),
        None => {
            let elements = buffer.elements();
            let leaves: Vec<&HostValue> = elements.iter().collect();
            encode_numeric::<T>(api, &shape, &leaves)
        }
    }
}

/// Creates a tensor over `data`, which moves into the returned value.
fn with_data<T: Send + 'static>(
    api: &'static Api,
    element_type: ElementType,
    shape: &[usize],
    mut data: Vec<T>,
) -> Result<NativeValue> {
    let dims = dims(shape);
    let memory_info = api.cpu_memory_info()?;
    let mut raw = ptr::null_mut();
    ortsys!(
        api,
        CreateTensorWithDataAsOrtValue(
            memory_info.as_ptr(),
            data.as_mut_ptr().cast(),
            data.len() * mem::size_of::<T>(),
            dims.as_ptr(),
            dims.len(),
            element_type.as_raw(),
            &mut raw,
        )
    )?;
    // Moving the Vec does not move its heap buffer.
    Ok(NativeValue::with_backing(api, raw, Box::new(data)))
}

fn encode_strings(api: &'static Api, shape: &[usize], leaves: &[&HostValue]) -> Result<NativeValue> {
    let strings = leaves
        .iter()
        .map(|v| {
            let bytes = match v {
                HostValue::String(s) => s.as_bytes().to_vec(),
                HostValue::Bytes(b) => b.clone(),
                other => return Err(mismatch(other, ElementType::String)),
            };
            CString::new(bytes).map_err(|e| OrtError::Argument(format!("string element contains NUL: {e}")))
        })
        .collect::<Result<Vec<CString>>>()?;
    // Must outlive the FillStringTensor call.
    let pointers: Vec<*const c_char> = strings.iter().map(|s| s.as_ptr()).collect();

    let dims = dims(shape);
    let allocator = api.allocator()?;
    let mut raw = ptr::null_mut();
    ortsys!(
        api,
        CreateTensorAsOrtValue(
            allocator.as_ptr(),
            dims.as_ptr(),
            dims.len(),
            ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_STRING,
            &mut raw,
        )
    )?;
    let value = NativeValue::from_raw(api, raw);
    ortsys!(api, FillStringTensor(value.as_ptr(), pointers.as_ptr(), pointers.len()))?;
    Ok(value)
}

fn dims(shape: &[usize]) -> Vec<i64> {
    shape.iter().map(|&d| d as i64).collect()
}

// ---------------------------------------------------------------------------
// Decode
// ---------------------------------------------------------------------------

/// Decodes a native value into host form.
pub fn decode(value: &NativeValue, kind: OutputKind) -> Result<HostValue> {
    decode_raw(value.api(), value.as_ptr(), kind)
}

/// Decodes a tensor value into a buffer.
pub fn decode_buffer(value: &NativeValue) -> Result<TensorBuffer> {
    match decode_raw(value.api(), value.as_ptr(), OutputKind::Buffer)? {
        HostValue::Buffer(buffer) => Ok(buffer),
        other => Err(OrtError::Argument(format!(
            "value is not a tensor ({})",
            host_kind(&other)
        ))),
    }
}

fn decode_raw(api: &'static Api, value: *const OrtValue, kind: OutputKind) -> Result<HostValue> {
    let mut onnx_type = ffi::ONNX_TYPE_UNKNOWN;
    ortsys!(api, GetValueType(value, &mut onnx_type))?;

    match onnx_type {
        ffi::ONNX_TYPE_TENSOR => decode_tensor(api, value, kind),
        ffi::ONNX_TYPE_SEQUENCE => {
            let mut count = 0usize;
            ortsys!(api, GetValueCount(value, &mut count))?;
            let items = (0..count)
                .map(|i| {
                    let item = child(api, value, i)?;
                    decode_raw(api, item.as_ptr(), kind)
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(HostValue::Array(items))
        }
        ffi::ONNX_TYPE_MAP => decode_map(api, value, kind),
        other => Err(OrtError::unsupported("onnx", other)),
    }
}

fn decode_map(api: &'static Api, value: *const OrtValue, kind: OutputKind) -> Result<HostValue> {
    let keys = child(api, value, 0)?;
    let values = child(api, value, 1)?;

    let (key_type, key_shape) = tensor_layout(api, keys.as_ptr())?;
    if key_type != ElementType::Int64 {
        return Err(OrtError::unsupported("map key", key_type));
    }
    let count = key_shape.iter().product();
    let keys = read_numeric::<i64>(api, keys.as_ptr(), count)?;

    // Values are a 1-D tensor, one element per key.
    let values = match decode_raw(api, values.as_ptr(), kind)? {
        HostValue::Array(items) => items,
        HostValue::Buffer(buffer) => buffer.elements(),
        scalar => vec![scalar],
    };
    Ok(HostValue::Map(keys.into_iter().zip(values).collect()))
}

fn decode_tensor(api: &'static Api, value: *const OrtValue, kind: OutputKind) -> Result<HostValue> {
    let (element_type, shape) = tensor_layout(api, value)?;
    let count: usize = shape.iter().product();

    macro_rules! numeric {
        ($ty:ty) => {{
            let data = read_numeric::<$ty>(api, value, count)?;
            match kind {
                OutputKind::Buffer => HostValue::Buffer(<$ty>::into_buffer(to_array(&shape, data)?)),
                OutputKind::Nested => nest(&shape, data.into_iter().map(HostValue::from).collect()),
            }
        }};
    }

    Ok(match element_type {
        ElementType::Float => numeric!(f32),
        ElementType::Double => numeric!(f64),
        ElementType::Int8 => numeric!(i8),
        ElementType::Int16 => numeric!(i16),
        ElementType::Int32 => numeric!(i32),
        ElementType::Int64 => numeric!(i64),
        ElementType::Uint8 => numeric!(u8),
        ElementType::Uint16 => numeric!(u16),
        ElementType::Uint32 => numeric!(u32),
        ElementType::Uint64 => numeric!(u64),
        ElementType::Bool => {
            let data: Vec<bool> = read_numeric::<u8>(api, value, count)?
                .into_iter()
                .map(|b| b != 0)
                .collect();
            match kind {
                OutputKind::Buffer => HostValue::Buffer(TensorBuffer::Bool(to_array(&shape, data)?)),
                OutputKind::Nested => nest(&shape, data.into_iter().map(HostValue::Bool).collect()),
            }
        }
        ElementType::String => {
            let strings = read_strings(api, value, count)?;
            match kind {
                OutputKind::Buffer => {
                    let data = strings
                        .into_iter()
                        .map(|b| String::from_utf8_lossy(&b).into_owned())
                        .collect();
                    HostValue::Buffer(TensorBuffer::String(to_array(&shape, data)?))
                }
                OutputKind::Nested => {
                    let leaves = strings
                        .into_iter()
                        .map(|b| match String::from_utf8(b) {
                            Ok(s) => HostValue::String(s),
                            Err(e) => HostValue::Bytes(e.into_bytes()),
                        })
                        .collect();
                    nest(&shape, leaves)
                }
            }
        }
        other => return Err(OrtError::unsupported("element", other)),
    })
}

/// Element type and concrete shape of a tensor value.
fn tensor_layout(api: &'static Api, value: *const OrtValue) -> Result<(ElementType, Vec<usize>)> {
    let mut info = ptr::null_mut();
    ortsys!(api, GetTensorTypeAndShape(value, &mut info))?;
    let info = Handle::new(api, info);
    let element_type = types::tensor_element_type(api, info.as_ptr())?;
    let shape = types::tensor_dims(api, info.as_ptr())?
        .into_iter()
        .map(|d| d.max(0) as usize)
        .collect();
    Ok((element_type, shape))
}

fn read_numeric<T: Copy + Default>(api: &'static Api, value: *const OrtValue, count: usize) -> Result<Vec<T>> {
    let mut out = vec![T::default(); count];
    if count == 0 {
        return Ok(out);
    }
    let mut data = ptr::null_mut();
    // Read-only here; the view is owned by `value`.
    ortsys!(api, GetTensorMutableData(value.cast_mut(), &mut data))?;
    if data.is_null() {
        return Err(OrtError::Argument("tensor has no data".to_string()));
    }
    unsafe { ptr::copy_nonoverlapping(data as *const T, out.as_mut_ptr(), count) };
    Ok(out)
}

/// Reads all strings with one content call, then splits at the offsets.
fn read_strings(api: &'static Api, value: *const OrtValue, count: usize) -> Result<Vec<Vec<u8>>> {
    if count == 0 {
        return Ok(Vec::new());
    }
    let mut len = 0usize;
    ortsys!(api, GetStringTensorDataLength(value, &mut len))?;
    let mut bytes = vec![0u8; len];
    let mut offsets = vec![0usize; count];
    ortsys!(
        api,
        GetStringTensorContent(value, bytes.as_mut_ptr().cast(), len, offsets.as_mut_ptr(), count)
    )?;

    let ends = offsets.iter().skip(1).copied().chain(std::iter::once(len));
    offsets
        .iter()
        .zip(ends)
        .map(|(&start, end)| {
            bytes
                .get(start..end)
                .map(<[u8]>::to_vec)
                .ok_or_else(|| OrtError::Argument(format!("bad string offset {start}..{end} of {len}")))
        })
        .collect()
}

/// Fetches element `index` of a sequence or map. The result is owned.
fn child(api: &'static Api, value: *const OrtValue, index: usize) -> Result<Handle<OrtValue>> {
    let allocator = api.allocator()?;
    let mut out = ptr::null_mut();
    ortsys!(api, GetValue(value, index as c_int, allocator.as_ptr(), &mut out))?;
    Ok(Handle::new(api, out))
}

fn to_array<T>(shape: &[usize], data: Vec<T>) -> Result<ArrayD<T>> {
    ArrayD::from_shape_vec(IxDyn(shape), data)
        .map_err(|e| OrtError::Argument(format!("tensor shape {shape:?}: {e}")))
}

/// Builds nested arrays of `shape` from row-major leaves. A rank-0 shape
/// yields the single leaf itself.
pub(crate) fn nest(shape: &[usize], leaves: Vec<HostValue>) -> HostValue {
    let mut leaves = leaves.into_iter();
    build(shape, &mut leaves)
}

fn build<I: Iterator<Item = HostValue>>(shape: &[usize], leaves: &mut I) -> HostValue {
    match shape.split_first() {
        None => leaves.next().unwrap_or(HostValue::Array(Vec::new())),
        Some((&len, rest)) => HostValue::Array((0..len).map(|_| build(rest, leaves)).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock;

    fn grid(d0: usize, d1: usize, d2: usize) -> HostValue {
        let mut n = 0.0f32;
        HostValue::Array(
            (0..d0)
                .map(|_| {
                    HostValue::Array(
                        (0..d1)
                            .map(|_| {
                                HostValue::Array(
                                    (0..d2)
                                        .map(|_| {
                                            n += 0.5;
                                            HostValue::Float(n)
                                        })
                                        .collect(),
                                )
                            })
                            .collect(),
                    )
                })
                .collect(),
        )
    }

    #[test]
    fn float_grid_round_trip() {
        let engine = mock::lock();
        let value = grid(3, 4, 5);
        let encoded = encode(engine.api(), &value, ElementType::Float).unwrap();
        assert_eq!(encoded.shape().unwrap(), vec![3, 4, 5]);
        assert_eq!(decode(&encoded, OutputKind::Nested).unwrap(), value);
        drop(encoded);
        assert!(engine.leaks().is_empty());
    }

    #[test]
    fn declared_type_drives_width() {
        let engine = mock::lock();
        let value = HostValue::from(vec![1i64, 2, 3]);
        let encoded = encode(engine.api(), &value, ElementType::Double).unwrap();
        assert_eq!(encoded.element_type().unwrap(), ElementType::Double);
        assert_eq!(
            decode(&encoded, OutputKind::Nested).unwrap(),
            HostValue::from(vec![1.0f64, 2.0, 3.0])
        );
    }

    #[test]
    fn integer_types_round_trip() {
        let engine = mock::lock();
        let api = engine.api();
        let cases = [
            (ElementType::Int8, HostValue::from(vec![vec![-1i8, 2], vec![3, -4]])),
            (ElementType::Int16, HostValue::from(vec![-300i16, 300])),
            (ElementType::Int32, HostValue::from(vec![i32::MIN, i32::MAX])),
            (ElementType::Int64, HostValue::from(vec![vec![i64::MAX], vec![-1]])),
            (ElementType::Uint8, HostValue::from(vec![0u8, 255])),
            (ElementType::Uint16, HostValue::from(vec![65535u16])),
            (ElementType::Uint32, HostValue::from(vec![u32::MAX, 0])),
            (ElementType::Uint64, HostValue::from(vec![u64::MAX])),
            (ElementType::Double, HostValue::from(vec![vec![0.1f64, -2.5]])),
        ];
        for (element_type, value) in cases {
            let encoded = encode(api, &value, element_type).unwrap();
            assert_eq!(decode(&encoded, OutputKind::Nested).unwrap(), value, "{element_type}");
        }
    }

    #[test]
    fn bool_is_one_byte_per_element() {
        let engine = mock::lock();
        let value = HostValue::from(vec![vec![true, false], vec![false, true]]);
        let encoded = encode(engine.api(), &value, ElementType::Bool).unwrap();
        assert_eq!(mock::tensor_bytes(encoded.as_ptr()), vec![1, 0, 0, 1]);
        assert_eq!(decode(&encoded, OutputKind::Nested).unwrap(), value);

        // Numbers are accepted: non-zero is true.
        let encoded = encode(engine.api(), &HostValue::from(vec![0i32, 7]), ElementType::Bool).unwrap();
        assert_eq!(
            decode(&encoded, OutputKind::Nested).unwrap(),
            HostValue::from(vec![false, true])
        );
    }

    #[test]
    fn strings_round_trip() {
        let engine = mock::lock();
        let value = HostValue::from(vec![vec!["a", "b"], vec!["c", "d"]]);
        let encoded = encode(engine.api(), &value, ElementType::String).unwrap();
        assert_eq!(decode(&encoded, OutputKind::Nested).unwrap(), value);
        drop(encoded);
        assert!(engine.leaks().is_empty());
    }

    #[test]
    fn non_utf8_string_decodes_to_bytes() {
        let engine = mock::lock();
        let value = HostValue::Array(vec![HostValue::Bytes(vec![0xff, 0xfe]), HostValue::from("ok")]);
        let encoded = encode(engine.api(), &value, ElementType::String).unwrap();
        assert_eq!(decode(&encoded, OutputKind::Nested).unwrap(), value);
    }

    #[test]
    fn empty_strings_keep_their_slots() {
        let engine = mock::lock();
        let value = HostValue::from(vec!["", "x", ""]);
        let encoded = encode(engine.api(), &value, ElementType::String).unwrap();
        assert_eq!(decode(&encoded, OutputKind::Nested).unwrap(), value);
    }

    #[test]
    fn zero_sized_dimension() {
        let engine = mock::lock();
        let value = HostValue::Array(vec![HostValue::Array(vec![]), HostValue::Array(vec![])]);
        let encoded = encode(engine.api(), &value, ElementType::Float).unwrap();
        assert_eq!(encoded.shape().unwrap(), vec![2, 0]);
        assert_eq!(decode(&encoded, OutputKind::Nested).unwrap(), value);
    }

    #[test]
    fn scalar_is_rank_zero() {
        let engine = mock::lock();
        let encoded = encode(engine.api(), &HostValue::Float(2.5), ElementType::Float).unwrap();
        assert_eq!(encoded.shape().unwrap(), Vec::<i64>::new());
        assert_eq!(decode(&encoded, OutputKind::Nested).unwrap(), HostValue::Float(2.5));
    }

    #[test]
    fn jagged_input_is_rejected() {
        let engine = mock::lock();
        let value = HostValue::from(vec![vec![1.0f32, 2.0], vec![3.0], vec![4.0, 5.0, 6.0]]);
        let err = encode(engine.api(), &value, ElementType::Float).unwrap_err();
        assert!(matches!(err, OrtError::Argument(_)), "{err:?}");
        assert_eq!(engine.live(), 0);
    }

    #[test]
    fn jagged_input_with_huge_claimed_shape_is_rejected() {
        let engine = mock::lock();
        let width = 65536;
        // Only the first element at each depth is full, so the first-element
        // shape claims width^4 leaves.
        let mut value = HostValue::Array(vec![HostValue::Float(0.0); width]);
        for _ in 0..3 {
            let mut items = vec![HostValue::Array(vec![]); width];
            items[0] = value;
            value = HostValue::Array(items);
        }
        assert_eq!(value.nested_shape(), vec![width; 4]);

        let err = encode(engine.api(), &value, ElementType::Float).unwrap_err();
        assert!(matches!(err, OrtError::Argument(_)), "{err:?}");
        assert!(err.to_string().contains("jagged input"), "{err}");
        assert_eq!(engine.live(), 0);
    }

    #[test]
    fn wrong_leaf_kind_is_rejected() {
        let engine = mock::lock();
        let err = encode(engine.api(), &HostValue::from(vec!["a"]), ElementType::Float).unwrap_err();
        assert!(err.to_string().contains("cannot encode string as tensor(float)"), "{err}");

        let err = encode(engine.api(), &HostValue::from(vec![1.0f32]), ElementType::String).unwrap_err();
        assert!(matches!(err, OrtError::Argument(_)));
    }

    #[test]
    fn unsupported_element_type() {
        let engine = mock::lock();
        let err = encode(engine.api(), &HostValue::from(vec![1.0f32]), ElementType::Float16).unwrap_err();
        assert!(matches!(err, OrtError::UnsupportedType { kind: "element", .. }));
    }

    #[test]
    fn buffer_output() {
        let engine = mock::lock();
        let value = HostValue::from(vec![vec![1i64, 2, 3], vec![4, 5, 6]]);
        let encoded = encode(engine.api(), &value, ElementType::Int64).unwrap();
        let buffer = decode_buffer(&encoded).unwrap();
        assert_eq!(buffer.shape(), &[2, 3]);
        assert_eq!(buffer.to_nested(), value);
    }

    #[test]
    fn buffer_input_converts_to_declared_type() {
        let engine = mock::lock();
        let array = ArrayD::from_shape_vec(IxDyn(&[2, 2]), vec![1i32, 2, 3, 4]).unwrap();
        let value = HostValue::Buffer(TensorBuffer::Int32(array));
        let encoded = encode(engine.api(), &value, ElementType::Float).unwrap();
        assert_eq!(encoded.element_type().unwrap(), ElementType::Float);
        assert_eq!(
            decode(&encoded, OutputKind::Nested).unwrap(),
            HostValue::from(vec![vec![1.0f32, 2.0], vec![3.0, 4.0]])
        );
    }

    #[test]
    fn sequence_of_maps() {
        let engine = mock::lock();
        let raw = mock::sequence_of_maps(&[
            (vec![0, 1, 2], vec![0.1, 0.2, 0.7]),
            (vec![0, 1, 2], vec![0.5, 0.25, 0.25]),
        ]);
        let value = NativeValue::from_raw(engine.api(), raw);
        let decoded = decode(&value, OutputKind::Nested).unwrap();

        let items = decoded.as_array().unwrap();
        assert_eq!(items.len(), 2);
        let first = items[0].as_map().unwrap();
        assert_eq!(
            first.iter().map(|(k, _)| *k).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_eq!(first[2].1, HostValue::Float(0.7));

        drop(value);
        assert!(engine.leaks().is_empty());
        assert_eq!(engine.stats().invalid_releases, 0);
    }

    #[test]
    fn map_values_follow_requested_kind() {
        let engine = mock::lock();
        let raw = mock::sequence_of_maps(&[(vec![3, 7], vec![0.25, 0.75])]);
        let value = NativeValue::from_raw(engine.api(), raw);

        let nested = decode(&value, OutputKind::Nested).unwrap();
        let buffered = decode(&value, OutputKind::Buffer).unwrap();
        assert_eq!(nested, buffered);
        let map = buffered.as_array().unwrap()[0].as_map().unwrap();
        assert_eq!(map[0], (3, HostValue::Float(0.25)));
        assert_eq!(map[1], (7, HostValue::Float(0.75)));

        drop(value);
        assert!(engine.leaks().is_empty());
        assert_eq!(engine.stats().invalid_releases, 0);
    }

    #[test]
    fn string_keyed_map_is_unsupported() {
        let engine = mock::lock();
        let raw = mock::string_keyed_map(&["a", "b"], &[1.0, 2.0]);
        let value = NativeValue::from_raw(engine.api(), raw);
        let err = decode(&value, OutputKind::Nested).unwrap_err();
        assert!(
            matches!(&err, OrtError::UnsupportedType { kind: "map key", name } if name == "string"),
            "{err:?}"
        );
        drop(value);
        assert!(engine.leaks().is_empty());
    }

    #[test]
    fn nest_handles_rank_zero_and_empty() {
        assert_eq!(nest(&[], vec![HostValue::Int64(4)]), HostValue::Int64(4));
        assert_eq!(nest(&[0], vec![]), HostValue::Array(vec![]));
        assert_eq!(
            nest(&[2, 1], vec![HostValue::Int64(1), HostValue::Int64(2)]),
            HostValue::from(vec![vec![1i64], vec![2]])
        );
    }
}
