//! Marshalling between host values and guest byte ranges.
//!
//! Everything structured crosses the boundary as UTF-8 JSON text; the
//! transport itself is raw bytes at bump-allocated offsets. A byte range
//! that fails to decode is a defect in the boundary, not a template-level
//! error, and is reported as a [`MarshalError`] rather than being coerced
//! into a domain outcome.

use crate::memory::{BumpAlloc, GuestPtr, MemoryError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use wasmtime::{AsContext, AsContextMut, Memory};

/// Marshalling-layer errors; all of them fail the whole call
#[derive(Debug, thiserror::Error)]
pub enum MarshalError {
    /// Allocation or growth failure underneath an encode
    #[error(transparent)]
    Memory(#[from] MemoryError),

    /// The module reported more output bytes than the region could hold
    #[error("Module reported {written} output bytes for a {capacity}-byte region")]
    OutputOverflow {
        /// Length the module returned
        written: u32,
        /// Capacity the host allocated
        capacity: u32,
    },

    /// Guest bytes are not valid UTF-8
    #[error("Guest bytes are not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Guest text is not the JSON shape the call expects
    #[error("Malformed JSON from guest: {0}")]
    Json(#[from] serde_json::Error),
}

/// Copy raw bytes into freshly allocated guest memory.
///
/// Empty payloads return the null handle without allocating.
///
/// # Errors
///
/// Returns error if allocation fails or the copied range is out of bounds.
pub fn write_bytes(
    mut store: impl AsContextMut,
    memory: &Memory,
    alloc: &mut BumpAlloc,
    bytes: &[u8],
) -> Result<GuestPtr, MarshalError> {
    if bytes.is_empty() {
        return Ok(GuestPtr::null());
    }

    let len = bytes.len() as u32;
    let offset = alloc.alloc(&mut store, memory, len)?;

    let data = memory.data_mut(&mut store);
    let size = data.len();
    let dest = data
        .get_mut(offset as usize..offset as usize + bytes.len())
        .ok_or(MemoryError::OutOfBounds { offset, len, size })?;
    dest.copy_from_slice(bytes);

    Ok(GuestPtr::new(offset, len))
}

/// UTF-8-encode a string into guest memory.
///
/// # Errors
///
/// Returns error if allocation fails.
pub fn write_str(
    store: impl AsContextMut,
    memory: &Memory,
    alloc: &mut BumpAlloc,
    text: &str,
) -> Result<GuestPtr, MarshalError> {
    write_bytes(store, memory, alloc, text.as_bytes())
}

/// Serialize a value to JSON text and encode it into guest memory.
///
/// # Errors
///
/// Returns error if serialization or allocation fails.
pub fn write_json<T: Serialize>(
    store: impl AsContextMut,
    memory: &Memory,
    alloc: &mut BumpAlloc,
    value: &T,
) -> Result<GuestPtr, MarshalError> {
    let json = serde_json::to_string(value)?;
    write_str(store, memory, alloc, &json)
}

/// Copy exactly `ptr.len` bytes out of guest memory.
///
/// # Errors
///
/// Returns error if the range is outside current memory bounds.
pub fn read_bytes(
    store: impl AsContext,
    memory: &Memory,
    ptr: GuestPtr,
) -> Result<Vec<u8>, MarshalError> {
    if ptr.is_null() {
        return Ok(Vec::new());
    }

    let data = memory.data(store.as_context());
    let size = data.len();
    let src = data
        .get(ptr.offset as usize..ptr.end() as usize)
        .ok_or(MemoryError::OutOfBounds {
            offset: ptr.offset,
            len: ptr.len,
            size,
        })?;
    Ok(src.to_vec())
}

/// Decode a guest byte range as UTF-8 text.
///
/// # Errors
///
/// Returns error if the range is out of bounds or not valid UTF-8.
pub fn read_str(
    store: impl AsContext,
    memory: &Memory,
    ptr: GuestPtr,
) -> Result<String, MarshalError> {
    let bytes = read_bytes(store, memory, ptr)?;
    Ok(String::from_utf8(bytes)?)
}

/// Decode a guest byte range as UTF-8 JSON text into a typed value.
///
/// # Errors
///
/// Returns error if the range is out of bounds, not UTF-8, or not the
/// expected JSON shape.
pub fn read_json<T: DeserializeOwned>(
    store: impl AsContext,
    memory: &Memory,
    ptr: GuestPtr,
) -> Result<T, MarshalError> {
    let text = read_str(store, memory, ptr)?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{BumpAlloc, HEAP_BASE, PAGE_SIZE};
    use serde_json::{json, Value};
    use wasmtime::{Engine, MemoryType, Store};

    fn fixture() -> (Store<()>, Memory, BumpAlloc) {
        let engine = Engine::default();
        let mut store = Store::new(&engine, ());
        let memory =
            Memory::new(&mut store, MemoryType::new(1, None)).expect("memory creation");
        (store, memory, BumpAlloc::new(64))
    }

    #[test]
    fn test_write_str_returns_exact_length() {
        let (mut store, memory, mut alloc) = fixture();
        let ptr = write_str(&mut store, &memory, &mut alloc, "hello").unwrap();
        assert_eq!(ptr.offset, HEAP_BASE);
        assert_eq!(ptr.len, 5);
    }

    #[test]
    fn test_write_str_multibyte() {
        let (mut store, memory, mut alloc) = fixture();
        let ptr = write_str(&mut store, &memory, &mut alloc, "héllo").unwrap();
        // UTF-8 length, not char count.
        assert_eq!(ptr.len, 6);
        let back = read_str(&store, &memory, ptr).unwrap();
        assert_eq!(back, "héllo");
    }

    #[test]
    fn test_write_empty_is_null() {
        let (mut store, memory, mut alloc) = fixture();
        let ptr = write_str(&mut store, &memory, &mut alloc, "").unwrap();
        assert!(ptr.is_null());
        assert_eq!(alloc.allocated(), 0);
        assert_eq!(read_str(&store, &memory, ptr).unwrap(), "");
    }

    #[test]
    fn test_string_roundtrip_is_byte_identical() {
        let (mut store, memory, mut alloc) = fixture();
        let original = "Hello {{ name }}! \u{1F343}";
        let ptr = write_str(&mut store, &memory, &mut alloc, original).unwrap();
        let back = read_str(&store, &memory, ptr).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn test_json_roundtrip_is_structurally_equal() {
        let (mut store, memory, mut alloc) = fixture();
        let value = json!({"name": "World", "nested": {"items": [1, 2, 3]}, "flag": true});
        let ptr = write_json(&mut store, &memory, &mut alloc, &value).unwrap();
        let back: Value = read_json(&store, &memory, ptr).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_encodings_do_not_alias() {
        let (mut store, memory, mut alloc) = fixture();
        let a = write_str(&mut store, &memory, &mut alloc, "first").unwrap();
        let b = write_str(&mut store, &memory, &mut alloc, "second").unwrap();
        assert!(b.offset >= a.end() as u32);
        assert_eq!(read_str(&store, &memory, a).unwrap(), "first");
        assert_eq!(read_str(&store, &memory, b).unwrap(), "second");
    }

    #[test]
    fn test_write_across_growth_keeps_earlier_data() {
        let (mut store, memory, mut alloc) = fixture();
        let small = write_str(&mut store, &memory, &mut alloc, "anchor").unwrap();

        let big = "x".repeat(3 * PAGE_SIZE as usize);
        let big_ptr = write_str(&mut store, &memory, &mut alloc, &big).unwrap();

        assert_eq!(read_str(&store, &memory, small).unwrap(), "anchor");
        assert_eq!(read_str(&store, &memory, big_ptr).unwrap(), big);
    }

    #[test]
    fn test_read_out_of_bounds() {
        let (store, memory, _alloc) = fixture();
        let err = read_bytes(&store, &memory, GuestPtr::new(u32::MAX - 8, 16)).unwrap_err();
        assert!(matches!(
            err,
            MarshalError::Memory(MemoryError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_read_invalid_utf8() {
        let (mut store, memory, mut alloc) = fixture();
        let ptr = write_bytes(&mut store, &memory, &mut alloc, &[0xFF, 0xFE, 0xFD]).unwrap();
        let err = read_str(&store, &memory, ptr).unwrap_err();
        assert!(matches!(err, MarshalError::Utf8(_)));
    }

    #[test]
    fn test_read_json_rejects_malformed_text() {
        let (mut store, memory, mut alloc) = fixture();
        let ptr = write_str(&mut store, &memory, &mut alloc, "not json at all").unwrap();
        let err = read_json::<Value>(&store, &memory, ptr).unwrap_err();
        assert!(matches!(err, MarshalError::Json(_)));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn string_roundtrip(text in ".{0,512}") {
                let (mut store, memory, mut alloc) = fixture();
                let ptr = write_str(&mut store, &memory, &mut alloc, &text).unwrap();
                let back = read_str(&store, &memory, ptr).unwrap();
                prop_assert_eq!(back, text);
            }
        }
    }
}
