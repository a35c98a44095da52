//! Binary encoding convention shared by the wasmfold host and its guests.
//!
//! Host and guest are compiled independently and share no pointers, so every
//! value crossing the boundary is serialized with one reversible encoding
//! (bincode over serde). The [`header`] module names the fixed memory layout
//! both sides agree on.

pub mod header;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Codec errors.
///
/// Truncated input, malformed input, and "a valid value followed by residue"
/// are distinct failures: the first two mean the bytes cannot be a value of
/// the expected type at all, the last means the shape disagrees with what the
/// caller asked for.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("value could not be encoded: {0}")]
    Encode(String),

    #[error("encoded input ended early: {0}")]
    Truncated(String),

    #[error("encoded input is malformed: {0}")]
    Malformed(String),

    #[error("{trailing} trailing byte(s) after a complete value")]
    TrailingBytes { trailing: usize },
}

/// Codec result type.
pub type CodecResult<T> = Result<T, CodecError>;

/// Serializes a value into the boundary encoding.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> CodecResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| CodecError::Encode(e.to_string()))
}

/// Deserializes a value from the boundary encoding.
///
/// Total over anything [`encode`] produced (the round-trip law); everything
/// else is rejected with a [`CodecError`] that says how it failed.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> CodecResult<T> {
    let mut cursor = std::io::Cursor::new(bytes);
    let value = bincode::deserialize_from(&mut cursor).map_err(classify)?;
    let consumed = cursor.position() as usize;
    if consumed != bytes.len() {
        return Err(CodecError::TrailingBytes {
            trailing: bytes.len() - consumed,
        });
    }
    Ok(value)
}

fn classify(err: bincode::Error) -> CodecError {
    match err.as_ref() {
        bincode::ErrorKind::Io(io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
            CodecError::Truncated(err.to_string())
        }
        _ => CodecError::Malformed(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Chapter {
        title: String,
        number: u32,
        sections: Vec<(u8, String)>,
    }

    fn round_trip<T>(value: T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = encode(&value).unwrap();
        let back: T = decode(&bytes).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn round_trip_scalars() {
        round_trip(0u8);
        round_trip(255u8);
        round_trip(u32::MAX);
        round_trip(-1i64);
        round_trip(());
    }

    #[test]
    fn round_trip_strings() {
        round_trip(String::new());
        round_trip("hello".to_string());
        round_trip("Hello, 世界!".to_string());
    }

    #[test]
    fn round_trip_tuples_and_records() {
        round_trip((3u8, "ab".to_string()));
        round_trip(Chapter {
            title: "Intro".to_string(),
            number: 1,
            sections: vec![(1, "a".to_string()), (2, "b".to_string())],
        });
    }

    #[test]
    fn string_layout_is_length_prefixed() {
        // The host-side tests rely on this framing: u64 length, then bytes.
        let bytes = encode(&"hello".to_string()).unwrap();
        assert_eq!(bytes.len(), 8 + 5);
        assert_eq!(&bytes[..8], &5u64.to_le_bytes());
        assert_eq!(&bytes[8..], b"hello");
    }

    #[test]
    fn unit_encodes_to_zero_bytes() {
        assert!(encode(&()).unwrap().is_empty());
    }

    #[test]
    fn truncated_input_is_rejected_as_truncated() {
        let bytes = encode(&"hello".to_string()).unwrap();
        let err = decode::<String>(&bytes[..bytes.len() - 2]).unwrap_err();
        assert!(matches!(err, CodecError::Truncated(_)), "{err:?}");
    }

    #[test]
    fn malformed_input_is_rejected_as_malformed() {
        // A string claiming 4 bytes of invalid UTF-8.
        let mut bytes = 4u64.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe, 0xfd, 0xfc]);
        let err = decode::<String>(&bytes).unwrap_err();
        assert!(matches!(err, CodecError::Malformed(_)), "{err:?}");
    }

    #[test]
    fn trailing_bytes_are_rejected_distinctly() {
        let mut bytes = encode(&7u32).unwrap();
        bytes.push(0);
        let err = decode::<u32>(&bytes).unwrap_err();
        assert!(matches!(err, CodecError::TrailingBytes { trailing: 1 }));
    }
}
