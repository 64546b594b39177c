//! `[u32 little-endian length][raw bytes]` framing for variable sized values.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;
use std::io::{Read, Write};

use crate::bail;
use crate::error::{ErrorKind, RestoreResult};

/// Size of the length prefix written in front of every value.
pub const LENGTH_PREFIX_BYTES: usize = 4;

/// Returns the number of bytes [`write_length_prefixed`] writes for `value`.
pub fn length_prefixed_len(value: &[u8]) -> usize {
    LENGTH_PREFIX_BYTES + value.len()
}

/// Writes `value` preceded by its length.
pub fn write_length_prefixed<W: Write>(writer: &mut W, value: &[u8]) -> RestoreResult<()> {
    let Ok(length) = u32::try_from(value.len()) else {
        bail!(
            ErrorKind::SerializationError,
            "Value too large for a length prefix",
            format!("{} bytes", value.len())
        );
    };

    writer.write_u32::<LittleEndian>(length)?;
    writer.write_all(value)?;

    Ok(())
}

/// Reads a value written by [`write_length_prefixed`].
///
/// Fails with [`ErrorKind::DeserializationError`] when the reader ends before the
/// prefix or the announced number of bytes could be read.
pub fn read_length_prefixed<R: Read>(reader: &mut R) -> RestoreResult<Bytes> {
    let Ok(length) = reader.read_u32::<LittleEndian>() else {
        bail!(
            ErrorKind::DeserializationError,
            "Missing length prefix"
        );
    };

    let mut value = Vec::new();
    let read = reader.take(u64::from(length)).read_to_end(&mut value)?;
    if read != length as usize {
        bail!(
            ErrorKind::DeserializationError,
            "Length prefixed value is truncated",
            format!("expected {length} bytes, got {read}")
        );
    }

    Ok(Bytes::from(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn prefix_is_little_endian() {
        let mut buf = Vec::new();
        write_length_prefixed(&mut buf, b"abc").unwrap();

        assert_eq!(buf, [3, 0, 0, 0, b'a', b'b', b'c']);
        assert_eq!(buf.len(), length_prefixed_len(b"abc"));
    }

    #[test]
    fn consecutive_values_are_read_back_in_order() {
        let mut buf = Vec::new();
        write_length_prefixed(&mut buf, b"first").unwrap();
        write_length_prefixed(&mut buf, b"").unwrap();
        write_length_prefixed(&mut buf, b"third").unwrap();

        let mut reader = Cursor::new(buf);
        assert_eq!(read_length_prefixed(&mut reader).unwrap(), "first");
        assert_eq!(read_length_prefixed(&mut reader).unwrap(), "");
        assert_eq!(read_length_prefixed(&mut reader).unwrap(), "third");
    }

    #[test]
    fn truncated_value_is_rejected() {
        let mut reader = Cursor::new(vec![10, 0, 0, 0, 1, 2, 3]);
        let err = read_length_prefixed(&mut reader).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::DeserializationError);
        assert_eq!(err.detail(), Some("expected 10 bytes, got 3"));
    }

    #[test]
    fn missing_prefix_is_rejected() {
        let mut reader = Cursor::new(vec![1, 0]);
        let err = read_length_prefixed(&mut reader).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::DeserializationError);
    }
}
