use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;
use std::fmt;
use std::io::Cursor;

use crate::bail;
use crate::buffer::hex::{DEFAULT_WRAP, bytes_as_hex_string};
use crate::buffer::length_prefixed::{
    length_prefixed_len, read_length_prefixed, write_length_prefixed,
};
use crate::error::{ErrorKind, RestoreError, RestoreResult};
use crate::types::LogPosition;

/// Encoded size of a [`LogReplicationRequest`]: two positions and one flag byte.
const REQUEST_WIRE_BYTES: usize = 8 + 8 + 1;

/// Range of a remote log that a replication session still has to restore.
///
/// `include_from_position` asks the member to deliver the event at `from` as well,
/// which is only wanted for the first request of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplicationRange {
    from: LogPosition,
    to: LogPosition,
    include_from_position: bool,
}

impl ReplicationRange {
    pub fn new(from: LogPosition, to: LogPosition) -> Self {
        Self {
            from,
            to,
            include_from_position: false,
        }
    }

    pub fn with_include_from_position(self, include_from_position: bool) -> Self {
        Self {
            include_from_position,
            ..self
        }
    }

    /// Returns the range left after events up to `position` have been restored.
    ///
    /// `position` itself is already present locally, so it is never requested again.
    pub fn continue_from(self, position: LogPosition) -> Self {
        Self {
            from: position,
            to: self.to,
            include_from_position: false,
        }
    }

    pub fn from(&self) -> LogPosition {
        self.from
    }

    pub fn to(&self) -> LogPosition {
        self.to
    }

    pub fn include_from_position(&self) -> bool {
        self.include_from_position
    }
}

/// Request sent to a member for the events of a [`ReplicationRange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogReplicationRequest {
    from_position: LogPosition,
    to_position: LogPosition,
    include_from_position: bool,
}

impl LogReplicationRequest {
    pub fn from_position(&self) -> LogPosition {
        self.from_position
    }

    pub fn to_position(&self) -> LogPosition {
        self.to_position
    }

    pub fn include_from_position(&self) -> bool {
        self.include_from_position
    }

    pub fn encode(&self) -> RestoreResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(REQUEST_WIRE_BYTES);
        buf.write_i64::<LittleEndian>(self.from_position.get())?;
        buf.write_i64::<LittleEndian>(self.to_position.get())?;
        buf.write_u8(u8::from(self.include_from_position))?;

        Ok(buf)
    }

    pub fn decode(bytes: &[u8]) -> RestoreResult<Self> {
        if bytes.len() != REQUEST_WIRE_BYTES {
            bail!(
                ErrorKind::DeserializationError,
                "Invalid replication request size",
                format!("expected {REQUEST_WIRE_BYTES} bytes, got {}", bytes.len())
            );
        }

        let mut reader = Cursor::new(bytes);
        let from_position = reader.read_i64::<LittleEndian>()?;
        let to_position = reader.read_i64::<LittleEndian>()?;
        let include_from_position = decode_flag(reader.read_u8()?)?;

        Ok(Self {
            from_position: from_position.into(),
            to_position: to_position.into(),
            include_from_position,
        })
    }
}

impl From<ReplicationRange> for LogReplicationRequest {
    fn from(range: ReplicationRange) -> Self {
        Self {
            from_position: range.from,
            to_position: range.to,
            include_from_position: range.include_from_position,
        }
    }
}

impl fmt::Display for LogReplicationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let open = if self.include_from_position { '[' } else { '(' };
        write!(f, "{open}{}, {}]", self.from_position, self.to_position)
    }
}

/// One chunk of events returned by a member.
///
/// `serialized_events` ends at `to_position`; `more_available` tells whether the
/// member holds events after `to_position` that did not fit in this chunk.
#[derive(Clone, PartialEq, Eq)]
pub struct LogReplicationResponse {
    to_position: LogPosition,
    serialized_events: Bytes,
    more_available: bool,
}

impl LogReplicationResponse {
    pub fn new(
        to_position: LogPosition,
        serialized_events: impl Into<Bytes>,
        more_available: bool,
    ) -> Self {
        Self {
            to_position,
            serialized_events: serialized_events.into(),
            more_available,
        }
    }

    /// Returns a response carrying no events, which is never valid.
    pub fn empty() -> Self {
        Self::new(LogPosition::default(), Bytes::new(), false)
    }

    pub fn to_position(&self) -> LogPosition {
        self.to_position
    }

    pub fn serialized_events(&self) -> &Bytes {
        &self.serialized_events
    }

    pub fn has_more_available(&self) -> bool {
        self.more_available
    }

    /// Returns whether the response actually carries events up to a real position.
    pub fn is_valid(&self) -> bool {
        self.to_position.get() > 0 && !self.serialized_events.is_empty()
    }

    pub fn encode(&self) -> RestoreResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(8 + 1 + length_prefixed_len(&self.serialized_events));
        buf.write_i64::<LittleEndian>(self.to_position.get())?;
        buf.write_u8(u8::from(self.more_available))?;
        write_length_prefixed(&mut buf, &self.serialized_events)?;

        Ok(buf)
    }

    pub fn decode(bytes: &[u8]) -> RestoreResult<Self> {
        let mut reader = Cursor::new(bytes);
        let to_position = reader
            .read_i64::<LittleEndian>()
            .map_err(truncated_response)?;
        let more_available = decode_flag(reader.read_u8().map_err(truncated_response)?)?;
        let serialized_events = read_length_prefixed(&mut reader)?;

        if reader.position() as usize != bytes.len() {
            bail!(
                ErrorKind::DeserializationError,
                "Replication response has trailing bytes",
                format!("{} unread bytes", bytes.len() - reader.position() as usize)
            );
        }

        Ok(Self {
            to_position: to_position.into(),
            serialized_events,
            more_available,
        })
    }
}

impl fmt::Debug for LogReplicationResponse {
    /// With `{:#?}` the events are rendered as a hex dump, otherwise only their size.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let alternate = f.alternate();
        let mut debug = f.debug_struct("LogReplicationResponse");
        debug
            .field("to_position", &self.to_position)
            .field("more_available", &self.more_available);

        if alternate {
            debug.field(
                "serialized_events",
                &format_args!(
                    "\n{}",
                    bytes_as_hex_string(&self.serialized_events, DEFAULT_WRAP)
                ),
            );
        } else {
            debug.field(
                "serialized_events",
                &format_args!("{} bytes", self.serialized_events.len()),
            );
        }

        debug.finish()
    }
}

fn decode_flag(byte: u8) -> RestoreResult<bool> {
    match byte {
        0 => Ok(false),
        1 => Ok(true),
        other => bail!(
            ErrorKind::DeserializationError,
            "Invalid boolean flag",
            format!("flag byte {other}")
        ),
    }
}

fn truncated_response(err: std::io::Error) -> RestoreError {
    RestoreError::from((
        ErrorKind::DeserializationError,
        "Replication response is truncated",
        err.to_string(),
    ))
}
