//! JDWP packet framing and payload encoding.
//!
//! Every packet is an 11-byte header (length, id, flags, and either a
//! command pair or a reply error code) followed by a payload. Object
//! identifiers have VM-specific widths reported by the IDSizes
//! command, so payload decoding is parameterized over [`IdSizes`].

use crate::error::DebugError;

pub const HANDSHAKE: &[u8; 14] = b"JDWP-Handshake";
pub const HEADER_LEN: usize = 11;
pub const REPLY_FLAG: u8 = 0x80;

/// Command pairs (command set, command) used by the session.
pub mod command {
    pub const VM_CLASSES_BY_NAME: (u8, u8) = (1, 2);
    pub const VM_DISPOSE: (u8, u8) = (1, 6);
    pub const VM_ID_SIZES: (u8, u8) = (1, 7);
    pub const VM_RESUME: (u8, u8) = (1, 9);
    pub const REFERENCE_TYPE_METHODS: (u8, u8) = (2, 5);
    pub const METHOD_LINE_TABLE: (u8, u8) = (6, 1);
    pub const EVENT_REQUEST_SET: (u8, u8) = (15, 1);
    pub const EVENT_REQUEST_CLEAR: (u8, u8) = (15, 2);
    pub const EVENT_COMPOSITE: (u8, u8) = (64, 100);
}

pub mod event_kind {
    pub const SINGLE_STEP: u8 = 1;
    pub const BREAKPOINT: u8 = 2;
    pub const CLASS_PREPARE: u8 = 8;
    pub const VM_START: u8 = 90;
    pub const VM_DEATH: u8 = 99;
}

pub mod suspend_policy {
    pub const NONE: u8 = 0;
    pub const ALL: u8 = 2;
}

pub mod step {
    pub const SIZE_LINE: u32 = 1;
    pub const DEPTH_OVER: u32 = 1;
}

mod modifier_kind {
    pub const COUNT: u8 = 1;
    pub const CLASS_MATCH: u8 = 5;
    pub const LOCATION_ONLY: u8 = 7;
    pub const STEP: u8 = 10;
}

/// Identifier widths reported by the VM. Defaults to 8 bytes each,
/// which is what HotSpot reports, until IDSizes says otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdSizes {
    pub field: u8,
    pub method: u8,
    pub object: u8,
    pub reference_type: u8,
    pub frame: u8,
}

impl Default for IdSizes {
    fn default() -> Self {
        Self {
            field: 8,
            method: 8,
            object: 8,
            reference_type: 8,
            frame: 8,
        }
    }
}

/// An executable code position: class, method, and bytecode index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub type_tag: u8,
    pub class_id: u64,
    pub method_id: u64,
    pub index: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct PacketHeader {
    pub length: u32,
    pub id: u32,
    pub flags: u8,
    /// Command set and command for commands; error code for replies.
    pub code: u16,
}

impl PacketHeader {
    #[must_use]
    pub fn is_reply(&self) -> bool {
        self.flags & REPLY_FLAG != 0
    }

    pub fn parse(bytes: &[u8; HEADER_LEN]) -> Self {
        Self {
            length: u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            id: u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            flags: bytes[8],
            code: u16::from_be_bytes([bytes[9], bytes[10]]),
        }
    }
}

/// Frame a command packet: header plus payload, ready to write.
#[must_use]
pub fn frame_command(id: u32, (set, cmd): (u8, u8), payload: &[u8]) -> Vec<u8> {
    let length = u32::try_from(HEADER_LEN + payload.len()).unwrap_or(u32::MAX);
    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
    bytes.extend_from_slice(&length.to_be_bytes());
    bytes.extend_from_slice(&id.to_be_bytes());
    bytes.push(0);
    bytes.push(set);
    bytes.push(cmd);
    bytes.extend_from_slice(payload);
    bytes
}

/// Big-endian payload writer.
#[derive(Debug, Default)]
pub struct PayloadWriter {
    bytes: Vec<u8>,
}

impl PayloadWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn u8(&mut self, value: u8) -> &mut Self {
        self.bytes.push(value);
        self
    }

    pub fn u32(&mut self, value: u32) -> &mut Self {
        self.bytes.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn u64(&mut self, value: u64) -> &mut Self {
        self.bytes.extend_from_slice(&value.to_be_bytes());
        self
    }

    /// Length-prefixed UTF-8 string.
    pub fn string(&mut self, value: &str) -> &mut Self {
        self.u32(u32::try_from(value.len()).unwrap_or(u32::MAX));
        self.bytes.extend_from_slice(value.as_bytes());
        self
    }

    /// An identifier at the VM-reported width.
    pub fn id(&mut self, value: u64, size: u8) -> &mut Self {
        let all = value.to_be_bytes();
        let start = all.len().saturating_sub(size as usize);
        self.bytes.extend_from_slice(&all[start..]);
        self
    }

    pub fn location(&mut self, location: Location, sizes: IdSizes) -> &mut Self {
        self.u8(location.type_tag)
            .id(location.class_id, sizes.reference_type)
            .id(location.method_id, sizes.method)
            .u64(location.index)
    }

    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.bytes
    }
}

/// Big-endian payload reader; every read fails on truncation rather
/// than panicking, since the bytes come off the wire.
pub struct PayloadReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PayloadReader<'a> {
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8], DebugError> {
        let end = self.pos.checked_add(count).ok_or(DebugError::Truncated)?;
        let slice = self.data.get(self.pos..end).ok_or(DebugError::Truncated)?;
        self.pos = end;
        Ok(slice)
    }

    pub fn u8(&mut self) -> Result<u8, DebugError> {
        Ok(self.take(1)?[0])
    }

    pub fn u32(&mut self) -> Result<u32, DebugError> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn u64(&mut self) -> Result<u64, DebugError> {
        let bytes = self.take(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(u64::from_be_bytes(buf))
    }

    pub fn i64(&mut self) -> Result<i64, DebugError> {
        Ok(self.u64()? as i64)
    }

    pub fn string(&mut self) -> Result<String, DebugError> {
        let length = self.u32()? as usize;
        let bytes = self.take(length)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| DebugError::Truncated)
    }

    pub fn id(&mut self, size: u8) -> Result<u64, DebugError> {
        let bytes = self.take(size as usize)?;
        let mut value = 0u64;
        for &byte in bytes {
            value = (value << 8) | u64::from(byte);
        }
        Ok(value)
    }

    pub fn location(&mut self, sizes: IdSizes) -> Result<Location, DebugError> {
        Ok(Location {
            type_tag: self.u8()?,
            class_id: self.id(sizes.reference_type)?,
            method_id: self.id(sizes.method)?,
            index: self.u64()?,
        })
    }
}

/// Event-request modifiers the session uses.
#[derive(Debug, Clone)]
pub enum Modifier {
    Count(u32),
    ClassMatch(String),
    LocationOnly(Location),
    Step { thread: u64, size: u32, depth: u32 },
}

impl Modifier {
    pub fn encode(&self, writer: &mut PayloadWriter, sizes: IdSizes) {
        match self {
            Modifier::Count(count) => {
                writer.u8(modifier_kind::COUNT).u32(*count);
            }
            Modifier::ClassMatch(pattern) => {
                writer.u8(modifier_kind::CLASS_MATCH).string(pattern);
            }
            Modifier::LocationOnly(location) => {
                writer.u8(modifier_kind::LOCATION_ONLY).location(*location, sizes);
            }
            Modifier::Step {
                thread,
                size,
                depth,
            } => {
                writer
                    .u8(modifier_kind::STEP)
                    .id(*thread, sizes.object)
                    .u32(*size)
                    .u32(*depth);
            }
        }
    }
}

/// One event inside a composite event packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VmEvent {
    VmStart {
        request_id: u32,
        thread: u64,
    },
    Breakpoint {
        request_id: u32,
        thread: u64,
        location: Location,
    },
    Step {
        request_id: u32,
        thread: u64,
        location: Location,
    },
    ClassPrepare {
        request_id: u32,
        thread: u64,
        type_tag: u8,
        type_id: u64,
        signature: String,
        status: u32,
    },
    VmDeath {
        request_id: u32,
    },
    /// A kind this session never requested; parsing stops here since
    /// its payload length is unknown.
    Unrecognized {
        kind: u8,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBatch {
    pub suspend_policy: u8,
    pub events: Vec<VmEvent>,
}

/// Decode a composite event payload.
pub fn parse_composite(payload: &[u8], sizes: IdSizes) -> Result<EventBatch, DebugError> {
    let mut reader = PayloadReader::new(payload);
    let suspend_policy = reader.u8()?;
    let count = reader.u32()?;
    let mut events = Vec::with_capacity(count as usize);

    for _ in 0..count {
        let kind = reader.u8()?;
        let request_id = reader.u32()?;
        let event = match kind {
            event_kind::VM_START => VmEvent::VmStart {
                request_id,
                thread: reader.id(sizes.object)?,
            },
            event_kind::BREAKPOINT => VmEvent::Breakpoint {
                request_id,
                thread: reader.id(sizes.object)?,
                location: reader.location(sizes)?,
            },
            event_kind::SINGLE_STEP => VmEvent::Step {
                request_id,
                thread: reader.id(sizes.object)?,
                location: reader.location(sizes)?,
            },
            event_kind::CLASS_PREPARE => VmEvent::ClassPrepare {
                request_id,
                thread: reader.id(sizes.object)?,
                type_tag: reader.u8()?,
                type_id: reader.id(sizes.reference_type)?,
                signature: reader.string()?,
                status: reader.u32()?,
            },
            event_kind::VM_DEATH => VmEvent::VmDeath { request_id },
            other => {
                events.push(VmEvent::Unrecognized { kind: other });
                break;
            }
        };
        events.push(event);
    }

    Ok(EventBatch {
        suspend_policy,
        events,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips() {
        let framed = frame_command(7, command::VM_RESUME, &[]);
        assert_eq!(framed.len(), HEADER_LEN);
        let mut header_bytes = [0u8; HEADER_LEN];
        header_bytes.copy_from_slice(&framed);
        let header = PacketHeader::parse(&header_bytes);
        assert_eq!(header.length, 11);
        assert_eq!(header.id, 7);
        assert!(!header.is_reply());
        assert_eq!(header.code, 0x0109);
    }

    #[test]
    fn ids_honor_the_reported_width() {
        let mut writer = PayloadWriter::new();
        writer.id(0x1122_3344, 4);
        let bytes = writer.finish();
        assert_eq!(bytes, [0x11, 0x22, 0x33, 0x44]);

        let mut reader = PayloadReader::new(&bytes);
        assert_eq!(reader.id(4).expect("read id"), 0x1122_3344);
    }

    #[test]
    fn strings_are_length_prefixed() {
        let mut writer = PayloadWriter::new();
        writer.string("Demo");
        let bytes = writer.finish();
        let mut reader = PayloadReader::new(&bytes);
        assert_eq!(reader.string().expect("read string"), "Demo");
    }

    #[test]
    fn truncated_payloads_error_instead_of_panicking() {
        let mut reader = PayloadReader::new(&[0, 0]);
        assert!(matches!(reader.u32(), Err(DebugError::Truncated)));
    }

    #[test]
    fn composite_breakpoint_event_parses() {
        let sizes = IdSizes::default();
        let location = Location {
            type_tag: 1,
            class_id: 42,
            method_id: 7,
            index: 3,
        };
        let mut writer = PayloadWriter::new();
        writer.u8(suspend_policy::ALL).u32(1);
        writer.u8(event_kind::BREAKPOINT).u32(99);
        writer.id(11, sizes.object).location(location, sizes);
        let payload = writer.finish();

        let batch = parse_composite(&payload, sizes).expect("parse composite");
        assert_eq!(batch.suspend_policy, suspend_policy::ALL);
        assert_eq!(
            batch.events,
            vec![VmEvent::Breakpoint {
                request_id: 99,
                thread: 11,
                location,
            }]
        );
    }

    #[test]
    fn unknown_event_kinds_stop_the_batch() {
        let mut writer = PayloadWriter::new();
        writer.u8(suspend_policy::ALL).u32(2);
        writer.u8(200).u32(1);
        let payload = writer.finish();
        let batch = parse_composite(&payload, IdSizes::default()).expect("parse");
        assert_eq!(batch.events, vec![VmEvent::Unrecognized { kind: 200 }]);
    }
}
