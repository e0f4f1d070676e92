//! Compact binary wire format for stamps.
//!
//! # Wire layout (format version 1)
//!
//! ```text
//! version:        u8    (currently 1)
//! header:         u8    bits 0-2 = width of the Id length field (1..=4)
//!                       bits 3-5 = width of the Event length field (1..=4)
//!                       bits 6-7 reserved, must be zero
//! id_len:         1..=4 bytes, big-endian
//! id_blob:        id_len bytes
//! event_len:      1..=4 bytes, big-endian
//! event_blob:     event_len bytes
//! ```
//!
//! `Id` nodes are one tag byte each, pre-order: `0x00` leaf-null, `0x02`
//! leaf-seed, `0x01` internal followed by the left then right subtree.
//!
//! `Event` nodes are one header byte each, pre-order: bit 0 set means the
//! node is a branch, bits 1-4 give the counter width in bytes (0 means the
//! counter is zero and omitted), bits 5-7 are reserved. The counter follows
//! big-endian; a branch then continues with its left and right subtrees.
//!
//! Decoding rejects reserved bits, lengths that overrun the buffer,
//! component blobs that do not consume exactly their declared length,
//! trailing bytes, counters wider than this build's counter type, and
//! unknown format versions. The format deliberately carries no integrity
//! checksum; callers on unreliable channels wrap it with their own.

use crate::event::{Counter, Event};
use crate::id::Id;
use crate::stamp::Stamp;

/// Format version written to byte 0 and required on decode.
pub const FORMAT_VERSION: u8 = 1;

const COUNTER_WIDTH: usize = size_of::<Counter>();

const ID_TAG_ZERO: u8 = 0x00;
const ID_TAG_BRANCH: u8 = 0x01;
const ID_TAG_ONE: u8 = 0x02;

/// Errors returned when decoding a serialised stamp.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// The input buffer was empty.
    #[error("serialised stamp is empty")]
    EmptyInput,
    /// The input was written by an incompatible format version.
    #[error("unsupported stamp format version {found} (this build reads version {expected})")]
    IncompatibleVersion {
        /// Version byte found in the input.
        found: u8,
        /// Version this build understands.
        expected: u8,
    },
    /// A header byte has reserved bits set.
    #[error("reserved header bits are set")]
    ReservedBits,
    /// A length-field width is outside `1..=4`.
    #[error("length field width {0} is outside 1..=4")]
    InvalidLengthWidth(u8),
    /// More bytes were required to complete decoding.
    #[error("unexpected end of input")]
    UnexpectedEof,
    /// An identity node carried an unknown tag byte.
    #[error("unknown identity node tag {0:#04x}")]
    UnknownIdTag(u8),
    /// A counter is wider than this build's counter type.
    #[error("counter of {found} bytes exceeds this build's {max}-byte counters")]
    UnsupportedCounterWidth {
        /// Counter width declared in the node header.
        found: usize,
        /// Widest counter this build accepts.
        max: usize,
    },
    /// A component blob did not consume exactly its declared length.
    #[error("component blob does not match its declared length")]
    LengthMismatch,
    /// Bytes remained after the event component ended.
    #[error("trailing bytes after the event component")]
    TrailingBytes,
}

impl Stamp {
    /// Serialise this stamp into the compact wire format.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut id_blob = Vec::new();
        encode_id(&self.id, &mut id_blob);
        let mut event_blob = Vec::new();
        encode_event(&self.event, &mut event_blob);

        let id_width = length_width(id_blob.len());
        let event_width = length_width(event_blob.len());

        let mut out =
            Vec::with_capacity(2 + id_width + id_blob.len() + event_width + event_blob.len());
        out.push(FORMAT_VERSION);
        out.push(header_byte(id_width, event_width));
        push_be_length(id_blob.len(), id_width, &mut out);
        out.extend_from_slice(&id_blob);
        push_be_length(event_blob.len(), event_width, &mut out);
        out.extend_from_slice(&event_blob);
        out
    }

    /// Deserialise a stamp from the compact wire format.
    ///
    /// The decoded trees are taken as-is — serialisation preserves
    /// structure exactly, so a round trip is structural identity.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] when the input is empty, malformed,
    /// truncated, has trailing data, uses counters wider than this build
    /// supports, or was written by an unknown format version.
    pub fn from_bytes(input: &[u8]) -> Result<Self, CodecError> {
        if input.is_empty() {
            return Err(CodecError::EmptyInput);
        }
        let version = input[0];
        if version != FORMAT_VERSION {
            return Err(CodecError::IncompatibleVersion {
                found: version,
                expected: FORMAT_VERSION,
            });
        }

        let mut cursor = 1usize;
        let header = read_u8(input, &mut cursor)?;
        if header & 0xC0 != 0 {
            return Err(CodecError::ReservedBits);
        }
        let id_width = header & 0x07;
        let event_width = (header >> 3) & 0x07;

        let id_len = read_be_length(input, &mut cursor, id_width)?;
        let id_blob = take_slice(input, &mut cursor, id_len)?;
        let id = decode_component(id_blob, decode_id)?;

        let event_len = read_be_length(input, &mut cursor, event_width)?;
        let event_blob = take_slice(input, &mut cursor, event_len)?;
        let event = decode_component(event_blob, decode_event)?;

        if cursor != input.len() {
            return Err(CodecError::TrailingBytes);
        }
        Ok(Self::new(id, event))
    }
}

fn header_byte(id_width: usize, event_width: usize) -> u8 {
    // Widths are 1..=4, so both fit their three header bits.
    (id_width as u8) | ((event_width as u8) << 3)
}

/// Minimal big-endian width of a component length, always at least one byte.
fn length_width(len: usize) -> usize {
    match len {
        0..=0xFF => 1,
        0x100..=0xFFFF => 2,
        0x1_0000..=0xFF_FFFF => 3,
        _ => 4,
    }
}

fn push_be_length(len: usize, width: usize, out: &mut Vec<u8>) {
    let be = (len as u32).to_be_bytes();
    out.extend_from_slice(&be[4 - width..]);
}

fn read_u8(input: &[u8], cursor: &mut usize) -> Result<u8, CodecError> {
    let byte = *input.get(*cursor).ok_or(CodecError::UnexpectedEof)?;
    *cursor += 1;
    Ok(byte)
}

fn take_slice<'a>(input: &'a [u8], cursor: &mut usize, len: usize) -> Result<&'a [u8], CodecError> {
    let end = cursor.checked_add(len).ok_or(CodecError::UnexpectedEof)?;
    if end > input.len() {
        return Err(CodecError::UnexpectedEof);
    }
    let slice = &input[*cursor..end];
    *cursor = end;
    Ok(slice)
}

fn read_be_length(input: &[u8], cursor: &mut usize, width: u8) -> Result<usize, CodecError> {
    if !(1..=4).contains(&width) {
        return Err(CodecError::InvalidLengthWidth(width));
    }
    let raw = take_slice(input, cursor, width as usize)?;
    let mut value = 0usize;
    for &byte in raw {
        value = (value << 8) | usize::from(byte);
    }
    Ok(value)
}

/// Decode one component blob, requiring it to be consumed exactly.
fn decode_component<T>(
    blob: &[u8],
    decode: fn(&[u8], &mut usize) -> Result<T, CodecError>,
) -> Result<T, CodecError> {
    let mut cursor = 0usize;
    let value = decode(blob, &mut cursor)?;
    if cursor != blob.len() {
        return Err(CodecError::LengthMismatch);
    }
    Ok(value)
}

fn encode_id(id: &Id, out: &mut Vec<u8>) {
    match id {
        Id::Zero => out.push(ID_TAG_ZERO),
        Id::One => out.push(ID_TAG_ONE),
        Id::Branch(left, right) => {
            out.push(ID_TAG_BRANCH);
            encode_id(left, out);
            encode_id(right, out);
        }
    }
}

fn decode_id(input: &[u8], cursor: &mut usize) -> Result<Id, CodecError> {
    match read_u8(input, cursor)? {
        ID_TAG_ZERO => Ok(Id::Zero),
        ID_TAG_ONE => Ok(Id::One),
        ID_TAG_BRANCH => {
            let left = decode_id(input, cursor)?;
            let right = decode_id(input, cursor)?;
            Ok(Id::Branch(Box::new(left), Box::new(right)))
        }
        tag => Err(CodecError::UnknownIdTag(tag)),
    }
}

fn encode_event(event: &Event, out: &mut Vec<u8>) {
    let value = event.value();
    let width = COUNTER_WIDTH - value.leading_zeros() as usize / 8;
    out.push(u8::from(!event.is_leaf()) | ((width as u8) << 1));
    let be = value.to_be_bytes();
    out.extend_from_slice(&be[COUNTER_WIDTH - width..]);
    if let Event::Branch(_, left, right) = event {
        encode_event(left, out);
        encode_event(right, out);
    }
}

fn decode_event(input: &[u8], cursor: &mut usize) -> Result<Event, CodecError> {
    let head = read_u8(input, cursor)?;
    if head & 0xE0 != 0 {
        return Err(CodecError::ReservedBits);
    }
    let is_branch = head & 0x01 != 0;
    let width = usize::from((head >> 1) & 0x0F);
    if width > COUNTER_WIDTH {
        return Err(CodecError::UnsupportedCounterWidth {
            found: width,
            max: COUNTER_WIDTH,
        });
    }
    let raw = take_slice(input, cursor, width)?;
    let mut value: Counter = 0;
    for &byte in raw {
        value = (value << 8) | Counter::from(byte);
    }
    if is_branch {
        let left = decode_event(input, cursor)?;
        let right = decode_event(input, cursor)?;
        Ok(Event::branch(value, left, right))
    } else {
        Ok(Event::leaf(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forked_worked_stamp() -> Stamp {
        let (mut a, mut b) = Stamp::seed().fork();
        a.event().expect("event");
        b.event().expect("event");
        b.event().expect("event");
        let (mut ba, _) = b.fork();
        ba.event().expect("event");
        Stamp::join(&a, &ba).expect("join")
    }

    // === golden bytes =======================================================

    #[test]
    fn seed_stamp_has_stable_bytes() {
        // version, header (1-byte lengths), id len 1, seed leaf,
        // event len 1, zero leaf with omitted counter.
        assert_eq!(Stamp::seed().to_bytes(), vec![0x01, 0x09, 0x01, 0x02, 0x01, 0x00]);
    }

    #[test]
    fn counter_bytes_are_minimal_big_endian() {
        let stamp = Stamp::new(Id::one(), Event::leaf(0x0123));
        assert_eq!(
            stamp.to_bytes(),
            vec![0x01, 0x09, 0x01, 0x02, 0x03, 0x04, 0x01, 0x23]
        );
    }

    // === round trips ========================================================

    #[test]
    fn seed_roundtrips() {
        let stamp = Stamp::seed();
        assert_eq!(Stamp::from_bytes(&stamp.to_bytes()), Ok(stamp));
    }

    #[test]
    fn worked_stamp_roundtrips() {
        let stamp = forked_worked_stamp();
        assert_eq!(Stamp::from_bytes(&stamp.to_bytes()), Ok(stamp));
    }

    #[test]
    fn large_counters_roundtrip() {
        let stamp = Stamp::new(
            Id::branch(Id::one(), Id::zero()),
            Event::branch(Counter::MAX, Event::leaf(0), Event::leaf(0x8081)),
        );
        assert_eq!(Stamp::from_bytes(&stamp.to_bytes()), Ok(stamp));
    }

    #[test]
    fn non_minimal_length_width_is_accepted() {
        // Same seed stamp, but with 2-byte length fields.
        let bytes = vec![
            0x01, 0x12, 0x00, 0x01, 0x02, 0x00, 0x01, 0x00,
        ];
        assert_eq!(Stamp::from_bytes(&bytes), Ok(Stamp::seed()));
    }

    // === rejects ============================================================

    #[test]
    fn empty_input_is_rejected() {
        assert_eq!(Stamp::from_bytes(&[]), Err(CodecError::EmptyInput));
    }

    #[test]
    fn unknown_version_is_rejected() {
        let mut bytes = Stamp::seed().to_bytes();
        bytes[0] = 9;
        assert_eq!(
            Stamp::from_bytes(&bytes),
            Err(CodecError::IncompatibleVersion {
                found: 9,
                expected: FORMAT_VERSION
            })
        );
    }

    #[test]
    fn reserved_stamp_header_bits_are_rejected() {
        let mut bytes = Stamp::seed().to_bytes();
        bytes[1] |= 0x40;
        assert_eq!(Stamp::from_bytes(&bytes), Err(CodecError::ReservedBits));
    }

    #[test]
    fn reserved_event_header_bits_are_rejected() {
        let mut bytes = Stamp::seed().to_bytes();
        let last = bytes.len() - 1;
        bytes[last] |= 0x20;
        assert_eq!(Stamp::from_bytes(&bytes), Err(CodecError::ReservedBits));
    }

    #[test]
    fn zero_length_width_is_rejected() {
        // Header claims a 0-byte Id length field.
        let bytes = vec![0x01, 0x08, 0x01, 0x02, 0x01, 0x00];
        assert_eq!(
            Stamp::from_bytes(&bytes),
            Err(CodecError::InvalidLengthWidth(0))
        );
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut bytes = Stamp::seed().to_bytes();
        bytes.push(0x00);
        assert_eq!(Stamp::from_bytes(&bytes), Err(CodecError::TrailingBytes));
    }

    #[test]
    fn truncated_input_is_rejected() {
        let bytes = forked_worked_stamp().to_bytes();
        for end in 1..bytes.len() {
            assert!(
                Stamp::from_bytes(&bytes[..end]).is_err(),
                "truncation at {end} must not decode"
            );
        }
    }

    #[test]
    fn overrunning_length_field_is_rejected() {
        // Id component claims 9 bytes but only the seed leaf follows.
        let bytes = vec![0x01, 0x09, 0x09, 0x02, 0x01, 0x00];
        assert_eq!(Stamp::from_bytes(&bytes), Err(CodecError::UnexpectedEof));
    }

    #[test]
    fn short_component_blob_is_rejected() {
        // Id component declares 2 bytes but its single leaf consumes 1.
        let bytes = vec![0x01, 0x09, 0x02, 0x02, 0x02, 0x01, 0x00];
        assert_eq!(Stamp::from_bytes(&bytes), Err(CodecError::LengthMismatch));
    }

    #[test]
    fn unknown_id_tag_is_rejected() {
        let bytes = vec![0x01, 0x09, 0x01, 0x03, 0x01, 0x00];
        assert_eq!(Stamp::from_bytes(&bytes), Err(CodecError::UnknownIdTag(0x03)));
    }

    #[test]
    fn too_wide_counter_is_rejected() {
        // Event leaf claiming a counter wider than the build's counter type.
        let width = COUNTER_WIDTH as u8 + 1;
        let mut event_blob = vec![width << 1];
        event_blob.extend(vec![0x01u8; usize::from(width)]);
        let mut bytes = vec![0x01, 0x09, 0x01, 0x02, event_blob.len() as u8];
        bytes.extend_from_slice(&event_blob);
        assert_eq!(
            Stamp::from_bytes(&bytes),
            Err(CodecError::UnsupportedCounterWidth {
                found: usize::from(width),
                max: COUNTER_WIDTH,
            })
        );
    }

    #[test]
    fn decoded_trees_preserve_wire_structure() {
        // A non-normal tree survives a round trip unchanged; the codec does
        // not canonicalise behind the caller's back.
        let stamp = Stamp::new(
            Id::Branch(Box::new(Id::One), Box::new(Id::One)),
            Event::branch(1, Event::leaf(2), Event::leaf(2)),
        );
        assert_eq!(Stamp::from_bytes(&stamp.to_bytes()), Ok(stamp));
    }
}
