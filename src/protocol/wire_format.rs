//! Wire format constants and section header encoding.
//!
//! A batch is a flat little-endian buffer of 4-byte elements:
//! ```text
//! ┌────────────┬────────────┬───────────┬─────┬───────────┐
//! │ Begin cmd  │ Batch len  │ Section 0 │ ... │ End sect. │
//! │ int32 LE   │ uint32 LE  │           │     │           │
//! └────────────┴────────────┴───────────┴─────┴───────────┘
//!
//! Section:
//! ┌────────────┬────────────┬──────────────────────────┐
//! │ Opcode     │ Sect. len  │ Fields (element aligned) │
//! │ int32 LE   │ uint32 LE  │                          │
//! └────────────┴────────────┴──────────────────────────┘
//! ```
//!
//! Both lengths are in bytes and include their own 8-byte header.
//!
//! A reply ends `[REPLY_SET_ERROR section][REPLY_END section]`: the error
//! table always precedes the end marker.

use crate::error::{ComposerError, Result};

/// Size of one transport element in bytes.
pub const ELEMENT_SIZE: usize = 4;

/// Size of the batch header and of every section header in bytes.
pub const SECTION_HEADER_SIZE: usize = 8;

/// Sentinel descriptor id meaning "no descriptor".
pub const INVALID_FD_ID: i32 = -1;

/// Command opcodes.
pub mod cmd {
    /// Prepare layers for composition; replies with composition changes.
    pub const REQUEST_PREPARE_DISPLAY_LAYERS: i32 = 64;
    /// Bind the client (GPU-composed) target buffer.
    pub const REQUEST_SET_DISPLAY_CLIENT_BUFFER: i32 = 65;
    /// Damage rectangles of the client buffer.
    pub const REQUEST_SET_DISPLAY_CLIENT_DAMAGE: i32 = 66;
    /// Commit the frame; replies with a release fence.
    pub const REQUEST_COMMIT: i32 = 67;
    /// Layer alpha.
    pub const REQUEST_SET_LAYER_ALPHA: i32 = 68;
    /// Layer display region.
    pub const REQUEST_SET_LAYER_REGION: i32 = 69;
    /// Layer crop rectangle.
    pub const REQUEST_SET_LAYER_CROP: i32 = 70;
    /// Layer z-order.
    pub const REQUEST_SET_LAYER_ZORDER: i32 = 71;
    /// Layer premultiplied-alpha flag.
    pub const REQUEST_SET_LAYER_PREMULTI: i32 = 72;
    /// Layer transform.
    pub const REQUEST_SET_LAYER_TRANSFORM_MODE: i32 = 73;
    /// Layer dirty region.
    pub const REQUEST_SET_LAYER_DIRTY_REGION: i32 = 74;
    /// Layer visible region.
    pub const REQUEST_SET_LAYER_VISIBLE_REGION: i32 = 75;
    /// Layer buffer (cached by sequence number).
    pub const REQUEST_SET_LAYER_BUFFER: i32 = 76;
    /// Layer composition type.
    pub const REQUEST_SET_LAYER_COMPOSITION_TYPE: i32 = 77;
    /// Layer blend type.
    pub const REQUEST_SET_LAYER_BLEND_TYPE: i32 = 78;
    /// Layer visibility (reserved, no handler).
    pub const REQUEST_SET_LAYER_VISIBLE: i32 = 79;
    /// Layer mask info.
    pub const REQUEST_SET_LAYER_MASK_INFO: i32 = 80;
    /// Layer solid colour.
    pub const REQUEST_SET_LAYER_COLOR: i32 = 81;

    /// Error table section of a reply.
    pub const REPLY_SET_ERROR: i32 = 512;
    /// Reply to PREPARE_DISPLAY_LAYERS.
    pub const REPLY_PREPARE_DISPLAY_LAYERS: i32 = 513;
    /// Reply to COMMIT.
    pub const REPLY_COMMIT: i32 = 514;

    /// Request batch begin marker.
    pub const CONTROL_REQUEST_BEGIN: i32 = 1024;
    /// Reply batch begin marker.
    pub const CONTROL_REPLY_BEGIN: i32 = 1025;
    /// Request batch end section.
    pub const CONTROL_REQUEST_END: i32 = 1026;
    /// Reply batch end section.
    pub const CONTROL_REPLY_END: i32 = 1027;
}

/// Human-readable name of an opcode, for logs.
pub fn command_to_str(opcode: i32) -> &'static str {
    match opcode {
        cmd::REQUEST_PREPARE_DISPLAY_LAYERS => "REQUEST_CMD_PREPARE_DISPLAY_LAYERS",
        cmd::REQUEST_SET_DISPLAY_CLIENT_BUFFER => "REQUEST_CMD_SET_DISPLAY_CLIENT_BUFFER",
        cmd::REQUEST_SET_DISPLAY_CLIENT_DAMAGE => "REQUEST_CMD_SET_DISPLAY_CLIENT_DAMAGE",
        cmd::REQUEST_COMMIT => "REQUEST_CMD_COMMIT",
        cmd::REQUEST_SET_LAYER_ALPHA => "REQUEST_CMD_SET_LAYER_ALPHA",
        cmd::REQUEST_SET_LAYER_REGION => "REQUEST_CMD_SET_LAYER_REGION",
        cmd::REQUEST_SET_LAYER_CROP => "REQUEST_CMD_SET_LAYER_CROP",
        cmd::REQUEST_SET_LAYER_ZORDER => "REQUEST_CMD_SET_LAYER_ZORDER",
        cmd::REQUEST_SET_LAYER_PREMULTI => "REQUEST_CMD_SET_LAYER_PREMULTI",
        cmd::REQUEST_SET_LAYER_TRANSFORM_MODE => "REQUEST_CMD_SET_LAYER_TRANSFORM_MODE",
        cmd::REQUEST_SET_LAYER_DIRTY_REGION => "REQUEST_CMD_SET_LAYER_DIRTY_REGION",
        cmd::REQUEST_SET_LAYER_VISIBLE_REGION => "REQUEST_CMD_SET_LAYER_VISIBLE_REGION",
        cmd::REQUEST_SET_LAYER_BUFFER => "REQUEST_CMD_SET_LAYER_BUFFER",
        cmd::REQUEST_SET_LAYER_COMPOSITION_TYPE => "REQUEST_CMD_SET_LAYER_COMPOSITION_TYPE",
        cmd::REQUEST_SET_LAYER_BLEND_TYPE => "REQUEST_CMD_SET_LAYER_BLEND_TYPE",
        cmd::REQUEST_SET_LAYER_VISIBLE => "REQUEST_CMD_SET_LAYER_VISIBLE",
        cmd::REQUEST_SET_LAYER_MASK_INFO => "REQUEST_CMD_SET_LAYER_MASK_INFO",
        cmd::REQUEST_SET_LAYER_COLOR => "REQUEST_CMD_SET_LAYER_COLOR",
        cmd::REPLY_SET_ERROR => "REPLY_CMD_SET_ERROR",
        cmd::REPLY_PREPARE_DISPLAY_LAYERS => "REPLY_CMD_PREPARE_DISPLAY_LAYERS",
        cmd::REPLY_COMMIT => "REPLY_CMD_COMMIT",
        cmd::CONTROL_REQUEST_BEGIN => "CONTROL_CMD_REQUEST_BEGIN",
        cmd::CONTROL_REPLY_BEGIN => "CONTROL_CMD_REPLY_BEGIN",
        cmd::CONTROL_REQUEST_END => "CONTROL_CMD_REQUEST_END",
        cmd::CONTROL_REPLY_END => "CONTROL_CMD_REPLY_END",
        _ => "unknown command",
    }
}

/// Decoded section header (also used for the batch header).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionHeader {
    /// Section opcode.
    pub opcode: i32,
    /// Section length in bytes, header included.
    pub length: u32,
}

impl SectionHeader {
    /// Create a new header.
    pub fn new(opcode: i32, length: u32) -> Self {
        Self { opcode, length }
    }

    /// Encode header to bytes (Little Endian).
    pub fn encode(&self) -> [u8; SECTION_HEADER_SIZE] {
        let mut buf = [0u8; SECTION_HEADER_SIZE];
        self.encode_into(&mut buf);
        buf
    }

    /// Encode header into an existing buffer.
    ///
    /// # Panics
    ///
    /// Panics if buffer is smaller than `SECTION_HEADER_SIZE` (8 bytes).
    pub fn encode_into(&self, buf: &mut [u8]) {
        debug_assert!(buf.len() >= SECTION_HEADER_SIZE);
        buf[0..4].copy_from_slice(&self.opcode.to_le_bytes());
        buf[4..8].copy_from_slice(&self.length.to_le_bytes());
    }

    /// Decode header from bytes.
    ///
    /// Returns `None` if buffer is too short.
    ///
    /// # Example
    ///
    /// ```
    /// use composer_cmd::protocol::SectionHeader;
    ///
    /// let bytes = [0x40, 0, 0, 0, 12, 0, 0, 0];
    /// let header = SectionHeader::decode(&bytes).unwrap();
    /// assert_eq!(header.opcode, 64);
    /// assert_eq!(header.length, 12);
    /// ```
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < SECTION_HEADER_SIZE {
            return None;
        }
        Some(Self {
            opcode: i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            length: u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
        })
    }

    /// Validate the section against the region it must fit in.
    ///
    /// Checks:
    /// - Length covers at least the header
    /// - Length is element aligned
    /// - Section does not run past `limit`
    pub fn validate(&self, offset: usize, limit: usize) -> Result<()> {
        let length = self.length as usize;
        if length < SECTION_HEADER_SIZE {
            return Err(ComposerError::Protocol(format!(
                "Section {} length {} is shorter than its header",
                command_to_str(self.opcode),
                length
            )));
        }

        if length % ELEMENT_SIZE != 0 {
            return Err(ComposerError::Protocol(format!(
                "Section {} length {} is not element aligned",
                command_to_str(self.opcode),
                length
            )));
        }

        if offset + length > limit {
            return Err(ComposerError::Protocol(format!(
                "Section {} at offset {} with length {} exceeds batch end {}",
                command_to_str(self.opcode),
                offset,
                length,
                limit
            )));
        }

        Ok(())
    }
}

/// Round a byte count up to a whole number of elements.
#[inline]
pub fn align_to_element(len: usize) -> usize {
    (len + ELEMENT_SIZE - 1) / ELEMENT_SIZE * ELEMENT_SIZE
}
