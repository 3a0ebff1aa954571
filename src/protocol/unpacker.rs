//! Decode side of the command protocol.
//!
//! Walks a received batch section by section. The unpacker is a forward-only
//! cursor: `pack_begin` validates the batch header, then each
//! `next_section` / `begin_section` pair positions the cursor at the fields of
//! the next section. Typed reads are bounded by the current section, so a
//! handler can never read into its neighbour, and a handler that stops early
//! leaves the next section intact.
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use composer_cmd::protocol::{cmd, CommandPacker, CommandUnpacker};
//!
//! let mut packer = CommandPacker::with_capacity(64);
//! packer.start_pack(cmd::CONTROL_REQUEST_BEGIN).unwrap();
//! packer.start_section(cmd::REQUEST_COMMIT).unwrap();
//! packer.write_u32(3);
//! packer.end_section().unwrap();
//! packer.pack_end(cmd::CONTROL_REQUEST_END).unwrap();
//!
//! let mut unpacker = CommandUnpacker::new(Bytes::copy_from_slice(packer.data()));
//! assert_eq!(unpacker.pack_begin().unwrap(), cmd::CONTROL_REQUEST_BEGIN);
//! assert!(unpacker.next_section());
//! assert_eq!(unpacker.begin_section().unwrap(), cmd::REQUEST_COMMIT);
//! assert_eq!(unpacker.read_u32().unwrap(), 3);
//! ```

use bytes::Bytes;

use super::wire_format::{command_to_str, SectionHeader, ELEMENT_SIZE, SECTION_HEADER_SIZE};
use crate::error::{ComposerError, Result};

/// Cursor over one received batch.
#[derive(Debug)]
pub struct CommandUnpacker {
    /// Received bytes (zero-copy slices are handed out from here).
    data: Bytes,
    /// End of the batch as declared by its header.
    limit: usize,
    /// Current read offset.
    pos: usize,
    /// End of the readable region of the current section.
    section_end: usize,
    /// Offset of the next section header.
    next_section: usize,
}

impl CommandUnpacker {
    /// Wrap a received batch. Nothing is validated until `pack_begin`.
    pub fn new(data: Bytes) -> Self {
        Self {
            data,
            limit: 0,
            pos: 0,
            section_end: 0,
            next_section: 0,
        }
    }

    /// Read and validate the batch header, returning its begin opcode.
    pub fn pack_begin(&mut self) -> Result<i32> {
        let header = SectionHeader::decode(&self.data).ok_or_else(|| {
            ComposerError::Protocol(format!(
                "Batch of {} bytes is too short for a header",
                self.data.len()
            ))
        })?;

        let length = header.length as usize;
        if length < SECTION_HEADER_SIZE || length % ELEMENT_SIZE != 0 || length > self.data.len()
        {
            return Err(ComposerError::Protocol(format!(
                "Batch {} declares length {} but {} bytes were received",
                command_to_str(header.opcode),
                length,
                self.data.len()
            )));
        }

        self.limit = length;
        self.pos = SECTION_HEADER_SIZE;
        self.section_end = SECTION_HEADER_SIZE;
        self.next_section = SECTION_HEADER_SIZE;
        Ok(header.opcode)
    }

    /// Advance to the next section.
    ///
    /// Returns `false` at the end of the batch (or before `pack_begin`).
    pub fn next_section(&mut self) -> bool {
        if self.next_section >= self.limit {
            return false;
        }
        self.pos = self.next_section;
        self.section_end = self.next_section;
        true
    }

    /// Read the header of the section at the cursor, returning its opcode.
    ///
    /// A failure here means the framing is broken and the batch must be
    /// abandoned.
    pub fn begin_section(&mut self) -> Result<i32> {
        let start = self.pos;
        let header = self
            .data
            .get(start..self.limit)
            .and_then(SectionHeader::decode)
            .ok_or_else(|| {
                ComposerError::Protocol(format!(
                    "Truncated section header at offset {} (batch end {})",
                    start, self.limit
                ))
            })?;
        header.validate(start, self.limit)?;

        let end = start + header.length as usize;
        self.pos = start + SECTION_HEADER_SIZE;
        self.section_end = end;
        self.next_section = end;
        Ok(header.opcode)
    }

    /// Bytes left unread in the current section.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.section_end.saturating_sub(self.pos)
    }

    /// Unread remainder of the current section (zero-copy).
    pub fn section_payload(&self) -> Bytes {
        self.data.slice(self.pos..self.section_end.max(self.pos))
    }

    /// Read a signed 32-bit value.
    pub fn read_i32(&mut self) -> Result<i32> {
        let b = self.take::<4>()?;
        Ok(i32::from_le_bytes(b))
    }

    /// Read an unsigned 32-bit value.
    pub fn read_u32(&mut self) -> Result<u32> {
        let b = self.take::<4>()?;
        Ok(u32::from_le_bytes(b))
    }

    /// Read an unsigned 64-bit value.
    pub fn read_u64(&mut self) -> Result<u64> {
        let b = self.take::<8>()?;
        Ok(u64::from_le_bytes(b))
    }

    /// Read a bool element. Any non-zero value is `true`.
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u32()? != 0)
    }

    /// Read a byte element.
    pub fn read_u8(&mut self) -> Result<u8> {
        let value = self.read_u32()?;
        u8::try_from(value).map_err(|_| ComposerError::InvalidValue {
            field: "u8",
            value: i64::from(value),
        })
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let end = self.pos + N;
        if end > self.section_end {
            return Err(ComposerError::Truncated {
                offset: self.pos,
                needed: N,
                end: self.section_end,
            });
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.pos..end]);
        self.pos = end;
        Ok(out)
    }
}
