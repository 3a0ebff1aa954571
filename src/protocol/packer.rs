//! Encode side of the command protocol.
//!
//! Builds one batch in a single growable `BytesMut`. Sections are opened with
//! [`CommandPacker::start_section`] and closed with
//! [`CommandPacker::end_section`], which patches the section length in place.
//!
//! # Example
//!
//! ```
//! use composer_cmd::protocol::{cmd, CommandPacker};
//!
//! let mut packer = CommandPacker::with_capacity(256);
//! packer.start_pack(cmd::CONTROL_REQUEST_BEGIN).unwrap();
//! packer.start_section(cmd::REQUEST_COMMIT).unwrap();
//! packer.write_u32(0);
//! packer.end_section().unwrap();
//! packer.pack_end(cmd::CONTROL_REQUEST_END).unwrap();
//!
//! // begin header + commit section (8 + 4) + end section
//! assert_eq!(packer.valid_size(), 8 + 12 + 8);
//! ```

use bytes::{BufMut, BytesMut};

use super::wire_format::{
    align_to_element, command_to_str, SectionHeader, ELEMENT_SIZE, SECTION_HEADER_SIZE,
};
use crate::error::{ComposerError, Result};

/// Builder for one command or reply batch.
#[derive(Debug)]
pub struct CommandPacker {
    /// Encoded bytes; always a whole number of elements.
    buffer: BytesMut,
    /// Offset of the currently open section, if any.
    section_start: Option<usize>,
    /// Set once `init` has reserved storage.
    initialized: bool,
}

impl CommandPacker {
    /// Create a packer with no storage. `start_pack` fails until `init` runs.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
            section_start: None,
            initialized: false,
        }
    }

    /// Create an initialized packer with `capacity` bytes reserved.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut packer = Self::new();
        packer.init(capacity);
        packer
    }

    /// Reserve storage and mark the packer usable.
    pub fn init(&mut self, capacity: usize) {
        self.buffer = BytesMut::with_capacity(capacity);
        self.section_start = None;
        self.initialized = true;
    }

    /// Check if `init` has run.
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Discard any content and write the batch header for `begin_opcode`.
    ///
    /// The batch length is left at zero until `pack_end` patches it.
    pub fn start_pack(&mut self, begin_opcode: i32) -> Result<()> {
        if !self.initialized {
            return Err(ComposerError::Protocol(format!(
                "Packer not initialized for {}",
                command_to_str(begin_opcode)
            )));
        }
        self.buffer.clear();
        self.section_start = None;
        self.buffer
            .extend_from_slice(&SectionHeader::new(begin_opcode, 0).encode());
        Ok(())
    }

    /// Open a section for `opcode`.
    ///
    /// Sections do not nest; a section left open is an error.
    pub fn start_section(&mut self, opcode: i32) -> Result<()> {
        self.ensure_started()?;
        if let Some(open) = self.section_start {
            return Err(ComposerError::Protocol(format!(
                "Cannot start {}: section at offset {} still open",
                command_to_str(opcode),
                open
            )));
        }
        self.section_start = Some(self.buffer.len());
        self.buffer
            .extend_from_slice(&SectionHeader::new(opcode, 0).encode());
        Ok(())
    }

    /// Close the open section and patch its length.
    pub fn end_section(&mut self) -> Result<()> {
        let start = self
            .section_start
            .take()
            .ok_or_else(|| ComposerError::Protocol("No open section to end".to_string()))?;
        let length = (self.buffer.len() - start) as u32;
        self.buffer[start + 4..start + 8].copy_from_slice(&length.to_le_bytes());
        Ok(())
    }

    /// Drop the open section and everything written into it.
    ///
    /// Used when a handler fails after its reply section was started.
    pub fn abort_section(&mut self) {
        if let Some(start) = self.section_start.take() {
            self.buffer.truncate(start);
        }
    }

    /// Check if a section is currently open.
    #[inline]
    pub fn has_open_section(&self) -> bool {
        self.section_start.is_some()
    }

    /// Append the end section and patch the batch length.
    pub fn pack_end(&mut self, end_opcode: i32) -> Result<()> {
        self.start_section(end_opcode)?;
        self.end_section()?;
        let length = self.buffer.len() as u32;
        self.buffer[4..8].copy_from_slice(&length.to_le_bytes());
        Ok(())
    }

    /// Write a signed 32-bit value.
    #[inline]
    pub fn write_i32(&mut self, value: i32) {
        self.buffer.put_i32_le(value);
    }

    /// Write an unsigned 32-bit value.
    #[inline]
    pub fn write_u32(&mut self, value: u32) {
        self.buffer.put_u32_le(value);
    }

    /// Write an unsigned 64-bit value (two elements).
    #[inline]
    pub fn write_u64(&mut self, value: u64) {
        self.buffer.put_u64_le(value);
    }

    /// Write a bool widened to one element.
    #[inline]
    pub fn write_bool(&mut self, value: bool) {
        self.buffer.put_u32_le(u32::from(value));
    }

    /// Write a byte widened to one element.
    #[inline]
    pub fn write_u8(&mut self, value: u8) {
        self.buffer.put_u32_le(u32::from(value));
    }

    /// Write raw bytes, zero-padded to a whole element.
    pub fn write_raw(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
        self.buffer
            .put_bytes(0, align_to_element(data.len()) - data.len());
    }

    /// Number of valid bytes in the batch.
    #[inline]
    pub fn valid_size(&self) -> usize {
        self.buffer.len()
    }

    /// Number of valid elements in the batch.
    #[inline]
    pub fn valid_elements(&self) -> usize {
        self.buffer.len() / ELEMENT_SIZE
    }

    /// Encoded bytes, for handing to the transport.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.buffer
    }

    fn ensure_started(&self) -> Result<()> {
        if self.buffer.len() < SECTION_HEADER_SIZE {
            return Err(ComposerError::Protocol(
                "Batch not started, call start_pack first".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for CommandPacker {
    fn default() -> Self {
        Self::new()
    }
}
