//! Per-batch error table.

use crate::error::{Result, StatusCode};
use crate::protocol::{cmd, CommandPacker};

/// Business errors recorded while processing one batch.
///
/// Keyed by opcode, in the order each opcode first failed. A later failure
/// for the same opcode replaces the earlier status in place.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ErrorTable {
    entries: Vec<(i32, StatusCode)>,
}

impl ErrorTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `status` for `opcode`, overwriting an earlier entry.
    pub fn record(&mut self, opcode: i32, status: StatusCode) {
        match self.entries.iter_mut().find(|(op, _)| *op == opcode) {
            Some(entry) => entry.1 = status,
            None => self.entries.push((opcode, status)),
        }
    }

    /// Status recorded for `opcode`.
    pub fn get(&self, opcode: i32) -> Option<StatusCode> {
        self.entries
            .iter()
            .find(|(op, _)| *op == opcode)
            .map(|(_, status)| *status)
    }

    /// Iterate entries in recording order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, StatusCode)> + '_ {
        self.entries.iter().copied()
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no errors were recorded.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Append the `REPLY_SET_ERROR` section: count, then `(opcode, code)` pairs.
    ///
    /// Written even when empty.
    pub fn pack(&self, packer: &mut CommandPacker) -> Result<()> {
        packer.start_section(cmd::REPLY_SET_ERROR)?;
        packer.write_u32(self.entries.len() as u32);
        for (opcode, status) in &self.entries {
            packer.write_i32(*opcode);
            packer.write_i32(status.code());
        }
        packer.end_section()
    }
}
