//! Descriptor side-channel.
//!
//! File descriptors cannot travel inside the byte payload. Instead the payload
//! carries a small integer id and the descriptor itself rides in an [`FdSet`]
//! handed to the transport alongside the batch. Ids are assigned by a
//! per-batch counter on the sending side.
//!
//! Ownership follows `OwnedFd`: a descriptor taken out of an inbound set
//! belongs to the caller (closed on drop unless forwarded), and a descriptor
//! packed into an outbound set belongs to the set until the transport hands it
//! to the peer.

use std::os::fd::OwnedFd;

use crate::error::{ComposerError, Result};
use crate::protocol::{CommandPacker, CommandUnpacker, INVALID_FD_ID};

/// One positional descriptor record.
#[derive(Debug)]
pub struct FdInfo {
    /// Id referenced from the payload.
    pub id: i32,
    /// The descriptor; `None` once taken or if the sender had none.
    pub fd: Option<OwnedFd>,
}

impl FdInfo {
    /// Check if the record still holds a descriptor.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.fd.is_some()
    }
}

/// Ordered list of descriptor records travelling with one batch.
#[derive(Debug, Default)]
pub struct FdSet {
    entries: Vec<FdInfo>,
    next_id: i32,
}

impl FdSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a descriptor under the next free id and return that id.
    ///
    /// The counter stops at `i32::MAX`.
    pub fn push(&mut self, fd: OwnedFd) -> i32 {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        self.entries.push(FdInfo { id, fd: Some(fd) });
        id
    }

    /// Insert a record received from the transport.
    ///
    /// Ids come from the peer; any value is accepted.
    pub fn insert(&mut self, info: FdInfo) {
        if info.id >= self.next_id {
            self.next_id = info.id.saturating_add(1);
        }
        self.entries.push(info);
    }

    /// Take ownership of the descriptor with `id`.
    ///
    /// Returns `None` if no such record exists or it was already taken.
    pub fn take(&mut self, id: i32) -> Option<OwnedFd> {
        self.entries
            .iter_mut()
            .find(|info| info.id == id)
            .and_then(|info| info.fd.take())
    }

    /// Number of records.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the set has no records.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every record (closing untaken descriptors) and restart ids at 0.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.next_id = 0;
    }

    /// Iterate over the records.
    pub fn iter(&self) -> impl Iterator<Item = &FdInfo> {
        self.entries.iter()
    }

    /// Consume the set, yielding its records for the transport.
    pub fn into_vec(self) -> Vec<FdInfo> {
        self.entries
    }
}

/// Move `fd` into `out` and write its id (or the invalid id) to the payload.
pub fn file_descriptor_pack(fd: Option<OwnedFd>, packer: &mut CommandPacker, out: &mut FdSet) {
    let id = match fd {
        Some(fd) => out.push(fd),
        None => INVALID_FD_ID,
    };
    packer.write_i32(id);
}

/// Read a descriptor id from the payload and take the matching descriptor.
///
/// The invalid id decodes to `None`. An id with no matching record is a
/// decode error.
pub fn file_descriptor_unpack(
    unpacker: &mut CommandUnpacker,
    inbound: &mut FdSet,
) -> Result<Option<OwnedFd>> {
    let id = unpacker.read_i32()?;
    if id == INVALID_FD_ID {
        return Ok(None);
    }
    inbound
        .take(id)
        .map(Some)
        .ok_or_else(|| ComposerError::Protocol(format!("No descriptor for id {}", id)))
}
