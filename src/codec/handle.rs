//! Buffer handle codec.
//!
//! Layout: `[valid:bool]`, then only when valid:
//! `[fd ref][width][stride][height][size][format][usage:u64][phy_addr:u64]`
//! `[reserve fd count][fd ref...][reserve int count][i32...]`.
//! Descriptors travel through the side-channel; the payload carries their ids.

use super::{WireDecode, WireEncode};
use crate::buffer::BufferHandle;
use crate::error::{ComposerError, Result};
use crate::fd::{file_descriptor_pack, file_descriptor_unpack, FdSet};
use crate::protocol::{CommandPacker, CommandUnpacker, ELEMENT_SIZE};

/// Encode an optional buffer handle, moving its descriptors into `out`.
pub fn buffer_handle_pack(handle: Option<BufferHandle>, packer: &mut CommandPacker, out: &mut FdSet) {
    let Some(handle) = handle else {
        packer.write_bool(false);
        return;
    };

    packer.write_bool(true);
    file_descriptor_pack(handle.fd, packer, out);
    packer.write_i32(handle.width);
    packer.write_i32(handle.stride);
    packer.write_i32(handle.height);
    packer.write_i32(handle.size);
    packer.write_i32(handle.format);
    packer.write_u64(handle.usage);
    packer.write_u64(handle.phy_addr);

    packer.write_u32(handle.reserve_fds.len() as u32);
    for fd in handle.reserve_fds {
        file_descriptor_pack(fd, packer, out);
    }
    handle.reserve_ints.encode(packer);
}

/// Decode an optional buffer handle, taking its descriptors from `inbound`.
///
/// `Ok(None)` means the sender relies on a cached handle. Descriptors taken
/// before a decode failure are closed when the partial handle drops.
pub fn buffer_handle_unpack(
    unpacker: &mut CommandUnpacker,
    inbound: &mut FdSet,
) -> Result<Option<BufferHandle>> {
    if !unpacker.read_bool()? {
        return Ok(None);
    }

    let mut handle = BufferHandle {
        fd: file_descriptor_unpack(unpacker, inbound)?,
        width: unpacker.read_i32()?,
        stride: unpacker.read_i32()?,
        height: unpacker.read_i32()?,
        size: unpacker.read_i32()?,
        format: unpacker.read_i32()?,
        usage: unpacker.read_u64()?,
        phy_addr: unpacker.read_u64()?,
        ..Default::default()
    };

    let fd_count = unpacker.read_u32()? as usize;
    if fd_count.saturating_mul(ELEMENT_SIZE) > unpacker.remaining() {
        return Err(ComposerError::Protocol(format!(
            "Buffer handle declares {} reserve descriptors, section has {} bytes",
            fd_count,
            unpacker.remaining()
        )));
    }
    handle.reserve_fds.reserve(fd_count);
    for _ in 0..fd_count {
        handle
            .reserve_fds
            .push(file_descriptor_unpack(unpacker, inbound)?);
    }
    handle.reserve_ints = Vec::<i32>::decode(unpacker)?;

    Ok(Some(handle))
}
