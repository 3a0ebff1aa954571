//! Protocol module - wire format, packing, and unpacking.
//!
//! This module implements the section-framed binary format of command and
//! reply batches:
//! - Section header encoding/decoding and opcode constants
//! - [`CommandPacker`] for building a batch
//! - [`CommandUnpacker`] for walking a received batch

mod packer;
mod unpacker;
mod wire_format;

pub use packer::CommandPacker;
pub use unpacker::CommandUnpacker;
pub use wire_format::{
    cmd, command_to_str, SectionHeader, ELEMENT_SIZE, INVALID_FD_ID, SECTION_HEADER_SIZE,
};
