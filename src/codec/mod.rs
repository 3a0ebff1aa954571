//! Codec module - typed values on top of the section packer/unpacker.
//!
//! - [`WireEncode`] / [`WireDecode`] - fixed-layout values (scalars, vectors,
//!   rectangles, colours, alpha)
//! - [`buffer_handle_pack`] / [`buffer_handle_unpack`] - buffer descriptors,
//!   which also need the descriptor side-channel
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use composer_cmd::codec::{WireDecode, WireEncode};
//! use composer_cmd::protocol::{cmd, CommandPacker, CommandUnpacker};
//! use composer_cmd::types::Rect;
//!
//! let rects = vec![Rect::new(0, 0, 64, 32), Rect::new(8, 8, 16, 16)];
//!
//! let mut packer = CommandPacker::with_capacity(128);
//! packer.start_pack(cmd::CONTROL_REQUEST_BEGIN).unwrap();
//! packer.start_section(cmd::REQUEST_SET_DISPLAY_CLIENT_DAMAGE).unwrap();
//! rects.encode(&mut packer);
//! packer.end_section().unwrap();
//! packer.pack_end(cmd::CONTROL_REQUEST_END).unwrap();
//!
//! let mut unpacker = CommandUnpacker::new(Bytes::copy_from_slice(packer.data()));
//! unpacker.pack_begin().unwrap();
//! unpacker.next_section();
//! unpacker.begin_section().unwrap();
//! let decoded = Vec::<Rect>::decode(&mut unpacker).unwrap();
//! assert_eq!(decoded, rects);
//! ```

mod display;
mod handle;
mod scalar;

pub use handle::{buffer_handle_pack, buffer_handle_unpack};

use crate::error::Result;
use crate::protocol::{CommandPacker, CommandUnpacker};

/// A value with a fixed wire layout.
pub trait WireEncode {
    /// Append the value to the open section.
    fn encode(&self, packer: &mut CommandPacker);
}

/// A value that can be read back from a section.
pub trait WireDecode: Sized {
    /// Smallest encoded size in bytes, used to bound vector preallocation.
    const MIN_WIRE_SIZE: usize;

    /// Read the value at the cursor.
    fn decode(unpacker: &mut CommandUnpacker) -> Result<Self>;
}
