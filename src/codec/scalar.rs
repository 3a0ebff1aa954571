//! Scalar and vector codecs.

use super::{WireDecode, WireEncode};
use crate::error::{ComposerError, Result};
use crate::protocol::{CommandPacker, CommandUnpacker, ELEMENT_SIZE};

macro_rules! scalar_codec {
    ($ty:ty, $write:ident, $read:ident, $size:expr) => {
        impl WireEncode for $ty {
            #[inline]
            fn encode(&self, packer: &mut CommandPacker) {
                packer.$write(*self);
            }
        }

        impl WireDecode for $ty {
            const MIN_WIRE_SIZE: usize = $size;

            #[inline]
            fn decode(unpacker: &mut CommandUnpacker) -> Result<Self> {
                unpacker.$read()
            }
        }
    };
}

scalar_codec!(i32, write_i32, read_i32, ELEMENT_SIZE);
scalar_codec!(u32, write_u32, read_u32, ELEMENT_SIZE);
scalar_codec!(u64, write_u64, read_u64, 2 * ELEMENT_SIZE);
scalar_codec!(bool, write_bool, read_bool, ELEMENT_SIZE);
scalar_codec!(u8, write_u8, read_u8, ELEMENT_SIZE);

impl<T: WireEncode> WireEncode for [T] {
    fn encode(&self, packer: &mut CommandPacker) {
        packer.write_u32(self.len() as u32);
        for item in self {
            item.encode(packer);
        }
    }
}

impl<T: WireEncode> WireEncode for Vec<T> {
    #[inline]
    fn encode(&self, packer: &mut CommandPacker) {
        self.as_slice().encode(packer);
    }
}

impl<T: WireDecode> WireDecode for Vec<T> {
    const MIN_WIRE_SIZE: usize = ELEMENT_SIZE;

    fn decode(unpacker: &mut CommandUnpacker) -> Result<Self> {
        let count = unpacker.read_u32()? as usize;

        // A count the section cannot hold is malformed; refuse before allocating.
        let needed = count.saturating_mul(T::MIN_WIRE_SIZE);
        if needed > unpacker.remaining() {
            return Err(ComposerError::Protocol(format!(
                "Vector of {} items needs {} bytes, section has {}",
                count,
                needed,
                unpacker.remaining()
            )));
        }

        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(T::decode(unpacker)?);
        }
        Ok(items)
    }
}
