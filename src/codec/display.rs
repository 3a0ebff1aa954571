//! Codecs for display value types.

use super::{WireDecode, WireEncode};
use crate::error::Result;
use crate::protocol::{CommandPacker, CommandUnpacker, ELEMENT_SIZE};
use crate::types::{LayerAlpha, LayerColor, Rect};

impl WireEncode for Rect {
    fn encode(&self, packer: &mut CommandPacker) {
        packer.write_i32(self.x);
        packer.write_i32(self.y);
        packer.write_i32(self.w);
        packer.write_i32(self.h);
    }
}

impl WireDecode for Rect {
    const MIN_WIRE_SIZE: usize = 4 * ELEMENT_SIZE;

    fn decode(unpacker: &mut CommandUnpacker) -> Result<Self> {
        Ok(Rect {
            x: unpacker.read_i32()?,
            y: unpacker.read_i32()?,
            w: unpacker.read_i32()?,
            h: unpacker.read_i32()?,
        })
    }
}

impl WireEncode for LayerAlpha {
    fn encode(&self, packer: &mut CommandPacker) {
        packer.write_bool(self.enable_global);
        packer.write_bool(self.enable_pixel);
        packer.write_u8(self.alpha0);
        packer.write_u8(self.alpha1);
        packer.write_u8(self.global_alpha);
    }
}

impl WireDecode for LayerAlpha {
    const MIN_WIRE_SIZE: usize = 5 * ELEMENT_SIZE;

    fn decode(unpacker: &mut CommandUnpacker) -> Result<Self> {
        Ok(LayerAlpha {
            enable_global: unpacker.read_bool()?,
            enable_pixel: unpacker.read_bool()?,
            alpha0: unpacker.read_u8()?,
            alpha1: unpacker.read_u8()?,
            global_alpha: unpacker.read_u8()?,
        })
    }
}

impl WireEncode for LayerColor {
    fn encode(&self, packer: &mut CommandPacker) {
        packer.write_u8(self.r);
        packer.write_u8(self.g);
        packer.write_u8(self.b);
        packer.write_u8(self.a);
    }
}

impl WireDecode for LayerColor {
    const MIN_WIRE_SIZE: usize = 4 * ELEMENT_SIZE;

    fn decode(unpacker: &mut CommandUnpacker) -> Result<Self> {
        Ok(LayerColor {
            r: unpacker.read_u8()?,
            g: unpacker.read_u8()?,
            b: unpacker.read_u8()?,
            a: unpacker.read_u8()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::cmd;
    use bytes::Bytes;

    fn encoded<T: WireEncode>(value: &T) -> CommandUnpacker {
        let mut packer = CommandPacker::with_capacity(64);
        packer.start_pack(cmd::CONTROL_REQUEST_BEGIN).unwrap();
        packer.start_section(cmd::REQUEST_SET_LAYER_ALPHA).unwrap();
        value.encode(&mut packer);
        packer.end_section().unwrap();
        packer.pack_end(cmd::CONTROL_REQUEST_END).unwrap();

        let mut unpacker = CommandUnpacker::new(Bytes::copy_from_slice(packer.data()));
        unpacker.pack_begin().unwrap();
        unpacker.next_section();
        unpacker.begin_section().unwrap();
        unpacker
    }

    #[test]
    fn test_rect_field_order() {
        let mut unpacker = encoded(&Rect::new(1, 2, 3, 4));
        assert_eq!(unpacker.read_i32().unwrap(), 1);
        assert_eq!(unpacker.read_i32().unwrap(), 2);
        assert_eq!(unpacker.read_i32().unwrap(), 3);
        assert_eq!(unpacker.read_i32().unwrap(), 4);
    }

    #[test]
    fn test_alpha_occupies_five_elements() {
        let alpha = LayerAlpha {
            enable_global: true,
            enable_pixel: false,
            alpha0: 1,
            alpha1: 2,
            global_alpha: 255,
        };
        let mut unpacker = encoded(&alpha);
        assert_eq!(unpacker.remaining(), 5 * ELEMENT_SIZE);
        assert_eq!(LayerAlpha::decode(&mut unpacker).unwrap(), alpha);
    }

    #[test]
    fn test_truncated_color() {
        let mut packer = CommandPacker::with_capacity(64);
        packer.start_pack(cmd::CONTROL_REQUEST_BEGIN).unwrap();
        packer.start_section(cmd::REQUEST_SET_LAYER_COLOR).unwrap();
        packer.write_u8(1);
        packer.write_u8(2);
        packer.end_section().unwrap();
        packer.pack_end(cmd::CONTROL_REQUEST_END).unwrap();

        let mut unpacker = CommandUnpacker::new(Bytes::copy_from_slice(packer.data()));
        unpacker.pack_begin().unwrap();
        unpacker.next_section();
        unpacker.begin_section().unwrap();
        assert!(LayerColor::decode(&mut unpacker).is_err());
    }
}
