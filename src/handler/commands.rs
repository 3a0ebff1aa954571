//! Per-opcode handlers.
//!
//! Each handler decodes its fields, calls the vendor, and writes a reply
//! section when the command has one. Any failure returns the status to record;
//! the dispatcher rolls back a half-written reply section and files the status
//! in the error table. Decode errors convert to statuses through `?`.

use std::os::fd::AsFd;

use tracing::debug;

use super::responder::DisplayCmdResponder;
use crate::codec::{buffer_handle_unpack, WireDecode, WireEncode};
use crate::error::VdiResult;
use crate::fd::{file_descriptor_pack, file_descriptor_unpack, FdSet};
use crate::protocol::{cmd, CommandUnpacker};
use crate::transport::Transport;
use crate::types::{BlendType, CompositionType, LayerAlpha, LayerColor, MaskInfo, Rect, TransformType};
use crate::vdi::ComposerVdi;

/// Read the `(device, layer)` pair that opens every layer command.
fn read_layer_target(unpacker: &mut CommandUnpacker) -> VdiResult<(u32, u32)> {
    Ok((unpacker.read_u32()?, unpacker.read_u32()?))
}

impl<T: Transport, V: ComposerVdi + ?Sized> DisplayCmdResponder<T, V> {
    pub(super) fn on_prepare_display_layers(&mut self, unpacker: &mut CommandUnpacker) -> VdiResult<()> {
        let dev_id = unpacker.read_u32()?;
        let need_flush = self.vdi.prepare_display_layers(dev_id)?;
        let (layers, types) = self.vdi.get_display_comp_change(dev_id)?;

        let packer = &mut self.reply_packer;
        packer.start_section(cmd::REPLY_PREPARE_DISPLAY_LAYERS)?;
        packer.write_u32(dev_id);
        packer.write_bool(need_flush);
        layers.encode(packer);
        types.encode(packer);
        packer.end_section()?;
        self.reply_command_count += 1;
        Ok(())
    }

    pub(super) fn on_set_display_client_buffer(
        &mut self,
        unpacker: &mut CommandUnpacker,
        in_fds: &mut FdSet,
    ) -> VdiResult<()> {
        let dev_id = unpacker.read_u32()?;
        let buffer = buffer_handle_unpack(unpacker, in_fds)?;
        let seq = unpacker.read_u32()?;
        let fence = file_descriptor_unpack(unpacker, in_fds)?;

        let vdi = &self.vdi;
        self.cache.with_device(dev_id, |device| {
            device.set_display_client_buffer(buffer, seq, move |handle| {
                vdi.set_display_client_buffer(dev_id, handle, fence)
            })
        })
    }

    pub(super) fn on_set_display_client_damage(&mut self, unpacker: &mut CommandUnpacker) -> VdiResult<()> {
        let dev_id = unpacker.read_u32()?;
        let rects = Vec::<Rect>::decode(unpacker)?;
        self.vdi.set_display_client_damage(dev_id, &rects)
    }

    pub(super) fn on_commit(&mut self, unpacker: &mut CommandUnpacker, out_fds: &mut FdSet) -> VdiResult<()> {
        self.cache.dump();

        let dev_id = unpacker.read_u32()?;
        let fence = self.vdi.commit(dev_id)?;

        let packer = &mut self.reply_packer;
        packer.start_section(cmd::REPLY_COMMIT)?;
        file_descriptor_pack(fence, packer, out_fds);
        packer.end_section()?;
        self.reply_command_count += 1;
        Ok(())
    }

    pub(super) fn on_set_layer_alpha(&mut self, unpacker: &mut CommandUnpacker) -> VdiResult<()> {
        let (dev_id, layer_id) = read_layer_target(unpacker)?;
        let alpha = LayerAlpha::decode(unpacker)?;
        self.vdi.set_layer_alpha(dev_id, layer_id, &alpha)
    }

    pub(super) fn on_set_layer_region(&mut self, unpacker: &mut CommandUnpacker) -> VdiResult<()> {
        let (dev_id, layer_id) = read_layer_target(unpacker)?;
        let rect = Rect::decode(unpacker)?;
        self.vdi.set_layer_region(dev_id, layer_id, &rect)
    }

    pub(super) fn on_set_layer_crop(&mut self, unpacker: &mut CommandUnpacker) -> VdiResult<()> {
        let (dev_id, layer_id) = read_layer_target(unpacker)?;
        let rect = Rect::decode(unpacker)?;
        self.vdi.set_layer_crop(dev_id, layer_id, &rect)
    }

    pub(super) fn on_set_layer_zorder(&mut self, unpacker: &mut CommandUnpacker) -> VdiResult<()> {
        let (dev_id, layer_id) = read_layer_target(unpacker)?;
        let zorder = unpacker.read_u32()?;
        self.vdi.set_layer_zorder(dev_id, layer_id, zorder)
    }

    pub(super) fn on_set_layer_pre_multi(&mut self, unpacker: &mut CommandUnpacker) -> VdiResult<()> {
        let (dev_id, layer_id) = read_layer_target(unpacker)?;
        let pre_mul = unpacker.read_bool()?;
        self.vdi.set_layer_pre_multi(dev_id, layer_id, pre_mul)
    }

    pub(super) fn on_set_layer_transform_mode(&mut self, unpacker: &mut CommandUnpacker) -> VdiResult<()> {
        let (dev_id, layer_id) = read_layer_target(unpacker)?;
        let transform = TransformType::try_from(unpacker.read_i32()?)?;
        self.vdi.set_layer_transform_mode(dev_id, layer_id, transform)
    }

    pub(super) fn on_set_layer_dirty_region(&mut self, unpacker: &mut CommandUnpacker) -> VdiResult<()> {
        let (dev_id, layer_id) = read_layer_target(unpacker)?;
        let rects = Vec::<Rect>::decode(unpacker)?;
        self.vdi.set_layer_dirty_region(dev_id, layer_id, &rects)
    }

    pub(super) fn on_set_layer_visible_region(&mut self, unpacker: &mut CommandUnpacker) -> VdiResult<()> {
        let (dev_id, layer_id) = read_layer_target(unpacker)?;
        let rects = Vec::<Rect>::decode(unpacker)?;
        self.vdi.set_layer_visible_region(dev_id, layer_id, &rects)
    }

    pub(super) fn on_set_layer_buffer(
        &mut self,
        unpacker: &mut CommandUnpacker,
        in_fds: &mut FdSet,
    ) -> VdiResult<()> {
        let (dev_id, layer_id) = read_layer_target(unpacker)?;
        let buffer = buffer_handle_unpack(unpacker, in_fds)?;
        let seq = unpacker.read_u32()?;
        let fence = file_descriptor_unpack(unpacker, in_fds)?;
        let deleting = Vec::<u32>::decode(unpacker)?;
        if !deleting.is_empty() {
            debug!(dev_id, layer_id, ?deleting, "Evicting layer buffers");
        }

        let vdi = &self.vdi;
        let dumper = &self.dumper;
        self.cache.with_device(dev_id, |device| {
            device
                .layer_cache_instance(layer_id)
                .set_layer_buffer(buffer, seq, &deleting, move |handle| {
                    dumper.dump_layer_buffer(dev_id, layer_id, fence.as_ref().map(|f| f.as_fd()), handle);
                    vdi.set_layer_buffer(dev_id, layer_id, handle, fence)
                })
        })
    }

    pub(super) fn on_set_layer_composition_type(&mut self, unpacker: &mut CommandUnpacker) -> VdiResult<()> {
        let (dev_id, layer_id) = read_layer_target(unpacker)?;
        let kind = CompositionType::try_from(unpacker.read_i32()?)?;
        self.vdi.set_layer_composition_type(dev_id, layer_id, kind)
    }

    pub(super) fn on_set_layer_blend_type(&mut self, unpacker: &mut CommandUnpacker) -> VdiResult<()> {
        let (dev_id, layer_id) = read_layer_target(unpacker)?;
        let kind = BlendType::try_from(unpacker.read_i32()?)?;
        self.vdi.set_layer_blend_type(dev_id, layer_id, kind)
    }

    pub(super) fn on_set_layer_mask_info(&mut self, unpacker: &mut CommandUnpacker) -> VdiResult<()> {
        let (dev_id, layer_id) = read_layer_target(unpacker)?;
        let mask = MaskInfo::try_from(unpacker.read_i32()?)?;
        self.vdi.set_layer_mask_info(dev_id, layer_id, mask)
    }

    pub(super) fn on_set_layer_color(&mut self, unpacker: &mut CommandUnpacker) -> VdiResult<()> {
        let (dev_id, layer_id) = read_layer_target(unpacker)?;
        let color = LayerColor::decode(unpacker)?;
        self.vdi.set_layer_color(dev_id, layer_id, &color)
    }
}
