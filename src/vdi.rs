//! Vendor call surface.
//!
//! The dispatcher forwards every decoded command to an implementation of
//! [`ComposerVdi`]. A non-success status is recorded verbatim in the reply's
//! error table; calls are never retried.
//!
//! Every method has a default body returning `NOT_SUPPORT`, so a backend only
//! implements what its hardware can do.
//!
//! # Example
//!
//! ```
//! use composer_cmd::error::VdiResult;
//! use composer_cmd::vdi::ComposerVdi;
//!
//! struct NullDriver;
//!
//! impl ComposerVdi for NullDriver {
//!     fn prepare_display_layers(&self, _dev_id: u32) -> VdiResult<bool> {
//!         Ok(false)
//!     }
//! }
//! ```

use std::os::fd::OwnedFd;

use crate::buffer::BufferHandle;
use crate::error::{StatusCode, VdiResult};
use crate::types::{BlendType, CompositionType, LayerAlpha, LayerColor, MaskInfo, Rect, TransformType};

/// Operations the dispatcher invokes on the display backend.
///
/// Calls that take a buffer handle run while the cache lock is held and must
/// not call back into the cache.
pub trait ComposerVdi: Send + Sync {
    /// Prepare the layer stack; returns whether the client must flush.
    fn prepare_display_layers(&self, _dev_id: u32) -> VdiResult<bool> {
        Err(StatusCode::NOT_SUPPORT)
    }

    /// Layers whose composition type changed, paired with the new types.
    fn get_display_comp_change(&self, _dev_id: u32) -> VdiResult<(Vec<u32>, Vec<i32>)> {
        Err(StatusCode::NOT_SUPPORT)
    }

    /// Bind the client target buffer. The acquire fence moves to the backend.
    fn set_display_client_buffer(
        &self,
        _dev_id: u32,
        _buffer: &BufferHandle,
        _fence: Option<OwnedFd>,
    ) -> VdiResult<()> {
        Err(StatusCode::NOT_SUPPORT)
    }

    /// Damaged regions of the client target.
    fn set_display_client_damage(&self, _dev_id: u32, _rects: &[Rect]) -> VdiResult<()> {
        Err(StatusCode::NOT_SUPPORT)
    }

    /// Commit the frame; returns the release fence, if any.
    fn commit(&self, _dev_id: u32) -> VdiResult<Option<OwnedFd>> {
        Err(StatusCode::NOT_SUPPORT)
    }

    /// Layer alpha settings.
    fn set_layer_alpha(&self, _dev_id: u32, _layer_id: u32, _alpha: &LayerAlpha) -> VdiResult<()> {
        Err(StatusCode::NOT_SUPPORT)
    }

    /// Layer position and size on the display.
    fn set_layer_region(&self, _dev_id: u32, _layer_id: u32, _rect: &Rect) -> VdiResult<()> {
        Err(StatusCode::NOT_SUPPORT)
    }

    /// Source crop within the layer buffer.
    fn set_layer_crop(&self, _dev_id: u32, _layer_id: u32, _rect: &Rect) -> VdiResult<()> {
        Err(StatusCode::NOT_SUPPORT)
    }

    /// Layer stacking order; higher is on top.
    fn set_layer_zorder(&self, _dev_id: u32, _layer_id: u32, _zorder: u32) -> VdiResult<()> {
        Err(StatusCode::NOT_SUPPORT)
    }

    /// Whether the layer buffer is alpha-premultiplied.
    fn set_layer_pre_multi(&self, _dev_id: u32, _layer_id: u32, _pre_mul: bool) -> VdiResult<()> {
        Err(StatusCode::NOT_SUPPORT)
    }

    /// Layer rotation or mirroring.
    fn set_layer_transform_mode(
        &self,
        _dev_id: u32,
        _layer_id: u32,
        _transform: TransformType,
    ) -> VdiResult<()> {
        Err(StatusCode::NOT_SUPPORT)
    }

    /// Regions of the layer changed since the last frame.
    fn set_layer_dirty_region(&self, _dev_id: u32, _layer_id: u32, _rects: &[Rect]) -> VdiResult<()> {
        Err(StatusCode::NOT_SUPPORT)
    }

    /// Regions of the layer left visible after occlusion.
    fn set_layer_visible_region(
        &self,
        _dev_id: u32,
        _layer_id: u32,
        _rects: &[Rect],
    ) -> VdiResult<()> {
        Err(StatusCode::NOT_SUPPORT)
    }

    /// Bind a layer buffer. The acquire fence moves to the backend.
    fn set_layer_buffer(
        &self,
        _dev_id: u32,
        _layer_id: u32,
        _buffer: &BufferHandle,
        _fence: Option<OwnedFd>,
    ) -> VdiResult<()> {
        Err(StatusCode::NOT_SUPPORT)
    }

    /// Requested composition path for the layer.
    fn set_layer_composition_type(
        &self,
        _dev_id: u32,
        _layer_id: u32,
        _kind: CompositionType,
    ) -> VdiResult<()> {
        Err(StatusCode::NOT_SUPPORT)
    }

    /// Blend mode against the layers below.
    fn set_layer_blend_type(&self, _dev_id: u32, _layer_id: u32, _kind: BlendType) -> VdiResult<()> {
        Err(StatusCode::NOT_SUPPORT)
    }

    /// Layer mask mode.
    fn set_layer_mask_info(&self, _dev_id: u32, _layer_id: u32, _mask: MaskInfo) -> VdiResult<()> {
        Err(StatusCode::NOT_SUPPORT)
    }

    /// Solid colour for a colour layer.
    fn set_layer_color(&self, _dev_id: u32, _layer_id: u32, _color: &LayerColor) -> VdiResult<()> {
        Err(StatusCode::NOT_SUPPORT)
    }
}
