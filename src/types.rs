//! Display value types carried by layer commands.
//!
//! Enum-typed fields arrive as raw `i32` on the wire and are validated with
//! `TryFrom<i32>`; an unknown discriminant is reported as
//! [`ComposerError::InvalidValue`], which handlers record as
//! `INVALID_PARAM`.

use crate::error::ComposerError;

/// Integer rectangle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width.
    pub w: i32,
    /// Height.
    pub h: i32,
}

impl Rect {
    /// Create a rectangle.
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }
}

/// Layer alpha settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayerAlpha {
    /// Apply `global_alpha` to the whole layer.
    pub enable_global: bool,
    /// Use per-pixel alpha.
    pub enable_pixel: bool,
    /// Alpha for pixels whose alpha bit is 0 (ARGB1555).
    pub alpha0: u8,
    /// Alpha for pixels whose alpha bit is 1 (ARGB1555).
    pub alpha1: u8,
    /// Layer-wide alpha.
    pub global_alpha: u8,
}

/// Solid layer colour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayerColor {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($(#[$vmeta:meta])* $variant:ident = $value:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(i32)]
        pub enum $name {
            $($(#[$vmeta])* $variant = $value),+
        }

        impl TryFrom<i32> for $name {
            type Error = ComposerError;

            fn try_from(value: i32) -> Result<Self, Self::Error> {
                match value {
                    $($value => Ok($name::$variant),)+
                    _ => Err(ComposerError::InvalidValue {
                        field: stringify!($name),
                        value: i64::from(value),
                    }),
                }
            }
        }

        impl From<$name> for i32 {
            fn from(value: $name) -> i32 {
                value as i32
            }
        }
    };
}

wire_enum! {
    /// How a layer is composed.
    CompositionType {
        /// Composed by the client GPU.
        Client = 0,
        /// Composed by the display hardware.
        Device = 1,
        /// Hardware cursor plane.
        Cursor = 2,
        /// Video overlay.
        Video = 3,
        /// Cleared by the display hardware.
        DeviceClear = 4,
        /// Cleared by the client.
        ClientClear = 5,
        /// Sideband stream bypassing composition.
        Tunnel = 6,
    }
}

wire_enum! {
    /// Porter-Duff style blend mode.
    BlendType {
        /// No blending.
        None = 0,
        /// CLEAR.
        Clear = 1,
        /// SRC.
        Src = 2,
        /// SRC_OVER.
        SrcOver = 3,
        /// DST_OVER.
        DstOver = 4,
        /// SRC_IN.
        SrcIn = 5,
        /// DST_IN.
        DstIn = 6,
        /// SRC_OUT.
        SrcOut = 7,
        /// DST_OUT.
        DstOut = 8,
        /// SRC_ATOP.
        SrcAtop = 9,
        /// DST_ATOP.
        DstAtop = 10,
        /// ADD.
        Add = 11,
        /// XOR.
        Xor = 12,
        /// DST.
        Dst = 13,
        /// Source alpha key.
        Aks = 14,
        /// Destination alpha key.
        Akd = 15,
    }
}

wire_enum! {
    /// Rotation and mirroring applied to a layer.
    TransformType {
        /// No transform.
        RotateNone = 0,
        /// Rotate 90 degrees.
        Rotate90 = 1,
        /// Rotate 180 degrees.
        Rotate180 = 2,
        /// Rotate 270 degrees.
        Rotate270 = 3,
        /// Mirror horizontally.
        MirrorH = 4,
        /// Mirror vertically.
        MirrorV = 5,
        /// Mirror horizontally, then rotate 90 degrees.
        MirrorHRotate90 = 6,
        /// Mirror vertically, then rotate 90 degrees.
        MirrorVRotate90 = 7,
    }
}

wire_enum! {
    /// Layer mask mode.
    MaskInfo {
        /// Regular layer.
        Normal = 0,
        /// Synchronised with high-brightness mode.
        HbmSync = 1,
    }
}
