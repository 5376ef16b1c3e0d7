//! Texture resources as seen by a render target.
//!
//! A [`Texture`] is a backend handle plus the properties a render target
//! validates against: size, pixel format, pixel type, and dimensionality.
//! Textures are owned by the caller; render targets only compare them by
//! handle and attach them.

use serde::{Deserialize, Serialize};

/// Channel layout of a texture's pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    Alpha,
    Luminance,
    LuminanceAlpha,
    Rgb,
    #[default]
    Rgba,
    DepthComponent,
    DepthStencil,
}

impl PixelFormat {
    /// All formats, in declaration order.
    pub const ALL: [PixelFormat; 7] = [
        PixelFormat::Alpha,
        PixelFormat::Luminance,
        PixelFormat::LuminanceAlpha,
        PixelFormat::Rgb,
        PixelFormat::Rgba,
        PixelFormat::DepthComponent,
        PixelFormat::DepthStencil,
    ];
}

/// Component type of a texture's pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelType {
    #[default]
    UnsignedByte,
    UnsignedShort,
    UnsignedInt,
    #[serde(rename = "unsigned_int_24_8")]
    UnsignedInt248,
    HalfFloat,
    Float,
}

impl PixelType {
    /// All pixel types, in declaration order.
    pub const ALL: [PixelType; 6] = [
        PixelType::UnsignedByte,
        PixelType::UnsignedShort,
        PixelType::UnsignedInt,
        PixelType::UnsignedInt248,
        PixelType::HalfFloat,
        PixelType::Float,
    ];
}

/// Texture dimensionality. Only `Texture2d` can be a color attachment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureKind {
    #[default]
    Texture2d,
    CubeMap,
}

impl TextureKind {
    pub const ALL: [TextureKind; 2] = [TextureKind::Texture2d, TextureKind::CubeMap];
}

/// Parameters for creating a texture through a graphics context.
///
/// Missing fields in JSON fall back to an RGBA8 2D texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureDesc {
    /// Texture width in pixels.
    pub width: u32,
    /// Texture height in pixels.
    pub height: u32,
    #[serde(default)]
    pub format: PixelFormat,
    #[serde(default)]
    pub pixel_type: PixelType,
    #[serde(default)]
    pub kind: TextureKind,
}

impl TextureDesc {
    /// An RGBA / unsigned-byte 2D texture.
    pub fn color(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            format: PixelFormat::Rgba,
            pixel_type: PixelType::UnsignedByte,
            kind: TextureKind::Texture2d,
        }
    }

    /// A 2D texture usable as a render target's depth attachment.
    pub fn depth(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            format: PixelFormat::DepthComponent,
            pixel_type: PixelType::UnsignedInt,
            kind: TextureKind::Texture2d,
        }
    }

    /// An RGBA / unsigned-byte cube map with square faces.
    pub fn cube_map(size: u32) -> Self {
        Self {
            kind: TextureKind::CubeMap,
            ..Self::color(size, size)
        }
    }

    /// Returns a copy with a different pixel type.
    pub fn with_pixel_type(self, pixel_type: PixelType) -> Self {
        Self { pixel_type, ..self }
    }
}

/// A texture resource: a backend handle plus the properties validated by
/// render targets.
///
/// Two textures are the same attachment when their handles are equal; the
/// other fields are never compared for identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Texture<H> {
    pub handle: H,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub pixel_type: PixelType,
    pub kind: TextureKind,
}

impl<H: Copy + PartialEq> Texture<H> {
    /// Pairs a backend handle with the descriptor it was created from.
    pub fn from_desc(handle: H, desc: &TextureDesc) -> Self {
        Self {
            handle,
            width: desc.width,
            height: desc.height,
            format: desc.format,
            pixel_type: desc.pixel_type,
            kind: desc.kind,
        }
    }

    /// Returns `true` if this texture may be a render target's depth attachment.
    pub fn is_depth_attachable(&self) -> bool {
        self.format == PixelFormat::DepthComponent && self.pixel_type == PixelType::UnsignedInt
    }

    /// Returns `true` if `other` refers to the same GPU texture.
    pub fn same_resource(&self, other: &Texture<H>) -> bool {
        self.handle == other.handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_desc_is_rgba8_2d() {
        let desc = TextureDesc::color(1024, 768);
        assert_eq!(desc.width, 1024);
        assert_eq!(desc.height, 768);
        assert_eq!(desc.format, PixelFormat::Rgba);
        assert_eq!(desc.pixel_type, PixelType::UnsignedByte);
        assert_eq!(desc.kind, TextureKind::Texture2d);
    }

    #[test]
    fn depth_desc_is_depth_attachable() {
        let tex = Texture::from_desc(7u32, &TextureDesc::depth(64, 64));
        assert!(tex.is_depth_attachable());
    }

    #[test]
    fn float_depth_is_not_depth_attachable() {
        let desc = TextureDesc::depth(64, 64).with_pixel_type(PixelType::Float);
        let tex = Texture::from_desc(7u32, &desc);
        assert!(!tex.is_depth_attachable());
    }

    #[test]
    fn cube_map_desc_has_square_faces() {
        let desc = TextureDesc::cube_map(32);
        assert_eq!((desc.width, desc.height), (32, 32));
        assert_eq!(desc.kind, TextureKind::CubeMap);
    }

    #[test]
    fn same_resource_compares_handles_only() {
        let a = Texture::from_desc(1u32, &TextureDesc::color(16, 16));
        let resized = Texture {
            width: 32,
            ..a
        };
        let other = Texture::from_desc(2u32, &TextureDesc::color(16, 16));
        assert!(a.same_resource(&resized));
        assert!(!a.same_resource(&other));
    }

    #[test]
    fn desc_deserializes_with_defaults() {
        let desc: TextureDesc = serde_json::from_str(r#"{"width": 8, "height": 4}"#).unwrap();
        assert_eq!(desc, TextureDesc::color(8, 4));
    }

    #[test]
    fn desc_deserializes_snake_case_enums() {
        let desc: TextureDesc = serde_json::from_str(
            r#"{"width": 8, "height": 8, "format": "depth_stencil", "pixel_type": "unsigned_int_24_8", "kind": "cube_map"}"#,
        )
        .unwrap();
        assert_eq!(desc.format, PixelFormat::DepthStencil);
        assert_eq!(desc.pixel_type, PixelType::UnsignedInt248);
        assert_eq!(desc.kind, TextureKind::CubeMap);
    }

    #[test]
    fn unknown_format_is_rejected() {
        let result: Result<TextureDesc, _> =
            serde_json::from_str(r#"{"width": 8, "height": 8, "format": "bgra"}"#);
        assert!(result.is_err());
    }
}
