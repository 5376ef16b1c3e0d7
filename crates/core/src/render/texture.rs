//! GL enum mappings and texture creation for the glow backend.
//!
//! Color and depth textures are allocated with sized internal formats
//! derived from (format, pixel type) on WebGL2, GLES 3 and desktop GL.
//! WebGL1 and GLES2 only accept an internal format equal to the upload
//! format, so those contexts get the unsized format instead.

use crate::context::Attachment;
use crate::renderbuffer::RenderbufferFormat;
use crate::texture::{PixelFormat, PixelType, TextureDesc, TextureKind};

/// Returns the GL upload format for a pixel format.
pub fn gl_format(format: PixelFormat) -> u32 {
    match format {
        PixelFormat::Alpha => glow::ALPHA,
        PixelFormat::Luminance => glow::LUMINANCE,
        PixelFormat::LuminanceAlpha => glow::LUMINANCE_ALPHA,
        PixelFormat::Rgb => glow::RGB,
        PixelFormat::Rgba => glow::RGBA,
        PixelFormat::DepthComponent => glow::DEPTH_COMPONENT,
        PixelFormat::DepthStencil => glow::DEPTH_STENCIL,
    }
}

/// Returns the GL component type for a pixel type.
pub fn gl_pixel_type(pixel_type: PixelType) -> u32 {
    match pixel_type {
        PixelType::UnsignedByte => glow::UNSIGNED_BYTE,
        PixelType::UnsignedShort => glow::UNSIGNED_SHORT,
        PixelType::UnsignedInt => glow::UNSIGNED_INT,
        PixelType::UnsignedInt248 => glow::UNSIGNED_INT_24_8,
        PixelType::HalfFloat => glow::HALF_FLOAT,
        PixelType::Float => glow::FLOAT,
    }
}

/// Returns the sized internal format for a (format, type) pair.
///
/// Unsized luminance/alpha formats have no sized equivalent and are passed
/// through unchanged.
pub fn gl_internal_format(format: PixelFormat, pixel_type: PixelType) -> u32 {
    match (format, pixel_type) {
        (PixelFormat::Rgba, PixelType::HalfFloat) => glow::RGBA16F,
        (PixelFormat::Rgba, PixelType::Float) => glow::RGBA32F,
        (PixelFormat::Rgba, _) => glow::RGBA8,
        (PixelFormat::Rgb, PixelType::HalfFloat) => glow::RGB16F,
        (PixelFormat::Rgb, PixelType::Float) => glow::RGB32F,
        (PixelFormat::Rgb, _) => glow::RGB8,
        (PixelFormat::DepthComponent, PixelType::UnsignedShort) => glow::DEPTH_COMPONENT16,
        (PixelFormat::DepthComponent, PixelType::Float) => glow::DEPTH_COMPONENT32F,
        (PixelFormat::DepthComponent, _) => glow::DEPTH_COMPONENT24,
        (PixelFormat::DepthStencil, _) => glow::DEPTH24_STENCIL8,
        (other, _) => gl_format(other),
    }
}

/// Returns the internal format to pass to `tex_image_2d`.
///
/// `unsized_only` is set for WebGL1 / GLES2 contexts.
pub fn texture_internal_format(
    format: PixelFormat,
    pixel_type: PixelType,
    unsized_only: bool,
) -> u32 {
    if unsized_only {
        gl_format(format)
    } else {
        gl_internal_format(format, pixel_type)
    }
}

pub fn gl_renderbuffer_format(format: RenderbufferFormat) -> u32 {
    match format {
        RenderbufferFormat::DepthComponent16 => glow::DEPTH_COMPONENT16,
        RenderbufferFormat::Rgba4 => glow::RGBA4,
        RenderbufferFormat::StencilIndex8 => glow::STENCIL_INDEX8,
    }
}

pub fn gl_attachment(attachment: Attachment) -> u32 {
    match attachment {
        Attachment::Color(slot) => glow::COLOR_ATTACHMENT0 + slot,
        Attachment::Depth => glow::DEPTH_ATTACHMENT,
        Attachment::Stencil => glow::STENCIL_ATTACHMENT,
    }
}

/// Returns the bind target for a texture kind.
pub fn gl_texture_target(kind: TextureKind) -> u32 {
    match kind {
        TextureKind::Texture2d => glow::TEXTURE_2D,
        TextureKind::CubeMap => glow::TEXTURE_CUBE_MAP,
    }
}

/// Creates a GPU texture from the given descriptor.
///
/// Sets wrap mode to `CLAMP_TO_EDGE` on both axes, uses `NEAREST`
/// filtering (depth textures are not filterable everywhere), and allocates
/// storage for every face without initial data. See
/// [`texture_internal_format`] for `unsized_only`.
///
/// # Errors
///
/// Returns an error string if the GL context fails to create the texture.
#[allow(unsafe_code)]
pub fn create_texture(
    gl: &glow::Context,
    desc: &TextureDesc,
    unsized_only: bool,
) -> Result<glow::Texture, String> {
    use glow::HasContext;

    let internal_format = texture_internal_format(desc.format, desc.pixel_type, unsized_only);
    let target = gl_texture_target(desc.kind);
    let faces: &[u32] = match desc.kind {
        TextureKind::Texture2d => &[glow::TEXTURE_2D],
        TextureKind::CubeMap => &[
            glow::TEXTURE_CUBE_MAP_POSITIVE_X,
            glow::TEXTURE_CUBE_MAP_NEGATIVE_X,
            glow::TEXTURE_CUBE_MAP_POSITIVE_Y,
            glow::TEXTURE_CUBE_MAP_NEGATIVE_Y,
            glow::TEXTURE_CUBE_MAP_POSITIVE_Z,
            glow::TEXTURE_CUBE_MAP_NEGATIVE_Z,
        ],
    };

    // SAFETY: glow wraps raw GL calls as unsafe. We create, configure,
    // and allocate a texture using enums derived from TextureDesc.
    let texture = unsafe { gl.create_texture()? };

    // SAFETY: the texture was just created; storage is allocated without
    // initial data so no client memory is read.
    unsafe {
        gl.bind_texture(target, Some(texture));

        gl.tex_parameter_i32(target, glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
        gl.tex_parameter_i32(target, glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
        gl.tex_parameter_i32(target, glow::TEXTURE_MIN_FILTER, glow::NEAREST as i32);
        gl.tex_parameter_i32(target, glow::TEXTURE_MAG_FILTER, glow::NEAREST as i32);

        for &face in faces {
            gl.tex_image_2d(
                face,
                0,
                internal_format as i32,
                desc.width as i32,
                desc.height as i32,
                0,
                gl_format(desc.format),
                gl_pixel_type(desc.pixel_type),
                glow::PixelUnpackData::Slice(None),
            );
        }

        gl.bind_texture(target, None);
    }

    Ok(texture)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_texture_maps_to_depth_component24() {
        assert_eq!(
            gl_internal_format(PixelFormat::DepthComponent, PixelType::UnsignedInt),
            glow::DEPTH_COMPONENT24
        );
        assert_eq!(gl_format(PixelFormat::DepthComponent), glow::DEPTH_COMPONENT);
        assert_eq!(gl_pixel_type(PixelType::UnsignedInt), glow::UNSIGNED_INT);
    }

    #[test]
    fn half_float_rgba_is_rgba16f() {
        assert_eq!(
            gl_internal_format(PixelFormat::Rgba, PixelType::HalfFloat),
            glow::RGBA16F
        );
    }

    #[test]
    fn unsigned_byte_rgba_is_rgba8() {
        assert_eq!(
            gl_internal_format(PixelFormat::Rgba, PixelType::UnsignedByte),
            glow::RGBA8
        );
    }

    #[test]
    fn luminance_passes_through_unsized() {
        assert_eq!(
            gl_internal_format(PixelFormat::Luminance, PixelType::UnsignedByte),
            glow::LUMINANCE
        );
    }

    #[test]
    fn legacy_contexts_use_the_upload_format() {
        for format in PixelFormat::ALL {
            for pixel_type in PixelType::ALL {
                assert_eq!(
                    texture_internal_format(format, pixel_type, true),
                    gl_format(format)
                );
            }
        }
        assert_eq!(
            texture_internal_format(PixelFormat::DepthComponent, PixelType::UnsignedInt, true),
            glow::DEPTH_COMPONENT
        );
        assert_eq!(
            texture_internal_format(PixelFormat::Rgba, PixelType::HalfFloat, true),
            glow::RGBA
        );
    }

    #[test]
    fn modern_contexts_use_sized_formats() {
        assert_eq!(
            texture_internal_format(PixelFormat::DepthComponent, PixelType::UnsignedInt, false),
            glow::DEPTH_COMPONENT24
        );
        assert_eq!(
            texture_internal_format(PixelFormat::Rgba, PixelType::UnsignedByte, false),
            glow::RGBA8
        );
    }

    #[test]
    fn color_slots_offset_from_attachment0() {
        assert_eq!(gl_attachment(Attachment::Color(0)), glow::COLOR_ATTACHMENT0);
        assert_eq!(gl_attachment(Attachment::Color(3)), glow::COLOR_ATTACHMENT3);
        assert_eq!(gl_attachment(Attachment::Depth), glow::DEPTH_ATTACHMENT);
        assert_eq!(gl_attachment(Attachment::Stencil), glow::STENCIL_ATTACHMENT);
    }

    #[test]
    fn fallback_renderbuffer_formats_match_gl() {
        assert_eq!(
            gl_renderbuffer_format(RenderbufferFormat::DepthComponent16),
            glow::DEPTH_COMPONENT16
        );
        assert_eq!(gl_renderbuffer_format(RenderbufferFormat::Rgba4), glow::RGBA4);
        assert_eq!(
            gl_renderbuffer_format(RenderbufferFormat::StencilIndex8),
            glow::STENCIL_INDEX8
        );
    }

    #[test]
    fn cube_maps_bind_to_cube_map_target() {
        assert_eq!(gl_texture_target(TextureKind::CubeMap), glow::TEXTURE_CUBE_MAP);
        assert_eq!(gl_texture_target(TextureKind::Texture2d), glow::TEXTURE_2D);
    }

    #[test]
    #[ignore = "requires GL context"]
    fn create_texture_allocates_every_cube_face() {
        // Would test: create_texture(gl, &TextureDesc::cube_map(64)) succeeds
        // and all six faces report 64x64 via GetTexLevelParameter.
    }
}
