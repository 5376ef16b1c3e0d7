//! GPU context wrapper with capability detection.
//!
//! `GpuContext` wraps a `glow::Context`, queries the version and extension
//! list once at initialization, and implements [`GraphicsContext`] so
//! render targets can drive a real driver.

use crate::context::{Attachment, ContextId, GraphicsContext, Viewport};
use crate::error::RenderError;
use crate::renderbuffer::RenderbufferFormat;
use crate::texture::{Texture, TextureDesc};

use super::texture::{create_texture, gl_attachment, gl_renderbuffer_format};

const DEPTH_TEXTURE_EXTENSIONS: [&str; 4] = [
    "WEBGL_depth_texture",
    "OES_depth_texture",
    "GL_OES_depth_texture",
    "GL_ARB_depth_texture",
];

const DRAW_BUFFERS_EXTENSIONS: [&str; 3] = [
    "WEBGL_draw_buffers",
    "GL_EXT_draw_buffers",
    "GL_ARB_draw_buffers",
];

fn requires_unsized_formats(is_embedded: bool, major: u32) -> bool {
    is_embedded && major < 3
}

/// Wraps a `glow::Context` with detected GPU capabilities.
///
/// Created once at initialization. GL 3+, GLES 3+ and WebGL2 support depth
/// textures and multiple draw buffers in core; older contexts need the
/// corresponding extensions.
pub struct GpuContext {
    gl: glow::Context,
    id: ContextId,
    supports_depth_texture: bool,
    supports_draw_buffers: bool,
    max_color_attachments: u32,
    unsized_formats: bool,
}

impl GpuContext {
    /// Creates a new `GpuContext` by wrapping the given GL context and
    /// querying its capabilities.
    #[allow(unsafe_code)]
    pub fn new(gl: glow::Context) -> Self {
        use glow::HasContext;

        let version = gl.version();
        let core = version.major >= 3;
        let unsized_formats = requires_unsized_formats(version.is_embedded, version.major);
        let extensions = gl.supported_extensions();
        let has_any = |names: &[&str]| names.iter().any(|name| extensions.contains(*name));

        let supports_depth_texture = core || has_any(&DEPTH_TEXTURE_EXTENSIONS);
        let supports_draw_buffers = core || has_any(&DRAW_BUFFERS_EXTENSIONS);

        let max_color_attachments = if supports_draw_buffers {
            // SAFETY: MAX_COLOR_ATTACHMENTS is a valid integer query on any
            // context exposing draw buffers.
            let max = unsafe { gl.get_parameter_i32(glow::MAX_COLOR_ATTACHMENTS) };
            max.max(1) as u32
        } else {
            1
        };

        log::debug!(
            "GL context: depth textures {supports_depth_texture}, draw buffers {supports_draw_buffers}, {max_color_attachments} color attachments"
        );

        Self {
            gl,
            id: ContextId::next(),
            supports_depth_texture,
            supports_draw_buffers,
            max_color_attachments,
            unsized_formats,
        }
    }

    /// Returns `true` on WebGL1 / GLES2, where textures take unsized
    /// internal formats.
    pub fn uses_unsized_formats(&self) -> bool {
        self.unsized_formats
    }

    /// Returns a reference to the underlying `glow::Context`.
    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }

    /// Consumes this wrapper and returns the underlying `glow::Context`.
    pub fn into_gl(self) -> glow::Context {
        self.gl
    }
}

#[allow(unsafe_code)]
impl GraphicsContext for GpuContext {
    type Framebuffer = glow::Framebuffer;
    type Renderbuffer = glow::Renderbuffer;
    type Texture = glow::Texture;

    fn id(&self) -> ContextId {
        self.id
    }

    fn supports_depth_texture(&self) -> bool {
        self.supports_depth_texture
    }

    fn supports_draw_buffers(&self) -> bool {
        self.supports_draw_buffers
    }

    fn max_color_attachments(&self) -> u32 {
        self.max_color_attachments
    }

    fn create_framebuffer(&mut self) -> Result<glow::Framebuffer, RenderError> {
        use glow::HasContext;
        // SAFETY: object creation has no preconditions beyond a current context.
        Ok(unsafe { self.gl.create_framebuffer()? })
    }

    fn create_renderbuffer(&mut self) -> Result<glow::Renderbuffer, RenderError> {
        use glow::HasContext;
        // SAFETY: object creation has no preconditions beyond a current context.
        Ok(unsafe { self.gl.create_renderbuffer()? })
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<Texture<glow::Texture>, RenderError> {
        let handle = create_texture(&self.gl, desc, self.unsized_formats)?;
        Ok(Texture::from_desc(handle, desc))
    }

    fn delete_framebuffer(&mut self, framebuffer: glow::Framebuffer) {
        use glow::HasContext;
        // SAFETY: the handle was created by this context.
        unsafe { self.gl.delete_framebuffer(framebuffer) }
    }

    fn delete_renderbuffer(&mut self, renderbuffer: glow::Renderbuffer) {
        use glow::HasContext;
        // SAFETY: the handle was created by this context.
        unsafe { self.gl.delete_renderbuffer(renderbuffer) }
    }

    fn delete_texture(&mut self, texture: glow::Texture) {
        use glow::HasContext;
        // SAFETY: the handle was created by this context.
        unsafe { self.gl.delete_texture(texture) }
    }

    fn bound_framebuffer(&mut self) -> Option<glow::Framebuffer> {
        use glow::HasContext;
        // SAFETY: FRAMEBUFFER_BINDING is a valid framebuffer query.
        unsafe { self.gl.get_parameter_framebuffer(glow::FRAMEBUFFER_BINDING) }
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<glow::Framebuffer>) {
        use glow::HasContext;
        // SAFETY: `None` selects the default framebuffer; handles come from
        // this context.
        unsafe { self.gl.bind_framebuffer(glow::FRAMEBUFFER, framebuffer) }
    }

    fn bind_renderbuffer(&mut self, renderbuffer: Option<glow::Renderbuffer>) {
        use glow::HasContext;
        // SAFETY: as for bind_framebuffer.
        unsafe { self.gl.bind_renderbuffer(glow::RENDERBUFFER, renderbuffer) }
    }

    fn bind_texture_2d(&mut self, texture: Option<glow::Texture>) {
        use glow::HasContext;
        // SAFETY: as for bind_framebuffer.
        unsafe { self.gl.bind_texture(glow::TEXTURE_2D, texture) }
    }

    fn renderbuffer_storage(&mut self, format: RenderbufferFormat, width: u32, height: u32) {
        use glow::HasContext;
        // SAFETY: callers bind a renderbuffer before allocating storage.
        unsafe {
            self.gl.renderbuffer_storage(
                glow::RENDERBUFFER,
                gl_renderbuffer_format(format),
                width as i32,
                height as i32,
            )
        }
    }

    fn framebuffer_texture_2d(&mut self, attachment: Attachment, texture: Option<glow::Texture>) {
        use glow::HasContext;
        // SAFETY: callers bind the target framebuffer first; `None` detaches.
        unsafe {
            self.gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                gl_attachment(attachment),
                glow::TEXTURE_2D,
                texture,
                0,
            )
        }
    }

    fn framebuffer_renderbuffer(
        &mut self,
        attachment: Attachment,
        renderbuffer: Option<glow::Renderbuffer>,
    ) {
        use glow::HasContext;
        // SAFETY: as for framebuffer_texture_2d.
        unsafe {
            self.gl.framebuffer_renderbuffer(
                glow::FRAMEBUFFER,
                gl_attachment(attachment),
                glow::RENDERBUFFER,
                renderbuffer,
            )
        }
    }

    fn draw_buffers(&mut self, slots: &[Attachment]) {
        use glow::HasContext;
        let buffers: Vec<u32> = slots.iter().copied().map(gl_attachment).collect();
        // SAFETY: every slot is below MAX_COLOR_ATTACHMENTS, checked by the
        // render target before attaching.
        unsafe { self.gl.draw_buffers(&buffers) }
    }

    fn check_framebuffer_status(&mut self) -> u32 {
        use glow::HasContext;
        // SAFETY: pure status query on the bound framebuffer.
        unsafe { self.gl.check_framebuffer_status(glow::FRAMEBUFFER) }
    }

    fn viewport(&mut self) -> Viewport {
        use glow::HasContext;
        let mut rect = [0i32; 4];
        // SAFETY: VIEWPORT writes exactly four integers.
        unsafe { self.gl.get_parameter_i32_slice(glow::VIEWPORT, &mut rect) };
        Viewport::new(rect[0], rect[1], rect[2], rect[3])
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        use glow::HasContext;
        // SAFETY: viewport accepts any rectangle; negative sizes raise a GL
        // error rather than undefined behavior.
        unsafe {
            self.gl
                .viewport(viewport.x, viewport.y, viewport.width, viewport.height)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // GpuContext requires a live GL context, so integration tests are ignored.

    #[test]
    fn gpu_context_struct_compiles_with_expected_api() {
        // Compile-time check that the public API exists.
        fn _assert_api(ctx: &mut GpuContext) {
            let _gl: &glow::Context = ctx.gl();
            let _depth: bool = ctx.supports_depth_texture();
            let _mrt: bool = ctx.supports_draw_buffers();
            let _bound: Option<glow::Framebuffer> = ctx.bound_framebuffer();
        }
    }

    #[test]
    fn only_pre3_embedded_contexts_need_unsized_formats() {
        assert!(requires_unsized_formats(true, 2));
        assert!(!requires_unsized_formats(true, 3));
        assert!(!requires_unsized_formats(false, 2));
        assert!(!requires_unsized_formats(false, 4));
    }

    #[test]
    fn extension_lists_cover_webgl1_names() {
        assert!(DEPTH_TEXTURE_EXTENSIONS.contains(&"WEBGL_depth_texture"));
        assert!(DRAW_BUFFERS_EXTENSIONS.contains(&"WEBGL_draw_buffers"));
    }

    #[test]
    #[ignore = "requires GL context"]
    fn new_detects_core_capabilities_on_gl3() {
        // Would test: on a GL 3.3 context both capability flags are true
        // and max_color_attachments() >= 4.
    }

    #[test]
    #[ignore = "requires GL context"]
    fn render_target_round_trip_on_real_driver() {
        // Would test: RenderTarget::new with two RGBA8 textures completes,
        // bind/unbind restores FRAMEBUFFER_BINDING and VIEWPORT.
    }
}
