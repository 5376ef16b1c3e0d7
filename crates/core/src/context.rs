//! The graphics-context contract render targets are written against.
//!
//! Render targets never reach for ambient global state: every operation
//! takes a `&mut impl GraphicsContext`. The trait mirrors the subset of the
//! GL/WebGL framebuffer API a render target needs, with typed handles and
//! typed attachment points instead of raw enums.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::RenderError;
use crate::renderbuffer::RenderbufferFormat;
use crate::texture::{Texture, TextureDesc};

/// `glCheckFramebufferStatus` result for a usable framebuffer.
pub const FRAMEBUFFER_COMPLETE: u32 = 0x8CD5;
/// An attached image is missing storage or has a zero size.
pub const FRAMEBUFFER_INCOMPLETE_ATTACHMENT: u32 = 0x8CD6;
/// Nothing is attached.
pub const FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT: u32 = 0x8CD7;
/// Attached images differ in size.
pub const FRAMEBUFFER_INCOMPLETE_DIMENSIONS: u32 = 0x8CD9;

/// Identity of a graphics context.
///
/// Render targets remember the context that created them and refuse to run
/// against any other, since framebuffer handles are only meaningful inside
/// the context that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ContextId(u64);

impl ContextId {
    /// Allocates a process-unique id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ContextId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Framebuffer attachment point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attachment {
    /// `COLOR_ATTACHMENT0 + n`.
    Color(u32),
    Depth,
    Stencil,
}

/// A viewport rectangle in window coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Viewport {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A viewport covering `width`x`height` pixels from the origin.
    ///
    /// Sizes beyond `i32::MAX` are clamped.
    pub fn covering(width: u32, height: u32) -> Self {
        let clamp = |v: u32| i32::try_from(v).unwrap_or(i32::MAX);
        Self::new(0, 0, clamp(width), clamp(height))
    }
}

/// Optional context capabilities a render target may depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Feature {
    /// Rendering into depth textures (`WEBGL_depth_texture` on WebGL1).
    DepthTexture,
    /// Several color attachments per pass (`WEBGL_draw_buffers` on WebGL1).
    DrawBuffers,
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feature::DepthTexture => write!(f, "rendering to depth textures"),
            Feature::DrawBuffers => write!(f, "rendering to multiple draw buffers"),
        }
    }
}

/// Capability flags reported by a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    pub depth_texture: bool,
    pub draw_buffers: bool,
    pub max_color_attachments: u32,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            depth_texture: true,
            draw_buffers: true,
            max_color_attachments: 8,
        }
    }
}

/// The graphics-context operations a render target issues.
///
/// Attachment, storage, and status methods act on whatever framebuffer or
/// renderbuffer is currently bound, exactly like the GL calls they model.
pub trait GraphicsContext {
    type Framebuffer: Copy + PartialEq + fmt::Debug;
    type Renderbuffer: Copy + PartialEq + fmt::Debug;
    type Texture: Copy + PartialEq + fmt::Debug;

    /// Identity of this context.
    fn id(&self) -> ContextId;

    fn supports_depth_texture(&self) -> bool;
    fn supports_draw_buffers(&self) -> bool;
    /// Number of color attachment slots; at least 1.
    fn max_color_attachments(&self) -> u32;

    fn create_framebuffer(&mut self) -> Result<Self::Framebuffer, RenderError>;
    fn create_renderbuffer(&mut self) -> Result<Self::Renderbuffer, RenderError>;
    /// Creates a texture with allocated, uninitialized storage.
    fn create_texture(&mut self, desc: &TextureDesc)
        -> Result<Texture<Self::Texture>, RenderError>;
    fn delete_framebuffer(&mut self, framebuffer: Self::Framebuffer);
    fn delete_renderbuffer(&mut self, renderbuffer: Self::Renderbuffer);
    fn delete_texture(&mut self, texture: Self::Texture);

    /// The framebuffer currently bound; `None` is the default framebuffer.
    fn bound_framebuffer(&mut self) -> Option<Self::Framebuffer>;
    fn bind_framebuffer(&mut self, framebuffer: Option<Self::Framebuffer>);
    fn bind_renderbuffer(&mut self, renderbuffer: Option<Self::Renderbuffer>);
    fn bind_texture_2d(&mut self, texture: Option<Self::Texture>);

    /// Allocates storage for the bound renderbuffer.
    fn renderbuffer_storage(&mut self, format: RenderbufferFormat, width: u32, height: u32);
    /// Attaches a 2D texture (or detaches with `None`) on the bound framebuffer.
    fn framebuffer_texture_2d(&mut self, attachment: Attachment, texture: Option<Self::Texture>);
    /// Attaches a renderbuffer (or detaches with `None`) on the bound framebuffer.
    fn framebuffer_renderbuffer(
        &mut self,
        attachment: Attachment,
        renderbuffer: Option<Self::Renderbuffer>,
    );
    /// Declares which color slots receive fragment outputs, in output order.
    fn draw_buffers(&mut self, slots: &[Attachment]);
    /// Returns a `FRAMEBUFFER_*` status code for the bound framebuffer.
    fn check_framebuffer_status(&mut self) -> u32;

    fn viewport(&mut self) -> Viewport;
    fn set_viewport(&mut self, viewport: Viewport);
}
