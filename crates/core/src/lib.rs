#![deny(unsafe_code)]
//! Framebuffer render targets over a pluggable graphics context.
//!
//! Provides `RenderTarget` (color/depth/stencil attachment management with
//! renderbuffer fallbacks), the `GraphicsContext` trait it drives, the
//! headless `RecordingContext`, texture and renderbuffer descriptors, and
//! JSON `TargetPlan`s. The glow backend lives in [`render`] behind the
//! `render` feature.

pub mod context;
pub mod error;
pub mod layout;
pub mod recording;
pub mod renderbuffer;
pub mod target;
pub mod texture;

#[cfg(feature = "render")]
pub mod render;

pub use context::{
    Attachment, Capabilities, ContextId, Feature, GraphicsContext, Viewport, FRAMEBUFFER_COMPLETE,
    FRAMEBUFFER_INCOMPLETE_ATTACHMENT, FRAMEBUFFER_INCOMPLETE_DIMENSIONS,
    FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT,
};
pub use error::{ErrorKind, RenderError};
pub use layout::{PassLayout, TargetPlan, TexturePool};
pub use recording::{AttachedImage, GlCall, ObjectId, RecordingContext};
pub use renderbuffer::{Renderbuffer, RenderbufferFormat};
pub use target::RenderTarget;
pub use texture::{PixelFormat, PixelType, Texture, TextureDesc, TextureKind};
