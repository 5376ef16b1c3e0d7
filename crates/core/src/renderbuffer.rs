//! Fallback renderbuffers owned by a render target.
//!
//! A render target creates a renderbuffer whenever the caller leaves a slot
//! empty: no color textures, no depth texture, or a stencil request. Each one
//! is created once and its storage is resized in place on later updates.

use serde::{Deserialize, Serialize};

use crate::context::{Attachment, GraphicsContext};
use crate::error::RenderError;

/// Internal storage format of a renderbuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderbufferFormat {
    /// 16-bit depth, used when no depth texture is attached.
    DepthComponent16,
    /// 4-bit-per-channel color, used when no color texture is attached.
    Rgba4,
    /// 8-bit stencil.
    StencilIndex8,
}

/// A renderbuffer handle with the storage currently allocated for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Renderbuffer<H> {
    pub handle: H,
    pub width: u32,
    pub height: u32,
    pub format: RenderbufferFormat,
}

/// Fills `slot` with a renderbuffer of `format` sized `width`x`height` and
/// attaches it at `attachment` on the currently bound framebuffer.
///
/// An existing renderbuffer keeps its handle; storage is only reallocated
/// when it is new or its size changed.
pub(crate) fn attach_fallback<C: GraphicsContext>(
    ctx: &mut C,
    slot: &mut Option<Renderbuffer<C::Renderbuffer>>,
    format: RenderbufferFormat,
    attachment: Attachment,
    width: u32,
    height: u32,
) -> Result<(), RenderError> {
    let (buffer, needs_storage) = match *slot {
        Some(existing) => {
            let resized = existing.width != width || existing.height != height;
            (existing, resized)
        }
        None => {
            let handle = ctx.create_renderbuffer()?;
            log::debug!("created {format:?} fallback renderbuffer {handle:?}");
            let created = Renderbuffer {
                handle,
                width,
                height,
                format,
            };
            (created, true)
        }
    };

    if needs_storage {
        ctx.bind_renderbuffer(Some(buffer.handle));
        ctx.renderbuffer_storage(format, width, height);
    }
    ctx.framebuffer_renderbuffer(attachment, Some(buffer.handle));

    *slot = Some(Renderbuffer {
        width,
        height,
        ..buffer
    });
    Ok(())
}
