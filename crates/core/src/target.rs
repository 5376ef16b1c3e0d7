//! Render target (framebuffer object) with validated, reusable attachments.
//!
//! A `RenderTarget` groups color textures, a depth texture, and an optional
//! stencil buffer into one framebuffer. Slots the caller leaves empty are
//! filled with fallback renderbuffers. The framebuffer handle and fallbacks
//! are created once and reused across reconfiguration, and reapplying an
//! unchanged attachment set issues no graphics calls at all.
//!
//! `bind`/`unbind` save and restore the previous framebuffer binding and
//! viewport, so passes can nest:
//!
//! ```
//! use fbo_core::{GraphicsContext, RecordingContext, RenderTarget, TextureDesc};
//!
//! let mut ctx = RecordingContext::new();
//! let albedo = ctx.create_texture(&TextureDesc::color(256, 256))?;
//! let mut target = RenderTarget::new(&mut ctx, &[albedo], None, false)?;
//!
//! target.bind(&mut ctx, true)?;
//! // ... draw ...
//! target.unbind(&mut ctx)?;
//! target.destroy(&mut ctx)?;
//! # Ok::<(), fbo_core::RenderError>(())
//! ```

use glam::UVec2;

use crate::context::{Attachment, ContextId, Feature, GraphicsContext, Viewport, FRAMEBUFFER_COMPLETE};
use crate::error::RenderError;
use crate::renderbuffer::{attach_fallback, Renderbuffer, RenderbufferFormat};
use crate::texture::{Texture, TextureKind};

/// State captured by `bind` and consumed by `unbind`.
#[derive(Debug, Clone, Copy)]
struct SavedState<F> {
    framebuffer: Option<F>,
    viewport: Viewport,
}

/// An off-screen render target backed by a framebuffer object.
///
/// The target never holds a reference to its context; every operation takes
/// the context explicitly and checks it is the one that created the target.
pub struct RenderTarget<C: GraphicsContext> {
    context: ContextId,
    handle: Option<C::Framebuffer>,
    color_attachments: Vec<Texture<C::Texture>>,
    depth_attachment: Option<Texture<C::Texture>>,
    stencil_enabled: bool,
    stencil_active: bool,
    fallback_color: Option<Renderbuffer<C::Renderbuffer>>,
    fallback_depth: Option<Renderbuffer<C::Renderbuffer>>,
    fallback_stencil: Option<Renderbuffer<C::Renderbuffer>>,
    width: u32,
    height: u32,
    bound_attachment_count: u32,
    draw_buffer_order: Vec<Attachment>,
    saved: Option<SavedState<C::Framebuffer>>,
}

impl<C: GraphicsContext> RenderTarget<C> {
    /// Creates a render target and, if any texture is supplied, builds its
    /// framebuffer immediately.
    ///
    /// An empty `colors` slice means "use a color renderbuffer"; `None` for
    /// `depth` means "use a depth renderbuffer".
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidDepthTexture`] if `depth` is not a
    /// depth-component / unsigned-int texture, and any error from
    /// [`set_attachments`](Self::set_attachments).
    pub fn new(
        ctx: &mut C,
        colors: &[Texture<C::Texture>],
        depth: Option<Texture<C::Texture>>,
        stencil: bool,
    ) -> Result<Self, RenderError> {
        if let Some(depth) = &depth {
            check_depth_texture(depth)?;
        }
        let mut target = Self::empty(ctx, stencil);
        if !colors.is_empty() || depth.is_some() {
            target.set_attachments(ctx, colors, depth, false)?;
        }
        Ok(target)
    }

    /// Creates an unconfigured target. No graphics calls are issued until
    /// attachments are set.
    pub fn empty(ctx: &C, stencil: bool) -> Self {
        Self {
            context: ctx.id(),
            handle: None,
            color_attachments: Vec::new(),
            depth_attachment: None,
            stencil_enabled: stencil,
            stencil_active: false,
            fallback_color: None,
            fallback_depth: None,
            fallback_stencil: None,
            width: 0,
            height: 0,
            bound_attachment_count: 0,
            draw_buffer_order: Vec::new(),
            saved: None,
        }
    }

    /// Replaces the attached textures.
    ///
    /// Returns `Ok(false)` without touching the context when the depth
    /// texture, the color textures (same handles, same order), and the
    /// stencil state are unchanged. Otherwise stores the new set, rebuilds
    /// the framebuffer and returns `Ok(true)`.
    ///
    /// With `skip_restore` the framebuffer stays bound afterwards instead of
    /// rebinding whatever was bound before the call.
    ///
    /// # Errors
    ///
    /// Validation errors leave the current configuration untouched:
    /// - [`RenderError::InvalidDepthTexture`], [`RenderError::DimensionMismatch`],
    ///   [`RenderError::FormatMismatch`], [`RenderError::CubemapNotAllowed`],
    ///   [`RenderError::EmptyAttachmentSet`]
    /// - [`RenderError::Unsupported`], [`RenderError::TooManyColorAttachments`]
    /// - [`RenderError::ReconfigureWhileBound`], [`RenderError::ForeignContext`]
    ///
    /// A failed rebuild ([`RenderError::Incomplete`], [`RenderError::Backend`])
    /// clears the stored attachments so the next call starts over.
    pub fn set_attachments(
        &mut self,
        ctx: &mut C,
        colors: &[Texture<C::Texture>],
        depth: Option<Texture<C::Texture>>,
        skip_restore: bool,
    ) -> Result<bool, RenderError> {
        self.check_context(ctx)?;
        if let Some(depth) = &depth {
            check_depth_texture(depth)?;
        }

        let nothing_to_attach = colors.is_empty() && depth.is_none() && !self.has_attachments();
        if nothing_to_attach || self.matches(colors, depth.as_ref()) {
            log::trace!("render target attachments unchanged, skipping rebuild");
            return Ok(false);
        }
        if self.saved.is_some() {
            return Err(RenderError::ReconfigureWhileBound);
        }
        measure(ctx, colors, depth.as_ref())?;

        self.color_attachments.clear();
        self.color_attachments.extend_from_slice(colors);
        self.depth_attachment = depth;

        self.update(ctx, skip_restore)?;
        Ok(true)
    }

    /// Rebuilds the framebuffer from the stored attachments, without the
    /// unchanged-set short-circuit.
    ///
    /// # Errors
    ///
    /// [`RenderError::NoAttachments`] if nothing is stored, which includes a
    /// target whose last rebuild failed. Otherwise the same as
    /// [`set_attachments`](Self::set_attachments).
    pub fn update(&mut self, ctx: &mut C, skip_restore: bool) -> Result<(), RenderError> {
        self.check_context(ctx)?;
        if self.saved.is_some() {
            return Err(RenderError::ReconfigureWhileBound);
        }
        if !self.has_attachments() {
            return Err(RenderError::NoAttachments);
        }
        let (width, height) = measure(ctx, &self.color_attachments, self.depth_attachment.as_ref())?;

        let previous = if skip_restore {
            None
        } else {
            Some(ctx.bound_framebuffer())
        };

        let result = self.rebuild(ctx, width, height);

        ctx.bind_texture_2d(None);
        ctx.bind_renderbuffer(None);
        if let Some(previous) = previous {
            ctx.bind_framebuffer(previous);
        }

        if result.is_err() {
            self.color_attachments.clear();
            self.depth_attachment = None;
            self.width = 0;
            self.height = 0;
        }
        result
    }

    fn rebuild(&mut self, ctx: &mut C, width: u32, height: u32) -> Result<(), RenderError> {
        let handle = match self.handle {
            Some(handle) => handle,
            None => {
                let handle = ctx.create_framebuffer()?;
                log::debug!("created framebuffer {handle:?}");
                self.handle = Some(handle);
                handle
            }
        };
        self.width = width;
        self.height = height;

        ctx.bind_framebuffer(Some(handle));

        match &self.depth_attachment {
            Some(depth) => ctx.framebuffer_texture_2d(Attachment::Depth, Some(depth.handle)),
            None => attach_fallback(
                ctx,
                &mut self.fallback_depth,
                RenderbufferFormat::DepthComponent16,
                Attachment::Depth,
                width,
                height,
            )?,
        }

        self.draw_buffer_order.clear();
        for (slot, color) in (0u32..).zip(&self.color_attachments) {
            ctx.framebuffer_texture_2d(Attachment::Color(slot), Some(color.handle));
            self.draw_buffer_order.push(Attachment::Color(slot));
        }
        if self.color_attachments.is_empty() {
            attach_fallback(
                ctx,
                &mut self.fallback_color,
                RenderbufferFormat::Rgba4,
                Attachment::Color(0),
                width,
                height,
            )?;
        }

        // Slot 0 holds the fallback renderbuffer when no color texture is given.
        let occupied = (self.color_attachments.len() as u32).max(1);
        for slot in occupied..self.bound_attachment_count {
            ctx.framebuffer_texture_2d(Attachment::Color(slot), None);
        }
        self.bound_attachment_count = occupied;

        if self.stencil_enabled {
            attach_fallback(
                ctx,
                &mut self.fallback_stencil,
                RenderbufferFormat::StencilIndex8,
                Attachment::Stencil,
                width,
                height,
            )?;
            self.stencil_active = true;
        } else {
            if self.stencil_active {
                ctx.framebuffer_renderbuffer(Attachment::Stencil, None);
            }
            self.stencil_active = false;
        }

        if self.draw_buffer_order.len() > 1 {
            ctx.draw_buffers(&self.draw_buffer_order);
        }

        let status = ctx.check_framebuffer_status();
        if status != FRAMEBUFFER_COMPLETE {
            return Err(RenderError::Incomplete { status });
        }

        log::debug!(
            "render target {handle:?} rebuilt: {width}x{height}, {} color, depth {}, stencil {}",
            self.color_attachments.len(),
            if self.depth_attachment.is_some() { "texture" } else { "renderbuffer" },
            self.stencil_active,
        );
        Ok(())
    }

    /// Makes this target the active framebuffer and sets the viewport to
    /// cover it.
    ///
    /// The current viewport is always saved. With `keep_previous` the
    /// current framebuffer binding is saved too and `unbind` returns to it;
    /// otherwise `unbind` returns to the default framebuffer.
    ///
    /// # Errors
    ///
    /// - [`RenderError::NoAttachments`] if the target was never configured.
    /// - [`RenderError::AlreadyBound`] if `bind` was already called without
    ///   a matching `unbind`.
    /// - [`RenderError::ForeignContext`] for a context other than the creator.
    pub fn bind(&mut self, ctx: &mut C, keep_previous: bool) -> Result<(), RenderError> {
        self.check_context(ctx)?;
        let handle = match self.handle {
            Some(handle) if self.has_attachments() => handle,
            _ => return Err(RenderError::NoAttachments),
        };
        if self.saved.is_some() {
            return Err(RenderError::AlreadyBound);
        }

        let viewport = ctx.viewport();
        let current = ctx.bound_framebuffer();
        let framebuffer = if keep_previous { current } else { None };
        self.saved = Some(SavedState {
            framebuffer,
            viewport,
        });

        if current != Some(handle) {
            ctx.bind_framebuffer(Some(handle));
        }
        ctx.set_viewport(Viewport::covering(self.width, self.height));
        log::trace!("bound render target {handle:?}, saved {framebuffer:?}");
        Ok(())
    }

    /// Restores the framebuffer binding and viewport saved by `bind`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::NotBound`] if there is no matching `bind`.
    pub fn unbind(&mut self, ctx: &mut C) -> Result<(), RenderError> {
        self.check_context(ctx)?;
        let saved = self.saved.take().ok_or(RenderError::NotBound)?;
        ctx.bind_framebuffer(saved.framebuffer);
        ctx.set_viewport(saved.viewport);
        log::trace!("unbound render target, restored {:?}", saved.framebuffer);
        Ok(())
    }

    /// Records a new stencil request.
    ///
    /// Takes effect at the next [`set_attachments`](Self::set_attachments)
    /// or [`update`](Self::update); the unchanged-set check treats a request
    /// that differs from the attached state as a change.
    pub fn set_stencil_enabled(&mut self, enabled: bool) {
        self.stencil_enabled = enabled;
    }

    /// Deletes the framebuffer and fallback renderbuffers.
    ///
    /// Attached textures belong to the caller and are left alone.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::ForeignContext`] if `ctx` did not create this
    /// target; nothing is deleted in that case.
    pub fn destroy(mut self, ctx: &mut C) -> Result<(), RenderError> {
        self.check_context(ctx)?;
        if let Some(saved) = self.saved.take() {
            ctx.bind_framebuffer(saved.framebuffer);
            ctx.set_viewport(saved.viewport);
        }
        if let Some(handle) = self.handle.take() {
            ctx.delete_framebuffer(handle);
        }
        for slot in [
            &mut self.fallback_color,
            &mut self.fallback_depth,
            &mut self.fallback_stencil,
        ] {
            if let Some(buffer) = slot.take() {
                ctx.delete_renderbuffer(buffer.handle);
            }
        }
        Ok(())
    }

    /// Returns the framebuffer handle, once created.
    pub fn handle(&self) -> Option<C::Framebuffer> {
        self.handle
    }

    /// Returns the width in pixels (0 until configured).
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height in pixels (0 until configured).
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the width and height as a vector.
    pub fn size(&self) -> UVec2 {
        UVec2::new(self.width, self.height)
    }

    /// Returns the attached color textures in slot order. Empty when the
    /// fallback color renderbuffer is in use.
    pub fn color_attachments(&self) -> &[Texture<C::Texture>] {
        &self.color_attachments
    }

    /// Returns the depth texture, or `None` when the depth renderbuffer is
    /// in use.
    pub fn depth_attachment(&self) -> Option<&Texture<C::Texture>> {
        self.depth_attachment.as_ref()
    }

    /// Whether a stencil buffer is requested.
    pub fn stencil_enabled(&self) -> bool {
        self.stencil_enabled
    }

    /// Whether a stencil buffer is currently attached.
    pub fn stencil_active(&self) -> bool {
        self.stencil_active
    }

    /// Number of color slots currently occupied on the framebuffer.
    pub fn bound_attachment_count(&self) -> u32 {
        self.bound_attachment_count
    }

    /// Color slots in fragment-output order, as declared to the context.
    pub fn draw_buffer_order(&self) -> &[Attachment] {
        &self.draw_buffer_order
    }

    /// Returns `true` once the framebuffer exists and has attachments.
    pub fn is_configured(&self) -> bool {
        self.handle.is_some() && self.has_attachments()
    }

    /// Returns `true` between `bind` and `unbind`.
    pub fn is_bound(&self) -> bool {
        self.saved.is_some()
    }

    /// Returns the identity of the context that created this target.
    pub fn context_id(&self) -> ContextId {
        self.context
    }

    fn has_attachments(&self) -> bool {
        !self.color_attachments.is_empty() || self.depth_attachment.is_some()
    }

    fn check_context(&self, ctx: &C) -> Result<(), RenderError> {
        if ctx.id() == self.context {
            Ok(())
        } else {
            Err(RenderError::ForeignContext)
        }
    }

    fn matches(&self, colors: &[Texture<C::Texture>], depth: Option<&Texture<C::Texture>>) -> bool {
        let same_depth = match (self.depth_attachment.as_ref(), depth) {
            (Some(a), Some(b)) => a.same_resource(b),
            (None, None) => true,
            _ => false,
        };
        same_depth
            && self.color_attachments.len() == colors.len()
            && self
                .color_attachments
                .iter()
                .zip(colors)
                .all(|(a, b)| a.same_resource(b))
            && self.stencil_enabled == self.stencil_active
    }
}

impl<C: GraphicsContext> Drop for RenderTarget<C> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle {
            log::warn!("render target {handle:?} dropped without destroy(); GPU objects leaked");
        }
    }
}

fn check_depth_texture<H: Copy + PartialEq>(depth: &Texture<H>) -> Result<(), RenderError> {
    if depth.is_depth_attachable() {
        Ok(())
    } else {
        Err(RenderError::InvalidDepthTexture {
            format: depth.format,
            pixel_type: depth.pixel_type,
        })
    }
}

/// Validates an attachment set against itself and the context's
/// capabilities, returning the shared size.
fn measure<C: GraphicsContext>(
    ctx: &C,
    colors: &[Texture<C::Texture>],
    depth: Option<&Texture<C::Texture>>,
) -> Result<(u32, u32), RenderError> {
    let (width, height) = match (colors.first(), depth) {
        (Some(first), _) => {
            for (index, color) in colors.iter().enumerate() {
                if color.width != first.width || color.height != first.height {
                    return Err(RenderError::DimensionMismatch {
                        index,
                        expected_width: first.width,
                        expected_height: first.height,
                        found_width: color.width,
                        found_height: color.height,
                    });
                }
                if color.pixel_type != first.pixel_type {
                    return Err(RenderError::FormatMismatch {
                        index,
                        expected: first.pixel_type,
                        found: color.pixel_type,
                    });
                }
                if color.kind != TextureKind::Texture2d {
                    return Err(RenderError::CubemapNotAllowed { index });
                }
            }
            (first.width, first.height)
        }
        (None, Some(depth)) => (depth.width, depth.height),
        (None, None) => return Err(RenderError::EmptyAttachmentSet),
    };

    if let Some(depth) = depth {
        if depth.width != width || depth.height != height {
            return Err(RenderError::DimensionMismatch {
                index: colors.len(),
                expected_width: width,
                expected_height: height,
                found_width: depth.width,
                found_height: depth.height,
            });
        }
        if !ctx.supports_depth_texture() {
            return Err(RenderError::Unsupported(Feature::DepthTexture));
        }
    }

    if colors.len() > 1 && !ctx.supports_draw_buffers() {
        return Err(RenderError::Unsupported(Feature::DrawBuffers));
    }
    let max = ctx.max_color_attachments();
    if colors.len() > max as usize {
        return Err(RenderError::TooManyColorAttachments {
            requested: colors.len(),
            max,
        });
    }

    Ok((width, height))
}
