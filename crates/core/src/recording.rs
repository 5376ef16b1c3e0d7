//! A software graphics context that tracks framebuffer state and records
//! every call it receives.
//!
//! `RecordingContext` needs no GPU. It keeps enough state to answer the
//! queries a render target makes (current binding, viewport) and evaluates
//! completeness with the GLES2 rules, so it can stand in for a driver in
//! tests and in dry runs of a render-target plan.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::context::{
    Attachment, Capabilities, ContextId, GraphicsContext, Viewport, FRAMEBUFFER_COMPLETE,
    FRAMEBUFFER_INCOMPLETE_ATTACHMENT, FRAMEBUFFER_INCOMPLETE_DIMENSIONS,
    FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT,
};
use crate::error::RenderError;
use crate::renderbuffer::RenderbufferFormat;
use crate::texture::{Texture, TextureDesc};

/// Handle to a framebuffer, renderbuffer, or texture in a [`RecordingContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ObjectId(u32);

impl ObjectId {
    pub fn get(self) -> u32 {
        self.0
    }
}

/// One call received by a [`RecordingContext`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GlCall {
    CreateFramebuffer(ObjectId),
    CreateRenderbuffer(ObjectId),
    CreateTexture(ObjectId),
    DeleteFramebuffer(ObjectId),
    DeleteRenderbuffer(ObjectId),
    DeleteTexture(ObjectId),
    QueryFramebufferBinding,
    QueryViewport,
    BindFramebuffer(Option<ObjectId>),
    BindRenderbuffer(Option<ObjectId>),
    BindTexture2d(Option<ObjectId>),
    RenderbufferStorage {
        format: RenderbufferFormat,
        width: u32,
        height: u32,
    },
    FramebufferTexture2d {
        attachment: Attachment,
        texture: Option<ObjectId>,
    },
    FramebufferRenderbuffer {
        attachment: Attachment,
        renderbuffer: Option<ObjectId>,
    },
    DrawBuffers(Vec<Attachment>),
    CheckFramebufferStatus,
    SetViewport(Viewport),
}

impl GlCall {
    /// Returns `false` for queries and status checks, `true` for every call
    /// that changes context or object state.
    pub fn is_mutating(&self) -> bool {
        !matches!(
            self,
            GlCall::QueryFramebufferBinding | GlCall::QueryViewport | GlCall::CheckFramebufferStatus
        )
    }

    /// Returns `true` for calls that attach or detach an image.
    pub fn is_attachment(&self) -> bool {
        matches!(
            self,
            GlCall::FramebufferTexture2d { .. } | GlCall::FramebufferRenderbuffer { .. }
        )
    }
}

/// What a framebuffer attachment point currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachedImage {
    Texture(ObjectId),
    Renderbuffer(ObjectId),
}

/// A [`GraphicsContext`] with no GPU behind it.
#[derive(Debug)]
pub struct RecordingContext {
    id: ContextId,
    capabilities: Capabilities,
    next_object: u32,
    bound_framebuffer: Option<ObjectId>,
    bound_renderbuffer: Option<ObjectId>,
    bound_texture: Option<ObjectId>,
    viewport: Viewport,
    framebuffers: BTreeMap<ObjectId, BTreeMap<Attachment, AttachedImage>>,
    renderbuffers: BTreeMap<ObjectId, Option<(u32, u32)>>,
    textures: BTreeMap<ObjectId, (u32, u32)>,
    forced_status: Option<u32>,
    calls: Vec<GlCall>,
}

impl RecordingContext {
    /// Initial viewport of a fresh context.
    pub const INITIAL_VIEWPORT: Viewport = Viewport {
        x: 0,
        y: 0,
        width: 640,
        height: 480,
    };

    /// Creates a context with full capabilities.
    pub fn new() -> Self {
        Self::with_capabilities(Capabilities::default())
    }

    /// Creates a context reporting the given capabilities.
    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        Self {
            id: ContextId::next(),
            capabilities,
            next_object: 1,
            bound_framebuffer: None,
            bound_renderbuffer: None,
            bound_texture: None,
            viewport: Self::INITIAL_VIEWPORT,
            framebuffers: BTreeMap::new(),
            renderbuffers: BTreeMap::new(),
            textures: BTreeMap::new(),
            forced_status: None,
            calls: Vec::new(),
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Every call received since creation or the last clear.
    pub fn calls(&self) -> &[GlCall] {
        &self.calls
    }

    /// Returns the recorded calls and starts a fresh log.
    pub fn take_calls(&mut self) -> Vec<GlCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Number of recorded calls that changed state.
    pub fn mutation_count(&self) -> usize {
        self.calls.iter().filter(|c| c.is_mutating()).count()
    }

    /// Makes every following status check return `status` (or the computed
    /// status again with `None`).
    pub fn force_status(&mut self, status: Option<u32>) {
        self.forced_status = status;
    }

    /// Images attached to `framebuffer`, ordered by attachment point.
    pub fn attachments(&self, framebuffer: ObjectId) -> Vec<(Attachment, AttachedImage)> {
        self.framebuffers
            .get(&framebuffer)
            .map(|points| points.iter().map(|(a, img)| (*a, *img)).collect())
            .unwrap_or_default()
    }

    /// Storage size of a renderbuffer, if it exists and has storage.
    pub fn renderbuffer_size(&self, renderbuffer: ObjectId) -> Option<(u32, u32)> {
        self.renderbuffers.get(&renderbuffer).copied().flatten()
    }

    pub fn live_framebuffers(&self) -> usize {
        self.framebuffers.len()
    }

    pub fn live_renderbuffers(&self) -> usize {
        self.renderbuffers.len()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    fn allocate(&mut self) -> ObjectId {
        let id = ObjectId(self.next_object);
        self.next_object += 1;
        id
    }

    fn attach(&mut self, attachment: Attachment, image: Option<AttachedImage>) {
        let Some(fb) = self.bound_framebuffer else {
            log::warn!("attachment call on the default framebuffer ignored");
            return;
        };
        let points = self.framebuffers.entry(fb).or_default();
        match image {
            Some(image) => {
                points.insert(attachment, image);
            }
            None => {
                points.remove(&attachment);
            }
        }
    }

    fn image_size(&self, image: AttachedImage) -> Option<(u32, u32)> {
        match image {
            AttachedImage::Texture(id) => self.textures.get(&id).copied(),
            AttachedImage::Renderbuffer(id) => self.renderbuffer_size(id),
        }
    }

    fn compute_status(&self) -> u32 {
        let Some(fb) = self.bound_framebuffer else {
            return FRAMEBUFFER_COMPLETE;
        };
        let points = match self.framebuffers.get(&fb) {
            Some(points) if !points.is_empty() => points,
            _ => return FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT,
        };

        let mut sizes = Vec::with_capacity(points.len());
        for image in points.values() {
            match self.image_size(*image) {
                Some((w, h)) if w > 0 && h > 0 => sizes.push((w, h)),
                _ => return FRAMEBUFFER_INCOMPLETE_ATTACHMENT,
            }
        }
        if sizes.windows(2).any(|pair| pair[0] != pair[1]) {
            return FRAMEBUFFER_INCOMPLETE_DIMENSIONS;
        }
        FRAMEBUFFER_COMPLETE
    }
}

impl Default for RecordingContext {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsContext for RecordingContext {
    type Framebuffer = ObjectId;
    type Renderbuffer = ObjectId;
    type Texture = ObjectId;

    fn id(&self) -> ContextId {
        self.id
    }

    fn supports_depth_texture(&self) -> bool {
        self.capabilities.depth_texture
    }

    fn supports_draw_buffers(&self) -> bool {
        self.capabilities.draw_buffers
    }

    fn max_color_attachments(&self) -> u32 {
        self.capabilities.max_color_attachments.max(1)
    }

    fn create_framebuffer(&mut self) -> Result<ObjectId, RenderError> {
        let id = self.allocate();
        self.framebuffers.insert(id, BTreeMap::new());
        self.calls.push(GlCall::CreateFramebuffer(id));
        Ok(id)
    }

    fn create_renderbuffer(&mut self) -> Result<ObjectId, RenderError> {
        let id = self.allocate();
        self.renderbuffers.insert(id, None);
        self.calls.push(GlCall::CreateRenderbuffer(id));
        Ok(id)
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<Texture<ObjectId>, RenderError> {
        let id = self.allocate();
        self.textures.insert(id, (desc.width, desc.height));
        self.calls.push(GlCall::CreateTexture(id));
        Ok(Texture::from_desc(id, desc))
    }

    fn delete_framebuffer(&mut self, framebuffer: ObjectId) {
        self.framebuffers.remove(&framebuffer);
        if self.bound_framebuffer == Some(framebuffer) {
            self.bound_framebuffer = None;
        }
        self.calls.push(GlCall::DeleteFramebuffer(framebuffer));
    }

    fn delete_renderbuffer(&mut self, renderbuffer: ObjectId) {
        self.renderbuffers.remove(&renderbuffer);
        if self.bound_renderbuffer == Some(renderbuffer) {
            self.bound_renderbuffer = None;
        }
        self.calls.push(GlCall::DeleteRenderbuffer(renderbuffer));
    }

    fn delete_texture(&mut self, texture: ObjectId) {
        self.textures.remove(&texture);
        if self.bound_texture == Some(texture) {
            self.bound_texture = None;
        }
        self.calls.push(GlCall::DeleteTexture(texture));
    }

    fn bound_framebuffer(&mut self) -> Option<ObjectId> {
        self.calls.push(GlCall::QueryFramebufferBinding);
        self.bound_framebuffer
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<ObjectId>) {
        self.bound_framebuffer = framebuffer;
        self.calls.push(GlCall::BindFramebuffer(framebuffer));
    }

    fn bind_renderbuffer(&mut self, renderbuffer: Option<ObjectId>) {
        self.bound_renderbuffer = renderbuffer;
        self.calls.push(GlCall::BindRenderbuffer(renderbuffer));
    }

    fn bind_texture_2d(&mut self, texture: Option<ObjectId>) {
        self.bound_texture = texture;
        self.calls.push(GlCall::BindTexture2d(texture));
    }

    fn renderbuffer_storage(&mut self, format: RenderbufferFormat, width: u32, height: u32) {
        match self.bound_renderbuffer {
            Some(rb) => {
                self.renderbuffers.insert(rb, Some((width, height)));
            }
            None => log::warn!("renderbuffer storage with no renderbuffer bound ignored"),
        }
        self.calls.push(GlCall::RenderbufferStorage {
            format,
            width,
            height,
        });
    }

    fn framebuffer_texture_2d(&mut self, attachment: Attachment, texture: Option<ObjectId>) {
        self.attach(attachment, texture.map(AttachedImage::Texture));
        self.calls.push(GlCall::FramebufferTexture2d {
            attachment,
            texture,
        });
    }

    fn framebuffer_renderbuffer(&mut self, attachment: Attachment, renderbuffer: Option<ObjectId>) {
        self.attach(attachment, renderbuffer.map(AttachedImage::Renderbuffer));
        self.calls.push(GlCall::FramebufferRenderbuffer {
            attachment,
            renderbuffer,
        });
    }

    fn draw_buffers(&mut self, slots: &[Attachment]) {
        self.calls.push(GlCall::DrawBuffers(slots.to_vec()));
    }

    fn check_framebuffer_status(&mut self) -> u32 {
        self.calls.push(GlCall::CheckFramebufferStatus);
        self.forced_status.unwrap_or_else(|| self.compute_status())
    }

    fn viewport(&mut self) -> Viewport {
        self.calls.push(GlCall::QueryViewport);
        self.viewport
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.calls.push(GlCall::SetViewport(viewport));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_context_starts_on_default_framebuffer() {
        let mut ctx = RecordingContext::new();
        assert_eq!(ctx.bound_framebuffer(), None);
        assert_eq!(ctx.viewport(), RecordingContext::INITIAL_VIEWPORT);
    }

    #[test]
    fn default_framebuffer_is_complete() {
        let mut ctx = RecordingContext::new();
        assert_eq!(ctx.check_framebuffer_status(), FRAMEBUFFER_COMPLETE);
    }

    #[test]
    fn empty_framebuffer_is_missing_attachment() {
        let mut ctx = RecordingContext::new();
        let fb = ctx.create_framebuffer().unwrap();
        ctx.bind_framebuffer(Some(fb));
        assert_eq!(
            ctx.check_framebuffer_status(),
            FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT
        );
    }

    #[test]
    fn renderbuffer_without_storage_is_incomplete_attachment() {
        let mut ctx = RecordingContext::new();
        let fb = ctx.create_framebuffer().unwrap();
        let rb = ctx.create_renderbuffer().unwrap();
        ctx.bind_framebuffer(Some(fb));
        ctx.framebuffer_renderbuffer(Attachment::Depth, Some(rb));
        assert_eq!(
            ctx.check_framebuffer_status(),
            FRAMEBUFFER_INCOMPLETE_ATTACHMENT
        );
    }

    #[test]
    fn mixed_sizes_are_incomplete_dimensions() {
        let mut ctx = RecordingContext::new();
        let fb = ctx.create_framebuffer().unwrap();
        let small = ctx.create_texture(&TextureDesc::color(64, 64)).unwrap();
        let large = ctx.create_texture(&TextureDesc::color(128, 128)).unwrap();
        ctx.bind_framebuffer(Some(fb));
        ctx.framebuffer_texture_2d(Attachment::Color(0), Some(small.handle));
        ctx.framebuffer_texture_2d(Attachment::Color(1), Some(large.handle));
        assert_eq!(
            ctx.check_framebuffer_status(),
            FRAMEBUFFER_INCOMPLETE_DIMENSIONS
        );
    }

    #[test]
    fn matching_texture_and_renderbuffer_are_complete() {
        let mut ctx = RecordingContext::new();
        let fb = ctx.create_framebuffer().unwrap();
        let color = ctx.create_texture(&TextureDesc::color(32, 16)).unwrap();
        let rb = ctx.create_renderbuffer().unwrap();
        ctx.bind_framebuffer(Some(fb));
        ctx.bind_renderbuffer(Some(rb));
        ctx.renderbuffer_storage(RenderbufferFormat::DepthComponent16, 32, 16);
        ctx.framebuffer_texture_2d(Attachment::Color(0), Some(color.handle));
        ctx.framebuffer_renderbuffer(Attachment::Depth, Some(rb));
        assert_eq!(ctx.check_framebuffer_status(), FRAMEBUFFER_COMPLETE);
        assert_eq!(
            ctx.attachments(fb),
            vec![
                (Attachment::Color(0), AttachedImage::Texture(color.handle)),
                (Attachment::Depth, AttachedImage::Renderbuffer(rb)),
            ]
        );
    }

    #[test]
    fn detaching_removes_the_image() {
        let mut ctx = RecordingContext::new();
        let fb = ctx.create_framebuffer().unwrap();
        let color = ctx.create_texture(&TextureDesc::color(8, 8)).unwrap();
        ctx.bind_framebuffer(Some(fb));
        ctx.framebuffer_texture_2d(Attachment::Color(0), Some(color.handle));
        ctx.framebuffer_texture_2d(Attachment::Color(0), None);
        assert!(ctx.attachments(fb).is_empty());
    }

    #[test]
    fn forced_status_overrides_computed_status() {
        let mut ctx = RecordingContext::new();
        ctx.force_status(Some(FRAMEBUFFER_INCOMPLETE_ATTACHMENT));
        assert_eq!(
            ctx.check_framebuffer_status(),
            FRAMEBUFFER_INCOMPLETE_ATTACHMENT
        );
        ctx.force_status(None);
        assert_eq!(ctx.check_framebuffer_status(), FRAMEBUFFER_COMPLETE);
    }

    #[test]
    fn queries_are_recorded_but_not_mutating() {
        let mut ctx = RecordingContext::new();
        ctx.bound_framebuffer();
        ctx.viewport();
        ctx.check_framebuffer_status();
        assert_eq!(ctx.calls().len(), 3);
        assert_eq!(ctx.mutation_count(), 0);

        ctx.set_viewport(Viewport::covering(1, 1));
        assert_eq!(ctx.mutation_count(), 1);
    }

    #[test]
    fn take_calls_drains_the_log() {
        let mut ctx = RecordingContext::new();
        ctx.create_framebuffer().unwrap();
        let calls = ctx.take_calls();
        assert_eq!(calls.len(), 1);
        assert!(ctx.calls().is_empty());
    }

    #[test]
    fn deleting_bound_framebuffer_falls_back_to_default() {
        let mut ctx = RecordingContext::new();
        let fb = ctx.create_framebuffer().unwrap();
        ctx.bind_framebuffer(Some(fb));
        ctx.delete_framebuffer(fb);
        assert_eq!(ctx.bound_framebuffer(), None);
        assert_eq!(ctx.live_framebuffers(), 0);
    }

    #[test]
    fn object_ids_are_distinct_across_kinds() {
        let mut ctx = RecordingContext::new();
        let fb = ctx.create_framebuffer().unwrap();
        let rb = ctx.create_renderbuffer().unwrap();
        let tex = ctx.create_texture(&TextureDesc::color(1, 1)).unwrap();
        assert_ne!(fb, rb);
        assert_ne!(rb, tex.handle);
        assert!(fb.get() > 0);
    }

    #[test]
    fn max_color_attachments_is_at_least_one() {
        let ctx = RecordingContext::with_capabilities(Capabilities {
            max_color_attachments: 0,
            ..Capabilities::default()
        });
        assert_eq!(ctx.max_color_attachments(), 1);
    }

    #[test]
    fn calls_serialize_as_snake_case() {
        let json = serde_json::to_string(&GlCall::BindFramebuffer(None)).unwrap();
        assert_eq!(json, r#"{"bind_framebuffer":null}"#);
    }
}
