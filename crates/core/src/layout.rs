//! Render-target plans: a JSON description of a texture pool and a sequence
//! of attachment sets applied to one render target.
//!
//! Textures are referenced by name so consecutive passes can share them,
//! which is what makes the unchanged-set short-circuit and slot detaching
//! observable when a plan is replayed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::context::{Capabilities, GraphicsContext};
use crate::error::RenderError;
use crate::texture::{Texture, TextureDesc};

/// One attachment set in a plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassLayout {
    /// Color texture names, in attachment order.
    #[serde(default)]
    pub color: Vec<String>,
    /// Depth texture name; a depth renderbuffer is used when absent.
    #[serde(default)]
    pub depth: Option<String>,
    /// Stencil request for this pass; inherits the plan default when absent.
    #[serde(default)]
    pub stencil: Option<bool>,
}

/// A complete render-target plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetPlan {
    /// Textures available to passes, by name.
    #[serde(default)]
    pub textures: BTreeMap<String, TextureDesc>,
    /// Stencil request for passes that do not set their own.
    #[serde(default)]
    pub stencil: bool,
    /// Capabilities to assume when the plan is replayed without a GPU.
    #[serde(default)]
    pub capabilities: Capabilities,
    #[serde(default)]
    pub passes: Vec<PassLayout>,
}

impl TargetPlan {
    /// Parses a plan from JSON.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error for malformed JSON, unknown enum
    /// values, or missing texture dimensions.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Stencil request in effect for `pass`.
    pub fn stencil_for(&self, pass: &PassLayout) -> bool {
        pass.stencil.unwrap_or(self.stencil)
    }

    /// Creates every texture in the pool.
    ///
    /// # Errors
    ///
    /// Returns the first creation error; textures created before it are
    /// deleted again.
    pub fn create_textures<C: GraphicsContext>(
        &self,
        ctx: &mut C,
    ) -> Result<TexturePool<C::Texture>, RenderError> {
        let mut pool = TexturePool {
            textures: BTreeMap::new(),
        };
        for (name, desc) in &self.textures {
            match ctx.create_texture(desc) {
                Ok(texture) => {
                    pool.textures.insert(name.clone(), texture);
                }
                Err(err) => {
                    pool.release(ctx);
                    return Err(err);
                }
            }
        }
        Ok(pool)
    }
}

/// Textures created from a plan, addressable by name.
#[derive(Debug, Clone)]
pub struct TexturePool<H> {
    textures: BTreeMap<String, Texture<H>>,
}

impl<H: Copy + PartialEq> TexturePool<H> {
    pub fn get(&self, name: &str) -> Option<&Texture<H>> {
        self.textures.get(name)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Looks up the textures a pass names.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::UnknownTexture`] for a name missing from the pool.
    pub fn resolve(
        &self,
        pass: &PassLayout,
    ) -> Result<(Vec<Texture<H>>, Option<Texture<H>>), RenderError> {
        let lookup = |name: &String| {
            self.textures
                .get(name)
                .copied()
                .ok_or_else(|| RenderError::UnknownTexture(name.clone()))
        };
        let colors = pass.color.iter().map(lookup).collect::<Result<Vec<_>, _>>()?;
        let depth = pass.depth.as_ref().map(lookup).transpose()?;
        Ok((colors, depth))
    }

    /// Deletes every texture in the pool.
    pub fn release<C: GraphicsContext<Texture = H>>(self, ctx: &mut C) {
        for texture in self.textures.into_values() {
            ctx.delete_texture(texture.handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RecordingContext;
    use crate::texture::PixelFormat;

    const DEFERRED: &str = r#"{
        "textures": {
            "albedo": {"width": 256, "height": 256},
            "normal": {"width": 256, "height": 256},
            "depth": {"width": 256, "height": 256, "format": "depth_component", "pixel_type": "unsigned_int"}
        },
        "stencil": true,
        "capabilities": {"max_color_attachments": 4},
        "passes": [
            {"color": ["albedo", "normal"], "depth": "depth"},
            {"color": ["albedo"], "stencil": false}
        ]
    }"#;

    #[test]
    fn parses_full_plan() {
        let plan = TargetPlan::from_json(DEFERRED).unwrap();
        assert_eq!(plan.textures.len(), 3);
        assert_eq!(plan.textures["depth"].format, PixelFormat::DepthComponent);
        assert_eq!(plan.capabilities.max_color_attachments, 4);
        assert!(plan.capabilities.draw_buffers);
        assert_eq!(plan.passes.len(), 2);
        assert_eq!(plan.passes[0].depth.as_deref(), Some("depth"));
    }

    #[test]
    fn pass_stencil_overrides_plan_default() {
        let plan = TargetPlan::from_json(DEFERRED).unwrap();
        assert!(plan.stencil_for(&plan.passes[0]));
        assert!(!plan.stencil_for(&plan.passes[1]));
    }

    #[test]
    fn empty_object_is_an_empty_plan() {
        let plan = TargetPlan::from_json("{}").unwrap();
        assert_eq!(plan, TargetPlan::default());
    }

    #[test]
    fn texture_without_size_is_rejected() {
        let result = TargetPlan::from_json(r#"{"textures": {"a": {"width": 4}}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn pool_resolves_names_in_order() {
        let plan = TargetPlan::from_json(DEFERRED).unwrap();
        let mut ctx = RecordingContext::new();
        let pool = plan.create_textures(&mut ctx).unwrap();
        assert_eq!(pool.len(), 3);

        let (colors, depth) = pool.resolve(&plan.passes[0]).unwrap();
        assert_eq!(colors.len(), 2);
        assert_eq!(colors[0].handle, pool.get("albedo").unwrap().handle);
        assert_eq!(colors[1].handle, pool.get("normal").unwrap().handle);
        assert!(depth.unwrap().is_depth_attachable());
    }

    #[test]
    fn unknown_name_fails_resolution() {
        let plan = TargetPlan::from_json(DEFERRED).unwrap();
        let mut ctx = RecordingContext::new();
        let pool = plan.create_textures(&mut ctx).unwrap();
        let pass = PassLayout {
            color: vec!["albedo".into(), "specular".into()],
            ..PassLayout::default()
        };
        assert_eq!(
            pool.resolve(&pass).unwrap_err(),
            RenderError::UnknownTexture("specular".into())
        );
    }

    #[test]
    fn release_deletes_every_texture() {
        let plan = TargetPlan::from_json(DEFERRED).unwrap();
        let mut ctx = RecordingContext::new();
        let pool = plan.create_textures(&mut ctx).unwrap();
        assert_eq!(ctx.live_textures(), 3);
        pool.release(&mut ctx);
        assert_eq!(ctx.live_textures(), 0);
    }
}
