//! Plan replay against a recording context.

use std::fs;
use std::path::Path;

use fbo_core::{
    Capabilities, GlCall, ObjectId, PassLayout, RecordingContext, RenderError, RenderTarget,
    TargetPlan, TexturePool,
};

use crate::error::CliError;

/// Command-line capability overrides, applied on top of the plan's own.
#[derive(Debug, Clone, Copy, Default)]
pub struct CapabilityOverrides {
    pub no_depth_texture: bool,
    pub no_draw_buffers: bool,
    pub max_color_attachments: Option<u32>,
}

impl CapabilityOverrides {
    pub fn apply(&self, mut caps: Capabilities) -> Capabilities {
        if self.no_depth_texture {
            caps.depth_texture = false;
        }
        if self.no_draw_buffers {
            caps.draw_buffers = false;
        }
        if let Some(max) = self.max_color_attachments {
            caps.max_color_attachments = max;
        }
        caps
    }
}

/// What one pass of a plan did to the context.
#[derive(Debug, Clone, PartialEq)]
pub struct PassTrace {
    pub index: usize,
    /// `false` when the pass reused the previous attachment set.
    pub rebuilt: bool,
    pub width: u32,
    pub height: u32,
    pub calls: Vec<GlCall>,
}

/// Reads and parses a plan file.
pub fn load_plan(path: &Path) -> Result<TargetPlan, CliError> {
    let json = fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    TargetPlan::from_json(&json).map_err(|source| CliError::Plan {
        path: path.to_path_buf(),
        source,
    })
}

/// Replays every pass of `plan` on one render target and returns the calls
/// each pass issued.
///
/// The target and the texture pool are released even when a pass fails.
pub fn trace(
    plan: &TargetPlan,
    overrides: &CapabilityOverrides,
) -> Result<Vec<PassTrace>, CliError> {
    let mut ctx = RecordingContext::with_capabilities(overrides.apply(plan.capabilities));
    let pool = plan.create_textures(&mut ctx)?;
    let mut target = RenderTarget::empty(&ctx, plan.stencil);

    let mut traces = Vec::with_capacity(plan.passes.len());
    let mut outcome = Ok(());
    for (index, pass) in plan.passes.iter().enumerate() {
        match trace_pass(plan, pass, &pool, &mut target, &mut ctx) {
            Ok((rebuilt, calls)) => traces.push(PassTrace {
                index,
                rebuilt,
                width: target.width(),
                height: target.height(),
                calls,
            }),
            Err(e) => {
                log::error!("pass {index} failed: {e}");
                outcome = Err(e);
                break;
            }
        }
    }

    let destroyed = target.destroy(&mut ctx);
    pool.release(&mut ctx);
    outcome?;
    destroyed?;
    Ok(traces)
}

fn trace_pass(
    plan: &TargetPlan,
    pass: &PassLayout,
    pool: &TexturePool<ObjectId>,
    target: &mut RenderTarget<RecordingContext>,
    ctx: &mut RecordingContext,
) -> Result<(bool, Vec<GlCall>), RenderError> {
    ctx.clear_calls();
    target.set_stencil_enabled(plan.stencil_for(pass));
    let (colors, depth) = pool.resolve(pass)?;
    let rebuilt = target.set_attachments(ctx, &colors, depth, false)?;
    if target.is_configured() {
        target.bind(ctx, true)?;
        target.unbind(ctx)?;
    }
    let calls = ctx.take_calls();
    log::info!(
        "pass: rebuilt={rebuilt} size={}x{} calls={}",
        target.width(),
        target.height(),
        calls.len()
    );
    Ok((rebuilt, calls))
}
