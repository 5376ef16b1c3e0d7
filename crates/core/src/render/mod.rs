//! glow rendering backend.
//!
//! This module is only available when the `render` feature is enabled.
//!
//! - [`context`] -- GPU context wrapper implementing `GraphicsContext`.
//! - [`texture`] -- GL enum mappings and texture creation.

pub mod context;
pub mod texture;

pub use context::GpuContext;
pub use texture::{
    create_texture, gl_attachment, gl_format, gl_internal_format, gl_pixel_type,
    gl_renderbuffer_format, gl_texture_target, texture_internal_format,
};
