//! Error types for render-target configuration.

use thiserror::Error;

use crate::context::Feature;
use crate::texture::{PixelFormat, PixelType};

/// Broad category of a [`RenderError`].
///
/// Callers that only need to decide between "fix the inputs" and "fall back
/// to another rendering strategy" can match on this instead of every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input: bad depth texture, mismatched attachments, cubemaps.
    InvalidArgument,
    /// The graphics context lacks a required capability.
    UnsupportedFeature,
    /// The operation is not valid in the target's current lifecycle state.
    InvalidState,
    /// The driver failed to create an object.
    Backend,
}

/// Errors produced by render-target operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// A depth texture was not `DepthComponent` / `UnsignedInt`.
    #[error(
        "depth texture must be depth_component/unsigned_int, got {format:?}/{pixel_type:?}"
    )]
    InvalidDepthTexture {
        format: PixelFormat,
        pixel_type: PixelType,
    },

    /// An attachment's size differs from the first attachment's size.
    #[error(
        "dimension mismatch: attachment {index} is {found_width}x{found_height}, expected {expected_width}x{expected_height}"
    )]
    DimensionMismatch {
        index: usize,
        expected_width: u32,
        expected_height: u32,
        found_width: u32,
        found_height: u32,
    },

    /// A color attachment's pixel type differs from the first color attachment's.
    #[error("format mismatch: attachment {index} has pixel type {found:?}, expected {expected:?}")]
    FormatMismatch {
        index: usize,
        expected: PixelType,
        found: PixelType,
    },

    /// A color attachment was not a 2D texture.
    #[error("cubemap not allowed: color attachment {index} is not a 2D texture")]
    CubemapNotAllowed { index: usize },

    /// Neither color textures nor a depth texture were supplied.
    #[error("no attachments supplied: at least one color or depth texture is required")]
    EmptyAttachmentSet,

    /// A plan referenced a texture name missing from its texture pool.
    #[error("unknown texture: {0}")]
    UnknownTexture(String),

    /// The context lacks a capability the attachment set needs.
    #[error("unsupported feature: {0}")]
    Unsupported(Feature),

    /// More color attachments were requested than the context exposes.
    #[error("{requested} color attachments requested, context supports at most {max}")]
    TooManyColorAttachments { requested: usize, max: u32 },

    /// `bind` was called on a target with no attachments.
    #[error("render target has no attachments")]
    NoAttachments,

    /// The driver rejected the attachment set.
    #[error("framebuffer incomplete: status 0x{status:04X}")]
    Incomplete { status: u32 },

    /// `unbind` was called without a matching `bind`.
    #[error("render target is not bound")]
    NotBound,

    /// `bind` was called twice without an `unbind` in between.
    #[error("render target is already bound")]
    AlreadyBound,

    /// Attachments were changed while the target was bound.
    #[error("cannot reconfigure a bound render target")]
    ReconfigureWhileBound,

    /// The target was used with a context other than the one that created it.
    #[error("render target belongs to a different graphics context")]
    ForeignContext,

    /// Object creation failed inside the graphics backend.
    #[error("backend error: {0}")]
    Backend(String),
}

impl RenderError {
    /// Returns the category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RenderError::InvalidDepthTexture { .. }
            | RenderError::DimensionMismatch { .. }
            | RenderError::FormatMismatch { .. }
            | RenderError::CubemapNotAllowed { .. }
            | RenderError::EmptyAttachmentSet
            | RenderError::UnknownTexture(_) => ErrorKind::InvalidArgument,
            RenderError::Unsupported(_) | RenderError::TooManyColorAttachments { .. } => {
                ErrorKind::UnsupportedFeature
            }
            RenderError::NoAttachments
            | RenderError::Incomplete { .. }
            | RenderError::NotBound
            | RenderError::AlreadyBound
            | RenderError::ReconfigureWhileBound
            | RenderError::ForeignContext => ErrorKind::InvalidState,
            RenderError::Backend(_) => ErrorKind::Backend,
        }
    }
}

impl From<String> for RenderError {
    fn from(msg: String) -> Self {
        RenderError::Backend(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_mismatch_includes_both_sizes() {
        let err = RenderError::DimensionMismatch {
            index: 1,
            expected_width: 128,
            expected_height: 64,
            found_width: 256,
            found_height: 32,
        };
        let msg = format!("{err}");
        assert!(msg.contains("128x64"), "missing expected size in: {msg}");
        assert!(msg.contains("256x32"), "missing found size in: {msg}");
        assert!(msg.contains("attachment 1"), "missing index in: {msg}");
    }

    #[test]
    fn incomplete_formats_status_as_hex() {
        let err = RenderError::Incomplete { status: 0x8CD6 };
        assert_eq!(err.to_string(), "framebuffer incomplete: status 0x8CD6");
    }

    #[test]
    fn unsupported_names_the_feature() {
        let msg = RenderError::Unsupported(Feature::DrawBuffers).to_string();
        assert!(msg.contains("draw buffers"), "missing feature in: {msg}");
    }

    #[test]
    fn kinds_group_variants() {
        assert_eq!(
            RenderError::CubemapNotAllowed { index: 0 }.kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            RenderError::UnknownTexture("gbuffer".into()).kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            RenderError::TooManyColorAttachments {
                requested: 9,
                max: 8
            }
            .kind(),
            ErrorKind::UnsupportedFeature
        );
        assert_eq!(
            RenderError::Unsupported(Feature::DepthTexture).kind(),
            ErrorKind::UnsupportedFeature
        );
        assert_eq!(RenderError::NotBound.kind(), ErrorKind::InvalidState);
        assert_eq!(
            RenderError::Incomplete { status: 0 }.kind(),
            ErrorKind::InvalidState
        );
        assert_eq!(
            RenderError::Backend("out of handles".into()).kind(),
            ErrorKind::Backend
        );
    }

    #[test]
    fn backend_strings_convert_into_backend_errors() {
        let err: RenderError = String::from("glCreateFramebuffer failed").into();
        assert_eq!(err.kind(), ErrorKind::Backend);
        assert!(err.to_string().contains("glCreateFramebuffer"));
    }

    #[test]
    fn render_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RenderError>();
    }

    #[test]
    fn render_error_implements_std_error() {
        fn assert_std_error<T: std::error::Error>() {}
        assert_std_error::<RenderError>();
    }
}
