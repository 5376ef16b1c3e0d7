//! CLI failures and the exit code each one maps to.
//!
//! | code | meaning |
//! |------|---------|
//! | 0    | success |
//! | 2    | bad arguments (reported by clap) |
//! | 10   | the render target rejected a pass |
//! | 11   | the plan file could not be read |
//! | 12   | the plan file is not a valid plan |
//! | 13   | output could not be serialized |

use std::path::PathBuf;

use fbo_core::RenderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Target(#[from] RenderError),

    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid plan {}: {source}", path.display())]
    Plan {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot serialize output: {0}")]
    Output(#[from] serde_json::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Target(_) => 10,
            CliError::Io { .. } => 11,
            CliError::Plan { .. } => 12,
            CliError::Output(_) => 13,
        }
    }
}
