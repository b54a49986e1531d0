mod diffuse;
mod gpu_check;
mod layouts;
mod uniforms;
mod viz;

pub mod shadow;

use std::path::PathBuf;

use thiserror::Error;

pub use diffuse::DiffuseTarget;
pub use layouts::BindGroupLayouts;
pub use shadow::{
    shadow_vertex_layout, ShadowDirection, ShadowResources, ShadowSettings, ShadowSlot,
    ShadowSlotPair,
};
pub use uniforms::PassUniforms;
pub use viz::{quad_vertices, QuadVertex, ShadowVizPass};

pub(crate) use gpu_check::{begin as begin_check, log_only as log_check};
pub(crate) use shadow::{shadow_matrices, ShaderSources};

/// Errors surfaced while setting up or reloading render resources.
///
/// Per-frame device errors are never returned; they are logged at their
/// checkpoint and the frame keeps going.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The device rejected resource or pipeline creation. The render targets
    /// cannot be used; the driver decides whether to abort or degrade.
    #[error("graphics validation failed at checkpoint `{checkpoint}`: {message}")]
    Validation {
        checkpoint: &'static str,
        message: String,
    },

    /// A shader source in the configured shader directory could not be read.
    #[error("failed to read shader `{path}`")]
    ShaderRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A scene object failed to rebuild its own shaders during reload.
    #[error("object shader reload failed")]
    Object(#[from] anyhow::Error),
}
