//! Rendering of the visibility tree
//!
//! The core never talks to a graphics API. It walks the visibility tree built
//! by the cull query and hands draw calls and scissor rectangles to a
//! [`Renderer`] implementation. Render passes decide which nodes they draw and
//! in which order.

pub mod renderer;
pub mod traversal;
pub mod passes;

pub use renderer::{DrawCall, FillMode, RecordingRenderer, RenderCommand, Renderer};
pub use traversal::{draw_rec, DrawOrder, ScenePass};
pub use passes::{DebugWireframePass, LightingFlags, LightingPass, MeshPass, MeshPassFlags};

/// Errors reported by renderers and render passes
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// The renderer does not know the mesh of a node
    #[error("Mesh not found: {0}")]
    MeshNotFound(String),

    /// A rendering operation failed during execution
    #[error("Rendering failed: {0}")]
    RenderingFailed(String),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
