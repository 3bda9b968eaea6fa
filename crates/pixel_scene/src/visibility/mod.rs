//! Visibility determination
//!
//! [`CullQuery`] walks the scene graph once per frame and camera and builds a
//! tree of [`VisContainer`]s holding only what passed culling. Render passes
//! consume that tree; it is rebuilt from scratch every frame.

mod vis_node;
mod cull;

pub use vis_node::{ContainerQuery, Projection, VisContainer, VisKind, VisNode, VisPortal};
pub use cull::{CullCallback, CullQuery, CullStatistics};
