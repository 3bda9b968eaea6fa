//! Scene management system
//!
//! Provides the scene-node tree the visibility system works on, the camera
//! collaborator and the [`SceneContext`] owning process/touch bookkeeping,
//! deferred deletion and the per-frame update tick.
//!
//! ## Architecture
//!
//! ```text
//! SceneContext
//!   ├─ SceneGraph      (arena of SceneNodes, root container "Root")
//!   ├─ ProcessTracker  (process counter + touched side table)
//!   ├─ delete queue    (reaped by cleanup())
//!   └─ EventUpdate     (per-frame broadcast)
//! ```

mod node;
mod graph;
mod camera;
mod context;

pub use node::{AntiPortal, CellPortal, Light, LightKind, MeshHandler, NodeFlags, NodeId, NodeKind, SceneNode};
pub use graph::{SceneError, SceneGraph, ROOT_NAME};
pub use camera::Camera;
pub use context::{ProcessTracker, SceneContext};
