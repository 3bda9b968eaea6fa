//! # Pixel Scene
//!
//! Scene-graph visibility determination and render-pass traversal.
//!
//! ## Features
//!
//! - **Scene Graph**: Arena of containers, cells, portals and objects
//! - **Cells and Portals**: Cells are only visible through the portals leading into them
//! - **Culling**: Frustum, portal and anti-portal culling with per-node draw distances
//! - **Lights**: Range culled lights, each lighting what it reaches through the visible portals
//! - **Process Tracking**: Every node is visited at most once per traversal, even in cyclic portal graphs
//! - **Render Passes**: Front-to-back and back-to-front traversal with scissor rectangle handling
//!
//! ## Quick Start
//!
//! ```rust
//! use pixel_scene::prelude::*;
//!
//! let mut context = SceneContext::new();
//! let root = context.root();
//! let cube = context.graph_mut().create_node(root, "Cube", NodeKind::Object).unwrap();
//! context.graph_mut().get_mut(cube).unwrap().set_mesh_handler(Some(MeshHandler::opaque("cube")));
//!
//! let viewport = Rect::from_xywh(0.0, 0.0, 800.0, 600.0);
//! let camera = Camera::look_at(
//!     Vec3::new(0.0, 0.0, -5.0),
//!     Vec3::zeros(),
//!     std::f32::consts::FRAC_PI_2,
//!     800.0 / 600.0,
//!     0.1,
//!     100.0,
//! );
//! let mut query = CullQuery::new(root, camera, CullConfig::default());
//! assert!(query.perform(&mut context, viewport));
//!
//! let mut renderer = RecordingRenderer::new(viewport);
//! let visible = query.visible_container().unwrap();
//! draw_rec(&mut MeshPass::opaque(), &mut renderer, context.graph(), visible).unwrap();
//! assert_eq!(renderer.drawn_meshes(), vec!["cube"]);
//!
//! context.cleanup();
//! ```

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod foundation;
pub mod config;
pub mod events;
pub mod scene;
pub mod visibility;
pub mod render;

#[cfg(test)]
mod tests;

/// Common imports for scene users
pub mod prelude {
    pub use crate::{
        config::{Config, CullConfig, CullMode, SceneConfig},
        events::{UpdateEvent, UpdateListener},
        foundation::{
            geometry::{Aabb, Plane, PlaneSet, Polygon, Rect},
            math::{Mat4, Transform, Vec3},
        },
        render::{
            draw_rec, DebugWireframePass, LightingPass, MeshPass, RecordingRenderer, Renderer, ScenePass,
        },
        scene::{
            AntiPortal, Camera, CellPortal, Light, LightKind, MeshHandler, NodeFlags, NodeId, NodeKind,
            SceneContext, SceneGraph, SceneNode,
        },
        visibility::{CullQuery, VisContainer, VisKind, VisNode},
    };
}
