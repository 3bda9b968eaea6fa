//! Scene render passes

use bitflags::bitflags;

use crate::foundation::geometry::{Aabb, PlaneSet};
use crate::foundation::math::{translation, Mat4, Vec3};
use crate::scene::{Light, NodeFlags, NodeId, SceneGraph, SceneNode};
use crate::visibility::{VisContainer, VisNode};

use super::{draw_rec, DrawCall, DrawOrder, FillMode, RenderResult, Renderer, ScenePass};

bitflags! {
    /// Mesh pass flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MeshPassFlags: u32 {
        /// Draw transparent meshes (back to front) instead of opaque ones (front to back)
        const TRANSPARENT          = 1 << 0;
        /// Draw nodes beyond their maximum draw distance too
        const IGNORE_DRAW_DISTANCE = 1 << 1;
    }
}

bitflags! {
    /// Lighting pass flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct LightingFlags: u32 {
        /// Light spot light receivers by range only, without the cone test
        const NO_SPOT_CONE         = 1 << 0;
        /// Light nodes beyond their maximum draw distance too
        const IGNORE_DRAW_DISTANCE = 1 << 1;
    }
}

/// Unlit mesh pass
///
/// Opaque meshes are drawn front to back, transparent ones back to front over
/// the same visibility tree.
#[derive(Debug, Clone, Default)]
pub struct MeshPass {
    flags: MeshPassFlags,
    drawn: usize,
}

impl MeshPass {
    /// Create a pass
    pub fn new(flags: MeshPassFlags) -> Self {
        Self { flags, drawn: 0 }
    }

    /// Opaque pass
    pub fn opaque() -> Self {
        Self::new(MeshPassFlags::empty())
    }

    /// Transparent pass
    pub fn transparent() -> Self {
        Self::new(MeshPassFlags::TRANSPARENT)
    }

    /// Flags
    pub fn flags(&self) -> MeshPassFlags {
        self.flags
    }

    /// Meshes drawn since creation
    pub fn drawn(&self) -> usize {
        self.drawn
    }
}

impl ScenePass for MeshPass {
    fn name(&self) -> &str {
        if self.flags.contains(MeshPassFlags::TRANSPARENT) {
            "meshes (transparent)"
        } else {
            "meshes (opaque)"
        }
    }

    fn draw_order(&self) -> DrawOrder {
        if self.flags.contains(MeshPassFlags::TRANSPARENT) {
            DrawOrder::BackToFront
        } else {
            DrawOrder::FrontToBack
        }
    }

    fn accepts(&self, node: &SceneNode) -> bool {
        let transparent = self.flags.contains(MeshPassFlags::TRANSPARENT);
        node.mesh_handler().is_some_and(|mesh| mesh.is_transparent() == transparent)
    }

    fn respects_max_draw_distance(&self) -> bool {
        !self.flags.contains(MeshPassFlags::IGNORE_DRAW_DISTANCE)
    }

    fn draw_node(&mut self, renderer: &mut dyn Renderer, node: &SceneNode, vis: &VisNode) -> RenderResult<()> {
        let (Some(mesh), Some(id)) = (node.mesh_handler(), vis.scene_node()) else {
            return Ok(());
        };
        renderer.draw(&DrawCall {
            node: id,
            mesh: mesh.mesh.clone(),
            world: *vis.world(),
            fill: FillMode::Solid,
            opacity: mesh.opacity,
            squared_distance: vis.squared_distance(),
            light: None,
        })?;
        self.drawn += 1;
        Ok(())
    }
}

/// World space influence of one light
#[derive(Debug, Clone)]
struct LightVolume {
    id: NodeId,
    center: Vec3,
    range: Option<f32>,
    bounds: Option<Aabb>,
    cone: Option<PlaneSet>,
}

impl LightVolume {
    fn new(id: NodeId, light: &Light, world: &Mat4, flags: LightingFlags) -> Self {
        let cone = if flags.contains(LightingFlags::NO_SPOT_CONE) {
            None
        } else {
            light.spot_frustum(world)
        };
        Self {
            id,
            center: translation(world),
            range: light.range(),
            bounds: light.bounds().map(|bounds| bounds.transformed(world)),
            cone,
        }
    }

    /// Whether the light reaches a world space box
    fn reaches(&self, aabb: &Aabb) -> bool {
        let Some(range) = self.range else {
            return true;
        };
        self.bounds.map_or(true, |bounds| bounds.intersects(aabb))
            && aabb.intersects_sphere(self.center, range)
            && self.cone.as_ref().map_or(true, |cone| cone.intersects_aabb(aabb).is_some())
    }
}

/// Nested walk drawing the meshes one light reaches
struct LitMeshes<'l> {
    volume: &'l LightVolume,
    flags: LightingFlags,
    drawn: usize,
}

impl ScenePass for LitMeshes<'_> {
    fn name(&self) -> &str {
        "lighting (per light)"
    }

    fn accepts(&self, node: &SceneNode) -> bool {
        !node.is_light()
            && !node.flags().contains(NodeFlags::NO_LIGHTING)
            && node.mesh_handler().is_some_and(|mesh| !mesh.is_transparent())
    }

    fn descends(&self, node: &SceneNode) -> bool {
        !node.flags().contains(NodeFlags::NO_LIGHTING)
    }

    fn respects_max_draw_distance(&self) -> bool {
        !self.flags.contains(LightingFlags::IGNORE_DRAW_DISTANCE)
    }

    fn draw_node(&mut self, renderer: &mut dyn Renderer, node: &SceneNode, vis: &VisNode) -> RenderResult<()> {
        let (Some(mesh), Some(id)) = (node.mesh_handler(), vis.scene_node()) else {
            return Ok(());
        };
        if !self.volume.reaches(&node.bounds().transformed(vis.world())) {
            return Ok(());
        }
        renderer.draw(&DrawCall {
            node: id,
            mesh: mesh.mesh.clone(),
            world: *vis.world(),
            fill: FillMode::Solid,
            opacity: mesh.opacity,
            squared_distance: vis.squared_distance(),
            light: Some(self.volume.id),
        })?;
        self.drawn += 1;
        Ok(())
    }
}

/// Additive per-light pass
///
/// Every visible light starts a nested walk over the container it was found
/// in, following portals into the cells visible from there, and draws the
/// opaque meshes within its range (and spot cone). Scissor rectangles are
/// restored after every portal just like in the outer walk. Black lights,
/// the ignored light and containers flagged `NO_LIGHTING` are skipped.
#[derive(Debug, Clone, Default)]
pub struct LightingPass {
    flags: LightingFlags,
    ignored_light: Option<NodeId>,
    lights: usize,
    drawn: usize,
}

impl LightingPass {
    /// Create a pass
    pub fn new(flags: LightingFlags) -> Self {
        Self { flags, ..Self::default() }
    }

    /// Flags
    pub fn flags(&self) -> LightingFlags {
        self.flags
    }

    /// Light left out by this pass, e.g. one handled by another pass
    pub fn ignored_light(&self) -> Option<NodeId> {
        self.ignored_light
    }

    /// Set the light left out by this pass
    pub fn set_ignored_light(&mut self, light: Option<NodeId>) {
        self.ignored_light = light;
    }

    /// Lights rendered since creation
    pub fn lights(&self) -> usize {
        self.lights
    }

    /// Lit meshes drawn since creation
    pub fn drawn(&self) -> usize {
        self.drawn
    }
}

impl ScenePass for LightingPass {
    fn name(&self) -> &str {
        "lighting"
    }

    // Meshes are only drawn from the per-light walks
    fn accepts(&self, _node: &SceneNode) -> bool {
        false
    }

    fn draw_node(&mut self, _renderer: &mut dyn Renderer, _node: &SceneNode, _vis: &VisNode) -> RenderResult<()> {
        Ok(())
    }

    fn draw_light(
        &mut self,
        renderer: &mut dyn Renderer,
        graph: &SceneGraph,
        container: &VisContainer,
        node: &SceneNode,
        vis: &VisNode,
    ) -> RenderResult<()> {
        let (Some(light), Some(id)) = (node.as_light(), vis.scene_node()) else {
            return Ok(());
        };
        if self.ignored_light == Some(id) || !light.has_influence() {
            return Ok(());
        }
        let unlit = container
            .scene_node()
            .and_then(|container| graph.get(container))
            .is_some_and(|container| container.flags().contains(NodeFlags::NO_LIGHTING));
        if unlit {
            return Ok(());
        }

        let volume = LightVolume::new(id, light, vis.world(), self.flags);
        let mut lit = LitMeshes { volume: &volume, flags: self.flags, drawn: 0 };
        draw_rec(&mut lit, renderer, graph, container)?;
        log::trace!("Light '{}' reached {} meshes", node.name(), lit.drawn);
        self.lights += 1;
        self.drawn += lit.drawn;
        Ok(())
    }
}

/// Wireframe overlay of every visible mesh
#[derive(Debug, Clone)]
pub struct DebugWireframePass {
    opacity: f32,
}

impl Default for DebugWireframePass {
    fn default() -> Self {
        Self { opacity: 1.0 }
    }
}

impl DebugWireframePass {
    /// Create a pass drawing lines with the given opacity
    pub fn new(opacity: f32) -> Self {
        Self { opacity }
    }
}

impl ScenePass for DebugWireframePass {
    fn name(&self) -> &str {
        "debug wireframes"
    }

    fn accepts(&self, node: &SceneNode) -> bool {
        node.mesh_handler().is_some()
    }

    fn draw_node(&mut self, renderer: &mut dyn Renderer, node: &SceneNode, vis: &VisNode) -> RenderResult<()> {
        let (Some(mesh), Some(id)) = (node.mesh_handler(), vis.scene_node()) else {
            return Ok(());
        };
        renderer.draw(&DrawCall {
            node: id,
            mesh: mesh.mesh.clone(),
            world: *vis.world(),
            fill: FillMode::Wireframe,
            opacity: self.opacity,
            squared_distance: vis.squared_distance(),
            light: None,
        })
    }
}
