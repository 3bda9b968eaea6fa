//! Visibility records
//!
//! Per-frame snapshot of the visible part of the scene graph. Records are
//! created by the cull query only and are read-only for everybody else.

use crate::foundation::geometry::{PlaneSet, Rect};
use crate::foundation::math::{Mat4, Vec3};
use crate::scene::NodeId;

/// Projection of a visibility container
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    rectangle: Rect,
    z_near: f32,
    z_far: f32,
}

impl Projection {
    pub(crate) fn new(rectangle: Rect, z_near: f32, z_far: f32) -> Self {
        Self { rectangle, z_near, z_far }
    }

    /// Screen space scissor rectangle the content is visible through
    pub fn rectangle(&self) -> Rect {
        self.rectangle
    }

    /// Near clipping distance
    pub fn z_near(&self) -> f32 {
        self.z_near
    }

    /// Far clipping distance
    pub fn z_far(&self) -> f32 {
        self.z_far
    }
}

/// Cull query state a container was traversed with
///
/// Only present on containers that were traversed and have visible content.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerQuery {
    camera_position: Vec3,
    frustum: PlaneSet,
    camera_in_cell: bool,
}

impl ContainerQuery {
    pub(crate) fn new(camera_position: Vec3, frustum: PlaneSet, camera_in_cell: bool) -> Self {
        Self { camera_position, frustum, camera_in_cell }
    }

    /// Camera position in container space
    pub fn camera_position(&self) -> Vec3 {
        self.camera_position
    }

    /// View frustum (or portal view volume) in container space
    pub fn frustum(&self) -> &PlaneSet {
        &self.frustum
    }

    /// Whether the camera was inside a cell during the query
    pub fn is_camera_in_cell(&self) -> bool {
        self.camera_in_cell
    }
}

/// Visible container (or cell)
#[derive(Debug, Clone, PartialEq)]
pub struct VisContainer {
    scene_node: Option<NodeId>,
    world: Mat4,
    nodes: Vec<VisNode>,
    projection: Projection,
    query: Option<ContainerQuery>,
}

impl VisContainer {
    pub(crate) fn new(scene_node: Option<NodeId>, world: Mat4, projection: Projection) -> Self {
        Self { scene_node, world, nodes: Vec::new(), projection, query: None }
    }

    pub(crate) fn push(&mut self, node: VisNode) {
        self.nodes.push(node);
    }

    pub(crate) fn attach_query(&mut self, query: ContainerQuery) {
        self.query = Some(query);
    }

    /// Scene container this record represents
    pub fn scene_node(&self) -> Option<NodeId> {
        self.scene_node
    }

    /// Container space to world space
    pub fn world(&self) -> &Mat4 {
        &self.world
    }

    /// Visible children in build order (ascending camera distance)
    pub fn nodes(&self) -> &[VisNode] {
        &self.nodes
    }

    /// Projection, including the scissor rectangle
    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Query the container was traversed with; `None` means not visible
    pub fn cull_query(&self) -> Option<&ContainerQuery> {
        self.query.as_ref()
    }

    /// Whether the container has visible content
    pub fn is_visible(&self) -> bool {
        self.query.is_some()
    }

    /// Find the record of a scene node, descending into containers and portals
    pub fn find(&self, id: NodeId) -> Option<&VisNode> {
        for node in &self.nodes {
            if node.scene_node == Some(id) {
                return Some(node);
            }
            if let Some(found) = node.sub_container().and_then(|c| c.find(id)) {
                return Some(found);
            }
        }
        None
    }

    /// Find the record of a container or a cell reached through a portal
    pub fn find_container(&self, id: NodeId) -> Option<&VisContainer> {
        if self.scene_node == Some(id) {
            return Some(self);
        }
        self.nodes
            .iter()
            .filter_map(VisNode::sub_container)
            .find_map(|c| c.find_container(id))
    }

    /// Number of records in the whole tree, this container excluded
    pub fn count(&self) -> usize {
        self.nodes
            .iter()
            .map(|node| 1 + node.sub_container().map_or(0, VisContainer::count))
            .sum()
    }
}

/// Portal record
#[derive(Debug, Clone, PartialEq)]
pub struct VisPortal {
    target: Option<Box<VisContainer>>,
}

impl VisPortal {
    pub(crate) fn new(target: Option<VisContainer>) -> Self {
        Self { target: target.map(Box::new) }
    }

    /// Cell visible through the portal
    ///
    /// `None` means nothing behind this portal is visible, e.g. because the
    /// target cell was already reached another way.
    pub fn target_vis_container(&self) -> Option<&VisContainer> {
        self.target.as_deref()
    }
}

/// What a visibility record represents
#[derive(Debug, Clone, PartialEq)]
pub enum VisKind {
    /// Plain object
    Leaf,
    /// Container with its own visible content
    Container(Box<VisContainer>),
    /// Cell-portal
    Portal(VisPortal),
}

/// Visibility record of one scene node
#[derive(Debug, Clone, PartialEq)]
pub struct VisNode {
    scene_node: Option<NodeId>,
    world: Mat4,
    squared_distance: f32,
    kind: VisKind,
}

impl VisNode {
    pub(crate) fn new(scene_node: NodeId, world: Mat4, squared_distance: f32, kind: VisKind) -> Self {
        Self { scene_node: Some(scene_node), world, squared_distance, kind }
    }

    /// Scene node this record represents
    pub fn scene_node(&self) -> Option<NodeId> {
        self.scene_node
    }

    /// Node space to world space, fixed for the frame
    pub fn world(&self) -> &Mat4 {
        &self.world
    }

    /// Squared distance to the camera at build time
    pub fn squared_distance(&self) -> f32 {
        self.squared_distance
    }

    /// Leaf, container or portal
    pub fn kind(&self) -> &VisKind {
        &self.kind
    }

    /// Whether this is a container record
    pub fn is_container(&self) -> bool {
        matches!(self.kind, VisKind::Container(_))
    }

    /// Whether this is a portal record
    pub fn is_portal(&self) -> bool {
        matches!(self.kind, VisKind::Portal(_))
    }

    /// Container record
    pub fn as_container(&self) -> Option<&VisContainer> {
        match &self.kind {
            VisKind::Container(container) => Some(container),
            _ => None,
        }
    }

    /// Portal record
    pub fn as_portal(&self) -> Option<&VisPortal> {
        match &self.kind {
            VisKind::Portal(portal) => Some(portal),
            _ => None,
        }
    }

    /// Container below this record: the container itself or the portal target
    pub fn sub_container(&self) -> Option<&VisContainer> {
        match &self.kind {
            VisKind::Leaf => None,
            VisKind::Container(container) => Some(container),
            VisKind::Portal(portal) => portal.target_vis_container(),
        }
    }
}
