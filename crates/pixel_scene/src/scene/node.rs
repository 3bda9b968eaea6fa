//! Scene nodes
//!
//! A scene node is a positioned object inside exactly one container. Containers
//! (and cells, which are containers only visible through cell-portals) own an
//! ordered list of child nodes.

use bitflags::bitflags;

use crate::foundation::geometry::{Aabb, PlaneSet, Polygon};
use crate::foundation::math::{Mat4, Transform, Vec3};

/// Near plane distance of a spot light's view volume
const SPOT_NEAR_PLANE: f32 = 0.01;

slotmap::new_key_type! {
    /// Stable identifier of a scene node inside a [`SceneGraph`](super::SceneGraph)
    pub struct NodeId;
}

bitflags! {
    /// Scene node flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct NodeFlags: u32 {
        /// The node is currently not active (and therefore not visible)
        const INACTIVE       = 1 << 0;
        /// The node is currently not visible
        const INVISIBLE      = 1 << 1;
        /// The node is frozen and should not be updated
        const FROZEN         = 1 << 2;
        /// Keep updating while the scene is paused
        const NO_PAUSE       = 1 << 3;
        /// Created at runtime, not part of the authored scene
        const AUTOMATIC      = 1 << 4;
        /// Never frustum cull this node (its container may still be culled)
        const NO_CULLING     = 1 << 5;
        /// Lighting passes skip this node
        const NO_LIGHTING    = 1 << 6;
        /// The node can occlude other nodes
        const CAN_OCCLUDE    = 1 << 7;
        /// Shadow caster
        const CAST_SHADOW    = 1 << 8;
        /// Shadow receiver
        const RECEIVE_SHADOW = 1 << 9;
        /// Containers: do not recurse into the content
        const NO_RECURSION   = 1 << 10;
        /// Cell-portals: the target cell can not be seen through this portal
        const NO_SEE_THROUGH = 1 << 11;
    }
}

/// Mesh reference of a scene node
///
/// Meshes themselves live in the renderer; the scene only knows their name and
/// the material opacity render passes use to split opaque and transparent work.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshHandler {
    /// Mesh resource name
    pub mesh: String,
    /// Material opacity, `1.0` is fully opaque
    pub opacity: f32,
}

impl MeshHandler {
    /// Opaque mesh
    pub fn opaque(mesh: impl Into<String>) -> Self {
        Self { mesh: mesh.into(), opacity: 1.0 }
    }

    /// Mesh with a (possibly) transparent material
    pub fn with_opacity(mesh: impl Into<String>, opacity: f32) -> Self {
        Self { mesh: mesh.into(), opacity }
    }

    /// Whether the material is transparent
    pub fn is_transparent(&self) -> bool {
        self.opacity < 1.0
    }
}

/// Cell-portal: a window from the containing cell into a target cell
///
/// The polygon is given in portal space. Its normal (right-hand rule) has to
/// point away from the viewer looking through the portal; a camera in front
/// of the polygon plane looks at the back side and can not see through.
#[derive(Debug, Clone, PartialEq)]
pub struct CellPortal {
    /// Cell visible through this portal, `None` if not linked yet
    pub target_cell: Option<NodeId>,
    /// Portal polygon (portal space)
    pub polygon: Polygon,
}

/// Anti-portal: an occluder polygon hiding everything completely behind it
///
/// Only effective while the camera is behind the polygon plane.
#[derive(Debug, Clone, PartialEq)]
pub struct AntiPortal {
    /// Occluder polygon (node space)
    pub polygon: Polygon,
}

/// Shape of a light's influence
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    /// Infinitely far away, reaches everything
    Directional,
    /// Omnidirectional light reaching `range` units
    Point {
        /// Influence radius
        range: f32,
    },
    /// Cone of light shining down the local -Z axis
    Spot {
        /// Influence radius
        range: f32,
        /// Full opening angle of the cone in radians
        outer_angle: f32,
    },
}

/// Light source
///
/// Ranges are given in node space and are not scaled by the node transform.
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    /// Influence shape
    pub kind: LightKind,
    /// Linear RGB color
    pub color: Vec3,
}

impl Light {
    /// Point light
    pub fn point(color: Vec3, range: f32) -> Self {
        Self { kind: LightKind::Point { range }, color }
    }

    /// Spot light
    pub fn spot(color: Vec3, range: f32, outer_angle: f32) -> Self {
        Self { kind: LightKind::Spot { range, outer_angle }, color }
    }

    /// Directional light
    pub fn directional(color: Vec3) -> Self {
        Self { kind: LightKind::Directional, color }
    }

    /// Influence radius, `None` for directional lights
    pub fn range(&self) -> Option<f32> {
        match self.kind {
            LightKind::Directional => None,
            LightKind::Point { range } | LightKind::Spot { range, .. } => Some(range),
        }
    }

    /// Black lights and lights without range have no visible influence
    pub fn has_influence(&self) -> bool {
        self.color.iter().any(|&c| c > 0.0) && self.range().map_or(true, |range| range > 0.0)
    }

    /// Apex followed by the four far corners of the pyramid enclosing a spot cone
    pub fn spot_vertices(&self) -> Option<[Vec3; 5]> {
        let LightKind::Spot { range, outer_angle } = self.kind else {
            return None;
        };
        let half = range * (outer_angle * 0.5).tan();
        Some([
            Vec3::zeros(),
            Vec3::new(-half, -half, -range),
            Vec3::new(half, -half, -range),
            Vec3::new(half, half, -range),
            Vec3::new(-half, half, -range),
        ])
    }

    /// View volume of a spot light placed by `matrix`, in the space `matrix` maps into
    pub fn spot_frustum(&self, matrix: &Mat4) -> Option<PlaneSet> {
        let LightKind::Spot { range, outer_angle } = self.kind else {
            return None;
        };
        if range <= SPOT_NEAR_PLANE || outer_angle <= 0.0 || outer_angle >= std::f32::consts::PI {
            return None;
        }
        let projection = Mat4::new_perspective(1.0, outer_angle, SPOT_NEAR_PLANE, range);
        let view = matrix.try_inverse()?;
        Some(PlaneSet::from_view_projection(&(projection * view)))
    }

    /// Node space box enclosing the influence, `None` for directional lights
    pub fn bounds(&self) -> Option<Aabb> {
        match self.kind {
            LightKind::Directional => None,
            LightKind::Point { range } => Some(Aabb::from_center_extents(Vec3::zeros(), Vec3::repeat(range))),
            LightKind::Spot { .. } => self.spot_vertices().and_then(|vertices| Aabb::from_points(vertices.iter())),
        }
    }
}

/// What a scene node is
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Plain object
    Object,
    /// Container of other nodes
    Container,
    /// Container only visible through cell-portals while the camera is inside a cell
    Cell,
    /// Window into another cell
    CellPortal(CellPortal),
    /// Occluder polygon
    AntiPortal(AntiPortal),
    /// Light source
    Light(Light),
}

/// Node of the scene graph
#[derive(Debug, Clone)]
pub struct SceneNode {
    name: String,
    kind: NodeKind,
    transform: Transform,
    flags: NodeFlags,
    bounds: Aabb,
    mesh: Option<MeshHandler>,
    max_draw_distance: f32,
    protected: bool,
    pub(crate) container: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) pending_destroy: bool,
}

impl SceneNode {
    pub(crate) fn new(name: String, kind: NodeKind, container: Option<NodeId>) -> Self {
        let bounds = match &kind {
            NodeKind::CellPortal(portal) => portal.polygon.aabb(),
            NodeKind::AntiPortal(anti) => anti.polygon.aabb(),
            NodeKind::Light(light) => light.bounds(),
            _ => None,
        };
        Self {
            name,
            kind,
            transform: Transform::default(),
            flags: NodeFlags::empty(),
            bounds: bounds.unwrap_or_else(|| Aabb::point(Vec3::zeros())),
            mesh: None,
            max_draw_distance: 0.0,
            protected: false,
            container,
            children: Vec::new(),
            pending_destroy: false,
        }
    }

    /// Name, unique within the container
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name_unchecked(&mut self, name: String) {
        self.name = name;
    }

    /// What this node is
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Mutable access to the kind, e.g. to link a cell-portal
    pub fn kind_mut(&mut self) -> &mut NodeKind {
        &mut self.kind
    }

    /// Transform relative to the container
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Mutable transform
    pub fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }

    /// Replace the transform
    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
    }

    /// Container space from node space
    pub fn matrix(&self) -> Mat4 {
        self.transform.to_matrix()
    }

    /// Flags
    pub fn flags(&self) -> NodeFlags {
        self.flags
    }

    /// Replace the flags
    pub fn set_flags(&mut self, flags: NodeFlags) {
        self.flags = flags;
    }

    /// Set or clear some flags
    pub fn set_flag(&mut self, flag: NodeFlags, value: bool) {
        self.flags.set(flag, value);
    }

    /// Whether the node is active
    pub fn is_active(&self) -> bool {
        !self.flags.contains(NodeFlags::INACTIVE)
    }

    /// Activate or deactivate the node
    pub fn set_active(&mut self, active: bool) {
        self.flags.set(NodeFlags::INACTIVE, !active);
    }

    /// Whether the node can be seen in general (active and not invisible)
    pub fn is_visible(&self) -> bool {
        !self.flags.intersects(NodeFlags::INACTIVE | NodeFlags::INVISIBLE)
    }

    /// Show or hide the node
    pub fn set_visible(&mut self, visible: bool) {
        self.flags.set(NodeFlags::INVISIBLE, !visible);
    }

    /// Whether updates should leave this node alone
    pub fn is_frozen(&self) -> bool {
        self.flags.contains(NodeFlags::FROZEN)
    }

    /// Whether the node holds other nodes
    pub fn is_container(&self) -> bool {
        matches!(self.kind, NodeKind::Container | NodeKind::Cell)
    }

    /// Whether the node is a cell
    pub fn is_cell(&self) -> bool {
        matches!(self.kind, NodeKind::Cell)
    }

    /// Whether the node is a cell-portal or an anti-portal
    pub fn is_portal(&self) -> bool {
        matches!(self.kind, NodeKind::CellPortal(_) | NodeKind::AntiPortal(_))
    }

    /// Whether the node is a light source
    pub fn is_light(&self) -> bool {
        matches!(self.kind, NodeKind::Light(_))
    }

    /// Light data, if this is a light
    pub fn as_light(&self) -> Option<&Light> {
        match &self.kind {
            NodeKind::Light(light) => Some(light),
            _ => None,
        }
    }

    /// Cell-portal data, if this is a cell-portal
    pub fn as_cell_portal(&self) -> Option<&CellPortal> {
        match &self.kind {
            NodeKind::CellPortal(portal) => Some(portal),
            _ => None,
        }
    }

    /// Local (node space) bounding box; containers derive theirs from the children
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// Set the local bounding box
    pub fn set_bounds(&mut self, bounds: Aabb) {
        self.bounds = bounds;
    }

    /// Mesh handler, if the node has geometry
    pub fn mesh_handler(&self) -> Option<&MeshHandler> {
        self.mesh.as_ref()
    }

    /// Attach or remove a mesh handler
    pub fn set_mesh_handler(&mut self, mesh: Option<MeshHandler>) {
        self.mesh = mesh;
    }

    /// Maximum draw distance; `0` draws always, negative draws before other nodes
    pub fn max_draw_distance(&self) -> f32 {
        self.max_draw_distance
    }

    /// Set the maximum draw distance
    pub fn set_max_draw_distance(&mut self, distance: f32) {
        self.max_draw_distance = distance;
    }

    /// Whether `squared_distance` is beyond the maximum draw distance
    pub fn is_beyond_draw_distance(&self, squared_distance: f32) -> bool {
        self.max_draw_distance > 0.0
            && squared_distance > self.max_draw_distance * self.max_draw_distance
    }

    /// Protected nodes are only deleted on explicit request
    pub fn is_protected(&self) -> bool {
        self.protected
    }

    /// Protect or unprotect the node
    pub fn set_protected(&mut self, protected: bool) {
        self.protected = protected;
    }

    /// Container this node lives in, `None` for the root or a node awaiting cleanup
    pub fn container(&self) -> Option<NodeId> {
        self.container
    }

    /// Child nodes in insertion order (containers only)
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Whether the node was deleted and waits for the next cleanup
    pub fn is_destroying(&self) -> bool {
        self.pending_destroy
    }
}
