//! Visibility query
//!
//! Frustum and portal culling of a scene container for one camera. Cells are
//! only entered through visible cell-portals, narrowing the view volume at
//! every portal, and every node is visited at most once per query thanks to
//! the scene context's touch bookkeeping. That also makes cyclic portal graphs
//! terminate.

use std::ops::ControlFlow;
use std::time::Duration;

use crate::config::{CullConfig, CullMode};
use crate::foundation::geometry::{Aabb, PlaneSet, Polygon, Rect, Side};
use crate::foundation::math::{transform_point, translation, Mat4, Vec3};
use crate::foundation::time::Stopwatch;
use crate::scene::{
    Camera, Light, LightKind, NodeFlags, NodeId, NodeKind, ProcessTracker, SceneContext, SceneGraph, SceneNode,
};

use super::vis_node::{ContainerQuery, Projection, VisContainer, VisKind, VisNode, VisPortal};

/// Called for every node accepted by the query, `Break` cancels the query
pub type CullCallback<'a> = dyn FnMut(NodeId, &SceneNode) -> ControlFlow<()> + 'a;

/// Counters of the last query
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CullStatistics {
    /// Time spent in the query
    pub cull_time: Duration,
    /// Containers (and cells) whose content was tested
    pub traversed_containers: usize,
    /// Cells entered through a portal
    pub portal_cells: usize,
    /// Nodes outside the view volume
    pub frustum_culled: usize,
    /// Nodes beyond their maximum draw distance
    pub distance_culled: usize,
    /// Nodes hidden behind an anti-portal
    pub anti_portal_culled: usize,
    /// Cell-portals seen from behind
    pub backfacing_portals: usize,
    /// Nodes accepted without a visibility test (`NO_CULLING`)
    pub skipped_tests: usize,
    /// Records in the resulting tree
    pub visible_nodes: usize,
}

/// Visibility query (the cull query) of one scene container
#[derive(Debug)]
pub struct CullQuery {
    container: NodeId,
    camera: Camera,
    camera_container: Option<NodeId>,
    config: CullConfig,
    visible: Option<VisContainer>,
    statistics: CullStatistics,
    frame: u64,
}

impl CullQuery {
    /// Create a query culling `container` as seen by `camera`
    pub fn new(container: NodeId, camera: Camera, config: CullConfig) -> Self {
        Self {
            container,
            camera,
            camera_container: None,
            config,
            visible: None,
            statistics: CullStatistics::default(),
            frame: 0,
        }
    }

    /// Scene container this query culls
    pub fn container(&self) -> NodeId {
        self.container
    }

    /// Camera, in the space of the query container's parent (world space for the root)
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Replace the camera
    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
    }

    /// Container the camera is in, if known
    pub fn camera_container(&self) -> Option<NodeId> {
        self.camera_container
    }

    /// Tell the query which container (usually a cell) the camera is in
    ///
    /// While the camera is inside a cell other cells are only visible through
    /// cell-portals.
    pub fn set_camera_container(&mut self, container: Option<NodeId>) {
        self.camera_container = container;
    }

    /// Query configuration
    pub fn config(&self) -> &CullConfig {
        &self.config
    }

    /// Mutable query configuration
    pub fn config_mut(&mut self) -> &mut CullConfig {
        &mut self.config
    }

    /// Result of the last query
    pub fn visible_container(&self) -> Option<&VisContainer> {
        self.visible.as_ref()
    }

    /// Statistics of the last query
    pub fn statistics(&self) -> &CullStatistics {
        &self.statistics
    }

    /// Number of performed queries
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Perform the query, see [`perform_with`](Self::perform_with)
    pub fn perform(&mut self, context: &mut SceneContext, viewport: Rect) -> bool {
        self.perform_with(context, viewport, &mut |_: NodeId, _: &SceneNode| ControlFlow::Continue(()))
    }

    /// Perform the query and rebuild the visibility tree
    ///
    /// Starts a process on the context unless one is already active (nested
    /// queries share the process of the outer one) and only ends it if it
    /// started it. Returns false if the query was cancelled by the callback
    /// or the container does not exist; the tree built so far is kept.
    pub fn perform_with(
        &mut self,
        context: &mut SceneContext,
        viewport: Rect,
        callback: &mut CullCallback<'_>,
    ) -> bool {
        if self.config.mode == CullMode::Previous && self.visible.is_some() {
            return true;
        }

        let stopwatch = Stopwatch::start_new();
        self.statistics = CullStatistics::default();
        self.visible = None;

        let started = context.start_process();
        let (graph, tracker) = context.split_for_traversal();
        let completed = self.cull(graph, tracker, viewport, callback);
        if started {
            tracker.end_process();
        }

        self.frame += 1;
        self.statistics.visible_nodes = self.visible.as_ref().map_or(0, VisContainer::count);
        self.statistics.cull_time = stopwatch.elapsed();
        log::trace!("Cull query {} finished: {:?}", self.frame, self.statistics);
        completed
    }

    fn cull(
        &mut self,
        graph: &SceneGraph,
        tracker: &mut ProcessTracker,
        viewport: Rect,
        callback: &mut CullCallback<'_>,
    ) -> bool {
        let Some(root) = graph.get(self.container) else {
            return false;
        };
        if !root.is_container() {
            return false;
        }

        // Move camera and frustum from world space into the query container
        let world = graph.world_matrix(self.container);
        let Some(inverse) = world.try_inverse() else {
            return false;
        };
        let Some(frustum) = self.camera.frustum().transformed(&inverse) else {
            return false;
        };

        let camera_path = self.camera_path(graph);
        let mut culler = Culler {
            graph,
            tracker,
            config: &self.config,
            viewport,
            view_projection: self.camera.view_projection(),
            camera_world: self.camera.position,
            z_near: self.camera.near,
            z_far: self.camera.far,
            camera_container: if camera_path.is_some() { self.camera_container } else { None },
            statistics: &mut self.statistics,
            callback,
            cancelled: false,
        };
        culler.tracker.touch_node(self.container);

        let frame = Frame {
            container: self.container,
            world,
            camera: transform_point(&inverse, &self.camera.position),
            frustum,
            rectangle: viewport,
        };
        let visible = match camera_path {
            Some(path) if !path.is_empty() => culler.cull_camera_path(frame, &path),
            _ => culler.cull_container(frame),
        };
        let completed = !culler.cancelled;
        self.visible = Some(visible);
        completed
    }

    /// Containers below the query container down to the camera cell
    ///
    /// `None` if the camera is not inside a cell of this container.
    fn camera_path(&self, graph: &SceneGraph) -> Option<Vec<NodeId>> {
        let camera_container = self.camera_container?;
        if !graph.get(camera_container)?.is_cell() {
            return None;
        }
        if camera_container == self.container {
            return Some(Vec::new());
        }
        graph.path_from(self.container, camera_container)
    }
}

/// Container currently culled, in its own space
struct Frame {
    container: NodeId,
    world: Mat4,
    camera: Vec3,
    frustum: PlaneSet,
    rectangle: Rect,
}

/// Node that passed all tests
struct Candidate {
    id: NodeId,
    world: Mat4,
    squared_distance: f32,
    key: f32,
}

struct Culler<'a, 'c> {
    graph: &'a SceneGraph,
    tracker: &'a mut ProcessTracker,
    config: &'a CullConfig,
    viewport: Rect,
    view_projection: Mat4,
    camera_world: Vec3,
    z_near: f32,
    z_far: f32,
    camera_container: Option<NodeId>,
    statistics: &'a mut CullStatistics,
    callback: &'a mut CullCallback<'c>,
    cancelled: bool,
}

impl<'a, 'c> Culler<'a, 'c> {
    fn camera_in_cell(&self) -> bool {
        self.camera_container.is_some()
    }

    fn vis_container(&self, frame: &Frame) -> VisContainer {
        VisContainer::new(
            Some(frame.container),
            frame.world,
            Projection::new(frame.rectangle, self.z_near, self.z_far),
        )
    }

    fn query(&self, frame: Frame) -> ContainerQuery {
        ContainerQuery::new(frame.camera, frame.frustum, self.camera_in_cell())
    }

    /// Descend straight into the cell the camera is in
    fn cull_camera_path(&mut self, frame: Frame, path: &[NodeId]) -> VisContainer {
        self.statistics.traversed_containers += 1;
        let graph = self.graph;
        let mut visible = self.vis_container(&frame);
        let Some(&child) = path.first() else {
            return visible;
        };
        let Some(node) = graph.get(child) else {
            return visible;
        };
        if !self.tracker.touch_node(child) {
            return visible;
        }
        if (self.callback)(child, node).is_break() {
            self.cancelled = true;
            return visible;
        }

        let world = frame.world * node.matrix();
        let squared_distance = (translation(&world) - self.camera_world).norm_squared();
        let content = match self.enter_container(&frame, child, node, world) {
            Some(sub) if path.len() > 1 => self.cull_camera_path(sub, &path[1..]),
            Some(sub) => self.cull_container(sub),
            None => return visible,
        };
        visible.push(VisNode::new(
            child,
            world,
            squared_distance,
            VisKind::Container(Box::new(content)),
        ));
        visible.attach_query(self.query(frame));
        visible
    }

    /// Cull the content of one container
    fn cull_container(&mut self, frame: Frame) -> VisContainer {
        self.statistics.traversed_containers += 1;
        let graph = self.graph;
        let mut visible = self.vis_container(&frame);

        let anti_portals = self.anti_portal_volumes(&frame);
        let mut candidates = Vec::new();
        for &child in graph.children(frame.container) {
            if self.cancelled {
                break;
            }
            let Some(node) = graph.get(child) else {
                continue;
            };
            if let Some(candidate) = self.test_node(&frame, &anti_portals, child, node) {
                if !self.tracker.touch_node(child) {
                    continue;
                }
                if (self.callback)(child, node).is_break() {
                    self.cancelled = true;
                }
                candidates.push(candidate);
            }
        }

        // Nearest first; negative maximum draw distances come before everything else
        candidates.sort_by(|a, b| a.key.total_cmp(&b.key));

        for candidate in candidates {
            let Some(node) = graph.get(candidate.id) else {
                continue;
            };
            let kind = match node.kind() {
                NodeKind::Container | NodeKind::Cell => {
                    VisKind::Container(Box::new(self.cull_sub_container(&frame, candidate.id, node, candidate.world)))
                }
                NodeKind::CellPortal(portal) => {
                    match self.cull_portal(&frame, node, &portal.polygon, portal.target_cell, candidate.world) {
                        Some(target) => VisKind::Portal(VisPortal::new(target)),
                        None => continue,
                    }
                }
                NodeKind::Object | NodeKind::AntiPortal(_) | NodeKind::Light(_) => VisKind::Leaf,
            };
            visible.push(VisNode::new(candidate.id, candidate.world, candidate.squared_distance, kind));
        }

        if !visible.nodes().is_empty() {
            visible.attach_query(self.query(frame));
        }
        visible
    }

    /// Visibility tests of one child, returns `None` if the child is culled
    fn test_node(
        &mut self,
        frame: &Frame,
        anti_portals: &[PlaneSet],
        id: NodeId,
        node: &SceneNode,
    ) -> Option<Candidate> {
        if !node.is_visible() || node.is_destroying() {
            return None;
        }
        // Other cells can only be seen through portals
        if node.is_cell() && !self.leads_to_camera(id) {
            return None;
        }
        if self.tracker.is_node_touched(id) {
            return None;
        }

        let world = frame.world * node.matrix();
        let squared_distance = (translation(&world) - self.camera_world).norm_squared();
        if self.config.respect_max_draw_distance && node.is_beyond_draw_distance(squared_distance) {
            self.statistics.distance_culled += 1;
            return None;
        }

        if let NodeKind::CellPortal(portal) = node.kind() {
            if self.camera_in_cell() && Some(frame.container) != self.camera_container {
                let camera = node.transform().inverse_matrix().map(|m| transform_point(&m, &frame.camera));
                let in_front = match (camera, portal.polygon.plane()) {
                    (Some(camera), Some(plane)) => plane.side(camera) == Side::InFront,
                    _ => false,
                };
                if in_front {
                    self.statistics.backfacing_portals += 1;
                    return None;
                }
            }
        }

        if node.flags().contains(NodeFlags::NO_CULLING) {
            self.statistics.skipped_tests += 1;
        } else {
            let aabb = self.graph.container_aabb(id)?;
            let inside = match node.as_light() {
                Some(light) => light_in_view(&frame.frustum, light, &node.matrix(), &aabb),
                None => frame.frustum.intersects_aabb(&aabb).is_some(),
            };
            if !inside {
                self.statistics.frustum_culled += 1;
                return None;
            }
            let occluded = !matches!(node.kind(), NodeKind::AntiPortal(_))
                && anti_portals.iter().any(|volume| volume.intersects_aabb(&aabb) == Some(0));
            if occluded {
                self.statistics.anti_portal_culled += 1;
                return None;
            }
        }

        let key = if node.max_draw_distance() < 0.0 {
            -(node.max_draw_distance() * node.max_draw_distance())
        } else {
            squared_distance
        };
        Some(Candidate { id, world, squared_distance, key })
    }

    /// Whether `id` is the camera cell or one of its containers
    fn leads_to_camera(&self, id: NodeId) -> bool {
        match self.camera_container {
            Some(camera) => id == camera || self.graph.is_ancestor(id, camera),
            None => true,
        }
    }

    /// Occlusion volumes of the visible anti-portals of a container
    fn anti_portal_volumes(&self, frame: &Frame) -> Vec<PlaneSet> {
        self.graph
            .children(frame.container)
            .iter()
            .filter_map(|&child| self.graph.get(child))
            .filter(|node| node.is_visible())
            .filter_map(|node| match node.kind() {
                NodeKind::AntiPortal(anti) => Some(anti.polygon.transformed(&node.matrix())),
                _ => None,
            })
            .filter(|polygon| {
                // Seen from the front nothing is hidden
                polygon.plane().is_some_and(|plane| plane.side(frame.camera) == Side::Behind)
            })
            .filter_map(|polygon| PlaneSet::create_view_planes(polygon.vertices(), &frame.camera))
            .collect()
    }

    /// Query state of a child container
    fn enter_container(&self, frame: &Frame, id: NodeId, node: &SceneNode, world: Mat4) -> Option<Frame> {
        let inverse = node.transform().inverse_matrix()?;
        Some(Frame {
            container: id,
            world,
            camera: transform_point(&inverse, &frame.camera),
            frustum: frame.frustum.transformed(&inverse)?,
            rectangle: frame.rectangle,
        })
    }

    fn cull_sub_container(&mut self, frame: &Frame, id: NodeId, node: &SceneNode, world: Mat4) -> VisContainer {
        if !node.flags().contains(NodeFlags::NO_RECURSION) && !self.cancelled {
            if let Some(sub) = self.enter_container(frame, id, node, world) {
                return self.cull_container(sub);
            }
        }
        VisContainer::new(Some(id), world, Projection::new(frame.rectangle, self.z_near, self.z_far))
    }

    /// Cull the cell behind a portal
    ///
    /// Returns `None` if the portal itself turned out to be invisible,
    /// `Some(None)` for a visible portal without visible target.
    fn cull_portal(
        &mut self,
        frame: &Frame,
        node: &SceneNode,
        polygon: &Polygon,
        target_cell: Option<NodeId>,
        world: Mat4,
    ) -> Option<Option<VisContainer>> {
        // Hidden or deleted cells are not entered, the portal itself stays visible
        let graph = self.graph;
        let Some(target) = target_cell
            .filter(|&t| graph.get(t).is_some_and(|cell| cell.is_visible() && !cell.is_destroying()))
        else {
            return Some(None);
        };
        if node.flags().contains(NodeFlags::NO_SEE_THROUGH) || polygon.len() < 3 || self.cancelled {
            return Some(None);
        }

        // Scissor rectangle of the portal
        let rectangle = Rect::screen_rectangle(polygon.vertices(), &(self.view_projection * world), &self.viewport)
            .clip_by(&frame.rectangle);
        if rectangle.is_empty() {
            return None;
        }
        let rectangle = rectangle.expand(self.config.portal_rect_expansion).clip_by(&self.viewport);

        // Visible part of the portal polygon
        let local = polygon.transformed(&node.matrix());
        if let Some(near) = frame.frustum.planes().get(PlaneSet::NEAR) {
            if local.is_behind(near) {
                return None;
            }
        }
        let clipped = frame
            .frustum
            .planes()
            .iter()
            .skip(PlaneSet::NEAR + 1)
            .fold(local.clone(), |polygon, plane| polygon.clip(plane));
        if clipped.len() < 3 {
            return None;
        }

        if !self.tracker.touch_node(target) {
            return Some(None);
        }

        // Camera touching the portal sees it as a whole, no narrowing
        let touches_camera = local
            .aabb()
            .is_some_and(|aabb| aabb.intersects_sphere(frame.camera, self.config.camera_portal_radius));
        let frustum = if touches_camera {
            frame.frustum.clone()
        } else {
            PlaneSet::create_view_planes(clipped.vertices(), &frame.camera).unwrap_or_else(|| frame.frustum.clone())
        };

        let target_world = self.graph.world_matrix(target);
        let Some(warp) = target_world.try_inverse().map(|inverse| inverse * frame.world) else {
            return Some(None);
        };
        let Some(frustum) = frustum.transformed(&warp) else {
            return Some(None);
        };

        self.statistics.portal_cells += 1;
        let cell = self.cull_container(Frame {
            container: target,
            world: target_world,
            camera: transform_point(&warp, &frame.camera),
            frustum,
            rectangle,
        });
        Some(Some(cell))
    }
}

/// Range based visibility of a light placed by `matrix` in frustum space
fn light_in_view(frustum: &PlaneSet, light: &Light, matrix: &Mat4, aabb: &Aabb) -> bool {
    let position = translation(matrix);
    match light.kind {
        LightKind::Point { range } => frustum.intersects_sphere(position, range),
        LightKind::Spot { range, .. } => {
            frustum.intersects_sphere(position, range)
                && light.spot_vertices().is_some_and(|vertices| {
                    let corners: Vec<Vec3> = vertices.iter().map(|v| transform_point(matrix, v)).collect();
                    frustum.intersects_points(&corners)
                })
        }
        LightKind::Directional => frustum.intersects_aabb(aabb).is_some(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Transform;

    fn camera() -> Camera {
        Camera::look_at(
            Vec3::new(0.0, 0.0, -5.0),
            Vec3::new(0.0, 0.0, 5.0),
            std::f32::consts::FRAC_PI_2,
            1.0,
            0.1,
            100.0,
        )
    }

    fn viewport() -> Rect {
        Rect::from_xywh(0.0, 0.0, 100.0, 100.0)
    }

    #[test]
    fn test_missing_container() {
        let mut context = SceneContext::new();
        let root = context.root();
        let gone = context.graph_mut().create_node(root, "Gone", NodeKind::Container).unwrap();
        assert!(context.destroy_node_now(gone));

        let mut query = CullQuery::new(gone, camera(), CullConfig::default());
        assert!(!query.perform(&mut context, viewport()));
        assert!(query.visible_container().is_none());
        assert!(!context.tracker().is_process_active());
    }

    #[test]
    fn test_query_on_moved_container() {
        let mut context = SceneContext::new();
        let root = context.root();
        let room = context.graph_mut().create_node(root, "Room", NodeKind::Container).unwrap();
        context
            .graph_mut()
            .get_mut(room)
            .unwrap()
            .set_transform(Transform::from_position(Vec3::new(0.0, 0.0, 10.0)));
        let lamp = context.graph_mut().create_node(room, "Lamp", NodeKind::Object).unwrap();
        let behind = context.graph_mut().create_node(room, "Behind", NodeKind::Object).unwrap();
        {
            let graph = context.graph_mut();
            graph.get_mut(lamp).unwrap().set_bounds(Aabb::from_center_extents(Vec3::zeros(), Vec3::new(0.5, 0.5, 0.5)));
            graph.get_mut(behind).unwrap().set_transform(Transform::from_position(Vec3::new(0.0, 0.0, -20.0)));
        }

        let mut query = CullQuery::new(room, camera(), CullConfig::default());
        assert!(query.perform(&mut context, viewport()));

        let visible = query.visible_container().unwrap();
        assert_eq!(visible.scene_node(), Some(room));
        assert_eq!(visible.nodes().len(), 1);
        let record = &visible.nodes()[0];
        assert_eq!(record.scene_node(), Some(lamp));
        assert!((record.squared_distance() - 225.0).abs() < 1e-3);
        assert!((visible.cull_query().unwrap().camera_position().z + 15.0).abs() < 1e-4);
    }

    #[test]
    fn test_camera_cell_is_query_container() {
        let mut context = SceneContext::new();
        let root = context.root();
        let cell = context.graph_mut().create_node(root, "Cell", NodeKind::Cell).unwrap();
        let chair = context.graph_mut().create_node(cell, "Chair", NodeKind::Object).unwrap();

        let mut query = CullQuery::new(cell, camera(), CullConfig::default());
        query.set_camera_container(Some(cell));
        assert!(query.perform(&mut context, viewport()));

        let visible = query.visible_container().unwrap();
        assert!(visible.find(chair).is_some());
        assert!(visible.cull_query().unwrap().is_camera_in_cell());
        assert_eq!(query.frame(), 1);
    }
}
