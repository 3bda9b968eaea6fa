//! Scenario tests over complete scenes
//!
//! Fixture: two rooms A and B (cells under the root) joined by a window at
//! z = 0. The camera stands in room A at z = -5 and looks through the window
//! into room B, which has a window of its own looking back into room A.


use crate::config::CullConfig;
use crate::foundation::geometry::{Aabb, Polygon, Rect};
use crate::foundation::math::{Transform, Vec3};
use crate::scene::{Camera, CellPortal, MeshHandler, NodeId, NodeKind, SceneContext};
use crate::visibility::CullQuery;

pub(crate) struct TwoRooms {
    pub context: SceneContext,
    pub room_a: NodeId,
    pub room_b: NodeId,
    pub cube_a: NodeId,
    pub window_ab: NodeId,
    pub cube_b: NodeId,
    pub glass_b: NodeId,
    pub hidden_b: NodeId,
    pub window_ba: NodeId,
}

pub(crate) fn viewport() -> Rect {
    Rect::from_xywh(0.0, 0.0, 800.0, 800.0)
}

pub(crate) fn camera_towards(target: Vec3) -> Camera {
    Camera::look_at(Vec3::new(0.0, 0.0, -5.0), target, std::f32::consts::FRAC_PI_2, 1.0, 0.1, 100.0)
}

pub(crate) fn camera() -> Camera {
    camera_towards(Vec3::new(0.0, 0.0, 5.0))
}

pub(crate) fn add_object(context: &mut SceneContext, container: NodeId, name: &str, position: Vec3) -> NodeId {
    let id = context.graph_mut().create_node(container, name, NodeKind::Object).unwrap();
    let node = context.graph_mut().get_mut(id).unwrap();
    node.set_transform(Transform::from_position(position));
    node.set_bounds(Aabb::from_center_extents(Vec3::zeros(), Vec3::new(0.5, 0.5, 0.5)));
    id
}

fn add_mesh(context: &mut SceneContext, container: NodeId, name: &str, position: Vec3, mesh: MeshHandler) -> NodeId {
    let id = add_object(context, container, name, position);
    context.graph_mut().get_mut(id).unwrap().set_mesh_handler(Some(mesh));
    id
}

fn add_window(context: &mut SceneContext, room: NodeId, name: &str, target: NodeId, half_size: f32, z: f32) -> NodeId {
    let portal = CellPortal { target_cell: Some(target), polygon: Polygon::rectangle_xy(half_size, half_size) };
    let id = context.graph_mut().create_node(room, name, NodeKind::CellPortal(portal)).unwrap();
    context
        .graph_mut()
        .get_mut(id)
        .unwrap()
        .set_transform(Transform::from_position(Vec3::new(0.0, 0.0, z)));
    id
}

pub(crate) fn two_rooms() -> TwoRooms {
    let mut context = SceneContext::new();
    let root = context.root();
    let room_a = context.graph_mut().create_node(root, "RoomA", NodeKind::Cell).unwrap();
    let room_b = context.graph_mut().create_node(root, "RoomB", NodeKind::Cell).unwrap();

    let cube_a = add_mesh(&mut context, room_a, "CubeA", Vec3::new(0.0, 0.0, -2.0), MeshHandler::opaque("cube_a"));
    let window_ab = add_window(&mut context, room_a, "WindowToB", room_b, 1.0, 0.0);
    context
        .graph_mut()
        .get_mut(window_ab)
        .unwrap()
        .set_mesh_handler(Some(MeshHandler::with_opacity("window", 0.5)));

    let cube_b = add_mesh(&mut context, room_b, "CubeB", Vec3::new(0.0, 0.0, 4.0), MeshHandler::opaque("cube_b"));
    let glass_b = add_mesh(
        &mut context,
        room_b,
        "GlassB",
        Vec3::new(0.3, 0.0, 3.0),
        MeshHandler::with_opacity("glass_b", 0.25),
    );
    // Inside the camera frustum but not visible through the window
    let hidden_b = add_mesh(&mut context, room_b, "HiddenB", Vec3::new(5.0, 0.0, 4.0), MeshHandler::opaque("hidden_b"));
    let window_ba = add_window(&mut context, room_b, "WindowToA", room_a, 0.5, 0.5);

    TwoRooms { context, room_a, room_b, cube_a, window_ab, cube_b, glass_b, hidden_b, window_ba }
}

impl TwoRooms {
    pub fn query(&self) -> CullQuery {
        let mut query = CullQuery::new(self.context.root(), camera(), CullConfig::default());
        query.set_camera_container(Some(self.room_a));
        query
    }
}
