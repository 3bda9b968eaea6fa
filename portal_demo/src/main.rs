//! Portal demo
//!
//! Builds three rooms in a row joined by windows, walks the camera through
//! them and renders every frame into a recording renderer, logging what the
//! visibility query saw.
//!
//! Usage: `portal_demo [config.toml|config.ron]`

use std::ops::ControlFlow;

use pixel_scene::config::{Config, ConfigError, SceneConfig};
use pixel_scene::foundation::geometry::{Aabb, Polygon};
use pixel_scene::foundation::logging;
use pixel_scene::foundation::math::{Quat, Transform, Vec3};
use pixel_scene::render::{
    draw_rec, DebugWireframePass, LightingPass, MeshPass, RecordingRenderer, RenderError, ScenePass,
};
use pixel_scene::scene::{
    AntiPortal, CellPortal, Light, MeshHandler, NodeFlags, NodeId, NodeKind, SceneContext, SceneError, SceneGraph,
    SceneNode,
};
use pixel_scene::visibility::CullQuery;

/// Demo errors
#[derive(thiserror::Error, Debug)]
enum DemoError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),
}

/// Room of the demo scene with its extent along z
struct Room {
    id: NodeId,
    name: &'static str,
    z_min: f32,
    z_max: f32,
}

struct DemoScene {
    context: SceneContext,
    rooms: Vec<Room>,
}

impl DemoScene {
    fn build() -> Result<Self, DemoError> {
        let mut context = SceneContext::new();
        let root = context.root();
        let graph = context.graph_mut();

        let mut rooms = Vec::new();
        for (index, name) in ["Hall", "Kitchen", "Garden"].into_iter().enumerate() {
            let z_min = index as f32 * 10.0 - 10.0;
            let id = graph.create_node(root, name, NodeKind::Cell)?;
            if let Some(room) = graph.get_mut(id) {
                room.set_transform(Transform::from_position(Vec3::new(0.0, 0.0, z_min + 5.0)));
            }
            add_mesh(graph, id, "Table", Vec3::new(1.5, -1.0, 0.0), MeshHandler::opaque("table"))?;
            rooms.push(Room { id, name, z_min, z_max: z_min + 10.0 });
        }

        // Windows in both directions between neighbouring rooms
        for pair in rooms.windows(2) {
            let (front, back) = (&pair[0], &pair[1]);
            let forward = add_window(graph, front.id, &format!("To{}", back.name), back.id, 5.0, false)?;
            if let Some(window) = graph.get_mut(forward) {
                window.set_mesh_handler(Some(MeshHandler::with_opacity("window", 0.3)));
            }
            add_window(graph, back.id, &format!("To{}", front.name), front.id, -5.0, true)?;
        }

        let fan = add_mesh(graph, rooms[0].id, "Fan", Vec3::new(0.0, 2.0, 0.0), MeshHandler::opaque("fan"))?;
        add_mesh(graph, rooms[1].id, "Glass", Vec3::new(-1.0, 0.0, 2.0), MeshHandler::with_opacity("glass", 0.5))?;
        add_light(graph, rooms[0].id, "Lamp", Light::point(Vec3::new(1.0, 0.9, 0.7), 12.0), Vec3::new(0.0, 3.0, 3.0))?;
        add_light(
            graph,
            rooms[2].id,
            "Spot",
            Light::spot(Vec3::new(0.6, 0.6, 1.0), 8.0, std::f32::consts::FRAC_PI_3),
            Vec3::new(0.0, 3.0, 4.0),
        )?;
        let pillar = graph.create_node(
            rooms[2].id,
            "Pillar",
            NodeKind::AntiPortal(AntiPortal { polygon: Polygon::rectangle_xy(1.0, 2.0) }),
        )?;
        if let Some(node) = graph.get_mut(pillar) {
            node.set_transform(Transform::from_position(Vec3::new(0.0, 0.0, -1.0)));
        }
        add_mesh(graph, rooms[2].id, "Statue", Vec3::new(0.0, 0.0, 1.0), MeshHandler::opaque("statue"))?;
        let debris = add_mesh(graph, rooms[2].id, "Debris", Vec3::new(2.0, -1.5, 3.0), MeshHandler::opaque("debris"))?;
        if let Some(node) = graph.get_mut(debris) {
            node.set_flag(NodeFlags::AUTOMATIC, true);
        }

        context.connect_update(move |graph: &mut SceneGraph, event: &pixel_scene::events::UpdateEvent| {
            if event.paused {
                return;
            }
            if let Some(node) = graph.get_mut(fan) {
                let angle = event.frame as f32 * 0.5;
                node.transform_mut().rotation = Quat::from_axis_angle(&Vec3::y_axis(), angle);
            }
        });

        Ok(Self { context, rooms })
    }

    /// Room the camera stands in
    fn room_at(&self, position: &Vec3) -> Option<&Room> {
        self.rooms.iter().find(|room| position.z >= room.z_min && position.z < room.z_max)
    }

    fn debris(&self) -> Option<NodeId> {
        self.context.graph().find_by_path("Garden.Debris")
    }
}

fn add_mesh(graph: &mut SceneGraph, room: NodeId, name: &str, position: Vec3, mesh: MeshHandler) -> Result<NodeId, SceneError> {
    let id = graph.create_node(room, name, NodeKind::Object)?;
    let node = graph.get_mut(id).ok_or(SceneError::NodeNotFound(id))?;
    node.set_transform(Transform::from_position(position));
    node.set_bounds(Aabb::from_center_extents(Vec3::zeros(), Vec3::new(0.5, 0.5, 0.5)));
    node.set_mesh_handler(Some(mesh));
    Ok(id)
}

fn add_light(graph: &mut SceneGraph, room: NodeId, name: &str, light: Light, position: Vec3) -> Result<NodeId, SceneError> {
    let id = graph.create_node(room, name, NodeKind::Light(light))?;
    let node = graph.get_mut(id).ok_or(SceneError::NodeNotFound(id))?;
    node.set_transform(Transform::from_position(position));
    Ok(id)
}

fn add_window(
    graph: &mut SceneGraph,
    room: NodeId,
    name: &str,
    target: NodeId,
    z: f32,
    facing_back: bool,
) -> Result<NodeId, SceneError> {
    let mut polygon = Polygon::rectangle_xy(1.5, 1.5);
    if facing_back {
        polygon = Polygon::new(polygon.vertices().iter().rev().copied().collect());
    }
    let portal = CellPortal { target_cell: Some(target), polygon };
    let id = graph.create_node(room, name, NodeKind::CellPortal(portal))?;
    let node = graph.get_mut(id).ok_or(SceneError::NodeNotFound(id))?;
    node.set_transform(Transform::from_position(Vec3::new(0.0, 0.0, z)));
    Ok(id)
}

fn render_frame(
    scene: &DemoScene,
    query: &CullQuery,
    renderer: &mut RecordingRenderer,
    passes: &mut [&mut dyn ScenePass],
) -> Result<(), DemoError> {
    let Some(visible) = query.visible_container() else {
        return Ok(());
    };
    for pass in passes.iter_mut() {
        draw_rec(&mut **pass, renderer, scene.context.graph(), visible)?;
        log::debug!("Pass '{}' done", pass.name());
    }
    Ok(())
}

fn run(config: &SceneConfig) -> Result<(), DemoError> {
    let mut scene = DemoScene::build()?;
    let viewport = config.viewport();
    let mut camera = config.camera.to_camera(config.aspect());
    let mut query = CullQuery::new(scene.context.root(), camera.clone(), config.cull.clone());
    let mut renderer = RecordingRenderer::new(viewport);

    for frame in 0..config.frames {
        let event = scene.context.update_with_delta(1.0 / 60.0, true);

        // Walk forward through the rooms
        let step = Vec3::new(0.0, 0.0, 4.0 * frame as f32);
        camera.set_look_at(Vec3::from(config.camera.eye) + step, Vec3::from(config.camera.target) + step);
        query.set_camera(camera.clone());
        let (room, room_name) = scene
            .room_at(&camera.position)
            .map_or((None, "<outside>"), |room| (Some(room.id), room.name));
        query.set_camera_container(room);

        let mut accepted = 0usize;
        let completed = query.perform_with(&mut scene.context, viewport, &mut |_: NodeId, _: &SceneNode| {
            accepted += 1;
            ControlFlow::Continue(())
        });
        if !completed {
            log::warn!("Frame {}: visibility query did not complete", event.frame);
        }

        renderer.clear();
        let mut opaque = MeshPass::opaque();
        let mut lighting = LightingPass::default();
        let mut transparent = MeshPass::transparent();
        let mut wireframes = DebugWireframePass::new(0.5);
        let mut passes: [&mut dyn ScenePass; 4] = [&mut opaque, &mut lighting, &mut transparent, &mut wireframes];
        render_frame(&scene, &query, &mut renderer, &mut passes)?;

        let stats = query.statistics();
        log::info!(
            "Frame {} in {}: {} visible, {} accepted, {} portal cells, {} frustum culled, {} occluded, {} draws, {} lights ({:?})",
            event.frame,
            room_name,
            stats.visible_nodes,
            accepted,
            stats.portal_cells,
            stats.frustum_culled,
            stats.anti_portal_culled,
            renderer.draws().count(),
            lighting.lights(),
            stats.cull_time,
        );
        log::debug!("Meshes: {:?}", renderer.drawn_meshes());

        // Runtime debris disappears after the first frame
        if let Some(debris) = scene.debris() {
            scene.context.delete_node(debris, false);
        }
        let removed = scene.context.cleanup();
        if removed > 0 {
            log::info!("Removed {} scene nodes", removed);
        }
    }
    Ok(())
}

fn main() {
    let config = match std::env::args().nth(1) {
        Some(path) => match SceneConfig::load_from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load '{}': {}", path, e);
                std::process::exit(1);
            }
        },
        None => SceneConfig::default(),
    };

    logging::init_with_filter(&config.log_filter);
    log::info!("Starting portal demo ({} frames)", config.frames);

    if let Err(e) = run(&config) {
        log::error!("Portal demo failed: {}", e);
        std::process::exit(1);
    }
}
