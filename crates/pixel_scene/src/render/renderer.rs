//! Renderer collaborator
//!
//! Narrow interface the traversal needs from a graphics backend.

use std::collections::HashSet;

use crate::foundation::geometry::Rect;
use crate::foundation::math::Mat4;
use crate::scene::NodeId;

use super::{RenderError, RenderResult};

/// Polygon fill mode of a draw call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillMode {
    /// Filled triangles
    Solid,
    /// Edges only
    Wireframe,
}

/// One mesh draw
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    /// Scene node the mesh belongs to
    pub node: NodeId,
    /// Mesh resource name
    pub mesh: String,
    /// Node space to world space
    pub world: Mat4,
    /// Fill mode
    pub fill: FillMode,
    /// Material opacity
    pub opacity: f32,
    /// Squared camera distance cached on the visibility record
    pub squared_distance: f32,
    /// Light this draw adds, `None` for unlit draws
    pub light: Option<NodeId>,
}

/// Rendering backend trait
pub trait Renderer {
    /// Full viewport in pixels
    fn viewport(&self) -> Rect;

    /// Current scissor rectangle
    fn scissor_rect(&self) -> Rect;

    /// Set the scissor rectangle, later draws are clipped by it
    fn set_scissor_rect(&mut self, rect: Rect);

    /// Issue a draw call
    fn draw(&mut self, call: &DrawCall) -> RenderResult<()>;
}

/// Command recorded by [`RecordingRenderer`]
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    /// Scissor rectangle change
    SetScissorRect(Rect),
    /// Draw call together with the scissor rectangle active at that time
    Draw {
        /// The draw call
        call: DrawCall,
        /// Active scissor rectangle
        scissor: Rect,
    },
}

/// Renderer recording every command instead of drawing
#[derive(Debug, Clone)]
pub struct RecordingRenderer {
    viewport: Rect,
    scissor: Rect,
    commands: Vec<RenderCommand>,
    missing_meshes: HashSet<String>,
}

impl RecordingRenderer {
    /// Create a recorder for a viewport
    pub fn new(viewport: Rect) -> Self {
        Self {
            viewport,
            scissor: viewport,
            commands: Vec::new(),
            missing_meshes: HashSet::new(),
        }
    }

    /// Make draws of a mesh fail with [`RenderError::MeshNotFound`]
    pub fn reject_mesh(&mut self, mesh: impl Into<String>) {
        self.missing_meshes.insert(mesh.into());
    }

    /// All recorded commands
    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    /// Recorded draw calls
    pub fn draws(&self) -> impl Iterator<Item = &DrawCall> {
        self.commands.iter().filter_map(|command| match command {
            RenderCommand::Draw { call, .. } => Some(call),
            RenderCommand::SetScissorRect(_) => None,
        })
    }

    /// Meshes drawn, in draw order
    pub fn drawn_meshes(&self) -> Vec<&str> {
        self.draws().map(|call| call.mesh.as_str()).collect()
    }

    /// Meshes lit by `light`, in draw order
    pub fn lit_meshes(&self, light: NodeId) -> Vec<&str> {
        self.draws()
            .filter(|call| call.light == Some(light))
            .map(|call| call.mesh.as_str())
            .collect()
    }

    /// Forget the recorded commands and reset the scissor rectangle
    pub fn clear(&mut self) {
        self.commands.clear();
        self.scissor = self.viewport;
    }
}

impl Renderer for RecordingRenderer {
    fn viewport(&self) -> Rect {
        self.viewport
    }

    fn scissor_rect(&self) -> Rect {
        self.scissor
    }

    fn set_scissor_rect(&mut self, rect: Rect) {
        self.scissor = rect;
        self.commands.push(RenderCommand::SetScissorRect(rect));
    }

    fn draw(&mut self, call: &DrawCall) -> RenderResult<()> {
        if self.missing_meshes.contains(&call.mesh) {
            return Err(RenderError::MeshNotFound(call.mesh.clone()));
        }
        self.commands.push(RenderCommand::Draw { call: call.clone(), scissor: self.scissor });
        Ok(())
    }
}
