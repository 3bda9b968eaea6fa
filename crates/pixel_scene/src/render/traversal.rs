//! Visibility tree traversal
//!
//! Every render pass walks the visibility tree the same way: set the scissor
//! rectangle of a container, draw its nodes, descend into visible containers
//! and portal targets and restore the container's rectangle afterwards. The
//! walk keeps pending containers on an explicit stack, each entry remembering
//! the rectangle to restore once it is done.
//!
//! Lights are handed to [`ScenePass::draw_light`] together with the container
//! they were found in, so a pass can start a nested walk per light.

use crate::foundation::geometry::Rect;
use crate::scene::{SceneGraph, SceneNode};
use crate::visibility::{VisContainer, VisKind, VisNode};

use super::{RenderResult, Renderer};

/// Iteration order over the nodes of a container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawOrder {
    /// Build order, nearest first
    #[default]
    FrontToBack,
    /// Reverse build order, farthest first (transparency)
    BackToFront,
}

/// Render pass driven by [`draw_rec`]
pub trait ScenePass {
    /// Name used in log output
    fn name(&self) -> &str;

    /// Order in which container nodes are visited
    fn draw_order(&self) -> DrawOrder {
        DrawOrder::FrontToBack
    }

    /// Whether the pass wants to draw a node at all
    fn accepts(&self, _node: &SceneNode) -> bool {
        true
    }

    /// Whether the walk descends into a container or portal target
    fn descends(&self, _node: &SceneNode) -> bool {
        true
    }

    /// Whether nodes beyond their maximum draw distance are skipped
    fn respects_max_draw_distance(&self) -> bool {
        true
    }

    /// Draw a leaf node
    fn draw_node(&mut self, renderer: &mut dyn Renderer, node: &SceneNode, vis: &VisNode) -> RenderResult<()>;

    /// Draw the geometry of a portal, after the cell behind it
    fn draw_portal(&mut self, renderer: &mut dyn Renderer, node: &SceneNode, vis: &VisNode) -> RenderResult<()> {
        self.draw_node(renderer, node, vis)
    }

    /// Visible light found in `container`; ignored unless the pass lights meshes
    fn draw_light(
        &mut self,
        _renderer: &mut dyn Renderer,
        _graph: &SceneGraph,
        _container: &VisContainer,
        _light: &SceneNode,
        _vis: &VisNode,
    ) -> RenderResult<()> {
        Ok(())
    }
}

struct Frame<'v, 'g> {
    container: &'v VisContainer,
    position: usize,
    /// Rectangle of the parent container
    restore: Option<Rect>,
    /// Portal whose target this frame walks
    portal: Option<(&'g SceneNode, &'v VisNode)>,
}

impl<'v, 'g> Frame<'v, 'g> {
    fn next(&mut self, order: DrawOrder) -> Option<&'v VisNode> {
        let nodes = self.container.nodes();
        if self.position >= nodes.len() {
            return None;
        }
        let index = match order {
            DrawOrder::FrontToBack => self.position,
            DrawOrder::BackToFront => nodes.len() - 1 - self.position,
        };
        self.position += 1;
        nodes.get(index)
    }
}

/// Draw a visibility container with a render pass
///
/// Containers without a cull query are not visible and draw nothing. After
/// returning from a container or portal target the scissor rectangle of the
/// enclosing container is active again. When a draw fails the rectangle of
/// `container` is set again before the error is returned.
pub fn draw_rec<P>(
    pass: &mut P,
    renderer: &mut dyn Renderer,
    graph: &SceneGraph,
    container: &VisContainer,
) -> RenderResult<()>
where
    P: ScenePass + ?Sized,
{
    if container.cull_query().is_none() {
        return Ok(());
    }

    let rectangle = container.projection().rectangle();
    renderer.set_scissor_rect(rectangle);
    let result = walk(pass, renderer, graph, container);
    if result.is_err() {
        renderer.set_scissor_rect(rectangle);
    }
    result
}

fn walk<P>(pass: &mut P, renderer: &mut dyn Renderer, graph: &SceneGraph, container: &VisContainer) -> RenderResult<()>
where
    P: ScenePass + ?Sized,
{
    let order = pass.draw_order();
    let mut stack = vec![Frame { container, position: 0, restore: None, portal: None }];

    while let Some(frame) = stack.last_mut() {
        let Some(vis) = frame.next(order) else {
            if let Some(finished) = stack.pop() {
                if let Some(rect) = finished.restore {
                    renderer.set_scissor_rect(rect);
                }
                if let Some((node, vis)) = finished.portal {
                    draw_portal(pass, renderer, node, vis)?;
                }
            }
            continue;
        };
        let parent = frame.container;
        let current = parent.projection().rectangle();

        let Some(node) = vis.scene_node().and_then(|id| graph.get(id)) else {
            continue;
        };
        match vis.kind() {
            VisKind::Portal(portal) => match portal
                .target_vis_container()
                .filter(|target| target.is_visible() && pass.descends(node))
            {
                Some(target) => {
                    renderer.set_scissor_rect(target.projection().rectangle());
                    stack.push(Frame {
                        container: target,
                        position: 0,
                        restore: Some(current),
                        portal: Some((node, vis)),
                    });
                }
                None => draw_portal(pass, renderer, node, vis)?,
            },
            VisKind::Container(sub) => {
                if sub.is_visible() && pass.descends(node) {
                    renderer.set_scissor_rect(sub.projection().rectangle());
                    stack.push(Frame { container: sub, position: 0, restore: Some(current), portal: None });
                }
            }
            VisKind::Leaf if node.is_light() => pass.draw_light(renderer, graph, parent, node, vis)?,
            VisKind::Leaf => {
                if wants(pass, node, vis) {
                    pass.draw_node(renderer, node, vis)?;
                }
            }
        }
    }
    Ok(())
}

fn draw_portal<P>(pass: &mut P, renderer: &mut dyn Renderer, node: &SceneNode, vis: &VisNode) -> RenderResult<()>
where
    P: ScenePass + ?Sized,
{
    if wants(pass, node, vis) {
        pass.draw_portal(renderer, node, vis)?;
    }
    Ok(())
}

fn wants<P: ScenePass + ?Sized>(pass: &P, node: &SceneNode, vis: &VisNode) -> bool {
    pass.accepts(node)
        && !(pass.respects_max_draw_distance() && node.is_beyond_draw_distance(vis.squared_distance()))
}
