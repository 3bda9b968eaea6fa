//! Scene graph arena
//!
//! Nodes live in a [`SlotMap`] and reference each other through [`NodeId`]s.
//! The root container always exists and is called [`ROOT_NAME`].

use slotmap::SlotMap;
use thiserror::Error;

use crate::foundation::geometry::Aabb;
use crate::foundation::math::{transform_point, Mat4, Vec3};

use super::node::{NodeId, NodeKind, SceneNode};

/// Name of the root container
pub const ROOT_NAME: &str = "Root";

/// Scene graph errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// The node does not exist (anymore)
    #[error("Scene node not found: {0:?}")]
    NodeNotFound(NodeId),
    /// Children can only be added to containers
    #[error("Scene node '{0}' is not a container")]
    NotAContainer(String),
    /// Names are unique within a container
    #[error("Container already has a node called '{0}'")]
    DuplicateName(String),
    /// Empty, reserved or containing the path separator
    #[error("Invalid scene node name '{0}'")]
    InvalidName(String),
    /// The root can not be renamed, moved or destroyed
    #[error("The root container can not be modified this way")]
    RootImmutable,
    /// A container can not be moved into itself or one of its descendants
    #[error("Moving '{0}' would create a cycle")]
    CyclicMove(String),
}

/// Result type for scene graph operations
pub type SceneResult<T> = Result<T, SceneError>;

/// Tree of scene nodes
#[derive(Debug)]
pub struct SceneGraph {
    nodes: SlotMap<NodeId, SceneNode>,
    root: NodeId,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    /// Create a graph holding only the root container
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(SceneNode::new(ROOT_NAME.to_string(), NodeKind::Container, None));
        Self { nodes, root }
    }

    /// Root container
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false, the root exists
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether the node exists
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Node by id
    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id)
    }

    /// Mutable node by id
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id)
    }

    /// All nodes, in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
        self.nodes.iter()
    }

    /// Create a node inside `container`
    pub fn create_node(
        &mut self,
        container: NodeId,
        name: &str,
        kind: NodeKind,
    ) -> SceneResult<NodeId> {
        Self::validate_name(name)?;
        let parent = self.nodes.get(container).ok_or(SceneError::NodeNotFound(container))?;
        if !parent.is_container() {
            return Err(SceneError::NotAContainer(parent.name().to_string()));
        }
        if self.find_child(container, name).is_some() {
            return Err(SceneError::DuplicateName(name.to_string()));
        }

        let id = self.nodes.insert(SceneNode::new(name.to_string(), kind, Some(container)));
        if let Some(parent) = self.nodes.get_mut(container) {
            parent.children.push(id);
        }
        log::trace!("Created scene node '{}' ({:?})", name, id);
        Ok(id)
    }

    /// Child nodes of a container in insertion order
    pub fn children(&self, container: NodeId) -> &[NodeId] {
        self.nodes.get(container).map(|n| n.children()).unwrap_or(&[])
    }

    /// Container a node lives in
    pub fn container_of(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.container)
    }

    /// Direct child of `container` called `name`
    pub fn find_child(&self, container: NodeId, name: &str) -> Option<NodeId> {
        self.children(container)
            .iter()
            .copied()
            .find(|&child| self.nodes.get(child).is_some_and(|n| n.name() == name))
    }

    /// Resolve a dot separated path like `"House.Kitchen.Table"` starting at the root
    ///
    /// `"Root"` and `"Parent"` are understood as path components.
    pub fn find_by_path(&self, path: &str) -> Option<NodeId> {
        let mut current = self.root;
        for component in path.split('.') {
            current = match component {
                "" => return None,
                ROOT_NAME => self.root,
                "Parent" => self.container_of(current)?,
                name => self.find_child(current, name)?,
            };
        }
        Some(current)
    }

    /// Dot separated path of a node, the root itself is `"Root"`
    pub fn path(&self, id: NodeId) -> Option<String> {
        if id == self.root {
            return Some(ROOT_NAME.to_string());
        }
        let mut components = Vec::new();
        let mut current = id;
        while current != self.root {
            let node = self.nodes.get(current)?;
            components.push(node.name());
            current = node.container?;
        }
        components.reverse();
        Some(components.join("."))
    }

    /// Rename a node
    pub fn set_name(&mut self, id: NodeId, name: &str) -> SceneResult<()> {
        if id == self.root {
            return Err(SceneError::RootImmutable);
        }
        Self::validate_name(name)?;
        let container = self.container_of(id);
        if let Some(container) = container {
            if self.find_child(container, name).is_some_and(|other| other != id) {
                return Err(SceneError::DuplicateName(name.to_string()));
            }
        }
        let node = self.nodes.get_mut(id).ok_or(SceneError::NodeNotFound(id))?;
        node.set_name_unchecked(name.to_string());
        Ok(())
    }

    /// Move a node into another container, keeping its local transform
    pub fn move_node(&mut self, id: NodeId, container: NodeId) -> SceneResult<()> {
        if id == self.root {
            return Err(SceneError::RootImmutable);
        }
        let node = self.nodes.get(id).ok_or(SceneError::NodeNotFound(id))?;
        let name = node.name().to_string();
        let target = self.nodes.get(container).ok_or(SceneError::NodeNotFound(container))?;
        if !target.is_container() {
            return Err(SceneError::NotAContainer(target.name().to_string()));
        }
        if id == container || self.is_ancestor(id, container) {
            return Err(SceneError::CyclicMove(name));
        }
        if self.find_child(container, &name).is_some_and(|other| other != id) {
            return Err(SceneError::DuplicateName(name));
        }

        self.detach(id);
        if let Some(target) = self.nodes.get_mut(container) {
            target.children.push(id);
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.container = Some(container);
        }
        Ok(())
    }

    /// Whether `ancestor` is a (transitive) container of `id`
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = self.container_of(id);
        while let Some(container) = current {
            if container == ancestor {
                return true;
            }
            current = self.container_of(container);
        }
        false
    }

    /// Containers from `ancestor` (exclusive) down to `id` (inclusive)
    ///
    /// Returns `None` if `ancestor` is not an ancestor of `id`.
    pub fn path_from(&self, ancestor: NodeId, id: NodeId) -> Option<Vec<NodeId>> {
        let mut path = vec![id];
        let mut current = id;
        while current != ancestor {
            current = self.container_of(current)?;
            if current != ancestor {
                path.push(current);
            }
        }
        path.reverse();
        Some(path)
    }

    /// Root space from node space
    ///
    /// The root transform is not applied, root space is world space.
    pub fn world_matrix(&self, id: NodeId) -> Mat4 {
        let mut matrix = Mat4::identity();
        let mut current = id;
        while current != self.root {
            let Some(node) = self.nodes.get(current) else {
                break;
            };
            matrix = node.matrix() * matrix;
            match node.container {
                Some(container) => current = container,
                None => break,
            }
        }
        matrix
    }

    /// Node bounds in container space
    ///
    /// Containers enclose their visible content; an empty container is a point
    /// at its origin.
    pub fn container_aabb(&self, id: NodeId) -> Option<Aabb> {
        let node = self.nodes.get(id)?;
        let local = self.local_aabb(id)?;
        Some(local.transformed(&node.matrix()))
    }

    fn local_aabb(&self, id: NodeId) -> Option<Aabb> {
        let node = self.nodes.get(id)?;
        match node.kind() {
            NodeKind::Container | NodeKind::Cell => {
                let content = node
                    .children()
                    .iter()
                    .filter(|&&child| self.nodes.get(child).is_some_and(|n| n.is_visible()))
                    .filter_map(|&child| self.container_aabb(child))
                    .reduce(|a, b| a.union(&b));
                Some(content.unwrap_or(*node.bounds()))
            }
            NodeKind::CellPortal(portal) => portal.polygon.aabb().or(Some(*node.bounds())),
            NodeKind::AntiPortal(anti) => anti.polygon.aabb().or(Some(*node.bounds())),
            NodeKind::Object | NodeKind::Light(_) => Some(*node.bounds()),
        }
    }

    /// Node position in root space
    pub fn world_position(&self, id: NodeId) -> Vec3 {
        transform_point(&self.world_matrix(id), &Vec3::zeros())
    }

    /// Unlink a node from its container, the node itself stays alive
    pub(crate) fn detach(&mut self, id: NodeId) {
        let Some(container) = self.container_of(id) else {
            return;
        };
        if let Some(parent) = self.nodes.get_mut(container) {
            parent.children.retain(|&child| child != id);
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.container = None;
        }
    }

    /// Remove a node and everything inside it, returning the removed ids
    pub(crate) fn destroy_subtree(&mut self, id: NodeId) -> Vec<NodeId> {
        if id == self.root {
            return Vec::new();
        }
        self.detach(id);

        let mut removed = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(current) {
                stack.extend(node.children);
                removed.push(current);
            }
        }
        // Portals pointing into the removed cells lose their target
        for (_, node) in self.nodes.iter_mut() {
            if let NodeKind::CellPortal(portal) = node.kind_mut() {
                if portal.target_cell.is_some_and(|t| removed.contains(&t)) {
                    portal.target_cell = None;
                }
            }
        }
        removed
    }

    fn validate_name(name: &str) -> SceneResult<()> {
        if name.is_empty() || name == ROOT_NAME || name == "Parent" || name.contains('.') {
            return Err(SceneError::InvalidName(name.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Transform;
    use approx::assert_relative_eq;

    fn house() -> (SceneGraph, NodeId, NodeId) {
        let mut graph = SceneGraph::new();
        let house = graph.create_node(graph.root(), "House", NodeKind::Container).unwrap();
        let kitchen = graph.create_node(house, "Kitchen", NodeKind::Cell).unwrap();
        (graph, house, kitchen)
    }

    #[test]
    fn test_create_and_find() {
        let (mut graph, house, kitchen) = house();
        let table = graph.create_node(kitchen, "Table", NodeKind::Object).unwrap();

        assert_eq!(graph.len(), 4);
        assert_eq!(graph.children(graph.root()), &[house]);
        assert_eq!(graph.find_by_path("House.Kitchen.Table"), Some(table));
        assert_eq!(graph.find_by_path("House.Kitchen.Parent"), Some(house));
        assert_eq!(graph.find_by_path("House.Bathroom"), None);
        assert_eq!(graph.path(table).as_deref(), Some("House.Kitchen.Table"));
        assert!(graph.is_ancestor(house, table));
        assert!(!graph.is_ancestor(table, house));
    }

    #[test]
    fn test_create_errors() {
        let (mut graph, house, kitchen) = house();
        let table = graph.create_node(kitchen, "Table", NodeKind::Object).unwrap();

        assert_eq!(
            graph.create_node(house, "Kitchen", NodeKind::Object),
            Err(SceneError::DuplicateName("Kitchen".into()))
        );
        assert!(matches!(
            graph.create_node(table, "Cup", NodeKind::Object),
            Err(SceneError::NotAContainer(_))
        ));
        assert!(matches!(
            graph.create_node(house, "A.B", NodeKind::Object),
            Err(SceneError::InvalidName(_))
        ));
        assert_eq!(graph.set_name(graph.root(), "World"), Err(SceneError::RootImmutable));
    }

    #[test]
    fn test_move_node() {
        let (mut graph, house, kitchen) = house();
        let garden = graph.create_node(graph.root(), "Garden", NodeKind::Container).unwrap();

        assert!(matches!(graph.move_node(house, kitchen), Err(SceneError::CyclicMove(_))));

        graph.move_node(kitchen, garden).unwrap();
        assert_eq!(graph.container_of(kitchen), Some(garden));
        assert!(graph.children(house).is_empty());
        assert_eq!(graph.path_from(graph.root(), kitchen), Some(vec![garden, kitchen]));
    }

    #[test]
    fn test_world_matrix_excludes_root() {
        let (mut graph, house, kitchen) = house();
        graph
            .get_mut(graph.root())
            .unwrap()
            .set_transform(Transform::from_position(Vec3::new(100.0, 0.0, 0.0)));
        graph.get_mut(house).unwrap().set_transform(Transform::from_position(Vec3::new(1.0, 0.0, 0.0)));
        graph.get_mut(kitchen).unwrap().set_transform(Transform::from_position(Vec3::new(0.0, 2.0, 0.0)));

        let position = graph.world_position(kitchen);
        assert_relative_eq!(position, Vec3::new(1.0, 2.0, 0.0));
        assert_eq!(graph.world_matrix(graph.root()), Mat4::identity());
    }

    #[test]
    fn test_container_aabb_encloses_children() {
        let (mut graph, house, kitchen) = house();
        let table = graph.create_node(kitchen, "Table", NodeKind::Object).unwrap();
        {
            let table = graph.get_mut(table).unwrap();
            table.set_bounds(Aabb::from_center_extents(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0)));
            table.set_transform(Transform::from_position(Vec3::new(5.0, 0.0, 0.0)));
        }
        graph.get_mut(kitchen).unwrap().set_transform(Transform::from_position(Vec3::new(0.0, 0.0, 3.0)));

        let aabb = graph.container_aabb(kitchen).unwrap();
        assert_relative_eq!(aabb.min, Vec3::new(4.0, -1.0, 2.0));
        assert_relative_eq!(aabb.max, Vec3::new(6.0, 1.0, 4.0));
        assert!(graph.container_aabb(house).is_some());
    }

    #[test]
    fn test_destroy_subtree_unlinks_portals() {
        let (mut graph, house, kitchen) = house();
        let chair = graph.create_node(kitchen, "Chair", NodeKind::Object).unwrap();
        let portal = graph
            .create_node(
                house,
                "Door",
                NodeKind::CellPortal(crate::scene::CellPortal {
                    target_cell: Some(kitchen),
                    polygon: crate::foundation::geometry::Polygon::rectangle_xy(1.0, 1.0),
                }),
            )
            .unwrap();

        let removed = graph.destroy_subtree(kitchen);
        assert_eq!(removed.len(), 2);
        assert!(!graph.contains(chair));
        assert_eq!(graph.children(house), &[portal]);
        assert_eq!(graph.get(portal).unwrap().as_cell_portal().unwrap().target_cell, None);
    }
}
