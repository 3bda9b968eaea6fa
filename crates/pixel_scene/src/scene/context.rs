//! Scene context
//!
//! Owns the scene graph together with everything that spans the whole scene:
//! the process/touch bookkeeping used by traversals, the deferred deletion
//! queue and the per-frame update signal.

use slotmap::SecondaryMap;

use crate::events::{EventUpdate, ListenerId, UpdateEvent, UpdateListener};
use crate::foundation::time::Timer;

use super::graph::SceneGraph;
use super::node::NodeId;

/// Process/touch bookkeeping
///
/// A process is one logical traversal over the scene. While it is active each
/// node can be touched exactly once; a second touch reports "already touched".
/// Touch stamps live in a side table keyed by node, so starting a new process
/// is O(1): bumping the counter invalidates every stamp at once.
///
/// Only one process can be active at a time. Misuse is reported through the
/// boolean results and never changes state.
#[derive(Debug, Default)]
pub struct ProcessTracker {
    counter: u32,
    active: bool,
    touched: SecondaryMap<NodeId, u32>,
}

impl ProcessTracker {
    /// Create an idle tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a process is currently active
    pub fn is_process_active(&self) -> bool {
        self.active
    }

    /// Counter value of the current (or last) process
    pub fn process_counter(&self) -> u32 {
        self.counter
    }

    /// Start a new process, returns false if one is already active
    pub fn start_process(&mut self) -> bool {
        if self.active {
            log::debug!("start_process: process {} is still active", self.counter);
            return false;
        }
        self.counter = self.counter.wrapping_add(1);
        if self.counter == 0 {
            // Old stamps could match again after the wrap
            self.counter = 1;
            self.touched.clear();
        }
        self.active = true;
        true
    }

    /// Touch a node, true on the first touch within the active process
    ///
    /// Returns false if the node was already touched or no process is active.
    pub fn touch_node(&mut self, id: NodeId) -> bool {
        if !self.active {
            log::debug!("touch_node: no active process");
            return false;
        }
        if self.touched.get(id) == Some(&self.counter) {
            return false;
        }
        self.touched.insert(id, self.counter);
        true
    }

    /// Whether the node was touched within the active process
    pub fn is_node_touched(&self, id: NodeId) -> bool {
        self.active && self.touched.get(id) == Some(&self.counter)
    }

    /// End the active process, returns false if there is none
    pub fn end_process(&mut self) -> bool {
        if !self.active {
            log::debug!("end_process: no active process");
            return false;
        }
        self.active = false;
        true
    }

    /// Drop the stamp of a destroyed node
    pub(crate) fn forget(&mut self, id: NodeId) {
        self.touched.remove(id);
    }
}

/// Scene context
#[derive(Debug)]
pub struct SceneContext {
    graph: SceneGraph,
    tracker: ProcessTracker,
    delete_queue: Vec<NodeId>,
    update_event: EventUpdate,
    paused: bool,
    timer: Timer,
}

impl Default for SceneContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneContext {
    /// Create a context with an empty scene
    pub fn new() -> Self {
        Self::with_graph(SceneGraph::new())
    }

    /// Create a context around an existing scene graph
    pub fn with_graph(graph: SceneGraph) -> Self {
        Self {
            graph,
            tracker: ProcessTracker::new(),
            delete_queue: Vec::new(),
            update_event: EventUpdate::new(),
            paused: false,
            timer: Timer::new(),
        }
    }

    /// Scene graph
    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    /// Mutable scene graph
    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    /// Root container
    pub fn root(&self) -> NodeId {
        self.graph.root()
    }

    // Process handling

    /// See [`ProcessTracker::start_process`]
    pub fn start_process(&mut self) -> bool {
        self.tracker.start_process()
    }

    /// See [`ProcessTracker::touch_node`]
    pub fn touch_node(&mut self, id: NodeId) -> bool {
        self.tracker.touch_node(id)
    }

    /// See [`ProcessTracker::is_node_touched`]
    pub fn is_node_touched(&self, id: NodeId) -> bool {
        self.tracker.is_node_touched(id)
    }

    /// See [`ProcessTracker::end_process`]
    pub fn end_process(&mut self) -> bool {
        self.tracker.end_process()
    }

    /// Process bookkeeping
    pub fn tracker(&self) -> &ProcessTracker {
        &self.tracker
    }

    /// Read the graph while touching nodes
    pub(crate) fn split_for_traversal(&mut self) -> (&SceneGraph, &mut ProcessTracker) {
        (&self.graph, &mut self.tracker)
    }

    // Deletion

    /// Mark a node for deletion
    ///
    /// The node is unlinked from its container right away but stays
    /// accessible through [`graph`](Self::graph) until the next
    /// [`cleanup`](Self::cleanup). Protected nodes are only deleted when
    /// `protected_too` is set; the root is never deleted.
    pub fn delete_node(&mut self, id: NodeId, protected_too: bool) -> bool {
        if id == self.graph.root() {
            return false;
        }
        let Some(node) = self.graph.get_mut(id) else {
            return false;
        };
        if node.pending_destroy || (node.is_protected() && !protected_too) {
            return false;
        }
        node.pending_destroy = true;
        self.graph.detach(id);
        self.delete_queue.push(id);
        true
    }

    /// Nodes waiting for the next cleanup, in deletion order
    pub fn pending_deletions(&self) -> &[NodeId] {
        &self.delete_queue
    }

    /// Destroy all nodes marked for deletion, returns the number of removed nodes
    pub fn cleanup(&mut self) -> usize {
        let queue = std::mem::take(&mut self.delete_queue);
        let mut removed = 0;
        for id in queue {
            removed += self.destroy_subtree(id);
        }
        if removed > 0 {
            log::trace!("Scene cleanup removed {} nodes", removed);
        }
        removed
    }

    /// Destroy a node and its content immediately
    ///
    /// Must not be used while a traversal holds on to the node.
    pub fn destroy_node_now(&mut self, id: NodeId) -> bool {
        if id == self.graph.root() || !self.graph.contains(id) {
            return false;
        }
        self.delete_queue.retain(|&queued| queued != id);
        self.destroy_subtree(id) > 0
    }

    fn destroy_subtree(&mut self, id: NodeId) -> usize {
        let removed = self.graph.destroy_subtree(id);
        for &node in &removed {
            self.tracker.forget(node);
        }
        removed.len()
    }

    // Update

    /// Per-frame update signal
    pub fn update_event(&mut self) -> &mut EventUpdate {
        &mut self.update_event
    }

    /// Connect an update listener
    pub fn connect_update(&mut self, listener: impl UpdateListener + 'static) -> ListenerId {
        self.update_event.connect(listener)
    }

    /// Whether the scene is paused
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Pause or resume the scene
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Frame timer
    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    /// Advance the timer by the wall clock and emit one update event
    pub fn update(&mut self, respect_pause: bool) -> UpdateEvent {
        self.timer.update();
        self.emit_update(respect_pause)
    }

    /// Advance the timer by `delta_time` seconds and emit one update event
    pub fn update_with_delta(&mut self, delta_time: f32, respect_pause: bool) -> UpdateEvent {
        self.timer.advance(delta_time);
        self.emit_update(respect_pause)
    }

    fn emit_update(&mut self, respect_pause: bool) -> UpdateEvent {
        let event = UpdateEvent {
            delta_time: self.timer.delta_time(),
            paused: respect_pause && self.paused,
            frame: self.timer.frame_count(),
        };
        self.update_event.emit(&mut self.graph, &event);
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::NodeKind;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_single_active_process() {
        let mut tracker = ProcessTracker::new();
        assert!(tracker.start_process());
        let counter = tracker.process_counter();

        assert!(!tracker.start_process());
        assert_eq!(tracker.process_counter(), counter);
        assert!(tracker.is_process_active());

        assert!(tracker.end_process());
        assert!(!tracker.end_process());
    }

    #[test]
    fn test_touch_once_per_process() {
        let mut context = SceneContext::new();
        let root = context.root();
        let node = context.graph_mut().create_node(root, "Cube", NodeKind::Object).unwrap();

        assert!(!context.touch_node(node));

        assert!(context.start_process());
        assert!(!context.is_node_touched(node));
        assert!(context.touch_node(node));
        assert!(!context.touch_node(node));
        assert!(context.is_node_touched(node));
        assert!(context.end_process());

        assert!(!context.is_node_touched(node));
        assert!(context.start_process());
        assert!(context.touch_node(node));
        assert!(context.end_process());
    }

    #[test]
    fn test_failed_start_keeps_touches() {
        let mut context = SceneContext::new();
        let root = context.root();
        let node = context.graph_mut().create_node(root, "Cube", NodeKind::Object).unwrap();

        assert!(context.start_process());
        assert!(context.touch_node(node));
        assert!(!context.start_process());
        assert!(context.is_node_touched(node));
        assert!(!context.touch_node(node));
    }

    #[test]
    fn test_counter_wrap_clears_stamps() {
        let mut context = SceneContext::new();
        let root = context.root();
        let node = context.graph_mut().create_node(root, "Cube", NodeKind::Object).unwrap();

        context.tracker.counter = u32::MAX - 1;
        assert!(context.start_process());
        assert!(context.touch_node(node));
        assert!(context.end_process());

        assert!(context.start_process());
        assert_eq!(context.tracker().process_counter(), 1);
        assert!(context.touch_node(node));
    }

    #[test]
    fn test_deferred_deletion() {
        let mut context = SceneContext::new();
        let root = context.root();
        let room = context.graph_mut().create_node(root, "Room", NodeKind::Container).unwrap();
        let cube = context.graph_mut().create_node(room, "Cube", NodeKind::Object).unwrap();

        assert!(context.start_process());
        assert!(context.delete_node(room, false));
        assert!(!context.delete_node(room, false));

        // Still there until the cleanup
        assert!(context.graph().get(room).unwrap().is_destroying());
        assert!(context.graph().contains(cube));
        assert!(context.graph().children(root).is_empty());
        assert!(context.end_process());

        assert_eq!(context.cleanup(), 2);
        assert!(!context.graph().contains(room));
        assert!(!context.graph().contains(cube));
        assert_eq!(context.cleanup(), 0);
    }

    #[test]
    fn test_protected_nodes() {
        let mut context = SceneContext::new();
        let root = context.root();
        let node = context.graph_mut().create_node(root, "Sky", NodeKind::Object).unwrap();
        context.graph_mut().get_mut(node).unwrap().set_protected(true);

        assert!(!context.delete_node(node, false));
        assert!(context.delete_node(node, true));
        assert!(!context.delete_node(root, true));
    }

    #[test]
    fn test_destroy_node_now() {
        let mut context = SceneContext::new();
        let root = context.root();
        let node = context.graph_mut().create_node(root, "Cube", NodeKind::Object).unwrap();
        assert!(context.delete_node(node, false));

        assert!(context.destroy_node_now(node));
        assert!(context.pending_deletions().is_empty());
        assert!(!context.destroy_node_now(node));
        assert_eq!(context.cleanup(), 0);
    }

    #[test]
    fn test_update_emits_once() {
        let mut context = SceneContext::new();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        context.connect_update(move |_: &mut SceneGraph, event: &UpdateEvent| {
            sink.borrow_mut().push(*event)
        });

        context.update_with_delta(0.5, true);
        context.set_paused(true);
        context.update_with_delta(0.25, true);
        context.update_with_delta(0.25, false);

        let events = events.borrow();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].frame, 1);
        assert!(!events[0].paused);
        assert!(events[1].paused);
        assert!(!events[2].paused);
        assert_eq!(events[2].delta_time, 0.25);
    }
}
