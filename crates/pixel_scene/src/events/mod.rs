//! Per-frame update event
//!
//! The scene context broadcasts one [`UpdateEvent`] per tick through
//! [`EventUpdate`]. Key principles:
//! - Listeners are notified in subscription order
//! - Every listener sees the event (no consumption)
//! - Listeners get mutable access to the scene graph to drive node modifiers

use crate::scene::SceneGraph;

/// Update tick arguments
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateEvent {
    /// Seconds since the previous tick
    pub delta_time: f32,
    /// Whether the scene is paused; only `NO_PAUSE` work should continue
    pub paused: bool,
    /// Tick number, starting at 1
    pub frame: u64,
}

/// Update listener trait
pub trait UpdateListener {
    /// Handle one update tick
    fn on_update(&mut self, graph: &mut SceneGraph, event: &UpdateEvent);
}

impl<F> UpdateListener for F
where
    F: FnMut(&mut SceneGraph, &UpdateEvent),
{
    fn on_update(&mut self, graph: &mut SceneGraph, event: &UpdateEvent) {
        self(graph, event)
    }
}

/// Handle returned by [`EventUpdate::connect`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Update signal with its connected listeners
#[derive(Default)]
pub struct EventUpdate {
    listeners: Vec<(ListenerId, Box<dyn UpdateListener>)>,
    next_id: u64,
}

impl std::fmt::Debug for EventUpdate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventUpdate")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl EventUpdate {
    /// Create a signal without listeners
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect a listener, it is notified after all previously connected ones
    pub fn connect(&mut self, listener: impl UpdateListener + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Disconnect a listener, returns false if it was not connected
    pub fn disconnect(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener, _)| *listener != id);
        self.listeners.len() != before
    }

    /// Notify every listener in subscription order
    pub fn emit(&mut self, graph: &mut SceneGraph, event: &UpdateEvent) {
        for (_, listener) in self.listeners.iter_mut() {
            listener.on_update(graph, event);
        }
    }

    /// Number of connected listeners
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Whether no listener is connected
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}
