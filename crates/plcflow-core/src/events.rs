//! Change notifications from the canvas to its collaborators.

use crate::block::BlockId;
use crate::wire::WireId;

/// A structural change on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanvasEvent {
    BlockAdded(BlockId),
    BlockMoved(BlockId),
    BlockRemoved(BlockId),
    WireAdded(WireId),
    WireRemoved(WireId),
    /// A wire kept its endpoints but changed shape.
    WireReshaped(WireId),
    /// Everything except the start block was removed.
    Cleared,
    /// The canvas was replaced by an imported document.
    Loaded,
}

impl CanvasEvent {
    /// Whether the event makes the project differ from its saved state.
    pub fn is_modification(&self) -> bool {
        !matches!(self, CanvasEvent::Loaded)
    }
}

/// Callback invoked synchronously after each canvas mutation.
pub type Listener = Box<dyn FnMut(&CanvasEvent)>;

/// Ordered list of listeners.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<Listener>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&CanvasEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn emit(&mut self, event: CanvasEvent) {
        log::trace!("canvas event {event:?}");
        for listener in &mut self.listeners {
            listener(&event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus").field("listeners", &self.listeners.len()).finish()
    }
}

/// Optional capability of a collaborator that can reload its own state.
///
/// Components either implement this or they don't; callers obtain it through
/// an explicit accessor rather than probing at call time.
pub trait Refreshable {
    /// Reload state. Returns true when anything changed.
    fn refresh(&mut self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use uuid::Uuid;

    #[test]
    fn test_listeners_run_in_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();
        for tag in ["first", "second"] {
            let seen = seen.clone();
            bus.subscribe(move |_| seen.borrow_mut().push(tag));
        }
        bus.emit(CanvasEvent::Cleared);
        assert_eq!(*seen.borrow(), vec!["first", "second"]);
        assert_eq!(bus.len(), 2);
    }

    #[test]
    fn test_loaded_is_not_a_modification() {
        assert!(!CanvasEvent::Loaded.is_modification());
        assert!(CanvasEvent::WireAdded(Uuid::new_v4()).is_modification());
        assert!(CanvasEvent::Cleared.is_modification());
    }
}
