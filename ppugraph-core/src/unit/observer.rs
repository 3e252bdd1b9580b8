//! Observer hooks for units.
//!
//! An Observer is a callback that wants to hear about changes to a unit's
//! derived state: new inputs, a resized viewport, a shader coming or going.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::render::Viewport;

/// Unique identifier for an observer.
///
/// Returned by [`crate::unit::Unit::subscribe`] and used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

impl ObserverId {
    /// Generate a new unique observer ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ObserverId {
    fn default() -> Self {
        Self::new()
    }
}

/// What changed on a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitEvent {
    /// Input resolution bound at least one slot.
    InputChanged,

    /// The viewport was resized from a reference input.
    ViewportChanged(Viewport),

    /// The shader was enabled in the unit's render state.
    ShaderAssigned,

    /// The previously assigned shader was disabled.
    ShaderRemoved,
}

/// A callback subscribed to one unit.
pub struct Observer {
    id: ObserverId,
    /// The callback to invoke for each event.
    notify: Box<dyn Fn(&UnitEvent) + Send + Sync>,
}

impl Observer {
    /// Create a new observer with the given callback.
    pub fn new<F>(notify: F) -> Self
    where
        F: Fn(&UnitEvent) + Send + Sync + 'static,
    {
        Self {
            id: ObserverId::new(),
            notify: Box::new(notify),
        }
    }

    /// Get the observer's unique ID.
    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Deliver an event.
    pub fn notify(&self, event: &UnitEvent) {
        (self.notify)(event);
    }
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn observer_ids_are_unique() {
        let id1 = ObserverId::new();
        let id2 = ObserverId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn observer_notify_calls_callback() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();

        let observer = Observer::new(move |event| {
            seen_clone.lock().unwrap().push(*event);
        });

        observer.notify(&UnitEvent::ShaderAssigned);
        observer.notify(&UnitEvent::ViewportChanged(Viewport::new(0, 0, 2, 2)));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                UnitEvent::ShaderAssigned,
                UnitEvent::ViewportChanged(Viewport::new(0, 0, 2, 2))
            ]
        );
    }
}
