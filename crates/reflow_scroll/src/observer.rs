//! Scroll observation strategy seam
//!
//! One trait, two implementations: the declarative geometry-event path and
//! the legacy introspection path (feature `introspection`). The tracker
//! selects one at mount time and never looks behind the trait again; both
//! deliver [`ScrollGeometry`] through the same callback, so everything
//! downstream is path-agnostic.

use std::sync::Arc;

use reflow_core::Point;

use crate::attributes::ScrollGeometry;

/// Callback receiving observed geometry snapshots
pub type GeometryCallback = Arc<dyn Fn(ScrollGeometry) + Send + Sync>;

/// Attachment state of an observation strategy
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttachState {
    /// No underlying scroll mechanism resolved yet (or ever)
    Unattached,
    /// Subscribed to declarative geometry events
    DeclarativeAttached,
    /// Scroll model located via the view-tree walk, property observers live
    IntrospectionAttached,
}

/// A capability-selected scroll observation mechanism
///
/// `start` acquires subscriptions/observers and `stop` releases them;
/// implementations also release on `Drop`, but the tracker calls `stop`
/// explicitly at teardown. All methods are safe in the unresolved state:
/// `current_offset` returns `None` and `scroll_to` is accepted as a no-op.
pub trait ScrollObserver: Send + Sync {
    /// Begin observing; geometry changes are delivered to `on_change`
    fn start(&self, on_change: GeometryCallback);

    /// Release subscriptions and observers (idempotent)
    fn stop(&self);

    /// Live scroll offset, `None` while unresolved
    fn current_offset(&self) -> Option<Point>;

    /// Move the scroll position; silently ignored while unresolved
    fn scroll_to(&self, point: Point);

    /// Current attachment state
    fn attach_state(&self) -> AttachState;
}

/// Observer for hosts with no scroll mechanism at all
///
/// Used when geometry events are unavailable and the crate is built without
/// the `introspection` feature: permanently unresolved, by contract.
#[derive(Debug, Default)]
pub struct NullObserver;

impl ScrollObserver for NullObserver {
    fn start(&self, _on_change: GeometryCallback) {}

    fn stop(&self) {}

    fn current_offset(&self) -> Option<Point> {
        None
    }

    fn scroll_to(&self, _point: Point) {}

    fn attach_state(&self) -> AttachState {
        AttachState::Unattached
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_observer_degrades() {
        let observer = NullObserver;
        observer.start(Arc::new(|_| panic!("null observer must not deliver")));
        assert_eq!(observer.current_offset(), None);
        observer.scroll_to(Point::new(0.0, 300.0)); // accepted, no effect
        assert_eq!(observer.attach_state(), AttachState::Unattached);
        observer.stop();
    }
}
