//! Declarative geometry observation (path A)
//!
//! Subscribes to the geometry event hub under the container's coordinate
//! space. Scroll commands go through the position binding: the container
//! applies the requested position on its next frame and republishes
//! geometry, so the post-`scroll_to` offset is eventually consistent with
//! the hub, never same-frame.

use std::sync::{Arc, Mutex};

use reflow_core::Point;

use crate::attributes::{PositionBinding, ScrollGeometry};
use crate::hub::{CoordinateSpace, GeometryEvents, GeometrySubscription};
use crate::observer::{AttachState, GeometryCallback, ScrollObserver};

struct DeclarativeState {
    subscription: Option<GeometrySubscription>,
    /// Last geometry delivered through the subscription
    last: Option<ScrollGeometry>,
    /// Requested target not yet superseded by a geometry notification
    pending: Option<Point>,
}

/// Geometry observer backed by the declarative event hub
pub struct DeclarativeObserver {
    hub: GeometryEvents,
    space: CoordinateSpace,
    position: PositionBinding,
    state: Arc<Mutex<DeclarativeState>>,
}

impl DeclarativeObserver {
    pub fn new(hub: GeometryEvents, space: CoordinateSpace, position: PositionBinding) -> Self {
        Self {
            hub,
            space,
            position,
            state: Arc::new(Mutex::new(DeclarativeState {
                subscription: None,
                last: None,
                pending: None,
            })),
        }
    }
}

impl ScrollObserver for DeclarativeObserver {
    fn start(&self, on_change: GeometryCallback) {
        let state = Arc::clone(&self.state);
        let subscription = self.hub.subscribe(
            self.space,
            Arc::new(move |geometry| {
                if let Ok(mut state) = state.lock() {
                    state.last = Some(geometry);
                    // The container has republished since the request; from
                    // here the observed geometry is the live answer
                    state.pending = None;
                }
                on_change(geometry);
            }),
        );
        if let Ok(mut state) = self.state.lock() {
            state.subscription = Some(subscription);
        }
        tracing::debug!(space = self.space.0, "declarative observer subscribed");
    }

    fn stop(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.subscription.take();
        }
    }

    fn current_offset(&self) -> Option<Point> {
        // A scroll just requested is the best available answer until the
        // container republishes; after that the observed geometry wins
        let state = self.state.lock().ok()?;
        state.pending.or(state.last.map(|g| g.offset))
    }

    fn scroll_to(&self, point: Point) {
        if let Ok(mut state) = self.state.lock() {
            state.pending = Some(point);
        }
        self.position.request(point);
    }

    fn attach_state(&self) -> AttachState {
        let subscribed = self
            .state
            .lock()
            .map(|s| s.subscription.is_some())
            .unwrap_or(false);
        if subscribed {
            AttachState::DeclarativeAttached
        } else {
            AttachState::Unattached
        }
    }
}

impl Drop for DeclarativeObserver {
    fn drop(&mut self) {
        self.stop();
    }
}
