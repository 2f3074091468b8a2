//! Geometry-change event hub for the declarative path
//!
//! Scroll containers that support declarative geometry observation publish
//! [`ScrollGeometry`] values here, keyed by a named coordinate space. The
//! declarative observer subscribes under the same name and receives every
//! change in container-local coordinates. Consumers translating drag
//! coordinates must use the same [`CoordinateSpace`] identifier.

use std::sync::{Arc, Mutex};

use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};

use crate::attributes::ScrollGeometry;

/// Named coordinate space tagging a scroll container's geometry read-outs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CoordinateSpace(pub &'static str);

/// The well-known coordinate space used by reorder autoscroll tracking
pub const REORDER_SPACE: CoordinateSpace = CoordinateSpace("reflow.reorder-scroll");

new_key_type! {
    /// Identifier for a hub subscription
    pub struct SubscriptionId;
}

/// Callback receiving geometry changes
pub type GeometryListener = Arc<dyn Fn(ScrollGeometry) + Send + Sync>;

#[derive(Default)]
struct Channel {
    /// Last published geometry, for late subscribers and direct reads
    last: Option<ScrollGeometry>,
    listeners: SlotMap<SubscriptionId, GeometryListener>,
}

/// Hub of geometry-change channels keyed by coordinate space
///
/// Cloning yields another handle to the same hub.
#[derive(Clone, Default)]
pub struct GeometryEvents {
    channels: Arc<Mutex<FxHashMap<CoordinateSpace, Channel>>>,
}

impl GeometryEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a geometry change for a coordinate space
    ///
    /// Re-publishing the value already stored is suppressed; listeners only
    /// see distinct values.
    pub fn publish(&self, space: CoordinateSpace, geometry: ScrollGeometry) {
        let listeners = {
            let Ok(mut channels) = self.channels.lock() else {
                return;
            };
            let channel = channels.entry(space).or_default();
            if channel.last == Some(geometry) {
                return;
            }
            channel.last = Some(geometry);
            channel
                .listeners
                .values()
                .cloned()
                .collect::<Vec<GeometryListener>>()
        };
        tracing::trace!(space = space.0, ?geometry, "geometry published");
        for listener in listeners {
            listener(geometry);
        }
    }

    /// Last geometry published for a coordinate space
    pub fn last(&self, space: CoordinateSpace) -> Option<ScrollGeometry> {
        self.channels
            .lock()
            .ok()?
            .get(&space)
            .and_then(|c| c.last)
    }

    /// Subscribe to geometry changes for a coordinate space
    ///
    /// The returned subscription releases the listener when dropped (or
    /// explicitly via [`GeometrySubscription::unsubscribe`]).
    pub fn subscribe(
        &self,
        space: CoordinateSpace,
        listener: GeometryListener,
    ) -> GeometrySubscription {
        let id = self
            .channels
            .lock()
            .ok()
            .map(|mut channels| channels.entry(space).or_default().listeners.insert(listener));
        GeometrySubscription {
            hub: self.clone(),
            space,
            id,
        }
    }

    fn remove(&self, space: CoordinateSpace, id: SubscriptionId) {
        if let Ok(mut channels) = self.channels.lock() {
            if let Some(channel) = channels.get_mut(&space) {
                channel.listeners.remove(id);
            }
        }
    }
}

/// Scoped handle to a hub subscription; unsubscribes on drop
pub struct GeometrySubscription {
    hub: GeometryEvents,
    space: CoordinateSpace,
    id: Option<SubscriptionId>,
}

impl GeometrySubscription {
    /// Release the listener now instead of at drop time
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(id) = self.id.take() {
            self.hub.remove(self.space, id);
        }
    }
}

impl Drop for GeometrySubscription {
    fn drop(&mut self) {
        self.release();
    }
}
