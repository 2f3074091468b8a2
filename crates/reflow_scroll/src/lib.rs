//! Reflow Scroll Attributes
//!
//! Ambient scroll geometry for containers that need to react to scrolling
//! without owning the scroll container, drag-to-reorder autoscroll being the
//! driving case. A container decorated with [`track_scroll_attributes`]
//! publishes a [`ScrollAttributes`] bundle into its subtree's
//! [`ScrollScope`]; descendants read viewport size, content size, and the
//! live offset, and can command a scroll through the bundle's callbacks.
//!
//! # Example
//!
//! ```rust
//! use reflow_scroll::prelude::*;
//!
//! let tree = ViewTree::shared();
//! let (container, model) = {
//!     let mut tree = tree.lock().unwrap();
//!     let model = ScrollModel::new();
//!     let node = tree.new_scroll_node(Default::default(), model.clone());
//!     tree.set_window_root(node);
//!     (node, model)
//! };
//!
//! let env = TrackerEnv::new(tree).with_capabilities(Capabilities::legacy());
//! let tracker = track_scroll_attributes(&env, container);
//! env.queue.drain();
//!
//! let scope = tracker.publish(&ScrollScope::empty());
//! if let Some(attrs) = scope.attributes() {
//!     attrs.scroll_to(Point::new(0.0, 120.0));
//! }
//! # let _ = model;
//! ```
//!
//! Geometry reaches the tracker over one of two paths, selected once at
//! mount by [`Capabilities`]: a declarative subscription to the
//! [`GeometryEvents`] hub, or (behind the `introspection` feature) a
//! deferred walk up the view tree to the nearest scroll container's
//! [`ScrollModel`]. Both paths funnel into the same equality-guarded state
//! slot, so consumers cannot tell them apart.

pub mod attributes;
pub mod capability;
pub mod declarative;
pub mod hub;
pub mod model;
pub mod observer;
pub mod queue;
pub mod scope;
pub mod tracker;
pub mod tree;

#[cfg(feature = "introspection")]
pub mod introspect;

// Attribute bundle and geometry snapshot
pub use attributes::{
    CurrentPointFn, PositionBinding, ScrollAttributes, ScrollGeometry, ScrollToFn,
};

// Ambient propagation
pub use scope::ScrollScope;

// Geometry event hub
pub use hub::{CoordinateSpace, GeometryEvents, GeometrySubscription, SubscriptionId, REORDER_SPACE};

// Observation strategies
pub use observer::{AttachState, GeometryCallback, NullObserver, ScrollObserver};

pub use declarative::DeclarativeObserver;

#[cfg(feature = "introspection")]
pub use introspect::IntrospectionObserver;

// Imperative scroll container state
pub use model::{ObserverId, ScrollModel};

// View tree and attachment
pub use tree::{AttachListenerId, SharedViewTree, ViewNodeId, ViewTree};

// Host plumbing
pub use capability::Capabilities;
pub use queue::UiQueue;

// The tracker component
pub use tracker::{track_scroll_attributes, ScrollTracker, TrackerEnv};

// Re-export the geometry primitives consumers pattern against
pub use reflow_core::{Point, Rect, Size};

/// Prelude module - import everything commonly needed
pub mod prelude {
    pub use crate::attributes::{PositionBinding, ScrollAttributes, ScrollGeometry};
    pub use crate::capability::Capabilities;
    pub use crate::hub::{CoordinateSpace, GeometryEvents, REORDER_SPACE};
    pub use crate::model::ScrollModel;
    pub use crate::observer::{AttachState, ScrollObserver};
    pub use crate::queue::UiQueue;
    pub use crate::scope::ScrollScope;
    pub use crate::tracker::{track_scroll_attributes, ScrollTracker, TrackerEnv};
    pub use crate::tree::{SharedViewTree, ViewNodeId, ViewTree};
    pub use reflow_core::{Point, Rect, Size};
}
