//! Scroll attribute tracker
//!
//! The container-decorating component: selects an observation strategy once
//! at mount based on host capabilities, funnels observed geometry into an
//! equality-guarded state slot, measures the viewport from the layout pass,
//! and publishes a fresh [`ScrollAttributes`] bundle into a child
//! [`ScrollScope`] each render. Everything below the strategy seam is
//! path-agnostic: a state write happens only for a distinct snapshot, so a
//! re-delivered value never costs a render pass.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use reflow_core::reactive::{DirtyFlag, ReactiveGraph, SharedReactiveGraph, State};
use reflow_core::Size;

use crate::attributes::{PositionBinding, ScrollAttributes, ScrollGeometry};
use crate::capability::Capabilities;
use crate::declarative::DeclarativeObserver;
use crate::hub::{GeometryEvents, REORDER_SPACE};
use crate::observer::{AttachState, ScrollObserver};
use crate::queue::UiQueue;
use crate::scope::ScrollScope;
use crate::tree::{SharedViewTree, ViewNodeId};

#[cfg(not(feature = "introspection"))]
use crate::observer::NullObserver;

/// Host resources a tracker mounts against
///
/// Cloning yields handles to the same graph, hub, tree, and queue.
#[derive(Clone)]
pub struct TrackerEnv {
    pub reactive: SharedReactiveGraph,
    pub dirty: DirtyFlag,
    pub hub: GeometryEvents,
    pub tree: SharedViewTree,
    pub queue: UiQueue,
    pub capabilities: Capabilities,
}

impl TrackerEnv {
    /// Environment with fresh reactive graph, hub, and queue for a tree
    pub fn new(tree: SharedViewTree) -> Self {
        Self {
            reactive: Arc::new(Mutex::new(ReactiveGraph::new())),
            dirty: Arc::new(AtomicBool::new(false)),
            hub: GeometryEvents::new(),
            tree,
            queue: UiQueue::new(),
            capabilities: Capabilities::detect(),
        }
    }

    /// Override the detected capabilities (embedding hosts, tests)
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }
}

/// Observation/propagation component decorating one scroll container
pub struct ScrollTracker {
    tree: SharedViewTree,
    container: ViewNodeId,
    snapshot: State<ScrollGeometry>,
    position: PositionBinding,
    observer: Arc<dyn ScrollObserver>,
}

impl ScrollTracker {
    /// Mount a tracker on a scroll container node
    ///
    /// The capability check happens here, once; the selected strategy is
    /// started with the equality-guarded snapshot writer and not revisited.
    pub fn mount(env: &TrackerEnv, container: ViewNodeId) -> Self {
        let snapshot = State::create(
            ScrollGeometry::default(),
            Arc::clone(&env.reactive),
            Arc::clone(&env.dirty),
        );
        let position = PositionBinding::new(State::create(
            None,
            Arc::clone(&env.reactive),
            Arc::clone(&env.dirty),
        ));

        let observer = select_observer(env, container, position.clone());
        let writer = snapshot.clone();
        observer.start(Arc::new(move |geometry| {
            writer.set_if_changed(geometry);
        }));

        Self {
            tree: Arc::clone(&env.tree),
            container,
            snapshot,
            position,
            observer,
        }
    }

    /// Viewport size from the container's laid-out bounds
    pub fn measured_viewport(&self) -> Size {
        self.tree
            .lock()
            .ok()
            .and_then(|tree| tree.bounds(self.container))
            .map(|bounds| bounds.size)
            .unwrap_or(Size::ZERO)
    }

    /// Build this render pass's attributes bundle
    pub fn attributes(&self) -> ScrollAttributes {
        let snapshot = self.snapshot.get();
        let command = Arc::clone(&self.observer);
        let read = Arc::clone(&self.observer);
        ScrollAttributes {
            position: self.position.clone(),
            viewport_size: self.measured_viewport(),
            content_size: snapshot.content_size,
            offset: snapshot.offset,
            scroll_to: Arc::new(move |point| command.scroll_to(point)),
            current_point: Arc::new(move || read.current_offset()),
        }
    }

    /// Publish the bundle into a child scope for the container's subtree
    pub fn publish(&self, scope: &ScrollScope) -> ScrollScope {
        scope.with_attributes(self.attributes())
    }

    /// Current snapshot value
    pub fn snapshot(&self) -> ScrollGeometry {
        self.snapshot.get()
    }

    /// Snapshot state slot (for observing change notifications)
    pub fn snapshot_state(&self) -> &State<ScrollGeometry> {
        &self.snapshot
    }

    /// The tracker's position binding
    pub fn position(&self) -> &PositionBinding {
        &self.position
    }

    /// Attachment state of the active strategy
    pub fn attach_state(&self) -> AttachState {
        self.observer.attach_state()
    }

    /// Release the strategy's subscriptions and observers
    pub fn unmount(&self) {
        self.observer.stop();
    }
}

impl Drop for ScrollTracker {
    fn drop(&mut self) {
        self.observer.stop();
    }
}

/// Decorate a scroll container with ambient attribute tracking
///
/// The consumer-facing entry point; takes no configuration. The returned
/// tracker publishes into the ambient scope via [`ScrollTracker::publish`].
pub fn track_scroll_attributes(env: &TrackerEnv, container: ViewNodeId) -> ScrollTracker {
    ScrollTracker::mount(env, container)
}

/// Pick the observation strategy for the host's capabilities
///
/// Selection is isolated from both implementations: nothing here leaks back
/// into how either path observes.
fn select_observer(
    env: &TrackerEnv,
    container: ViewNodeId,
    position: PositionBinding,
) -> Arc<dyn ScrollObserver> {
    if env.capabilities.geometry_events {
        tracing::debug!(?container, "tracker using declarative geometry events");
        return Arc::new(DeclarativeObserver::new(
            env.hub.clone(),
            REORDER_SPACE,
            position,
        ));
    }
    fallback_observer(env, container)
}

#[cfg(feature = "introspection")]
fn fallback_observer(env: &TrackerEnv, container: ViewNodeId) -> Arc<dyn ScrollObserver> {
    use crate::introspect::IntrospectionObserver;

    // Plant the probe inside the container's content; the ancestor walk
    // starts at the probe's parent and resolves to the container itself
    let probe = match env.tree.lock() {
        Ok(mut tree) => {
            let probe = tree.new_node(taffy::Style::default());
            tree.add_child(container, probe);
            Some(probe)
        }
        Err(_) => None,
    };
    tracing::debug!(?container, "tracker using scroll introspection");
    match probe {
        Some(probe) => Arc::new(IntrospectionObserver::new(
            Arc::clone(&env.tree),
            probe,
            env.queue.clone(),
        )),
        None => Arc::new(crate::observer::NullObserver),
    }
}

#[cfg(not(feature = "introspection"))]
fn fallback_observer(_env: &TrackerEnv, container: ViewNodeId) -> Arc<dyn ScrollObserver> {
    tracing::debug!(?container, "no scroll mechanism available, degrading");
    Arc::new(NullObserver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ScrollModel;
    use crate::tree::ViewTree;
    use reflow_core::Point;
    use std::sync::atomic::Ordering;
    use taffy::prelude::length;
    use taffy::Style;

    fn sized(width: f32, height: f32) -> Style {
        Style {
            size: taffy::Size {
                width: length(width),
                height: length(height),
            },
            ..Default::default()
        }
    }

    fn geometry(content_height: f32, y: f32) -> ScrollGeometry {
        ScrollGeometry::new(Size::new(320.0, content_height), Point::new(0.0, y))
    }

    /// Legacy host: scroll container with an imperative model, mounted
    fn legacy_fixture() -> (TrackerEnv, ViewNodeId, ScrollModel) {
        let tree = ViewTree::shared();
        let model = ScrollModel::new();
        model.set_viewport_size(Size::new(320.0, 480.0));
        model.set_content_size(Size::new(320.0, 2000.0));

        let container = {
            let mut tree = tree.lock().unwrap();
            let container = tree.new_scroll_node(sized(320.0, 480.0), model.clone());
            tree.set_window_root(container);
            container
        };

        let env = TrackerEnv::new(tree).with_capabilities(Capabilities::legacy());
        (env, container, model)
    }

    /// Modern host: declarative geometry events available
    fn modern_fixture() -> (TrackerEnv, ViewNodeId) {
        let tree = ViewTree::shared();
        let container = {
            let mut tree = tree.lock().unwrap();
            let container = tree.new_node(sized(320.0, 480.0));
            tree.set_window_root(container);
            container
        };
        let env = TrackerEnv::new(tree).with_capabilities(Capabilities::modern());
        (env, container)
    }

    #[test]
    fn test_capability_selection() {
        let (env, container) = modern_fixture();
        let tracker = track_scroll_attributes(&env, container);
        assert_eq!(tracker.attach_state(), AttachState::DeclarativeAttached);

        let (env, container, _model) = legacy_fixture();
        let tracker = track_scroll_attributes(&env, container);
        env.queue.drain();
        assert_eq!(tracker.attach_state(), AttachState::IntrospectionAttached);
    }

    #[test]
    fn test_scenario_a_initial_render_unresolved() {
        let (env, container, _model) = legacy_fixture();
        let tracker = track_scroll_attributes(&env, container);
        env.tree
            .lock()
            .unwrap()
            .compute_layout(container, Size::new(320.0, 480.0));

        // The ancestor walk has not run yet (queue not drained)
        let attrs = tracker.attributes();
        assert_eq!(attrs.viewport_size, Size::new(320.0, 480.0));
        assert_eq!(attrs.current_point(), None);
        attrs.scroll_to(Point::new(0.0, 300.0)); // accepted, no effect
    }

    #[test]
    fn test_scenario_b_observer_fire_publishes_geometry() {
        let (env, container, model) = legacy_fixture();
        let tracker = track_scroll_attributes(&env, container);
        env.queue.drain();

        model.set_offset(Point::new(0.0, 100.0));

        let attrs = tracker.attributes();
        assert_eq!(attrs.offset, Point::new(0.0, 100.0));
        assert_eq!(attrs.content_size, Size::new(320.0, 2000.0));
        assert_eq!(attrs.current_point(), Some(Point::new(0.0, 100.0)));
    }

    #[test]
    fn test_scenario_c_duplicate_fire_suppressed() {
        let (env, container, model) = legacy_fixture();
        let tracker = track_scroll_attributes(&env, container);
        env.queue.drain();

        model.set_offset(Point::new(0.0, 100.0));
        let version = tracker.snapshot_state().version();
        env.dirty.store(false, Ordering::SeqCst);

        // The model suppresses the duplicate at the source; even a re-fired
        // identical snapshot would be equality-suppressed at the state slot
        model.set_offset(Point::new(0.0, 100.0));
        assert!(!tracker
            .snapshot_state()
            .set_if_changed(geometry(2000.0, 100.0)));

        assert_eq!(tracker.snapshot_state().version(), version);
        assert!(!env.dirty.load(Ordering::SeqCst));
    }

    #[test]
    fn test_scenario_d_declarative_scroll_to_eventually_consistent() {
        let (env, container) = modern_fixture();
        let tracker = track_scroll_attributes(&env, container);

        let attrs = tracker.attributes();
        attrs.scroll_to(Point::new(0.0, 300.0));

        // The container applies the request on its next frame and
        // republishes; simulate that frame
        let target = tracker.position().target().unwrap();
        assert_eq!(target, Point::new(0.0, 300.0));
        env.hub.publish(REORDER_SPACE, geometry(2000.0, target.y));

        assert_eq!(tracker.snapshot().offset, Point::new(0.0, 300.0));
        assert_eq!(
            tracker.attributes().current_point(),
            Some(Point::new(0.0, 300.0))
        );
    }

    #[test]
    fn test_path_equivalence() {
        let changes = [
            geometry(2400.0, 0.0),
            geometry(2400.0, 100.0),
            geometry(2400.0, 100.0), // duplicate, must be invisible on both paths
            geometry(2600.0, 100.0),
            geometry(2600.0, 250.0),
        ];

        // Declarative path: publish through the hub
        let (env, container) = modern_fixture();
        let tracker = track_scroll_attributes(&env, container);
        let declarative_seen = observe_snapshots(&env, &tracker);
        for change in changes {
            env.hub.publish(REORDER_SPACE, change);
        }

        // Imperative path: drive the scroll model's properties
        let (env, container, model) = legacy_fixture();
        let tracker = track_scroll_attributes(&env, container);
        env.queue.drain();
        let imperative_seen = observe_snapshots(&env, &tracker);
        for change in changes {
            model.set_content_size(change.content_size);
            model.set_offset(change.offset);
        }

        let declarative = declarative_seen.lock().unwrap().clone();
        let imperative = imperative_seen.lock().unwrap().clone();
        assert_eq!(declarative, imperative);
        assert_eq!(
            declarative,
            vec![
                geometry(2400.0, 0.0),
                geometry(2400.0, 100.0),
                geometry(2600.0, 100.0),
                geometry(2600.0, 250.0),
            ]
        );
    }

    /// Record every distinct snapshot the tracker's state slot takes on
    fn observe_snapshots(
        env: &TrackerEnv,
        tracker: &ScrollTracker,
    ) -> Arc<Mutex<Vec<ScrollGeometry>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let signal = tracker.snapshot_state().signal();
        let initial = tracker.snapshot();
        if let Ok(mut graph) = env.reactive.lock() {
            graph.create_effect(move |g| {
                if let Some(value) = g.get(signal) {
                    let mut seen = seen_clone.lock().unwrap();
                    // Skip the effect's initial run; record changes only
                    if seen.is_empty() && value == initial {
                        return;
                    }
                    seen.push(value);
                }
            });
        }
        seen
    }

    #[test]
    fn test_publish_into_scope() {
        let (env, container, model) = legacy_fixture();
        let tracker = track_scroll_attributes(&env, container);
        env.queue.drain();
        model.set_offset(Point::new(0.0, 100.0));

        let root = ScrollScope::empty();
        assert!(root.attributes().is_none());

        let scope = tracker.publish(&root);
        let attrs = scope.attributes().unwrap();
        assert_eq!(attrs.offset, Point::new(0.0, 100.0));
    }

    #[test]
    fn test_unmount_releases_probe_node() {
        let (env, container, _model) = legacy_fixture();
        let before = env.tree.lock().unwrap().node_count();

        let tracker = track_scroll_attributes(&env, container);
        env.queue.drain();
        assert_eq!(env.tree.lock().unwrap().node_count(), before + 1);

        tracker.unmount();
        assert_eq!(env.tree.lock().unwrap().node_count(), before);

        // Repeated cycles leave no residue either
        for _ in 0..3 {
            let tracker = track_scroll_attributes(&env, container);
            env.queue.drain();
            drop(tracker);
        }
        assert_eq!(env.tree.lock().unwrap().node_count(), before);
    }

    #[test]
    fn test_unmount_stops_observing() {
        let (env, container, model) = legacy_fixture();
        let tracker = track_scroll_attributes(&env, container);
        env.queue.drain();

        tracker.unmount();
        assert_eq!(tracker.attach_state(), AttachState::Unattached);

        model.set_offset(Point::new(0.0, 100.0));
        assert_eq!(tracker.snapshot(), ScrollGeometry::default());
    }
}
