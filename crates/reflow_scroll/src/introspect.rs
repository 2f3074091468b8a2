//! Imperative scroll introspection (path B, feature `introspection`)
//!
//! The legacy fallback for hosts without declarative geometry events. A
//! probe node is planted inside the decorated container's content; once the
//! rendering layer signals that the probe has joined the display hierarchy,
//! the ancestor walk is posted to the UI queue (one turn later, so the
//! hierarchy has settled) and climbs to the first scroll node. On success,
//! one offset observer and one content-size observer attach to that node's
//! [`ScrollModel`], funneling snapshots into the same callback the
//! declarative path uses.
//!
//! Finding no scroll ancestor is not an error: the observer stays
//! `Unattached` and degrades to no-op/`None`. The walk re-runs on every
//! subsequent attach signal, which covers moves to a different hierarchy.

use std::sync::{Arc, Mutex, Weak};

use reflow_core::Point;

use crate::attributes::ScrollGeometry;
use crate::model::{ObserverId, ScrollModel};
use crate::observer::{AttachState, GeometryCallback, ScrollObserver};
use crate::queue::UiQueue;
use crate::tree::{AttachListenerId, SharedViewTree, ViewNodeId, ViewTree};

struct Attachment {
    /// The scroll node the walk resolved to
    node: ViewNodeId,
    model: ScrollModel,
    offset_observer: ObserverId,
    content_observer: ObserverId,
}

impl Attachment {
    fn release(self) {
        self.model.remove_offset_observer(self.offset_observer);
        self.model.remove_content_size_observer(self.content_observer);
    }
}

#[derive(Default)]
struct IntrospectionState {
    on_change: Option<GeometryCallback>,
    attachment: Option<Attachment>,
    listener: Option<AttachListenerId>,
}

/// Geometry observer backed by view-tree introspection
pub struct IntrospectionObserver {
    tree: SharedViewTree,
    probe: ViewNodeId,
    queue: UiQueue,
    state: Arc<Mutex<IntrospectionState>>,
}

impl IntrospectionObserver {
    /// Create an observer for a probe node inside the container's content
    pub fn new(tree: SharedViewTree, probe: ViewNodeId, queue: UiQueue) -> Self {
        Self {
            tree,
            probe,
            queue,
            state: Arc::new(Mutex::new(IntrospectionState::default())),
        }
    }

    /// Run the ancestor search and (re)attach property observers
    ///
    /// Runs on the UI queue, one turn after the attach signal.
    fn run_walk(tree: Weak<Mutex<ViewTree>>, probe: ViewNodeId, state: Arc<Mutex<IntrospectionState>>) {
        let Some(tree) = tree.upgrade() else {
            return;
        };
        let found = tree
            .lock()
            .ok()
            .and_then(|tree| tree.find_scroll_ancestor(probe));

        let Ok(mut state) = state.lock() else {
            return;
        };
        let Some((node, model)) = found else {
            // Plain hierarchy with no scrollable ancestor: stay (or become)
            // unattached until the next hierarchy change
            if let Some(old) = state.attachment.take() {
                tracing::debug!(?probe, "scroll ancestor lost, detaching");
                old.release();
            }
            return;
        };

        if state.attachment.as_ref().map(|a| a.node) == Some(node) {
            return; // Same scroll node, observers already live
        }
        if let Some(old) = state.attachment.take() {
            old.release();
        }
        let Some(on_change) = state.on_change.clone() else {
            return;
        };

        let offset_cb = Arc::clone(&on_change);
        let model_for_offset = model.clone();
        let Some(offset_observer) = model.observe_offset(Arc::new(move |offset| {
            offset_cb(ScrollGeometry::new(model_for_offset.content_size(), offset));
        })) else {
            return;
        };

        let content_cb = on_change;
        let model_for_content = model.clone();
        let Some(content_observer) = model.observe_content_size(Arc::new(move |size| {
            content_cb(ScrollGeometry::new(size, model_for_content.offset()));
        })) else {
            model.remove_offset_observer(offset_observer);
            return;
        };

        tracing::debug!(?probe, scroll = ?node, "introspection attached");
        state.attachment = Some(Attachment {
            node,
            model,
            offset_observer,
            content_observer,
        });
    }
}

impl ScrollObserver for IntrospectionObserver {
    fn start(&self, on_change: GeometryCallback) {
        if let Ok(mut state) = self.state.lock() {
            state.on_change = Some(on_change);
        }

        // Weak tree reference: the listener lives inside the tree and must
        // not keep it alive
        let tree_weak = Arc::downgrade(&self.tree);
        let probe = self.probe;
        let queue = self.queue.clone();
        let state = Arc::clone(&self.state);

        let listener_id = self.tree.lock().ok().map(|mut tree| {
            tree.on_attached(
                probe,
                Arc::new(move || {
                    let tree_weak = tree_weak.clone();
                    let state = Arc::clone(&state);
                    // Defer the walk one turn so the hierarchy settles
                    queue.post(move || Self::run_walk(tree_weak, probe, state));
                }),
            )
        });
        if let Ok(mut state) = self.state.lock() {
            state.listener = listener_id;
        }
    }

    fn stop(&self) {
        let (listener, attachment) = match self.state.lock() {
            Ok(mut state) => {
                state.on_change = None;
                (state.listener.take(), state.attachment.take())
            }
            Err(_) => (None, None),
        };
        if let Ok(mut tree) = self.tree.lock() {
            if let Some(listener) = listener {
                tree.remove_attach_listener(listener);
            }
            // The probe was planted for this observer; reclaim it so
            // mount/unmount cycles leave no residue in the tree
            tree.remove_node(self.probe);
        }
        if let Some(attachment) = attachment {
            attachment.release();
        }
    }

    fn current_offset(&self) -> Option<Point> {
        let state = self.state.lock().ok()?;
        state.attachment.as_ref().map(|a| a.model.offset())
    }

    fn scroll_to(&self, point: Point) {
        let model = self
            .state
            .lock()
            .ok()
            .and_then(|s| s.attachment.as_ref().map(|a| a.model.clone()));
        // Unresolved: accepted as a no-op
        if let Some(model) = model {
            model.set_offset(point);
        }
    }

    fn attach_state(&self) -> AttachState {
        let attached = self
            .state
            .lock()
            .map(|s| s.attachment.is_some())
            .unwrap_or(false);
        if attached {
            AttachState::IntrospectionAttached
        } else {
            AttachState::Unattached
        }
    }
}

impl Drop for IntrospectionObserver {
    fn drop(&mut self) {
        self.stop();
    }
}
