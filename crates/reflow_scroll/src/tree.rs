//! Rendered view tree
//!
//! Taffy-backed node tree standing in for the host's rendered hierarchy.
//! Nodes are created against taffy styles, parented, and laid out; the
//! tracker queries per-node bounds for viewport measurement. Scroll nodes
//! additionally carry a [`ScrollModel`] handle, which is what the
//! introspection walk looks for when climbing the parent chain.
//!
//! Attachment: a node is attached once it is reachable from the mounted
//! window root. Attach listeners fire when that becomes true, and fire
//! again each time the node re-enters the hierarchy (reparenting included),
//! which is what lets the introspection path re-run its ancestor search
//! after a move.

use std::sync::{Arc, Mutex};

use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use taffy::prelude::*;

use reflow_core::{Rect, Size as CoreSize};

use crate::model::ScrollModel;

new_key_type! {
    /// Unique identifier for a view node
    pub struct ViewNodeId;
    /// Identifier for a registered attach listener
    pub struct AttachListenerId;
}

/// Callback fired when a node joins the display hierarchy
pub type AttachListener = Arc<dyn Fn() + Send + Sync>;

/// Shared view tree handle
pub type SharedViewTree = Arc<Mutex<ViewTree>>;

/// The view tree: taffy layout nodes plus scroll markers and attachment
pub struct ViewTree {
    taffy: TaffyTree<()>,
    /// Our IDs -> taffy nodes
    node_map: SlotMap<ViewNodeId, NodeId>,
    /// Reverse lookup for parent-chain walks
    reverse_map: FxHashMap<NodeId, ViewNodeId>,
    /// Scroll nodes and their models
    scroll_models: FxHashMap<ViewNodeId, ScrollModel>,
    /// Attach listeners keyed by the node they watch
    attach_listeners: SlotMap<AttachListenerId, (ViewNodeId, AttachListener)>,
    /// The mounted window root, if any
    window_root: Option<ViewNodeId>,
}

impl ViewTree {
    pub fn new() -> Self {
        Self {
            taffy: TaffyTree::new(),
            node_map: SlotMap::with_key(),
            reverse_map: FxHashMap::default(),
            scroll_models: FxHashMap::default(),
            attach_listeners: SlotMap::with_key(),
            window_root: None,
        }
    }

    /// Create a shared tree handle
    pub fn shared() -> SharedViewTree {
        Arc::new(Mutex::new(Self::new()))
    }

    // =========================================================================
    // Construction
    // =========================================================================

    /// Create a plain node with the given style
    pub fn new_node(&mut self, style: Style) -> ViewNodeId {
        let taffy_node = self.taffy.new_leaf(style).unwrap();
        let id = self.node_map.insert(taffy_node);
        self.reverse_map.insert(taffy_node, id);
        id
    }

    /// Create a scroll node carrying an imperative scroll model
    pub fn new_scroll_node(&mut self, style: Style, model: ScrollModel) -> ViewNodeId {
        let id = self.new_node(style);
        self.scroll_models.insert(id, model);
        id
    }

    /// Parent a node; fires attach listeners for the child's subtree when
    /// this makes it reachable from the window root
    pub fn add_child(&mut self, parent: ViewNodeId, child: ViewNodeId) {
        if let (Some(&parent_node), Some(&child_node)) =
            (self.node_map.get(parent), self.node_map.get(child))
        {
            let _ = self.taffy.add_child(parent_node, child_node);
            if self.is_attached(parent) {
                self.notify_subtree_attached(child);
            }
        }
    }

    /// Detach a node from its parent (the subtree stays alive, unattached)
    pub fn remove_child(&mut self, parent: ViewNodeId, child: ViewNodeId) {
        if let (Some(&parent_node), Some(&child_node)) =
            (self.node_map.get(parent), self.node_map.get(child))
        {
            let _ = self.taffy.remove_child(parent_node, child_node);
        }
    }

    /// Remove a node from the tree entirely
    ///
    /// Releases the taffy node, both id maps, any scroll-model marker, and
    /// any attach listeners watching the node. Children are detached, not
    /// removed. Removing a node twice is a no-op.
    pub fn remove_node(&mut self, node: ViewNodeId) {
        if let Some(taffy_node) = self.node_map.remove(node) {
            self.reverse_map.remove(&taffy_node);
            self.scroll_models.remove(&node);
            let _ = self.taffy.remove(taffy_node);
        }
        self.attach_listeners.retain(|_, (watched, _)| *watched != node);
        if self.window_root == Some(node) {
            self.window_root = None;
        }
    }

    /// Number of live nodes
    pub fn node_count(&self) -> usize {
        self.node_map.len()
    }

    /// Move a node to a new parent, re-firing attach listeners for its
    /// subtree if the destination hierarchy is attached
    pub fn reparent(&mut self, new_parent: ViewNodeId, child: ViewNodeId) {
        if let Some(old_parent) = self.parent(child) {
            self.remove_child(old_parent, child);
        }
        self.add_child(new_parent, child);
    }

    /// Mount a root into the window; its whole subtree becomes attached
    pub fn set_window_root(&mut self, root: ViewNodeId) {
        self.window_root = Some(root);
        self.notify_subtree_attached(root);
    }

    // =========================================================================
    // Hierarchy queries
    // =========================================================================

    /// Parent of a node, if any
    pub fn parent(&self, node: ViewNodeId) -> Option<ViewNodeId> {
        let &taffy_node = self.node_map.get(node)?;
        let parent = self.taffy.parent(taffy_node)?;
        self.reverse_map.get(&parent).copied()
    }

    /// Whether the node is reachable from the mounted window root
    pub fn is_attached(&self, node: ViewNodeId) -> bool {
        let Some(root) = self.window_root else {
            return false;
        };
        let mut current = Some(node);
        while let Some(id) = current {
            if id == root {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Scroll model of a node, if it is a scroll node
    pub fn scroll_model(&self, node: ViewNodeId) -> Option<ScrollModel> {
        self.scroll_models.get(&node).cloned()
    }

    /// Walk the parent chain upward to the nearest enclosing scroll node
    ///
    /// The search starts at the node's parent; a scroll node never finds
    /// itself. Returns a non-owning model handle alongside the node id.
    pub fn find_scroll_ancestor(&self, node: ViewNodeId) -> Option<(ViewNodeId, ScrollModel)> {
        let mut current = self.parent(node);
        while let Some(id) = current {
            if let Some(model) = self.scroll_models.get(&id) {
                return Some((id, model.clone()));
            }
            current = self.parent(id);
        }
        None
    }

    // =========================================================================
    // Attach listeners
    // =========================================================================

    /// Watch a node for display-hierarchy attachment
    ///
    /// Fires on every attachment, including re-attachment after a move. If
    /// the node is already attached the listener fires immediately, so
    /// late registration still resolves.
    pub fn on_attached(&mut self, node: ViewNodeId, listener: AttachListener) -> AttachListenerId {
        if !self.node_map.contains_key(node) {
            tracing::warn!(?node, "attach listener registered for unknown node");
        }
        let id = self.attach_listeners.insert((node, Arc::clone(&listener)));
        if self.is_attached(node) {
            listener();
        }
        id
    }

    /// Release an attach listener
    pub fn remove_attach_listener(&mut self, id: AttachListenerId) {
        self.attach_listeners.remove(id);
    }

    fn notify_subtree_attached(&mut self, root: ViewNodeId) {
        let subtree = self.collect_subtree(root);
        let listeners: SmallVec<[AttachListener; 4]> = self
            .attach_listeners
            .values()
            .filter(|(node, _)| subtree.contains(node))
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        if !listeners.is_empty() {
            tracing::trace!(?root, count = listeners.len(), "attach listeners firing");
        }
        for listener in listeners {
            listener();
        }
    }

    fn collect_subtree(&self, root: ViewNodeId) -> Vec<ViewNodeId> {
        let mut result = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            result.push(id);
            if let Some(&taffy_node) = self.node_map.get(id) {
                for child in self.taffy.children(taffy_node).unwrap_or_default() {
                    if let Some(&child_id) = self.reverse_map.get(&child) {
                        stack.push(child_id);
                    }
                }
            }
        }
        result
    }

    // =========================================================================
    // Layout
    // =========================================================================

    /// Compute layout for the tree rooted at `root` within available space
    pub fn compute_layout(&mut self, root: ViewNodeId, available: CoreSize) {
        if let Some(&taffy_node) = self.node_map.get(root) {
            let _ = self.taffy.compute_layout(
                taffy_node,
                taffy::Size {
                    width: AvailableSpace::Definite(available.width),
                    height: AvailableSpace::Definite(available.height),
                },
            );
        }
    }

    /// Laid-out bounds of a node (position relative to its parent)
    pub fn bounds(&self, node: ViewNodeId) -> Option<Rect> {
        let &taffy_node = self.node_map.get(node)?;
        let layout = self.taffy.layout(taffy_node).ok()?;
        Some(Rect::new(
            layout.location.x,
            layout.location.y,
            layout.size.width,
            layout.size.height,
        ))
    }
}

impl Default for ViewTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sized(width: f32, height: f32) -> Style {
        Style {
            size: taffy::Size {
                width: length(width),
                height: length(height),
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_parent_chain_and_scroll_ancestor() {
        let mut tree = ViewTree::new();
        let root = tree.new_node(sized(320.0, 480.0));
        let scroll = tree.new_scroll_node(sized(320.0, 480.0), ScrollModel::new());
        let row = tree.new_node(sized(320.0, 40.0));
        let probe = tree.new_node(Style::default());

        tree.add_child(root, scroll);
        tree.add_child(scroll, row);
        tree.add_child(row, probe);

        assert_eq!(tree.parent(probe), Some(row));
        let (found, _model) = tree.find_scroll_ancestor(probe).unwrap();
        assert_eq!(found, scroll);

        // A scroll node does not find itself
        assert!(tree.find_scroll_ancestor(scroll).is_none());
    }

    #[test]
    fn test_no_scroll_ancestor() {
        let mut tree = ViewTree::new();
        let root = tree.new_node(sized(320.0, 480.0));
        let probe = tree.new_node(Style::default());
        tree.add_child(root, probe);

        assert!(tree.find_scroll_ancestor(probe).is_none());
    }

    #[test]
    fn test_remove_node_releases_all_bookkeeping() {
        let mut tree = ViewTree::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let root = tree.new_node(sized(320.0, 480.0));
        let scroll = tree.new_scroll_node(Style::default(), ScrollModel::new());
        tree.add_child(root, scroll);
        assert_eq!(tree.node_count(), 2);

        let fired_clone = Arc::clone(&fired);
        tree.on_attached(
            scroll,
            Arc::new(move || {
                fired_clone.fetch_add(1, Ordering::SeqCst);
            }),
        );

        tree.remove_node(scroll);
        assert_eq!(tree.node_count(), 1);
        assert!(tree.scroll_model(scroll).is_none());
        assert!(tree.parent(scroll).is_none());
        assert!(tree.bounds(scroll).is_none());

        // The listener went with the node
        tree.set_window_root(root);
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        // Removing again is a no-op
        tree.remove_node(scroll);
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn test_attachment_requires_mounted_root() {
        let mut tree = ViewTree::new();
        let root = tree.new_node(sized(320.0, 480.0));
        let child = tree.new_node(Style::default());
        tree.add_child(root, child);

        assert!(!tree.is_attached(child));
        tree.set_window_root(root);
        assert!(tree.is_attached(child));
        assert!(tree.is_attached(root));
    }

    #[test]
    fn test_attach_listener_fires_on_mount_and_move() {
        let mut tree = ViewTree::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let root = tree.new_node(sized(320.0, 480.0));
        let first_parent = tree.new_node(Style::default());
        let second_parent = tree.new_node(Style::default());
        let probe = tree.new_node(Style::default());
        tree.add_child(root, first_parent);
        tree.add_child(root, second_parent);
        tree.add_child(first_parent, probe);

        let fired_clone = Arc::clone(&fired);
        tree.on_attached(
            probe,
            Arc::new(move || {
                fired_clone.fetch_add(1, Ordering::SeqCst);
            }),
        );
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tree.set_window_root(root);
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        // Moving within the attached hierarchy re-fires
        tree.reparent(second_parent, probe);
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_attach_listener_fires_immediately_when_already_attached() {
        let mut tree = ViewTree::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let root = tree.new_node(sized(320.0, 480.0));
        let probe = tree.new_node(Style::default());
        tree.add_child(root, probe);
        tree.set_window_root(root);

        let fired_clone = Arc::clone(&fired);
        tree.on_attached(
            probe,
            Arc::new(move || {
                fired_clone.fetch_add(1, Ordering::SeqCst);
            }),
        );
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_removed_listener_stays_silent() {
        let mut tree = ViewTree::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let root = tree.new_node(sized(320.0, 480.0));
        let probe = tree.new_node(Style::default());
        tree.add_child(root, probe);

        let fired_clone = Arc::clone(&fired);
        let listener = tree.on_attached(
            probe,
            Arc::new(move || {
                fired_clone.fetch_add(1, Ordering::SeqCst);
            }),
        );
        tree.remove_attach_listener(listener);

        tree.set_window_root(root);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_layout_bounds() {
        let mut tree = ViewTree::new();
        let root = tree.new_node(sized(320.0, 480.0));
        let child = tree.new_node(sized(320.0, 40.0));
        tree.add_child(root, child);

        tree.compute_layout(root, CoreSize::new(320.0, 480.0));
        let bounds = tree.bounds(root).unwrap();
        assert_eq!(bounds.size, CoreSize::new(320.0, 480.0));
        let child_bounds = tree.bounds(child).unwrap();
        assert_eq!(child_bounds.size, CoreSize::new(320.0, 40.0));
    }
}
