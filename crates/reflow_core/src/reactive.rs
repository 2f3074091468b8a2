//! Fine-grained reactive signal system
//!
//! A push-based reactive graph: signals push invalidation to their effect
//! subscribers, which are flushed at the end of each write. There is no
//! virtual DOM; components hold [`State<T>`] values and the host redraws
//! when the shared dirty flag is raised.
//!
//! # State
//!
//! The [`State<T>`] type wraps a signal with thread-safe access to the
//! reactive graph. It's the primary API for component state management.
//!
//! ```ignore
//! use reflow_core::reactive::State;
//!
//! let offset: State<Point> = tracker.state();
//!
//! // Read the current value
//! let value = offset.get();
//!
//! // Update the value (triggers reactive updates)
//! offset.set(next);
//!
//! // Update only if the value actually changed (suppresses redundant
//! // re-render when an observer re-delivers the same geometry)
//! let wrote = offset.set_if_changed(next);
//! ```

use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

new_key_type! {
    /// Unique identifier for a signal
    pub struct SignalId;
    /// Unique identifier for an effect
    pub struct EffectId;
}

/// A reactive signal handle (cheap to copy)
#[derive(Debug)]
pub struct Signal<T> {
    id: SignalId,
    _marker: std::marker::PhantomData<T>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Signal<T> {}

impl<T> Signal<T> {
    /// Get the signal's internal ID
    pub fn id(&self) -> SignalId {
        self.id
    }
}

/// An effect handle
#[derive(Debug, Clone, Copy)]
pub struct Effect {
    id: EffectId,
}

impl Effect {
    pub fn id(&self) -> EffectId {
        self.id
    }
}

/// Internal signal node storage
struct SignalNode {
    /// The signal value (type-erased)
    value: Box<dyn Any + Send>,
    /// Version counter for change detection
    version: u64,
    /// Effects to notify on change
    subscribers: SmallVec<[EffectId; 4]>,
}

/// Internal effect node storage
struct EffectNode {
    /// The effect function; taken out of the node while running so the
    /// graph stays borrowable inside the effect body
    run: Option<Box<dyn FnMut(&ReactiveGraph) + Send>>,
    /// Dependencies (signals this effect reads from)
    dependencies: SmallVec<[SignalId; 4]>,
    /// Whether the effect needs to run
    dirty: Cell<bool>,
}

/// The reactive graph that manages all signals and effects
pub struct ReactiveGraph {
    signals: SlotMap<SignalId, SignalNode>,
    effects: SlotMap<EffectId, EffectNode>,
    /// Pending effects to run
    pending_effects: RefCell<VecDeque<EffectId>>,
    /// Currently tracking dependencies (for auto-tracking)
    tracking: RefCell<Option<Vec<SignalId>>>,
}

impl ReactiveGraph {
    /// Create a new reactive graph
    pub fn new() -> Self {
        Self {
            signals: SlotMap::with_key(),
            effects: SlotMap::with_key(),
            pending_effects: RefCell::new(VecDeque::new()),
            tracking: RefCell::new(None),
        }
    }

    // =========================================================================
    // SIGNALS
    // =========================================================================

    /// Create a new signal with an initial value
    pub fn create_signal<T: Send + 'static>(&mut self, initial: T) -> Signal<T> {
        let id = self.signals.insert(SignalNode {
            value: Box::new(initial),
            version: 0,
            subscribers: SmallVec::new(),
        });
        Signal {
            id,
            _marker: std::marker::PhantomData,
        }
    }

    /// Get the current value of a signal
    ///
    /// If called within a tracking context (an effect), this signal will be
    /// recorded as a dependency.
    pub fn get<T: Clone + 'static>(&self, signal: Signal<T>) -> Option<T> {
        if let Some(ref mut deps) = *self.tracking.borrow_mut() {
            if !deps.contains(&signal.id) {
                deps.push(signal.id);
            }
        }

        self.signals
            .get(signal.id)
            .and_then(|node| node.value.downcast_ref::<T>().cloned())
    }

    /// Get the current value without tracking as a dependency
    pub fn get_untracked<T: Clone + 'static>(&self, signal: Signal<T>) -> Option<T> {
        self.signals
            .get(signal.id)
            .and_then(|node| node.value.downcast_ref::<T>().cloned())
    }

    /// Set the value of a signal, triggering reactive updates
    pub fn set<T: Send + 'static>(&mut self, signal: Signal<T>, value: T) {
        if let Some(node) = self.signals.get_mut(signal.id) {
            node.value = Box::new(value);
            node.version += 1;

            let subscribers: SmallVec<[EffectId; 4]> = node.subscribers.clone();
            for effect_id in subscribers {
                self.mark_dirty(effect_id);
            }
            self.flush_effects();
        }
    }

    /// Get the version of a signal (for change detection)
    pub fn signal_version(&self, id: SignalId) -> Option<u64> {
        self.signals.get(id).map(|n| n.version)
    }

    // =========================================================================
    // EFFECTS
    // =========================================================================

    /// Create an effect that runs when its dependencies change
    pub fn create_effect<F>(&mut self, run: F) -> Effect
    where
        F: FnMut(&ReactiveGraph) + Send + 'static,
    {
        let id = self.effects.insert(EffectNode {
            run: Some(Box::new(run)),
            dependencies: SmallVec::new(),
            dirty: Cell::new(true), // Run immediately
        });

        self.pending_effects.borrow_mut().push_back(id);
        self.flush_effects();

        Effect { id }
    }

    /// Dispose of an effect, removing it from the graph
    pub fn dispose_effect(&mut self, effect: Effect) {
        if let Some(node) = self.effects.remove(effect.id) {
            for &dep_id in &node.dependencies {
                if let Some(sig) = self.signals.get_mut(dep_id) {
                    sig.subscribers.retain(|s| *s != effect.id);
                }
            }
        }
    }

    // =========================================================================
    // INTERNAL
    // =========================================================================

    /// Mark an effect as dirty and schedule it
    fn mark_dirty(&mut self, effect_id: EffectId) {
        if let Some(node) = self.effects.get(effect_id) {
            if !node.dirty.get() {
                node.dirty.set(true);
                self.pending_effects.borrow_mut().push_back(effect_id);
            }
        }
    }

    /// Flush all pending effects
    fn flush_effects(&mut self) {
        loop {
            let next = self.pending_effects.borrow_mut().pop_front();
            match next {
                Some(effect_id) => self.run_effect(effect_id),
                None => break,
            }
        }
    }

    /// Run a single effect
    fn run_effect(&mut self, effect_id: EffectId) {
        // Take the closure out of the node so the effect body can read the
        // graph without aliasing the effects slotmap
        let mut run = {
            let Some(node) = self.effects.get_mut(effect_id) else {
                return;
            };
            // Might have been run already as part of the same flush
            if !node.dirty.get() {
                return;
            }
            node.dirty.set(false);
            match node.run.take() {
                Some(run) => run,
                None => return,
            }
        };

        // Track dependencies while running
        self.tracking.replace(Some(Vec::new()));
        run(self);
        let deps = self.tracking.take().unwrap_or_default();

        // Re-subscribe with the freshly tracked dependency set
        if let Some(node) = self.effects.get_mut(effect_id) {
            node.run = Some(run);
            let old_deps = std::mem::replace(&mut node.dependencies, deps.into_iter().collect());
            for &dep_id in &old_deps {
                if let Some(sig) = self.signals.get_mut(dep_id) {
                    sig.subscribers.retain(|s| *s != effect_id);
                }
            }
            let new_deps: SmallVec<[SignalId; 4]> = self
                .effects
                .get(effect_id)
                .map(|n| n.dependencies.clone())
                .unwrap_or_default();
            for dep_id in new_deps {
                if let Some(sig) = self.signals.get_mut(dep_id) {
                    if !sig.subscribers.contains(&effect_id) {
                        sig.subscribers.push(effect_id);
                    }
                }
            }
        }
    }

}

impl Default for ReactiveGraph {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// STATE - High-level API for component state management
// =============================================================================

/// Shared reactive graph for thread-safe access
pub type SharedReactiveGraph = Arc<Mutex<ReactiveGraph>>;

/// Shared dirty flag for triggering UI rebuilds
pub type DirtyFlag = Arc<AtomicBool>;

/// A bound state value with direct get/set methods
///
/// Wraps a signal with thread-safe access to the reactive graph. `set`
/// triggers reactive updates; `set_if_changed` additionally raises the
/// rebuild flag, but only when the value actually differs from the stored
/// one. The equality guard is what keeps duplicate change notifications
/// from turning into redundant render passes.
#[derive(Clone)]
pub struct State<T> {
    signal: Signal<T>,
    reactive: SharedReactiveGraph,
    dirty_flag: DirtyFlag,
}

impl<T: Clone + Send + 'static> State<T> {
    /// Create a new State wrapper
    pub fn new(signal: Signal<T>, reactive: SharedReactiveGraph, dirty_flag: DirtyFlag) -> Self {
        Self {
            signal,
            reactive,
            dirty_flag,
        }
    }

    /// Create a signal in the graph and bind it in one step
    pub fn create(initial: T, reactive: SharedReactiveGraph, dirty_flag: DirtyFlag) -> Self {
        let signal = match reactive.lock() {
            Ok(mut graph) => graph.create_signal(initial),
            Err(poisoned) => poisoned.into_inner().create_signal(initial),
        };
        Self::new(signal, reactive, dirty_flag)
    }

    /// Get the current value
    pub fn get(&self) -> T
    where
        T: Default,
    {
        self.try_get().unwrap_or_default()
    }

    /// Get the current value, returning None if not found
    pub fn try_get(&self) -> Option<T> {
        self.reactive.lock().ok()?.get_untracked(self.signal)
    }

    /// Set a new value
    ///
    /// Triggers reactive updates but not a tree rebuild. Use
    /// `set_rebuild()` when the change must reach the next render pass.
    pub fn set(&self, value: T) {
        if let Ok(mut graph) = self.reactive.lock() {
            graph.set(self.signal, value);
        }
    }

    /// Set a new value AND trigger a UI tree rebuild
    pub fn set_rebuild(&self, value: T) {
        self.set(value);
        self.dirty_flag.store(true, Ordering::SeqCst);
    }

    /// Write the value only if it differs from the stored one
    ///
    /// Returns whether a write happened. The rebuild flag is raised only on
    /// an actual change, so delivering the same value twice in a row is a
    /// no-op for downstream consumers.
    pub fn set_if_changed(&self, value: T) -> bool
    where
        T: PartialEq,
    {
        let Ok(mut graph) = self.reactive.lock() else {
            return false;
        };
        if graph.get_untracked(self.signal).as_ref() == Some(&value) {
            return false;
        }
        graph.set(self.signal, value);
        drop(graph);
        self.dirty_flag.store(true, Ordering::SeqCst);
        true
    }

    /// Get the underlying signal (for advanced use cases)
    pub fn signal(&self) -> Signal<T> {
        self.signal
    }

    /// Get the signal ID (for dependency tracking)
    pub fn signal_id(&self) -> SignalId {
        self.signal.id()
    }

    /// Current signal version (bumps once per distinct write)
    pub fn version(&self) -> u64 {
        self.reactive
            .lock()
            .ok()
            .and_then(|g| g.signal_version(self.signal.id()))
            .unwrap_or(0)
    }
}
