//! Reflow Core Primitives
//!
//! This crate provides the foundational primitives for the Reflow UI toolkit:
//!
//! - **Geometry**: plain 2D value types (`Point`, `Size`, `Rect`) with
//!   structural equality, used as change-detection payloads
//! - **Reactive Signals**: fine-grained reactivity without VDOM overhead,
//!   plus the `State<T>` wrapper components use for their state slots
//!
//! # Example
//!
//! ```rust
//! use reflow_core::reactive::ReactiveGraph;
//!
//! let mut graph = ReactiveGraph::new();
//!
//! // Create a signal
//! let count = graph.create_signal(0i32);
//!
//! // Create an effect
//! let _effect = graph.create_effect(move |g| {
//!     println!("Count is now: {:?}", g.get(count));
//! });
//!
//! // Update the signal
//! graph.set(count, 5);
//! assert_eq!(graph.get_untracked(count), Some(5));
//! ```

pub mod geometry;
pub mod reactive;

pub use geometry::{Point, Rect, Size};
pub use reactive::{
    DirtyFlag, Effect, EffectId, ReactiveGraph, SharedReactiveGraph, Signal, SignalId, State,
};
