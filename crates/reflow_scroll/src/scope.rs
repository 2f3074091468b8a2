//! Ambient scroll scope
//!
//! Explicit context object handed down through the component tree instead of
//! a global environment: the decorated container publishes its attributes
//! into a child scope, and every descendant built under that scope can read
//! them without prop threading. Nested instrumented containers shadow the
//! outer scope for their own subtree.

use crate::attributes::ScrollAttributes;

/// Tree-scoped slot for the enclosing container's scroll attributes
///
/// Default is the absent state: no enclosing scroll container instrumented.
#[derive(Clone, Debug, Default)]
pub struct ScrollScope {
    attributes: Option<ScrollAttributes>,
}

impl ScrollScope {
    /// Scope with no instrumented container (the tree root default)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Child scope carrying this container's attributes, shadowing any
    /// outer instrumented container for the subtree built under it
    pub fn with_attributes(&self, attributes: ScrollAttributes) -> Self {
        Self {
            attributes: Some(attributes),
        }
    }

    /// Attributes of the nearest enclosing instrumented container
    pub fn attributes(&self) -> Option<&ScrollAttributes> {
        self.attributes.as_ref()
    }
}
