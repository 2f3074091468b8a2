//! Capability gate for observation strategy selection
//!
//! The runtime half of the gate: whether the host's scroll containers
//! publish declarative geometry events. The compile-time half is the
//! `introspection` cargo feature, which gates the legacy fallback path
//! entirely; with the feature off and no geometry events, scroll control
//! degrades to no-op/`None`.

/// Host scroll capabilities, checked once at tracker mount
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    /// Scroll containers publish geometry changes to the event hub
    pub geometry_events: bool,
}

impl Capabilities {
    /// Capabilities of the current host
    ///
    /// Hosts built against this toolkit's own containers always have
    /// geometry events; embedding hosts that only expose an imperative
    /// scroll model construct [`Capabilities::legacy`] instead.
    pub fn detect() -> Self {
        Self::modern()
    }

    /// Declarative geometry events available
    pub const fn modern() -> Self {
        Self {
            geometry_events: true,
        }
    }

    /// No declarative geometry events; introspection fallback only
    pub const fn legacy() -> Self {
        Self {
            geometry_events: false,
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::detect()
    }
}
