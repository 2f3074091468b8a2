//! Scroll geometry snapshot and the published attributes bundle
//!
//! [`ScrollGeometry`] is the equality-comparable payload both observation
//! paths funnel into. [`ScrollAttributes`] is the per-render value the
//! tracker publishes into the ambient scope for drag consumers: geometry
//! read-outs plus mechanism-agnostic scroll control.

use std::sync::Arc;

use reflow_core::reactive::State;
use reflow_core::{Point, Size};

/// Snapshot of observed scroll geometry
///
/// Re-created on every observed change; structural equality is what
/// suppresses redundant state writes downstream.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScrollGeometry {
    /// Total scrollable content extent
    pub content_size: Size,
    /// Current scroll offset
    pub offset: Point,
}

impl ScrollGeometry {
    pub const fn new(content_size: Size, offset: Point) -> Self {
        Self {
            content_size,
            offset,
        }
    }
}

/// Two-way scroll position binding
///
/// Owned by the tracker; descendants write through it to request a scroll.
/// On the declarative path the scroll container watches the binding and
/// applies the requested position on its next frame, so a write here is
/// eventually consistent with observed geometry, never same-frame.
#[derive(Clone)]
pub struct PositionBinding {
    state: State<Option<Point>>,
}

impl PositionBinding {
    pub fn new(state: State<Option<Point>>) -> Self {
        Self { state }
    }

    /// The last requested scroll position, if any
    pub fn target(&self) -> Option<Point> {
        self.state.get()
    }

    /// Request a scroll to an absolute position
    pub fn request(&self, point: Point) {
        self.state.set_rebuild(Some(point));
    }
}

impl std::fmt::Debug for PositionBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PositionBinding")
            .field("target", &self.target())
            .finish()
    }
}

/// Scroll command callback carried by the bundle
pub type ScrollToFn = Arc<dyn Fn(Point) + Send + Sync>;

/// Live offset read carried by the bundle
pub type CurrentPointFn = Arc<dyn Fn() -> Option<Point> + Send + Sync>;

/// Per-render bundle of scroll container attributes
///
/// Constructed fresh each render pass from the tracker's state and the
/// active observation strategy, then published into the ambient scope. It
/// is a read-mostly view, not an owner of the underlying state: consumers
/// read geometry, call [`scroll_to`](Self::scroll_to), and read the live
/// offset via [`current_point`](Self::current_point).
///
/// Both callbacks are safe before any scroll mechanism has resolved:
/// `scroll_to` is accepted as a no-op and `current_point` returns `None`.
#[derive(Clone)]
pub struct ScrollAttributes {
    /// Two-way scroll position binding
    pub position: PositionBinding,
    /// Visible viewport extent, measured from the layout pass this render
    pub viewport_size: Size,
    /// Content extent copied from the current snapshot
    pub content_size: Size,
    /// Offset copied from the current snapshot (updates on change
    /// notification; use [`current_point`](Self::current_point) for a live read)
    pub offset: Point,
    /// Capability-appropriate scroll command
    pub scroll_to: ScrollToFn,
    /// Capability-appropriate live offset read
    pub current_point: CurrentPointFn,
}

impl ScrollAttributes {
    /// Imperatively move the scroll position
    pub fn scroll_to(&self, point: Point) {
        (self.scroll_to)(point)
    }

    /// Live scroll offset, `None` while no scroll mechanism has resolved
    pub fn current_point(&self) -> Option<Point> {
        (self.current_point)()
    }

    /// Maximum valid scroll offset given content and viewport
    pub fn max_offset(&self) -> Point {
        Point::new(
            (self.content_size.width - self.viewport_size.width).max(0.0),
            (self.content_size.height - self.viewport_size.height).max(0.0),
        )
    }

    /// Scroll by a relative amount from the live offset (or the last
    /// snapshot offset when no live read is available)
    pub fn scroll_by(&self, dx: f32, dy: f32) {
        let base = self.current_point().unwrap_or(self.offset);
        self.scroll_to(base.translated(dx, dy));
    }

    /// Whether the container is scrolled to the top
    pub fn is_at_top(&self) -> bool {
        self.offset.y <= 0.0
    }

    /// Whether the container is scrolled to the bottom
    pub fn is_at_bottom(&self) -> bool {
        self.offset.y >= self.max_offset().y - 1.0 // Small tolerance
    }
}

impl std::fmt::Debug for ScrollAttributes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrollAttributes")
            .field("viewport_size", &self.viewport_size)
            .field("content_size", &self.content_size)
            .field("offset", &self.offset)
            .finish()
    }
}
