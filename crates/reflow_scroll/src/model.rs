//! Imperative scroll model
//!
//! The real scrollable object behind a scroll container on the legacy path:
//! it owns the live offset and content/viewport sizes and exposes property
//! observers for offset and content-size changes. The introspection observer
//! attaches to a model found by walking the view tree; the model itself
//! never knows who is watching it.
//!
//! Observers fire only when the stored value actually changes, and always
//! after the internal lock has been released, so a callback may read the
//! model (or scroll it) without deadlocking.

use std::sync::{Arc, Mutex};

use reflow_core::{Point, Size};
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Identifier for a registered property observer
    pub struct ObserverId;
}

/// Callback observing offset changes
pub type OffsetObserver = Arc<dyn Fn(Point) + Send + Sync>;

/// Callback observing content-size changes
pub type ContentSizeObserver = Arc<dyn Fn(Size) + Send + Sync>;

/// Inner state for [`ScrollModel`]
#[derive(Default)]
struct ScrollModelState {
    /// Current scroll offset (non-negative, clamped to the scroll range)
    offset: Point,
    /// Total scrollable content extent
    content_size: Size,
    /// Visible viewport extent
    viewport_size: Size,
    offset_observers: SlotMap<ObserverId, OffsetObserver>,
    content_observers: SlotMap<ObserverId, ContentSizeObserver>,
}

impl ScrollModelState {
    fn max_offset(&self) -> Point {
        Point::new(
            (self.content_size.width - self.viewport_size.width).max(0.0),
            (self.content_size.height - self.viewport_size.height).max(0.0),
        )
    }

    fn clamp(&self, point: Point) -> Point {
        let max = self.max_offset();
        Point::new(point.x.clamp(0.0, max.x), point.y.clamp(0.0, max.y))
    }
}

/// Shared handle to an imperative scroll model
///
/// Cloning yields another handle to the same model, which is how the view
/// tree hands out non-owning references during the ancestor walk.
#[derive(Clone, Default)]
pub struct ScrollModel {
    inner: Arc<Mutex<ScrollModelState>>,
}

impl std::fmt::Debug for ScrollModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrollModel")
            .field("offset", &self.offset())
            .field("content_size", &self.content_size())
            .field("viewport_size", &self.viewport_size())
            .finish()
    }
}

impl ScrollModel {
    /// Create a model with zero geometry
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Current scroll offset
    pub fn offset(&self) -> Point {
        self.inner.lock().ok().map(|s| s.offset).unwrap_or_default()
    }

    /// Total scrollable content extent
    pub fn content_size(&self) -> Size {
        self.inner
            .lock()
            .ok()
            .map(|s| s.content_size)
            .unwrap_or_default()
    }

    /// Visible viewport extent
    pub fn viewport_size(&self) -> Size {
        self.inner
            .lock()
            .ok()
            .map(|s| s.viewport_size)
            .unwrap_or_default()
    }

    /// Maximum valid scroll offset given current content and viewport
    pub fn max_offset(&self) -> Point {
        self.inner
            .lock()
            .ok()
            .map(|s| s.max_offset())
            .unwrap_or_default()
    }

    // =========================================================================
    // Mutation (notifies observers on actual change)
    // =========================================================================

    /// Scroll to an absolute offset, clamped to the valid range
    pub fn set_offset(&self, offset: Point) {
        let notify = {
            let Ok(mut state) = self.inner.lock() else {
                return;
            };
            let clamped = state.clamp(offset);
            if clamped == state.offset {
                None
            } else {
                state.offset = clamped;
                let observers: Vec<OffsetObserver> =
                    state.offset_observers.values().cloned().collect();
                Some((clamped, observers))
            }
        };
        if let Some((offset, observers)) = notify {
            for observer in observers {
                observer(offset);
            }
        }
    }

    /// Update the scrollable content extent (set by the container's layout)
    pub fn set_content_size(&self, size: Size) {
        let notify = {
            let Ok(mut state) = self.inner.lock() else {
                return;
            };
            if size == state.content_size {
                None
            } else {
                state.content_size = size;
                let observers: Vec<ContentSizeObserver> =
                    state.content_observers.values().cloned().collect();
                Some((size, observers))
            }
        };
        if let Some((size, observers)) = notify {
            for observer in observers {
                observer(size);
            }
        }
    }

    /// Update the viewport extent (set by the container's layout)
    ///
    /// Viewport changes are not observable; they only affect clamping.
    pub fn set_viewport_size(&self, size: Size) {
        if let Ok(mut state) = self.inner.lock() {
            state.viewport_size = size;
        }
    }

    // =========================================================================
    // Property observers
    // =========================================================================

    /// Observe offset changes; returns the id used to release the observer
    pub fn observe_offset(&self, observer: OffsetObserver) -> Option<ObserverId> {
        self.inner
            .lock()
            .ok()
            .map(|mut s| s.offset_observers.insert(observer))
    }

    /// Observe content-size changes; returns the id used to release the observer
    pub fn observe_content_size(&self, observer: ContentSizeObserver) -> Option<ObserverId> {
        self.inner
            .lock()
            .ok()
            .map(|mut s| s.content_observers.insert(observer))
    }

    /// Release a previously registered offset observer
    pub fn remove_offset_observer(&self, id: ObserverId) {
        if let Ok(mut state) = self.inner.lock() {
            state.offset_observers.remove(id);
        }
    }

    /// Release a previously registered content-size observer
    pub fn remove_content_size_observer(&self, id: ObserverId) {
        if let Ok(mut state) = self.inner.lock() {
            state.content_observers.remove(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model_320x480_content_2000() -> ScrollModel {
        let model = ScrollModel::new();
        model.set_viewport_size(Size::new(320.0, 480.0));
        model.set_content_size(Size::new(320.0, 2000.0));
        model
    }

    #[test]
    fn test_offset_clamped_to_scroll_range() {
        let model = model_320x480_content_2000();

        model.set_offset(Point::new(0.0, -50.0));
        assert_eq!(model.offset(), Point::ZERO);

        model.set_offset(Point::new(100.0, 5000.0));
        assert_eq!(model.offset(), Point::new(0.0, 1520.0));
        assert_eq!(model.max_offset(), Point::new(0.0, 1520.0));
    }

    #[test]
    fn test_offset_observer_fires_on_change_only() {
        let model = model_320x480_content_2000();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_clone = Arc::clone(&seen);
        let id = model
            .observe_offset(Arc::new(move |offset| {
                seen_clone.lock().unwrap().push(offset);
            }))
            .unwrap();

        model.set_offset(Point::new(0.0, 100.0));
        model.set_offset(Point::new(0.0, 100.0)); // duplicate, suppressed
        model.set_offset(Point::new(0.0, 200.0));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![Point::new(0.0, 100.0), Point::new(0.0, 200.0)]
        );

        model.remove_offset_observer(id);
        model.set_offset(Point::new(0.0, 300.0));
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_content_size_observer() {
        let model = ScrollModel::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_clone = Arc::clone(&seen);
        model
            .observe_content_size(Arc::new(move |size| {
                seen_clone.lock().unwrap().push(size);
            }))
            .unwrap();

        model.set_content_size(Size::new(320.0, 2000.0));
        model.set_content_size(Size::new(320.0, 2000.0)); // suppressed
        model.set_content_size(Size::new(320.0, 2400.0));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![Size::new(320.0, 2000.0), Size::new(320.0, 2400.0)]
        );
    }

    #[test]
    fn test_observer_may_read_model_reentrantly() {
        let model = model_320x480_content_2000();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_clone = Arc::clone(&seen);
        let reader = model.clone();
        model
            .observe_offset(Arc::new(move |_| {
                // Reads back through the handle; must not deadlock
                seen_clone.lock().unwrap().push(reader.content_size());
            }))
            .unwrap();

        model.set_offset(Point::new(0.0, 10.0));
        assert_eq!(*seen.lock().unwrap(), vec![Size::new(320.0, 2000.0)]);
    }
}
