//! Single-threaded UI task queue
//!
//! Models the main-loop turn: work posted here runs when the host drains the
//! queue, one frame later at the earliest. The introspection path uses this
//! to defer its ancestor walk until the view hierarchy has settled, instead
//! of searching synchronously inside the attach callback.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// A deferred unit of work
pub type Task = Box<dyn FnOnce() + Send>;

/// FIFO of deferred tasks, drained by the host loop each frame
///
/// Cloning yields another handle to the same queue.
#[derive(Clone, Default)]
pub struct UiQueue {
    tasks: Arc<Mutex<VecDeque<Task>>>,
}

impl UiQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Post a task for the next drain
    pub fn post(&self, task: impl FnOnce() + Send + 'static) {
        if let Ok(mut tasks) = self.tasks.lock() {
            tasks.push_back(Box::new(task));
        }
    }

    /// Run every queued task, including tasks posted while draining
    ///
    /// Returns the number of tasks run.
    pub fn drain(&self) -> usize {
        let mut ran = 0;
        loop {
            let next = self.tasks.lock().ok().and_then(|mut t| t.pop_front());
            match next {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => break,
            }
        }
        ran
    }

    /// Number of tasks currently waiting
    pub fn len(&self) -> usize {
        self.tasks.lock().map(|t| t.len()).unwrap_or(0)
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_post_and_drain() {
        let queue = UiQueue::new();
        let hits = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let hits = Arc::clone(&hits);
            queue.post(move || {
                hits.fetch_add(1, Ordering::SeqCst);
            });
        }

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.drain(), 3);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_tasks_posted_while_draining_run_in_same_drain() {
        let queue = UiQueue::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let inner_queue = queue.clone();
        let inner_hits = Arc::clone(&hits);
        queue.post(move || {
            inner_hits.fetch_add(1, Ordering::SeqCst);
            let hits = Arc::clone(&inner_hits);
            inner_queue.post(move || {
                hits.fetch_add(1, Ordering::SeqCst);
            });
        });

        assert_eq!(queue.drain(), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
