use std::collections::VecDeque;

use parking_lot::Mutex;

/// Most-recently-touched command buffers, newest first.
///
/// Purely an introspection aid; it has its own lock so touching it never
/// contends with validation.
#[derive(Debug)]
pub struct RecentCommandBuffers {
    capacity: usize,
    ring: Mutex<VecDeque<u64>>,
}

impl RecentCommandBuffers {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            ring: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Move `cb` to the front, evicting the oldest entry when full.
    pub fn touch(&self, cb: u64) {
        let mut ring = self.ring.lock();
        if let Some(pos) = ring.iter().position(|&h| h == cb) {
            ring.remove(pos);
        } else if ring.len() == self.capacity {
            ring.pop_back();
        }
        ring.push_front(cb);
    }

    pub fn forget(&self, cb: u64) {
        self.ring.lock().retain(|&h| h != cb);
    }

    pub fn snapshot(&self) -> Vec<u64> {
        self.ring.lock().iter().copied().collect()
    }
}
