//! Round robin replica selection.

use parking_lot::Mutex;

/// Hands out replica indexes in rotation.
#[derive(Debug)]
pub struct RoundRobin {
    /// Last index handed out, always `< len`.
    position: Mutex<usize>,
    len: usize,
}

impl RoundRobin {
    /// Rotate over `len` replicas. `None` if there is nothing to rotate over.
    pub fn new(len: usize) -> Option<Self> {
        if len == 0 {
            return None;
        }

        Some(Self {
            position: Mutex::new(0),
            len,
        })
    }

    /// Get next replica index.
    ///
    /// The position is advanced before it's returned, so the first
    /// call on a fresh selector returns `1 % len`.
    pub fn next(&self) -> usize {
        let mut position = self.position.lock();
        *position = (*position + 1) % self.len;
        *position
    }

    /// Index returned by the last call to [`RoundRobin::next`].
    pub fn position(&self) -> usize {
        *self.position.lock()
    }

    /// Number of replicas rotated over.
    pub fn len(&self) -> usize {
        self.len
    }

    /// There are no replicas.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
