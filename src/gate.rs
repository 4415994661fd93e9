use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

/// Counting gate that bounds how many probe tasks run at once.
///
/// In fixed mode the capacity chosen at construction holds for the whole
/// scan. A resizable gate follows [`resize`](Self::resize): growth adds
/// permits immediately, shrinking forgets idle permits and catches up on
/// later calls as busy permits are returned.
#[derive(Debug)]
pub struct AdmissionGate {
    permits: Arc<Semaphore>,
    capacity: Mutex<usize>,
    resizable: bool,
}

impl AdmissionGate {
    pub fn fixed(capacity: usize) -> Self {
        Self::build(capacity, false)
    }

    pub fn resizable(capacity: usize) -> Self {
        Self::build(capacity, true)
    }

    fn build(capacity: usize, resizable: bool) -> Self {
        let capacity = capacity.clamp(1, Semaphore::MAX_PERMITS);
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity: Mutex::new(capacity),
            resizable,
        }
    }

    /// Wait for a free slot. The slot is released when the permit drops.
    pub async fn admit(&self) -> Result<OwnedSemaphorePermit, AcquireError> {
        Arc::clone(&self.permits).acquire_owned().await
    }

    /// Total slots the gate currently manages (busy + idle).
    pub fn capacity(&self) -> usize {
        *self.capacity.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Move the capacity towards `target` (floor 1). No-op for fixed gates.
    pub fn resize(&self, target: usize) {
        if !self.resizable {
            return;
        }
        let target = target.clamp(1, Semaphore::MAX_PERMITS);
        let mut capacity = self.capacity.lock().unwrap_or_else(PoisonError::into_inner);
        if target > *capacity {
            self.permits.add_permits(target - *capacity);
            *capacity = target;
        } else if target < *capacity {
            let forgotten = self.permits.forget_permits(*capacity - target);
            *capacity -= forgotten;
        }
    }
}
