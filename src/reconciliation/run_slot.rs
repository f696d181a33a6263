use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::{AppError, AppResult};

/// Single-occupancy slot guarding the reconciliation run.
///
/// At most one run holds the slot; a second caller is refused instead of
/// queued, so manual and scheduled triggers never overlap.
#[derive(Debug, Clone, Default)]
pub struct RunSlot {
    inner: Arc<Mutex<()>>,
}

/// Held for the duration of a run; dropping it frees the slot
#[derive(Debug)]
pub struct RunGuard {
    _guard: OwnedMutexGuard<()>,
}

impl RunSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> AppResult<RunGuard> {
        self.inner
            .clone()
            .try_lock_owned()
            .map(|guard| RunGuard { _guard: guard })
            .map_err(|_| AppError::RunInProgress)
    }

    pub fn is_busy(&self) -> bool {
        self.inner.try_lock().is_err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_refused() {
        let slot = RunSlot::new();
        let guard = slot.try_acquire().unwrap();
        assert!(slot.is_busy());
        assert!(matches!(slot.try_acquire(), Err(AppError::RunInProgress)));

        drop(guard);
        assert!(!slot.is_busy());
        assert!(slot.try_acquire().is_ok());
    }

    #[test]
    fn test_clones_share_the_slot() {
        let slot = RunSlot::new();
        let other = slot.clone();
        let _guard = slot.try_acquire().unwrap();
        assert!(other.try_acquire().is_err());
    }
}
