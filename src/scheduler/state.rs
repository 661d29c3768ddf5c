use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Run token shared by the scheduler handle and its loop task.
///
/// `running` only goes `false -> true` through [`try_begin`](Self::try_begin), so at most
/// one loop can own it.
#[derive(Debug, Default)]
pub struct HarvestRunState {
    running: AtomicBool,
    cancel: AtomicBool,
    current_batch: AtomicUsize,
}

impl HarvestRunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the token. Returns false if a run already holds it.
    pub fn try_begin(&self) -> bool {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.cancel.store(false, Ordering::Release);
        self.current_batch.store(0, Ordering::Release);
        true
    }

    pub fn finish(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn request_cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// 1-based index of the batch being produced, 0 before the first one.
    pub fn current_batch(&self) -> usize {
        self.current_batch.load(Ordering::Acquire)
    }

    pub(crate) fn set_current_batch(&self, n: usize) {
        self.current_batch.store(n, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_exclusive_until_finished() {
        let state = HarvestRunState::new();
        assert!(state.try_begin());
        assert!(!state.try_begin());
        state.finish();
        assert!(state.try_begin());
    }

    #[test]
    fn begin_clears_previous_cancel() {
        let state = HarvestRunState::new();
        state.request_cancel();
        assert!(state.try_begin());
        assert!(!state.is_cancelled());
    }
}
