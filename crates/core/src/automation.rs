//! Exclusive access to the native chart-refresh automation.
//!
//! Only one chart refresh may drive the native presentation application at a
//! time. A slot whose holder has not released it within the staleness timeout
//! is considered abandoned and may be reclaimed.
//!
//! A slot serializes refreshes among the callers sharing it, which means
//! within one process. It is not a cross-process lock.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Default age after which a held slot may be reclaimed.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(120);

#[derive(Debug, Default)]
struct SlotState {
    /// Generation and acquisition time of the current holder.
    holder: Option<(u64, Instant)>,
    /// Last generation handed out; strictly increasing.
    generation: u64,
}

/// A single exclusive slot with staleness reclaim.
#[derive(Debug)]
pub struct AutomationSlot {
    state: Mutex<SlotState>,
    stale_after: Duration,
}

impl Default for AutomationSlot {
    fn default() -> Self {
        Self::new(DEFAULT_STALE_AFTER)
    }
}

impl AutomationSlot {
    pub fn new(stale_after: Duration) -> Self {
        Self {
            state: Mutex::new(SlotState::default()),
            stale_after,
        }
    }

    /// Acquire the slot if it is free or its holder is stale.
    pub fn try_acquire(&self) -> Option<SlotGuard<'_>> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();

        if let Some((_, since)) = state.holder {
            let held = now.duration_since(since);
            if held < self.stale_after {
                return None;
            }
            log::warn!(
                "Reclaiming automation slot held for {:.0}s",
                held.as_secs_f64()
            );
        }

        state.generation += 1;
        let generation = state.generation;
        state.holder = Some((generation, now));
        Some(SlotGuard { slot: self, generation })
    }

    /// Whether the slot is currently held by a non-stale holder.
    pub fn is_held(&self) -> bool {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        matches!(state.holder, Some((_, since)) if since.elapsed() < self.stale_after)
    }

    fn release(&self, generation: u64) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        // A reclaimed slot belongs to its new holder.
        if matches!(state.holder, Some((current, _)) if current == generation) {
            state.holder = None;
        }
    }
}

/// Holds the automation slot until dropped.
#[derive(Debug)]
pub struct SlotGuard<'a> {
    slot: &'a AutomationSlot,
    generation: u64,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.slot.release(self.generation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_is_exclusive() {
        let slot = AutomationSlot::default();
        let guard = slot.try_acquire();
        assert!(guard.is_some());
        assert!(slot.is_held());
        assert!(slot.try_acquire().is_none());
    }

    #[test]
    fn test_slot_released_on_drop() {
        let slot = AutomationSlot::default();
        drop(slot.try_acquire());
        assert!(!slot.is_held());
        assert!(slot.try_acquire().is_some());
    }

    fn holder_generation(slot: &AutomationSlot) -> Option<u64> {
        slot.state.lock().unwrap().holder.map(|(generation, _)| generation)
    }

    #[test]
    fn test_dropping_reclaimed_guard_keeps_new_holder() {
        let slot = AutomationSlot::new(Duration::ZERO);
        let first = slot.try_acquire().unwrap();
        let second = slot.try_acquire().unwrap();
        assert_ne!(first.generation, second.generation);

        drop(first);
        assert_eq!(holder_generation(&slot), Some(second.generation));

        drop(second);
        assert_eq!(holder_generation(&slot), None);
    }

    #[test]
    fn test_stale_slot_is_reclaimed() {
        let slot = AutomationSlot::new(Duration::ZERO);
        let first = slot.try_acquire().unwrap();
        let second = slot.try_acquire();
        assert!(second.is_some());
        drop(first);
        drop(second);
        assert!(!slot.is_held());
    }
}
