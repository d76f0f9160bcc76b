use std::sync::atomic::{AtomicUsize, Ordering};

/// Count of operations sitting between their optimistic phase and resolution.
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    count: AtomicUsize,
}

impl InFlight {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Claims a slot held until the returned guard is dropped.
    pub(crate) fn enter(&self) -> InFlightSlot<'_> {
        self.count.fetch_add(1, Ordering::SeqCst);
        InFlightSlot { owner: self }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.count.load(Ordering::SeqCst) > 0
    }
}

/// Releases its slot on drop, including when the awaiting `update` future is
/// cancelled before the collaborator answers.
#[derive(Debug)]
pub(crate) struct InFlightSlot<'a> {
    owner: &'a InFlight,
}

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        self.owner.count.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_release_on_drop() {
        let in_flight = InFlight::new();
        assert!(!in_flight.is_active());

        let first = in_flight.enter();
        let second = in_flight.enter();
        assert!(in_flight.is_active());

        drop(first);
        assert!(in_flight.is_active());
        drop(second);
        assert!(!in_flight.is_active());
    }
}
