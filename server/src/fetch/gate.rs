use std::sync::atomic::{AtomicBool, Ordering};

/// Non-blocking in-flight guard. Overlapping callers are rejected, never queued.
#[derive(Debug, Default)]
pub struct FetchGate {
    in_flight: AtomicBool,
}

impl FetchGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the gate in flight. Returns `false` if something already holds it.
    pub fn try_enter(&self) -> bool {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn leave(&self) {
        self.in_flight.store(false, Ordering::Release);
    }

    #[cfg(test)]
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Scoped form of [`try_enter`](Self::try_enter): the gate is left when the permit drops.
    pub fn try_acquire(&self) -> Option<GatePermit<'_>> {
        self.try_enter().then(|| GatePermit { gate: self })
    }
}

#[must_use = "the gate is released as soon as the permit is dropped"]
#[derive(Debug)]
pub struct GatePermit<'a> {
    gate: &'a FetchGate,
}

impl Drop for GatePermit<'_> {
    fn drop(&mut self) {
        self.gate.leave();
    }
}
