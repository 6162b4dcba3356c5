use shared::models::{Side, Signal};
use std::collections::HashSet;

/// Append-only signal list for one session, sorted by time, unique per `(time, side)`.
#[derive(Debug, Clone, Default)]
pub struct SignalBook {
    signals: Vec<Signal>,
    keys: HashSet<(i64, Side)>,
}

impl SignalBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if a signal with the same time and side is already recorded.
    pub fn insert(&mut self, signal: Signal) -> bool {
        if !self.keys.insert(signal.key()) {
            return false;
        }
        let pos = self.signals.partition_point(|s| s.key() <= signal.key());
        self.signals.insert(pos, signal);
        true
    }

    /// Inserts every new signal; returns how many were added.
    pub fn extend(&mut self, signals: impl IntoIterator<Item = Signal>) -> usize {
        signals.into_iter().filter(|s| self.insert(*s)).count()
    }

    pub fn contains(&self, time: i64, side: Side) -> bool {
        self.keys.contains(&(time, side))
    }

    pub fn as_slice(&self) -> &[Signal] {
        &self.signals
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn clear(&mut self) {
        self.signals.clear();
        self.keys.clear();
    }
}
