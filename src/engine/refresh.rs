use std::sync::mpsc::Sender;
use std::time::{Duration, SystemTime};

use super::interface::Event;

/// Data sets the engine can re-fetch on a timer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum RefreshTarget {
    Users,
    Products,
}

struct RefreshEntry {
    target: RefreshTarget,
    interval: Duration,
    notify_tx: Sender<Event>,
    // Wall clock: a monotonic clock stops during suspend and would delay
    // the first refresh after wake.
    last_fetch: Option<SystemTime>,
}

/// Tracks background refresh state for the engine.
#[derive(Default)]
pub struct RefreshScheduler {
    entries: Vec<RefreshEntry>,
}

impl RefreshScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a target, replacing any earlier registration for it. A zero
    /// interval unregisters.
    pub fn register(&mut self, target: RefreshTarget, interval: Duration, notify_tx: &Sender<Event>) {
        self.entries.retain(|e| e.target != target);
        if interval.is_zero() {
            return;
        }
        self.entries.push(RefreshEntry {
            target,
            interval,
            notify_tx: notify_tx.clone(),
            last_fetch: None,
        });
    }

    pub fn mark_fetched(&mut self, target: RefreshTarget) {
        self.mark_fetched_at(target, SystemTime::now());
    }

    fn mark_fetched_at(&mut self, target: RefreshTarget, at: SystemTime) {
        for entry in self.entries.iter_mut().filter(|e| e.target == target) {
            entry.last_fetch = Some(at);
        }
    }

    /// Entries whose interval has elapsed since their last fetch.
    ///
    /// Never-fetched entries are skipped: the initial load is requested by
    /// the view, background refresh only follows it.
    pub fn due_entries(&self) -> Vec<DueEntry> {
        self.due_at(SystemTime::now())
    }

    fn due_at(&self, now: SystemTime) -> Vec<DueEntry> {
        self.entries
            .iter()
            .filter(|e| {
                e.last_fetch
                    .is_some_and(|t| now.duration_since(t).unwrap_or(Duration::ZERO) >= e.interval)
            })
            .map(|e| DueEntry {
                target: e.target,
                notify_tx: e.notify_tx.clone(),
            })
            .collect()
    }

    /// Shortest registered interval, used to pace the engine's tick.
    pub fn shortest_interval(&self) -> Option<Duration> {
        self.entries.iter().map(|e| e.interval).min()
    }
}

/// An entry that is due for background refresh.
pub struct DueEntry {
    pub target: RefreshTarget,
    pub notify_tx: Sender<Event>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unfetched_entries_are_never_due() {
        let (tx, _rx) = std::sync::mpsc::channel();
        let mut s = RefreshScheduler::new();
        s.register(RefreshTarget::Users, Duration::from_secs(60), &tx);
        assert!(s.due_entries().is_empty());
    }

    #[test]
    fn entry_is_due_after_interval() {
        let (tx, _rx) = std::sync::mpsc::channel();
        let mut s = RefreshScheduler::new();
        s.register(RefreshTarget::Products, Duration::from_secs(300), &tx);
        let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        s.mark_fetched_at(RefreshTarget::Products, t0);

        assert!(s.due_at(t0 + Duration::from_secs(299)).is_empty());
        let due = s.due_at(t0 + Duration::from_secs(300));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].target, RefreshTarget::Products);
    }

    #[test]
    fn reregistering_replaces_and_zero_removes() {
        let (tx, _rx) = std::sync::mpsc::channel();
        let mut s = RefreshScheduler::new();
        s.register(RefreshTarget::Users, Duration::from_secs(600), &tx);
        s.register(RefreshTarget::Users, Duration::from_secs(60), &tx);
        assert_eq!(s.shortest_interval(), Some(Duration::from_secs(60)));
        s.register(RefreshTarget::Users, Duration::ZERO, &tx);
        assert_eq!(s.shortest_interval(), None);
    }
}
