use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Raw fields of the most recent well-formed telemetry line. Immutable once
/// built; replaced wholesale, never edited in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    pub fields: Vec<String>,
}

impl TelemetrySnapshot {
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Latest-snapshot handoff between the receiver task and readers. Cloning the
/// store clones the handle, not the data; the lock never leaves this module.
#[derive(Debug, Clone, Default)]
pub struct TelemetryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    latest: TelemetrySnapshot,
    published_at: Option<Instant>,
}

impl TelemetryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single writer: the receiver loop. Replacement is atomic from any
    /// reader's perspective.
    pub fn publish(&self, snapshot: TelemetrySnapshot) {
        let mut inner = self.inner.lock().unwrap();
        inner.latest = snapshot;
        inner.published_at = Some(Instant::now());
    }

    /// Most recently published snapshot, or the empty snapshot before the
    /// first publish.
    pub fn latest(&self) -> TelemetrySnapshot {
        self.inner.lock().unwrap().latest.clone()
    }

    /// Time since the last publish; `None` before the first one.
    pub fn age(&self) -> Option<Duration> {
        self.inner.lock().unwrap().published_at.map(|t| t.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty_with_no_age() {
        let store = TelemetryStore::new();
        assert!(store.latest().is_empty());
        assert!(store.age().is_none());
    }

    #[test]
    fn latest_returns_last_publish() {
        let store = TelemetryStore::new();
        store.publish(TelemetrySnapshot::new(vec!["12.3".into(), "45".into()]));
        store.publish(TelemetrySnapshot::new(vec!["99".into()]));
        assert_eq!(store.latest().fields, vec!["99"]);
        assert!(store.age().is_some());
    }

    #[test]
    fn concurrent_readers_never_see_a_torn_snapshot() {
        // The writer alternates between two internally consistent snapshots;
        // any mix of the two observed by a reader is a torn read.
        let store = TelemetryStore::new();
        let writer_store = store.clone();

        let writer = std::thread::spawn(move || {
            for i in 0..10_000u32 {
                let snap = if i % 2 == 0 {
                    TelemetrySnapshot::new(vec!["a".into(), "a".into(), "a".into()])
                } else {
                    TelemetrySnapshot::new(vec!["bb".into(), "bb".into(), "bb".into()])
                };
                writer_store.publish(snap);
            }
        });

        for _ in 0..10_000u32 {
            let snap = store.latest();
            if snap.is_empty() {
                continue;
            }
            assert_eq!(snap.fields.len(), 3);
            assert!(
                snap.fields.iter().all(|f| f == &snap.fields[0]),
                "torn snapshot: {:?}",
                snap.fields
            );
        }

        writer.join().unwrap();
    }
}
