//! Time-windowed transcript buffers and the fan-out that feeds them.
//!
//! Every analysis loop owns its own [`TranscriptBuffer`]. The audio bridge
//! publishes each recognized fragment through a [`TranscriptFanout`] whose
//! subscriber set is fixed when the call is created.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

/// A recognized text fragment and the moment it was observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub text: String,
    pub observed_at: Instant,
}

/// Ordered fragments retained for a fixed horizon.
///
/// Entries older than the horizon are evicted on every append and before
/// every read, so a snapshot never contains text older than the horizon.
#[derive(Debug)]
pub struct TranscriptBuffer {
    entries: VecDeque<TranscriptEntry>,
    horizon: Duration,
}

impl TranscriptBuffer {
    pub fn new(horizon: Duration) -> Self {
        Self {
            entries: VecDeque::new(),
            horizon,
        }
    }

    /// Append a fragment stamped with the current time. Blank fragments are ignored.
    pub fn append(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        let now = Instant::now();
        self.entries.push_back(TranscriptEntry {
            text: text.to_string(),
            observed_at: now,
        });
        self.evict(now);
    }

    /// Concatenate all retained fragments, oldest first, separated by a single space.
    pub fn snapshot(&mut self) -> String {
        self.evict(Instant::now());
        self.entries
            .iter()
            .map(|entry| entry.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Retained entries after eviction.
    pub fn entries(&mut self) -> Vec<TranscriptEntry> {
        self.evict(Instant::now());
        self.entries.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&mut self) -> bool {
        self.evict(Instant::now());
        self.entries.is_empty()
    }

    fn evict(&mut self, now: Instant) {
        while let Some(front) = self.entries.front() {
            if now.saturating_duration_since(front.observed_at) > self.horizon {
                self.entries.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Receiver of recognized transcript fragments.
///
/// Implementations must not block: they are called on the audio ingestion path.
pub trait TranscriptSink: Send + Sync {
    fn push_transcript(&self, text: &str);
}

/// Fixed set of transcript subscribers for one call.
#[derive(Clone, Default)]
pub struct TranscriptFanout {
    sinks: Arc<[Arc<dyn TranscriptSink>]>,
}

impl TranscriptFanout {
    pub fn new(sinks: Vec<Arc<dyn TranscriptSink>>) -> Self {
        Self {
            sinks: sinks.into(),
        }
    }

    /// Deliver one fragment to every subscriber.
    pub fn publish(&self, text: &str) {
        for sink in self.sinks.iter() {
            sink.push_transcript(text);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sinks.len()
    }
}

impl std::fmt::Debug for TranscriptFanout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranscriptFanout")
            .field("subscribers", &self.sinks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use tokio::time::advance;

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_joins_fragments_in_order() {
        let mut buffer = TranscriptBuffer::new(Duration::from_secs(15));
        buffer.append("for claims status press 1");
        buffer.append("  ");
        buffer.append("for eligibility press 2");

        assert_eq!(
            buffer.snapshot(),
            "for claims status press 1 for eligibility press 2"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_older_than_horizon_are_evicted_before_read() {
        let mut buffer = TranscriptBuffer::new(Duration::from_secs(15));
        buffer.append("old prompt");
        advance(Duration::from_secs(10)).await;
        buffer.append("fresh prompt");
        advance(Duration::from_secs(6)).await;

        assert_eq!(buffer.snapshot(), "fresh prompt");

        advance(Duration::from_secs(10)).await;
        assert!(buffer.is_empty());
        assert_eq!(buffer.snapshot(), "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_horizon_holds_over_many_ticks() {
        let horizon = Duration::from_secs(30);
        let mut buffer = TranscriptBuffer::new(horizon);

        for i in 0..40 {
            buffer.append(&format!("fragment {i}"));
            advance(Duration::from_millis(1700)).await;
            let now = Instant::now();
            for entry in buffer.entries() {
                assert!(now.duration_since(entry.observed_at) <= horizon);
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_empties_buffer() {
        let mut buffer = TranscriptBuffer::new(Duration::from_secs(15));
        buffer.append("please enter your member id");
        buffer.clear();
        assert!(buffer.is_empty());
    }

    struct Collect(Mutex<Vec<String>>);

    impl TranscriptSink for Collect {
        fn push_transcript(&self, text: &str) {
            self.0.lock().push(text.to_string());
        }
    }

    #[test]
    fn test_fanout_delivers_to_every_subscriber() {
        let a = Arc::new(Collect(Mutex::new(Vec::new())));
        let b = Arc::new(Collect(Mutex::new(Vec::new())));
        let fanout = TranscriptFanout::new(vec![
            a.clone() as Arc<dyn TranscriptSink>,
            b.clone() as Arc<dyn TranscriptSink>,
        ]);

        fanout.publish("please hold");

        assert_eq!(fanout.subscriber_count(), 2);
        assert_eq!(a.0.lock().as_slice(), ["please hold"]);
        assert_eq!(b.0.lock().as_slice(), ["please hold"]);
    }
}
