//! Bounded, append-only display log.
//!
//! Written by the watch loop, read by the presentation layer. This is
//! a display cache, not a durable store: retention is FIFO-bounded
//! and records are never mutated after append.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::message::DisplayRecord;

/// Thread-safe ordered sequence of display records.
#[derive(Debug)]
pub struct ChatLog {
    inner: Mutex<Inner>,
    retention: usize,
}

#[derive(Debug)]
struct Inner {
    records: VecDeque<DisplayRecord>,
    /// Total appends since creation, including evicted records.
    appended: u64,
}

impl ChatLog {
    /// Create a log keeping at most `retention` records.
    pub fn new(retention: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                records: VecDeque::with_capacity(retention.min(256)),
                appended: 0,
            }),
            retention: retention.max(1),
        }
    }

    /// Append one record, evicting the oldest when over the bound.
    pub fn append(&self, record: DisplayRecord) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.records.push_back(record);
        inner.appended += 1;
        while inner.records.len() > self.retention {
            inner.records.pop_front();
        }
    }

    /// Snapshot of the newest `n` records, oldest first.
    pub fn tail(&self, n: usize) -> Vec<DisplayRecord> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let skip = inner.records.len().saturating_sub(n);
        inner.records.iter().skip(skip).cloned().collect()
    }

    /// Snapshot of everything currently retained, oldest first.
    pub fn snapshot(&self) -> Vec<DisplayRecord> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.records.iter().cloned().collect()
    }

    /// Number of records currently retained.
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .records
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total appends since creation, including records already evicted.
    /// Lets a reader detect new records without diffing snapshots.
    pub fn total_appended(&self) -> u64 {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .appended
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(text: &str) -> DisplayRecord {
        DisplayRecord::system(text)
    }

    #[test]
    fn test_append_preserves_order() {
        let log = ChatLog::new(10);
        for i in 0..5 {
            log.append(record(&format!("m{i}")));
        }
        let texts: Vec<_> = log.snapshot().into_iter().map(|r| r.text).collect();
        assert_eq!(texts, vec!["m0", "m1", "m2", "m3", "m4"]);
    }

    #[test]
    fn test_retention_bound_evicts_fifo() {
        let log = ChatLog::new(3);
        for i in 0..7 {
            log.append(record(&format!("m{i}")));
        }
        assert_eq!(log.len(), 3);
        let texts: Vec<_> = log.snapshot().into_iter().map(|r| r.text).collect();
        assert_eq!(texts, vec!["m4", "m5", "m6"]);
        assert_eq!(log.total_appended(), 7);
    }

    #[test]
    fn test_tail_returns_newest() {
        let log = ChatLog::new(10);
        for i in 0..5 {
            log.append(record(&format!("m{i}")));
        }
        let texts: Vec<_> = log.tail(2).into_iter().map(|r| r.text).collect();
        assert_eq!(texts, vec!["m3", "m4"]);

        let all: Vec<_> = log.tail(100).into_iter().map(|r| r.text).collect();
        assert_eq!(all.len(), 5);
    }

    #[test]
    fn test_zero_retention_clamps_to_one() {
        let log = ChatLog::new(0);
        log.append(record("a"));
        log.append(record("b"));
        assert_eq!(log.len(), 1);
        assert_eq!(log.snapshot()[0].text, "b");
    }

    #[test]
    fn test_concurrent_appends_and_reads() {
        use std::sync::Arc;

        let log = Arc::new(ChatLog::new(64));
        let mut handles = Vec::new();
        for t in 0..4 {
            let log = log.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..100 {
                    log.append(record(&format!("t{t}-{i}")));
                    let _ = log.tail(10);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(log.total_appended(), 400);
        assert_eq!(log.len(), 64);
    }
}
