use serde::{Deserialize, Serialize};

pub const DEFAULT_HISTORY_CAP: usize = 10;

const LABEL_MAX_CHARS: usize = 48;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub id: u64,
    pub code: String,
    /// Unix time in milliseconds.
    pub timestamp: u64,
    pub label: String,
}

#[derive(Debug)]
pub struct HistoryLog {
    entries: Vec<HistorySnapshot>,
    cap: usize,
    next_id: u64,
}

impl HistoryLog {
    pub fn new(cap: usize) -> Self {
        Self {
            entries: Vec::new(),
            cap: cap.max(1),
            next_id: 1,
        }
    }

    pub fn from_entries(mut entries: Vec<HistorySnapshot>, cap: usize) -> Self {
        let cap = cap.max(1);
        entries.truncate(cap);
        let next_id = entries.iter().map(|e| e.id).max().unwrap_or(0) + 1;
        Self {
            entries,
            cap,
            next_id,
        }
    }

    /// Newest first.
    pub fn entries(&self) -> &[HistorySnapshot] {
        &self.entries
    }

    pub fn get(&self, id: u64) -> Option<&HistorySnapshot> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Dedup by trimmed-code equality, most-recent-wins: an existing match
    /// moves to the front with a refreshed timestamp. Blank code is never
    /// recorded. Returns whether the log changed.
    pub fn record(&mut self, code: &str, timestamp: u64) -> bool {
        let trimmed = code.trim();
        if trimmed.is_empty() {
            return false;
        }

        if let Some(pos) = self.entries.iter().position(|e| e.code.trim() == trimmed) {
            let mut entry = self.entries.remove(pos);
            entry.timestamp = timestamp;
            self.entries.insert(0, entry);
            return true;
        }

        let entry = HistorySnapshot {
            id: self.next_id,
            code: code.to_string(),
            timestamp,
            label: snapshot_label(trimmed),
        };
        self.next_id += 1;
        self.entries.insert(0, entry);
        self.entries.truncate(self.cap);
        true
    }
}

/// First non-empty line, truncated on a char boundary.
fn snapshot_label(trimmed_code: &str) -> String {
    let line = trimmed_code
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("");
    line.chars().take(LABEL_MAX_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_code_keeps_one_entry_with_latest_timestamp() {
        let mut log = HistoryLog::new(DEFAULT_HISTORY_CAP);
        assert!(log.record("flowchart TD\n  A --> B", 1_000));
        assert!(log.record("flowchart TD\n  A --> B\n", 2_000));
        assert_eq!(log.entries().len(), 1);
        assert_eq!(log.entries()[0].timestamp, 2_000);
    }

    #[test]
    fn most_recent_wins_ordering() {
        let mut log = HistoryLog::new(DEFAULT_HISTORY_CAP);
        log.record("one", 1);
        log.record("two", 2);
        log.record("one", 3);
        let codes: Vec<_> = log.entries().iter().map(|e| e.code.as_str()).collect();
        assert_eq!(codes, ["one", "two"]);
        assert_eq!(log.entries()[0].timestamp, 3);
    }

    #[test]
    fn log_is_capped() {
        let mut log = HistoryLog::new(3);
        for i in 0..10u64 {
            log.record(&format!("graph {i}"), i);
        }
        assert_eq!(log.entries().len(), 3);
        assert_eq!(log.entries()[0].code, "graph 9");
    }

    #[test]
    fn blank_code_is_not_recorded() {
        let mut log = HistoryLog::new(DEFAULT_HISTORY_CAP);
        assert!(!log.record("   \n\t", 1));
        assert!(log.entries().is_empty());
    }

    #[test]
    fn label_is_first_non_empty_line() {
        let mut log = HistoryLog::new(DEFAULT_HISTORY_CAP);
        log.record("\n  sequenceDiagram\n  A->>B: hi", 1);
        assert_eq!(log.entries()[0].label, "sequenceDiagram");
    }

    #[test]
    fn rebuild_continues_id_sequence() {
        let entries = vec![HistorySnapshot {
            id: 7,
            code: "graph".to_string(),
            timestamp: 1,
            label: "graph".to_string(),
        }];
        let mut log = HistoryLog::from_entries(entries, DEFAULT_HISTORY_CAP);
        log.record("other", 2);
        assert_eq!(log.entries()[0].id, 8);
    }
}
