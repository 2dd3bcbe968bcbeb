use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::core::decision::{Action, ActionKind};

/// A dispatched action and when it was taken.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionRecord {
    pub action: Action,
    pub taken_at_ms: u64,
}

impl ActionRecord {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            taken_at_ms: unix_millis(),
        }
    }

    /// Short description without identifier values.
    pub fn describe(&self) -> String {
        match &self.action.kind {
            ActionKind::PressDigit { digits } => format!("press_digit {digits}"),
            other => other.name().to_string(),
        }
    }
}

/// Bounded log of the most recent dispatched actions, oldest first.
#[derive(Debug, Clone)]
pub struct ActionHistory {
    records: VecDeque<ActionRecord>,
    limit: usize,
}

impl ActionHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(limit),
            limit: limit.max(1),
        }
    }

    pub fn push(&mut self, record: ActionRecord) {
        if self.records.len() == self.limit {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// The last `n` records, oldest first.
    pub fn recent(&self, n: usize) -> Vec<ActionRecord> {
        let skip = self.records.len().saturating_sub(n);
        self.records.iter().skip(skip).cloned().collect()
    }

    pub fn snapshot(&self) -> Vec<ActionRecord> {
        self.records.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

pub(crate) fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_keeps_last_entries_in_order() {
        let mut history = ActionHistory::new(3);
        for digit in ["1", "2", "3", "4"] {
            history.push(ActionRecord::new(Action::press(digit, "menu")));
        }

        let described: Vec<_> = history.snapshot().iter().map(|r| r.describe()).collect();
        assert_eq!(described, ["press_digit 2", "press_digit 3", "press_digit 4"]);

        let recent: Vec<_> = history.recent(2).iter().map(|r| r.describe()).collect();
        assert_eq!(recent, ["press_digit 3", "press_digit 4"]);
        assert_eq!(history.recent(10).len(), 3);
    }
}
