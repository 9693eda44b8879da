use chrono::{DateTime, Local};

/// One server command sent during the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
  pub at: DateTime<Local>,
  pub command: String,
}

/// Server commands in the order they were sent.
#[derive(Debug, Clone, Default)]
pub struct History {
  entries: Vec<HistoryEntry>,
}

impl History {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn record(&mut self, command: impl Into<String>) {
    self.record_at(Local::now(), command);
  }

  pub fn record_at(&mut self, at: DateTime<Local>, command: impl Into<String>) {
    self.entries.push(HistoryEntry {
      at,
      command: command.into(),
    });
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Entries newest first.
  pub fn recent_first(&self) -> impl Iterator<Item = &HistoryEntry> {
    self.entries.iter().rev()
  }

  /// `position` counts from 1 in [`History::recent_first`] order.
  pub fn nth_recent(&self, position: usize) -> Option<&HistoryEntry> {
    position
      .checked_sub(1)
      .and_then(|offset| self.recent_first().nth(offset))
  }
}
