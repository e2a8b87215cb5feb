use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const MAX_HISTORY: usize = 500;
const CHART_SESSIONS: usize = 5;
const MS_PER_MINUTE: u64 = 60_000;

/// One finished session. Both fields are milliseconds.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct SessionRecord {
    /// Unix epoch time the session ended. Zero for entries migrated from the
    /// old duration-only format.
    pub timestamp: i64,
    pub duration: u64,
}

impl SessionRecord {
    pub fn finished_now(duration: Duration) -> Self {
        Self {
            timestamp: Local::now().timestamp_millis(),
            duration: duration.as_millis() as u64,
        }
    }

    fn local_time(&self) -> Option<DateTime<Local>> {
        if self.timestamp <= 0 {
            return None;
        }
        Local.timestamp_millis_opt(self.timestamp).single()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredEntry {
    Record(SessionRecord),
    Legacy(f64),
}

impl From<StoredEntry> for SessionRecord {
    fn from(entry: StoredEntry) -> Self {
        match entry {
            StoredEntry::Record(r) => r,
            StoredEntry::Legacy(ms) => Self {
                timestamp: 0,
                duration: ms.max(0.0) as u64,
            },
        }
    }
}

/// Finished sessions, oldest first.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(from = "Vec<StoredEntry>", into = "Vec<SessionRecord>")]
pub struct History {
    records: Vec<SessionRecord>,
}

impl From<Vec<StoredEntry>> for History {
    fn from(entries: Vec<StoredEntry>) -> Self {
        Self::from_records(entries.into_iter().map(SessionRecord::from).collect())
    }
}

impl From<History> for Vec<SessionRecord> {
    fn from(history: History) -> Self {
        history.records
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GoalProgress {
    pub filled: usize,
    pub total: usize,
}

impl History {
    pub fn from_records(records: Vec<SessionRecord>) -> Self {
        let mut history = Self { records };
        history.trim();
        history
    }

    #[cfg(test)]
    pub fn records(&self) -> &[SessionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn push(&mut self, record: SessionRecord) {
        self.records.push(record);
        self.trim();
    }

    fn trim(&mut self) {
        if self.len() > MAX_HISTORY {
            let excess = self.len() - MAX_HISTORY;
            self.records.drain(..excess);
        }
    }

    pub fn last_duration(&self) -> u64 {
        self.records.last().map_or(0, |r| r.duration)
    }

    pub fn highest_duration(&self) -> u64 {
        self.records.iter().map(|r| r.duration).max().unwrap_or(0)
    }

    pub fn total_duration(&self) -> u64 {
        self.records.iter().map(|r| r.duration).sum()
    }

    /// Whole minutes of the latest session against the goal, one dot per
    /// goal minute.
    pub fn goal_progress(&self, goal_minutes: u64) -> GoalProgress {
        let total = goal_minutes.max(1) as usize;
        let minutes = (self.last_duration() / MS_PER_MINUTE) as usize;
        GoalProgress {
            filled: minutes.min(total),
            total,
        }
    }

    /// Label / minutes pairs for the last few sessions. Labels are 1-based
    /// positions in the whole history.
    pub fn chart_data(&self) -> Vec<(String, f64)> {
        if self.is_empty() {
            return vec![("1".into(), 0.0)];
        }
        let offset = self.len().saturating_sub(CHART_SESSIONS);
        self.records[offset..]
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let minutes = r.duration as f64 / MS_PER_MINUTE as f64;
                ((offset + i + 1).to_string(), (minutes * 100.0).round() / 100.0)
            })
            .collect()
    }

    pub fn sessions_on(&self, day: chrono::NaiveDate) -> usize {
        self.records
            .iter()
            .filter_map(SessionRecord::local_time)
            .filter(|t| t.date_naive() == day)
            .count()
    }

    pub fn export_csv(&self) -> String {
        let mut csv = format!(
            "Sessions,Total (min),Highest (min)\n{},{:.2},{:.2}\n\n",
            self.len(),
            self.total_duration() as f64 / MS_PER_MINUTE as f64,
            self.highest_duration() as f64 / MS_PER_MINUTE as f64,
        );

        csv.push_str("Session History\n#,Finished,Duration\n");
        for (i, r) in self.records.iter().enumerate() {
            let finished = r
                .local_time()
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "Unknown".into());
            csv.push_str(&format!(
                "{},{},{}\n",
                i + 1,
                finished,
                format_timer(Duration::from_millis(r.duration))
            ));
        }
        csv
    }
}

/// `MM:SS`, zero padded. Minutes keep counting past an hour.
pub fn format_timer(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
