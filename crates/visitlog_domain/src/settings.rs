use chrono::{DateTime, Utc};

pub const SETTINGS_RECORD_ID: i64 = 1;
pub const LOG_LINE_SEPARATOR: &str = "\r\n";
const LOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LogEvent {
    InitialRecord,
    Loaded,
    Saved,
}

impl LogEvent {
    pub fn message(self) -> &'static str {
        match self {
            LogEvent::InitialRecord => "Initial settings record added.",
            LogEvent::Loaded => "Settings loaded.",
            LogEvent::Saved => "Settings saved.",
        }
    }
}

pub fn format_log_line(event: LogEvent, at: DateTime<Utc>) -> String {
    format!("{}: {}", at.format(LOG_TIMESTAMP_FORMAT), event.message())
}

/// The single persisted settings row.
#[derive(Clone, Debug, PartialEq)]
pub struct SettingsRecord {
    pub id: i64,
    pub name: String,
    pub visit_count: u32,
    pub last_visit_at: DateTime<Utc>,
    pub receive_notifications: bool,
    pub log_text: String,
}

impl SettingsRecord {
    /// Record written on the very first page visit.
    pub fn initial(id: i64, now: DateTime<Utc>) -> Self {
        let mut record = Self {
            id,
            name: String::new(),
            visit_count: 1,
            last_visit_at: now,
            receive_notifications: false,
            log_text: String::new(),
        };
        record.append_log(LogEvent::InitialRecord, now);
        record
    }

    pub fn append_log(&mut self, event: LogEvent, at: DateTime<Utc>) {
        if !self.log_text.is_empty() {
            self.log_text.push_str(LOG_LINE_SEPARATOR);
        }
        self.log_text.push_str(&format_log_line(event, at));
    }

    pub fn record_visit(&mut self, at: DateTime<Utc>) {
        self.visit_count = self.visit_count.saturating_add(1);
        self.append_log(LogEvent::Loaded, at);
    }

    pub fn log_lines(&self) -> impl Iterator<Item = &str> {
        self.log_text
            .split(LOG_LINE_SEPARATOR)
            .filter(|line| !line.is_empty())
    }
}
