//! Presentation helpers for the session history list.

use chrono::{DateTime, Utc};

use hacxorz_core::types::Session;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// A session as shown in the history panel.
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryEntry {
    pub session: Session,
    pub display_title: String,
    pub date_label: String,
}

impl HistoryEntry {
    pub fn new(session: Session, title_max_chars: usize, now: DateTime<Utc>) -> Self {
        Self {
            display_title: truncate_title(&session.title, title_max_chars),
            date_label: date_label(session.updated_at, now),
            session,
        }
    }
}

/// Keep at most `max_chars` characters, marking the cut with `...`.
pub fn truncate_title(title: &str, max_chars: usize) -> String {
    if title.chars().count() <= max_chars {
        return title.to_string();
    }
    let mut cut: String = title.chars().take(max_chars).collect();
    cut.push_str("...");
    cut
}

/// Relative label for a session's last activity. Days are counted as whole
/// 24h periods rounded up, so anything within the last day is "Today".
pub fn date_label(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = (now - at).num_milliseconds().abs();
    let days = (elapsed + DAY_MS - 1) / DAY_MS;
    match days {
        0 | 1 => "Today".to_string(),
        2 => "Yesterday".to_string(),
        3..=7 => format!("{} days ago", days - 1),
        _ => at.format("%Y-%m-%d").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use hacxorz_core::types::SessionId;

    #[test]
    fn test_truncate_title() {
        assert_eq!(truncate_title("short", 30), "short");
        let long = "a".repeat(31);
        assert_eq!(truncate_title(&long, 30), format!("{}...", "a".repeat(30)));
        assert_eq!(truncate_title(&"b".repeat(30), 30), "b".repeat(30));
        // Multi-byte characters are counted, not bytes.
        assert_eq!(truncate_title("héllo wörld", 5), "héllo...");
    }

    #[test]
    fn test_date_labels() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        assert_eq!(date_label(now, now), "Today");
        assert_eq!(date_label(now - Duration::hours(23), now), "Today");
        assert_eq!(date_label(now - Duration::hours(25), now), "Yesterday");
        assert_eq!(date_label(now - Duration::hours(49), now), "2 days ago");
        assert_eq!(date_label(now - Duration::days(7), now), "6 days ago");
        assert_eq!(date_label(now - Duration::days(10), now), "2024-02-29");
    }

    #[test]
    fn test_history_entry() {
        let now = Utc::now();
        let session = Session {
            id: SessionId::new(),
            title: "What is the capital of Australia, anyway?".into(),
            created_at: now,
            updated_at: now,
            message_count: 4,
        };
        let entry = HistoryEntry::new(session, 30, now);
        assert_eq!(entry.display_title, "What is the capital of Austral...");
        assert_eq!(entry.date_label, "Today");
        assert_eq!(entry.session.message_count, 4);
    }
}
