//! Plain-text rendering of the chat views for the terminal.

use chrono::{DateTime, Utc};

use hacxorz_chat::{bar_width, classify, ConfidenceLevel, HistoryEntry, LOW_CONFIDENCE_ADVICE};
use hacxorz_core::events::NoticeLevel;
use hacxorz_core::types::{Confidence, Message, Nudge, NudgeKind, Sender, Session, SessionId};

/// Cells in a full confidence bar.
const BAR_CELLS: usize = 20;

pub fn confidence_bar(confidence: Confidence) -> String {
    let filled = (bar_width(confidence) as usize * BAR_CELLS + 50) / 100;
    format!("[{}{}]", "#".repeat(filled), ".".repeat(BAR_CELLS - filled))
}

/// One message, with its confidence line when `show_confidence` is set.
pub fn message(msg: &Message, show_confidence: bool, threshold: f64) -> String {
    let who = match msg.sender {
        Sender::User => "you",
        Sender::Assistant => "ai ",
    };
    let mut out = String::new();
    for (i, line) in msg.text.lines().enumerate() {
        if i == 0 {
            out.push_str(&format!("{}> {}", who, line));
        } else {
            out.push_str(&format!("\n     {}", line));
        }
    }

    if let (true, Some(confidence)) = (show_confidence, msg.confidence) {
        out.push_str(&format!(
            "\n     {} {}% confidence",
            confidence_bar(confidence),
            confidence.percent()
        ));
        if classify(confidence, threshold) == ConfidenceLevel::Low {
            out.push_str(&format!("\n     {}", LOW_CONFIDENCE_ADVICE));
        }
    }
    out
}

pub fn transcript(
    messages: &[Message],
    total: usize,
    show_confidence: bool,
    threshold: f64,
) -> String {
    if messages.is_empty() {
        return "(no messages yet)".to_string();
    }
    let mut lines: Vec<String> = messages
        .iter()
        .map(|m| message(m, show_confidence, threshold))
        .collect();
    if messages.len() < total {
        lines.push(format!(
            "(showing {} of {} messages, /more for the rest)",
            messages.len(),
            total
        ));
    }
    lines.join("\n")
}

/// Numbered history list; the active session is starred.
pub fn history(
    sessions: &[Session],
    active: Option<SessionId>,
    title_max_chars: usize,
    now: DateTime<Utc>,
) -> String {
    if sessions.is_empty() {
        return "(no chats yet)".to_string();
    }
    sessions
        .iter()
        .enumerate()
        .map(|(i, session)| {
            let marker = if Some(session.id) == active { '*' } else { ' ' };
            let count = session.message_count;
            let entry = HistoryEntry::new(session.clone(), title_max_chars, now);
            format!(
                "{} {:>2}. {}  ({}, {} message{})",
                marker,
                i + 1,
                entry.display_title,
                entry.date_label,
                count,
                if count == 1 { "" } else { "s" }
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn nudge(nudge: &Nudge) -> String {
    match nudge.kind {
        NudgeKind::Advisory => format!("  ~ {}", nudge.text),
        NudgeKind::ConfidenceWarning => format!("  ! {}", nudge.text),
    }
}

pub fn notice(level: NoticeLevel, title: &str, description: &str) -> String {
    match level {
        NoticeLevel::Info => format!("-- {}: {}", title, description),
        NoticeLevel::Error => format!("!! {}: {}", title, description),
    }
}

pub fn search_results(query: &str, matches: &[Message], searched: usize) -> String {
    let mut out = format!(
        "search \"{}\": {} of {} messages",
        query,
        matches.len(),
        searched
    );
    for m in matches {
        let first = m.text.lines().next().unwrap_or_default();
        out.push_str(&format!("\n  {}> {}", m.sender, first));
    }
    out
}
