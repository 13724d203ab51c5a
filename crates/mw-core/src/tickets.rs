//! Issue-tracker ticket identifiers (`PROJ-123`).

use std::sync::OnceLock;

use regex::Regex;

fn ticket_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"[A-Z][A-Z0-9]+-\d+").ok())
        .as_ref()
}

/// Project key of a ticket: the text before the first `-`.
///
/// Returns `None` when the ticket has no separator or an empty prefix.
pub fn project_key(ticket: &str) -> Option<&str> {
    match ticket.split_once('-') {
        Some((key, _)) if !key.is_empty() => Some(key),
        _ => None,
    }
}

/// Collect ticket ids from the given texts (branch name, title, ...),
/// deduplicated in first-seen order.
pub fn extract_ticket_ids<'a>(sources: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    let Some(pattern) = ticket_pattern() else {
        return found;
    };
    for text in sources {
        for m in pattern.find_iter(text) {
            if !found.iter().any(|t| t == m.as_str()) {
                found.push(m.as_str().to_string());
            }
        }
    }
    found
}
