// Utility functions

use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard};

/// Lock a mutex, recovering the guard if a previous holder panicked.
///
/// Append-only logs stay usable after a panicking writer; the data written
/// before the panic is still valid.
pub fn lock_mutex_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            log::warn!("Mutex was poisoned, recovering: {}", poisoned);
            poisoned.into_inner()
        }
    }
}

/// Normalize a label (phase name, agent id) for table lookups.
///
/// Lowercases, trims, and collapses internal whitespace, so that
/// "  Market   Research" and "market research" compare equal.
pub fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Split text into lowercase alphanumeric tokens.
///
/// Each token is also inserted in a singular form (trailing "s" dropped) so
/// that "ideas" matches the tag "idea" and vice versa.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    let mut tokens = BTreeSet::new();

    for raw in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        let token = raw.to_lowercase();
        if token.len() > 3 && token.ends_with('s') {
            tokens.insert(token[..token.len() - 1].to_string());
        }
        tokens.insert(token);
    }

    tokens
}

/// Collapse any run of whitespace to a single space and trim.
///
/// Used for phrase matching of multi-word capability tags.
pub fn collapse_whitespace(text: &str) -> String {
    normalize_label(text)
}

/// Truncate text to at most `max_chars` characters, appending an ellipsis when cut
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}
