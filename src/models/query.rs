// Inbound query context

use serde::{Deserialize, Serialize};

/// Speaker of a prior conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryRole {
    User,
    Assistant,
}

impl HistoryRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryRole::User => "user",
            HistoryRole::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for HistoryRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One prior turn of the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryTurn {
    pub role: HistoryRole,
    pub content: String,
}

/// Everything the coordinator knows about one inbound query.
///
/// Created once per query by the upstream layer and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryContext {
    /// Raw query text as typed by the user
    #[serde(default)]
    pub text: String,
    /// Lifecycle phase the product is currently in (e.g. "Market Research")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Prior turns, oldest first
    #[serde(default)]
    pub history: Vec<HistoryTurn>,
}

impl QueryContext {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_phase(mut self, phase: impl Into<String>) -> Self {
        self.phase = Some(phase.into());
        self
    }

    pub fn with_product(mut self, product_id: impl Into<String>) -> Self {
        self.product_id = Some(product_id.into());
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_history(mut self, history: Vec<HistoryTurn>) -> Self {
        self.history = history;
        self
    }

    /// Phase name normalized for table lookups, `None` when absent or blank
    pub fn normalized_phase(&self) -> Option<String> {
        self.phase
            .as_deref()
            .map(crate::utils::normalize_label)
            .filter(|p| !p.is_empty())
    }

    /// The most recent `window` turns of history, oldest first
    pub fn recent_history(&self, window: usize) -> &[HistoryTurn] {
        let start = self.history.len().saturating_sub(window);
        &self.history[start..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_phase() {
        let ctx = QueryContext::new("q").with_phase("  Market   Research ");
        assert_eq!(ctx.normalized_phase().as_deref(), Some("market research"));
    }

    #[test]
    fn test_blank_phase_is_none() {
        let ctx = QueryContext::new("q").with_phase("   ");
        assert_eq!(ctx.normalized_phase(), None);
    }

    #[test]
    fn test_recent_history_window() {
        let history = (0..5)
            .map(|i| HistoryTurn {
                role: HistoryRole::User,
                content: format!("turn {}", i),
            })
            .collect();
        let ctx = QueryContext::new("q").with_history(history);

        let recent = ctx.recent_history(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].content, "turn 3");
        assert_eq!(ctx.recent_history(10).len(), 5);
    }

    #[test]
    fn test_query_context_deserializes_camel_case() {
        let json = r#"{"text": "hi", "phase": "Ideation", "productId": "p-1"}"#;
        let ctx: QueryContext = serde_json::from_str(json).unwrap();
        assert_eq!(ctx.product_id.as_deref(), Some("p-1"));
        assert!(ctx.history.is_empty());
    }
}
