// Prompt templates for routed agents

use crate::models::{AgentDescriptor, QueryContext, ResponseSection};

/// Base prompt every specialist receives
pub const SPECIALIST_SYSTEM_PROMPT: &str = r#"You are the {{agent_name}} specialist of a product management assistant.

Your focus areas: {{focus}}
Current product phase: {{phase}}

Your role is to:
1. Answer the user's query from your specialty's point of view
2. Give specific, actionable recommendations
3. Call out assumptions and open questions

Guidelines:
- Be concise and concrete
- Prefer evidence and reasoning over generic advice
- Stay within your specialty; other specialists cover the rest

End your answer with a line "Confidence: NN%" rating how confident you are (1-100).
"#;

/// Rebuttal prompt for the second debate round
pub const REBUTTAL_PROMPT: &str = r#"You are taking part in a structured debate between product specialists.

Your first-round position:
{{own_position}}

Positions of the other specialists:
{{other_positions}}

Your role is to:
1. Identify points of agreement and reinforce strong arguments
2. Challenge assumptions or conclusions that seem weak
3. Refine your own position in light of the others

Output format (Markdown):
### Agreements
### Challenges
### Refined Position
"#;

/// Synthesis prompt for merging debate positions
pub const DEBATE_SYNTHESIS_PROMPT: &str = r#"You are the moderator of a debate between product specialists. Merge their positions into one answer for the user.

User query: {{query}}

Final positions:
{{positions}}

Guidelines:
- Give more weight to positions with higher stated confidence
- Preserve specific recommendations
- Where specialists disagree, present the trade-off and recommend one option
"#;

fn render_focus(agent: &AgentDescriptor) -> String {
    if agent.capabilities.is_empty() {
        "general product questions".to_string()
    } else {
        agent
            .capabilities
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn render_history(context: &QueryContext, window: usize) -> Option<String> {
    let turns = context.recent_history(window);
    if turns.is_empty() {
        return None;
    }
    let mut out = String::new();
    for turn in turns {
        out.push_str(&format!("**{}:** {}\n", turn.role, turn.content.trim()));
    }
    Some(out)
}

/// Format contributions as headed blocks
pub fn format_contributions(sections: &[ResponseSection]) -> String {
    let mut formatted = String::new();
    for section in sections {
        formatted.push_str(&format!(
            "### {} (agent: {})\n\n{}\n\n---\n\n",
            section.heading,
            section.agent_id,
            section.content.trim()
        ));
    }
    formatted
}

/// Prompt for a plain request to one agent
pub fn build_agent_prompt(agent: &AgentDescriptor, context: &QueryContext, window: usize) -> String {
    let system = SPECIALIST_SYSTEM_PROMPT
        .replace("{{agent_name}}", &agent.display_name)
        .replace("{{focus}}", &render_focus(agent))
        .replace(
            "{{phase}}",
            context.phase.as_deref().unwrap_or("not specified"),
        );

    let mut prompt = system;
    if let Some(history) = render_history(context, window) {
        prompt.push_str(&format!("\n## Conversation So Far\n{}", history));
    }
    prompt.push_str(&format!("\n## User Query\n{}", context.text.trim()));
    prompt
}

/// Prompt for the next agent in a sequential chain
pub fn build_sequential_prompt(
    agent: &AgentDescriptor,
    context: &QueryContext,
    window: usize,
    previous: &[ResponseSection],
) -> String {
    let base = build_agent_prompt(agent, context, window);
    if previous.is_empty() {
        return base;
    }
    format!(
        "{}\n\n## Previous Findings\nBuild on and expand the following input from other specialists:\n\n{}",
        base,
        format_contributions(previous)
    )
}

/// Prompt for a supporting agent consulted by the primary
pub fn build_consultation_prompt(
    agent: &AgentDescriptor,
    primary: &AgentDescriptor,
    context: &QueryContext,
    window: usize,
    draft: Option<&str>,
) -> String {
    let mut prompt = build_agent_prompt(agent, context, window);
    prompt.push_str(&format!(
        "\n\n## Consultation\nThe {} specialist is leading this answer and asks for your input.",
        primary.display_name
    ));
    if let Some(draft) = draft {
        prompt.push_str(&format!(
            " Review their draft and add what your specialty would change or contribute.\n\n### Draft\n{}",
            draft.trim()
        ));
    }
    prompt
}

/// Prompt asking the primary to produce the final collaborative answer
pub fn build_final_answer_prompt(
    primary: &AgentDescriptor,
    context: &QueryContext,
    window: usize,
    draft: &str,
    consultations: &[ResponseSection],
) -> String {
    let mut prompt = build_agent_prompt(primary, context, window);
    prompt.push_str(&format!("\n\n## Your Draft\n{}", draft.trim()));
    if consultations.is_empty() {
        prompt.push_str("\n\nNo other specialist could be consulted. Finalize your draft.");
    } else {
        prompt.push_str(&format!(
            "\n\n## Specialist Input\nIncorporate the following input into one final answer:\n\n{}",
            format_contributions(consultations)
        ));
    }
    prompt
}

/// Prompt for a second-round debate rebuttal
pub fn build_rebuttal_prompt(
    agent: &AgentDescriptor,
    context: &QueryContext,
    window: usize,
    own_position: &str,
    others: &[ResponseSection],
) -> String {
    let rebuttal = REBUTTAL_PROMPT
        .replace("{{own_position}}", own_position.trim())
        .replace("{{other_positions}}", &format_contributions(others));
    format!("{}\n\n{}", build_agent_prompt(agent, context, window), rebuttal)
}

/// Prompt asking the primary to merge all debate positions
pub fn build_debate_synthesis_prompt(context: &QueryContext, positions: &[ResponseSection]) -> String {
    DEBATE_SYNTHESIS_PROMPT
        .replace("{{query}}", context.text.trim())
        .replace("{{positions}}", &format_contributions(positions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HistoryRole, HistoryTurn};

    fn agent() -> AgentDescriptor {
        AgentDescriptor::new("research", "Research").with_capabilities(["market", "trend"])
    }

    fn section(agent_id: &str, content: &str) -> ResponseSection {
        ResponseSection {
            heading: format!("{} Insights", agent_id),
            agent_id: agent_id.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_build_agent_prompt() {
        let ctx = QueryContext::new("What are the market trends?").with_phase("Market Research");
        let prompt = build_agent_prompt(&agent(), &ctx, 4);
        assert!(prompt.contains("Research specialist"));
        assert!(prompt.contains("market, trend"));
        assert!(prompt.contains("Current product phase: Market Research"));
        assert!(prompt.ends_with("What are the market trends?"));
        assert!(!prompt.contains("Conversation So Far"));
    }

    #[test]
    fn test_history_window_applied() {
        let history = (0..5)
            .map(|i| HistoryTurn {
                role: HistoryRole::User,
                content: format!("turn {}", i),
            })
            .collect();
        let ctx = QueryContext::new("next").with_history(history);
        let prompt = build_agent_prompt(&agent(), &ctx, 2);
        assert!(prompt.contains("turn 3"));
        assert!(prompt.contains("turn 4"));
        assert!(!prompt.contains("turn 2"));
    }

    #[test]
    fn test_sequential_prompt_carries_previous_output() {
        let ctx = QueryContext::new("Plan the launch");
        let prompt = build_sequential_prompt(&agent(), &ctx, 0, &[section("prd", "Scope is v1 only")]);
        assert!(prompt.contains("## Previous Findings"));
        assert!(prompt.contains("Scope is v1 only"));
    }

    #[test]
    fn test_consultation_prompt_with_and_without_draft() {
        let primary = AgentDescriptor::new("prd", "Requirements");
        let ctx = QueryContext::new("Write requirements");
        let with = build_consultation_prompt(&agent(), &primary, &ctx, 0, Some("Draft text"));
        assert!(with.contains("Requirements specialist is leading"));
        assert!(with.contains("Draft text"));

        let without = build_consultation_prompt(&agent(), &primary, &ctx, 0, None);
        assert!(!without.contains("### Draft"));
    }

    #[test]
    fn test_rebuttal_and_synthesis_prompts() {
        let ctx = QueryContext::new("Build or buy?");
        let rebuttal = build_rebuttal_prompt(&agent(), &ctx, 0, "Buy", &[section("design", "Build")]);
        assert!(rebuttal.contains("Your first-round position:\nBuy"));
        assert!(rebuttal.contains("design Insights"));

        let synthesis = build_debate_synthesis_prompt(&ctx, &[section("research", "Buy")]);
        assert!(synthesis.contains("User query: Build or buy?"));
        assert!(synthesis.contains("research Insights"));
    }
}
