//! Prompt template sent to the completion provider.

/// Placeholder replaced by the user's idea.
const IDEA_PLACEHOLDER: &str = "{idea}";

pub const PROMPT_TEMPLATE: &str = r#"
You are StartupGPT, a startup co-pilot AI. The user will give you an app or startup idea.
Based on the idea, generate strictly valid and escaped JSON:
1. A 2-3 sentence elevator pitch.
2. A simple landing page in HTML (with inline CSS; ensure all quotes are escaped).
3. A recommended tech stack.
4. 3 unique core feature suggestions.

Idea: {idea}

Respond ONLY in this JSON format:
{
  "pitch": "...",
  "landing_page_html": "...",
  "tech_stack": "...",
  "core_features": ["...", "...", "..."]
}
"#;

/// Substitute `idea` into the template. The idea is inserted verbatim and is
/// not rescanned, so braces inside it are left alone.
pub fn render_prompt(idea: &str) -> String {
    PROMPT_TEMPLATE.replacen(IDEA_PLACEHOLDER, idea, 1)
}
