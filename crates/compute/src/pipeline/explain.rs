use signal_core::InsightPayload;

const TYPE_PLACEHOLDER: &str = "{insight_type}";
const FACTS_PLACEHOLDER: &str = "{facts}";

/// Prompt handed to a downstream language model; nothing here calls one.
pub const PROMPT_TEMPLATE: &str = "You are an analytics assistant. Explain the insight in plain language.
Insight type: {insight_type}
Key facts: {facts}
Audience: Product manager
Tone: concise, actionable";

/// Render the explanation prompt for a payload. Pure: the output depends
/// only on the payload.
pub fn explain(payload: &InsightPayload) -> String {
    let facts = payload
        .facts()
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(", ");

    PROMPT_TEMPLATE
        .replace(TYPE_PLACEHOLDER, payload.insight_type().as_str())
        .replace(FACTS_PLACEHOLDER, &facts)
}
