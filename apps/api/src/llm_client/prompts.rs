// Prompt fragments shared by every caller of the LLM client.
// Feature prompts live next to the feature (see analysis/prompts.rs).

/// Appended to system prompts whose reply is parsed as JSON.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";
