// Resume analysis: upload pipeline, AI feedback, and progress tracking.
// All LLM calls go through llm_client; nothing here talks to Anthropic directly.

pub mod feedback;
pub mod handlers;
pub mod jobs;
pub mod prompts;
pub mod upload_flow;
