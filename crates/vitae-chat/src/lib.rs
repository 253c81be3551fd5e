//! Retrieval-augmented chat over a profile document.
//!
//! Provides the answer pipeline: streaming completion clients for
//! Anthropic and OpenAI, grounded prompt construction, and the
//! orchestrator that turns questions into profile-backed answers.

pub mod anthropic;
pub mod completion;
pub mod openai;
pub mod pipeline;
pub mod prompt;
