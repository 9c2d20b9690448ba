//! Text generation for assembled documents.
//!
//! [`LlmProvider`] turns an [`AssembledDocument`] into the model's raw reply.
//! The reply is expected to carry an `### Analysis ###` section followed by a
//! `### Tweet ###` section; [`extract_tweet`] pulls the message out of it.

pub mod openai;
pub mod prompt;
pub mod tweet;

pub use openai::OpenAiProvider;
pub use prompt::{PromptConfig, PromptDocument};
pub use tweet::{extract_tweet, ANALYSIS_MARKER, TWEET_MARKER};

use threadcast_core::{AssembledDocument, CoreError};

pub trait LlmProvider {
    /// Raw model output for `document`, before any tweet extraction.
    async fn generate(&self, document: &AssembledDocument) -> Result<String, CoreError>;
}
