pub mod provider;
pub mod providers;
pub mod qa;

pub use provider::{LlmError, LlmProvider, Message, Role};
pub use providers::create_provider;
pub use qa::{AnswerError, AnswerGenerator, ContextPassage};
