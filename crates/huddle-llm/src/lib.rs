//! # huddle-llm
//!
//! Language-model access for the pipeline:
//!
//! - [`backend`]: the [`LanguageModel`] trait and wire-agnostic types
//! - [`openai`]: OpenAI-compatible chat-completions client
//! - [`prompts`]: system/retry/validation prompt construction
//! - [`codegen`]: conversation in, candidate query plan out
//! - [`validator`]: result validation and summarization
//! - [`testing`]: scripted backend for tests

pub mod backend;
pub mod codegen;
pub mod openai;
pub mod prompts;
pub mod testing;
pub mod validator;

pub use backend::{
    BackendError, BackendResult, ChatMessage, ChatRole, CompletionRequest, CompletionResponse,
    LanguageModel, ToolInvocation, ToolSpec,
};
pub use codegen::{CodegenClient, GenerationError, PriorFeedback};
pub use openai::{OpenAiBackend, OpenAiConfig};
pub use validator::{ValidationError, Validator};
