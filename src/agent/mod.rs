//! Model-call plumbing: one resilient calling convention shared by every
//! logical agent in the pipeline.
//!
//! Layering, bottom up: [`ModelBackend`] performs a single network call;
//! [`StructuredModelClient`] coerces raw responses into declared shapes;
//! [`AgentSession`] owns the named-agent registry and the retry loop.

mod backend;
mod client;
pub mod json_extract;
mod openai;
mod response;
mod session;

pub use backend::{ChatMessage, ModelBackend, ModelRequest, Role};
pub use client::{Parsed, StructuredModelClient};
pub use openai::OpenAiBackend;
pub use response::{ModelResponse, ResponseExtractor};
pub use session::{AgentConfig, AgentSession, ResponseFormat, RetryPolicy, backoff_delay};
