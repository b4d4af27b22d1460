#![deny(missing_docs)]
//! OpenAI Chat Completions provider for llmproc.

mod client;
pub mod mapping;

pub use client::OpenAiClient;
