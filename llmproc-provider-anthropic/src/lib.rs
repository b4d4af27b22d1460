#![deny(missing_docs)]
//! Anthropic Messages API provider for llmproc.
//!
//! [`AnthropicClient`] implements the transport half of the provider
//! contract; the [`mapping`] and [`cache`] modules do the payload shaping
//! the executors drive.

pub mod cache;
mod client;
mod error;
pub mod headers;
pub mod mapping;

pub use client::{AnthropicAuth, AnthropicClient};
