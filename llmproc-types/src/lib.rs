#![deny(missing_docs)]
//! Core types shared by every llmproc crate.
//!
//! Defines the conversation data model ([`Message`], [`ContentBlock`]),
//! the normalized provider surface ([`ApiRequest`], [`ApiResponse`],
//! [`ProviderClient`]), and the error taxonomy.

pub mod error;
pub mod types;

pub use error::*;
pub use types::*;

use std::future::Future;
use std::pin::Pin;

/// A pinned, boxed, `Send` future. Used by object-safe async traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
