#![deny(missing_docs)]
//! File-descriptor store for oversized content.
//!
//! An [`FdManager`] wraps content that would flood the model's context into
//! immutable, paginated descriptors. Pagination is line-aware and indexed in
//! characters, so multi-byte UTF-8 is never split. Descriptors are created
//! on overflow (tool results, user input), by explicit extraction, or from
//! `<ref id="…">` blocks in assistant output; they live for the process
//! lifetime and are deep-copied on fork.

mod descriptor;
mod format;
mod manager;
mod refs;

pub use descriptor::{FdSlice, FdSource, FileDescriptor, ReadMode, ReadSpec};
pub use format::{format_fd_content, format_fd_error, format_fd_result};
pub use manager::{FdConfig, FdManager, WriteMode, WriteStats};
pub use refs::extract_references;

pub use llmproc_types::FdError;
