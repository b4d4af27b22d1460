//! External XML-ish rendering of descriptors for the model.

use llmproc_types::FdError;

use crate::descriptor::{FdSlice, FileDescriptor};

/// Render the structured preview block the model receives when content is
/// wrapped into a descriptor.
#[must_use]
pub fn format_fd_result(fd: &FileDescriptor, preview: &FdSlice, message: &str) -> String {
    format!(
        "<fd_result fd=\"{}\" pages=\"{}\" truncated=\"{}\" lines=\"{}-{}\" total_lines=\"{}\">\n\
         <message>{}</message>\n\
         <preview>{}</preview>\n\
         </fd_result>",
        fd.id,
        fd.total_pages(),
        preview.truncated,
        preview.start_line,
        preview.end_line,
        fd.total_lines(),
        message,
        preview.content,
    )
}

/// Render the content block returned by a descriptor read.
#[must_use]
pub fn format_fd_content(fd_id: &str, slice: &FdSlice) -> String {
    let page = slice
        .page
        .map_or_else(|| "all".to_string(), |p| p.to_string());
    format!(
        "<fd_content fd=\"{}\" page=\"{}\" pages=\"{}\" continued=\"{}\" truncated=\"{}\" \
         lines=\"{}-{}\" total_lines=\"{}\">{}</fd_content>",
        fd_id,
        page,
        slice.total_pages,
        slice.continued,
        slice.truncated,
        slice.start_line,
        slice.end_line,
        slice.total_lines,
        slice.content,
    )
}

/// Render a descriptor error block.
#[must_use]
pub fn format_fd_error(err: &FdError, fd_id: &str) -> String {
    format!(
        "<fd_error type=\"{}\" fd=\"{}\"><message>{}</message></fd_error>",
        err.kind(),
        fd_id,
        err,
    )
}
