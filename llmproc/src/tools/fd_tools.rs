//! The `read_fd` and `fd_to_file` control tools.

use std::path::Path;

use llmproc_fd::{ReadMode, ReadSpec, WriteMode, format_fd_content, format_fd_error};
use llmproc_types::{ToolDefinition, ToolResult};

use crate::process::Process;

pub(crate) fn read_fd_definition() -> ToolDefinition {
    ToolDefinition {
        name: "read_fd".into(),
        description: "Read content from a file descriptor (fd:N or ref:LABEL). Page mode reads \
                      one page, line mode reads count lines from a 1-based line number, char \
                      mode reads count characters from a 0-based offset. Set read_all to get \
                      everything, or extract_to_new_fd to store the selection as a new \
                      descriptor instead of returning it."
            .into(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "fd": {"type": "string", "description": "Descriptor id, e.g. \"fd:1\"."},
                "mode": {"type": "string", "enum": ["page", "line", "char"], "default": "page"},
                "start": {"type": "integer", "description": "Page (1-based), line (1-based), or char offset (0-based)."},
                "count": {"type": "integer", "description": "Pages, lines, or chars to read."},
                "read_all": {"type": "boolean", "default": false},
                "extract_to_new_fd": {"type": "boolean", "default": false}
            },
            "required": ["fd"]
        }),
    }
}

pub(crate) fn fd_to_file_definition() -> ToolDefinition {
    ToolDefinition {
        name: "fd_to_file".into(),
        description: "Export a file descriptor's full content to a file on disk.".into(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "fd": {"type": "string", "description": "Descriptor id to export."},
                "file_path": {"type": "string", "description": "Target path."},
                "mode": {"type": "string", "enum": ["write", "append"], "default": "write"},
                "create": {"type": "boolean", "default": true, "description": "Create the file if missing."},
                "exist_ok": {"type": "boolean", "default": true, "description": "Allow touching an existing file."}
            },
            "required": ["fd", "file_path"]
        }),
    }
}

/// Parse the shared read parameters out of a tool input.
fn parse_read_spec(input: &serde_json::Value) -> Result<ReadSpec, String> {
    let mode = match input["mode"].as_str().unwrap_or("page") {
        "page" => ReadMode::Page,
        "line" => ReadMode::Line,
        "char" => ReadMode::Char,
        other => return Err(format!("unknown mode {other:?}, expected page, line, or char")),
    };
    let default_start = match mode {
        ReadMode::Char => 0,
        ReadMode::Page | ReadMode::Line => 1,
    };
    Ok(ReadSpec {
        mode,
        start: input["start"].as_u64().map_or(default_start, |s| s as usize),
        count: input["count"].as_u64().map(|c| c as usize),
        read_all: input["read_all"].as_bool().unwrap_or(false),
    })
}

/// Read or extract a descriptor slice.
pub(crate) fn read_fd(process: &mut Process, input: &serde_json::Value) -> ToolResult {
    let Some(fd_id) = input["fd"].as_str() else {
        return ToolResult::error("read_fd requires \"fd\"");
    };
    let spec = match parse_read_spec(input) {
        Ok(spec) => spec,
        Err(message) => return ToolResult::error(message),
    };

    if input["extract_to_new_fd"].as_bool().unwrap_or(false) {
        return match process.fd_manager.extract(fd_id, &spec) {
            Ok(new_id) => ToolResult::ok(format!(
                "<fd_extraction source=\"{fd_id}\" new_fd=\"{new_id}\"/>"
            )),
            Err(err) => ToolResult::error(format_fd_error(&err, fd_id)),
        };
    }

    match process.fd_manager.read(fd_id, &spec) {
        Ok(slice) => ToolResult::ok(format_fd_content(fd_id, &slice)),
        Err(err) => ToolResult::error(format_fd_error(&err, fd_id)),
    }
}

/// Export a descriptor to disk.
pub(crate) async fn fd_to_file(process: &mut Process, input: &serde_json::Value) -> ToolResult {
    let Some(fd_id) = input["fd"].as_str() else {
        return ToolResult::error("fd_to_file requires \"fd\"");
    };
    let Some(file_path) = input["file_path"].as_str() else {
        return ToolResult::error("fd_to_file requires \"file_path\"");
    };
    let mode = match input["mode"].as_str().unwrap_or("write") {
        "write" => WriteMode::Write,
        "append" => WriteMode::Append,
        other => {
            return ToolResult::error(format!(
                "unknown mode {other:?}, expected write or append"
            ));
        }
    };
    let create = input["create"].as_bool().unwrap_or(true);
    let exist_ok = input["exist_ok"].as_bool().unwrap_or(true);

    match process
        .fd_manager
        .write_to_file(fd_id, Path::new(file_path), mode, create, exist_ok)
        .await
    {
        Ok(stats) => ToolResult::ok(format!(
            "<fd_to_file fd=\"{fd_id}\" path=\"{}\" chars=\"{}\" created=\"{}\"/>",
            stats.path.display(),
            stats.chars,
            stats.created
        )),
        Err(err) => ToolResult::error(format_fd_error(&err, fd_id)),
    }
}
