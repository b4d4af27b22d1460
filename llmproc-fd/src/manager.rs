//! The per-process descriptor store.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use llmproc_types::{FdError, ToolResult};

use crate::descriptor::{FdSlice, FdSource, FileDescriptor, ReadSpec};
use crate::format::format_fd_result;

/// Configuration for the descriptor store.
#[derive(Debug, Clone)]
pub struct FdConfig {
    /// Characters per page.
    pub page_size: usize,
    /// Tool results longer than this are wrapped into a descriptor.
    /// Should exceed `page_size` so a preview fits on one page.
    pub max_direct_output_chars: usize,
    /// User inputs longer than this are wrapped when `page_user_input` is set.
    pub max_input_chars: usize,
    /// Whether oversized user input is wrapped.
    pub page_user_input: bool,
    /// Tool names whose results are never auto-wrapped. Prevents a read of a
    /// descriptor from producing another descriptor.
    pub fd_related_tool_names: BTreeSet<String>,
}

impl Default for FdConfig {
    fn default() -> Self {
        Self {
            page_size: 4000,
            max_direct_output_chars: 8000,
            max_input_chars: 8000,
            page_user_input: false,
            fd_related_tool_names: ["read_fd", "fd_to_file"]
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Whether a file export overwrites or appends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Replace the file content.
    Write,
    /// Append to the file content.
    Append,
}

/// Outcome of a file export.
#[derive(Debug, Clone)]
pub struct WriteStats {
    /// The target path.
    pub path: PathBuf,
    /// Characters written.
    pub chars: usize,
    /// Whether the file was created by this export.
    pub created: bool,
    /// The mode that was applied.
    pub mode: WriteMode,
}

/// Store of file descriptors for a single process.
///
/// Auto-numbered descriptors (`fd:<n>`) and labeled references
/// (`ref:<label>`) share the store and the tool surface. Descriptors are
/// immutable once created and ids are never reused.
#[derive(Debug, Clone)]
pub struct FdManager {
    config: FdConfig,
    entries: HashMap<String, FileDescriptor>,
    next_fd: u64,
}

impl FdManager {
    /// Create an empty store with the given configuration.
    #[must_use]
    pub fn new(config: FdConfig) -> Self {
        Self {
            config,
            entries: HashMap::new(),
            next_fd: 1,
        }
    }

    /// The store configuration.
    #[must_use]
    pub fn config(&self) -> &FdConfig {
        &self.config
    }

    /// Number of stored descriptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Store `content` under the next sequential `fd:<n>` id.
    pub fn create(&mut self, content: impl Into<String>, source: FdSource) -> String {
        let id = format!("fd:{}", self.next_fd);
        self.next_fd += 1;
        let fd = FileDescriptor::new(id.clone(), content.into(), self.config.page_size, source);
        tracing::debug!(fd = %id, chars = fd.char_len, "created file descriptor");
        self.entries.insert(id.clone(), fd);
        id
    }

    /// Store `content` under `ref:<label>`.
    ///
    /// A colliding label overwrites the previous content (last write wins)
    /// and logs a warning.
    pub fn create_reference(&mut self, label: &str, content: impl Into<String>) -> String {
        let id = format!("ref:{label}");
        if self.entries.contains_key(&id) {
            tracing::warn!(reference = %id, "reference label collision, overwriting");
        }
        let fd = FileDescriptor::new(
            id.clone(),
            content.into(),
            self.config.page_size,
            FdSource::Reference,
        );
        self.entries.insert(id.clone(), fd);
        id
    }

    /// Look up a descriptor by id.
    ///
    /// # Errors
    ///
    /// Returns [`FdError::NotFound`] for an unknown id.
    pub fn get(&self, fd_id: &str) -> Result<&FileDescriptor, FdError> {
        self.entries
            .get(fd_id)
            .ok_or_else(|| FdError::NotFound(fd_id.to_string()))
    }

    /// Read a slice of a descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`FdError::NotFound`] or [`FdError::InvalidRange`].
    pub fn read(&self, fd_id: &str, spec: &ReadSpec) -> Result<FdSlice, FdError> {
        self.get(fd_id)?.read(spec)
    }

    /// Read a slice and store it as a new descriptor, returning the new id.
    ///
    /// # Errors
    ///
    /// Returns [`FdError::NotFound`] or [`FdError::InvalidRange`].
    pub fn extract(&mut self, fd_id: &str, spec: &ReadSpec) -> Result<String, FdError> {
        let slice = self.read(fd_id, spec)?;
        Ok(self.create(slice.content, FdSource::Extract))
    }

    /// Export a descriptor's full content to `path`.
    ///
    /// `create` allows creating a missing file (parent directories are
    /// created as needed); `exist_ok` allows touching an existing one.
    ///
    /// # Errors
    ///
    /// Returns [`FdError::NotFound`], [`FdError::FileExists`] when the
    /// target exists and `exist_ok` is false, [`FdError::FileMissing`] when
    /// it does not and `create` is false, or [`FdError::Io`].
    pub async fn write_to_file(
        &self,
        fd_id: &str,
        path: &Path,
        mode: WriteMode,
        create: bool,
        exist_ok: bool,
    ) -> Result<WriteStats, FdError> {
        let fd = self.get(fd_id)?;
        let exists = tokio::fs::try_exists(path).await?;
        if exists && !exist_ok {
            return Err(FdError::FileExists(path.to_path_buf()));
        }
        if !exists && !create {
            return Err(FdError::FileMissing(path.to_path_buf()));
        }
        if !exists
            && create
            && let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        match mode {
            WriteMode::Write => tokio::fs::write(path, &fd.content).await?,
            WriteMode::Append => {
                let mut existing = if exists {
                    tokio::fs::read_to_string(path).await?
                } else {
                    String::new()
                };
                existing.push_str(&fd.content);
                tokio::fs::write(path, existing).await?;
            }
        }

        tracing::debug!(fd = %fd_id, path = %path.display(), "exported file descriptor");
        Ok(WriteStats {
            path: path.to_path_buf(),
            chars: fd.char_len,
            created: !exists,
            mode,
        })
    }

    /// Wrap an oversized tool result into a descriptor preview.
    ///
    /// Results from FD-related tools and results at or under
    /// `max_direct_output_chars` pass through untouched. Otherwise the
    /// content is stored and replaced with an `<fd_result>` preview carrying
    /// the id, page count, line span, and first page.
    pub fn maybe_wrap_tool_result(&mut self, tool_name: &str, result: ToolResult) -> ToolResult {
        if self.config.fd_related_tool_names.contains(tool_name) {
            return result;
        }
        if result.content.chars().count() <= self.config.max_direct_output_chars {
            return result;
        }
        let id = self.create(result.content, FdSource::ToolResult);
        let preview = self.render_preview(&id, "output exceeds direct return limit, stored as a file descriptor");
        ToolResult {
            content: preview,
            is_error: result.is_error,
        }
    }

    /// Wrap oversized user input when `page_user_input` is enabled.
    ///
    /// Returns the original input when no wrapping applies.
    pub fn maybe_wrap_user_input(&mut self, input: String) -> String {
        if !self.config.page_user_input
            || input.chars().count() <= self.config.max_input_chars
        {
            return input;
        }
        let id = self.create(input, FdSource::UserInput);
        self.render_preview(&id, "input exceeds direct size limit, stored as a file descriptor")
    }

    /// Render an `<fd_result>` preview (first page) for a stored descriptor.
    fn render_preview(&self, fd_id: &str, message: &str) -> String {
        // The descriptor was just created; page 1 is always a valid read.
        let fd = &self.entries[fd_id];
        let first_page = fd.read(&ReadSpec::page(1)).unwrap_or(FdSlice {
            content: String::new(),
            page: Some(1),
            total_pages: fd.total_pages(),
            start_line: 1,
            end_line: 1,
            continued: false,
            truncated: false,
            total_lines: fd.total_lines(),
        });
        format_fd_result(fd, &first_page, message)
    }

    /// Produce an independent copy of the store for a forked process.
    ///
    /// All contents and metadata are cloned; subsequent mutations on either
    /// side are invisible to the other.
    #[must_use]
    pub fn deep_copy(&self) -> Self {
        self.clone()
    }
}
