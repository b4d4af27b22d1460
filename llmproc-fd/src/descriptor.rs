//! A single file descriptor and its line-aware read logic.

use chrono::{DateTime, Utc};

use llmproc_types::FdError;

/// Where a descriptor's content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FdSource {
    /// Wrapped from an oversized tool result.
    ToolResult,
    /// Wrapped from oversized user input.
    UserInput,
    /// Extracted from a `<ref id="…">` block in assistant output.
    Reference,
    /// Extracted from another descriptor.
    Extract,
}

/// How to address content in a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// `start` is a 1-based page index.
    Page,
    /// `start` is a 1-based line number.
    Line,
    /// `start` is a 0-based character offset.
    Char,
}

/// Parameters for one read operation.
#[derive(Debug, Clone, Copy)]
pub struct ReadSpec {
    /// Addressing mode.
    pub mode: ReadMode,
    /// Start position (interpretation depends on `mode`).
    pub start: usize,
    /// How many pages/lines/chars to read. Defaults to 1 page, 1 line, or
    /// the rest of the content in char mode.
    pub count: Option<usize>,
    /// Return the whole content, ignoring `mode`/`start`/`count`.
    pub read_all: bool,
}

impl Default for ReadSpec {
    fn default() -> Self {
        Self {
            mode: ReadMode::Page,
            start: 1,
            count: None,
            read_all: false,
        }
    }
}

impl ReadSpec {
    /// Read a whole descriptor.
    #[must_use]
    pub fn all() -> Self {
        Self {
            read_all: true,
            ..Self::default()
        }
    }

    /// Read one page.
    #[must_use]
    pub fn page(start: usize) -> Self {
        Self {
            mode: ReadMode::Page,
            start,
            ..Self::default()
        }
    }

    /// Read `count` lines starting at 1-based line `start`.
    #[must_use]
    pub fn lines(start: usize, count: usize) -> Self {
        Self {
            mode: ReadMode::Line,
            start,
            count: Some(count),
            ..Self::default()
        }
    }

    /// Read `count` characters starting at 0-based offset `start`.
    #[must_use]
    pub fn chars(start: usize, count: usize) -> Self {
        Self {
            mode: ReadMode::Char,
            start,
            count: Some(count),
            ..Self::default()
        }
    }
}

/// A slice of descriptor content plus its position attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FdSlice {
    /// The sliced content.
    pub content: String,
    /// The page index for page-mode reads; `None` for line/char/read_all.
    pub page: Option<usize>,
    /// Total pages in the descriptor.
    pub total_pages: usize,
    /// 1-based first line touched by the slice.
    pub start_line: usize,
    /// 1-based last line touched by the slice.
    pub end_line: usize,
    /// The slice starts mid-line (the line began on an earlier page).
    pub continued: bool,
    /// The slice stops mid-line (the line continues past the slice).
    pub truncated: bool,
    /// Total lines in the descriptor.
    pub total_lines: usize,
}

/// An immutable stored content blob with a line index.
///
/// Content is never mutated after creation and ids are never reused within
/// a process, which makes inheritance across fork a plain deep copy.
#[derive(Debug, Clone)]
pub struct FileDescriptor {
    /// Namespaced identifier: `fd:<n>` or `ref:<label>`.
    pub id: String,
    /// The full content.
    pub content: String,
    /// Character offsets of each line start. `line_starts[0] == 0`.
    pub line_starts: Vec<usize>,
    /// Content length in characters.
    pub char_len: usize,
    /// Characters per page.
    pub page_size: usize,
    /// Where the content came from.
    pub source: FdSource,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl FileDescriptor {
    /// Index `content` and build a descriptor.
    #[must_use]
    pub fn new(id: String, content: String, page_size: usize, source: FdSource) -> Self {
        let page_size = page_size.max(1);
        let mut line_starts = vec![0];
        let mut char_len = 0usize;
        for (pos, ch) in content.chars().enumerate() {
            if ch == '\n' {
                line_starts.push(pos + 1);
            }
            char_len = pos + 1;
        }
        Self {
            id,
            content,
            line_starts,
            char_len,
            page_size,
            source,
            created_at: Utc::now(),
        }
    }

    /// Total pages: `ceil(len / page_size)`, or 1 when empty.
    #[must_use]
    pub fn total_pages(&self) -> usize {
        if self.char_len == 0 {
            1
        } else {
            self.char_len.div_ceil(self.page_size)
        }
    }

    /// Total lines (a trailing newline yields a final empty line).
    #[must_use]
    pub fn total_lines(&self) -> usize {
        self.line_starts.len()
    }

    /// 1-based line containing the character at `pos`.
    fn line_of(&self, pos: usize) -> usize {
        self.line_starts.partition_point(|&start| start <= pos)
    }

    /// Execute a read against this descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`FdError::InvalidRange`] when the requested page, line, or
    /// character position falls outside the content; the message names the
    /// valid range.
    pub fn read(&self, spec: &ReadSpec) -> Result<FdSlice, FdError> {
        if spec.read_all {
            return Ok(self.char_span(0, self.char_len, None));
        }
        match spec.mode {
            ReadMode::Page => {
                let page = spec.start;
                let count = spec.count.unwrap_or(1).max(1);
                if page < 1 || page > self.total_pages() {
                    return Err(FdError::InvalidRange(format!(
                        "page {page} out of range, valid pages are 1-{}",
                        self.total_pages()
                    )));
                }
                let start = (page - 1) * self.page_size;
                let end = (start + count * self.page_size).min(self.char_len);
                Ok(self.char_span(start, end, Some(page)))
            }
            ReadMode::Line => {
                let line = spec.start;
                let count = spec.count.unwrap_or(1).max(1);
                if line < 1 || line > self.total_lines() {
                    return Err(FdError::InvalidRange(format!(
                        "line {line} out of range, valid lines are 1-{}",
                        self.total_lines()
                    )));
                }
                let start = self.line_starts[line - 1];
                let end = if line - 1 + count < self.line_starts.len() {
                    self.line_starts[line - 1 + count]
                } else {
                    self.char_len
                };
                Ok(self.char_span(start, end, None))
            }
            ReadMode::Char => {
                let start = spec.start;
                if start > self.char_len {
                    return Err(FdError::InvalidRange(format!(
                        "char offset {start} out of range, valid offsets are 0-{}",
                        self.char_len
                    )));
                }
                let count = spec.count.unwrap_or(self.char_len - start);
                let end = (start + count).min(self.char_len);
                Ok(self.char_span(start, end, None))
            }
        }
    }

    /// Build a slice for the character span `[start, end)`.
    fn char_span(&self, start: usize, end: usize, page: Option<usize>) -> FdSlice {
        let content = char_substring(&self.content, start, end);
        if self.char_len == 0 || start >= end {
            return FdSlice {
                content,
                page,
                total_pages: self.total_pages(),
                start_line: 1,
                end_line: 1,
                continued: false,
                truncated: false,
                total_lines: self.total_lines(),
            };
        }

        let start_line = self.line_of(start);
        let continued = start > self.line_starts[start_line - 1];
        let end_line = self.line_of(end - 1);
        // Truncated when the slice stops before the end of its last line.
        let truncated = if end_line < self.total_lines() {
            end < self.line_starts[end_line]
        } else {
            end < self.char_len
        };

        FdSlice {
            content,
            page,
            total_pages: self.total_pages(),
            start_line,
            end_line,
            continued,
            truncated,
            total_lines: self.total_lines(),
        }
    }
}

/// Slice `s` by character positions `[start, end)`.
fn char_substring(s: &str, start: usize, end: usize) -> String {
    if start >= end {
        return String::new();
    }
    s.chars().skip(start).take(end - start).collect()
}
