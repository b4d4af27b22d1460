//! File reading tool.

use std::path::PathBuf;

use serde::Deserialize;

use crate::registry::ToolRegistry;
use crate::tool::{Tool, ToolCtx};

/// Install the file reader into `registry`.
pub fn register(registry: &mut ToolRegistry) {
    registry.register(ReadFile);
}

/// Reads a file from disk.
pub struct ReadFile;

/// Arguments for `read_file`.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ReadFileArgs {
    /// Path to the file. Relative paths resolve against the working directory.
    pub path: String,
}

impl Tool for ReadFile {
    const NAME: &'static str = "read_file";
    type Args = ReadFileArgs;
    type Output = String;
    type Error = std::io::Error;

    fn description(&self) -> &str {
        "Read the contents of a file as UTF-8 text."
    }

    async fn call(&self, args: ReadFileArgs, ctx: &ToolCtx) -> Result<String, std::io::Error> {
        let path = resolve(&args.path, ctx);
        tokio::fs::read_to_string(path).await
    }
}

/// Resolve a possibly-relative path against the tool context.
pub(crate) fn resolve(path: &str, ctx: &ToolCtx) -> PathBuf {
    let path = PathBuf::from(path);
    if path.is_absolute() {
        path
    } else {
        ctx.cwd.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_relative_to_cwd() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("note.txt"), "remember this").unwrap();
        let ctx = ToolCtx {
            cwd: dir.path().to_path_buf(),
            ..ToolCtx::default()
        };

        let content = ReadFile
            .call(
                ReadFileArgs {
                    path: "note.txt".into(),
                },
                &ctx,
            )
            .await
            .unwrap();
        assert_eq!(content, "remember this");
    }

    #[tokio::test]
    async fn missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ToolCtx {
            cwd: dir.path().to_path_buf(),
            ..ToolCtx::default()
        };
        let err = ReadFile
            .call(
                ReadFileArgs {
                    path: "ghost.txt".into(),
                },
                &ctx,
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
