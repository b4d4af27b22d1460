//! Directory listing tool.

use serde::Deserialize;

use crate::registry::ToolRegistry;
use crate::tool::{Tool, ToolCtx};

use super::read_file::resolve;

/// Install the directory lister into `registry`.
pub fn register(registry: &mut ToolRegistry) {
    registry.register(ListDir);
}

/// Lists directory entries.
pub struct ListDir;

/// Arguments for `list_dir`.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListDirArgs {
    /// Directory to list. Defaults to the working directory.
    pub path: Option<String>,
}

impl Tool for ListDir {
    const NAME: &'static str = "list_dir";
    type Args = ListDirArgs;
    type Output = String;
    type Error = std::io::Error;

    fn description(&self) -> &str {
        "List the entries of a directory. Directories are suffixed with '/'."
    }

    async fn call(&self, args: ListDirArgs, ctx: &ToolCtx) -> Result<String, std::io::Error> {
        let path = match &args.path {
            Some(p) => resolve(p, ctx),
            None => ctx.cwd.clone(),
        };

        let mut reader = tokio::fs::read_dir(&path).await?;
        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type().await?.is_dir() {
                entries.push(format!("{name}/"));
            } else {
                entries.push(name);
            }
        }
        entries.sort();
        Ok(entries.join("\n"))
    }
}
