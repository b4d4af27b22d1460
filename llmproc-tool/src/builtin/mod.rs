//! Built-in tools.
//!
//! Each module exposes a `register` function that installs its tool into a
//! registry. [`register_builtin`] maps configured names onto those modules.

pub mod calculator;
pub mod list_dir;
pub mod read_file;

use crate::registry::ToolRegistry;

/// Names of all registerable built-ins, sorted.
pub const BUILTIN_NAMES: &[&str] = &["calculator", "list_dir", "read_file"];

/// Register the built-in with the given name.
///
/// Returns `false` for a name no built-in module claims.
pub fn register_builtin(name: &str, registry: &mut ToolRegistry) -> bool {
    match name {
        "calculator" => calculator::register(registry),
        "list_dir" => list_dir::register(registry),
        "read_file" => read_file::register(registry),
        _ => return false,
    }
    true
}
