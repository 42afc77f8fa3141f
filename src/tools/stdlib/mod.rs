//! Standard library tools for exprsh

pub mod io;
pub mod json;
pub mod lists;
pub mod math;
pub mod shell;
pub mod strings;

use crate::tools::ToolRegistry;

/// Register all standard library tools
pub fn register_all(registry: &mut ToolRegistry) {
    math::register(registry);
    lists::register(registry);
    strings::register(registry);
    io::register(registry);
    json::register(registry);
    shell::register(registry);
}
