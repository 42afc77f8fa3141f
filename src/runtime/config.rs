//! Evaluator configuration

use std::path::PathBuf;

use tracing::warn;

use crate::parser::MAX_PARSE_DEPTH;

/// Default bound on nested user procedure calls
pub const MAX_EVAL_DEPTH: usize = 256;

/// Environment variable overriding [`EvalConfig::max_depth`]
pub const MAX_DEPTH_VAR: &str = "EXPRSH_MAX_DEPTH";

/// Evaluator settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalConfig {
    /// Directories searched for external programs, in order
    pub search_path: Vec<PathBuf>,
    /// Maximum nesting of user procedure calls
    pub max_depth: usize,
    /// Maximum delimiter nesting accepted by the parser
    pub max_parse_depth: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        EvalConfig {
            search_path: Vec::new(),
            max_depth: MAX_EVAL_DEPTH,
            max_parse_depth: MAX_PARSE_DEPTH,
        }
    }
}

impl EvalConfig {
    /// Reads `PATH` and `EXPRSH_MAX_DEPTH` from the process environment
    pub fn from_env() -> Self {
        let search_path = std::env::var_os("PATH")
            .map(|path| std::env::split_paths(&path).collect())
            .unwrap_or_default();
        let max_depth = std::env::var(MAX_DEPTH_VAR).ok();
        Self::from_parts(search_path, max_depth.as_deref())
    }

    fn from_parts(search_path: Vec<PathBuf>, max_depth: Option<&str>) -> Self {
        let mut config = EvalConfig {
            search_path,
            ..EvalConfig::default()
        };

        if let Some(raw) = max_depth {
            match raw.trim().parse::<usize>() {
                Ok(depth) if depth > 0 => config.max_depth = depth,
                _ => warn!(value = raw, "ignoring invalid {}", MAX_DEPTH_VAR),
            }
        }

        config
    }

    /// Replaces the search path
    pub fn with_search_path(mut self, search_path: Vec<PathBuf>) -> Self {
        self.search_path = search_path;
        self
    }

    /// Replaces the recursion limit
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}
