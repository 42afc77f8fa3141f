//! Runtime execution for exprsh programs

mod config;
mod environment;
mod evaluator;
mod patterns;
mod process;

pub use config::{EvalConfig, MAX_DEPTH_VAR, MAX_EVAL_DEPTH};
pub use environment::{Environment, Procedure};
pub use evaluator::{Evaluator, EVALUATOR_BUILTINS, SPECIAL_FORMS};
pub use process::{
    resolve_in_path, CommandSpec, OutputMode, ProcessOutput, ProcessService, SystemProcess,
};
