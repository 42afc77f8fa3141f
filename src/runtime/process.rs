//! External process execution.
//!
//! The evaluator only talks to [`ProcessService`]; [`SystemProcess`] is the
//! real implementation over `std::process`. Tests inject their own service
//! so the language core runs without spawning anything.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use tracing::debug;

use crate::error::{Error, Result};

/// One external program invocation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandSpec {
    /// Resolved program path (or the name as written)
    pub program: String,
    pub args: Vec<String>,
    /// One-off environment overrides for this invocation only
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        CommandSpec {
            program: program.into(),
            ..CommandSpec::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Program followed by its arguments
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

/// What happens to the last stage's standard output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Shares the interpreter's stdout
    Inherit,
    /// Collected and returned as text
    Capture,
}

/// Result of running a command or pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit status of the last stage; -1 when it was killed by a signal
    pub status: i64,
    /// Captured stdout, present only for [`OutputMode::Capture`]
    pub stdout: Option<String>,
}

/// Process-execution service consumed by the evaluator
pub trait ProcessService {
    /// Locates an executable: names containing `/` are checked as given,
    /// others are searched for in `search_path` order
    fn resolve(&self, name: &str, search_path: &[PathBuf]) -> Option<PathBuf>;

    /// Runs a pipeline. Each stage's stdout feeds the next stage's stdin;
    /// `stdin` (if any) is written to the first stage.
    fn pipeline(
        &mut self,
        stages: &[CommandSpec],
        stdin: Option<&str>,
        output: OutputMode,
    ) -> Result<ProcessOutput>;

    /// Runs a single command
    fn run(
        &mut self,
        command: &CommandSpec,
        stdin: Option<&str>,
        output: OutputMode,
    ) -> Result<ProcessOutput> {
        self.pipeline(std::slice::from_ref(command), stdin, output)
    }
}

/// [`ProcessService`] backed by the operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcess;

impl SystemProcess {
    pub fn new() -> Self {
        SystemProcess
    }

    fn spawn_stage(
        spec: &CommandSpec,
        stdin: Stdio,
        stdout: Stdio,
    ) -> Result<Child> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(stdin)
            .stdout(stdout)
            .stderr(Stdio::inherit());

        cmd.spawn().map_err(|e| process_error(spec, format!("failed to spawn: {}", e)))
    }
}

impl ProcessService for SystemProcess {
    fn resolve(&self, name: &str, search_path: &[PathBuf]) -> Option<PathBuf> {
        resolve_in_path(name, search_path)
    }

    fn pipeline(
        &mut self,
        stages: &[CommandSpec],
        stdin: Option<&str>,
        output: OutputMode,
    ) -> Result<ProcessOutput> {
        let last = match stages.len() {
            0 => return Err(Error::runtime("empty pipeline")),
            n => n - 1,
        };
        debug!(
            stages = stages.len(),
            first = %stages[0].program,
            "starting pipeline"
        );

        let mut children: Vec<(Child, &CommandSpec)> = Vec::with_capacity(stages.len());
        let mut feeder = None;

        for (i, spec) in stages.iter().enumerate() {
            let stage_stdin = match children.last_mut() {
                Some((child, _)) => match child.stdout.take() {
                    Some(out) => Stdio::from(out),
                    None => Stdio::null(),
                },
                None if stdin.is_some() => Stdio::piped(),
                None => Stdio::inherit(),
            };
            let stage_stdout = if i < last || output == OutputMode::Capture {
                Stdio::piped()
            } else {
                Stdio::inherit()
            };

            let mut child = match Self::spawn_stage(spec, stage_stdin, stage_stdout) {
                Ok(child) => child,
                Err(e) => {
                    for (mut started, _) in children {
                        let _ = started.kill();
                        let _ = started.wait();
                    }
                    return Err(e);
                }
            };

            if i == 0 {
                if let (Some(text), Some(mut pipe)) = (stdin, child.stdin.take()) {
                    let text = text.to_string();
                    // written on a separate thread so a full pipe cannot stall the reader below
                    feeder = Some(std::thread::spawn(move || {
                        let _ = pipe.write_all(text.as_bytes());
                    }));
                }
            }

            children.push((child, spec));
        }

        // every child is reaped and the feeder joined before any error is returned
        let mut failure = None;
        let mut captured = None;
        if output == OutputMode::Capture {
            if let Some((child, spec)) = children.last_mut() {
                let mut bytes = Vec::new();
                if let Some(mut out) = child.stdout.take() {
                    if let Err(e) = out.read_to_end(&mut bytes) {
                        failure = Some(process_error(spec, format!("failed to read output: {}", e)));
                    }
                }
                captured = Some(String::from_utf8_lossy(&bytes).into_owned());
            }
        }

        let mut status = 0;
        for (mut child, spec) in children {
            match child.wait() {
                Ok(exit) => status = exit.code().map(i64::from).unwrap_or(-1),
                Err(e) => {
                    failure.get_or_insert_with(|| process_error(spec, format!("failed to wait: {}", e)));
                }
            }
        }

        if let Some(handle) = feeder {
            let _ = handle.join();
        }

        if let Some(err) = failure {
            return Err(err);
        }

        debug!(status, "pipeline finished");
        Ok(ProcessOutput {
            status,
            stdout: captured,
        })
    }
}

fn process_error(spec: &CommandSpec, reason: String) -> Error {
    Error::ProcessError {
        command: spec.program.clone(),
        reason,
    }
}

/// Finds an executable named `name`. A name with a `/` is checked directly
/// (relative to the working directory); otherwise each search directory is tried.
pub fn resolve_in_path(name: &str, search_path: &[PathBuf]) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }

    if name.contains('/') {
        let path = PathBuf::from(name);
        return is_executable(&path).then_some(path);
    }

    search_path
        .iter()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(name))
        .find(|path| is_executable(path))
}

fn is_executable(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        path.metadata()
            .map(|metadata| metadata.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }

    #[cfg(not(unix))]
    {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argv() {
        let spec = CommandSpec::new("/bin/ls").arg("-l").env("A", "1");
        assert_eq!(spec.argv(), vec!["/bin/ls", "-l"]);
        assert_eq!(spec.env, vec![("A".to_string(), "1".to_string())]);
    }

    #[test]
    fn test_resolve_rejects_missing() {
        assert!(resolve_in_path("", &[PathBuf::from("/bin")]).is_none());
        assert!(resolve_in_path("definitely-not-a-real-program-xyz", &[PathBuf::from("/bin")]).is_none());
        assert!(resolve_in_path("./no/such/file", &[]).is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_finds_sh() {
        let path = vec![PathBuf::from("/nonexistent"), PathBuf::from("/bin"), PathBuf::from("/usr/bin")];
        let found = resolve_in_path("sh", &path).unwrap();
        assert!(found.ends_with("sh"));
    }

    #[cfg(unix)]
    #[test]
    fn test_pipeline_captures_last_stage() {
        let mut process = SystemProcess::new();
        let stages = vec![
            CommandSpec::new("sh").arg("-c").arg("echo hello"),
            CommandSpec::new("tr").arg("a-z").arg("A-Z"),
        ];
        let out = process.pipeline(&stages, None, OutputMode::Capture).unwrap();
        assert_eq!(out.status, 0);
        assert_eq!(out.stdout.as_deref(), Some("HELLO\n"));
    }

    #[cfg(unix)]
    #[test]
    fn test_stdin_and_status() {
        let mut process = SystemProcess::new();
        let out = process
            .run(&CommandSpec::new("cat"), Some("fed"), OutputMode::Capture)
            .unwrap();
        assert_eq!(out.stdout.as_deref(), Some("fed"));

        let out = process
            .run(
                &CommandSpec::new("sh").arg("-c").arg("exit 3"),
                None,
                OutputMode::Capture,
            )
            .unwrap();
        assert_eq!(out.status, 3);
    }

    #[cfg(unix)]
    #[test]
    fn test_capture_replaces_invalid_utf8() {
        let mut process = SystemProcess::new();
        let out = process
            .run(
                &CommandSpec::new("sh").arg("-c").arg("printf 'a\\377b'"),
                None,
                OutputMode::Capture,
            )
            .unwrap();
        assert_eq!(out.status, 0);
        assert_eq!(out.stdout.as_deref(), Some("a\u{FFFD}b"));
    }

    #[test]
    fn test_spawn_failure_is_process_error() {
        let mut process = SystemProcess::new();
        let err = process
            .run(
                &CommandSpec::new("/definitely/not/here"),
                None,
                OutputMode::Capture,
            )
            .unwrap_err();
        assert!(matches!(err, Error::ProcessError { .. }));
    }
}
