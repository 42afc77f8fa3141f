//! exprsh CLI entry point.
//!
//! Usage:
//!   exprsh                 # Interactive shell
//!   exprsh -c <text>       # Evaluate text and exit
//!   exprsh script.esh      # Run a script

use std::env;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use exprsh::{Error, Evaluator, Node, Value};

const PROMPT: &str = "exprsh> ";
const CONTINUATION_PROMPT: &str = "   ...> ";

/// Deep user recursion runs on the interpreter thread's stack
const INTERPRETER_STACK: usize = 64 * 1024 * 1024;

fn main() -> ExitCode {
    // Initialize tracing (respects RUST_LOG env var); stdout belongs to the shell
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let interpreter = std::thread::Builder::new()
        .name("exprsh".to_string())
        .stack_size(INTERPRETER_STACK)
        .spawn(run);

    let outcome = match interpreter {
        Ok(handle) => match handle.join() {
            Ok(outcome) => outcome,
            Err(_) => {
                eprintln!("Error: interpreter thread panicked");
                return ExitCode::FAILURE;
            }
        },
        Err(e) => Err(anyhow::Error::new(e).context("failed to start interpreter thread")),
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        None => run_repl(),

        Some("--help" | "-h") => {
            print_help();
            Ok(ExitCode::SUCCESS)
        }

        Some("--version" | "-V") => {
            println!("exprsh {}", exprsh::VERSION);
            Ok(ExitCode::SUCCESS)
        }

        Some("-c") => {
            let text = args.get(2).context("-c requires an expression argument")?;
            Ok(run_command(text))
        }

        Some(path) if !path.starts_with('-') => Ok(run_script(Path::new(path))),

        Some(unknown) => {
            eprintln!("Unknown option: {unknown}");
            eprintln!("Run 'exprsh --help' for usage.");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_help() {
    println!(
        r#"exprsh v{}

Usage:
  exprsh                 Interactive shell
  exprsh -c <text>       Evaluate text and exit
  exprsh <script>        Run a script file

Options:
  -c <text>              Evaluate a string and exit
  -h, --help             Show this help
  -V, --version          Show version

Environment:
  PATH                   Directories searched for external programs
  EXPRSH_MAX_DEPTH       Maximum nesting of procedure calls (default 256)
  RUST_LOG               Log filter, e.g. RUST_LOG=exprsh=debug
"#,
        exprsh::VERSION
    );
}

fn report(err: &Error) {
    eprintln!("error[{}]: {}", err.category(), err);
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from((code & 0xff) as u8)
}

/// Prints a result unless it is `false` or a successful command
fn echo(node: &Node) {
    match &node.value {
        Value::Boolean(false) | Value::CommandResult(0) => {}
        Value::CommandResult(status) => println!("[exit {}]", status),
        _ => println!("{}", node),
    }
}

/// Run a script file.
fn run_script(path: &Path) -> ExitCode {
    let mut evaluator = Evaluator::new();
    let result = evaluator.load_file(path);
    evaluator.env.reset_dynamic();

    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(Error::Exit(code)) => exit_code(code),
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

/// Evaluate a string and exit.
fn run_command(text: &str) -> ExitCode {
    let mut evaluator = Evaluator::new();
    match evaluator.evaluate(text) {
        Ok(node) => {
            echo(&node);
            ExitCode::SUCCESS
        }
        Err(Error::Exit(code)) => exit_code(code),
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

/// Input that may become valid once more lines arrive
fn is_incomplete(err: &Error) -> bool {
    match err {
        Error::SyntaxError { message, .. } => {
            message.starts_with("unclosed") || message == "unexpected end of input"
        }
        Error::LexicalError { message, .. } => message == "unterminated string literal",
        _ => false,
    }
}

/// Outcome of submitting the REPL buffer
enum Submission {
    /// The buffer needs more lines
    Incomplete,
    Finished(exprsh::Result<Node>),
}

/// Only the top-level parse may ask for more lines; a syntax error raised
/// while running (`(parse "(")`) finishes the submission
fn submit(evaluator: &mut Evaluator, buffer: &str) -> Submission {
    match evaluator.parse_program(buffer) {
        Err(e) if is_incomplete(&e) => Submission::Incomplete,
        Err(e) => Submission::Finished(Err(e)),
        Ok(program) => Submission::Finished(evaluator.evaluate_program(&program)),
    }
}

fn run_repl() -> Result<ExitCode> {
    let mut evaluator = Evaluator::new();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut buffer = String::new();

    loop {
        print!("{}", if buffer.is_empty() { PROMPT } else { CONTINUATION_PROMPT });
        io::stdout().flush().context("failed to flush stdout")?;

        let line = match lines.next() {
            Some(line) => line.context("failed to read input")?,
            None => break,
        };

        if buffer.is_empty() {
            match line.trim() {
                "" => continue,
                "exit" | "quit" => break,
                _ => {}
            }
        } else {
            buffer.push('\n');
        }
        buffer.push_str(&line);

        match submit(&mut evaluator, &buffer) {
            Submission::Incomplete => continue,
            Submission::Finished(Ok(node)) => echo(&node),
            Submission::Finished(Err(Error::Exit(code))) => return Ok(exit_code(code)),
            Submission::Finished(Err(e)) => report(&e),
        }
        buffer.clear();
    }

    println!();
    Ok(ExitCode::SUCCESS)
}
