/// Tests for error reporting: each failure lands in its taxonomy bucket and
/// carries enough context to be printed to a user
use exprsh::{Error, EvalConfig, Evaluator, Node};

fn run(source: &str) -> exprsh::Result<Node> {
    Evaluator::with_config(EvalConfig::default()).evaluate(source)
}

fn category(source: &str) -> &'static str {
    run(source).unwrap_err().category()
}

// =============================================================================
// LEXICAL
// =============================================================================

#[test]
fn test_unterminated_string() {
    let err = run("let s = \"open;\n(print s)").unwrap_err();
    assert_eq!(
        err,
        Error::LexicalError {
            line: 1,
            message: "unterminated string literal".to_string()
        }
    );
    assert_eq!(err.category(), "lexical");
}

#[test]
fn test_illegal_character_in_number() {
    let err = run("(+ 1\n 12a)").unwrap_err();
    assert!(matches!(err, Error::LexicalError { line: 2, .. }));
}

#[test]
fn test_quote_inside_identifier() {
    assert_eq!(category("abc\"def\""), "lexical");
}

// =============================================================================
// SYNTAX
// =============================================================================

#[test]
fn test_unclosed_delimiter_reports_opening_line() {
    let err = run("\n\n(print\n  (+ 1 2)").unwrap_err();
    assert_eq!(err, Error::syntax(3, "unclosed '(': expected ')'"));
    assert_eq!(err.category(), "syntax");
}

#[test]
fn test_empty_call() {
    let err = run("(print ())").unwrap_err();
    assert!(err.to_string().contains("empty function call"));
}

#[test]
fn test_bare_call_without_terminator() {
    assert_eq!(category("print 1 2"), "syntax");
}

#[test]
fn test_mismatched_closer() {
    assert_eq!(category("(+ 1 2]"), "syntax");
}

#[test]
fn test_syntax_error_runs_nothing() {
    // the whole text is parsed before anything is evaluated
    let mut ev = Evaluator::with_config(EvalConfig::default());
    assert!(ev.evaluate("let global x = 1; (+ 1").is_err());
    assert_eq!(ev.evaluate("x").unwrap(), Node::identifier("x"));
}

// =============================================================================
// BINDING
// =============================================================================

#[test]
fn test_unbound_procedure() {
    let err = run("(no-such-thing 1 2)").unwrap_err();
    assert_eq!(err.to_string(), "Unbound procedure: no-such-thing");
    assert_eq!(err.category(), "binding");
}

#[test]
fn test_constant_reassignment() {
    let err = run("let global pi = 3; let global pi = 4;").unwrap_err();
    assert_eq!(
        err,
        Error::ConstantReassignment {
            name: "pi".to_string()
        }
    );
    assert_eq!(err.category(), "binding");
}

#[test]
fn test_global_let_inside_procedure() {
    let err = run("let f = () => { let global g = 1; g }; (f)").unwrap_err();
    assert_eq!(err.category(), "runtime");
    assert!(err.to_string().contains("not inside f"));
}

// =============================================================================
// TYPE AND ARITY
// =============================================================================

#[test]
fn test_type_errors() {
    assert_eq!(
        run("(hd 5)").unwrap_err(),
        Error::type_error("list", "number")
    );
    assert_eq!(category(r#"(+ 1 "two")"#), "type");
    assert_eq!(category("(upper 3)"), "type");
    assert_eq!(category("(apply 5 '[1])"), "type");
}

#[test]
fn test_arity_errors() {
    assert_eq!(category("(hd)"), "arity");
    assert_eq!(category("(if)"), "arity");
    assert_eq!(category("(typeof 1 2)"), "arity");
}

// =============================================================================
// ARITHMETIC
// =============================================================================

#[test]
fn test_division_by_zero() {
    assert_eq!(run("(/ 10 0)").unwrap_err(), Error::DivisionByZero);
    assert_eq!(category("(/ 10 0)"), "runtime");
}

#[test]
fn test_overflow_falls_back_to_unsigned() {
    assert_eq!(
        run("(+ 9223372036854775807 1)").unwrap().to_string(),
        "9223372036854775808"
    );
}

#[test]
fn test_overflow_beyond_unsigned() {
    let err = run("(* 18446744073709551615 2)").unwrap_err();
    assert_eq!(
        err,
        Error::ArithmeticOverflow {
            op: "*".to_string()
        }
    );
}

// =============================================================================
// EVALUATION BOUNDARIES
// =============================================================================

#[test]
fn test_eval_converts_errors_to_values() {
    let result = run(r#"(eval "(hd 5)")"#).unwrap();
    assert_eq!(result.type_name(), "error");
    assert!(result.to_string().contains("Type error"));
}

#[test]
fn test_eval_error_value_can_be_inspected() {
    let source = r#"
        let outcome = (eval "(no-such-thing)");
        (typeof outcome)
    "#;
    assert_eq!(run(source).unwrap(), Node::string("error"));
}

#[test]
fn test_exit_carries_code() {
    assert_eq!(run("(exit 7)").unwrap_err(), Error::Exit(7));
    assert_eq!(run("(exit)").unwrap_err(), Error::Exit(0));
    assert_eq!(run("(exit 7)").unwrap_err().category(), "control");
}

#[test]
fn test_exit_rejects_out_of_range_status() {
    for source in ["(exit 256)", "(exit -1)", "(exit 4294967297)"] {
        let err = run(source).unwrap_err();
        assert!(
            matches!(err, Error::InvalidArguments { .. }),
            "{} -> {:?}",
            source,
            err
        );
        assert!(err.to_string().contains("outside 0..=255"));
    }
    assert_eq!(run("(exit 255)").unwrap_err(), Error::Exit(255));
}

#[test]
fn test_load_missing_file_names_it() {
    let err = run(r#"(load "/definitely/not/here.esh")"#).unwrap_err();
    assert!(err.to_string().starts_with("/definitely/not/here.esh: "));
    assert_eq!(err.category(), "runtime");
}

#[test]
fn test_load_error_reports_inner_category() {
    let path = std::env::temp_dir().join(format!("exprsh-taxonomy-{}.esh", std::process::id()));
    std::fs::write(&path, "(+ 1").unwrap();

    let err = run(&format!("(load \"{}\")", path.display())).unwrap_err();
    assert!(matches!(err, Error::LoadError { .. }));
    assert_eq!(err.category(), "syntax");

    std::fs::remove_file(&path).unwrap();
}
