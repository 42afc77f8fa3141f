/// End-to-end tests for the expression language
/// Demonstrates: Scanner → Parser → Evaluator working together
use exprsh::{Error, EvalConfig, Evaluator, Node, Parser, Scanner, Value};

fn evaluator() -> Evaluator {
    Evaluator::with_config(EvalConfig::default())
}

fn run(source: &str) -> exprsh::Result<Node> {
    evaluator().evaluate(source)
}

#[test]
fn test_e2e_simple_arithmetic() {
    let source = "(+ 1 2 3)";

    // Lex
    let mut scanner = Scanner::new(source);
    let tokens = scanner.scan_tokens().unwrap();

    // Parse
    let mut parser = Parser::new(tokens);
    let program = parser.parse().unwrap();

    // Evaluate
    let mut evaluator = evaluator();
    let result = evaluator.execute(&program).unwrap();

    assert_eq!(result, Node::int(6));
}

#[test]
fn test_e2e_variables() {
    let source = r#"
        let x = 10;
        let y = 20;
        (+ x y)
    "#;

    assert_eq!(run(source).unwrap(), Node::int(30));
}

#[test]
fn test_e2e_nested_calls() {
    assert_eq!(run("(- (* 6 7) (/ 10 5))").unwrap(), Node::int(40));
    assert_eq!(run("(- 5)").unwrap(), Node::int(-5));
}

#[test]
fn test_e2e_strings() {
    assert_eq!(
        run(r#"(concat "a" (upper "b") 3)"#).unwrap(),
        Node::string("aB3")
    );
    assert_eq!(
        run(r#"(join (split "x y  z" "") ",")"#).unwrap(),
        Node::string("x,y,z")
    );
}

#[test]
fn test_e2e_lists() {
    assert_eq!(run("(hd '[1 2 3])").unwrap(), Node::int(1));
    assert_eq!(run("(tl '[1 2 3])").unwrap(), Node::from(vec![2i64, 3]));
    assert_eq!(run("(len (cons 0 '[1 2]))").unwrap(), Node::int(3));
    assert_eq!(run("(reverse '[1 2 3])").unwrap(), Node::from(vec![3i64, 2, 1]));
}

#[test]
fn test_e2e_quoted_list_is_data() {
    // identifiers inside a literal are not looked up
    let result = run("let a = 1; '[a 2]").unwrap();
    assert!(result.is_literal);
    assert_eq!(
        result.as_list().unwrap(),
        &[Node::identifier("a"), Node::int(2)][..]
    );
}

#[test]
fn test_e2e_function_literal_called_in_place() {
    assert_eq!(run("((x) => (* x x) 7)").unwrap(), Node::int(49));
}

#[test]
fn test_e2e_block_body() {
    let source = r#"
        let f = () => {
            let a = 2;
            (* a 21)
        };
        (f)
    "#;

    assert_eq!(run(source).unwrap(), Node::int(42));
}

#[test]
fn test_e2e_recursive_fibonacci() {
    let source = r#"
        let fib = (n) => match n
            | [< 2] => n
            | _ => (+ (fib (- n 1)) (fib (- n 2)))
            ;
        (fib 15)
    "#;

    assert_eq!(run(source).unwrap(), Node::int(610));
}

#[test]
fn test_e2e_factorial_with_if() {
    let source = r#"
        let fact = (n) => (if (<= n 1) 1 (* n (fact (- n 1))));
        (fact 10)
    "#;

    assert_eq!(run(source).unwrap(), Node::int(3628800));
}

#[test]
fn test_e2e_truthiness() {
    assert_eq!(run(r#"(if "" 1 2)"#).unwrap(), Node::int(2));
    assert_eq!(run("(if '[] 1 2)").unwrap(), Node::int(2));
    assert_eq!(run("(if 0 1 2)").unwrap(), Node::int(2));
    assert_eq!(run("(if '[0] 1 2)").unwrap(), Node::int(1));
    assert_eq!(run("(not 0)").unwrap(), Node::boolean(true));
}

#[test]
fn test_e2e_higher_order() {
    let source = r#"
        let inc = (x) => (+ x 1);
        (map inc (filter (x) => (> x 2) '[1 2 3 4]))
    "#;

    assert_eq!(run(source).unwrap(), Node::from(vec![4i64, 5]));
}

#[test]
fn test_e2e_procedure_passed_by_name() {
    let source = r#"
        let twice = (f x) => (f (f x));
        let double = (x) => (* x 2);
        (twice double 5)
    "#;

    assert_eq!(run(source).unwrap(), Node::int(20));
}

#[test]
fn test_e2e_eval_and_parse() {
    assert_eq!(run(r#"(eval "(+ 40 2)")"#).unwrap(), Node::int(42));

    let ast = run(r#"(parse "(* 2 3)")"#).unwrap();
    assert!(matches!(ast.value, Value::RawAst(_)));

    assert_eq!(run(r#"(eval (parse "(* 2 3)"))"#).unwrap(), Node::int(6));
}

#[test]
fn test_e2e_json_round_trip() {
    assert_eq!(
        run(r#"(to-json '[1 "two" true])"#).unwrap(),
        Node::string(r#"[1,"two",true]"#)
    );
    assert_eq!(run(r#"(len (from-json "[1, [2, 3], 4]"))"#).unwrap(), Node::int(3));
    assert_eq!(
        run(r#"(from-json (to-json '[1 [2 3]]))"#).unwrap(),
        run("'[1 [2 3]]").unwrap()
    );
}

#[test]
fn test_e2e_global_constants_persist() {
    let mut ev = evaluator();
    ev.evaluate("let global greeting = \"hi\";").unwrap();
    ev.evaluate("let local = 1;").unwrap();

    assert_eq!(ev.evaluate("greeting").unwrap(), Node::string("hi"));
    assert_eq!(ev.evaluate("local").unwrap(), Node::identifier("local"));
}

#[test]
fn test_e2e_procedures_persist_between_evaluations() {
    let mut ev = evaluator();
    ev.evaluate("let square = (x) => (* x x);").unwrap();
    assert_eq!(ev.evaluate("(square 9)").unwrap(), Node::int(81));
}

#[test]
fn test_e2e_comments_and_empty_statements() {
    let source = r#"
        # leading comment
        ;;
        let x = 1; # trailing comment
        (+ x 1)
    "#;

    assert_eq!(run(source).unwrap(), Node::int(2));
}

#[test]
fn test_e2e_load_file() {
    let dir = std::env::temp_dir().join(format!("exprsh-e2e-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    let lib = dir.join("lib.esh");
    std::fs::write(&lib, "let triple = (x) => (* x 3);\n").unwrap();
    let broken = dir.join("broken.esh");
    std::fs::write(&broken, "(hd 5)\n").unwrap();

    let mut ev = evaluator();
    let source = format!("(load \"{}\") (triple 4)", lib.display());
    assert_eq!(ev.evaluate(&source).unwrap(), Node::int(12));

    let err = ev
        .evaluate(&format!("(load \"{}\")", broken.display()))
        .unwrap_err();
    match err {
        Error::LoadError { file, source } => {
            assert!(file.ends_with("broken.esh"));
            assert!(matches!(*source, Error::TypeError { .. }));
        }
        other => panic!("expected load error, got {:?}", other),
    }

    std::fs::remove_dir_all(&dir).unwrap();
}
