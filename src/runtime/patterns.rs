//! `match` and `cond`.
//!
//! A `match` branch pattern is one of:
//! - `_`, which always matches and binds `_` to the scrutinee
//! - a quoted list literal, matched structurally; identifier leaves capture
//! - a list-expression shaped like an entry of the pattern catalog below
//! - anything else, evaluated and compared for equality
//!
//! Catalog handlers see the pattern arguments unevaluated. Returning
//! `Ok(None)` lets control fall through to the next branch; any other result
//! ends the match, even a falsy one.

use std::collections::HashMap;

use lazy_static::lazy_static;
use tracing::trace;

use super::evaluator::Evaluator;
use crate::error::{Error, Result};
use crate::parser::{Node, Value};

/// Catalog handler: `(evaluator, scrutinee, pattern arguments, body)`
type Handler = fn(&mut Evaluator, &Node, &[Node], &Node) -> Result<Option<Node>>;

struct PatternEntry {
    template: Node,
    handler: Handler,
}

fn entry(op: &str, params: &[&str], handler: Handler) -> PatternEntry {
    let mut items = vec![Node::operator(op)];
    items.extend(params.iter().map(|p| Node::identifier(*p)));
    PatternEntry {
        template: Node::expression(items),
        handler,
    }
}

lazy_static! {
    /// Ordered catalog; the first weakly-equal template wins
    static ref CATALOG: Vec<PatternEntry> = vec![
        entry("in", &["l"], member),
        entry("in", &["a", "l"], member_capture),
        entry("<", &["x"], less),
        entry("<", &["a", "b"], less_capture),
        entry(">", &["x"], greater),
        entry(">", &["a", "b"], greater_capture),
        entry("=", &["x"], equal),
        entry("=", &["a", "x"], equal_capture),
        entry("!=", &["x"], not_equal),
        entry("!=", &["a", "x"], not_equal_capture),
        entry("cons", &["a", "b"], destructure),
    ];
}

/// Evaluates `match`: `args` is the scrutinee followed by `[pattern body]` branches
pub fn eval_match(ev: &mut Evaluator, args: &[Node]) -> Result<Node> {
    let (scrutinee, branches) = args
        .split_first()
        .ok_or_else(|| Error::runtime("match requires a scrutinee"))?;
    let scrutinee = ev.eval_node(scrutinee)?;

    for (index, branch) in branches.iter().enumerate() {
        let (pattern, body) = branch_parts(branch)?;
        if let Some(result) = match_branch(ev, &scrutinee, pattern, body)? {
            trace!(branch = index, pattern = %pattern, "match branch taken");
            return Ok(result);
        }
    }

    Ok(Node::boolean(false))
}

/// Evaluates `cond`: the body of the first clause whose test is truthy
pub fn eval_cond(ev: &mut Evaluator, args: &[Node]) -> Result<Node> {
    for (index, clause) in args.iter().enumerate() {
        let (test, body) = branch_parts(clause)?;
        if ev.eval_node(test)?.is_truthy() {
            trace!(clause = index, "cond clause taken");
            return ev.eval_node(body);
        }
    }

    Ok(Node::boolean(false))
}

fn branch_parts(branch: &Node) -> Result<(&Node, &Node)> {
    match branch.as_list()? {
        [pattern, body] => Ok((pattern, body)),
        other => Err(Error::runtime(format!(
            "branch must be a pattern and a body, found {} elements",
            other.len()
        ))),
    }
}

fn match_branch(
    ev: &mut Evaluator,
    scrutinee: &Node,
    pattern: &Node,
    body: &Node,
) -> Result<Option<Node>> {
    if pattern.is_wildcard() {
        ev.env.bind("_", scrutinee.clone());
        return ev.eval_node(body).map(Some);
    }

    match &pattern.value {
        Value::List(items) if pattern.is_literal => {
            let mut captures = HashMap::new();
            if !structural_match(items, scrutinee, &mut captures) {
                return Ok(None);
            }
            for (name, value) in captures {
                ev.env.bind(name, value);
            }
            ev.eval_node(body).map(Some)
        }
        Value::List(items) => match CATALOG.iter().find(|e| weak_eq(&e.template, pattern)) {
            Some(entry) => (entry.handler)(ev, scrutinee, &items[1..], body),
            None => equality_branch(ev, scrutinee, pattern, body),
        },
        _ => equality_branch(ev, scrutinee, pattern, body),
    }
}

fn equality_branch(
    ev: &mut Evaluator,
    scrutinee: &Node,
    pattern: &Node,
    body: &Node,
) -> Result<Option<Node>> {
    if ev.eval_node(pattern)? == *scrutinee {
        ev.eval_node(body).map(Some)
    } else {
        Ok(None)
    }
}

/// Shape-only comparison used to pick a catalog entry
fn weak_eq(a: &Node, b: &Node) -> bool {
    match (&a.value, &b.value) {
        (Value::Identifier(_), _) | (_, Value::Identifier(_)) => true,
        (Value::Operator(x), Value::Operator(y)) => x == y,
        (Value::List(xs), Value::List(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| weak_eq(x, y))
        }
        _ => a == b,
    }
}

/// Positional match of a literal list pattern. Identifier leaves collect
/// captures, `_` matches anything, other leaves must be equal.
fn structural_match(pattern: &[Node], value: &Node, captures: &mut HashMap<String, Node>) -> bool {
    let items = match &value.value {
        Value::List(items) if items.len() == pattern.len() => items,
        _ => return false,
    };

    pattern.iter().zip(items).all(|(p, v)| match &p.value {
        _ if p.is_wildcard() => true,
        Value::List(nested) => structural_match(nested, v, captures),
        Value::Identifier(name) => {
            captures.insert(name.clone(), v.clone());
            true
        }
        _ => p == v,
    })
}

fn capture_name(node: &Node) -> Result<&str> {
    match &node.value {
        Value::Identifier(name) => Ok(name),
        _ => Err(Error::type_error("a capture name", node.type_name())),
    }
}

/// Evaluates the body when `matched`, binding `capture` to the scrutinee first
fn take_branch(
    ev: &mut Evaluator,
    matched: bool,
    capture: Option<&Node>,
    scrutinee: &Node,
    body: &Node,
) -> Result<Option<Node>> {
    if !matched {
        return Ok(None);
    }
    if let Some(name) = capture {
        let name = capture_name(name)?.to_string();
        ev.env.bind(name, scrutinee.clone());
    }
    ev.eval_node(body).map(Some)
}

fn contains(ev: &mut Evaluator, scrutinee: &Node, list: &Node) -> Result<bool> {
    let list = ev.eval_node(list)?;
    Ok(list.as_list()?.contains(scrutinee))
}

fn member(ev: &mut Evaluator, scrutinee: &Node, args: &[Node], body: &Node) -> Result<Option<Node>> {
    let matched = contains(ev, scrutinee, &args[0])?;
    take_branch(ev, matched, None, scrutinee, body)
}

fn member_capture(
    ev: &mut Evaluator,
    scrutinee: &Node,
    args: &[Node],
    body: &Node,
) -> Result<Option<Node>> {
    let matched = contains(ev, scrutinee, &args[1])?;
    take_branch(ev, matched, Some(&args[0]), scrutinee, body)
}

/// Orders the scrutinee against the evaluated bound. Both sides must be
/// numbers; they are compared as truncated `i64`.
fn ordering(ev: &mut Evaluator, scrutinee: &Node, bound: &Node) -> Result<Option<std::cmp::Ordering>> {
    let bound = ev.eval_node(bound)?;
    Ok(match (&scrutinee.value, &bound.value) {
        (Value::Number(a), Value::Number(b)) => Some(a.truncate().cmp(&b.truncate())),
        _ => None,
    })
}

fn less(ev: &mut Evaluator, scrutinee: &Node, args: &[Node], body: &Node) -> Result<Option<Node>> {
    let matched = ordering(ev, scrutinee, &args[0])?.map_or(false, |o| o.is_lt());
    take_branch(ev, matched, None, scrutinee, body)
}

fn less_capture(ev: &mut Evaluator, scrutinee: &Node, args: &[Node], body: &Node) -> Result<Option<Node>> {
    let matched = ordering(ev, scrutinee, &args[1])?.map_or(false, |o| o.is_lt());
    take_branch(ev, matched, Some(&args[0]), scrutinee, body)
}

fn greater(ev: &mut Evaluator, scrutinee: &Node, args: &[Node], body: &Node) -> Result<Option<Node>> {
    let matched = ordering(ev, scrutinee, &args[0])?.map_or(false, |o| o.is_gt());
    take_branch(ev, matched, None, scrutinee, body)
}

fn greater_capture(
    ev: &mut Evaluator,
    scrutinee: &Node,
    args: &[Node],
    body: &Node,
) -> Result<Option<Node>> {
    let matched = ordering(ev, scrutinee, &args[1])?.map_or(false, |o| o.is_gt());
    take_branch(ev, matched, Some(&args[0]), scrutinee, body)
}

fn equal(ev: &mut Evaluator, scrutinee: &Node, args: &[Node], body: &Node) -> Result<Option<Node>> {
    let matched = ev.eval_node(&args[0])? == *scrutinee;
    take_branch(ev, matched, None, scrutinee, body)
}

fn equal_capture(ev: &mut Evaluator, scrutinee: &Node, args: &[Node], body: &Node) -> Result<Option<Node>> {
    let matched = ev.eval_node(&args[1])? == *scrutinee;
    take_branch(ev, matched, Some(&args[0]), scrutinee, body)
}

fn not_equal(ev: &mut Evaluator, scrutinee: &Node, args: &[Node], body: &Node) -> Result<Option<Node>> {
    let matched = ev.eval_node(&args[0])? != *scrutinee;
    take_branch(ev, matched, None, scrutinee, body)
}

fn not_equal_capture(
    ev: &mut Evaluator,
    scrutinee: &Node,
    args: &[Node],
    body: &Node,
) -> Result<Option<Node>> {
    let matched = ev.eval_node(&args[1])? != *scrutinee;
    take_branch(ev, matched, Some(&args[0]), scrutinee, body)
}

/// `[cons a b]`: head and tail of a non-empty list
fn destructure(ev: &mut Evaluator, scrutinee: &Node, args: &[Node], body: &Node) -> Result<Option<Node>> {
    let (head, tail) = match &scrutinee.value {
        Value::List(items) => items
            .split_first()
            .ok_or_else(|| Error::type_error("a list to destructure", "empty list"))?,
        _ => return Err(Error::type_error("a list to destructure", scrutinee.type_name())),
    };

    let head_name = capture_name(&args[0])?.to_string();
    let tail_name = capture_name(&args[1])?.to_string();
    let tail = Node::list(tail.to_vec());
    ev.env.bind(head_name, head.clone());
    ev.env.bind(tail_name, tail);
    ev.eval_node(body).map(Some)
}
