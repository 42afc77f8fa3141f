//! Arithmetic and comparison tools
//!
//! Arithmetic is checked. Operands are combined as `i64` first; when that
//! overflows (or an operand only fits `u64`) and no operand is negative the
//! `u64` path is tried. Anything still out of range is `ArithmeticOverflow`.

use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::parser::{Node, Number, Value};
use crate::tools::{require_at_least, Tool, ToolContext, ToolRegistry};

/// Register arithmetic and comparison tools
pub fn register(registry: &mut ToolRegistry) {
    for op in [ArithOp::Add, ArithOp::Sub, ArithOp::Mul, ArithOp::Div, ArithOp::Rem] {
        registry.register(ArithmeticTool { op });
    }
    for op in [CompareOp::Lt, CompareOp::Gt, CompareOp::Le, CompareOp::Ge] {
        registry.register(OrderingTool { op });
    }
    registry.register(EqualTool { negate: false });
    registry.register(EqualTool { negate: true });
    registry.register(NotTool);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl ArithOp {
    fn symbol(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Rem => "%",
        }
    }

    /// Value of the operator applied to no operands
    fn identity(self) -> Option<i64> {
        match self {
            ArithOp::Add => Some(0),
            ArithOp::Mul => Some(1),
            _ => None,
        }
    }

    fn min_args(self) -> usize {
        match self {
            ArithOp::Add | ArithOp::Mul => 0,
            ArithOp::Sub => 1,
            ArithOp::Div | ArithOp::Rem => 2,
        }
    }

    fn signed(self, a: i64, b: i64) -> Option<i64> {
        match self {
            ArithOp::Add => a.checked_add(b),
            ArithOp::Sub => a.checked_sub(b),
            ArithOp::Mul => a.checked_mul(b),
            ArithOp::Div => a.checked_div(b),
            ArithOp::Rem => a.checked_rem(b),
        }
    }

    fn unsigned(self, a: u64, b: u64) -> Option<u64> {
        match self {
            ArithOp::Add => a.checked_add(b),
            ArithOp::Sub => a.checked_sub(b),
            ArithOp::Mul => a.checked_mul(b),
            ArithOp::Div => a.checked_div(b),
            ArithOp::Rem => a.checked_rem(b),
        }
    }
}

/// `+ - * / %` over integers
///
/// Usage: `(+ 1 2 3)` returns `6`, `(- 5)` returns `-5`
pub struct ArithmeticTool {
    op: ArithOp,
}

impl ArithmeticTool {
    fn fold(&self, operands: &[Number]) -> Result<Number> {
        let op = self.op;

        let signed: Option<Vec<i64>> = operands.iter().map(|n| n.to_i64()).collect();
        if let Some(values) = signed {
            if let Some(result) = fold_with(&values, |a, b| op.signed(a, b)) {
                return Ok(Number::Int(result));
            }
        }

        let unsigned: Option<Vec<u64>> = operands.iter().map(|n| n.to_u64()).collect();
        if let Some(values) = unsigned {
            if let Some(result) = fold_with(&values, |a, b| op.unsigned(a, b)) {
                return Ok(Number::from_u64(result));
            }
        }

        Err(Error::ArithmeticOverflow {
            op: op.symbol().to_string(),
        })
    }
}

fn fold_with<T: Copy>(values: &[T], f: impl Fn(T, T) -> Option<T>) -> Option<T> {
    let (first, rest) = values.split_first()?;
    rest.iter().try_fold(*first, |acc, &n| f(acc, n))
}

impl Tool for ArithmeticTool {
    fn name(&self) -> &str {
        self.op.symbol()
    }

    fn description(&self) -> &str {
        match self.op {
            ArithOp::Add => "Sum of the arguments",
            ArithOp::Sub => "Difference, or negation of a single argument",
            ArithOp::Mul => "Product of the arguments",
            ArithOp::Div => "Integer quotient, truncated toward zero",
            ArithOp::Rem => "Remainder of integer division",
        }
    }

    fn execute(&self, args: &[Node], _ctx: &mut ToolContext<'_>) -> Result<Node> {
        require_at_least(self.name(), args, self.op.min_args())?;

        let mut operands = args
            .iter()
            .map(Node::as_number)
            .collect::<Result<Vec<_>>>()?;

        if operands.is_empty() {
            if let Some(identity) = self.op.identity() {
                return Ok(Node::int(identity));
            }
        }

        if matches!(self.op, ArithOp::Div | ArithOp::Rem) && operands[1..].iter().any(|n| n.is_zero()) {
            return Err(Error::DivisionByZero);
        }

        if self.op == ArithOp::Sub && operands.len() == 1 {
            operands.insert(0, Number::Int(0));
        }

        self.fold(&operands).map(Node::number)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp {
    Lt,
    Gt,
    Le,
    Ge,
}

/// `< > <= >=` over two numbers or two strings
pub struct OrderingTool {
    op: CompareOp,
}

impl Tool for OrderingTool {
    fn name(&self) -> &str {
        match self.op {
            CompareOp::Lt => "<",
            CompareOp::Gt => ">",
            CompareOp::Le => "<=",
            CompareOp::Ge => ">=",
        }
    }

    fn description(&self) -> &str {
        "Compares two numbers or two strings"
    }

    fn execute(&self, args: &[Node], _ctx: &mut ToolContext<'_>) -> Result<Node> {
        let ordering = match (&args[0].value, &args[1].value) {
            (Value::Number(a), Value::Number(b)) => a.as_i128().cmp(&b.as_i128()),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Number(_), _) => return Err(Error::type_error("number", args[1].type_name())),
            (Value::String(_), _) => return Err(Error::type_error("string", args[1].type_name())),
            _ => return Err(Error::type_error("number or string", args[0].type_name())),
        };

        let result = match self.op {
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Le => ordering != Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
        };
        Ok(Node::boolean(result))
    }

    fn arity(&self) -> Option<usize> {
        Some(2)
    }
}

/// `=` and `!=`: value equality of any two nodes
pub struct EqualTool {
    negate: bool,
}

impl Tool for EqualTool {
    fn name(&self) -> &str {
        if self.negate {
            "!="
        } else {
            "="
        }
    }

    fn description(&self) -> &str {
        "Value equality"
    }

    fn execute(&self, args: &[Node], _ctx: &mut ToolContext<'_>) -> Result<Node> {
        Ok(Node::boolean((args[0] == args[1]) != self.negate))
    }

    fn arity(&self) -> Option<usize> {
        Some(2)
    }
}

/// `not`: boolean negation of the argument's truthiness
pub struct NotTool;

impl Tool for NotTool {
    fn name(&self) -> &str {
        "not"
    }

    fn description(&self) -> &str {
        "Logical negation"
    }

    fn execute(&self, args: &[Node], _ctx: &mut ToolContext<'_>) -> Result<Node> {
        Ok(Node::boolean(!args[0].is_truthy()))
    }

    fn arity(&self) -> Option<usize> {
        Some(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::call;

    fn arith(op: ArithOp, args: &[Node]) -> Result<Node> {
        call(&ArithmeticTool { op }, args)
    }

    fn uint(n: u64) -> Node {
        Node::number(Number::UInt(n))
    }

    #[test]
    fn test_basic_arithmetic() {
        assert_eq!(arith(ArithOp::Add, &[Node::int(1), Node::int(2), Node::int(3)]).unwrap(), Node::int(6));
        assert_eq!(arith(ArithOp::Add, &[]).unwrap(), Node::int(0));
        assert_eq!(arith(ArithOp::Mul, &[]).unwrap(), Node::int(1));
        assert_eq!(arith(ArithOp::Sub, &[Node::int(5)]).unwrap(), Node::int(-5));
        assert_eq!(arith(ArithOp::Sub, &[Node::int(10), Node::int(3), Node::int(2)]).unwrap(), Node::int(5));
        assert_eq!(arith(ArithOp::Div, &[Node::int(-7), Node::int(2)]).unwrap(), Node::int(-3));
        assert_eq!(arith(ArithOp::Rem, &[Node::int(7), Node::int(3)]).unwrap(), Node::int(1));
    }

    #[test]
    fn test_signed_overflow_falls_back_to_unsigned() {
        let result = arith(ArithOp::Add, &[Node::int(i64::MAX), Node::int(1)]).unwrap();
        assert_eq!(result, uint(i64::MAX as u64 + 1));

        let result = arith(ArithOp::Sub, &[uint(u64::MAX), Node::int(1)]).unwrap();
        assert_eq!(result, uint(u64::MAX - 1));
    }

    #[test]
    fn test_overflow_is_an_error() {
        let err = arith(ArithOp::Add, &[uint(u64::MAX), Node::int(1)]).unwrap_err();
        assert_eq!(err, Error::ArithmeticOverflow { op: "+".to_string() });

        // a negative operand rules out the unsigned path
        let err = arith(ArithOp::Mul, &[Node::int(i64::MIN), Node::int(-1)]).unwrap_err();
        assert!(matches!(err, Error::ArithmeticOverflow { .. }));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(
            arith(ArithOp::Div, &[Node::int(1), Node::int(0)]).unwrap_err(),
            Error::DivisionByZero
        );
        assert_eq!(
            arith(ArithOp::Rem, &[Node::int(1), Node::int(0)]).unwrap_err(),
            Error::DivisionByZero
        );
    }

    #[test]
    fn test_type_errors() {
        let err = arith(ArithOp::Add, &[Node::int(1), Node::string("x")]).unwrap_err();
        assert_eq!(err, Error::type_error("number", "string"));
        assert!(matches!(
            arith(ArithOp::Div, &[Node::int(1)]).unwrap_err(),
            Error::InvalidArguments { .. }
        ));
    }

    #[test]
    fn test_comparisons() {
        let lt = OrderingTool { op: CompareOp::Lt };
        assert_eq!(call(&lt, &[Node::int(1), uint(u64::MAX)]).unwrap(), Node::boolean(true));
        assert_eq!(call(&lt, &[Node::string("b"), Node::string("a")]).unwrap(), Node::boolean(false));
        assert!(call(&lt, &[Node::int(1), Node::string("a")]).is_err());

        let ge = OrderingTool { op: CompareOp::Ge };
        assert_eq!(call(&ge, &[Node::int(2), Node::int(2)]).unwrap(), Node::boolean(true));

        let ne = EqualTool { negate: true };
        assert_eq!(call(&ne, &[Node::int(2), Node::string("2")]).unwrap(), Node::boolean(true));
        assert_eq!(call(&NotTool, &[Node::list(vec![])]).unwrap(), Node::boolean(true));
    }
}
