//! Tree-walking interpreter
//!
//! Values follow loose scripting semantics: `undefined == null`, relational
//! operators only order two numbers or two strings, and arithmetic on
//! anything but numbers yields NaN. Evaluation never panics; the only
//! runtime error is a field the rewrite left unresolved.

use std::cmp::Ordering;

use serde_json::Value;

use crate::resolver::FieldPath;

use super::ast::{BinaryOp, Expr, FieldRef, Function, LogicalOp, Scalar, UnaryOp};
use super::errors::{QueryError, QueryResult};

/// Something accessor paths can be resolved against
pub trait FieldSource {
    /// Value at `path`, `Scalar::Undefined` when absent
    fn field(&self, path: &FieldPath) -> Scalar;
}

/// Plain JSON documents resolve paths verbatim
impl FieldSource for Value {
    fn field(&self, path: &FieldPath) -> Scalar {
        Scalar::from(path.lookup(self))
    }
}

impl Expr {
    /// Evaluates the expression against `source`
    pub fn evaluate(&self, source: &dyn FieldSource) -> QueryResult<Scalar> {
        match self {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Field(field) => resolve_field(field, source),
            Expr::Unary { op, operand } => {
                let value = operand.evaluate(source)?;
                Ok(match op {
                    UnaryOp::Not => Scalar::Bool(!value.truthy()),
                    UnaryOp::Neg => Scalar::Number(-numeric(&value)),
                })
            }
            Expr::Binary { op, lhs, rhs } => {
                let left = lhs.evaluate(source)?;
                let right = rhs.evaluate(source)?;
                Ok(apply_binary(*op, &left, &right))
            }
            Expr::Logical { op, operands } => {
                // the deciding operand is the result, as in `0 || 'x'`
                let mut last = Scalar::Undefined;
                for operand in operands {
                    last = operand.evaluate(source)?;
                    let decided = match op {
                        LogicalOp::And => !last.truthy(),
                        LogicalOp::Or => last.truthy(),
                    };
                    if decided {
                        break;
                    }
                }
                Ok(last)
            }
            Expr::Call { func, args } => call(*func, args, source),
        }
    }

    /// Evaluates the expression as a predicate
    pub fn matches(&self, source: &dyn FieldSource) -> QueryResult<bool> {
        self.evaluate(source).map(|value| value.truthy())
    }
}

fn resolve_field(field: &FieldRef, source: &dyn FieldSource) -> QueryResult<Scalar> {
    match field {
        // `$` is the record itself
        FieldRef::Path(path) if path.is_root() => Ok(Scalar::Compound),
        FieldRef::Path(path) => Ok(source.field(path)),
        FieldRef::Unresolved(name) => Err(QueryError::unknown_field(name.clone())),
    }
}

fn call(func: Function, args: &[Expr], source: &dyn FieldSource) -> QueryResult<Scalar> {
    if func == Function::Exists {
        let present = match args.first() {
            Some(Expr::Field(field)) => resolve_field(field, source)? != Scalar::Undefined,
            _ => return Err(QueryError::evaluation("exists() expects a field")),
        };
        return Ok(Scalar::Bool(present));
    }

    let values = args
        .iter()
        .map(|arg| arg.evaluate(source).map(|v| numeric(&v)))
        .collect::<QueryResult<Vec<f64>>>()?;

    let result = match func {
        Function::Abs => values.first().map(|x| x.abs()),
        Function::Round => values.first().map(|x| (x + 0.5).floor()),
        Function::Min => fold_extreme(&values, f64::min),
        Function::Max => fold_extreme(&values, f64::max),
        Function::Exists => None,
    };
    Ok(Scalar::Number(result.unwrap_or(f64::NAN)))
}

/// NaN anywhere poisons the result, unlike `f64::min`/`f64::max`
fn fold_extreme(values: &[f64], pick: fn(f64, f64) -> f64) -> Option<f64> {
    if values.iter().any(|v| v.is_nan()) {
        return Some(f64::NAN);
    }
    values.iter().copied().reduce(pick)
}

fn numeric(value: &Scalar) -> f64 {
    value.as_number().unwrap_or(f64::NAN)
}

fn apply_binary(op: BinaryOp, left: &Scalar, right: &Scalar) -> Scalar {
    match op {
        BinaryOp::Eq => Scalar::Bool(loose_eq(left, right)),
        BinaryOp::NotEq => Scalar::Bool(!loose_eq(left, right)),
        BinaryOp::Lt => Scalar::Bool(order(left, right) == Some(Ordering::Less)),
        BinaryOp::Le => Scalar::Bool(matches!(
            order(left, right),
            Some(Ordering::Less | Ordering::Equal)
        )),
        BinaryOp::Gt => Scalar::Bool(order(left, right) == Some(Ordering::Greater)),
        BinaryOp::Ge => Scalar::Bool(matches!(
            order(left, right),
            Some(Ordering::Greater | Ordering::Equal)
        )),
        BinaryOp::Add => match (left, right) {
            (Scalar::Str(a), Scalar::Str(b)) => Scalar::Str(format!("{}{}", a, b)),
            _ => Scalar::Number(numeric(left) + numeric(right)),
        },
        BinaryOp::Sub => Scalar::Number(numeric(left) - numeric(right)),
        BinaryOp::Mul => Scalar::Number(numeric(left) * numeric(right)),
        BinaryOp::Div => Scalar::Number(numeric(left) / numeric(right)),
    }
}

/// `==` with `undefined == null`; mismatched types are unequal
pub fn loose_eq(left: &Scalar, right: &Scalar) -> bool {
    match (left, right) {
        (Scalar::Undefined | Scalar::Null, Scalar::Undefined | Scalar::Null) => true,
        (Scalar::Bool(a), Scalar::Bool(b)) => a == b,
        (Scalar::Number(a), Scalar::Number(b)) => a == b,
        (Scalar::Str(a), Scalar::Str(b)) => a == b,
        _ => false,
    }
}

/// Ordering for relational operators; `None` unless both sides are numbers
/// or both are strings
fn order(left: &Scalar, right: &Scalar) -> Option<Ordering> {
    match (left, right) {
        (Scalar::Number(a), Scalar::Number(b)) => a.partial_cmp(b),
        (Scalar::Str(a), Scalar::Str(b)) => Some(a.cmp(b)),
        _ => None,
    }
}
