//! Expression AST
//!
//! `Literal | Field | Unary | Binary | Logical | Call`, produced by the
//! parser from rewritten text and walked by the interpreter.

use std::fmt;

use serde_json::Value;

use crate::resolver::FieldPath;

/// A runtime value
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    /// Object or array; present, but equal to nothing
    Compound,
}

impl Scalar {
    /// Truthiness: `true`, non-zero non-NaN numbers, non-empty strings
    pub fn truthy(&self) -> bool {
        match self {
            Scalar::Undefined | Scalar::Null => false,
            Scalar::Bool(b) => *b,
            Scalar::Number(n) => *n != 0.0 && !n.is_nan(),
            Scalar::Str(s) => !s.is_empty(),
            Scalar::Compound => true,
        }
    }

    /// Undefined, null or NaN
    pub fn is_missing(&self) -> bool {
        match self {
            Scalar::Undefined | Scalar::Null => true,
            Scalar::Number(n) => n.is_nan(),
            _ => false,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Undefined => write!(f, "undefined"),
            Scalar::Null => write!(f, "null"),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Number(n) => write!(f, "{}", n),
            Scalar::Str(s) => write!(f, "{:?}", s),
            Scalar::Compound => write!(f, "[object]"),
        }
    }
}

impl From<&Value> for Scalar {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Scalar::Null,
            Value::Bool(b) => Scalar::Bool(*b),
            Value::Number(n) => n.as_f64().map(Scalar::Number).unwrap_or(Scalar::Number(f64::NAN)),
            Value::String(s) => Scalar::Str(s.clone()),
            Value::Array(_) | Value::Object(_) => Scalar::Compound,
        }
    }
}

impl From<Option<&Value>> for Scalar {
    fn from(value: Option<&Value>) -> Self {
        value.map(Scalar::from).unwrap_or(Scalar::Undefined)
    }
}

/// Reference to a field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldRef {
    /// Resolved accessor path
    Path(FieldPath),
    /// Identifier the rewrite could not map; fails when evaluated
    Unresolved(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
}

/// Short-circuiting operators; chains of one operator share a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// Built-in functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    /// `exists(field)`: the field resolves to something other than undefined
    Exists,
    Abs,
    Min,
    Max,
    Round,
}

impl Function {
    pub fn lookup(name: &str) -> Option<Self> {
        match name {
            "exists" => Some(Function::Exists),
            "abs" => Some(Function::Abs),
            "min" => Some(Function::Min),
            "max" => Some(Function::Max),
            "round" => Some(Function::Round),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Function::Exists => "exists",
            Function::Abs => "abs",
            Function::Min => "min",
            Function::Max => "max",
            Function::Round => "round",
        }
    }

    /// Accepted argument counts (min, max)
    pub fn arity(&self) -> (usize, usize) {
        match self {
            Function::Exists | Function::Abs | Function::Round => (1, 1),
            Function::Min | Function::Max => (1, usize::MAX),
        }
    }
}

/// Expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Scalar),
    Field(FieldRef),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `a && b && c` as one node, evaluated left to right
    Logical {
        op: LogicalOp,
        operands: Vec<Expr>,
    },
    Call {
        func: Function,
        args: Vec<Expr>,
    },
}

impl Expr {
    /// Visits every field reference in the tree
    pub fn for_each_field<F: FnMut(&FieldRef)>(&self, f: &mut F) {
        match self {
            Expr::Literal(_) => {}
            Expr::Field(field) => f(field),
            Expr::Unary { operand, .. } => operand.for_each_field(f),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.for_each_field(f);
                rhs.for_each_field(f);
            }
            Expr::Logical { operands, .. } | Expr::Call { args: operands, .. } => {
                operands.iter().for_each(|operand| operand.for_each_field(f))
            }
        }
    }
}

/// Sort direction of one `SORT_BY` clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    /// `SORT_BY` without a keyword sorts descending
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}
