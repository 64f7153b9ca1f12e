use crate::{expr::function::Function, value::Value};

///
/// Expr
///
/// Parsed expression tree. Column slots are resolved during `prepare`.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Literal(Value),
    Column { name: String, index: Option<usize> },
    Variable(String),
    Special(Special),
    Unary { op: UnaryOp, operand: Box<Self> },
    Binary { op: BinaryOp, left: Box<Self>, right: Box<Self> },
    Call { function: Function, args: Vec<Self> },
}

impl Expr {
    /// True for the bare `NULL` literal.
    #[must_use]
    pub const fn is_null_literal(&self) -> bool {
        matches!(self, Self::Literal(Value::Null))
    }

    /// Visit every node, parents before children.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Self)) {
        visit(self);
        match self {
            Self::Unary { operand, .. } => operand.walk(visit),
            Self::Binary { left, right, .. } => {
                left.walk(visit);
                right.walk(visit);
            }
            Self::Call { args, .. } => {
                for arg in args {
                    arg.walk(visit);
                }
            }
            Self::Literal(_) | Self::Column { .. } | Self::Variable(_) | Self::Special(_) => {}
        }
    }

    /// Mutable pre-order traversal.
    pub fn walk_mut(&mut self, visit: &mut impl FnMut(&mut Self) -> Result<(), String>) -> Result<(), String> {
        visit(self)?;
        match self {
            Self::Unary { operand, .. } => operand.walk_mut(visit),
            Self::Binary { left, right, .. } => {
                left.walk_mut(visit)?;
                right.walk_mut(visit)
            }
            Self::Call { args, .. } => {
                for arg in args {
                    arg.walk_mut(visit)?;
                }
                Ok(())
            }
            Self::Literal(_) | Self::Column { .. } | Self::Variable(_) | Self::Special(_) => Ok(()),
        }
    }
}

///
/// Special
///
/// `$name` feature/geometry accessors.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Special {
    Geometry,
    Area,
    Length,
    Perimeter,
    Id,
    X,
    Y,
}

impl Special {
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let special = match name.to_ascii_lowercase().as_str() {
            "geometry" => Self::Geometry,
            "area" => Self::Area,
            "length" => Self::Length,
            "perimeter" => Self::Perimeter,
            "id" => Self::Id,
            "x" => Self::X,
            "y" => Self::Y,
            _ => return None,
        };

        Some(special)
    }
}

///
/// UnaryOp
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UnaryOp {
    Neg,
    Not,
}

///
/// BinaryOp
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Is,
    IsNot,
    Concat,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Or => "OR",
            Self::And => "AND",
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Is => "IS",
            Self::IsNot => "IS NOT",
            Self::Concat => "||",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
        }
    }
}
