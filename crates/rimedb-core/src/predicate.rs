use crate::model::ColumnPath;
use serde::Serialize;
use std::fmt;

///
/// Predicate tree
///
/// Parsed query condition consumed by index compilation. The textual
/// query parser (an external collaborator) produces these; this crate
/// folds the supported subset and rejects everything else with a
/// diagnostic naming the offending token.
///

///
/// Predicate
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub enum Predicate {
    And(Vec<Self>),
    Or(Vec<Self>),
    Not(Box<Self>),
    Compare(Compare),
    IsNull { field: ColumnPath },
    /// Scan-order pseudo-node; consumed by query planning, not here.
    Order,
    /// Row-limit pseudo-node; consumed by query planning, not here.
    Limit(u32),
}

impl Predicate {
    #[must_use]
    pub fn and(children: Vec<Self>) -> Self {
        Self::And(children)
    }

    #[must_use]
    pub fn compare(lhs: Operand, op: CompareOp, rhs: Operand) -> Self {
        Self::Compare(Compare { lhs, op, rhs })
    }

    /// Token label used in compile diagnostics.
    #[must_use]
    pub(crate) const fn token(&self) -> &'static str {
        match self {
            Self::And(_) => "AND",
            Self::Or(_) => "OR",
            Self::Not(_) => "NOT",
            Self::Compare(_) => "comparison",
            Self::IsNull { .. } => "IS NULL",
            Self::Order => "ORDER",
            Self::Limit(_) => "LIMIT",
        }
    }
}

///
/// Compare
///
/// One comparison node. The left side must be a direct field reference;
/// compilation rejects any other operand there.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Compare {
    pub lhs: Operand,
    pub op: CompareOp,
    pub rhs: Operand,
}

///
/// CompareOp
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl CompareOp {
    /// Ordered comparisons drive range scans; they are never folded
    /// against a literal.
    #[must_use]
    pub const fn is_ordered(self) -> bool {
        matches!(self, Self::Lt | Self::Le | Self::Gt | Self::Ge)
    }

    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "=",
            Self::Ne => "!=",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

///
/// Operand
///
/// Comparison operand. `Text` carries the raw token text, quote
/// characters included, exactly as the parser captured it.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub enum Operand {
    Field(ColumnPath),
    /// Bound by the caller at scan time; never compiled into a check.
    Placeholder,
    Bool(bool),
    Int(i64),
    Text(String),
}

impl Operand {
    /// Token text used in compile diagnostics.
    #[must_use]
    pub(crate) fn token(&self) -> String {
        match self {
            Self::Field(path) => path.to_string(),
            Self::Placeholder => "?".to_string(),
            Self::Bool(true) => "TRUE".to_string(),
            Self::Bool(false) => "FALSE".to_string(),
            Self::Int(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}
