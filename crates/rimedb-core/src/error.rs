use crate::{
    model::{ColumnPath, ColumnType},
    predicate::CompareOp,
};
use thiserror::Error as ThisError;

///
/// CompileError
///
/// Terminal failures raised while compiling one (entity, query) pair into
/// an index function. Compilation is all-or-nothing; no partially built
/// artifact escapes. Callers treat any of these as a schema-definition bug
/// rather than something to retry.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum CompileError {
    /// The field's scalar type has no encoding or null-check rule.
    #[error("type '{ty}' not supported for field '{path}'")]
    UnsupportedFieldType { path: ColumnPath, ty: ColumnType },

    /// The predicate tree contains a node shape, operator, or operand
    /// pairing outside the supported set.
    #[error("unsupported query token '{token}'")]
    UnsupportedQueryToken { token: String },

    /// An ordered comparison carries a non-placeholder literal; only
    /// equality is constant-foldable.
    #[error("cannot fold '{op}' against a constant for field '{path}'")]
    UnsupportedPredicate { path: ColumnPath, op: CompareOp },

    /// The artifact could not be materialized, e.g. a selected column has
    /// no bound field reader.
    #[error("cannot create index function: {reason}")]
    Instantiation { reason: String },
}
