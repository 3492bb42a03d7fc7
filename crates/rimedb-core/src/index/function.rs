use crate::{
    index::key::IndexKeyBuilder,
    model::{ColumnModel, ColumnPath, ColumnType, FieldReader},
    value::Value,
};
use serde::Serialize;
use std::{fmt, sync::Arc};
use thiserror::Error as ThisError;

///
/// IndexFunction
///
/// Immutable artifact compiled from one (entity, query) pair. Decides
/// index membership and encodes the indexed fields into an
/// order-preserving binary key. Safe for unbounded concurrent readers;
/// the only mutable state is the caller-supplied key builder.
///

pub struct IndexFunction<E> {
    name: String,
    fields: Vec<IndexField<E>>,
    null_checks: Vec<NullCheck<E>>,
    constant_checks: Vec<ConstantCheck<E>>,
}

impl<E> IndexFunction<E> {
    pub(crate) fn new(
        name: String,
        fields: Vec<IndexField<E>>,
        null_checks: Vec<NullCheck<E>>,
        constant_checks: Vec<ConstantCheck<E>>,
    ) -> Self {
        Self {
            name,
            fields,
            null_checks,
            constant_checks,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ordered leaf columns stored in the index key.
    #[must_use]
    pub fn fields(&self) -> &[IndexField<E>] {
        &self.fields
    }

    #[must_use]
    pub fn null_checks(&self) -> &[NullCheck<E>] {
        &self.null_checks
    }

    #[must_use]
    pub fn constant_checks(&self) -> &[ConstantCheck<E>] {
        &self.constant_checks
    }

    /// Whether `entity` belongs in this index: every null-check column
    /// reads non-null and every constant check holds. Short-circuits on
    /// the first failing check.
    #[must_use]
    pub fn includes(&self, entity: &E) -> bool {
        for check in &self.null_checks {
            if (check.read)(entity).is_null() {
                return false;
            }
        }
        for check in &self.constant_checks {
            if !check.holds(entity) {
                return false;
            }
        }
        true
    }

    /// Encode the indexed fields of `entity` into `key`, in field order,
    /// with a delimiter between successive fields.
    ///
    /// # Panics
    ///
    /// Panics if a reader returns null or a value contradicting the
    /// declared column type. `includes` rules such entities out; encoding
    /// one anyway is a broken caller contract.
    pub fn encode(&self, entity: &E, key: &mut IndexKeyBuilder) {
        for (position, field) in self.fields.iter().enumerate() {
            if position > 0 {
                key.delimiter();
            }
            let value = (field.read)(entity);
            if let Err(got) = encode_value(field.ty, &value, key) {
                panic!(
                    "field '{}' read '{got}' where '{}' was declared; \
                     encode requires an entity accepted by includes()",
                    field.column.path(),
                    field.ty,
                );
            }
        }
    }

    /// Inclusive key bounds covering exactly the entities whose leading
    /// fields equal `bound`. With every field bound this is a point
    /// lookup; with a strict prefix the end bound extends the prefix with
    /// delimiter + infinity so longer keys sharing it stay in range while
    /// keys merely extending the last bound value fall out.
    pub fn scan_range(&self, bound: &[Value]) -> Result<ScanRange, ScanRangeError> {
        if bound.len() > self.fields.len() {
            return Err(ScanRangeError::TooManyValues {
                given: bound.len(),
                fields: self.fields.len(),
            });
        }

        let mut key = IndexKeyBuilder::new();
        for (position, (field, value)) in self.fields.iter().zip(bound).enumerate() {
            if position > 0 {
                key.delimiter();
            }
            if value.is_null() {
                return Err(ScanRangeError::NullBound {
                    path: field.column.path().clone(),
                });
            }
            encode_value(field.ty, value, &mut key).map_err(|got| {
                ScanRangeError::TypeMismatch {
                    path: field.column.path().clone(),
                    ty: field.ty,
                    value: got,
                }
            })?;
        }

        let start = key.as_bytes().to_vec();
        let end = if bound.len() < self.fields.len() {
            if !bound.is_empty() {
                key.delimiter();
            }
            key.infinity();
            key.into_bytes()
        } else {
            start.clone()
        };

        Ok(ScanRange { start, end })
    }
}

impl<E> fmt::Display for IndexFunction<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self
            .fields
            .iter()
            .map(|field| field.column.path().as_str())
            .collect();

        write!(f, "{}({})", self.name, fields.join(", "))
    }
}

impl<E> fmt::Debug for IndexFunction<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexFunction")
            .field("name", &self.name)
            .field("fields", &paths(self.fields.iter().map(|c| &c.column)))
            .field(
                "null_checks",
                &paths(self.null_checks.iter().map(|c| &c.column)),
            )
            .field("constant_checks", &self.constant_checks)
            .finish()
    }
}

fn paths<'a>(columns: impl Iterator<Item = &'a Arc<ColumnModel>>) -> Vec<String> {
    columns.map(|column| column.path().to_string()).collect()
}

///
/// IndexField
///
/// One encoded key component: the selected leaf column with its scalar
/// type and the reader bound at compile time.
///

pub struct IndexField<E> {
    column: Arc<ColumnModel>,
    ty: ColumnType,
    read: FieldReader<E>,
}

impl<E> IndexField<E> {
    pub(crate) fn new(column: Arc<ColumnModel>, ty: ColumnType, read: FieldReader<E>) -> Self {
        Self { column, ty, read }
    }

    #[must_use]
    pub fn column(&self) -> &Arc<ColumnModel> {
        &self.column
    }

    #[must_use]
    pub fn path(&self) -> &ColumnPath {
        self.column.path()
    }

    #[must_use]
    pub const fn ty(&self) -> ColumnType {
        self.ty
    }
}

///
/// NullCheck
///
/// One column (nullable leaf or nullable nested ancestor) that must read
/// non-null for an entity to be includable.
///

pub struct NullCheck<E> {
    column: Arc<ColumnModel>,
    read: FieldReader<E>,
}

impl<E> NullCheck<E> {
    pub(crate) fn new(column: Arc<ColumnModel>, read: FieldReader<E>) -> Self {
        Self { column, read }
    }

    #[must_use]
    pub fn column(&self) -> &Arc<ColumnModel> {
        &self.column
    }

    #[must_use]
    pub fn path(&self) -> &ColumnPath {
        self.column.path()
    }
}

///
/// ConstantCheck
///
/// Equality check folded out of the predicate tree at compile time.
///

pub struct ConstantCheck<E> {
    column: Arc<ColumnModel>,
    read: FieldReader<E>,
    expect: Literal,
}

impl<E> ConstantCheck<E> {
    pub(crate) fn new(column: Arc<ColumnModel>, read: FieldReader<E>, expect: Literal) -> Self {
        Self {
            column,
            read,
            expect,
        }
    }

    #[must_use]
    pub fn column(&self) -> &Arc<ColumnModel> {
        &self.column
    }

    #[must_use]
    pub fn path(&self) -> &ColumnPath {
        self.column.path()
    }

    #[must_use]
    pub const fn literal(&self) -> &Literal {
        &self.expect
    }

    /// A null field value fails every literal comparison, matching the
    /// null-safe equality the membership test needs.
    fn holds(&self, entity: &E) -> bool {
        match (&self.expect, (self.read)(entity)) {
            (Literal::Bool(expect), Value::Bool(v)) => v == *expect,
            (Literal::Int(expect), value) => value.as_i64() == Some(*expect),
            (Literal::Char(expect), Value::Char(v)) => v == *expect,
            (Literal::Text(expect), Value::Text(v)) => v == *expect,
            _ => false,
        }
    }
}

impl<E> fmt::Debug for ConstantCheck<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstantCheck")
            .field("column", self.column.path())
            .field("expect", &self.expect)
            .finish()
    }
}

///
/// Literal
///
/// Constant-folded right-hand side of an equality check.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Char(char),
    Text(String),
}

///
/// ScanRange
///
/// Inclusive `[start, end]` byte-key bounds produced from leading bound
/// values.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ScanRange {
    start: Vec<u8>,
    end: Vec<u8>,
}

impl ScanRange {
    #[must_use]
    pub fn start(&self) -> &[u8] {
        &self.start
    }

    #[must_use]
    pub fn end(&self) -> &[u8] {
        &self.end
    }

    /// Whether an encoded key falls inside these bounds.
    #[must_use]
    pub fn contains(&self, key: &[u8]) -> bool {
        self.start.as_slice() <= key && key <= self.end.as_slice()
    }
}

///
/// ScanRangeError
///
/// Scan-time bound-building failures; never produced by `includes` or
/// `encode`.
///

#[derive(Debug, ThisError)]
pub enum ScanRangeError {
    #[error("{given} bound values exceed the {fields} indexed fields")]
    TooManyValues { given: usize, fields: usize },

    #[error("bound value '{value}' does not match type '{ty}' of field '{path}'")]
    TypeMismatch {
        path: ColumnPath,
        ty: ColumnType,
        value: &'static str,
    },

    #[error("field '{path}' cannot be bound to null")]
    NullBound { path: ColumnPath },
}

/// Encode one typed scalar into the key builder; `Err` carries the label
/// of the value actually read when it contradicts the declared type.
fn encode_value(
    ty: ColumnType,
    value: &Value,
    key: &mut IndexKeyBuilder,
) -> Result<(), &'static str> {
    match (ty, value) {
        (ColumnType::Bool, Value::Bool(v)) => key.add_i64(i64::from(*v)),
        (ColumnType::Int8, Value::Int8(v)) => key.add_i64(i64::from(*v)),
        (ColumnType::Int16, Value::Int16(v)) => key.add_i64(i64::from(*v)),
        (ColumnType::Int32, Value::Int32(v)) => key.add_i64(i64::from(*v)),
        (ColumnType::Int64, Value::Int64(v)) => key.add_i64(*v),
        (ColumnType::Char, Value::Char(v)) => key.add_i64(i64::from(u32::from(*v))),
        (ColumnType::Text, Value::Text(v)) => key.add_text(v),
        (ColumnType::Blob, Value::Blob(v)) => key.add(v),
        (ColumnType::Timestamp, Value::Timestamp(v)) => key.add_i64(v.timestamp_millis()),
        (_, value) => return Err(value.label()),
    }
    Ok(())
}
