use derive_more::Display;
use serde::Serialize;
use std::{
    fmt,
    sync::{Arc, Weak},
};

///
/// ColumnPath
///
/// Dotted field path from the entity root. Two columns are equal iff their
/// paths are equal; paths are the deduplication key throughout compilation.
///

#[derive(Clone, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct ColumnPath(String);

impl ColumnPath {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path of a field declared inside this sub-record.
    #[must_use]
    pub(crate) fn child(&self, name: &str) -> Self {
        Self(format!("{}.{name}", self.0))
    }
}

impl From<&str> for ColumnPath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

///
/// ColumnType
///
/// Scalar type of a leaf column. `Unsupported` marks fields the entity
/// declares but the index layer cannot encode; selecting one fails
/// compilation instead of silently misencoding.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum ColumnType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Char,
    Text,
    Blob,
    Timestamp,
    Unsupported,
}

impl ColumnType {
    /// Types whose storage is optional and therefore null-checked.
    /// Fixed-width numeric, boolean, and char fields are never absent.
    #[must_use]
    pub const fn is_nullable(self) -> bool {
        matches!(self, Self::Text | Self::Blob | Self::Timestamp)
    }

    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Char => "char",
            Self::Text => "text",
            Self::Blob => "blob",
            Self::Timestamp => "timestamp",
            Self::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

///
/// ColumnKind
///

#[derive(Debug)]
pub enum ColumnKind {
    Leaf(ColumnType),
    /// A sub-record field. `nullable` records whether the container itself
    /// may be absent on the entity; only nullable containers participate
    /// in null-chain checks.
    Nested {
        nullable: bool,
        children: Vec<Arc<ColumnModel>>,
    },
}

///
/// ColumnModel
///
/// One field of an entity, possibly nested. Columns form a tree owned by
/// the entity model; `parent` is a non-owning back-reference used only for
/// null-chain walks.
///

#[derive(Debug)]
pub struct ColumnModel {
    path: ColumnPath,
    kind: ColumnKind,
    parent: Weak<Self>,
}

impl ColumnModel {
    pub(crate) fn leaf(path: ColumnPath, ty: ColumnType, parent: Weak<Self>) -> Arc<Self> {
        Arc::new(Self {
            path,
            kind: ColumnKind::Leaf(ty),
            parent,
        })
    }

    pub(crate) fn nested(
        path: ColumnPath,
        nullable: bool,
        parent: Weak<Self>,
        children: impl FnOnce(Weak<Self>) -> Vec<Arc<Self>>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            path,
            kind: ColumnKind::Nested {
                nullable,
                children: children(me.clone()),
            },
            parent,
        })
    }

    #[must_use]
    pub fn path(&self) -> &ColumnPath {
        &self.path
    }

    #[must_use]
    pub const fn kind(&self) -> &ColumnKind {
        &self.kind
    }

    /// Scalar type for leaf columns, `None` for nested columns.
    #[must_use]
    pub const fn scalar_type(&self) -> Option<ColumnType> {
        match self.kind {
            ColumnKind::Leaf(ty) => Some(ty),
            ColumnKind::Nested { .. } => None,
        }
    }

    #[must_use]
    pub const fn is_nested(&self) -> bool {
        matches!(self.kind, ColumnKind::Nested { .. })
    }

    /// Whether this column is a container that may be absent.
    #[must_use]
    pub const fn is_nullable_container(&self) -> bool {
        matches!(self.kind, ColumnKind::Nested { nullable: true, .. })
    }

    /// Enclosing nested column, or `None` at the entity root.
    #[must_use]
    pub fn parent(&self) -> Option<Arc<Self>> {
        self.parent.upgrade()
    }

    /// All leaf descendants, depth-first in declaration order.
    #[must_use]
    pub fn leaf_columns(self: &Arc<Self>) -> Vec<Arc<Self>> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves(self: &Arc<Self>, out: &mut Vec<Arc<Self>>) {
        match &self.kind {
            ColumnKind::Leaf(_) => out.push(Arc::clone(self)),
            ColumnKind::Nested { children, .. } => {
                for child in children {
                    child.collect_leaves(out);
                }
            }
        }
    }
}

impl PartialEq for ColumnModel {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for ColumnModel {}

/// Expand nested columns in-place into their ordered leaf descendants;
/// leaf columns pass through unchanged. Applied identically to parameter
/// and order-by column lists before field selection.
#[must_use]
pub fn leaves(columns: &[Arc<ColumnModel>]) -> Vec<Arc<ColumnModel>> {
    let mut out = Vec::with_capacity(columns.len());
    for column in columns {
        match column.kind() {
            ColumnKind::Nested { .. } => out.extend(column.leaf_columns()),
            ColumnKind::Leaf(_) => out.push(Arc::clone(column)),
        }
    }
    out
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> Vec<Arc<ColumnModel>> {
        let id = ColumnModel::leaf(ColumnPath::from("id"), ColumnType::Int64, Weak::new());
        let address = ColumnModel::nested(
            ColumnPath::from("address"),
            true,
            Weak::new(),
            |me| {
                vec![
                    ColumnModel::leaf(ColumnPath::from("address.city"), ColumnType::Text, me.clone()),
                    ColumnModel::leaf(ColumnPath::from("address.zip"), ColumnType::Int32, me),
                ]
            },
        );
        vec![id, address]
    }

    #[test]
    fn leaves_expands_nested_columns_in_declaration_order() {
        let columns = sample_tree();
        let flat = leaves(&columns);

        let paths: Vec<&str> = flat.iter().map(|c| c.path().as_str()).collect();
        assert_eq!(paths, vec!["id", "address.city", "address.zip"]);
    }

    #[test]
    fn equality_is_path_equality() {
        let a = ColumnModel::leaf(ColumnPath::from("age"), ColumnType::Int32, Weak::new());
        let b = ColumnModel::leaf(ColumnPath::from("age"), ColumnType::Int64, Weak::new());
        let c = ColumnModel::leaf(ColumnPath::from("name"), ColumnType::Text, Weak::new());

        assert_eq!(*a, *b, "columns with the same path compare equal");
        assert_ne!(*a, *c);
    }

    #[test]
    fn parent_chain_reaches_the_enclosing_container() {
        let columns = sample_tree();
        let flat = leaves(&columns);

        let city = &flat[1];
        let parent = city.parent().expect("nested leaf has a parent");
        assert_eq!(parent.path().as_str(), "address");
        assert!(parent.is_nullable_container());
        assert!(parent.parent().is_none(), "address sits at the entity root");
    }
}
