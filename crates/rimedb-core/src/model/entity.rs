use crate::{
    model::column::{ColumnKind, ColumnModel, ColumnPath, ColumnType},
    value::Value,
};
use std::{
    collections::HashMap,
    sync::{Arc, Weak},
};

/// Bound accessor for one column. Readers return `Value::Null` when the
/// field or any enclosing optional sub-record is absent; nested-container
/// readers return `Value::Unit` to signal presence.
pub type FieldReader<E> = Arc<dyn Fn(&E) -> Value + Send + Sync>;

///
/// EntityModel
///
/// Resolved runtime metadata for one entity type: the column tree plus a
/// reader bound to every column path. The annotation/derive layer that
/// produces these lives upstream; compilation resolves readers once and
/// never looks a field up by name on the includes/encode path.
///

pub struct EntityModel<E> {
    entity_name: &'static str,
    columns: Vec<Arc<ColumnModel>>,
    readers: HashMap<ColumnPath, FieldReader<E>>,
}

impl<E> EntityModel<E> {
    #[must_use]
    pub fn builder(entity_name: &'static str) -> EntityModelBuilder<E> {
        EntityModelBuilder {
            entity_name,
            columns: Vec::new(),
            readers: HashMap::new(),
        }
    }

    #[must_use]
    pub const fn entity_name(&self) -> &'static str {
        self.entity_name
    }

    #[must_use]
    pub fn columns(&self) -> &[Arc<ColumnModel>] {
        &self.columns
    }

    /// Find a column anywhere in the tree by path.
    #[must_use]
    pub fn column(&self, path: &ColumnPath) -> Option<Arc<ColumnModel>> {
        find_column(&self.columns, path)
    }

    pub(crate) fn reader(&self, path: &ColumnPath) -> Option<FieldReader<E>> {
        self.readers.get(path).map(Arc::clone)
    }
}

fn find_column(columns: &[Arc<ColumnModel>], path: &ColumnPath) -> Option<Arc<ColumnModel>> {
    for column in columns {
        if column.path() == path {
            return Some(Arc::clone(column));
        }
        if let ColumnKind::Nested { children, .. } = column.kind() {
            if let Some(hit) = find_column(children, path) {
                return Some(hit);
            }
        }
    }
    None
}

///
/// EntityModelBuilder
///
/// Declaration-order registration of columns and their readers.
///

pub struct EntityModelBuilder<E> {
    entity_name: &'static str,
    columns: Vec<Arc<ColumnModel>>,
    readers: HashMap<ColumnPath, FieldReader<E>>,
}

impl<E> EntityModelBuilder<E> {
    /// Register a scalar field at the entity root.
    #[must_use]
    pub fn leaf(
        mut self,
        name: &str,
        ty: ColumnType,
        read: impl Fn(&E) -> Value + Send + Sync + 'static,
    ) -> Self {
        let path = ColumnPath::from(name);
        self.columns
            .push(ColumnModel::leaf(path.clone(), ty, Weak::new()));
        self.readers.insert(path, Arc::new(read));
        self
    }

    /// Register a sub-record field at the entity root. `present` reads the
    /// container itself (`Value::Unit` when present, `Value::Null` when an
    /// optional container is absent); `columns` declares its fields.
    #[must_use]
    pub fn nested(
        mut self,
        name: &str,
        nullable: bool,
        present: impl Fn(&E) -> Value + Send + Sync + 'static,
        columns: impl FnOnce(NestedBuilder<E>) -> NestedBuilder<E>,
    ) -> Self {
        let path = ColumnPath::from(name);
        let mut readers = Vec::new();
        let column = ColumnModel::nested(path.clone(), nullable, Weak::new(), |me| {
            let nested = columns(NestedBuilder::new(path.clone(), me));
            readers = nested.readers;
            nested.columns
        });
        self.columns.push(column);
        self.readers.insert(path, Arc::new(present));
        self.readers.extend(readers);
        self
    }

    #[must_use]
    pub fn build(self) -> EntityModel<E> {
        EntityModel {
            entity_name: self.entity_name,
            columns: self.columns,
            readers: self.readers,
        }
    }
}

///
/// NestedBuilder
///
/// Registration scope for the fields of one sub-record.
///

pub struct NestedBuilder<E> {
    prefix: ColumnPath,
    parent: Weak<ColumnModel>,
    columns: Vec<Arc<ColumnModel>>,
    readers: Vec<(ColumnPath, FieldReader<E>)>,
}

impl<E> NestedBuilder<E> {
    fn new(prefix: ColumnPath, parent: Weak<ColumnModel>) -> Self {
        Self {
            prefix,
            parent,
            columns: Vec::new(),
            readers: Vec::new(),
        }
    }

    /// Register a scalar field of this sub-record. The reader still takes
    /// the entity root; callers compose the option chain themselves.
    #[must_use]
    pub fn leaf(
        mut self,
        name: &str,
        ty: ColumnType,
        read: impl Fn(&E) -> Value + Send + Sync + 'static,
    ) -> Self {
        let path = self.prefix.child(name);
        self.columns
            .push(ColumnModel::leaf(path.clone(), ty, self.parent.clone()));
        self.readers.push((path, Arc::new(read)));
        self
    }

    /// Register a sub-record nested one level deeper.
    #[must_use]
    pub fn nested(
        mut self,
        name: &str,
        nullable: bool,
        present: impl Fn(&E) -> Value + Send + Sync + 'static,
        columns: impl FnOnce(Self) -> Self,
    ) -> Self {
        let path = self.prefix.child(name);
        let mut readers = Vec::new();
        let column = ColumnModel::nested(path.clone(), nullable, self.parent.clone(), |me| {
            let nested = columns(Self::new(path.clone(), me));
            readers = nested.readers;
            nested.columns
        });
        self.columns.push(column);
        self.readers.push((path, Arc::new(present)));
        self.readers.extend(readers);
        self
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    struct Probe {
        id: i64,
    }

    fn probe_model() -> EntityModel<Probe> {
        EntityModel::builder("probe")
            .leaf("id", ColumnType::Int64, |p: &Probe| Value::from(p.id))
            .nested(
                "meta",
                false,
                |_| Value::Unit,
                |meta| {
                    meta.leaf("tag", ColumnType::Text, |_| Value::Null).nested(
                        "origin",
                        true,
                        |_| Value::Null,
                        |origin| origin.leaf("host", ColumnType::Text, |_| Value::Null),
                    )
                },
            )
            .build()
    }

    #[test]
    fn builder_assigns_dotted_paths_and_parents() {
        let model = probe_model();

        let host = model
            .column(&ColumnPath::from("meta.origin.host"))
            .expect("deeply nested column resolves");
        let origin = host.parent().expect("host has a parent");
        let meta = origin.parent().expect("origin has a parent");

        assert_eq!(origin.path().as_str(), "meta.origin");
        assert_eq!(meta.path().as_str(), "meta");
        assert!(origin.is_nullable_container());
        assert!(!meta.is_nullable_container());
    }

    #[test]
    fn every_registered_column_has_a_reader() {
        let model = probe_model();

        for path in ["id", "meta", "meta.tag", "meta.origin", "meta.origin.host"] {
            assert!(
                model.reader(&ColumnPath::from(path)).is_some(),
                "missing reader for {path}"
            );
        }
    }

    #[test]
    fn readers_are_invoked_against_the_entity_root() {
        let model = probe_model();
        let read = model.reader(&ColumnPath::from("id")).expect("id reader");

        assert_eq!(read(&Probe { id: 7 }), Value::Int64(7));
    }
}
