pub mod column;
pub mod entity;
pub mod query;

pub use column::{ColumnKind, ColumnModel, ColumnPath, ColumnType, leaves};
pub use entity::{EntityModel, EntityModelBuilder, FieldReader, NestedBuilder};
pub use query::QueryModel;
