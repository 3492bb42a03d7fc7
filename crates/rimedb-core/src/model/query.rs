use crate::{model::column::ColumnModel, predicate::Predicate};
use std::sync::Arc;

///
/// QueryModel
///
/// Compiled definition of one named query: ordered parameter columns,
/// ordered order-by columns, an optional row limit, and the parsed
/// predicate tree. Parameter and order-by lists may contain nested
/// columns; field selection expands them to leaves.
///

#[derive(Clone)]
pub struct QueryModel {
    name: String,
    parameters: Vec<Arc<ColumnModel>>,
    order_by: Vec<Arc<ColumnModel>>,
    limit: Option<u32>,
    predicate: Option<Predicate>,
}

impl QueryModel {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            predicate: None,
        }
    }

    #[must_use]
    pub fn with_parameters(mut self, parameters: Vec<Arc<ColumnModel>>) -> Self {
        self.parameters = parameters;
        self
    }

    #[must_use]
    pub fn with_order_by(mut self, order_by: Vec<Arc<ColumnModel>>) -> Self {
        self.order_by = order_by;
        self
    }

    #[must_use]
    pub const fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn parameters(&self) -> &[Arc<ColumnModel>] {
        &self.parameters
    }

    #[must_use]
    pub fn order_by(&self) -> &[Arc<ColumnModel>] {
        &self.order_by
    }

    #[must_use]
    pub const fn limit(&self) -> Option<u32> {
        self.limit
    }

    #[must_use]
    pub const fn predicate(&self) -> Option<&Predicate> {
        self.predicate.as_ref()
    }
}
