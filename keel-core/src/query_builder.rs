use crate::{Params, Query, Value};
use std::fmt::Write;

/// Composes a SELECT statement out of optional fragments.
///
/// Empty fragments are left out, the projection defaults to `*`.
///
/// ```rust
/// use keel_core::QueryBuilder;
/// let query = QueryBuilder::new()
///     .from("\"posts\"")
///     .filter("\"views\" > :min")
///     .param("min", 10)
///     .order("\"title\"")
///     .limit(5);
/// assert_eq!(
///     query.query(),
///     "SELECT *\nFROM \"posts\"\nWHERE \"views\" > :min\nORDER BY \"title\"\nLIMIT 5"
/// );
/// ```
#[derive(Default, Debug, Clone, PartialEq)]
pub struct QueryBuilder {
    select: String,
    from: String,
    filter: String,
    order: String,
    limit: Option<u64>,
    offset: Option<u64>,
    params: Params,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn select(mut self, select: impl Into<String>) -> Self {
        self.select = select.into();
        self
    }
    pub fn from(mut self, from: impl Into<String>) -> Self {
        self.from = from.into();
        self
    }
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }
    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.order = order.into();
        self
    }
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
    pub fn param(mut self, name: impl AsRef<str>, value: impl Into<Value>) -> Self {
        self.params.insert(name, value);
        self
    }
    /// Add all the bindings, replacing the ones with the same name.
    pub fn params(mut self, params: Params) -> Self {
        self.params.extend(params);
        self
    }

    /// Apply the finder options. Fragments missing from `options` are left as they are.
    pub fn options(mut self, options: FindOptions) -> Self {
        if let Some(filter) = options.filter {
            self.filter = filter;
        }
        if let Some(order) = options.order {
            self.order = order;
        }
        self.limit = options.limit.or(self.limit);
        self.offset = options.offset.or(self.offset);
        self.params(options.params)
    }

    pub fn get_filter(&self) -> &str {
        &self.filter
    }
    pub fn get_params(&self) -> &Params {
        &self.params
    }

    /// The statement text.
    pub fn query(&self) -> String {
        let mut out = String::with_capacity(
            32 + self.select.len() + self.from.len() + self.filter.len() + self.order.len(),
        );
        out.push_str("SELECT ");
        out.push_str(if self.select.is_empty() {
            "*"
        } else {
            &self.select
        });
        if !self.from.is_empty() {
            out.push_str("\nFROM ");
            out.push_str(&self.from);
        }
        if !self.filter.is_empty() {
            out.push_str("\nWHERE ");
            out.push_str(&self.filter);
        }
        if !self.order.is_empty() {
            out.push_str("\nORDER BY ");
            out.push_str(&self.order);
        }
        if let Some(limit) = self.limit {
            let _ = write!(out, "\nLIMIT {}", limit);
        }
        if let Some(offset) = self.offset {
            let _ = write!(out, "\nOFFSET {}", offset);
        }
        out
    }

    pub fn build(self) -> Query {
        Query::new(self.query(), self.params)
    }
}

/// Options accepted by the finders of a [`Driver`](crate::Driver).
#[derive(Default, Debug, Clone, PartialEq)]
pub struct FindOptions {
    /// Extra predicate, combined with `AND` by the `*_by_column` finders.
    pub filter: Option<String>,
    pub order: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub params: Params,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }
    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
    pub fn param(mut self, name: impl AsRef<str>, value: impl Into<Value>) -> Self {
        self.params.insert(name, value);
        self
    }
}
