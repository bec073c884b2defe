use std::fmt::{self, Display};

/// Kind of a declared index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexKind {
    Primary,
    Unique,
    /// Any other tag. Table creation rejects it.
    Other(String),
}

impl From<&str> for IndexKind {
    fn from(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "primary" => IndexKind::Primary,
            "unique" => IndexKind::Unique,
            _ => IndexKind::Other(value.into()),
        }
    }
}

impl Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKind::Primary => f.write_str("primary"),
            IndexKind::Unique => f.write_str("unique"),
            IndexKind::Other(v) => f.write_str(v),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexDef {
    /// Explicit name, otherwise derived from the table and the columns.
    pub name: Option<String>,
    pub kind: IndexKind,
    pub columns: Vec<String>,
}

impl IndexDef {
    pub fn new<S: Into<String>>(
        kind: impl Into<IndexKind>,
        columns: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            name: None,
            kind: kind.into(),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }
    pub fn primary<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self::new(IndexKind::Primary, columns)
    }
    pub fn unique<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self::new(IndexKind::Unique, columns)
    }
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
    /// The constraint name used in the DDL: `{table}__{col1_col2}_pkey` for primary indexes,
    /// `{table}__{col1_col2}_key` otherwise, unless a name was declared.
    pub fn resolved_name(&self, table: &str) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        let suffix = if self.kind == IndexKind::Primary {
            "pkey"
        } else {
            "key"
        };
        format!("{}__{}_{}", table, self.columns.join("_"), suffix)
    }
}
