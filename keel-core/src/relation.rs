/// How two entity types are related.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// This table stores the key of the single related entity.
    HasOne,
    /// This table stores the key of the owning entity.
    BelongsTo,
    /// The related table stores the key of this entity.
    HasMany,
    /// A junction table stores pairs of keys.
    ManyToMany,
}

impl RelationKind {
    /// Whether the relation resolves to at most one entity.
    pub fn is_singular(&self) -> bool {
        matches!(self, RelationKind::HasOne | RelationKind::BelongsTo)
    }
}

/// The junction table of a many-to-many relation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JunctionDef {
    pub table: String,
    /// Column holding the key of the declaring entity.
    pub this_column: String,
    /// Column holding the key of the target entity.
    pub that_column: String,
}

/// Relation declared on an entity type.
///
/// `link` and `junction` are filled by the schema builder unless set explicitly with
/// [`RelationDef::on`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDef {
    pub name: String,
    pub kind: RelationKind,
    /// Target entity type name.
    pub target: String,
    /// Foreign key column. For many-to-many relations, the junction table name.
    pub link: String,
    /// Only for many-to-many relations.
    pub junction: Option<JunctionDef>,
}

impl RelationDef {
    pub fn new(name: impl Into<String>, kind: RelationKind, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            target: target.into(),
            link: String::new(),
            junction: None,
        }
    }
    pub fn has_one(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, RelationKind::HasOne, target)
    }
    pub fn belongs_to(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, RelationKind::BelongsTo, target)
    }
    pub fn has_many(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, RelationKind::HasMany, target)
    }
    pub fn many_to_many(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, RelationKind::ManyToMany, target)
    }
    /// Override the derived foreign key column (or junction table, for many-to-many).
    pub fn on(mut self, link: impl Into<String>) -> Self {
        self.link = link.into();
        self
    }
    pub fn is_singular(&self) -> bool {
        self.kind.is_singular()
    }
}
