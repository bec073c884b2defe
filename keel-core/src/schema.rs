use crate::{
    ColumnDef, ColumnType, Entity, Error, Extension, IndexDef, JunctionDef, RelationDef,
    RelationKind, Result, Value, is_identifier,
};
use convert_case::{Case, Casing};
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fmt::{self, Debug},
    mem,
    ops::Deref,
    sync::Arc,
};

/// Description of an entity type: table, columns, indexes, relations and extensions.
#[derive(Clone)]
pub struct EntityDef {
    name: String,
    table: String,
    primary_key: Option<String>,
    columns: Vec<ColumnDef>,
    indexes: Vec<IndexDef>,
    relations: Vec<RelationDef>,
    extensions: Vec<Arc<dyn Extension>>,
}

impl EntityDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: String::new(),
            primary_key: None,
            columns: Vec::new(),
            indexes: Vec::new(),
            relations: Vec::new(),
            extensions: Vec::new(),
        }
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }
    pub fn primary_key(mut self, name: impl Into<String>) -> Self {
        self.primary_key = Some(name.into());
        self
    }
    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }
    pub fn index(mut self, index: IndexDef) -> Self {
        self.indexes.push(index);
        self
    }
    pub fn relation(mut self, relation: RelationDef) -> Self {
        self.relations.push(relation);
        self
    }
    pub fn extension(mut self, extension: impl Extension + 'static) -> Self {
        self.extensions.push(Arc::new(extension));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn table_name(&self) -> &str {
        &self.table
    }
    pub fn primary_key_name(&self) -> &str {
        self.primary_key.as_deref().unwrap_or(DEFAULT_PRIMARY_KEY)
    }
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }
    pub fn column_def(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }
    pub fn indexes(&self) -> &[IndexDef] {
        &self.indexes
    }
    pub fn relations(&self) -> &[RelationDef] {
        &self.relations
    }
    pub fn relation_def(&self, name: &str) -> Option<&RelationDef> {
        self.relations.iter().find(|r| r.name == name)
    }
    pub fn extensions(&self) -> &[Arc<dyn Extension>] {
        &self.extensions
    }

    /// Dispatch a type-level method to the first extension that handles it.
    ///
    /// `Ok(None)` means no extension handles `method`.
    pub fn call_static(&self, method: &str, args: &[Value]) -> Result<Option<Value>> {
        for extension in &self.extensions {
            if let Some(f) = extension.static_method(method) {
                log::trace!("`{}::{}` handled by `{}`", self.name, method, extension.name());
                return f(self, args).map(Some);
            }
        }
        Ok(None)
    }
}

impl Debug for EntityDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityDef")
            .field("name", &self.name)
            .field("table", &self.table)
            .field("primary_key", &self.primary_key_name())
            .field("columns", &self.columns)
            .field("indexes", &self.indexes)
            .field("relations", &self.relations)
            .field(
                "extensions",
                &self.extensions.iter().map(|e| e.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

pub const DEFAULT_PRIMARY_KEY: &str = "id";

/// The schema registry: every entity type known to the application.
#[derive(Debug)]
pub struct Schema {
    entities: BTreeMap<String, Arc<EntityDef>>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder {
            primary_key: DEFAULT_PRIMARY_KEY.into(),
            entities: Vec::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<EntityDef>> {
        self.entities.get(name)
    }

    /// The definition of a registered type.
    ///
    /// # Panics
    /// When `name` was never registered: the schema is fixed at build time, asking for an
    /// unknown type is a programming error.
    pub fn entity(&self, name: &str) -> &Arc<EntityDef> {
        self.get(name)
            .unwrap_or_else(|| panic!("Entity type `{}` is not registered in the schema", name))
    }

    /// A handle identifying a registered type, used to create entities and in driver calls.
    ///
    /// # Panics
    /// When `name` was never registered.
    pub fn entity_type(self: &Arc<Self>, name: &str) -> EntityType {
        EntityType {
            schema: self.clone(),
            def: self.entity(name).clone(),
        }
    }

    pub fn entities(&self) -> impl Iterator<Item = &Arc<EntityDef>> {
        self.entities.values()
    }

    /// Junction tables of all the many-to-many relations, each listed once.
    pub fn junctions(&self) -> Vec<&JunctionDef> {
        let mut seen = HashSet::new();
        self.entities()
            .flat_map(|e| e.relations())
            .filter_map(|r| r.junction.as_ref())
            .filter(|j| seen.insert(j.table.as_str()))
            .collect()
    }
}

pub struct SchemaBuilder {
    primary_key: String,
    entities: Vec<EntityDef>,
}

impl SchemaBuilder {
    /// Primary key name of entity types that neither declare a `pk` column nor a name of their own.
    pub fn primary_key(mut self, name: impl Into<String>) -> Self {
        self.primary_key = name.into();
        self
    }

    pub fn entity(mut self, entity: EntityDef) -> Self {
        self.entities.push(entity);
        self
    }

    /// Resolve naming conventions and validate the whole schema.
    pub fn build(self) -> Result<Arc<Schema>> {
        let mut entities = self.entities;
        let mut names = HashSet::new();
        for def in &mut entities {
            if !names.insert(def.name.clone()) {
                return Err(Error::msg(format!(
                    "Entity type `{}` is registered twice",
                    def.name
                )));
            }
            for extension in def.extensions.clone() {
                def.columns = extension.prepare_columns(mem::take(&mut def.columns));
                def.indexes = extension.prepare_indexes(mem::take(&mut def.indexes));
            }
            if def.table.is_empty() {
                def.table = format!("{}s", snake(&def.name));
            }
            let mut declared = def.columns.iter().filter(|c| c.is_primary_key());
            match (declared.next(), declared.next()) {
                (Some(..), Some(..)) => {
                    return Err(Error::msg(format!(
                        "Entity type `{}` declares more than one primary key column",
                        def.name
                    )));
                }
                (Some(column), None) => {
                    if let Some(name) = &def.primary_key
                        && *name != column.name
                    {
                        return Err(Error::msg(format!(
                            "Entity type `{}` names its primary key `{}` but declares the column `{}`",
                            def.name, name, column.name
                        )));
                    }
                    def.primary_key = Some(column.name.clone());
                }
                _ => {
                    def.primary_key.get_or_insert_with(|| self.primary_key.clone());
                }
            }
        }

        let tables = entities
            .iter()
            .map(|e| (e.name.clone(), e.table.clone()))
            .collect::<HashMap<_, _>>();
        let mut implied: Vec<(String, String)> = Vec::new();
        for def in &mut entities {
            for relation in &mut def.relations {
                let Some(target_table) = tables.get(&relation.target) else {
                    return Err(Error::msg(format!(
                        "Relation `{}` of `{}` targets the unknown entity type `{}`",
                        relation.name, def.name, relation.target
                    )));
                };
                match relation.kind {
                    RelationKind::HasOne | RelationKind::BelongsTo => {
                        if relation.link.is_empty() {
                            relation.link = format!("{}_id", snake(&relation.name));
                        }
                        implied.push((def.name.clone(), relation.link.clone()));
                    }
                    RelationKind::HasMany => {
                        if relation.link.is_empty() {
                            relation.link = format!("{}_id", snake(&def.name));
                        }
                        implied.push((relation.target.clone(), relation.link.clone()));
                    }
                    RelationKind::ManyToMany => {
                        if relation.link.is_empty() {
                            let mut pair = [def.table.as_str(), target_table.as_str()];
                            pair.sort();
                            relation.link = pair.join("_to_");
                        }
                        let this_column = format!("{}_id", snake(&def.name));
                        let that_column = if relation.target == def.name {
                            format!("{}_id", snake(&relation.name))
                        } else {
                            format!("{}_id", snake(&relation.target))
                        };
                        if this_column == that_column {
                            return Err(Error::msg(format!(
                                "Relation `{}` of `{}` would join `{}` with both junction columns named `{}`",
                                relation.name, def.name, relation.link, this_column
                            )));
                        }
                        relation.junction = Some(JunctionDef {
                            table: relation.link.clone(),
                            this_column,
                            that_column,
                        });
                    }
                }
            }
        }
        for (entity, link) in implied {
            if let Some(def) = entities.iter_mut().find(|e| e.name == entity)
                && def.column_def(&link).is_none()
            {
                def.columns.push(ColumnDef::new(link, ColumnType::Link));
            }
        }

        for def in &entities {
            validate(def)?;
        }
        Ok(Arc::new(Schema {
            entities: entities
                .into_iter()
                .map(|e| (e.name.clone(), Arc::new(e)))
                .collect(),
        }))
    }
}

fn snake(name: &str) -> String {
    name.to_case(Case::Snake)
}

fn validate(def: &EntityDef) -> Result<()> {
    let invalid = |kind: &str, name: &str| {
        Error::msg(format!(
            "Entity type `{}` has the {} `{}`, which is not a valid identifier",
            def.name, kind, name
        ))
    };
    if !is_identifier(&def.table) {
        return Err(invalid("table", &def.table));
    }
    if !is_identifier(def.primary_key_name()) {
        return Err(invalid("primary key", def.primary_key_name()));
    }
    let mut names = HashSet::new();
    for column in &def.columns {
        if !is_identifier(&column.name) {
            return Err(invalid("column", &column.name));
        }
        if !names.insert(column.name.as_str()) {
            return Err(Error::msg(format!(
                "Entity type `{}` declares the column `{}` twice",
                def.name, column.name
            )));
        }
    }
    for relation in &def.relations {
        if !is_identifier(&relation.name) {
            return Err(invalid("relation", &relation.name));
        }
        if !is_identifier(&relation.link) {
            return Err(invalid("relation link", &relation.link));
        }
        if !names.insert(relation.name.as_str()) {
            return Err(Error::msg(format!(
                "Entity type `{}` uses the name `{}` for more than one column or relation",
                def.name, relation.name
            )));
        }
    }
    Ok(())
}

/// Handle to a registered entity type, it keeps the whole schema alive.
#[derive(Clone)]
pub struct EntityType {
    schema: Arc<Schema>,
    def: Arc<EntityDef>,
}

impl EntityType {
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }
    pub fn def(&self) -> &Arc<EntityDef> {
        &self.def
    }
    /// The type on the other side of a relation.
    pub fn related(&self, relation: &RelationDef) -> EntityType {
        self.schema.entity_type(&relation.target)
    }
    /// A new transient entity of this type.
    pub fn create(&self) -> Entity {
        Entity::new(self)
    }
}

impl Deref for EntityType {
    type Target = EntityDef;
    fn deref(&self) -> &Self::Target {
        &self.def
    }
}

impl Debug for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityType({})", self.def.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ColumnDef, IndexDef, RelationDef};

    fn blog() -> Arc<Schema> {
        Schema::builder()
            .entity(
                EntityDef::new("Author")
                    .column(ColumnDef::new("name", "string"))
                    .relation(RelationDef::has_many("posts", "BlogPost")),
            )
            .entity(
                EntityDef::new("BlogPost")
                    .table("posts")
                    .column(ColumnDef::new("title", "string"))
                    .index(IndexDef::unique(["title"]))
                    .relation(RelationDef::belongs_to("author", "Author"))
                    .relation(RelationDef::many_to_many("tags", "Tag")),
            )
            .entity(
                EntityDef::new("Tag")
                    .column(ColumnDef::new("uid", "pk"))
                    .column(ColumnDef::new("label", "string:32")),
            )
            .build()
            .expect("Schema should build")
    }

    #[test]
    fn naming_conventions() {
        let schema = Schema::builder()
            .entity(EntityDef::new("Post").relation(RelationDef::has_many("posts", "Post")))
            .build()
            .unwrap();
        let post = schema.entity("Post");
        assert_eq!(post.table_name(), "posts");
        assert_eq!(post.primary_key_name(), "id");
        assert_eq!(post.relation_def("posts").unwrap().link, "post_id");
    }

    #[test]
    fn resolved_relations() {
        let schema = blog();
        let post = schema.entity("BlogPost");
        assert_eq!(post.table_name(), "posts");
        let author = post.relation_def("author").unwrap();
        assert_eq!(author.link, "author_id");
        assert_eq!(
            post.column_def("author_id").map(|c| c.column_type),
            Some(ColumnType::Link)
        );
        let tags = post.relation_def("tags").unwrap();
        assert_eq!(
            tags.junction,
            Some(JunctionDef {
                table: "posts_to_tags".into(),
                this_column: "blog_post_id".into(),
                that_column: "tag_id".into(),
            })
        );
        assert_eq!(schema.entity("Tag").primary_key_name(), "uid");
        let posts = schema.entity("Author").relation_def("posts").unwrap();
        assert_eq!(posts.link, "author_id");
        assert_eq!(schema.junctions().len(), 1);
    }

    #[test]
    fn self_referencing_many_to_many() {
        let schema = Schema::builder()
            .entity(EntityDef::new("User").relation(RelationDef::many_to_many("friends", "User")))
            .build()
            .unwrap();
        let junction = schema
            .entity("User")
            .relation_def("friends")
            .unwrap()
            .junction
            .clone()
            .unwrap();
        assert_eq!(junction.table, "users_to_users");
        assert_eq!(junction.this_column, "user_id");
        assert_eq!(junction.that_column, "friends_id");
    }

    #[test]
    fn invalid_schemas() {
        assert!(
            Schema::builder()
                .entity(EntityDef::new("Post").relation(RelationDef::belongs_to("author", "Nobody")))
                .build()
                .is_err()
        );
        assert!(
            Schema::builder()
                .entity(EntityDef::new("Post").column(ColumnDef::new("bad name", "string")))
                .build()
                .is_err()
        );
        assert!(
            Schema::builder()
                .entity(
                    EntityDef::new("Post")
                        .column(ColumnDef::new("a", "pk"))
                        .column(ColumnDef::new("b", "pk"))
                )
                .build()
                .is_err()
        );
        assert!(
            Schema::builder()
                .entity(EntityDef::new("Post"))
                .entity(EntityDef::new("Post"))
                .build()
                .is_err()
        );
        assert!(
            Schema::builder()
                .entity(EntityDef::new("User").relation(RelationDef::many_to_many("user", "User")))
                .build()
                .is_err(),
            "Both junction columns would be `user_id`"
        );
    }

    #[test]
    #[should_panic(expected = "not registered")]
    fn unknown_entity_type() {
        blog().entity("Comment");
    }
}
