use crate::{
    Collection, Driver, EntityDef, EntityType, Error, Executor, FindOptions, NotFound,
    QueryBuilder, RelationDef, RelationKind, Result, RowLabeled, SqlWriter, Value,
};
use futures::{FutureExt, future::BoxFuture};
use std::{
    collections::HashMap,
    fmt::{self, Debug},
    sync::Arc,
};
use tokio::sync::{Mutex, MutexGuard};

pub type Shared<T> = Arc<Mutex<T>>;
/// A related entity, shared between the owner's cache and the caller.
pub type EntityRef = Shared<Entity>;
/// A related collection, shared between the owner's cache and the caller.
pub type CollectionRef = Shared<Collection>;

pub fn shared<T>(value: T) -> Shared<T> {
    Arc::new(Mutex::new(value))
}

/// Borrow a shared entity (or collection) without waiting.
///
/// Operations walk the graph depth first while holding the borrow of the parent, so finding the
/// value already borrowed means the graph loops back onto itself.
pub(crate) fn lock<'a, T>(value: &'a Shared<T>, path: &str) -> Result<MutexGuard<'a, T>> {
    value.try_lock().map_err(|_| borrowed(path))
}

pub(crate) fn borrowed(path: &str) -> Error {
    Error::msg(format!(
        "`{}` is already borrowed, the entity graph contains a cycle",
        path
    ))
}

/// Cached value of a relation.
#[derive(Debug, Clone)]
pub enum Related {
    One(Option<EntityRef>),
    Many(CollectionRef),
}

impl Related {
    pub fn is_singular(&self) -> bool {
        matches!(self, Related::One(..))
    }
}

impl From<Entity> for Related {
    fn from(value: Entity) -> Self {
        Related::One(Some(shared(value)))
    }
}

impl From<EntityRef> for Related {
    fn from(value: EntityRef) -> Self {
        Related::One(Some(value))
    }
}

impl From<Option<EntityRef>> for Related {
    fn from(value: Option<EntityRef>) -> Self {
        Related::One(value)
    }
}

impl From<Option<Entity>> for Related {
    fn from(value: Option<Entity>) -> Self {
        Related::One(value.map(shared))
    }
}

impl From<Collection> for Related {
    fn from(value: Collection) -> Self {
        Related::Many(shared(value))
    }
}

impl From<CollectionRef> for Related {
    fn from(value: CollectionRef) -> Self {
        Related::Many(value)
    }
}

impl From<Vec<Entity>> for Related {
    fn from(value: Vec<Entity>) -> Self {
        Related::Many(shared(value.into()))
    }
}

/// Result of reading a property: a column value or a relation.
#[derive(Debug, Clone)]
pub enum Property {
    Value(Value),
    One(Option<EntityRef>),
    Many(CollectionRef),
}

impl Property {
    fn describe(&self) -> &'static str {
        match self {
            Property::Value(..) => "a value",
            Property::One(..) => "a single entity",
            Property::Many(..) => "a collection",
        }
    }
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Property::Value(v) => Some(v),
            _ => None,
        }
    }
    pub fn into_value(self) -> Result<Value> {
        match self {
            Property::Value(v) => Ok(v),
            other => Err(Error::msg(format!("Expected a value, found {}", other.describe()))),
        }
    }
    pub fn into_one(self) -> Result<Option<EntityRef>> {
        match self {
            Property::One(v) => Ok(v),
            other => Err(Error::msg(format!(
                "Expected a single entity, found {}",
                other.describe()
            ))),
        }
    }
    pub fn into_many(self) -> Result<CollectionRef> {
        match self {
            Property::Many(v) => Ok(v),
            other => Err(Error::msg(format!(
                "Expected a collection, found {}",
                other.describe()
            ))),
        }
    }
}

impl From<Value> for Property {
    fn from(value: Value) -> Self {
        Property::Value(value)
    }
}

impl From<Related> for Property {
    fn from(value: Related) -> Self {
        match value {
            Related::One(v) => Property::One(v),
            Related::Many(v) => Property::Many(v),
        }
    }
}

/// A record of some entity type.
///
/// Holds the column values that were set or loaded, and a cache of the relations resolved so far.
/// A relation missing from the cache is loaded on first read.
#[derive(Clone)]
pub struct Entity {
    ty: EntityType,
    values: HashMap<String, Value>,
    related: HashMap<String, Related>,
    persisted: bool,
}

fn split_path(path: &str) -> (&str, Option<&str>) {
    match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    }
}

/// A stored key that does not point anywhere: null, or the `0` a link column defaults to.
pub(crate) fn is_unset_key(value: &Value) -> bool {
    value.is_null() || matches!(value, Value::Int32(Some(0)) | Value::Int64(Some(0)))
}

impl Entity {
    /// A new transient entity.
    pub fn new(ty: &EntityType) -> Self {
        Self {
            ty: ty.clone(),
            values: HashMap::new(),
            related: HashMap::new(),
            persisted: false,
        }
    }

    /// A transient entity holding the values of a row.
    pub fn from_row(ty: &EntityType, row: RowLabeled) -> Self {
        let mut entity = Entity::new(ty);
        entity.values = row
            .labels
            .iter()
            .cloned()
            .zip(row.values.into_vec())
            .collect();
        entity
    }

    pub fn entity_type(&self) -> &EntityType {
        &self.ty
    }
    pub fn def(&self) -> &EntityDef {
        self.ty.def()
    }
    pub fn is_persisted(&self) -> bool {
        self.persisted
    }
    pub fn is_transient(&self) -> bool {
        !self.persisted
    }
    pub fn set_persisted(&mut self, persisted: bool) {
        self.persisted = persisted;
    }

    /// The primary key value, if set.
    pub fn pk(&self) -> Option<&Value> {
        self.value_ref(self.ty.primary_key_name())
    }

    /// Values set or loaded so far, in no particular order.
    pub fn values(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub(crate) fn value_ref(&self, name: &str) -> Option<&Value> {
        self.values.get(name).filter(|v| !v.is_null())
    }

    pub(crate) fn set_raw(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    pub(crate) fn remove_raw(&mut self, name: &str) {
        self.values.remove(name);
    }

    /// Whether `name` is a declared column, starts with a relation, or holds a non-null value.
    pub fn has(&self, name: &str) -> bool {
        let (head, _) = split_path(name);
        self.def().column_def(name).is_some()
            || self.def().relation_def(head).is_some()
            || self.value_ref(name).is_some()
    }

    /// Read a column value without touching the database.
    ///
    /// A declared column without a value reads as its typed null. Relations need
    /// [`Entity::read`] instead.
    pub fn get(&self, name: &str) -> Result<Value> {
        if let Some(value) = self.values.get(name) {
            return Ok(value.clone());
        }
        if let Some(column) = self.def().column_def(name) {
            return Ok(column.column_type.empty_value());
        }
        if self.def().relation_def(split_path(name).0).is_some() {
            return Err(Error::msg(format!(
                "`{}` goes through a relation of `{}`, it must be read with `read`",
                name,
                self.def().name()
            )));
        }
        Err(NotFound::new(self.def().name(), name).into())
    }

    /// Read a property, loading relations on first access.
    ///
    /// `path` may be dotted (`"author.name"`): every segment but the last must be a singular
    /// relation that resolves to an entity.
    pub fn read<'a, Exec: Executor>(
        &'a mut self,
        executor: &'a mut Exec,
        path: &'a str,
    ) -> BoxFuture<'a, Result<Property>> {
        async move {
            if let Some(value) = self.values.get(path) {
                return Ok(Property::Value(value.clone()));
            }
            let def = self.ty.def().clone();
            if let Some(column) = def.column_def(path) {
                return Ok(Property::Value(column.column_type.empty_value()));
            }
            let (head, rest) = split_path(path);
            if def.relation_def(head).is_none() {
                return Err(NotFound::new(def.name(), path).into());
            }
            let related = self.related(executor, head).await?.clone();
            let Some(rest) = rest else {
                return Ok(related.into());
            };
            match related {
                Related::One(Some(entity)) => {
                    let mut entity = lock(&entity, head)?;
                    entity.read(executor, rest).await
                }
                _ => Err(NotFound::new(def.name(), path).into()),
            }
        }
        .boxed()
    }

    /// The relation value, loaded and cached on first access.
    pub async fn related<Exec: Executor>(
        &mut self,
        executor: &mut Exec,
        name: &str,
    ) -> Result<&Related> {
        if !self.related.contains_key(name) {
            let def = self.ty.def().clone();
            let relation = def
                .relation_def(name)
                .ok_or_else(|| NotFound::new(def.name(), name))?;
            let loaded = self.load(executor, relation).await?;
            self.related.insert(name.to_string(), loaded);
        }
        Ok(&self.related[name])
    }

    /// The cached relation value, without loading it.
    pub fn cached(&self, name: &str) -> Option<&Related> {
        self.related.get(name)
    }

    /// Drop the cached value of a relation, the next read loads it again.
    pub fn forget(&mut self, name: &str) -> Option<Related> {
        self.related.remove(name)
    }

    async fn load<Exec: Executor>(
        &self,
        executor: &mut Exec,
        relation: &RelationDef,
    ) -> Result<Related> {
        let driver = executor.driver().clone();
        let target = self.ty.related(relation);
        log::debug!(
            "Loading the relation `{}.{}` ({:?})",
            self.def().name(),
            relation.name,
            relation.kind
        );
        let related = match relation.kind {
            RelationKind::HasOne | RelationKind::BelongsTo => {
                match self.values.get(&relation.link).filter(|v| !is_unset_key(v)) {
                    Some(key) => Related::One(
                        driver
                            .find_by_column(
                                executor,
                                &target,
                                target.primary_key_name(),
                                key.clone(),
                                FindOptions::default(),
                            )
                            .await?
                            .map(shared),
                    ),
                    None => Related::One(None),
                }
            }
            RelationKind::HasMany => match self.pk() {
                Some(key) => Related::Many(shared(
                    driver
                        .find_all_by_column(
                            executor,
                            &target,
                            &relation.link,
                            key.clone(),
                            FindOptions::default(),
                        )
                        .await?,
                )),
                None => Related::Many(shared(Collection::new())),
            },
            RelationKind::ManyToMany => {
                let junction = relation.junction.as_ref().ok_or_else(|| {
                    Error::msg(format!(
                        "The relation `{}` of `{}` has no junction table",
                        relation.name,
                        self.def().name()
                    ))
                })?;
                match self.pk() {
                    Some(key) => {
                        let writer = driver.sql_writer();
                        let mut filter = String::new();
                        writer.write_junction_filter(
                            &mut filter,
                            target.primary_key_name(),
                            junction,
                        );
                        let query = QueryBuilder::new()
                            .from(writer.quoted(target.table_name()))
                            .filter(filter)
                            .param(&junction.this_column, key.clone());
                        Related::Many(shared(
                            driver.find_all_by_query(executor, &target, query).await?,
                        ))
                    }
                    None => Related::Many(shared(Collection::new())),
                }
            }
        };
        Ok(related)
    }

    /// Write a property.
    ///
    /// A relation name replaces the cached relation (an entity for singular relations, a
    /// collection otherwise). A dotted path starting with a relation writes into the cached related
    /// entity. Anything else sets a column value, the primary key of a persisted entity cannot be
    /// changed.
    pub fn write(&mut self, path: &str, property: impl Into<Property>) -> Result<()> {
        let property = property.into();
        let def = self.ty.def().clone();
        let (head, rest) = split_path(path);
        if let Some(relation) = def.relation_def(head) {
            match rest {
                None => {
                    let related = match (relation.is_singular(), property) {
                        (true, Property::One(v)) => Related::One(v),
                        (false, Property::Many(v)) => Related::Many(v),
                        (_, property) => {
                            return Err(Error::msg(format!(
                                "Cannot assign {} to the relation `{}` of `{}`",
                                property.describe(),
                                head,
                                def.name()
                            )));
                        }
                    };
                    self.related.insert(head.to_string(), related);
                }
                Some(rest) => match self.related.get(head) {
                    Some(Related::One(Some(entity))) => {
                        let entity = entity.clone();
                        lock(&entity, head)?.write(rest, property)?;
                    }
                    _ => {
                        return Err(Error::msg(format!(
                            "Cannot write `{}`: the relation `{}` of `{}` does not hold a loaded entity",
                            path,
                            head,
                            def.name()
                        )));
                    }
                },
            }
            return Ok(());
        }
        let Property::Value(value) = property else {
            return Err(NotFound::new(def.name(), path).into());
        };
        if self.persisted
            && path == def.primary_key_name()
            && self.values.get(path) != Some(&value)
        {
            return Err(Error::msg(format!(
                "The primary key `{}` of a persisted `{}` cannot be changed",
                path,
                def.name()
            )));
        }
        self.values.insert(path.to_string(), value);
        Ok(())
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.write(name, Property::Value(value.into()))
    }

    pub fn set_related(&mut self, name: &str, related: impl Into<Related>) -> Result<()> {
        self.write(name, Property::from(related.into()))
    }

    /// Dispatch an instance method to the first extension of the type that handles it.
    ///
    /// `Ok(None)` means no extension handles `method`.
    pub fn call(&mut self, method: &str, args: &[Value]) -> Result<Option<Value>> {
        let def = self.ty.def().clone();
        for extension in def.extensions() {
            if let Some(f) = extension.method(method) {
                log::trace!("`{}.{}` handled by `{}`", def.name(), method, extension.name());
                return f(self, args).map(Some);
            }
        }
        Ok(None)
    }

    /// Persist the entity together with the cached relations.
    pub async fn save<Exec: Executor>(&mut self, executor: &mut Exec) -> Result<()> {
        let driver = executor.driver().clone();
        driver.save(executor, self).await
    }

    /// Delete the row, the entity becomes transient again.
    pub async fn delete<Exec: Executor>(&mut self, executor: &mut Exec) -> Result<()> {
        let driver = executor.driver().clone();
        driver.delete(executor, self).await
    }
}

impl Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut values = self.values.iter().collect::<Vec<_>>();
        values.sort_by(|a, b| a.0.cmp(b.0));
        f.debug_struct("Entity")
            .field("type", &self.def().name())
            .field("persisted", &self.persisted)
            .field("values", &values)
            .field("related", &self.related.keys().collect::<Vec<_>>())
            .finish()
    }
}
