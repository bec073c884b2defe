use crate::{ColumnDef, ColumnType, Entity, EntityDef, Result, Value};
use time::{OffsetDateTime, PrimitiveDateTime};

/// Handler of an instance method contributed by an extension.
pub type MethodFn = fn(&mut Entity, &[Value]) -> Result<Value>;
/// Handler of a type-level method contributed by an extension.
pub type StaticMethodFn = fn(&EntityDef, &[Value]) -> Result<Value>;

/// Pluggable behavior attached to an entity type.
///
/// The column and index hooks run when the schema is built and again when the table is created,
/// so they must be idempotent. Method lookups are tried in registration order, the first
/// extension returning a handler wins.
pub trait Extension: Send + Sync {
    fn name(&self) -> &str;

    fn prepare_columns(&self, columns: Vec<ColumnDef>) -> Vec<ColumnDef> {
        columns
    }

    fn prepare_indexes(&self, indexes: Vec<crate::IndexDef>) -> Vec<crate::IndexDef> {
        indexes
    }

    fn method(&self, _name: &str) -> Option<MethodFn> {
        None
    }

    fn static_method(&self, _name: &str) -> Option<StaticMethodFn> {
        None
    }
}

/// Adds `created_at` and `updated_at` datetime columns.
///
/// Instance method `touch` stamps `updated_at`, and `created_at` when it is still unset, with the
/// current UTC time.
#[derive(Debug, Default, Clone, Copy)]
pub struct Timestamps;

impl Timestamps {
    pub const CREATED_AT: &'static str = "created_at";
    pub const UPDATED_AT: &'static str = "updated_at";

    fn touch(entity: &mut Entity, _args: &[Value]) -> Result<Value> {
        let now = OffsetDateTime::now_utc();
        let now = Value::from(PrimitiveDateTime::new(now.date(), now.time()));
        if entity.get(Self::CREATED_AT)?.is_null() {
            entity.set(Self::CREATED_AT, now.clone())?;
        }
        entity.set(Self::UPDATED_AT, now.clone())?;
        Ok(now)
    }
}

impl Extension for Timestamps {
    fn name(&self) -> &str {
        "timestamps"
    }

    fn prepare_columns(&self, mut columns: Vec<ColumnDef>) -> Vec<ColumnDef> {
        for name in [Self::CREATED_AT, Self::UPDATED_AT] {
            if !columns.iter().any(|c| c.name == name) {
                columns.push(ColumnDef::new(name, ColumnType::DateTime));
            }
        }
        columns
    }

    fn method(&self, name: &str) -> Option<MethodFn> {
        match name {
            "touch" => Some(Self::touch),
            _ => None,
        }
    }
}
