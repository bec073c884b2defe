use crate::{
    Collection, ColumnDef, ColumnType, Context, Entity, EntityType, Error, Executor, Extension,
    FindOptions, IndexDef, JunctionDef, Params, Query, QueryBuilder, QueryResult, Result,
    RowsAffected, SqlWriter, Value, is_identifier, persist,
    stream::{StreamExt, TryStreamExt},
};
use futures::future::BoxFuture;
use std::{future::Future, pin::pin, sync::Arc};

/// Dialect strategy: renders statements through its [`SqlWriter`] and runs them on an executor.
///
/// Every operation has a default implementation, a dialect only provides the writer.
pub trait Driver: Clone + Send + Sync + 'static {
    type SqlWriter: SqlWriter;

    /// Name of the dialect, also the scheme of its connection URLs.
    const NAME: &'static str;

    fn sql_writer(&self) -> Self::SqlWriter;

    /// Create a table, then one lookup index for each link column.
    ///
    /// The extensions transform columns and indexes before the statement is written.
    fn create_table<Exec: Executor>(
        &self,
        executor: &mut Exec,
        table: &str,
        primary_key: &str,
        columns: &[ColumnDef],
        indexes: &[IndexDef],
        extensions: &[Arc<dyn Extension>],
    ) -> impl Future<Output = Result<()>> + Send {
        async move {
            let mut columns = columns.to_vec();
            let mut indexes = indexes.to_vec();
            for extension in extensions {
                columns = extension.prepare_columns(columns);
                indexes = extension.prepare_indexes(indexes);
            }
            let writer = self.sql_writer();
            let mut sql = String::with_capacity(256);
            writer.write_create_table(&mut sql, table, primary_key, &columns, &indexes)?;
            executor
                .execute(sql.into())
                .await
                .with_context(|| format!("While creating the table `{}`", table))?;
            let mut links: Vec<&str> = Vec::new();
            for column in columns.iter().filter(|c| c.is_link()) {
                if !links.contains(&column.name.as_str()) {
                    links.push(&column.name);
                }
            }
            for link in links {
                let mut sql = String::with_capacity(64);
                writer.write_create_link_index(&mut sql, table, link);
                executor.execute(sql.into()).await.with_context(|| {
                    format!("While creating the index of `{}` on `{}`", link, table)
                })?;
            }
            Ok(())
        }
    }

    /// Create the table of a registered entity type.
    fn create_entity_table<Exec: Executor>(
        &self,
        executor: &mut Exec,
        ty: &EntityType,
    ) -> impl Future<Output = Result<()>> + Send {
        self.create_table(
            executor,
            ty.table_name(),
            ty.primary_key_name(),
            ty.columns(),
            ty.indexes(),
            ty.extensions(),
        )
    }

    /// Create the junction table of a many to many relation.
    fn create_junction_table<Exec: Executor>(
        &self,
        executor: &mut Exec,
        junction: &JunctionDef,
    ) -> impl Future<Output = Result<()>> + Send {
        async move {
            let columns = [
                ColumnDef::new(&junction.this_column, ColumnType::Link),
                ColumnDef::new(&junction.that_column, ColumnType::Link),
            ];
            self.create_table(
                executor,
                &junction.table,
                crate::DEFAULT_PRIMARY_KEY,
                &columns,
                &[],
                &[],
            )
            .await
        }
    }

    fn exists_table<Exec: Executor>(
        &self,
        executor: &mut Exec,
        table: &str,
    ) -> impl Future<Output = Result<bool>> + Send {
        async move {
            let mut sql = String::with_capacity(96);
            self.sql_writer().write_exists_table(&mut sql);
            let count = fetch_count(executor, Query::new(sql, Params::new().with("table", table)))
                .await
                .with_context(|| format!("While checking whether the table `{}` exists", table))?;
            Ok(count > 0)
        }
    }

    fn rename_table<Exec: Executor>(
        &self,
        executor: &mut Exec,
        table: &str,
        new_name: &str,
    ) -> impl Future<Output = Result<()>> + Send {
        let mut sql = String::with_capacity(64);
        self.sql_writer()
            .write_rename_table(&mut sql, table, new_name);
        execute_ddl(executor, sql, format!("While renaming the table `{}`", table))
    }

    fn truncate_table<Exec: Executor>(
        &self,
        executor: &mut Exec,
        table: &str,
    ) -> impl Future<Output = Result<()>> + Send {
        let mut sql = String::with_capacity(64);
        self.sql_writer().write_truncate_table(&mut sql, table);
        execute_ddl(executor, sql, format!("While truncating the table `{}`", table))
    }

    fn drop_table<Exec: Executor>(
        &self,
        executor: &mut Exec,
        table: &str,
    ) -> impl Future<Output = Result<()>> + Send {
        let mut sql = String::with_capacity(64);
        self.sql_writer().write_drop_table(&mut sql, table);
        execute_ddl(executor, sql, format!("While dropping the table `{}`", table))
    }

    fn add_column<Exec: Executor>(
        &self,
        executor: &mut Exec,
        table: &str,
        columns: &[ColumnDef],
    ) -> impl Future<Output = Result<()>> + Send {
        let mut sql = String::with_capacity(128);
        self.sql_writer().write_add_columns(&mut sql, table, columns);
        execute_ddl(executor, sql, format!("While adding columns to `{}`", table))
    }

    fn drop_column<Exec: Executor>(
        &self,
        executor: &mut Exec,
        table: &str,
        columns: &[&str],
    ) -> impl Future<Output = Result<()>> + Send {
        let mut sql = String::with_capacity(128);
        self.sql_writer().write_drop_columns(&mut sql, table, columns);
        execute_ddl(executor, sql, format!("While dropping columns of `{}`", table))
    }

    /// Rename a column, `column` is its current definition as registered in the schema.
    fn rename_column<Exec: Executor>(
        &self,
        executor: &mut Exec,
        table: &str,
        column: &ColumnDef,
        new_name: &str,
    ) -> impl Future<Output = Result<()>> + Send {
        let mut sql = String::with_capacity(96);
        self.sql_writer()
            .write_rename_column(&mut sql, table, column, new_name);
        execute_ddl(
            executor,
            sql,
            format!("While renaming the column `{}` of `{}`", column.name, table),
        )
    }

    fn add_index<Exec: Executor>(
        &self,
        executor: &mut Exec,
        table: &str,
        indexes: &[IndexDef],
    ) -> impl Future<Output = Result<()>> + Send {
        let mut sql = String::with_capacity(128);
        let written = self.sql_writer().write_add_indexes(&mut sql, table, indexes);
        async move {
            written?;
            execute_ddl(executor, sql, format!("While adding indexes to `{}`", table)).await
        }
    }

    fn drop_index<Exec: Executor>(
        &self,
        executor: &mut Exec,
        table: &str,
        names: &[&str],
    ) -> impl Future<Output = Result<()>> + Send {
        let mut sql = String::with_capacity(96);
        self.sql_writer().write_drop_indexes(&mut sql, table, names);
        execute_ddl(executor, sql, format!("While dropping indexes of `{}`", table))
    }

    /// Insert one row and return the generated primary key, if the backend reports one.
    ///
    /// The key is read from the first returned row, or else from the affected rows metadata.
    fn insert<Exec: Executor>(
        &self,
        executor: &mut Exec,
        table: &str,
        primary_key: &str,
        data: Vec<(String, Value)>,
    ) -> impl Future<Output = Result<Option<Value>>> + Send {
        let mut sql = String::with_capacity(128);
        {
            let columns = data.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>();
            self.sql_writer()
                .write_insert(&mut sql, table, &columns, primary_key);
        }
        let query = Query::new(sql, data.into_iter().collect());
        async move {
            let mut id = None;
            let mut stream = pin!(executor.run(query));
            while let Some(result) = stream.next().await {
                match result.with_context(|| format!("While inserting into `{}`", table))? {
                    QueryResult::Row(row) => {
                        if id.is_none() {
                            id = row
                                .get_column(primary_key)
                                .or_else(|| row.values().first())
                                .cloned();
                        }
                    }
                    QueryResult::Affected(affected) => {
                        if id.is_none() {
                            id = affected.last_affected_id.map(|v| Value::Int64(Some(v)));
                        }
                    }
                }
            }
            Ok(id.filter(|v| !v.is_null()))
        }
    }

    /// Update the row whose primary key equals `key`.
    fn update<Exec: Executor>(
        &self,
        executor: &mut Exec,
        table: &str,
        primary_key: &str,
        key: Value,
        data: Vec<(String, Value)>,
    ) -> impl Future<Output = Result<RowsAffected>> + Send {
        let mut sql = String::with_capacity(128);
        {
            let columns = data.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>();
            self.sql_writer()
                .write_update(&mut sql, table, &columns, primary_key);
        }
        let mut params: Params = data.into_iter().collect();
        params.insert(primary_key, key);
        let query = Query::new(sql, params);
        async move {
            executor
                .execute(query)
                .await
                .with_context(|| format!("While updating `{}`", table))
        }
    }

    /// Persist the entity and its cached relations.
    ///
    /// Transient singular relations are saved first and linked, then the entity columns are
    /// inserted or updated, then plural relations are cascaded. Nothing is rolled back when a
    /// statement fails, run it in a transaction to get atomicity.
    fn save<'a, Exec: Executor>(
        &'a self,
        executor: &'a mut Exec,
        entity: &'a mut Entity,
    ) -> BoxFuture<'a, Result<()>> {
        persist::save(self, executor, entity)
    }

    /// Delete the row of a persisted entity. The entity becomes transient and loses its key.
    fn delete<Exec: Executor>(
        &self,
        executor: &mut Exec,
        entity: &mut Entity,
    ) -> impl Future<Output = Result<()>> + Send {
        async move {
            let ty = entity.entity_type().clone();
            let primary_key = ty.primary_key_name();
            let key = match entity.pk() {
                Some(key) if entity.is_persisted() => key.clone(),
                _ => {
                    return Err(Error::msg(format!(
                        "Cannot delete a transient `{}`",
                        ty.name()
                    )));
                }
            };
            let mut sql = String::with_capacity(64);
            self.sql_writer()
                .write_delete(&mut sql, ty.table_name(), primary_key);
            executor
                .execute(Query::new(sql, Params::new().with(primary_key, key)))
                .await
                .with_context(|| format!("While deleting a `{}`", ty.name()))?;
            entity.remove_raw(primary_key);
            entity.set_persisted(false);
            Ok(())
        }
    }

    fn find_all<Exec: Executor>(
        &self,
        executor: &mut Exec,
        ty: &EntityType,
        options: FindOptions,
    ) -> impl Future<Output = Result<Collection>> + Send {
        let query = QueryBuilder::new()
            .from(self.sql_writer().quoted(ty.table_name()))
            .options(options);
        self.find_all_by_query(executor, ty, query)
    }

    /// The first entity whose `column` equals `value`.
    fn find_by_column<Exec: Executor>(
        &self,
        executor: &mut Exec,
        ty: &EntityType,
        column: &str,
        value: Value,
        options: FindOptions,
    ) -> impl Future<Output = Result<Option<Entity>>> + Send {
        let query = column_query(self, ty, column, value, options);
        async move { self.find_by_query(executor, ty, query?).await }
    }

    /// Every entity whose `column` equals `value`, `options.filter` restricts the result further.
    fn find_all_by_column<Exec: Executor>(
        &self,
        executor: &mut Exec,
        ty: &EntityType,
        column: &str,
        value: Value,
        options: FindOptions,
    ) -> impl Future<Output = Result<Collection>> + Send {
        let query = column_query(self, ty, column, value, options);
        async move { self.find_all_by_query(executor, ty, query?).await }
    }

    fn count_all<Exec: Executor>(
        &self,
        executor: &mut Exec,
        ty: &EntityType,
        options: FindOptions,
    ) -> impl Future<Output = Result<u64>> + Send {
        let mut query = QueryBuilder::new()
            .select("COUNT(*)")
            .from(self.sql_writer().quoted(ty.table_name()))
            .params(options.params);
        if let Some(filter) = options.filter {
            query = query.filter(filter);
        }
        async move {
            fetch_count(executor, query.build())
                .await
                .with_context(|| format!("While counting `{}`", ty.name()))
        }
    }

    fn count_all_by_column<Exec: Executor>(
        &self,
        executor: &mut Exec,
        ty: &EntityType,
        column: &str,
        value: Value,
        options: FindOptions,
    ) -> impl Future<Output = Result<u64>> + Send {
        let query = column_query(
            self,
            ty,
            column,
            value,
            FindOptions {
                order: None,
                limit: None,
                offset: None,
                ..options
            },
        )
        .map(|v| v.select("COUNT(*)"));
        async move {
            fetch_count(executor, query?.build())
                .await
                .with_context(|| format!("While counting `{}`", ty.name()))
        }
    }

    /// The first entity returned by the query.
    fn find_by_query<Exec: Executor>(
        &self,
        executor: &mut Exec,
        ty: &EntityType,
        query: QueryBuilder,
    ) -> impl Future<Output = Result<Option<Entity>>> + Send {
        let query = query.limit(1);
        async move {
            let collection = self.find_all_by_query(executor, ty, query).await?;
            Ok(collection.into_iter().next())
        }
    }

    /// Run the query and build one persisted entity for each row.
    fn find_all_by_query<Exec: Executor>(
        &self,
        executor: &mut Exec,
        ty: &EntityType,
        query: QueryBuilder,
    ) -> impl Future<Output = Result<Collection>> + Send {
        let query = query.build();
        async move {
            let mut collection = executor
                .fetch(query)
                .map_ok(|row| Entity::from_row(ty, row))
                .try_collect::<Collection>()
                .await
                .with_context(|| format!("While loading `{}`", ty.name()))?;
            collection.set_persisted(true);
            Ok(collection)
        }
    }
}

fn column_query<D: Driver>(
    driver: &D,
    ty: &EntityType,
    column: &str,
    value: Value,
    mut options: FindOptions,
) -> Result<QueryBuilder> {
    if !is_identifier(column) {
        return Err(Error::msg(format!(
            "`{}` cannot be used as a column of `{}`",
            column,
            ty.name()
        )));
    }
    let writer = driver.sql_writer();
    let mut filter = String::with_capacity(32);
    writer.write_column_filter(&mut filter, column);
    if let Some(extra) = options.filter.take() {
        filter = format!("{} AND ({})", filter, extra);
    }
    Ok(QueryBuilder::new()
        .from(writer.quoted(ty.table_name()))
        .options(options)
        .filter(filter)
        .param(column, value))
}

async fn execute_ddl<Exec: Executor>(executor: &mut Exec, sql: String, context: String) -> Result<()> {
    executor.execute(sql.into()).await.context(context)?;
    Ok(())
}

/// First column of the first row, as an unsigned count.
async fn fetch_count<Exec: Executor>(executor: &mut Exec, query: Query) -> Result<u64> {
    let rows = executor.fetch(query).try_collect::<Vec<_>>().await?;
    let value = rows
        .into_iter()
        .next()
        .and_then(|row| row.values.into_vec().into_iter().next())
        .ok_or_else(|| Error::msg("The count query returned no rows"))?;
    match value.try_as(&Value::Int64(None))? {
        Value::Int64(Some(v)) => Ok(u64::try_from(v)?),
        _ => Ok(0),
    }
}
