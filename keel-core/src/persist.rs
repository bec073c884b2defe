use crate::{
    Context, Driver, Entity, Error, Executor, JunctionDef, Params, Query, Related, RelationKind,
    Result, SqlWriter, Value,
    entity::{borrowed, is_unset_key, lock},
};
use futures::{FutureExt, future::BoxFuture};

/// Save in three phases: owned singular relations, columns, plural relations.
pub(crate) fn save<'a, D: Driver, Exec: Executor>(
    driver: &'a D,
    executor: &'a mut Exec,
    entity: &'a mut Entity,
) -> BoxFuture<'a, Result<()>> {
    async move {
        let def = entity.entity_type().def().clone();

        log::trace!("Saving `{}`: singular relations", def.name());
        for relation in def.relations().iter().filter(|r| r.is_singular()) {
            let Some(Related::One(Some(related))) = entity.cached(&relation.name).cloned() else {
                continue;
            };
            let Ok(mut related) = related.try_lock() else {
                // Borrowed by a save further up, which already stored it and set the link
                if entity
                    .value_ref(&relation.link)
                    .is_some_and(|v| !is_unset_key(v))
                {
                    log::trace!(
                        "`{}.{}` is being saved by the caller, keeping `{}`",
                        def.name(),
                        relation.name,
                        relation.link
                    );
                    continue;
                }
                return Err(borrowed(&relation.name));
            };
            if related.is_transient() {
                driver.save(executor, &mut *related).await?;
            }
            if let Some(key) = related.pk() {
                entity.set_raw(&relation.link, key.clone());
            }
        }

        log::trace!("Saving `{}`: columns", def.name());
        save_columns(driver, executor, entity).await?;
        let key = entity
            .pk()
            .cloned()
            .ok_or_else(|| Error::msg(format!("The saved `{}` has no primary key", def.name())))?;

        log::trace!("Saving `{}`: plural relations", def.name());
        for relation in def.relations() {
            let Some(Related::Many(members)) = entity.cached(&relation.name).cloned() else {
                continue;
            };
            let mut members = lock(&members, &relation.name)?;
            match relation.kind {
                RelationKind::HasMany => {
                    for member in members.iter_mut() {
                        member.set_raw(&relation.link, key.clone());
                        driver.save(executor, member).await?;
                    }
                }
                RelationKind::ManyToMany => {
                    let Some(junction) = &relation.junction else {
                        continue;
                    };
                    let mut keys = Vec::with_capacity(members.len());
                    for member in members.iter_mut() {
                        if member.is_transient() {
                            save_columns(driver, executor, member).await?;
                        }
                        let member_key = member.pk().cloned().ok_or_else(|| {
                            Error::msg(format!(
                                "A member of `{}.{}` has no primary key",
                                def.name(),
                                relation.name
                            ))
                        })?;
                        keys.push(member_key);
                    }
                    replace_junction(driver, executor, junction, key.clone(), keys).await?;
                }
                _ => {}
            }
        }
        Ok(())
    }
    .boxed()
}

/// Insert or update the columns of the entity.
///
/// Written columns are the ones holding a non-null value, or else a default, plus singular links.
async fn save_columns<D: Driver, Exec: Executor>(
    driver: &D,
    executor: &mut Exec,
    entity: &mut Entity,
) -> Result<()> {
    let ty = entity.entity_type().clone();
    let primary_key = ty.primary_key_name();
    let mut data: Vec<(String, Value)> = Vec::with_capacity(ty.columns().len());
    for column in ty.columns() {
        if column.name == primary_key || column.is_primary_key() {
            continue;
        }
        if let Some(value) = entity.value_ref(&column.name) {
            data.push((column.name.clone(), value.clone()));
        } else if let Some(default) = &column.default {
            data.push((column.name.clone(), default.clone()));
        }
    }
    for relation in ty.relations().iter().filter(|r| r.is_singular()) {
        if !data.iter().any(|(k, _)| *k == relation.link)
            && let Some(value) = entity.value_ref(&relation.link)
        {
            data.push((relation.link.clone(), value.clone()));
        }
    }

    if entity.is_transient() {
        let key = driver
            .insert(executor, ty.table_name(), primary_key, data)
            .await?
            .ok_or_else(|| {
                Error::msg(format!(
                    "The insert into `{}` did not report the generated `{}`",
                    ty.table_name(),
                    primary_key
                ))
            })?;
        entity.set_raw(primary_key, key);
        entity.set_persisted(true);
    } else if data.is_empty() {
        log::trace!("Nothing to update in `{}`", ty.name());
    } else {
        let key = entity.pk().cloned().ok_or_else(|| {
            Error::msg(format!(
                "The persisted `{}` has no `{}` value",
                ty.name(),
                primary_key
            ))
        })?;
        driver
            .update(executor, ty.table_name(), primary_key, key, data)
            .await?;
    }
    Ok(())
}

/// Replace every junction row of the owner with one row per member.
async fn replace_junction<D: Driver, Exec: Executor>(
    driver: &D,
    executor: &mut Exec,
    junction: &JunctionDef,
    key: Value,
    members: Vec<Value>,
) -> Result<()> {
    let writer = driver.sql_writer();
    let mut sql = String::with_capacity(64);
    writer.write_junction_delete(&mut sql, junction);
    executor
        .execute(Query::new(
            sql,
            Params::new().with(&junction.this_column, key.clone()),
        ))
        .await
        .with_context(|| format!("While clearing the junction `{}`", junction.table))?;
    if members.is_empty() {
        return Ok(());
    }
    let mut sql = String::with_capacity(64 + members.len() * 32);
    writer.write_junction_insert(&mut sql, junction, members.len());
    let mut params = Params::new().with(&junction.this_column, key);
    for (i, member) in members.into_iter().enumerate() {
        params.insert(format!("{}_{}", junction.that_column, i), member);
    }
    executor
        .execute(Query::new(sql, params))
        .await
        .with_context(|| format!("While filling the junction `{}`", junction.table))?;
    Ok(())
}
