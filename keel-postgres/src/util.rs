use crate::value_holder::{ValueHolder, postgres_type_to_value};
use async_stream::try_stream;
use keel_core::{
    Error, ExecutionError, Query, QueryResult, Result, Row, RowLabeled, RowNames, RowsAffected,
    bind_positional,
    stream::{Stream, StreamExt, TryStreamExt},
};
use std::{fmt::Write, pin::pin, sync::Arc};
use tokio_postgres::GenericClient;

pub(crate) fn row_to_keel_row(row: tokio_postgres::Row) -> Result<Row> {
    (0..row.len())
        .map(|i| match row.try_get::<_, ValueHolder>(i) {
            Ok(v) => Ok(v.0),
            Err(..) => {
                let col = &row.columns()[i];
                Err(Error::msg(format!(
                    "Could not deserialize column {} `{}`: {}",
                    i,
                    col.name(),
                    col.type_()
                )))
            }
        })
        .collect::<Result<Row>>()
}

/// Run one statement on a client or a transaction.
///
/// Placeholders become `$n`, bound values are coerced to the parameter types reported by the
/// server. Yields the rows, then the number of affected rows.
pub(crate) fn run_query<'a, C: GenericClient + Sync>(
    client: &'a C,
    query: Query,
) -> impl Stream<Item = Result<QueryResult>> + Send + 'a {
    let context = Arc::new(format!("While running the query:\n{}", query));
    try_stream! {
        log::debug!("{}", query);
        let (sql, values) = bind_positional(
            query.sql.trim_end().trim_end_matches(';'),
            &query.params,
            |out, i| {
                let _ = write!(out, "${}", i);
            },
        )?;
        let statement = client
            .prepare(&sql)
            .await
            .map_err(|e| ExecutionError::new(&sql, e))?;
        let params = statement
            .params()
            .iter()
            .zip(values)
            .map(|(ty, value)| value.try_as(&postgres_type_to_value(ty)).map(ValueHolder))
            .collect::<Result<Vec<_>>>()?;
        let stream = client
            .query_raw(&statement, params)
            .await
            .map_err(|e| ExecutionError::new(&sql, e))?;
        let mut stream = pin!(stream);
        let mut labels: Option<RowNames> = None;
        while let Some(row) = stream
            .next()
            .await
            .transpose()
            .map_err(|e| ExecutionError::new(&sql, e))?
        {
            let labels = labels.get_or_insert_with(|| {
                row.columns().iter().map(|c| c.name().to_string()).collect()
            });
            yield QueryResult::Row(RowLabeled::new(labels.clone(), row_to_keel_row(row)?));
        }
        yield QueryResult::Affected(RowsAffected {
            rows_affected: stream.rows_affected().unwrap_or_default(),
            last_affected_id: None,
        });
    }
    .map_err(move |e: Error| {
        let e = e.context(context.clone());
        log::error!("{:#}", e);
        e
    })
}
