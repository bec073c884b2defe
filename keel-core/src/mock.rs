//! Recording connection for tests, no database involved.
//!
//! [`MockConnection`] keeps every statement it receives together with its parameters. `SELECT`
//! statements return the scripted results in the order they were pushed, `INSERT` statements report
//! a per-table increasing identifier, everything else reports one affected row.

use crate::{
    Connection, Driver, Error, ExecutionError, Executor, GenericSqlWriter, Query, QueryResult,
    Result, RowLabeled, RowNames, RowsAffected, Transaction, Value, stream::Stream,
};
use std::{
    collections::{HashMap, VecDeque},
    future::Future,
};

/// Driver rendering the reference dialect.
#[derive(Default, Debug, Clone, Copy)]
pub struct MockDriver;

impl Driver for MockDriver {
    type SqlWriter = GenericSqlWriter;

    const NAME: &'static str = "mock";

    fn sql_writer(&self) -> GenericSqlWriter {
        GenericSqlWriter::new()
    }
}

#[derive(Default, Debug)]
pub struct MockConnection {
    driver: MockDriver,
    queries: Vec<Query>,
    results: VecDeque<Vec<RowLabeled>>,
    ids: HashMap<String, i64>,
    failures: Vec<String>,
}

impl MockConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the rows returned by the next `SELECT` that has no result yet.
    pub fn push_rows(&mut self, labels: &[&str], rows: Vec<Vec<Value>>) -> &mut Self {
        let labels: RowNames = labels.iter().map(|v| v.to_string()).collect();
        self.results.push_back(
            rows.into_iter()
                .map(|values| RowLabeled::new(labels.clone(), values.into()))
                .collect(),
        );
        self
    }

    /// Script an empty result for the next `SELECT`.
    pub fn push_empty(&mut self) -> &mut Self {
        self.results.push_back(Vec::new());
        self
    }

    /// Identifier reported by the next `INSERT` into `table`.
    pub fn set_next_id(&mut self, table: &str, id: i64) -> &mut Self {
        self.ids.insert(table.to_string(), id);
        self
    }

    /// Reject every statement whose text contains `fragment`.
    pub fn fail_on(&mut self, fragment: impl Into<String>) -> &mut Self {
        self.failures.push(fragment.into());
        self
    }

    /// Every statement received so far, with its parameters.
    pub fn queries(&self) -> &[Query] {
        &self.queries
    }

    /// Text of every statement received so far.
    pub fn statements(&self) -> Vec<&str> {
        self.queries.iter().map(|q| q.sql.as_str()).collect()
    }

    /// Number of `SELECT` statements received so far.
    pub fn fetch_count(&self) -> usize {
        self.queries
            .iter()
            .filter(|q| q.sql.trim_start().starts_with("SELECT"))
            .count()
    }

    /// Forget the recorded statements, the script is kept.
    pub fn clear(&mut self) {
        self.queries.clear();
    }

    fn respond(&mut self, query: &Query) -> Vec<Result<QueryResult>> {
        if let Some(fragment) = self
            .failures
            .iter()
            .find(|v| query.sql.contains(v.as_str()))
        {
            let error = Error::new(ExecutionError::new(
                &query.sql,
                format!("statement rejected because it contains `{}`", fragment),
            ));
            log::error!("{:#}", error);
            return vec![Err(error)];
        }
        let sql = query.sql.trim_start();
        if sql.starts_with("SELECT") {
            return self
                .results
                .pop_front()
                .unwrap_or_default()
                .into_iter()
                .map(|row| Ok(row.into()))
                .collect();
        }
        let mut affected = RowsAffected {
            rows_affected: 1,
            last_affected_id: None,
        };
        if let Some(rest) = sql.strip_prefix("INSERT INTO \"")
            && let Some((table, _)) = rest.split_once('"')
        {
            let next = self.ids.entry(table.to_string()).or_insert(1);
            affected.last_affected_id = Some(*next);
            *next += 1;
        }
        vec![Ok(affected.into())]
    }
}

impl Executor for MockConnection {
    type Driver = MockDriver;

    fn driver(&self) -> &Self::Driver {
        &self.driver
    }

    fn run(&mut self, query: Query) -> impl Stream<Item = Result<QueryResult>> + Send {
        log::debug!("{}", query);
        let results = self.respond(&query);
        self.queries.push(query);
        crate::stream::iter(results)
    }
}

impl Connection for MockConnection {
    #[allow(refining_impl_trait)]
    fn connect(url: &str) -> impl Future<Output = Result<MockConnection>> + Send {
        let prefix = format!("{}://", MockDriver::NAME);
        let result = if url.starts_with(&prefix) {
            Ok(MockConnection::new())
        } else {
            let error = Error::msg(format!("Mock connection url must start with `{}`", prefix));
            log::error!("{:#}", error);
            Err(error)
        };
        async move { result }
    }

    #[allow(refining_impl_trait)]
    fn begin(&mut self) -> impl Future<Output = Result<MockTransaction<'_>>> + Send {
        async move {
            self.queries.push("BEGIN;".into());
            Ok(MockTransaction { connection: self })
        }
    }
}

/// Transaction over a [`MockConnection`], it records `BEGIN`, `COMMIT` and `ROLLBACK`.
#[derive(Debug)]
pub struct MockTransaction<'c> {
    connection: &'c mut MockConnection,
}

impl<'c> Executor for MockTransaction<'c> {
    type Driver = MockDriver;

    fn driver(&self) -> &Self::Driver {
        self.connection.driver()
    }

    fn run(&mut self, query: Query) -> impl Stream<Item = Result<QueryResult>> + Send {
        self.connection.run(query)
    }
}

impl<'c> Transaction<'c> for MockTransaction<'c> {
    fn commit(self) -> impl Future<Output = Result<()>> + Send {
        self.connection.queries.push("COMMIT;".into());
        async { Ok(()) }
    }

    fn rollback(self) -> impl Future<Output = Result<()>> + Send {
        self.connection.queries.push("ROLLBACK;".into());
        async { Ok(()) }
    }
}
