use crate::{PostgresConnection, PostgresDriver, util::run_query};
use keel_core::{
    Error, ExecutionError, Executor, Query, QueryResult, Result, Transaction,
    future::TryFutureExt, stream::Stream,
};

pub struct PostgresTransaction<'c>(pub(crate) tokio_postgres::Transaction<'c>);

impl<'c> PostgresTransaction<'c> {
    pub async fn new(connection: &'c mut PostgresConnection) -> Result<Self> {
        let transaction = connection.client.transaction().await.map_err(|e| {
            let e = Error::new(ExecutionError::new("BEGIN", e));
            log::error!("{:#}", e);
            e
        })?;
        Ok(Self(transaction))
    }
}

impl<'c> Executor for PostgresTransaction<'c> {
    type Driver = PostgresDriver;

    fn driver(&self) -> &Self::Driver {
        &PostgresDriver {}
    }

    fn run(&mut self, query: Query) -> impl Stream<Item = Result<QueryResult>> + Send {
        run_query(&self.0, query)
    }
}

impl<'c> Transaction<'c> for PostgresTransaction<'c> {
    fn commit(self) -> impl Future<Output = Result<()>> + Send {
        self.0.commit().map_err(Into::into)
    }

    fn rollback(self) -> impl Future<Output = Result<()>> + Send {
        self.0.rollback().map_err(Into::into)
    }
}
