use crate::{Executor, Result, Transaction};
use std::future::Future;

/// An open session with a database.
pub trait Connection: Executor {
    /// Connect to the database at `url`.
    fn connect(url: &str) -> impl Future<Output = Result<Self>> + Send;

    /// Start a transaction. Statements run through it are applied on commit.
    fn begin(&mut self) -> impl Future<Output = Result<impl Transaction<'_>>> + Send;

    fn disconnect(self) -> impl Future<Output = Result<()>> + Send {
        async { Ok(()) }
    }
}
