mod as_value;
mod collection;
mod column;
mod connection;
mod driver;
mod entity;
mod error;
mod executor;
mod extension;
mod index;
#[cfg(feature = "mock")]
pub mod mock;
mod persist;
mod query;
mod query_builder;
mod relation;
mod schema;
mod sql_writer;
mod transaction;
mod util;
mod value;

pub use ::anyhow::Context;
pub use as_value::*;
pub use collection::*;
pub use column::*;
pub use connection::*;
pub use driver::*;
pub use entity::*;
pub use error::*;
pub use executor::*;
pub use extension::*;
pub use index::*;
pub use query::*;
pub use query_builder::*;
pub use relation::*;
pub use schema::*;
pub use sql_writer::*;
pub use transaction::*;
pub use util::*;
pub use value::*;
pub mod stream {
    pub use ::futures::stream::*;
}
pub use ::futures::future;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
