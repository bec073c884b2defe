mod blog;
mod ddl;
mod lazy;
mod relations;
mod simple;
mod transaction;

use crate::{
    ddl::ddl,
    lazy::lazy,
    relations::{belongs_to, has_many, many_to_many},
    simple::simple,
};
use keel::Connection;
use log::LevelFilter;
use std::env;

pub use blog::*;

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

pub async fn execute_tests<C: Connection>(mut connection: C) {
    ddl(&mut connection).await;
    simple(&mut connection).await;
    belongs_to(&mut connection).await;
    has_many(&mut connection).await;
    many_to_many(&mut connection).await;
    lazy(&mut connection).await;
    #[cfg(not(feature = "disable-transactions"))]
    transaction::transaction(&mut connection).await;
}

#[macro_export]
macro_rules! silent_logs {
    ($($code:tt)+) => {{
        let level = log::max_level();
        log::set_max_level(log::LevelFilter::Off);
        $($code)+
        log::set_max_level(level);
    }};
}
