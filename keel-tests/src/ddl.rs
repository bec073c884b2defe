use crate::{BLOG, reset_blog};
use keel::{ColumnDef, Driver, Executor, IndexDef, Unsupported};
use std::sync::LazyLock;
use tokio::sync::Mutex;

pub async fn ddl<E: Executor>(executor: &mut E) {
    static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));
    let _lock = MUTEX.lock().await;
    let driver = executor.driver().clone();

    reset_blog(executor)
        .await
        .expect("Failed to reset the blog tables");
    for def in BLOG.entities() {
        assert!(
            driver
                .exists_table(executor, def.table_name())
                .await
                .expect("Failed to check the table"),
            "Table `{}` should exist",
            def.table_name()
        );
    }
    for junction in BLOG.junctions() {
        assert!(
            driver
                .exists_table(executor, &junction.table)
                .await
                .expect("Failed to check the junction table")
        );
    }

    // Scratch table
    let table = "keel_scratch";
    let renamed = "keel_scratch_renamed";
    for name in [table, renamed] {
        if driver.exists_table(executor, name).await.unwrap() {
            driver.drop_table(executor, name).await.unwrap();
        }
    }
    driver
        .create_table(
            executor,
            table,
            "id",
            &[
                ColumnDef::new("code", "string:16"),
                ColumnDef::new("parent_id", "relation"),
            ],
            &[IndexDef::unique(["code"])],
            &[],
        )
        .await
        .expect("Failed to create the scratch table");
    driver
        .add_column(
            executor,
            table,
            &[
                ColumnDef::new("note", "text:tiny"),
                ColumnDef::new("weight", "float"),
            ],
        )
        .await
        .expect("Failed to add the columns");
    driver
        .rename_column(executor, table, &ColumnDef::new("note", "text:tiny"), "remark")
        .await
        .expect("Failed to rename the column");
    driver
        .drop_column(executor, table, &["weight"])
        .await
        .expect("Failed to drop the column");
    driver
        .drop_index(executor, table, &["keel_scratch__code_key"])
        .await
        .expect("Failed to drop the index");
    driver
        .add_index(
            executor,
            table,
            &[IndexDef::unique(["code", "remark"]).named("keel_scratch_pair")],
        )
        .await
        .expect("Failed to add the index");
    let error = driver
        .add_index(executor, table, &[IndexDef::new("fulltext", ["remark"])])
        .await
        .expect_err("Only primary and unique indexes are supported");
    assert!(error.downcast_ref::<Unsupported>().is_some());
    driver
        .truncate_table(executor, table)
        .await
        .expect("Failed to truncate the table");
    driver
        .rename_table(executor, table, renamed)
        .await
        .expect("Failed to rename the table");
    assert!(!driver.exists_table(executor, table).await.unwrap());
    assert!(driver.exists_table(executor, renamed).await.unwrap());
    driver
        .drop_table(executor, renamed)
        .await
        .expect("Failed to drop the table");
    assert!(!driver.exists_table(executor, renamed).await.unwrap());
}
