use crate::{BLOG, blog_entity, reset_blog};
use keel::{Connection, Driver, Executor, FindOptions, Transaction};
use std::sync::LazyLock;
use tokio::sync::Mutex;

#[allow(dead_code)]
pub async fn transaction<C: Connection>(connection: &mut C) {
    static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));
    let _lock = MUTEX.lock().await;
    let driver = connection.driver().clone();
    let tag_type = BLOG.entity_type("Tag");
    reset_blog(connection)
        .await
        .expect("Failed to reset the blog tables");

    // Rolled back
    let mut transaction = connection
        .begin()
        .await
        .expect("Could not begin a transaction");
    for name in ["one", "two"] {
        blog_entity("Tag", &[("name", name.into())])
            .save(&mut transaction)
            .await
            .expect("Failed to save the tag");
    }
    assert_eq!(
        driver
            .count_all(&mut transaction, &tag_type, FindOptions::default())
            .await
            .expect("Failed to count the tags"),
        2
    );
    transaction
        .rollback()
        .await
        .expect("Could not roll back the transaction");
    assert_eq!(
        driver
            .count_all(connection, &tag_type, FindOptions::default())
            .await
            .expect("Failed to count the tags"),
        0
    );

    // Committed
    let mut transaction = connection
        .begin()
        .await
        .expect("Could not begin a transaction");
    let mut tag = blog_entity("Tag", &[("name", "kept".into())]);
    tag.save(&mut transaction)
        .await
        .expect("Failed to save the tag");
    transaction
        .commit()
        .await
        .expect("Could not commit the transaction");
    assert!(tag.is_persisted());
    let found = driver
        .find_by_column(
            connection,
            &tag_type,
            "name",
            "kept".into(),
            FindOptions::default(),
        )
        .await
        .expect("Failed to query the tag")
        .expect("The tag should be found");
    assert_eq!(found.pk(), tag.pk());
}
