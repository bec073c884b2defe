use crate::{BLOG, blog_entity, reset_blog};
use keel::{Driver, Executor, FindOptions, Value};
use std::sync::LazyLock;
use time::macros::{date, datetime};
use tokio::sync::Mutex;

pub async fn simple<E: Executor>(executor: &mut E) {
    static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));
    let _lock = MUTEX.lock().await;
    let driver = executor.driver().clone();
    let post_type = BLOG.entity_type("Post");

    // Setup
    reset_blog(executor)
        .await
        .expect("Failed to reset the blog tables");

    // Insert
    let mut post = blog_entity(
        "Post",
        &[
            ("title", "Hello world!".into()),
            ("body", "Lorem ipsum".into()),
            ("rating", 4.5_f64.into()),
            ("published", true.into()),
            ("published_at", datetime!(2025-03-14 15:09:26).into()),
        ],
    );
    post.save(executor).await.expect("Failed to save the post");
    assert!(post.is_persisted());
    let id = post.pk().cloned().expect("The post should have a key");
    assert!(matches!(id, Value::Int64(Some(..))));

    // Read back
    let found = driver
        .find_by_column(executor, &post_type, "id", id.clone(), FindOptions::default())
        .await
        .expect("Failed to query the post")
        .expect("The post should be found");
    assert!(found.is_persisted());
    assert_eq!(found.get("title").unwrap(), Value::from("Hello world!"));
    assert_eq!(found.get("body").unwrap(), Value::from("Lorem ipsum"));
    assert_eq!(found.get("views").unwrap(), Value::Int32(Some(0)));
    assert_eq!(found.get("rating").unwrap(), Value::Float64(Some(4.5)));
    assert_eq!(found.get("published").unwrap(), Value::Boolean(Some(true)));
    assert_eq!(
        found.get("published_at").unwrap(),
        Value::from(datetime!(2025-03-14 15:09:26))
    );
    assert_eq!(found.get("author_id").unwrap(), Value::Int64(Some(0)));

    // Update
    post.set("views", 10_i32).unwrap();
    post.set("title", "Hello again").unwrap();
    post.save(executor).await.expect("Failed to update the post");
    post.save(executor)
        .await
        .expect("Failed to save the post a second time");
    let count = driver
        .count_all(executor, &post_type, FindOptions::default())
        .await
        .expect("Failed to count the posts");
    assert_eq!(count, 1);
    let found = driver
        .find_by_column(executor, &post_type, "id", id.clone(), FindOptions::default())
        .await
        .expect("Failed to query the post")
        .expect("The post should be found");
    assert_eq!(found.get("title").unwrap(), Value::from("Hello again"));
    assert_eq!(found.get("views").unwrap(), Value::Int32(Some(10)));

    // Many
    for (i, title) in ["First", "Second", "Third", "Fourth"].into_iter().enumerate() {
        let mut post = blog_entity(
            "Post",
            &[("title", title.into()), ("views", (i as i32 * 100).into())],
        );
        post.save(executor).await.expect("Failed to save the post");
    }
    let popular = driver
        .find_all(
            executor,
            &post_type,
            FindOptions::new()
                .filter("\"views\" >= :min")
                .param("min", 100_i32)
                .order("\"views\" DESC")
                .limit(2)
                .offset(1),
        )
        .await
        .expect("Failed to find the popular posts");
    let titles = popular
        .iter()
        .map(|v| v.get("title").unwrap())
        .collect::<Vec<_>>();
    assert_eq!(titles, [Value::from("Third"), Value::from("Second")]);
    assert_eq!(
        driver
            .count_all(
                executor,
                &post_type,
                FindOptions::new()
                    .filter("\"views\" >= :min")
                    .param("min", 100_i32)
            )
            .await
            .expect("Failed to count the popular posts"),
        3
    );

    // Authors have dates
    let mut author = blog_entity(
        "Author",
        &[("name", "Ada".into()), ("born", date!(1815 - 12 - 10).into())],
    );
    author.save(executor).await.expect("Failed to save the author");
    let found = driver
        .find_by_column(
            executor,
            &BLOG.entity_type("Author"),
            "name",
            "Ada".into(),
            FindOptions::default(),
        )
        .await
        .expect("Failed to query the author")
        .expect("The author should be found");
    assert_eq!(found.get("born").unwrap(), Value::from(date!(1815 - 12 - 10)));

    // Delete
    post.delete(executor).await.expect("Failed to delete the post");
    assert!(post.is_transient());
    assert!(
        driver
            .find_by_column(executor, &post_type, "id", id, FindOptions::default())
            .await
            .expect("Failed to query the post")
            .is_none()
    );
    assert_eq!(
        driver
            .count_all(executor, &post_type, FindOptions::default())
            .await
            .expect("Failed to count the posts"),
        4
    );
}
