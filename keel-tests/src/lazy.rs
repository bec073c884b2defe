use crate::{BLOG, blog_entity, reset_blog};
use keel::{Driver, Executor, FindOptions, NotFound, Related, Value};
use std::sync::LazyLock;
use tokio::sync::Mutex;

pub async fn lazy<E: Executor>(executor: &mut E) {
    static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));
    let _lock = MUTEX.lock().await;
    let driver = executor.driver().clone();
    reset_blog(executor)
        .await
        .expect("Failed to reset the blog tables");

    let mut post = blog_entity("Post", &[("title", "Lazy".into())]);
    post.set_related("author", blog_entity("Author", &[("name", "Barbara".into())]))
        .expect("Should assign the author");
    post.save(executor).await.expect("Failed to save the post");
    let mut orphan = blog_entity("Post", &[("title", "Orphan".into())]);
    orphan.save(executor).await.expect("Failed to save the post");

    let mut loaded = driver
        .find_by_column(
            executor,
            &BLOG.entity_type("Post"),
            "title",
            "Lazy".into(),
            FindOptions::default(),
        )
        .await
        .expect("Failed to query the post")
        .expect("The post should be found");
    assert!(loaded.cached("author").is_none());
    assert!(loaded.has("author.name"));
    let name = loaded
        .read(executor, "author.name")
        .await
        .expect("Should read through the author")
        .into_value()
        .expect("The name is a value");
    assert_eq!(name, Value::from("Barbara"));
    assert!(loaded.cached("author").is_some());

    // Writes go to the cached author, persisted relations are saved on their own
    loaded
        .write("author.name", Value::from("Barbara L."))
        .expect("Should write into the author");
    let Some(Related::One(Some(author))) = loaded.cached("author").cloned() else {
        panic!("The author should be cached");
    };
    author
        .lock()
        .await
        .save(executor)
        .await
        .expect("Failed to save the author");
    loaded.forget("author");
    let name = loaded
        .read(executor, "author.name")
        .await
        .expect("Should read through the author")
        .into_value()
        .expect("The name is a value");
    assert_eq!(name, Value::from("Barbara L."));

    // The author of the orphan is missing
    let mut orphan = driver
        .find_by_column(
            executor,
            &BLOG.entity_type("Post"),
            "title",
            "Orphan".into(),
            FindOptions::default(),
        )
        .await
        .expect("Failed to query the post")
        .expect("The post should be found");
    let author = orphan
        .read(executor, "author")
        .await
        .expect("Should read the author")
        .into_one()
        .expect("The author is a single entity");
    assert!(author.is_none());
    let error = orphan
        .read(executor, "author.name")
        .await
        .expect_err("There is no author to read from");
    assert!(error.downcast_ref::<NotFound>().is_some());
}
