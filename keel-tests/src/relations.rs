use crate::{BLOG, blog_entity, reset_blog};
use keel::{AsValue, Driver, Entity, Executor, FindOptions, Related, Value};
use std::sync::LazyLock;
use tokio::sync::Mutex;

static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub async fn belongs_to<E: Executor>(executor: &mut E) {
    let _lock = MUTEX.lock().await;
    let driver = executor.driver().clone();
    reset_blog(executor)
        .await
        .expect("Failed to reset the blog tables");

    let mut post = blog_entity("Post", &[("title", "Owned".into())]);
    post.set_related("author", blog_entity("Author", &[("name", "Grace".into())]))
        .expect("Should assign the author");
    post.save(executor).await.expect("Failed to save the post");

    let Some(Related::One(Some(author))) = post.cached("author") else {
        panic!("The author should still be cached");
    };
    let author_id = {
        let author = author.lock().await;
        assert!(author.is_persisted());
        author.pk().cloned().expect("The author should have a key")
    };
    assert_eq!(post.get("author_id").unwrap(), author_id);

    let found = driver
        .find_all_by_column(
            executor,
            &BLOG.entity_type("Post"),
            "author_id",
            author_id,
            FindOptions::default(),
        )
        .await
        .expect("Failed to find the posts of the author");
    assert_eq!(found.len(), 1);
    assert_eq!(found.get(0).unwrap().get("title").unwrap(), Value::from("Owned"));
}

pub async fn has_many<E: Executor>(executor: &mut E) {
    let _lock = MUTEX.lock().await;
    let driver = executor.driver().clone();
    reset_blog(executor)
        .await
        .expect("Failed to reset the blog tables");

    let mut author = blog_entity("Author", &[("name", "Linus".into())]);
    author
        .set_related(
            "posts",
            ["Alpha", "Beta", "Gamma"]
                .into_iter()
                .map(|v| blog_entity("Post", &[("title", v.into())]))
                .collect::<Vec<_>>(),
        )
        .expect("Should assign the posts");
    author
        .save(executor)
        .await
        .expect("Failed to save the author");
    let author_id = author.pk().cloned().expect("The author should have a key");
    {
        let Some(Related::Many(posts)) = author.cached("posts") else {
            panic!("The posts should still be cached");
        };
        let posts = posts.lock().await;
        assert!(posts.iter().all(Entity::is_persisted));
        assert!(
            posts
                .iter()
                .all(|v| v.get("author_id").unwrap() == author_id)
        );
    }
    assert_eq!(
        driver
            .count_all_by_column(
                executor,
                &BLOG.entity_type("Post"),
                "author_id",
                author_id.clone(),
                FindOptions::default(),
            )
            .await
            .expect("Failed to count the posts of the author"),
        3
    );

    // Saving again updates the members, nothing new
    author
        .save(executor)
        .await
        .expect("Failed to save the author again");
    assert_eq!(
        driver
            .count_all(executor, &BLOG.entity_type("Post"), FindOptions::default())
            .await
            .expect("Failed to count the posts"),
        3
    );

    // A fresh copy loads the posts lazily
    let mut loaded = driver
        .find_by_column(
            executor,
            &BLOG.entity_type("Author"),
            "id",
            author_id,
            FindOptions::default(),
        )
        .await
        .expect("Failed to query the author")
        .expect("The author should be found");
    let posts = loaded
        .read(executor, "posts")
        .await
        .expect("Should read the posts")
        .into_many()
        .expect("The posts are a collection");
    let posts = posts.lock().await;
    let mut titles = posts
        .iter()
        .map(|v| String::try_from_value(v.get("title").unwrap()).unwrap())
        .collect::<Vec<_>>();
    titles.sort();
    assert_eq!(titles, ["Alpha", "Beta", "Gamma"]);
}

pub async fn many_to_many<E: Executor>(executor: &mut E) {
    let _lock = MUTEX.lock().await;
    let driver = executor.driver().clone();
    reset_blog(executor)
        .await
        .expect("Failed to reset the blog tables");

    let mut rust = blog_entity("Tag", &[("name", "rust".into())]);
    rust.save(executor).await.expect("Failed to save the tag");
    let mut post = blog_entity("Post", &[("title", "Tagged".into())]);
    post.set_related(
        "tags",
        vec![
            rust,
            blog_entity("Tag", &[("name", "sql".into())]),
            blog_entity("Tag", &[("name", "orm".into())]),
        ],
    )
    .expect("Should assign the tags");
    post.save(executor).await.expect("Failed to save the post");
    assert_eq!(
        driver
            .count_all(executor, &BLOG.entity_type("Tag"), FindOptions::default())
            .await
            .expect("Failed to count the tags"),
        3
    );

    let mut copy = driver
        .find_by_column(
            executor,
            &BLOG.entity_type("Post"),
            "id",
            post.pk().cloned().expect("The post should have a key"),
            FindOptions::default(),
        )
        .await
        .expect("Failed to query the post")
        .expect("The post should be found");
    let names = async |executor: &mut E, copy: &mut Entity| {
        let tags = copy
            .read(executor, "tags")
            .await
            .expect("Should read the tags")
            .into_many()
            .expect("The tags are a collection");
        let tags = tags.lock().await;
        let mut names = tags
            .iter()
            .map(|v| String::try_from_value(v.get("name").unwrap()).unwrap())
            .collect::<Vec<_>>();
        names.sort();
        names
    };
    assert_eq!(
        names(executor, &mut copy).await,
        ["orm", "rust", "sql"]
    );

    // Replaced by the new set on save
    post.set_related("tags", vec![blog_entity("Tag", &[("name", "db".into())])])
        .expect("Should assign the tags");
    post.save(executor).await.expect("Failed to save the post");
    copy.forget("tags");
    assert_eq!(names(executor, &mut copy).await, ["db"]);

    // Emptied
    post.set_related("tags", Vec::<Entity>::new())
        .expect("Should assign the tags");
    post.save(executor).await.expect("Failed to save the post");
    copy.forget("tags");
    assert!(names(executor, &mut copy).await.is_empty());
}
