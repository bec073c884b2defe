mod blog;

#[cfg(test)]
mod tests {
    use crate::blog::{connection, persisted, schema, transient};
    use keel::{Collection, NotFound, Params, Property, Related, Value};

    #[tokio::test]
    async fn lazy_singular_relation() {
        let schema = schema();
        let mut connection = connection();
        connection.push_rows(&["id", "name"], vec![vec![5_i64.into(), "Ann".into()]]);
        let mut post = persisted(
            &schema.entity_type("Post"),
            &[("id", 1_i64.into()), ("author_id", 5_i64.into())],
        );
        assert!(post.cached("author").is_none());

        let name = post
            .read(&mut connection, "author.name")
            .await
            .expect("Should read through the author")
            .into_value()
            .expect("The name is a value");
        assert_eq!(name, Value::from("Ann"));
        assert_eq!(connection.fetch_count(), 1);
        assert_eq!(
            connection.queries()[0].sql,
            "SELECT *\nFROM \"authors\"\nWHERE \"id\" = :id\nLIMIT 1"
        );
        assert_eq!(connection.queries()[0].params, Params::new().with("id", 5_i64));

        // Cached from now on
        let author = post
            .read(&mut connection, "author")
            .await
            .expect("Should read the author")
            .into_one()
            .expect("The author is a single entity")
            .expect("The author exists");
        assert!(author.lock().await.is_persisted());
        let _ = post
            .read(&mut connection, "author.name")
            .await
            .expect("Should read through the author");
        assert_eq!(connection.fetch_count(), 1);

        // Until forgotten
        connection.push_rows(&["id", "name"], vec![vec![5_i64.into(), "Ann B.".into()]]);
        assert!(post.forget("author").is_some());
        let name = post
            .read(&mut connection, "author.name")
            .await
            .expect("Should read through the author")
            .into_value()
            .expect("The name is a value");
        assert_eq!(name, Value::from("Ann B."));
        assert_eq!(connection.fetch_count(), 2);
    }

    #[tokio::test]
    async fn lazy_has_one() {
        let schema = schema();
        let author_type = schema.entity_type("Author");
        let mut connection = connection();
        connection.push_rows(&["id", "url"], vec![vec![8_i64.into(), "ann.png".into()]]);
        let mut author = persisted(
            &author_type,
            &[("id", 2_i64.into()), ("avatar_id", 8_i64.into())],
        );
        let url = author
            .read(&mut connection, "avatar.url")
            .await
            .expect("Should read through the avatar")
            .into_value()
            .expect("The url is a value");
        assert_eq!(url, Value::from("ann.png"));
        assert_eq!(
            connection.queries()[0].sql,
            "SELECT *\nFROM \"images\"\nWHERE \"id\" = :id\nLIMIT 1"
        );
        assert_eq!(connection.queries()[0].params, Params::new().with("id", 8_i64));

        // Without a link there is nothing to load
        let mut author = persisted(&author_type, &[("id", 3_i64.into())]);
        let avatar = author
            .read(&mut connection, "avatar")
            .await
            .expect("Should read the avatar")
            .into_one()
            .expect("The avatar is a single entity");
        assert!(avatar.is_none());
        assert_eq!(connection.fetch_count(), 1);
    }

    #[tokio::test]
    async fn unset_link() {
        let schema = schema();
        let mut connection = connection();
        let mut post = persisted(&schema.entity_type("Post"), &[("id", 1_i64.into())]);
        let author = post
            .read(&mut connection, "author")
            .await
            .expect("Should read the author")
            .into_one()
            .expect("The author is a single entity");
        assert!(author.is_none());
        assert_eq!(connection.fetch_count(), 0);

        let error = post
            .read(&mut connection, "author.name")
            .await
            .expect_err("There is no author to read from");
        assert!(error.downcast_ref::<NotFound>().is_some());
    }

    #[tokio::test]
    async fn has_many() {
        let schema = schema();
        let author_type = schema.entity_type("Author");
        let mut connection = connection();
        connection.push_rows(
            &["id", "title", "views", "author_id"],
            vec![
                vec![1_i64.into(), "One".into(), 3_i32.into(), 2_i64.into()],
                vec![2_i64.into(), "Two".into(), 0_i32.into(), 2_i64.into()],
            ],
        );
        let mut author = persisted(&author_type, &[("id", 2_i64.into())]);
        let posts = author
            .read(&mut connection, "posts")
            .await
            .expect("Should read the posts")
            .into_many()
            .expect("The posts are a collection");
        {
            let posts = posts.lock().await;
            assert_eq!(posts.len(), 2);
            assert!(posts.iter().all(|p| p.is_persisted()));
            assert_eq!(
                posts.get(1).unwrap().get("title").unwrap(),
                Value::from("Two")
            );
        }
        assert_eq!(
            connection.queries()[0].sql,
            "SELECT *\nFROM \"posts\"\nWHERE \"author_id\" = :author_id"
        );
        assert_eq!(
            connection.queries()[0].params,
            Params::new().with("author_id", 2_i64)
        );

        // A transient owner has nothing stored yet
        let mut author = transient(&author_type, &[]);
        let posts = author
            .read(&mut connection, "posts")
            .await
            .expect("Should read the posts")
            .into_many()
            .expect("The posts are a collection");
        assert!(posts.lock().await.is_empty());
        assert_eq!(connection.fetch_count(), 1);
    }

    #[tokio::test]
    async fn many_to_many() {
        let schema = schema();
        let mut connection = connection();
        connection.push_rows(
            &["id", "name"],
            vec![vec![1_i64.into(), "rust".into()], vec![2_i64.into(), "orm".into()]],
        );
        let mut post = persisted(&schema.entity_type("Post"), &[("id", 7_i64.into())]);
        let related = post
            .related(&mut connection, "tags")
            .await
            .expect("Should load the tags");
        let Related::Many(tags) = related else {
            panic!("Tags are a collection");
        };
        assert_eq!(tags.lock().await.len(), 2);
        assert_eq!(
            connection.queries()[0].sql,
            "SELECT *\nFROM \"tags\"\nWHERE \"id\" IN (SELECT \"tag_id\" FROM \"posts_to_tags\" WHERE \"post_id\" = :post_id)"
        );
        assert_eq!(
            connection.queries()[0].params,
            Params::new().with("post_id", 7_i64)
        );
    }

    #[tokio::test]
    async fn unknown_property() {
        let schema = schema();
        let mut connection = connection();
        let mut post = transient(&schema.entity_type("Post"), &[]);
        let error = post
            .read(&mut connection, "nonexistent")
            .await
            .expect_err("Should not read an unknown property");
        let not_found = error
            .downcast_ref::<NotFound>()
            .expect("The error should be NotFound");
        assert_eq!(not_found.entity, "Post");
        assert_eq!(not_found.property, "nonexistent");
        assert!(post.get("nonexistent").is_err());
        assert!(!post.has("nonexistent"));
        assert_eq!(connection.queries().len(), 0);
    }

    #[tokio::test]
    async fn presence_and_empty_values() {
        let schema = schema();
        let mut connection = connection();
        let mut post = transient(&schema.entity_type("Post"), &[]);
        assert!(post.has("title"));
        assert!(post.has("author"));
        assert!(post.has("author.name"));
        assert!(post.has("author_id"));
        assert_eq!(post.get("views").unwrap(), Value::Int32(None));
        assert_eq!(
            post.read(&mut connection, "title")
                .await
                .unwrap()
                .into_value()
                .unwrap(),
            Value::Varchar(None)
        );
        assert!(post.get("author").is_err(), "Relations are read with `read`");
        post.set("extra", 1_i32).expect("Raw values can be set");
        assert!(post.has("extra"));
    }

    #[tokio::test]
    async fn write_relations() {
        let schema = schema();
        let author_type = schema.entity_type("Author");
        let mut post = transient(&schema.entity_type("Post"), &[]);

        assert!(post.set_related("author", Collection::new()).is_err());
        assert!(
            post.set_related("tags", transient(&schema.entity_type("Tag"), &[]))
                .is_err()
        );
        assert!(
            post.write("author.name", Property::Value("Bea".into())).is_err(),
            "Nothing cached to write into"
        );

        post.set_related("author", transient(&author_type, &[("name", "Ann".into())]))
            .expect("Should assign the author");
        post.write("author.name", Value::from("Bea"))
            .expect("Should write into the author");
        let Some(Related::One(Some(author))) = post.cached("author") else {
            panic!("The author should be cached");
        };
        assert_eq!(
            author.lock().await.get("name").unwrap(),
            Value::from("Bea")
        );

        post.set_related("author", None::<keel::Entity>)
            .expect("Should clear the author");
        assert!(matches!(post.cached("author"), Some(Related::One(None))));
    }
}
