mod blog;

#[cfg(test)]
mod tests {
    use crate::blog::{connection, schema};
    use indoc::indoc;
    use keel::{
        ColumnDef, Driver, EntityDef, FindOptions, IndexDef, IndexKind, Params, QueryBuilder,
        RelationDef, Schema, Unsupported, Value, mock::MockDriver,
    };

    const DRIVER: MockDriver = MockDriver;

    #[tokio::test]
    async fn create_table_injects_primary_key() {
        let schema = Schema::builder()
            .entity(EntityDef::new("Author").column(ColumnDef::new("name", "string")))
            .entity(
                EntityDef::new("Post")
                    .column(ColumnDef::new("title", "string:120"))
                    .column(ColumnDef::new("body", "text:medium"))
                    .index(IndexDef::unique(["title"]))
                    .relation(RelationDef::belongs_to("author", "Author")),
            )
            .build()
            .expect("The schema should be valid");
        let mut connection = connection();
        DRIVER
            .create_entity_table(&mut connection, &schema.entity_type("Post"))
            .await
            .expect("Failed to create the table");
        assert_eq!(
            connection.statements(),
            [
                indoc! {r#"
                    CREATE TABLE "posts" (
                    "id" BIGSERIAL PRIMARY KEY,
                    "title" VARCHAR(120) NOT NULL,
                    "body" MEDIUMTEXT,
                    "author_id" BIGINT UNSIGNED NOT NULL DEFAULT 0,
                    CONSTRAINT "posts__title_key" UNIQUE ("title")
                    );"#},
                r#"CREATE INDEX "posts__author_id_idx" ON "posts" ("author_id");"#,
            ]
        );
    }

    #[tokio::test]
    async fn create_table_declared_primary_key() {
        let mut connection = connection();
        DRIVER
            .create_table(
                &mut connection,
                "pairs",
                "id",
                &[
                    ColumnDef::new("uid", "pk"),
                    ColumnDef::new("left", "int"),
                    ColumnDef::new("left", "int"),
                    ColumnDef::new("right", "int"),
                ],
                &[IndexDef::unique(["left", "right"]).named("unique_pair")],
                &[],
            )
            .await
            .expect("Failed to create the table");
        assert_eq!(
            connection.statements(),
            [indoc! {r#"
                CREATE TABLE "pairs" (
                "uid" BIGSERIAL PRIMARY KEY,
                "left" INT,
                "right" INT,
                CONSTRAINT "unique_pair" UNIQUE ("left", "right")
                );"#}]
        );
    }

    #[tokio::test]
    async fn unsupported_index_kind() {
        let mut connection = connection();
        let error = DRIVER
            .create_table(
                &mut connection,
                "documents",
                "id",
                &[ColumnDef::new("body", "text")],
                &[IndexDef::new("fulltext", ["body"])],
                &[],
            )
            .await
            .expect_err("Only primary and unique indexes are supported");
        assert!(error.downcast_ref::<Unsupported>().is_some());
        assert!(connection.queries().is_empty());

        let error = DRIVER
            .add_index(
                &mut connection,
                "documents",
                &[IndexDef::new(IndexKind::Other("spatial".into()), ["body"])],
            )
            .await
            .expect_err("Only primary and unique indexes are supported");
        assert!(error.downcast_ref::<Unsupported>().is_some());
        assert!(connection.queries().is_empty());
    }

    #[tokio::test]
    async fn junction_table() {
        let schema = schema();
        let mut connection = connection();
        for junction in schema.junctions() {
            DRIVER
                .create_junction_table(&mut connection, junction)
                .await
                .expect("Failed to create the junction table");
        }
        assert_eq!(
            connection.statements(),
            [
                indoc! {r#"
                    CREATE TABLE "posts_to_tags" (
                    "id" BIGSERIAL PRIMARY KEY,
                    "post_id" BIGINT UNSIGNED NOT NULL DEFAULT 0,
                    "tag_id" BIGINT UNSIGNED NOT NULL DEFAULT 0
                    );"#},
                r#"CREATE INDEX "posts_to_tags__post_id_idx" ON "posts_to_tags" ("post_id");"#,
                r#"CREATE INDEX "posts_to_tags__tag_id_idx" ON "posts_to_tags" ("tag_id");"#,
            ]
        );
    }

    #[tokio::test]
    async fn alter_statements() {
        let mut connection = connection();
        DRIVER
            .rename_table(&mut connection, "posts", "articles")
            .await
            .unwrap();
        DRIVER
            .truncate_table(&mut connection, "articles")
            .await
            .unwrap();
        DRIVER
            .add_column(
                &mut connection,
                "articles",
                &[
                    ColumnDef::new("subtitle", "string:80"),
                    ColumnDef::new("published", "boolean"),
                ],
            )
            .await
            .unwrap();
        DRIVER
            .rename_column(
                &mut connection,
                "articles",
                &ColumnDef::new("subtitle", "string:80"),
                "summary",
            )
            .await
            .unwrap();
        DRIVER
            .drop_column(&mut connection, "articles", &["summary", "published"])
            .await
            .unwrap();
        DRIVER
            .add_index(&mut connection, "articles", &[IndexDef::unique(["title"])])
            .await
            .unwrap();
        DRIVER
            .drop_index(&mut connection, "articles", &["articles__title_key"])
            .await
            .unwrap();
        DRIVER
            .drop_table(&mut connection, "articles")
            .await
            .unwrap();
        assert_eq!(
            connection.statements(),
            [
                r#"ALTER TABLE "posts" RENAME TO "articles";"#,
                r#"TRUNCATE TABLE "articles";"#,
                r#"ALTER TABLE "articles" ADD COLUMN "subtitle" VARCHAR(80) NOT NULL, ADD COLUMN "published" BOOLEAN;"#,
                r#"ALTER TABLE "articles" RENAME COLUMN "subtitle" TO "summary";"#,
                r#"ALTER TABLE "articles" DROP COLUMN "summary", DROP COLUMN "published";"#,
                r#"ALTER TABLE "articles" ADD CONSTRAINT "articles__title_key" UNIQUE ("title");"#,
                r#"ALTER TABLE "articles" DROP CONSTRAINT "articles__title_key";"#,
                r#"DROP TABLE "articles";"#,
            ]
        );
    }

    #[tokio::test]
    async fn exists_table() {
        let mut connection = connection();
        connection.push_rows(&["count"], vec![vec![1_i64.into()]]);
        connection.push_rows(&["count"], vec![vec![0_i64.into()]]);
        assert!(DRIVER.exists_table(&mut connection, "posts").await.unwrap());
        assert!(!DRIVER.exists_table(&mut connection, "nope").await.unwrap());
        assert_eq!(
            connection.queries()[0].sql,
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = :table;"
        );
        assert_eq!(
            connection.queries()[1].params,
            Params::new().with("table", "nope")
        );
    }

    #[tokio::test]
    async fn insert_returns_key() {
        let mut connection = connection();
        connection.set_next_id("posts", 42);
        let key = DRIVER
            .insert(
                &mut connection,
                "posts",
                "id",
                vec![("title".into(), "Raw".into())],
            )
            .await
            .expect("Failed to insert");
        assert_eq!(key, Some(Value::Int64(Some(42))));
    }

    #[tokio::test]
    async fn finders() {
        let schema = schema();
        let post_type = schema.entity_type("Post");
        let mut connection = connection();
        connection.push_rows(
            &["id", "title"],
            vec![vec![1_i64.into(), "A".into()], vec![2_i64.into(), "B".into()]],
        );
        connection.push_empty();
        connection.push_rows(&["id", "title"], vec![vec![3_i64.into(), "C".into()]]);

        let all = DRIVER
            .find_all(
                &mut connection,
                &post_type,
                FindOptions::new().order("\"title\" DESC").limit(10).offset(20),
            )
            .await
            .expect("Failed to find all the posts");
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|p| p.is_persisted()));

        let none = DRIVER
            .find_by_column(
                &mut connection,
                &post_type,
                "title",
                "Z".into(),
                FindOptions::default(),
            )
            .await
            .expect("Failed to find by title");
        assert!(none.is_none());

        let found = DRIVER
            .find_all_by_column(
                &mut connection,
                &post_type,
                "author_id",
                2_i64.into(),
                FindOptions::new()
                    .filter("\"views\" > :min")
                    .param("min", 10_i32)
                    .order("\"id\""),
            )
            .await
            .expect("Failed to find by author");
        assert_eq!(found.len(), 1);
        assert_eq!(found.get(0).unwrap().pk(), Some(&Value::Int64(Some(3))));

        let queries = connection.queries();
        assert_eq!(
            queries[0].sql,
            "SELECT *\nFROM \"posts\"\nORDER BY \"title\" DESC\nLIMIT 10\nOFFSET 20"
        );
        assert_eq!(
            queries[1].sql,
            "SELECT *\nFROM \"posts\"\nWHERE \"title\" = :title\nLIMIT 1"
        );
        assert_eq!(
            queries[2].sql,
            indoc! {r#"
                SELECT *
                FROM "posts"
                WHERE "author_id" = :author_id AND ("views" > :min)
                ORDER BY "id""#}
        );
        assert_eq!(
            queries[2].params,
            Params::new().with("author_id", 2_i64).with("min", 10_i32)
        );
    }

    #[tokio::test]
    async fn find_by_query() {
        let schema = schema();
        let tag_type = schema.entity_type("Tag");
        let mut connection = connection();
        connection.push_rows(&["id", "name"], vec![vec![9_i64.into(), "rust".into()]]);
        let tag = DRIVER
            .find_by_query(
                &mut connection,
                &tag_type,
                QueryBuilder::new()
                    .from("\"tags\"")
                    .filter("\"name\" LIKE :pattern")
                    .param("pattern", "ru%"),
            )
            .await
            .expect("Failed to run the query")
            .expect("The tag should be found");
        assert_eq!(tag.get("name").unwrap(), Value::from("rust"));
        assert!(tag.is_persisted());
        assert_eq!(
            connection.queries()[0].sql,
            "SELECT *\nFROM \"tags\"\nWHERE \"name\" LIKE :pattern\nLIMIT 1"
        );
    }

    #[tokio::test]
    async fn counts() {
        let schema = schema();
        let post_type = schema.entity_type("Post");
        let mut connection = connection();
        connection.push_rows(&["count"], vec![vec![12_i64.into()]]);
        connection.push_rows(&["count"], vec![vec![3_i64.into()]]);
        let total = DRIVER
            .count_all(&mut connection, &post_type, FindOptions::default())
            .await
            .expect("Failed to count the posts");
        assert_eq!(total, 12);
        let by_author = DRIVER
            .count_all_by_column(
                &mut connection,
                &post_type,
                "author_id",
                2_i64.into(),
                FindOptions::new().order("\"id\"").limit(1),
            )
            .await
            .expect("Failed to count the posts of the author");
        assert_eq!(by_author, 3);
        assert_eq!(
            connection.statements(),
            [
                "SELECT COUNT(*)\nFROM \"posts\"",
                "SELECT COUNT(*)\nFROM \"posts\"\nWHERE \"author_id\" = :author_id",
            ]
        );
    }

    #[tokio::test]
    async fn invalid_column_name() {
        let schema = schema();
        let mut connection = connection();
        let result = DRIVER
            .find_by_column(
                &mut connection,
                &schema.entity_type("Post"),
                "id; DROP TABLE posts",
                1_i64.into(),
                FindOptions::default(),
            )
            .await;
        assert!(result.is_err());
        assert!(connection.queries().is_empty());
    }
}
