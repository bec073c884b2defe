use keel::{ColumnDef, Driver, Entity, EntityDef, Executor, RelationDef, Result, Schema, Value};
use std::sync::{Arc, LazyLock};

/// Authors write posts, posts are tagged.
pub static BLOG: LazyLock<Arc<Schema>> = LazyLock::new(|| {
    Schema::builder()
        .entity(
            EntityDef::new("Author")
                .column(ColumnDef::new("name", "string:80"))
                .column(ColumnDef::new("born", "date"))
                .relation(RelationDef::has_many("posts", "Post")),
        )
        .entity(
            EntityDef::new("Post")
                .column(ColumnDef::new("title", "string"))
                .column(ColumnDef::new("body", "text"))
                .column(ColumnDef::new("views", "int").default(0))
                .column(ColumnDef::new("rating", "float"))
                .column(ColumnDef::new("published", "boolean"))
                .column(ColumnDef::new("published_at", "datetime"))
                .relation(RelationDef::belongs_to("author", "Author"))
                .relation(RelationDef::many_to_many("tags", "Tag")),
        )
        .entity(EntityDef::new("Tag").column(ColumnDef::new("name", "string:64")))
        .build()
        .expect("The blog schema should be valid")
});

/// Drop and create every table of the blog schema, junctions included.
pub async fn reset_blog<E: Executor>(executor: &mut E) -> Result<()> {
    let driver = executor.driver().clone();
    let junctions = BLOG.junctions();
    let tables = BLOG
        .entities()
        .map(|v| v.table_name())
        .chain(junctions.iter().map(|v| v.table.as_str()))
        .collect::<Vec<_>>();
    for table in tables {
        if driver.exists_table(executor, table).await? {
            driver.drop_table(executor, table).await?;
        }
    }
    for def in BLOG.entities() {
        driver
            .create_entity_table(executor, &BLOG.entity_type(def.name()))
            .await?;
    }
    for junction in junctions {
        driver.create_junction_table(executor, junction).await?;
    }
    Ok(())
}

/// A transient entity of the blog schema.
pub fn blog_entity(name: &str, values: &[(&str, Value)]) -> Entity {
    let mut entity = BLOG.entity_type(name).create();
    for (name, value) in values {
        entity
            .set(name, value.clone())
            .expect("Should set the value");
    }
    entity
}
