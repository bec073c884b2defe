#![allow(dead_code)]
use keel::{
    ColumnDef, Entity, EntityDef, EntityType, RelationDef, Schema, Value, mock::MockConnection,
};
use std::sync::Arc;

/// Authors write posts and have an avatar, posts are tagged.
pub fn schema() -> Arc<Schema> {
    Schema::builder()
        .entity(
            EntityDef::new("Author")
                .column(ColumnDef::new("name", "string"))
                .relation(RelationDef::has_many("posts", "Post"))
                .relation(RelationDef::has_one("avatar", "Image")),
        )
        .entity(
            EntityDef::new("Post")
                .column(ColumnDef::new("id", "pk"))
                .column(ColumnDef::new("title", "string"))
                .column(ColumnDef::new("views", "int").default(0))
                .relation(RelationDef::belongs_to("author", "Author"))
                .relation(RelationDef::many_to_many("tags", "Tag")),
        )
        .entity(EntityDef::new("Tag").column(ColumnDef::new("name", "string:64")))
        .entity(EntityDef::new("Image").column(ColumnDef::new("url", "string")))
        .build()
        .expect("The blog schema should be valid")
}

pub fn connection() -> MockConnection {
    MockConnection::new()
}

/// An entity as if it was just loaded: persisted, with the given values.
pub fn persisted(ty: &EntityType, values: &[(&str, Value)]) -> Entity {
    let mut entity = ty.create();
    for (name, value) in values {
        entity
            .set(name, value.clone())
            .expect("Should set the value");
    }
    entity.set_persisted(true);
    entity
}

pub fn transient(ty: &EntityType, values: &[(&str, Value)]) -> Entity {
    let mut entity = ty.create();
    for (name, value) in values {
        entity
            .set(name, value.clone())
            .expect("Should set the value");
    }
    entity
}
