use keel_core::{ColumnDef, ColumnType, SqlWriter, TextSize};
use std::fmt::Write;

pub struct PostgresSqlWriter {}

impl SqlWriter for PostgresSqlWriter {
    fn write_column_type(&self, out: &mut String, column_type: &ColumnType) {
        match column_type {
            ColumnType::PrimaryKey => out.push_str("BIGSERIAL PRIMARY KEY"),
            ColumnType::Link => out.push_str("BIGINT NOT NULL DEFAULT 0"),
            ColumnType::Boolean => out.push_str("BOOLEAN"),
            ColumnType::Int => out.push_str("INTEGER"),
            ColumnType::Float => out.push_str("DOUBLE PRECISION"),
            ColumnType::Text(TextSize::Tiny) => out.push_str("VARCHAR(255)"),
            ColumnType::Text(..) => out.push_str("TEXT"),
            ColumnType::DateTime => out.push_str("TIMESTAMP"),
            ColumnType::Date => out.push_str("DATE"),
            ColumnType::Time => out.push_str("TIME"),
            ColumnType::Char(..) => {
                let _ = write!(out, "CHAR({})", column_type.length().unwrap_or_default());
            }
            ColumnType::String(..) => {
                let _ = write!(
                    out,
                    "VARCHAR({}) NOT NULL",
                    column_type.length().unwrap_or_default()
                );
            }
        }
    }

    fn write_column_definition(&self, out: &mut String, column: &ColumnDef) {
        self.write_identifier_quoted(out, &column.name);
        out.push(' ');
        self.write_column_type(out, &column.column_type);
        // No unsigned integers
        if column.column_type == ColumnType::Link {
            out.push_str(" CHECK (");
            self.write_identifier_quoted(out, &column.name);
            out.push_str(" >= 0)");
        }
    }

    fn write_exists_table(&self, out: &mut String) {
        out.push_str("SELECT COUNT(*) FROM pg_tables WHERE tablename = ");
        self.write_placeholder(out, "table");
        out.push(';');
    }

    fn write_insert_returning(&self, out: &mut String, primary_key: &str) {
        out.push_str(" RETURNING ");
        self.write_identifier_quoted(out, primary_key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use keel_core::{ColumnDef, IndexDef};

    const WRITER: PostgresSqlWriter = PostgresSqlWriter {};

    #[test]
    fn create_table() {
        let mut out = String::new();
        WRITER
            .write_create_table(
                &mut out,
                "posts",
                "id",
                &[
                    ColumnDef::new("title", "string:80"),
                    ColumnDef::new("score", "float"),
                    ColumnDef::new("summary", "text:tiny"),
                    ColumnDef::new("published_at", "datetime"),
                    ColumnDef::new("author_id", "relation"),
                ],
                &[IndexDef::unique(["title"])],
            )
            .expect("Failed to write the table");
        assert_eq!(
            out,
            indoc! {r#"
                CREATE TABLE "posts" (
                "id" BIGSERIAL PRIMARY KEY,
                "title" VARCHAR(80) NOT NULL,
                "score" DOUBLE PRECISION,
                "summary" VARCHAR(255),
                "published_at" TIMESTAMP,
                "author_id" BIGINT NOT NULL DEFAULT 0 CHECK ("author_id" >= 0),
                CONSTRAINT "posts__title_key" UNIQUE ("title")
                );"#}
        );
    }

    #[test]
    fn insert_returning() {
        let mut out = String::new();
        WRITER.write_insert(&mut out, "posts", &["title"], "id");
        assert_eq!(
            out,
            r#"INSERT INTO "posts" ("title") VALUES (:title) RETURNING "id";"#
        );
        out.clear();
        WRITER.write_insert(&mut out, "tags", &[], "id");
        assert_eq!(out, r#"INSERT INTO "tags" DEFAULT VALUES RETURNING "id";"#);
    }

    #[test]
    fn exists_table() {
        let mut out = String::new();
        WRITER.write_exists_table(&mut out);
        assert_eq!(
            out,
            "SELECT COUNT(*) FROM pg_tables WHERE tablename = :table;"
        );
    }
}
