use crate::{
    ColumnDef, ColumnType, IndexDef, IndexKind, JunctionDef, Result, TextSize, Unsupported,
    separated_by,
};
use std::{collections::HashSet, fmt::Write};

/// Dialect printer turning schema definitions and persistence operations into SQL text.
///
/// Values never end up in the text: every value is a `:name` placeholder bound by the caller.
/// The default implementations produce the reference dialect, drivers override what differs.
pub trait SqlWriter: Send + Sync {
    /// Escape occurrences of `search` char with `replace` while copying into buffer.
    fn write_escaped(&self, out: &mut String, value: &str, search: char, replace: &str) {
        let mut position = 0;
        for (i, c) in value.char_indices() {
            if c == search {
                out.push_str(&value[position..i]);
                out.push_str(replace);
                position = i + c.len_utf8();
            }
        }
        out.push_str(&value[position..]);
    }

    /// Quote identifiers ("name") doubling inner quotes.
    fn write_identifier_quoted(&self, out: &mut String, value: &str) {
        out.push('"');
        self.write_escaped(out, value, '"', "\"\"");
        out.push('"');
    }

    fn quoted(&self, value: &str) -> String {
        let mut out = String::with_capacity(value.len() + 2);
        self.write_identifier_quoted(&mut out, value);
        out
    }

    fn write_placeholder(&self, out: &mut String, name: &str) {
        out.push(':');
        out.push_str(name);
    }

    /// Render the SQL type of a column.
    fn write_column_type(&self, out: &mut String, column_type: &ColumnType) {
        match column_type {
            ColumnType::PrimaryKey => out.push_str("BIGSERIAL PRIMARY KEY"),
            ColumnType::Link => out.push_str("BIGINT UNSIGNED NOT NULL DEFAULT 0"),
            ColumnType::Boolean => out.push_str("BOOLEAN"),
            ColumnType::Int => out.push_str("INT"),
            ColumnType::Float => out.push_str("FLOAT"),
            ColumnType::Text(TextSize::Tiny) => out.push_str("TINYTEXT"),
            ColumnType::Text(TextSize::Medium) => out.push_str("MEDIUMTEXT"),
            ColumnType::Text(TextSize::Long) => out.push_str("LONGTEXT"),
            ColumnType::Text(TextSize::Default) => out.push_str("TEXT"),
            ColumnType::DateTime => out.push_str("DATETIME"),
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

    /// Render `"name" TYPE`.
    fn write_column_definition(&self, out: &mut String, column: &ColumnDef) {
        self.write_identifier_quoted(out, &column.name);
        out.push(' ');
        self.write_column_type(out, &column.column_type);
    }

    /// Render a named `PRIMARY KEY` or `UNIQUE` constraint.
    fn write_index_definition(&self, out: &mut String, table: &str, index: &IndexDef) -> Result<()> {
        let keyword = match &index.kind {
            IndexKind::Primary => "PRIMARY KEY",
            IndexKind::Unique => "UNIQUE",
            IndexKind::Other(kind) => {
                return Err(Unsupported(format!(
                    "index kind `{}` (index on {} of table `{}`)",
                    kind,
                    index.columns.join(", "),
                    table
                ))
                .into());
            }
        };
        out.push_str("CONSTRAINT ");
        self.write_identifier_quoted(out, &index.resolved_name(table));
        let _ = write!(out, " {} (", keyword);
        separated_by(
            out,
            &index.columns,
            |out, v| self.write_identifier_quoted(out, v),
            ", ",
        );
        out.push(')');
        Ok(())
    }

    /// Emit CREATE TABLE.
    ///
    /// A primary key column named `primary_key` comes first when no column is `pk`-typed.
    /// Repeated fragments are written once.
    fn write_create_table(
        &self,
        out: &mut String,
        table: &str,
        primary_key: &str,
        columns: &[ColumnDef],
        indexes: &[IndexDef],
    ) -> Result<()> {
        let mut fragments = Vec::with_capacity(columns.len() + indexes.len() + 1);
        if !columns.iter().any(ColumnDef::is_primary_key) {
            let mut fragment = String::new();
            self.write_column_definition(
                &mut fragment,
                &ColumnDef::new(primary_key, ColumnType::PrimaryKey),
            );
            fragments.push(fragment);
        }
        for column in columns {
            let mut fragment = String::new();
            self.write_column_definition(&mut fragment, column);
            fragments.push(fragment);
        }
        for index in indexes {
            let mut fragment = String::new();
            self.write_index_definition(&mut fragment, table, index)?;
            fragments.push(fragment);
        }
        let mut seen = HashSet::new();
        fragments.retain(|v| seen.insert(v.clone()));
        out.reserve(32 + fragments.iter().map(|v| v.len() + 2).sum::<usize>());
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("CREATE TABLE ");
        self.write_identifier_quoted(out, table);
        out.push_str(" (\n");
        separated_by(out, &fragments, |out, v| out.push_str(v), ",\n");
        out.push_str("\n);");
        Ok(())
    }

    /// Emit the lookup index of a link column.
    fn write_create_link_index(&self, out: &mut String, table: &str, column: &str) {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("CREATE INDEX ");
        self.write_identifier_quoted(out, &format!("{}__{}_idx", table, column));
        out.push_str(" ON ");
        self.write_identifier_quoted(out, table);
        out.push_str(" (");
        self.write_identifier_quoted(out, column);
        out.push_str(");");
    }

    /// Emit a query counting the tables named `:table`.
    fn write_exists_table(&self, out: &mut String) {
        out.push_str("SELECT COUNT(*) FROM information_schema.tables WHERE table_name = ");
        self.write_placeholder(out, "table");
        out.push(';');
    }

    fn write_rename_table(&self, out: &mut String, table: &str, new_name: &str) {
        out.push_str("ALTER TABLE ");
        self.write_identifier_quoted(out, table);
        out.push_str(" RENAME TO ");
        self.write_identifier_quoted(out, new_name);
        out.push(';');
    }

    fn write_truncate_table(&self, out: &mut String, table: &str) {
        out.push_str("TRUNCATE TABLE ");
        self.write_identifier_quoted(out, table);
        out.push(';');
    }

    fn write_drop_table(&self, out: &mut String, table: &str) {
        out.push_str("DROP TABLE ");
        self.write_identifier_quoted(out, table);
        out.push(';');
    }

    fn write_add_columns(&self, out: &mut String, table: &str, columns: &[ColumnDef]) {
        out.push_str("ALTER TABLE ");
        self.write_identifier_quoted(out, table);
        out.push(' ');
        separated_by(
            out,
            columns,
            |out, v| {
                out.push_str("ADD COLUMN ");
                self.write_column_definition(out, v);
            },
            ", ",
        );
        out.push(';');
    }

    fn write_drop_columns(&self, out: &mut String, table: &str, columns: &[&str]) {
        out.push_str("ALTER TABLE ");
        self.write_identifier_quoted(out, table);
        out.push(' ');
        separated_by(
            out,
            columns,
            |out, v| {
                out.push_str("DROP COLUMN ");
                self.write_identifier_quoted(out, v);
            },
            ", ",
        );
        out.push(';');
    }

    /// Rename a column. `column` is its current definition, for dialects that restate the type.
    fn write_rename_column(&self, out: &mut String, table: &str, column: &ColumnDef, new_name: &str) {
        out.push_str("ALTER TABLE ");
        self.write_identifier_quoted(out, table);
        out.push_str(" RENAME COLUMN ");
        self.write_identifier_quoted(out, &column.name);
        out.push_str(" TO ");
        self.write_identifier_quoted(out, new_name);
        out.push(';');
    }

    fn write_add_indexes(&self, out: &mut String, table: &str, indexes: &[IndexDef]) -> Result<()> {
        let mut clauses = Vec::with_capacity(indexes.len());
        for index in indexes {
            let mut clause = String::from("ADD ");
            self.write_index_definition(&mut clause, table, index)?;
            clauses.push(clause);
        }
        out.push_str("ALTER TABLE ");
        self.write_identifier_quoted(out, table);
        out.push(' ');
        separated_by(out, &clauses, |out, v| out.push_str(v), ", ");
        out.push(';');
        Ok(())
    }

    fn write_drop_indexes(&self, out: &mut String, table: &str, names: &[&str]) {
        out.push_str("ALTER TABLE ");
        self.write_identifier_quoted(out, table);
        out.push(' ');
        separated_by(
            out,
            names,
            |out, v| {
                out.push_str("DROP CONSTRAINT ");
                self.write_identifier_quoted(out, v);
            },
            ", ",
        );
        out.push(';');
    }

    /// Emit INSERT binding each column to the placeholder of the same name.
    fn write_insert(&self, out: &mut String, table: &str, columns: &[&str], primary_key: &str) {
        out.reserve(32 + table.len() + columns.iter().map(|v| 2 * v.len() + 5).sum::<usize>());
        out.push_str("INSERT INTO ");
        self.write_identifier_quoted(out, table);
        if columns.is_empty() {
            out.push_str(" DEFAULT VALUES");
        } else {
            out.push_str(" (");
            separated_by(
                out,
                columns,
                |out, v| self.write_identifier_quoted(out, v),
                ", ",
            );
            out.push_str(") VALUES (");
            separated_by(out, columns, |out, v| self.write_placeholder(out, v), ", ");
            out.push(')');
        }
        self.write_insert_returning(out, primary_key);
        out.push(';');
    }

    /// Ask for the generated key of an INSERT, for dialects that can return it.
    fn write_insert_returning(&self, _out: &mut String, _primary_key: &str) {}

    /// Emit UPDATE of the row whose `primary_key` equals the placeholder of the same name.
    fn write_update(&self, out: &mut String, table: &str, columns: &[&str], primary_key: &str) {
        out.push_str("UPDATE ");
        self.write_identifier_quoted(out, table);
        out.push_str(" SET ");
        separated_by(
            out,
            columns,
            |out, v| {
                self.write_identifier_quoted(out, v);
                out.push_str(" = ");
                self.write_placeholder(out, v);
            },
            ", ",
        );
        out.push_str("\nWHERE ");
        self.write_column_filter(out, primary_key);
        out.push(';');
    }

    fn write_delete(&self, out: &mut String, table: &str, primary_key: &str) {
        out.push_str("DELETE FROM ");
        self.write_identifier_quoted(out, table);
        out.push_str("\nWHERE ");
        self.write_column_filter(out, primary_key);
        out.push(';');
    }

    /// Render `"column" = :column`.
    fn write_column_filter(&self, out: &mut String, column: &str) {
        self.write_identifier_quoted(out, column);
        out.push_str(" = ");
        self.write_placeholder(out, column);
    }

    /// Render the predicate selecting the targets linked to `:{this_column}`.
    fn write_junction_filter(&self, out: &mut String, primary_key: &str, junction: &JunctionDef) {
        self.write_identifier_quoted(out, primary_key);
        out.push_str(" IN (SELECT ");
        self.write_identifier_quoted(out, &junction.that_column);
        out.push_str(" FROM ");
        self.write_identifier_quoted(out, &junction.table);
        out.push_str(" WHERE ");
        self.write_column_filter(out, &junction.this_column);
        out.push(')');
    }

    /// Remove every pair of the owner bound to `:{this_column}`.
    fn write_junction_delete(&self, out: &mut String, junction: &JunctionDef) {
        out.push_str("DELETE FROM ");
        self.write_identifier_quoted(out, &junction.table);
        out.push_str("\nWHERE ");
        self.write_column_filter(out, &junction.this_column);
        out.push(';');
    }

    /// Insert `rows` pairs, the owner is `:{this_column}` and the targets `:{that_column}_{i}`.
    fn write_junction_insert(&self, out: &mut String, junction: &JunctionDef, rows: usize) {
        out.push_str("INSERT INTO ");
        self.write_identifier_quoted(out, &junction.table);
        out.push_str(" (");
        self.write_identifier_quoted(out, &junction.this_column);
        out.push_str(", ");
        self.write_identifier_quoted(out, &junction.that_column);
        out.push_str(") VALUES\n");
        separated_by(
            out,
            0..rows,
            |out, i| {
                out.push('(');
                self.write_placeholder(out, &junction.this_column);
                out.push_str(", ");
                self.write_placeholder(out, &format!("{}_{}", junction.that_column, i));
                out.push(')');
            },
            ",\n",
        );
        out.push(';');
    }
}

/// Writer of the reference dialect.
#[derive(Default, Debug, Clone, Copy)]
pub struct GenericSqlWriter;

impl GenericSqlWriter {
    pub const fn new() -> Self {
        Self {}
    }
}

impl SqlWriter for GenericSqlWriter {}

#[cfg(test)]
mod tests {
    use super::*;

    const WRITER: GenericSqlWriter = GenericSqlWriter::new();

    #[test]
    fn identifiers() {
        assert_eq!(WRITER.quoted("posts"), "\"posts\"");
        assert_eq!(WRITER.quoted("we\"ird"), "\"we\"\"ird\"");
        let mut out = String::new();
        WRITER.write_escaped(&mut out, "it's", '\'', "''");
        assert_eq!(out, "it''s");
    }

    #[test]
    fn column_types() {
        let render = |tag: &str| {
            let mut out = String::new();
            WRITER.write_column_type(&mut out, &ColumnType::parse(tag));
            out
        };
        assert_eq!(render("pk"), "BIGSERIAL PRIMARY KEY");
        assert_eq!(render("relation"), "BIGINT UNSIGNED NOT NULL DEFAULT 0");
        assert_eq!(render("text:small"), "TINYTEXT");
        assert_eq!(render("text:big"), "LONGTEXT");
        assert_eq!(render("text"), "TEXT");
        assert_eq!(render("char"), "CHAR(255)");
        assert_eq!(render("string:40"), "VARCHAR(40) NOT NULL");
        assert_eq!(render("whatever"), "VARCHAR(255) NOT NULL");
    }

    #[test]
    fn unsupported_index() {
        let mut out = String::new();
        let error = WRITER
            .write_index_definition(
                &mut out,
                "posts",
                &IndexDef::new(IndexKind::Other("fulltext".into()), ["title"]),
            )
            .expect_err("Only primary and unique indexes can be written");
        assert!(error.downcast_ref::<Unsupported>().is_some());
    }
}
