use crate::{Error, Params, Result, Value};

pub fn separated_by<T, F>(
    out: &mut String,
    values: impl IntoIterator<Item = T>,
    mut f: F,
    separator: &str,
) where
    F: FnMut(&mut String, T),
{
    let mut len = out.len();
    for v in values {
        if out.len() > len {
            out.push_str(separator);
        }
        len = out.len();
        f(out, v);
    }
}

/// Whether the name can be used as a SQL identifier and as a `:name` placeholder.
pub fn is_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Rewrites `:name` placeholders into the positional form produced by `placeholder`.
///
/// Quoted text (`'...'` and `"..."`) and `::` casts are copied untouched. A name used more than
/// once maps to the same position. Returns the rewritten statement and the values in positional
/// order, or an error if a placeholder has no bound value.
pub fn bind_positional(
    sql: &str,
    params: &Params,
    mut placeholder: impl FnMut(&mut String, usize),
) -> Result<(String, Vec<Value>)> {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut names: Vec<&str> = Vec::new();
    let mut values = Vec::new();
    let mut quote = None;
    let mut chars = sql.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => {
                quote = Some(c);
                out.push(c);
            }
            ':' if matches!(chars.peek(), Some((_, ':'))) => {
                chars.next();
                out.push_str("::");
            }
            ':' => {
                let rest = &sql[i + 1..];
                let len = rest
                    .char_indices()
                    .take_while(|(j, c)| {
                        c.is_ascii_alphabetic() || *c == '_' || (*j > 0 && c.is_ascii_digit())
                    })
                    .count();
                if len == 0 {
                    out.push(':');
                    continue;
                }
                let name = &rest[..len];
                for _ in 0..len {
                    chars.next();
                }
                let position = match names.iter().position(|v| *v == name) {
                    Some(position) => position,
                    None => {
                        let value = params.get(name).ok_or_else(|| {
                            Error::msg(format!("No value bound to the placeholder `:{name}`"))
                        })?;
                        names.push(name);
                        values.push(value.clone());
                        names.len() - 1
                    }
                };
                placeholder(&mut out, position + 1);
            }
            _ => out.push(c),
        }
    }
    Ok((out, values))
}

#[macro_export]
macro_rules! truncate_long {
    ($query:expr) => {
        format_args!(
            "{}{}\n",
            &$query[..::std::cmp::min($query.len(), 497)].trim_end(),
            if $query.len() > 497 { "..." } else { "" },
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write;

    fn dollar(out: &mut String, i: usize) {
        let _ = write!(out, "${}", i);
    }

    #[test]
    fn identifiers() {
        assert!(is_identifier("author_id"));
        assert!(is_identifier("_hidden2"));
        assert!(!is_identifier("2fast"));
        assert!(!is_identifier("white space"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn positional_placeholders() {
        let mut params = Params::new();
        params.insert("id", 7);
        params.insert(":title", "it's");
        let (sql, values) = bind_positional(
            r#"SELECT ':id', "a:b" FROM t WHERE "id" = :id::bigint AND title = :title OR "id" > :id"#,
            &params,
            dollar,
        )
        .expect("Should bind");
        assert_eq!(
            sql,
            r#"SELECT ':id', "a:b" FROM t WHERE "id" = $1::bigint AND title = $2 OR "id" > $1"#
        );
        assert_eq!(values, [Value::Int32(Some(7)), Value::Varchar(Some("it's".into()))]);
    }

    #[test]
    fn missing_placeholder_value() {
        let params = Params::new();
        let error = bind_positional("SELECT * FROM t WHERE a = :a", &params, dollar)
            .expect_err("Should fail without a value for :a");
        assert!(error.to_string().contains(":a"));
    }
}
