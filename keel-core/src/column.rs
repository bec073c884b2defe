use crate::{AsValue, Value};
use std::{
    convert::Infallible,
    fmt::{self, Display},
    str::FromStr,
};

/// Size class of a `text` column.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextSize {
    Tiny,
    Medium,
    Long,
    #[default]
    Default,
}

/// Logical type of a declared column.
///
/// The type alone decides the DDL a column produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// Auto-generated 64-bit identity.
    PrimaryKey,
    /// Non-negative 64-bit foreign key, `0` when unset. Gets a lookup index.
    Link,
    Boolean,
    Int,
    Float,
    Text(TextSize),
    DateTime,
    Date,
    Time,
    /// Fixed length string, 255 when no length is given.
    Char(Option<u32>),
    /// Variable length string, 255 when no length is given.
    String(Option<u32>),
}

impl ColumnType {
    pub const DEFAULT_LENGTH: u32 = 255;

    /// Parse a type tag such as `"pk"`, `"text:medium"` or `"string:64"`.
    ///
    /// Unknown tags are treated as `string`.
    pub fn parse(tag: &str) -> ColumnType {
        let (name, argument) = match tag.split_once(':') {
            Some((name, argument)) => (name.trim(), Some(argument.trim())),
            None => (tag.trim(), None),
        };
        let length = argument.and_then(|v| v.parse::<u32>().ok());
        match name.to_ascii_lowercase().as_str() {
            "pk" => ColumnType::PrimaryKey,
            "relation" | "link" => ColumnType::Link,
            "boolean" | "bool" => ColumnType::Boolean,
            "int" | "integer" => ColumnType::Int,
            "float" => ColumnType::Float,
            "text" => ColumnType::Text(match argument.map(str::to_ascii_lowercase).as_deref() {
                Some("tiny" | "small") => TextSize::Tiny,
                Some("medium") => TextSize::Medium,
                Some("long" | "big") => TextSize::Long,
                _ => TextSize::Default,
            }),
            "datetime" => ColumnType::DateTime,
            "date" => ColumnType::Date,
            "time" => ColumnType::Time,
            "char" => ColumnType::Char(length),
            _ => ColumnType::String(length),
        }
    }

    /// Declared length, for `char` and `string`.
    pub fn length(&self) -> Option<u32> {
        match self {
            ColumnType::Char(len) | ColumnType::String(len) => {
                Some(len.unwrap_or(Self::DEFAULT_LENGTH))
            }
            _ => None,
        }
    }

    /// The typed null returned when reading a declared column that has no value.
    pub fn empty_value(&self) -> Value {
        match self {
            ColumnType::PrimaryKey | ColumnType::Link => i64::as_empty_value(),
            ColumnType::Boolean => bool::as_empty_value(),
            ColumnType::Int => i32::as_empty_value(),
            ColumnType::Float => f64::as_empty_value(),
            ColumnType::Text(..) | ColumnType::Char(..) | ColumnType::String(..) => {
                String::as_empty_value()
            }
            ColumnType::DateTime => Value::Timestamp(None),
            ColumnType::Date => Value::Date(None),
            ColumnType::Time => Value::Time(None),
        }
    }
}

impl FromStr for ColumnType {
    type Err = Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ColumnType::parse(s))
    }
}

impl From<&str> for ColumnType {
    fn from(value: &str) -> Self {
        ColumnType::parse(value)
    }
}

impl Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::PrimaryKey => f.write_str("pk"),
            ColumnType::Link => f.write_str("link"),
            ColumnType::Boolean => f.write_str("boolean"),
            ColumnType::Int => f.write_str("int"),
            ColumnType::Float => f.write_str("float"),
            ColumnType::Text(TextSize::Tiny) => f.write_str("text:tiny"),
            ColumnType::Text(TextSize::Medium) => f.write_str("text:medium"),
            ColumnType::Text(TextSize::Long) => f.write_str("text:long"),
            ColumnType::Text(TextSize::Default) => f.write_str("text"),
            ColumnType::DateTime => f.write_str("datetime"),
            ColumnType::Date => f.write_str("date"),
            ColumnType::Time => f.write_str("time"),
            ColumnType::Char(None) => f.write_str("char"),
            ColumnType::Char(Some(len)) => write!(f, "char:{}", len),
            ColumnType::String(None) => f.write_str("string"),
            ColumnType::String(Some(len)) => write!(f, "string:{}", len),
        }
    }
}

/// Declared column of an entity type.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: ColumnType,
    /// Value written on save when the entity has no value of its own.
    pub default: Option<Value>,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, column_type: impl Into<ColumnType>) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
            default: None,
        }
    }
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn is_primary_key(&self) -> bool {
        self.column_type == ColumnType::PrimaryKey
    }
    pub fn is_link(&self) -> bool {
        self.column_type == ColumnType::Link
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_tags() {
        assert_eq!(ColumnType::parse("pk"), ColumnType::PrimaryKey);
        assert_eq!(ColumnType::parse("relation"), ColumnType::Link);
        assert_eq!(ColumnType::parse("link"), ColumnType::Link);
        assert_eq!(
            ColumnType::parse("text:medium"),
            ColumnType::Text(TextSize::Medium)
        );
        assert_eq!(ColumnType::parse("text"), ColumnType::Text(TextSize::Default));
        assert_eq!(ColumnType::parse("string:64"), ColumnType::String(Some(64)));
        assert_eq!(ColumnType::parse("char"), ColumnType::Char(None));
        assert_eq!(ColumnType::parse("decimal"), ColumnType::String(None));
        assert_eq!(ColumnType::parse("string").length(), Some(255));
        assert_eq!(ColumnType::Int.length(), None);
    }

    #[test]
    fn display_round_trip() {
        for tag in ["pk", "link", "text:long", "char:3", "string", "datetime"] {
            assert_eq!(ColumnType::parse(tag).to_string(), tag);
        }
    }

    #[test]
    fn empty_values() {
        assert_eq!(ColumnType::Link.empty_value(), Value::Int64(None));
        assert_eq!(ColumnType::Int.empty_value(), Value::Int32(None));
        assert_eq!(
            ColumnType::Text(TextSize::Long).empty_value(),
            Value::Varchar(None)
        );
        assert_eq!(ColumnType::DateTime.empty_value(), Value::Timestamp(None));
    }

    #[test]
    fn column_default() {
        let column = ColumnDef::new("views", "int").default(0);
        assert_eq!(column.column_type, ColumnType::Int);
        assert_eq!(column.default, Some(Value::Int32(Some(0))));
    }
}
