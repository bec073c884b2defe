use crate::{Error, Result};
use time::{Date, PrimitiveDateTime, Time};

/// Dynamically typed value of a column, a bound parameter or a decoded cell.
///
/// Every variant but `Null` carries an `Option`: `Value::Int32(None)` is a null that still knows
/// its type, which is what reading an unset declared column gives back.
#[derive(Default, Debug, Clone)]
pub enum Value {
    #[default]
    Null,
    Boolean(Option<bool>),
    Int32(Option<i32>),
    Int64(Option<i64>),
    Float64(Option<f64>),
    Varchar(Option<String>),
    Date(Option<Date>),
    Time(Option<Time>),
    Timestamp(Option<PrimitiveDateTime>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Boolean(l), Self::Boolean(r)) => l == r,
            (Self::Int32(l), Self::Int32(r)) => l == r,
            (Self::Int64(l), Self::Int64(r)) => l == r,
            (Self::Float64(l), Self::Float64(r)) => l == r,
            (Self::Varchar(l), Self::Varchar(r)) => l == r,
            (Self::Date(l), Self::Date(r)) => l == r,
            (Self::Time(l), Self::Time(r)) => l == r,
            (Self::Timestamp(l), Self::Timestamp(r)) => l == r,
            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }
}

impl Value {
    pub fn same_type(&self, other: &Self) -> bool {
        core::mem::discriminant(self) == core::mem::discriminant(other)
    }

    pub fn is_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Boolean(v) => v.is_none(),
            Value::Int32(v) => v.is_none(),
            Value::Int64(v) => v.is_none(),
            Value::Float64(v) => v.is_none(),
            Value::Varchar(v) => v.is_none(),
            Value::Date(v) => v.is_none(),
            Value::Time(v) => v.is_none(),
            Value::Timestamp(v) => v.is_none(),
        }
    }

    /// The typed null of the same variant.
    pub fn as_null(&self) -> Value {
        match self {
            Value::Null => Value::Null,
            Value::Boolean(..) => Value::Boolean(None),
            Value::Int32(..) => Value::Int32(None),
            Value::Int64(..) => Value::Int64(None),
            Value::Float64(..) => Value::Float64(None),
            Value::Varchar(..) => Value::Varchar(None),
            Value::Date(..) => Value::Date(None),
            Value::Time(..) => Value::Time(None),
            Value::Timestamp(..) => Value::Timestamp(None),
        }
    }

    /// Coerce into the variant of `target`, checking ranges.
    ///
    /// An untyped `Value::Null` target accepts anything unchanged. Used by drivers to adapt bound
    /// parameters to the types the database declares for them.
    pub fn try_as(self, target: &Value) -> Result<Value> {
        if self.same_type(target) || matches!(target, Value::Null) {
            return Ok(self);
        }
        if self.is_null() {
            return Ok(target.as_null());
        }
        let converted = match (&self, target) {
            (Value::Int32(Some(v)), Value::Int64(..)) => Some(Value::Int64(Some(*v as i64))),
            (Value::Int64(Some(v)), Value::Int32(..)) => {
                i32::try_from(*v).ok().map(|v| Value::Int32(Some(v)))
            }
            (Value::Int32(Some(v)), Value::Float64(..)) => Some(Value::Float64(Some(*v as f64))),
            (Value::Int64(Some(v)), Value::Float64(..)) => Some(Value::Float64(Some(*v as f64))),
            (Value::Float64(Some(v)), Value::Int64(..)) if v.fract() == 0.0 => {
                Some(Value::Int64(Some(*v as i64)))
            }
            (Value::Int32(Some(v)), Value::Varchar(..)) => Some(Value::Varchar(Some(v.to_string()))),
            (Value::Int64(Some(v)), Value::Varchar(..)) => Some(Value::Varchar(Some(v.to_string()))),
            (Value::Timestamp(Some(v)), Value::Date(..)) => Some(Value::Date(Some(v.date()))),
            (Value::Timestamp(Some(v)), Value::Time(..)) => Some(Value::Time(Some(v.time()))),
            (Value::Date(Some(v)), Value::Timestamp(..)) => {
                Some(Value::Timestamp(Some(v.midnight())))
            }
            _ => None,
        };
        converted.ok_or_else(|| {
            Error::msg(format!(
                "Cannot convert value {:?} into the type of {:?}",
                self, target
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn typed_nulls() {
        assert!(Value::Null.is_null());
        assert!(Value::Varchar(None).is_null());
        assert!(!Value::Boolean(Some(false)).is_null());
        assert_eq!(Value::Int32(None), Value::Int32(None));
        assert_ne!(Value::Int32(None), Value::Int64(None));
        assert_ne!(Value::Int32(None), Value::Null);
        assert_eq!(Value::Float64(Some(1.5)).as_null(), Value::Float64(None));
    }

    #[test]
    fn coercion() {
        assert_eq!(
            Value::Int32(Some(5)).try_as(&Value::Int64(None)).unwrap(),
            Value::Int64(Some(5))
        );
        assert!(
            Value::Int64(Some(i64::MAX))
                .try_as(&Value::Int32(None))
                .is_err()
        );
        assert_eq!(
            Value::Varchar(None).try_as(&Value::Int64(None)).unwrap(),
            Value::Int64(None)
        );
        assert_eq!(
            Value::Boolean(Some(true)).try_as(&Value::Null).unwrap(),
            Value::Boolean(Some(true))
        );
        assert_eq!(
            Value::Date(Some(date!(2024 - 02 - 29)))
                .try_as(&Value::Timestamp(None))
                .unwrap(),
            Value::Timestamp(Some(date!(2024 - 02 - 29).midnight()))
        );
        assert!(
            Value::Varchar(Some("x".into()))
                .try_as(&Value::Boolean(None))
                .is_err()
        );
    }
}
