use crate::{Error, Result, Value};
use std::any;
use time::{Date, PrimitiveDateTime, Time};

/// Conversion between native Rust types and the dynamically typed [`Value`].
///
/// Integer conversions accept any integer variant and fail when the stored number does not fit
/// the requested type.
///
/// # Examples
/// ```rust
/// use keel_core::{AsValue, Value};
/// let v = 42i32.as_value();
/// assert!(matches!(v, Value::Int32(Some(42))));
/// let n: i64 = AsValue::try_from_value(v).unwrap();
/// assert_eq!(n, 42);
/// ```
pub trait AsValue {
    /// The typed null for this type.
    fn as_empty_value() -> Value;
    fn as_value(self) -> Value;
    fn try_from_value(value: Value) -> Result<Self>
    where
        Self: Sized;
}

impl<T: AsValue> From<T> for Value {
    fn from(value: T) -> Self {
        value.as_value()
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Varchar(Some(value.into()))
    }
}

fn mismatch<T>(value: &Value) -> Error {
    Error::msg(format!(
        "Cannot convert value {:?} into {}",
        value,
        any::type_name::<T>()
    ))
}

macro_rules! impl_as_value_integer {
    ($source:ty, $destination:path, $widened:ty) => {
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                $destination(None)
            }
            fn as_value(self) -> Value {
                $destination(Some(self as $widened))
            }
            fn try_from_value(value: Value) -> Result<Self> {
                let converted = match &value {
                    Value::Int32(Some(v)) => <$source>::try_from(*v).ok(),
                    Value::Int64(Some(v)) => <$source>::try_from(*v).ok(),
                    _ => return Err(mismatch::<Self>(&value)),
                };
                converted.ok_or_else(|| {
                    Error::msg(format!(
                        "Value {:?} is out of range for {}",
                        value,
                        any::type_name::<Self>()
                    ))
                })
            }
        }
    };
}

impl_as_value_integer!(i16, Value::Int32, i32);
impl_as_value_integer!(u16, Value::Int32, i32);
impl_as_value_integer!(i32, Value::Int32, i32);
impl_as_value_integer!(u32, Value::Int64, i64);
impl_as_value_integer!(i64, Value::Int64, i64);

macro_rules! impl_as_value {
    ($source:ty, $destination:path $(, $pat_rest:pat => $expr_rest:expr)* $(,)?) => {
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                $destination(None)
            }
            fn as_value(self) -> Value {
                $destination(Some(self.into()))
            }
            fn try_from_value(value: Value) -> Result<Self> {
                match value {
                    $destination(Some(v)) => Ok(v.into()),
                    $($pat_rest => $expr_rest,)*
                    _ => Err(mismatch::<Self>(&value)),
                }
            }
        }
    };
}

impl_as_value!(bool, Value::Boolean);
impl_as_value!(
    f64,
    Value::Float64,
    Value::Int32(Some(v)) => Ok(v as f64),
    Value::Int64(Some(v)) => Ok(v as f64),
);
impl_as_value!(String, Value::Varchar);
impl_as_value!(Date, Value::Date);
impl_as_value!(Time, Value::Time);
impl_as_value!(PrimitiveDateTime, Value::Timestamp);

impl AsValue for f32 {
    fn as_empty_value() -> Value {
        Value::Float64(None)
    }
    fn as_value(self) -> Value {
        Value::Float64(Some(self as f64))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        f64::try_from_value(value).map(|v| v as f32)
    }
}

impl<T: AsValue> AsValue for Option<T> {
    fn as_empty_value() -> Value {
        T::as_empty_value()
    }
    fn as_value(self) -> Value {
        match self {
            Some(v) => v.as_value(),
            None => T::as_empty_value(),
        }
    }
    fn try_from_value(value: Value) -> Result<Self> {
        if value.is_null() {
            return Ok(None);
        }
        T::try_from_value(value).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn integers() {
        assert_eq!(Value::from(7u32), Value::Int64(Some(7)));
        assert_eq!(i16::try_from_value(Value::Int64(Some(-3))).unwrap(), -3);
        assert!(u16::try_from_value(Value::Int32(Some(-1))).is_err());
        assert!(i32::try_from_value(Value::Varchar(Some("1".into()))).is_err());
    }

    #[test]
    fn options() {
        assert_eq!(None::<String>.as_value(), Value::Varchar(None));
        assert_eq!(
            Option::<i64>::try_from_value(Value::Int64(None)).unwrap(),
            None
        );
        assert_eq!(
            Option::<i64>::try_from_value(Value::Int32(Some(12))).unwrap(),
            Some(12)
        );
        let stamp = datetime!(2025-01-02 03:04:05);
        assert_eq!(
            PrimitiveDateTime::try_from_value(Value::from(stamp)).unwrap(),
            stamp
        );
    }
}
