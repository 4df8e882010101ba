use super::{Adapter, Data, Value};
use crate::{Error, Result};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::sync::Arc;

/// Types a [`Value`] can hold exactly, for `is`/`get` access.
pub trait Native: Sized + 'static {
    fn native(value: &Value) -> Option<&Self>;
}

macro_rules! native {
    ($t:ty, $variant:ident) => {
        impl Native for $t {
            fn native(value: &Value) -> Option<&Self> {
                match value.data() {
                    Data::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

native!(bool, Boolean);
native!(char, Character);
native!(i64, Integer);
native!(f64, Floating);
native!(String, Text);
native!(NaiveDateTime, Datetime);

impl Value {
    /// True if this value holds exactly a `T`.
    pub fn is<T: Native>(&self) -> bool {
        T::native(self).is_some()
    }

    /// The payload, if it is exactly a `T`.
    pub fn get<T: Native>(&self) -> Option<&T> {
        T::native(self)
    }

    /// The payload of a host object, if it is a `T`.
    pub fn downcast_ref<T: Adapter + 'static>(&self) -> Option<&T> {
        match self.data() {
            Data::Object(a) => a.as_any().downcast_ref(),
            _ => None,
        }
    }

    /// Convert to `T`: an exact match is returned as is, anything else
    /// goes through the textual form.
    pub fn to<T: Native + Clone + FromStr>(&self) -> Result<T> {
        if let Some(exact) = T::native(self) {
            return Ok(exact.clone());
        }
        let conversion = || Error::conversion(self.type_name(), std::any::type_name::<T>());
        self.to_text()?.trim().parse().map_err(|_| conversion())
    }
}

impl From<Data> for Value {
    fn from(data: Data) -> Value {
        Value::new(data)
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Value {
        Value::unit()
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Value {
        Value::new(Data::Boolean(b))
    }
}

impl From<char> for Value {
    fn from(c: char) -> Value {
        Value::new(Data::Character(c))
    }
}

macro_rules! integral {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(n: $t) -> Value {
                Value::new(Data::Integer(i64::from(n)))
            }
        })*
    };
}

integral!(i8, i16, i32, i64, u8, u16, u32);

macro_rules! wide_integral {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(n: $t) -> Value {
                match i64::try_from(n) {
                    Ok(i) => Value::new(Data::Integer(i)),
                    Err(_) => Value::new(Data::Floating(n as f64)),
                }
            }
        })*
    };
}

wide_integral!(u64, isize, usize);

impl From<f32> for Value {
    fn from(f: f32) -> Value {
        Value::new(Data::Floating(f64::from(f)))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Value {
        Value::new(Data::Floating(f))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::new(Data::Text(s.to_string()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Value {
        Value::new(Data::Text(s))
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Value {
        Value::new(Data::Text(s.clone()))
    }
}

impl From<NaiveDateTime> for Value {
    fn from(d: NaiveDateTime) -> Value {
        Value::new(Data::Datetime(d))
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Value {
        Value::new(Data::Datetime(NaiveDateTime::from(d)))
    }
}

impl From<Arc<dyn Adapter>> for Value {
    fn from(a: Arc<dyn Adapter>) -> Value {
        Value::new(Data::Object(a))
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Value {
        Value::sequence(items.into_iter().map(Into::into))
    }
}

impl<T: Clone + Into<Value>> From<&[T]> for Value {
    fn from(items: &[T]) -> Value {
        Value::sequence(items.iter().cloned().map(Into::into))
    }
}

impl<K: Into<String>, V: Into<Value>> From<BTreeMap<K, V>> for Value {
    fn from(map: BTreeMap<K, V>) -> Value {
        Value::mapping(map.into_iter().map(|(k, v)| (k.into(), v.into())))
    }
}

impl<K: Into<String>, V: Into<Value>, S> From<HashMap<K, V, S>> for Value {
    fn from(map: HashMap<K, V, S>) -> Value {
        Value::mapping(map.into_iter().map(|(k, v)| (k.into(), v.into())))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Value {
        v.map_or_else(Value::unit, Into::into)
    }
}

impl FromIterator<Value> for Value {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Value {
        Value::sequence(iter)
    }
}

impl FromIterator<(String, Value)> for Value {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Value {
        Value::mapping(iter)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Debug)]
    struct Point(i32, i32);

    impl Adapter for Point {
        fn type_name(&self) -> &'static str {
            "point"
        }
        fn capabilities(&self) -> crate::value::Capabilities {
            crate::value::Capabilities::SEQUENTIAL
        }
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
        fn get_range(&self) -> Option<Vec<Value>> {
            Some(vec![self.0.into(), self.1.into()])
        }
        fn attribute(&self, key: &Value) -> Option<Value> {
            match key.to_text().ok()?.as_str() {
                "x" => Some(self.0.into()),
                "y" => Some(self.1.into()),
                _ => None,
            }
        }
    }

    #[test]
    fn exact_types() {
        let v = Value::from("foo");
        assert!(v.is::<String>());
        assert!(!v.is::<i64>());
        assert_eq!(v.get::<String>().map(String::as_str), Some("foo"));
        assert_eq!(Value::from(42).get::<i64>(), Some(&42));
        assert_eq!(Value::from(true).get::<bool>(), Some(&true));
    }

    #[test]
    fn to_goes_through_text() {
        assert_eq!(Value::from("17").to::<i64>().unwrap(), 17);
        assert_eq!(Value::from(17).to::<String>().unwrap(), "17");
        assert!(matches!(
            Value::from("x").to::<i64>(),
            Err(Error::Conversion { from: "text", .. }),
        ));
    }

    #[test]
    fn host_objects() {
        let v = Value::object(Point(3, 4));
        assert_eq!(v.type_name(), "point");
        assert_eq!(v.to_string(), "3, 4");
        assert_eq!(v.must_get_trail("y").unwrap().to_string(), "4");
        assert_eq!(v.downcast_ref::<Point>().map(|p| p.0), Some(3));
        assert!(v.is_iterable());
    }

    #[test]
    fn options_and_maps() {
        assert!(Value::from(None::<i32>).is_unit());
        assert_eq!(Value::from(Some(5)).to_string(), "5");
        let mut m = HashMap::new();
        m.insert("b", 2);
        m.insert("a", 1);
        assert_eq!(Value::from(m).to_string(), "a: 1, b: 2");
    }
}
