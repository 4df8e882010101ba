//! The value model shared by every dialect.
//!
//! A [`Value`] wraps one of a closed set of built-in shapes ([`Data`])
//! or a host object behind the [`Adapter`] trait, together with two
//! pieces of metadata: a safety flag (is the textual form already
//! escaped?) and an optional token (the source spelling that produced
//! the value).  What a value can do is described by its
//! [`Capabilities`], not by its concrete shape, so a boolean can take
//! part in arithmetic and a mapping can be iterated.
mod convert;

pub use self::convert::Native;

use crate::text::{escape_html, EscapingWriter};
use crate::{Error, Result};
use bitflags::bitflags;
use chrono::{Datelike, NaiveDateTime, Timelike};
use itertools::Itertools;
use std::any::Any;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::io::{self, Write};
use std::sync::Arc;

/// The textual form used for datetimes.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

bitflags! {
    /// What a value supports, as a queryable set.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Capabilities: u16 {
        const UNIT = 1 << 0;
        const BOOLEAN = 1 << 1;
        const CHARACTER = 1 << 2;
        const TEXTUAL = 1 << 3;
        const FLOATING = 1 << 4;
        const INTEGRAL = 1 << 5;
        const NUMERIC = 1 << 6;
        const CHRONOLOGIC = 1 << 7;
        const SEQUENTIAL = 1 << 8;
        const ASSOCIATIVE = 1 << 9;
        const CONTAINER = 1 << 10;
    }
}

/// A host value exposed to templates.
///
/// Implement this for types that should be usable in a context
/// without first being converted into one of the built-in shapes.
/// Every query has a default that answers "not supported", so an
/// implementation only provides what its capabilities promise.
pub trait Adapter: fmt::Debug + Send + Sync {
    fn type_name(&self) -> &'static str;
    fn capabilities(&self) -> Capabilities;
    fn as_any(&self) -> &dyn Any;

    fn get_boolean(&self) -> Option<bool> {
        None
    }
    fn get_number(&self) -> Option<f64> {
        None
    }
    fn get_string(&self) -> Option<String> {
        None
    }
    fn get_datetime(&self) -> Option<NaiveDateTime> {
        None
    }
    fn get_range(&self) -> Option<Vec<Value>> {
        None
    }
    fn attribute(&self, _key: &Value) -> Option<Value> {
        None
    }
    /// Compare with another adapter of the same concrete type.
    fn equal(&self, _other: &dyn Adapter) -> Option<bool> {
        None
    }
    /// Order against another adapter of the same concrete type.
    fn less(&self, _other: &dyn Adapter) -> Option<bool> {
        None
    }
}

/// The payload of a [`Value`].
#[derive(Clone, Debug, Default)]
pub enum Data {
    /// No payload at all; any data access fails.
    #[default]
    Uninitialized,
    Unit,
    Boolean(bool),
    Character(char),
    Integer(i64),
    Floating(f64),
    Text(String),
    Datetime(NaiveDateTime),
    Sequence(Arc<Vec<Value>>),
    Mapping(Arc<BTreeMap<String, Value>>),
    Object(Arc<dyn Adapter>),
}

#[derive(Clone, Debug, Default)]
pub struct Value {
    data: Data,
    safe: bool,
    token: Option<Arc<str>>,
}

impl Value {
    pub fn new(data: Data) -> Self {
        Value {
            data,
            safe: false,
            token: None,
        }
    }

    pub fn unit() -> Self {
        Value::new(Data::Unit)
    }

    pub fn object(adapter: impl Adapter + 'static) -> Self {
        Value::new(Data::Object(Arc::new(adapter)))
    }

    /// A number, kept integral when it has no fraction.
    pub fn from_number(n: f64) -> Self {
        const LIMIT: f64 = 9_007_199_254_740_992.0; // 2^53
        if n.fract() == 0.0 && n.abs() < LIMIT && !(n == 0.0 && n.is_sign_negative()) {
            Value::new(Data::Integer(n as i64))
        } else {
            Value::new(Data::Floating(n))
        }
    }

    pub fn sequence(items: impl IntoIterator<Item = Value>) -> Self {
        Value::new(Data::Sequence(Arc::new(items.into_iter().collect())))
    }

    pub fn mapping(items: impl IntoIterator<Item = (String, Value)>) -> Self {
        Value::new(Data::Mapping(Arc::new(items.into_iter().collect())))
    }

    pub fn data(&self) -> &Data {
        &self.data
    }

    fn initialized(&self) -> Result<&Data> {
        match self.data {
            Data::Uninitialized => Err(Error::Uninitialized),
            ref data => Ok(data),
        }
    }

    pub fn is_initialized(&self) -> bool {
        !matches!(self.data, Data::Uninitialized)
    }

    pub fn type_name(&self) -> &'static str {
        match &self.data {
            Data::Uninitialized => "uninitialized",
            Data::Unit => "none",
            Data::Boolean(_) => "boolean",
            Data::Character(_) => "character",
            Data::Integer(_) => "integer",
            Data::Floating(_) => "floating",
            Data::Text(_) => "text",
            Data::Datetime(_) => "datetime",
            Data::Sequence(_) => "sequence",
            Data::Mapping(_) => "mapping",
            Data::Object(a) => a.type_name(),
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        use Capabilities as C;
        match &self.data {
            Data::Uninitialized => C::empty(),
            Data::Unit => C::UNIT,
            Data::Boolean(_) => C::BOOLEAN,
            Data::Character(_) => C::CHARACTER | C::TEXTUAL,
            Data::Integer(_) => C::INTEGRAL | C::NUMERIC,
            Data::Floating(_) => C::FLOATING | C::NUMERIC,
            Data::Text(_) => C::TEXTUAL | C::CONTAINER,
            Data::Datetime(_) => C::CHRONOLOGIC,
            Data::Sequence(_) => C::SEQUENTIAL | C::CONTAINER,
            Data::Mapping(_) => C::ASSOCIATIVE | C::CONTAINER,
            Data::Object(a) => a.capabilities(),
        }
    }

    fn has(&self, c: Capabilities) -> bool {
        self.capabilities().intersects(c)
    }

    pub fn is_unit(&self) -> bool {
        self.has(Capabilities::UNIT)
    }
    pub fn is_boolean(&self) -> bool {
        self.has(Capabilities::BOOLEAN)
    }
    pub fn is_textual(&self) -> bool {
        self.has(Capabilities::TEXTUAL)
    }
    pub fn is_numeric(&self) -> bool {
        self.has(Capabilities::NUMERIC)
    }
    pub fn is_chronologic(&self) -> bool {
        self.has(Capabilities::CHRONOLOGIC)
    }
    pub fn is_sequential(&self) -> bool {
        self.has(Capabilities::SEQUENTIAL)
    }
    pub fn is_associative(&self) -> bool {
        self.has(Capabilities::ASSOCIATIVE)
    }
    pub fn is_iterable(&self) -> bool {
        self.has(
            Capabilities::SEQUENTIAL
                | Capabilities::ASSOCIATIVE
                | Capabilities::CONTAINER,
        )
    }

    // Metadata

    pub fn safe(&self) -> bool {
        self.safe
    }

    #[must_use]
    pub fn mark_safe(mut self) -> Self {
        self.safe = true;
        self
    }

    #[must_use]
    pub fn mark_unsafe(mut self) -> Self {
        self.safe = false;
        self
    }

    /// A copy sharing the payload, carrying the same safety flag and
    /// token.
    pub fn metacopy(&self) -> Self {
        self.clone()
    }

    /// The source spelling of a literal, if this value came from one.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<Arc<str>>) -> Self {
        self.token = Some(token.into());
        self
    }

    // Conversions

    pub fn to_boolean(&self) -> Result<bool> {
        Ok(match self.initialized()? {
            Data::Uninitialized | Data::Unit => false,
            Data::Boolean(b) => *b,
            Data::Character(c) => *c != '\0',
            Data::Integer(i) => *i != 0,
            Data::Floating(f) => *f != 0.0,
            Data::Text(s) => !s.is_empty(),
            Data::Datetime(_) => true,
            Data::Sequence(s) => !s.is_empty(),
            Data::Mapping(m) => !m.is_empty(),
            Data::Object(a) => {
                if let Some(b) = a.get_boolean() {
                    b
                } else if let Some(n) = a.get_number() {
                    n != 0.0
                } else if let Some(r) = a.get_range() {
                    !r.is_empty()
                } else {
                    a.get_string().is_some_and(|s| !s.is_empty())
                }
            }
        })
    }

    pub fn to_number(&self) -> Result<f64> {
        let fail = || Error::conversion(self.type_name(), "number");
        match self.initialized()? {
            Data::Unit => Ok(0.0),
            Data::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Data::Integer(i) => Ok(*i as f64),
            Data::Floating(f) => Ok(*f),
            Data::Character(c) => {
                c.to_digit(10).map(f64::from).ok_or_else(fail)
            }
            Data::Text(s) => s.trim().parse().map_err(|_| fail()),
            Data::Object(a) => a
                .get_number()
                .or_else(|| a.get_string()?.trim().parse().ok())
                .ok_or_else(fail),
            _ => Err(fail()),
        }
    }

    pub fn to_integer(&self) -> Result<i64> {
        match self.initialized()? {
            Data::Integer(i) => Ok(*i),
            Data::Text(s) if s.trim().parse::<i64>().is_ok() => {
                s.trim().parse().map_err(|_| Error::conversion("text", "integer"))
            }
            _ => Ok(self.to_number()?.trunc() as i64),
        }
    }

    pub fn to_size(&self) -> Result<usize> {
        usize::try_from(self.to_integer()?)
            .map_err(|_| Error::conversion(self.type_name(), "size"))
    }

    /// The textual projection of this value.
    ///
    /// This is what [`Display`] writes, except that an uninitialized
    /// value is an error here.
    pub fn to_text(&self) -> Result<String> {
        match self.initialized()? {
            Data::Text(s) => Ok(s.clone()),
            _ => Ok(format!("{self}")),
        }
    }

    pub fn to_datetime(&self) -> Result<NaiveDateTime> {
        let fail = || Error::conversion(self.type_name(), "datetime");
        match self.initialized()? {
            Data::Datetime(d) => Ok(*d),
            Data::Text(s) => parse_datetime(s).ok_or_else(fail),
            Data::Object(a) => a
                .get_datetime()
                .or_else(|| parse_datetime(&a.get_string()?))
                .ok_or_else(fail),
            _ => Err(fail()),
        }
    }

    /// The elements of this value when iterated.
    ///
    /// Text iterates as characters and mappings as `[key, value]`
    /// pairs; scalars are empty.
    pub fn to_range(&self) -> Result<Vec<Value>> {
        Ok(match self.initialized()? {
            Data::Text(s) => s.chars().map(Value::from).collect(),
            Data::Sequence(items) => items.to_vec(),
            Data::Mapping(m) => m
                .iter()
                .map(|(k, v)| Value::sequence([Value::from(k.as_str()), v.clone()]))
                .collect(),
            Data::Object(a) => a.get_range().unwrap_or_default(),
            _ => Vec::new(),
        })
    }

    pub fn size(&self) -> Result<usize> {
        Ok(match self.initialized()? {
            Data::Text(s) => s.chars().count(),
            Data::Sequence(items) => items.len(),
            Data::Mapping(m) => m.len(),
            _ => self.to_range()?.len(),
        })
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.size()? == 0)
    }

    /// The element at `index`; negative indexes count from the end.
    pub fn at(&self, index: i64) -> Result<Option<Value>> {
        let items = self.to_range()?;
        Ok(resolve_index(index, items.len()).map(|i| items[i].clone()))
    }

    pub fn front(&self) -> Result<Option<Value>> {
        self.at(0)
    }

    pub fn back(&self) -> Result<Option<Value>> {
        self.at(-1)
    }

    pub fn contains(&self, needle: &Value) -> Result<bool> {
        match self.initialized()? {
            Data::Mapping(m) => Ok(m.contains_key(&needle.to_text()?)),
            Data::Text(s) => Ok(needle.is_textual() && s.contains(&needle.to_text()?)),
            _ => Ok(self.to_range()?.iter().any(|v| v.equal(needle))),
        }
    }

    // Attributes

    pub fn attribute(&self, key: &Value) -> Result<Option<Value>> {
        Ok(match self.initialized()? {
            Data::Mapping(m) => {
                let name = key.to_text()?;
                match m.get(&name) {
                    Some(v) => Some(v.clone()),
                    None => match name.as_str() {
                        "items" => Some(Value::sequence(self.to_range()?)),
                        "keys" => Some(Value::sequence(m.keys().map(|k| Value::from(k.as_str())))),
                        "values" => Some(Value::sequence(m.values().cloned())),
                        _ => None,
                    },
                }
            }
            Data::Sequence(_) | Data::Text(_) => match key.to_integer() {
                Ok(i) => self.at(i)?,
                Err(_) => None,
            },
            Data::Datetime(d) => match key.to_text()?.as_str() {
                "year" => Some(d.year().into()),
                "month" => Some(d.month().into()),
                "day" => Some(d.day().into()),
                "hour" => Some(d.hour().into()),
                "minute" => Some(d.minute().into()),
                "second" => Some(d.second().into()),
                _ => None,
            },
            Data::Object(a) => a.attribute(key),
            _ => None,
        })
    }

    pub fn must_get_attribute(&self, key: &Value) -> Result<Value> {
        self.attribute(key)?
            .ok_or_else(|| Error::MissingAttribute(format!("{key}")))
    }

    /// Follow a dotted trail of attributes, like `address.city`.
    pub fn must_get_trail(&self, trail: &str) -> Result<Value> {
        trail
            .split('.')
            .filter(|step| !step.is_empty())
            .try_fold(self.clone(), |value, step| {
                value.must_get_attribute(&Value::from(step))
            })
    }

    // Derived sequences

    /// Split into runs of consecutive elements with equal values at
    /// `trail`.  The input is not sorted first.
    pub fn group_by(&self, trail: &str) -> Result<Vec<(Value, Vec<Value>)>> {
        let mut groups: Vec<(Value, Vec<Value>)> = Vec::new();
        for item in self.to_range()? {
            let key = item.must_get_trail(trail)?;
            match groups.last_mut() {
                Some((last, members)) if last.equal(&key) => members.push(item),
                _ => groups.push((key, vec![item])),
            }
        }
        Ok(groups)
    }

    /// A stably sorted copy, ordered by the values at `trail`.
    pub fn sort_by(&self, trail: &str, reverse: bool) -> Result<Value> {
        let mut keyed = self
            .to_range()?
            .into_iter()
            .map(|item| Ok((item.must_get_trail(trail)?, item)))
            .collect::<Result<Vec<_>>>()?;
        keyed.sort_by(|(a, _), (b, _)| {
            let order = a.compare(b);
            if reverse {
                order.reverse()
            } else {
                order
            }
        });
        Ok(Value::sequence(keyed.into_iter().map(|(_, item)| item)))
    }

    pub fn reverse(&self) -> Result<Value> {
        let mut items = self.to_range()?;
        items.reverse();
        Ok(Value::sequence(items))
    }

    /// Python style slicing: bounds may be negative or absent.
    pub fn slice(&self, lower: Option<i64>, upper: Option<i64>) -> Result<Value> {
        let items = self.to_range()?;
        let len = items.len() as i64;
        let clamp = |i: i64| if i < 0 { (i + len).max(0) } else { i.min(len) };
        let lo = lower.map_or(0, clamp) as usize;
        let hi = upper.map_or(len, clamp) as usize;
        let picked = items.get(lo..hi.max(lo)).unwrap_or_default();
        if let Data::Text(_) = self.data {
            Ok(Value::from(picked.iter().map(|c| format!("{c}")).collect::<String>()))
        } else {
            Ok(Value::sequence(picked.iter().cloned()))
        }
    }

    /// The html-escaped textual form, as a new (unsafe) value.
    pub fn escape(&self) -> Result<Value> {
        Ok(Value::from(escape_html(&self.to_text()?)))
    }

    // Comparison

    /// Equality across shapes: same shape compares directly, numbers
    /// (and booleans) compare numerically, text compares as strings.
    pub fn equal(&self, other: &Value) -> bool {
        use Data::*;
        match (&self.data, &other.data) {
            (Uninitialized, _) | (_, Uninitialized) => false,
            (Unit, Unit) => true,
            (Boolean(a), Boolean(b)) => a == b,
            (Integer(a), Integer(b)) => a == b,
            (Text(a), Text(b)) => a == b,
            (Datetime(a), Datetime(b)) => a == b,
            (Sequence(a), Sequence(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equal(y))
            }
            (Mapping(a), Mapping(b)) => {
                a.len() == b.len()
                    && a.iter().zip(b.iter()).all(|((ka, va), (kb, vb))| ka == kb && va.equal(vb))
            }
            (Object(a), Object(b)) if a.type_name() == b.type_name() => {
                match a.equal(b.as_ref()) {
                    Some(eq) => eq,
                    None => self.equal_by_capability(other),
                }
            }
            _ => self.equal_by_capability(other),
        }
    }

    fn equal_by_capability(&self, other: &Value) -> bool {
        let numberish = Capabilities::NUMERIC | Capabilities::BOOLEAN;
        if self.has(numberish) && other.has(numberish) {
            matches!((self.to_number(), other.to_number()), (Ok(a), Ok(b)) if a == b)
        } else if self.is_textual() && other.is_textual() {
            matches!((self.to_text(), other.to_text()), (Ok(a), Ok(b)) if a == b)
        } else if self.is_chronologic() && other.is_chronologic() {
            matches!((self.to_datetime(), other.to_datetime()), (Ok(a), Ok(b)) if a == b)
        } else {
            false
        }
    }

    pub fn less(&self, other: &Value) -> bool {
        use Data::*;
        match (&self.data, &other.data) {
            (Uninitialized, _) | (_, Uninitialized) => false,
            (Integer(a), Integer(b)) => a < b,
            (Text(a), Text(b)) => a < b,
            (Datetime(a), Datetime(b)) => a < b,
            (Sequence(a), Sequence(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    if x.less(y) {
                        return true;
                    }
                    if y.less(x) {
                        return false;
                    }
                }
                a.len() < b.len()
            }
            (Object(a), Object(b)) if a.type_name() == b.type_name() => {
                match a.less(b.as_ref()) {
                    Some(lt) => lt,
                    None => self.less_by_capability(other),
                }
            }
            _ => self.less_by_capability(other),
        }
    }

    fn less_by_capability(&self, other: &Value) -> bool {
        let numberish = Capabilities::NUMERIC | Capabilities::BOOLEAN;
        if self.has(numberish) && other.has(numberish) {
            matches!((self.to_number(), other.to_number()), (Ok(a), Ok(b)) if a < b)
        } else if self.is_textual() && other.is_textual() {
            matches!((self.to_text(), other.to_text()), (Ok(a), Ok(b)) if a < b)
        } else if self.is_chronologic() && other.is_chronologic() {
            matches!((self.to_datetime(), other.to_datetime()), (Ok(a), Ok(b)) if a < b)
        } else {
            false
        }
    }

    /// A total order built from [`Value::less`], for sorting.
    pub fn compare(&self, other: &Value) -> Ordering {
        if self.less(other) {
            Ordering::Less
        } else if other.less(self) {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }

    // Output

    /// Write this value to `out`, html-escaping it when `autoescape`
    /// is on and the value is not marked safe.
    pub fn render_to(&self, out: &mut dyn Write, autoescape: bool) -> io::Result<()> {
        if autoescape && !self.safe {
            write!(EscapingWriter(out), "{self}")
        } else {
            write!(out, "{self}")
        }
    }
}

fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let i = if index < 0 { index + len as i64 } else { index };
    usize::try_from(i).ok().filter(|&i| i < len)
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()?
                .and_hms_opt(0, 0, 0)
        })
}

impl Display for Value {
    /// Python-like display: `None`, `True`/`False`, lists joined by
    /// `", "` and mappings as `key: value` pairs.
    fn fmt(&self, out: &mut fmt::Formatter) -> fmt::Result {
        match &self.data {
            Data::Uninitialized => Ok(()),
            Data::Unit => out.write_str("None"),
            Data::Boolean(true) => out.write_str("True"),
            Data::Boolean(false) => out.write_str("False"),
            Data::Character(c) => write!(out, "{c}"),
            Data::Integer(i) => write!(out, "{i}"),
            Data::Floating(f) => write!(out, "{f}"),
            Data::Text(s) => out.write_str(s),
            Data::Datetime(d) => write!(out, "{}", d.format(DATETIME_FORMAT)),
            Data::Sequence(items) => write!(out, "{}", items.iter().format(", ")),
            Data::Mapping(m) => write!(
                out,
                "{}",
                m.iter().format_with(", ", |(k, v), f| f(&format_args!("{k}: {v}")))
            ),
            Data::Object(a) => match a.get_string() {
                Some(s) => out.write_str(&s),
                None => match a.get_range() {
                    Some(items) => write!(out, "{}", items.iter().format(", ")),
                    None => Ok(()),
                },
            },
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        self.equal(other)
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Value) -> Option<Ordering> {
        if self.equal(other) {
            Some(Ordering::Equal)
        } else if self.less(other) {
            Some(Ordering::Less)
        } else if other.less(self) {
            Some(Ordering::Greater)
        } else {
            None
        }
    }
}
