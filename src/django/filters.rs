//! The built-in filters.
//!
//! Filters are kept in a table sorted by name, each with the least and
//! most number of arguments it takes.  Filters from loaded libraries
//! are looked up first, so a library can replace a built-in.
use super::expression::{split_argument, Env};
use super::formatter::{format_datetime, format_duration};
use super::markup;
use crate::text::{abbreviate_size, escape_controls, escape_html, iri_encode, quote, uri_encode};
use crate::{Error, Result, Value};
use chrono::Local;
use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hasher};

type Builtin = fn(&Env, Value, &[Value]) -> Result<Value>;

/// Name, minimum and maximum number of arguments, and implementation.
static FILTERS: &[(&str, usize, usize, Builtin)] = &[
    ("add", 1, 1, add),
    ("addslashes", 0, 0, addslashes),
    ("capfirst", 0, 0, capfirst),
    ("center", 1, 1, center),
    ("cut", 1, 1, cut),
    ("date", 0, 1, date),
    ("default", 1, 1, default),
    ("default_if_none", 1, 1, default_if_none),
    ("dictsort", 1, 1, dictsort),
    ("dictsortreversed", 1, 1, dictsortreversed),
    ("divisibleby", 1, 1, divisibleby),
    ("escape", 0, 0, escape),
    ("escapejs", 0, 0, escapejs),
    ("filesizeformat", 0, 0, filesizeformat),
    ("first", 0, 0, first),
    ("fix_ampersands", 0, 0, fix_ampersands),
    ("floatformat", 0, 1, floatformat),
    ("force_escape", 0, 0, force_escape),
    ("get_digit", 1, 1, get_digit),
    ("iriencode", 0, 0, iriencode),
    ("join", 1, 1, join),
    ("last", 0, 0, last),
    ("length", 0, 0, length),
    ("length_is", 1, 1, length_is),
    ("linebreaks", 0, 0, linebreaks),
    ("linebreaksbr", 0, 0, linebreaksbr),
    ("linenumbers", 0, 0, linenumbers),
    ("ljust", 1, 1, ljust),
    ("lower", 0, 0, lower),
    ("make_list", 0, 0, make_list),
    ("phone2numeric", 0, 0, phone2numeric),
    ("pluralize", 0, 1, pluralize),
    ("pprint", 0, 0, pprint),
    ("random", 0, 0, random),
    ("removetags", 1, 1, removetags),
    ("rjust", 1, 1, rjust),
    ("safe", 0, 0, safe),
    ("safeseq", 0, 0, safeseq),
    ("slice", 0, 1, slice),
    ("slugify", 0, 0, slugify),
    ("stringformat", 1, 1, stringformat),
    ("striptags", 0, 0, striptags),
    ("time", 0, 1, time),
    ("timesince", 0, 1, timesince),
    ("timeuntil", 0, 1, timeuntil),
    ("title", 0, 0, title),
    ("truncatechars", 1, 1, truncatechars),
    ("truncatechars_html", 1, 1, truncatechars_html),
    ("truncatewords", 1, 1, truncatewords),
    ("truncatewords_html", 1, 1, truncatewords_html),
    ("unordered_list", 0, 0, unordered_list),
    ("upper", 0, 0, upper),
    ("urlencode", 0, 0, urlencode),
    ("urlize", 0, 0, urlize),
    ("urlizetrunc", 1, 1, urlizetrunc),
    ("wordcount", 0, 0, wordcount),
    ("wordwrap", 1, 1, wordwrap),
    ("yesno", 1, 1, yesno),
];

/// Apply the filter `name` to `value`.
pub fn apply(env: &Env, name: &str, value: Value, args: &[Value]) -> Result<Value> {
    if let Some(filter) = env.filters.get(name) {
        return filter(env, value, args);
    }
    let (_, min, max, filter) = FILTERS
        .binary_search_by(|(n, ..)| n.cmp(&name))
        .map(|i| FILTERS[i])
        .map_err(|_| Error::MissingFilter(name.to_string()))?;
    if args.len() > max {
        return Err(Error::SuperfluousArgument(format!("{name} takes at most {max}")));
    }
    if args.len() < min {
        return Err(Error::MissingArgument(format!("{name} takes at least {min}")));
    }
    filter(env, value, args)
}

/// The names of all built-in filters.
pub fn builtin_names() -> impl Iterator<Item = &'static str> {
    FILTERS.iter().map(|(name, ..)| *name)
}

fn first_arg(args: &[Value]) -> Result<&Value> {
    args.first()
        .ok_or_else(|| Error::MissingArgument("filter argument".into()))
}

fn text(value: String) -> Result<Value> {
    Ok(Value::from(value))
}

fn add(_: &Env, value: Value, args: &[Value]) -> Result<Value> {
    Ok(Value::from_number(value.to_number()? + first_arg(args)?.to_number()?))
}

fn addslashes(_: &Env, value: Value, _: &[Value]) -> Result<Value> {
    let mut out = String::new();
    for c in value.to_text()?.chars() {
        match c {
            '\'' | '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    Ok(Value::from(out).mark_safe())
}

fn capfirst(_: &Env, value: Value, _: &[Value]) -> Result<Value> {
    let s = value.to_text()?;
    let mut chars = s.chars();
    text(match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => s,
    })
}

fn center(_: &Env, value: Value, args: &[Value]) -> Result<Value> {
    let s = value.to_text()?;
    let width = first_arg(args)?.to_size()?;
    let len = s.chars().count();
    if width <= len {
        return text(s);
    }
    let right = (width - len) / 2;
    let left = width - len - right;
    text(format!("{}{s}{}", " ".repeat(left), " ".repeat(right)))
}

fn cut(_: &Env, value: Value, args: &[Value]) -> Result<Value> {
    text(value.to_text()?.replace(&first_arg(args)?.to_text()?, ""))
}

fn format_with(env: &Env, value: &Value, args: &[Value], default: &str) -> Result<Value> {
    let format = match args.first() {
        Some(format) => format.to_text()?,
        None => default.to_string(),
    };
    text(format_datetime(&env.options.formats, &format, &value.to_datetime()?))
}

fn date(env: &Env, value: Value, args: &[Value]) -> Result<Value> {
    format_with(env, &value, args, "DATE_FORMAT")
}

fn time(env: &Env, value: Value, args: &[Value]) -> Result<Value> {
    format_with(env, &value, args, "TIME_FORMAT")
}

fn default(_: &Env, value: Value, args: &[Value]) -> Result<Value> {
    if value.to_boolean()? {
        Ok(value)
    } else {
        first_arg(args).cloned()
    }
}

fn default_if_none(_: &Env, value: Value, args: &[Value]) -> Result<Value> {
    if value.is_unit() {
        first_arg(args).cloned()
    } else {
        Ok(value)
    }
}

fn dictsort(_: &Env, value: Value, args: &[Value]) -> Result<Value> {
    value.sort_by(&first_arg(args)?.to_text()?, false)
}

fn dictsortreversed(_: &Env, value: Value, args: &[Value]) -> Result<Value> {
    value.sort_by(&first_arg(args)?.to_text()?, true)
}

fn divisibleby(_: &Env, value: Value, args: &[Value]) -> Result<Value> {
    let divisor = first_arg(args)?.to_integer()?;
    if divisor == 0 {
        return Err(Error::OutOfRange("divisor 0".into()));
    }
    Ok(Value::from(value.to_integer()? % divisor == 0))
}

fn escape(_: &Env, value: Value, _: &[Value]) -> Result<Value> {
    Ok(value.metacopy().mark_unsafe())
}

fn escapejs(_: &Env, value: Value, _: &[Value]) -> Result<Value> {
    text(escape_controls(&value.to_text()?))
}

fn filesizeformat(_: &Env, value: Value, _: &[Value]) -> Result<Value> {
    text(abbreviate_size(value.to_size()? as u64))
}

fn first(_: &Env, value: Value, _: &[Value]) -> Result<Value> {
    value
        .front()?
        .ok_or_else(|| Error::OutOfRange("first of an empty sequence".into()))
}

fn last(_: &Env, value: Value, _: &[Value]) -> Result<Value> {
    value
        .back()?
        .ok_or_else(|| Error::OutOfRange("last of an empty sequence".into()))
}

fn fix_ampersands(_: &Env, value: Value, _: &[Value]) -> Result<Value> {
    Ok(Value::from(markup::fix_ampersands(&value.to_text()?)).mark_safe())
}

/// Round to the given number of decimals.  A negative count means at
/// most that many: whole numbers get none.
fn floatformat(_: &Env, value: Value, args: &[Value]) -> Result<Value> {
    let places = match args.first() {
        Some(places) => places.to_integer()?,
        None => -1,
    };
    let number = value.to_number()?;
    let precision = if places < 0 && number.fract() == 0.0 {
        0
    } else {
        places.unsigned_abs() as usize
    };
    Ok(Value::from(format!("{number:.precision$}")).mark_safe())
}

fn force_escape(_: &Env, value: Value, _: &[Value]) -> Result<Value> {
    Ok(value.escape()?.mark_safe())
}

fn get_digit(_: &Env, value: Value, args: &[Value]) -> Result<Value> {
    match digit(&value, first_arg(args)?) {
        Ok(Some(digit)) => Ok(digit),
        Ok(None) | Err(Error::Conversion { .. }) => Ok(value),
        Err(e) => Err(e),
    }
}

/// The digit `position` places from the right of a positive whole
/// number.
fn digit(value: &Value, position: &Value) -> Result<Option<Value>> {
    let number = value.to_number()?;
    let integer = value.to_integer()?;
    let position = position.to_integer()?;
    if position < 1 || integer < 1 || number != integer as f64 {
        return Ok(None);
    }
    let digits = integer.to_string();
    let from_right = position as usize;
    Ok(digits
        .len()
        .checked_sub(from_right)
        .and_then(|i| digits[i..].chars().next())
        .map(Value::from))
}

fn iriencode(_: &Env, value: Value, _: &[Value]) -> Result<Value> {
    text(iri_encode(&value.to_text()?))
}

fn join(_: &Env, value: Value, args: &[Value]) -> Result<Value> {
    let delimiter = first_arg(args)?.to_text()?;
    let joined = value
        .to_range()?
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(&delimiter);
    let joined = Value::from(joined);
    Ok(if value.safe() { joined.mark_safe() } else { joined })
}

fn length(_: &Env, value: Value, _: &[Value]) -> Result<Value> {
    Ok(Value::from(value.size()?))
}

fn length_is(_: &Env, value: Value, args: &[Value]) -> Result<Value> {
    Ok(Value::from(first_arg(args)?.to_size()? == value.size()?))
}

/// How to treat text that goes inside generated markup.
fn escaper(env: &Env, value: &Value) -> fn(&str) -> String {
    if env.autoescape && !value.safe() {
        escape_html
    } else {
        str::to_string
    }
}

fn linebreaks(env: &Env, value: Value, _: &[Value]) -> Result<Value> {
    let escape = escaper(env, &value);
    Ok(Value::from(markup::linebreaks(&value.to_text()?, escape)?).mark_safe())
}

fn linebreaksbr(env: &Env, value: Value, _: &[Value]) -> Result<Value> {
    let escape = escaper(env, &value);
    let s = escape(&value.to_text()?).replace('\n', "<br />");
    Ok(Value::from(s).mark_safe())
}

fn linenumbers(env: &Env, value: Value, _: &[Value]) -> Result<Value> {
    let escape = escaper(env, &value);
    Ok(Value::from(markup::line_numbers(&value.to_text()?, escape)).mark_safe())
}

fn ljust(_: &Env, value: Value, args: &[Value]) -> Result<Value> {
    let width = first_arg(args)?.to_size()?;
    text(format!("{:<width$}", value.to_text()?))
}

fn rjust(_: &Env, value: Value, args: &[Value]) -> Result<Value> {
    let width = first_arg(args)?.to_size()?;
    text(format!("{:>width$}", value.to_text()?))
}

fn lower(_: &Env, value: Value, _: &[Value]) -> Result<Value> {
    text(value.to_text()?.to_lowercase())
}

fn upper(_: &Env, value: Value, _: &[Value]) -> Result<Value> {
    text(value.to_text()?.to_uppercase())
}

/// The elements as a list literal.  Numbers are listed by digit.
fn make_list(_: &Env, value: Value, _: &[Value]) -> Result<Value> {
    let sequence = if value.is_numeric() {
        Value::from(value.to_text()?)
    } else {
        value
    };
    let items = sequence
        .to_range()?
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>();
    text(format!("[{}]", items.join(", ")))
}

fn phone2numeric(_: &Env, value: Value, _: &[Value]) -> Result<Value> {
    let lowered = value.to_text()?.to_lowercase();
    let digits = lowered.chars().map(|c| match c {
        'a' | 'b' | 'c' => '2',
        'd' | 'e' | 'f' => '3',
        'g' | 'h' | 'i' => '4',
        'j' | 'k' | 'l' => '5',
        'm' | 'n' | 'o' => '6',
        'p' | 'q' | 'r' | 's' => '7',
        't' | 'u' | 'v' => '8',
        'w' | 'x' | 'y' | 'z' => '9',
        c => c,
    });
    text(digits.collect())
}

fn pluralize(env: &Env, value: Value, args: &[Value]) -> Result<Value> {
    let forms = match args.first() {
        Some(arg) => split_argument(env, arg, ',')?,
        None => Vec::new(),
    };
    let (singular, plural) = match &forms[..] {
        [] => (String::new(), "s".to_string()),
        [plural] => (String::new(), plural.to_text()?),
        [singular, plural, ..] => (singular.to_text()?, plural.to_text()?),
    };
    text(if value.to_number()? == 1.0 {
        singular
    } else {
        plural
    })
}

fn pprint(_: &Env, value: Value, _: &[Value]) -> Result<Value> {
    let s = value.to_text()?;
    text(if value.is_textual() { quote(&s, '\'') } else { s })
}

fn random(_: &Env, value: Value, _: &[Value]) -> Result<Value> {
    let items = value.to_range()?;
    if items.is_empty() {
        return Err(Error::OutOfRange("random of an empty sequence".into()));
    }
    let seed = RandomState::new().build_hasher().finish();
    Ok(items[(seed % items.len() as u64) as usize].clone())
}

fn removetags(_: &Env, value: Value, args: &[Value]) -> Result<Value> {
    let names = first_arg(args)?.to_text()?;
    let names = names.split_whitespace().collect::<Vec<_>>();
    text(markup::remove_tags(&value.to_text()?, &names)?)
}

/// Mark as not needing escaping.  The value is turned into text right
/// away, unless output is not being escaped anyway.
fn safe(env: &Env, value: Value, _: &[Value]) -> Result<Value> {
    if env.autoescape {
        Ok(Value::from(value.to_text()?).mark_safe())
    } else {
        Ok(value)
    }
}

fn safeseq(_: &Env, value: Value, _: &[Value]) -> Result<Value> {
    let range = value.to_range()?;
    let items = range.iter().map(|item| item.metacopy().mark_safe());
    Ok(Value::sequence(items.collect::<Vec<_>>()).mark_safe())
}

/// Python style `lower:upper` slicing.
fn slice(env: &Env, value: Value, args: &[Value]) -> Result<Value> {
    let bounds = match args.first() {
        Some(arg) => split_argument(env, arg, ':')?,
        None => Vec::new(),
    };
    let [lower, upper, ..] = &bounds[..] else {
        return Err(Error::MissingArgument("slice bounds".into()));
    };
    let bound = |v: &Value| -> Result<Option<i64>> {
        if v.is_unit() {
            Ok(None)
        } else {
            v.to_integer().map(Some)
        }
    };
    value.slice(bound(lower)?, bound(upper)?)
}

fn slugify(_: &Env, value: Value, _: &[Value]) -> Result<Value> {
    let slug = value
        .to_text()?
        .trim()
        .chars()
        .map(|c| if c == ' ' { '-' } else { c })
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .collect::<String>();
    text(slug.to_lowercase())
}

fn stringformat(_: &Env, value: Value, args: &[Value]) -> Result<Value> {
    text(printf(&first_arg(args)?.to_text()?, &value)?)
}

fn striptags(_: &Env, value: Value, _: &[Value]) -> Result<Value> {
    text(markup::strip_tags(&value.to_text()?)?)
}

/// The time from `from` (now, by default) to `to`.
fn duration(env: &Env, from: &Value, to: &Value) -> Result<Value> {
    let delta = to.to_datetime()? - from.to_datetime()?;
    Ok(Value::from(format_duration(delta, &env.options.nonbreaking_space)).mark_safe())
}

fn now() -> Value {
    Value::from(Local::now().naive_local())
}

fn timesince(env: &Env, value: Value, args: &[Value]) -> Result<Value> {
    let reference = args.first().cloned().unwrap_or_else(now);
    duration(env, &value, &reference)
}

fn timeuntil(env: &Env, value: Value, args: &[Value]) -> Result<Value> {
    let reference = args.first().cloned().unwrap_or_else(now);
    duration(env, &reference, &value)
}

fn title(_: &Env, value: Value, _: &[Value]) -> Result<Value> {
    let mut out = String::new();
    let mut boundary = true;
    for c in value.to_text()?.chars() {
        if boundary {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
        boundary = c.is_whitespace();
    }
    text(out)
}

fn truncatechars(_: &Env, value: Value, args: &[Value]) -> Result<Value> {
    let limit = first_arg(args)?.to_size()?;
    text(markup::truncate_chars(&value.to_text()?, limit))
}

fn truncatechars_html(_: &Env, value: Value, args: &[Value]) -> Result<Value> {
    let limit = first_arg(args)?.to_size()?;
    Ok(Value::from(markup::truncate_chars_html(&value.to_text()?, limit)?).mark_safe())
}

fn truncatewords(_: &Env, value: Value, args: &[Value]) -> Result<Value> {
    let limit = first_arg(args)?.to_size()?;
    text(markup::truncate_words(&value.to_text()?, limit))
}

fn truncatewords_html(_: &Env, value: Value, args: &[Value]) -> Result<Value> {
    let limit = first_arg(args)?.to_size()?;
    Ok(Value::from(markup::truncate_words_html(&value.to_text()?, limit)?).mark_safe())
}

/// Nested `<li>` items; a list following an item becomes its sublist.
fn unordered_list(_: &Env, value: Value, _: &[Value]) -> Result<Value> {
    let mut out = String::new();
    list_items(&mut out, &value, value.safe(), 0)?;
    Ok(Value::from(out).mark_safe())
}

fn is_list(value: &Value) -> bool {
    !value.is_textual() && value.is_iterable()
}

fn list_items(out: &mut String, item: &Value, safe: bool, level: usize) -> Result<()> {
    let indent = "\t".repeat(level);
    let show = |v: &Value| -> Result<String> {
        if safe {
            Ok(v.to_string())
        } else {
            Ok(escape_html(&v.to_text()?))
        }
    };
    if !is_list(item) {
        out.push_str(&format!("{indent}<li>{}</li>\n", show(item)?));
        return Ok(());
    }
    let items = item.to_range()?;
    let mut i = 0;
    while i < items.len() {
        out.push_str(&format!("{indent}<li>{}", show(&items[i])?));
        i += 1;
        if let Some(next) = items.get(i) {
            if is_list(next) {
                out.push_str(&format!("\n{indent}<ul>\n"));
                list_items(out, next, safe, level + 1)?;
                out.push_str(&format!("{indent}</ul>\n{indent}"));
            } else {
                out.push_str(&format!("</li>\n{indent}<li>{}", show(next)?));
            }
        }
        out.push_str("</li>\n");
        i += 1;
    }
    Ok(())
}

fn urlencode(_: &Env, value: Value, _: &[Value]) -> Result<Value> {
    text(uri_encode(&value.to_text()?))
}

fn urlize(_: &Env, value: Value, _: &[Value]) -> Result<Value> {
    Ok(Value::from(markup::urlize(&value.to_text()?, usize::MAX)?).mark_safe())
}

fn urlizetrunc(_: &Env, value: Value, args: &[Value]) -> Result<Value> {
    let limit = first_arg(args)?.to_size()?;
    Ok(Value::from(markup::urlize(&value.to_text()?, limit)?).mark_safe())
}

fn wordcount(_: &Env, value: Value, _: &[Value]) -> Result<Value> {
    Ok(Value::from(markup::word_count(&value.to_text()?)))
}

fn wordwrap(_: &Env, value: Value, args: &[Value]) -> Result<Value> {
    let width = first_arg(args)?.to_size()?;
    text(markup::word_wrap(&value.to_text()?, width))
}

/// Map true, false and (optionally) none to the given words.
fn yesno(env: &Env, value: Value, args: &[Value]) -> Result<Value> {
    let words = split_argument(env, first_arg(args)?, ',')?;
    match &words[..] {
        [] | [_] => Err(Error::MissingArgument("yesno needs at least two choices".into())),
        [_, _, none] if value.is_unit() => Ok(none.clone()),
        [yes, no] | [yes, no, _] => Ok(if value.to_boolean()? { yes } else { no }.clone()),
        _ => Err(Error::SuperfluousArgument("yesno takes at most three choices".into())),
    }
}

/// Format `value` by a printf style conversion `spec`, like `x`,
/// `05d` or `.2f`.
fn printf(spec: &str, value: &Value) -> Result<String> {
    let invalid = || Error::InvalidAttribute(format!("%{spec}"));
    let conversion = spec.chars().last().ok_or_else(invalid)?;
    let head = &spec[..spec.len() - conversion.len_utf8()];
    let flags_end = head
        .find(|c: char| !"-+0 #".contains(c))
        .unwrap_or(head.len());
    let (flags, rest) = head.split_at(flags_end);
    let (width, precision) = match rest.split_once('.') {
        Some((width, precision)) => (width, Some(precision)),
        None => (rest, None),
    };
    let width = if width.is_empty() {
        0
    } else {
        width.parse::<usize>().map_err(|_| invalid())?
    };
    let precision = match precision {
        Some(p) if p.is_empty() => Some(0),
        Some(p) => Some(p.parse::<usize>().map_err(|_| invalid())?),
        None => None,
    };

    let signed = |magnitude: String, negative: bool| {
        let sign = if negative {
            "-"
        } else if flags.contains('+') {
            "+"
        } else if flags.contains(' ') {
            " "
        } else {
            ""
        };
        (sign, magnitude)
    };
    let (sign, body) = match conversion {
        'd' | 'i' | 'u' => {
            let n = value.to_integer()?;
            signed(n.unsigned_abs().to_string(), n < 0)
        }
        'x' | 'X' | 'o' => {
            let n = value.to_integer()?;
            let m = n.unsigned_abs();
            let digits = match conversion {
                'x' => format!("{m:x}"),
                'X' => format!("{m:X}"),
                _ => format!("{m:o}"),
            };
            signed(digits, n < 0)
        }
        'f' | 'F' => {
            let n = value.to_number()?;
            let p = precision.unwrap_or(6);
            signed(format!("{:.p$}", n.abs()), n < 0.0)
        }
        'e' | 'E' => {
            let n = value.to_number()?;
            let p = precision.unwrap_or(6);
            let formatted = c_exponent(&format!("{:.p$e}", n.abs()));
            let formatted = if conversion == 'E' {
                formatted.to_uppercase()
            } else {
                formatted
            };
            signed(formatted, n < 0.0)
        }
        'g' | 'G' => {
            let n = value.to_number()?;
            signed(Value::from_number(n.abs()).to_string(), n < 0.0)
        }
        'c' => ("", value.to_text()?.chars().take(1).collect()),
        'r' => ("", pprint_text(value)?),
        's' => {
            let s = value.to_text()?;
            let s = match precision {
                Some(p) => markup::prefix(&s, p).to_string(),
                None => s,
            };
            ("", s)
        }
        _ => return Err(invalid()),
    };

    let len = sign.chars().count() + body.chars().count();
    let pad = width.saturating_sub(len);
    Ok(if flags.contains('-') {
        format!("{sign}{body}{}", " ".repeat(pad))
    } else if flags.contains('0') && !matches!(conversion, 's' | 'c' | 'r') {
        format!("{sign}{}{body}", "0".repeat(pad))
    } else {
        format!("{}{sign}{body}", " ".repeat(pad))
    })
}

fn pprint_text(value: &Value) -> Result<String> {
    let s = value.to_text()?;
    Ok(if value.is_textual() { quote(&s, '\'') } else { s })
}

/// Turn rust's `1.5e2` into C's `1.5e+02`.
fn c_exponent(formatted: &str) -> String {
    match formatted.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => formatted.to_string(),
    }
}
