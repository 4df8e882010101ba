//! The directives and how they render.
use super::expr::Expr;
use super::{parser, Options};
use crate::engine::{load, locate, Children, Node};
use crate::text::{abbreviate_size, escape_html, uri_encode};
use crate::{Context, Error, Result, Value};
use chrono::{DateTime, Local, TimeZone, Utc};
use log::warn;
use regex::Regex;
use std::fmt::{self, Write as _};
use std::fs;
use std::io::Write;
use std::sync::LazyLock;

/// A `name="value"` pair of a directive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

pub type Body = Box<Node<Directive>>;

#[derive(Debug)]
pub enum Directive {
    Config(Vec<Attribute>),
    Echo(Vec<Attribute>),
    Exec(Vec<Attribute>),
    Flastmod(Vec<Attribute>),
    Fsize(Vec<Attribute>),
    /// The `if` and `elif` branches, each with its attributes, and the
    /// `else` body.
    If {
        branches: Vec<(Vec<Attribute>, Body)>,
        otherwise: Option<Body>,
    },
    Include(Vec<Attribute>),
    Printenv(Vec<Attribute>),
    Set(Vec<Attribute>),
}

impl Children<Directive> for Directive {
    fn children(&self) -> Box<dyn Iterator<Item = &Node<Directive>> + '_> {
        match self {
            Directive::If {
                branches,
                otherwise,
            } => Box::new(
                branches
                    .iter()
                    .map(|(_, body)| &**body)
                    .chain(otherwise.as_deref()),
            ),
            _ => Box::new(std::iter::empty()),
        }
    }
}

/// Settings of one render, as changed by `config`.
pub(crate) struct State<'o> {
    options: &'o Options,
    size_format: String,
    time_format: String,
    echo_message: String,
    error_message: String,
}

impl<'o> State<'o> {
    pub(crate) fn new(options: &'o Options) -> Self {
        State {
            options,
            size_format: options.size_format.clone(),
            time_format: options.time_format.clone(),
            echo_message: options.echo_message.clone(),
            error_message: options.error_message.clone(),
        }
    }
}

pub(crate) fn render(
    out: &mut dyn Write,
    node: &Node<Directive>,
    context: &mut Context,
    state: &mut State,
) -> Result<()> {
    match node {
        Node::Text(text) => out.write_all(text.as_bytes())?,
        Node::Block(nodes) => {
            for node in nodes {
                render(out, node, context, state)?;
            }
        }
        Node::Tag(_, directive) => {
            let mut buf = Vec::new();
            match directive.render(&mut buf, context, state) {
                Ok(()) => out.write_all(&buf)?,
                Err(e) if !state.options.throw_on_errors => {
                    warn!("Failed to process {} directive: {e}", directive.name());
                    out.write_all(state.error_message.as_bytes())?;
                }
                Err(e) => return Err(e),
            }
        }
    }
    Ok(())
}

#[derive(Clone, Copy)]
enum Encoding {
    None,
    Url,
    Entity,
}

impl Encoding {
    fn parse(name: &str) -> Result<Self> {
        match name {
            "none" => Ok(Encoding::None),
            "url" => Ok(Encoding::Url),
            "entity" => Ok(Encoding::Entity),
            _ => Err(Error::InvalidAttribute(format!("encoding={name:?}"))),
        }
    }

    fn apply(self, text: &str) -> String {
        match self {
            Encoding::None => text.to_string(),
            Encoding::Url => uri_encode(text),
            Encoding::Entity => escape_html(text),
        }
    }
}

impl Directive {
    fn name(&self) -> &'static str {
        match self {
            Directive::Config(_) => "config",
            Directive::Echo(_) => "echo",
            Directive::Exec(_) => "exec",
            Directive::Flastmod(_) => "flastmod",
            Directive::Fsize(_) => "fsize",
            Directive::If { .. } => "if",
            Directive::Include(_) => "include",
            Directive::Printenv(_) => "printenv",
            Directive::Set(_) => "set",
        }
    }

    fn render(
        &self,
        out: &mut dyn Write,
        context: &mut Context,
        state: &mut State,
    ) -> Result<()> {
        match self {
            Directive::Config(attributes) => {
                for Attribute { name, value } in attributes {
                    match name.as_str() {
                        "sizefmt" => {
                            size_format(value)?;
                            state.size_format.clone_from(value);
                        }
                        "timefmt" => state.time_format.clone_from(value),
                        "echomsg" => state.echo_message.clone_from(value),
                        "errmsg" => state.error_message.clone_from(value),
                        _ => return Err(invalid(name)),
                    }
                }
            }
            Directive::Echo(attributes) => {
                let mut encoding = Encoding::Entity;
                for Attribute { name, value } in attributes {
                    match name.as_str() {
                        "var" => match lookup(value, context, state)? {
                            Some(text) => out.write_all(encoding.apply(&text).as_bytes())?,
                            None => out.write_all(state.echo_message.as_bytes())?,
                        },
                        "encoding" => encoding = Encoding::parse(value)?,
                        _ => return Err(invalid(name)),
                    }
                }
            }
            Directive::Exec(attributes) => {
                for Attribute { name, value } in attributes {
                    match name.as_str() {
                        "cmd" => out.write_all(&state.options.environment.execute(value)?)?,
                        "cgi" => return Err(Error::NotImplemented("exec cgi".into())),
                        _ => return Err(invalid(name)),
                    }
                }
            }
            Directive::Flastmod(attributes) => {
                for path in files(attributes)? {
                    let found = locate(&state.options.directories, path)?;
                    let modified = DateTime::<Local>::from(fs::metadata(found)?.modified()?);
                    out.write_all(format_time(&state.time_format, &modified)?.as_bytes())?;
                }
            }
            Directive::Fsize(attributes) => {
                let abbreviate = size_format(&state.size_format)?;
                for path in files(attributes)? {
                    let found = locate(&state.options.directories, path)?;
                    let size = fs::metadata(found)?.len();
                    if abbreviate {
                        out.write_all(abbreviate_size(size).as_bytes())?;
                    } else {
                        write!(out, "{size}")?;
                    }
                }
            }
            Directive::If {
                branches,
                otherwise,
            } => {
                for (attributes, body) in branches {
                    let condition = Expr::parse(condition(attributes)?)?;
                    if condition.evaluate(context, state)? {
                        return render(out, body, context, state);
                    }
                }
                if let Some(otherwise) = otherwise {
                    render(out, otherwise, context, state)?;
                }
            }
            Directive::Include(attributes) => {
                for path in files(attributes)? {
                    let tree = parser::parse(&load(&state.options.directories, path)?)?;
                    render(out, &tree, context, state)?;
                }
            }
            Directive::Printenv(attributes) => {
                if let Some(Attribute { name, .. }) = attributes.first() {
                    return Err(invalid(name));
                }
                let mut vars = state.options.environment.vars();
                vars.sort();
                for (name, value) in vars {
                    writeln!(out, "{}={}", escape_html(&name), escape_html(&value))?;
                }
                for (name, value) in context.iter() {
                    writeln!(out, "{}={}", escape_html(name), escape_html(&value.to_text()?))?;
                }
            }
            Directive::Set(attributes) => {
                let (mut var, mut text) = (None, None);
                for Attribute { name, value } in attributes {
                    let slot = match name.as_str() {
                        "var" => &mut var,
                        "value" => &mut text,
                        _ => return Err(invalid(name)),
                    };
                    if slot.replace(value).is_some() {
                        return Err(Error::DuplicateAttribute(name.clone()));
                    }
                }
                let var = var.ok_or_else(|| Error::MissingAttribute("var".into()))?;
                let text = text.ok_or_else(|| Error::MissingAttribute("value".into()))?;
                let text = interpolate(text, context, state)?;
                context.insert(var.as_str(), Value::from(text));
            }
        }
        Ok(())
    }
}

fn invalid(name: &str) -> Error {
    Error::InvalidAttribute(name.to_string())
}

/// The paths named by `file` and `virtual` attributes.
///
/// Both are looked up the same way, in the configured directories.
fn files(attributes: &[Attribute]) -> Result<Vec<&str>> {
    attributes
        .iter()
        .map(|Attribute { name, value }| match name.as_str() {
            "file" | "virtual" => Ok(value.as_str()),
            _ => Err(invalid(name)),
        })
        .collect()
}

/// The single `expr` attribute of an `if` or `elif`.
fn condition(attributes: &[Attribute]) -> Result<&str> {
    match attributes {
        [Attribute { name, value }] if name == "expr" => Ok(value),
        [] => Err(Error::MissingAttribute("expr".into())),
        [_, _, ..] if attributes.iter().all(|a| a.name == "expr") => {
            Err(Error::DuplicateAttribute("expr".into()))
        }
        _ => {
            let name = attributes
                .iter()
                .map(|a| a.name.as_str())
                .find(|name| *name != "expr")
                .unwrap_or("expr");
            Err(invalid(name))
        }
    }
}

/// True for `abbrev`, false for `bytes`.
fn size_format(format: &str) -> Result<bool> {
    match format {
        "bytes" => Ok(false),
        "abbrev" => Ok(true),
        _ => Err(Error::InvalidAttribute(format!("sizefmt={format:?}"))),
    }
}

fn format_time<Tz>(format: &str, time: &DateTime<Tz>) -> Result<String>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let mut out = String::new();
    write!(out, "{}", time.format(format))
        .map_err(|_| Error::InvalidAttribute(format!("timefmt={format:?}")))?;
    Ok(out)
}

/// The value of a variable: set in the context, one of the special
/// date variables, or from the environment.
pub(crate) fn lookup(name: &str, context: &Context, state: &State) -> Result<Option<String>> {
    if let Some(value) = context.get(name) {
        return Ok(Some(value.to_text()?));
    }
    match name {
        "DATE_LOCAL" => Ok(Some(format_time(&state.time_format, &Local::now())?)),
        "DATE_GMT" => Ok(Some(format_time(&state.time_format, &Utc::now())?)),
        "DOCUMENT_NAME" | "DOCUMENT_URI" | "LAST_MODIFIED" => {
            Err(Error::NotImplemented(name.to_string()))
        }
        _ => Ok(state.options.environment.var(name)),
    }
}

static VARIABLE: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"\\\$|\$\{(\w+)\}|\$(\w+)"));

/// Replace `${name}` and `$name` by the variable's value, or nothing
/// if it is undefined.  `\$` is a literal `$`.
pub(crate) fn interpolate(text: &str, context: &Context, state: &State) -> Result<String> {
    let variable = VARIABLE.as_ref().map_err(|e| Error::Regex(e.clone()))?;
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for captures in variable.captures_iter(text) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        out.push_str(&text[last..whole.start()]);
        last = whole.end();
        match captures.get(1).or_else(|| captures.get(2)) {
            Some(name) => {
                out.push_str(&lookup(name.as_str(), context, state)?.unwrap_or_default());
            }
            None => out.push('$'),
        }
    }
    out.push_str(&text[last..]);
    Ok(out)
}
