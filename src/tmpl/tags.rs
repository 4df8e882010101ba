use super::{parser, Options};
use crate::engine::{load, Children, Node};
use crate::text::{escape_controls, escape_html, uri_encode};
use crate::value::Data;
use crate::{Context, Error, Result, Value};
use std::io::Write;

pub type Body = Box<Node<Tag>>;

/// How `VAR` escapes its output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Escape {
    #[default]
    None,
    Html,
    Url,
    Js,
}

impl Escape {
    pub fn parse(mode: &str) -> Result<Self> {
        match mode.to_ascii_lowercase().as_str() {
            "none" | "0" => Ok(Escape::None),
            "html" | "1" => Ok(Escape::Html),
            "url" => Ok(Escape::Url),
            "js" => Ok(Escape::Js),
            _ => Err(Error::InvalidEscape(mode.to_string())),
        }
    }

    fn apply(self, text: String) -> String {
        match self {
            Escape::None => text,
            Escape::Html => escape_html(&text),
            Escape::Url => uri_encode(&text),
            Escape::Js => escape_controls(&text),
        }
    }
}

/// A tag.  The `name` of a tag is its `NAME` attribute, which is
/// only required when the tag is rendered.
#[derive(Debug)]
pub enum Tag {
    Comment,
    If {
        name: Option<String>,
        body: Body,
        otherwise: Option<Body>,
    },
    Include(Option<String>),
    Loop {
        name: Option<String>,
        body: Body,
    },
    Unless {
        name: Option<String>,
        body: Body,
        otherwise: Option<Body>,
    },
    Var {
        name: Option<String>,
        default: Option<String>,
        escape: Escape,
    },
}

impl Children<Tag> for Tag {
    fn children(&self) -> Box<dyn Iterator<Item = &Node<Tag>> + '_> {
        match self {
            Tag::If {
                body, otherwise, ..
            }
            | Tag::Unless {
                body, otherwise, ..
            } => Box::new(std::iter::once(&**body).chain(otherwise.as_deref())),
            Tag::Loop { body, .. } => Box::new(std::iter::once(&**body)),
            _ => Box::new(std::iter::empty()),
        }
    }
}

pub(crate) fn render(
    out: &mut dyn Write,
    node: &Node<Tag>,
    context: &Context,
    options: &Options,
) -> Result<()> {
    match node {
        Node::Text(text) => out.write_all(text.as_bytes())?,
        Node::Block(nodes) => {
            for node in nodes {
                render(out, node, context, options)?;
            }
        }
        Node::Tag(_, tag) => tag.render(out, context, options)?,
    }
    Ok(())
}

fn required(name: &Option<String>) -> Result<&str> {
    name.as_deref()
        .ok_or_else(|| Error::MissingAttribute("NAME".into()))
}

fn lookup(name: &Option<String>, context: &Context, options: &Options) -> Result<Value> {
    let name = required(name)?;
    Ok(context
        .get(name)
        .cloned()
        .unwrap_or_else(|| options.default_value.clone()))
}

impl Tag {
    fn render(&self, out: &mut dyn Write, context: &Context, options: &Options) -> Result<()> {
        match self {
            Tag::Comment => (),
            Tag::If {
                name,
                body,
                otherwise,
            } => {
                if lookup(name, context, options)?.to_boolean()? {
                    render(out, body, context, options)?;
                } else if let Some(otherwise) = otherwise {
                    render(out, otherwise, context, options)?;
                }
            }
            Tag::Unless {
                name,
                body,
                otherwise,
            } => {
                if !lookup(name, context, options)?.to_boolean()? {
                    render(out, body, context, options)?;
                } else if let Some(otherwise) = otherwise {
                    render(out, otherwise, context, options)?;
                }
            }
            Tag::Include(path) => {
                let path = required(path)?;
                let tree = parser::parse(&load(&options.directories, path)?)?;
                render(out, &tree, context, options)?;
            }
            Tag::Loop { name, body } => {
                let items = lookup(name, context, options)?.to_range()?;
                let size = items.len();
                for (i, item) in items.iter().enumerate() {
                    let mut copy = if options.global_vars {
                        context.clone()
                    } else {
                        Context::new()
                    };
                    copy.set_case_sensitive(false);
                    if options.loop_context_vars {
                        insert_loop_variables(&mut copy, i + 1, size);
                    }
                    let Data::Mapping(pairs) = item.data() else {
                        return Err(Error::conversion(item.type_name(), "mapping"));
                    };
                    for (key, value) in pairs.iter() {
                        copy.insert(key.as_str(), value.clone());
                    }
                    render(out, body, &copy, options)?;
                }
            }
            Tag::Var {
                name,
                default,
                escape,
            } => {
                let text = match (context.get(required(name)?), default) {
                    (Some(value), _) => value.to_text()?,
                    (None, Some(default)) => default.clone(),
                    (None, None) => options.default_value.to_text()?,
                };
                out.write_all(escape.apply(text).as_bytes())?;
            }
        }
        Ok(())
    }
}

/// The `__COUNTER__` family, for the 1-based iteration `i` of `size`.
fn insert_loop_variables(context: &mut Context, i: usize, size: usize) {
    let flag = |b: bool| Value::from(i32::from(b));
    context.insert("__SIZE__", size);
    context.insert("__TOTAL__", size);
    context.insert("__FIRST__", flag(i == 1));
    context.insert("__LAST__", flag(i == size));
    context.insert("__INNER__", flag(i != 1 && i != size));
    context.insert("__OUTER__", flag(i == 1 || i == size));
    context.insert("__ODD__", flag(i % 2 == 1));
    context.insert("__EVEN__", flag(i % 2 == 0));
    context.insert("__COUNTER__", i);
}
