//! The built-in tags and how they render.
use super::expression::{evaluate_arguments, Argument, Env, Filter, Pipeline};
use super::formatter::format_datetime;
use super::library::{find_library, Loaded};
use super::{filters, markup, parser, Options};
use crate::engine::{load, Children, Node, NodeId};
use crate::error::Recover;
use crate::text::escape_html;
use crate::{Context, Error, Result, Value};
use chrono::Local;
use log::trace;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{self, Write};
use std::path::Path;

pub type Body = Box<Node<Tag>>;

#[derive(Debug)]
pub enum Tag {
    /// `{{ pipeline }}`
    Variable(Pipeline),
    Autoescape(bool, Body),
    Block(String, Body),
    Comment,
    CsrfToken,
    Cycle {
        values: Vec<Pipeline>,
        name: Option<String>,
        silent: bool,
    },
    Debug,
    /// The parent template, and the rest of this template.
    Extends(Pipeline, Body),
    Filter(Vec<Filter>, Body),
    Firstof(Vec<Pipeline>),
    For {
        names: Vec<String>,
        sequence: Pipeline,
        reversed: bool,
        body: Body,
        empty: Option<Body>,
    },
    If {
        branches: Vec<(Pipeline, Body)>,
        otherwise: Option<Body>,
    },
    Ifchanged {
        values: Vec<Pipeline>,
        body: Body,
        otherwise: Option<Body>,
    },
    /// `ifequal` (`true`) or `ifnotequal` (`false`).
    Ifequal {
        expected: bool,
        left: Pipeline,
        right: Pipeline,
        body: Body,
        otherwise: Option<Body>,
    },
    Include {
        path: Pipeline,
        arguments: Vec<Argument>,
        only: bool,
    },
    Load {
        libraries: Vec<String>,
        names: Option<Vec<String>>,
    },
    Now(Pipeline),
    Regroup {
        sequence: Pipeline,
        trail: String,
        name: String,
    },
    Spaceless(Body),
    Ssi {
        path: String,
        parsed: bool,
    },
    Templatetag(String),
    Url {
        view: Pipeline,
        arguments: Vec<Argument>,
        name: Option<String>,
    },
    Verbatim(String),
    Widthratio(Pipeline, Pipeline, Pipeline),
    With(Vec<(String, Pipeline)>, Body),
    /// A tag not known to the parser, looked up in the loaded
    /// libraries when rendered.
    Library {
        name: String,
        arguments: Vec<Argument>,
    },
}

impl Children<Tag> for Tag {
    fn children(&self) -> Box<dyn Iterator<Item = &Node<Tag>> + '_> {
        match self {
            Tag::Autoescape(_, body)
            | Tag::Block(_, body)
            | Tag::Extends(_, body)
            | Tag::Filter(_, body)
            | Tag::Spaceless(body)
            | Tag::With(_, body) => Box::new(std::iter::once(&**body)),
            Tag::For { body, empty, .. } => {
                Box::new(std::iter::once(&**body).chain(empty.as_deref()))
            }
            Tag::If {
                branches,
                otherwise,
            } => Box::new(
                branches
                    .iter()
                    .map(|(_, body)| &**body)
                    .chain(otherwise.as_deref()),
            ),
            Tag::Ifchanged {
                body, otherwise, ..
            }
            | Tag::Ifequal {
                body, otherwise, ..
            } => Box::new(std::iter::once(&**body).chain(otherwise.as_deref())),
            _ => Box::new(std::iter::empty()),
        }
    }
}

/// Everything that changes during one top-level render.
pub(crate) struct State<'o> {
    options: &'o Options,
    autoescape: bool,
    loaded: Loaded,
    cycles: HashMap<NodeId, usize>,
    changes: HashMap<NodeId, Value>,
    /// Block contents that replace a block's own body, while the
    /// parent of an `extends` is rendered.
    overrides: Option<BTreeMap<String, String>>,
    /// Where rendered blocks are recorded, while capturing.
    captured: Option<BTreeMap<String, String>>,
    /// Names of the blocks being rendered, innermost last.
    blocks: Vec<String>,
}

impl<'o> State<'o> {
    pub(crate) fn new(options: &'o Options) -> Self {
        State {
            options,
            autoescape: options.autoescape,
            loaded: Loaded::default(),
            cycles: HashMap::new(),
            changes: HashMap::new(),
            overrides: None,
            captured: None,
            blocks: Vec::new(),
        }
    }

    fn env<'s>(&'s self, context: &'s Context) -> Env<'s> {
        Env {
            context,
            options: self.options,
            autoescape: self.autoescape,
            filters: &self.loaded.filters,
            block: self.blocks.last().map(String::as_str),
        }
    }
}

pub(crate) fn render(
    out: &mut dyn Write,
    node: &Node<Tag>,
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
        Node::Tag(id, tag) => tag.render(*id, out, context, state)?,
    }
    Ok(())
}

fn render_to_string(
    node: &Node<Tag>,
    context: &mut Context,
    state: &mut State,
) -> Result<String> {
    let mut buf = Vec::new();
    render(&mut buf, node, context, state)?;
    String::from_utf8(buf)
        .map_err(|e| Error::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
}

impl Tag {
    fn render(
        &self,
        id: NodeId,
        out: &mut dyn Write,
        context: &mut Context,
        state: &mut State,
    ) -> Result<()> {
        match self {
            Tag::Variable(pipeline) => {
                let value = pipeline.resolve(&state.env(context))?;
                value.render_to(out, state.autoescape)?;
            }
            Tag::Autoescape(on, body) => {
                let saved = std::mem::replace(&mut state.autoescape, *on);
                let result = render(out, body, context, state);
                state.autoescape = saved;
                result?;
            }
            Tag::Block(name, body) => block(out, name, body, context, state)?,
            Tag::Comment => (),
            Tag::CsrfToken => {
                if let Some(token) = context.get("csrf_token") {
                    let token = token.to_text()?;
                    if token != "NOTPROVIDED" {
                        write!(
                            out,
                            "<div style='display:none'><input type='hidden' \
                             name='csrfmiddlewaretoken' value='{}' /></div>",
                            escape_html(&token),
                        )?;
                    }
                }
            }
            Tag::Cycle {
                values,
                name,
                silent,
            } => {
                let index = state.cycles.get(&id).copied().unwrap_or(0);
                let Some(current) = values.get(index % values.len().max(1)) else {
                    return Ok(());
                };
                let value = current.resolve(&state.env(context))?;
                state.cycles.insert(id, index + 1);
                if !silent {
                    value.render_to(out, state.autoescape)?;
                }
                if let Some(name) = name {
                    context.insert(name.as_str(), value);
                }
            }
            Tag::Debug => {
                if state.options.debug {
                    writeln!(out, "<h1>Context:</h1>")?;
                    for (key, value) in context.iter() {
                        writeln!(
                            out,
                            "    {} = {}<br />",
                            escape_html(key),
                            escape_html(&value.to_string()),
                        )?;
                    }
                }
            }
            Tag::Extends(parent, body) => extends(out, parent, body, context, state)?,
            Tag::Filter(chain, body) => {
                let text = render_to_string(body, context, state)?;
                let env = state.env(context);
                let mut value = Value::from(text);
                for filter in chain {
                    let args = match &filter.argument {
                        Some(arg) => vec![arg.evaluate(&env)?],
                        None => Vec::new(),
                    };
                    value = filters::apply(&env, &filter.name, value, &args)?;
                }
                write!(out, "{value}")?;
            }
            Tag::Firstof(values) => {
                let env = state.env(context);
                for pipeline in values {
                    if let Some(value) = pipeline.evaluate(&env).recover()? {
                        if value.to_boolean()? {
                            value.render_to(out, state.autoescape)?;
                            break;
                        }
                    }
                }
            }
            Tag::For {
                names,
                sequence,
                reversed,
                body,
                empty,
            } => {
                let sequence = sequence.resolve(&state.env(context))?;
                let mut items = sequence.to_range()?;
                if *reversed {
                    items.reverse();
                }
                if items.is_empty() {
                    if let Some(empty) = empty {
                        render(out, empty, context, state)?;
                    }
                    return Ok(());
                }
                let parent = context.get("forloop").cloned().unwrap_or_else(Value::unit);
                let len = items.len();
                for (i, item) in items.into_iter().enumerate() {
                    let mut local = context.clone();
                    bind_loop_variables(&mut local, names, item, state.options)?;
                    local.insert("forloop", forloop(i, len, parent.clone()));
                    render(out, body, &mut local, state)?;
                }
            }
            Tag::If {
                branches,
                otherwise,
            } => {
                for (condition, body) in branches {
                    if condition.resolve(&state.env(context))?.to_boolean()? {
                        return render(out, body, context, state);
                    }
                }
                if let Some(otherwise) = otherwise {
                    render(out, otherwise, context, state)?;
                }
            }
            Tag::Ifchanged {
                values,
                body,
                otherwise,
            } => {
                let (current, rendered) = if values.is_empty() {
                    let text = render_to_string(body, context, state)?;
                    (Value::from(text.as_str()), Some(text))
                } else {
                    let env = state.env(context);
                    let values = values
                        .iter()
                        .map(|v| v.resolve(&env))
                        .collect::<Result<Vec<_>>>()?;
                    (Value::sequence(values), None)
                };
                let changed = state
                    .changes
                    .get(&id)
                    .map_or(true, |last| !last.equal(&current));
                if changed {
                    state.changes.insert(id, current);
                    match rendered {
                        Some(text) => out.write_all(text.as_bytes())?,
                        None => render(out, body, context, state)?,
                    }
                } else if let Some(otherwise) = otherwise {
                    render(out, otherwise, context, state)?;
                }
            }
            Tag::Ifequal {
                expected,
                left,
                right,
                body,
                otherwise,
            } => {
                let env = state.env(context);
                let equal = left.resolve(&env)?.equal(&right.resolve(&env)?);
                if equal == *expected {
                    render(out, body, context, state)?;
                } else if let Some(otherwise) = otherwise {
                    render(out, otherwise, context, state)?;
                }
            }
            Tag::Include {
                path,
                arguments,
                only,
            } => {
                let env = state.env(context);
                let path = path.resolve(&env)?.to_text()?;
                let arguments = evaluate_arguments(&env, arguments)?;
                let tree = parser::parse(&load(&state.options.directories, &path)?)?;
                let mut local = if *only {
                    let mut fresh = Context::new();
                    fresh.set_case_sensitive(context.is_case_sensitive());
                    fresh
                } else {
                    context.clone()
                };
                local.extend(arguments.keyword);
                render(out, &tree, &mut local, state)?;
            }
            Tag::Load { libraries, names } => {
                for name in libraries {
                    let library = find_library(
                        &state.options.libraries,
                        &state.options.loaders,
                        name,
                    )?;
                    trace!("Loaded library {name:?}: {library:?}");
                    state.loaded.install(&library, names.as_deref())?;
                }
            }
            Tag::Now(format) => {
                let format = format.resolve(&state.env(context))?.to_text()?;
                let now = Local::now().naive_local();
                out.write_all(format_datetime(&state.options.formats, &format, &now).as_bytes())?;
            }
            Tag::Regroup {
                sequence,
                trail,
                name,
            } => {
                let groups = match sequence.evaluate(&state.env(context)).recover()? {
                    Some(value) => value.group_by(trail).recover()?.unwrap_or_default(),
                    None => Vec::new(),
                };
                let groups = groups.into_iter().map(|(grouper, list)| {
                    Value::mapping([
                        ("grouper".to_string(), grouper),
                        ("list".to_string(), Value::sequence(list)),
                    ])
                });
                context.insert(name.as_str(), Value::sequence(groups));
            }
            Tag::Spaceless(body) => {
                let text = render_to_string(body, context, state)?;
                out.write_all(markup::spaceless(&text)?.as_bytes())?;
            }
            Tag::Ssi { path, parsed } => {
                let path = Path::new(path);
                if !path.is_absolute() {
                    return Err(Error::Logic(format!(
                        "ssi needs an absolute path, not {}",
                        path.display(),
                    )));
                }
                let source = fs::read_to_string(path)?;
                if *parsed {
                    let tree = parser::parse(&source)?;
                    render(out, &tree, context, state)?;
                } else {
                    for line in source.lines() {
                        writeln!(out, "{line}")?;
                    }
                }
            }
            Tag::Templatetag(name) => match templatetag(name) {
                Some(marker) => out.write_all(marker.as_bytes())?,
                None => state.options.default_value.render_to(out, state.autoescape)?,
            },
            Tag::Url {
                view,
                arguments,
                name,
            } => {
                let env = state.env(context);
                let view = view.resolve(&env)?.to_text()?;
                let arguments = evaluate_arguments(&env, arguments)?;
                let url = state
                    .options
                    .resolvers
                    .iter()
                    .find_map(|resolver| resolver.resolve(&view, &arguments));
                trace!("Resolved view {view:?} to {url:?}");
                match (url, name) {
                    (url, Some(name)) => {
                        context.insert(name.as_str(), url.unwrap_or_default());
                    }
                    (Some(url), None) => out.write_all(url.as_bytes())?,
                    (None, None) => return Err(Error::UnresolvedUrl(view)),
                }
            }
            Tag::Verbatim(text) => out.write_all(text.as_bytes())?,
            Tag::Widthratio(value, limit, width) => {
                let env = state.env(context);
                let value = value.resolve(&env)?.to_number()?;
                let limit = limit.resolve(&env)?.to_number()?;
                let width = width.resolve(&env)?.to_number()?;
                let ratio = if limit == 0.0 {
                    0.0
                } else {
                    (value / limit * width).round()
                };
                write!(out, "{}", Value::from_number(ratio))?;
            }
            Tag::With(bindings, body) => {
                let mut local = context.clone();
                {
                    let env = state.env(context);
                    for (name, pipeline) in bindings {
                        local.insert(name.as_str(), pipeline.resolve(&env)?);
                    }
                }
                render(out, body, &mut local, state)?;
            }
            Tag::Library { name, arguments } => {
                let tag = state
                    .loaded
                    .tags
                    .get(name)
                    .cloned()
                    .ok_or_else(|| Error::MissingTag(name.clone()))?;
                let env = state.env(context);
                let arguments = evaluate_arguments(&env, arguments)?;
                tag(out, &env, &arguments)?;
            }
        }
        Ok(())
    }
}

fn templatetag(name: &str) -> Option<&'static str> {
    Some(match name {
        "openblock" => "{%",
        "closeblock" => "%}",
        "openvariable" => "{{",
        "closevariable" => "}}",
        "openbrace" => "{",
        "closebrace" => "}",
        "opencomment" => "{#",
        "closecomment" => "#}",
        _ => return None,
    })
}

fn bind_loop_variables(
    context: &mut Context,
    names: &[String],
    item: Value,
    options: &Options,
) -> Result<()> {
    if let [name] = names {
        context.insert(name.as_str(), item);
    } else {
        let mut parts = item.to_range()?.into_iter();
        for name in names {
            let part = parts.next().unwrap_or_else(|| options.default_value.clone());
            context.insert(name.as_str(), part);
        }
    }
    Ok(())
}

fn forloop(i: usize, len: usize, parent: Value) -> Value {
    Value::mapping([
        ("counter".to_string(), Value::from(i + 1)),
        ("counter0".to_string(), Value::from(i)),
        ("revcounter".to_string(), Value::from(len - i)),
        ("revcounter0".to_string(), Value::from(len - i - 1)),
        ("first".to_string(), Value::from(i == 0)),
        ("last".to_string(), Value::from(i + 1 == len)),
        ("parentloop".to_string(), parent),
    ])
}

fn block(
    out: &mut dyn Write,
    name: &str,
    body: &Node<Tag>,
    context: &mut Context,
    state: &mut State,
) -> Result<()> {
    let content = match state.overrides.as_ref().and_then(|o| o.get(name)) {
        Some(content) => content.clone(),
        None => {
            state.blocks.push(name.to_string());
            let content = render_to_string(body, context, state);
            state.blocks.pop();
            content?
        }
    };
    if let Some(captured) = state.captured.as_mut() {
        captured.insert(name.to_string(), content.clone());
    }
    out.write_all(content.as_bytes())?;
    Ok(())
}

/// Render `body` as an extension of the template named by `parent`.
///
/// The parent is first rendered on its own to capture its blocks,
/// which become `block.super` while the body is rendered to capture
/// its blocks.  Finally the parent is rendered for real, each block
/// replaced by the body's version where there is one.
fn extends(
    out: &mut dyn Write,
    parent: &Pipeline,
    body: &Node<Tag>,
    context: &mut Context,
    state: &mut State,
) -> Result<()> {
    let path = parent.resolve(&state.env(context))?.to_text()?;
    let parent = parser::parse(&load(&state.options.directories, &path)?)?;

    let outer_overrides = state.overrides.take();
    let outer_captured = state.captured.replace(BTreeMap::new());
    let cycles = state.cycles.clone();
    let changes = state.changes.clone();
    render(&mut io::sink(), &parent, &mut context.clone(), state)?;
    let supers = state.captured.replace(BTreeMap::new()).unwrap_or_default();
    state.cycles = cycles;
    state.changes = changes;

    let mut derived = context.clone();
    for (name, content) in supers {
        derived.insert(format!("{name}_super"), Value::from(content).mark_safe());
    }
    state.overrides.clone_from(&outer_overrides);
    render(&mut io::sink(), body, &mut derived, state)?;
    let mut blocks = state.captured.take().unwrap_or_default();
    if let Some(outer) = &outer_overrides {
        blocks.extend(outer.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    state.overrides = Some(blocks);
    state.captured = outer_captured;
    let result = render(out, &parent, context, state);
    state.overrides = outer_overrides;
    result
}
