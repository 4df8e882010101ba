//! The Django dialect: `{{ variables|with:filters }}`, `{% tags %}`
//! and `{# comments #}`.
//!
//! ```
//! use synth::{django, Context};
//!
//! let template = django::Template::new(
//!     "{% for name in names %}{{ name|title }}{% if not forloop.last %}, {% endif %}{% endfor %}",
//! )?;
//! let context = Context::new().with("names", vec!["ann", "bob"]);
//! assert_eq!(template.render_to_string(&context)?, "Ann, Bob");
//! # Ok::<(), synth::Error>(())
//! ```
mod expression;
mod filters;
mod formatter;
mod lexer;
mod library;
mod markup;
mod parser;
mod tags;
#[cfg(test)]
mod tests;

pub use self::expression::Env;
pub use self::formatter::{format_datetime, format_duration};
pub use self::library::{Arguments, FilterFn, Library, Loader, PatternResolver, Resolver, TagFn};
pub use self::tags::Tag;

use crate::engine::{self, Node, RenderEngine};
use crate::{Context, Result, Value};
use log::debug;
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for rendering Django templates.
#[derive(Clone)]
pub struct Options {
    /// Escape html in variable output (unless marked safe).
    pub autoescape: bool,
    /// Output for a missing variable or attribute.
    pub default_value: Value,
    /// Used between numbers and units by `timesince` and `timeuntil`.
    pub nonbreaking_space: String,
    /// Named date formats, like `DATE_FORMAT`.
    pub formats: BTreeMap<String, String>,
    /// Where `include` and `extends` look for templates.
    pub directories: Vec<PathBuf>,
    /// Libraries available to `{% load %}` by name.
    pub libraries: BTreeMap<String, Library>,
    /// Asked, in order, for libraries not in `libraries`.
    pub loaders: Vec<Arc<dyn Loader>>,
    /// Asked, in order, to resolve `{% url %}` views.
    pub resolvers: Vec<Arc<dyn Resolver>>,
    /// Let the `debug` tag dump the context.
    pub debug: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            autoescape: true,
            default_value: Value::from(""),
            nonbreaking_space: "&nbsp;".to_string(),
            formats: formatter::default_formats(),
            directories: Vec::new(),
            libraries: BTreeMap::new(),
            loaders: Vec::new(),
            resolvers: Vec::new(),
            debug: false,
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, out: &mut fmt::Formatter) -> fmt::Result {
        out.debug_struct("Options")
            .field("autoescape", &self.autoescape)
            .field("default_value", &self.default_value)
            .field("nonbreaking_space", &self.nonbreaking_space)
            .field("formats", &self.formats)
            .field("directories", &self.directories)
            .field("libraries", &self.libraries)
            .field("loaders", &self.loaders.len())
            .field("resolvers", &self.resolvers.len())
            .field("debug", &self.debug)
            .finish()
    }
}

/// The names of the built-in filters, in order.
pub fn filter_names() -> impl Iterator<Item = &'static str> {
    filters::builtin_names()
}

pub struct Django;

impl RenderEngine for Django {
    type Tag = Tag;
    type Options = Options;

    const NAME: &'static str = "django";

    fn new() -> Self {
        Django
    }

    fn parse(&self, source: &str) -> Result<Node<Tag>> {
        let tree = parser::parse(source)?;
        debug!("Parsed {} template with {} nodes", Self::NAME, tree.count());
        Ok(tree)
    }

    fn render(
        &self,
        out: &mut dyn Write,
        tree: &Node<Tag>,
        context: &Context,
        options: &Options,
    ) -> Result<()> {
        let mut state = tags::State::new(options);
        tags::render(out, tree, &mut context.clone(), &mut state)
    }
}

/// A parsed Django template.
pub type Template = engine::Template<Django>;
