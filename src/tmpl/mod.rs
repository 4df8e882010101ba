//! The TMPL dialect, after Perl's HTML::Template: `<TMPL_VAR name>`,
//! `<TMPL_IF>`, `<TMPL_UNLESS>`, `<TMPL_LOOP>`, `<TMPL_INCLUDE>` and
//! `<TMPL_COMMENT>`.  Any tag may also be written inside an html
//! comment, as `<!-- TMPL_VAR name -->`.
//!
//! ```
//! use synth::{tmpl, Context, Value};
//!
//! let template = tmpl::Template::new(
//!     "<TMPL_LOOP people><TMPL_VAR name><TMPL_UNLESS __last__>, </TMPL_UNLESS></TMPL_LOOP>",
//! )?;
//! let person = |name: &str| Value::mapping([("name".to_string(), Value::from(name))]);
//! let context = Context::new().with("people", vec![person("Ann"), person("Bob")]);
//! assert_eq!(template.render_to_string(&context)?, "Ann, Bob");
//! # Ok::<(), synth::Error>(())
//! ```
//!
//! Variable names are case-insensitive.  Inside a loop only the
//! variables of the current row are visible, unless
//! [`Options::global_vars`] is set.
mod parser;
mod tags;

pub use self::tags::{Escape, Tag};

use crate::engine::{self, Node, RenderEngine};
use crate::{Context, Result, Value};
use log::debug;
use std::io::Write;
use std::path::PathBuf;

/// Configuration for rendering TMPL templates.
#[derive(Clone, Debug)]
pub struct Options {
    /// Where `INCLUDE` looks for templates.
    pub directories: Vec<PathBuf>,
    /// Output for an undefined variable without a `DEFAULT`.
    pub default_value: Value,
    /// Set `__COUNTER__`, `__FIRST__` and the other loop variables.
    pub loop_context_vars: bool,
    /// Let loop bodies see the variables outside the loop.
    pub global_vars: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            directories: Vec::new(),
            default_value: Value::from(""),
            loop_context_vars: true,
            global_vars: false,
        }
    }
}

pub struct Tmpl;

impl RenderEngine for Tmpl {
    type Tag = Tag;
    type Options = Options;

    const NAME: &'static str = "tmpl";

    fn new() -> Self {
        Tmpl
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
        let mut context = context.clone();
        context.set_case_sensitive(false);
        tags::render(out, tree, &context, options)
    }
}

/// A parsed TMPL template.
pub type Template = engine::Template<Tmpl>;
