//! The Server Side Includes dialect: plain text with `<!--#directive
//! name="value" -->` directives, as in Apache's mod_include.
//!
//! ```
//! use synth::{ssi, Context};
//!
//! let template = ssi::Template::new(
//!     "<!--#set var='who' value='${name}s' --><!--#if expr='$who' -->Hi <!--#echo var='who' -->!<!--#endif -->",
//! )?;
//! let context = Context::new().with("name", "<friend>");
//! assert_eq!(template.render_to_string(&context)?, "Hi &lt;friend&gt;s!");
//! # Ok::<(), synth::Error>(())
//! ```
//!
//! A directive that fails is replaced by the error message (see
//! [`Options::error_message`]) and rendering goes on, unless
//! [`Options::throw_on_errors`] is set.
mod directives;
mod expr;
mod parser;

pub use self::directives::{Attribute, Directive};

use crate::engine::{self, Node, RenderEngine};
use crate::{Context, Error, Result};
use log::debug;
use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;

/// Where `echo` and `printenv` find environment variables, and how
/// `exec cmd` runs commands.
pub trait Environment: Send + Sync {
    fn var(&self, name: &str) -> Option<String>;

    /// All variables, in no particular order.
    fn vars(&self) -> Vec<(String, String)>;

    /// Run `command` and return what it wrote to stdout.
    fn execute(&self, command: &str) -> Result<Vec<u8>>;
}

/// The environment of the current process, with commands run by the
/// system shell.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn vars(&self) -> Vec<(String, String)> {
        std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect()
    }

    fn execute(&self, command: &str) -> Result<Vec<u8>> {
        debug!("Running {command:?}");
        let output = if cfg!(windows) {
            Command::new("cmd").args(["/C", command]).output()?
        } else {
            Command::new("sh").args(["-c", command]).output()?
        };
        if output.status.success() {
            Ok(output.stdout)
        } else {
            Err(Error::Logic(format!("{command:?} failed: {}", output.status)))
        }
    }
}

/// Configuration for rendering SSI templates.
///
/// The four message and format settings are only defaults; a
/// `config` directive changes them for the rest of the render.
#[derive(Clone)]
pub struct Options {
    /// Where `include`, `fsize` and `flastmod` look for files.
    pub directories: Vec<PathBuf>,
    /// `bytes` or `abbrev`, for `fsize`.
    pub size_format: String,
    /// A strftime format, for `flastmod` and `DATE_LOCAL`.
    pub time_format: String,
    /// Output of `echo` for an undefined variable.
    pub echo_message: String,
    /// Output in place of a directive that failed.
    pub error_message: String,
    /// Make a failing directive fail the render.
    pub throw_on_errors: bool,
    pub environment: Arc<dyn Environment>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            directories: Vec::new(),
            size_format: "bytes".to_string(),
            time_format: "%A, %d-%b-%Y %H:%M:%S %Z".to_string(),
            echo_message: "(none)".to_string(),
            error_message: "[an error occurred while processing this directive]".to_string(),
            throw_on_errors: false,
            environment: Arc::new(ProcessEnvironment),
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, out: &mut fmt::Formatter) -> fmt::Result {
        out.debug_struct("Options")
            .field("directories", &self.directories)
            .field("size_format", &self.size_format)
            .field("time_format", &self.time_format)
            .field("echo_message", &self.echo_message)
            .field("error_message", &self.error_message)
            .field("throw_on_errors", &self.throw_on_errors)
            .finish_non_exhaustive()
    }
}

pub struct Ssi;

impl RenderEngine for Ssi {
    type Tag = Directive;
    type Options = Options;

    const NAME: &'static str = "ssi";

    fn new() -> Self {
        Ssi
    }

    fn parse(&self, source: &str) -> Result<Node<Directive>> {
        let tree = parser::parse(source)?;
        debug!("Parsed {} template with {} nodes", Self::NAME, tree.count());
        Ok(tree)
    }

    fn render(
        &self,
        out: &mut dyn Write,
        tree: &Node<Directive>,
        context: &Context,
        options: &Options,
    ) -> Result<()> {
        let mut state = directives::State::new(options);
        directives::render(out, tree, &mut context.clone(), &mut state)
    }
}

/// A parsed SSI template.
pub type Template = engine::Template<Ssi>;
