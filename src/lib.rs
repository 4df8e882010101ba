//! Synth renders templates written in one of three dialects:
//!
//! * [`django`], the language of Django templates, with variables,
//!   filters, tags, template inheritance and loadable libraries.
//! * [`ssi`], Server Side Includes as in Apache's mod_include.
//! * [`tmpl`], the language of Perl's HTML::Template.
//!
//! All three render the same [`Value`]s from a [`Context`] of named
//! values.  A template is parsed once into a tree and can then be
//! rendered any number of times, concurrently if you like, each
//! render with its own context and options.
//!
//! ```
//! use synth::{django, Context, Value};
//!
//! let template = django::Template::new("Hello {{ who|upper }}!")?;
//! assert_eq!(template.render_to_string(&Context::new())?, "Hello !");
//!
//! let context = Context::new().with("who", Value::from("<you>"));
//! assert_eq!(template.render_to_string(&context)?, "Hello &lt;YOU&gt;!");
//! # Ok::<(), synth::Error>(())
//! ```
//!
//! # Values
//!
//! A [`Value`] is created from most plain rust data with `From`:
//! booleans, numbers, strings, dates and times from `chrono`, vectors
//! and maps.  Other types can take part by implementing
//! [`value::Adapter`] and being wrapped with [`Value::object`].
//!
//! # Rendering
//!
//! Each dialect has its own `Options`, passed by reference to
//! [`Template::render`](engine::Template::render) and friends; the
//! options are never changed by a render.  A render writes to any
//! [`std::io::Write`].
//!
//! # Errors
//!
//! Parsing reports [`Error::Parse`] with a message pointing out the
//! offending line of the template.  A variable missing in the context
//! is not an error; it renders as the configured default value.

mod context;
pub mod django;
pub mod engine;
mod error;
pub mod nom_delimited_list;
mod parseresult;
pub mod ssi;
pub mod text;
pub mod tmpl;
pub mod value;

pub use crate::context::Context;
pub use crate::engine::{Node, NodeId, RenderEngine, Template};
pub use crate::error::{Error, Result};
pub use crate::value::{Adapter, Capabilities, Data, Value};
