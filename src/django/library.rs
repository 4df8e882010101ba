//! Extension points: libraries of tags and filters, the loaders that
//! find libraries by name, and the resolvers behind the `url` tag.
use super::expression::Env;
use crate::{Error, Result, Value};
use itertools::Itertools;
use log::trace;
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::sync::Arc;

/// A filter: the value, its arguments, and the evaluation environment
/// in, the filtered value out.
pub type FilterFn = Arc<dyn Fn(&Env, Value, &[Value]) -> Result<Value> + Send + Sync>;

/// A tag provided by a library, called with its evaluated arguments.
pub type TagFn = Arc<dyn Fn(&mut dyn Write, &Env, &Arguments) -> Result<()> + Send + Sync>;

/// Evaluated tag arguments.
#[derive(Clone, Debug, Default)]
pub struct Arguments {
    pub positional: Vec<Value>,
    pub keyword: BTreeMap<String, Value>,
}

/// A named bundle of tags and filters, made available to a template
/// by `{% load name %}`.
///
/// ```
/// use synth::django::Library;
/// use synth::Value;
///
/// let library = Library::new()
///     .filter("double", |_env, value, _args| {
///         Ok(Value::from_number(value.to_number()? * 2.0))
///     });
/// assert!(library.get_filter("double").is_some());
/// ```
#[derive(Clone, Default)]
pub struct Library {
    tags: BTreeMap<String, TagFn>,
    filters: BTreeMap<String, FilterFn>,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn tag<F>(mut self, name: &str, tag: F) -> Self
    where
        F: Fn(&mut dyn Write, &Env, &Arguments) -> Result<()> + Send + Sync + 'static,
    {
        self.tags.insert(name.to_string(), Arc::new(tag));
        self
    }

    #[must_use]
    pub fn filter<F>(mut self, name: &str, filter: F) -> Self
    where
        F: Fn(&Env, Value, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.filters.insert(name.to_string(), Arc::new(filter));
        self
    }

    pub fn get_tag(&self, name: &str) -> Option<&TagFn> {
        self.tags.get(name)
    }

    pub fn get_filter(&self, name: &str) -> Option<&FilterFn> {
        self.filters.get(name)
    }

    pub fn tag_names(&self) -> impl Iterator<Item = &str> {
        self.tags.keys().map(String::as_str)
    }

    pub fn filter_names(&self) -> impl Iterator<Item = &str> {
        self.filters.keys().map(String::as_str)
    }
}

impl fmt::Debug for Library {
    fn fmt(&self, out: &mut fmt::Formatter) -> fmt::Result {
        write!(
            out,
            "Library {{ tags: [{}], filters: [{}] }}",
            self.tag_names().format(", "),
            self.filter_names().format(", "),
        )
    }
}

/// Finds libraries that are not preregistered in the options.
pub trait Loader: Send + Sync {
    fn load(&self, name: &str) -> Option<Library>;
}

/// Maps a view name and arguments to a url.
pub trait Resolver: Send + Sync {
    fn resolve(&self, view: &str, arguments: &Arguments) -> Option<String>;
}

/// A [`Resolver`] from a fixed table of views to paths.  Positional
/// arguments are appended to the path, each after a `/`.
///
/// ```
/// use synth::django::{Arguments, PatternResolver, Resolver};
///
/// let resolver = PatternResolver::new().pattern("blog.post", "/blog");
/// let args = Arguments {
///     positional: vec![2014.into(), "hello".into()],
///     ..Default::default()
/// };
/// assert_eq!(resolver.resolve("blog.post", &args).as_deref(), Some("/blog/2014/hello"));
/// assert_eq!(resolver.resolve("other", &args), None);
/// ```
#[derive(Clone, Debug, Default)]
pub struct PatternResolver {
    patterns: BTreeMap<String, String>,
}

impl PatternResolver {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn pattern(mut self, view: &str, path: &str) -> Self {
        self.patterns.insert(view.to_string(), path.to_string());
        self
    }
}

impl Resolver for PatternResolver {
    fn resolve(&self, view: &str, arguments: &Arguments) -> Option<String> {
        let mut url = self.patterns.get(view)?.clone();
        for arg in &arguments.positional {
            url.push('/');
            url.push_str(&arg.to_string());
        }
        Some(url)
    }
}

/// The tags and filters loaded so far in one render.
#[derive(Clone, Default)]
pub(crate) struct Loaded {
    pub(crate) tags: BTreeMap<String, TagFn>,
    pub(crate) filters: BTreeMap<String, FilterFn>,
}

impl Loaded {
    /// Install all of `library`, or only the tags and filters in
    /// `names`.
    pub(crate) fn install(&mut self, library: &Library, names: Option<&[String]>) -> Result<()> {
        match names {
            None => {
                self.tags.extend(library.tags.iter().map(|(k, v)| (k.clone(), v.clone())));
                self.filters
                    .extend(library.filters.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            Some(names) => {
                for name in names {
                    let tag = library.get_tag(name);
                    let filter = library.get_filter(name);
                    if tag.is_none() && filter.is_none() {
                        return Err(Error::MissingKey(name.clone()));
                    }
                    if let Some(tag) = tag {
                        self.tags.insert(name.clone(), tag.clone());
                    }
                    if let Some(filter) = filter {
                        self.filters.insert(name.clone(), filter.clone());
                    }
                }
            }
        }
        Ok(())
    }
}

/// Find the library `name`, first among the preregistered ones, then
/// by asking each loader in turn.
pub(crate) fn find_library(
    libraries: &BTreeMap<String, Library>,
    loaders: &[Arc<dyn Loader>],
    name: &str,
) -> Result<Library> {
    if let Some(library) = libraries.get(name) {
        return Ok(library.clone());
    }
    trace!("Asking {} loaders for library {name:?}", loaders.len());
    loaders
        .iter()
        .find_map(|loader| loader.load(name))
        .ok_or_else(|| Error::MissingLibrary(name.to_string()))
}
