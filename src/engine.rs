use crate::{Context, Error, Result};
use log::debug;
use std::fs;
use std::io::{self, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

/// A template dialect: a parser from source text to a tree of
/// [`Node`]s, and a renderer walking such a tree.
///
/// An engine holds no render state, so one engine (and any tree it
/// parsed) can be shared between threads and renders.  Everything
/// that changes while rendering lives in a state value created inside
/// `render`.
pub trait RenderEngine {
    /// The dialect's tag, the payload of [`Node::Tag`].
    type Tag;
    /// Render-wide configuration.
    type Options: Default;

    /// Name of the dialect, used in log messages.
    const NAME: &'static str;

    fn new() -> Self;

    fn parse(&self, source: &str) -> Result<Node<Self::Tag>>;

    fn render(
        &self,
        out: &mut dyn Write,
        tree: &Node<Self::Tag>,
        context: &Context,
        options: &Self::Options,
    ) -> Result<()>;
}

/// A parsed template.
#[derive(Debug)]
pub enum Node<T> {
    /// Literal text, written as is.
    Text(String),
    /// A sequence of nodes, rendered in order.
    Block(Vec<Node<T>>),
    /// A tag, dispatched to the dialect's handler.
    Tag(NodeId, T),
}

impl<T> Node<T> {
    /// Number of nodes in this tree, counting self.
    pub fn count(&self) -> usize
    where
        T: Children<T>,
    {
        match self {
            Node::Text(_) => 1,
            Node::Block(nodes) => 1 + nodes.iter().map(Node::count).sum::<usize>(),
            Node::Tag(_, tag) => {
                1 + tag.children().map(|n| n.count()).sum::<usize>()
            }
        }
    }
}

/// Access to the bodies nested in a tag.
pub trait Children<T> {
    fn children(&self) -> Box<dyn Iterator<Item = &Node<T>> + '_>;
}

/// Identity of a tag node, assigned when parsing.
///
/// Stateful tags (`cycle`, `ifchanged`) key their per-render state on
/// this, so every parse of a template, including each parse of an
/// included file, gets ids of its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    template: u32,
    index: u32,
}

/// Hands out [`NodeId`]s for one parse.
pub(crate) struct Ids {
    template: u32,
    next: u32,
}

static TEMPLATES: AtomicU32 = AtomicU32::new(0);

impl Ids {
    pub(crate) fn new() -> Self {
        Ids {
            template: TEMPLATES.fetch_add(1, Ordering::Relaxed),
            next: 0,
        }
    }

    pub(crate) fn next(&mut self) -> NodeId {
        let id = NodeId {
            template: self.template,
            index: self.next,
        };
        self.next += 1;
        id
    }
}

/// A parsed template in dialect `E`, ready to render any number of
/// times.
pub struct Template<E: RenderEngine> {
    tree: Node<E::Tag>,
    engine: PhantomData<E>,
}

impl<E: RenderEngine> Template<E> {
    pub fn new(source: &str) -> Result<Self> {
        let tree = E::new().parse(source)?;
        Ok(Template {
            tree,
            engine: PhantomData,
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading {} template {}", E::NAME, path.display());
        Self::new(&fs::read_to_string(path)?)
    }

    pub fn tree(&self) -> &Node<E::Tag> {
        &self.tree
    }

    pub fn render(
        &self,
        out: &mut dyn Write,
        context: &Context,
        options: &E::Options,
    ) -> Result<()> {
        E::new().render(out, &self.tree, context, options)
    }

    pub fn render_to_string(&self, context: &Context) -> Result<String> {
        self.render_to_string_with(context, &E::Options::default())
    }

    pub fn render_to_string_with(
        &self,
        context: &Context,
        options: &E::Options,
    ) -> Result<String> {
        let mut buf = Vec::new();
        self.render(&mut buf, context, options)?;
        String::from_utf8(buf)
            .map_err(|e| Error::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
    }
}

/// Find `path` directly or below one of `directories`.
pub(crate) fn locate(directories: &[PathBuf], path: &str) -> Result<PathBuf> {
    let direct = Path::new(path);
    if direct.is_absolute() || direct.exists() {
        return Ok(direct.to_path_buf());
    }
    directories
        .iter()
        .map(|dir| dir.join(path))
        .find(|candidate| candidate.exists())
        .ok_or_else(|| {
            Error::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("template {path:?} not found"),
            ))
        })
}

/// Read the file found by [`locate`].
pub(crate) fn load(directories: &[PathBuf], path: &str) -> Result<String> {
    let found = locate(directories, path)?;
    debug!("Reading {}", found.display());
    Ok(fs::read_to_string(found)?)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn ids_are_unique_per_parse() {
        let mut a = Ids::new();
        let mut b = Ids::new();
        let (a0, a1, b0) = (a.next(), a.next(), b.next());
        assert_ne!(a0, a1);
        assert_ne!(a0, b0);
    }

    #[test]
    fn locate_in_directories() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = fs::File::create(dir.path().join("x.tpl")).unwrap();
        write!(f, "hello").unwrap();
        let dirs = vec![dir.path().to_path_buf()];
        assert_eq!(load(&dirs, "x.tpl").unwrap(), "hello");
        assert!(matches!(load(&dirs, "y.tpl"), Err(Error::Io(_))));
    }
}
