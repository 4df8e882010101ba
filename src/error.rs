use std::io;
use thiserror::Error;

/// Everything that can go wrong while parsing or rendering a template.
///
/// `MissingVariable` and `MissingAttribute` are lookup failures rather
/// than defects in the template; the renderers recover from them in the
/// places where the template languages promise a default (see
/// [`Error::is_lookup`]).  Everything else is surfaced to the caller.
#[derive(Error, Debug)]
pub enum Error {
    #[error("missing variable `{0}`")]
    MissingVariable(String),
    #[error("missing attribute `{0}`")]
    MissingAttribute(String),

    #[error("missing argument `{0}`")]
    MissingArgument(String),
    #[error("superfluous argument `{0}`")]
    SuperfluousArgument(String),
    #[error("missing key `{0}`")]
    MissingKey(String),
    #[error("duplicate attribute `{0}`")]
    DuplicateAttribute(String),
    #[error("invalid attribute `{0}`")]
    InvalidAttribute(String),
    #[error("invalid escape mode `{0}`")]
    InvalidEscape(String),

    #[error("missing tag `{0}`")]
    MissingTag(String),
    #[error("missing filter `{0}`")]
    MissingFilter(String),
    #[error("missing library `{0}`")]
    MissingLibrary(String),

    #[error("could not convert value from {from} to {to}")]
    Conversion { from: &'static str, to: &'static str },
    #[error("uninitialized value")]
    Uninitialized,
    #[error("{0}")]
    Logic(String),
    #[error("not implemented: {0}")]
    NotImplemented(String),
    #[error("{0} is out of range")]
    OutOfRange(String),

    #[error("failed to parse template:\n{message}")]
    Parse { message: String },
    #[error("could not resolve url for view `{0}`")]
    UnresolvedUrl(String),

    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Regex(#[from] regex::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// True for the recoverable lookup failures.
    pub fn is_lookup(&self) -> bool {
        matches!(self, Error::MissingVariable(_) | Error::MissingAttribute(_))
    }

    pub(crate) fn conversion(from: &'static str, to: &'static str) -> Self {
        Error::Conversion { from, to }
    }
}

/// Turn a lookup failure into `None`, keep other errors.
pub(crate) trait Recover<T> {
    fn recover(self) -> Result<Option<T>>;
}

impl<T> Recover<T> for Result<T> {
    fn recover(self) -> Result<Option<T>> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(e) if e.is_lookup() => Ok(None),
            Err(e) => Err(e),
        }
    }
}
