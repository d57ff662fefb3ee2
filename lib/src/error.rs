use std::{fmt, io};
use std::panic::Location;
use std::convert::Infallible;
use std::error::Error as StdError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The class of a build failure.
///
/// Every [`Error`] reports exactly one kind via [`Error::kind()`]. All kinds
/// except [`Kind::Lookup`] abort the build.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Kind {
    /// A recognized option holds a malformed value.
    Configuration,
    /// A slug did not resolve to a content item.
    Lookup,
    /// A template referenced a component that was never registered.
    UnknownComponent,
    /// Two content items share a slug.
    DuplicateSlug,
    /// Two published items would be written to the same file.
    DuplicatePath,
    /// A component rejected its arguments.
    Render,
    /// The template engine failed for a reason not covered above.
    Template,
    /// Reading or writing a file failed.
    Io,
    Other,
}

impl Kind {
    pub fn is_fatal(self) -> bool {
        !matches!(self, Kind::Lookup)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Configuration => "configuration error",
            Kind::Lookup => "lookup error",
            Kind::UnknownComponent => "unknown component",
            Kind::DuplicateSlug => "duplicate slug",
            Kind::DuplicatePath => "duplicate output path",
            Kind::Render => "render error",
            Kind::Template => "template error",
            Kind::Io => "i/o error",
            Kind::Other => "error",
        };

        f.write_str(name)
    }
}

/// Typed failures raised by the pipeline itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("invalid value for `{option}`: {reason}")]
    Configuration { option: String, reason: String },

    #[error("no content item has the slug `{0}`")]
    Lookup(String),

    #[error("unknown component `{0}`")]
    UnknownComponent(String),

    #[error("the slug `{slug}` is used by more than one content item")]
    DuplicateSlug { slug: String, first: String, second: String },

    #[error("more than one content item is published at `{path}`")]
    DuplicatePath { path: String, first: String, second: String },

    #[error("component `{component}` failed on page `{page}`: {reason}")]
    Render { component: String, page: String, reason: String },
}

impl BuildError {
    pub fn configuration(option: impl Into<String>, reason: impl fmt::Display) -> Self {
        BuildError::Configuration { option: option.into(), reason: reason.to_string() }
    }

    pub fn kind(&self) -> Kind {
        match self {
            BuildError::Configuration { .. } => Kind::Configuration,
            BuildError::Lookup(_) => Kind::Lookup,
            BuildError::UnknownComponent(_) => Kind::UnknownComponent,
            BuildError::DuplicateSlug { .. } => Kind::DuplicateSlug,
            BuildError::DuplicatePath { .. } => Kind::DuplicatePath,
            BuildError::Render { .. } => Kind::Render,
        }
    }
}

#[derive(Debug)]
pub struct Error {
    detail: Vec<Box<dyn ErrorDetail>>,
    prev: Option<Box<Error>>,
    location: &'static Location<'static>,
}

pub trait ErrorDetail: fmt::Display + fmt::Debug + Send + Sync {
    fn kind(&self) -> Kind { Kind::Other }

    fn context(&self) -> Vec<(Option<String>, String)> { vec![] }
}

impl Error {
    #[track_caller]
    pub fn from_std<E>(error: E) -> Self
        where E: StdError + Send + Sync + 'static
    {
        Error::from(Box::new(error) as Box<dyn StdError + Send + Sync>)
    }

    pub fn from_detail(detail: &dyn ErrorDetail) -> Self {
        Error::from(MakeshiftError::from(detail))
    }

    /// The kind of the outermost detail that isn't [`Kind::Other`], looking
    /// through chained errors from the outside in.
    pub fn kind(&self) -> Kind {
        self.detail.iter()
            .map(|d| d.kind())
            .find(|k| *k != Kind::Other)
            .or_else(|| self.prev.as_ref().map(|p| p.kind()))
            .unwrap_or(Kind::Other)
    }

    pub fn is_fatal(&self) -> bool {
        self.kind().is_fatal()
    }

    /// Places `self` behind `other`: `other` becomes the outermost error.
    pub fn chain(self, mut other: Error) -> Self {
        #[inline]
        fn _chain(error: Error, behind: &mut Error) {
            if let Some(prev) = behind.prev.as_mut() {
                _chain(error, prev);
            } else {
                behind.prev = Some(Box::new(error));
            }
        }

        _chain(self, &mut other);
        other
    }
}

impl ErrorDetail for &(dyn StdError + Send + Sync) {
    fn context(&self) -> Vec<(Option<String>, String)> {
        let mut ctxt = vec![];
        let mut error = self.source();
        while let Some(e) = error {
            ctxt.push((None, e.to_string()));
            error = e.source();
        }

        ctxt
    }
}

impl ErrorDetail for Box<dyn StdError + Send + Sync> {
    fn kind(&self) -> Kind {
        (**self).downcast_ref::<BuildError>().map_or(Kind::Other, BuildError::kind)
    }

    fn context(&self) -> Vec<(Option<String>, String)> {
        let error: &(dyn StdError + Send + Sync) = &**self;
        error.context()
    }
}

macro_rules! impl_error_detail_with_std_error {
    ($T:ty $(=> $kind:expr)?) => {
        impl $crate::error::ErrorDetail for $T {
            $(fn kind(&self) -> $crate::error::Kind { $kind })?

            fn context(&self) -> Vec<(Option<String>, String)> {
                let error: &(dyn std::error::Error + Send + Sync) = self;
                error.context()
            }
        }
    }
}

impl_error_detail_with_std_error!(io::Error => Kind::Io);
impl_error_detail_with_std_error!(toml::de::Error);
impl_error_detail_with_std_error!(serde_json::Error);

impl ErrorDetail for BuildError {
    fn kind(&self) -> Kind {
        BuildError::kind(self)
    }

    fn context(&self) -> Vec<(Option<String>, String)> {
        match self {
            BuildError::DuplicateSlug { first, second, .. }
            | BuildError::DuplicatePath { first, second, .. } => vec![
                (Some("first item".into()), first.clone()),
                (Some("second item".into()), second.clone()),
            ],
            _ => vec![],
        }
    }
}

impl ErrorDetail for minijinja::Error {
    /// Errors raised by components and filters travel through minijinja as
    /// sources; their kind wins over minijinja's own classification.
    fn kind(&self) -> Kind {
        let mut source = StdError::source(self);
        while let Some(error) = source {
            if let Some(build) = error.downcast_ref::<BuildError>() {
                return build.kind();
            }

            source = error.source();
        }

        match minijinja::Error::kind(self) {
            minijinja::ErrorKind::UnknownFunction
            | minijinja::ErrorKind::UnknownFilter => Kind::UnknownComponent,
            _ => Kind::Template,
        }
    }

    fn context(&self) -> Vec<(Option<String>, String)> {
        let mut ctxt = vec![];
        if let Some(name) = self.name() {
            ctxt.push((Some("template".into()), name.to_string()));
        }

        if let Some(line) = self.line() {
            ctxt.push((Some("line".into()), line.to_string()));
        }

        let error: &(dyn StdError + Send + Sync) = self;
        ctxt.extend(error.context());
        ctxt
    }
}

impl ErrorDetail for String { }
impl ErrorDetail for &str { }

impl Clone for Error {
    fn clone(&self) -> Self {
        Error {
            detail: self.detail.iter()
                .map(|detail| MakeshiftError::from(&**detail))
                .map(|error| Box::new(error) as Box<dyn ErrorDetail>)
                .collect(),
            prev: self.prev.clone(),
            location: self.location,
        }
    }
}

impl<T: ErrorDetail + 'static> From<T> for Error {
    #[track_caller]
    fn from(detail: T) -> Self {
        Error {
            prev: None,
            detail: vec![Box::new(detail)],
            location: Location::caller(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        #[derive(Copy, Clone)] struct Indent(usize);

        impl fmt::Display for Indent {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                for _ in 0..(self.0 * 4) { write!(f, " ")? }
                Ok(())
            }
        }

        struct NestedError<'a>(Indent, &'a Error);

        impl fmt::Display for NestedError<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let NestedError(indent, e) = self;

                for detail in &e.detail {
                    let indent_line = format!("\n{indent}");

                    writeln!(f, "{indent}{}", format!("{detail:#}").replace('\n', &indent_line))?;
                    if let Some(prev) = &e.prev {
                        NestedError(Indent(indent.0 + 1), prev).fmt(f)?;
                    }

                    for (key, value) in detail.context() {
                        let value = value.replace('\n', &indent_line);
                        if let Some(key) = key {
                            writeln!(f, "{indent}{key}: {value}")?;
                        } else {
                            writeln!(f, "{indent}{value}")?;
                        }
                    }

                    if std::env::var_os("RUST_BACKTRACE").is_some() {
                        writeln!(f, "{indent}[{}]", e.location)?;
                    }
                }

                Ok(())
            }
        }

        NestedError(Indent(0), self).fmt(f)
    }
}

#[derive(Debug)]
pub struct MakeshiftError {
    pub message: String,
    pub kind: Kind,
    pub parameters: Vec<(Option<String>, String)>,
}

impl From<&dyn ErrorDetail> for MakeshiftError {
    #[inline]
    fn from(detail: &dyn ErrorDetail) -> Self {
        MakeshiftError {
            message: detail.to_string(),
            kind: detail.kind(),
            parameters: detail.context()
        }
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! err {
    ($($token:tt)*) => (Err($crate::error!($($token)*)));
}

#[doc(hidden)]
#[macro_export]
macro_rules! error {
    ($msg:expr, $($rest:tt)*) => (
        $crate::error::Error::from($crate::error::MakeshiftError {
            message: $msg.to_string(),
            kind: $crate::error::Kind::Other,
            parameters: {
                #[allow(unused_mut)]
                let mut v: Vec<(Option<String>, String)> = Vec::new();
                $crate::error!(@param v $($rest)*);
                v
            },
        })
    );

    ($msg:expr) => ( $crate::error!($msg,) );

    (@param $v:ident $key:expr => $value:expr, $($rest:tt)*) => {
        $crate::error!(@param $v $key => $value);
        $crate::error!(@param $v $($rest)*);
    };

    (@param $v:ident $key:expr => $value:expr) => {
        $v.push((Some($key.to_string()), $value.to_string()));
    };

    (@param $v:ident $value:expr, $($rest:tt)*) => {
        $crate::error!(@param $v $value);
        $crate::error!(@param $v $($rest)*);
    };

    (@param $v:ident $value:expr) => {
        $v.push((None, $value.to_string()));
    };

    (@param $v:ident $(,)?) => { };
}

impl fmt::Display for MakeshiftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.message.fmt(f)
    }
}

impl ErrorDetail for MakeshiftError {
    fn kind(&self) -> Kind {
        self.kind
    }

    fn context(&self) -> Vec<(Option<String>, String)> {
        self.parameters.clone()
    }
}

pub trait Chainable<T> {
    fn chain(self, other: impl Into<Error>) -> Result<T>;

    fn chain_with<F, E>(self, f: F) -> Result<T>
        where F: FnOnce() -> E, E: Into<Error>;
}

impl<T, E: Into<Error>> Chainable<T> for Result<T, E> {
    #[track_caller]
    fn chain(self, other: impl Into<Error>) -> Result<T> {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(e.into().chain(other.into()))
        }
    }

    fn chain_with<F, Err>(self, f: F) -> Result<T>
        where F: FnOnce() -> Err, Err: Into<Error>,
     {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(e.into().chain(f().into()))
        }
    }
}

impl ErrorDetail for Infallible { }
