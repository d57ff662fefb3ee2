//! Reusable template components ("shortcodes"), dispatched by name.
//!
//! A component is either _single_, rendering from its arguments alone, or
//! _paired_, wrapping a body of content. Names are validated when a
//! component is registered, so dispatch never has to.

pub mod builtin;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::error::{BuildError, Result};
use crate::filters::Filters;
use crate::taxonomy::{ContentItem, Site};

/// Whether a component wraps a body.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Kind {
    Single,
    Paired,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Single => f.write_str("single"),
            Kind::Paired => f.write_str("paired"),
        }
    }
}

/// What a component's render function can fail with.
#[derive(Debug, thiserror::Error)]
pub enum ComponentError {
    /// The arguments were rejected; becomes a [`BuildError::Render`].
    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Build(#[from] BuildError),
}

impl ComponentError {
    pub fn invalid(reason: impl fmt::Display) -> Self {
        ComponentError::Invalid(reason.to_string())
    }
}

/// The arguments of one invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    pub positional: Vec<Value>,
    pub named: BTreeMap<String, Value>,
}

impl Args {
    pub fn new() -> Self {
        Args::default()
    }

    pub fn with_positional(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    pub fn with_named(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.named.insert(name.into(), value.into());
        self
    }

    pub fn positional(&self, i: usize) -> Option<&Value> {
        self.positional.get(i)
    }

    /// The named argument `name`; a `null` value counts as absent.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.named.get(name).filter(|v| !v.is_null())
    }

    pub fn required_str(&self, name: &str) -> Result<&str, ComponentError> {
        self.optional_str(name)?
            .ok_or_else(|| ComponentError::invalid(format!("missing required argument `{name}`")))
    }

    pub fn optional_str(&self, name: &str) -> Result<Option<&str>, ComponentError> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(v) => Err(ComponentError::invalid(format!("`{name}` must be a string, found `{v}`"))),
        }
    }

    /// Accepts non-negative integers and strings of digits.
    pub fn optional_u64(&self, name: &str) -> Result<Option<u64>, ComponentError> {
        let invalid = |v: &Value| {
            ComponentError::invalid(format!("`{name}` must be a non-negative integer, found `{v}`"))
        };

        match self.get(name) {
            None => Ok(None),
            Some(v @ Value::Number(n)) => n.as_u64().map(Some).ok_or_else(|| invalid(v)),
            Some(v @ Value::String(s)) => s.trim().parse().map(Some).map_err(|_| invalid(v)),
            Some(v) => Err(invalid(v)),
        }
    }

    pub fn optional_bool(&self, name: &str) -> Result<Option<bool>, ComponentError> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(Value::String(s)) if s == "true" => Ok(Some(true)),
            Some(Value::String(s)) if s == "false" => Ok(Some(false)),
            Some(v) => Err(ComponentError::invalid(format!("`{name}` must be a boolean, found `{v}`"))),
        }
    }

    /// The string argument `name`, which must be one of `options`. Falls
    /// back to `default` when absent.
    pub fn one_of(
        &self,
        name: &str,
        options: &[&'static str],
        default: Option<&'static str>,
    ) -> Result<&'static str, ComponentError> {
        let value = match (self.optional_str(name)?, default) {
            (Some(value), _) => value,
            (None, Some(default)) => return Ok(default),
            (None, None) => self.required_str(name)?,
        };

        options.iter()
            .find(|option| **option == value)
            .copied()
            .ok_or_else(|| ComponentError::invalid(format!(
                "`{name}` must be one of {}, found `{value}`",
                options.join(", ")
            )))
    }
}

/// What a component can see besides its arguments.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    /// The path of the page being rendered.
    pub page: &'a str,
    /// The item being rendered, when rendering an item.
    pub item: Option<&'a ContentItem>,
    pub site: Option<&'a Site>,
    pub filters: Option<&'a Filters>,
}

impl<'a> Context<'a> {
    pub fn new(page: &'a str) -> Self {
        Context { page, item: None, site: None, filters: None }
    }

    pub fn with_item(mut self, item: &'a ContentItem) -> Self {
        self.item = Some(item);
        self
    }

    pub fn with_site(mut self, site: &'a Site) -> Self {
        self.site = Some(site);
        self
    }

    pub fn with_filters(mut self, filters: &'a Filters) -> Self {
        self.filters = Some(filters);
        self
    }
}

pub type RenderFn = dyn Fn(&Args, Option<&str>, &Context<'_>) -> Result<String, ComponentError>
    + Send + Sync;

#[derive(Clone)]
pub struct Component {
    pub name: Arc<str>,
    pub kind: Kind,
    render: Arc<RenderFn>,
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Components by name.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    components: FxHashMap<Arc<str>, Component>,
}

#[cfg(test)] static_assertions::assert_impl_all!(Registry: Send, Sync);

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// A registry holding every [built-in](builtin) component.
    pub fn with_builtins() -> Result<Self> {
        let mut registry = Registry::new();
        builtin::register_all(&mut registry)?;
        Ok(registry)
    }

    pub fn is_valid_name(name: &str) -> bool {
        let mut chars = name.chars();
        chars.next().is_some_and(|c| c.is_ascii_alphabetic())
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    }

    pub fn register<F>(&mut self, name: &str, kind: Kind, render: F) -> Result<()>
        where F: Fn(&Args, Option<&str>, &Context<'_>) -> Result<String, ComponentError>
            + Send + Sync + 'static
    {
        if !Self::is_valid_name(name) {
            return Err(BuildError::configuration(
                format!("component `{name}`"),
                "names must start with a letter and contain only letters, digits or `_`"
            ).into());
        }

        if self.components.contains_key(name) {
            return Err(BuildError::configuration(
                format!("component `{name}`"),
                "a component with this name is already registered"
            ).into());
        }

        tracing::debug!(name, %kind, "registered component");
        let component = Component { name: name.into(), kind, render: Arc::new(render) };
        self.components.insert(component.name.clone(), component);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Component> {
        self.components.get(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.components.keys().map(|k| &**k).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Renders component `name`. Paired components require a `body`;
    /// single components reject one.
    pub fn invoke(
        &self,
        name: &str,
        args: &Args,
        body: Option<&str>,
        context: &Context<'_>,
    ) -> Result<String, BuildError> {
        let component = self.get(name)
            .ok_or_else(|| BuildError::UnknownComponent(name.to_string()))?;

        let render_error = |reason: String| BuildError::Render {
            component: name.to_string(),
            page: context.page.to_string(),
            reason,
        };

        match (component.kind, body) {
            (Kind::Paired, None) => return Err(render_error("a paired component needs a body".into())),
            (Kind::Single, Some(_)) => return Err(render_error("a single component takes no body".into())),
            _ => {}
        }

        match (component.render)(args, body, context) {
            Ok(html) => Ok(html),
            Err(ComponentError::Invalid(reason)) => Err(render_error(reason)),
            Err(ComponentError::Build(error)) => Err(error),
        }
    }
}
