pub mod minijinja;

use std::fmt::Debug;
use std::sync::Arc;

use crate::error::Result;
use crate::taxonomy::{ContentItem, Site};

pub use self::minijinja::{EngineConfig, MiniJinjaEngine};

/// Everything a template sees while one page renders.
#[derive(Debug, Clone, Copy)]
pub struct PageContext<'a> {
    pub site: &'a Arc<Site>,
    pub item: &'a Arc<ContentItem>,
    /// The rendered body, once there is one.
    pub content: Option<&'a str>,
}

impl<'a> PageContext<'a> {
    pub fn new(site: &'a Arc<Site>, item: &'a Arc<ContentItem>) -> Self {
        PageContext { site, item, content: None }
    }

    pub fn with_content(self, content: &'a str) -> Self {
        PageContext { content: Some(content), ..self }
    }
}

pub trait Engine: Send + Sync + Debug {
    /// Renders the template registered as `name`.
    fn render(&self, name: &str, context: &PageContext<'_>) -> Result<String>;

    /// Renders `source` directly. `name` is only used in error messages.
    fn render_str(
        &self,
        name: Option<&str>,
        source: &str,
        context: &PageContext<'_>,
    ) -> Result<String>;

    fn has_template(&self, name: &str) -> bool;
}
