//! The filter library: small, pure functions over content items, dates and
//! paths. [`Filters`] carries the few inputs some of them need so templates
//! never reach for ambient state.

mod paginate;
mod dates;
mod paths;
mod contributors;

use std::sync::Arc;

use crate::error::{BuildError, Result};
use crate::markdown;
use crate::taxonomy::{export, ContentItem};

pub use paginate::*;
pub use dates::*;
pub use paths::*;
pub use contributors::*;

/// Drops drafts, keeping the order of the rest.
pub fn remove_drafts(items: &[Arc<ContentItem>]) -> Vec<Arc<ContentItem>> {
    items.iter().filter(|item| !item.draft).cloned().collect()
}

/// Whether `item` carries exactly `tag`. Case-sensitive.
pub fn contains_tag(item: &ContentItem, tag: &str) -> bool {
    item.tags.contains(tag)
}

/// Renders a markdown string with the default rules, for use inside
/// templates.
pub fn md(input: &str) -> Result<String> {
    markdown::render(input)
}

/// The items of `items` carrying measurement data, as a JSON array of
/// `{ slug, title, url, date, measurement }`.
pub fn measured_json(items: &[Arc<ContentItem>]) -> Result<String> {
    Ok(serde_json::to_string(&export::measured_records(items))?)
}

/// The explicit inputs of the filters that need more than their arguments.
#[derive(Debug, Clone)]
pub struct Filters {
    pub languages: Arc<[Arc<str>]>,
    pub repository: Option<Repository>,
    pub contributors: ContributorDirectory,
}

#[cfg(test)] static_assertions::assert_impl_all!(Filters: Send, Sync);

impl Default for Filters {
    fn default() -> Self {
        Filters {
            languages: Arc::new([Arc::from("en")]),
            repository: None,
            contributors: ContributorDirectory::default(),
        }
    }
}

impl Filters {
    /// Every name filters are registered under in templates.
    pub const NAMES: &'static [&'static str] = &[
        "remove_drafts",
        "contains_tag",
        "paginate",
        "expand_contributors",
        "pretty_date",
        "html_date_string",
        "path_slug",
        "strip_blog",
        "strip_language",
        "github_link",
        "md",
        "measured_json",
    ];

    pub fn new() -> Self {
        Filters::default()
    }

    pub fn with_languages<I, S>(mut self, languages: I) -> Self
        where I: IntoIterator<Item = S>, S: Into<Arc<str>>
    {
        self.languages = languages.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_repository(mut self, repository: Repository) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn with_contributors(mut self, contributors: ContributorDirectory) -> Self {
        self.contributors = contributors;
        self
    }

    pub fn strip_language(&self, path: &str) -> String {
        strip_language(path, &self.languages[..])
    }

    pub fn expand_contributors<S: AsRef<str>>(&self, ids: &[S]) -> Vec<Arc<Contributor>> {
        expand_contributors(ids, &self.contributors)
    }

    /// See [`github_link()`]. Fails if no repository is configured.
    pub fn github_link(&self, path: &str) -> Result<String, BuildError> {
        let repository = self.repository.as_ref()
            .ok_or_else(|| BuildError::configuration("repository", "no repository is configured"))?;

        Ok(github_link(path, repository))
    }
}
