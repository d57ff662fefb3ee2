use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

pub type Extra = serde_json::Map<String, serde_json::Value>;

/// One document of the site.
///
/// Items are created by a loader before the pipeline runs and are never
/// mutated afterwards; collections and the slug index share them as
/// `Arc<ContentItem>`.
#[derive(Debug, Clone, Serialize)]
pub struct ContentItem {
    pub slug: Arc<str>,
    pub title: Arc<str>,
    pub description: Option<Arc<str>>,
    pub date: DateTime<Utc>,
    pub updated: Option<DateTime<Utc>>,
    pub tags: BTreeSet<Arc<str>>,
    pub draft: bool,
    pub language: Arc<str>,
    /// Contributor ids, in byline order.
    pub contributors: Vec<Arc<str>>,
    /// Attached measurement data such as performance scores.
    pub measurement: Option<serde_json::Value>,
    #[serde(skip)]
    pub body: Arc<str>,
    /// The logical site path, e.g. `/en/blog/some-post/`.
    pub path: Arc<str>,
    pub layout: Option<Arc<str>>,
    #[serde(skip)]
    pub source: Option<PathBuf>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl ContentItem {
    pub fn new(slug: impl Into<Arc<str>>, date: DateTime<Utc>) -> Self {
        let slug = slug.into();
        ContentItem {
            title: slug.clone(),
            path: format!("/{slug}/").into(),
            slug,
            description: None,
            date,
            updated: None,
            tags: BTreeSet::new(),
            draft: false,
            language: "en".into(),
            contributors: vec![],
            measurement: None,
            body: "".into(),
            layout: None,
            source: None,
            extra: Extra::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<Arc<str>>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<Arc<str>>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_updated(mut self, updated: DateTime<Utc>) -> Self {
        self.updated = Some(updated);
        self
    }

    pub fn with_tags<I, T>(mut self, tags: I) -> Self
        where I: IntoIterator<Item = T>, T: Into<Arc<str>>
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_draft(mut self, draft: bool) -> Self {
        self.draft = draft;
        self
    }

    pub fn with_language(mut self, language: impl Into<Arc<str>>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_contributors<I, T>(mut self, ids: I) -> Self
        where I: IntoIterator<Item = T>, T: Into<Arc<str>>
    {
        self.contributors = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_measurement(mut self, data: serde_json::Value) -> Self {
        self.measurement = Some(data);
        self
    }

    pub fn with_body(mut self, body: impl Into<Arc<str>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_path(mut self, path: impl Into<Arc<str>>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_layout(mut self, layout: impl Into<Arc<str>>) -> Self {
        self.layout = Some(layout.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_extra(mut self, extra: Extra) -> Self {
        self.extra = extra;
        self
    }

    /// Whether measurement data is attached and carries something.
    pub fn has_measurement(&self) -> bool {
        use serde_json::Value;

        match &self.measurement {
            None | Some(Value::Null) => false,
            Some(Value::Object(map)) => !map.is_empty(),
            Some(Value::Array(list)) => !list.is_empty(),
            Some(Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        }
    }

    /// A human-readable location for error messages: the source file if
    /// known, otherwise the logical path.
    pub fn location(&self) -> String {
        match &self.source {
            Some(source) => source.display().to_string(),
            None => self.path.to_string(),
        }
    }
}
