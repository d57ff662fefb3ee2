use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::error::{BuildError, Result};
use crate::taxonomy::ContentItem;

/// A named, ordered view over the content item set.
///
/// Collections never own items; they share the canonical `Arc`s.
#[derive(Debug, Clone)]
pub struct Collection {
    pub name: Arc<str>,
    pub items: Arc<[Arc<ContentItem>]>,
}

impl Collection {
    pub fn new<I>(name: impl Into<Arc<str>>, items: I) -> Self
        where I: IntoIterator<Item = Arc<ContentItem>>
    {
        Collection { name: name.into(), items: items.into_iter().collect() }
    }

    pub fn empty(name: impl Into<Arc<str>>) -> Self {
        Collection::new(name, std::iter::empty())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arc<ContentItem>> {
        self.items.iter()
    }

    pub fn slugs(&self) -> Vec<&str> {
        self.items.iter().map(|item| &*item.slug).collect()
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Arc<ContentItem>;
    type IntoIter = std::slice::Iter<'a, Arc<ContentItem>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Every collection derived in one build pass.
#[derive(Debug, Clone)]
pub struct Collections {
    /// Non-draft items, newest first.
    pub posts: Collection,
    /// Posts with non-empty measurement data, newest first.
    pub measured: Collection,
    /// The newest `recent_window` posts.
    pub recent: Collection,
    /// Posts for the search export; empty unless the export environment is
    /// active.
    pub export: Collection,
    /// The full, unfiltered item set in ingestion order.
    pub memoized: Collection,
}

impl Collections {
    pub const POSTS: &'static str = "posts";
    pub const MEASURED: &'static str = "measured";
    pub const RECENT: &'static str = "recent";
    pub const EXPORT: &'static str = "export";
    pub const MEMOIZED: &'static str = "memoized";

    pub fn names() -> [&'static str; 5] {
        [Self::POSTS, Self::MEASURED, Self::RECENT, Self::EXPORT, Self::MEMOIZED]
    }

    pub fn get(&self, name: &str) -> Option<&Collection> {
        match name {
            Self::POSTS => Some(&self.posts),
            Self::MEASURED => Some(&self.measured),
            Self::RECENT => Some(&self.recent),
            Self::EXPORT => Some(&self.export),
            Self::MEMOIZED => Some(&self.memoized),
            _ => None,
        }
    }
}

/// Derives [`Collections`] from the full item set.
#[derive(Debug, Clone)]
pub struct CollectionBuilder {
    recent_window: NonZeroUsize,
    export_env: Arc<str>,
}

impl Default for CollectionBuilder {
    fn default() -> Self {
        CollectionBuilder {
            recent_window: Self::DEFAULT_RECENT_WINDOW,
            export_env: Self::DEFAULT_EXPORT_ENV.into(),
        }
    }
}

impl CollectionBuilder {
    pub const DEFAULT_RECENT_WINDOW: NonZeroUsize = match NonZeroUsize::new(6) {
        Some(window) => window,
        None => unreachable!(),
    };
    pub const DEFAULT_EXPORT_ENV: &'static str = "prod";

    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the size of the `recent` collection. Zero is rejected.
    pub fn recent_window(mut self, window: usize) -> Result<Self> {
        self.recent_window = NonZeroUsize::new(window)
            .ok_or_else(|| BuildError::configuration("recent_window", "must be at least 1"))?;

        Ok(self)
    }

    /// Sets the environment flag value that enables the `export` collection.
    pub fn export_env(mut self, env: impl Into<Arc<str>>) -> Self {
        self.export_env = env.into();
        self
    }

    pub fn build(&self, items: &[Arc<ContentItem>], env: Option<&str>) -> Collections {
        let posts = chronological(items);
        let measured = posts.iter()
            .filter(|item| item.has_measurement())
            .cloned();

        let window = self.recent_window.get().min(posts.len());
        let recent = posts[..window].iter().cloned();
        let export: Vec<_> = match env {
            Some(env) if *env == *self.export_env => posts.clone(),
            _ => vec![],
        };

        tracing::debug!(
            items = items.len(),
            posts = posts.len(),
            export = export.len(),
            "derived collections"
        );

        Collections {
            measured: Collection::new(Collections::MEASURED, measured),
            recent: Collection::new(Collections::RECENT, recent),
            export: Collection::new(Collections::EXPORT, export),
            memoized: Collection::new(Collections::MEMOIZED, items.iter().cloned()),
            posts: Collection::new(Collections::POSTS, posts),
        }
    }
}

/// Non-draft items ordered by date, newest first. `sort_by` is stable, so
/// items with equal dates keep their ingestion order.
fn chronological(items: &[Arc<ContentItem>]) -> Vec<Arc<ContentItem>> {
    let mut posts: Vec<_> = items.iter()
        .filter(|item| !item.draft)
        .cloned()
        .collect();

    posts.sort_by(|a, b| b.date.cmp(&a.date));
    posts
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::*;

    fn item(slug: &str, date: i64, draft: bool) -> Arc<ContentItem> {
        let date = Utc.timestamp_opt(date, 0).unwrap();
        Arc::new(ContentItem::new(slug, date).with_draft(draft))
    }

    fn example() -> Vec<Arc<ContentItem>> {
        vec![item("a", 1, false), item("b", 3, false), item("c", 2, true)]
    }

    #[test]
    fn example_set() {
        let builder = CollectionBuilder::new().recent_window(1).unwrap();
        let collections = builder.build(&example(), None);
        assert_eq!(collections.posts.slugs(), ["b", "a"]);
        assert_eq!(collections.recent.slugs(), ["b"]);
        assert_eq!(collections.memoized.slugs(), ["a", "b", "c"]);
    }

    #[test]
    fn chronological_is_sorted_and_draft_free() {
        let items: Vec<_> = (0..40)
            .map(|i| item(&format!("p{i}"), (i * 7919) % 13, i % 5 == 0))
            .collect();

        let posts = CollectionBuilder::new().build(&items, None).posts;
        assert!(posts.iter().all(|p| !p.draft));
        assert!(posts.items.windows(2).all(|w| w[0].date >= w[1].date));
        assert_eq!(posts.len(), items.iter().filter(|i| !i.draft).count());

        // Equal dates keep ingestion order.
        for pair in posts.items.windows(2).filter(|w| w[0].date == w[1].date) {
            let first = items.iter().position(|i| i.slug == pair[0].slug);
            let second = items.iter().position(|i| i.slug == pair[1].slug);
            assert!(first < second);
        }
    }

    #[test]
    fn ties_keep_ingestion_order() {
        let items = vec![item("x", 5, false), item("y", 5, false), item("z", 9, false)];
        let posts = CollectionBuilder::new().build(&items, None).posts;
        assert_eq!(posts.slugs(), ["z", "x", "y"]);
    }

    #[test]
    fn measured_keeps_chronological_order() {
        let with = |slug: &str, date: i64, data: serde_json::Value| {
            let date = Utc.timestamp_opt(date, 0).unwrap();
            Arc::new(ContentItem::new(slug, date).with_measurement(data))
        };

        let items = vec![
            with("old", 1, json!({ "score": 90 })),
            with("empty", 5, json!({})),
            with("new", 9, json!({ "score": 40 })),
            item("none", 7, false),
        ];

        let measured = CollectionBuilder::new().build(&items, None).measured;
        assert_eq!(measured.slugs(), ["new", "old"]);
    }

    #[test]
    fn recent_window_bounds() {
        let items = example();
        let recent = CollectionBuilder::new().build(&items, None).recent;
        assert_eq!(recent.slugs(), ["b", "a"]);

        assert!(CollectionBuilder::new().recent_window(0).is_err());
    }

    #[test]
    fn export_is_gated_on_env() {
        let items = example();
        let builder = CollectionBuilder::new();
        assert!(builder.build(&items, None).export.is_empty());
        assert!(builder.build(&items, Some("dev")).export.is_empty());
        assert_eq!(builder.build(&items, Some("prod")).export.slugs(), ["b", "a"]);

        let builder = builder.export_env("search");
        assert!(builder.build(&items, Some("prod")).export.is_empty());
        assert_eq!(builder.build(&items, Some("search")).export.len(), 2);
    }

    #[test]
    fn memoized_is_a_superset() {
        let items = example();
        let collections = CollectionBuilder::new().build(&items, Some("prod"));
        let memoized = collections.memoized.slugs();
        for name in Collections::names() {
            let collection = collections.get(name).unwrap();
            assert!(collection.slugs().iter().all(|s| memoized.contains(s)), "{name}");
        }
    }

    #[test]
    fn empty_input() {
        let collections = CollectionBuilder::new().build(&[], Some("prod"));
        for name in Collections::names() {
            assert!(collections.get(name).unwrap().is_empty());
        }
    }
}
