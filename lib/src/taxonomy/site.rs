use std::sync::Arc;

use derive_more::Debug;
use rustc_hash::FxHashMap;

use crate::error::{BuildError, Result};
use crate::taxonomy::*;

/// The read-only state of one build pass: every item, the slug index over
/// them, and the derived collections.
#[derive(Debug)]
pub struct Site {
    #[debug(ignore)]
    pub items: Arc<[Arc<ContentItem>]>,
    pub index: SlugIndex,
    pub collections: Collections,
    pub env: Option<Arc<str>>,
}

#[cfg(test)] static_assertions::assert_impl_all!(Site: Send, Sync);

impl Site {
    /// Indexes `items` and derives the collections. Fails on duplicate slugs
    /// and when two published items map to the same output file.
    pub fn build(
        items: Vec<ContentItem>,
        builder: &CollectionBuilder,
        env: Option<&str>,
    ) -> Result<Site> {
        let items: Arc<[_]> = items.into_iter().map(Arc::new).collect();
        let index = SlugIndex::build(&items)?;
        check_output_paths(&items)?;
        let collections = builder.build(&items, env);

        tracing::info!(
            items = items.len(),
            posts = collections.posts.len(),
            env = env.unwrap_or("none"),
            "site built"
        );

        Ok(Site { items, index, collections, env: env.map(Arc::from) })
    }

    /// Items that get their own page: everything except drafts, in
    /// ingestion order.
    pub fn published(&self) -> impl Iterator<Item = &Arc<ContentItem>> + '_ {
        self.items.iter().filter(|item| !item.draft)
    }

    /// See [`SlugIndex::lookup()`].
    pub fn lookup(&self, slug: &str) -> Result<&Arc<ContentItem>, crate::error::BuildError> {
        self.index.lookup(slug)
    }
}

fn check_output_paths(items: &[Arc<ContentItem>]) -> Result<(), BuildError> {
    let mut outputs = FxHashMap::default();
    for item in items.iter().filter(|item| !item.draft) {
        if let Some(existing) = outputs.insert(output_path(&item.path), item) {
            return Err(BuildError::DuplicatePath {
                path: item.path.to_string(),
                first: existing.location(),
                second: item.location(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::error::Kind;

    fn item(slug: &str, date: i64, draft: bool) -> ContentItem {
        ContentItem::new(slug, Utc.timestamp_opt(date, 0).unwrap()).with_draft(draft)
    }

    #[test]
    fn example_site() {
        let items = vec![item("a", 1, false), item("b", 3, false), item("c", 2, true)];
        let builder = CollectionBuilder::new().recent_window(1).unwrap();
        let site = Site::build(items, &builder, None).unwrap();

        assert_eq!(site.collections.posts.slugs(), ["b", "a"]);
        assert_eq!(site.collections.recent.slugs(), ["b"]);
        assert!(site.collections.export.is_empty());
        assert!(site.lookup("c").unwrap().draft);

        let published: Vec<_> = site.published().map(|i| &*i.slug).collect();
        assert_eq!(published, ["a", "b"]);
    }

    #[test]
    fn collections_share_items() {
        let site = Site::build(vec![item("a", 1, false)], &CollectionBuilder::new(), None).unwrap();
        let from_index = site.index.get("a").unwrap();
        assert!(Arc::ptr_eq(from_index, &site.collections.posts.items[0]));
        assert!(Arc::ptr_eq(from_index, &site.items[0]));
    }

    #[test]
    fn duplicate_slug_aborts() {
        let items = vec![item("a", 1, false), item("a", 2, true)];
        let error = Site::build(items, &CollectionBuilder::new(), None).unwrap_err();
        assert_eq!(error.kind(), Kind::DuplicateSlug);
    }

    #[test]
    fn shared_output_path_aborts() {
        let items = vec![
            item("a", 1, false).with_path("/notes/"),
            item("b", 2, false).with_path("/notes"),
        ];

        let error = Site::build(items, &CollectionBuilder::new(), None).unwrap_err();
        assert_eq!(error.kind(), Kind::DuplicatePath);
        assert!(error.to_string().contains("/notes"));

        let items = vec![
            item("a", 1, false).with_path("/notes/"),
            item("b", 2, true).with_path("/notes/"),
        ];

        assert!(Site::build(items, &CollectionBuilder::new(), None).is_ok());
    }
}
