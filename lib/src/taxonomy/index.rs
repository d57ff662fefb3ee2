use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::{BuildError, Result};
use crate::taxonomy::ContentItem;

/// Slug-keyed lookup over the full item set, drafts included.
///
/// Built once per site in a single pass; lookups never rescan the items.
#[derive(Debug, Default, Clone)]
pub struct SlugIndex {
    map: FxHashMap<Arc<str>, Arc<ContentItem>>,
}

#[cfg(test)] static_assertions::assert_impl_all!(SlugIndex: Send, Sync);

impl SlugIndex {
    /// Indexes `items`. Two items sharing a slug is a fatal
    /// [`BuildError::DuplicateSlug`] naming both sources.
    pub fn build(items: &[Arc<ContentItem>]) -> Result<SlugIndex> {
        let mut map = FxHashMap::default();
        map.reserve(items.len());

        for item in items {
            if let Some(existing) = map.insert(item.slug.clone(), item.clone()) {
                return Err(BuildError::DuplicateSlug {
                    slug: item.slug.to_string(),
                    first: existing.location(),
                    second: item.location(),
                }.into());
            }
        }

        tracing::debug!(slugs = map.len(), "built slug index");
        Ok(SlugIndex { map })
    }

    /// Resolves `slug`, failing with a recoverable [`BuildError::Lookup`].
    pub fn lookup(&self, slug: &str) -> Result<&Arc<ContentItem>, BuildError> {
        self.get(slug).ok_or_else(|| BuildError::Lookup(slug.to_string()))
    }

    pub fn get(&self, slug: &str) -> Option<&Arc<ContentItem>> {
        self.map.get(slug)
    }

    pub fn contains(&self, slug: &str) -> bool {
        self.map.contains_key(slug)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
