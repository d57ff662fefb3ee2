use std::sync::Arc;

use serde::Serialize;

use crate::filters::html_date_string;
use crate::taxonomy::{Collection, ContentItem};

/// One entry of the search export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRecord {
    pub slug: Arc<str>,
    pub title: Arc<str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Arc<str>>,
    pub url: Arc<str>,
    pub language: Arc<str>,
    pub tags: Vec<Arc<str>>,
    pub date: String,
}

impl From<&ContentItem> for ExportRecord {
    fn from(item: &ContentItem) -> Self {
        ExportRecord {
            slug: item.slug.clone(),
            title: item.title.clone(),
            description: item.description.clone(),
            url: item.path.clone(),
            language: item.language.clone(),
            tags: item.tags.iter().cloned().collect(),
            date: html_date_string(&item.date),
        }
    }
}

/// Export records for every item of `collection`, in collection order.
pub fn records(collection: &Collection) -> Vec<ExportRecord> {
    collection.iter().map(|item| ExportRecord::from(&**item)).collect()
}

/// An item and its measurement data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasuredRecord {
    pub slug: Arc<str>,
    pub title: Arc<str>,
    pub url: Arc<str>,
    pub date: String,
    pub measurement: serde_json::Value,
}

/// Records for the items of `items` that carry measurement data, in order.
pub fn measured_records<'a, I>(items: I) -> Vec<MeasuredRecord>
    where I: IntoIterator<Item = &'a Arc<ContentItem>>
{
    items.into_iter()
        .filter(|item| item.has_measurement())
        .map(|item| MeasuredRecord {
            slug: item.slug.clone(),
            title: item.title.clone(),
            url: item.path.clone(),
            date: html_date_string(&item.date),
            measurement: item.measurement.clone().unwrap_or_default(),
        })
        .collect()
}
