use rss::validation::Validate;
use rss::{CategoryBuilder, Channel, ChannelBuilder, GuidBuilder, Item, ItemBuilder};

use folio::error::Result;
use folio::taxonomy::ContentItem;
use folio::{error, Site};

use crate::config::FeedSettings;
use crate::discover::Quire;
use crate::util::write;

/// The RSS channel of the site's posts, newest first.
pub fn channel(feed: &FeedSettings, language: &str, site: &Site) -> Channel {
    let base = feed.url.trim_end_matches('/');
    let items = site.collections.posts.iter()
        .take(feed.limit.unwrap_or(usize::MAX))
        .map(|post| item(base, post))
        .collect::<Vec<_>>();

    ChannelBuilder::default()
        .title(&*feed.title)
        .link(format!("{base}/"))
        .description(&*feed.description)
        .language(Some(language.to_string()))
        .generator("quire".to_string())
        .items(items)
        .build()
}

fn item(base: &str, post: &ContentItem) -> Item {
    let link = format!("{base}{}", post.path);
    let categories = post.tags.iter()
        .map(|tag| CategoryBuilder::default().name(tag.to_string()).build())
        .collect::<Vec<_>>();

    ItemBuilder::default()
        .title(post.title.to_string())
        .link(Some(link.clone()))
        .guid(GuidBuilder::default().permalink(true).value(link).build())
        .description(post.description.as_deref().map(String::from))
        .pub_date(post.date.to_rfc2822())
        .categories(categories)
        .build()
}

impl Quire {
    /// Writes the configured feed, returning the number of items in it.
    pub fn write_feed(&self, site: &Site) -> Result<usize> {
        let Some(feed) = &self.settings.feed else {
            return Ok(0);
        };

        let channel = channel(feed, &self.settings.default_language, site);
        channel.validate().map_err(|e| error!("invalid feed", "reason" => e))?;

        let path = self.output.join(&feed.path);
        write(&path, channel.to_string())?;
        tracing::debug!(path = %path.display(), items = channel.items().len(), "feed written");
        Ok(channel.items().len())
    }
}
