use std::sync::Arc;

use folio::components::Registry;
use folio::error::{Chainable, Result};
use folio::markdown::SyntaxHighlight;
use folio::rayon::prelude::*;
use folio::taxonomy::export;
use folio::templating::{Engine, MiniJinjaEngine};
use folio::{error, PageRenderer, RenderedPage, Renderer, Site};

use crate::discover::Quire;
use crate::util::{copy_tree, write};
use crate::{ASSETS_DIR, SEARCH_FILE};

/// What one build wrote.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub pages: usize,
    pub exported: usize,
    pub assets: usize,
    pub feed: usize,
}

impl Quire {
    /// Loads, renders and writes the whole site. `env` is the environment
    /// flag gating the export collection.
    pub fn build(&self, env: Option<&str>) -> Result<Summary> {
        SyntaxHighlight::warm_up();
        let items = self.discover()?;
        let site = Arc::new(Site::build(items, &self.settings.collection_builder()?, env)?);

        let filters = Arc::new(self.settings.filters(self.contributors()?));
        let registry = Arc::new(Registry::with_builtins()?);
        let config = self.settings.engine_config(&self.root);
        let engine = Arc::new(MiniJinjaEngine::new(config, filters, registry)?);

        let mut renderer = PageRenderer::new(engine.clone());
        if engine.has_template(&self.settings.layout) {
            renderer = renderer.with_default_layout(&*self.settings.layout);
        }

        let pages = renderer.render_site(&site)?;
        let summary = Summary {
            pages: self.write_pages(&pages)?,
            exported: self.write_export(&site)?,
            assets: self.copy_assets()?,
            feed: self.write_feed(&site)?,
        };

        tracing::info!(
            pages = summary.pages,
            exported = summary.exported,
            assets = summary.assets,
            feed = summary.feed,
            output = %self.output.display(),
            "site written"
        );

        Ok(summary)
    }

    fn write_pages(&self, pages: &[RenderedPage]) -> Result<usize> {
        pages.par_iter()
            .map(|page| write(&self.output.join(&page.path), &page.html))
            .collect::<Result<()>>()?;

        Ok(pages.len())
    }

    /// Writes `search.json` when the export collection has anything in it.
    fn write_export(&self, site: &Site) -> Result<usize> {
        let collection = &site.collections.export;
        if collection.is_empty() {
            return Ok(0);
        }

        let records = export::records(collection);
        let json = serde_json::to_string_pretty(&records)
            .chain_with(|| error!("failed to serialize search export"))?;

        write(&self.output.join(SEARCH_FILE), json)?;
        Ok(records.len())
    }

    fn copy_assets(&self) -> Result<usize> {
        match &self.asset_root {
            Some(assets) => copy_tree(assets, &self.output.join(ASSETS_DIR)),
            None => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use folio::error::Kind;

    use super::*;

    fn site(root: &Path) {
        write(&root.join("folio.toml"), "site_name = \"Field Notes\"\nrecent_window = 1").unwrap();
        write(&root.join("_includes/default.html"), concat!(
            "<title>{{ page.title }} | {{ G.site_name }}</title>\n",
            "{{ content }}",
        )).unwrap();

        write(&root.join("_includes/list.html"), concat!(
            "{% for post in collections.recent %}",
            "<li>{{ post.title }}</li>",
            "{% endfor %}",
        )).unwrap();

        write(&root.join("content/index.md"), "+++\ntitle = \"Home\"\nlayout = \"list.html\"\ndate = 2021-01-01\n+++\n").unwrap();
        write(&root.join("content/blog/a.md"), "+++\ntitle = \"A\"\ndate = 2021-01-02\n+++\n# A\n\n{{ related(slug='b') }}\n").unwrap();
        write(&root.join("content/blog/b.md"), "+++\ntitle = \"B\"\ndate = 2021-01-03\n+++\nB").unwrap();
        write(&root.join("content/blog/c.md"), "+++\ntitle = \"C\"\ndate = 2021-01-04\ndraft = true\n+++\nC").unwrap();
        write(&root.join("assets/site.css"), "body {}").unwrap();
    }

    fn read(path: impl AsRef<Path>) -> String {
        std::fs::read_to_string(path).unwrap()
    }

    #[test]
    fn builds_a_site() {
        let root = tempfile::tempdir().unwrap();
        site(root.path());

        let quire = Quire::new(root.path(), None).unwrap();
        let summary = quire.build(None).unwrap();
        assert_eq!(summary, Summary { pages: 3, exported: 0, assets: 1, feed: 0 });

        let out = root.path().join("_site");
        let home = read(out.join("index.html"));
        assert_eq!(home, "<li>B</li>");

        let a = read(out.join("blog/a/index.html"));
        assert!(a.starts_with("<title>A | Field Notes</title>\n<h1 id=\"a\">"));
        assert!(a.contains("<a href=\"/blog/b/\">B</a>"));

        assert!(out.join("blog/b/index.html").is_file());
        assert!(!out.join("blog/c").exists());
        assert!(!out.join("search.json").exists());
        assert!(!out.join("feed.xml").exists());
        assert_eq!(read(out.join("assets/site.css")), "body {}");
    }

    #[test]
    fn export_only_in_its_environment() {
        let root = tempfile::tempdir().unwrap();
        site(root.path());
        let output = root.path().join("out");

        let quire = Quire::new(root.path(), Some(output.clone())).unwrap();
        assert_eq!(quire.build(Some("dev")).unwrap().exported, 0);
        assert!(!output.join("search.json").exists());

        assert_eq!(quire.build(Some("prod")).unwrap().exported, 3);
        let records: serde_json::Value = serde_json::from_str(&read(output.join("search.json"))).unwrap();
        let slugs: Vec<_> = records.as_array().unwrap()
            .iter()
            .map(|r| r["slug"].as_str().unwrap())
            .collect();

        assert_eq!(slugs, ["b", "a", "index"]);
    }

    #[test]
    fn render_errors_abort_the_build() {
        let root = tempfile::tempdir().unwrap();
        site(root.path());
        write(&root.path().join("content/blog/d.md"), "+++\ndate = 2021-01-05\n+++\n{{ related(slug='c') }}").unwrap();

        let error = Quire::new(root.path(), None).unwrap().build(None).unwrap_err();
        assert_eq!(error.kind(), Kind::Lookup);
        assert!(!root.path().join("_site").exists());
    }

    #[test]
    fn duplicate_slugs_are_fatal() {
        let root = tempfile::tempdir().unwrap();
        site(root.path());
        write(&root.path().join("content/notes/a.md"), "+++\ndate = 2021-01-05\n+++\n").unwrap();

        let error = Quire::new(root.path(), None).unwrap().build(None).unwrap_err();
        assert_eq!(error.kind(), Kind::DuplicateSlug);
    }

    #[test]
    fn feed_of_posts() {
        let root = tempfile::tempdir().unwrap();
        site(root.path());
        write(&root.path().join("folio.toml"), concat!(
            "site_name = \"Field Notes\"\n",
            "[feed]\n",
            "title = \"Field Notes\"\n",
            "url = \"https://notes.example.com\"\n",
            "path = \"blog/feed.xml\"\n",
        )).unwrap();

        let summary = Quire::new(root.path(), None).unwrap().build(None).unwrap();
        assert_eq!(summary.feed, 3);

        let xml = read(root.path().join("_site/blog/feed.xml"));
        assert!(xml.contains("<title>Field Notes</title>"));
        assert!(xml.contains("<generator>quire</generator>"));
        let b = xml.find("<link>https://notes.example.com/blog/b/</link>").unwrap();
        let a = xml.find("<link>https://notes.example.com/blog/a/</link>").unwrap();
        assert!(b < a);
        assert!(!xml.contains("/blog/c/"));
    }

    #[test]
    fn shared_output_paths_are_fatal() {
        let root = tempfile::tempdir().unwrap();
        site(root.path());
        write(&root.path().join("content/notes.md"), "+++\ndate = 2021-01-05\n+++\n").unwrap();
        write(&root.path().join("content/notes/index.md"), "+++\nslug = \"notes-home\"\ndate = 2021-01-06\n+++\n").unwrap();

        let error = Quire::new(root.path(), None).unwrap().build(None).unwrap_err();
        assert_eq!(error.kind(), Kind::DuplicatePath);
    }
}
