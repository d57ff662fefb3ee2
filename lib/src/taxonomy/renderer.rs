use std::path::PathBuf;
use std::sync::Arc;

use rayon::prelude::*;

use crate::error::{Chainable, Result};
use crate::markdown::{Markdown, Templatize};
use crate::taxonomy::*;
use crate::templating::{Engine, PageContext};

/// One rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    /// Output file, relative to the output directory.
    pub path: PathBuf,
    pub html: String,
}

/// Renders every published item of `site` in parallel. Fails with the
/// first error any page produces.
#[inline(always)]
pub fn render_site<R>(renderer: &R, site: &Arc<Site>) -> Result<Vec<RenderedPage>>
    where R: Renderer + ?Sized
{
    let items: Vec<_> = site.published().collect();
    let pages = items.par_iter()
        .map(|item| renderer.render_page(site, item))
        .collect::<Result<Vec<_>>>()?;

    tracing::info!(pages = pages.len(), "rendered site");
    Ok(pages)
}

pub trait Renderer: Sync {
    #[inline(always)]
    fn render_site(&self, site: &Arc<Site>) -> Result<Vec<RenderedPage>> {
        render_site(self, site)
    }

    fn render_page(&self, site: &Arc<Site>, item: &Arc<ContentItem>) -> Result<RenderedPage>;
}

/// The output file of the page at logical path `path`: `a/b/` becomes
/// `a/b/index.html`, paths already ending in `.html` are kept.
pub fn output_path(path: &str) -> PathBuf {
    let path = path.trim_matches('/');
    match path {
        "" => PathBuf::from("index.html"),
        path if path.ends_with(".html") => PathBuf::from(path),
        path => PathBuf::from(path).join("index.html"),
    }
}

/// Renders pages as template expansion, then markdown, then layout.
#[derive(Debug)]
pub struct PageRenderer<E> {
    engine: Arc<E>,
    default_layout: Option<Arc<str>>,
}

impl<E: Engine> PageRenderer<E> {
    pub fn new(engine: Arc<E>) -> Self {
        PageRenderer { engine, default_layout: None }
    }

    /// The layout used by items that don't name their own.
    pub fn with_default_layout(mut self, layout: impl Into<Arc<str>>) -> Self {
        self.default_layout = Some(layout.into());
        self
    }

    fn render_body(&self, context: &PageContext<'_>) -> Result<String> {
        let item = context.item;
        let name = item.source.as_ref().map(|p| p.display().to_string());
        let is_html = item.source.as_ref()
            .and_then(|p| p.extension())
            .is_some_and(|ext| ext == "html");

        if !is_html {
            return Markdown::with_default_rules()
                .plugin(Templatize::with(name.as_deref(), &*self.engine, context))
                .render(&item.body);
        }

        match crate::util::is_template(&item.body) {
            true => self.engine.render_str(name.as_deref(), &item.body, context),
            false => Ok(item.body.to_string()),
        }
    }
}

impl<E: Engine> Renderer for PageRenderer<E> {
    fn render_page(&self, site: &Arc<Site>, item: &Arc<ContentItem>) -> Result<RenderedPage> {
        let context = PageContext::new(site, item);
        let content = self.render_body(&context)
            .chain_with(|| error!("failed to render page", "page" => item.location()))?;

        let html = match item.layout.as_ref().or(self.default_layout.as_ref()) {
            Some(layout) => self.engine.render(layout, &context.with_content(&content))
                .chain_with(|| error! {
                    "failed to apply layout",
                    "page" => item.location(),
                    "layout" => layout,
                })?,
            None => content,
        };

        Ok(RenderedPage { path: output_path(&item.path), html })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::components::Registry;
    use crate::error::Kind;
    use crate::filters::Filters;
    use crate::templating::{EngineConfig, MiniJinjaEngine};

    fn engine(templates: &[(&str, &str)]) -> Arc<MiniJinjaEngine> {
        let config = EngineConfig {
            templates: templates.iter().map(|(n, s)| (n.to_string(), s.to_string())).collect(),
            ..Default::default()
        };

        let registry = Arc::new(Registry::with_builtins().unwrap());
        Arc::new(MiniJinjaEngine::new(config, Arc::new(Filters::new()), registry).unwrap())
    }

    fn site(items: Vec<ContentItem>) -> Arc<Site> {
        Arc::new(Site::build(items, &CollectionBuilder::new(), None).unwrap())
    }

    fn item(slug: &str, body: &str) -> ContentItem {
        ContentItem::new(slug, Utc.timestamp_opt(0, 0).unwrap())
            .with_body(body)
            .with_source(format!("content/{slug}.md"))
    }

    #[test]
    fn output_paths() {
        assert_eq!(output_path("/"), PathBuf::from("index.html"));
        assert_eq!(output_path("/en/blog/post/"), PathBuf::from("en/blog/post/index.html"));
        assert_eq!(output_path("/404.html"), PathBuf::from("404.html"));
    }

    #[test]
    fn markdown_with_components_and_layout() {
        let engine = engine(&[("page.html", "<main>{{ content }}</main>")]);
        let body = "# Intro\n\n{% filter aside(kind='note') %}Some *emphasis*.{% endfilter %}\n";
        let site = site(vec![item("post", body).with_layout("page.html")]);

        let pages = PageRenderer::new(engine).render_site(&site).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].path, PathBuf::from("post/index.html"));

        let html = &pages[0].html;
        assert!(html.starts_with("<main><h1 id=\"intro\">"));
        assert!(html.contains("<aside class=\"aside aside-note\""));
        assert!(html.contains("<p>Some <em>emphasis</em>.</p>"));
        assert!(html.ends_with("</main>"));
    }

    #[test]
    fn drafts_are_not_rendered() {
        let engine = engine(&[]);
        let site = site(vec![item("a", "A"), item("b", "B").with_draft(true)]);
        let pages = PageRenderer::new(engine).render_site(&site).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].html, "<p>A</p>\n");
    }

    #[test]
    fn html_sources_skip_markdown() {
        let engine = engine(&[]);
        let page = item("raw", "<b>{{ page.slug }}</b>").with_source("content/raw.html");
        let site = site(vec![page]);
        let pages = PageRenderer::new(engine).render_site(&site).unwrap();
        assert_eq!(pages[0].html, "<b>raw</b>");
    }

    #[test]
    fn first_error_fails_the_build() {
        let engine = engine(&[]);
        let items = (0..16)
            .map(|i| item(&format!("p{i}"), "fine"))
            .chain([item("bad", "{{ youtube() }}")])
            .collect();

        let error = PageRenderer::new(engine).render_site(&site(items)).unwrap_err();
        assert_eq!(error.kind(), Kind::Render);
        assert!(error.to_string().contains("content/bad.md"));
    }

    #[test]
    fn missing_layout() {
        let engine = engine(&[]);
        let site = site(vec![item("a", "A")]);
        let error = PageRenderer::new(engine)
            .with_default_layout("missing.html")
            .render_site(&site)
            .unwrap_err();

        assert_eq!(error.kind(), Kind::Template);
    }
}
