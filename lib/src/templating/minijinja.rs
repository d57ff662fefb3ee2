use std::path::PathBuf;
use std::sync::Arc;

use minijinja::{path_loader, Environment};
use minijinja::value::Value;

use crate::components::Registry;
use crate::error::{BuildError, Result};
use crate::filters::Filters;
use crate::templating::{Engine, PageContext};

pub use taxonomy_object::{PageObject, SiteObject, SiteCollections};

/// Names the engine registers itself, besides filters and components.
pub const FUNCTIONS: &[&str] = &["find", "lookup", "shortcode"];

/// MiniJinja's own filters and global functions. Components can't take these
/// names either.
pub const BUILTINS: &[&str] = &[
    "abs", "attr", "batch", "bool", "capitalize", "count", "d", "default",
    "dictsort", "e", "escape", "first", "float", "format", "groupby", "indent",
    "int", "items", "join", "last", "length", "lines", "list", "lower", "map",
    "max", "min", "pprint", "reject", "rejectattr", "replace", "reverse",
    "round", "safe", "select", "selectattr", "slice", "sort", "split",
    "string", "sum", "title", "tojson", "trim", "unique", "upper", "urlencode",
    "debug", "dict", "namespace", "range",
];

#[derive(Debug, Default, Clone)]
pub struct EngineConfig {
    /// Directory layouts and partials are loaded from.
    pub includes: Option<PathBuf>,
    /// In-memory templates as `(name, source)`; these win over `includes`.
    pub templates: Vec<(String, String)>,
    /// Exposed to every template as `G`.
    pub globals: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug)]
pub struct MiniJinjaEngine {
    env: Environment<'static>,
}

#[cfg(test)] static_assertions::assert_impl_all!(MiniJinjaEngine: Send, Sync);

impl MiniJinjaEngine {
    pub fn new(config: EngineConfig, filters: Arc<Filters>, registry: Arc<Registry>) -> Result<Self> {
        for name in registry.names() {
            let taken = [Filters::NAMES, FUNCTIONS, BUILTINS];
            if taken.iter().any(|names| names.contains(&name)) {
                return Err(BuildError::configuration(
                    format!("component `{name}`"),
                    "the name is already taken by a filter or function"
                ).into());
            }
        }

        let mut env = Environment::new();
        if let Some(includes) = &config.includes {
            env.set_loader(path_loader(includes));
        }

        for (name, source) in config.templates {
            env.add_template_owned(name, source)?;
        }

        env.add_global("G", Value::from_serialize(&config.globals));
        env.add_function("find", ext::find);
        env.add_function("lookup", ext::lookup);
        ext::register_filters(&mut env, filters.clone());
        ext::register_components(&mut env, registry, filters);

        tracing::debug!(includes = ?config.includes, "template engine ready");
        Ok(MiniJinjaEngine { env })
    }
}

fn context_value(context: &PageContext<'_>) -> Value {
    let content = context.content
        .map(|content| Value::from_safe_string(content.to_string()))
        .unwrap_or_else(|| Value::from(()));

    Value::from_iter([
        ("page", Value::from_object(PageObject(context.item.clone()))),
        ("site", Value::from_object(SiteObject(context.site.clone()))),
        ("collections", Value::from_object(SiteCollections(context.site.clone()))),
        ("content", content),
    ])
}

impl Engine for MiniJinjaEngine {
    fn render(&self, name: &str, context: &PageContext<'_>) -> Result<String> {
        let template = self.env.get_template(name)?;
        Ok(template.render(context_value(context))?)
    }

    fn render_str(
        &self,
        name: Option<&str>,
        source: &str,
        context: &PageContext<'_>,
    ) -> Result<String> {
        let context = context_value(context);
        let string = match name {
            Some(name) => self.env.render_named_str(name, source, context)?,
            None => self.env.render_str(source, context)?,
        };

        Ok(string)
    }

    fn has_template(&self, name: &str) -> bool {
        self.env.get_template(name).is_ok()
    }
}

mod ext {
    use std::sync::Arc;

    use chrono::{DateTime, Utc};
    use minijinja::value::{Kwargs, Rest, Value};
    use minijinja::{Environment, Error, ErrorKind, State};

    use super::{PageObject, SiteObject};
    use crate::components::{Args, Context, Registry};
    use crate::error::BuildError;
    use crate::filters::{self, Filters};
    use crate::taxonomy::{Collection, ContentItem};

    fn build_error(error: BuildError) -> Error {
        Error::new(ErrorKind::InvalidOperation, error.to_string()).with_source(error)
    }

    fn invalid(message: impl Into<std::borrow::Cow<'static, str>>) -> Error {
        Error::new(ErrorKind::InvalidOperation, message)
    }

    fn site(state: &State<'_, '_>) -> Result<Value, Error> {
        state.lookup("site")
            .filter(|v| v.downcast_object_ref::<SiteObject>().is_some())
            .ok_or_else(|| invalid("no `site` in the template context"))
    }

    fn pages(value: &Value) -> Result<Vec<Arc<ContentItem>>, Error> {
        value.try_iter()?
            .map(|v| match v.downcast_object_ref::<PageObject>() {
                Some(page) => Ok(page.0.clone()),
                None => Err(invalid(format!("expected a content item, found {}", v.kind()))),
            })
            .collect()
    }

    fn date(value: &Value) -> Result<DateTime<Utc>, Error> {
        let date = match value.as_str() {
            Some(string) => filters::parse_date(string),
            None => i64::try_from(value.clone()).ok().and_then(filters::timestamp),
        };

        date.ok_or_else(|| invalid(format!("`{value}` is not a date")))
    }

    pub fn find(state: &State<'_, '_>, slug: &str) -> Result<Value, Error> {
        let site = site(state)?;
        let site = site.downcast_object_ref::<SiteObject>().map(|s| &s.0);
        Ok(site.and_then(|site| site.index.get(slug))
            .map(|item| Value::from_object(PageObject(item.clone())))
            .unwrap_or_else(|| Value::from(())))
    }

    pub fn lookup(state: &State<'_, '_>, slug: &str) -> Result<Value, Error> {
        let site = site(state)?;
        let site = site.downcast_object_ref::<SiteObject>().map(|s| &s.0);
        match site.map(|site| site.index.lookup(slug)) {
            Some(Ok(item)) => Ok(Value::from_object(PageObject(item.clone()))),
            Some(Err(e)) => Err(build_error(e)),
            None => Err(invalid("no `site` in the template context")),
        }
    }

    pub fn register_filters(env: &mut Environment<'static>, bound: Arc<Filters>) {
        env.add_filter("remove_drafts", |items: Value| -> Result<Value, Error> {
            let kept = filters::remove_drafts(&pages(&items)?);
            Ok(Value::from_object(Collection::new("remove_drafts", kept)))
        });

        env.add_filter("contains_tag", |item: Value, tag: &str| -> Result<bool, Error> {
            match item.downcast_object_ref::<PageObject>() {
                Some(page) => Ok(filters::contains_tag(&page.0, tag)),
                None => Err(invalid(format!("expected a content item, found {}", item.kind()))),
            }
        });

        env.add_filter("paginate", |items: Value, size: i64| -> Result<Value, Error> {
            let items: Vec<Value> = items.try_iter()?.collect();
            let pages = filters::paginate(&items, size).map_err(build_error)?;
            Ok(pages.iter().map(|page| Value::from(page.to_vec())).collect())
        });

        let directory = bound.clone();
        env.add_filter("expand_contributors", move |ids: Value| -> Result<Value, Error> {
            let ids = ids.try_iter()?
                .map(|id| id.as_str().map(String::from).ok_or_else(|| {
                    invalid(format!("contributor ids must be strings, found {}", id.kind()))
                }))
                .collect::<Result<Vec<_>, _>>()?;

            Ok(Value::from_serialize(directory.expand_contributors(&ids)))
        });

        env.add_filter("pretty_date", |value: Value| date(&value).map(|d| filters::pretty_date(&d)));
        env.add_filter("html_date_string", |value: Value| {
            date(&value).map(|d| filters::html_date_string(&d))
        });

        env.add_filter("path_slug", |path: &str| filters::path_slug(path));
        env.add_filter("strip_blog", |path: &str| filters::strip_blog(path));

        let languages = bound.clone();
        env.add_filter("strip_language", move |path: &str| languages.strip_language(path));

        let repository = bound;
        env.add_filter("github_link", move |path: &str| -> Result<String, Error> {
            repository.github_link(path).map_err(build_error)
        });

        env.add_filter("md", |input: &str| -> Result<Value, Error> {
            let html = filters::md(input).map_err(|e| invalid(e.to_string()))?;
            Ok(Value::from_safe_string(html))
        });

        env.add_filter("measured_json", |items: Value| -> Result<String, Error> {
            filters::measured_json(&pages(&items)?).map_err(|e| invalid(e.to_string()))
        });
    }

    /// What component invocations need from the engine.
    struct Components {
        registry: Arc<Registry>,
        filters: Arc<Filters>,
    }

    /// Every component becomes both a function, for single use, and a
    /// filter, for `{% filter %}` blocks. The registry rejects the wrong
    /// form.
    pub fn register_components(env: &mut Environment<'static>, registry: Arc<Registry>, filters: Arc<Filters>) {
        let components = Arc::new(Components { registry, filters });
        for name in components.registry.names() {
            let (c, component) = (components.clone(), name.to_string());
            env.add_function(name.to_string(), move |state: &State<'_, '_>, args: Rest<Value>, kwargs: Kwargs| {
                c.invoke(state, &component, &args, kwargs, None)
            });

            let (c, component) = (components.clone(), name.to_string());
            env.add_filter(name.to_string(), move |state: &State<'_, '_>, body: String, args: Rest<Value>, kwargs: Kwargs| {
                c.invoke(state, &component, &args, kwargs, Some(&body))
            });
        }

        let c = components.clone();
        env.add_function("shortcode", move |state: &State<'_, '_>, name: String, args: Rest<Value>, kwargs: Kwargs| {
            c.invoke(state, &name, &args, kwargs, None)
        });

        env.add_filter("shortcode", move |state: &State<'_, '_>, body: String, name: String, args: Rest<Value>, kwargs: Kwargs| {
            components.invoke(state, &name, &args, kwargs, Some(&body))
        });
    }

    fn json(value: &Value) -> Result<serde_json::Value, Error> {
        serde_json::to_value(value)
            .map_err(|e| invalid(format!("unsupported component argument: {e}")))
    }

    impl Components {
        fn invoke(
            &self,
            state: &State<'_, '_>,
            name: &str,
            positional: &[Value],
            kwargs: Kwargs,
            body: Option<&str>,
        ) -> Result<Value, Error> {
            let mut args = Args::new();
            for value in positional {
                args.positional.push(json(value)?);
            }

            for key in kwargs.args() {
                let value: Value = kwargs.get(key)?;
                args.named.insert(key.to_string(), json(&value)?);
            }

            let page = state.lookup("page");
            let site = state.lookup("site");
            let item = page.as_ref().and_then(|v| v.downcast_object_ref::<PageObject>());
            let path = item.map_or_else(|| state.name(), |page| &*page.0.path);

            let mut context = Context::new(path).with_filters(&self.filters);
            if let Some(item) = item {
                context = context.with_item(&item.0);
            }

            if let Some(site) = site.as_ref().and_then(|v| v.downcast_object_ref::<SiteObject>()) {
                context = context.with_site(&site.0);
            }

            self.registry.invoke(name, &args, body, &context)
                .map(Value::from_safe_string)
                .map_err(build_error)
        }
    }
}

mod taxonomy_object {
    use std::sync::Arc;

    use minijinja::value::{Enumerator, Object, ObjectRepr, Value};
    use minijinja::{Error, ErrorKind, State};

    use crate::filters::html_date_string;
    use crate::taxonomy::{Collection, Collections, ContentItem, Site};

    /// A content item as seen by templates.
    #[derive(Debug)]
    pub struct PageObject(pub Arc<ContentItem>);

    #[derive(Debug)]
    pub struct SiteObject(pub Arc<Site>);

    #[derive(Debug)]
    pub struct SiteCollections(pub Arc<Site>);

    const PAGE_FIELDS: &[&str] = &[
        "slug", "title", "description", "date", "updated", "tags", "draft",
        "language", "contributors", "measurement", "body", "path", "url", "layout",
    ];

    impl Object for PageObject {
        fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
            let item = &self.0;
            let value = match key.as_str()? {
                "slug" => Value::from(item.slug.clone()),
                "title" => Value::from(item.title.clone()),
                "description" => Value::from(item.description.clone()),
                "date" => Value::from(html_date_string(&item.date)),
                "updated" => Value::from(item.updated.as_ref().map(html_date_string)),
                "tags" => item.tags.iter().cloned().map(Value::from).collect(),
                "draft" => Value::from(item.draft),
                "language" => Value::from(item.language.clone()),
                "contributors" => item.contributors.iter().cloned().map(Value::from).collect(),
                "measurement" => Value::from_serialize(&item.measurement),
                "body" => Value::from(item.body.clone()),
                "path" | "url" => Value::from(item.path.clone()),
                "layout" => Value::from(item.layout.clone()),
                key => return item.extra.get(key).map(Value::from_serialize),
            };

            Some(value)
        }

        fn enumerate(self: &Arc<Self>) -> Enumerator {
            let fields = PAGE_FIELDS.iter().copied().map(Value::from);
            let extra = self.0.extra.keys()
                .filter(|k| !PAGE_FIELDS.contains(&k.as_str()))
                .map(|k| Value::from(k.as_str()));

            Enumerator::Values(fields.chain(extra).collect())
        }
    }

    impl Object for Collection {
        fn repr(self: &Arc<Self>) -> ObjectRepr {
            ObjectRepr::Seq
        }

        fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
            let item = self.items.get(key.as_usize()?)?;
            Some(Value::from_object(PageObject(item.clone())))
        }

        fn enumerate(self: &Arc<Self>) -> Enumerator {
            Enumerator::Seq(self.items.len())
        }
    }

    impl Object for SiteObject {
        fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
            let value = match key.as_str()? {
                "collections" => Value::from_object(SiteCollections(self.0.clone())),
                "env" => Value::from(self.0.env.clone()),
                _ => return None,
            };

            Some(value)
        }

        fn enumerate(self: &Arc<Self>) -> Enumerator {
            Enumerator::Str(&["collections", "env"])
        }

        /// `site.find(slug)`: the item or `none`.
        fn call_method(
            self: &Arc<Self>,
            _: &State<'_, '_>,
            method: &str,
            args: &[Value],
        ) -> Result<Value, Error> {
            let (Some(slug), "find") = (args.first().and_then(|v| v.as_str()), method) else {
                return Err(Error::new(ErrorKind::UnknownMethod, format!("site has no method `{method}`")));
            };

            Ok(self.0.index.get(slug)
                .map(|item| Value::from_object(PageObject(item.clone())))
                .unwrap_or_else(|| Value::from(())))
        }
    }

    impl Object for SiteCollections {
        fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
            let collection = self.0.collections.get(key.as_str()?)?;
            Some(Value::from_object(collection.clone()))
        }

        fn enumerate(self: &Arc<Self>) -> Enumerator {
            Enumerator::Str(&[
                Collections::POSTS,
                Collections::MEASURED,
                Collections::RECENT,
                Collections::EXPORT,
                Collections::MEMOIZED,
            ])
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::components::Kind as ComponentKind;
    use crate::error::Kind;
    use crate::filters::{Contributor, ContributorDirectory};
    use crate::taxonomy::{CollectionBuilder, ContentItem, Site};

    fn site() -> Arc<Site> {
        let date = |d| Utc.with_ymd_and_hms(2021, 1, d, 12, 0, 0).unwrap();
        let items = vec![
            ContentItem::new("first", date(1))
                .with_title("First")
                .with_tags(["rust"])
                .with_contributors(["ada", "ghost"]),
            ContentItem::new("second", date(5)).with_title("Second <2>"),
            ContentItem::new("draft", date(9)).with_draft(true),
        ];

        Arc::new(Site::build(items, &CollectionBuilder::new(), Some("prod")).unwrap())
    }

    fn engine(templates: &[(&str, &str)]) -> MiniJinjaEngine {
        let config = EngineConfig {
            templates: templates.iter().map(|(n, s)| (n.to_string(), s.to_string())).collect(),
            globals: serde_json::json!({ "name": "Folio" }).as_object().cloned().unwrap_or_default(),
            ..Default::default()
        };

        let filters = Filters::new()
            .with_languages(["en"])
            .with_contributors(ContributorDirectory::new([Contributor::new("ada", "Ada")]));

        let registry = Registry::with_builtins().unwrap();
        MiniJinjaEngine::new(config, Arc::new(filters), Arc::new(registry)).unwrap()
    }

    fn render(source: &str) -> Result<String> {
        let site = site();
        let item = site.index.get("first").unwrap().clone();
        engine(&[]).render_str(Some("page.md"), source, &PageContext::new(&site, &item))
    }

    #[test]
    fn page_and_site_fields() {
        let html = render("{{ G.name }}: {{ page.title }} on {{ page.date | pretty_date }}").unwrap();
        assert_eq!(html, "Folio: First on January 1, 2021");

        let html = render("{% for p in collections.posts %}{{ p.slug }} {% endfor %}").unwrap();
        assert_eq!(html, "second first ");

        let html = render("{{ site.collections.export | length }} {{ site.env }}").unwrap();
        assert_eq!(html, "2 prod");
    }

    #[test]
    fn filters_are_bound() {
        let html = render(concat!(
            "{{ 'yes' if page | contains_tag('rust') else 'no' }} ",
            "{{ 'yes' if page | contains_tag('Rust') else 'no' }}",
        ));

        assert_eq!(html.unwrap(), "yes no");

        let html = render("{% for c in page.contributors | expand_contributors %}{{ c.name }}{% endfor %}");
        assert_eq!(html.unwrap(), "Ada");

        let html = render("{{ collections.memoized | remove_drafts | length }}").unwrap();
        assert_eq!(html, "2");

        let html = render("{{ (collections.posts | paginate(1)) | length }}").unwrap();
        assert_eq!(html, "2");

        let html = render("{{ '/en/blog/x/index.md' | strip_language | strip_blog }} {{ 'a/b.md' | path_slug }}");
        assert_eq!(html.unwrap(), "/x/index.md b");

        let error = render("{{ collections.posts | paginate(0) }}").unwrap_err();
        assert_eq!(error.kind(), Kind::Configuration);

        let error = render("{{ 'x.md' | github_link }}").unwrap_err();
        assert_eq!(error.kind(), Kind::Configuration);
    }

    #[test]
    fn markdown_and_measurement_filters() {
        let html = render("{{ '**bold** <move>' | md }}").unwrap();
        assert_eq!(html, "<p><strong>bold</strong> <move></p>\n");

        let html = render("{{ collections.posts | measured_json }}").unwrap();
        assert_eq!(html, "[]");
    }

    #[test]
    fn components_see_the_page_and_contributors() {
        let html = render("{{ byline() }}").unwrap();
        assert_eq!(html, "<p class=\"byline\">By <span class=\"author\">Ada</span></p>");

        let html = render("{{ author(id='ada') }}").unwrap();
        assert_eq!(html, "<span class=\"author\">Ada</span>");

        let html = render("{{ breadcrumbs() }}").unwrap();
        assert!(html.ends_with("<li aria-current=\"page\">First</li></ol></nav>"));
    }

    #[test]
    fn find_and_lookup() {
        assert_eq!(render("{{ find('second').title }}").unwrap(), "Second <2>");
        assert_eq!(render("{% if find('nope') is none %}none{% endif %}").unwrap(), "none");
        assert_eq!(render("{% if site.find('draft').draft %}draft{% endif %}").unwrap(), "draft");

        let error = render("{{ lookup('nope') }}").unwrap_err();
        assert_eq!(error.kind(), Kind::Lookup);
    }

    #[test]
    fn components_in_templates() {
        let html = render("{{ youtube(id='abc') }}").unwrap();
        assert!(html.contains("embed/abc"));

        let html = render("{% filter aside(kind='warning') %}Careful{% endfilter %}").unwrap();
        assert!(html.contains("aside-warning"));
        assert!(html.contains("\nCareful\n"));

        let html = render("{{ shortcode('related', slug='second') }}").unwrap();
        assert!(html.contains("href=\"/second/\""));

        let error = render("{{ aside(kind='note') }}").unwrap_err();
        assert_eq!(error.kind(), Kind::Render);

        let error = render("{{ missing_component(x=1) }}").unwrap_err();
        assert_eq!(error.kind(), Kind::UnknownComponent);

        let error = render("{{ shortcode('missing') }}").unwrap_err();
        assert_eq!(error.kind(), Kind::UnknownComponent);

        let error = render("{{ youtube() }}").unwrap_err();
        assert_eq!(error.kind(), Kind::Render);
        assert!(error.to_string().contains("/first/"));
    }

    #[test]
    fn layouts_escape_fields_but_not_content() {
        let engine = engine(&[("page.html", "<h1>{{ page.title }}</h1>{{ content }}")]);
        let site = site();
        let item = site.index.get("second").unwrap().clone();
        let context = PageContext::new(&site, &item).with_content("<p>hi</p>");

        assert!(engine.has_template("page.html"));
        assert!(!engine.has_template("nope.html"));
        assert_eq!(engine.render("page.html", &context).unwrap(), "<h1>Second &lt;2&gt;</h1><p>hi</p>");
    }

    #[test]
    fn component_names_cannot_shadow_filters() {
        for name in ["paginate", "lookup", "length", "default", "range"] {
            let mut registry = Registry::new();
            registry.register(name, ComponentKind::Single, |_, _, _| Ok(String::new())).unwrap();

            let error = MiniJinjaEngine::new(
                EngineConfig::default(),
                Arc::new(Filters::new()),
                Arc::new(registry),
            ).unwrap_err();

            assert_eq!(error.kind(), Kind::Configuration, "{name}");
        }
    }
}
