//! The built-in components.
//!
//! Paired components leave a blank line on each side of their body so that
//! markdown inside the body is still rendered.

use std::fmt::Write;

use crate::components::{Args, ComponentError, Context, Kind, Registry};
use crate::error::{BuildError, Result};
use crate::filters::{html_date_string, pretty_date, Contributor, ContributorDirectory};
use crate::taxonomy::ContentItem;
use crate::util::{escape_href, escape_html};

type Rendered = std::result::Result<String, ComponentError>;

pub const ASIDE_KINDS: &[&str] = &[
    "note", "caution", "warning", "success", "objective", "gotchas", "key-term",
];

pub const BANNER_KINDS: &[&str] = &["info", "caution", "warning"];

/// Registers every built-in component into `registry`.
pub fn register_all(registry: &mut Registry) -> Result<()> {
    registry.register("aside", Kind::Paired, aside)?;
    registry.register("details", Kind::Paired, details)?;
    registry.register("banner", Kind::Paired, banner)?;
    registry.register("youtube", Kind::Single, youtube)?;
    registry.register("img", Kind::Single, img)?;
    registry.register("figure", Kind::Single, figure)?;
    registry.register("blockquote", Kind::Paired, blockquote)?;
    registry.register("related", Kind::Single, related)?;
    registry.register("post_card", Kind::Single, post_card)?;
    registry.register("breadcrumbs", Kind::Single, breadcrumbs)?;
    registry.register("author", Kind::Single, author)?;
    registry.register("author_info", Kind::Single, author_info)?;
    registry.register("byline", Kind::Single, byline)?;
    Ok(())
}

fn body(body: Option<&str>) -> &str {
    body.unwrap_or_default().trim_matches('\n')
}

/// `{% filter aside(kind="note", title="Heads up") %}...{% endfilter %}`
pub fn aside(args: &Args, content: Option<&str>, _: &Context<'_>) -> Rendered {
    let kind = args.one_of("kind", ASIDE_KINDS, Some("note"))?;
    let mut html = format!("<aside class=\"aside aside-{kind}\" role=\"note\">\n");
    if let Some(title) = args.optional_str("title")? {
        let _ = writeln!(html, "<p class=\"aside-title\">{}</p>", escape_html(title));
    }

    let _ = write!(html, "\n{}\n\n</aside>\n", body(content));
    Ok(html)
}

/// `{% filter details(summary="More", open=true) %}...{% endfilter %}`
pub fn details(args: &Args, content: Option<&str>, _: &Context<'_>) -> Rendered {
    let summary = escape_html(args.required_str("summary")?);
    let open = match args.optional_bool("open")?.unwrap_or(false) {
        true => " open",
        false => "",
    };

    Ok(format!("<details{open}>\n<summary>{summary}</summary>\n\n{}\n\n</details>\n", body(content)))
}

/// `{% filter banner(kind="warning") %}...{% endfilter %}`
pub fn banner(args: &Args, content: Option<&str>, _: &Context<'_>) -> Rendered {
    let kind = args.one_of("kind", BANNER_KINDS, Some("info"))?;
    Ok(format!("<div class=\"banner banner-{kind}\" role=\"status\">\n\n{}\n\n</div>\n", body(content)))
}

/// `{{ youtube(id="dQw4w9WgXcQ", start=42) }}`
pub fn youtube(args: &Args, _: Option<&str>, _: &Context<'_>) -> Rendered {
    let id = args.required_str("id")?;
    let url_safe = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_';
    if id.is_empty() || !id.chars().all(url_safe) {
        return Err(ComponentError::invalid(format!("`{id}` is not a valid video id")));
    }

    let mut src = format!("https://www.youtube-nocookie.com/embed/{id}");
    if let Some(start) = args.optional_u64("start")? {
        let _ = write!(src, "?start={start}");
    }

    Ok(format!(concat!(
        "<div class=\"youtube\">",
        "<iframe src=\"{}\" title=\"YouTube video\" loading=\"lazy\" ",
        "allow=\"accelerometer; encrypted-media; gyroscope; picture-in-picture\" ",
        "allowfullscreen></iframe>",
        "</div>"
    ), src))
}

/// `{{ img(src="/a.png", alt="An image", width=640) }}`
pub fn img(args: &Args, _: Option<&str>, _: &Context<'_>) -> Rendered {
    let src = escape_href(args.required_str("src")?);
    let alt = escape_html(args.required_str("alt")?);
    let mut html = format!("<img src=\"{src}\" alt=\"{alt}\"");
    for dimension in ["width", "height"] {
        if let Some(value) = args.optional_u64(dimension)? {
            let _ = write!(html, " {dimension}=\"{value}\"");
        }
    }

    html.push_str(" loading=\"lazy\" decoding=\"async\">");
    Ok(html)
}

/// `{{ figure(src="/a.png", alt="An image", caption="Figure 1") }}`: an
/// [`img()`] with an optional caption.
pub fn figure(args: &Args, _: Option<&str>, context: &Context<'_>) -> Rendered {
    let mut html = format!("<figure>{}", img(args, None, context)?);
    if let Some(caption) = args.optional_str("caption")? {
        let _ = write!(html, "<figcaption>{}</figcaption>", escape_html(caption));
    }

    html.push_str("</figure>");
    Ok(html)
}

/// `{% filter blockquote(source="Ada", url="https://...") %}...{% endfilter %}`
pub fn blockquote(args: &Args, content: Option<&str>, _: &Context<'_>) -> Rendered {
    let mut html = format!("<blockquote class=\"blockquote\">\n\n{}\n\n", body(content));
    let source = args.optional_str("source")?;
    match (source, args.optional_str("url")?) {
        (Some(source), Some(url)) => {
            let _ = writeln!(html, "<cite><a href=\"{}\">{}</a></cite>", escape_href(url), escape_html(source));
        }
        (Some(source), None) => {
            let _ = writeln!(html, "<cite>{}</cite>", escape_html(source));
        }
        (None, Some(_)) => return Err(ComponentError::invalid("`url` needs a `source` to link")),
        (None, None) => {}
    }

    html.push_str("</blockquote>\n");
    Ok(html)
}

/// `{{ related(slug="other-post") }}`: a card linking to another item.
/// With `optional=true`, an unknown slug renders nothing.
pub fn related(args: &Args, _: Option<&str>, context: &Context<'_>) -> Rendered {
    let slug = args.required_str("slug")?;
    let optional = args.optional_bool("optional")?.unwrap_or(false);
    let site = context.site
        .ok_or_else(|| ComponentError::invalid("`related` needs the site to resolve slugs"))?;

    let item = match site.index.lookup(slug) {
        Ok(item) => item,
        Err(_) if optional => return Ok(String::new()),
        Err(e) => return Err(e.into()),
    };

    if item.draft && !optional {
        return Err(BuildError::Lookup(slug.to_string()).into());
    } else if item.draft {
        return Ok(String::new());
    }

    let mut html = format!(
        "<aside class=\"related\"><a href=\"{}\">{}</a>",
        escape_html(&item.path),
        escape_html(&item.title)
    );

    if let Some(description) = &item.description {
        let _ = write!(html, "<p>{}</p>", escape_html(description));
    }

    html.push_str("</aside>");
    Ok(html)
}

/// `{{ post_card(slug="other-post") }}`: the title, date and description of
/// another published item.
pub fn post_card(args: &Args, _: Option<&str>, context: &Context<'_>) -> Rendered {
    let slug = args.required_str("slug")?;
    let site = context.site
        .ok_or_else(|| ComponentError::invalid("`post_card` needs the site to resolve slugs"))?;

    let item = site.index.lookup(slug)?;
    if item.draft {
        return Err(BuildError::Lookup(slug.to_string()).into());
    }

    let mut html = format!(
        "<article class=\"post-card\"><h3><a href=\"{}\">{}</a></h3><time datetime=\"{}\">{}</time>",
        escape_href(&item.path),
        escape_html(&item.title),
        html_date_string(&item.date),
        pretty_date(&item.date),
    );

    if let Some(description) = &item.description {
        let _ = write!(html, "<p>{}</p>", escape_html(description));
    }

    html.push_str("</article>");
    Ok(html)
}

/// `{{ breadcrumbs() }}`: links to every ancestor of the current page. The
/// last crumb is the page's title.
pub fn breadcrumbs(_: &Args, _: Option<&str>, context: &Context<'_>) -> Rendered {
    let segments: Vec<&str> = context.page.split('/').filter(|s| !s.is_empty()).collect();
    let mut html = String::from("<nav class=\"breadcrumbs\" aria-label=\"Breadcrumbs\"><ol>");
    html.push_str("<li><a href=\"/\">Home</a></li>");

    let mut href = String::from("/");
    for (i, segment) in segments.iter().enumerate() {
        href.push_str(segment);
        href.push('/');
        if i + 1 < segments.len() {
            let _ = write!(html, "<li><a href=\"{}\">{}</a></li>", escape_href(&href), escape_html(segment));
        } else {
            let title = context.item.map_or(*segment, |item| &*item.title);
            let _ = write!(html, "<li aria-current=\"page\">{}</li>", escape_html(title));
        }
    }

    html.push_str("</ol></nav>");
    Ok(html)
}

fn directory<'a>(context: &Context<'a>, component: &str) -> Result<&'a ContributorDirectory, ComponentError> {
    context.filters
        .map(|filters| &filters.contributors)
        .ok_or_else(|| ComponentError::invalid(format!("`{component}` needs the contributor directory")))
}

fn contributor<'a>(args: &Args, context: &Context<'a>, component: &str) -> Result<&'a Contributor, ComponentError> {
    let id = args.required_str("id")?;
    directory(context, component)?
        .get(id)
        .map(|c| &**c)
        .ok_or_else(|| ComponentError::invalid(format!("unknown contributor `{id}`")))
}

fn author_link(contributor: &Contributor) -> String {
    let name = escape_html(&contributor.name);
    match &contributor.url {
        Some(url) => format!("<a class=\"author\" href=\"{}\">{name}</a>", escape_href(url)),
        None => format!("<span class=\"author\">{name}</span>"),
    }
}

fn avatar(contributor: &Contributor) -> String {
    contributor.avatar.as_ref()
        .map(|src| format!(
            "<img class=\"author-avatar\" src=\"{}\" alt=\"\" loading=\"lazy\">",
            escape_href(src)
        ))
        .unwrap_or_default()
}

/// `{{ author(id="ada") }}`: a contributor's avatar and linked name.
pub fn author(args: &Args, _: Option<&str>, context: &Context<'_>) -> Rendered {
    let contributor = contributor(args, context, "author")?;
    Ok(format!("{}{}", avatar(contributor), author_link(contributor)))
}

/// `{{ author_info(id="ada") }}`: a contributor card with the bio.
pub fn author_info(args: &Args, _: Option<&str>, context: &Context<'_>) -> Rendered {
    let contributor = contributor(args, context, "author_info")?;
    let mut html = format!(
        "<div class=\"author-info\">{}<div><p class=\"author-name\">{}</p>",
        avatar(contributor),
        author_link(contributor),
    );

    if let Some(bio) = &contributor.bio {
        let _ = write!(html, "<p class=\"author-bio\">{}</p>", escape_html(bio));
    }

    html.push_str("</div></div>");
    Ok(html)
}

/// `{{ byline() }}`: the current item's contributors, in order. Unknown ids
/// are dropped; with none left, renders nothing.
pub fn byline(_: &Args, _: Option<&str>, context: &Context<'_>) -> Rendered {
    let item: &ContentItem = context.item
        .ok_or_else(|| ComponentError::invalid("`byline` needs the item being rendered"))?;

    let filters = context.filters
        .ok_or_else(|| ComponentError::invalid("`byline` needs the contributor directory"))?;

    let authors = filters.expand_contributors(&item.contributors);
    if authors.is_empty() {
        return Ok(String::new());
    }

    let links: Vec<String> = authors.iter().map(|c| author_link(c)).collect();
    Ok(format!("<p class=\"byline\">By {}</p>", links.join(", ")))
}
