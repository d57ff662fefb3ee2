use std::sync::Arc;

use pulldown_cmark::{CowStr, Event, LinkType, Tag, TagEnd};

use crate::markdown::{Events, Plugin};
use crate::util::{escape_href, escape_html};

/// Applies `{.class #id key=value}` annotations, dropping attributes whose
/// names aren't allow-listed.
///
/// Headings take the annotation at the end of the line, as parsed by
/// pulldown-cmark; their id and classes are always kept. Paragraphs take a
/// trailing annotation, and links and images one written directly after
/// them: `![alt](/a.png){.wide}`. An optional `:` may open the annotation,
/// as in `{: .note}`. Text that doesn't parse as an annotation is left alone.
///
/// Allow-list entries are exact names or `prefix*` patterns.
#[derive(Debug, Clone)]
pub struct AttributeFilter {
    allowed: Arc<[Arc<str>]>,
}

type Attributes = Vec<(String, String)>;

impl Default for AttributeFilter {
    fn default() -> Self {
        AttributeFilter::new(Self::DEFAULT_ALLOWED.iter().copied())
    }
}

impl AttributeFilter {
    pub const DEFAULT_ALLOWED: &'static [&'static str] = &["id", "class", "data-*"];

    pub fn new<I, S>(allowed: I) -> Self
        where I: IntoIterator<Item = S>, S: Into<Arc<str>>
    {
        AttributeFilter { allowed: allowed.into_iter().map(Into::into).collect() }
    }

    pub fn allows(&self, name: &str) -> bool {
        self.allowed.iter().any(|pattern| match pattern.strip_suffix('*') {
            Some(prefix) => name.starts_with(prefix),
            None => **pattern == *name,
        })
    }

    fn filter_heading<'a>(&self, event: Event<'a>) -> Event<'a> {
        let Event::Start(Tag::Heading { level, id, classes, mut attrs }) = event else {
            return event;
        };

        attrs.retain(|(name, _)| {
            let keep = self.allows(name);
            if !keep {
                tracing::debug!(attribute = &**name, "dropped heading attribute");
            }

            keep
        });

        Event::Start(Tag::Heading { level, id, classes, attrs })
    }

    /// The allowed attributes as ` name="value"` pairs.
    fn render(&self, attrs: Attributes) -> String {
        let mut html = String::new();
        for (name, value) in attrs {
            if !self.allows(&name) {
                tracing::debug!(attribute = %name, "dropped attribute");
                continue;
            }

            html.push_str(&format!(" {name}=\"{}\"", escape_html(&value)));
        }

        html
    }

    fn annotate(&self, events: &mut [Event<'_>]) {
        let mut open = vec![];
        for i in 0..events.len() {
            match &events[i] {
                Event::Start(Tag::Paragraph | Tag::Link { .. } | Tag::Image { .. }) => open.push(i),
                Event::End(TagEnd::Paragraph) => {
                    let Some(start) = open.pop() else { continue };
                    let Some(Event::Text(text)) = i.checked_sub(1).map(|j| &events[j]) else { continue };
                    let Some((attrs, rest)) = trailing_annotation(text) else { continue };
                    let rest = rest.to_string();
                    events[i - 1] = Event::Text(rest.into());
                    events[start] = Event::Html(format!("<p{}>", self.render(attrs)).into());
                }
                Event::End(TagEnd::Link | TagEnd::Image) => {
                    let Some(start) = open.pop() else { continue };
                    let Some(Event::Text(text)) = events.get(i + 1) else { continue };
                    let Some((attrs, rest)) = leading_annotation(text) else { continue };
                    let rest = rest.to_string();
                    let attrs = self.render(attrs);
                    events[i + 1] = Event::Text(rest.into());
                    self.replace_inline(events, start, i, attrs);
                }
                _ => {}
            }
        }
    }

    /// Replaces the link or image spanning `events[start..=end]` with raw
    /// HTML carrying `attrs`.
    fn replace_inline(&self, events: &mut [Event<'_>], start: usize, end: usize, attrs: String) {
        match &events[start] {
            Event::Start(Tag::Link { link_type, dest_url, title, .. }) => {
                let href = href(*link_type, dest_url);
                let html = match title.is_empty() {
                    true => format!("<a href=\"{href}\"{attrs}>"),
                    false => format!("<a href=\"{href}\" title=\"{}\"{attrs}>", escape_html(title)),
                };

                events[start] = Event::InlineHtml(html.into());
            }
            Event::Start(Tag::Image { link_type, dest_url, title, .. }) => {
                let mut alt = String::new();
                for event in &events[start + 1..end] {
                    if let Event::Text(s) | Event::Code(s) = event {
                        alt.push_str(s);
                    }
                }

                let mut html = format!("<img src=\"{}\" alt=\"{}\"", href(*link_type, dest_url), escape_html(&alt));
                if !title.is_empty() {
                    html.push_str(&format!(" title=\"{}\"", escape_html(title)));
                }

                html.push_str(&attrs);
                html.push_str(" />");
                events[start] = Event::InlineHtml(html.into());
                for event in &mut events[start + 1..=end] {
                    *event = Event::Text(CowStr::Borrowed(""));
                }
            }
            _ => {}
        }
    }
}

fn href(link_type: LinkType, url: &str) -> String {
    match link_type {
        LinkType::Email => format!("mailto:{}", escape_href(url)),
        _ => escape_href(url),
    }
}

fn is_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == ':')
}

/// Parses `{.class #id key=value key="a value"}`.
fn parse_annotation(string: &str) -> Option<Attributes> {
    let inner = string.strip_prefix('{')?.strip_suffix('}')?;
    let mut rest = inner.strip_prefix(':').unwrap_or(inner).trim();
    if rest.is_empty() {
        return None;
    }

    let (mut id, mut classes, mut attrs) = (None, vec![], vec![]);
    while !rest.is_empty() {
        let mut quoted = false;
        let end = rest.char_indices()
            .find(|&(_, c)| {
                quoted ^= c == '"';
                c.is_whitespace() && !quoted
            })
            .map_or(rest.len(), |(i, _)| i);

        let token = &rest[..end];
        rest = rest[end..].trim_start();
        if let Some(class) = token.strip_prefix('.') {
            is_name(class).then(|| classes.push(class))?;
        } else if let Some(value) = token.strip_prefix('#') {
            is_name(value).then(|| id = Some(value))?;
        } else {
            let (name, value) = token.split_once('=')?;
            let value = match value.strip_prefix('"') {
                Some(value) => value.strip_suffix('"')?,
                None if value.contains('"') => return None,
                None => value,
            };

            is_name(name).then(|| attrs.push((name.to_string(), value.to_string())))?;
        }
    }

    let mut all = Attributes::new();
    all.extend(id.map(|id| ("id".to_string(), id.to_string())));
    if !classes.is_empty() {
        all.push(("class".to_string(), classes.join(" ")));
    }

    all.extend(attrs);
    Some(all)
}

/// An annotation closing `text`, and the text before it.
fn trailing_annotation(text: &str) -> Option<(Attributes, &str)> {
    let text = text.trim_end();
    let start = text.rfind('{')?;
    let attrs = parse_annotation(&text[start..])?;
    Some((attrs, text[..start].trim_end()))
}

/// An annotation opening `text`, and the text after it.
fn leading_annotation(text: &str) -> Option<(Attributes, &str)> {
    if !text.starts_with('{') {
        return None;
    }

    let end = text.find('}')?;
    let attrs = parse_annotation(&text[..=end])?;
    Some((attrs, &text[end + 1..]))
}

impl Plugin for AttributeFilter {
    fn name(&self) -> &'static str {
        "attributes"
    }

    fn remap<'a>(&'a mut self, events: Events<'a>) -> Events<'a> {
        let mut output: Vec<Event<'a>> = vec![];
        for event in events {
            if let (Event::Text(text), Some(Event::Text(previous))) = (&event, output.last_mut()) {
                let mut joined = previous.to_string();
                joined.push_str(text);
                *previous = joined.into();
                continue;
            }

            output.push(self.filter_heading(event));
        }

        self.annotate(&mut output);
        output.retain(|event| !matches!(event, Event::Text(text) if text.is_empty()));
        Box::new(output.into_iter())
    }
}
