use std::collections::VecDeque;

use pulldown_cmark::{CowStr, Event, HeadingLevel, Tag, TagEnd};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::markdown::{Events, Plugin};
use crate::util::{escape_html, slugify};

/// Assigns an id to every heading that lacks one.
///
/// Ids are the slugified heading text. A collision gets the first free
/// `-1`, `-2`, ... suffix; explicit ids anywhere in the document are never
/// reissued.
#[derive(Debug, Default, Clone)]
pub struct AutoHeading {
    issued: FxHashSet<String>,
    counters: FxHashMap<String, usize>,
}

impl AutoHeading {
    fn issue(&mut self, text: &str) -> String {
        let base = match slugify(text) {
            slug if slug.is_empty() => "section".to_string(),
            slug => slug,
        };

        if self.issued.insert(base.clone()) {
            return base;
        }

        let n = self.counters.entry(base.clone()).or_insert(1);
        loop {
            let candidate = format!("{base}-{n}");
            *n += 1;
            if self.issued.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

impl Plugin for AutoHeading {
    fn name(&self) -> &'static str {
        "heading-id"
    }

    fn remap<'a>(&'a mut self, events: Events<'a>) -> Events<'a> {
        let events: Vec<_> = events.collect();

        self.issued.clear();
        self.counters.clear();
        for event in &events {
            if let Event::Start(Tag::Heading { id: Some(id), .. }) = event {
                self.issued.insert(id.to_string());
            }
        }

        let mut output = Vec::with_capacity(events.len());
        let mut events = events.into_iter();
        while let Some(event) = events.next() {
            let Event::Start(Tag::Heading { level, id: None, classes, attrs }) = event else {
                output.push(event);
                continue;
            };

            let mut text = String::new();
            let mut inner = VecDeque::with_capacity(4);
            for event in events.by_ref() {
                match event {
                    Event::End(TagEnd::Heading(..)) => break,
                    Event::Text(ref s) | Event::Code(ref s) => text.push_str(s),
                    _ => {}
                }

                inner.push_back(event);
            }

            let id = self.issue(&text);
            output.push(Event::Start(Tag::Heading { level, id: Some(id.into()), classes, attrs }));
            output.extend(inner);
            output.push(Event::End(TagEnd::Heading(level)));
        }

        Box::new(output.into_iter())
    }
}

/// Inserts a `#` self-link into every heading below `h1` that has an id.
#[derive(Debug, Default, Clone)]
pub struct HeadingAnchor;

struct AnchorIterator<'a, I> {
    pending: Option<CowStr<'a>>,
    inner: I,
}

impl<'a, I: Iterator<Item = Event<'a>>> Iterator for AnchorIterator<'a, I> {
    type Item = Event<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(id) = self.pending.take() {
            let id = escape_html(&id);
            let html = format!(r##"<a class="anchor" title="anchor" href="#{id}">#</a> "##);
            return Some(Event::InlineHtml(html.into()));
        }

        let event = self.inner.next()?;
        if let Event::Start(Tag::Heading { level, id: Some(ref id), .. }) = event {
            if level != HeadingLevel::H1 {
                self.pending = Some(id.clone());
            }
        }

        Some(event)
    }
}

impl Plugin for HeadingAnchor {
    fn name(&self) -> &'static str {
        "heading-anchor"
    }

    fn remap<'a>(&'a mut self, events: Events<'a>) -> Events<'a> {
        Box::new(AnchorIterator { inner: events, pending: None })
    }
}

#[cfg(test)]
mod tests {
    use crate::markdown::Markdown;

    use super::*;

    fn ids(html: &str) -> Vec<&str> {
        html.split(" id=\"").skip(1).filter_map(|s| s.split('"').next()).collect()
    }

    #[test]
    fn slugified_ids() {
        let html = Markdown::new().plugin(AutoHeading::default())
            .render("# Hello, World!\n\n## `code` *here*")
            .unwrap();

        assert_eq!(ids(&html), ["hello-world", "code-here"]);
    }

    #[test]
    fn collisions_never_reuse_ids() {
        let source = "# A\n\n# A\n\n# A 1\n\n# A\n";
        let html = Markdown::new().plugin(AutoHeading::default()).render(source).unwrap();
        assert_eq!(ids(&html), ["a", "a-1", "a-1-1", "a-2"]);
    }

    #[test]
    fn explicit_ids_are_reserved() {
        let source = "# Intro\n\n# Other {#intro-1}\n\n# Intro\n";
        let html = Markdown::new().plugin(AutoHeading::default()).render(source).unwrap();
        assert_eq!(ids(&html), ["intro", "intro-1", "intro-2"]);
    }

    #[test]
    fn empty_heading_text() {
        let html = Markdown::new().plugin(AutoHeading::default()).render("# !!!\n").unwrap();
        assert_eq!(ids(&html), ["section"]);
    }

    #[test]
    fn state_resets_between_renders() {
        let mut markdown = Markdown::new().plugin(AutoHeading::default());
        assert_eq!(ids(&markdown.render("# A").unwrap()), ["a"]);
        assert_eq!(ids(&markdown.render("# A").unwrap()), ["a"]);
    }

    #[test]
    fn anchors() {
        let html = Markdown::new()
            .plugin(AutoHeading::default())
            .plugin(HeadingAnchor)
            .render("## Setup\n")
            .unwrap();

        assert_eq!(html, concat!(
            r##"<h2 id="setup"><a class="anchor" title="anchor" href="#setup">#</a> "##,
            "Setup</h2>\n"
        ));
    }

    #[test]
    fn no_anchor_on_the_page_title() {
        let html = Markdown::new()
            .plugin(AutoHeading::default())
            .plugin(HeadingAnchor)
            .render("# Title

### Deep {#deep}
")
            .unwrap();

        assert!(html.starts_with("<h1 id=\"title\">Title</h1>\n"));
        assert!(html.contains(r##"<h3 id="deep"><a class="anchor" title="anchor" href="#deep">#</a> Deep</h3>"##));
        assert_eq!(html.matches("class=\"anchor\"").count(), 1);
    }
}
