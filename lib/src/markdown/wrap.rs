use pulldown_cmark::{Event, Tag, TagEnd};

use crate::markdown::{Events, Plugin};

/// Wraps every code block, fenced or indented, in `<copy-code>`.
#[derive(Debug, Default, Clone)]
pub struct CodeCopy;

/// Wraps every table in `<div class="table-wrapper">`.
#[derive(Debug, Default, Clone)]
pub struct TableWrap;

struct Wrap<'a, I> {
    inner: I,
    pending: Option<Event<'a>>,
    opens: fn(&Event<'_>) -> bool,
    closes: fn(&Event<'_>) -> bool,
    open: &'static str,
    close: &'static str,
}

impl<'a, I: Iterator<Item = Event<'a>>> Iterator for Wrap<'a, I> {
    type Item = Event<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(event) = self.pending.take() {
            return Some(event);
        }

        let event = self.inner.next()?;
        if (self.opens)(&event) {
            self.pending = Some(event);
            Some(Event::Html(self.open.into()))
        } else if (self.closes)(&event) {
            self.pending = Some(Event::Html(self.close.into()));
            Some(event)
        } else {
            Some(event)
        }
    }
}

impl Plugin for CodeCopy {
    fn name(&self) -> &'static str {
        "fence"
    }

    fn remap<'a>(&'a mut self, events: Events<'a>) -> Events<'a> {
        Box::new(Wrap {
            inner: events,
            pending: None,
            opens: |e| matches!(e, Event::Start(Tag::CodeBlock(_))),
            closes: |e| matches!(e, Event::End(TagEnd::CodeBlock)),
            open: "<copy-code>\n",
            close: "</copy-code>\n",
        })
    }
}

impl Plugin for TableWrap {
    fn name(&self) -> &'static str {
        "table"
    }

    fn remap<'a>(&'a mut self, events: Events<'a>) -> Events<'a> {
        Box::new(Wrap {
            inner: events,
            pending: None,
            opens: |e| matches!(e, Event::Start(Tag::Table(_))),
            closes: |e| matches!(e, Event::End(TagEnd::Table)),
            open: "<div class=\"table-wrapper\">\n",
            close: "</div>\n",
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::markdown::Markdown;

    use super::*;

    #[test]
    fn code_block() {
        let html = Markdown::new().plugin(CodeCopy).render("```sh\nls\n```").unwrap();
        assert_eq!(html, "<copy-code>\n<pre><code class=\"language-sh\">ls\n</code></pre>\n</copy-code>\n");
    }

    #[test]
    fn inline_code_untouched() {
        let html = Markdown::new().plugin(CodeCopy).render("use `ls`").unwrap();
        assert_eq!(html, "<p>use <code>ls</code></p>\n");
    }

    #[test]
    fn tables() {
        let source = "| a |\n|---|\n| 1 |\n\ntext\n\n| b |\n|---|\n| 2 |\n";
        let html = Markdown::new().plugin(TableWrap).render(source).unwrap();
        assert_eq!(html.matches("<div class=\"table-wrapper\">\n<table>").count(), 2);
        assert_eq!(html.matches("</table>\n</div>\n").count(), 2);
        assert!(html.contains("<p>text</p>"));
    }

    #[test]
    fn code_inside_table_cell_is_inline() {
        let source = "| `x` |\n|---|\n| 1 |\n";
        let html = Markdown::new().plugin(CodeCopy).plugin(TableWrap).render(source).unwrap();
        assert!(!html.contains("<copy-code>"));
        assert_eq!(html.matches("table-wrapper").count(), 1);
    }
}
