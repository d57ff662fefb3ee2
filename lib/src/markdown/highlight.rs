use once_cell::sync::Lazy;
use pulldown_cmark::{CodeBlockKind, Event, Tag, TagEnd};
use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

use crate::markdown::{Events, Plugin};
use crate::util::escape_html;

static SYNTAX_SET: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);

/// Highlights fenced code blocks whose language syntect knows, as spans
/// classed by scope: `<span class="source rust">`. Other code blocks pass
/// through untouched.
#[derive(Debug, Default, Clone)]
pub struct SyntaxHighlight;

struct Highlighter<I> {
    inner: I,
}

impl SyntaxHighlight {
    /// Loads the syntax definitions in the background.
    pub fn warm_up() {
        rayon::spawn(|| { Lazy::force(&SYNTAX_SET); });
    }
}

/// The language token of a fence label: `rust` in `rust,ignore`.
fn language(label: &str) -> &str {
    label.split([',', ' ', '{']).next().unwrap_or_default().trim()
}

fn highlight(syntax: &SyntaxReference, code: &str) -> Result<String, syntect::Error> {
    let mut generator = ClassedHTMLGenerator::new_with_class_style(syntax, &SYNTAX_SET, ClassStyle::Spaced);
    for line in LinesWithEndings::from(code) {
        generator.parse_html_for_line_which_includes_newline(line)?;
    }

    Ok(generator.finalize())
}

impl<'a, I: Iterator<Item = Event<'a>>> Iterator for Highlighter<I> {
    type Item = Event<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let event = self.inner.next()?;
        let Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(ref label))) = event else {
            return Some(event);
        };

        let lang = language(label);
        let Some(syntax) = Some(lang).filter(|l| !l.is_empty()).and_then(|l| SYNTAX_SET.find_syntax_by_token(l)) else {
            return Some(event);
        };

        let mut code = String::new();
        for event in self.inner.by_ref() {
            match event {
                Event::End(TagEnd::CodeBlock) => break,
                Event::Text(text) => code.push_str(&text),
                _ => {}
            }
        }

        let class = escape_html(lang);
        let html = highlight(syntax, &code).unwrap_or_else(|e| {
            tracing::warn!(lang, error = %e, "failed to highlight code block");
            escape_html(&code)
        });

        let html = format!("<pre class=\"language-{class}\"><code class=\"language-{class}\">{html}</code></pre>\n");
        Some(Event::Html(html.into()))
    }
}

impl Plugin for SyntaxHighlight {
    fn name(&self) -> &'static str {
        "highlight"
    }

    fn remap<'a>(&'a mut self, events: Events<'a>) -> Events<'a> {
        Box::new(Highlighter { inner: events })
    }
}
