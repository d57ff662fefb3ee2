use std::borrow::Cow;

use pulldown_cmark::{html, Options, Parser};

use crate::error::{Chainable, Result};
use crate::markdown::*;

/// A markdown renderer assembled from [`Plugin`] rules.
pub struct Markdown<'p> {
    options: Options,
    plugins: Vec<Box<dyn Plugin + 'p>>,
}

impl Default for Markdown<'_> {
    fn default() -> Self {
        Markdown::new()
    }
}

impl<'p> Markdown<'p> {
    pub const OPTIONS: Options = Options::ENABLE_TABLES
        .union(Options::ENABLE_FOOTNOTES)
        .union(Options::ENABLE_STRIKETHROUGH)
        .union(Options::ENABLE_TASKLISTS)
        .union(Options::ENABLE_HEADING_ATTRIBUTES);

    /// A renderer with no rules: plain pulldown-cmark output.
    pub fn new() -> Self {
        Markdown { options: Self::OPTIONS, plugins: vec![] }
    }

    /// A renderer with the default rule set: attribute annotations, heading
    /// ids, heading anchors, code block wrappers with syntax highlighting,
    /// and table wrappers.
    pub fn with_default_rules() -> Self {
        Markdown::new()
            .plugin(AttributeFilter::default())
            .plugin(AutoHeading::default())
            .plugin(HeadingAnchor::default())
            .plugin(CodeCopy::default())
            .plugin(SyntaxHighlight::default())
            .plugin(TableWrap::default())
    }

    /// Adds `plugin` at the end of the rule list, or in place of an existing
    /// rule with the same name.
    pub fn plugin<T: Plugin + 'p>(mut self, plugin: T) -> Self {
        let name = plugin.name();
        match self.plugins.iter_mut().find(|p| p.name() == name) {
            Some(existing) => *existing = Box::new(plugin),
            None => self.plugins.push(Box::new(plugin)),
        }

        self
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// The names of the registered rules, in application order.
    pub fn rules(&self) -> Vec<&'static str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    pub fn render(&mut self, input: &str) -> Result<String> {
        let mut text = Cow::Borrowed(input);
        for plugin in &self.plugins {
            let processed = match plugin.preprocess(&text)? {
                Cow::Borrowed(s) if s.len() == text.len() => None,
                processed => Some(processed.into_owned()),
            };

            if let Some(processed) = processed {
                text = Cow::Owned(processed);
            }
        }

        let mut output = String::with_capacity(text.len() * 3 / 2);
        {
            let mut events: Events<'_> = Box::new(Parser::new_ext(&text, self.options));
            for plugin in self.plugins.iter_mut() {
                events = plugin.remap(events);
            }

            html::push_html(&mut output, events);
        }

        for plugin in self.plugins.iter_mut() {
            let name = plugin.name();
            plugin.finalize().chain_with(|| error!("markdown rule failed", "rule" => name))?;
        }

        Ok(output)
    }
}

/// Renders `input` with [`Markdown::with_default_rules()`].
pub fn render(input: &str) -> Result<String> {
    Markdown::with_default_rules().render(input)
}
