use std::borrow::Cow;

use crate::error::{Chainable, Result};
use crate::markdown::Plugin;
use crate::templating::{Engine, PageContext};

/// Renders a body containing template syntax through the template engine
/// before it's parsed, so components work inside markdown.
pub struct Templatize<'m> {
    name: Option<&'m str>,
    engine: &'m dyn Engine,
    context: &'m PageContext<'m>,
}

impl<'m> Templatize<'m> {
    pub fn with(name: Option<&'m str>, engine: &'m dyn Engine, context: &'m PageContext<'m>) -> Self {
        Self { name, engine, context }
    }
}

impl Plugin for Templatize<'_> {
    fn name(&self) -> &'static str {
        "templatize"
    }

    fn preprocess<'a>(&self, input: &'a str) -> Result<Cow<'a, str>> {
        if !crate::util::is_template(input) {
            return Ok(Cow::Borrowed(input));
        }

        self.engine.render_str(self.name, input, self.context)
            .chain_with(|| error!("markdown templatization failed",
                "page" => self.context.item.path))
            .map(Cow::Owned)
    }
}
