use std::borrow::Cow;

use pulldown_cmark::Event;

use crate::error::Result;

/// A boxed stream of markdown events.
pub type Events<'a> = Box<dyn Iterator<Item = Event<'a>> + 'a>;

/// A named markdown rendering rule.
///
/// Plugins run in registration order: every `preprocess` sees the source
/// text before parsing, every `remap` wraps the event stream produced by the
/// plugin before it, and every `finalize` runs after the HTML is written.
pub trait Plugin {
    /// The rule name. Registering a plugin under a name that's already in use
    /// replaces the earlier plugin.
    fn name(&self) -> &'static str;

    #[inline(always)]
    fn preprocess<'a>(&self, input: &'a str) -> Result<Cow<'a, str>> {
        Ok(Cow::Borrowed(input))
    }

    #[inline(always)]
    fn remap<'a>(&'a mut self, events: Events<'a>) -> Events<'a> {
        events
    }

    #[inline(always)]
    fn finalize(&mut self) -> Result<()> {
        Ok(())
    }
}
