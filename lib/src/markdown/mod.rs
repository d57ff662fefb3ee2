//! Markdown rendering as an ordered list of named rules over pulldown-cmark.

mod plugin;
mod markdown;
mod auto_heading;
mod attributes;
mod wrap;
mod highlight;
mod templatize;
pub mod frontmatter;

pub use plugin::*;
pub use markdown::*;
pub use auto_heading::*;
pub use attributes::*;
pub use wrap::*;
pub use highlight::*;
pub use templatize::*;
pub use frontmatter::FrontMatter;
