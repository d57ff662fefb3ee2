//! The content pipeline of a static site generator.
//!
//! # Overview
//!
//! Folio turns an immutable set of content items into everything a site
//! needs to render:
//!
//!   * **Collections**: named, ordered views over the items, such as the
//!     chronological `posts` or the `recent` window. See
//!     [`CollectionBuilder`].
//!
//!   * **A slug index** resolving cross-references in constant time. See
//!     [`SlugIndex`].
//!
//!   * **Rendered pages**, composed from templates, reusable
//!     [components](components) and [markdown](markdown) with custom code
//!     block, table and heading rendering.
//!
//! ## Rendering
//!
//! A site is typically rendered via the following set of operations:
//!
//! 1. A loader reads [`ContentItem`]s from disk.
//! 2. [`Site::build()`] indexes the items and derives the collections. The
//!    environment flag is passed explicitly; nothing reads process state.
//! 3. A [`templating::MiniJinjaEngine`] is created with the [`filters`] and
//!    the component [`Registry`](components::Registry).
//! 4. A [`PageRenderer`] renders every published item in parallel: template
//!    expansion, then markdown, then the item's layout.
//! 5. The caller writes the [`RenderedPage`]s out.

#[macro_use]
pub mod error;
pub mod util;
pub mod taxonomy;
pub mod filters;
pub mod components;
pub mod markdown;
pub mod templating;

pub use taxonomy::*;

pub use rayon;
