mod site;
mod collection;
mod index;
mod item;
mod renderer;
pub mod export;

pub use site::*;
pub use collection::*;
pub use index::*;
pub use item::*;
pub use renderer::*;
pub use export::ExportRecord;
