//! Text rewriting and page templating for sitesync.
//!
//! Every component that edits text does so through [`rewrite`] with a
//! declarative list of [`Rule`]s, and every generated page comes from a named
//! template in a [`TemplateRenderer`].

mod rewrite;
mod template;

pub use rewrite::{Rule, prepend_header, rewrite};
pub use template::{EXAMPLE_TEMPLATE, INDEX_TEMPLATE, Template, TemplateRenderer};
