//! Site build components and task orchestration for sitesync.
//!
//! This crate ties the docs, examples, changelog, and download page
//! components together with the dependency updater into the task graph run
//! by the CLI (see [`pipeline::build_site`]).

pub mod changelog;
pub mod docs;
pub mod download;
pub mod examples;
mod fsutil;
pub mod graph;
pub mod pipeline;
pub mod updater;
