//! # dwarfdecl-core
//!
//! Dependency-ordered C declarations from a program's DWARF debug information.
//!
//! Given the type graph of a compiled program and a predicate selecting the
//! interesting entries (usually exported functions by name), this crate emits
//! a set of declarations that compiles on its own and reproduces the binary
//! shape of those entries: names, pointer/array/qualifier structure and
//! aggregate member offsets.
//!
//! ## Pipeline
//!
//! 1. **Load** the DWARF into an arena ([`loader`], [`graph`])
//! 2. **Gather** the roots and the deduplicated closure of their types
//!    ([`interface`], built on [`walk`] and [`dedup`])
//! 3. **Close**: generate each needed declaration or definition, discovering
//!    further needs through the names the generator asks for ([`schedule`],
//!    [`declgen`], [`naming`])
//! 4. **Emit** the fragments in an order that respects every dependency
//!
//! ## Example
//!
//! ```rust
//! use dwarfdecl_core::config::GeneratorConfig;
//! use dwarfdecl_core::graph::{BaseEncoding, GraphBuilder, Language, Tag};
//! use dwarfdecl_core::interface::InterfaceFilter;
//!
//! let mut b = GraphBuilder::new();
//! let unit = b.unit("list.c", Language::C99, 8);
//! let node = b.aggregate(unit, Tag::StructureType, Some("node"), Some(8));
//! let next = b.pointer(unit, Some(node));
//! b.member(node, Some("next"), Some(next), Some(0));
//! let push = b.subprogram(unit, "push", None);
//! b.parameter(push, Some("head"), Some(next));
//! let graph = b.finish();
//!
//! let config = GeneratorConfig::default().with_group_comments(false).with_offset_comments(false);
//! let header = dwarfdecl_core::generate(&graph, &config, &InterfaceFilter::default()).unwrap();
//! assert!(header.render().contains("void push(struct node *head);"));
//! ```
//!
//! Everything runs on one thread over a read-only graph.

pub mod config;
pub mod declgen;
pub mod dedup;
pub mod error;
pub mod graph;
pub mod interface;
pub mod loader;
pub mod naming;
pub mod schedule;
pub mod walk;

pub use config::{Dialect, GeneratorConfig};
pub use error::{DeclError, Result};
pub use graph::{DieGraph, DieId, Tag};
pub use interface::{gather_interface, Interface, InterfaceFilter};
pub use schedule::{Emission, EmitKind, Scheduler, StuckReport, WorkItem};

/// Gather the interface selected by `filter`, then close and emit it.
///
/// ## Errors
///
/// [`DeclError::Stuck`] on an unbreakable dependency cycle,
/// [`DeclError::Unnameable`] on malformed input.
pub fn generate(graph: &DieGraph, config: &GeneratorConfig, filter: &InterfaceFilter) -> Result<Emission>
{
    let interface = gather_interface(graph, |g, id| filter.matches(g, id));
    Scheduler::from_interface(graph, config, interface).run()
}
