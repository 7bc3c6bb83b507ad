//! # Interface Gathering
//!
//! Selects the "interesting" unit-level entries of a graph and computes the
//! deduplicated closure of the types they mention.

use std::collections::HashSet;

use indexmap::IndexSet;
use tracing::{debug, trace};

use crate::dedup::TypeSet;
use crate::graph::{DieGraph, DieId, Tag, Visibility};
use crate::walk::walk_type_from;

/// The selected roots plus every type reachable from them, deduplicated.
#[derive(Debug, Default)]
pub struct Interface
{
    pub roots: IndexSet<DieId>,
    pub types: TypeSet,
}

/// Default root predicate: external, named functions (and optionally
/// variables) from a set of names.
#[derive(Debug, Clone, Default)]
pub struct InterfaceFilter
{
    /// Names to keep; empty keeps everything
    pub names: HashSet<String>,
    pub include_variables: bool,
}

impl InterfaceFilter
{
    #[must_use]
    pub fn new(names: impl IntoIterator<Item = String>) -> Self
    {
        Self {
            names: names.into_iter().collect(),
            include_variables: false,
        }
    }

    #[must_use]
    pub fn with_variables(mut self, include: bool) -> Self
    {
        self.include_variables = include;
        self
    }

    #[must_use]
    pub fn matches(&self, graph: &DieGraph, id: DieId) -> bool
    {
        let die = &graph[id];
        let kind_ok = match die.tag {
            Tag::Subprogram => true,
            Tag::Variable => self.include_variables,
            _ => false,
        };
        if !kind_ok {
            return false;
        }
        let visible = die.external && die.visibility.is_none_or(|vis| vis == Visibility::Exported);
        let Some(name) = die.name.as_deref() else {
            return false;
        };
        visible
            && !name.starts_with("__builtin_")
            && (self.names.is_empty() || self.names.contains(name))
    }
}

/// Gather the interface selected by `pred`.
///
/// Every unit-level entry accepted by `pred` becomes a root. Variables
/// contribute their type, subprograms their whole signature and type entries
/// themselves. Each subprogram root and each non-void type reached is
/// inserted into the [`TypeSet`];
/// descent stops at a shape already present, and static data members are not
/// followed.
pub fn gather_interface<P>(graph: &DieGraph, mut pred: P) -> Interface
where
    P: FnMut(&DieGraph, DieId) -> bool,
{
    let mut interface = Interface::default();

    for id in graph.toplevel() {
        if !pred(graph, id) {
            continue;
        }
        trace!("Interface root: {}", graph.summary(id));
        interface.roots.insert(id);

        let start = match graph.tag(id) {
            Tag::Variable => graph.find_type(id),
            _ => Some(id),
        };
        if graph.tag(id) == Tag::Variable && start.is_none() {
            continue;
        }

        let types = &mut interface.types;
        let mut visiting = HashSet::new();
        walk_type_from(
            graph,
            start,
            Some(id),
            &mut |t, reason| {
                let Some(t) = t else {
                    return false;
                };
                if reason.is_some_and(|r| graph.is_static_member(r)) {
                    return false;
                }
                // Subprogram roots are recorded too, so one prototype seen in
                // several units collapses to a single declaration.
                types.insert(graph, t).1
            },
            &mut |_, _| {},
            &mut visiting,
        );
    }

    debug!(
        "Gathered interface: {} root(s), {} distinct type(s)",
        interface.roots.len(),
        interface.types.len()
    );
    interface
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::graph::{BaseEncoding, GraphBuilder, Language};

    #[test]
    fn test_filter_selects_named_exported_functions()
    {
        let mut b = GraphBuilder::new();
        let unit = b.unit("a.c", Language::C99, 8);
        let keep = b.subprogram(unit, "open_file", None);
        let builtin = b.subprogram(unit, "__builtin_trap", None);
        let hidden = b.subprogram(unit, "helper", None);
        b.die_mut(hidden).visibility = Some(Visibility::Local);
        let var = b.variable(unit, "errno_value", None);
        let graph = b.finish();

        let everything = InterfaceFilter::default();
        assert!(everything.matches(&graph, keep));
        assert!(!everything.matches(&graph, builtin));
        assert!(!everything.matches(&graph, hidden));
        assert!(!everything.matches(&graph, var));
        assert!(everything.clone().with_variables(true).matches(&graph, var));

        let named = InterfaceFilter::new(["close_file".to_string()]);
        assert!(!named.matches(&graph, keep));
    }

    #[test]
    fn test_gather_dedups_across_units()
    {
        let mut b = GraphBuilder::new();
        for (unit_name, func) in [("a.c", "f"), ("b.c", "g")] {
            let unit = b.unit(unit_name, Language::C99, 8);
            let int = b.base_type(unit, "int", BaseEncoding::Signed, 4);
            let point = b.aggregate(unit, Tag::StructureType, Some("point"), Some(4));
            b.member(point, Some("x"), Some(int), Some(0));
            let ptr = b.pointer(unit, Some(point));
            let sub = b.subprogram(unit, func, Some(int));
            b.parameter(sub, Some("p"), Some(ptr));
        }
        let graph = b.finish();

        let interface = gather_interface(&graph, |g, id| InterfaceFilter::default().matches(g, id));
        assert_eq!(interface.roots.len(), 2);
        // f, g, int, struct point, struct point *
        assert_eq!(interface.types.len(), 5);
    }

    #[test]
    fn test_same_prototype_in_two_units_is_one_root_type()
    {
        let mut b = GraphBuilder::new();
        let mut seen = Vec::new();
        for unit_name in ["a.c", "b.c"] {
            let unit = b.unit(unit_name, Language::C99, 8);
            let int = b.base_type(unit, "int", BaseEncoding::Signed, 4);
            let sub = b.subprogram(unit, "tick", Some(int));
            b.parameter(sub, Some("n"), Some(int));
            seen.push((sub, int));
        }
        let graph = b.finish();

        let interface = gather_interface(&graph, |g, id| InterfaceFilter::default().matches(g, id));
        assert_eq!(interface.roots.len(), 2);
        let types: Vec<_> = interface.types.iter().collect();
        assert_eq!(types, vec![seen[0].0, seen[0].1]);
    }

    #[test]
    fn test_static_members_not_followed()
    {
        let mut b = GraphBuilder::new();
        let unit = b.unit("a.cc", Language::Cxx, 8);
        let int = b.base_type(unit, "int", BaseEncoding::Signed, 4);
        let long = b.base_type(unit, "long", BaseEncoding::Signed, 8);
        let holder = b.aggregate(unit, Tag::ClassType, Some("holder"), Some(4));
        b.member(holder, Some("value"), Some(int), Some(0));
        let counter = b.member(holder, Some("count"), Some(long), None);
        b.die_mut(counter).declaration = true;
        b.die_mut(counter).external = true;
        let func = b.subprogram(unit, "make", Some(holder));
        let graph = b.finish();

        let interface = gather_interface(&graph, |_, id| id == func);
        let types: Vec<_> = interface.types.iter().collect();
        assert_eq!(types, vec![func, holder, int]);
    }
}
