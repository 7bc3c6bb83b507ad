//! # Type Graph Walker
//!
//! Cycle-safe pre/post-order traversal of the type edges reachable from a
//! node.
//!
//! The set of nodes currently on the recursion stack ("grey" nodes) is
//! threaded down the recursion. Reaching a grey node again means we followed a
//! reference cycle, typically `struct S { struct S *next; }`, and the node is
//! treated as already handled: neither callback runs for it. The walker never
//! deduplicates on its own; callers that want each shape visited once prune
//! through their `pre` callback.

use std::collections::HashSet;

use crate::graph::{DieGraph, DieId, Tag};

/// Callbacks receive the node (`None` for void) and the node whose edge led
/// there (`None` for the root of the walk).
///
/// `pre` runs on entry and returns whether to descend; `post` always runs on
/// exit, even when `pre` pruned.
pub fn walk_type<Pre, Post>(graph: &DieGraph, root: Option<DieId>, reason: Option<DieId>, pre: &mut Pre, post: &mut Post)
where
    Pre: FnMut(Option<DieId>, Option<DieId>) -> bool,
    Post: FnMut(Option<DieId>, Option<DieId>),
{
    let mut visiting = HashSet::new();
    walk_type_from(graph, root, reason, pre, post, &mut visiting);
}

/// [`walk_type`] with a caller-owned grey set.
///
/// The set holds exactly the ancestors of the current position: it is the
/// same on return as on entry.
pub fn walk_type_from<Pre, Post>(
    graph: &DieGraph,
    t: Option<DieId>,
    reason: Option<DieId>,
    pre: &mut Pre,
    post: &mut Post,
    visiting: &mut HashSet<DieId>,
) where
    Pre: FnMut(Option<DieId>, Option<DieId>) -> bool,
    Post: FnMut(Option<DieId>, Option<DieId>),
{
    if let Some(id) = t {
        if visiting.contains(&id) {
            return;
        }
    }

    if pre(t, reason) {
        if let Some(id) = t {
            visiting.insert(id);
            for (next, why) in type_edges(graph, id) {
                walk_type_from(graph, next, Some(why), pre, post, visiting);
            }
            visiting.remove(&id);
        }
    }

    post(t, reason);
}

/// The outgoing type edges of a node, each with the node holding the edge.
///
/// Members and parameters are the "reason" for their type, so callbacks can
/// tell a by-value member from a pointee.
fn type_edges(graph: &DieGraph, id: DieId) -> Vec<(Option<DieId>, DieId)>
{
    let die = &graph[id];
    match die.tag {
        Tag::ConstType
        | Tag::VolatileType
        | Tag::RestrictType
        | Tag::Typedef
        | Tag::PointerType
        | Tag::ReferenceType
        | Tag::ArrayType
        | Tag::Variable
        | Tag::Member
        | Tag::FormalParameter => vec![(die.type_ref, id)],
        Tag::StructureType | Tag::UnionType | Tag::ClassType => graph
            .children(id)
            .iter()
            .filter(|child| matches!(graph.tag(**child), Tag::Member | Tag::Inheritance))
            .map(|child| (graph.find_type(*child), *child))
            .collect(),
        Tag::SubrangeType | Tag::EnumerationType => {
            let base = die.type_ref.or_else(|| graph.implicit_enum_base(id));
            vec![(base, id)]
        }
        Tag::SubroutineType | Tag::Subprogram => std::iter::once((die.type_ref, id))
            .chain(graph.formal_parameters(id).map(|param| (graph.find_type(param), param)))
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::graph::{BaseEncoding, GraphBuilder, Language};

    #[test]
    fn test_self_referential_struct_terminates()
    {
        let mut b = GraphBuilder::new();
        let unit = b.unit("a.c", Language::C99, 8);
        let node = b.aggregate(unit, Tag::StructureType, Some("node"), Some(8));
        let ptr = b.pointer(unit, Some(node));
        b.member(node, Some("next"), Some(ptr), Some(0));
        let graph = b.finish();

        let mut entered = Vec::new();
        let mut exited = 0;
        walk_type(
            &graph,
            Some(node),
            None,
            &mut |t, _| {
                entered.push(t);
                true
            },
            &mut |_, _| exited += 1,
        );

        assert_eq!(entered, vec![Some(node), Some(ptr)]);
        assert_eq!(exited, 2);
    }

    #[test]
    fn test_void_is_visited_and_pruning_still_posts()
    {
        let mut b = GraphBuilder::new();
        let unit = b.unit("a.c", Language::C99, 8);
        let void_ptr = b.pointer(unit, None);
        let int = b.base_type(unit, "int", BaseEncoding::Signed, 4);
        let func = b.subprogram(unit, "f", Some(int));
        b.parameter(func, Some("p"), Some(void_ptr));
        let graph = b.finish();

        let mut entered = Vec::new();
        let mut posted = Vec::new();
        walk_type(
            &graph,
            Some(func),
            None,
            &mut |t, _| {
                entered.push(t);
                t != Some(int)
            },
            &mut |t, _| posted.push(t),
        );

        assert_eq!(entered, vec![Some(func), Some(int), Some(void_ptr), None]);
        assert_eq!(posted, vec![Some(int), None, Some(void_ptr), Some(func)]);
    }

    #[test]
    fn test_enum_without_base_uses_implicit_base()
    {
        let mut b = GraphBuilder::new();
        let unit = b.unit("a.c", Language::C99, 8);
        let uint = b.base_type(unit, "unsigned int", BaseEncoding::Unsigned, 4);
        let color = b.enumeration(unit, Some("color"), 4, None);
        let graph = b.finish();

        let mut seen = Vec::new();
        walk_type(
            &graph,
            Some(color),
            None,
            &mut |t, _| {
                seen.push(t);
                true
            },
            &mut |_, _| {},
        );
        assert_eq!(seen, vec![Some(color), Some(uint)]);
    }
}
