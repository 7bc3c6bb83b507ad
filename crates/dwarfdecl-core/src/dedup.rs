//! # Structural Deduplication
//!
//! The same C type routinely appears once per compile unit that includes its
//! header. For emission these copies must collapse into one canonical
//! representative, otherwise the output would define `struct stat` forty
//! times.
//!
//! Each node is reduced to a *shape*: a flat token stream capturing tag,
//! name, size, members (name, offset, bit position, type) and the pointee,
//! element and return types recursively. Two nodes with equal shapes are
//! the same type. The hash of the shape is the node's *summary code*, used
//! where only a quick compatibility check is needed.
//!
//! Named aggregates and enumerations are *nominal* at reference sites: a
//! pointer to `struct list` contributes `struct list` to its shape, not the
//! list's members. This is what keeps shapes finite in the presence of
//! self-referential structs, and it matches how C itself identifies tagged
//! types. Anonymous types are expanded in full; a reference back into a type
//! already being expanded becomes a back-reference token. Tagged types also
//! record whether they sit inside an aggregate, since that decides whether
//! they get a name of their own or are written out at their use.

use std::collections::hash_map::{DefaultHasher, Entry};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use indexmap::IndexSet;

use crate::graph::{BaseEncoding, DieGraph, DieId, Tag};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Atom
{
    Open(Tag),
    Close,
    Name(String),
    Anonymous,
    Num(u64),
    Int(i64),
    Unknown,
    Flag(bool),
    Nested(bool),
    Encoding(Option<BaseEncoding>),
    Void,
    /// Reference to the n-th enclosing node under expansion
    Back(usize),
}

type Shape = Vec<Atom>;

fn push_name(out: &mut Shape, name: Option<&str>)
{
    out.push(name.map_or(Atom::Anonymous, |name| Atom::Name(name.to_string())));
}

fn push_opt(out: &mut Shape, value: Option<u64>)
{
    out.push(value.map_or(Atom::Unknown, Atom::Num));
}

fn shape_of(graph: &DieGraph, id: DieId) -> Shape
{
    let mut out = Vec::new();
    let mut expanding = Vec::new();
    push_shape(graph, Some(id), true, &mut out, &mut expanding);
    out
}

fn push_shape(graph: &DieGraph, t: Option<DieId>, at_root: bool, out: &mut Shape, expanding: &mut Vec<DieId>)
{
    let Some(id) = t else {
        out.push(Atom::Void);
        return;
    };
    if let Some(depth) = expanding.iter().rev().position(|seen| *seen == id) {
        out.push(Atom::Back(depth));
        return;
    }

    let die = &graph[id];
    out.push(Atom::Open(die.tag));
    if die.tag.is_tagged() {
        // Naming differs by position: anonymous nested types are inlined,
        // named ones may be renamed to dodge a unit-level clash.
        out.push(Atom::Nested(graph.is_nested_in_aggregate(id)));
    }

    if die.tag.is_tagged() && die.name.is_some() && !at_root {
        push_name(out, die.name.as_deref());
        out.push(Atom::Close);
        return;
    }

    expanding.push(id);
    match die.tag {
        Tag::BaseType | Tag::UnspecifiedType => {
            push_name(out, die.name.as_deref());
            push_opt(out, die.byte_size);
            out.push(Atom::Encoding(die.encoding));
        }
        Tag::StructureType | Tag::UnionType | Tag::ClassType => {
            push_name(out, die.name.as_deref());
            push_opt(out, die.byte_size);
            out.push(Atom::Flag(die.declaration));
            for child in graph.children(id) {
                let member = &graph[*child];
                if !matches!(member.tag, Tag::Member | Tag::Inheritance) {
                    continue;
                }
                out.push(Atom::Open(member.tag));
                push_name(out, member.name.as_deref());
                push_opt(out, member.location.as_ref().and_then(|loc| loc.evaluate()));
                push_opt(out, member.bit_size);
                push_opt(out, member.data_bit_offset);
                out.push(Atom::Flag(graph.is_static_member(*child)));
                push_shape(graph, member.type_ref, false, out, expanding);
                out.push(Atom::Close);
            }
        }
        Tag::EnumerationType => {
            push_name(out, die.name.as_deref());
            push_opt(out, die.byte_size);
            for enumerator in graph.children_tagged(id, Tag::Enumerator) {
                push_name(out, graph.name(enumerator));
                out.push(graph[enumerator].const_value.map_or(Atom::Unknown, Atom::Int));
            }
            push_shape(graph, die.type_ref, false, out, expanding);
        }
        Tag::ArrayType => {
            for dim in graph.array_dimensions(id) {
                push_opt(out, dim);
            }
            push_shape(graph, die.type_ref, false, out, expanding);
        }
        Tag::SubrangeType => {
            out.push(die.lower_bound.map_or(Atom::Unknown, Atom::Int));
            out.push(die.upper_bound.map_or(Atom::Unknown, Atom::Int));
            push_opt(out, die.count);
            push_shape(graph, die.type_ref, false, out, expanding);
        }
        Tag::PointerType | Tag::ReferenceType => {
            push_opt(out, die.byte_size);
            push_shape(graph, die.type_ref, false, out, expanding);
        }
        Tag::ConstType | Tag::VolatileType | Tag::RestrictType => {
            push_shape(graph, die.type_ref, false, out, expanding);
        }
        Tag::Typedef | Tag::Variable => {
            push_name(out, die.name.as_deref());
            push_shape(graph, die.type_ref, false, out, expanding);
        }
        Tag::SubroutineType | Tag::Subprogram => {
            if die.tag == Tag::Subprogram {
                push_name(out, die.name.as_deref());
                out.push(Atom::Num(u64::from(die.calling_convention.unwrap_or(0))));
            }
            out.push(Atom::Flag(die.prototyped));
            push_shape(graph, die.type_ref, false, out, expanding);
            for param in graph.formal_parameters(id) {
                push_shape(graph, graph.find_type(param), false, out, expanding);
            }
            out.push(Atom::Flag(graph.has_unspecified_parameters(id)));
        }
        _ => {
            // Not a type: identity is the only sensible equality.
            out.push(Atom::Num(die.offset));
        }
    }
    expanding.pop();
    out.push(Atom::Close);
}

/// The structural fingerprint of a node.
///
/// Equal shapes give equal codes. Unequal shapes almost always give unequal
/// codes; use [`same_shape`] when an exact answer matters.
#[must_use]
pub fn summary_code(graph: &DieGraph, id: DieId) -> u64
{
    let mut hasher = DefaultHasher::new();
    shape_of(graph, id).hash(&mut hasher);
    hasher.finish()
}

/// Exact structural equality.
#[must_use]
pub fn same_shape(graph: &DieGraph, a: DieId, b: DieId) -> bool
{
    a == b || shape_of(graph, a) == shape_of(graph, b)
}

/// Set of type nodes with structural membership.
///
/// Inserting a node whose shape is already present returns the existing
/// canonical representative instead of adding the node. Iteration yields the
/// representatives in first-insertion order.
#[derive(Debug, Default, Clone)]
pub struct TypeSet
{
    by_shape: HashMap<Shape, DieId>,
    canonical: HashMap<DieId, DieId>,
    members: IndexSet<DieId>,
}

impl TypeSet
{
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Insert `id`, returning its canonical representative and whether the
    /// shape was new.
    pub fn insert(&mut self, graph: &DieGraph, id: DieId) -> (DieId, bool)
    {
        if let Some(canonical) = self.canonical.get(&id) {
            return (*canonical, false);
        }
        let (canonical, inserted) = match self.by_shape.entry(shape_of(graph, id)) {
            Entry::Occupied(entry) => (*entry.get(), false),
            Entry::Vacant(entry) => {
                entry.insert(id);
                self.members.insert(id);
                (id, true)
            }
        };
        self.canonical.insert(id, canonical);
        (canonical, inserted)
    }

    /// Canonical representative of `id`, inserting it if its shape is new.
    pub fn canonical(&mut self, graph: &DieGraph, id: DieId) -> DieId
    {
        self.insert(graph, id).0
    }

    /// Canonical representative of an already-seen node.
    #[must_use]
    pub fn find(&self, id: DieId) -> Option<DieId>
    {
        self.canonical.get(&id).copied()
    }

    /// Whether `id` (or a node of the same shape) has been inserted.
    #[must_use]
    pub fn contains(&self, graph: &DieGraph, id: DieId) -> bool
    {
        self.canonical.contains_key(&id) || self.by_shape.contains_key(&shape_of(graph, id))
    }

    pub fn iter(&self) -> impl Iterator<Item = DieId> + '_
    {
        self.members.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize
    {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.members.is_empty()
    }
}
