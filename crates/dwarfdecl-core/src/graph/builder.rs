//! Programmatic construction of [`DieGraph`]s.
//!
//! The loader feeds records in through [`GraphBuilder::add_at`] with their
//! real section offsets. Tests and tools use the typed helpers, which hand out
//! increasing synthetic offsets so that every record still has a stable label.

use super::{BaseEncoding, Die, DieGraph, DieId, Language, LocationExpr, Tag};

const FIRST_SYNTHETIC_OFFSET: u64 = 0x0b;

/// Incrementally builds a [`DieGraph`].
///
/// ## Example
///
/// ```rust
/// use dwarfdecl_core::graph::{BaseEncoding, GraphBuilder, Language, Tag};
///
/// let mut builder = GraphBuilder::new();
/// let unit = builder.unit("list.c", Language::C99, 8);
/// let int = builder.base_type(unit, "int", BaseEncoding::Signed, 4);
/// let node = builder.aggregate(unit, Tag::StructureType, Some("node"), Some(16));
/// let next = builder.pointer(unit, Some(node));
/// builder.member(node, Some("value"), Some(int), Some(0));
/// builder.member(node, Some("next"), Some(next), Some(8));
///
/// let graph = builder.finish();
/// assert_eq!(graph.members(node).count(), 2);
/// ```
#[derive(Debug)]
pub struct GraphBuilder
{
    dies: Vec<Die>,
    next_offset: u64,
}

impl Default for GraphBuilder
{
    fn default() -> Self
    {
        Self::new()
    }
}

impl GraphBuilder
{
    #[must_use]
    pub fn new() -> Self
    {
        Self {
            dies: vec![Die::new(Tag::Root, 0)],
            next_offset: FIRST_SYNTHETIC_OFFSET,
        }
    }

    #[must_use]
    pub fn root(&self) -> DieId
    {
        DieId(0)
    }

    /// Append a record under `parent` at an explicit offset.
    pub fn add_at(&mut self, parent: DieId, tag: Tag, offset: u64) -> DieId
    {
        let id = DieId(self.dies.len() as u32);
        let mut die = Die::new(tag, offset);
        die.parent = Some(parent);
        self.dies.push(die);
        self.dies[parent.index()].children.push(id);
        self.next_offset = self.next_offset.max(offset + 1);
        id
    }

    /// Append a record under `parent` with the next synthetic offset.
    pub fn add(&mut self, parent: DieId, tag: Tag) -> DieId
    {
        let offset = self.next_offset;
        self.add_at(parent, tag, offset)
    }

    pub fn die_mut(&mut self, id: DieId) -> &mut Die
    {
        &mut self.dies[id.index()]
    }

    pub fn set_name(&mut self, id: DieId, name: Option<&str>)
    {
        self.die_mut(id).name = name.map(str::to_string);
    }

    pub fn set_type(&mut self, id: DieId, target: Option<DieId>)
    {
        self.die_mut(id).type_ref = target;
    }

    pub fn unit(&mut self, name: &str, language: Language, address_size: u8) -> DieId
    {
        let root = self.root();
        let id = self.add(root, Tag::CompileUnit);
        let die = self.die_mut(id);
        die.name = Some(name.to_string());
        die.language = Some(language);
        die.address_size = Some(address_size);
        id
    }

    pub fn base_type(&mut self, parent: DieId, name: &str, encoding: BaseEncoding, byte_size: u64) -> DieId
    {
        let id = self.add(parent, Tag::BaseType);
        let die = self.die_mut(id);
        die.name = Some(name.to_string());
        die.encoding = Some(encoding);
        die.byte_size = Some(byte_size);
        id
    }

    /// Unary type constructor (pointer, reference, qualifier) over `target`.
    pub fn wrap(&mut self, parent: DieId, tag: Tag, target: Option<DieId>) -> DieId
    {
        let id = self.add(parent, tag);
        self.set_type(id, target);
        id
    }

    pub fn pointer(&mut self, parent: DieId, target: Option<DieId>) -> DieId
    {
        self.wrap(parent, Tag::PointerType, target)
    }

    pub fn const_of(&mut self, parent: DieId, target: Option<DieId>) -> DieId
    {
        self.wrap(parent, Tag::ConstType, target)
    }

    pub fn volatile_of(&mut self, parent: DieId, target: Option<DieId>) -> DieId
    {
        self.wrap(parent, Tag::VolatileType, target)
    }

    pub fn typedef(&mut self, parent: DieId, name: &str, target: Option<DieId>) -> DieId
    {
        let id = self.wrap(parent, Tag::Typedef, target);
        self.set_name(id, Some(name));
        id
    }

    /// An array of `element` with one subrange child per dimension.
    pub fn array(&mut self, parent: DieId, element: Option<DieId>, dims: &[Option<u64>]) -> DieId
    {
        let id = self.wrap(parent, Tag::ArrayType, element);
        for dim in dims {
            let sub = self.add(id, Tag::SubrangeType);
            self.die_mut(sub).count = *dim;
        }
        id
    }

    /// A struct, union or class; `byte_size` of `None` makes it declaration-only.
    pub fn aggregate(&mut self, parent: DieId, tag: Tag, name: Option<&str>, byte_size: Option<u64>) -> DieId
    {
        let id = self.add(parent, tag);
        self.set_name(id, name);
        let die = self.die_mut(id);
        die.byte_size = byte_size;
        die.declaration = byte_size.is_none();
        id
    }

    pub fn member(&mut self, parent: DieId, name: Option<&str>, ty: Option<DieId>, offset: Option<u64>) -> DieId
    {
        let id = self.add(parent, Tag::Member);
        self.set_name(id, name);
        self.set_type(id, ty);
        self.die_mut(id).location = offset.map(LocationExpr::offset);
        id
    }

    pub fn enumeration(&mut self, parent: DieId, name: Option<&str>, byte_size: u64, base: Option<DieId>) -> DieId
    {
        let id = self.wrap(parent, Tag::EnumerationType, base);
        self.set_name(id, name);
        self.die_mut(id).byte_size = Some(byte_size);
        id
    }

    pub fn enumerator(&mut self, parent: DieId, name: &str, value: i64) -> DieId
    {
        let id = self.add(parent, Tag::Enumerator);
        self.set_name(id, Some(name));
        self.die_mut(id).const_value = Some(value);
        id
    }

    /// A function type; add parameters with [`GraphBuilder::parameter`].
    pub fn subroutine_type(&mut self, parent: DieId, return_type: Option<DieId>) -> DieId
    {
        let id = self.wrap(parent, Tag::SubroutineType, return_type);
        self.die_mut(id).prototyped = true;
        id
    }

    /// An externally visible, prototyped function.
    pub fn subprogram(&mut self, parent: DieId, name: &str, return_type: Option<DieId>) -> DieId
    {
        let id = self.wrap(parent, Tag::Subprogram, return_type);
        self.set_name(id, Some(name));
        let die = self.die_mut(id);
        die.external = true;
        die.prototyped = true;
        id
    }

    pub fn parameter(&mut self, parent: DieId, name: Option<&str>, ty: Option<DieId>) -> DieId
    {
        let id = self.wrap(parent, Tag::FormalParameter, ty);
        self.set_name(id, name);
        id
    }

    pub fn unspecified_parameters(&mut self, parent: DieId) -> DieId
    {
        self.add(parent, Tag::UnspecifiedParameters)
    }

    /// An externally visible variable.
    pub fn variable(&mut self, parent: DieId, name: &str, ty: Option<DieId>) -> DieId
    {
        let id = self.wrap(parent, Tag::Variable, ty);
        self.set_name(id, Some(name));
        self.die_mut(id).external = true;
        id
    }

    #[must_use]
    pub fn finish(self) -> DieGraph
    {
        DieGraph::from_parts(self.dies, DieId(0))
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_offsets_are_unique_and_increasing()
    {
        let mut builder = GraphBuilder::new();
        let unit = builder.unit("a.c", Language::C, 8);
        let int = builder.base_type(unit, "int", BaseEncoding::Signed, 4);
        let ptr = builder.pointer(unit, Some(int));
        let graph = builder.finish();

        assert!(graph.offset(unit) < graph.offset(int));
        assert!(graph.offset(int) < graph.offset(ptr));
        assert_eq!(graph.by_offset(graph.offset(ptr)), Some(ptr));
    }

    #[test]
    fn test_explicit_offsets_push_synthetic_counter()
    {
        let mut builder = GraphBuilder::new();
        let unit = builder.add_at(builder.root(), Tag::CompileUnit, 0x100);
        let next = builder.add(unit, Tag::BaseType);
        assert_eq!(builder.die_mut(next).offset, 0x101);
    }
}
