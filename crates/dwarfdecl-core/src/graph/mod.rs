//! # Type Graph
//!
//! Read-only, arena-backed view of a program's DWARF records.
//!
//! Every record ("DIE") lives in a single `Vec` owned by [`DieGraph`] and is
//! addressed by a [`DieId`]. Ids are `Copy`, so the rest of the crate passes
//! them around freely: walker state, dedup buckets, work items and dependency
//! edges are all plain sets and maps of ids. The arena outlives every run
//! over it and is never mutated once built.
//!
//! The ownership structure is a tree (root → compile units → top-level
//! entries → children) but the *reference* structure, through type edges, is
//! an arbitrary graph: a struct member's pointer type routinely points back
//! at the struct itself. Every query that follows type edges here is bounded.
//!
//! The void type has no node. A missing type edge (`None`) means void, and
//! every query taking an `Option<DieId>` treats `None` as a first-class case.

pub mod builder;
pub mod location;

use std::collections::HashMap;
use std::fmt;

use smallvec::SmallVec;

pub use builder::GraphBuilder;
pub use location::{LocationExpr, LocationOp};

/// Maximum number of type edges followed when stripping qualifiers/typedefs.
///
/// Well-formed DWARF never needs more than a handful; the bound only exists
/// so that a malformed typedef cycle cannot hang the generator.
pub const MAX_TYPE_REF_DEPTH: usize = 32;

/// Index of a record in a [`DieGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DieId(pub(crate) u32);

impl DieId
{
    /// Raw arena index.
    #[must_use]
    pub fn index(self) -> usize
    {
        self.0 as usize
    }
}

/// Kind of a DWARF record.
///
/// This is the closed set the generator switches on. Tags the core has no
/// use for are kept as [`Tag::Other`] so that the tree shape is preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag
{
    /// Synthetic root owning all compile units
    Root,
    CompileUnit,
    BaseType,
    UnspecifiedType,
    PointerType,
    ReferenceType,
    ArrayType,
    SubrangeType,
    ConstType,
    VolatileType,
    RestrictType,
    StructureType,
    UnionType,
    ClassType,
    EnumerationType,
    Typedef,
    /// A function type (`DW_TAG_subroutine_type`)
    SubroutineType,
    /// A function (`DW_TAG_subprogram`); also describes a function type
    Subprogram,
    FormalParameter,
    UnspecifiedParameters,
    Member,
    Inheritance,
    Enumerator,
    Variable,
    Other(u16),
}

impl Tag
{
    /// Map a raw `DW_TAG_*` value.
    #[must_use]
    pub fn from_dwarf(tag: gimli::DwTag) -> Self
    {
        use gimli::constants as c;
        match tag {
            c::DW_TAG_compile_unit | c::DW_TAG_partial_unit => Tag::CompileUnit,
            c::DW_TAG_base_type => Tag::BaseType,
            c::DW_TAG_unspecified_type => Tag::UnspecifiedType,
            c::DW_TAG_pointer_type => Tag::PointerType,
            c::DW_TAG_reference_type | c::DW_TAG_rvalue_reference_type => Tag::ReferenceType,
            c::DW_TAG_array_type => Tag::ArrayType,
            c::DW_TAG_subrange_type => Tag::SubrangeType,
            c::DW_TAG_const_type => Tag::ConstType,
            c::DW_TAG_volatile_type => Tag::VolatileType,
            c::DW_TAG_restrict_type => Tag::RestrictType,
            c::DW_TAG_structure_type => Tag::StructureType,
            c::DW_TAG_union_type => Tag::UnionType,
            c::DW_TAG_class_type => Tag::ClassType,
            c::DW_TAG_enumeration_type => Tag::EnumerationType,
            c::DW_TAG_typedef => Tag::Typedef,
            c::DW_TAG_subroutine_type => Tag::SubroutineType,
            c::DW_TAG_subprogram => Tag::Subprogram,
            c::DW_TAG_formal_parameter => Tag::FormalParameter,
            c::DW_TAG_unspecified_parameters => Tag::UnspecifiedParameters,
            c::DW_TAG_member => Tag::Member,
            c::DW_TAG_inheritance => Tag::Inheritance,
            c::DW_TAG_enumerator => Tag::Enumerator,
            c::DW_TAG_variable => Tag::Variable,
            other => Tag::Other(other.0),
        }
    }

    /// Structs, unions and classes.
    #[must_use]
    pub fn has_data_members(self) -> bool
    {
        matches!(self, Tag::StructureType | Tag::UnionType | Tag::ClassType)
    }

    /// Types living in the C tag namespace (`struct`/`union`/`enum`).
    #[must_use]
    pub fn is_tagged(self) -> bool
    {
        self.has_data_members() || self == Tag::EnumerationType
    }

    #[must_use]
    pub fn is_qualifier(self) -> bool
    {
        matches!(self, Tag::ConstType | Tag::VolatileType | Tag::RestrictType)
    }

    #[must_use]
    pub fn is_address_holding(self) -> bool
    {
        matches!(self, Tag::PointerType | Tag::ReferenceType)
    }

    /// Function types and functions: both own parameters and a return edge.
    #[must_use]
    pub fn is_type_describing_subprogram(self) -> bool
    {
        matches!(self, Tag::SubroutineType | Tag::Subprogram)
    }

    /// Unary type constructors whose only interesting edge is `DW_AT_type`.
    #[must_use]
    pub fn is_type_chain(self) -> bool
    {
        self.is_qualifier() || self.is_address_holding() || matches!(self, Tag::Typedef | Tag::ArrayType)
    }

    /// Tags describing a type (as opposed to a program element or structure).
    #[must_use]
    pub fn is_type(self) -> bool
    {
        self.is_type_chain()
            || self.is_tagged()
            || self.is_type_describing_subprogram()
            || matches!(self, Tag::BaseType | Tag::UnspecifiedType | Tag::SubrangeType)
    }

    /// The C keyword introducing this tag's namespace, if it has one.
    ///
    /// Classes are emitted as structs: the output language has no access
    /// control and a `class` would make every member private in C++.
    #[must_use]
    pub fn tag_keyword(self) -> Option<&'static str>
    {
        match self {
            Tag::StructureType | Tag::ClassType => Some("struct"),
            Tag::UnionType => Some("union"),
            Tag::EnumerationType => Some("enum"),
            _ => None,
        }
    }
}

/// Source language of a compile unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language
{
    C89,
    C,
    C99,
    C11,
    C17,
    Cxx,
    Other(u16),
}

impl Language
{
    #[must_use]
    pub fn from_dwarf(lang: gimli::DwLang) -> Self
    {
        use gimli::constants as c;
        match lang {
            c::DW_LANG_C89 => Language::C89,
            c::DW_LANG_C => Language::C,
            c::DW_LANG_C99 => Language::C99,
            c::DW_LANG_C11 => Language::C11,
            // DW_LANG_C17, not yet named in every gimli release
            gimli::DwLang(0x2c) => Language::C17,
            c::DW_LANG_C_plus_plus
            | c::DW_LANG_C_plus_plus_03
            | c::DW_LANG_C_plus_plus_11
            | c::DW_LANG_C_plus_plus_14 => Language::Cxx,
            other => Language::Other(other.0),
        }
    }

    #[must_use]
    pub fn is_c_family(self) -> bool
    {
        matches!(self, Language::C89 | Language::C | Language::C99 | Language::C11 | Language::C17)
    }
}

/// Base type encoding (`DW_AT_encoding`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseEncoding
{
    Boolean,
    Float,
    ComplexFloat,
    Signed,
    SignedChar,
    Unsigned,
    UnsignedChar,
    Other(u8),
}

impl BaseEncoding
{
    #[must_use]
    pub fn from_dwarf(ate: gimli::DwAte) -> Self
    {
        use gimli::constants as c;
        match ate {
            c::DW_ATE_boolean => BaseEncoding::Boolean,
            c::DW_ATE_float => BaseEncoding::Float,
            c::DW_ATE_complex_float => BaseEncoding::ComplexFloat,
            c::DW_ATE_signed => BaseEncoding::Signed,
            c::DW_ATE_signed_char => BaseEncoding::SignedChar,
            c::DW_ATE_unsigned => BaseEncoding::Unsigned,
            c::DW_ATE_unsigned_char => BaseEncoding::UnsignedChar,
            other => BaseEncoding::Other(other.0),
        }
    }
}

/// `DW_AT_visibility`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility
{
    Local,
    Exported,
    Qualified,
}

/// `DW_CC_normal`: the only calling convention a plain prototype expresses.
pub const CALLING_CONVENTION_NORMAL: u8 = 1;

/// One DWARF record.
///
/// Only the attributes the generator consults are kept. Everything is
/// optional because producers differ wildly in what they emit.
#[derive(Debug, Clone)]
pub struct Die
{
    pub tag: Tag,
    /// Stable label; the `.debug_info` offset for loaded graphs
    pub offset: u64,
    pub name: Option<String>,
    pub parent: Option<DieId>,
    pub children: Vec<DieId>,
    /// `DW_AT_type`; `None` means void
    pub type_ref: Option<DieId>,
    pub byte_size: Option<u64>,
    pub bit_size: Option<u64>,
    pub data_bit_offset: Option<u64>,
    /// `DW_AT_data_member_location`
    pub location: Option<LocationExpr>,
    pub declaration: bool,
    pub external: bool,
    pub prototyped: bool,
    pub visibility: Option<Visibility>,
    pub calling_convention: Option<u8>,
    pub encoding: Option<BaseEncoding>,
    pub const_value: Option<i64>,
    pub lower_bound: Option<i64>,
    pub upper_bound: Option<i64>,
    pub count: Option<u64>,
    /// Compile units only
    pub language: Option<Language>,
    /// Compile units only
    pub address_size: Option<u8>,
}

impl Die
{
    #[must_use]
    pub fn new(tag: Tag, offset: u64) -> Self
    {
        Self {
            tag,
            offset,
            name: None,
            parent: None,
            children: Vec::new(),
            type_ref: None,
            byte_size: None,
            bit_size: None,
            data_bit_offset: None,
            location: None,
            declaration: false,
            external: false,
            prototyped: false,
            visibility: None,
            calling_convention: None,
            encoding: None,
            const_value: None,
            lower_bound: None,
            upper_bound: None,
            count: None,
            language: None,
            address_size: None,
        }
    }
}

/// Arena of DWARF records for one input.
#[derive(Debug, Clone)]
pub struct DieGraph
{
    dies: Vec<Die>,
    root: DieId,
    by_offset: HashMap<u64, DieId>,
}

impl std::ops::Index<DieId> for DieGraph
{
    type Output = Die;

    fn index(&self, id: DieId) -> &Die
    {
        &self.dies[id.index()]
    }
}

impl DieGraph
{
    pub(crate) fn from_parts(dies: Vec<Die>, root: DieId) -> Self
    {
        let by_offset = dies
            .iter()
            .enumerate()
            .filter(|(_, die)| die.tag != Tag::Root)
            .map(|(index, die)| (die.offset, DieId(index as u32)))
            .collect();
        Self { dies, root, by_offset }
    }

    #[must_use]
    pub fn root(&self) -> DieId
    {
        self.root
    }

    #[must_use]
    pub fn len(&self) -> usize
    {
        self.dies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.dies.len() <= 1
    }

    /// Every id in the arena, in creation order.
    pub fn ids(&self) -> impl Iterator<Item = DieId> + '_
    {
        (0..self.dies.len()).map(|index| DieId(index as u32))
    }

    #[must_use]
    pub fn by_offset(&self, offset: u64) -> Option<DieId>
    {
        self.by_offset.get(&offset).copied()
    }

    #[must_use]
    pub fn tag(&self, id: DieId) -> Tag
    {
        self[id].tag
    }

    #[must_use]
    pub fn name(&self, id: DieId) -> Option<&str>
    {
        self[id].name.as_deref()
    }

    #[must_use]
    pub fn offset(&self, id: DieId) -> u64
    {
        self[id].offset
    }

    #[must_use]
    pub fn parent(&self, id: DieId) -> Option<DieId>
    {
        self[id].parent
    }

    #[must_use]
    pub fn children(&self, id: DieId) -> &[DieId]
    {
        &self[id].children
    }

    /// The `DW_AT_type` edge; `None` is void.
    #[must_use]
    pub fn find_type(&self, id: DieId) -> Option<DieId>
    {
        self[id].type_ref
    }

    /// Children with the given tag, in declaration order.
    pub fn children_tagged(&self, id: DieId, tag: Tag) -> impl Iterator<Item = DieId> + '_
    {
        self.children(id).iter().copied().filter(move |child| self.tag(*child) == tag)
    }

    /// Compile units.
    pub fn units(&self) -> impl Iterator<Item = DieId> + '_
    {
        self.children(self.root).iter().copied()
    }

    /// Unit-level entries ("grandchildren" of the root), unit by unit.
    pub fn toplevel(&self) -> impl Iterator<Item = DieId> + '_
    {
        self.units().flat_map(move |unit| self.children(unit).iter().copied())
    }

    #[must_use]
    pub fn is_toplevel(&self, id: DieId) -> bool
    {
        self.parent(id).is_some_and(|parent| self.tag(parent) == Tag::CompileUnit)
    }

    #[must_use]
    pub fn enclosing_unit(&self, id: DieId) -> Option<DieId>
    {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if self.tag(current) == Tag::CompileUnit {
                return Some(current);
            }
            cursor = self.parent(current);
        }
        None
    }

    #[must_use]
    pub fn language_of(&self, id: DieId) -> Option<Language>
    {
        self.enclosing_unit(id).and_then(|unit| self[unit].language)
    }

    /// Pointer width of the unit holding `id`, defaulting to 8.
    #[must_use]
    pub fn address_size_of(&self, id: DieId) -> u8
    {
        self.enclosing_unit(id)
            .and_then(|unit| self[unit].address_size)
            .unwrap_or(8)
    }

    /// Strip `const`/`volatile`/`restrict`.
    #[must_use]
    pub fn unqualified_type(&self, t: Option<DieId>) -> Option<DieId>
    {
        let mut current = t;
        for _ in 0..MAX_TYPE_REF_DEPTH {
            match current {
                Some(id) if self.tag(id).is_qualifier() => current = self.find_type(id),
                _ => return current,
            }
        }
        current
    }

    /// Strip qualifiers and typedefs down to the structural shape.
    #[must_use]
    pub fn concrete_type(&self, t: Option<DieId>) -> Option<DieId>
    {
        let mut current = t;
        for _ in 0..MAX_TYPE_REF_DEPTH {
            match current {
                Some(id) if self.tag(id).is_qualifier() || self.tag(id) == Tag::Typedef => {
                    current = self.find_type(id);
                }
                _ => return current,
            }
        }
        current
    }

    /// Data members of an aggregate, in declaration order.
    pub fn members(&self, id: DieId) -> impl Iterator<Item = DieId> + '_
    {
        self.children_tagged(id, Tag::Member)
    }

    pub fn formal_parameters(&self, id: DieId) -> impl Iterator<Item = DieId> + '_
    {
        self.children_tagged(id, Tag::FormalParameter)
    }

    #[must_use]
    pub fn has_unspecified_parameters(&self, id: DieId) -> bool
    {
        self.children_tagged(id, Tag::UnspecifiedParameters).next().is_some()
    }

    /// Whether `id` is declared inside a struct, union or class.
    #[must_use]
    pub fn is_nested_in_aggregate(&self, id: DieId) -> bool
    {
        self.parent(id).is_some_and(|parent| self.tag(parent).has_data_members())
    }

    /// `static` data members show up as declared, external members.
    #[must_use]
    pub fn is_static_member(&self, id: DieId) -> bool
    {
        let die = &self[id];
        die.tag == Tag::Member && die.declaration && die.external
    }

    /// Per-dimension element counts of an array type.
    ///
    /// A dimension without a count (flexible, unknown or unrepresentable
    /// bound) is `None` and emits as `[]`.
    #[must_use]
    pub fn array_dimensions(&self, id: DieId) -> SmallVec<[Option<u64>; 4]>
    {
        let mut dims = SmallVec::new();
        for sub in self.children_tagged(id, Tag::SubrangeType) {
            let die = &self[sub];
            let count = die.count.or_else(|| {
                let upper = die.upper_bound?;
                let lower = die.lower_bound.unwrap_or(0);
                let count = upper.checked_sub(lower)?.checked_add(1)?;
                u64::try_from(count).ok()
            });
            dims.push(count);
        }
        if dims.is_empty() {
            dims.push(None);
        }
        dims
    }

    /// Total element count of an array, if every dimension is known.
    #[must_use]
    pub fn element_count(&self, id: DieId) -> Option<u64>
    {
        self.array_dimensions(id)
            .iter()
            .try_fold(1u64, |acc, dim| dim.and_then(|n| acc.checked_mul(n)))
    }

    /// Size in bytes of a value of type `t`, if it can be worked out.
    #[must_use]
    pub fn calculate_byte_size(&self, t: Option<DieId>) -> Option<u64>
    {
        self.byte_size_bounded(t, 0)
    }

    fn byte_size_bounded(&self, t: Option<DieId>, depth: usize) -> Option<u64>
    {
        if depth >= MAX_TYPE_REF_DEPTH {
            return None;
        }
        let id = t?;
        let die = &self[id];
        match die.tag {
            Tag::BaseType | Tag::StructureType | Tag::UnionType | Tag::ClassType | Tag::EnumerationType => {
                if die.declaration {
                    None
                } else {
                    die.byte_size
                }
            }
            Tag::PointerType | Tag::ReferenceType => {
                Some(die.byte_size.unwrap_or_else(|| u64::from(self.address_size_of(id))))
            }
            Tag::Typedef | Tag::ConstType | Tag::VolatileType | Tag::RestrictType | Tag::SubrangeType => {
                die.byte_size.or_else(|| self.byte_size_bounded(die.type_ref, depth + 1))
            }
            Tag::ArrayType => {
                if let Some(size) = die.byte_size {
                    return Some(size);
                }
                let element = self.byte_size_bounded(die.type_ref, depth + 1)?;
                element.checked_mul(self.element_count(id)?)
            }
            _ => None,
        }
    }

    /// The base type an enumeration or subrange without `DW_AT_type` uses.
    ///
    /// C compilers give enumerations `unsigned int` (or `int` when negative
    /// enumerators exist); we look for either in the enclosing unit.
    #[must_use]
    pub fn implicit_enum_base(&self, id: DieId) -> Option<DieId>
    {
        let unit = self.enclosing_unit(id)?;
        let named = |wanted: &str| {
            self.children_tagged(unit, Tag::BaseType)
                .find(|candidate| self.name(*candidate) == Some(wanted))
        };
        named("unsigned int").or_else(|| named("int"))
    }

    /// A unit-level, defined tagged type called `name`, other than `exclude`.
    ///
    /// Nested aggregates share C's single flat tag namespace with unit-level
    /// ones, so a match here means the nested one cannot keep its name.
    #[must_use]
    pub fn find_visible_named_toplevel(&self, name: &str, exclude: DieId) -> Option<DieId>
    {
        self.toplevel().find(|candidate| {
            *candidate != exclude
                && self.tag(*candidate).is_tagged()
                && !self[*candidate].declaration
                && self.name(*candidate) == Some(name)
                && self[*candidate].visibility.is_none_or(|vis| vis != Visibility::Local)
        })
    }

    /// Short human-readable description used in log messages.
    #[must_use]
    pub fn summary(&self, id: DieId) -> String
    {
        let die = &self[id];
        match &die.name {
            Some(name) => format!("{:?} '{}' at 0x{:x}", die.tag, name, die.offset),
            None => format!("{:?} at 0x{:x}", die.tag, die.offset),
        }
    }
}

impl fmt::Display for DieId
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "#{}", self.0)
    }
}
