//! # Declaration Generator
//!
//! Turns type graph nodes into C declarator and definition text.
//!
//! ## Declarators
//!
//! C declarators are written inside out: the name sits in the middle and the
//! type constructors wrap around it (`int (*table[4])(void)`). We build them
//! the same way the grammar reads, by threading the partial declarator down
//! the type chain:
//!
//! - a **nameable** type (per the [`Referencer`]) ends the recursion:
//!   `"<name of t> <declarator>"`
//! - a **pointer** prefixes `*` (plus any pending qualifiers) and recurses on
//!   the pointee, parenthesizing first when the pointee is an array or a
//!   function
//! - an **array** appends one `[n]` per dimension and recurses on the element
//! - a **qualifier** is accumulated and applied by the next constructor
//! - a **function type** appends its parameter list and recurses on the
//!   return type with the whole signature as the declarator
//! - an **anonymous aggregate** with no usable name is defined inline
//!
//! ## Definitions
//!
//! Aggregate definitions reproduce the member offsets recorded in DWARF. Each
//! member lands where the compiler would put it after the previous member, or
//! we force it there with an alignment attribute, or (when no power of two
//! does it) with explicit padding. See [`DeclGen::defn_of_die`].
//!
//! Every name is obtained through the [`Referencer`], which is how the
//! scheduler learns what each fragment depends on.

use tracing::warn;

use crate::config::{Dialect, GeneratorConfig};
use crate::error::{DeclError, Result};
use crate::graph::{DieGraph, DieId, Tag, CALLING_CONVENTION_NORMAL};
use crate::naming::{sanitize_identifier, RefKind, Referencer};

/// Qualifiers waiting to be applied by the next type constructor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Quals
{
    konst: bool,
    volatile: bool,
    restrict: bool,
}

impl Quals
{
    fn add(mut self, tag: Tag) -> Self
    {
        match tag {
            Tag::ConstType => self.konst = true,
            Tag::VolatileType => self.volatile = true,
            Tag::RestrictType => self.restrict = true,
            _ => {}
        }
        self
    }

    fn is_empty(self) -> bool
    {
        self == Quals::default()
    }

    /// Space-terminated keywords, e.g. `"const volatile "`.
    fn keywords(self, dialect: Dialect) -> String
    {
        let mut out = String::new();
        if self.konst {
            out.push_str("const ");
        }
        if self.volatile {
            out.push_str("volatile ");
        }
        if self.restrict {
            out.push_str(match dialect {
                Dialect::C => "restrict ",
                Dialect::Cxx => "__restrict ",
            });
        }
        out
    }
}

fn join(type_text: &str, declarator: &str) -> String
{
    if declarator.is_empty() {
        type_text.to_string()
    } else {
        format!("{type_text} {declarator}")
    }
}

fn indent(text: &str) -> String
{
    text.lines()
        .map(|line| if line.is_empty() { String::new() } else { format!("    {line}") })
        .collect::<Vec<_>>()
        .join("\n")
}

fn round_up(value: u64, align: u64) -> Option<u64>
{
    Some(value.checked_add(align - 1)? / align * align)
}

/// Smallest power-of-two alignment placing a member at `target` when the
/// previous member ends at `prev_end`.
#[must_use]
pub fn alignment_reproducing(prev_end: u64, target: u64, ceiling: u64) -> Option<u64>
{
    let mut align = 1u64;
    while align <= ceiling {
        if round_up(prev_end, align) == Some(target) {
            return Some(align);
        }
        align = align.checked_mul(2)?;
    }
    None
}

/// Declarator and definition text generator.
#[derive(Debug, Clone, Copy)]
pub struct DeclGen<'a>
{
    graph: &'a DieGraph,
    config: &'a GeneratorConfig,
}

impl<'a> DeclGen<'a>
{
    #[must_use]
    pub fn new(graph: &'a DieGraph, config: &'a GeneratorConfig) -> Self
    {
        Self { graph, config }
    }

    fn sanitize(&self, name: &str) -> String
    {
        sanitize_identifier(name, &self.config.reserved_prefix)
    }

    /// Declare `name` with type `t` (`None` is void).
    ///
    /// An empty `name` gives an abstract declarator, as used in casts and
    /// unnamed parameters.
    ///
    /// ## Example
    ///
    /// ```rust
    /// use dwarfdecl_core::config::GeneratorConfig;
    /// use dwarfdecl_core::declgen::DeclGen;
    /// use dwarfdecl_core::graph::{BaseEncoding, GraphBuilder, Language};
    /// use dwarfdecl_core::naming::Namer;
    ///
    /// let mut b = GraphBuilder::new();
    /// let unit = b.unit("a.c", Language::C99, 8);
    /// let char_ty = b.base_type(unit, "char", BaseEncoding::SignedChar, 1);
    /// let ptr = b.pointer(unit, Some(char_ty));
    /// let argv = b.array(unit, Some(ptr), &[None]);
    /// let graph = b.finish();
    ///
    /// let config = GeneratorConfig::default();
    /// let mut namer = Namer::new(&graph, &config);
    /// let text = DeclGen::new(&graph, &config).decl_having_type(Some(argv), "argv", &mut namer).unwrap();
    /// assert_eq!(text, "char *argv[]");
    /// ```
    ///
    /// ## Errors
    ///
    /// [`DeclError::Unnameable`] when the chain bottoms out in a node that
    /// must be named but has no name (an unnamed base type or typedef).
    pub fn decl_having_type(&self, t: Option<DieId>, name: &str, namer: &mut dyn Referencer) -> Result<String>
    {
        self.declarator(t, name.to_string(), RefKind::Normal, Quals::default(), namer)
    }

    /// [`DeclGen::decl_having_type`] for a use that needs a complete type.
    ///
    /// ## Errors
    ///
    /// Same as [`DeclGen::decl_having_type`].
    pub fn decl_having_complete_type(
        &self,
        t: Option<DieId>,
        name: &str,
        namer: &mut dyn Referencer,
    ) -> Result<String>
    {
        self.declarator(t, name.to_string(), RefKind::TypeMustBeComplete, Quals::default(), namer)
    }

    fn declarator(
        &self,
        t: Option<DieId>,
        name: String,
        need: RefKind,
        quals: Quals,
        namer: &mut dyn Referencer,
    ) -> Result<String>
    {
        let graph = self.graph;
        let dialect = self.config.dialect;
        let Some(id) = t else {
            return Ok(join(&format!("{}void", quals.keywords(dialect)), &name));
        };
        let tag = graph.tag(id);

        if tag.is_qualifier() {
            return self.declarator(graph.find_type(id), name, need, quals.add(tag), namer);
        }

        if let Some(type_name) = namer.name_for(Some(id), need) {
            return Ok(join(&format!("{}{type_name}", quals.keywords(dialect)), &name));
        }

        match tag {
            Tag::PointerType | Tag::ReferenceType => {
                let op = if tag == Tag::PointerType { "*" } else { "&" };
                let mut inner = format!("{op}{}", quals.keywords(dialect));
                if name.is_empty() {
                    inner = inner.trim_end().to_string();
                } else {
                    inner.push_str(&name);
                }
                let pointee = graph.find_type(id);
                let needs_parens = graph
                    .unqualified_type(pointee)
                    .is_some_and(|p| graph.tag(p) == Tag::ArrayType || graph.tag(p).is_type_describing_subprogram());
                if needs_parens {
                    inner = format!("({inner})");
                }
                self.declarator(pointee, inner, RefKind::Normal, Quals::default(), namer)
            }
            Tag::ArrayType => {
                let mut inner = name;
                for dim in graph.array_dimensions(id) {
                    match dim {
                        Some(count) => inner.push_str(&format!("[{count}]")),
                        None => inner.push_str("[]"),
                    }
                }
                self.declarator(graph.find_type(id), inner, RefKind::TypeMustBeComplete, quals, namer)
            }
            Tag::SubroutineType | Tag::Subprogram => {
                if !quals.is_empty() {
                    warn!("Dropping qualifiers on function type {}", graph.summary(id));
                }
                let signature = format!("{name}({})", self.parameter_list(id, namer)?);
                self.declarator(graph.find_type(id), signature, RefKind::Normal, Quals::default(), namer)
            }
            Tag::SubrangeType => {
                let base = graph.find_type(id).or_else(|| graph.implicit_enum_base(id));
                self.declarator(base, name, need, quals, namer)
            }
            Tag::EnumerationType => {
                let body = self.enum_body(id, "enum");
                Ok(join(&format!("{}{body}", quals.keywords(dialect)), &name))
            }
            Tag::StructureType | Tag::UnionType | Tag::ClassType => {
                let body = self.aggregate_body(id, None, namer)?;
                Ok(join(&format!("{}{body}", quals.keywords(dialect)), &name))
            }
            _ => Err(DeclError::unnameable(graph.offset(id), tag)),
        }
    }

    fn parameter_list(&self, id: DieId, namer: &mut dyn Referencer) -> Result<String>
    {
        let graph = self.graph;
        let mut params = Vec::new();
        for param in graph.formal_parameters(id) {
            let name = match graph.name(param) {
                Some(name) if self.config.emit_fp_names => self.sanitize(name),
                _ => String::new(),
            };
            let text = match graph.find_type(param) {
                Some(ty) => self.declarator(Some(ty), name, RefKind::Normal, Quals::default(), namer)?,
                None => {
                    let typename = self.config.untyped_argument_typename.trim_end();
                    if typename.ends_with('*') {
                        format!("{typename}{name}")
                    } else {
                        join(typename, &name)
                    }
                }
            };
            params.push(text);
        }
        if graph.has_unspecified_parameters(id) {
            params.push("...".to_string());
        }
        if params.is_empty() && graph[id].prototyped {
            params.push("void".to_string());
        }
        Ok(params.join(", "))
    }

    /// Text for a DECL work item: what callers need before they may name `id`.
    ///
    /// - aggregates: a forward declaration, `struct S;`
    /// - typedefs: the full `typedef` (it only needs its target declared)
    /// - variables: an `extern` declaration
    /// - subprograms: a prototype, with an `extern "C"` linkage marker when
    ///   emitting C++ for a C compile unit
    /// - enumerations: nothing; C has no portable enum forward declaration,
    ///   so the name is made to depend on the definition instead
    ///
    /// ## Errors
    ///
    /// [`DeclError::Unnameable`] for nodes that have no declaration of their
    /// own, or when a referenced type cannot be named.
    pub fn decl_of_die(&self, id: DieId, namer: &mut dyn Referencer) -> Result<String>
    {
        let graph = self.graph;
        let tag = graph.tag(id);
        match tag {
            Tag::StructureType | Tag::UnionType | Tag::ClassType => {
                let name = namer
                    .name_for(Some(id), RefKind::Defining)
                    .ok_or_else(|| DeclError::unnameable(graph.offset(id), tag))?;
                Ok(format!("{name};"))
            }
            Tag::EnumerationType => {
                namer.name_for(Some(id), RefKind::TypeMustBeComplete);
                Ok(String::new())
            }
            Tag::Typedef => {
                let name = namer
                    .name_for(Some(id), RefKind::Defining)
                    .ok_or_else(|| DeclError::unnameable(graph.offset(id), tag))?;
                let decl = self.declarator(graph.find_type(id), name, RefKind::Normal, Quals::default(), namer)?;
                Ok(format!("typedef {decl};"))
            }
            Tag::Variable => {
                let Some(name) = namer.name_for(Some(id), RefKind::Defining) else {
                    return Ok(String::new());
                };
                let decl = self.declarator(graph.find_type(id), name, RefKind::Normal, Quals::default(), namer)?;
                Ok(format!("extern {decl};"))
            }
            Tag::Subprogram => self.subprogram_decl(id, namer),
            _ => Err(DeclError::unnameable(graph.offset(id), tag)),
        }
    }

    fn subprogram_decl(&self, id: DieId, namer: &mut dyn Referencer) -> Result<String>
    {
        let graph = self.graph;
        let Some(name) = namer.name_for(Some(id), RefKind::Defining) else {
            return Ok(String::new());
        };
        let convention = graph[id].calling_convention.unwrap_or(CALLING_CONVENTION_NORMAL);
        if convention != CALLING_CONVENTION_NORMAL {
            warn!("Skipping {} with calling convention {}", graph.summary(id), convention);
            return Ok(format!("// skipped {name}: unsupported calling convention {convention}"));
        }

        let signature = format!("{name}({})", self.parameter_list(id, namer)?);
        let decl = self.declarator(graph.find_type(id), signature, RefKind::Normal, Quals::default(), namer)?;

        let c_unit = graph.language_of(id).is_some_and(|lang| lang.is_c_family());
        if self.config.dialect == Dialect::Cxx && c_unit {
            Ok(format!("extern \"C\" {decl};"))
        } else {
            Ok(format!("{decl};"))
        }
    }

    /// Text for a DEF work item: the full definition of `id`.
    ///
    /// Enumerations list their enumerators with explicit values.
    /// Aggregates list their members in declaration order, each placed at
    /// its recorded byte offset:
    ///
    /// 1. a member starting exactly where the previous one ended needs nothing
    /// 2. otherwise the smallest power-of-two alignment (up to
    ///    [`GeneratorConfig::alignment_ceiling`]) that rounds the previous end
    ///    up to the target is attached as `__attribute__((aligned(n)))`
    /// 3. failing that, a `char` padding array covering the gap is inserted
    ///    before the member
    ///
    /// When a member's offset is unknown, overlaps the previous member, or
    /// its size is unknown, layout control is given up for the rest of the
    /// aggregate and the compiler's natural layout is trusted. Each of these
    /// cases leaves a comment in the output and a warning in the log.
    ///
    /// Anything else has no separate definition and gets its DECL text.
    ///
    /// ## Errors
    ///
    /// Propagates [`DeclError::Unnameable`] from member declarators.
    pub fn defn_of_die(&self, id: DieId, namer: &mut dyn Referencer) -> Result<String>
    {
        let graph = self.graph;
        let tag = graph.tag(id);
        match tag {
            Tag::EnumerationType => self.enum_definition(id, namer),
            Tag::StructureType | Tag::UnionType | Tag::ClassType => {
                let name = namer
                    .name_for(Some(id), RefKind::Defining)
                    .ok_or_else(|| DeclError::unnameable(graph.offset(id), tag))?;
                if graph[id].declaration {
                    warn!("No definition available for declaration-only {}", graph.summary(id));
                    return Ok(format!("{name};"));
                }
                Ok(format!("{};", self.aggregate_body(id, Some(&name), namer)?))
            }
            _ => self.decl_of_die(id, namer),
        }
    }

    fn enum_definition(&self, id: DieId, namer: &mut dyn Referencer) -> Result<String>
    {
        let graph = self.graph;
        let name = namer
            .name_for(Some(id), RefKind::Defining)
            .ok_or_else(|| DeclError::unnameable(graph.offset(id), Tag::EnumerationType))?;
        if graph.children_tagged(id, Tag::Enumerator).next().is_none() {
            warn!("No enumerators available for {}", graph.summary(id));
            return Ok(format!("{name};"));
        }
        Ok(format!("{};", self.enum_body(id, &name)))
    }

    /// `enum [name] { enumerators }` without the trailing semicolon.
    fn enum_body(&self, id: DieId, header: &str) -> String
    {
        let graph = self.graph;
        let enumerators: Vec<String> = graph
            .children_tagged(id, Tag::Enumerator)
            .filter_map(|e| {
                let label = self.sanitize(graph.name(e)?);
                Some(match graph[e].const_value {
                    Some(value) => format!("    {label} = {value}"),
                    None => format!("    {label}"),
                })
            })
            .collect();
        format!("{header} {{\n{}\n}}", enumerators.join(",\n"))
    }

    /// `struct [name] { members }` without the trailing semicolon.
    fn aggregate_body(&self, id: DieId, name: Option<&str>, namer: &mut dyn Referencer) -> Result<String>
    {
        let graph = self.graph;
        let header = match name {
            Some(name) => name.to_string(),
            None => graph.tag(id).tag_keyword().unwrap_or("struct").to_string(),
        };
        let lines = self.member_lines(id, namer)?;
        if lines.is_empty() {
            return Ok(format!("{header} {{\n}}"));
        }
        Ok(format!("{header} {{\n{}\n}}", indent(&lines.join("\n"))))
    }

    fn member_lines(&self, id: DieId, namer: &mut dyn Referencer) -> Result<Vec<String>>
    {
        let graph = self.graph;
        let config = self.config;
        let is_union = graph.tag(id) == Tag::UnionType;
        let mut lines = Vec::new();
        // End of the previous member; `None` once layout control is abandoned.
        let mut prev_end = Some(0u64);

        for child in graph.children(id).iter().copied() {
            let member = &graph[child];
            if !matches!(member.tag, Tag::Member | Tag::Inheritance) {
                continue;
            }
            if graph.is_static_member(child) {
                lines.push(format!(
                    "// static member {} omitted",
                    member.name.as_deref().unwrap_or("<anonymous>")
                ));
                continue;
            }

            let field_name = match (&member.name, member.tag) {
                (Some(name), _) => self.sanitize(name),
                (None, Tag::Inheritance) => format!("{}base_{:x}", config.anonymous_prefix, member.offset),
                (None, _) => {
                    let inline_aggregate = graph
                        .find_type(child)
                        .is_some_and(|ty| graph.tag(ty).is_tagged() && graph.name(ty).is_none());
                    if inline_aggregate {
                        String::new()
                    } else {
                        format!("{}{:x}", config.anonymous_prefix, member.offset)
                    }
                }
            };
            let label = if field_name.is_empty() { "<anonymous>" } else { field_name.as_str() };
            let decl = self.declarator(
                member.type_ref,
                field_name.clone(),
                RefKind::TypeMustBeComplete,
                Quals::default(),
                namer,
            )?;

            if let Some(bits) = member.bit_size {
                if prev_end.take().is_some() {
                    warn!("Bit-field member {label} in {}: layout not controlled", graph.summary(id));
                    lines.push(format!("// layout control abandoned at bit-field {label}"));
                }
                let mut line = format!("{decl} : {bits};");
                if config.offset_comments {
                    if let Some(bit) = member.data_bit_offset {
                        line.push_str(&format!(" // bit offset: {bit}"));
                    }
                }
                lines.push(line);
                continue;
            }

            if is_union {
                lines.push(format!("{decl};"));
                continue;
            }

            let target = member.location.as_ref().and_then(|loc| loc.evaluate());
            let mut terminator = ";".to_string();
            match (prev_end, target) {
                (Some(prev), Some(target)) if target >= prev => {
                    if target > prev {
                        match alignment_reproducing(prev, target, config.alignment_ceiling) {
                            Some(align) => terminator = format!(" __attribute__((aligned({align})));"),
                            None => {
                                let gap = target - prev;
                                warn!(
                                    "Irregular layout in {}: padding {} byte(s) before {}",
                                    graph.summary(id),
                                    gap,
                                    label
                                );
                                lines.push(format!(
                                    "// irregular layout: no alignment places {label} at offset {target} after {prev}"
                                ));
                                lines.push(format!("char {}padding_{target:x}[{gap}];", config.anonymous_prefix));
                            }
                        }
                    }
                    let size = graph.calculate_byte_size(member.type_ref);
                    prev_end = size.and_then(|size| target.checked_add(size));
                    if prev_end.is_none() {
                        warn!("Size of {label} in {} unknown: layout not controlled", graph.summary(id));
                        lines.push(format!("// layout control abandoned after {label}: size unknown"));
                    }
                }
                (Some(prev), Some(target)) => {
                    warn!(
                        "Member {label} at {target} overlaps previous member ending at {prev} in {}",
                        graph.summary(id)
                    );
                    lines.push(format!("// layout control abandoned at {label}: overlaps previous member"));
                    prev_end = None;
                }
                (Some(_), None) => {
                    warn!("Offset of {label} in {} unknown: layout not controlled", graph.summary(id));
                    lines.push(format!("// layout control abandoned at {label}: offset unknown"));
                    prev_end = None;
                }
                (None, _) => {}
            }

            let mut line = format!("{decl}{terminator}");
            if config.offset_comments {
                if let Some(target) = target {
                    line.push_str(&format!(" // offset: {target}"));
                }
            }
            lines.push(line);
        }
        Ok(lines)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::graph::{BaseEncoding, GraphBuilder, Language};
    use crate::naming::Namer;

    fn quiet() -> GeneratorConfig
    {
        GeneratorConfig::default().with_offset_comments(false)
    }

    #[test]
    fn test_alignment_search()
    {
        assert_eq!(alignment_reproducing(1, 4, 1 << 30), Some(4));
        assert_eq!(alignment_reproducing(5, 8, 1 << 30), Some(8));
        assert_eq!(alignment_reproducing(5, 9, 1 << 30), None);
        assert_eq!(alignment_reproducing(5, 6, 1 << 30), Some(2));
        assert_eq!(alignment_reproducing(1, 64, 32), None);
    }

    #[test]
    fn test_pointer_to_function_returning_pointer()
    {
        let mut b = GraphBuilder::new();
        let unit = b.unit("a.c", Language::C99, 8);
        let int = b.base_type(unit, "int", BaseEncoding::Signed, 4);
        let int_ptr = b.pointer(unit, Some(int));
        let func = b.subroutine_type(unit, Some(int_ptr));
        b.parameter(func, None, Some(int));
        let fptr = b.pointer(unit, Some(func));
        let graph = b.finish();

        let config = quiet();
        let mut namer = Namer::new(&graph, &config);
        let gen = DeclGen::new(&graph, &config);
        assert_eq!(gen.decl_having_type(Some(fptr), "x", &mut namer).unwrap(), "int *(*x)(int)");
    }

    #[test]
    fn test_const_pointer_and_pointer_to_const()
    {
        let mut b = GraphBuilder::new();
        let unit = b.unit("a.c", Language::C99, 8);
        let ch = b.base_type(unit, "char", BaseEncoding::SignedChar, 1);
        let const_ch = b.const_of(unit, Some(ch));
        let ptr = b.pointer(unit, Some(const_ch));
        let const_ptr = b.const_of(unit, Some(ptr));
        let graph = b.finish();

        let config = quiet();
        let mut namer = Namer::new(&graph, &config);
        let gen = DeclGen::new(&graph, &config);
        assert_eq!(gen.decl_having_type(Some(const_ptr), "s", &mut namer).unwrap(), "const char *const s");
        assert_eq!(gen.decl_having_type(Some(ptr), "", &mut namer).unwrap(), "const char *");
    }

    #[test]
    fn test_prototypes()
    {
        let mut b = GraphBuilder::new();
        let unit = b.unit("a.c", Language::C99, 8);
        let int = b.base_type(unit, "int", BaseEncoding::Signed, 4);
        let nullary = b.subprogram(unit, "tick", None);
        let unproto = b.subprogram(unit, "old_style", Some(int));
        b.die_mut(unproto).prototyped = false;
        let variadic = b.subprogram(unit, "logf", Some(int));
        b.parameter(variadic, Some("fmt"), None);
        b.unspecified_parameters(variadic);
        let graph = b.finish();

        let config = quiet();
        let mut namer = Namer::new(&graph, &config);
        let gen = DeclGen::new(&graph, &config);
        assert_eq!(gen.decl_of_die(nullary, &mut namer).unwrap(), "void tick(void);");
        assert_eq!(gen.decl_of_die(unproto, &mut namer).unwrap(), "int old_style();");
        assert_eq!(gen.decl_of_die(variadic, &mut namer).unwrap(), "int logf(void *fmt, ...);");
    }

    #[test]
    fn test_cxx_dialect_wraps_c_functions()
    {
        let mut b = GraphBuilder::new();
        let unit = b.unit("a.c", Language::C11, 8);
        let func = b.subprogram(unit, "reset", None);
        let graph = b.finish();

        let config = quiet().with_dialect(Dialect::Cxx);
        let mut namer = Namer::new(&graph, &config);
        let gen = DeclGen::new(&graph, &config);
        assert_eq!(gen.decl_of_die(func, &mut namer).unwrap(), "extern \"C\" void reset(void);");
    }

    #[test]
    fn test_nonstandard_calling_convention_is_skipped()
    {
        let mut b = GraphBuilder::new();
        let unit = b.unit("a.c", Language::C99, 8);
        let func = b.subprogram(unit, "isr", None);
        b.die_mut(func).calling_convention = Some(0x41);
        let graph = b.finish();

        let config = quiet();
        let mut namer = Namer::new(&graph, &config);
        let text = DeclGen::new(&graph, &config).decl_of_die(func, &mut namer).unwrap();
        assert!(text.starts_with("// skipped isr"));
    }

    #[test]
    fn test_enum_definition()
    {
        let mut b = GraphBuilder::new();
        let unit = b.unit("a.c", Language::C99, 8);
        let color = b.enumeration(unit, Some("color"), 4, None);
        b.enumerator(color, "RED", 0);
        b.enumerator(color, "BLUE", -2);
        let graph = b.finish();

        let config = quiet();
        let mut namer = Namer::new(&graph, &config);
        let gen = DeclGen::new(&graph, &config);
        assert_eq!(
            gen.defn_of_die(color, &mut namer).unwrap(),
            "enum color {\n    RED = 0,\n    BLUE = -2\n};"
        );
        assert_eq!(gen.decl_of_die(color, &mut namer).unwrap(), "");
    }

    #[test]
    fn test_nested_anonymous_union_is_inlined()
    {
        let mut b = GraphBuilder::new();
        let unit = b.unit("a.c", Language::C11, 8);
        let int = b.base_type(unit, "int", BaseEncoding::Signed, 4);
        let float = b.base_type(unit, "float", BaseEncoding::Float, 4);
        let value = b.aggregate(unit, Tag::StructureType, Some("value"), Some(8));
        let anon = b.aggregate(value, Tag::UnionType, None, Some(4));
        b.member(anon, Some("i"), Some(int), Some(0));
        b.member(anon, Some("f"), Some(float), Some(0));
        b.member(value, Some("kind"), Some(int), Some(0));
        b.member(value, None, Some(anon), Some(4));
        let graph = b.finish();

        let config = quiet();
        let mut namer = Namer::new(&graph, &config);
        let text = DeclGen::new(&graph, &config).defn_of_die(value, &mut namer).unwrap();
        assert_eq!(
            text,
            "struct value {\n    int kind;\n    union {\n        int i;\n        float f;\n    };\n};"
        );
    }

    #[test]
    fn test_unnamed_base_type_is_an_error()
    {
        let mut b = GraphBuilder::new();
        let unit = b.unit("a.c", Language::C99, 8);
        let nameless = b.add(unit, Tag::BaseType);
        let graph = b.finish();

        let config = GeneratorConfig::default().with_base_types(crate::config::BaseTypeNaming::Verbatim);
        let mut namer = Namer::new(&graph, &config);
        let err = DeclGen::new(&graph, &config).decl_having_type(Some(nameless), "x", &mut namer);
        assert!(matches!(err, Err(DeclError::Unnameable { tag: Tag::BaseType, .. })));
    }
}
