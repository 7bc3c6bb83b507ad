//! # Naming
//!
//! Decides what, if anything, a type is called at a given use site.
//!
//! A node with no usable name is *unnameable* and the declarator generator
//! composes it structurally instead (pointers, arrays, function types) or
//! defines it inline (anonymous nested aggregates). The dependency-tracking
//! wrapper used by the scheduler lives in [`crate::schedule`]; it implements
//! the same [`Referencer`] trait on top of [`Namer`].

use std::collections::HashSet;

use once_cell::sync::Lazy;
use tracing::{debug, warn};

use crate::config::{BaseTypeNaming, GeneratorConfig};
use crate::graph::{DieGraph, DieId, Tag};

/// How a name is about to be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind
{
    /// A plain reference; an incomplete type is fine (`struct S *p`)
    Normal,
    /// The referenced type must be complete here (by-value member, array element)
    TypeMustBeComplete,
    /// The name is being declared or defined, not referenced
    Defining,
}

/// Something that can name type graph nodes for the declarator generator.
pub trait Referencer
{
    /// The identifier for `t` in context `kind`, or `None` if it has none.
    ///
    /// `None` for `t` is void.
    fn name_for(&mut self, t: Option<DieId>, kind: RefKind) -> Option<String>;
}

static RESERVED_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // C
        "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else", "enum", "extern",
        "float", "for", "goto", "if", "inline", "int", "long", "register", "restrict", "return", "short", "signed",
        "sizeof", "static", "struct", "switch", "typedef", "union", "unsigned", "void", "volatile", "while", "_Alignas",
        "_Alignof", "_Atomic", "_Bool", "_Complex", "_Generic", "_Imaginary", "_Noreturn", "_Static_assert",
        "_Thread_local",
        // C++
        "alignas", "alignof", "and", "and_eq", "asm", "bitand", "bitor", "bool", "catch", "char8_t", "char16_t",
        "char32_t", "class", "compl", "concept", "consteval", "constexpr", "constinit", "const_cast", "co_await",
        "co_return", "co_yield", "decltype", "delete", "dynamic_cast", "explicit", "export", "false", "friend",
        "mutable", "namespace", "new", "noexcept", "not", "not_eq", "nullptr", "operator", "or", "or_eq", "private",
        "protected", "public", "reinterpret_cast", "requires", "static_assert", "static_cast", "template", "this",
        "thread_local", "throw", "true", "try", "typeid", "typename", "using", "virtual", "wchar_t", "xor", "xor_eq",
    ]
    .into_iter()
    .collect()
});

/// Whether `word` is a keyword of the output languages.
#[must_use]
pub fn is_reserved(word: &str) -> bool
{
    RESERVED_WORDS.contains(word)
}

/// Turn an arbitrary DWARF name into a valid C identifier.
///
/// Reserved words get `reserved_prefix`, characters outside `[A-Za-z0-9_]`
/// become `_`, and a leading digit gets a `_` in front.
///
/// ```rust
/// use dwarfdecl_core::naming::sanitize_identifier;
///
/// assert_eq!(sanitize_identifier("class", "_x_"), "_x_class");
/// assert_eq!(sanitize_identifier("ns::vec<int>", "_x_"), "ns__vec_int_");
/// ```
#[must_use]
pub fn sanitize_identifier(name: &str, reserved_prefix: &str) -> String
{
    if is_reserved(name) {
        return format!("{reserved_prefix}{name}");
    }
    let mut out: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Names graph nodes according to a [`GeneratorConfig`].
///
/// No dependency bookkeeping happens here.
#[derive(Debug)]
pub struct Namer<'g>
{
    graph: &'g DieGraph,
    config: &'g GeneratorConfig,
    renamed: HashSet<DieId>,
}

impl<'g> Namer<'g>
{
    #[must_use]
    pub fn new(graph: &'g DieGraph, config: &'g GeneratorConfig) -> Self
    {
        Self {
            graph,
            config,
            renamed: HashSet::new(),
        }
    }

    #[must_use]
    pub fn graph(&self) -> &'g DieGraph
    {
        self.graph
    }

    #[must_use]
    pub fn config(&self) -> &'g GeneratorConfig
    {
        self.config
    }

    /// Synthetic identifier derived from the node's offset.
    #[must_use]
    pub fn anonymous_name(&self, id: DieId) -> String
    {
        format!("{}{:x}", self.config.anonymous_prefix, self.graph.offset(id))
    }

    fn sanitize(&self, name: &str) -> String
    {
        sanitize_identifier(name, &self.config.reserved_prefix)
    }

    /// Name `t` in context `kind`.
    pub fn name(&mut self, t: Option<DieId>, kind: RefKind) -> Option<String>
    {
        let Some(id) = t else {
            return Some("void".to_string());
        };
        let graph = self.graph;
        let die = &graph[id];
        match die.tag {
            Tag::BaseType => self.base_type_name(id),
            Tag::UnspecifiedType => Some(die.name.clone().unwrap_or_else(|| "void".to_string())),
            Tag::StructureType | Tag::UnionType | Tag::ClassType | Tag::EnumerationType => self.tagged_name(id),
            Tag::Typedef => die.name.as_deref().map(|name| self.sanitize(name)),
            Tag::Subprogram | Tag::Variable if kind == RefKind::Defining => {
                die.name.as_deref().map(|name| self.sanitize(name))
            }
            _ => None,
        }
    }

    fn base_type_name(&self, id: DieId) -> Option<String>
    {
        let die = &self.graph[id];
        match &self.config.base_types {
            BaseTypeNaming::Verbatim => die.name.clone(),
            BaseTypeNaming::Abi(table) => {
                let spelled = die
                    .encoding
                    .zip(die.byte_size)
                    .and_then(|(encoding, size)| table.spelling(encoding, size, die.name.as_deref()));
                match spelled {
                    Some(spelling) => Some(spelling.to_string()),
                    None => {
                        debug!("No ABI spelling for {}, using its DWARF name", self.graph.summary(id));
                        die.name.clone()
                    }
                }
            }
        }
    }

    fn tagged_name(&mut self, id: DieId) -> Option<String>
    {
        let graph = self.graph;
        let keyword = graph.tag(id).tag_keyword()?;
        match graph.name(id) {
            Some(name) => {
                let clashes = !graph.is_toplevel(id) && graph.find_visible_named_toplevel(name, id).is_some();
                if clashes {
                    if self.renamed.insert(id) {
                        warn!(
                            "Renaming nested {} to avoid clashing with a unit-level type of the same name",
                            graph.summary(id)
                        );
                    }
                    Some(format!("{keyword} {}", self.anonymous_name(id)))
                } else {
                    Some(format!("{keyword} {}", self.sanitize(name)))
                }
            }
            None => {
                if graph.is_nested_in_aggregate(id) {
                    None
                } else {
                    Some(format!("{keyword} {}", self.anonymous_name(id)))
                }
            }
        }
    }
}

impl Referencer for Namer<'_>
{
    fn name_for(&mut self, t: Option<DieId>, kind: RefKind) -> Option<String>
    {
        self.name(t, kind)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::graph::{BaseEncoding, GraphBuilder, Language};

    #[test]
    fn test_sanitize_identifier()
    {
        assert_eq!(sanitize_identifier("plain_name", "_p_"), "plain_name");
        assert_eq!(sanitize_identifier("register", "_p_"), "_p_register");
        assert_eq!(sanitize_identifier("new", "_p_"), "_p_new");
        assert_eq!(sanitize_identifier("operator<", "_p_"), "operator_");
        assert_eq!(sanitize_identifier("3d", "_p_"), "_3d");
        assert_eq!(sanitize_identifier("", "_p_"), "_");
    }

    #[test]
    fn test_void_and_base_types()
    {
        let mut b = GraphBuilder::new();
        let unit = b.unit("a.c", Language::C99, 8);
        let ulong = b.base_type(unit, "long unsigned int", BaseEncoding::Unsigned, 8);
        let weird = b.base_type(unit, "__u64", BaseEncoding::Unsigned, 8);
        let graph = b.finish();

        let config = GeneratorConfig::default();
        let mut namer = Namer::new(&graph, &config);
        assert_eq!(namer.name(None, RefKind::Normal).as_deref(), Some("void"));
        assert_eq!(namer.name(Some(ulong), RefKind::Normal).as_deref(), Some("long unsigned int"));
        assert_eq!(namer.name(Some(weird), RefKind::Normal).as_deref(), Some("unsigned long"));

        let verbatim = GeneratorConfig::default().with_base_types(BaseTypeNaming::Verbatim);
        let mut namer = Namer::new(&graph, &verbatim);
        assert_eq!(namer.name(Some(weird), RefKind::Normal).as_deref(), Some("__u64"));
    }

    #[test]
    fn test_tagged_names()
    {
        let mut b = GraphBuilder::new();
        let unit = b.unit("a.c", Language::C99, 8);
        let named = b.aggregate(unit, Tag::UnionType, Some("value"), Some(8));
        let anon = b.aggregate(unit, Tag::StructureType, None, Some(8));
        let nested_anon = b.aggregate(named, Tag::StructureType, None, Some(8));
        let keyword = b.enumeration(unit, Some("default"), 4, None);
        let graph = b.finish();

        let config = GeneratorConfig::default();
        let mut namer = Namer::new(&graph, &config);
        assert_eq!(namer.name(Some(named), RefKind::Normal).as_deref(), Some("union value"));
        assert_eq!(
            namer.name(Some(anon), RefKind::Normal),
            Some(format!("struct _dwarfdecl_anon_{:x}", graph.offset(anon)))
        );
        assert_eq!(namer.name(Some(nested_anon), RefKind::Normal), None);
        assert_eq!(namer.name(Some(keyword), RefKind::Normal).as_deref(), Some("enum _dwarfdecl_default"));
    }

    #[test]
    fn test_nested_type_clashing_with_unit_level_type_is_renamed()
    {
        let mut b = GraphBuilder::new();
        let unit = b.unit("a.cc", Language::Cxx, 8);
        let outer = b.aggregate(unit, Tag::StructureType, Some("outer"), Some(4));
        let nested = b.aggregate(outer, Tag::StructureType, Some("entry"), Some(4));
        let toplevel = b.aggregate(unit, Tag::StructureType, Some("entry"), Some(8));
        let lonely = b.aggregate(outer, Tag::StructureType, Some("cursor"), Some(4));
        let graph = b.finish();

        let config = GeneratorConfig::default();
        let mut namer = Namer::new(&graph, &config);
        assert_eq!(namer.name(Some(toplevel), RefKind::Normal).as_deref(), Some("struct entry"));
        assert_eq!(
            namer.name(Some(nested), RefKind::Normal),
            Some(format!("struct _dwarfdecl_anon_{:x}", graph.offset(nested)))
        );
        assert_eq!(namer.name(Some(lonely), RefKind::Normal).as_deref(), Some("struct cursor"));
    }

    #[test]
    fn test_unnameable_shapes()
    {
        let mut b = GraphBuilder::new();
        let unit = b.unit("a.c", Language::C99, 8);
        let int = b.base_type(unit, "int", BaseEncoding::Signed, 4);
        let ptr = b.pointer(unit, Some(int));
        let arr = b.array(unit, Some(int), &[Some(4)]);
        let func = b.subprogram(unit, "f", Some(int));
        let graph = b.finish();

        let config = GeneratorConfig::default();
        let mut namer = Namer::new(&graph, &config);
        assert_eq!(namer.name(Some(ptr), RefKind::Normal), None);
        assert_eq!(namer.name(Some(arr), RefKind::TypeMustBeComplete), None);
        assert_eq!(namer.name(Some(func), RefKind::Normal), None);
        assert_eq!(namer.name(Some(func), RefKind::Defining).as_deref(), Some("f"));
    }
}
