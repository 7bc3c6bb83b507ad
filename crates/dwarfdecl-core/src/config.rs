//! # Generator Configuration
//!
//! Knobs that change the generated text without changing what gets generated:
//! output dialect, identifier prefixes, base type spellings and cosmetic
//! comments.
//!
//! ## Example
//!
//! ```rust
//! use dwarfdecl_core::config::{BaseTypeNaming, Dialect, GeneratorConfig};
//!
//! let config = GeneratorConfig::default()
//!     .with_dialect(Dialect::Cxx)
//!     .with_base_types(BaseTypeNaming::Verbatim)
//!     .with_group_comments(false);
//! assert_eq!(config.anonymous_prefix, "_dwarfdecl_anon_");
//! ```

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;

use crate::error::DeclError;
use crate::graph::BaseEncoding;

/// Output language.
///
/// The dialect only decides the default linkage: in `Cxx` output, functions
/// from C compile units are wrapped in `extern "C"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect
{
    #[default]
    C,
    Cxx,
}

impl FromStr for Dialect
{
    type Err = DeclError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "c" => Ok(Dialect::C),
            "c++" | "cxx" | "cpp" => Ok(Dialect::Cxx),
            _ => Err(DeclError::InvalidArgument(format!("Unknown dialect: {s}"))),
        }
    }
}

impl fmt::Display for Dialect
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Dialect::C => f.write_str("c"),
            Dialect::Cxx => f.write_str("c++"),
        }
    }
}

/// Known C spellings per base type shape (encoding, byte size).
///
/// The first spelling of each shape is canonical. A DWARF name that already
/// is one of the spellings is kept as-is, so `long unsigned int` survives
/// instead of being rewritten to `unsigned long`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseTypeTable
{
    spellings: IndexMap<(BaseEncoding, u64), Vec<String>>,
}

impl BaseTypeTable
{
    #[must_use]
    pub fn empty() -> Self
    {
        Self { spellings: IndexMap::new() }
    }

    /// Table for a typical LP64 C compiler (x86-64 / AArch64 Linux and macOS).
    #[must_use]
    pub fn lp64() -> Self
    {
        use BaseEncoding::{Boolean, ComplexFloat, Float, Signed, SignedChar, Unsigned, UnsignedChar};

        let mut table = Self::empty();
        table.insert(Boolean, 1, &["_Bool"]);
        table.insert(SignedChar, 1, &["char", "signed char"]);
        table.insert(UnsignedChar, 1, &["unsigned char", "char"]);
        table.insert(Signed, 1, &["signed char"]);
        table.insert(Unsigned, 1, &["unsigned char"]);
        table.insert(Signed, 2, &["short", "short int", "signed short", "short signed int"]);
        table.insert(Unsigned, 2, &["unsigned short", "short unsigned int", "unsigned short int"]);
        table.insert(Signed, 4, &["int", "signed int", "signed"]);
        table.insert(Unsigned, 4, &["unsigned int", "unsigned"]);
        table.insert(
            Signed,
            8,
            &["long", "long int", "signed long", "long signed int", "long long", "long long int"],
        );
        table.insert(
            Unsigned,
            8,
            &[
                "unsigned long",
                "long unsigned int",
                "unsigned long int",
                "unsigned long long",
                "long long unsigned int",
            ],
        );
        table.insert(Signed, 16, &["__int128"]);
        table.insert(Unsigned, 16, &["unsigned __int128", "__int128 unsigned"]);
        table.insert(Float, 4, &["float"]);
        table.insert(Float, 8, &["double"]);
        table.insert(Float, 16, &["long double"]);
        table.insert(ComplexFloat, 8, &["float _Complex", "complex float"]);
        table.insert(ComplexFloat, 16, &["double _Complex", "complex double"]);
        table.insert(ComplexFloat, 32, &["long double _Complex", "complex long double"]);
        table
    }

    /// Add (or replace) the spellings of one shape; the first is canonical.
    pub fn insert(&mut self, encoding: BaseEncoding, byte_size: u64, spellings: &[&str])
    {
        self.spellings
            .insert((encoding, byte_size), spellings.iter().map(|s| (*s).to_string()).collect());
    }

    /// The spelling to emit for a base type, if the shape is known.
    #[must_use]
    pub fn spelling(&self, encoding: BaseEncoding, byte_size: u64, dwarf_name: Option<&str>) -> Option<&str>
    {
        let known = self.spellings.get(&(encoding, byte_size))?;
        if let Some(name) = dwarf_name {
            if let Some(kept) = known.iter().find(|spelling| spelling.as_str() == name) {
                return Some(kept);
            }
        }
        known.first().map(String::as_str)
    }
}

impl Default for BaseTypeTable
{
    fn default() -> Self
    {
        Self::lp64()
    }
}

/// How base types are named in the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseTypeNaming
{
    /// Use the compiler's DWARF name
    Verbatim,
    /// Map (encoding, size) through a table of target spellings
    Abi(BaseTypeTable),
}

impl Default for BaseTypeNaming
{
    fn default() -> Self
    {
        BaseTypeNaming::Abi(BaseTypeTable::lp64())
    }
}

/// Configuration for one generator run.
#[derive(Debug, Clone)]
pub struct GeneratorConfig
{
    pub dialect: Dialect,
    /// Prefix of synthetic names given to anonymous or clashing types
    pub anonymous_prefix: String,
    /// Prefix applied to identifiers that collide with reserved words
    pub reserved_prefix: String,
    /// Type spelled for a formal parameter without a type edge
    pub untyped_argument_typename: String,
    /// Largest alignment tried when reproducing a member offset
    pub alignment_ceiling: u64,
    pub base_types: BaseTypeNaming,
    pub emit_fp_names: bool,
    pub group_comments: bool,
    pub offset_comments: bool,
}

impl Default for GeneratorConfig
{
    fn default() -> Self
    {
        Self {
            dialect: Dialect::default(),
            anonymous_prefix: "_dwarfdecl_anon_".to_string(),
            reserved_prefix: "_dwarfdecl_".to_string(),
            untyped_argument_typename: "void *".to_string(),
            alignment_ceiling: 1 << 30,
            base_types: BaseTypeNaming::default(),
            emit_fp_names: true,
            group_comments: true,
            offset_comments: true,
        }
    }
}

impl GeneratorConfig
{
    #[must_use]
    pub fn with_dialect(mut self, dialect: Dialect) -> Self
    {
        self.dialect = dialect;
        self
    }

    #[must_use]
    pub fn with_anonymous_prefix(mut self, prefix: impl Into<String>) -> Self
    {
        self.anonymous_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn with_reserved_prefix(mut self, prefix: impl Into<String>) -> Self
    {
        self.reserved_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn with_untyped_argument_typename(mut self, typename: impl Into<String>) -> Self
    {
        self.untyped_argument_typename = typename.into();
        self
    }

    #[must_use]
    pub fn with_alignment_ceiling(mut self, ceiling: u64) -> Self
    {
        self.alignment_ceiling = ceiling;
        self
    }

    #[must_use]
    pub fn with_base_types(mut self, naming: BaseTypeNaming) -> Self
    {
        self.base_types = naming;
        self
    }

    #[must_use]
    pub fn with_fp_names(mut self, enabled: bool) -> Self
    {
        self.emit_fp_names = enabled;
        self
    }

    #[must_use]
    pub fn with_group_comments(mut self, enabled: bool) -> Self
    {
        self.group_comments = enabled;
        self
    }

    #[must_use]
    pub fn with_offset_comments(mut self, enabled: bool) -> Self
    {
        self.offset_comments = enabled;
        self
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_dialect_from_str()
    {
        assert_eq!("C".parse::<Dialect>().ok(), Some(Dialect::C));
        assert_eq!("c++".parse::<Dialect>().ok(), Some(Dialect::Cxx));
        assert_eq!("cxx".parse::<Dialect>().ok(), Some(Dialect::Cxx));
        assert!("pascal".parse::<Dialect>().is_err());
    }

    #[test]
    fn test_lp64_keeps_known_spelling()
    {
        let table = BaseTypeTable::lp64();
        assert_eq!(
            table.spelling(BaseEncoding::Unsigned, 8, Some("long unsigned int")),
            Some("long unsigned int")
        );
        assert_eq!(table.spelling(BaseEncoding::Unsigned, 8, Some("size_t")), Some("unsigned long"));
        assert_eq!(table.spelling(BaseEncoding::Signed, 4, None), Some("int"));
    }

    #[test]
    fn test_unknown_shape_has_no_spelling()
    {
        let table = BaseTypeTable::lp64();
        assert_eq!(table.spelling(BaseEncoding::Float, 2, Some("_Float16")), None);
    }
}
