//! # Error Types
//!
//! General error handling for declaration generation.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.
//!
//! Only conditions that make the output untrustworthy are errors. Layout
//! irregularities, indeterminate layouts and duplicate names are recovered
//! locally: they show up as comments in the generated text and as `warn!`
//! events, never as a `DeclError`.

use thiserror::Error;

use crate::graph::Tag;
use crate::schedule::StuckReport;

/// Main error type for graph loading and declaration generation
///
/// ## Error Categories
///
/// 1. **Generator invariants**: Unnameable, MissingFragment
/// 2. **Scheduling**: Stuck (a dependency cycle with no forward-declaration escape)
/// 3. **Input errors**: Dwarf, Object, InvalidArgument
/// 4. **I/O errors**: Io
#[derive(Error, Debug)]
pub enum DeclError
{
    /// A type reached the declarator generator but no name could be produced for it
    ///
    /// This should not happen for well-formed input. It means a node that must
    /// be referred to by name (a base type the ABI table does not know, a typedef
    /// without a name, ...) slipped through. The run is aborted because any
    /// output produced from here would not compile.
    #[error("No usable name for {tag:?} at 0x{offset:x}")]
    Unnameable
    {
        /// Section offset of the offending node
        offset: u64,
        /// Tag of the offending node
        tag: Tag,
    },

    /// The emission phase stopped making progress
    ///
    /// Every remaining fragment waits on at least one fragment that has not been
    /// emitted. The report carries the remaining dependency edges in a format a
    /// graph viewer understands.
    #[error("Scheduler stuck with {} pending fragment(s)", .0.pending.len())]
    Stuck(StuckReport),

    /// A dependency edge points at an item for which no fragment was generated
    #[error("No fragment generated for depended-on item {0}")]
    MissingFragment(String),

    /// Failure while decoding DWARF
    #[error("DWARF error while {context}: {message}")]
    Dwarf
    {
        /// What the loader was doing
        context: String,
        /// The underlying gimli error, rendered
        message: String,
    },

    /// The input file is not an object file we can read
    #[error("Object file error: {0}")]
    Object(String),

    /// Invalid argument passed to a generator function
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// I/O error (reading the input binary, writing the header, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeclError
{
    pub(crate) fn unnameable(offset: u64, tag: Tag) -> Self
    {
        DeclError::Unnameable { offset, tag }
    }
}

/// Map a gimli DWARF error to a `DeclError` with context.
pub(crate) fn map_dwarf_error(context: &str, err: gimli::Error) -> DeclError
{
    DeclError::Dwarf {
        context: context.to_string(),
        message: err.to_string(),
    }
}

/// Convenience type alias for `Result<T, DeclError>`
///
/// ```rust
/// use dwarfdecl_core::error::Result;
/// fn foo() -> Result<()>
/// {
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, DeclError>;
