//! Tests for error handling

use dwarfdecl_core::config::Dialect;
use dwarfdecl_core::error::{DeclError, Result};
use dwarfdecl_core::graph::{GraphBuilder, Language, Tag};
use dwarfdecl_core::StuckReport;

#[test]
fn test_unnameable_display()
{
    let error = DeclError::Unnameable {
        offset: 0x2d,
        tag: Tag::BaseType,
    };
    let message = format!("{}", error);
    assert!(message.contains("0x2d"));
    assert!(message.contains("BaseType"));
}

#[test]
fn test_stuck_display_counts_pending()
{
    let report = StuckReport {
        pending: vec!["def_of_0x10".to_string(), "def_of_0x20".to_string()],
        edges: vec![
            ("def_of_0x10".to_string(), "def_of_0x20".to_string()),
            ("def_of_0x20".to_string(), "def_of_0x10".to_string()),
        ],
    };
    let message = format!("{}", DeclError::Stuck(report.clone()));
    assert!(message.contains("2 pending"));
    assert_eq!(
        format!("{}", report),
        "digraph stuck_with_order_constraints {\n    def_of_0x10 -> def_of_0x20;\n    def_of_0x20 -> def_of_0x10;\n}"
    );
}

#[test]
fn test_io_error_conversion()
{
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.o");
    let error: DeclError = io_error.into();
    match error {
        DeclError::Io(_) => {}
        _ => panic!("Expected Io variant"),
    }
}

#[test]
fn test_invalid_dialect()
{
    let result: std::result::Result<Dialect, DeclError> = "fortran".parse();
    match result {
        Err(DeclError::InvalidArgument(message)) => assert!(message.contains("fortran")),
        other => panic!("Expected InvalidArgument, got {other:?}"),
    }
}

#[test]
fn test_unnamed_typedef_is_reported_with_its_offset()
{
    let mut b = GraphBuilder::new();
    let unit = b.unit("bad.c", Language::C99, 8);
    let anon_typedef = b.wrap(unit, Tag::Typedef, None);
    let func = b.subprogram(unit, "use_it", None);
    b.parameter(func, Some("v"), Some(anon_typedef));
    let graph = b.finish();

    let result: Result<_> = dwarfdecl_core::generate(
        &graph,
        &dwarfdecl_core::GeneratorConfig::default(),
        &dwarfdecl_core::InterfaceFilter::default(),
    );
    match result {
        Err(DeclError::Unnameable { offset, tag }) => {
            assert_eq!(offset, graph.offset(anon_typedef));
            assert_eq!(tag, Tag::Typedef);
        }
        other => panic!("Expected Unnameable, got {other:?}"),
    }
}
