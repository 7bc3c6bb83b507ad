//! Tests for reading DWARF into a type graph

use std::collections::HashMap;

use dwarfdecl_core::config::GeneratorConfig;
use dwarfdecl_core::graph::{BaseEncoding, DieGraph, Language, Tag};
use dwarfdecl_core::loader::{load_from_dwarf, load_object};
use dwarfdecl_core::{generate, DeclError, InterfaceFilter};
use gimli::write::{AttributeValue, DwarfUnit, EndianVec, Expression, Sections, UnitEntryId};
use gimli::{constants, EndianSlice, Encoding, Format, LittleEndian, SectionId};

fn set_name(dwarf: &mut DwarfUnit, id: UnitEntryId, name: &str)
{
    dwarf
        .unit
        .get_mut(id)
        .set(constants::DW_AT_name, AttributeValue::String(name.as_bytes().to_vec()));
}

fn set_type(dwarf: &mut DwarfUnit, id: UnitEntryId, target: UnitEntryId)
{
    dwarf.unit.get_mut(id).set(constants::DW_AT_type, AttributeValue::UnitRef(target));
}

/// Serialize `dwarf` and read it back as a graph.
fn round_trip(mut dwarf: DwarfUnit) -> DieGraph
{
    let mut sections = Sections::new(EndianVec::new(LittleEndian));
    dwarf.write(&mut sections).unwrap();
    let mut bytes: HashMap<SectionId, Vec<u8>> = HashMap::new();
    sections
        .for_each(|id, data| {
            bytes.insert(id, data.slice().to_vec());
            Ok::<(), gimli::Error>(())
        })
        .unwrap();

    let read = gimli::Dwarf::load(|id| {
        let data = bytes.get(&id).map(Vec::as_slice).unwrap_or(&[]);
        Ok::<_, gimli::Error>(EndianSlice::new(data, LittleEndian))
    })
    .unwrap();
    load_from_dwarf(&read).unwrap()
}

/// `struct point { int x; int y; }; void move(struct point *p, ...);`
/// plus an enum and an array, as a C99 compiler would describe them.
fn sample_unit() -> DwarfUnit
{
    let encoding = Encoding {
        format: Format::Dwarf32,
        version: 4,
        address_size: 8,
    };
    let mut dwarf = DwarfUnit::new(encoding);
    let root = dwarf.unit.root();
    set_name(&mut dwarf, root, "shapes.c");
    dwarf
        .unit
        .get_mut(root)
        .set(constants::DW_AT_language, AttributeValue::Language(constants::DW_LANG_C99));

    let int = dwarf.unit.add(root, constants::DW_TAG_base_type);
    set_name(&mut dwarf, int, "int");
    let entry = dwarf.unit.get_mut(int);
    entry.set(constants::DW_AT_encoding, AttributeValue::Encoding(constants::DW_ATE_signed));
    entry.set(constants::DW_AT_byte_size, AttributeValue::Data1(4));

    let point = dwarf.unit.add(root, constants::DW_TAG_structure_type);
    set_name(&mut dwarf, point, "point");
    dwarf.unit.get_mut(point).set(constants::DW_AT_byte_size, AttributeValue::Data1(8));

    let x = dwarf.unit.add(point, constants::DW_TAG_member);
    set_name(&mut dwarf, x, "x");
    set_type(&mut dwarf, x, int);
    dwarf
        .unit
        .get_mut(x)
        .set(constants::DW_AT_data_member_location, AttributeValue::Data1(0));

    let y = dwarf.unit.add(point, constants::DW_TAG_member);
    set_name(&mut dwarf, y, "y");
    set_type(&mut dwarf, y, int);
    let mut location = Expression::new();
    location.op_plus_uconst(4);
    dwarf
        .unit
        .get_mut(y)
        .set(constants::DW_AT_data_member_location, AttributeValue::Exprloc(location));

    let ptr = dwarf.unit.add(root, constants::DW_TAG_pointer_type);
    set_type(&mut dwarf, ptr, point);
    dwarf.unit.get_mut(ptr).set(constants::DW_AT_byte_size, AttributeValue::Data1(8));

    let mode = dwarf.unit.add(root, constants::DW_TAG_enumeration_type);
    set_name(&mut dwarf, mode, "mode");
    set_type(&mut dwarf, mode, int);
    dwarf.unit.get_mut(mode).set(constants::DW_AT_byte_size, AttributeValue::Data1(4));
    for (name, value) in [("MODE_OFF", -1i64), ("MODE_ON", 1)] {
        let e = dwarf.unit.add(mode, constants::DW_TAG_enumerator);
        set_name(&mut dwarf, e, name);
        dwarf.unit.get_mut(e).set(constants::DW_AT_const_value, AttributeValue::Sdata(value));
    }

    let triple = dwarf.unit.add(root, constants::DW_TAG_array_type);
    set_type(&mut dwarf, triple, int);
    let range = dwarf.unit.add(triple, constants::DW_TAG_subrange_type);
    dwarf.unit.get_mut(range).set(constants::DW_AT_upper_bound, AttributeValue::Data1(2));

    let func = dwarf.unit.add(root, constants::DW_TAG_subprogram);
    set_name(&mut dwarf, func, "move");
    let entry = dwarf.unit.get_mut(func);
    entry.set(constants::DW_AT_external, AttributeValue::Flag(true));
    entry.set(constants::DW_AT_prototyped, AttributeValue::Flag(true));
    let p = dwarf.unit.add(func, constants::DW_TAG_formal_parameter);
    set_name(&mut dwarf, p, "p");
    set_type(&mut dwarf, p, ptr);
    let m = dwarf.unit.add(func, constants::DW_TAG_formal_parameter);
    set_name(&mut dwarf, m, "m");
    set_type(&mut dwarf, m, mode);
    dwarf.unit.add(func, constants::DW_TAG_unspecified_parameters);

    let helper = dwarf.unit.add(root, constants::DW_TAG_subprogram);
    set_name(&mut dwarf, helper, "helper");
    let p = dwarf.unit.add(helper, constants::DW_TAG_formal_parameter);
    set_type(&mut dwarf, p, triple);

    dwarf
}

#[test]
fn test_units_and_entries_are_loaded()
{
    let graph = round_trip(sample_unit());

    let units: Vec<_> = graph.units().collect();
    assert_eq!(units.len(), 1);
    let unit = &graph[units[0]];
    assert_eq!(unit.tag, Tag::CompileUnit);
    assert_eq!(unit.name.as_deref(), Some("shapes.c"));
    assert_eq!(unit.language, Some(Language::C99));
    assert_eq!(unit.address_size, Some(8));

    let int = graph.toplevel().find(|&id| graph.tag(id) == Tag::BaseType).unwrap();
    assert_eq!(graph[int].encoding, Some(BaseEncoding::Signed));
    assert_eq!(graph[int].byte_size, Some(4));
    assert_eq!(graph.by_offset(graph.offset(int)), Some(int));
}

#[test]
fn test_member_locations_and_type_refs()
{
    let graph = round_trip(sample_unit());

    let point = graph
        .toplevel()
        .find(|&id| graph.tag(id) == Tag::StructureType)
        .unwrap();
    let members: Vec<_> = graph.members(point).collect();
    assert_eq!(members.len(), 2);
    let offsets: Vec<_> = members
        .iter()
        .map(|&m| graph[m].location.as_ref().and_then(|loc| loc.evaluate()))
        .collect();
    assert_eq!(offsets, vec![Some(0), Some(4)]);
    for &m in &members {
        let ty = graph.find_type(m).unwrap();
        assert_eq!(graph.name(ty), Some("int"));
    }
    assert_eq!(graph.calculate_byte_size(Some(point)), Some(8));
}

#[test]
fn test_enumerators_and_bounds()
{
    let graph = round_trip(sample_unit());

    let mode = graph
        .toplevel()
        .find(|&id| graph.tag(id) == Tag::EnumerationType)
        .unwrap();
    let values: Vec<_> = graph
        .children_tagged(mode, Tag::Enumerator)
        .map(|e| graph[e].const_value)
        .collect();
    assert_eq!(values, vec![Some(-1), Some(1)]);

    let triple = graph.toplevel().find(|&id| graph.tag(id) == Tag::ArrayType).unwrap();
    assert_eq!(graph.array_dimensions(triple).as_slice(), &[Some(3)]);
    assert_eq!(graph.calculate_byte_size(Some(triple)), Some(12));
}

#[test]
fn test_loaded_graph_generates_header()
{
    let graph = round_trip(sample_unit());
    let config = GeneratorConfig::default().with_group_comments(false);
    let header = generate(&graph, &config, &InterfaceFilter::default()).unwrap().render();

    assert!(header.contains("struct point;\n"));
    assert!(header.contains("struct point {\n    int x; // offset: 0\n    int y; // offset: 4\n};\n"));
    assert!(header.contains("enum mode {\n    MODE_OFF = -1,\n    MODE_ON = 1\n};\n"));
    assert!(header.contains("void move(struct point *p, enum mode m, ...);\n"));
    // Not external.
    assert!(!header.contains("helper"));
}

#[test]
fn test_garbage_is_not_an_object_file()
{
    match load_object(b"definitely not an object file") {
        Err(DeclError::Object(_)) => {}
        other => panic!("Expected an object error, got {other:?}"),
    }
}
