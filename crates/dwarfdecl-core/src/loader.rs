//! DWARF loading: object file → [`DieGraph`].

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use gimli::{
    constants, Attribute, AttributeValue, DebuggingInformationEntry, Dwarf, EndianArcSlice, EntriesTreeNode,
    Expression, Operation, Reader, RunTimeEndian, SectionId, Unit,
};
use object::{Object, ObjectSection};
use tracing::{debug, warn};

use crate::error::{map_dwarf_error, DeclError, Result};
use crate::graph::{
    BaseEncoding, DieGraph, DieId, GraphBuilder, Language, LocationExpr, LocationOp, Tag, Visibility,
};

pub type OwnedReader = EndianArcSlice<RunTimeEndian>;

/// Section names and the aliases they go by (Mach-O uses `__debug_*`).
const DWARF_SECTIONS: &[(&str, &[&str])] = &[
    (".debug_abbrev", &[".debug_abbrev", "__debug_abbrev"]),
    (".debug_addr", &[".debug_addr", "__debug_addr"]),
    (".debug_info", &[".debug_info", "__debug_info"]),
    (".debug_line", &[".debug_line", "__debug_line"]),
    (".debug_line_str", &[".debug_line_str", "__debug_line_str"]),
    (".debug_ranges", &[".debug_ranges", "__debug_ranges"]),
    (".debug_rnglists", &[".debug_rnglists", "__debug_rnglists"]),
    (".debug_str", &[".debug_str", "__debug_str"]),
    (".debug_str_offsets", &[".debug_str_offsets", "__debug_str_offsets"]),
    (".debug_loc", &[".debug_loc", "__debug_loc"]),
    (".debug_loclists", &[".debug_loclists", "__debug_loclists"]),
];

fn load_section_bytes(file: &object::File<'_>, names: &[&str]) -> Result<Arc<[u8]>>
{
    for name in names {
        if let Some(section) = file.section_by_name(name) {
            let data = section
                .uncompressed_data()
                .map_err(|err| DeclError::Object(format!("failed to read {name}: {err}")))?;
            return Ok(match data {
                Cow::Borrowed(bytes) => Arc::<[u8]>::from(bytes.to_vec()),
                Cow::Owned(vec) => vec.into(),
            });
        }
    }

    Ok(Arc::<[u8]>::from(Vec::new()))
}

/// Load the type graph of the object file at `path`.
///
/// ## Errors
///
/// I/O errors reading the file, [`DeclError::Object`] when it is not a
/// supported object format, [`DeclError::Dwarf`] for malformed DWARF.
pub fn load_file(path: &Path) -> Result<DieGraph>
{
    let bytes = fs::read(path)?;
    debug!("Loading DWARF from {} ({} bytes)", path.display(), bytes.len());
    load_object(&bytes)
}

/// Load the type graph of an in-memory ELF, Mach-O or PE image.
///
/// ## Errors
///
/// Same as [`load_file`], minus I/O.
pub fn load_object(data: &[u8]) -> Result<DieGraph>
{
    let file = object::File::parse(data).map_err(|err| DeclError::Object(err.to_string()))?;
    let endian = if file.is_little_endian() {
        RunTimeEndian::Little
    } else {
        RunTimeEndian::Big
    };

    let mut sections: HashMap<&'static str, Arc<[u8]>> = HashMap::new();
    for (canonical, aliases) in DWARF_SECTIONS {
        sections.insert(canonical, load_section_bytes(&file, aliases)?);
    }
    if sections.get(".debug_info").is_none_or(|bytes| bytes.is_empty()) {
        return Err(DeclError::InvalidArgument("no .debug_info section found".to_string()));
    }

    let empty: Arc<[u8]> = Arc::from(Vec::new());
    let dwarf = Dwarf::load(|id: SectionId| {
        let bytes = sections.get(id.name()).cloned().unwrap_or_else(|| empty.clone());
        Ok::<_, gimli::Error>(OwnedReader::new(bytes, endian))
    })
    .map_err(|err| map_dwarf_error("loading DWARF sections", err))?;

    load_from_dwarf(&dwarf)
}

/// Build a graph from already-loaded DWARF sections.
///
/// Every `.debug_info` unit is read; type units are not.
///
/// ## Errors
///
/// [`DeclError::Dwarf`] for malformed DWARF.
pub fn load_from_dwarf<R>(dwarf: &Dwarf<R>) -> Result<DieGraph>
where
    R: Reader<Offset = usize>,
{
    let mut loader = Loader {
        dwarf,
        builder: GraphBuilder::new(),
        by_offset: HashMap::new(),
        type_refs: Vec::new(),
    };

    let mut headers = dwarf.units();
    while let Some(header) = headers
        .next()
        .map_err(|err| map_dwarf_error("reading .debug_info unit header", err))?
    {
        let unit = dwarf
            .unit(header)
            .map_err(|err| map_dwarf_error("parsing compilation unit", err))?;
        loader.load_unit(&unit)?;
    }

    loader.resolve_type_refs();
    let graph = loader.builder.finish();
    debug!("Loaded {} DWARF entries", graph.len());
    Ok(graph)
}

struct Loader<'d, R: Reader<Offset = usize>>
{
    dwarf: &'d Dwarf<R>,
    builder: GraphBuilder,
    by_offset: HashMap<u64, DieId>,
    /// `(die, .debug_info offset of its DW_AT_type)`, resolved once all units are in
    type_refs: Vec<(DieId, u64)>,
}

impl<R: Reader<Offset = usize>> Loader<'_, R>
{
    fn load_unit(&mut self, unit: &Unit<R>) -> Result<()>
    {
        let mut tree = unit
            .entries_tree(None)
            .map_err(|err| map_dwarf_error("building unit tree", err))?;
        let root = tree.root().map_err(|err| map_dwarf_error("navigating unit root", err))?;
        let parent = self.builder.root();
        self.load_node(unit, root, parent)
    }

    fn load_node(&mut self, unit: &Unit<R>, node: EntriesTreeNode<'_, '_, '_, R>, parent: DieId) -> Result<()>
    {
        let id = {
            let entry = node.entry();
            let Some(offset) = entry.offset().to_debug_info_offset(&unit.header) else {
                return Ok(());
            };
            let offset = offset.0 as u64;
            let id = self.builder.add_at(parent, Tag::from_dwarf(entry.tag()), offset);
            self.by_offset.insert(offset, id);
            self.read_attributes(unit, entry, id)?;
            id
        };

        let mut children = node.children();
        while let Some(child) = children
            .next()
            .map_err(|err| map_dwarf_error("iterating DIE children", err))?
        {
            self.load_node(unit, child, id)?;
        }
        Ok(())
    }

    fn read_attributes(&mut self, unit: &Unit<R>, entry: &DebuggingInformationEntry<'_, '_, R>, id: DieId) -> Result<()>
    {
        let mut attrs = entry.attrs();
        while let Some(attr) = attrs
            .next()
            .map_err(|err| map_dwarf_error("reading DIE attributes", err))?
        {
            self.read_attribute(unit, &attr, id)?;
        }

        if self.builder.die_mut(id).tag == Tag::CompileUnit {
            self.builder.die_mut(id).address_size = Some(unit.encoding().address_size);
        }
        Ok(())
    }

    fn read_attribute(&mut self, unit: &Unit<R>, attr: &Attribute<R>, id: DieId) -> Result<()>
    {
        match attr.name() {
            constants::DW_AT_name => {
                let name = self.attr_to_string(unit, attr.value())?;
                self.builder.die_mut(id).name = Some(name);
            }
            constants::DW_AT_type => match attr.value() {
                AttributeValue::UnitRef(offset) => match offset.to_debug_info_offset(&unit.header) {
                    Some(target) => self.type_refs.push((id, target.0 as u64)),
                    None => warn!("Type reference outside .debug_info at entry {id}"),
                },
                AttributeValue::DebugInfoRef(offset) => self.type_refs.push((id, offset.0 as u64)),
                other => warn!("Unsupported DW_AT_type form {:?} at entry {id}", other),
            },
            constants::DW_AT_byte_size => self.builder.die_mut(id).byte_size = attr.udata_value(),
            constants::DW_AT_bit_size => self.builder.die_mut(id).bit_size = attr.udata_value(),
            constants::DW_AT_data_bit_offset => self.builder.die_mut(id).data_bit_offset = attr.udata_value(),
            constants::DW_AT_data_member_location => {
                let location = self.member_location(unit, attr.value())?;
                self.builder.die_mut(id).location = Some(location);
            }
            constants::DW_AT_declaration => {
                self.builder.die_mut(id).declaration = matches!(attr.value(), AttributeValue::Flag(true));
            }
            constants::DW_AT_external => {
                self.builder.die_mut(id).external = matches!(attr.value(), AttributeValue::Flag(true));
            }
            constants::DW_AT_prototyped => {
                self.builder.die_mut(id).prototyped = matches!(attr.value(), AttributeValue::Flag(true));
            }
            constants::DW_AT_visibility => {
                if let AttributeValue::Visibility(vis) = attr.value() {
                    self.builder.die_mut(id).visibility = match vis {
                        constants::DW_VIS_local => Some(Visibility::Local),
                        constants::DW_VIS_exported => Some(Visibility::Exported),
                        constants::DW_VIS_qualified => Some(Visibility::Qualified),
                        _ => None,
                    };
                }
            }
            constants::DW_AT_calling_convention => {
                if let AttributeValue::CallingConvention(cc) = attr.value() {
                    self.builder.die_mut(id).calling_convention = Some(cc.0);
                }
            }
            constants::DW_AT_encoding => {
                if let AttributeValue::Encoding(ate) = attr.value() {
                    self.builder.die_mut(id).encoding = Some(BaseEncoding::from_dwarf(ate));
                }
            }
            constants::DW_AT_language => {
                if let AttributeValue::Language(lang) = attr.value() {
                    self.builder.die_mut(id).language = Some(Language::from_dwarf(lang));
                }
            }
            constants::DW_AT_const_value => self.builder.die_mut(id).const_value = attribute_to_i64(attr),
            constants::DW_AT_lower_bound => self.builder.die_mut(id).lower_bound = attribute_to_i64(attr),
            constants::DW_AT_upper_bound => self.builder.die_mut(id).upper_bound = attribute_to_i64(attr),
            constants::DW_AT_count => self.builder.die_mut(id).count = attr.udata_value(),
            _ => {}
        }
        Ok(())
    }

    fn member_location(&self, unit: &Unit<R>, value: AttributeValue<R>) -> Result<LocationExpr>
    {
        let expression = match value {
            AttributeValue::Exprloc(expr) => expr,
            AttributeValue::Block(data) => Expression(data),
            other => {
                let Some(offset) = other.udata_value() else {
                    return Ok(LocationExpr::from_ops([LocationOp::Unsupported]));
                };
                return Ok(LocationExpr::offset(offset));
            }
        };

        let mut ops = Vec::new();
        let mut iter = expression.operations(unit.encoding());
        while let Some(op) = iter
            .next()
            .map_err(|err| map_dwarf_error("decoding member location", err))?
        {
            ops.push(match op {
                Operation::UnsignedConstant { value } => LocationOp::Constu(value),
                Operation::PlusConstant { value } => LocationOp::PlusUconst(value),
                Operation::Plus => LocationOp::Plus,
                _ => LocationOp::Unsupported,
            });
        }
        Ok(LocationExpr::from_ops(ops))
    }

    fn attr_to_string(&self, unit: &Unit<R>, value: AttributeValue<R>) -> Result<String>
    {
        let reader = self
            .dwarf
            .attr_string(unit, value)
            .map_err(|err| map_dwarf_error("resolving DWARF string", err))?;
        let owned = match reader.to_string() {
            Ok(cow) => cow.into_owned(),
            Err(_) => reader
                .to_string_lossy()
                .map_err(|err| map_dwarf_error("decoding DWARF string", err))?
                .into_owned(),
        };
        Ok(owned)
    }

    fn resolve_type_refs(&mut self)
    {
        for (id, target) in std::mem::take(&mut self.type_refs) {
            match self.by_offset.get(&target) {
                Some(resolved) => self.builder.set_type(id, Some(*resolved)),
                None => warn!("Unresolved type reference to 0x{target:x} at entry {id}; treating as void"),
            }
        }
    }
}

fn attribute_to_i64<R: Reader>(attr: &Attribute<R>) -> Option<i64>
{
    match attr.value() {
        AttributeValue::Sdata(value) => Some(value),
        AttributeValue::Udata(value) => i64::try_from(value).ok(),
        _ => attr
            .udata_value()
            .and_then(|value| i64::try_from(value).ok())
            .or_else(|| attr.sdata_value()),
    }
}
