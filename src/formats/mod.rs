//! Container-format structural parse.
//!
//! PE, ELF and Mach-O go through the `object` crate; PE header fields are
//! additionally read raw from [`pe`]. Anything the parser does not
//! recognize, or panics on, becomes a [`StructureAnalysis::ParseError`].

pub mod pe;

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

use chrono::{DateTime, Utc};
use object::read::{Object, ObjectSection};
use object::{BinaryFormat, ObjectKind};
use tracing::{debug, warn};

use crate::core::static_report::{BinaryStructure, ImportedLibrary, SectionInfo, StructureAnalysis};
use crate::entropy::entropy_range;

/// Parse the container structure of `data`. Never panics.
pub fn parse_structure(data: &[u8]) -> StructureAnalysis {
    match catch_unwind(AssertUnwindSafe(|| parse_inner(data))) {
        Ok(Ok(structure)) => {
            debug!(
                format = %structure.format,
                sections = structure.sections.len(),
                imports = structure.import_count(),
                "parsed container"
            );
            StructureAnalysis::Parsed(structure)
        }
        Ok(Err(msg)) => {
            debug!(error = %msg, "container not parsed");
            StructureAnalysis::ParseError(msg)
        }
        Err(_) => {
            warn!("panic in container parser");
            StructureAnalysis::ParseError("panic in container parser".into())
        }
    }
}

fn parse_inner(data: &[u8]) -> Result<BinaryStructure, String> {
    if data.is_empty() {
        return Err("empty input".into());
    }
    let obj = object::read::File::parse(data)
        .map_err(|e| format!("unrecognized or malformed container: {e}"))?;

    let mut anomalies = Vec::new();
    let imports = collect_imports(&obj, &mut anomalies);
    let exports = collect_exports(&obj, &mut anomalies);

    let structure = match obj.format() {
        BinaryFormat::Pe => {
            let headers = pe::read_headers(data)
                .ok_or_else(|| "PE headers could not be read".to_string())?;
            let sections = headers
                .sections
                .iter()
                .map(|s| {
                    let start = s.raw_ptr as usize;
                    SectionInfo {
                        name: s.name.clone(),
                        virtual_address: s.virtual_address as u64,
                        virtual_size: s.virtual_size as u64,
                        raw_size: s.raw_size as u64,
                        entropy: entropy_range(data, start..start.saturating_add(s.raw_size as usize)),
                    }
                })
                .collect();
            BinaryStructure {
                format: "PE".into(),
                machine: format!("{:#x}", headers.machine),
                compile_time: timestamp(headers.time_date_stamp as i64),
                entry_point: headers.entry_rva as u64,
                sections,
                imports,
                exports,
                is_dll: headers.is_dll(),
                is_exe: headers.is_exe(),
                anomalies,
            }
        }
        format => {
            let kind = obj.kind();
            let entry = obj.entry();
            let is_exe = kind == ObjectKind::Executable || (kind == ObjectKind::Dynamic && entry != 0);
            BinaryStructure {
                format: format!("{format:?}"),
                machine: format!("{:?}", obj.architecture()),
                compile_time: None,
                entry_point: entry,
                sections: generic_sections(&obj, data),
                imports,
                exports,
                is_dll: kind == ObjectKind::Dynamic && !is_exe,
                is_exe,
                anomalies,
            }
        }
    };
    Ok(structure)
}

fn timestamp(secs: i64) -> Option<DateTime<Utc>> {
    if secs == 0 {
        return None;
    }
    DateTime::<Utc>::from_timestamp(secs, 0)
}

fn generic_sections(obj: &object::read::File<'_>, data: &[u8]) -> Vec<SectionInfo> {
    obj.sections()
        .map(|s| {
            let (raw_size, entropy) = match s.file_range() {
                Some((off, size)) => {
                    let start = usize::try_from(off).unwrap_or(usize::MAX);
                    let len = usize::try_from(size).unwrap_or(usize::MAX);
                    (size, entropy_range(data, start..start.saturating_add(len)))
                }
                None => (0, 0.0),
            };
            SectionInfo {
                name: s.name().unwrap_or("").to_string(),
                virtual_address: s.address(),
                virtual_size: s.size(),
                raw_size,
                entropy,
            }
        })
        .collect()
}

fn collect_imports(obj: &object::read::File<'_>, anomalies: &mut Vec<String>) -> Vec<ImportedLibrary> {
    match obj.imports() {
        Ok(imports) => group_imports(imports.iter().map(|imp| {
            (
                String::from_utf8_lossy(imp.library()).into_owned(),
                String::from_utf8_lossy(imp.name()).into_owned(),
            )
        })),
        Err(e) => {
            anomalies.push(format!("import table: {e}"));
            Vec::new()
        }
    }
}

/// Group `(library, symbol)` pairs by library, keeping first-appearance
/// order for both libraries and symbols.
///
/// ELF and Mach-O dynamic symbols are not tied to a library, so they all land
/// under the empty library name. That bucket is always placed last.
fn group_imports<I>(pairs: I) -> Vec<ImportedLibrary>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut libs: Vec<ImportedLibrary> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for (library, name) in pairs {
        let i = *index.entry(library.clone()).or_insert_with(|| {
            libs.push(ImportedLibrary {
                library,
                symbols: Vec::new(),
            });
            libs.len() - 1
        });
        if !name.is_empty() {
            libs[i].symbols.push(name);
        }
    }
    if let Some(i) = libs.iter().position(|l| l.library.is_empty()) {
        let unattributed = libs.remove(i);
        libs.push(unattributed);
    }
    libs
}

fn collect_exports(obj: &object::read::File<'_>, anomalies: &mut Vec<String>) -> Vec<String> {
    match obj.exports() {
        Ok(exps) => exps
            .iter()
            .map(|e| String::from_utf8_lossy(e.name()).into_owned())
            .filter(|n| !n.is_empty())
            .collect(),
        Err(e) => {
            anomalies.push(format!("export table: {e}"));
            Vec::new()
        }
    }
}
