//! Bounds-checked PE header reads.
//!
//! The generic parser gives us imports and exports; the COFF header fields
//! and raw section table are read directly so that values are reported
//! exactly as stored (machine id, link timestamp, entry-point RVA).

/// IMAGE_FILE_EXECUTABLE_IMAGE
pub const CHARACTERISTIC_EXECUTABLE: u16 = 0x0002;
/// IMAGE_FILE_DLL
pub const CHARACTERISTIC_DLL: u16 = 0x2000;

const PE32_MAGIC: u16 = 0x10B;
const PE32_PLUS_MAGIC: u16 = 0x20B;
const SECTION_HEADER_SIZE: usize = 40;

/// One raw section header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSection {
    pub name: String,
    pub virtual_address: u32,
    pub virtual_size: u32,
    pub raw_ptr: u32,
    pub raw_size: u32,
}

/// Header fields read straight from the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeHeaders {
    pub machine: u16,
    pub time_date_stamp: u32,
    pub characteristics: u16,
    pub is_pe32_plus: bool,
    pub entry_rva: u32,
    pub sections: Vec<RawSection>,
}

impl PeHeaders {
    pub fn is_dll(&self) -> bool {
        self.characteristics & CHARACTERISTIC_DLL != 0
    }

    pub fn is_exe(&self) -> bool {
        self.characteristics & CHARACTERISTIC_EXECUTABLE != 0 && !self.is_dll()
    }
}

fn read_u16_le(data: &[u8], off: usize) -> Option<u16> {
    data.get(off..off.checked_add(2)?)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
}

fn read_u32_le(data: &[u8], off: usize) -> Option<u32> {
    data.get(off..off.checked_add(4)?)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

/// Read DOS, COFF and optional header fields plus the section table.
///
/// Returns None when the data is not a PE image. A section table that runs
/// past the end of the data is truncated rather than rejected.
pub fn read_headers(data: &[u8]) -> Option<PeHeaders> {
    if data.len() < 0x40 || &data[..2] != b"MZ" {
        return None;
    }
    let e_lfanew = read_u32_le(data, 0x3c)? as usize;
    let sig = data.get(e_lfanew..e_lfanew.checked_add(4)?)?;
    if sig != b"PE\0\0" {
        return None;
    }

    // COFF header
    let coff_off = e_lfanew + 4;
    let machine = read_u16_le(data, coff_off)?;
    let number_of_sections = read_u16_le(data, coff_off + 2)?;
    let time_date_stamp = read_u32_le(data, coff_off + 4)?;
    let size_of_optional_header = read_u16_le(data, coff_off + 16)?;
    let characteristics = read_u16_le(data, coff_off + 18)?;

    // Optional header
    let opt_off = coff_off + 20;
    let is_pe32_plus = match read_u16_le(data, opt_off) {
        Some(PE32_PLUS_MAGIC) => true,
        Some(PE32_MAGIC) => false,
        _ => return None,
    };
    let entry_rva = read_u32_le(data, opt_off + 16).unwrap_or(0);

    // Section headers
    let mut sections = Vec::with_capacity(number_of_sections as usize);
    let mut off = opt_off + size_of_optional_header as usize;
    for _ in 0..number_of_sections {
        let Some(hdr) = data.get(off..off + SECTION_HEADER_SIZE) else {
            break;
        };
        let nend = hdr[..8].iter().position(|&b| b == 0).unwrap_or(8);
        sections.push(RawSection {
            name: String::from_utf8_lossy(&hdr[..nend]).into_owned(),
            virtual_size: read_u32_le(hdr, 8).unwrap_or(0),
            virtual_address: read_u32_le(hdr, 12).unwrap_or(0),
            raw_size: read_u32_le(hdr, 16).unwrap_or(0),
            raw_ptr: read_u32_le(hdr, 20).unwrap_or(0),
        });
        off += SECTION_HEADER_SIZE;
    }

    Some(PeHeaders {
        machine,
        time_date_stamp,
        characteristics,
        is_pe32_plus,
        entry_rva,
        sections,
    })
}
