//! The first 64 bytes of a story file: fixed-offset fields describing the
//! story's structure. These never move once the game is compiled, so the
//! header is parsed once and treated as a read-only snapshot; the mutable
//! capability bits (flags 1/2, screen dimensions) live in `Memory` directly
//! and are refreshed through `Config` (see `config.rs`).

use std::fmt;

/// Header offsets, per the Z-Machine Standard.
pub mod offset {
    pub const VERSION: u32 = 0x00;
    pub const FLAGS1: u32 = 0x01;
    pub const RELEASE: u32 = 0x02;
    pub const HIGH_MEM_BASE: u32 = 0x04;
    pub const INITIAL_PC: u32 = 0x06;
    pub const DICTIONARY: u32 = 0x08;
    pub const OBJECT_TABLE: u32 = 0x0a;
    pub const GLOBAL_VARIABLES: u32 = 0x0c;
    pub const STATIC_MEM_BASE: u32 = 0x0e;
    pub const FLAGS2: u32 = 0x10;
    pub const SERIAL: u32 = 0x12;
    pub const ABBREV_TABLE: u32 = 0x18;
    pub const FILE_LENGTH: u32 = 0x1a;
    pub const CHECKSUM: u32 = 0x1c;
    pub const INTERPRETER_NUMBER: u32 = 0x1e;
    pub const SCREEN_HEIGHT_LINES: u32 = 0x20;
    pub const SCREEN_WIDTH_CHARS: u32 = 0x21;
    pub const SCREEN_WIDTH_UNITS: u32 = 0x22;
    pub const SCREEN_HEIGHT_UNITS: u32 = 0x24;
    pub const TERMINATING_CHARS_TABLE: u32 = 0x2e;
    pub const STANDARD_REVISION: u32 = 0x32;
}

/// Flags 1, bit 1: v3 status-line style (0 = score/moves, 1 = time).
pub const FLAGS1_V3_TIME_GAME: u8 = 1 << 1;
/// Flags 2, bit 0: transcript is on.
pub const FLAGS2_TRANSCRIPT: u16 = 1 << 0;
/// Flags 2, bit 1: fixed-pitch font forced.
pub const FLAGS2_FIXED_PITCH: u16 = 1 << 1;

#[derive(Debug, Clone)]
pub struct Header {
    pub version: u8,
    pub release: u16,
    pub serial: [u8; 6],
    pub high_mem_base: u16,
    pub static_mem_base: u16,
    pub initial_pc: u16,
    pub dictionary: u16,
    pub object_table_addr: u16,
    pub global_variables: u16,
    pub abbrev_table: u16,
    pub file_length: usize,
    pub checksum: u16,
    pub standard_revision: u16,
    pub terminating_chars_table: u16,
}

impl Header {
    pub fn parse(bytes: &[u8]) -> Self {
        let version = bytes[offset::VERSION as usize];
        let word = |o: u32| {
            let o = o as usize;
            ((bytes[o] as u16) << 8) | (bytes[o + 1] as u16)
        };
        let mut serial = [0u8; 6];
        serial.copy_from_slice(&bytes[offset::SERIAL as usize..offset::SERIAL as usize + 6]);

        let file_length_field = word(offset::FILE_LENGTH) as usize;
        let file_length = if version <= 3 {
            file_length_field * 2
        } else {
            file_length_field * 4
        };

        Header {
            version,
            release: word(offset::RELEASE),
            serial,
            high_mem_base: word(offset::HIGH_MEM_BASE),
            static_mem_base: word(offset::STATIC_MEM_BASE),
            initial_pc: word(offset::INITIAL_PC),
            dictionary: word(offset::DICTIONARY),
            object_table_addr: word(offset::OBJECT_TABLE),
            global_variables: word(offset::GLOBAL_VARIABLES),
            abbrev_table: word(offset::ABBREV_TABLE),
            file_length,
            checksum: word(offset::CHECKSUM),
            standard_revision: word(offset::STANDARD_REVISION),
            terminating_chars_table: if version >= 5 {
                word(offset::TERMINATING_CHARS_TABLE)
            } else {
                0
            },
        }
    }

    pub fn serial_string(&self) -> String {
        self.serial.iter().map(|&b| b as char).collect()
    }

    /// True for the versions this core interprets (3, 4, 5).
    pub fn is_supported_version(&self) -> bool {
        matches!(self.version, 3 | 4 | 5)
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Z-code version:           {}\n\
             Release number:           {}\n\
             Serial number:            {}\n\
             High memory base:         {:#06x}\n\
             Static memory base:       {:#06x}\n\
             Initial PC:               {:#06x}\n\
             Dictionary address:       {:#06x}\n\
             Object table address:     {:#06x}\n\
             Global variables address: {:#06x}\n\
             Abbreviations address:    {:#06x}\n\
             File length:              {:#06x}\n\
             Checksum:                 {:#06x}\n",
            self.version,
            self.release,
            self.serial_string(),
            self.high_mem_base,
            self.static_mem_base,
            self.initial_pc,
            self.dictionary,
            self.object_table_addr,
            self.global_variables,
            self.abbrev_table,
            self.file_length,
            self.checksum,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> Vec<u8> {
        let mut h = vec![0u8; 0x40];
        h[0x00] = 3;
        h[0x02] = 0x00;
        h[0x03] = 0x01; // release 1
        h[0x04] = 0x10;
        h[0x05] = 0x00; // high mem 0x1000
        h[0x06] = 0x50;
        h[0x07] = 0x00; // initial pc 0x5000
        h[0x08] = 0x02;
        h[0x09] = 0x00; // dictionary 0x0200
        h[0x0a] = 0x01;
        h[0x0b] = 0x40; // object table 0x0140
        h[0x0c] = 0x06;
        h[0x0d] = 0xe3; // globals 0x06e3
        h[0x0e] = 0x0b;
        h[0x0f] = 0x48; // static mem base 0x0b48
        h[0x12..0x18].copy_from_slice(b"000001");
        h
    }

    #[test]
    fn parses_v3_fields() {
        let header = Header::parse(&sample_header());
        assert_eq!(header.version, 3);
        assert_eq!(header.release, 1);
        assert_eq!(header.static_mem_base, 0x0b48);
        assert_eq!(header.initial_pc, 0x5000);
        assert_eq!(header.serial_string(), "000001");
        assert!(header.is_supported_version());
    }
}
