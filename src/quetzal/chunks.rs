//! `IFhd` (interface header) and `Stks` (call stack) chunk codecs. `Stks`
//! itself is just `stack::Stack::serialize`/`deserialize`'s byte format;
//! this module only wraps it with the chunk type tag.

use crate::error::{ZMachineError, ZResult};
use crate::header::Header;

/// Identifies which story a save belongs to and where to resume. Unlike
/// the Standard's "PC at the time of save", we stash the PC a successful
/// restore should resume at — already adjusted for save's branch/store
/// postamble by the caller, so restore only needs to load it verbatim.
pub struct IFhdChunk {
    pub release: u16,
    pub serial: [u8; 6],
    pub checksum: u16,
    pub pc: u32,
}

impl IFhdChunk {
    pub fn new(header: &Header, pc: u32) -> Self {
        IFhdChunk {
            release: header.release,
            serial: header.serial,
            checksum: header.checksum,
            pc,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(13);
        bytes.extend_from_slice(&self.release.to_be_bytes());
        bytes.extend_from_slice(&self.serial);
        bytes.extend_from_slice(&self.checksum.to_be_bytes());
        let pc_bytes = self.pc.to_be_bytes();
        bytes.extend_from_slice(&pc_bytes[1..4]);
        bytes
    }

    pub fn from_bytes(data: &[u8]) -> ZResult<Self> {
        if data.len() < 13 {
            return Err(ZMachineError::StreamError {
                detail: "IFhd chunk too small".into(),
            });
        }
        let release = u16::from_be_bytes([data[0], data[1]]);
        let mut serial = [0u8; 6];
        serial.copy_from_slice(&data[2..8]);
        let checksum = u16::from_be_bytes([data[8], data[9]]);
        let pc = ((data[10] as u32) << 16) | ((data[11] as u32) << 8) | data[12] as u32;
        Ok(IFhdChunk { release, serial, checksum, pc })
    }
}
