//! Reading a Quetzal (`IFZS`) save file via the host's filename prompt and
//! file I/O.

use crate::error::ZResult;
use crate::host::{FilePrompt, Host, HostError};
use crate::interpreter::Interpreter;
use crate::quetzal::chunks::IFhdChunk;
use crate::quetzal::compressed_memory;
use crate::quetzal::iff::IffFile;
use crate::stack::Stack;
use log::{info, warn};

fn host_err(e: HostError) -> crate::error::ZMachineError {
    crate::error::ZMachineError::StreamError { detail: e.to_string() }
}

/// Returns `Ok(true)` if the VM state was replaced, `Ok(false)` if the host
/// or file reported something that should fail softly (cancellation,
/// unreadable/malformed file, wrong story). Anything that would make
/// continuing unsafe is still propagated as an error.
pub fn restore<H: Host>(interp: &mut Interpreter<H>) -> ZResult<bool> {
    let filename = match interp.host.prompt_restore_filename().map_err(host_err)? {
        FilePrompt::Chosen(name) => name,
        FilePrompt::Cancelled => return Ok(false),
    };
    let bytes = match interp.host.read_file(&filename) {
        Ok(b) => b,
        Err(e) => {
            warn!("restore: could not read {filename}: {e}");
            return Ok(false);
        }
    };
    let iff = match IffFile::from_bytes(&bytes) {
        Ok(iff) => iff,
        Err(e) => {
            warn!("restore: {e}");
            return Ok(false);
        }
    };
    if iff.form_type != *b"IFZS" {
        warn!("restore: {filename} is not a Quetzal save file");
        return Ok(false);
    }

    let Some(ifhd_chunk) = iff.find_chunk(b"IFhd") else {
        warn!("restore: missing IFhd chunk");
        return Ok(false);
    };
    let ifhd = match IFhdChunk::from_bytes(&ifhd_chunk.data) {
        Ok(ifhd) => ifhd,
        Err(e) => {
            warn!("restore: {e}");
            return Ok(false);
        }
    };
    if ifhd.release != interp.vm.game.header.release || ifhd.serial != interp.vm.game.header.serial {
        warn!("restore: save file belongs to a different story release/serial");
        return Ok(false);
    }

    let dynamic_size = interp.vm.game.header.static_mem_base as usize;
    let original = &interp.vm.game.original_memory[..dynamic_size];
    let dynamic = if let Some(cmem) = iff.find_chunk(b"CMem") {
        match compressed_memory::decompress_memory(&cmem.data, original) {
            Ok(d) => d,
            Err(e) => {
                warn!("restore: {e}");
                return Ok(false);
            }
        }
    } else if let Some(umem) = iff.find_chunk(b"UMem") {
        if umem.data.len() != dynamic_size {
            warn!("restore: UMem chunk size mismatch");
            return Ok(false);
        }
        umem.data.clone()
    } else {
        warn!("restore: missing CMem/UMem chunk");
        return Ok(false);
    };

    let Some(stks_chunk) = iff.find_chunk(b"Stks") else {
        warn!("restore: missing Stks chunk");
        return Ok(false);
    };
    let stack = match Stack::deserialize(&stks_chunk.data) {
        Ok(s) => s,
        Err(e) => {
            warn!("restore: {e}");
            return Ok(false);
        }
    };

    interp.vm.game.memory.reset_dynamic(&dynamic);
    interp.vm.stack = stack;
    interp.vm.pc = ifhd.pc;
    info!("restored from {filename}");
    Ok(true)
}
