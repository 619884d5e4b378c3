//! Writing a Quetzal (`IFZS`) save file via the host's filename prompt and
//! file I/O.

use crate::error::ZResult;
use crate::host::{FilePrompt, Host, HostError};
use crate::interpreter::Interpreter;
use crate::quetzal::chunks::IFhdChunk;
use crate::quetzal::compressed_memory;
use crate::quetzal::iff::IffFile;
use log::info;

fn host_err(e: HostError) -> crate::error::ZMachineError {
    crate::error::ZMachineError::StreamError { detail: e.to_string() }
}

/// Returns `Ok(true)` if a file was written, `Ok(false)` if the host
/// reported cancellation (no filename, or the user declined to overwrite).
pub fn save<H: Host>(interp: &mut Interpreter<H>) -> ZResult<bool> {
    let filename = match interp.host.prompt_save_filename().map_err(host_err)? {
        FilePrompt::Chosen(name) => name,
        FilePrompt::Cancelled => return Ok(false),
    };
    if !interp.host.confirm_overwrite(&filename).map_err(host_err)? {
        return Ok(false);
    }

    let ifhd = IFhdChunk::new(&interp.vm.game.header, interp.vm.pc);
    let dynamic_size = interp.vm.game.header.static_mem_base as usize;
    let current = &interp.vm.game.memory.as_slice()[..dynamic_size];
    let original = &interp.vm.game.original_memory[..dynamic_size];
    let cmem = compressed_memory::compress_memory(current, original);
    let stks = interp.vm.stack.serialize()?;

    let mut iff = IffFile::new();
    iff.add_chunk(*b"IFhd", ifhd.to_bytes());
    iff.add_chunk(*b"CMem", cmem);
    iff.add_chunk(*b"Stks", stks);

    interp.host.write_file(&filename, &iff.to_bytes()).map_err(host_err)?;
    info!("saved to {filename}");
    Ok(true)
}
