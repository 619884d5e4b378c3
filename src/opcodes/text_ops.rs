//! Text output opcodes: literal/packed/addressed strings, numbers, single
//! characters, the status line, and `print_table`'s rectangular blit.

use crate::error::ZResult;
use crate::host::Host;
use crate::instruction::Instruction;
use crate::interpreter::{ExecutionResult, Interpreter};
use crate::object::ObjectTable;
use crate::text;

pub fn execute_print<H: Host>(interp: &mut Interpreter<H>, inst: &Instruction) -> ZResult<ExecutionResult> {
    if let Some(ref text) = inst.text {
        interp.print(text)?;
    }
    Ok(ExecutionResult::Continue)
}

pub fn execute_print_ret<H: Host>(interp: &mut Interpreter<H>, inst: &Instruction) -> ZResult<ExecutionResult> {
    if let Some(ref text) = inst.text {
        interp.print(text)?;
    }
    interp.print("\n")?;
    interp.do_return(1)
}

pub fn execute_new_line<H: Host>(interp: &mut Interpreter<H>) -> ZResult<ExecutionResult> {
    interp.print("\n")?;
    Ok(ExecutionResult::Continue)
}

pub fn execute_print_addr<H: Host>(interp: &mut Interpreter<H>, operands: &[u16]) -> ZResult<ExecutionResult> {
    let abbrev = interp.vm.config.abbrev_table_addr as usize;
    let (text, _) = text::decode_string(interp.vm.game.memory.as_slice(), operands[0] as usize, abbrev)?;
    interp.print(&text)?;
    Ok(ExecutionResult::Continue)
}

pub fn execute_print_paddr<H: Host>(interp: &mut Interpreter<H>, operands: &[u16]) -> ZResult<ExecutionResult> {
    let version = interp.vm.game.header.version;
    let addr = interp.vm.game.memory.unpack_addr(operands[0], version) as usize;
    let abbrev = interp.vm.config.abbrev_table_addr as usize;
    let (text, _) = text::decode_string(interp.vm.game.memory.as_slice(), addr, abbrev)?;
    interp.print(&text)?;
    Ok(ExecutionResult::Continue)
}

pub fn execute_print_num<H: Host>(interp: &mut Interpreter<H>, operands: &[u16]) -> ZResult<ExecutionResult> {
    interp.print(&(operands[0] as i16).to_string())?;
    Ok(ExecutionResult::Continue)
}

pub fn execute_print_char<H: Host>(interp: &mut Interpreter<H>, operands: &[u16]) -> ZResult<ExecutionResult> {
    let ch = text::zscii_to_display_char(operands[0]);
    interp.print(&ch.to_string())?;
    Ok(ExecutionResult::Continue)
}

pub fn execute_print_unicode<H: Host>(interp: &mut Interpreter<H>, operands: &[u16]) -> ZResult<ExecutionResult> {
    if let Some(ch) = char::from_u32(operands[0] as u32) {
        interp.print(&ch.to_string())?;
    }
    Ok(ExecutionResult::Continue)
}

pub fn execute_check_unicode<H: Host>(interp: &mut Interpreter<H>, inst: &Instruction, operands: &[u16]) -> ZResult<ExecutionResult> {
    let supported = char::from_u32(operands[0] as u32).is_some();
    if let Some(v) = inst.store_var {
        interp.write_variable(v, if supported { 3 } else { 0 })?;
    }
    Ok(ExecutionResult::Continue)
}

/// `show_status` (0OP:0x0C, V3 only): the score/moves or time status line.
pub fn execute_show_status<H: Host>(interp: &mut Interpreter<H>) -> ZResult<ExecutionResult> {
    let location_obj = interp.vm.read_global(0);
    let location = interp.object_short_name(location_obj)?;
    let g1 = interp.vm.read_global(1) as i16;
    let g2 = interp.vm.read_global(2);
    let time_game = interp.vm.game.memory.read_byte(crate::header::offset::FLAGS1) & crate::header::FLAGS1_V3_TIME_GAME != 0;
    interp
        .host
        .show_status(&location, g1, g2, time_game)
        .map_err(|e| crate::error::ZMachineError::StreamError { detail: e.to_string() })?;
    Ok(ExecutionResult::Continue)
}

/// VAR:0x1E `print_table`: blit `width` x `height` characters from a table
/// into the screen window, `skip` bytes between rows.
pub fn execute_print_table<H: Host>(interp: &mut Interpreter<H>, operands: &[u16]) -> ZResult<ExecutionResult> {
    let addr = operands[0] as u32;
    let width = operands[1] as u32;
    let height = if operands.len() > 2 { operands[2] as u32 } else { 1 };
    let skip = if operands.len() > 3 { operands[3] as u32 } else { 0 };
    for row in 0..height {
        let row_start = addr + row * (width + skip);
        let mut line = String::with_capacity(width as usize);
        for col in 0..width {
            line.push(text::zscii_to_display_char(interp.vm.game.memory.read_byte(row_start + col) as u16));
        }
        interp.print(&line)?;
        if row + 1 < height {
            interp.print("\n")?;
        }
    }
    Ok(ExecutionResult::Continue)
}
