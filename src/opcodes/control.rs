//! Master opcode dispatch: control flow, comparisons, calls, randomness,
//! input, windowing, and stream selection. Arithmetic, object, memory, and
//! text opcodes are delegated to the sibling modules in this directory.

use crate::error::{ZMachineError, ZResult};
use crate::host::Host;
use crate::instruction::{BranchInfo, Instruction};
use crate::interpreter::{ExecutionResult, Interpreter};
use crate::opcodes::{math, memory_ops, object_ops, text_ops};
use crate::stack::CallKind;
use crate::text;
use log::debug;

/// Where a branch with `condition` would land, without taking it. Used by
/// `save`'s branch-form postamble to bake "the restore already succeeded"
/// into the snapshot before it's written.
fn branch_target(pc: u32, branch: &Option<BranchInfo>, condition: bool) -> u32 {
    match branch {
        Some(b) if condition == b.on_true => match b.offset {
            0 | 1 => pc, // rfalse/rtrue forms aren't specially snapshotted.
            offset => (pc as i32 + offset as i32 - 2) as u32,
        },
        _ => pc,
    }
}

pub fn execute_0op<H: Host>(interp: &mut Interpreter<H>, inst: &Instruction, _operands: &[u16]) -> ZResult<ExecutionResult> {
    match inst.opcode {
        0x00 => interp.do_return(1),
        0x01 => interp.do_return(0),
        0x02 => text_ops::execute_print(interp, inst),
        0x03 => text_ops::execute_print_ret(interp, inst),
        0x04 => Ok(ExecutionResult::Continue),
        0x05 => execute_save(interp, inst),
        0x06 => execute_restore(interp, inst),
        0x07 => {
            interp.do_restart();
            Ok(ExecutionResult::Continue)
        }
        0x08 => {
            let value = interp.vm.stack.pop_value()?;
            interp.do_return(value)
        }
        0x09 => {
            let version = interp.vm.game.header.version;
            if version >= 5 {
                let mark = interp.vm.stack.catch();
                if let Some(v) = inst.store_var {
                    interp.write_variable(v, mark)?;
                }
            } else {
                interp.vm.stack.pop_value()?;
            }
            Ok(ExecutionResult::Continue)
        }
        0x0a => {
            interp.do_quit();
            Ok(ExecutionResult::Quit)
        }
        0x0b => text_ops::execute_new_line(interp),
        0x0c => text_ops::execute_show_status(interp),
        0x0d => {
            let ok = verify_checksum(interp);
            interp.do_branch(&inst.branch, ok)
        }
        0x0f => interp.do_branch(&inst.branch, true), // piracy: always genuine
        other => Err(ZMachineError::UnrecognizedOpcode { opcode: other, form: "0OP" }),
    }
}

fn verify_checksum<H: Host>(interp: &Interpreter<H>) -> bool {
    let header = &interp.vm.game.header;
    let memory = interp.vm.game.memory.as_slice();
    let end = header.file_length.min(memory.len());
    if end <= 0x40 {
        return true;
    }
    let sum = memory[0x40..end].iter().fold(0u16, |acc, &b| acc.wrapping_add(b as u16));
    sum == header.checksum
}

/// `save` (0OP:0x05 in V1-4, EXT:0x00 in V5+): before writing, apply the
/// "save succeeded" outcome to the live machine (branch-true / store 1) so
/// the Quetzal snapshot captures a machine that looks like save just
/// returned success; undo that optimistic outcome if the write fails.
fn execute_save<H: Host>(interp: &mut Interpreter<H>, inst: &Instruction) -> ZResult<ExecutionResult> {
    let version = interp.vm.game.header.version;
    if version <= 3 {
        let original_pc = interp.vm.pc;
        interp.vm.pc = branch_target(original_pc, &inst.branch, true);
        let wrote = interp.do_save()?;
        if wrote {
            Ok(ExecutionResult::Branched)
        } else {
            interp.vm.pc = original_pc;
            interp.do_branch(&inst.branch, false)
        }
    } else {
        if let Some(store_var) = inst.store_var {
            interp.write_variable(store_var, 1)?;
            let wrote = interp.do_save()?;
            if !wrote {
                interp.write_variable(store_var, 0)?;
            }
        } else {
            interp.do_save()?;
        }
        Ok(ExecutionResult::Continue)
    }
}

/// `restore`: on success the snapshot's PC/stack already encode "save
/// returned success", so resuming is just loading it. On failure, take the
/// ordinary "restore failed" branch/store outcome on the unchanged machine.
fn execute_restore<H: Host>(interp: &mut Interpreter<H>, inst: &Instruction) -> ZResult<ExecutionResult> {
    let version = interp.vm.game.header.version;
    if interp.do_restore()? {
        return Ok(ExecutionResult::Branched);
    }
    if version <= 3 {
        interp.do_branch(&inst.branch, false)
    } else {
        if let Some(store_var) = inst.store_var {
            interp.write_variable(store_var, 0)?;
        }
        Ok(ExecutionResult::Continue)
    }
}

pub fn execute_1op<H: Host>(interp: &mut Interpreter<H>, inst: &Instruction, operands: &[u16]) -> ZResult<ExecutionResult> {
    match inst.opcode {
        0x00 => interp.do_branch(&inst.branch, operands[0] == 0),
        0x01..=0x04 | 0x09 | 0x0a => object_ops::execute_1op(interp, inst, operands),
        0x05 => memory_ops::execute_inc(interp, operands),
        0x06 => memory_ops::execute_dec(interp, operands),
        0x07 => text_ops::execute_print_addr(interp, operands),
        0x08 => {
            let store_var = inst.store_var.unwrap_or(0);
            interp.do_call(operands[0], &[], CallKind::Store(store_var))
        }
        0x0b => interp.do_return(operands[0]),
        0x0c => {
            interp.vm.pc = (interp.vm.pc as i32 + operands[0] as i16 as i32 - 2) as u32;
            Ok(ExecutionResult::Branched)
        }
        0x0d => text_ops::execute_print_paddr(interp, operands),
        0x0e => memory_ops::execute_load(interp, inst, operands),
        0x0f => {
            let version = interp.vm.game.header.version;
            if version >= 5 {
                interp.do_call(operands[0], &[], CallKind::Discard)
            } else {
                math::execute_not(interp, inst, operands)
            }
        }
        other => Err(ZMachineError::UnrecognizedOpcode { opcode: other, form: "1OP" }),
    }
}

pub fn execute_2op<H: Host>(interp: &mut Interpreter<H>, inst: &Instruction, operands: &[u16]) -> ZResult<ExecutionResult> {
    match inst.opcode {
        0x01 => interp.do_branch(&inst.branch, operands[1..].iter().any(|&o| o == operands[0])),
        0x02 => interp.do_branch(&inst.branch, (operands[0] as i16) < (operands[1] as i16)),
        0x03 => interp.do_branch(&inst.branch, (operands[0] as i16) > (operands[1] as i16)),
        0x04 => memory_ops::execute_dec_chk(interp, inst, operands),
        0x05 => memory_ops::execute_inc_chk(interp, inst, operands),
        0x06 | 0x0a | 0x0b | 0x0c | 0x0e | 0x11..=0x13 => object_ops::execute_2op(interp, inst, operands),
        0x07 => interp.do_branch(&inst.branch, operands[0] & operands[1] == operands[1]),
        0x08 | 0x09 | 0x14..=0x18 => math::execute_2op(interp, inst, operands),
        0x0d => memory_ops::execute_store(interp, operands),
        0x0f => memory_ops::execute_loadw(interp, inst, operands),
        0x10 => memory_ops::execute_loadb(interp, inst, operands),
        0x19 => {
            let store_var = inst.store_var.unwrap_or(0);
            interp.do_call(operands[0], &operands[1..], CallKind::Store(store_var))
        }
        0x1a => interp.do_call(operands[0], &operands[1..], CallKind::Discard),
        0x1b => Ok(ExecutionResult::Continue), // set_colour: no colour support
        0x1c => interp.do_throw(operands[0], operands[1]),
        other => Err(ZMachineError::UnrecognizedOpcode { opcode: other, form: "2OP" }),
    }
}

pub fn execute_var<H: Host>(interp: &mut Interpreter<H>, inst: &Instruction, operands: &[u16]) -> ZResult<ExecutionResult> {
    match inst.opcode {
        0x00 => {
            let store_var = inst.store_var.unwrap_or(0);
            interp.do_call(operands[0], &operands[1..], CallKind::Store(store_var))
        }
        0x01 => memory_ops::execute_storew(interp, operands),
        0x02 => memory_ops::execute_storeb(interp, operands),
        0x03 => object_ops::execute_put_prop(interp, operands),
        0x04 => execute_read(interp, inst, operands),
        0x05 => text_ops::execute_print_char(interp, operands),
        0x06 => text_ops::execute_print_num(interp, operands),
        0x07 => execute_random(interp, inst, operands),
        0x08 => interp.vm.stack.push_value(operands[0]).map(|_| ExecutionResult::Continue),
        0x09 => {
            let var = operands[0] as u8;
            let value = interp.vm.stack.pop_value()?;
            interp.write_indirect_variable(var, value)?;
            Ok(ExecutionResult::Continue)
        }
        0x0a => host_call(interp, |h| h.split_window(operands[0])),
        0x0b => host_call(interp, |h| h.set_window(operands[0] as u8)),
        0x0c => {
            let store_var = inst.store_var.unwrap_or(0);
            interp.do_call(operands[0], &operands[1..], CallKind::Store(store_var))
        }
        0x0d => host_call(interp, |h| h.erase_window(operands[0] as i16)),
        0x0e => host_call(interp, |h| h.erase_line()),
        0x0f => host_call(interp, |h| h.set_cursor(operands[0], operands[1])),
        0x10 => {
            let (line, column) = interp
                .host
                .get_cursor()
                .map_err(|e| ZMachineError::StreamError { detail: e.to_string() })?;
            if let Some(v) = inst.store_var {
                interp.write_variable(v, line)?;
                let _ = column;
            }
            Ok(ExecutionResult::Continue)
        }
        0x11 => host_call(interp, |h| h.set_text_style(operands[0])),
        0x12 => host_call(interp, |h| h.set_buffer_mode(operands[0] != 0)),
        0x13 => {
            let stream = operands[0] as i16;
            let table = operands.get(1).map(|&a| a as u32);
            interp.output_stream(stream, table)?;
            Ok(ExecutionResult::Continue)
        }
        0x14 => {
            interp.input_stream(operands[0] as i16)?;
            Ok(ExecutionResult::Continue)
        }
        0x15 => {
            if let Some(&routine) = operands.get(3) {
                if routine != 0 {
                    interp.call_direct(routine)?;
                }
            }
            Ok(ExecutionResult::Continue)
        }
        0x16 => {
            let time = operands.get(1).copied().unwrap_or(0);
            let routine = operands.get(2).copied().unwrap_or(0);
            let code = interp.do_read_char(time, routine)?;
            if let Some(v) = inst.store_var {
                interp.write_variable(v, code)?;
            }
            Ok(ExecutionResult::Continue)
        }
        0x17 => execute_scan_table(interp, inst, operands),
        0x18 => math::execute_not(interp, inst, operands),
        0x19 => interp.do_call(operands[0], &operands[1..], CallKind::Discard),
        0x1a => interp.do_call(operands[0], &operands[1..], CallKind::Discard),
        0x1b => execute_tokenise(interp, operands),
        0x1c => execute_encode_text(interp, operands),
        0x1d => execute_copy_table(interp, operands),
        0x1e => text_ops::execute_print_table(interp, operands),
        0x1f => {
            let arg_count = interp.vm.stack.current_frame().arg_count as u16;
            interp.do_branch(&inst.branch, operands[0] <= arg_count)
        }
        other => Err(ZMachineError::UnrecognizedOpcode { opcode: other, form: "VAR" }),
    }
}

fn host_call<H: Host>(interp: &mut Interpreter<H>, f: impl FnOnce(&mut H) -> crate::host::HostResult<()>) -> ZResult<ExecutionResult> {
    f(&mut interp.host).map_err(|e| ZMachineError::StreamError { detail: e.to_string() })?;
    Ok(ExecutionResult::Continue)
}

fn execute_read<H: Host>(interp: &mut Interpreter<H>, inst: &Instruction, operands: &[u16]) -> ZResult<ExecutionResult> {
    let text_buffer = operands[0];
    let parse_buffer = operands.get(1).copied().unwrap_or(0);
    let time = operands.get(2).copied().unwrap_or(0);
    let routine = operands.get(3).copied().unwrap_or(0);
    let terminator = interp.do_read(text_buffer, parse_buffer, time, routine)?;
    if let Some(v) = inst.store_var {
        // aread (V5+) stores whichever character actually ended the line.
        interp.write_variable(v, terminator as u16)?;
    }
    Ok(ExecutionResult::Continue)
}

fn execute_random<H: Host>(interp: &mut Interpreter<H>, inst: &Instruction, operands: &[u16]) -> ZResult<ExecutionResult> {
    let r = operands[0] as i16;
    let value = match r.cmp(&0) {
        std::cmp::Ordering::Greater => interp.vm.rand.uniform_in_range(r as u16),
        std::cmp::Ordering::Equal => {
            interp.vm.rand.reseed_from_entropy();
            0
        }
        std::cmp::Ordering::Less => {
            interp.vm.rand.reseed(r);
            0
        }
    };
    if let Some(v) = inst.store_var {
        interp.write_variable(v, value)?;
    }
    Ok(ExecutionResult::Continue)
}

fn execute_scan_table<H: Host>(interp: &mut Interpreter<H>, inst: &Instruction, operands: &[u16]) -> ZResult<ExecutionResult> {
    let target = operands[0];
    let table = operands[1] as u32;
    let entries = operands[2] as u32;
    let form = operands.get(3).copied().unwrap_or(0x82) as u8;
    let is_word = form & 0x80 != 0;
    let field_len = (form & 0x7f).max(1) as u32;

    let mut found = 0u32;
    for i in 0..entries {
        let addr = table + i * field_len;
        let value = if is_word {
            interp.vm.game.memory.read_word(addr)
        } else {
            interp.vm.game.memory.read_byte(addr) as u16
        };
        if value == target {
            found = addr;
            break;
        }
    }
    if let Some(v) = inst.store_var {
        interp.write_variable(v, found as u16)?;
    }
    interp.do_branch(&inst.branch, found != 0)
}

fn execute_tokenise<H: Host>(interp: &mut Interpreter<H>, operands: &[u16]) -> ZResult<ExecutionResult> {
    let text = interp.read_text_buffer(operands[0]);
    interp.tokenize_into(operands[1], &text)?;
    Ok(ExecutionResult::Continue)
}

fn execute_encode_text<H: Host>(interp: &mut Interpreter<H>, operands: &[u16]) -> ZResult<ExecutionResult> {
    let zscii_addr = operands[0] as u32;
    let length = operands[1] as u32;
    let from = operands[2] as u32;
    let coded_addr = operands[3] as u32;
    let s: String = (0..length)
        .map(|i| interp.vm.game.memory.read_byte(zscii_addr + from + i) as char)
        .collect();
    let encoded = text::encode_text(&s, 6);
    for (i, &b) in encoded.iter().enumerate() {
        interp.vm.game.memory.write_byte(coded_addr + i as u32, b)?;
    }
    Ok(ExecutionResult::Continue)
}

fn execute_copy_table<H: Host>(interp: &mut Interpreter<H>, operands: &[u16]) -> ZResult<ExecutionResult> {
    let first = operands[0] as u32;
    let second = operands[1] as u32;
    let size = operands[2] as i16;
    let len = size.unsigned_abs() as u32;
    if second == 0 {
        for i in 0..len {
            interp.vm.game.memory.write_byte(first + i, 0)?;
        }
    } else {
        let data: Vec<u8> = (0..len).map(|i| interp.vm.game.memory.read_byte(first + i)).collect();
        for (i, &b) in data.iter().enumerate() {
            interp.vm.game.memory.write_byte(second + i as u32, b)?;
        }
    }
    Ok(ExecutionResult::Continue)
}

pub fn execute_ext<H: Host>(interp: &mut Interpreter<H>, inst: &Instruction, operands: &[u16]) -> ZResult<ExecutionResult> {
    match inst.ext_opcode.unwrap_or(0xff) {
        0x00 => execute_save(interp, inst),
        0x01 => execute_restore(interp, inst),
        0x02 => {
            let shift = operands[1] as i16;
            let value = operands[0];
            let shifted = if shift >= 0 { value << shift.min(15) } else { value >> (-shift).min(15) };
            if let Some(v) = inst.store_var {
                interp.write_variable(v, shifted)?;
            }
            Ok(ExecutionResult::Continue)
        }
        0x03 => {
            let shift = operands[1] as i16;
            let value = operands[0] as i16;
            let shifted = if shift >= 0 { value << shift.min(15) } else { value >> (-shift).min(15) };
            if let Some(v) = inst.store_var {
                interp.write_variable(v, shifted as u16)?;
            }
            Ok(ExecutionResult::Continue)
        }
        0x04 => {
            // set_font: no alternate fonts supported; 0 means unavailable.
            if let Some(v) = inst.store_var {
                interp.write_variable(v, 0)?;
            }
            Ok(ExecutionResult::Continue)
        }
        0x09 => execute_save_undo(interp, inst),
        0x0a => execute_restore_undo(interp, inst),
        0x0b => text_ops::execute_print_unicode(interp, operands),
        0x0c => text_ops::execute_check_unicode(interp, inst, operands),
        other => Err(ZMachineError::UnrecognizedOpcode { opcode: other, form: "EXT" }),
    }
}

/// `save_undo`: like `save`, bake the "this is a resumed undo" result (2)
/// into the snapshot before taking it, then correct the live value to 1
/// (ordinary successful save, no restore happened... yet).
fn execute_save_undo<H: Host>(interp: &mut Interpreter<H>, inst: &Instruction) -> ZResult<ExecutionResult> {
    if let Some(store_var) = inst.store_var {
        interp.write_variable(store_var, 2)?;
        interp.do_save_undo()?;
        interp.write_variable(store_var, 1)?;
    } else {
        interp.do_save_undo()?;
    }
    debug!("save_undo: snapshot pushed");
    Ok(ExecutionResult::Continue)
}

fn execute_restore_undo<H: Host>(interp: &mut Interpreter<H>, inst: &Instruction) -> ZResult<ExecutionResult> {
    let result = interp.do_restore_undo()?;
    if result == 0 {
        if let Some(v) = inst.store_var {
            interp.write_variable(v, 0)?;
        }
    }
    // On success the restored stack/locals already carry the baked-in 2
    // written by save_undo, so nothing further needs storing here.
    Ok(ExecutionResult::Continue)
}
