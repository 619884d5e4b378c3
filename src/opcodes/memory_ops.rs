//! Variable and memory-table opcodes: `load`/`store`, `inc`/`dec` (and
//! their `_chk` comparison forms), and word/byte table access.

use crate::error::ZResult;
use crate::host::Host;
use crate::instruction::Instruction;
use crate::interpreter::{ExecutionResult, Interpreter};

pub fn execute_loadw<H: Host>(interp: &mut Interpreter<H>, inst: &Instruction, operands: &[u16]) -> ZResult<ExecutionResult> {
    let addr = operands[0] as u32 + operands[1] as u32 * 2;
    let value = interp.vm.game.memory.read_word(addr);
    if let Some(v) = inst.store_var {
        interp.write_variable(v, value)?;
    }
    Ok(ExecutionResult::Continue)
}

pub fn execute_loadb<H: Host>(interp: &mut Interpreter<H>, inst: &Instruction, operands: &[u16]) -> ZResult<ExecutionResult> {
    let addr = operands[0] as u32 + operands[1] as u32;
    let value = interp.vm.game.memory.read_byte(addr) as u16;
    if let Some(v) = inst.store_var {
        interp.write_variable(v, value)?;
    }
    Ok(ExecutionResult::Continue)
}

pub fn execute_storew<H: Host>(interp: &mut Interpreter<H>, operands: &[u16]) -> ZResult<ExecutionResult> {
    let addr = operands[0] as u32 + operands[1] as u32 * 2;
    interp.vm.game.memory.write_word(addr, operands[2])?;
    Ok(ExecutionResult::Continue)
}

pub fn execute_storeb<H: Host>(interp: &mut Interpreter<H>, operands: &[u16]) -> ZResult<ExecutionResult> {
    let addr = operands[0] as u32 + operands[1] as u32;
    interp.vm.game.memory.write_byte(addr, operands[2] as u8)?;
    Ok(ExecutionResult::Continue)
}

/// 1OP:0x0E `load`: operand names a variable to read indirectly.
pub fn execute_load<H: Host>(interp: &mut Interpreter<H>, inst: &Instruction, operands: &[u16]) -> ZResult<ExecutionResult> {
    let value = interp.read_indirect_variable(operands[0] as u8)?;
    if let Some(v) = inst.store_var {
        interp.write_variable(v, value)?;
    }
    Ok(ExecutionResult::Continue)
}

/// 2OP:0x0D `store`: writes indirectly to the variable named by operand 0.
pub fn execute_store<H: Host>(interp: &mut Interpreter<H>, operands: &[u16]) -> ZResult<ExecutionResult> {
    interp.write_indirect_variable(operands[0] as u8, operands[1])?;
    Ok(ExecutionResult::Continue)
}

pub fn execute_inc<H: Host>(interp: &mut Interpreter<H>, operands: &[u16]) -> ZResult<ExecutionResult> {
    let var = operands[0] as u8;
    let value = (interp.read_indirect_variable(var)? as i16).wrapping_add(1) as u16;
    interp.write_indirect_variable(var, value)?;
    Ok(ExecutionResult::Continue)
}

pub fn execute_dec<H: Host>(interp: &mut Interpreter<H>, operands: &[u16]) -> ZResult<ExecutionResult> {
    let var = operands[0] as u8;
    let value = (interp.read_indirect_variable(var)? as i16).wrapping_sub(1) as u16;
    interp.write_indirect_variable(var, value)?;
    Ok(ExecutionResult::Continue)
}

pub fn execute_inc_chk<H: Host>(interp: &mut Interpreter<H>, inst: &Instruction, operands: &[u16]) -> ZResult<ExecutionResult> {
    let var = operands[0] as u8;
    let value = (interp.read_indirect_variable(var)? as i16).wrapping_add(1);
    interp.write_indirect_variable(var, value as u16)?;
    interp.do_branch(&inst.branch, value > operands[1] as i16)
}

pub fn execute_dec_chk<H: Host>(interp: &mut Interpreter<H>, inst: &Instruction, operands: &[u16]) -> ZResult<ExecutionResult> {
    let var = operands[0] as u8;
    let value = (interp.read_indirect_variable(var)? as i16).wrapping_sub(1);
    interp.write_indirect_variable(var, value as u16)?;
    interp.do_branch(&inst.branch, value < operands[1] as i16)
}
