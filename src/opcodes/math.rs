//! Arithmetic and bitwise opcodes (spec §6, 2OP:0x08-0x09/0x14-0x18, 1OP
//! `not`, VAR `not`): the computational core shared by every routine.

use crate::error::{ZMachineError, ZResult};
use crate::host::Host;
use crate::instruction::Instruction;
use crate::interpreter::{ExecutionResult, Interpreter};
use log::debug;

pub fn execute_2op<H: Host>(interp: &mut Interpreter<H>, inst: &Instruction, operands: &[u16]) -> ZResult<ExecutionResult> {
    let a = operands[0] as i16;
    let b = operands[1] as i16;
    let result = match inst.opcode {
        0x08 => operands[0] | operands[1],
        0x09 => operands[0] & operands[1],
        0x14 => a.wrapping_add(b) as u16,
        0x15 => a.wrapping_sub(b) as u16,
        0x16 => a.wrapping_mul(b) as u16,
        0x17 => {
            if b == 0 {
                return Err(ZMachineError::InvalidArgument { detail: "div by zero".into() });
            }
            a.wrapping_div(b) as u16
        }
        0x18 => {
            if b == 0 {
                return Err(ZMachineError::InvalidArgument { detail: "mod by zero".into() });
            }
            a.wrapping_rem(b) as u16
        }
        other => {
            return Err(ZMachineError::UnrecognizedOpcode { opcode: other, form: "2OP math" });
        }
    };
    debug!("{} {} {} = {}", inst.name(interp.vm.game.header.version), operands[0], operands[1], result);
    if let Some(store_var) = inst.store_var {
        interp.write_variable(store_var, result)?;
    }
    Ok(ExecutionResult::Continue)
}

/// 1OP:0x0F `not` (V1-4 only; V5+ reuses the opcode for `call_1n`).
pub fn execute_not<H: Host>(interp: &mut Interpreter<H>, inst: &Instruction, operands: &[u16]) -> ZResult<ExecutionResult> {
    if let Some(store_var) = inst.store_var {
        interp.write_variable(store_var, !operands[0])?;
    }
    Ok(ExecutionResult::Continue)
}
