//! Object-table opcodes: tree navigation, attributes, and properties
//! (spec §6, object-table module). Delegates the actual layout math to
//! `object::ObjectTable`, implemented on `VM`.

use crate::error::ZResult;
use crate::host::Host;
use crate::instruction::Instruction;
use crate::interpreter::{ExecutionResult, Interpreter};
use crate::object::ObjectTable;
use log::debug;

pub fn execute_1op<H: Host>(interp: &mut Interpreter<H>, inst: &Instruction, operands: &[u16]) -> ZResult<ExecutionResult> {
    let obj = operands[0];
    match inst.opcode {
        0x01 => {
            let sibling = interp.vm.get_sibling(obj)?;
            if let Some(v) = inst.store_var {
                interp.write_variable(v, sibling)?;
            }
            interp.do_branch(&inst.branch, sibling != 0)
        }
        0x02 => {
            let child = interp.vm.get_child(obj)?;
            if let Some(v) = inst.store_var {
                interp.write_variable(v, child)?;
            }
            interp.do_branch(&inst.branch, child != 0)
        }
        0x03 => {
            let parent = interp.vm.get_parent(obj)?;
            if let Some(v) = inst.store_var {
                interp.write_variable(v, parent)?;
            }
            Ok(ExecutionResult::Continue)
        }
        0x04 => {
            // get_prop_len: `obj` is actually the property's *data* address.
            let len = if obj == 0 {
                0
            } else {
                let version = interp.vm.game.header.version;
                let header_addr = if version <= 3 {
                    obj as u32 - 1
                } else if interp.vm.game.memory.read_byte(obj as u32 - 1) & 0x80 != 0 {
                    obj as u32 - 2
                } else {
                    obj as u32 - 1
                };
                interp.vm.property_size(header_addr) as u16
            };
            if let Some(v) = inst.store_var {
                interp.write_variable(v, len)?;
            }
            Ok(ExecutionResult::Continue)
        }
        0x09 => {
            interp.vm.orphan(obj)?;
            Ok(ExecutionResult::Continue)
        }
        0x0a => {
            let name = interp.object_short_name(obj)?;
            interp.print(&name)?;
            Ok(ExecutionResult::Continue)
        }
        other => Err(crate::error::ZMachineError::UnrecognizedOpcode { opcode: other, form: "1OP object" }),
    }
}

pub fn execute_2op<H: Host>(interp: &mut Interpreter<H>, inst: &Instruction, operands: &[u16]) -> ZResult<ExecutionResult> {
    match inst.opcode {
        0x06 => {
            // jin a b: is a's parent b?
            let parent = interp.vm.get_parent(operands[0])?;
            interp.do_branch(&inst.branch, parent == operands[1])
        }
        0x0a => {
            let flag = interp.vm.get_attr(operands[0], operands[1])?;
            interp.do_branch(&inst.branch, flag)
        }
        0x0b => {
            interp.vm.set_attr(operands[0], operands[1])?;
            Ok(ExecutionResult::Continue)
        }
        0x0c => {
            interp.vm.clear_attr(operands[0], operands[1])?;
            Ok(ExecutionResult::Continue)
        }
        0x0e => {
            interp.vm.insert(operands[0], operands[1])?;
            Ok(ExecutionResult::Continue)
        }
        0x11 => {
            let value = interp.vm.get_property_data(operands[0], operands[1])?;
            if let Some(v) = inst.store_var {
                interp.write_variable(v, value)?;
            }
            Ok(ExecutionResult::Continue)
        }
        0x12 => {
            let addr = interp.vm.get_property_addr(operands[0], operands[1])?;
            if let Some(v) = inst.store_var {
                interp.write_variable(v, addr as u16)?;
            }
            Ok(ExecutionResult::Continue)
        }
        0x13 => {
            let next = get_next_prop(interp, operands[0], operands[1])?;
            if let Some(v) = inst.store_var {
                interp.write_variable(v, next)?;
            }
            Ok(ExecutionResult::Continue)
        }
        other => Err(crate::error::ZMachineError::UnrecognizedOpcode { opcode: other, form: "2OP object" }),
    }
}

/// `get_next_prop obj 0` returns the first property number; `get_next_prop
/// obj N` returns the one after N, or 0 past the end.
fn get_next_prop<H: Host>(interp: &mut Interpreter<H>, obj: u16, prop_num: u16) -> ZResult<u16> {
    if prop_num == 0 {
        let addr = interp.vm.first_property_addr(obj)?;
        return Ok(interp.vm.property_number(addr));
    }
    let data_addr = interp.vm.get_property_addr(obj, prop_num)?;
    if data_addr == 0 {
        debug!("get_next_prop: object {obj} has no property {prop_num}");
        return Ok(0);
    }
    let version = interp.vm.game.header.version;
    let header_addr = if version <= 3 {
        data_addr - 1
    } else if interp.vm.game.memory.read_byte(data_addr - 1) & 0x80 != 0 {
        data_addr - 2
    } else {
        data_addr - 1
    };
    let next = interp.vm.next_property_addr(header_addr)?;
    Ok(if next == 0 { 0 } else { interp.vm.property_number(next) })
}

/// VAR:0x03 `put_prop obj prop value`.
pub fn execute_put_prop<H: Host>(interp: &mut Interpreter<H>, operands: &[u16]) -> ZResult<ExecutionResult> {
    interp.vm.set_property_data(operands[0], operands[1], operands[2])?;
    Ok(ExecutionResult::Continue)
}
