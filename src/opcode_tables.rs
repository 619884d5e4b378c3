//! Per-opcode metadata: mnemonic names and whether an encoding stores a
//! result, branches, or carries inline text. Looked up once at decode time
//! so `Instruction::decode` doesn't need a giant match of its own.

use crate::instruction::{InstructionForm, OperandCount};

pub fn get_instruction_name(
    opcode: u8,
    ext_opcode: Option<u8>,
    form: InstructionForm,
    operand_count: OperandCount,
    version: u8,
) -> &'static str {
    match form {
        InstructionForm::Extended => extended_opcode_name(ext_opcode.unwrap_or(0)),
        InstructionForm::Variable => variable_opcode_name(opcode, operand_count, version),
        InstructionForm::Short => match operand_count {
            OperandCount::OP0 => op0_name(opcode, version),
            OperandCount::OP1 => op1_name(opcode, version),
            _ => "unknown",
        },
        InstructionForm::Long => op2_name(opcode),
    }
}

fn op2_name(opcode: u8) -> &'static str {
    match opcode {
        0x01 => "je",
        0x02 => "jl",
        0x03 => "jg",
        0x04 => "dec_chk",
        0x05 => "inc_chk",
        0x06 => "jin",
        0x07 => "test",
        0x08 => "or",
        0x09 => "and",
        0x0a => "test_attr",
        0x0b => "set_attr",
        0x0c => "clear_attr",
        0x0d => "store",
        0x0e => "insert_obj",
        0x0f => "loadw",
        0x10 => "loadb",
        0x11 => "get_prop",
        0x12 => "get_prop_addr",
        0x13 => "get_next_prop",
        0x14 => "add",
        0x15 => "sub",
        0x16 => "mul",
        0x17 => "div",
        0x18 => "mod",
        0x19 => "call_2s",
        0x1a => "call_2n",
        0x1b => "set_colour",
        0x1c => "throw",
        _ => "unknown_2op",
    }
}

fn op1_name(opcode: u8, version: u8) -> &'static str {
    match opcode {
        0x00 => "jz",
        0x01 => "get_sibling",
        0x02 => "get_child",
        0x03 => "get_parent",
        0x04 => "get_prop_len",
        0x05 => "inc",
        0x06 => "dec",
        0x07 => "print_addr",
        0x08 => "call_1s",
        0x09 => "remove_obj",
        0x0a => "print_obj",
        0x0b => "ret",
        0x0c => "jump",
        0x0d => "print_paddr",
        0x0e => "load",
        0x0f if version >= 5 => "call_1n",
        0x0f => "not",
        _ => "unknown_1op",
    }
}

fn op0_name(opcode: u8, version: u8) -> &'static str {
    match opcode {
        0x00 => "rtrue",
        0x01 => "rfalse",
        0x02 => "print",
        0x03 => "print_ret",
        0x04 => "nop",
        0x05 => "save",
        0x06 => "restore",
        0x07 => "restart",
        0x08 => "ret_popped",
        0x09 if version >= 5 => "catch",
        0x09 => "pop",
        0x0a => "quit",
        0x0b => "new_line",
        0x0c if version == 3 => "show_status",
        0x0d => "verify",
        0x0e => "extended",
        0x0f => "piracy",
        _ => "unknown_0op",
    }
}

fn variable_opcode_name(opcode: u8, operand_count: OperandCount, version: u8) -> &'static str {
    if opcode >= 0x20 {
        return op2_name(opcode - 0x20);
    }
    if operand_count == OperandCount::OP2 {
        return op2_name(opcode);
    }
    match opcode {
        0x00 if version >= 4 => "call_vs",
        0x00 => "call",
        0x01 => "storew",
        0x02 => "storeb",
        0x03 => "put_prop",
        0x04 if version >= 5 => "aread",
        0x04 => "sread",
        0x05 => "print_char",
        0x06 => "print_num",
        0x07 => "random",
        0x08 => "push",
        0x09 => "pull",
        0x0a => "split_window",
        0x0b => "set_window",
        0x0c => "call_vs2",
        0x0d => "erase_window",
        0x0e => "erase_line",
        0x0f => "set_cursor",
        0x10 => "get_cursor",
        0x11 => "set_text_style",
        0x12 => "buffer_mode",
        0x13 => "output_stream",
        0x14 => "input_stream",
        0x15 => "sound_effect",
        0x16 => "read_char",
        0x17 => "scan_table",
        0x18 => "not",
        0x19 => "call_vn",
        0x1a => "call_vn2",
        0x1b => "tokenise",
        0x1c => "encode_text",
        0x1d => "copy_table",
        0x1e => "print_table",
        0x1f => "check_arg_count",
        _ => "unknown_var",
    }
}

fn extended_opcode_name(ext_opcode: u8) -> &'static str {
    match ext_opcode {
        0x00 => "save",
        0x01 => "restore",
        0x02 => "log_shift",
        0x03 => "art_shift",
        0x04 => "set_font",
        0x09 => "save_undo",
        0x0a => "restore_undo",
        0x0b => "print_unicode",
        0x0c => "check_unicode",
        _ => "unknown_ext",
    }
}

pub fn stores_result(
    opcode: u8,
    ext_opcode: Option<u8>,
    form: InstructionForm,
    operand_count: OperandCount,
    version: u8,
) -> bool {
    match form {
        InstructionForm::Extended => matches!(ext_opcode, Some(0x00..=0x04) | Some(0x09..=0x0c)),
        InstructionForm::Variable => {
            if opcode >= 0x20 {
                stores_result_2op(opcode - 0x20)
            } else if operand_count == OperandCount::OP2 {
                stores_result_2op(opcode)
            } else {
                matches!(opcode, 0x00 | 0x07 | 0x0c | 0x16 | 0x17) || (opcode == 0x04 && version >= 5)
            }
        }
        InstructionForm::Short => match operand_count {
            // save/restore (0x05/0x06) store a result in V4 only; V1-3
            // branches instead and V5+ uses the extended-opcode encoding.
            OperandCount::OP0 => (matches!(opcode, 0x05 | 0x06) && version == 4) || (opcode == 0x09 && version >= 5), // catch
            OperandCount::OP1 => match opcode {
                0x01..=0x04 => true,       // get_sibling, get_child, get_parent, get_prop_len
                0x08 => true,              // call_1s
                0x0e => true,              // load
                0x0f => version <= 4,      // not (V1-4); call_1n (V5+) does not store
                _ => false,
            },
            _ => false,
        },
        InstructionForm::Long => stores_result_2op(opcode),
    }
}

fn stores_result_2op(opcode: u8) -> bool {
    matches!(opcode, 0x08 | 0x09 | 0x0f..=0x13 | 0x14..=0x18 | 0x19)
}

pub fn has_branch(
    opcode: u8,
    _ext_opcode: Option<u8>,
    form: InstructionForm,
    operand_count: OperandCount,
    version: u8,
) -> bool {
    match form {
        InstructionForm::Extended => false,
        InstructionForm::Variable => {
            if opcode >= 0x20 {
                has_branch_2op(opcode - 0x20)
            } else if operand_count == OperandCount::OP2 {
                has_branch_2op(opcode)
            } else {
                // scan_table(0x17) and check_arg_count(0x1f) are the only
                // VAR-count opcodes with a branch postamble.
                matches!(opcode, 0x17 | 0x1f)
            }
        }
        InstructionForm::Short => match operand_count {
            // save/restore (0x05/0x06) branch in V1-3 only (V4 stores a
            // result instead; V5+ uses the extended-opcode encoding).
            OperandCount::OP0 => {
                matches!(opcode, 0x0d | 0x0f) || (matches!(opcode, 0x05 | 0x06) && version <= 3)
            }
            OperandCount::OP1 => matches!(opcode, 0x00..=0x02),
            _ => false,
        },
        InstructionForm::Long => has_branch_2op(opcode),
    }
}

fn has_branch_2op(opcode: u8) -> bool {
    matches!(opcode, 0x01..=0x07 | 0x0a)
}

pub fn has_text(
    opcode: u8,
    _ext_opcode: Option<u8>,
    form: InstructionForm,
    operand_count: OperandCount,
    _version: u8,
) -> bool {
    matches!(form, InstructionForm::Short if operand_count == OperandCount::OP0 && matches!(opcode, 0x02 | 0x03))
}

/// Some VAR opcodes always take a fixed operand count even though their
/// type byte could in principle encode more; `None` means "use whatever
/// the type byte specifies".
pub fn get_expected_operand_count(
    opcode: u8,
    _ext_opcode: Option<u8>,
    form: InstructionForm,
    operand_count: OperandCount,
    version: u8,
) -> Option<usize> {
    if form != InstructionForm::Variable {
        return None;
    }
    if opcode >= 0x20 {
        return Some(2);
    }
    if operand_count == OperandCount::OP2 {
        // je legally takes 2-4 operands when encoded in variable form
        // (a b c d -> true if a equals any of b/c/d); everything else
        // encoded this way is a strict 2-operand opcode.
        if opcode == 0x01 {
            return None;
        }
        return Some(2);
    }
    match opcode {
        0x01 => Some(3), // storew
        0x02 => Some(3), // storeb
        0x03 => Some(3), // put_prop
        0x05 => Some(1), // print_char
        0x06 => Some(1), // print_num
        0x07 => Some(1), // random
        0x08 => Some(1), // push
        0x09 => {
            if version <= 5 {
                Some(1) // pull
            } else {
                None
            }
        }
        0x0a => Some(1), // split_window
        0x0b => Some(1), // set_window
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_match_standard_mnemonics() {
        assert_eq!(op2_name(0x14), "add");
        assert_eq!(op1_name(0x0b, 3), "ret");
        assert_eq!(op0_name(0x0c, 3), "show_status");
        assert_eq!(op0_name(0x0c, 5), "unknown_0op");
    }

    #[test]
    fn not_stores_in_v4_but_call_1n_does_not_in_v5() {
        assert!(stores_result(0x0f, None, InstructionForm::Short, OperandCount::OP1, 4));
        assert!(!stores_result(0x0f, None, InstructionForm::Short, OperandCount::OP1, 5));
    }

    #[test]
    fn catch_only_stores_in_v5_plus() {
        assert!(!stores_result(0x09, None, InstructionForm::Short, OperandCount::OP0, 3));
        assert!(stores_result(0x09, None, InstructionForm::Short, OperandCount::OP0, 5));
    }

    #[test]
    fn push_does_not_store_but_call_vs2_does() {
        assert!(!stores_result(0x08, None, InstructionForm::Variable, OperandCount::VAR, 4));
        assert!(stores_result(0x0c, None, InstructionForm::Variable, OperandCount::VAR, 4));
    }

    #[test]
    fn scan_table_and_check_arg_count_have_a_branch() {
        assert!(has_branch(0x17, None, InstructionForm::Variable, OperandCount::VAR, 5));
        assert!(has_branch(0x1f, None, InstructionForm::Variable, OperandCount::VAR, 5));
        assert!(!has_branch(0x08, None, InstructionForm::Variable, OperandCount::VAR, 5));
    }

    #[test]
    fn je_in_variable_form_is_not_capped_to_two_operands() {
        assert_eq!(
            get_expected_operand_count(0x01, None, InstructionForm::Variable, OperandCount::OP2, 3),
            None
        );
        assert_eq!(
            get_expected_operand_count(0x02, None, InstructionForm::Variable, OperandCount::OP2, 3),
            Some(2)
        );
    }
}
