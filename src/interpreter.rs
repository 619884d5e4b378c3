//! The fetch-decode-execute loop: variable access, branching, routine
//! calls, and the opcode dispatch that hands off to `opcodes::*`.

use crate::dictionary;
use crate::error::{ZMachineError, ZResult};
use crate::host::{Host, TimedCharInput, TimedLineInput};
use crate::instruction::{BranchInfo, Instruction, OperandCount};
use crate::object::ObjectTable;
use crate::quetzal;
use crate::stack::CallKind;
use crate::streams::Streams;
use crate::text;
use crate::vm::VM;
use log::{debug, info, warn};

/// Outcome of executing a single instruction, mirroring how the PC was (or
/// wasn't) already advanced by the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionResult {
    Continue,
    Branched,
    Called,
    Returned(u16),
    Quit,
    GameOver,
}

/// Top-level interpreter state machine (spec §4.1): whether the main loop
/// is running, blocked on a `read`/`read_char`, or finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    WaitingForInput,
    Quitting,
}

pub struct Interpreter<H: Host> {
    pub vm: VM,
    pub host: H,
    pub streams: Streams,
    pub state: RunState,
}

impl<H: Host> Interpreter<H> {
    pub fn new(vm: VM, host: H) -> Self {
        Interpreter {
            vm,
            host,
            streams: Streams::new(),
            state: RunState::Running,
        }
    }

    /// Run until the game quits or a fatal error is hit.
    pub fn run(&mut self) -> ZResult<()> {
        loop {
            match self.step()? {
                ExecutionResult::Quit | ExecutionResult::GameOver => {
                    self.state = RunState::Quitting;
                    return Ok(());
                }
                _ => {}
            }
            if self.state == RunState::Quitting {
                return Ok(());
            }
        }
    }

    /// Fetch, decode, and execute the instruction at the current PC.
    pub fn step(&mut self) -> ZResult<ExecutionResult> {
        let version = self.vm.game.header.version;
        let pc = self.vm.pc as usize;
        let inst = Instruction::decode(self.vm.game.memory.as_slice(), pc, version)?;
        self.vm.pc += inst.size as u32;
        self.execute_instruction(&inst)
    }

    pub fn read_variable(&mut self, var: u8) -> ZResult<u16> {
        match var {
            0 => self.vm.stack.pop_value(),
            1..=15 => self.vm.stack.get_local(var),
            _ => Ok(self.vm.read_global(var - 16)),
        }
    }

    pub fn write_variable(&mut self, var: u8, value: u16) -> ZResult<()> {
        match var {
            0 => self.vm.stack.push_value(value),
            1..=15 => self.vm.stack.set_local(var, value),
            _ => self.vm.write_global(var - 16, value),
        }
    }

    /// Take (or don't) the branch attached to `inst.branch`, per spec §5.3.
    /// `rfalse`/`rtrue` short-circuits (offset 0/1) return from the current
    /// routine instead of jumping.
    pub fn do_branch(&mut self, branch: &Option<BranchInfo>, condition: bool) -> ZResult<ExecutionResult> {
        let Some(branch) = branch else {
            return Ok(ExecutionResult::Continue);
        };
        if condition != branch.on_true {
            return Ok(ExecutionResult::Continue);
        }
        match branch.offset {
            0 => self.do_return(0),
            1 => self.do_return(1),
            offset => {
                self.vm.pc = (self.vm.pc as i32 + offset as i32 - 2) as u32;
                Ok(ExecutionResult::Branched)
            }
        }
    }

    /// Read a variable referenced *indirectly* (by a variable-number
    /// operand, as in `load`/`inc`/`dec`/`dec_chk`): per spec §6.3.4, an
    /// indirect reference to the stack pointer peeks the top of stack
    /// rather than popping it.
    pub fn read_indirect_variable(&mut self, var: u8) -> ZResult<u16> {
        if var == 0 {
            self.vm.stack.peek_value()
        } else {
            self.read_variable(var)
        }
    }

    /// Write a variable referenced indirectly (`store`/`pull`/`inc`/`dec`):
    /// an indirect write to the stack pointer replaces the top of stack
    /// rather than pushing a new value.
    pub fn write_indirect_variable(&mut self, var: u8, value: u16) -> ZResult<()> {
        if var == 0 {
            self.vm.stack.pop_value()?;
            self.vm.stack.push_value(value)
        } else {
            self.write_variable(var, value)
        }
    }

    /// `call`/`call_1n`/`call_2s`/... and the host-driven direct-call pump
    /// used for `read`'s interrupt routine: unpack the address, push a new
    /// frame, and prime locals from the routine header (v1-4) or zero them
    /// out with arguments overlaid (v5+).
    pub fn do_call(&mut self, packed_addr: u16, args: &[u16], kind: CallKind) -> ZResult<ExecutionResult> {
        if packed_addr == 0 {
            if let CallKind::Store(var) = kind {
                self.write_variable(var, 0)?;
            }
            return Ok(ExecutionResult::Called);
        }
        let version = self.vm.game.header.version;
        let addr = self.vm.game.memory.unpack_addr(packed_addr, version);
        let num_locals = (self.vm.game.memory.read_byte(addr) as usize).min(15);
        let mut locals = [0u16; 15];
        let mut body = addr + 1;
        if version <= 4 {
            for local in locals.iter_mut().take(num_locals) {
                *local = self.vm.game.memory.read_word(body);
                body += 2;
            }
        }
        for (i, &arg) in args.iter().enumerate().take(num_locals) {
            locals[i] = arg;
        }
        self.vm.stack.push_frame(self.vm.pc, kind, &locals[..num_locals], args.len() as u8)?;
        self.vm.pc = body;
        debug!("call to {addr:#06x} with {} arg(s), {num_locals} local(s)", args.len());
        Ok(ExecutionResult::Called)
    }

    /// Run `routine_addr` to completion right now via a `DirectCall` frame,
    /// for host-invoked interrupt routines (the `read` timeout callback).
    /// Returns the routine's return value.
    pub fn call_direct(&mut self, routine_addr: u16) -> ZResult<u16> {
        let mark = self.vm.stack.depth();
        self.do_call(routine_addr, &[], CallKind::DirectCall)?;
        let mut value = 0u16;
        const MAX_INTERRUPT_INSTRUCTIONS: u32 = 100_000;
        let mut n = 0;
        while self.vm.stack.depth() > mark {
            n += 1;
            if n > MAX_INTERRUPT_INSTRUCTIONS {
                return Err(ZMachineError::StreamError {
                    detail: "interrupt routine ran too long".into(),
                });
            }
            match self.step()? {
                ExecutionResult::Returned(v) => value = v,
                ExecutionResult::Quit | ExecutionResult::GameOver => {
                    return Err(ZMachineError::StreamError {
                        detail: "interrupt routine tried to quit/end the game".into(),
                    })
                }
                _ => {}
            }
        }
        Ok(value)
    }

    pub fn do_return(&mut self, value: u16) -> ZResult<ExecutionResult> {
        let (return_pc, kind) = self.vm.stack.return_from_frame()?;
        self.finish_return(return_pc, kind, value)
    }

    /// `throw value frame`: unwind straight to the frame a prior `catch`
    /// marked, then return from it as `do_return` would.
    pub fn do_throw(&mut self, value: u16, frame_index: u16) -> ZResult<ExecutionResult> {
        let (return_pc, kind) = self.vm.stack.throw(frame_index)?;
        self.finish_return(return_pc, kind, value)
    }

    fn finish_return(&mut self, return_pc: u32, kind: CallKind, value: u16) -> ZResult<ExecutionResult> {
        self.vm.pc = return_pc;
        match kind {
            CallKind::Store(var) => self.write_variable(var, value)?,
            CallKind::Discard | CallKind::DirectCall => {}
        }
        if self.vm.stack.depth() == 1 {
            return Ok(ExecutionResult::GameOver);
        }
        Ok(ExecutionResult::Returned(value))
    }

    /// Decode an object's short name for `print_obj`/status-line display.
    pub fn object_short_name(&self, obj_num: u16) -> ZResult<String> {
        if obj_num == 0 {
            return Ok(String::new());
        }
        let table = self.vm.property_table_addr(obj_num)?;
        if table == 0 {
            return Ok(String::new());
        }
        let (name, _) = text::decode_string(
            self.vm.game.memory.as_slice(),
            table as usize + 1,
            self.vm.config.abbrev_table_addr as usize,
        )?;
        Ok(name)
    }

    pub fn print(&mut self, text: &str) -> ZResult<()> {
        self.streams.print(text, &mut self.host)
    }

    /// Resolve each operand to its actual value: a `Variable` operand names
    /// a variable to read (variable 0 pops the eval stack), anything else
    /// is used literally.
    pub fn resolve_operands(&mut self, inst: &Instruction) -> ZResult<Vec<u16>> {
        let mut values = Vec::with_capacity(inst.operands.len());
        for (i, &operand) in inst.operands.iter().enumerate() {
            let value = match inst.operand_types[i] {
                crate::instruction::OperandType::Variable => self.read_variable(operand as u8)?,
                _ => operand,
            };
            values.push(value);
        }
        Ok(values)
    }

    fn execute_instruction(&mut self, inst: &Instruction) -> ZResult<ExecutionResult> {
        let operands = self.resolve_operands(inst)?;
        match inst.form {
            crate::instruction::InstructionForm::Extended => crate::opcodes::control::execute_ext(self, inst, &operands),
            _ => match inst.operand_count {
                OperandCount::OP0 => crate::opcodes::control::execute_0op(self, inst, &operands),
                OperandCount::OP1 => crate::opcodes::control::execute_1op(self, inst, &operands),
                OperandCount::OP2 => crate::opcodes::control::execute_2op(self, inst, &operands),
                OperandCount::VAR => crate::opcodes::control::execute_var(self, inst, &operands),
            },
        }
    }

    /// `sread`/`aread`: tokenize a line of input into the parse buffer,
    /// with v5+'s timer/terminating-character support. Returns the ZSCII
    /// terminating character (13 for a plain Enter, 0 if the read timed
    /// out, or whichever byte from the terminating-characters table ended
    /// the line in v5+) for `aread`'s store postamble.
    pub fn do_read(&mut self, text_buffer: u16, parse_buffer: u16, time_tenths: u16, routine: u16) -> ZResult<u8> {
        let version = self.vm.game.header.version;
        let max_len = self.vm.game.memory.read_byte(text_buffer as u32) as usize;
        let terminators = self.terminating_chars();

        // v5+: a nonzero initial buffer byte means the buffer already holds
        // that many characters; new input is appended rather than replacing
        // it outright.
        let mut prefill = String::new();
        if version >= 5 {
            let existing_len = self.vm.game.memory.read_byte(text_buffer as u32 + 1) as u32;
            for i in 0..existing_len {
                prefill.push(self.vm.game.memory.read_byte(text_buffer as u32 + 2 + i) as char);
            }
        }

        let input = self
            .host
            .read_line(time_tenths, &terminators)
            .map_err(|e| ZMachineError::StreamError { detail: e.to_string() })?;

        let (line, terminator) = match input {
            TimedLineInput::Completed(text) => match text.as_bytes().last() {
                Some(&last) if terminators.contains(&last) => (text[..text.len() - 1].to_string(), last),
                _ => (text, 13),
            },
            TimedLineInput::TimedOut { partial } => {
                if routine != 0 {
                    self.call_direct(routine)?;
                }
                (partial, 0)
            }
        };
        let line = line.to_lowercase();
        let combined = format!("{prefill}{line}");
        let truncated: String = combined.chars().take(max_len).collect();

        if version >= 5 {
            let len = truncated.len().min(255);
            self.vm.game.memory.write_byte(text_buffer as u32 + 1, len as u8)?;
            for (i, ch) in truncated.bytes().enumerate() {
                self.vm.game.memory.write_byte(text_buffer as u32 + 2 + i as u32, ch)?;
            }
        } else {
            for (i, ch) in truncated.bytes().enumerate() {
                self.vm.game.memory.write_byte(text_buffer as u32 + 1 + i as u32, ch)?;
            }
            self.vm.game.memory.write_byte(text_buffer as u32 + 1 + truncated.len() as u32, 0)?;
        }

        if parse_buffer != 0 {
            self.tokenize_into(parse_buffer, &truncated)?;
        }
        Ok(terminator)
    }

    fn terminating_chars(&self) -> Vec<u8> {
        let version = self.vm.game.header.version;
        if version < 5 || self.vm.config.terminating_chars_table == 0 {
            return Vec::new();
        }
        let mut out = Vec::new();
        let mut addr = self.vm.config.terminating_chars_table;
        loop {
            let b = self.vm.game.memory.read_byte(addr);
            if b == 0 {
                break;
            }
            out.push(b);
            addr += 1;
        }
        out
    }

    /// Shared by `sread`/`aread`/`tokenise`: tokenize `line` against the
    /// story's dictionary and write the parse buffer (spec §3).
    pub fn tokenize_into(&mut self, parse_buffer: u16, line: &str) -> ZResult<()> {
        let dict_addr = self.vm.config.dictionary_addr as usize;
        let memory = self.vm.game.memory.as_slice();
        let n_sep = memory[dict_addr] as usize;
        let separators: Vec<char> = memory[dict_addr + 1..dict_addr + 1 + n_sep].iter().map(|&b| b as char).collect();
        let entry_key_len = if self.vm.game.header.version <= 3 { 4 } else { 6 };

        let tokens = dictionary::tokenize(line, &separators);
        let max_tokens = self.vm.game.memory.read_byte(parse_buffer as u32) as usize;
        // Text buffer layout: v3 is `{max}{chars...}0`, so text starts at
        // text_buf+1; v4/5 is `{max}{count}{chars...}`, so text starts at
        // text_buf+2. Stored positions must match whichever layout the
        // game used to fill the text buffer this parse is reading from.
        let text_origin: u32 = if self.vm.game.header.version <= 3 { 1 } else { 2 };

        self.vm.game.memory.write_byte(parse_buffer as u32 + 1, tokens.len().min(max_tokens) as u8)?;
        for (i, token) in tokens.iter().take(max_tokens).enumerate() {
            let entry = dictionary::lookup(self.vm.game.memory.as_slice(), dict_addr, &token.text, entry_key_len);
            let base = parse_buffer as u32 + 2 + i as u32 * 4;
            self.vm.game.memory.write_word(base, entry.unwrap_or(0) as u16)?;
            self.vm.game.memory.write_byte(base + 2, token.length as u8)?;
            self.vm.game.memory.write_byte(base + 3, (token.start as u32 + text_origin) as u8)?;
        }
        Ok(())
    }

    /// Read a text buffer's raw ZSCII content (for `tokenise`, which takes
    /// a buffer already filled by the game rather than reading a new line).
    pub fn read_text_buffer(&self, text_buffer: u16) -> String {
        let version = self.vm.game.header.version;
        let base = text_buffer as u32;
        if version >= 5 {
            let len = self.vm.game.memory.read_byte(base + 1) as u32;
            (0..len).map(|i| self.vm.game.memory.read_byte(base + 2 + i) as char).collect()
        } else {
            let mut s = String::new();
            let mut i = 1u32;
            loop {
                let b = self.vm.game.memory.read_byte(base + i);
                if b == 0 {
                    break;
                }
                s.push(b as char);
                i += 1;
            }
            s
        }
    }

    pub fn do_read_char(&mut self, time_tenths: u16, routine: u16) -> ZResult<u16> {
        let input = self
            .host
            .read_char(time_tenths)
            .map_err(|e| ZMachineError::StreamError { detail: e.to_string() })?;
        match input {
            TimedCharInput::Completed(code) => Ok(code),
            TimedCharInput::TimedOut => {
                if routine != 0 {
                    self.call_direct(routine)?;
                }
                Ok(0)
            }
        }
    }

    pub fn do_save(&mut self) -> ZResult<bool> {
        quetzal::save(self)
    }

    pub fn do_restore(&mut self) -> ZResult<bool> {
        quetzal::restore(self)
    }

    pub fn do_save_undo(&mut self) -> ZResult<u16> {
        let dynamic = self.vm.game.memory.dynamic_slice().to_vec();
        self.vm.undo.push(dynamic, self.vm.pc, &self.vm.stack)?;
        Ok(1)
    }

    pub fn do_restore_undo(&mut self) -> ZResult<u16> {
        let Some(snapshot) = self.vm.undo.pop() else {
            return Ok(0);
        };
        self.vm.game.memory.reset_dynamic(&snapshot.dynamic_memory);
        self.vm.pc = snapshot.pc;
        self.vm.stack = crate::stack::Stack::deserialize(&snapshot.stack_bytes)?;
        Ok(2)
    }

    pub fn do_restart(&mut self) {
        self.vm.restart();
        self.streams = Streams::new();
        info!("restart handled by interpreter");
    }

    pub fn do_quit(&mut self) {
        self.state = RunState::Quitting;
        info!("quit");
    }

    pub fn output_stream(&mut self, stream: i16, table_addr: Option<u32>) -> ZResult<()> {
        if stream.unsigned_abs() == 3 && stream < 0 {
            self.streams.close_memory_stream(&mut self.vm.game.memory)?;
            return Ok(());
        }
        let version = self.vm.game.header.version;
        self.streams.select_output(stream, table_addr, version)
    }

    pub fn input_stream(&mut self, stream: i16) -> ZResult<()> {
        if stream == 0 {
            self.host
                .select_input_playback(None)
                .map_err(|e| ZMachineError::StreamError { detail: e.to_string() })?;
        } else {
            warn!("input_stream {stream}: command-file playback selection is host-driven");
        }
        Ok(())
    }
}
