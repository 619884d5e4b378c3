//! The loaded game and the virtual machine state that executes it.

use crate::config::Config;
use crate::error::ZResult;
use crate::header::{self, Header};
use crate::memory::Memory;
use crate::stack::Stack;
use crate::undo::UndoStack;
use crate::zrand::ZRand;
use log::info;

/// An unpacked story file: the parsed header plus a pristine copy of the
/// compiled image, kept around for `restart` and for Quetzal's
/// compressed-memory diff.
pub struct Game {
    pub memory: Memory,
    pub header: Header,
    pub original_memory: Vec<u8>,
}

impl Game {
    pub fn load(bytes: Vec<u8>) -> ZResult<Self> {
        let header = Header::parse(&bytes);
        let original_memory = bytes.clone();
        let memory = Memory::new(bytes, header.static_mem_base as u32);
        Ok(Game {
            memory,
            header,
            original_memory,
        })
    }
}

/// The running interpreter state: the loaded game, program counter, call
/// stack, shared configuration, RNG, and undo history.
pub struct VM {
    pub game: Game,
    pub pc: u32,
    pub stack: Stack,
    pub config: Config,
    pub rand: ZRand,
    pub undo: UndoStack,
}

impl VM {
    pub fn new(bytes: Vec<u8>, screen_width: u16, screen_height: u16) -> ZResult<Self> {
        let game = Game::load(bytes)?;
        let config = Config::new(&game.header, screen_width, screen_height);
        let pc = game.header.initial_pc as u32;
        info!(
            "loaded version {} story, release {}, serial {}",
            game.header.version,
            game.header.release,
            game.header.serial_string()
        );
        let mut vm = VM {
            game,
            pc,
            stack: Stack::new(),
            config,
            rand: ZRand::new_uniform(),
            undo: UndoStack::new(),
        };
        vm.config.sync_to_memory(&mut vm.game.memory);
        Ok(vm)
    }

    /// Reset dynamic memory, the PC, and the call stack to their initial
    /// state, preserving the transcription flag across the reset.
    pub fn restart(&mut self) {
        let previous_flags2 = self.game.memory.read_word(header::offset::FLAGS2);
        self.game.memory.reset_dynamic(&self.game.original_memory);
        self.config
            .resync_preserving_flags2(&mut self.game.memory, previous_flags2);
        self.pc = self.game.header.initial_pc as u32;
        self.stack = Stack::new();
        self.undo = UndoStack::new();
        info!("restarted");
    }

    pub fn global_addr(&self, global_number: u8) -> u32 {
        self.game.header.global_variables as u32 + global_number as u32 * 2
    }

    pub fn read_global(&self, global_number: u8) -> u16 {
        self.game.memory.read_word(self.global_addr(global_number))
    }

    pub fn write_global(&mut self, global_number: u8, value: u16) -> ZResult<()> {
        let addr = self.global_addr(global_number);
        self.game.memory.force_write_word(addr, value);
        Ok(())
    }
}
