//! Shared test fixtures: a `Host` test double and minimal hand-assembled
//! story images, in the style of the corpus's own component tests (see
//! `src/header.rs`'s `sample_header`) but built up far enough to run full
//! instructions through `Interpreter::step`.

use std::collections::HashMap;
use zinterp::host::{FilePrompt, Host, HostResult, TimedCharInput, TimedLineInput};

/// Records everything printed and backs save/restore with an in-memory
/// "filesystem" instead of touching disk.
pub struct MockHost {
    pub output: String,
    pub transcript: String,
    pub files: HashMap<String, Vec<u8>>,
    pub next_save_name: String,
    pub next_restore_name: Option<String>,
    pub scripted_lines: Vec<String>,
}

impl MockHost {
    pub fn new() -> Self {
        MockHost {
            output: String::new(),
            transcript: String::new(),
            files: HashMap::new(),
            next_save_name: "game.sav".to_string(),
            next_restore_name: None,
            scripted_lines: Vec::new(),
        }
    }

    pub fn with_restore_target(name: &str) -> Self {
        let mut host = MockHost::new();
        host.next_restore_name = Some(name.to_string());
        host
    }
}

impl Default for MockHost {
    fn default() -> Self {
        MockHost::new()
    }
}

impl Host for MockHost {
    fn print(&mut self, text: &str) -> HostResult<()> {
        self.output.push_str(text);
        Ok(())
    }

    fn print_char(&mut self, ch: char) -> HostResult<()> {
        self.output.push(ch);
        Ok(())
    }

    fn split_window(&mut self, _lines: u16) -> HostResult<()> {
        Ok(())
    }

    fn set_window(&mut self, _window: u8) -> HostResult<()> {
        Ok(())
    }

    fn erase_window(&mut self, _window: i16) -> HostResult<()> {
        Ok(())
    }

    fn erase_line(&mut self) -> HostResult<()> {
        Ok(())
    }

    fn set_cursor(&mut self, _line: u16, _column: u16) -> HostResult<()> {
        Ok(())
    }

    fn get_cursor(&mut self) -> HostResult<(u16, u16)> {
        Ok((1, 1))
    }

    fn set_text_style(&mut self, _style: u16) -> HostResult<()> {
        Ok(())
    }

    fn set_buffer_mode(&mut self, _buffered: bool) -> HostResult<()> {
        Ok(())
    }

    fn show_status(&mut self, _location: &str, _score_or_hours: i16, _moves_or_minutes: u16, _time_game: bool) -> HostResult<()> {
        Ok(())
    }

    fn terminal_size(&self) -> (u16, u16) {
        (80, 24)
    }

    fn read_line(&mut self, _time_tenths: u16, _terminating_chars: &[u8]) -> HostResult<TimedLineInput> {
        if self.scripted_lines.is_empty() {
            return Ok(TimedLineInput::Completed(String::new()));
        }
        Ok(TimedLineInput::Completed(self.scripted_lines.remove(0)))
    }

    fn read_char(&mut self, _time_tenths: u16) -> HostResult<TimedCharInput> {
        Ok(TimedCharInput::Completed(13))
    }

    fn prompt_save_filename(&mut self) -> HostResult<FilePrompt> {
        Ok(FilePrompt::Chosen(self.next_save_name.clone()))
    }

    fn prompt_restore_filename(&mut self) -> HostResult<FilePrompt> {
        match &self.next_restore_name {
            Some(name) => Ok(FilePrompt::Chosen(name.clone())),
            None => Ok(FilePrompt::Cancelled),
        }
    }

    fn confirm_overwrite(&mut self, _filename: &str) -> HostResult<bool> {
        Ok(true)
    }

    fn write_file(&mut self, filename: &str, data: &[u8]) -> HostResult<()> {
        self.files.insert(filename.to_string(), data.to_vec());
        Ok(())
    }

    fn read_file(&mut self, filename: &str) -> HostResult<Vec<u8>> {
        self.files
            .get(filename)
            .cloned()
            .ok_or_else(|| zinterp::host::HostError::new(format!("no such file: {filename}")))
    }

    fn append_transcript(&mut self, text: &str) -> HostResult<()> {
        self.transcript.push_str(text);
        Ok(())
    }

    fn select_input_playback(&mut self, _filename: Option<&str>) -> HostResult<()> {
        Ok(())
    }

    fn read_playback_line(&mut self) -> HostResult<Option<String>> {
        Ok(None)
    }
}

/// A bare v3 story image: 64-byte header plus room for code/objects/globals,
/// with the fields every test needs already wired up. Individual tests poke
/// in whatever code/data they need past `CODE_START`.
pub const STATIC_MEM_BASE: u16 = 0x4000;
pub const OBJECT_TABLE_BASE: u16 = 0x0100;
pub const GLOBALS_BASE: u16 = 0x0400;
pub const DICTIONARY_BASE: u16 = 0x0600;
pub const CODE_START: u16 = 0x1000;

pub fn minimal_v3_story(initial_pc: u16) -> Vec<u8> {
    let mut mem = vec![0u8; STATIC_MEM_BASE as usize + 0x100];
    mem[0x00] = 3; // version
    mem[0x02] = 0x00;
    mem[0x03] = 0x01; // release 1
    mem[0x06] = (initial_pc >> 8) as u8;
    mem[0x07] = (initial_pc & 0xff) as u8;
    mem[0x08] = (DICTIONARY_BASE >> 8) as u8;
    mem[0x09] = (DICTIONARY_BASE & 0xff) as u8;
    mem[0x0a] = (OBJECT_TABLE_BASE >> 8) as u8;
    mem[0x0b] = (OBJECT_TABLE_BASE & 0xff) as u8;
    mem[0x0c] = (GLOBALS_BASE >> 8) as u8;
    mem[0x0d] = (GLOBALS_BASE & 0xff) as u8;
    mem[0x0e] = (STATIC_MEM_BASE >> 8) as u8;
    mem[0x0f] = (STATIC_MEM_BASE & 0xff) as u8;
    mem[0x12..0x18].copy_from_slice(b"000001");
    // file length field is in units of 2 for v3; round the real length up.
    let file_len_units = (mem.len() / 2) as u16;
    mem[0x1a] = (file_len_units >> 8) as u8;
    mem[0x1b] = (file_len_units & 0xff) as u8;
    mem
}

/// Patches in the checksum the header declares, summing bytes from 0x40 to
/// the declared file length (mirrors what a real compiler bakes in).
pub fn fix_checksum(mem: &mut [u8]) {
    let file_len_units = ((mem[0x1a] as usize) << 8) | mem[0x1b] as usize;
    let file_len = file_len_units * 2;
    let end = file_len.min(mem.len());
    let sum = mem[0x40..end].iter().fold(0u16, |acc, &b| acc.wrapping_add(b as u16));
    mem[0x1c] = (sum >> 8) as u8;
    mem[0x1d] = (sum & 0xff) as u8;
}
