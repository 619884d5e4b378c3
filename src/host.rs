//! The capability seam between the interpreter core and whatever is
//! actually showing text and reading keystrokes (a terminal, a test
//! harness, a GUI). The core never touches a terminal directly; it calls
//! through `Host` and the concrete driver lives outside this crate.

use std::fmt;

#[derive(Debug, Clone)]
pub struct HostError {
    pub message: String,
}

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        HostError { message: message.into() }
    }
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "host error: {}", self.message)
    }
}

impl std::error::Error for HostError {}

impl From<std::io::Error> for HostError {
    fn from(error: std::io::Error) -> Self {
        HostError::new(format!("I/O error: {error}"))
    }
}

pub type HostResult<T> = Result<T, HostError>;

/// Outcome of a line read that can be cut short by a timer routine.
#[derive(Debug, Clone)]
pub enum TimedLineInput {
    Completed(String),
    TimedOut { partial: String },
}

/// Outcome of a single-character read with the same timer semantics.
#[derive(Debug, Clone, Copy)]
pub enum TimedCharInput {
    Completed(u16),
    TimedOut,
}

/// What a save/restore prompt resolved to.
#[derive(Debug, Clone)]
pub enum FilePrompt {
    Chosen(String),
    Cancelled,
}

/// Everything the interpreter needs from its environment: the screen, the
/// keyboard, and persistent storage for Quetzal files. Implementations
/// live outside this crate (a terminal driver, a test double, ...).
pub trait Host {
    fn print(&mut self, text: &str) -> HostResult<()>;
    fn print_char(&mut self, ch: char) -> HostResult<()>;

    fn split_window(&mut self, lines: u16) -> HostResult<()>;
    fn set_window(&mut self, window: u8) -> HostResult<()>;
    fn erase_window(&mut self, window: i16) -> HostResult<()>;
    fn erase_line(&mut self) -> HostResult<()>;
    fn set_cursor(&mut self, line: u16, column: u16) -> HostResult<()>;
    fn get_cursor(&mut self) -> HostResult<(u16, u16)>;
    fn set_text_style(&mut self, style: u16) -> HostResult<()>;
    fn set_buffer_mode(&mut self, buffered: bool) -> HostResult<()>;
    fn show_status(&mut self, location: &str, score_or_hours: i16, moves_or_minutes: u16, time_game: bool) -> HostResult<()>;

    fn terminal_size(&self) -> (u16, u16);

    /// Read a line of input, honoring an interrupt routine timer
    /// (`time_tenths` == 0 disables the timer). `terminating_chars`
    /// additionally ends input early in v5+ (the char is appended to the
    /// returned text so the caller can see which one fired).
    fn read_line(&mut self, time_tenths: u16, terminating_chars: &[u8]) -> HostResult<TimedLineInput>;

    /// Read one character (`read_char`), subject to the same timer.
    fn read_char(&mut self, time_tenths: u16) -> HostResult<TimedCharInput>;

    /// Prompt for a filename to save/restore, returning `Cancelled` if the
    /// user backs out.
    fn prompt_save_filename(&mut self) -> HostResult<FilePrompt>;
    fn prompt_restore_filename(&mut self) -> HostResult<FilePrompt>;
    /// Ask to overwrite an existing save file; `false` aborts the save.
    fn confirm_overwrite(&mut self, filename: &str) -> HostResult<bool>;

    fn write_file(&mut self, filename: &str, data: &[u8]) -> HostResult<()>;
    fn read_file(&mut self, filename: &str) -> HostResult<Vec<u8>>;

    /// Append text to the running transcript (`output_stream 2`).
    fn append_transcript(&mut self, text: &str) -> HostResult<()>;

    /// Switch keyboard input to a command-playback file (`input_stream 1`);
    /// `None` switches back to the keyboard.
    fn select_input_playback(&mut self, filename: Option<&str>) -> HostResult<()>;
    /// Next line from the active playback file, or `None` at end of file /
    /// when reading from the keyboard.
    fn read_playback_line(&mut self) -> HostResult<Option<String>>;
}
