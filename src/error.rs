//! Unified error type for the Z-Machine core.
//!
//! Every fallible core API returns `Result<T, ZMachineError>` rather than a
//! bare `String`, so callers can match on kind instead of scraping messages.

use std::fmt;

/// The error kinds a running story can trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZMachineError {
    /// A write landed at or past `static_mem_base`.
    IllegalWrite { address: u32 },
    /// A computed address or object id fell outside the valid range.
    InvalidMemory { detail: String },
    /// An operand was out of range for the operation (attribute number,
    /// property number, etc).
    InvalidArgument { detail: String },
    /// A property operation was attempted on a property whose size doesn't
    /// support it (e.g. `get_property_data`/`set_property_data` on a
    /// property whose size isn't 1 or 2).
    InvalidObjectState { detail: String },
    /// A variable number had no meaning (shouldn't happen - all 0..=255 are
    /// valid - kept for API symmetry with other out-of-range kinds).
    VariableOutOfRange { variable: u8 },
    /// A Z-string could not be decoded (ran off the end of memory, etc).
    ZsciiDecodeError { detail: String },
    /// The decoder encountered an opcode number it doesn't implement.
    UnrecognizedOpcode { opcode: u8, form: &'static str },
    /// A Quetzal save/restore or output-stream operation failed.
    StreamError { detail: String },
    /// The evaluation stack underflowed (popped past the dummy frame).
    StackUnderflow,
    /// The evaluation stack grew past its 1024-word bound.
    StackOverflow,
}

impl fmt::Display for ZMachineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZMachineError::IllegalWrite { address } => {
                write!(f, "illegal write to static memory at {address:#06x}")
            }
            ZMachineError::InvalidMemory { detail } => write!(f, "invalid memory access: {detail}"),
            ZMachineError::InvalidArgument { detail } => write!(f, "invalid argument: {detail}"),
            ZMachineError::InvalidObjectState { detail } => {
                write!(f, "invalid object state: {detail}")
            }
            ZMachineError::VariableOutOfRange { variable } => {
                write!(f, "variable out of range: {variable}")
            }
            ZMachineError::ZsciiDecodeError { detail } => write!(f, "ZSCII decode error: {detail}"),
            ZMachineError::UnrecognizedOpcode { opcode, form } => {
                write!(f, "unrecognized {form} opcode {opcode:#04x}")
            }
            ZMachineError::StreamError { detail } => write!(f, "stream error: {detail}"),
            ZMachineError::StackUnderflow => write!(f, "stack underflow"),
            ZMachineError::StackOverflow => write!(f, "stack overflow"),
        }
    }
}

impl std::error::Error for ZMachineError {}

impl From<std::io::Error> for ZMachineError {
    fn from(error: std::io::Error) -> Self {
        ZMachineError::StreamError {
            detail: format!("I/O error: {error}"),
        }
    }
}

pub type ZResult<T> = Result<T, ZMachineError>;
