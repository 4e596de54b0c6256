//! Crate-level error type and process exit codes.

use crate::config::ConfigError;
use crate::cpu::{CpuError, MemoryError};
use crate::program::{AssemblerError, LoadError};
use thiserror::Error;

/// Exit codes reported by the `ls8-emu` binary.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const FAILURE: i32 = 1;
    pub const UNSUPPORTED_EXTENSION: i32 = 2;
    pub const FILE_NOT_FOUND: i32 = 3;
    pub const MALFORMED_PROGRAM: i32 = 4;
    pub const UNKNOWN_OPCODE: i32 = 5;
    pub const STACK_FAULT: i32 = 6;
    pub const MACHINE_FAULT: i32 = 7;
    pub const CYCLE_LIMIT: i32 = 8;
}

/// Anything that can stop a load-and-run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("{0}")]
    Load(#[from] LoadError),

    #[error("{0}")]
    Assembler(#[from] AssemblerError),

    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("failed to load program: {0}")]
    Image(#[from] MemoryError),

    #[error("{0}")]
    Cpu(#[from] CpuError),

    #[error("I/O error: {0}")]
    Io(String),

    /// The program was still running when the cycle budget ran out.
    #[error("no HLT within {0} cycles")]
    CycleLimit(u64),
}

impl Error {
    /// The process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Load(LoadError::UnsupportedExtension(_)) => exit_code::UNSUPPORTED_EXTENSION,
            Error::Load(LoadError::NotFound(_)) => exit_code::FILE_NOT_FOUND,
            Error::Load(LoadError::ParseError { .. }) => exit_code::MALFORMED_PROGRAM,
            Error::Load(LoadError::IoError(_)) => exit_code::FAILURE,
            Error::Image(_) => exit_code::MALFORMED_PROGRAM,
            Error::Cpu(e) if e.is_unknown_opcode() => exit_code::UNKNOWN_OPCODE,
            Error::Cpu(e) if e.is_stack_fault() => exit_code::STACK_FAULT,
            Error::Cpu(CpuError::Output(_)) => exit_code::FAILURE,
            Error::Cpu(_) => exit_code::MACHINE_FAULT,
            Error::CycleLimit(_) => exit_code::CYCLE_LIMIT,
            Error::Assembler(_) | Error::Config(_) | Error::Io(_) => exit_code::FAILURE,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}
