//! TUI debugger for the LS-8 emulator.
//!
//! Provides an interactive terminal-based debugger with:
//! - Register panel with FL flag bits
//! - Hex memory view highlighting PC and the stack
//! - Step/run/breakpoint controls
//! - Disassembly view and program output

mod app;
mod ui;

pub use app::{DebuggerApp, run_debugger};
