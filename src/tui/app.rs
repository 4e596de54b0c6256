//! Debugger application state and logic.

use crate::config::MachineConfig;
use crate::error::Error;
use crate::program::disasm::disassemble_at;
use crate::Cpu;
use std::collections::HashSet;

/// Bytes shown per row of the memory view.
pub const MEM_ROW_BYTES: usize = 8;

/// Debugger application state.
pub struct DebuggerApp {
    /// The CPU being debugged.
    pub cpu: Cpu,
    /// Original program for reference.
    pub program: Vec<u8>,
    /// Values emitted by PRN and MUL since the last reset.
    pub output: Vec<u8>,
    /// Breakpoints (by address).
    pub breakpoints: HashSet<usize>,
    /// Is the debugger running continuously?
    pub running: bool,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
    /// Memory view scroll offset, in rows.
    pub mem_scroll: usize,
}

impl DebuggerApp {
    /// Create a new debugger with a loaded program.
    pub fn new(program: Vec<u8>, config: MachineConfig) -> Result<Self, Error> {
        let mut cpu = Cpu::with_config(config)?;
        cpu.load_program(&program)?;

        Ok(Self {
            cpu,
            program,
            output: Vec::new(),
            breakpoints: HashSet::new(),
            running: false,
            should_quit: false,
            status: "Ready. Press 's' to step, 'r' to run, 'q' to quit.".into(),
            mem_scroll: 0,
        })
    }

    /// Step one instruction.
    pub fn step(&mut self) {
        if !self.cpu.is_running() {
            self.status = format!("CPU stopped: {:?}", self.cpu.state);
            self.running = false;
            return;
        }

        let pc = self.cpu.pc;
        match self.cpu.step(&mut self.output) {
            Ok(_) => {
                let (text, _) = disassemble_at(self.cpu.mem.as_slice(), pc);
                self.status = format!("PC={:02X}: {}", pc, text);
            }
            Err(e) => {
                self.status = format!("Error: {}", e);
                self.running = false;
            }
        }
    }

    /// Run until halt, breakpoint, or error.
    ///
    /// When PC sits on a breakpoint, that instruction runs first so the
    /// debugger does not stop on it again.
    pub fn run(&mut self) {
        self.running = true;
        if self.breakpoints.contains(&self.cpu.pc) {
            self.step();
        }
        if self.running {
            self.status = "Running...".into();
        }
    }

    /// Pause continuous execution.
    pub fn pause(&mut self) {
        self.running = false;
        self.status = "Paused.".into();
    }

    /// Run one iteration of continuous execution.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }

        if !self.cpu.is_running() {
            self.running = false;
            self.status = format!("{:?} after {} cycles", self.cpu.state, self.cpu.cycles);
            return;
        }

        // Check for breakpoint
        let pc = self.cpu.pc;
        if self.breakpoints.contains(&pc) {
            self.running = false;
            self.status = format!("Breakpoint at PC={:02X}", pc);
            return;
        }

        self.step();
    }

    /// Toggle breakpoint at current PC.
    pub fn toggle_breakpoint(&mut self) {
        let pc = self.cpu.pc;
        if self.breakpoints.remove(&pc) {
            self.status = format!("Removed breakpoint at PC={:02X}", pc);
        } else {
            self.breakpoints.insert(pc);
            self.status = format!("Set breakpoint at PC={:02X}", pc);
        }
    }

    /// Reset CPU to initial state and reload the program.
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.output.clear();
        self.running = false;
        self.status = match self.cpu.load_program(&self.program) {
            Ok(()) => "Reset. Ready.".into(),
            Err(e) => format!("Reset failed: {}", e),
        };
    }

    /// Scroll the memory view by `delta` rows.
    pub fn scroll_memory(&mut self, delta: isize) {
        let rows = self.cpu.mem.len().div_ceil(MEM_ROW_BYTES);
        let max = rows.saturating_sub(1);
        self.mem_scroll = self.mem_scroll.saturating_add_signed(delta).min(max);
    }

    /// Get disassembly around current PC.
    ///
    /// Instructions are found by a linear sweep from address 0, restarting
    /// at PC so the current instruction always lines up.
    pub fn get_disassembly(&self, lines: usize) -> Vec<(usize, String, bool)> {
        let mem = self.cpu.mem.as_slice();
        let pc = self.cpu.pc;

        let mut listing = Vec::new();
        let mut addr = 0;
        while addr < mem.len() {
            if addr > pc && listing.last().is_some_and(|(a, _, _)| *a < pc) {
                addr = pc;
            }
            let (text, size) = disassemble_at(mem, addr);
            listing.push((addr, text, addr == pc));
            addr += size;
        }

        let current = listing.iter().position(|(_, _, is_pc)| *is_pc).unwrap_or(0);
        let start = current.saturating_sub(lines / 2);
        listing.into_iter().skip(start).take(lines).collect()
    }
}

/// Run the debugger with a program.
pub fn run_debugger(program: Vec<u8>, config: MachineConfig) -> Result<(), Error> {
    use crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::prelude::*;
    use std::io::stdout;
    use std::time::Duration;

    let mut app = DebuggerApp::new(program, config)?;

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    // Main loop
    loop {
        terminal.draw(|frame| {
            super::ui::draw(frame, &app);
        })?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') => app.should_quit = true,
                        KeyCode::Char('s') => {
                            app.running = false;
                            app.step();
                        }
                        KeyCode::Char('r') => app.run(),
                        KeyCode::Char('p') => app.pause(),
                        KeyCode::Char('b') => app.toggle_breakpoint(),
                        KeyCode::Char('x') => app.reset(),
                        KeyCode::Up => app.scroll_memory(-1),
                        KeyCode::Down => app.scroll_memory(1),
                        KeyCode::PageUp => app.scroll_memory(-8),
                        KeyCode::PageDown => app.scroll_memory(8),
                        _ => {}
                    }
                }
            }
        }

        // Tick for continuous running
        if app.running {
            app.tick();
        }

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
}
