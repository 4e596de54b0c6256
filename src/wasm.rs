//! WebAssembly bindings for the LS-8 emulator.
//!
//! This module provides JavaScript-friendly wrappers around the core emulator.

use wasm_bindgen::prelude::*;
use crate::config::MachineConfig;
use crate::cpu::registers::REGISTER_COUNT;
use crate::Cpu;
use crate::program::{assemble, disassemble, parse_image};
use crate::program::disasm::disassemble_at;

fn js_err(e: impl std::fmt::Display) -> JsError {
    JsError::new(&e.to_string())
}

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// WebAssembly-friendly CPU wrapper.
#[wasm_bindgen]
pub struct WasmCpu {
    cpu: Cpu,
    program: Vec<u8>,
    output: Vec<u8>,
}

#[wasm_bindgen]
impl WasmCpu {
    /// Create a stock LS-8.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            cpu: Cpu::new(),
            program: Vec::new(),
            output: Vec::new(),
        }
    }

    /// Create a machine from a JSON configuration.
    #[wasm_bindgen]
    pub fn with_config(json: &str) -> Result<WasmCpu, JsError> {
        let config = MachineConfig::from_json(json).map_err(js_err)?;
        Ok(Self {
            cpu: Cpu::with_config(config).map_err(js_err)?,
            program: Vec::new(),
            output: Vec::new(),
        })
    }

    /// Load a program from `.ls8` image text. Returns the byte count.
    #[wasm_bindgen]
    pub fn load_image(&mut self, text: &str) -> Result<usize, JsError> {
        let image = parse_image(text).map_err(js_err)?;
        self.load_bytes(image.bytes)
    }

    /// Load a program from assembly source code. Returns the byte count.
    #[wasm_bindgen]
    pub fn load_asm(&mut self, source: &str) -> Result<usize, JsError> {
        let bytes = assemble(source).map_err(js_err)?;
        self.load_bytes(bytes)
    }

    /// Step one instruction. Returns the disassembled instruction.
    #[wasm_bindgen]
    pub fn step(&mut self) -> Result<String, JsError> {
        let pc = self.cpu.pc;
        self.cpu.step(&mut self.output).map_err(js_err)?;

        Ok(disassemble_at(self.cpu.mem.as_slice(), pc).0)
    }

    /// Run until halt, fault or `max_cycles`. Returns the total cycle count.
    #[wasm_bindgen]
    pub fn run(&mut self, max_cycles: u32) -> Result<u64, JsError> {
        self.cpu
            .run_limited(&mut self.output, u64::from(max_cycles))
            .map_err(js_err)?;
        Ok(self.cpu.cycles)
    }

    /// Reset CPU to initial state with loaded program.
    #[wasm_bindgen]
    pub fn reset(&mut self) -> Result<(), JsError> {
        self.cpu.reset();
        self.output.clear();
        self.cpu.load_program(&self.program).map_err(js_err)
    }

    /// Check if CPU is running.
    #[wasm_bindgen]
    pub fn is_running(&self) -> bool {
        self.cpu.is_running()
    }

    /// Check if CPU is halted.
    #[wasm_bindgen]
    pub fn is_halted(&self) -> bool {
        self.cpu.is_halted()
    }

    /// Get cycle count.
    #[wasm_bindgen]
    pub fn cycles(&self) -> u64 {
        self.cpu.cycles
    }

    /// Get program counter.
    #[wasm_bindgen]
    pub fn pc(&self) -> usize {
        self.cpu.pc
    }

    /// Get one register. Out-of-range indices read as 0.
    #[wasm_bindgen]
    pub fn register(&self, index: u8) -> u8 {
        self.cpu.regs.get(index).unwrap_or(0)
    }

    /// Get all eight registers.
    #[wasm_bindgen]
    pub fn registers(&self) -> js_sys::Uint8Array {
        let regs: [u8; REGISTER_COUNT] = self.cpu.regs.all();
        js_sys::Uint8Array::from(&regs[..])
    }

    /// Get the FL register.
    #[wasm_bindgen]
    pub fn flags(&self) -> u8 {
        self.cpu.regs.flags()
    }

    /// Get state as string.
    #[wasm_bindgen]
    pub fn state(&self) -> String {
        format!("{:?}", self.cpu.state)
    }

    /// Get memory cell value. Out-of-range addresses read as 0.
    #[wasm_bindgen]
    pub fn memory_at(&self, addr: usize) -> u8 {
        self.cpu.mem.get(addr).unwrap_or(0)
    }

    /// Get a copy of all memory.
    #[wasm_bindgen]
    pub fn memory_all(&self) -> js_sys::Uint8Array {
        js_sys::Uint8Array::from(self.cpu.mem.as_slice())
    }

    /// Values emitted by PRN and MUL since the last load or reset.
    #[wasm_bindgen]
    pub fn output(&self) -> js_sys::Uint8Array {
        js_sys::Uint8Array::from(&self.output[..])
    }

    /// Current snapshot as a JSON string.
    #[wasm_bindgen]
    pub fn snapshot_json(&self) -> Result<String, JsError> {
        serde_json::to_string(&self.cpu.snapshot()).map_err(js_err)
    }
}

impl WasmCpu {
    fn load_bytes(&mut self, bytes: Vec<u8>) -> Result<usize, JsError> {
        self.cpu.reset();
        self.output.clear();
        self.cpu.load_program(&bytes).map_err(js_err)?;

        let len = bytes.len();
        self.program = bytes;
        Ok(len)
    }
}

impl Default for WasmCpu {
    fn default() -> Self {
        Self::new()
    }
}

/// Assemble source code and return the program bytes.
#[wasm_bindgen]
pub fn wasm_assemble(source: &str) -> Result<Vec<u8>, JsError> {
    assemble(source).map_err(js_err)
}

/// Disassemble program bytes into a listing.
#[wasm_bindgen]
pub fn wasm_disassemble(bytes: &[u8]) -> String {
    disassemble(bytes)
}
