//! LS-8 memory subsystem.
//!
//! A flat array of bytes. The reference machine has 256 cells, but the
//! capacity is a construction parameter so smaller machines can be built
//! for testing. Every access is bounds checked; nothing wraps.

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// The default number of memory cells.
pub const MEMORY_SIZE: usize = 256;

/// LS-8 memory: a fixed number of byte cells.
#[derive(Clone, Serialize, Deserialize)]
pub struct Memory {
    cells: Vec<u8>,
}

impl Memory {
    /// Create a new memory of the default size with all cells zeroed.
    pub fn new() -> Self {
        Self::with_capacity(MEMORY_SIZE)
    }

    /// Create a zeroed memory holding `capacity` cells.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cells: vec![0; capacity],
        }
    }

    /// Number of addressable cells.
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True if the memory has no cells at all.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Read a cell.
    #[inline]
    pub fn read(&self, addr: usize) -> Result<u8, MemoryError> {
        self.cells
            .get(addr)
            .copied()
            .ok_or(MemoryError::OutOfBounds { addr, capacity: self.cells.len() })
    }

    /// Write a cell.
    #[inline]
    pub fn write(&mut self, addr: usize, value: u8) -> Result<(), MemoryError> {
        let capacity = self.cells.len();
        let cell = self.cells
            .get_mut(addr)
            .ok_or(MemoryError::OutOfBounds { addr, capacity })?;
        *cell = value;
        Ok(())
    }

    /// Read a cell without failing. Used by inspection code (traces,
    /// debuggers) that must never disturb a run.
    #[inline]
    pub fn get(&self, addr: usize) -> Option<u8> {
        self.cells.get(addr).copied()
    }

    /// Clear all memory to zeros.
    pub fn clear(&mut self) {
        self.cells.iter_mut().for_each(|cell| *cell = 0);
    }

    /// Load a program into memory starting at the given address.
    pub fn load_program(&mut self, start_addr: usize, program: &[u8]) -> Result<(), MemoryError> {
        let available = self.cells.len().saturating_sub(start_addr);
        if program.len() > available {
            return Err(MemoryError::ProgramTooLarge {
                size: program.len(),
                available,
            });
        }

        self.cells[start_addr..start_addr + program.len()].copy_from_slice(program);
        Ok(())
    }

    /// Dump memory contents (for debugging).
    pub fn dump(&self, start: usize, count: usize) -> Vec<(usize, u8)> {
        let end = start.saturating_add(count).min(self.cells.len());
        (start.min(end)..end)
            .map(|i| (i, self.cells[i]))
            .collect()
    }

    /// All cells as a slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.cells
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Only count non-zero cells
        let non_zero = self.cells.iter().filter(|cell| **cell != 0).count();

        f.debug_struct("Memory")
            .field("non_zero_cells", &non_zero)
            .field("total_cells", &self.cells.len())
            .finish()
    }
}

/// Errors that can occur during memory operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// Address is outside valid memory range.
    #[error("memory address {addr:#04x} out of range (capacity {capacity})")]
    OutOfBounds { addr: usize, capacity: usize },

    /// Program is too large to fit in memory.
    #[error("program size {size} exceeds available space {available}")]
    ProgramTooLarge { size: usize, available: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_read_write() {
        let mut mem = Memory::new();

        mem.write(10, 42).unwrap();
        assert_eq!(mem.read(10).unwrap(), 42);
        assert_eq!(mem.len(), MEMORY_SIZE);
    }

    #[test]
    fn test_memory_bounds() {
        let mut mem = Memory::with_capacity(16);

        assert!(mem.read(15).is_ok());
        assert_eq!(
            mem.read(16),
            Err(MemoryError::OutOfBounds { addr: 16, capacity: 16 })
        );
        assert!(mem.write(16, 1).is_err());
        assert_eq!(mem.get(16), None);
    }

    #[test]
    fn test_load_program() {
        let mut mem = Memory::new();
        mem.load_program(0, &[1, 2, 3]).unwrap();

        assert_eq!(mem.read(0).unwrap(), 1);
        assert_eq!(mem.read(1).unwrap(), 2);
        assert_eq!(mem.read(2).unwrap(), 3);
    }

    #[test]
    fn test_load_program_too_large() {
        let mut mem = Memory::with_capacity(4);
        let err = mem.load_program(2, &[1, 2, 3]).unwrap_err();
        assert_eq!(err, MemoryError::ProgramTooLarge { size: 3, available: 2 });
    }

    #[test]
    fn test_dump_and_clear() {
        let mut mem = Memory::with_capacity(8);
        mem.load_program(0, &[9, 8, 7]).unwrap();

        assert_eq!(mem.dump(1, 2), vec![(1, 8), (2, 7)]);
        assert_eq!(mem.dump(6, 10).len(), 2);

        mem.clear();
        assert!(mem.as_slice().iter().all(|&b| b == 0));
    }
}
