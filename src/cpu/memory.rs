//! Hypothetical Machine memory.
//!
//! Fifty signed decimal cells shared by code and data. Whatever the program
//! counter points at is an instruction; everything else is a number.

use crate::word::{self, format_word, MEMORY_SIZE};
use serde::{Serialize, Deserialize};

/// Fifty-cell word memory.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MemoryImage")]
pub struct Memory {
    cells: Vec<i32>,
}

/// Memory as it appears in a serialized snapshot, before validation.
#[derive(Deserialize)]
struct MemoryImage {
    cells: Vec<i32>,
}

impl TryFrom<MemoryImage> for Memory {
    type Error = String;

    /// Rejects images of the wrong size; clamps each cell to the word range.
    fn try_from(image: MemoryImage) -> Result<Self, Self::Error> {
        if image.cells.len() != MEMORY_SIZE {
            return Err(format!(
                "memory image has {} cells, expected {}",
                image.cells.len(),
                MEMORY_SIZE
            ));
        }
        Ok(Self {
            cells: image.cells.into_iter().map(|c| word::clamp(c as i64)).collect(),
        })
    }
}

impl Memory {
    /// Create a new memory with all cells zeroed.
    pub fn new() -> Self {
        Self {
            cells: vec![0; MEMORY_SIZE],
        }
    }

    /// Read a cell by address (0-49).
    ///
    /// # Panics
    /// Panics if address is out of range.
    #[inline]
    pub fn read(&self, addr: usize) -> i32 {
        assert!(addr < MEMORY_SIZE, "Memory address {} out of range (0-{})", addr, MEMORY_SIZE - 1);
        self.cells[addr]
    }

    /// Write a cell by address (0-49). The value is clamped to the word range.
    ///
    /// # Panics
    /// Panics if address is out of range.
    #[inline]
    pub fn write(&mut self, addr: usize, value: i32) {
        assert!(addr < MEMORY_SIZE, "Memory address {} out of range (0-{})", addr, MEMORY_SIZE - 1);
        self.cells[addr] = word::clamp(value as i64);
    }

    /// Read a cell through a signed address, `None` when it names no cell.
    pub fn get(&self, addr: i32) -> Option<i32> {
        if word::in_bounds(addr) {
            Some(self.cells[addr as usize])
        } else {
            None
        }
    }

    /// Clear all memory to zeros.
    pub fn clear(&mut self) {
        self.cells.iter_mut().for_each(|cell| *cell = 0);
    }

    /// All cells in address order.
    pub fn cells(&self) -> &[i32] {
        &self.cells
    }

    /// Render the whole memory, five cells per row.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for (i, value) in self.cells.iter().enumerate() {
            out.push_str(&format!("{:02}: {}  ", i, format_word(*value)));
            if i % 5 == 4 {
                out.push('\n');
            }
        }
        out
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Only show non-zero cells
        let non_zero: Vec<(usize, i32)> = self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| **cell != 0)
            .map(|(i, cell)| (i, *cell))
            .collect();

        f.debug_struct("Memory")
            .field("non_zero_cells", &non_zero)
            .field("total_cells", &MEMORY_SIZE)
            .finish()
    }
}
