use serde::{Deserialize, Serialize};

/// Scratch word at the top of the address space, addressed as `offset(zero)`.
pub const SCRATCH_OFFSET: i16 = -4;

/// Byte offset of the first saved special register inside a process control block.
/// General registers occupy `4 * index` below it.
pub const PCB_SREG_BASE: i16 = 128;

/// Conventional values of register 1 at `syscall`.
pub mod signal {
    pub const EXIT: u32 = 1;
    pub const STACK_LIMIT: u32 = 41;
    pub const HEAP_LIMIT: u32 = 42;
}

/// Where the compiled program places its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryMap {
    pub global_base: u32,
    pub heap_base: u32,
    pub heap_limit: u32,
    pub stack_top: u32,
    pub stack_limit: u32,
}

impl Default for MemoryMap {
    fn default() -> Self {
        MemoryMap {
            global_base: 0x0001_0000,
            heap_base: 0x0010_0000,
            heap_limit: 0x0080_0000,
            stack_top: 0x0100_0000,
            stack_limit: 0x00C0_0000,
        }
    }
}

impl MemoryMap {
    /// Regions must not overlap and every base must be word aligned.
    pub fn validate(&self) -> Result<(), String> {
        let aligned = [
            self.global_base,
            self.heap_base,
            self.heap_limit,
            self.stack_top,
            self.stack_limit,
        ]
        .iter()
        .all(|a| a % 4 == 0);
        if !aligned {
            return Err("memory map addresses must be multiples of 4".to_string());
        }
        if self.global_base > self.heap_base {
            return Err("global_base must lie below heap_base".to_string());
        }
        if self.heap_base > self.heap_limit {
            return Err("heap_base must lie below heap_limit".to_string());
        }
        if self.heap_limit > self.stack_limit {
            return Err("heap_limit must not exceed stack_limit".to_string());
        }
        if self.stack_limit > self.stack_top {
            return Err("stack_limit must lie below stack_top".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert_eq!(MemoryMap::default().validate(), Ok(()));
    }

    #[test]
    fn overlapping_rejected() {
        let map = MemoryMap {
            heap_limit: 0x00D0_0000,
            ..MemoryMap::default()
        };
        assert!(map.validate().is_err());
    }
}
