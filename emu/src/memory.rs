use std::collections::HashMap;

pub const PAGE_BITS: u32 = 12;
pub const PAGE_SIZE: usize = 1 << PAGE_BITS;

/// Sparse byte-addressed memory. Pages are allocated on first write and
/// untouched addresses read as zero. Words are big-endian.
#[derive(Debug, Clone)]
pub struct Memory {
    size: u64,
    pages: HashMap<u32, Box<[u8; PAGE_SIZE]>>,
}

impl Memory {
    pub fn new(size: u64) -> Self {
        Memory {
            size,
            pages: HashMap::new(),
        }
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn contains(&self, addr: u32) -> bool {
        (addr as u64) + 4 <= self.size
    }

    /// Caller checks alignment and bounds.
    pub fn read(&self, addr: u32) -> u32 {
        let offset = (addr as usize) & (PAGE_SIZE - 1);
        match self.pages.get(&(addr >> PAGE_BITS)) {
            Some(page) => u32::from_be_bytes([
                page[offset],
                page[offset + 1],
                page[offset + 2],
                page[offset + 3],
            ]),
            None => 0,
        }
    }

    /// Caller checks alignment and bounds.
    pub fn write(&mut self, addr: u32, value: u32) {
        let offset = (addr as usize) & (PAGE_SIZE - 1);
        let page = self
            .pages
            .entry(addr >> PAGE_BITS)
            .or_insert_with(|| Box::new([0; PAGE_SIZE]));
        page[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
    }

    pub fn pages(&self) -> usize {
        self.pages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwritten_reads_zero() {
        let mem = Memory::new(1 << 32);
        assert_eq!(mem.read(0x1234_5678 & !3), 0);
        assert_eq!(mem.pages(), 0);
    }

    #[test]
    fn big_endian_words() {
        let mut mem = Memory::new(1 << 32);
        mem.write(0xFFFF_FFFC, 0xDEAD_BEEF);
        assert_eq!(mem.read(0xFFFF_FFFC), 0xDEAD_BEEF);
        mem.write(0x0001_0000, 0x0102_0304);
        assert_eq!(mem.read(0x0001_0000), 0x0102_0304);
        assert_eq!(mem.pages(), 2);
    }

    #[test]
    fn bounds() {
        let mem = Memory::new(0x1000);
        assert!(mem.contains(0xFFC));
        assert!(!mem.contains(0x1000));
        assert!(Memory::new(1 << 32).contains(0xFFFF_FFFC));
    }
}
