use arch::Reg;

/// Registers handed out to expression temporaries.
const POOL: std::ops::RangeInclusive<u8> = 1..=23;

/// Occupancy bitmap over the general registers.
#[derive(Debug, Default, Clone)]
pub struct RegAlloc {
    used: u32,
    retained: u32,
}

impl RegAlloc {
    pub fn new() -> Self {
        RegAlloc::default()
    }

    fn bit(reg: Reg) -> u32 {
        1 << reg.index()
    }

    /// Lowest free pool register, or `None` when the pool is exhausted.
    pub fn acquire(&mut self) -> Option<Reg> {
        let reg = POOL
            .filter_map(Reg::new)
            .find(|&r| self.used & Self::bit(r) == 0)?;
        self.used |= Self::bit(reg);
        Some(reg)
    }

    pub fn release(&mut self, reg: Reg) {
        if self.retained & Self::bit(reg) == 0 {
            self.used &= !Self::bit(reg);
        }
    }

    /// Mark a specific register busy. Returns false if it already was.
    pub fn occupy(&mut self, reg: Reg) -> bool {
        let was_free = self.used & Self::bit(reg) == 0;
        self.used |= Self::bit(reg);
        was_free
    }

    /// Keep `reg` busy across statement boundaries until `unretain`.
    pub fn retain(&mut self, reg: Reg) {
        self.used |= Self::bit(reg);
        self.retained |= Self::bit(reg);
    }

    pub fn unretain(&mut self, reg: Reg) {
        self.retained &= !Self::bit(reg);
        self.used &= !Self::bit(reg);
    }

    /// End of statement.
    pub fn free_all(&mut self) {
        self.used = self.retained;
    }

    pub fn is_used(&self, reg: Reg) -> bool {
        self.used & Self::bit(reg) != 0
    }
}
