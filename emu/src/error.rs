use thiserror::Error;

/// Fatal runtime faults. Each stops the machine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Trap {
    #[error("Unaligned instruction fetch at 0x{0:08X}")]
    UnalignedFetch(u32),

    #[error("Instruction fetch outside memory at 0x{0:08X}")]
    FetchOutOfBounds(u32),

    #[error("Unaligned data access at 0x{addr:08X} (pc 0x{pc:08X})")]
    UnalignedAccess { pc: u32, addr: u32 },

    #[error("Data access outside memory at 0x{addr:08X} (pc 0x{pc:08X})")]
    AccessOutOfBounds { pc: u32, addr: u32 },

    #[error("Illegal instruction 0x{word:08X} at 0x{pc:08X}")]
    IllegalInstruction { pc: u32, word: u32 },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to open file: {0}")]
    FileOpen(String, #[source] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Config(String, #[source] serde_yaml::Error),

    #[error("Invalid memory map: {0}")]
    MemoryMap(String),

    #[error("Image is {0} bytes, not a whole number of words")]
    TruncatedImage(usize),

    #[error("Line {0} is not a 32-digit binary word")]
    BadWord(usize),

    #[error("Image of {0} words does not fit in memory")]
    ImageTooLarge(usize),

    #[error(transparent)]
    Trap(#[from] Trap),
}
