/// The 8085 addresses 64KB of memory.
pub const MEMORY_SIZE: usize = 0x10000;

/// Flat byte-addressable memory. Unwritten addresses read as zero.
pub struct Memory {
    bytes: Box<[u8; MEMORY_SIZE]>,
}

impl Memory {
    pub fn new() -> Self {
        Memory {
            bytes: Box::new([0; MEMORY_SIZE]),
        }
    }

    #[inline]
    pub fn read(&self, addr: u16) -> u8 {
        self.bytes[addr as usize]
    }

    #[inline]
    pub fn write(&mut self, addr: u16, value: u8) {
        self.bytes[addr as usize] = value;
    }

    /// Little-endian word; the high byte wraps around to 0000H.
    pub fn read_word(&self, addr: u16) -> u16 {
        u16::from_le_bytes([self.read(addr), self.read(addr.wrapping_add(1))])
    }

    pub fn write_word(&mut self, addr: u16, value: u16) {
        let [low, high] = value.to_le_bytes();
        self.write(addr, low);
        self.write(addr.wrapping_add(1), high);
    }

    /// Copy `data` in starting at `addr`, wrapping past FFFFH.
    pub fn load(&mut self, addr: u16, data: &[u8]) {
        for (offs, byte) in data.iter().enumerate() {
            self.write(addr.wrapping_add(offs as u16), *byte);
        }
    }

    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}
