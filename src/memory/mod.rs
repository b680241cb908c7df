//! Memory source abstraction
//!
//! The APU reads sample data straight out of console memory. The engine
//! only ever reads; register writes and DMA belong to the rest of the
//! emulator. [`MemorySource`] is the seam between the two: the sample
//! generator takes any implementation, and [`RamSource`] provides a plain
//! byte-vector implementation for tests and the demo binary.

/// Read-only byte-oriented memory view consumed by the sample generator
pub trait MemorySource {
    /// Read a single byte at `address`
    fn read_byte(&self, address: u32) -> u8;

    /// Read a little-endian halfword at an even `address`
    ///
    /// Callers guarantee `address` is even; implementations may skip any
    /// alignment or bus-fault handling (this mirrors the console's fast
    /// halfword read used by the PCM16 path).
    fn read_u16_fast(&self, address: u32) -> u16;
}

/// Flat RAM-backed memory source
///
/// Out-of-range reads return 0 (open bus simplification). Used by tests
/// and the demo binary in place of the full console memory map.
#[derive(Debug, Clone)]
pub struct RamSource {
    data: Vec<u8>,
}

impl RamSource {
    /// Create a zero-filled RAM source of `size` bytes
    pub fn new(size: usize) -> Self {
        RamSource {
            data: vec![0; size],
        }
    }

    /// Create a RAM source holding a copy of `bytes`
    pub fn from_bytes(bytes: &[u8]) -> Self {
        RamSource {
            data: bytes.to_vec(),
        }
    }

    /// Write a byte (test/demo population; not part of the APU read path)
    pub fn write_byte(&mut self, address: u32, value: u8) {
        if let Some(slot) = self.data.get_mut(address as usize) {
            *slot = value;
        }
    }

    /// Copy `bytes` into memory starting at `address`, clipping at the end
    pub fn load(&mut self, address: u32, bytes: &[u8]) {
        let start = address as usize;
        if start >= self.data.len() {
            return;
        }
        let end = (start + bytes.len()).min(self.data.len());
        self.data[start..end].copy_from_slice(&bytes[..end - start]);
    }

    /// Size of the backing storage in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the backing storage is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl MemorySource for RamSource {
    fn read_byte(&self, address: u32) -> u8 {
        self.data.get(address as usize).copied().unwrap_or(0)
    }

    fn read_u16_fast(&self, address: u32) -> u16 {
        let lo = self.read_byte(address);
        let hi = self.read_byte(address.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }
}
