//! # Sparse Virtual Memory
//!
//! The emulated address space is a set of disjoint spans ([`VSpace`]), each
//! backed by an owned host buffer. The [`Memory`] registry routes every
//! access to the owning span.
//!
//! ```text
//! 0x00000000                                              0xFFFFFFFF
//! ├────────────┬ ─ ─ ─ ─ ─ ─ ┬──────────┬ ─ ─ ─ ─ ─ ─ ─ ─┬─────────┤
//! │  .text     │   unmapped  │  .data   │    unmapped     │  stack  │
//! └────────────┴ ─ ─ ─ ─ ─ ─ ┴──────────┴ ─ ─ ─ ─ ─ ─ ─ ─┴─────────┘
//! ```
//!
//! Unmapped reads return the all-ones sentinel of the requested width;
//! unmapped writes are dropped. The running program is never faulted for
//! touching a hole in the map.

pub mod loader;

use tracing::{debug, trace};

use crate::endian::Endianness;

/// One contiguous span of the target address space.
///
/// Owns its backing buffer; the buffer is released when the span is
/// destroyed. Freshly created spans are filled with `0xFF`.
///
/// Addresses handed to the accessors are *virtual*: the caller guarantees
/// `vaddr <= address < vaddr + size`, and halfword/word accesses are
/// expected to be aligned. Misaligned or out-of-span access is a caller
/// bug, not a policed condition.
pub struct VSpace {
    buffer: Vec<u8>,
    pub vaddr: u32,
    pub size: u32,
    endianness: Endianness,
}

impl VSpace {
    pub fn new(vaddr: u32, size: u32, endianness: Endianness) -> Self {
        Self {
            buffer: vec![0xFF; size as usize],
            vaddr,
            size,
            endianness,
        }
    }

    /// Whether `address` falls inside this span.
    pub fn contains(&self, address: u32) -> bool {
        // Written overflow-free: the stack span ends at 0xFFFFFFFF and
        // `vaddr + size` would wrap.
        address >= self.vaddr && address - self.vaddr < self.size
    }

    fn offset(&self, address: u32) -> usize {
        (address - self.vaddr) as usize
    }

    pub fn read_at(&self, address: u32) -> u8 {
        self.buffer[self.offset(address)]
    }

    // Halfword and word cells are indexed as such: a misaligned address
    // resolves to the cell containing it. PC-relative literal loads in
    // Thumb state depend on this rounding.
    pub fn read_half_word(&self, address: u32) -> u16 {
        let idx = self.offset(address) & !1;
        let bytes = [self.buffer[idx], self.buffer[idx + 1]];

        self.endianness.read_u16(bytes)
    }

    pub fn read_word(&self, address: u32) -> u32 {
        let idx = self.offset(address) & !3;
        let bytes = [
            self.buffer[idx],
            self.buffer[idx + 1],
            self.buffer[idx + 2],
            self.buffer[idx + 3],
        ];

        self.endianness.read_u32(bytes)
    }

    pub fn write_at(&mut self, address: u32, value: u8) {
        let idx = self.offset(address);
        self.buffer[idx] = value;
    }

    pub fn write_half_word(&mut self, address: u32, value: u16) {
        let idx = self.offset(address) & !1;
        self.buffer[idx..idx + 2].copy_from_slice(&self.endianness.write_u16(value));
    }

    pub fn write_word(&mut self, address: u32, value: u32) {
        let idx = self.offset(address) & !3;
        self.buffer[idx..idx + 4].copy_from_slice(&self.endianness.write_u32(value));
    }

    /// Block copy from a host buffer into the span.
    pub fn copy_from(&mut self, dst: u32, src: &[u8]) {
        let idx = self.offset(dst);
        self.buffer[idx..idx + src.len()].copy_from_slice(src);
    }

    /// Block copy from the span into a host buffer.
    pub fn copy_to(&self, dst: &mut [u8], src: u32) {
        let idx = self.offset(src);
        dst.copy_from_slice(&self.buffer[idx..idx + dst.len()]);
    }
}

/// Registry of [`VSpace`] spans keyed by base address.
///
/// Lookup returns the first span containing the address; overlapping spans
/// are a configuration error and are not policed. The registry is a plain
/// owned value threaded through the processor, single-threaded by
/// contract, no interior locking.
pub struct Memory {
    spaces: Vec<VSpace>,
    endianness: Endianness,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new(Endianness::Little)
    }
}

impl Memory {
    pub fn new(endianness: Endianness) -> Self {
        Self {
            spaces: Vec::new(),
            endianness,
        }
    }

    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    pub(crate) fn set_endianness(&mut self, endianness: Endianness) {
        self.endianness = endianness;
    }

    fn find(&self, address: u32) -> Option<&VSpace> {
        self.spaces.iter().find(|space| space.contains(address))
    }

    fn find_mut(&mut self, address: u32) -> Option<&mut VSpace> {
        self.spaces.iter_mut().find(|space| space.contains(address))
    }

    /// Maps a new span at `vaddr`; a no-op when a span already covers it.
    pub fn create(&mut self, vaddr: u32, size: u32) {
        if self.find(vaddr).is_some() {
            return;
        }

        debug!("mapping span vaddr={vaddr:#010X} size={size:#X}");
        self.spaces.push(VSpace::new(vaddr, size, self.endianness));
    }

    /// Unmaps the single span whose base equals `vaddr`.
    pub fn destroy(&mut self, vaddr: u32) {
        if let Some(idx) = self.spaces.iter().position(|space| space.vaddr == vaddr) {
            debug!("unmapping span vaddr={vaddr:#010X}");
            self.spaces.remove(idx);
        }
    }

    /// Unmaps every span, releasing all backing buffers.
    pub fn destroy_all(&mut self) {
        self.spaces.clear();
    }

    pub fn read_at(&self, address: u32) -> u8 {
        match self.find(address) {
            Some(space) => space.read_at(address),
            None => {
                trace!("unmapped byte read at {address:#010X}");
                0xFF
            }
        }
    }

    pub fn read_half_word(&self, address: u32) -> u16 {
        match self.find(address) {
            Some(space) => space.read_half_word(address),
            None => {
                trace!("unmapped halfword read at {address:#010X}");
                0xFFFF
            }
        }
    }

    pub fn read_word(&self, address: u32) -> u32 {
        match self.find(address) {
            Some(space) => space.read_word(address),
            None => {
                trace!("unmapped word read at {address:#010X}");
                0xFFFF_FFFF
            }
        }
    }

    pub fn write_at(&mut self, address: u32, value: u8) {
        match self.find_mut(address) {
            Some(space) => space.write_at(address, value),
            None => trace!("unmapped byte write at {address:#010X}"),
        }
    }

    pub fn write_half_word(&mut self, address: u32, value: u16) {
        match self.find_mut(address) {
            Some(space) => space.write_half_word(address, value),
            None => trace!("unmapped halfword write at {address:#010X}"),
        }
    }

    pub fn write_word(&mut self, address: u32, value: u32) {
        match self.find_mut(address) {
            Some(space) => space.write_word(address, value),
            None => trace!("unmapped word write at {address:#010X}"),
        }
    }

    /// Block copy into the span owning `dst`; dropped when unmapped.
    pub fn copy_from(&mut self, dst: u32, src: &[u8]) {
        if let Some(space) = self.find_mut(dst) {
            space.copy_from(dst, src);
        }
    }

    /// Block copy out of the span owning `src`; a no-op when unmapped.
    pub fn copy_to(&self, dst: &mut [u8], src: u32) {
        if let Some(space) = self.find(src) {
            space.copy_to(dst, src);
        }
    }
}
