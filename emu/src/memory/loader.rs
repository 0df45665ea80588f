//! Image loaders.
//!
//! Two input formats populate the [`Memory`] registry: a flat binary blob
//! placed at virtual address 0, and a 32-bit ELF whose `PT_LOAD` program
//! headers each become one span. Section headers are ignored entirely:
//! the interpreter runs segments, not sections.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use goblin::elf::program_header::PT_LOAD;
use goblin::elf::Elf;
use tracing::{debug, info};

use crate::endian::Endianness;
use crate::memory::Memory;

impl Memory {
    /// Loads a flat image at virtual address 0.
    ///
    /// The whole file becomes one span; the entry point is 0 by definition.
    pub fn load_binary(&mut self, path: &Path) -> Result<u32> {
        let buffer =
            fs::read(path).with_context(|| format!("failed to read binary image {path:?}"))?;

        let size = u32::try_from(buffer.len()).context("binary image exceeds 4 GiB")?;
        self.create(0, size);
        self.copy_from(0, &buffer);

        info!("loaded {} byte binary image at 0x00000000", buffer.len());

        Ok(0)
    }

    /// Loads a 32-bit ELF image and returns its entry point.
    ///
    /// One span is created per `PT_LOAD` header, at `p_vaddr` and sized
    /// `p_memsz`; the first `p_filesz` bytes come from the file, the rest
    /// keeps the fresh-span fill. Byte order is taken from the header's
    /// `EI_DATA` unless `forced` pins it (the legacy behavior assumed a
    /// foreign-endian image unconditionally).
    pub fn load_elf(&mut self, path: &Path, forced: Option<Endianness>) -> Result<u32> {
        let buffer = fs::read(path).with_context(|| format!("failed to read ELF image {path:?}"))?;
        let elf = Elf::parse(&buffer).context("failed to parse ELF image")?;

        let detected = if elf.little_endian {
            Endianness::Little
        } else {
            Endianness::Big
        };
        self.set_endianness(forced.unwrap_or(detected));

        let entry = u32::try_from(elf.entry).context("entry point outside 32-bit space")?;
        info!("entry point: {entry:#010X}");

        for (i, ph) in elf.program_headers.iter().enumerate() {
            if ph.p_type != PT_LOAD {
                continue;
            }

            let vaddr = u32::try_from(ph.p_vaddr).context("segment vaddr outside 32-bit space")?;
            let memsz = u32::try_from(ph.p_memsz).context("segment memsz exceeds 32 bits")?;
            let filesz = ph.p_filesz as usize;
            let offset = ph.p_offset as usize;

            debug!(
                "[{i}] off {:#010X} vaddr {vaddr:#010X} filesz {filesz:#010X} memsz {memsz:#010X} flags {:#X}",
                ph.p_offset, ph.p_flags
            );

            self.create(vaddr, memsz);

            if filesz > 0 {
                if offset + filesz > buffer.len() {
                    bail!("segment [{i}] extends past end of file");
                }
                self.copy_from(vaddr, &buffer[offset..offset + filesz]);
            }
        }

        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;
    use tempfile::NamedTempFile;

    use super::*;

    /// Builds a minimal big-endian 32-bit ELF with one PT_LOAD segment.
    fn big_endian_elf(vaddr: u32, payload: &[u8]) -> Vec<u8> {
        let mut image = Vec::new();

        // ELF header (52 bytes)
        image.extend_from_slice(&[0x7F, b'E', b'L', b'F']);
        image.push(1); // EI_CLASS: 32-bit
        image.push(2); // EI_DATA: big-endian
        image.push(1); // EI_VERSION
        image.extend_from_slice(&[0; 9]); // padding
        image.extend_from_slice(&2u16.to_be_bytes()); // e_type: EXEC
        image.extend_from_slice(&40u16.to_be_bytes()); // e_machine: ARM
        image.extend_from_slice(&1u32.to_be_bytes()); // e_version
        image.extend_from_slice(&vaddr.to_be_bytes()); // e_entry
        image.extend_from_slice(&52u32.to_be_bytes()); // e_phoff
        image.extend_from_slice(&0u32.to_be_bytes()); // e_shoff
        image.extend_from_slice(&0u32.to_be_bytes()); // e_flags
        image.extend_from_slice(&52u16.to_be_bytes()); // e_ehsize
        image.extend_from_slice(&32u16.to_be_bytes()); // e_phentsize
        image.extend_from_slice(&1u16.to_be_bytes()); // e_phnum
        image.extend_from_slice(&40u16.to_be_bytes()); // e_shentsize
        image.extend_from_slice(&0u16.to_be_bytes()); // e_shnum
        image.extend_from_slice(&0u16.to_be_bytes()); // e_shstrndx

        // Program header (32 bytes), payload right after it at offset 84
        let payload_off = 52 + 32;
        image.extend_from_slice(&1u32.to_be_bytes()); // p_type: PT_LOAD
        image.extend_from_slice(&(payload_off as u32).to_be_bytes()); // p_offset
        image.extend_from_slice(&vaddr.to_be_bytes()); // p_vaddr
        image.extend_from_slice(&vaddr.to_be_bytes()); // p_paddr
        image.extend_from_slice(&(payload.len() as u32).to_be_bytes()); // p_filesz
        image.extend_from_slice(&(payload.len() as u32).to_be_bytes()); // p_memsz
        image.extend_from_slice(&5u32.to_be_bytes()); // p_flags: R+X
        image.extend_from_slice(&4u32.to_be_bytes()); // p_align

        image.extend_from_slice(payload);
        image
    }

    #[test]
    fn load_binary_maps_file_at_zero() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0x64, 0x10, 0xA0, 0xE3]).unwrap();

        let mut memory = Memory::default();
        let entry = memory.load_binary(file.path()).unwrap();

        assert_eq!(entry, 0);
        assert_eq!(memory.read_word(0), 0xE3A0_1064);
    }

    #[test]
    fn load_binary_missing_file_fails() {
        let mut memory = Memory::default();
        assert!(memory.load_binary(Path::new("/no/such/image.bin")).is_err());
    }

    #[test]
    fn load_elf_maps_segment_and_detects_byte_order() {
        let image = big_endian_elf(0x100, &[0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE, 0xF0]);
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&image).unwrap();

        let mut memory = Memory::default();
        let entry = memory.load_elf(file.path(), None).unwrap();

        assert_eq!(entry, 0x100);
        assert_eq!(memory.endianness(), Endianness::Big);
        assert_eq!(memory.read_word(0x100), 0x1234_5678);
        assert_eq!(memory.read_word(0x104), 0x9ABC_DEF0);
    }

    #[test]
    fn load_elf_forced_endianness_wins() {
        let image = big_endian_elf(0x200, &[1, 2, 3, 4]);
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&image).unwrap();

        let mut memory = Memory::default();
        memory
            .load_elf(file.path(), Some(Endianness::Little))
            .unwrap();

        assert_eq!(memory.endianness(), Endianness::Little);
        assert_eq!(memory.read_word(0x200), 0x0403_0201);
    }

    #[test]
    fn load_elf_rejects_truncated_segment() {
        let mut image = big_endian_elf(0x100, &[1, 2, 3, 4]);
        image.truncate(image.len() - 2);

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&image).unwrap();

        let mut memory = Memory::default();
        assert!(memory.load_elf(file.path(), None).is_err());
    }

    #[test]
    fn load_elf_rejects_garbage() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"definitely not an elf").unwrap();

        let mut memory = Memory::default();
        assert!(memory.load_elf(file.path(), None).is_err());
    }
}
