use crate::state::memory::{AccessType, Memory};
use picovm_types::{common::PageIndex, constants::PAGE_SIZE};

pub struct ProgramLoader;
impl ProgramLoader {
    /// Loads a program image into memory: the image is split into
    /// page-sized chunks mapped read-only from page index 0, and the tail
    /// page keeps its zero fill past the image end.
    pub fn load_program(program: &[u8], memory: &mut Memory) {
        for (page_index, chunk) in program.chunks(PAGE_SIZE).enumerate() {
            let page_index = page_index as PageIndex;
            memory.allocate(page_index, AccessType::ReadOnly);
            memory.seed_page(page_index, chunk);
        }
        tracing::info!(
            bytes = program.len(),
            pages = memory.page_count(),
            "program image loaded"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use picovm_types::common::MemAddress;

    #[test]
    fn image_maps_read_only_from_page_zero() {
        let mut memory = Memory::new();
        ProgramLoader::load_program(&[1, 2, 3, 4], &mut memory);
        assert_eq!(memory.page_count(), 1);
        assert_eq!(memory.page_access(0), AccessType::ReadOnly);
        assert_eq!(memory.read_bytes(0, 4).unwrap(), vec![1, 2, 3, 4]);
        // zero padding past the image end
        assert_eq!(memory.read_bytes(4, 4).unwrap(), vec![0, 0, 0, 0]);
        assert!(memory.write_bytes(0, &[9]).is_err());
    }

    #[test]
    fn large_images_span_pages() {
        let mut memory = Memory::new();
        let image = vec![0xAB; PAGE_SIZE + 1];
        ProgramLoader::load_program(&image, &mut memory);
        assert_eq!(memory.page_count(), 2);
        assert_eq!(
            memory.read_bytes(PAGE_SIZE as MemAddress, 2).unwrap(),
            vec![0xAB, 0]
        );
    }
}
