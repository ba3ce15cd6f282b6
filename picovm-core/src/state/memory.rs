use picovm_types::{
    common::{MemAddress, PageIndex},
    constants::PAGE_SIZE,
};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MemoryError {
    #[error("Memory access violation at page index {0}")]
    AccessViolation(PageIndex),
    #[error("Memory address range overflow starting at {0}")]
    OutOfRange(MemAddress),
}

impl MemoryError {
    /// Page index carried by (or derivable from) the error.
    pub fn page_index(&self) -> PageIndex {
        match self {
            Self::AccessViolation(page_index) => *page_index,
            Self::OutOfRange(address) => page_index_of(*address),
        }
    }
}

/// Memory Page Access Types.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AccessType {
    #[default]
    Inaccessible,
    ReadOnly,
    ReadWrite,
}

#[inline(always)]
pub fn page_index_of(address: MemAddress) -> PageIndex {
    address / PAGE_SIZE as MemAddress
}

#[inline(always)]
pub fn page_offset_of(address: MemAddress) -> usize {
    (address % PAGE_SIZE as MemAddress) as usize
}

/// A single fixed-size page and its access mode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page {
    data: Box<[u8; PAGE_SIZE]>,
    access: AccessType,
}

impl Page {
    fn new(access: AccessType) -> Self {
        Self {
            data: Box::new([0; PAGE_SIZE]),
            access,
        }
    }
}

/// Sparse paged memory: a mapping from page index to a zero-initialized
/// fixed-size page with a uniform access mode. Unmapped page indices
/// behave as inaccessible.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Memory {
    pages: BTreeMap<PageIndex, Page>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or replaces the page record at `page_index` with a
    /// zero-filled buffer and the given access mode.
    pub fn allocate(&mut self, page_index: PageIndex, access: AccessType) {
        self.pages.insert(page_index, Page::new(access));
    }

    /// The number of currently mapped pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Access mode of the page at `page_index`; unmapped pages report
    /// `Inaccessible`.
    pub fn page_access(&self, page_index: PageIndex) -> AccessType {
        self.pages
            .get(&page_index)
            .map(|page| page.access)
            .unwrap_or_default()
    }

    /// Seeds the buffer of an already mapped page, bypassing the access
    /// mode. `data` must fit within one page. Used by program loading.
    pub(crate) fn seed_page(&mut self, page_index: PageIndex, data: &[u8]) {
        if let Some(page) = self.pages.get_mut(&page_index) {
            page.data[..data.len()].copy_from_slice(data);
        }
    }

    #[inline(always)]
    fn is_page_readable(&self, page_index: PageIndex) -> bool {
        matches!(
            self.page_access(page_index),
            AccessType::ReadOnly | AccessType::ReadWrite
        )
    }

    #[inline(always)]
    fn is_page_writable(&self, page_index: PageIndex) -> bool {
        matches!(self.page_access(page_index), AccessType::ReadWrite)
    }

    /// Returns the lowest page index in the range that is not readable,
    /// if any.
    fn check_not_readable_in_range(
        &self,
        page_range: RangeInclusive<PageIndex>,
    ) -> Option<PageIndex> {
        page_range.into_iter().find(|&page_index| !self.is_page_readable(page_index))
    }

    /// Returns the lowest page index in the range that is not writable,
    /// if any.
    fn check_not_writable_in_range(
        &self,
        page_range: RangeInclusive<PageIndex>,
    ) -> Option<PageIndex> {
        page_range.into_iter().find(|&page_index| !self.is_page_writable(page_index))
    }

    /// Page range covering `length` bytes starting at `address`.
    fn page_span(
        address: MemAddress,
        length: usize,
    ) -> Result<RangeInclusive<PageIndex>, MemoryError> {
        let end = address
            .checked_add(length as MemAddress - 1)
            .ok_or(MemoryError::OutOfRange(address))?;
        Ok(page_index_of(address)..=page_index_of(end))
    }

    /// Check if a range of memory cells is readable.
    pub fn is_address_range_readable(&self, address: MemAddress, length: usize) -> bool {
        if length == 0 {
            return true;
        }
        match Self::page_span(address, length) {
            Ok(span) => self.check_not_readable_in_range(span).is_none(),
            Err(_) => false,
        }
    }

    /// Check if a range of memory cells is writable.
    pub fn is_address_range_writable(&self, address: MemAddress, length: usize) -> bool {
        if length == 0 {
            return true;
        }
        match Self::page_span(address, length) {
            Ok(span) => self.check_not_writable_in_range(span).is_none(),
            Err(_) => false,
        }
    }

    /// Read a specified number of bytes from memory starting at the given
    /// address, producing a freshly owned buffer. Every touched page must
    /// be mapped readable.
    pub fn read_bytes(&self, address: MemAddress, length: usize) -> Result<Vec<u8>, MemoryError> {
        if length == 0 {
            return Ok(Vec::new());
        }

        let span = Self::page_span(address, length)?;
        if let Some(page_index) = self.check_not_readable_in_range(span) {
            return Err(MemoryError::AccessViolation(page_index));
        }

        let mut buffer = Vec::with_capacity(length);
        let mut cursor = address;
        while buffer.len() < length {
            let page = &self.pages[&page_index_of(cursor)];
            let offset = page_offset_of(cursor);
            let take = (PAGE_SIZE - offset).min(length - buffer.len());
            buffer.extend_from_slice(&page.data[offset..offset + take]);
            cursor += take as MemAddress;
        }
        Ok(buffer)
    }

    /// Write a slice of bytes to memory starting at the given address.
    /// Every touched page must be mapped read-write; the permission check
    /// for the whole range precedes any store, so a failing write leaves
    /// memory untouched.
    pub fn write_bytes(&mut self, address: MemAddress, bytes: &[u8]) -> Result<(), MemoryError> {
        if bytes.is_empty() {
            return Ok(());
        }

        let span = Self::page_span(address, bytes.len())?;
        if let Some(page_index) = self.check_not_writable_in_range(span) {
            return Err(MemoryError::AccessViolation(page_index));
        }

        let mut cursor = address;
        let mut written = 0;
        while written < bytes.len() {
            let offset = page_offset_of(cursor);
            let take = (PAGE_SIZE - offset).min(bytes.len() - written);
            let page = self
                .pages
                .get_mut(&page_index_of(cursor))
                .expect("page presence checked above");
            page.data[offset..offset + take].copy_from_slice(&bytes[written..written + take]);
            cursor += take as MemAddress;
            written += take;
        }
        Ok(())
    }
}
