use std::cmp::Ordering;
use std::fmt;

use crate::constants::*;

/// Location of a page table or page, decoded from a signed memory word.
///
/// Words store a resident frame as a positive number and an on-disk block
/// as its negation. Zero is never a valid location because frames 0 and 1
/// hold the segment table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameRef {
    Unset,
    Resident(u32),
    OnDisk(u32),
}

impl FrameRef {
    pub fn from_raw(raw: i32) -> Self {
        match raw.cmp(&0) {
            Ordering::Greater => FrameRef::Resident(raw as u32),
            Ordering::Less => FrameRef::OnDisk(raw.unsigned_abs()),
            Ordering::Equal => FrameRef::Unset,
        }
    }

    pub fn to_raw(self) -> i32 {
        match self {
            FrameRef::Unset => 0,
            FrameRef::Resident(frame) => frame as i32,
            FrameRef::OnDisk(block) => -(block as i32),
        }
    }
}

impl fmt::Display for FrameRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameRef::Unset => write!(f, "unset"),
            FrameRef::Resident(frame) => write!(f, "frame {frame}"),
            FrameRef::OnDisk(block) => write!(f, "disk block {block}"),
        }
    }
}

/// Physical memory: NUM_FRAMES frames of FRAME_SIZE words each
pub struct PhysicalMemory {
    data: Vec<i32>,
}

impl PhysicalMemory {
    /// Create a new physical memory initialized to all zeros
    pub fn new() -> Self {
        PhysicalMemory {
            data: vec![0; PM_SIZE],
        }
    }

    #[inline]
    pub fn read(&self, address: usize) -> i32 {
        self.data[address]
    }

    #[inline]
    pub fn write(&mut self, address: usize, value: i32) {
        self.data[address] = value;
    }

    /// Calculate the starting address of a frame
    #[inline]
    pub fn frame_to_address(frame: u32) -> usize {
        frame as usize * FRAME_SIZE
    }

    pub fn frame(&self, frame: u32) -> &[i32] {
        let start = Self::frame_to_address(frame);
        &self.data[start..start + FRAME_SIZE]
    }

    fn frame_mut(&mut self, frame: u32) -> &mut [i32] {
        let start = Self::frame_to_address(frame);
        &mut self.data[start..start + FRAME_SIZE]
    }
}

impl fmt::Debug for PhysicalMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhysicalMemory")
            .field("words", &self.data.len())
            .finish_non_exhaustive()
    }
}

impl Default for PhysicalMemory {
    fn default() -> Self {
        Self::new()
    }
}

/// Paging disk: DISK_BLOCKS blocks of BLOCK_SIZE words each
pub struct BackingStore {
    data: Vec<i32>,
}

impl BackingStore {
    pub fn new() -> Self {
        BackingStore {
            data: vec![0; DISK_BLOCKS * BLOCK_SIZE],
        }
    }

    #[inline]
    pub fn read(&self, block: usize, offset: usize) -> i32 {
        self.data[block * BLOCK_SIZE + offset]
    }

    #[inline]
    pub fn write(&mut self, block: usize, offset: usize, value: i32) {
        self.data[block * BLOCK_SIZE + offset] = value;
    }

    pub fn block(&self, block: usize) -> &[i32] {
        let start = block * BLOCK_SIZE;
        &self.data[start..start + BLOCK_SIZE]
    }
}

impl fmt::Debug for BackingStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackingStore")
            .field("blocks", &(self.data.len() / BLOCK_SIZE))
            .finish_non_exhaustive()
    }
}

impl Default for BackingStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Typed view over physical memory and the backing store.
///
/// Nothing outside this type indexes the raw words; callers see
/// segment descriptors and page table entries as `FrameRef`s.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pm: PhysicalMemory,
    disk: BackingStore,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Segment length in words, PM[2s]. Zero for undefined segments.
    #[inline]
    pub fn segment_length(&self, segment: u32) -> u32 {
        debug_assert!((segment as usize) < MAX_SEGMENTS);
        self.pm.read(2 * segment as usize).max(0) as u32
    }

    /// Page table location of a segment, PM[2s + 1]
    #[inline]
    pub fn segment_page_table_location(&self, segment: u32) -> FrameRef {
        debug_assert!((segment as usize) < MAX_SEGMENTS);
        FrameRef::from_raw(self.pm.read(2 * segment as usize + 1))
    }

    pub fn set_segment_entry(&mut self, segment: u32, length: u32, page_table: FrameRef) {
        let base = 2 * segment as usize;
        self.pm.write(base, length as i32);
        self.pm.write(base + 1, page_table.to_raw());
    }

    pub fn set_segment_page_table_location(&mut self, segment: u32, page_table: FrameRef) {
        self.pm.write(2 * segment as usize + 1, page_table.to_raw());
    }

    #[inline]
    pub fn page_table_entry(&self, pt_frame: u32, page: u32) -> FrameRef {
        FrameRef::from_raw(self.pm.read(Self::entry_address(pt_frame, page)))
    }

    pub fn set_page_table_entry(&mut self, pt_frame: u32, page: u32, location: FrameRef) {
        self.pm
            .write(Self::entry_address(pt_frame, page), location.to_raw());
    }

    /// Page table entry of a page table that still lives on disk
    pub fn disk_page_table_entry(&self, block: u32, page: u32) -> FrameRef {
        FrameRef::from_raw(self.disk.read(block as usize, page as usize))
    }

    pub fn set_disk_page_table_entry(&mut self, block: u32, page: u32, location: FrameRef) {
        self.disk
            .write(block as usize, page as usize, location.to_raw());
    }

    /// Overwrite frame `dest_frame` with the contents of disk block `block`
    pub fn copy_block_into_frame(&mut self, block: u32, dest_frame: u32) {
        let src = self.disk.block(block as usize);
        self.pm.frame_mut(dest_frame).copy_from_slice(src);
    }

    pub fn physical(&self) -> &PhysicalMemory {
        &self.pm
    }

    pub fn backing_store(&self) -> &BackingStore {
        &self.disk
    }

    #[inline]
    fn entry_address(pt_frame: u32, page: u32) -> usize {
        debug_assert!((page as usize) < PT_SIZE);
        PhysicalMemory::frame_to_address(pt_frame) + page as usize
    }
}
