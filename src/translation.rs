use log::{debug, trace};

use crate::address::VirtualAddress;
use crate::constants::*;
use crate::error::{Result, VmError};
use crate::frames::FrameAllocator;
use crate::memory::{FrameRef, MemoryStore, PhysicalMemory};

/// Whether non-resident page tables and pages are loaded on first use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PagingMode {
    #[default]
    Demand,
    /// Everything must already be resident; an on-disk location is fatal
    Resident,
}

impl PagingMode {
    /// Output file used when none is given
    pub fn default_output(self) -> &'static str {
        match self {
            PagingMode::Demand => OUTPUT_DP,
            PagingMode::Resident => OUTPUT_NO_DP,
        }
    }
}

impl std::fmt::Display for PagingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PagingMode::Demand => write!(f, "with demand paging"),
            PagingMode::Resident => write!(f, "without demand paging"),
        }
    }
}

/// Result of an address translation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationResult {
    Translated(i32),
    /// pw outside the segment, or segment number outside the table
    SegmentationFault,
    /// In bounds, but the page table or page was never set up
    Unmapped,
}

impl TranslationResult {
    /// Convert to the output format (-1 for errors, PA otherwise)
    pub fn to_output(&self) -> i32 {
        match self {
            TranslationResult::Translated(pa) => *pa,
            TranslationResult::SegmentationFault | TranslationResult::Unmapped => INVALID_ADDRESS,
        }
    }
}

/// Counters collected over a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FaultStats {
    pub translated: usize,
    pub segmentation_faults: usize,
    pub unmapped: usize,
    pub page_table_faults: usize,
    pub page_faults: usize,
}

/// Address translation engine.
///
/// Owns memory and the free frame list for the whole run. Faults are
/// resolved in place: the repaired location is written back to the
/// descriptor or page table entry that referenced the disk, so later
/// translations find it resident.
pub struct Translator {
    store: MemoryStore,
    frames: FrameAllocator,
    mode: PagingMode,
    stats: FaultStats,
}

impl Translator {
    pub fn new(store: MemoryStore, frames: FrameAllocator, mode: PagingMode) -> Self {
        Translator {
            store,
            frames,
            mode,
            stats: FaultStats::default(),
        }
    }

    /// Translate one virtual address.
    ///
    /// # Errors
    /// `OutOfFrames` when a fault needs a frame and none is left, and
    /// `NonResidentReference` when an on-disk location is met in
    /// `PagingMode::Resident`. Both end the run.
    pub fn translate(&mut self, raw: u32) -> Result<TranslationResult> {
        let va = VirtualAddress::decode(raw);
        trace!("{va}");

        if !va.in_segment_table() || va.pw >= self.store.segment_length(va.s) {
            debug!("VA {raw}: segmentation fault (s={}, pw={})", va.s, va.pw);
            self.stats.segmentation_faults += 1;
            return Ok(TranslationResult::SegmentationFault);
        }

        let Some(pt_frame) = self.resolve_page_table(&va)? else {
            return Ok(self.unmapped(&va, "page table"));
        };
        let Some(page_frame) = self.resolve_page(&va, pt_frame)? else {
            return Ok(self.unmapped(&va, "page"));
        };

        let pa = PhysicalMemory::frame_to_address(page_frame) + va.w as usize;
        debug!("VA {raw} (s={}, p={}, w={}) -> PA {pa}", va.s, va.p, va.w);
        self.stats.translated += 1;
        Ok(TranslationResult::Translated(pa as i32))
    }

    /// Translate a batch of virtual addresses into output values, in order
    pub fn translate_all(&mut self, vas: &[u32]) -> Result<Vec<i32>> {
        vas.iter()
            .map(|&va| self.translate(va).map(|result| result.to_output()))
            .collect()
    }

    fn resolve_page_table(&mut self, va: &VirtualAddress) -> Result<Option<u32>> {
        match self.store.segment_page_table_location(va.s) {
            FrameRef::Resident(frame) => Ok(Some(frame)),
            FrameRef::Unset => Ok(None),
            location @ FrameRef::OnDisk(block) => {
                self.require_demand_paging(va, location)?;

                let frame = self.frames.allocate()?;
                self.store.copy_block_into_frame(block, frame);
                self.store
                    .set_segment_page_table_location(va.s, FrameRef::Resident(frame));
                self.stats.page_table_faults += 1;
                debug!(
                    "page table fault: segment {} block {block} -> frame {frame}",
                    va.s
                );
                Ok(Some(frame))
            }
        }
    }

    // Page data is never read from disk: a fresh frame is assigned and its
    // contents left as they are.
    fn resolve_page(&mut self, va: &VirtualAddress, pt_frame: u32) -> Result<Option<u32>> {
        match self.store.page_table_entry(pt_frame, va.p) {
            FrameRef::Resident(frame) => Ok(Some(frame)),
            FrameRef::Unset => Ok(None),
            location @ FrameRef::OnDisk(block) => {
                self.require_demand_paging(va, location)?;

                let frame = self.frames.allocate()?;
                self.store
                    .set_page_table_entry(pt_frame, va.p, FrameRef::Resident(frame));
                self.stats.page_faults += 1;
                debug!(
                    "page fault: segment {} page {} block {block} -> frame {frame}",
                    va.s, va.p
                );
                Ok(Some(frame))
            }
        }
    }

    fn require_demand_paging(&self, va: &VirtualAddress, location: FrameRef) -> Result<()> {
        match self.mode {
            PagingMode::Demand => Ok(()),
            PagingMode::Resident => Err(VmError::NonResidentReference {
                segment: va.s,
                page: va.p,
                location,
            }),
        }
    }

    fn unmapped(&mut self, va: &VirtualAddress, what: &str) -> TranslationResult {
        debug!("VA {}: {what} of segment {} is not mapped", va.va, va.s);
        self.stats.unmapped += 1;
        TranslationResult::Unmapped
    }

    pub fn mode(&self) -> PagingMode {
        self.mode
    }

    pub fn stats(&self) -> FaultStats {
        self.stats
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub fn frames(&self) -> &FrameAllocator {
        &self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translation_result_to_output() {
        assert_eq!(TranslationResult::Translated(4608).to_output(), 4608);
        assert_eq!(TranslationResult::SegmentationFault.to_output(), -1);
        assert_eq!(TranslationResult::Unmapped.to_output(), -1);
    }

    // Line 1: 6 3000 4
    // Line 2: 6 5 9
    fn simple_translator(mode: PagingMode) -> Translator {
        let mut store = MemoryStore::new();
        let mut frames = FrameAllocator::new();

        store.set_segment_entry(6, 3000, FrameRef::Resident(4));
        store.set_page_table_entry(4, 5, FrameRef::Resident(9));
        frames.reserve(4).unwrap();
        frames.reserve(9).unwrap();

        Translator::new(store, frames, mode)
    }

    // Line 1: 8 4000 3   9 5000 -7
    // Line 2: 8 0 10   8 1 -20   9 0 13   9 1 -25
    fn demand_translator(mode: PagingMode) -> Translator {
        let mut store = MemoryStore::new();
        let mut frames = FrameAllocator::new();

        store.set_segment_entry(8, 4000, FrameRef::Resident(3));
        store.set_segment_entry(9, 5000, FrameRef::OnDisk(7));
        store.set_page_table_entry(3, 0, FrameRef::Resident(10));
        store.set_page_table_entry(3, 1, FrameRef::OnDisk(20));
        store.set_disk_page_table_entry(7, 0, FrameRef::Resident(13));
        store.set_disk_page_table_entry(7, 1, FrameRef::OnDisk(25));
        for frame in [3, 10, 13] {
            frames.reserve(frame).unwrap();
        }

        Translator::new(store, frames, mode)
    }

    #[test]
    fn test_translate_simple_case() {
        let mut tr = simple_translator(PagingMode::Resident);

        assert_eq!(tr.translate(1575424).unwrap(), TranslationResult::Translated(4608));
        assert_eq!(tr.translate(1575863).unwrap(), TranslationResult::Translated(5047));
        // pw (3000) >= segment length (3000)
        assert_eq!(
            tr.translate(1575864).unwrap(),
            TranslationResult::SegmentationFault
        );
    }

    #[test]
    fn test_translate_all_simple_case() {
        let mut tr = simple_translator(PagingMode::Demand);
        let results = tr.translate_all(&[1575424, 1575863, 1575864]).unwrap();
        assert_eq!(results, vec![4608, 5047, -1]);
        assert_eq!(tr.frames().allocated_count(), 0);
    }

    #[test]
    fn test_translate_undefined_segment() {
        let mut tr = simple_translator(PagingMode::Demand);
        let free = tr.frames().free_count();

        assert_eq!(
            tr.translate(7 << 18).unwrap(),
            TranslationResult::SegmentationFault
        );
        assert_eq!(tr.frames().free_count(), free);
        assert_eq!(tr.stats().segmentation_faults, 1);
    }

    #[test]
    fn test_translate_segment_beyond_table() {
        let mut tr = simple_translator(PagingMode::Demand);
        assert_eq!(
            tr.translate(600 << 18).unwrap(),
            TranslationResult::SegmentationFault
        );
    }

    #[test]
    fn test_translate_unmapped_page() {
        let mut tr = simple_translator(PagingMode::Demand);

        // Page 0 of segment 6 was never set up
        assert_eq!(tr.translate(6 << 18).unwrap(), TranslationResult::Unmapped);
        assert_eq!(tr.frames().allocated_count(), 0);
        assert_eq!(tr.stats().unmapped, 1);
    }

    #[test]
    fn test_translate_boundary_edge_cases() {
        let mut store = MemoryStore::new();
        store.set_segment_entry(1, 512, FrameRef::Resident(3));
        store.set_page_table_entry(3, 0, FrameRef::Resident(8));
        let mut tr = Translator::new(store, FrameAllocator::new(), PagingMode::Resident);

        assert_eq!(
            tr.translate((1 << 18) | 511).unwrap(),
            TranslationResult::Translated(8 * 512 + 511)
        );
        assert_eq!(
            tr.translate((1 << 18) | (1 << 9)).unwrap(),
            TranslationResult::SegmentationFault
        );
    }

    #[test]
    fn test_demand_paging_full_case() {
        let mut tr = demand_translator(PagingMode::Demand);

        let results = tr
            .translate_all(&[2097162, 2097674, 2359306, 2359818])
            .unwrap();

        // 8/0 resident in frame 10
        // 8/1 page fault -> frame 2
        // 9 page table fault -> frame 4 (3 is reserved), 9/0 in frame 13
        // 9/1 page fault -> frame 5
        assert_eq!(results, vec![5130, 1034, 6666, 2570]);

        let stats = tr.stats();
        assert_eq!(stats.page_table_faults, 1);
        assert_eq!(stats.page_faults, 2);
        assert_eq!(stats.translated, 4);
    }

    #[test]
    fn test_page_table_fault_writes_back() {
        let mut tr = demand_translator(PagingMode::Demand);
        tr.translate(2359306).unwrap();

        let store = tr.store();
        assert_eq!(store.segment_page_table_location(9), FrameRef::Resident(2));
        assert_eq!(store.page_table_entry(2, 0), FrameRef::Resident(13));
        assert_eq!(store.page_table_entry(2, 1), FrameRef::OnDisk(25));
    }

    #[test]
    fn test_page_fault_writes_back() {
        let mut tr = demand_translator(PagingMode::Demand);
        tr.translate(2097674).unwrap();
        assert_eq!(tr.store().page_table_entry(3, 1), FrameRef::Resident(2));
    }

    #[test]
    fn test_second_translation_allocates_nothing() {
        let mut tr = demand_translator(PagingMode::Demand);

        let first = tr.translate(2359818).unwrap();
        let allocated = tr.frames().allocated_count();
        assert_eq!(allocated, 2);

        let second = tr.translate(2359818).unwrap();
        assert_eq!(first, second);
        assert_eq!(tr.frames().allocated_count(), allocated);
    }

    #[test]
    fn test_page_table_on_disk_scenario() {
        // segment 0, length 1000, page table in block 1 mapping page 0 to frame 5
        let mut store = MemoryStore::new();
        let mut frames = FrameAllocator::new();
        store.set_segment_entry(0, 1000, FrameRef::OnDisk(1));
        store.set_disk_page_table_entry(1, 0, FrameRef::Resident(5));
        frames.reserve(5).unwrap();
        let mut tr = Translator::new(store, frames, PagingMode::Demand);

        assert_eq!(tr.translate(0).unwrap(), TranslationResult::Translated(2560));
        assert_eq!(
            tr.store().segment_page_table_location(0),
            FrameRef::Resident(2)
        );
    }

    #[test]
    fn test_resident_mode_rejects_on_disk_page_table() {
        let mut tr = demand_translator(PagingMode::Resident);
        let err = tr.translate(2359306).unwrap_err();
        assert!(matches!(
            err,
            VmError::NonResidentReference {
                segment: 9,
                location: FrameRef::OnDisk(7),
                ..
            }
        ));
        assert_eq!(tr.frames().allocated_count(), 0);
    }

    #[test]
    fn test_resident_mode_rejects_on_disk_page() {
        let mut tr = demand_translator(PagingMode::Resident);
        assert_eq!(
            tr.translate(2097162).unwrap(),
            TranslationResult::Translated(5130)
        );
        assert!(matches!(
            tr.translate(2097674),
            Err(VmError::NonResidentReference {
                segment: 8,
                page: 1,
                location: FrameRef::OnDisk(20),
            })
        ));
    }

    #[test]
    fn test_segmentation_fault_does_not_resolve_faults() {
        let mut tr = demand_translator(PagingMode::Demand);
        // segment 9, pw = 5000
        let va = (9 << 18) | (9 << 9) | 392;
        assert_eq!(tr.translate(va).unwrap(), TranslationResult::SegmentationFault);
        assert_eq!(tr.frames().allocated_count(), 0);
        assert_eq!(tr.store().segment_page_table_location(9), FrameRef::OnDisk(7));
    }

    #[test]
    fn test_out_of_frames_is_fatal() {
        let mut store = MemoryStore::new();
        store.set_segment_entry(2, 1024, FrameRef::OnDisk(3));
        let mut frames = FrameAllocator::new();
        for frame in FIRST_FREE_FRAME..NUM_FRAMES as u32 {
            frames.reserve(frame).unwrap();
        }
        let mut tr = Translator::new(store, frames, PagingMode::Demand);

        assert!(matches!(tr.translate(2 << 18), Err(VmError::OutOfFrames)));
        assert!(matches!(
            tr.translate_all(&[1, 2 << 18]),
            Err(VmError::OutOfFrames)
        ));
    }

    #[test]
    fn test_out_of_frames_on_page_fault() {
        let mut store = MemoryStore::new();
        store.set_segment_entry(2, 1024, FrameRef::Resident(3));
        store.set_page_table_entry(3, 1, FrameRef::OnDisk(40));
        let mut frames = FrameAllocator::new();
        for frame in FIRST_FREE_FRAME..NUM_FRAMES as u32 {
            frames.reserve(frame).unwrap();
        }
        let mut tr = Translator::new(store, frames, PagingMode::Demand);

        assert!(matches!(
            tr.translate((2 << 18) | (1 << 9)),
            Err(VmError::OutOfFrames)
        ));
        assert_eq!(tr.store().page_table_entry(3, 1), FrameRef::OnDisk(40));
        assert_eq!(tr.stats().page_faults, 0);
    }

    #[test]
    fn test_default_output_names() {
        assert_eq!(PagingMode::Demand.default_output(), "output-dp.txt");
        assert_eq!(PagingMode::Resident.default_output(), "output-no-dp.txt");
    }
}
