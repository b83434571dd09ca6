use std::collections::VecDeque;

use crate::constants::*;
use crate::error::{Result, VmError};

/// Tracks which frames are available for allocation.
///
/// Frames are handed out first-in first-out. The queue is seeded in
/// ascending order and reservations only remove entries, so allocation
/// order is always ascending over frames never handed out before.
#[derive(Debug, Clone)]
pub struct FrameAllocator {
    free: VecDeque<u32>,
    allocated: usize,
}

impl FrameAllocator {
    /// All frames except the segment table frames are free
    pub fn new() -> Self {
        FrameAllocator {
            free: (FIRST_FREE_FRAME..NUM_FRAMES as u32).collect(),
            allocated: 0,
        }
    }

    pub fn allocate(&mut self) -> Result<u32> {
        let frame = self.free.pop_front().ok_or(VmError::OutOfFrames)?;
        self.allocated += 1;
        Ok(frame)
    }

    /// Remove a frame that initialization marks as already resident
    pub fn reserve(&mut self, frame: u32) -> Result<()> {
        // free is sorted ascending
        match self.free.binary_search(&frame) {
            Ok(index) => {
                self.free.remove(index);
                Ok(())
            }
            Err(_) => Err(VmError::DoubleReservation { frame }),
        }
    }

    pub fn is_free(&self, frame: u32) -> bool {
        self.free.binary_search(&frame).is_ok()
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Frames handed out by `allocate` (reservations not included)
    pub fn allocated_count(&self) -> usize {
        self.allocated
    }
}

impl Default for FrameAllocator {
    fn default() -> Self {
        Self::new()
    }
}
