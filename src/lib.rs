//! Segmented paging simulator: translates (segment, page, offset) virtual
//! addresses into physical addresses, optionally loading page tables and
//! pages on demand.

pub mod address;
pub mod constants;
pub mod error;
pub mod frames;
pub mod io;
pub mod logger;
pub mod memory;
pub mod translation;

// Re-export commonly used items for convenience
pub use address::VirtualAddress;
pub use constants::*;
pub use error::{Result, VmError};
pub use frames::FrameAllocator;
pub use memory::{FrameRef, MemoryStore};
pub use translation::{FaultStats, PagingMode, TranslationResult, Translator};
