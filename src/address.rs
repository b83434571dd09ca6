use crate::constants::*;

/// Represents the decomposed components of a Virtual Address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualAddress {
    pub va: u32,
    pub s: u32,
    pub p: u32,
    pub w: u32,
    /// Byte offset within the segment (p * FRAME_SIZE + w)
    pub pw: u32,
}

impl VirtualAddress {
    /// Decompose a raw VA into its components. Any value decodes; bounds
    /// are checked by the translator.
    pub fn decode(va: u32) -> Self {
        let s = va >> S_SHIFT;
        let p = (va >> P_SHIFT) & P_MASK;
        let w = va & W_MASK;
        let pw = va & PW_MASK;

        VirtualAddress { va, s, p, w, pw }
    }

    /// Whether the segment field indexes a slot of the segment table
    #[inline]
    pub fn in_segment_table(&self) -> bool {
        (self.s as usize) < MAX_SEGMENTS
    }
}

impl std::fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "VA({}) = (s={}, p={}, w={}, pw={})",
            self.va, self.s, self.p, self.w, self.pw
        )
    }
}
