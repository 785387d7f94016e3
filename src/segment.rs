/// A contiguous run of bytes at a known base address.
///
/// The end address is derived, never stored: `end_address() ==
/// start_address + data.len()` (exclusive).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub start_address: u64,
    pub data: Vec<u8>,
}

impl Segment {
    pub fn new(start_address: u64, data: Vec<u8>) -> Self {
        Self {
            start_address,
            data,
        }
    }

    /// Exclusive end address.
    pub fn end_address(&self) -> u64 {
        self.start_address + self.data.len() as u64
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn contains(&self, address: u64) -> bool {
        address >= self.start_address && address < self.end_address()
    }

    /// True if `other` starts exactly where this segment ends.
    pub fn is_contiguous_with(&self, other: &Segment) -> bool {
        self.end_address() == other.start_address
    }

    pub fn merge(&mut self, other: Segment) {
        debug_assert!(self.is_contiguous_with(&other));
        self.data.extend(other.data);
    }
}
