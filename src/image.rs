use crate::store::{InsertPolicy, SegmentStore, StoreError};
use crate::Segment;

pub const DEFAULT_FILL_PATTERN: u8 = 0xFF;
pub const DEFAULT_RECORD_LENGTH: usize = 32;

/// Options for [`MemoryImage::fill`].
#[derive(Debug, Clone, Copy)]
pub struct FillOptions {
    /// Byte written into each gap.
    pub pattern: u8,
    /// Gaps wider than this many words are left untouched. `None` fills
    /// every gap.
    pub max_words: Option<u64>,
}

impl Default for FillOptions {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_FILL_PATTERN,
            max_words: None,
        }
    }
}

/// A sparse byte image in an address space, together with the metadata the
/// record formats carry: an optional execution start address (S7/S8/S9,
/// Intel HEX type 03/05, ELF entry point), an optional free-text header
/// (S0), the word size used for VMEM grouping, and the preferred record
/// payload length for serializers.
///
/// The image exclusively owns its segment store. It is a single-writer
/// structure with no internal synchronization; callers receive copies or
/// read-only views of the bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryImage {
    store: SegmentStore,
    pub execution_start_address: Option<u64>,
    pub header: Option<Vec<u8>>,
    word_size: usize,
    record_length: usize,
}

impl MemoryImage {
    pub fn new() -> Self {
        Self::with_word_size(1)
    }

    /// An image whose VMEM words and fill bounds span `word_size` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `word_size` is zero.
    pub fn with_word_size(word_size: usize) -> Self {
        assert!(word_size > 0, "word size must be at least one byte");
        Self {
            store: SegmentStore::new(),
            execution_start_address: None,
            header: None,
            word_size,
            record_length: DEFAULT_RECORD_LENGTH,
        }
    }

    pub fn word_size(&self) -> usize {
        self.word_size
    }

    /// Preferred serializer payload length, used when the caller's write
    /// options leave the record length unset.
    pub fn record_length(&self) -> usize {
        self.record_length
    }

    pub fn set_record_length(&mut self, record_length: usize) {
        debug_assert!(record_length > 0);
        self.record_length = record_length;
    }

    /// Add `bytes` at `address`, overwriting existing data on overlap.
    pub fn add(&mut self, address: u64, bytes: &[u8]) -> Result<(), StoreError> {
        self.insert(address, bytes, InsertPolicy::Overwrite)
    }

    pub fn insert(
        &mut self,
        address: u64,
        bytes: &[u8],
        policy: InsertPolicy,
    ) -> Result<(), StoreError> {
        tracing::debug!(address, length = bytes.len(), ?policy, "insert");
        self.store.insert(address, bytes, policy)
    }

    /// Remove `[start, end)` from the image.
    pub fn exclude(&mut self, start: u64, end: u64) -> Result<(), StoreError> {
        self.store.exclude(start, end)
    }

    /// Fill gaps between segments, skipping gaps wider than
    /// `options.max_words` words.
    pub fn fill(&mut self, options: &FillOptions) {
        let max_gap = options.max_words.map(|w| w * self.word_size as u64);
        self.store.fill(options.pattern, max_gap);
    }

    /// Fill the uncovered parts of `[start, end)` without touching
    /// existing data.
    pub fn fill_range(&mut self, start: u64, end: u64, pattern: u8) -> Result<(), StoreError> {
        self.store.fill_range(start, end, pattern)
    }

    /// Bytes of `[start, end)`; gaps fail unless a `fill` byte is given.
    pub fn slice(&self, start: u64, end: u64, fill: Option<u8>) -> Result<Vec<u8>, StoreError> {
        self.store.slice(start, end, fill)
    }

    /// Read one byte, `None` over gaps.
    pub fn get(&self, address: u64) -> Option<u8> {
        self.store.get(address)
    }

    pub fn minimum_address(&self) -> Option<u64> {
        self.store.min_address().ok()
    }

    /// Exclusive end address of the last segment.
    pub fn maximum_address(&self) -> Option<u64> {
        self.store.max_address().ok()
    }

    /// Distance from the minimum to the maximum address, zero when empty.
    pub fn len(&self) -> u64 {
        match (self.minimum_address(), self.maximum_address()) {
            (Some(min), Some(max)) => max - min,
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Number of bytes actually stored, gaps excluded.
    pub fn total_bytes(&self) -> u64 {
        self.store.total_bytes()
    }

    /// Segments in ascending address order. The iterator is finite and can
    /// be restarted by calling again.
    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.store.segments().iter()
    }

    pub fn segment_count(&self) -> usize {
        self.store.segments().len()
    }

    /// Serializer feed: pieces of at most `size` bytes, ascending.
    pub fn chunks(&self, size: usize) -> impl Iterator<Item = (u64, &[u8])> {
        self.store.chunks(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_len_and_addresses() {
        let mut image = MemoryImage::new();
        assert_eq!(image.len(), 0);
        assert_eq!(image.minimum_address(), None);

        image.add(0x100, &[0u8; 0x40]).unwrap();
        assert_eq!(image.minimum_address(), Some(0x100));
        assert_eq!(image.maximum_address(), Some(0x140));
        assert_eq!(image.len(), 0x40);
    }

    #[test]
    fn test_fill_scales_by_word_size() {
        let mut image = MemoryImage::with_word_size(2);
        image.add(0, b"\x01\x02").unwrap();
        image.add(4, b"\x03\x04").unwrap();
        image.add(10, b"\x05\x06").unwrap();
        // max_words = 1 allows the 2-byte gap, not the 4-byte one.
        image.fill(&FillOptions {
            pattern: 0xAA,
            max_words: Some(1),
        });
        assert_eq!(image.segment_count(), 2);
        assert_eq!(
            image.slice(0, 6, None).unwrap(),
            b"\x01\x02\xAA\xAA\x03\x04"
        );
    }

    #[test]
    fn test_fill_default_pattern() {
        let mut image = MemoryImage::new();
        image.add(0, b"\x01").unwrap();
        image.add(2, b"\x02").unwrap();
        image.fill(&FillOptions::default());
        assert_eq!(image.slice(0, 3, None).unwrap(), b"\x01\xFF\x02");
    }

    #[test]
    fn test_segments_iterator_restarts() {
        let mut image = MemoryImage::new();
        image.add(0x200, b"CD").unwrap();
        image.add(0x100, b"AB").unwrap();

        let starts: Vec<u64> = image.segments().map(|s| s.start_address).collect();
        assert_eq!(starts, vec![0x100, 0x200]);
        // A second call yields the same sequence.
        assert_eq!(image.segments().count(), 2);
    }

    #[test]
    #[should_panic(expected = "word size")]
    fn test_zero_word_size_panics() {
        let _ = MemoryImage::with_word_size(0);
    }
}
