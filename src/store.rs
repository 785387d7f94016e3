use thiserror::Error;

use crate::Segment;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("conflicting data at address {address:#X}")]
    AddressConflict { address: u64 },

    #[error("no data at address {address:#X}")]
    Gap { address: u64 },

    #[error("store has no segments")]
    Empty,

    #[error("bad address range {start:#X}..{end:#X}")]
    BadRange { start: u64, end: u64 },

    #[error("address range {address:#X}+{length} overflows")]
    AddressOverflow { address: u64, length: usize },
}

/// Behavior of [`SegmentStore::insert`] over addresses that already hold
/// data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertPolicy {
    /// Last write wins; overlapped bytes are replaced silently.
    #[default]
    Overwrite,
    /// Fail with [`StoreError::AddressConflict`] if an overlapped address
    /// holds a byte different from the incoming one.
    Strict,
}

/// An ordered set of non-overlapping segments, sorted by start address and
/// maximally coalesced: no two segments overlap or touch, and none is
/// empty. All mutation goes through `insert`, `exclude` and the fill
/// operations, each of which restores the invariants before returning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentStore {
    segments: Vec<Segment>,
}

impl SegmentStore {
    pub fn new() -> Self {
        Self { segments: vec![] }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Lowest start address across all segments.
    pub fn min_address(&self) -> Result<u64, StoreError> {
        self.segments
            .first()
            .map(|s| s.start_address)
            .ok_or(StoreError::Empty)
    }

    /// Highest (exclusive) end address across all segments.
    pub fn max_address(&self) -> Result<u64, StoreError> {
        self.segments
            .last()
            .map(|s| s.end_address())
            .ok_or(StoreError::Empty)
    }

    pub fn total_bytes(&self) -> u64 {
        self.segments.iter().map(|s| s.len() as u64).sum()
    }

    /// Read a single byte, `None` over gaps.
    pub fn get(&self, address: u64) -> Option<u8> {
        let idx = self
            .segments
            .partition_point(|s| s.end_address() <= address);
        let seg = self.segments.get(idx)?;
        seg.contains(address)
            .then(|| seg.data[(address - seg.start_address) as usize])
    }

    /// Insert `bytes` at `address`, merging with any segment the new range
    /// overlaps or touches. Under [`InsertPolicy::Overwrite`] the new bytes
    /// win on overlap; under [`InsertPolicy::Strict`] a differing
    /// overlapped byte fails the whole insert without mutating the store.
    pub fn insert(
        &mut self,
        address: u64,
        bytes: &[u8],
        policy: InsertPolicy,
    ) -> Result<(), StoreError> {
        if bytes.is_empty() {
            return Ok(());
        }

        let end = address
            .checked_add(bytes.len() as u64)
            .ok_or(StoreError::AddressOverflow {
                address,
                length: bytes.len(),
            })?;

        // Affected range: every segment that overlaps or touches
        // [address, end).
        let lo = self
            .segments
            .partition_point(|s| s.end_address() < address);
        let hi = self.segments.partition_point(|s| s.start_address <= end);

        if lo == hi {
            self.segments.insert(lo, Segment::new(address, bytes.to_vec()));
            return Ok(());
        }

        if policy == InsertPolicy::Strict {
            for seg in &self.segments[lo..hi] {
                let from = address.max(seg.start_address);
                let to = end.min(seg.end_address());
                for pos in from..to {
                    let old = seg.data[(pos - seg.start_address) as usize];
                    let new = bytes[(pos - address) as usize];
                    if old != new {
                        return Err(StoreError::AddressConflict { address: pos });
                    }
                }
            }
        }

        let new_start = address.min(self.segments[lo].start_address);
        let new_end = end.max(self.segments[hi - 1].end_address());
        let mut data = vec![0u8; (new_end - new_start) as usize];

        // Old bytes first, new bytes on top.
        for seg in &self.segments[lo..hi] {
            let offset = (seg.start_address - new_start) as usize;
            data[offset..offset + seg.len()].copy_from_slice(&seg.data);
        }
        let offset = (address - new_start) as usize;
        data[offset..offset + bytes.len()].copy_from_slice(bytes);

        self.segments
            .splice(lo..hi, std::iter::once(Segment::new(new_start, data)));

        Ok(())
    }

    /// Remove `[start, end)`, splitting any straddling segment into up to
    /// two remainders. Uncovered addresses are a no-op.
    pub fn exclude(&mut self, start: u64, end: u64) -> Result<(), StoreError> {
        if start > end {
            return Err(StoreError::BadRange { start, end });
        }
        if start == end {
            return Ok(());
        }

        let lo = self.segments.partition_point(|s| s.end_address() <= start);
        let hi = self.segments.partition_point(|s| s.start_address < end);

        let mut remainders = Vec::new();
        for seg in &self.segments[lo..hi] {
            if seg.start_address < start {
                let keep = (start - seg.start_address) as usize;
                remainders.push(Segment::new(seg.start_address, seg.data[..keep].to_vec()));
            }
            if seg.end_address() > end {
                let skip = (end - seg.start_address) as usize;
                remainders.push(Segment::new(end, seg.data[skip..].to_vec()));
            }
        }

        self.segments.splice(lo..hi, remainders);

        Ok(())
    }

    /// Bytes covering `[start, end)`. Uncovered positions fail with
    /// [`StoreError::Gap`] unless a default `fill` byte is supplied, in
    /// which case they are synthesized without mutating the store.
    pub fn slice(&self, start: u64, end: u64, fill: Option<u8>) -> Result<Vec<u8>, StoreError> {
        if start > end {
            return Err(StoreError::BadRange { start, end });
        }

        let mut out = Vec::with_capacity((end - start) as usize);
        let mut pos = start;
        let idx = self.segments.partition_point(|s| s.end_address() <= start);

        for seg in &self.segments[idx..] {
            if seg.start_address >= end {
                break;
            }
            if seg.start_address > pos {
                let byte = fill.ok_or(StoreError::Gap { address: pos })?;
                out.resize(out.len() + (seg.start_address - pos) as usize, byte);
                pos = seg.start_address;
            }
            let from = (pos - seg.start_address) as usize;
            let to = (end.min(seg.end_address()) - seg.start_address) as usize;
            out.extend_from_slice(&seg.data[from..to]);
            pos = seg.start_address + to as u64;
        }

        if pos < end {
            let byte = fill.ok_or(StoreError::Gap { address: pos })?;
            out.resize((end - start) as usize, byte);
        }

        Ok(out)
    }

    /// Fill every gap between consecutive segments with `pattern`, in
    /// ascending address order, merging the result with its neighbors.
    /// Gaps larger than `max_gap` bytes are left untouched. Idempotent.
    pub fn fill(&mut self, pattern: u8, max_gap: Option<u64>) {
        let gaps: Vec<(u64, u64)> = self
            .segments
            .windows(2)
            .map(|w| (w[0].end_address(), w[1].start_address))
            .filter(|&(from, to)| {
                let gap = to - from;
                gap > 0 && max_gap.is_none_or(|max| gap <= max)
            })
            .collect();

        for (from, to) in gaps {
            let bytes = vec![pattern; (to - from) as usize];
            // Gaps hold no data, so overwrite semantics cannot conflict.
            self.insert(from, &bytes, InsertPolicy::Overwrite)
                .expect("filling a gap cannot fail");
        }
    }

    /// Fill the uncovered positions of `[start, end)` with `pattern`
    /// without touching existing data.
    pub fn fill_range(&mut self, start: u64, end: u64, pattern: u8) -> Result<(), StoreError> {
        if start > end {
            return Err(StoreError::BadRange { start, end });
        }

        let mut holes = Vec::new();
        let mut pos = start;
        let idx = self.segments.partition_point(|s| s.end_address() <= start);

        for seg in &self.segments[idx..] {
            if seg.start_address >= end {
                break;
            }
            if seg.start_address > pos {
                holes.push((pos, seg.start_address));
            }
            pos = seg.end_address().min(end);
        }
        if pos < end {
            holes.push((pos, end));
        }

        for (from, to) in holes {
            let bytes = vec![pattern; (to - from) as usize];
            self.insert(from, &bytes, InsertPolicy::Overwrite)?;
        }

        Ok(())
    }

    /// Pieces of at most `size` bytes in ascending address order, the feed
    /// for record serializers.
    pub fn chunks(&self, size: usize) -> impl Iterator<Item = (u64, &[u8])> {
        debug_assert!(size > 0);
        self.segments.iter().flat_map(move |seg| {
            seg.data
                .chunks(size)
                .enumerate()
                .map(move |(i, chunk)| (seg.start_address + (i * size) as u64, chunk))
        })
    }
}
