//! Randomized checks of the segment store's interval algebra against a
//! naive byte-map model.

use std::collections::BTreeMap;

use proptest::prelude::*;

use hexcat::{InsertPolicy, SegmentStore};

fn chunk() -> impl Strategy<Value = (u64, Vec<u8>)> {
    (0u64..512, prop::collection::vec(any::<u8>(), 1..48))
}

/// Every byte of the store, keyed by address.
fn store_bytes(store: &SegmentStore) -> BTreeMap<u64, u8> {
    store
        .segments()
        .iter()
        .flat_map(|s| {
            s.data
                .iter()
                .enumerate()
                .map(move |(i, &b)| (s.start_address + i as u64, b))
        })
        .collect()
}

fn assert_well_formed(store: &SegmentStore) {
    let segments = store.segments();
    for segment in segments {
        assert!(!segment.data.is_empty(), "empty segment");
    }
    for pair in segments.windows(2) {
        assert!(
            pair[0].end_address() < pair[1].start_address,
            "segments {:#X}..{:#X} and {:#X}..{:#X} not coalesced",
            pair[0].start_address,
            pair[0].end_address(),
            pair[1].start_address,
            pair[1].end_address(),
        );
    }
}

proptest! {
    #[test]
    fn insert_matches_byte_map(chunks in prop::collection::vec(chunk(), 0..24)) {
        let mut store = SegmentStore::new();
        let mut model = BTreeMap::new();

        for (address, data) in &chunks {
            store.insert(*address, data, InsertPolicy::Overwrite).unwrap();
            for (i, &byte) in data.iter().enumerate() {
                model.insert(address + i as u64, byte);
            }
        }

        assert_well_formed(&store);
        prop_assert_eq!(store_bytes(&store), model);
    }

    #[test]
    fn exclude_matches_byte_map(
        chunks in prop::collection::vec(chunk(), 1..12),
        ranges in prop::collection::vec((0u64..600, 0u64..80), 0..8),
    ) {
        let mut store = SegmentStore::new();
        let mut model = BTreeMap::new();

        for (address, data) in &chunks {
            store.insert(*address, data, InsertPolicy::Overwrite).unwrap();
            for (i, &byte) in data.iter().enumerate() {
                model.insert(address + i as u64, byte);
            }
        }

        for &(start, length) in &ranges {
            let end = start + length;
            if start < end {
                store.exclude(start, end).unwrap();
                model.retain(|&a, _| a < start || a >= end);
            }
        }

        assert_well_formed(&store);
        prop_assert_eq!(store_bytes(&store), model);
    }

    #[test]
    fn fill_joins_everything(chunks in prop::collection::vec(chunk(), 1..12)) {
        let mut store = SegmentStore::new();
        for (address, data) in &chunks {
            store.insert(*address, data, InsertPolicy::Overwrite).unwrap();
        }

        let before = store_bytes(&store);
        store.fill(0xAA, None);

        assert_well_formed(&store);
        prop_assert_eq!(store.segments().len(), 1);

        // Existing bytes survive, gap bytes are the pattern.
        let after = store_bytes(&store);
        let min = *before.keys().next().unwrap();
        let max = *before.keys().next_back().unwrap();
        for address in min..=max {
            let expected = before.get(&address).copied().unwrap_or(0xAA);
            prop_assert_eq!(after.get(&address).copied(), Some(expected));
        }
    }

    #[test]
    fn chunks_reassemble(chunks in prop::collection::vec(chunk(), 1..12), size in 1usize..40) {
        let mut store = SegmentStore::new();
        for (address, data) in &chunks {
            store.insert(*address, data, InsertPolicy::Overwrite).unwrap();
        }

        let mut reassembled = SegmentStore::new();
        for (address, piece) in store.chunks(size) {
            prop_assert!(piece.len() <= size);
            reassembled.insert(address, piece, InsertPolicy::Overwrite).unwrap();
        }

        prop_assert_eq!(store.segments(), reassembled.segments());
    }
}
