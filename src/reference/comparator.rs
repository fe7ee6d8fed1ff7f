//! Range comparison helpers
//!
//! Ordering of addresses is derived (book, chapter, verse). These helpers
//! cover the range-level questions the store and collections ask.

use std::cmp::Ordering;

use super::types::{AddressRange, CanonicalAddress};

/// Reading-order comparison of two ranges: start first, then end
pub fn compare_ranges(a: &AddressRange, b: &AddressRange) -> Ordering {
    a.start().cmp(&b.start()).then(a.end().cmp(&b.end()))
}

/// Whether `a` ends before `b` starts
pub fn is_before(a: &AddressRange, b: &AddressRange) -> bool {
    a.end() < b.start()
}

/// Whether `address` lies in `[start, end]`
pub fn is_in_range(address: &CanonicalAddress, start: &CanonicalAddress, end: &CanonicalAddress) -> bool {
    address >= start && address <= end
}

/// Sort ranges and merge the overlapping ones.
///
/// Adjacent but non-overlapping ranges stay separate.
pub fn coalesce(ranges: impl IntoIterator<Item = AddressRange>) -> Vec<AddressRange> {
    let mut sorted: Vec<AddressRange> = ranges.into_iter().collect();
    sorted.sort_by(compare_ranges);

    let mut merged: Vec<AddressRange> = Vec::with_capacity(sorted.len());
    for range in sorted {
        if let Some(last) = merged.last_mut() {
            if let Some(union) = last.union(&range) {
                *last = union;
                continue;
            }
        }
        merged.push(range);
    }
    merged
}
