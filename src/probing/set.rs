// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use std::iter;

use log::debug;
use log::trace;

use crate::codec::SetBytes;
use crate::codec::SetSlice;
use crate::error::Error;
use crate::probing::builder::DEFAULT_CAPACITY;
use crate::probing::builder::DEFAULT_LOAD_FACTOR_THRESHOLD;
use crate::probing::builder::ProbingSetBuilder;
use crate::probing::builder::is_valid_load_factor_threshold;
use crate::probing::serialization::ENTRY_SIZE_BYTES;
use crate::probing::serialization::FLAGS_IS_EMPTY;
use crate::probing::serialization::LONG_SIZE_BYTES;
use crate::probing::serialization::MAX_CAPACITY;
use crate::probing::serialization::PREAMBLE_LONGS_EMPTY;
use crate::probing::serialization::PREAMBLE_LONGS_STANDARD;
use crate::probing::serialization::PROBING_SET_FAMILY_ID;
use crate::probing::serialization::PROBING_SET_FAMILY_NAME;
use crate::probing::serialization::SERIAL_VERSION;

/// A set of distinct `i64` values stored in an open-addressing hash table.
///
/// Collisions are resolved with quadratic probing: a value `v` is looked for at
/// `v mod capacity`, then at `(v + i²) mod capacity` for `i` in `0..capacity`. Removal simply
/// empties the slot; lookups walk the whole bounded sequence instead of stopping at the
/// first hole, so no tombstones are needed.
///
/// The table grows to `capacity * 2 + 1` slots when an insert starts with the load factor at
/// or above the configured threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbingSet {
    slots: Vec<Option<i64>>,
    count: usize,
    load_factor_threshold: f64,
}

impl Default for ProbingSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ProbingSet {
    /// Creates an empty set with 7 slots and a load factor threshold of 0.65.
    pub fn new() -> Self {
        Self::with_config(DEFAULT_CAPACITY, DEFAULT_LOAD_FACTOR_THRESHOLD)
    }

    /// Returns a builder for creating a set with a custom configuration.
    pub fn builder() -> ProbingSetBuilder {
        ProbingSetBuilder::default()
    }

    pub(super) fn with_config(capacity: usize, load_factor_threshold: f64) -> Self {
        debug_assert!(capacity > 0);
        debug_assert!(is_valid_load_factor_threshold(load_factor_threshold));
        Self {
            slots: vec![None; capacity],
            count: 0,
            load_factor_threshold,
        }
    }

    // ========================================================================
    // Update Operations
    // ========================================================================

    /// Inserts a value into the set.
    ///
    /// Returns `true` if the value was newly inserted, `false` if it was already present.
    ///
    /// A value that is not yet present costs `O(capacity)`: removal leaves no tombstones, so the
    /// duplicate check walks the whole bounded probe sequence.
    ///
    /// # Examples
    ///
    /// ```
    /// # use probeset::probing::ProbingSet;
    /// let mut set = ProbingSet::new();
    /// assert!(set.insert(10));
    /// assert!(!set.insert(10));
    /// assert_eq!(set.size(), 1);
    /// ```
    pub fn insert(&mut self, value: i64) -> bool {
        if self.find(value).is_some() {
            return false;
        }

        if self.is_at_threshold() {
            self.grow();
        }

        // Terminates: at least floor(sqrt(capacity)) slots are reachable from any value, so
        // growing eventually leaves one of them empty.
        loop {
            if let Some(index) = vacant_slot(&self.slots, value) {
                self.slots[index] = Some(value);
                self.count += 1;
                return true;
            }
            trace!(
                "no vacant slot for {value} among {} slots holding {} values",
                self.capacity(),
                self.count
            );
            self.grow();
        }
    }

    /// Removes a value from the set.
    ///
    /// Returns `true` if the value was present. Removing an absent value is a no-op.
    pub fn remove(&mut self, value: i64) -> bool {
        let Some(index) = self.find(value) else {
            return false;
        };
        self.slots[index] = None;
        self.count -= 1;
        true
    }

    /// Empties every slot. The capacity is kept.
    pub fn clear(&mut self) {
        self.slots.fill(None);
        self.count = 0;
    }

    // ========================================================================
    // Query Operations
    // ========================================================================

    /// Returns the slot index holding `value`, or `None` if the value is absent.
    ///
    /// # Examples
    ///
    /// ```
    /// # use probeset::probing::ProbingSet;
    /// let mut set = ProbingSet::new();
    /// set.insert(10);
    /// set.insert(17); // 10 and 17 both hash to slot 3
    /// assert_eq!(set.find(10), Some(3));
    /// assert_eq!(set.find(17), Some(4));
    /// assert_eq!(set.find(24), None);
    /// ```
    pub fn find(&self, value: i64) -> Option<usize> {
        probe_sequence(value, self.capacity()).find(|&index| self.slots[index] == Some(value))
    }

    /// Returns whether `value` is in the set.
    pub fn contains(&self, value: i64) -> bool {
        self.find(value).is_some()
    }

    /// Returns the number of values in the set.
    pub fn size(&self) -> usize {
        self.count
    }

    /// Returns whether the set holds no values.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns the number of slots, occupied or not.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the load factor that triggers growth.
    pub fn load_factor_threshold(&self) -> f64 {
        self.load_factor_threshold
    }

    /// Returns the current ratio of occupied slots to capacity.
    pub fn load_factor(&self) -> f64 {
        self.count as f64 / self.capacity() as f64
    }

    /// Returns an iterator over the values in slot order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            slots: self.slots.iter(),
            remaining: self.count,
        }
    }

    fn is_at_threshold(&self) -> bool {
        self.count as f64 >= self.capacity() as f64 * self.load_factor_threshold
    }

    /// Rehashes every value into a table of `capacity * 2 + 1` slots.
    ///
    /// If some value finds no vacant slot in the new table, the target capacity is grown again
    /// by the same rule and the rehash restarts from the current slots.
    fn grow(&mut self) {
        let old_capacity = self.capacity();
        let mut new_capacity = grown_capacity(old_capacity);
        let slots = loop {
            match rehash(&self.slots, new_capacity) {
                Some(slots) => break slots,
                None => {
                    trace!("rehash into {new_capacity} slots failed, growing again");
                    new_capacity = grown_capacity(new_capacity);
                }
            }
        };
        debug!(
            "grew probing set from {old_capacity} to {new_capacity} slots holding {} values",
            self.count
        );
        self.slots = slots;
    }

    // ========================================================================
    // Serialization
    // ========================================================================

    /// Serializes the set into a byte image.
    ///
    /// The image keeps the exact slot layout, so [`find`](Self::find) reports the same indices
    /// after [`deserialize`](Self::deserialize). Images of sets grown past 2^26 slots are
    /// rejected by `deserialize`.
    pub fn serialize(&self) -> Vec<u8> {
        let is_empty = self.is_empty();
        let preamble_longs = if is_empty {
            PREAMBLE_LONGS_EMPTY
        } else {
            PREAMBLE_LONGS_STANDARD
        };

        let size = LONG_SIZE_BYTES * preamble_longs as usize + ENTRY_SIZE_BYTES * self.count;
        let mut bytes = SetBytes::with_capacity(size);

        bytes.write_u8(preamble_longs);
        bytes.write_u8(SERIAL_VERSION);
        bytes.write_u8(PROBING_SET_FAMILY_ID);
        bytes.write_u8(if is_empty { FLAGS_IS_EMPTY } else { 0 });
        for _ in 0..4 {
            bytes.write_u8(0); // reserved
        }
        bytes.write_u64_le(self.capacity() as u64);
        bytes.write_f64_le(self.load_factor_threshold);

        if !is_empty {
            bytes.write_u64_le(self.count as u64);
            for (index, slot) in self.slots.iter().enumerate() {
                if let Some(value) = slot {
                    bytes.write_u64_le(index as u64);
                    bytes.write_i64_le(*value);
                }
            }
        }

        bytes.into_bytes()
    }

    /// Deserializes a set from a byte image produced by [`serialize`](Self::serialize).
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::MalformedDeserializeData`](crate::error::ErrorKind::MalformedDeserializeData)
    /// if the image is truncated, followed by trailing bytes, or inconsistent: wrong family or
    /// version, bad threshold, capacity of zero or above 2^26, slot indices out of range,
    /// duplicate slots or values, or a value stored where its own probe sequence would never
    /// look.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        let mut cursor = SetSlice::new(bytes);

        let preamble_longs = cursor
            .read_u8()
            .map_err(|e| Error::insufficient_data("preamble_longs", e))?;
        let serial_version = cursor
            .read_u8()
            .map_err(|e| Error::insufficient_data("serial_version", e))?;
        let family_id = cursor
            .read_u8()
            .map_err(|e| Error::insufficient_data("family_id", e))?;
        let flags = cursor
            .read_u8()
            .map_err(|e| Error::insufficient_data("flags", e))?;

        if family_id != PROBING_SET_FAMILY_ID {
            return Err(Error::invalid_family(
                PROBING_SET_FAMILY_ID,
                family_id,
                PROBING_SET_FAMILY_NAME,
            ));
        }
        if serial_version != SERIAL_VERSION {
            return Err(Error::unsupported_serial_version(
                SERIAL_VERSION,
                serial_version,
            ));
        }
        let is_empty = flags & FLAGS_IS_EMPTY != 0;
        let expected_preamble_longs = if is_empty {
            PREAMBLE_LONGS_EMPTY
        } else {
            PREAMBLE_LONGS_STANDARD
        };
        if preamble_longs != expected_preamble_longs {
            return Err(Error::invalid_preamble_longs(
                expected_preamble_longs,
                preamble_longs,
            ));
        }

        for _ in 0..4 {
            cursor
                .read_u8()
                .map_err(|e| Error::insufficient_data("reserved", e))?;
        }

        let capacity = cursor
            .read_u64_le()
            .map_err(|e| Error::insufficient_data("capacity", e))?;
        let load_factor_threshold = cursor
            .read_f64_le()
            .map_err(|e| Error::insufficient_data("load_factor_threshold", e))?;

        if !is_valid_load_factor_threshold(load_factor_threshold) {
            return Err(Error::deserial("load factor threshold must be in (0, 1)")
                .with_context("load_factor_threshold", load_factor_threshold));
        }
        let capacity = usize::try_from(capacity)
            .ok()
            .filter(|&c| c > 0 && c <= MAX_CAPACITY)
            .ok_or_else(|| {
                Error::deserial("capacity out of range").with_context("capacity", capacity)
            })?;

        if is_empty {
            check_fully_consumed(&cursor)?;
            return Ok(Self::with_config(capacity, load_factor_threshold));
        }

        let count = cursor
            .read_u64_le()
            .map_err(|e| Error::insufficient_data("count", e))?;
        if count == 0 || count > capacity as u64 {
            return Err(Error::deserial("count must be in [1, capacity] for a non-empty set")
                .with_context("count", count)
                .with_context("capacity", capacity));
        }
        let count = count as usize;
        // Reject lying counts before allocating for them.
        if cursor.remaining() < count.saturating_mul(ENTRY_SIZE_BYTES) {
            return Err(Error::deserial("image shorter than its entry count")
                .with_context("count", count)
                .with_context("remaining", cursor.remaining()));
        }

        let mut set = Self::with_config(capacity, load_factor_threshold);
        for _ in 0..count {
            let index = cursor
                .read_u64_le()
                .map_err(|e| Error::insufficient_data("slot_index", e))?;
            let value = cursor
                .read_i64_le()
                .map_err(|e| Error::insufficient_data("slot_value", e))?;

            let index = usize::try_from(index)
                .ok()
                .filter(|&i| i < capacity)
                .ok_or_else(|| {
                    Error::deserial("slot index out of range")
                        .with_context("index", index)
                        .with_context("capacity", capacity)
                })?;
            if set.slots[index].is_some() {
                return Err(Error::deserial("slot occupied twice").with_context("index", index));
            }
            if set.contains(value) {
                return Err(Error::deserial("value stored twice").with_context("value", value));
            }
            if !probe_sequence(value, capacity).any(|i| i == index) {
                return Err(Error::deserial("value unreachable from its probe sequence")
                    .with_context("value", value)
                    .with_context("index", index));
            }

            set.slots[index] = Some(value);
            set.count += 1;
        }

        check_fully_consumed(&cursor)?;
        Ok(set)
    }
}

/// An iterator over the values of a [`ProbingSet`], in slot order.
#[derive(Debug, Clone)]
pub struct Iter<'a> {
    slots: std::slice::Iter<'a, Option<i64>>,
    remaining: usize,
}

impl Iterator for Iter<'_> {
    type Item = i64;

    fn next(&mut self) -> Option<Self::Item> {
        let value = self.slots.by_ref().find_map(|slot| *slot)?;
        self.remaining -= 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl<'a> IntoIterator for &'a ProbingSet {
    type Item = i64;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Extend<i64> for ProbingSet {
    fn extend<T: IntoIterator<Item = i64>>(&mut self, iter: T) {
        for value in iter {
            self.insert(value);
        }
    }
}

impl FromIterator<i64> for ProbingSet {
    fn from_iter<T: IntoIterator<Item = i64>>(iter: T) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

fn check_fully_consumed(cursor: &SetSlice<'_>) -> Result<(), Error> {
    match cursor.remaining() {
        0 => Ok(()),
        remaining => Err(Error::deserial("trailing bytes after set image")
            .with_context("remaining", remaining)),
    }
}

#[inline]
fn grown_capacity(capacity: usize) -> usize {
    capacity * 2 + 1
}

/// Maps a key into `[0, capacity)`. Negative keys wrap around instead of yielding a negative
/// remainder.
#[inline]
fn slot_of(key: i128, capacity: usize) -> usize {
    key.rem_euclid(capacity as i128) as usize
}

#[inline]
fn hash(value: i64, capacity: usize) -> usize {
    slot_of(value as i128, capacity)
}

/// Quadratic probe with c1 = 0 and c2 = 1, taken from the original value rather than the
/// previously probed index.
#[inline]
fn probe(value: i64, i: usize, capacity: usize) -> usize {
    let i = i as i128;
    slot_of(value as i128 + i * i, capacity)
}

/// The slots visited for `value`: its home slot, then `probe(value, i)` for `i` in
/// `0..capacity`. Since `i²` mod `capacity` repeats with period `capacity`, this covers every
/// slot quadratic probing can ever reach.
fn probe_sequence(value: i64, capacity: usize) -> impl Iterator<Item = usize> {
    iter::once(hash(value, capacity)).chain((0..capacity).map(move |i| probe(value, i, capacity)))
}

fn vacant_slot(slots: &[Option<i64>], value: i64) -> Option<usize> {
    probe_sequence(value, slots.len()).find(|&index| slots[index].is_none())
}

fn rehash(slots: &[Option<i64>], capacity: usize) -> Option<Vec<Option<i64>>> {
    let mut new_slots = vec![None; capacity];
    for &value in slots.iter().flatten() {
        let index = vacant_slot(&new_slots, value)?;
        new_slots[index] = Some(value);
    }
    Some(new_slots)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn occupied(set: &ProbingSet) -> usize {
        set.slots.iter().filter(|slot| slot.is_some()).count()
    }

    #[test]
    fn test_hash_normalizes_negative_values() {
        assert_eq!(hash(10, 7), 3);
        assert_eq!(hash(-1, 7), 6);
        assert_eq!(hash(-8, 7), 6);
        assert_eq!(hash(i64::MIN, 7), (i64::MIN as i128).rem_euclid(7) as usize);
    }

    #[test]
    fn test_probe_rehashes_original_value() {
        // probe(v, i) == hash(v + i²), independent of the previously probed slot
        assert_eq!(probe(17, 0, 7), 3);
        assert_eq!(probe(17, 1, 7), 4);
        assert_eq!(probe(17, 2, 7), 0);
        assert_eq!(probe(17, 3, 7), 5);
        assert_eq!(probe(i64::MAX, 6, 7), slot_of(i64::MAX as i128 + 36, 7));
    }

    #[test]
    fn test_probe_sequence_is_bounded() {
        let seq: Vec<usize> = probe_sequence(10, 7).collect();
        assert_eq!(seq, vec![3, 3, 4, 0, 5, 5, 0, 4]);
        assert_eq!(probe_sequence(123, 15).count(), 16);
    }

    #[test]
    fn test_colliding_values_take_distinct_slots() {
        let mut set = ProbingSet::new();
        assert!(set.insert(10));
        assert!(set.insert(17));
        assert!(set.insert(24));
        assert_eq!(set.find(10), Some(3));
        assert_eq!(set.find(17), Some(4));
        assert_eq!(set.find(24), Some(0));
        assert_eq!(occupied(&set), set.size());
    }

    #[test]
    fn test_duplicate_insert_is_rejected() {
        let mut set = ProbingSet::new();
        assert!(set.insert(5));
        assert!(!set.insert(5));
        assert_eq!(set.size(), 1);
        assert_eq!(occupied(&set), 1);
    }

    #[test]
    fn test_duplicate_detected_past_a_hole() {
        let mut set = ProbingSet::new();
        set.insert(10);
        set.insert(17);
        set.remove(10);
        // slot 3 is empty now but 17 still lives further along its sequence
        assert!(!set.insert(17));
        assert_eq!(set.find(17), Some(4));
        assert_eq!(set.size(), 1);
    }

    #[test]
    fn test_growth_at_threshold() {
        let mut set = ProbingSet::new();
        for value in 0..5 {
            set.insert(value);
        }
        assert_eq!(set.capacity(), 7);
        assert!(set.is_at_threshold());

        set.insert(5);
        assert_eq!(set.capacity(), 15);
        assert_eq!(set.size(), 6);
        for value in 0..6 {
            assert_eq!(set.find(value), Some(value as usize));
        }
    }

    #[test]
    fn test_failed_walk_grows_below_threshold() {
        // From slot 0 a capacity-7 table only reaches {0, 1, 2, 4}.
        let mut set = ProbingSet::new();
        for value in [0, 1, 2, 4] {
            set.insert(value);
        }
        assert!(!set.is_at_threshold());
        assert_eq!(vacant_slot(&set.slots, 7), None);

        assert!(set.insert(7));
        assert_eq!(set.capacity(), 15);
        assert_eq!(set.size(), 5);
        for value in [0, 1, 2, 4, 7] {
            assert!(set.contains(value));
        }
    }

    #[test]
    fn test_rehash_retries_with_larger_capacity() {
        let mut set = ProbingSet::new();
        for value in (0..100).map(|v| v * 7) {
            assert!(set.insert(value));
        }
        assert_eq!(set.size(), 100);
        assert_eq!(set.capacity(), 255);
        assert_eq!(occupied(&set), 100);
        assert!((0..100).all(|v| set.contains(v * 7)));
    }

    #[test]
    fn test_grow_preserves_count() {
        let mut set = ProbingSet::new();
        set.extend([3, 9, -4]);
        set.grow();
        assert_eq!(set.capacity(), 15);
        assert_eq!(set.size(), 3);
        assert_eq!(occupied(&set), 3);
        assert!([3, 9, -4].iter().all(|&v| set.contains(v)));
    }

    #[test]
    fn test_iter_yields_values_in_slot_order() {
        let set: ProbingSet = [10, 17, 24].into_iter().collect();
        let values: Vec<i64> = set.iter().collect();
        assert_eq!(values, vec![24, 10, 17]);
        assert_eq!(set.iter().len(), 3);
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut set: ProbingSet = (0..10).collect();
        let capacity = set.capacity();
        set.clear();
        assert_eq!(set.capacity(), capacity);
        assert!(set.is_empty());
        assert_eq!(occupied(&set), 0);
        assert_eq!(set.iter().next(), None);
    }
}
