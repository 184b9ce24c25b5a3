use std::collections::BTreeMap;
use std::sync::Arc;

use crate::assets::decode::FrameImage;
use crate::foundation::core::FrameIndex;

struct Slot {
    image: Arc<FrameImage>,
    last_used: u64,
}

/// Outcome of [`FrameCache::insert`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheInsert {
    /// Stored; `evicted` lists entries dropped to stay within capacity.
    Inserted {
        /// Frames removed by the capacity policy.
        evicted: Vec<FrameIndex>,
    },
    /// An entry already existed and was left untouched.
    AlreadyPresent,
    /// Index outside `[1, total_frames]`; nothing stored.
    OutOfRange,
}

/// Decoded frames keyed by index.
///
/// Entries are immutable once inserted. With capacity equal to the sequence length the cache only
/// grows; with a smaller capacity the least recently used entry is evicted on overflow, except the
/// frame the caller marks as protected.
pub struct FrameCache {
    total_frames: u32,
    capacity: u32,
    entries: BTreeMap<FrameIndex, Slot>,
    clock: u64,
    evictions: u64,
}

impl FrameCache {
    /// Empty cache for a sequence of `total_frames`, holding at most `capacity` entries.
    pub fn new(total_frames: u32, capacity: u32) -> Self {
        Self {
            total_frames,
            capacity: capacity.clamp(1, total_frames.max(1)),
            entries: BTreeMap::new(),
            clock: 0,
            evictions: 0,
        }
    }

    /// Maximum number of entries retained.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Number of cached frames.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `index` is cached.
    pub fn contains(&self, index: FrameIndex) -> bool {
        self.entries.contains_key(&index)
    }

    /// Cached image for `index`, without updating recency.
    pub fn get(&self, index: FrameIndex) -> Option<Arc<FrameImage>> {
        self.entries.get(&index).map(|s| Arc::clone(&s.image))
    }

    /// Mark `index` as just used.
    pub fn touch(&mut self, index: FrameIndex) {
        self.clock += 1;
        if let Some(slot) = self.entries.get_mut(&index) {
            slot.last_used = self.clock;
        }
    }

    /// Cached indices in ascending order.
    pub fn indices(&self) -> impl Iterator<Item = FrameIndex> + '_ {
        self.entries.keys().copied()
    }

    /// Total entries evicted so far.
    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    /// Store a decoded frame. Never replaces an existing entry.
    pub fn insert(
        &mut self,
        index: FrameIndex,
        image: Arc<FrameImage>,
        protect: Option<FrameIndex>,
    ) -> CacheInsert {
        if index.0 == 0 || index.0 > self.total_frames {
            return CacheInsert::OutOfRange;
        }
        if self.entries.contains_key(&index) {
            return CacheInsert::AlreadyPresent;
        }

        self.clock += 1;
        self.entries.insert(
            index,
            Slot {
                image,
                last_used: self.clock,
            },
        );

        let mut evicted = Vec::new();
        while self.entries.len() > self.capacity as usize {
            let Some(victim) = self.lru_victim(protect, index) else {
                break;
            };
            self.entries.remove(&victim);
            self.evictions += 1;
            evicted.push(victim);
        }
        CacheInsert::Inserted { evicted }
    }

    /// Cached frame closest to `index`: the exact frame if present, otherwise the minimum index
    /// distance, ties going to the lower index.
    pub fn nearest(&self, index: FrameIndex) -> Option<(FrameIndex, Arc<FrameImage>)> {
        let below = self.entries.range(..=index).next_back();
        let above = self.entries.range(index..).next();
        let (found, slot) = match (below, above) {
            (Some(b), Some(a)) => {
                if index.distance(*b.0) <= index.distance(*a.0) {
                    b
                } else {
                    a
                }
            }
            (Some(b), None) => b,
            (None, Some(a)) => a,
            (None, None) => return None,
        };
        Some((*found, Arc::clone(&slot.image)))
    }

    /// Drop every entry, returning how many were released.
    pub fn clear(&mut self) -> usize {
        let n = self.entries.len();
        self.entries.clear();
        n
    }

    // Linear scan: capacity is bounded by the sequence length.
    fn lru_victim(
        &self,
        protect: Option<FrameIndex>,
        just_inserted: FrameIndex,
    ) -> Option<FrameIndex> {
        self.entries
            .iter()
            .filter(|(i, _)| Some(**i) != protect && **i != just_inserted)
            .min_by_key(|(i, s)| (s.last_used, **i))
            .map(|(i, _)| *i)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/cache/frame_cache.rs"]
mod tests;
