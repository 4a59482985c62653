//! The segmented, incrementally expandable file list.

use std::collections::{BTreeMap, VecDeque};

use rustc_hash::FxHashMap;

use crate::entry::FileEntry;
use crate::error::{FileListError, Result};
use crate::segment::{Segment, SegmentBuilder};

/// An ordered collection of [`FileEntry`] partitioned into append-only
/// [`Segment`]s, with a single monotonically increasing global index
/// space shared across segments.
///
/// Segments are looked up by global index through a `base_index -> slot`
/// index (`BTreeMap::range`, logarithmic); segment removal is O(1) since
/// segments are stored by a stable slot id rather than by vector position.
pub struct FileList {
    next_index: u32,
    next_slot: u64,
    order: VecDeque<u64>,
    segments: FxHashMap<u64, Segment>,
    index: BTreeMap<u32, u64>,
    pending_stubs: FxHashMap<u32, ()>,
}

impl Default for FileList {
    fn default() -> Self {
        Self::new()
    }
}

impl FileList {
    /// Builds an empty file list.
    pub fn new() -> Self {
        Self {
            next_index: 0,
            next_slot: 0,
            order: VecDeque::new(),
            segments: FxHashMap::default(),
            index: BTreeMap::new(),
            pending_stubs: FxHashMap::default(),
        }
    }

    /// Starts a builder for a new segment. Pass `directory_index = -1`
    /// and `directory_entry = None` for the initial top-level scan, or a
    /// non-negative directory index and its global entry index when
    /// expanding a stub directory.
    pub fn begin_segment(&self, directory_index: i32, directory_entry: Option<u32>) -> SegmentBuilder {
        SegmentBuilder::new(directory_index, directory_entry)
    }

    /// Records that `idx` names a directory not yet expanded. Cleared
    /// automatically when the corresponding segment is finalized via
    /// [`Self::finalize_segment`].
    pub fn mark_stub(&mut self, idx: u32) {
        self.pending_stubs.insert(idx, ());
    }

    /// True iff at least one stub directory remains unexpanded.
    pub fn is_expandable(&self) -> bool {
        !self.pending_stubs.is_empty()
    }

    /// True iff every segment has been finished and removed.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Finalizes a builder, assigning it the next contiguous range of
    /// the global index space. Returns the base index assigned.
    pub fn finalize_segment(&mut self, builder: SegmentBuilder) -> u32 {
        let directory_index = builder.directory_index();
        let directory_entry = builder.directory_entry();
        let entries = builder.into_entries();
        let base_index = self.next_index;
        self.next_index += entries.len() as u32;

        if let Some(dir_idx) = directory_entry {
            self.pending_stubs.remove(&dir_idx);
        }

        let segment = Segment::new(directory_index, directory_entry, base_index, entries);
        let slot = self.next_slot;
        self.next_slot += 1;
        self.index.insert(base_index, slot);
        self.segments.insert(slot, segment);
        self.order.push_back(slot);
        base_index
    }

    fn slot_for(&self, idx: u32) -> Option<u64> {
        let (_, &slot) = self.index.range(..=idx).next_back()?;
        let segment = self.segments.get(&slot)?;
        segment.contains(idx).then_some(slot)
    }

    /// Looks up a live entry by global index.
    pub fn get(&self, idx: u32) -> Option<&FileEntry> {
        let slot = self.slot_for(idx)?;
        self.segments[&slot].get(idx)
    }

    /// Removes and returns the entry at `idx`.
    ///
    /// # Errors
    /// Returns [`FileListError::UnknownIndex`] if `idx` does not resolve
    /// to a live entry in any segment.
    pub fn remove(&mut self, idx: u32) -> Result<FileEntry> {
        let slot = self.slot_for(idx).ok_or(FileListError::UnknownIndex(idx))?;
        let segment = self.segments.get_mut(&slot).expect("slot_for returned a live slot");
        segment.remove(idx).ok_or(FileListError::UnknownIndex(idx))
    }

    /// The segment containing `idx`, if any.
    pub fn segment_containing(&self, idx: u32) -> Option<&Segment> {
        let slot = self.slot_for(idx)?;
        self.segments.get(&slot)
    }

    /// Removes the head segment and returns it, but only if it is
    /// finished. Used by `removeFinishedSegmentsAndAck` to walk the list
    /// from the head, stopping at the first unfinished segment.
    pub fn pop_finished_head(&mut self) -> Option<Segment> {
        let slot = *self.order.front()?;
        let finished = self.segments.get(&slot)?.is_finished();
        if !finished {
            return None;
        }
        self.order.pop_front();
        self.index.retain(|_, v| *v != slot);
        self.segments.remove(&slot)
    }

    /// Total number of segments currently held (finished or not).
    pub fn segment_count(&self) -> usize {
        self.order.len()
    }
}
