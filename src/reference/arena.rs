//! Fixed-capacity segment storage for the reference engine.
//!
//! Every segment slot is allocated up front. Slots holding a non-zero length
//! form a singly linked chain in index order; zero-length slots are unlinked.

/// Sentinel successor marking the end of the chain.
pub const NO_SUCCESSOR: u32 = u32::MAX;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SegmentIdx(pub u32);

impl SegmentIdx {
    /// The rearmost segment; it is always linked.
    pub const HEAD: SegmentIdx = SegmentIdx(0);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Segment {
    pub len: u32,
    pub next: u32,
}

impl Segment {
    #[inline]
    pub fn successor(&self) -> Option<SegmentIdx> {
        (self.next != NO_SUCCESSOR).then_some(SegmentIdx(self.next))
    }

    #[inline]
    pub fn is_last(&self) -> bool {
        self.next == NO_SUCCESSOR
    }
}

#[derive(Clone, Debug)]
pub struct SegmentArena {
    cells: Box<[Segment]>,
}

impl SegmentArena {
    /// Fully extended chain: every slot has length one and links to the next.
    pub fn extended(count: usize) -> Self {
        debug_assert!(count > 0 && count < NO_SUCCESSOR as usize);
        let cells = (0..count)
            .map(|i| Segment {
                len: 1,
                next: if i + 1 < count {
                    (i + 1) as u32
                } else {
                    NO_SUCCESSOR
                },
            })
            .collect();
        Self { cells }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn get(&self, idx: SegmentIdx) -> &Segment {
        &self.cells[idx.index()]
    }

    #[inline]
    pub fn cells_mut(&mut self) -> &mut [Segment] {
        &mut self.cells
    }

    /// Dense copy of every slot length, linked or not.
    pub fn lengths(&self) -> Vec<u32> {
        self.cells.iter().map(|cell| cell.len).collect()
    }

    /// Linked segments in chain order.
    pub fn chain(&self) -> Chain<'_> {
        Chain {
            arena: self,
            cursor: Some(SegmentIdx::HEAD),
        }
    }
}

/// Iterator over `(slot, length)` of the linked segments.
pub struct Chain<'a> {
    arena: &'a SegmentArena,
    cursor: Option<SegmentIdx>,
}

impl Iterator for Chain<'_> {
    type Item = (SegmentIdx, u32);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.cursor?;
        let cell = self.arena.get(idx);
        self.cursor = cell.successor();
        Some((idx, cell.len))
    }
}

#[cfg(test)]
mod tests {
    use super::{NO_SUCCESSOR, SegmentArena, SegmentIdx};

    #[test]
    fn extended_arena_links_every_slot() {
        let arena = SegmentArena::extended(5);
        assert_eq!(arena.len(), 5);
        assert_eq!(arena.lengths(), vec![1; 5]);
        let chain: Vec<_> = arena.chain().map(|(idx, _)| idx.0).collect();
        assert_eq!(chain, vec![0, 1, 2, 3, 4]);
        assert_eq!(arena.get(SegmentIdx(4)).next, NO_SUCCESSOR);
        assert!(arena.get(SegmentIdx(4)).is_last());
    }

    #[test]
    fn chain_skips_unlinked_slots() {
        let mut arena = SegmentArena::extended(4);
        let cells = arena.cells_mut();
        cells[0].len = 2;
        cells[1].len = 0;
        cells[0].next = 2;
        let chain: Vec<_> = arena.chain().map(|(idx, len)| (idx.0, len)).collect();
        assert_eq!(chain, vec![(0, 2), (2, 1), (3, 1)]);
    }
}
