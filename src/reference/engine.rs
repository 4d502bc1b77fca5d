//! Reference extender engine.
//!
//! Walks the linked segment chain once per pulse, applying the push or pull
//! rule to each segment in index order. Simple enough to serve as ground
//! truth for the windowed engine.

use super::arena::{Chain, SegmentArena, SegmentIdx};
use crate::params::ExtenderParams;

#[derive(Clone, Debug)]
pub struct ReferenceExtender {
    params: ExtenderParams,
    arena: SegmentArena,
    pulses: u64,
}

impl ReferenceExtender {
    /// Create an extender in the fully extended state.
    pub fn new(params: ExtenderParams) -> Self {
        Self {
            params,
            arena: SegmentArena::extended(params.segment_count()),
            pulses: 0,
        }
    }

    pub fn simulate_pulse(&mut self) {
        let push_limit = self.params.push_limit();
        let last_push_limit = self.params.last_push_limit();
        let cells = self.arena.cells_mut();
        let mut curr = SegmentIdx::HEAD.index();

        loop {
            let seg = cells[curr];
            let target = curr + 1;
            if seg.len > 1 {
                // Push the surplus into the next slot. The segment carrying
                // the extended block is not bound by the virtual push limit.
                let limit = if seg.is_last() {
                    last_push_limit
                } else {
                    push_limit
                };
                let moved = limit.min(seg.len - 1);
                // The frontmost slot has no room ahead of it.
                if target >= cells.len() {
                    break;
                }
                if cells[target].len == 0 {
                    cells[target].next = seg.next;
                    cells[curr].next = target as u32;
                }
                cells[curr].len -= moved;
                cells[target].len += moved;
            } else {
                // A single piston pulls the next piston back, which in turn
                // drags its whole segment along: merge it in.
                if seg.is_last() {
                    break;
                }
                let absorbed = cells[target].len;
                if absorbed != 0 {
                    cells[curr].len += absorbed;
                    cells[target].len = 0;
                    cells[curr].next = cells[target].next;
                    if cells[curr].is_last() {
                        break;
                    }
                }
            }
            match cells[curr].successor() {
                Some(next) => curr = next.index(),
                None => break,
            }
        }

        self.pulses += 1;
    }

    /// Every block has been retracted into the rearmost segment.
    #[inline]
    pub fn finished(&self) -> bool {
        self.arena.get(SegmentIdx::HEAD).is_last()
    }

    #[inline]
    pub fn pulses(&self) -> u64 {
        self.pulses
    }

    /// Dense segment lengths, index 0 (rearmost) to L (frontmost).
    pub fn segments(&self) -> Vec<u32> {
        self.arena.lengths()
    }

    /// Linked `(slot, length)` pairs in chain order.
    pub fn chain(&self) -> Chain<'_> {
        self.arena.chain()
    }
}

/// Two extenders are equal when their linked chains hold the same lengths at
/// the same slots. Pulse counters are ignored.
impl PartialEq for ReferenceExtender {
    fn eq(&self, other: &Self) -> bool {
        self.chain().eq(other.chain())
    }
}

impl Eq for ReferenceExtender {}
