//! Single-producer/single-consumer lock-free input ring for cross-thread
//! brush events (§5 "Shared-input ring"). Pure `std::sync::atomic`, no
//! external crate: a host shell thread pushes events; the engine drains
//! them once per tick, before `step` runs its sweep.
//!
//! New module -- the teacher drives brush calls directly from the same
//! thread that owns `World`, so it has no cross-thread input seam at all.
//! Grounded on the atomics-only SPSC ring convention (separate
//! `writeHead`/`readHead` indices advanced modulo capacity, a dropped-event
//! flag instead of blocking) common to the pack's networked/concurrent
//! engines.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::elements::ElementId;

/// No event queued at this slot.
pub const NONE: u32 = 0;
/// Resets stroke-tracking state (breaks in-progress line interpolation).
pub const END_STROKE: u32 = 1;
/// Smallest `type` value encoding a brush/erase event; `type - ELEMENT_OFFSET`
/// is the element ID to paint, with `EL_EMPTY` (0) meaning erase.
pub const ELEMENT_OFFSET: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrushEvent {
    EndStroke,
    Paint { x: i32, y: i32, element: ElementId, radius: u32 },
}

struct Slot {
    x: AtomicU32,
    y: AtomicU32,
    kind: AtomicU32,
    value: AtomicU32,
}

impl Slot {
    fn new() -> Self {
        Self {
            x: AtomicU32::new(0),
            y: AtomicU32::new(0),
            kind: AtomicU32::new(NONE),
            value: AtomicU32::new(0),
        }
    }
}

/// `[writeHead, readHead, overflowFlag, ...events]` from §5, minus the
/// explicit layout (the atomics here play the role of those three header
/// words, and `slots` the event array).
pub struct InputRing {
    capacity: u32,
    write_head: AtomicU32,
    read_head: AtomicU32,
    overflow: AtomicU32,
    slots: Vec<Slot>,
}

impl InputRing {
    /// `capacity` must be at least 2: one slot is always kept empty to
    /// distinguish a full ring from an empty one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            capacity: capacity as u32,
            write_head: AtomicU32::new(0),
            read_head: AtomicU32::new(0),
            overflow: AtomicU32::new(0),
            slots: (0..capacity).map(|_| Slot::new()).collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity as usize
    }

    fn push(&self, kind: u32, x: u32, y: u32, value: u32) {
        let write = self.write_head.load(Ordering::Relaxed);
        let next = (write + 1) % self.capacity;
        let read = self.read_head.load(Ordering::Acquire);

        if next == read {
            self.overflow.store(1, Ordering::Release);
            return;
        }

        let slot = &self.slots[write as usize];
        slot.x.store(x, Ordering::Relaxed);
        slot.y.store(y, Ordering::Relaxed);
        slot.value.store(value, Ordering::Relaxed);
        slot.kind.store(kind, Ordering::Release);
        self.write_head.store(next, Ordering::Release);
    }

    /// Producer side: queues a paint (or erase, when `element` is
    /// `EL_EMPTY`) event. Safe to call concurrently with [`Self::drain`]
    /// from another thread -- that's the point of the ring.
    pub fn push_paint(&self, x: i32, y: i32, element: ElementId, radius: u32) {
        self.push(ELEMENT_OFFSET + element as u32, x as u32, y as u32, radius);
    }

    /// Producer side: signals the end of the current brush stroke.
    pub fn push_end_stroke(&self) {
        self.push(END_STROKE, 0, 0, 0);
    }

    /// Consumer side: reads and clears the overflow flag. The engine
    /// calls this once per tick, before draining, and resets any
    /// in-progress stroke interpolation if it returns `true` (§5, §9).
    pub fn take_overflow(&self) -> bool {
        self.overflow.swap(0, Ordering::AcqRel) != 0
    }

    /// Consumer side: drains every event queued up to the current
    /// `writeHead`, in order.
    pub fn drain(&self) -> Vec<BrushEvent> {
        let mut out = Vec::new();
        let write = self.write_head.load(Ordering::Acquire);
        let mut read = self.read_head.load(Ordering::Relaxed);

        while read != write {
            let slot = &self.slots[read as usize];
            let kind = slot.kind.load(Ordering::Acquire);
            let x = slot.x.load(Ordering::Relaxed) as i32;
            let y = slot.y.load(Ordering::Relaxed) as i32;
            let value = slot.value.load(Ordering::Relaxed);

            match kind {
                NONE => {}
                END_STROKE => out.push(BrushEvent::EndStroke),
                k => {
                    let element = (k - ELEMENT_OFFSET) as ElementId;
                    out.push(BrushEvent::Paint { x, y, element, radius: value });
                }
            }

            read = (read + 1) % self.capacity;
        }

        self.read_head.store(read, Ordering::Release);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_preserves_order() {
        let ring = InputRing::new(8);
        ring.push_paint(1, 2, 6, 3);
        ring.push_paint(3, 4, 0, 2);
        ring.push_end_stroke();

        let events = ring.drain();
        assert_eq!(events, vec![
            BrushEvent::Paint { x: 1, y: 2, element: 6, radius: 3 },
            BrushEvent::Paint { x: 3, y: 4, element: 0, radius: 2 },
            BrushEvent::EndStroke,
        ]);
        assert!(!ring.take_overflow());
    }

    #[test]
    fn overflow_sets_flag_and_drops_event() {
        // Capacity 2 means exactly one event fits before the ring reports full.
        let ring = InputRing::new(2);
        ring.push_paint(0, 0, 1, 0);
        ring.push_paint(1, 1, 1, 0); // dropped, ring has only one usable slot
        assert!(ring.take_overflow());
        assert!(!ring.take_overflow(), "flag should clear after being read");

        let events = ring.drain();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn drain_is_idempotent_when_empty() {
        let ring = InputRing::new(8);
        assert!(ring.drain().is_empty());
        assert!(ring.drain().is_empty());
    }
}
