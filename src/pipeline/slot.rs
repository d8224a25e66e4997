//! Latest-wins exchange slot between the capture and publish loops.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crossbeam::utils::CachePadded;

use crate::capture::frame::FrameSet;

/// Single-cell hand-off buffer with latest-wins semantics.
///
/// Holds at most one pending [`FrameSet`]. A deposit unconditionally
/// replaces any unconsumed occupant, so a slow consumer only ever sees the
/// freshest frame. Exactly one producer and one consumer access the slot
/// concurrently; the empty/occupied transition is atomic under the mutex.
pub struct FrameSlot {
    cell: Mutex<Option<FrameSet>>,

    /// Statistics
    stats: CachePadded<Stats>,
}

#[derive(Default)]
struct Stats {
    deposits: AtomicU64,
    withdrawals: AtomicU64,
    overwrites: AtomicU64,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self {
            cell: Mutex::new(None),
            stats: CachePadded::new(Stats::default()),
        }
    }

    /// Producer: store a frame set, discarding any unconsumed occupant.
    /// Never blocks on the consumer and never fails.
    pub fn deposit(&self, frame_set: FrameSet) {
        let mut cell = self.cell.lock().unwrap_or_else(|e| e.into_inner());
        if cell.replace(frame_set).is_some() {
            self.stats.overwrites.fetch_add(1, Ordering::Relaxed);
        }
        self.stats.deposits.fetch_add(1, Ordering::Relaxed);
    }

    /// Consumer: remove and return the current occupant, if any. Never
    /// blocks on the producer.
    pub fn try_withdraw(&self) -> Option<FrameSet> {
        let mut cell = self.cell.lock().unwrap_or_else(|e| e.into_inner());
        let taken = cell.take();
        if taken.is_some() {
            self.stats.withdrawals.fetch_add(1, Ordering::Relaxed);
        }
        taken
    }

    /// (deposits, withdrawals, overwrites)
    pub fn stats(&self) -> (u64, u64, u64) {
        (
            self.stats.deposits.load(Ordering::Relaxed),
            self.stats.withdrawals.load(Ordering::Relaxed),
            self.stats.overwrites.load(Ordering::Relaxed),
        )
    }
}

impl Default for FrameSlot {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use bytes::Bytes;

    use super::*;
    use crate::capture::frame::ColorImage;

    fn frame_set(tag: u64) -> FrameSet {
        let image = ColorImage::new(Bytes::from(vec![0u8; 2 * 2 * 3]), 2, 2);
        FrameSet {
            color: image.clone(),
            depth_colormap: image,
            ingress_ns: tag,
        }
    }

    #[test]
    fn empty_slot_yields_nothing() {
        let slot = FrameSlot::new();
        assert!(slot.try_withdraw().is_none());
        assert_eq!(slot.stats(), (0, 0, 0));
    }

    #[test]
    fn latest_deposit_wins() {
        let slot = FrameSlot::new();
        slot.deposit(frame_set(1));
        slot.deposit(frame_set(2));

        let taken = slot.try_withdraw().unwrap();
        assert_eq!(taken.ingress_ns, 2);
        assert!(slot.try_withdraw().is_none());
        assert_eq!(slot.stats(), (2, 1, 1));
    }

    #[test]
    fn withdrawn_set_is_complete() {
        let slot = FrameSlot::new();
        slot.deposit(frame_set(7));

        let taken = slot.try_withdraw().unwrap();
        assert_eq!(taken.color.width, taken.depth_colormap.width);
        assert_eq!(taken.color.height, taken.depth_colormap.height);
        assert_eq!(taken.ingress_ns, 7);
    }

    #[test]
    fn interleaved_exchange_preserves_order() {
        let slot = FrameSlot::new();
        for tag in 1..=5 {
            slot.deposit(frame_set(tag));
            assert_eq!(slot.try_withdraw().unwrap().ingress_ns, tag);
        }
        assert_eq!(slot.stats(), (5, 5, 0));
    }

    #[test]
    fn concurrent_exchange_never_reorders_or_duplicates() {
        let slot = Arc::new(FrameSlot::new());
        let producer_slot = Arc::clone(&slot);

        let producer = thread::spawn(move || {
            for tag in 1..=1000u64 {
                producer_slot.deposit(frame_set(tag));
            }
        });

        let mut seen = Vec::new();
        while !producer.is_finished() {
            if let Some(taken) = slot.try_withdraw() {
                seen.push(taken.ingress_ns);
            }
        }
        producer.join().unwrap();
        if let Some(taken) = slot.try_withdraw() {
            seen.push(taken.ingress_ns);
        }

        // Skips are expected, reordering and duplication are not.
        assert!(seen.windows(2).all(|w| w[0] < w[1]), "tags not strictly increasing: {seen:?}");
        assert_eq!(*seen.last().unwrap(), 1000);
    }
}
