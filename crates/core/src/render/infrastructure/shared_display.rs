use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::render::domain::display_sink::{DisplayFrame, DisplaySink};
use crate::shared::latest_slot::LatestSlot;

/// Sink for GUI front ends that redraw on their own timer.
///
/// The clock thread presents into a latest-value slot; the UI thread reads
/// whatever is current and reports its surface size through
/// [`SharedDisplay::set_size`]. Clones share the same slot and size.
#[derive(Clone)]
pub struct SharedDisplay {
    latest: Arc<LatestSlot<DisplayFrame>>,
    // Width in the high half, height in the low half.
    size: Arc<AtomicU64>,
}

impl SharedDisplay {
    pub fn new(size: (u32, u32)) -> Self {
        Self {
            latest: Arc::new(LatestSlot::new()),
            size: Arc::new(AtomicU64::new(pack(size))),
        }
    }

    pub fn set_size(&self, size: (u32, u32)) {
        self.size.store(pack(size), Ordering::Relaxed);
    }

    pub fn latest(&self) -> Option<Arc<DisplayFrame>> {
        self.latest.latest()
    }
}

impl DisplaySink for SharedDisplay {
    fn display_size(&self) -> (u32, u32) {
        let packed = self.size.load(Ordering::Relaxed);
        ((packed >> 32) as u32, packed as u32)
    }

    fn present(&mut self, frame: DisplayFrame) {
        self.latest.publish(frame);
    }
}

fn pack((w, h): (u32, u32)) -> u64 {
    (u64::from(w) << 32) | u64::from(h)
}
