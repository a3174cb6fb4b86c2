//! Frame operations for draw-region payloads
//!
//! When payloads describe screen area still to be drawn, frames can be merged
//! and reshaped as the view changes: newly invalidated area is added to every
//! pending pass, frames are clipped when the view shrinks, and moved when it
//! scrolls. Adjacent frames that end up with equal payloads are coalesced,
//! keeping the progress of the less advanced one.

use super::frame::CounterStack;
use super::stacks::CounterStacks;
use crate::geometry::{Point, Rect, Region};

/// Payload describing the remaining work of a pass as an area.
pub trait DrawRegion: Clone + PartialEq {
    fn is_empty(&self) -> bool;
    fn union_with(&mut self, other: &Self);
    fn intersects(&self, rect: &Rect) -> bool;
    fn is_bounded_by(&self, bounds: &Rect) -> bool;
    fn clip_to(&mut self, bounds: &Rect);
    fn scroll(&mut self, delta: Point, scroll_area: &Rect, clip_area: &Rect);
}

impl DrawRegion for Region {
    fn is_empty(&self) -> bool {
        Region::is_empty(self)
    }

    fn union_with(&mut self, other: &Self) {
        Region::union_with(self, other)
    }

    fn intersects(&self, rect: &Rect) -> bool {
        Region::intersects(self, rect)
    }

    fn is_bounded_by(&self, bounds: &Rect) -> bool {
        Region::is_bounded_by(self, bounds)
    }

    fn clip_to(&mut self, bounds: &Rect) {
        Region::clip_to(self, bounds)
    }

    fn scroll(&mut self, delta: Point, scroll_area: &Rect, clip_area: &Rect) {
        Region::scroll(self, delta, scroll_area, clip_area)
    }
}

impl<P: DrawRegion> CounterStacks<P> {
    /// Add newly invalidated area.
    ///
    /// If the current pass has made progress, a new pass over `region` is
    /// pushed; it will run until it reaches the position of the current pass.
    /// Every pending pass gets `region` added to its remaining work.
    pub fn invalidate(&mut self, region: P) {
        debug_assert!(self.no_active_counters());
        debug_assert!(!self.did_break());

        if region.is_empty() {
            return;
        }

        if self.empty() {
            self.add_draw_region(region);
            return;
        }

        if !self.curr_stack_empty() {
            let stack_base = self.counters.len();
            self.frames.push(CounterStack::new(region.clone(), stack_base));
            tracing::debug!(frames = self.frames.len(), stack_base, "frame pushed for invalidated region");
        }

        let mut idx = 0;
        while idx < self.frames.len() {
            self.frames[idx].payload.union_with(&region);
            idx = self.increment_or_remove(idx);
        }

        let max_frames = self.config().max_frames;
        if let Some(cap) = max_frames {
            self.limit_draw_regions(cap);
        }
        debug_assert!(self.is_ok());
    }

    /// Keep at most `cap` frames. The two oldest frames are folded together
    /// until the cap holds: the survivor keeps the union of both payloads and
    /// the progress of the less advanced one, so work is repeated, not lost.
    pub fn limit_draw_regions(&mut self, cap: usize) {
        debug_assert!(self.no_active_counters());

        let cap = cap.max(1);
        while self.frames.len() > cap {
            let oldest = self.frames.remove(0);
            let folded = self.frames[0].stack_base - oldest.stack_base;
            self.counters.drain(oldest.stack_base..oldest.stack_base + folded);
            for frame in &mut self.frames {
                frame.stack_base -= folded;
            }
            self.frames[0].payload.union_with(&oldest.payload);
            tracing::debug!(frames = self.frames.len(), folded, "oldest frame folded");
        }
        debug_assert!(self.is_ok());
    }

    /// Clip every pending pass to `bounds`, starting with the oldest. Frames
    /// left without work are cut off together with every newer frame.
    pub fn clip_draw_regions(&mut self, bounds: &Rect) {
        debug_assert!(self.no_active_counters());
        debug_assert!(!self.did_break());

        let mut idx = 0;
        while idx < self.frames.len() {
            let payload = &mut self.frames[idx].payload;
            if payload.is_bounded_by(bounds) {
                break;
            }
            payload.clip_to(bounds);
            if payload.is_empty() {
                self.cutoff_stacks(idx);
                break;
            }
            idx = self.increment_or_remove(idx);
        }
        debug_assert!(self.is_ok());
    }

    /// The view scrolled by `delta` within `scroll_area`; move the pending
    /// work along, clipped to `clip_area`.
    pub fn scroll(&mut self, delta: Point, scroll_area: &Rect, clip_area: &Rect) {
        debug_assert!(self.no_active_counters());
        debug_assert!(!self.did_break());
        tracing::debug!(?delta, ?scroll_area, "scrolling frames");

        let mut idx = 0;
        while idx < self.frames.len() {
            let payload = &mut self.frames[idx].payload;
            if !payload.intersects(clip_area) {
                tracing::debug!("scrolling stopped: frame outside the clip area");
                self.increment_or_remove(idx);
                break;
            }
            payload.scroll(delta, scroll_area, clip_area);
            if payload.is_empty() {
                self.cutoff_stacks(idx);
                break;
            }
            idx = self.increment_or_remove(idx);
        }
        debug_assert!(self.is_ok());
    }

    /// Coalesce frame `idx` with the older frame below it when their payloads
    /// are equal. Returns the index of the next frame to visit.
    fn increment_or_remove(&mut self, idx: usize) -> usize {
        if idx == 0 || self.frames[idx].payload != self.frames[idx - 1].payload {
            return idx + 1;
        }

        let lo = self.frames[idx - 1].stack_base;
        let hi = self.frames[idx].stack_base;
        self.counters.drain(lo..hi);
        for frame in &mut self.frames[idx..] {
            frame.stack_base -= hi - lo;
        }
        self.frames.remove(idx - 1);
        tracing::debug!(frames = self.frames.len(), "equal frames coalesced");
        idx
    }
}
