//! Device-space geometry for draw-region payloads
//!
//! `Region` is a normalized set of rectangles describing work still to be
//! done. Operations may over-approximate (never under-approximate): a region
//! that is too large only causes redundant drawing.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Half-open rectangle `[left, right) x [top, bottom)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Rectangle from the origin to `size`.
    pub const fn from_size(size: Point) -> Self {
        Self::new(0, 0, size.x, size.y)
    }

    pub fn is_empty(&self) -> bool {
        self.left >= self.right || self.top >= self.bottom
    }

    pub fn intersection(&self, other: &Rect) -> Rect {
        Rect::new(
            self.left.max(other.left),
            self.top.max(other.top),
            self.right.min(other.right),
            self.bottom.min(other.bottom),
        )
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        !self.intersection(other).is_empty()
    }

    pub fn contains(&self, other: &Rect) -> bool {
        other.is_empty()
            || (self.left <= other.left
                && self.top <= other.top
                && self.right >= other.right
                && self.bottom >= other.bottom)
    }

    pub fn bounding(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Rect::new(
            self.left.min(other.left),
            self.top.min(other.top),
            self.right.max(other.right),
            self.bottom.max(other.bottom),
        )
    }

    pub fn translated(&self, delta: Point) -> Rect {
        Rect::new(
            self.left + delta.x,
            self.top + delta.y,
            self.right + delta.x,
            self.bottom + delta.y,
        )
    }
}

/// Normalized set of rectangles: no empty members, none contained in
/// another, sorted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Region {
    rects: Vec<Rect>,
}

impl From<Rect> for Region {
    fn from(rect: Rect) -> Self {
        Region::from_rects([rect])
    }
}

impl Region {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rects(rects: impl IntoIterator<Item = Rect>) -> Self {
        let mut region = Region {
            rects: rects.into_iter().collect(),
        };
        region.normalize();
        region
    }

    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn bounding_box(&self) -> Rect {
        self.rects
            .iter()
            .fold(Rect::default(), |acc, r| acc.bounding(r))
    }

    pub fn intersects(&self, rect: &Rect) -> bool {
        self.rects.iter().any(|r| r.intersects(rect))
    }

    /// Every rectangle of `other` lies inside one rectangle of `self`.
    pub fn includes(&self, other: &Region) -> bool {
        other
            .rects
            .iter()
            .all(|o| self.rects.iter().any(|r| r.contains(o)))
    }

    pub fn is_bounded_by(&self, bounds: &Rect) -> bool {
        self.rects.iter().all(|r| bounds.contains(r))
    }

    pub fn union_with(&mut self, other: &Region) {
        self.rects.extend_from_slice(&other.rects);
        self.normalize();
    }

    pub fn clip_to(&mut self, bounds: &Rect) {
        for r in &mut self.rects {
            *r = r.intersection(bounds);
        }
        self.normalize();
    }

    /// Move the part of the region inside `scroll_area` by `delta`, keeping
    /// the moved part within `clip_area`. Each affected rectangle is replaced
    /// by the bounding box of its unmoved remainder and its moved part.
    pub fn scroll(&mut self, delta: Point, scroll_area: &Rect, clip_area: &Rect) {
        for r in &mut self.rects {
            let inside = r.intersection(scroll_area);
            if inside.is_empty() {
                continue;
            }
            let moved = inside.translated(delta).intersection(clip_area);
            *r = if scroll_area.contains(r) {
                moved
            } else {
                r.bounding(&moved)
            };
        }
        self.normalize();
    }

    fn normalize(&mut self) {
        self.rects.retain(|r| !r.is_empty());
        self.rects.sort();
        self.rects.dedup();
        let rects = std::mem::take(&mut self.rects);
        for (i, r) in rects.iter().enumerate() {
            let covered = rects
                .iter()
                .enumerate()
                .any(|(j, other)| j != i && other.contains(r) && (other != r));
            if !covered {
                self.rects.push(*r);
            }
        }
    }
}
